//! A small particle pool demo: spawn, query, age through states, recycle.

use hive_engine::World;
use hive_engine::components;
use hive_macros::{Component, State};

#[derive(Component, Debug, Clone, Copy)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Component, Debug, Clone, Copy)]
struct Velocity {
    dx: f32,
    dy: f32,
}

#[derive(Component, Debug)]
struct Glow(f32);

#[derive(State, Debug, Clone, Copy)]
enum Lifetime {
    Fresh,
    Fading,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let world = World::new();

    // Spawn a burst of particles; every other one glows.
    for index in 0..32 {
        let angle = index as f32 * 0.2;
        let position = Position {
            x: angle.cos(),
            y: angle.sin(),
        };
        let velocity = Velocity {
            dx: angle.cos() * 0.1,
            dy: angle.sin() * 0.1,
        };
        let particle = if index % 2 == 0 {
            world.create_entity(components![position, velocity, Glow(1.0)])?
        } else {
            world.create_entity(components![position, velocity])?
        };
        world.set_state(&particle, Some(Lifetime::Fresh))?;
    }

    println!(
        "spawned 32 particles across {} compositions",
        world.compositions().len()
    );

    // Every particle moves; only the glowing ones render bright.
    let drift: f32 = world
        .find::<(Position, Velocity)>()
        .map(|found| {
            let (p, v) = (found.comp1(), found.comp2());
            p.x * v.dx + p.y * v.dy
        })
        .sum();
    let glow: f32 = world.find::<(Glow,)>().map(|found| found.comp().0).sum();
    println!(
        "{} moving (net drift {drift:.2}), {} glowing (total glow {glow:.0})",
        world.find::<(Position, Velocity)>().count(),
        world.find::<(Glow,)>().count()
    );

    // Age half of the swarm, then reap the faded ones.
    for (index, found) in world.find::<(Position,)>().enumerate() {
        if index % 2 == 1 {
            world.set_state(found.entity(), Some(Lifetime::Fading))?;
        }
    }

    let mut faded = Vec::new();
    for id in 0..world.compositions().len() as u32 {
        if let Some(composition) = world.compositions().get(hive_engine::ecs::archetype::Id::new(id)) {
            faded.extend(composition.entities_in_state(&Lifetime::Fading));
        }
    }
    for particle in &faded {
        world.delete_entity(particle);
    }
    println!("reaped {} faded particles", faded.len());

    // Freed slots are recycled for the next burst.
    let replacement = world.create_entity(components![
        Position { x: 0.0, y: 0.0 },
        Velocity { dx: 0.0, dy: 0.0 }
    ])?;
    println!(
        "replacement particle landed at handle {:#018x}",
        replacement.handle()
    );

    Ok(())
}
