use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, parse_macro_input};

pub fn derive_component(input: TokenStream) -> TokenStream {
    // Parse the input tokens into a syntax tree
    let ast = parse_macro_input!(input as DeriveInput);

    // Get the type name we are annotating
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    // Use ::hive_engine::ecs::component::Component which works both inside and outside the crate.
    // Inside the crate, this works because of `extern crate self as hive_engine;` in lib.rs
    // Outside the crate, this naturally resolves to the hive_engine dependency.
    TokenStream::from(quote! {
        impl #impl_generics ::hive_engine::ecs::component::Component for #name #ty_generics #where_clause {
            fn class_type(&self) -> ::std::any::TypeId {
                ::std::any::TypeId::of::<Self>()
            }

            fn as_any_arc(
                self: ::std::sync::Arc<Self>,
            ) -> ::std::sync::Arc<dyn ::std::any::Any + Send + Sync> {
                self
            }
        }
    })
}
