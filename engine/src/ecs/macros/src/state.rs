use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input};

pub fn derive_state(input: TokenStream) -> TokenStream {
    // Parse the input tokens into a syntax tree
    let ast = parse_macro_input!(input as DeriveInput);

    let name = &ast.ident;

    // States are fieldless enums; the ordinal is the declaration position of the variant.
    let Data::Enum(data) = &ast.data else {
        return syn::Error::new_spanned(name, "State can only be derived for enums")
            .to_compile_error()
            .into();
    };

    if data.variants.is_empty() {
        return syn::Error::new_spanned(name, "State requires at least one variant")
            .to_compile_error()
            .into();
    }

    let mut arms = Vec::new();
    for (ordinal, variant) in data.variants.iter().enumerate() {
        if !matches!(variant.fields, Fields::Unit) {
            return syn::Error::new_spanned(variant, "State variants cannot carry fields")
                .to_compile_error()
                .into();
        }
        let ident = &variant.ident;
        let ordinal = ordinal as u32;
        arms.push(quote! { #name::#ident => #ordinal });
    }

    // See the note in component.rs about the ::hive_engine path.
    TokenStream::from(quote! {
        impl ::hive_engine::ecs::state::State for #name {
            fn ordinal(&self) -> u32 {
                match self {
                    #(#arms),*
                }
            }
        }
    })
}
