extern crate proc_macro;
extern crate quote;
extern crate syn;

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, Ident};

/// Derive the document form of a refinement actor.  The generated
/// `from_value` is the actor's `ActorConstructor`: it reads the actor's
/// fields from the flattened `actor` value of a refinement document, and
/// returns `None` when they do not deserialize.  The factory turns that
/// into an invalid-fields error on load.  `SerializableActor` gets the struct
/// name as the `type` tag, and the fields as the value.
#[proc_macro_derive(SerializableActor)]
pub fn actor(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    let name = input.ident;
    let tokens = quote! {
        impl #name {
            pub fn from_value(value: serde_yaml::Value) -> Option<Box<dyn RefinementActor>> {
                match serde_yaml::from_value::<Self>(value) {
                    Ok(actor) => Some(Box::new(actor)),
                    Err(_) => None
                }
            }
        }
        impl SerializableActor for #name {
            fn get_type(&self) -> &'static str {
                stringify!(#name)
            }
            fn serialize(&self) -> serde_yaml::Value {
                serde_yaml::to_value(self).unwrap_or(serde_yaml::Value::Null)
            }
        }
    };
    tokens.into()
}

/// Register a custom refinement actor under its type name.  After
/// registration the name works as a `RefinementTemplate::class`, and
/// documents naming it as an actor `type` load.  The type must derive
/// `SerializableActor`.
#[proc_macro]
pub fn register(item: TokenStream) -> TokenStream {
    let name = parse_macro_input!(item as Ident);
    let tokens = quote! {
        modal::models::refinement_factory::register(
            stringify!(#name),
            #name::from_value as modal::models::refinement_factory::ActorConstructor
        );
    };
    tokens.into()
}
