//! Derive macros for the evroute event dispatcher.
//!
//! - `#[derive(EventKind)]`: implements `evroute::EventKind` for a fieldless enum,
//!   generating `name()` (the variant name) and `variants()` (every variant, in
//!   declaration order). The enum needs at least one variant.
//!
//! ```rust,ignore
//! use evroute::EventKind;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EventKind)]
//! enum Payment { Authorized, Captured, Refunded }
//! ```
use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input};

#[proc_macro_derive(EventKind)]
pub fn derive_event_kind(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_event_kind(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_event_kind(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let ident = &input.ident;

    let Data::Enum(data_enum) = &input.data else {
        return Err(syn::Error::new_spanned(
            ident,
            "EventKind can only be derived for enums",
        ));
    };

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "EventKind enums cannot be generic",
        ));
    }

    if data_enum.variants.is_empty() {
        return Err(syn::Error::new_spanned(
            ident,
            "EventKind requires at least one variant; producers pick from them",
        ));
    }

    if let Some(variant) = data_enum
        .variants
        .iter()
        .find(|v| !matches!(v.fields, Fields::Unit))
    {
        return Err(syn::Error::new_spanned(
            &variant.ident,
            "EventKind variants must not carry fields; put data in the payload",
        ));
    }

    let variant_idents: Vec<_> = data_enum.variants.iter().map(|v| &v.ident).collect();
    let variant_names: Vec<_> = variant_idents.iter().map(|v| v.to_string()).collect();

    Ok(quote! {
        impl evroute::EventKind for #ident {
            fn name(&self) -> ::std::borrow::Cow<'static, str> {
                match self {
                    #(Self::#variant_idents => ::std::borrow::Cow::Borrowed(#variant_names)),*
                }
            }

            fn variants() -> &'static [Self] {
                &[#(Self::#variant_idents),*]
            }
        }
    })
}
