//! Derive macro for error types.
//!
//! Generates `std::fmt::Display` and `std::error::Error` implementations for
//! enums whose variants carry an `#[error("...")]` attribute. Replacement for
//! the `thiserror` crate.
//!
//! # Usage
//!
//! ```ignore
//! use intcode_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum MyError {
//!     #[error("unknown opcode {opcode} at address {pc}")]
//!     UnknownOpcode { opcode: i64, pc: i64 },
//!
//!     #[error("bad token: {0}")]
//!     BadToken(String),
//!
//!     #[error("out of fuel")]
//!     OutOfFuel,
//! }
//! ```
//!
//! Tuple fields interpolate positionally (`{0}`, `{1}`), named fields by name.

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, Lit, Meta, parse_macro_input};

pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            "Error derive supports enums only",
        ));
    };

    let mut display_arms = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        let ident = &variant.ident;
        let message = message_for(variant)?;

        let arm = match &variant.fields {
            Fields::Unit => quote! {
                Self::#ident => write!(f, #message),
            },
            Fields::Named(fields) => {
                let names: Vec<_> = fields.named.iter().map(|f| &f.ident).collect();
                quote! {
                    Self::#ident { #(#names),* } => write!(f, #message, #(#names = #names),*),
                }
            }
            Fields::Unnamed(fields) => {
                let bindings: Vec<_> = (0..fields.unnamed.len())
                    .map(|i| format_ident!("f{}", i))
                    .collect();
                let message = rewrite_positional(&message, bindings.len());
                quote! {
                    Self::#ident(#(#bindings),*) => write!(f, #message, #(#bindings = #bindings),*),
                }
            }
        };
        display_arms.push(arm);
    }

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    #(#display_arms)*
                }
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}
    })
}

/// Extracts the message string from a variant's `#[error("...")]` attribute.
fn message_for(variant: &syn::Variant) -> syn::Result<String> {
    for attr in &variant.attrs {
        if !attr.path().is_ident("error") {
            continue;
        }

        let Meta::List(list) = &attr.meta else {
            return Err(syn::Error::new_spanned(
                &attr.meta,
                "invalid #[error] attribute; use #[error(\"message\")]",
            ));
        };

        return match syn::parse2::<Lit>(list.tokens.clone()) {
            Ok(Lit::Str(s)) => Ok(s.value()),
            _ => Err(syn::Error::new_spanned(
                &attr.meta,
                "#[error] message must be a string literal, e.g. #[error(\"unknown opcode {0}\")]",
            )),
        };
    }

    Err(syn::Error::new_spanned(
        variant,
        format!(
            "missing #[error(\"...\")] attribute on variant `{}`",
            variant.ident
        ),
    ))
}

/// Rewrites positional format args `{0}`, `{1}` to the bound names `{f0}`, `{f1}`.
fn rewrite_positional(message: &str, field_count: usize) -> String {
    let mut out = message.to_string();
    for i in (0..field_count).rev() {
        out = out.replace(&format!("{{{}}}", i), &format!("{{f{}}}", i));
    }
    out
}
