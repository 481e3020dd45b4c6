//! Test attributes shared by the rxflux test suites.
//!
//! `#[rxflux_macro::test]` expands to `#[test]` for a synchronous function
//! and to `#[tokio::test]` for an `async fn`. Async tests accept a flavor:
//! `local` runs on a current-thread runtime, `shared` on a multi-thread one.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, spanned::Spanned, Ident, ItemFn, LitStr};

const USAGE: &str = "rxflux_macro::test only accepts: #[rxflux_macro::test], \
                     #[rxflux_macro::test(local)], #[rxflux_macro::test(shared)], or string \
                     equivalents";

fn flavor_of(name: &str) -> Option<proc_macro2::TokenStream> {
  match name {
    "local" => Some(quote!(flavor = "current_thread")),
    "shared" => Some(quote!(flavor = "multi_thread")),
    _ => None,
  }
}

#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
  let input = parse_macro_input!(item as ItemFn);
  let is_async = input.sig.asyncness.is_some();
  let raw_args = proc_macro2::TokenStream::from(attr);

  let tokio_args = if raw_args.is_empty() {
    proc_macro2::TokenStream::new()
  } else {
    if !is_async {
      return syn::Error::new(
        raw_args.span(),
        "rxflux_macro::test flavor args are only supported for async tests. Use \
         #[rxflux_macro::test] for sync tests, or make the function async.",
      )
      .to_compile_error()
      .into();
    }

    let parsed = if let Ok(ident) = syn::parse2::<Ident>(raw_args.clone()) {
      flavor_of(&ident.to_string()).ok_or_else(|| syn::Error::new(ident.span(), USAGE))
    } else if let Ok(lit) = syn::parse2::<LitStr>(raw_args.clone()) {
      flavor_of(&lit.value()).ok_or_else(|| syn::Error::new(lit.span(), USAGE))
    } else {
      Err(syn::Error::new(raw_args.span(), USAGE))
    };

    match parsed {
      Ok(args) => args,
      Err(err) => return err.to_compile_error().into(),
    }
  };

  let attr = if is_async { quote!(#[tokio::test(#tokio_args)]) } else { quote!(#[test]) };

  let expanded = quote! {
    #attr
    #input
  };

  TokenStream::from(expanded)
}
