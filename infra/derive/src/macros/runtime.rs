use proc_macro2::TokenStream;
use quote::quote;
use syn::{Error, ItemFn, ReturnType, Type};

const PROFILES: &[&str] = &["server", "compact", "default"];

/// Expands `#[scribe_runtime::main(profile)]` into a sync `main` that builds the runtime.
#[must_use]
pub fn expand_main(args: TokenStream, input: ItemFn) -> TokenStream {
    if input.sig.asyncness.is_none() {
        return Error::new_spanned(
            &input.sig.ident,
            "#[scribe_runtime::main] can only be used on async functions",
        )
        .to_compile_error();
    }

    if !returns_result(&input.sig.output) {
        return Error::new_spanned(
            &input.sig.output,
            "#[scribe_runtime::main] requires a Result return type",
        )
        .to_compile_error();
    }

    let profile = match profile_call(args) {
        Ok(profile) => profile,
        Err(err) => return err.to_compile_error(),
    };

    let ItemFn { attrs, vis, sig, block } = &input;
    let name = &sig.ident;
    let output = &sig.output;

    quote! {
        #(#attrs)*
        #vis fn #name() #output {
            let config = #profile;
            let rt = ::scribe_runtime::build_runtime(&config)?;
            rt.block_on(async #block)
        }
    }
}

fn profile_call(args: TokenStream) -> syn::Result<TokenStream> {
    if args.is_empty() {
        return Ok(quote! { ::scribe_runtime::RuntimeConfig::default() });
    }

    let ident: syn::Ident = syn::parse2(args)?;
    let profile = ident.to_string();
    if !PROFILES.contains(&profile.as_str()) {
        return Err(Error::new_spanned(
            ident,
            format!("Unknown runtime profile. Use one of: {}", PROFILES.join(", ")),
        ));
    }
    Ok(quote! { ::scribe_runtime::RuntimeConfig::#ident() })
}

fn returns_result(output: &ReturnType) -> bool {
    let ReturnType::Type(_, ty) = output else {
        return false;
    };
    let Type::Path(path) = &**ty else {
        return false;
    };
    path.path.segments.last().is_some_and(|seg| seg.ident == "Result")
}
