//! The `#[tessel_testhelpers::test]` attribute.

use proc_macro2::{Ident, Span, TokenTree};
use unsynn::*;

// A function split at its body: everything before the first brace group
// (attributes, qualifiers, name, arguments, return type) and the block.
unsynn! {
    struct TestItem {
        signature: Any<Cons<Except<BraceGroup>, TokenTree>>,
        body: BraceGroup,
    }
}

/// What the attribute needs to know about the annotated function.
struct Signature {
    tokens: TokenStream,
    name: Ident,
    is_async: bool,
}

impl Signature {
    fn read(tokens: TokenStream) -> Option<Self> {
        let mut is_async = false;
        let mut after_fn = false;
        let mut name = None;
        for tree in tokens.clone() {
            let TokenTree::Ident(ident) = tree else {
                continue;
            };
            if after_fn {
                name = Some(ident);
                break;
            }
            if ident == "fn" {
                after_fn = true;
            } else if ident == "async" {
                is_async = true;
            }
        }
        Some(Signature {
            tokens,
            name: name?,
            is_async,
        })
    }
}

fn error(message: &str) -> proc_macro::TokenStream {
    quote::quote! { ::core::compile_error!(#message); }.into()
}

/// Wraps a test so it runs inside `tessel_testhelpers::enter`.
///
/// The test gets the shared tracing subscriber and panic printer, and its
/// events are grouped under a span carrying the test's path:
///
/// ```ignore
/// #[tessel_testhelpers::test]
/// fn reads_points() -> Result<(), Box<dyn std::error::Error>> {
///     Ok(())
/// }
/// ```
///
/// `async fn` tests name the runner that drives them, as in
/// `#[tessel_testhelpers::test(tokio::test)]`.
#[proc_macro_attribute]
pub fn test(
    attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let item = TokenStream::from(item);
    let Ok(parsed) = item.to_token_iter().parse::<TestItem>() else {
        return error("#[tessel_testhelpers::test] expects a function with a body");
    };

    let mut tokens = TokenStream::new();
    parsed.signature.to_tokens(&mut tokens);
    let Some(signature) = Signature::read(tokens) else {
        return error("#[tessel_testhelpers::test] could not find the function name");
    };

    let runner = TokenStream::from(attr);
    if signature.is_async && runner.is_empty() {
        return error("async tests need a runner: #[tessel_testhelpers::test(tokio::test)]");
    }
    let runner = if runner.is_empty() {
        quote::quote! { ::core::prelude::rust_2024::test }
    } else {
        runner
    };

    let Signature { tokens, name, .. } = signature;
    let label = name.to_string();
    let guard = Ident::new("__tessel_test_guard", Span::mixed_site());
    let body = parsed.body.0;

    quote::quote! {
        #[#runner]
        #tokens {
            let #guard = ::tessel_testhelpers::enter(concat!(module_path!(), "::", #label));
            #body
        }
    }
    .into()
}
