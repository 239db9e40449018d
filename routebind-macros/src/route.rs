//! `#[route]` attribute implementation
//!
//! The annotated function is kept as an inner function. A factory of the same
//! name replaces it and returns a `routebind_server::Route` that declares one
//! parameter per function argument (name from the pattern, kind from the
//! argument type's `BindParam::KIND`) and whose handler pulls each argument
//! out of the resolved `BoundArgs` in order.
//!
//! Input:
//! ```ignore
//! #[route(GET, scope = "users")]
//! async fn find(id: ObjectId, verbose: bool) -> Result<User> {
//!     load(id, verbose).await
//! }
//! ```
//!
//! Generated output:
//! ```ignore
//! fn find() -> ::routebind_server::Route {
//!     async fn __routebind_inner(id: ObjectId, verbose: bool) -> Result<User> {
//!         load(id, verbose).await
//!     }
//!
//!     let handler = ::routebind_server::from_fn(|mut args| async move {
//!         let __arg0: ObjectId = args.take(0)?;
//!         let __arg1: bool = args.take(1)?;
//!         let result = __routebind_inner(__arg0, __arg1).await?;
//!         ::routebind_server::into_json(result)
//!     });
//!
//!     ::routebind_server::Route::new("find", ::routebind_server::Verb::Get)
//!         .scope("users")
//!         .param("id", <ObjectId as ::routebind_server::BindParam>::KIND)
//!         .param("verbose", <bool as ::routebind_server::BindParam>::KIND)
//!         .handler(handler)
//! }
//! ```

use proc_macro2::{Ident, Span, TokenStream};
use quote::{format_ident, quote, ToTokens};
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{Expr, ExprLit, FnArg, ItemFn, Lit, Meta, Pat, ReturnType, Token, Type};

enum Verb {
    Get,
    Post,
    Use,
}

enum Output {
    Key(String),
    Merge,
}

/// Parsed `#[route(...)]` arguments
struct RouteArgs {
    verb: Verb,
    source: Option<Ident>,
    output: Option<Output>,
    scope: Option<String>,
    name: Option<String>,
}

impl RouteArgs {
    fn parse(attr: TokenStream) -> syn::Result<Self> {
        let metas = Punctuated::<Meta, Token![,]>::parse_terminated.parse2(attr.clone())?;

        let mut verb = None;
        let mut source = None;
        let mut output = None;
        let mut scope = None;
        let mut name = None;

        for meta in metas {
            match &meta {
                Meta::Path(path) => {
                    let ident = path
                        .get_ident()
                        .ok_or_else(|| syn::Error::new_spanned(path, "expected GET, POST or USE"))?;
                    let parsed = match ident.to_string().as_str() {
                        "GET" => Verb::Get,
                        "POST" => Verb::Post,
                        "USE" => Verb::Use,
                        "merge" => {
                            output = Some(Output::Merge);
                            continue;
                        }
                        other => {
                            return Err(syn::Error::new_spanned(
                                ident,
                                format!("unknown route option `{other}`"),
                            ))
                        }
                    };
                    if verb.replace(parsed).is_some() {
                        return Err(syn::Error::new_spanned(ident, "verb given more than once"));
                    }
                }
                Meta::NameValue(pair) => {
                    let key = pair
                        .path
                        .get_ident()
                        .map(ToString::to_string)
                        .unwrap_or_default();
                    let value = string_value(&pair.value)?;
                    match key.as_str() {
                        "source" => source = Some(source_variant(&value, &pair.value)?),
                        "output" => output = Some(Output::Key(value)),
                        "scope" => scope = Some(value),
                        "name" => name = Some(value),
                        _ => {
                            return Err(syn::Error::new_spanned(
                                &pair.path,
                                "expected one of `source`, `output`, `scope`, `name`",
                            ))
                        }
                    }
                }
                Meta::List(list) => {
                    return Err(syn::Error::new_spanned(list, "unexpected nested option"));
                }
            }
        }

        let verb = verb.ok_or_else(|| {
            syn::Error::new_spanned(&attr, "missing route verb: GET, POST or USE")
        })?;

        Ok(Self {
            verb,
            source,
            output,
            scope,
            name,
        })
    }
}

fn string_value(expr: &Expr) -> syn::Result<String> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(lit), ..
        }) => Ok(lit.value()),
        other => Err(syn::Error::new_spanned(other, "expected a string literal")),
    }
}

fn source_variant(value: &str, span: &Expr) -> syn::Result<Ident> {
    let variant = match value {
        "query" => "Query",
        "body" => "Body",
        "headers" | "header" => "Headers",
        _ => {
            return Err(syn::Error::new_spanned(
                span,
                "source must be \"query\", \"body\" or \"headers\"",
            ))
        }
    };
    Ok(Ident::new(variant, Span::call_site()))
}

/// Whether the declared return type is a `Result` to be unwrapped with `?`
fn returns_result(output: &ReturnType) -> bool {
    match output {
        ReturnType::Default => false,
        ReturnType::Type(_, ty) => match ty.as_ref() {
            Type::Path(path) => path
                .path
                .segments
                .last()
                .map(|segment| segment.ident == "Result")
                .unwrap_or(false),
            _ => false,
        },
    }
}

pub fn route_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    match expand(attr, item) {
        Ok(tokens) => tokens,
        Err(e) => e.to_compile_error(),
    }
}

fn expand(attr: TokenStream, item: TokenStream) -> syn::Result<TokenStream> {
    let args = RouteArgs::parse(attr)?;
    let input_fn: ItemFn = syn::parse2(item)?;

    let sig = &input_fn.sig;
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "route handlers cannot be generic",
        ));
    }

    let fn_name = &sig.ident;
    let fn_vis = &input_fn.vis;
    let fn_attrs = &input_fn.attrs;
    let fn_block = &input_fn.block;
    let fn_inputs = &sig.inputs;
    let fn_output = &sig.output;
    let asyncness = &sig.asyncness;

    let mut params = Vec::new();
    let mut takes = Vec::new();
    let mut call_args = Vec::new();

    for (index, input) in sig.inputs.iter().enumerate() {
        let pat_type = match input {
            FnArg::Typed(pat_type) => pat_type,
            FnArg::Receiver(receiver) => {
                return Err(syn::Error::new_spanned(
                    receiver,
                    "route handlers cannot take `self`",
                ))
            }
        };
        let ident = match pat_type.pat.as_ref() {
            Pat::Ident(pat) if pat.subpat.is_none() => &pat.ident,
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "route parameters must be plain identifiers",
                ))
            }
        };

        let param_name = ident.to_string().trim_start_matches("r#").to_string();
        let ty = &pat_type.ty;
        let local = format_ident!("__arg{}", index);

        params.push(quote! {
            .param(#param_name, <#ty as ::routebind_server::BindParam>::KIND)
        });
        takes.push(quote! {
            let #local: #ty = args.take::<#ty>(#index)?;
        });
        call_args.push(local);
    }

    let route_name = args.name.unwrap_or_else(|| fn_name.to_string());
    let verb = match args.verb {
        Verb::Get => quote! { ::routebind_server::Verb::Get },
        Verb::Post => quote! { ::routebind_server::Verb::Post },
        Verb::Use => quote! { ::routebind_server::Verb::Use },
    };
    let scope = args.scope.map(|scope| quote! { .scope(#scope) });
    let source = args
        .source
        .map(|variant| quote! { .source(::routebind_server::ParamSource::#variant) });
    let output = args.output.map(|output| match output {
        Output::Key(key) => quote! { .output_key(#key) },
        Output::Merge => quote! { .merge() },
    });

    let call = quote! { __routebind_inner(#(#call_args),*) };
    let call = match asyncness {
        Some(_) => quote! { #call.await },
        None => call,
    };
    let call = if returns_result(fn_output) {
        quote! { #call? }
    } else {
        call
    };

    let body = quote! {
        #(#takes)*
        let result = #call;
        ::routebind_server::into_json(result)
    };
    let handler = match asyncness {
        Some(_) => quote! {
            ::routebind_server::from_fn(|mut args: ::routebind_server::BoundArgs| async move {
                #body
            })
        },
        None => quote! {
            ::routebind_server::from_sync_fn(|mut args: ::routebind_server::BoundArgs| {
                #body
            })
        },
    };

    let inner_inputs = fn_inputs.to_token_stream();

    Ok(quote! {
        #(#fn_attrs)*
        #fn_vis fn #fn_name() -> ::routebind_server::Route {
            #asyncness fn __routebind_inner(#inner_inputs) #fn_output #fn_block

            #[allow(unused_mut, unused_variables)]
            let handler = #handler;

            ::routebind_server::Route::new(#route_name, #verb)
                #scope
                #source
                #output
                #(#params)*
                .handler(handler)
        }
    })
}
