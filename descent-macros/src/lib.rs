//! `#[derive(Syntax)]`: a Rust type's shape as a grammar rule.
//!
//! A named struct derives a sequence (fields in declaration order), an enum
//! of newtype variants derives an ordered choice (variants in declaration
//! order). `Vec<T>`, `Option<T>`, `Ahead<T>` and `Never<T>` fields map to
//! repetition, optional and the two lookaheads; `Box<T>` is transparent.
//! Leaf fields are configured with `#[syntax(...)]` attributes:
//!
//! - `#[syntax(literal = "...")]` on a `Text` field
//! - `#[syntax(regex = "...")]` on a `Text` field (pattern checked here, at
//!   compile time)
//! - `#[syntax(leaf = "name")]` with optional `tag = "..."` for an
//!   embedder-registered leaf
//! - `#[syntax(name = "...")]` on a `Never<T>` field (the name reported when
//!   the lookahead unexpectedly matches), or on an enum (the choice name)
//!
//! Type-level opt-ins wire the runtime hooks: `#[syntax(verify)]`,
//! `#[syntax(on_failed)]` and `#[syntax(annotate(Message, ...))]` require the
//! type to implement `descent::Verify`, `descent::OnFailed` and
//! `descent::Annotate<Message>` respectively.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::parse::Parse;
use syn::spanned::Spanned;

#[proc_macro_derive(Syntax, attributes(syntax))]
pub fn derive_syntax(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);
    match expand(input) {
        Ok(tokens) => tokens.into(),
        Err(error) => error.to_compile_error().into(),
    }
}

fn expand(input: syn::DeriveInput) -> syn::Result<TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "#[derive(Syntax)] does not support generic types",
        ));
    }
    let attrs = SyntaxAttrs::parse(&input.attrs)?;
    match &input.data {
        syn::Data::Struct(data) => expand_struct(&input.ident, &attrs, data),
        syn::Data::Enum(data) => expand_enum(&input.ident, &attrs, data),
        syn::Data::Union(_) => Err(syn::Error::new_spanned(
            &input.ident,
            "#[derive(Syntax)] supports structs and enums only",
        )),
    }
}

#[derive(Default)]
struct SyntaxAttrs {
    literal: Option<syn::LitStr>,
    regex: Option<syn::LitStr>,
    leaf: Option<syn::LitStr>,
    tag: Option<syn::LitStr>,
    name: Option<syn::LitStr>,
    verify: bool,
    on_failed: bool,
    annotate: Vec<syn::Type>,
}

impl SyntaxAttrs {
    fn parse(attrs: &[syn::Attribute]) -> syn::Result<Self> {
        let mut out = SyntaxAttrs::default();
        for attr in attrs {
            if !attr.path().is_ident("syntax") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("literal") {
                    out.literal = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("regex") {
                    let pattern: syn::LitStr = meta.value()?.parse()?;
                    if let Err(error) = regex_syntax::parse(&pattern.value()) {
                        return Err(syn::Error::new(
                            pattern.span(),
                            format!("invalid regex pattern: {error}"),
                        ));
                    }
                    out.regex = Some(pattern);
                } else if meta.path.is_ident("leaf") {
                    out.leaf = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("tag") {
                    out.tag = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("name") {
                    out.name = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("verify") {
                    out.verify = true;
                } else if meta.path.is_ident("on_failed") {
                    out.on_failed = true;
                } else if meta.path.is_ident("annotate") {
                    let content;
                    syn::parenthesized!(content in meta.input);
                    let types = content.parse_terminated(syn::Type::parse, syn::Token![,])?;
                    out.annotate.extend(types);
                } else {
                    return Err(meta.error("unknown `syntax` attribute"));
                }
                Ok(())
            })?;
        }
        let leaf_keys = [
            out.literal.is_some(),
            out.regex.is_some(),
            out.leaf.is_some(),
        ];
        if leaf_keys.iter().filter(|set| **set).count() > 1 {
            return Err(syn::Error::new(
                out.literal
                    .as_ref()
                    .or(out.regex.as_ref())
                    .or(out.leaf.as_ref())
                    .unwrap()
                    .span(),
                "`literal`, `regex` and `leaf` are mutually exclusive",
            ));
        }
        Ok(out)
    }

    /// Per-key merge for enum variants: the field's attributes win over the
    /// variant's.
    fn or(self, fallback: Self) -> Self {
        SyntaxAttrs {
            literal: self.literal.or(fallback.literal),
            regex: self.regex.or(fallback.regex),
            leaf: self.leaf.or(fallback.leaf),
            tag: self.tag.or(fallback.tag),
            name: self.name.or(fallback.name),
            verify: self.verify || fallback.verify,
            on_failed: self.on_failed || fallback.on_failed,
            annotate: if self.annotate.is_empty() {
                fallback.annotate
            } else {
                self.annotate
            },
        }
    }
}

enum Wrapper {
    Vec,
    Option,
    Box,
    Ahead,
    Never,
}

/// Split `Vec<T>` and friends into the wrapper and its type argument.
fn peel(ty: &syn::Type) -> Option<(Wrapper, &syn::Type)> {
    let syn::Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    let wrapper = match segment.ident.to_string().as_str() {
        "Vec" => Wrapper::Vec,
        "Option" => Wrapper::Option,
        "Box" => Wrapper::Box,
        "Ahead" => Wrapper::Ahead,
        "Never" => Wrapper::Never,
        _ => return None,
    };
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        syn::GenericArgument::Type(inner) => Some((wrapper, inner)),
        _ => None,
    }
}

fn is_ident(ty: &syn::Type, name: &str) -> bool {
    match ty {
        syn::Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == name),
        _ => false,
    }
}

/// The expression registering a field's rule, with `__g` in scope.
fn rule_expr(ty: &syn::Type, attrs: &SyntaxAttrs) -> syn::Result<TokenStream> {
    if let Some((wrapper, inner)) = peel(ty) {
        let child = rule_expr(inner, attrs)?;
        return Ok(match wrapper {
            Wrapper::Vec => quote! {{ let __child = #child; __g.repeat(__child) }},
            Wrapper::Option => quote! {{ let __child = #child; __g.optional(__child) }},
            Wrapper::Box => child,
            Wrapper::Ahead => quote! {{ let __child = #child; __g.ahead(__child) }},
            Wrapper::Never => {
                let name = attrs.name.as_ref().ok_or_else(|| {
                    syn::Error::new(
                        ty.span(),
                        "`Never<_>` fields need #[syntax(name = \"...\")]",
                    )
                })?;
                quote! {{ let __child = #child; __g.not(#name, __child) }}
            }
        });
    }
    if let Some(text) = &attrs.literal {
        return Ok(quote! { __g.literal(#text) });
    }
    if let Some(pattern) = &attrs.regex {
        return Ok(quote! { __g.regex(#pattern) });
    }
    if let Some(leaf) = &attrs.leaf {
        let tag = match &attrs.tag {
            Some(tag) => quote! { ::core::option::Option::Some(#tag) },
            None => quote! { ::core::option::Option::None },
        };
        return Ok(quote! { __g.leaf(#leaf, #tag) });
    }
    if is_ident(ty, "Text") {
        return Err(syn::Error::new(
            ty.span(),
            "`Text` fields need #[syntax(literal = \"...\")] or #[syntax(regex = \"...\")]",
        ));
    }
    Ok(quote! { __g.rule_of::<#ty>() })
}

fn expand_struct(
    ident: &syn::Ident,
    attrs: &SyntaxAttrs,
    data: &syn::DataStruct,
) -> syn::Result<TokenStream> {
    let syn::Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            ident,
            "#[derive(Syntax)] structs need named fields",
        ));
    };
    let mut rule_lets = Vec::new();
    let mut entries = Vec::new();
    let mut builds = Vec::new();
    for (index, field) in fields.named.iter().enumerate() {
        let field_attrs = SyntaxAttrs::parse(&field.attrs)?;
        let rule = rule_expr(&field.ty, &field_attrs)?;
        let var = format_ident!("__rule{}", index);
        let name = field.ident.as_ref().unwrap();
        let name_str = name.to_string();
        let ty = &field.ty;
        rule_lets.push(quote! { let #var = #rule; });
        entries.push(quote! { ::descent::Field::new(#name_str, #var) });
        builds.push(quote! {
            #name: <#ty as ::descent::FromValue>::build(
                __fields
                    .next()
                    .expect("internal error: missing sequence field")
                    .1,
            ),
        });
    }
    let hooks = hook_registrations(ident, attrs);
    Ok(quote! {
        #[automatically_derived]
        impl ::descent::FromValue for #ident {
            fn build(__value: ::descent::Value) -> Self {
                let ::descent::Value::Record(__fields) = __value else {
                    ::core::panic!("internal error: expected record value");
                };
                let mut __fields = __fields.into_iter();
                Self { #(#builds)* }
            }
        }
        #[automatically_derived]
        impl ::descent::Syntax for #ident {
            fn register(__g: &mut ::descent::Grammar) -> ::descent::RuleId {
                #(#rule_lets)*
                let __rule = __g.sequence(::std::vec![ #(#entries),* ]);
                #hooks
                __rule
            }
        }
    })
}

fn expand_enum(
    ident: &syn::Ident,
    attrs: &SyntaxAttrs,
    data: &syn::DataEnum,
) -> syn::Result<TokenStream> {
    let choice_name = attrs
        .name
        .as_ref()
        .map(syn::LitStr::value)
        .unwrap_or_else(|| ident.to_string());
    let mut rule_lets = Vec::new();
    let mut alts = Vec::new();
    let mut build_arms = Vec::new();
    for (index, variant) in data.variants.iter().enumerate() {
        let syn::Fields::Unnamed(fields) = &variant.fields else {
            return Err(syn::Error::new_spanned(
                variant,
                "#[derive(Syntax)] enum variants need exactly one unnamed field",
            ));
        };
        if fields.unnamed.len() != 1 {
            return Err(syn::Error::new_spanned(
                variant,
                "#[derive(Syntax)] enum variants need exactly one unnamed field",
            ));
        }
        let field = &fields.unnamed[0];
        let merged =
            SyntaxAttrs::parse(&field.attrs)?.or(SyntaxAttrs::parse(&variant.attrs)?);
        let rule = rule_expr(&field.ty, &merged)?;
        let var = format_ident!("__alt{}", index);
        let variant_ident = &variant.ident;
        let variant_name = variant_ident.to_string();
        let ty = &field.ty;
        rule_lets.push(quote! { let #var = #rule; });
        alts.push(quote! { (#variant_name, #var) });
        build_arms.push(quote! {
            #index => Self::#variant_ident(<#ty as ::descent::FromValue>::build(*__value)),
        });
    }
    let hooks = hook_registrations(ident, attrs);
    Ok(quote! {
        #[automatically_derived]
        impl ::descent::FromValue for #ident {
            fn build(__value: ::descent::Value) -> Self {
                let ::descent::Value::Variant { index: __index, value: __value, .. } = __value
                else {
                    ::core::panic!("internal error: expected variant value");
                };
                match __index {
                    #(#build_arms)*
                    _ => ::core::panic!("internal error: choice index out of range"),
                }
            }
        }
        #[automatically_derived]
        impl ::descent::Syntax for #ident {
            fn register(__g: &mut ::descent::Grammar) -> ::descent::RuleId {
                #(#rule_lets)*
                let __rule = __g.choice(#choice_name, ::std::vec![ #(#alts),* ]);
                #hooks
                __rule
            }
        }
    })
}

fn hook_registrations(ident: &syn::Ident, attrs: &SyntaxAttrs) -> TokenStream {
    let mut out = TokenStream::new();
    if attrs.verify {
        out.extend(quote! {
            __g.verify(__rule, |__value| {
                <#ident as ::descent::Verify>::verify(
                    &<#ident as ::descent::FromValue>::build(__value.clone()),
                )
            });
        });
    }
    if attrs.on_failed {
        out.extend(quote! {
            __g.on_failed(__rule, || <#ident as ::descent::OnFailed>::failed());
        });
    }
    if !attrs.annotate.is_empty() {
        let arms = attrs.annotate.iter().map(|message_ty| {
            quote! {
                if let ::core::option::Option::Some(__message) =
                    __message.downcast_ref::<#message_ty>()
                {
                    return ::core::option::Option::Some(
                        <#ident as ::descent::Annotate<#message_ty>>::annotate(
                            &<#ident as ::descent::FromValue>::build(__value.clone()),
                            __message,
                        ),
                    );
                }
            }
        });
        out.extend(quote! {
            __g.annotate(__rule, |__value, __message| {
                #(#arms)*
                ::core::option::Option::None
            });
        });
    }
    out
}
