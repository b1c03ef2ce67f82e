//! Derive macro for `flagtree::Reflect`.
//!
//! On a struct with named fields, generates `Reflect` and `Record` so the
//! struct can be walked as a record. With `#[flag(value)]` on the type,
//! generates a `Reflect` impl that reports the type as an extension leaf; the
//! type must also implement `flagtree::FlagValue`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Expr, Fields, Lit, Meta, Visibility, parse_macro_input};

/// Derives `flagtree::Reflect`.
///
/// Field attributes:
/// * `#[flag(skip)]` - never bind this field
/// * `#[flag(flatten)]` - merge a nested record's fields into the parent's namespace
/// * `#[flag(rename = "name")]` - use `name` as the path segment
/// * `#[flag(help = "text")]` - help text; defaults to the doc comment
/// * `#[flag(required)]` - fail instead of allocating when the field is a nil `Option`
///
/// Fields that are not `pub` are skipped unless flattened.
///
/// ```ignore
/// #[derive(Default, Reflect)]
/// pub struct Server {
///     /// Address to listen on.
///     pub host: String,
///     #[flag(rename = "listen-port")]
///     pub port: u32,
/// }
/// ```
#[proc_macro_derive(Reflect, attributes(flag))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    if type_is_value(&input.attrs)? {
        return Ok(extension(input));
    }

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            "Reflect can only be derived for structs, or for types marked #[flag(value)]",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new_spanned(
            input,
            "Reflect requires named fields; mark leaf types with #[flag(value)]",
        ));
    };

    let mut descriptors = Vec::new();
    let mut reads = Vec::new();
    let mut writes = Vec::new();

    for field in &named.named {
        let options = FieldOptions::parse(&field.attrs)?;
        let public = matches!(field.vis, Visibility::Public(_));
        if options.skip || !(public || options.flatten) {
            continue;
        }

        let Some(ident) = &field.ident else {
            continue;
        };
        let index = descriptors.len();
        let name = options
            .rename
            .unwrap_or_else(|| ident.to_string().trim_start_matches("r#").to_string());
        let help = match options.help.or_else(|| doc_comment(&field.attrs)) {
            Some(text) => quote! { ::core::option::Option::Some(#text) },
            None => quote! { ::core::option::Option::None },
        };
        let flatten = options.flatten;
        let required = options.required;

        descriptors.push(quote! {
            ::flagtree::Field {
                name: #name,
                help: #help,
                flatten: #flatten,
                required: #required,
            }
        });
        reads.push(quote! {
            #index => ::core::option::Option::Some(&self.#ident as &dyn ::flagtree::Reflect)
        });
        writes.push(quote! {
            #index => ::core::option::Option::Some(&mut self.#ident as &mut dyn ::flagtree::Reflect)
        });
    }

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::flagtree::Reflect for #ident #ty_generics #where_clause {
            fn node(&self) -> ::flagtree::Node<'_> {
                ::flagtree::Node::Record(self)
            }

            fn node_mut(&mut self) -> ::flagtree::NodeMut<'_> {
                ::flagtree::NodeMut::Record(self)
            }

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::core::any::Any {
                self
            }
        }

        impl #impl_generics ::flagtree::Record for #ident #ty_generics #where_clause {
            fn fields(&self) -> &'static [::flagtree::Field] {
                const FIELDS: &[::flagtree::Field] = &[#(#descriptors),*];
                FIELDS
            }

            fn field(&self, index: usize) -> ::core::option::Option<&dyn ::flagtree::Reflect> {
                match index {
                    #(#reads,)*
                    _ => ::core::option::Option::None,
                }
            }

            fn field_mut(
                &mut self,
                index: usize,
            ) -> ::core::option::Option<&mut dyn ::flagtree::Reflect> {
                match index {
                    #(#writes,)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    })
}

fn extension(input: &DeriveInput) -> TokenStream2 {
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    quote! {
        impl #impl_generics ::flagtree::Reflect for #ident #ty_generics #where_clause {
            fn node(&self) -> ::flagtree::Node<'_> {
                ::flagtree::Node::Extension(self)
            }

            fn node_mut(&mut self) -> ::flagtree::NodeMut<'_> {
                ::flagtree::NodeMut::Extension(self)
            }

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::core::any::Any {
                self
            }
        }
    }
}

/// Whether the type carries `#[flag(value)]`.
fn type_is_value(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut value = false;
    for attr in attrs.iter().filter(|a| a.path().is_ident("flag")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("value") {
                value = true;
                Ok(())
            } else {
                Err(meta.error("unknown type attribute; expected `value`"))
            }
        })?;
    }
    Ok(value)
}

#[derive(Default)]
struct FieldOptions {
    skip: bool,
    flatten: bool,
    required: bool,
    rename: Option<String>,
    help: Option<String>,
}

impl FieldOptions {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut options = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("flag")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    options.skip = true;
                } else if meta.path.is_ident("flatten") {
                    options.flatten = true;
                } else if meta.path.is_ident("required") {
                    options.required = true;
                } else if meta.path.is_ident("rename") {
                    let value: syn::LitStr = meta.value()?.parse()?;
                    options.rename = Some(value.value());
                } else if meta.path.is_ident("help") {
                    let value: syn::LitStr = meta.value()?.parse()?;
                    options.help = Some(value.value());
                } else {
                    return Err(meta.error("unknown flag attribute"));
                }
                Ok(())
            })?;
        }
        Ok(options)
    }
}

/// Doc comment lines, trimmed and joined with spaces.
fn doc_comment(attrs: &[Attribute]) -> Option<String> {
    let text = attrs
        .iter()
        .filter_map(|attr| {
            if !attr.path().is_ident("doc") {
                return None;
            }
            let Meta::NameValue(meta) = &attr.meta else {
                return None;
            };
            let Expr::Lit(expr) = &meta.value else {
                return None;
            };
            let Lit::Str(lit) = &expr.lit else {
                return None;
            };
            Some(lit.value().trim().to_string())
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    (!text.is_empty()).then_some(text)
}
