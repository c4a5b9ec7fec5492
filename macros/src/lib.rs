//! Derive macros for Reqchain
//!
//! This crate provides `#[derive(Reflect)]`, which generates the accessor
//! table that lets path expressions like `Items[-1].NextToken` reach into a
//! struct without hand-written glue.
//!
//! # Example
//!
//! ```ignore
//! use reqchain_macros::Reflect;
//!
//! #[derive(Reflect, Clone, Debug, Default)]
//! struct ListUsersOutput {
//!     users: Vec<User>,
//!     next_marker: Option<String>,
//!     #[reflect(rename = "IsTruncated")]
//!     truncated: Option<bool>,
//!     #[reflect(hidden)]
//!     raw: String,
//! }
//!
//! // Reachable paths: "Users", "Users[0]...", "NextMarker", "IsTruncated"
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, Ident, LitStr, parse_macro_input};

/// Derive macro for reflectable structs
///
/// Implements `Reflect` and `Struct` from `reqchain_core::reflect`:
/// - `kind()` is `Kind::Struct`
/// - `fields()` returns a static accessor table in declaration order
/// - `field()` / `field_mut()` look slots up by path name
/// - `set()` accepts another value of the same type
///
/// Path names are the PascalCase form of the Rust field name, so
/// `next_token` is addressed as `NextToken`.
///
/// # Attributes
///
/// - `#[reflect(rename = "Name")]` - Use a different path name
/// - `#[reflect(hidden)]` - List the field but never let a path reach it
/// - `#[reflect(required)]` - Parameter validation reports the field when unset
///
/// Every field type must itself implement `Reflect`, and the struct must be
/// `Clone`.
///
/// # Panics
///
/// This macro will produce a compile error (not a runtime panic) if:
/// - Applied to an enum, a union or a tuple struct
/// - A renamed path name does not match `[A-Z][A-Za-z0-9_]*`
/// - Two fields end up with the same path name
#[proc_macro_derive(Reflect, attributes(reflect))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_reflect(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(error) => error.to_compile_error().into(),
    }
}

/// Field options collected from `#[reflect(...)]`
#[derive(Default)]
struct FieldOptions {
    rename: Option<LitStr>,
    hidden: bool,
    required: bool,
}

struct ReflectedField<'a> {
    ident: &'a Ident,
    path_name: String,
    hidden: bool,
    required: bool,
}

fn expand_reflect(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    let Data::Struct(data_struct) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            "#[derive(Reflect)] can only be used on structs",
        ));
    };
    let Fields::Named(named) = &data_struct.fields else {
        return Err(syn::Error::new_spanned(
            &data_struct.fields,
            "#[derive(Reflect)] requires named fields",
        ));
    };

    let mut fields: Vec<ReflectedField<'_>> = Vec::new();
    for field in &named.named {
        let Some(ident) = field.ident.as_ref() else {
            return Err(syn::Error::new_spanned(field, "field must have a name"));
        };
        let options = field_options(&field.attrs)?;
        let path_name = match &options.rename {
            Some(rename) => {
                let value = rename.value();
                if !is_exported_name(&value) {
                    return Err(syn::Error::new_spanned(
                        rename,
                        "path name must match [A-Z][A-Za-z0-9_]*",
                    ));
                }
                value
            }
            None => pascal_case(&ident.to_string()),
        };
        if fields.iter().any(|existing| existing.path_name == path_name) {
            return Err(syn::Error::new_spanned(
                field,
                format!("duplicate path name `{path_name}`"),
            ));
        }
        fields.push(ReflectedField {
            ident,
            path_name,
            hidden: options.hidden,
            required: options.required,
        });
    }

    let table = fields.iter().map(|field| {
        let path_name = &field.path_name;
        let required = field.required;
        let access = if field.hidden {
            quote! { ::reqchain_core::reflect::Access::Hidden }
        } else {
            quote! { ::reqchain_core::reflect::Access::Public }
        };
        quote! {
            ::reqchain_core::reflect::FieldInfo::new(#path_name, #access, #required),
        }
    });

    // Hidden fields are listed in the table but have no slot.
    let visible: Vec<&ReflectedField<'_>> = fields.iter().filter(|field| !field.hidden).collect();
    let get_arms = visible.iter().map(|field| {
        let path_name = &field.path_name;
        let ident = field.ident;
        quote! { #path_name => ::core::option::Option::Some(&self.#ident as &dyn ::reqchain_core::reflect::Reflect), }
    });
    let get_mut_arms = visible.iter().map(|field| {
        let path_name = &field.path_name;
        let ident = field.ident;
        quote! { #path_name => ::core::option::Option::Some(&mut self.#ident as &mut dyn ::reqchain_core::reflect::Reflect), }
    });

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::reqchain_core::reflect::Reflect for #name #ty_generics #where_clause {
            fn kind(&self) -> ::reqchain_core::reflect::Kind {
                ::reqchain_core::reflect::Kind::Struct
            }

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::core::any::Any {
                self
            }

            fn into_any(
                self: ::std::boxed::Box<Self>,
            ) -> ::std::boxed::Box<dyn ::core::any::Any> {
                self
            }

            fn clone_value(&self) -> ::std::boxed::Box<dyn ::reqchain_core::reflect::Reflect> {
                ::std::boxed::Box::new(::core::clone::Clone::clone(self))
            }

            fn set(
                &mut self,
                value: ::std::boxed::Box<dyn ::reqchain_core::reflect::Reflect>,
            ) -> ::core::result::Result<(), ::std::boxed::Box<dyn ::reqchain_core::reflect::Reflect>> {
                ::reqchain_core::reflect::assign(self, value)
            }

            fn as_struct(&self) -> ::core::option::Option<&dyn ::reqchain_core::reflect::Struct> {
                ::core::option::Option::Some(self)
            }

            fn as_struct_mut(
                &mut self,
            ) -> ::core::option::Option<&mut dyn ::reqchain_core::reflect::Struct> {
                ::core::option::Option::Some(self)
            }
        }

        impl #impl_generics ::reqchain_core::reflect::Struct for #name #ty_generics #where_clause {
            fn fields(&self) -> &'static [::reqchain_core::reflect::FieldInfo] {
                const FIELDS: &[::reqchain_core::reflect::FieldInfo] = &[
                    #(#table)*
                ];
                FIELDS
            }

            fn field(
                &self,
                name: &str,
            ) -> ::core::option::Option<&dyn ::reqchain_core::reflect::Reflect> {
                match name {
                    #(#get_arms)*
                    _ => ::core::option::Option::None,
                }
            }

            fn field_mut(
                &mut self,
                name: &str,
            ) -> ::core::option::Option<&mut dyn ::reqchain_core::reflect::Reflect> {
                match name {
                    #(#get_mut_arms)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    })
}

fn field_options(attrs: &[Attribute]) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("reflect")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                options.rename = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("hidden") {
                options.hidden = true;
                Ok(())
            } else if meta.path.is_ident("required") {
                options.required = true;
                Ok(())
            } else {
                Err(meta.error("expected `rename = \"...\"`, `hidden` or `required`"))
            }
        })?;
    }
    Ok(options)
}

/// `next_token` -> `NextToken`, `r#type` -> `Type`
fn pascal_case(ident: &str) -> String {
    let ident = ident.strip_prefix("r#").unwrap_or(ident);
    ident
        .split('_')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect()
}

fn is_exported_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|first| first.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case("next_token"), "NextToken");
        assert_eq!(pascal_case("c"), "C");
        assert_eq!(pascal_case("is_truncated"), "IsTruncated");
        assert_eq!(pascal_case("r#type"), "Type");
        assert_eq!(pascal_case("max_items_2"), "MaxItems2");
    }

    #[test]
    fn test_is_exported_name() {
        assert!(is_exported_name("NextToken"));
        assert!(is_exported_name("A_1"));
        assert!(!is_exported_name("nextToken"));
        assert!(!is_exported_name(""));
        assert!(!is_exported_name("Next-Token"));
    }
}
