//! Record derive macro implementation

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{parse_macro_input, Data, DataStruct, DeriveInput, Fields};

use crate::attributes::{self, Policy};

/// Derive macro for `Record` - generates static field descriptors
///
/// For each field an accessor fn is generated next to a static descriptor
/// array, so `Record::fields()` returns the same `&'static` slice on every
/// call without allocation.
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Record cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(DataStruct {
            fields: Fields::Named(fields),
            ..
        }) => &fields.named,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Record can only be derived for structs with named fields",
            ))
        }
    };

    let table_name = attributes::extract_table_name(&input.attrs)?;
    let identifier = attributes::extract_identifier(&input.attrs)?;
    let identifier_column = identifier.clone().unwrap_or_else(|| "id".to_string());

    let mut columns: Vec<String> = Vec::new();
    let mut identifier_value = None;
    let mut accessors = Vec::new();
    let mut descriptors = Vec::new();

    for field in fields {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let column = attributes::extract_column_name(field)?
            .unwrap_or_else(|| field_name.unraw().to_string());
        if columns.contains(&column) {
            return Err(syn::Error::new_spanned(
                field,
                format!("duplicate column `{column}`"),
            ));
        }

        let accessor = format_ident!("__tablekit_{}", field_name.unraw());
        let policy = attributes::extract_policy(field)?;
        if column == identifier_column && policy != Policy::Json {
            // Read the field itself; a skipped identifier's descriptor yields NULL.
            identifier_value = Some(quote! {
                fn identifier_value(&self) -> ::core::option::Option<::tablekit::sea_query::Value> {
                    ::core::option::Option::Some(::tablekit::sea_query::Value::from(
                        ::core::clone::Clone::clone(&self.#field_name),
                    ))
                }
            });
        }
        let descriptor = match policy {
            Policy::Json => {
                accessors.push(quote! {
                    fn #accessor(record: &#struct_name) -> ::tablekit::serde_json::Result<::std::string::String> {
                        ::tablekit::serde_json::to_string(&record.#field_name)
                    }
                });
                quote! { ::tablekit::record::FieldDescriptor::json(#column, #accessor) }
            }
            Policy::SkipWrite => {
                // Never read by the mapper; the field type need not convert to a value.
                accessors.push(quote! {
                    fn #accessor(_: &#struct_name) -> ::tablekit::sea_query::Value {
                        ::tablekit::sea_query::Value::String(::core::option::Option::None)
                    }
                });
                quote! {
                    ::tablekit::record::FieldDescriptor::value(
                        #column,
                        ::tablekit::record::WritePolicy::Excluded,
                        #accessor,
                    )
                }
            }
            policy => {
                let write_policy = if policy == Policy::AutoUuid {
                    quote! { ::tablekit::record::WritePolicy::AutoGenerate }
                } else {
                    quote! { ::tablekit::record::WritePolicy::Default }
                };
                accessors.push(quote! {
                    fn #accessor(record: &#struct_name) -> ::tablekit::sea_query::Value {
                        ::tablekit::sea_query::Value::from(::core::clone::Clone::clone(&record.#field_name))
                    }
                });
                quote! { ::tablekit::record::FieldDescriptor::value(#column, #write_policy, #accessor) }
            }
        };
        descriptors.push(descriptor);
        columns.push(column);
    }

    if let Some(identifier) = &identifier {
        if !columns.contains(identifier) {
            return Err(syn::Error::new(
                struct_name.span(),
                format!("identifier column `{identifier}` is not a field of {struct_name}"),
            ));
        }
    }

    let field_count = descriptors.len();
    let identifier_const = identifier.map(|identifier| {
        quote! { const IDENTIFIER: &'static str = #identifier; }
    });
    let table_name_impl = table_name.map(|table_name| {
        quote! {
            impl ::tablekit::record::TableName for #struct_name {
                const TABLE_NAME: &'static str = #table_name;
            }
        }
    });

    Ok(quote! {
        impl ::tablekit::record::Record for #struct_name {
            #identifier_const

            fn fields() -> &'static [::tablekit::record::FieldDescriptor<Self>] {
                #(#accessors)*

                static FIELDS: [::tablekit::record::FieldDescriptor<#struct_name>; #field_count] = [
                    #(#descriptors),*
                ];
                &FIELDS
            }

            #identifier_value
        }

        #table_name_impl
    })
}
