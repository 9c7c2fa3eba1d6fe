//! Derive macros for `cryptorm`.
//!
//! `#[derive(Record)]` turns a struct with named fields into a
//! `cryptorm::Record`: it declares the table schema from the field types,
//! converts the struct to and from field values, and adds one typed
//! `cryptorm::Column` constant per field for building predicates.

#![warn(clippy::pedantic, clippy::nursery)]

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitStr, Type};

/// Derive macro for persisted records.
///
/// The struct must have named fields, one of which is `id: Id`. Field kinds
/// follow the field types: `Id` for identifiers and relation references,
/// `Hashed` for search fields, `bool`, `i64`/`i32` and `String` for encrypted
/// values.
///
/// # Example
///
/// ```rust,ignore
/// use cryptorm::{Hashed, Id, Record};
///
/// #[derive(Debug, Clone, Record)]
/// #[record(table = "users")]
/// struct User {
///     id: Id,
///     email: Hashed,
///     name: String,
///     team: Id,
/// }
///
/// // Generated: User::ID, User::EMAIL, User::NAME, User::TEAM
/// ```
///
/// Without `#[record(table = "...")]` the table is the struct name in
/// `snake_case`.
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input).unwrap_or_else(syn::Error::into_compile_error).into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let vis = &input.vis;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Record cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Record can only be derived for structs with named fields",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(name, "Record can only be derived for structs")),
    };

    let table = table_name(input)?;

    let mut has_id = false;
    let mut descriptors = Vec::new();
    let mut to_values = Vec::new();
    let mut from_values = Vec::new();
    let mut columns = Vec::new();

    for field in fields {
        let ident = field.ident.as_ref().ok_or_else(|| {
            syn::Error::new_spanned(field, "Record fields must be named")
        })?;
        let ty = &field.ty;
        let column = ident.to_string().trim_start_matches("r#").to_string();

        if column == "id" {
            if !is_id_type(ty) {
                return Err(syn::Error::new_spanned(ty, "the `id` field must have type `Id`"));
            }
            has_id = true;
        }

        descriptors.push(quote! {
            ::cryptorm::FieldDescriptor::new(#column, <#ty as ::cryptorm::FieldType>::KIND)
        });
        to_values.push(quote! { ::cryptorm::FieldType::to_value(&self.#ident) });
        from_values.push(quote! { #ident: values.take::<#ty>(#column)? });

        let constant = format_ident!("{}", column.to_uppercase());
        let doc = format!("Column reference to `{table}.{column}`.");
        columns.push(quote! {
            #[doc = #doc]
            #vis const #constant: ::cryptorm::Column<Self, #ty> = ::cryptorm::Column::new(#column);
        });
    }

    if !has_id {
        return Err(syn::Error::new(
            Span::call_site(),
            format!("`{name}` needs an `id: Id` field to derive Record"),
        ));
    }

    Ok(quote! {
        impl #impl_generics ::cryptorm::Record for #name #ty_generics #where_clause {
            fn schema() -> &'static ::cryptorm::TableSchema {
                static SCHEMA: ::cryptorm::TableSchema =
                    ::cryptorm::TableSchema::new(#table, &[#(#descriptors),*]);
                &SCHEMA
            }

            fn id(&self) -> i64 {
                self.id.get()
            }

            fn set_id(&mut self, id: i64) {
                self.id = ::cryptorm::Id::new(id);
            }

            fn values(&self) -> ::std::vec::Vec<::cryptorm::Value> {
                ::std::vec![#(#to_values),*]
            }

            fn from_values(
                mut values: ::cryptorm::RecordValues,
            ) -> ::core::result::Result<Self, ::cryptorm::Error> {
                ::core::result::Result::Ok(Self { #(#from_values),* })
            }
        }

        impl #impl_generics #name #ty_generics #where_clause {
            #(#columns)*
        }
    })
}

fn table_name(input: &DeriveInput) -> syn::Result<String> {
    let mut table = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("record") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value: LitStr = meta.value()?.parse()?;
                table = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported record attribute, expected `table`"))
            }
        })?;
    }
    Ok(table.unwrap_or_else(|| snake_case(&input.ident.to_string())))
}

fn is_id_type(ty: &Type) -> bool {
    match ty {
        Type::Path(path) => path.path.segments.last().is_some_and(|s| s.ident == "Id"),
        _ => false,
    }
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
