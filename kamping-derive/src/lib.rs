//! `#[derive(Equivalence)]` for structs and fieldless enums.
//!
//! Structs map onto a struct datatype with one block per field, placed at the field offset.
//! Fieldless enums need a `#[repr(..)]` with a primitive integer and map onto its datatype.
//!
//! The generated code names the kamping crate as `::kamping`. A renamed dependency is selected
//! with `#[kamping(crate = "::renamed")]`.

type TokenStream1 = proc_macro::TokenStream;
type TokenStream2 = proc_macro2::TokenStream;

use quote::{quote, ToTokens};
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Error, Fields, LitStr, Path};

#[proc_macro_derive(Equivalence, attributes(kamping))]
pub fn derive_equivalence(input: TokenStream1) -> TokenStream1 {
    let ast = syn::parse_macro_input!(input as DeriveInput);
    expand(&ast)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

fn expand(ast: &DeriveInput) -> syn::Result<TokenStream2> {
    if !ast.generics.params.is_empty() {
        return Err(Error::new(
            ast.generics.span(),
            "#[derive(Equivalence)] does not support generic types",
        ));
    }
    let krate = crate_path(ast)?;
    match &ast.data {
        Data::Struct(data) => Ok(equivalence_for_struct(&krate, ast, &data.fields)),
        Data::Enum(data) => {
            if let Some(variant) = data.variants.iter().find(|v| !v.fields.is_empty()) {
                return Err(Error::new(
                    variant.span(),
                    "#[derive(Equivalence)] only supports enums without fields",
                ));
            }
            let repr = enum_repr(ast)?;
            Ok(equivalence_for_enum(&krate, ast, &repr))
        }
        Data::Union(_) => Err(Error::new(
            ast.ident.span(),
            "#[derive(Equivalence)] is not compatible with unions",
        )),
    }
}

/// The path of the kamping crate, `::kamping` unless overridden.
fn crate_path(ast: &DeriveInput) -> syn::Result<Path> {
    let mut path: Path = syn::parse_quote!(::kamping);
    for attr in ast.attrs.iter().filter(|attr| attr.path().is_ident("kamping")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("crate") {
                let value: LitStr = meta.value()?.parse()?;
                path = value.parse()?;
                Ok(())
            } else {
                Err(meta.error("unknown kamping attribute"))
            }
        })?;
    }
    Ok(path)
}

const INTEGER_REPRS: &[&str] = &[
    "i8", "i16", "i32", "i64", "isize", "u8", "u16", "u32", "u64", "usize",
];

fn enum_repr(ast: &DeriveInput) -> syn::Result<syn::Ident> {
    let mut repr = None;
    for attr in ast.attrs.iter().filter(|attr| attr.path().is_ident("repr")) {
        attr.parse_nested_meta(|meta| {
            if let Some(ident) = meta.path.get_ident() {
                if INTEGER_REPRS.contains(&ident.to_string().as_str()) {
                    repr = Some(ident.clone());
                }
            }
            Ok(())
        })?;
    }
    repr.ok_or_else(|| {
        Error::new(
            ast.ident.span(),
            "#[derive(Equivalence)] on enums needs a primitive integer #[repr]",
        )
    })
}

fn equivalence_for_enum(krate: &Path, ast: &DeriveInput, repr: &syn::Ident) -> TokenStream2 {
    let ident = &ast.ident;
    quote! {
        unsafe impl #krate::datatype::Equivalence for #ident {
            const CATEGORY: #krate::datatype::TypeCategory =
                <#repr as #krate::datatype::Equivalence>::CATEGORY;
            fn equivalent_datatype() -> #krate::datatype::Datatype {
                <#repr as #krate::datatype::Equivalence>::equivalent_datatype()
            }
        }
    }
}

fn equivalence_for_struct(krate: &Path, ast: &DeriveInput, fields: &Fields) -> TokenStream2 {
    let ident = &ast.ident;
    let members: Vec<TokenStream2> = match fields {
        Fields::Named(named) => named
            .named
            .iter()
            .filter_map(|field| field.ident.as_ref().map(ToTokens::to_token_stream))
            .collect(),
        Fields::Unnamed(unnamed) => (0..unnamed.unnamed.len())
            .map(|index| syn::Index::from(index).to_token_stream())
            .collect(),
        Fields::Unit => Vec::new(),
    };
    let types = fields.iter().map(|field| &field.ty);

    quote! {
        unsafe impl #krate::datatype::Equivalence for #ident {
            const CATEGORY: #krate::datatype::TypeCategory =
                #krate::datatype::TypeCategory::Struct;
            fn equivalent_datatype() -> #krate::datatype::Datatype {
                #krate::datatype::registry::cached_datatype::<Self>(|| {
                    let fields = [#(
                        (
                            #krate::__private::memoffset::offset_of!(#ident, #members)
                                as #krate::ffi::MPI_Aint,
                            <#types as #krate::datatype::Equivalence>::equivalent_datatype(),
                        )
                    ),*];
                    #krate::datatype::Datatype::structured::<Self>(&fields)
                })
            }
        }
    }
}
