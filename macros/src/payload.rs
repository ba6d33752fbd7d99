use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_quote, Attribute, Data, DataEnum, DataStruct, DeriveInput, Fields, GenericParam,
    Generics, Ident, Index, Path, Type, Variant,
};

struct BodyInfo {
    ident: Ident,
    generics: Generics,
    path: Path,
}

fn get_repr<'a>(mut attrs: impl Iterator<Item = &'a Attribute>) -> Type {
    attrs
        .find(|&attr| attr.path().is_ident("repr"))
        .expect("Enum must have #[repr(...)] attribute.")
        .parse_args()
        .expect("#[repr(...) can only have one type.")
}

/// Every type parameter must itself be a payload.
fn bound_generics(mut generics: Generics, path: &Path) -> Generics {
    for param in generics.params.iter_mut() {
        if let GenericParam::Type(ty) = param {
            ty.bounds.push(parse_quote!(#path::Payload));
        }
    }

    generics
}

fn build_tags<'a>(variants: impl Iterator<Item = &'a &'a Variant>) -> Vec<TokenStream2> {
    let mut tags = Vec::new();
    let mut i = 0; // offset from the last explicit discriminant
    let mut last_anchor = quote! { 0 };

    for variant in variants {
        if let Some((_, tag)) = &variant.discriminant {
            let tokens = quote! { #tag };
            tags.push(tokens.clone());
            i = 0;
            last_anchor = tokens;
        } else {
            let rendered_offset = Index::from(i);
            tags.push(quote! { #last_anchor + #rendered_offset });
        }
        i += 1;
    }

    tags
}

fn sum_len(types: &[&Type], path: &Path) -> TokenStream2 {
    quote! { 0 #( + <#types as #path::Payload>::LEN )* }
}

fn derive_struct(s: DataStruct, info: &BodyInfo) -> TokenStream2 {
    let implementer = &info.ident;
    let path = &info.path;
    let (impl_generics, ty_generics, where_clause) = info.generics.split_for_impl();

    let types: Vec<_> = s.fields.iter().map(|field| &field.ty).collect();
    let len = sum_len(&types, path);

    let (encode_body, decode_body) = match &s.fields {
        Fields::Unit => (
            quote! {
                let _ = dst;
                Ok(())
            },
            quote! {
                let _ = src;
                Ok(Self)
            },
        ),
        Fields::Unnamed(fields) => {
            let positions: Vec<_> = fields
                .unnamed
                .iter()
                .enumerate()
                .map(|(i, _)| Index::from(i))
                .collect();

            (
                quote! {
                    let mut dst = dst.into_iter();

                    #(
                        #path::Payload::encode_iter(&self.#positions, &mut dst)?;
                    )*

                    Ok(())
                },
                quote! {
                    let mut src = src.into_iter();

                    Ok(
                        Self(
                            #(
                                <#types as #path::Payload>::decode_iter(&mut src)?,
                            )*
                        )
                    )
                },
            )
        }
        Fields::Named(fields) => {
            let idents: Vec<_> = fields
                .named
                .iter()
                .map(|field| field.ident.as_ref().unwrap())
                .collect();

            (
                quote! {
                    let mut dst = dst.into_iter();

                    #(
                        #path::Payload::encode_iter(&self.#idents, &mut dst)?;
                    )*

                    Ok(())
                },
                quote! {
                    let mut src = src.into_iter();

                    Ok(
                        Self {
                            #(
                                #idents: <#types as #path::Payload>::decode_iter(&mut src)?,
                            )*
                        }
                    )
                },
            )
        }
    };

    quote! {
        impl #impl_generics #path::Payload for #implementer #ty_generics #where_clause {
            const LEN: usize = #len;

            fn encode_iter<'a>(
                &self,
                dst: impl IntoIterator<Item = &'a mut u8>,
            ) -> Result<(), #path::error::EndOfInput> {
                #encode_body
            }

            fn decode_iter<'a>(
                src: impl IntoIterator<Item = &'a u8>,
            ) -> Result<Self, #path::error::Error> {
                #decode_body
            }
        }
    }
}

fn derive_enum(e: DataEnum, info: &BodyInfo, repr: Type) -> TokenStream2 {
    let implementer = &info.ident;
    let path = &info.path;
    let (impl_generics, ty_generics, where_clause) = info.generics.split_for_impl();
    let variants: Vec<_> = e.variants.iter().collect();

    let tags = build_tags(variants.iter());
    let tag_consts: Vec<_> = variants
        .iter()
        .map(|variant| {
            format_ident!(
                "{}_TAG",
                inflector::cases::screamingsnakecase::to_screaming_snake_case(
                    &variant.ident.to_string()
                )
            )
        })
        .collect();

    let encode_arms: Vec<_> = variants
        .iter()
        .zip(tag_consts.iter())
        .map(|(variant, tag_const)| {
            let ident = &variant.ident;
            match &variant.fields {
                Fields::Unit => quote! {
                    Self::#ident => #path::Payload::encode_iter(&#tag_const, &mut dst)
                },
                Fields::Unnamed(fields) => {
                    let bindings: Vec<_> = (0..fields.unnamed.len())
                        .map(|i| format_ident!("v{i}"))
                        .collect();

                    quote! {
                        Self::#ident(#(#bindings),*) => {
                            #path::Payload::encode_iter(&#tag_const, &mut dst)?;
                            #(
                                #path::Payload::encode_iter(#bindings, &mut dst)?;
                            )*

                            Ok(())
                        }
                    }
                }
                Fields::Named(fields) => {
                    let idents: Vec<_> = fields
                        .named
                        .iter()
                        .map(|field| field.ident.as_ref().unwrap())
                        .collect();

                    quote! {
                        Self::#ident { #(#idents),* } => {
                            #path::Payload::encode_iter(&#tag_const, &mut dst)?;
                            #(
                                #path::Payload::encode_iter(#idents, &mut dst)?;
                            )*

                            Ok(())
                        }
                    }
                }
            }
        })
        .collect();

    let decode_arms: Vec<_> = variants
        .iter()
        .zip(tag_consts.iter())
        .map(|(variant, tag_const)| {
            let ident = &variant.ident;
            match &variant.fields {
                Fields::Unit => quote! {
                    #tag_const => Ok(Self::#ident)
                },
                Fields::Unnamed(fields) => {
                    let types: Vec<_> = fields.unnamed.iter().map(|field| &field.ty).collect();

                    quote! {
                        #tag_const => Ok(Self::#ident(
                            #(
                                <#types as #path::Payload>::decode_iter(&mut src)?,
                            )*
                        ))
                    }
                }
                Fields::Named(fields) => {
                    let idents: Vec<_> = fields
                        .named
                        .iter()
                        .map(|field| field.ident.as_ref().unwrap())
                        .collect();
                    let types: Vec<_> = fields.named.iter().map(|field| &field.ty).collect();

                    quote! {
                        #tag_const => Ok(Self::#ident {
                            #(
                                #idents: <#types as #path::Payload>::decode_iter(&mut src)?,
                            )*
                        })
                    }
                }
            }
        })
        .collect();

    // widest variant plus the tag
    let widths: Vec<_> = variants
        .iter()
        .filter(|variant| !variant.fields.is_empty())
        .map(|variant| {
            let types: Vec<_> = variant.fields.iter().map(|field| &field.ty).collect();
            sum_len(&types, path)
        })
        .collect();

    let len = quote! {{
        #[allow(unused_mut)]
        let mut max = 0;

        #(
            if #widths > max {
                max = #widths;
            }
        )*

        max + <#repr as #path::Payload>::LEN
    }};

    quote! {
        impl #impl_generics #path::Payload for #implementer #ty_generics #where_clause {
            const LEN: usize = #len;

            fn encode_iter<'a>(
                &self,
                dst: impl IntoIterator<Item = &'a mut u8>,
            ) -> Result<(), #path::error::EndOfInput> {
                let mut dst = dst.into_iter();

                #(
                    const #tag_consts: #repr = #tags;
                )*

                match self {
                    #(
                        #encode_arms,
                    )*
                }
            }

            fn decode_iter<'a>(
                src: impl IntoIterator<Item = &'a u8>,
            ) -> Result<Self, #path::error::Error> {
                let mut src = src.into_iter();

                #(
                    const #tag_consts: #repr = #tags;
                )*

                let tag = <#repr as #path::Payload>::decode_iter(&mut src)?;

                match tag {
                    #(
                        #decode_arms,
                    )*
                    _ => Err(#path::error::Error::Invalid),
                }
            }
        }
    }
}

pub fn derive(item: TokenStream) -> TokenStream {
    let item: DeriveInput = syn::parse2(item.into()).unwrap();
    let path: Path = parse_quote! { can_ha_payload };

    let info = BodyInfo {
        ident: item.ident,
        generics: bound_generics(item.generics, &path),
        path,
    };

    let implementation = match item.data {
        Data::Struct(s) => derive_struct(s, &info),
        Data::Enum(e) => derive_enum(e, &info, get_repr(item.attrs.iter())),
        _ => panic!("Payload can only be derived for structs and enums."),
    };

    implementation.into()
}
