use crate::derive_utils::apply_derives;
use crate::field_utils::{ensure_leading_fields, snake_case, take_skip_attr};
use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{
    Item, ItemStruct, LitStr, Result, Token, Type, parse::Parse, parse::ParseStream,
    parse_macro_input,
};

/// #[entity] 宏实现
/// - 若缺失则追加字段 `id: IdType`，并置于字段最前
/// - 实现 `::ddd_repository::entity::Entity`（TYPE/id/field/set_field）
/// - 支持参数：`#[entity(id = IdType, name = "...", debug = true|false)]`；
///   - `id` 默认 `String`
///   - `name` 默认结构体名的 snake_case
///   - `debug` 默认 `true`（派生 Debug）。当为 `false` 时不派生 Debug，便于用户自定义实现。
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as EntityAttrConfig);
    let input = parse_macro_input!(item as Item);

    let st = match input {
        Item::Struct(s) => s,
        other => {
            return syn::Error::new(other.span(), "#[entity] only on struct")
                .to_compile_error()
                .into();
        }
    };

    match expand_struct(cfg, st) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_struct(cfg: EntityAttrConfig, mut st: ItemStruct) -> Result<proc_macro2::TokenStream> {
    // 仅支持具名字段结构体
    let fields_named = match &mut st.fields {
        syn::Fields::Named(f) => f,
        _ => return Err(syn::Error::new(st.span(), "only supports named-field struct")),
    };

    let id_type = cfg.id_ty.unwrap_or_else(|| syn::parse_quote! { String });
    ensure_leading_fields(fields_named, &[("id", &id_type)]);

    // 收集参与 field/set_field 的字段，并移除 #[field(..)] 标记
    let mut idents = Vec::new();
    for field in fields_named.named.iter_mut() {
        if take_skip_attr(field)? {
            continue;
        }
        if let Some(ident) = &field.ident {
            idents.push(ident.clone());
        }
    }
    let names: Vec<LitStr> = idents
        .iter()
        .map(|i| LitStr::new(&i.to_string(), i.span()))
        .collect();

    let mut required: Vec<syn::Path> = vec![syn::parse_quote!(Clone)];
    if cfg.derive_debug.unwrap_or(true) {
        required.insert(0, syn::parse_quote!(Debug));
    }
    apply_derives(&mut st.attrs, required);

    let ident = &st.ident;
    let type_name = cfg
        .name
        .unwrap_or_else(|| LitStr::new(&snake_case(&ident.to_string()), ident.span()));
    let (impl_generics, ty_generics, where_clause) = st.generics.split_for_impl();

    Ok(quote! {
        #st

        impl #impl_generics ::ddd_repository::entity::Entity for #ident #ty_generics #where_clause {
            const TYPE: &'static str = #type_name;
            type Id = #id_type;

            fn id(&self) -> &Self::Id { &self.id }

            fn field(&self, name: &str) -> ::std::option::Option<::ddd_repository::value::Value> {
                match name {
                    #( #names => ::std::option::Option::Some(
                        ::ddd_repository::value::ToValue::to_value(&self.#idents)
                    ), )*
                    _ => ::std::option::Option::None,
                }
            }

            fn set_field(
                &mut self,
                name: &str,
                value: ::ddd_repository::value::Value,
            ) -> ::ddd_repository::error::DomainResult<()> {
                match name {
                    #( #names => {
                        self.#idents = ::ddd_repository::value::FromValue::from_value(&value)?;
                    } )*
                    _ => {
                        return ::std::result::Result::Err(
                            ::ddd_repository::error::DomainError::UnknownField {
                                entity_type: <Self as ::ddd_repository::entity::Entity>::TYPE,
                                field: ::std::string::ToString::to_string(name),
                            },
                        );
                    }
                }
                ::std::result::Result::Ok(())
            }
        }
    })
}

// -------- parsing --------

struct EntityAttrConfig {
    id_ty: Option<Type>,
    name: Option<LitStr>,
    derive_debug: Option<bool>,
}

impl Parse for EntityAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut cfg = Self {
            id_ty: None,
            name: None,
            derive_debug: None,
        };

        if input.is_empty() {
            return Ok(cfg);
        }

        let elems: Punctuated<EntityAttrElem, Token![,]> =
            Punctuated::<EntityAttrElem, Token![,]>::parse_terminated(input)?;

        for elem in elems.into_iter() {
            match elem {
                EntityAttrElem::Id(ty) => {
                    if cfg.id_ty.is_some() {
                        return Err(syn::Error::new(ty.span(), "duplicate key 'id' in attribute"));
                    }
                    cfg.id_ty = Some(*ty);
                }
                EntityAttrElem::Name(lit) => {
                    if cfg.name.is_some() {
                        return Err(syn::Error::new(lit.span(), "duplicate key 'name' in attribute"));
                    }
                    if lit.value().is_empty() {
                        return Err(syn::Error::new(lit.span(), "'name' must not be empty"));
                    }
                    cfg.name = Some(lit);
                }
                EntityAttrElem::Debug(b) => {
                    if cfg.derive_debug.is_some() {
                        return Err(syn::Error::new(
                            proc_macro2::Span::call_site(),
                            "duplicate key 'debug' in attribute",
                        ));
                    }
                    cfg.derive_debug = Some(b);
                }
            }
        }

        Ok(cfg)
    }
}

enum EntityAttrElem {
    Id(Box<Type>),
    Name(LitStr),
    Debug(bool),
}

impl Parse for EntityAttrElem {
    fn parse(input: ParseStream) -> Result<Self> {
        let key: syn::Ident = input.parse()?;
        let _eq: Token![=] = input.parse()?;
        if key == "id" {
            let ty: Type = input.parse()?;
            Ok(EntityAttrElem::Id(Box::new(ty)))
        } else if key == "name" {
            let lit: LitStr = input.parse()?;
            Ok(EntityAttrElem::Name(lit))
        } else if key == "debug" {
            let expr: syn::Expr = input.parse()?;
            match expr {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Bool(b),
                    ..
                }) => Ok(EntityAttrElem::Debug(b.value())),
                other => Err(syn::Error::new(
                    other.span(),
                    "expected boolean literal for 'debug'",
                )),
            }
        } else {
            Err(syn::Error::new(
                key.span(),
                "unknown key in attribute; expected 'id', 'name' or 'debug'",
            ))
        }
    }
}
