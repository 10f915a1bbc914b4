use syn::{Field, FieldsNamed, Token, Type, punctuated::Punctuated};

/// 确保具名字段结构体包含所需字段，并按给定顺序置于最前
/// - 已存在的字段复用原定义，缺失的按 (字段名, 字段类型) 新增
/// - 其余字段保持原有相对顺序
pub(crate) fn ensure_leading_fields(fields_named: &mut FieldsNamed, required: &[(&str, &Type)]) {
    let old_named = fields_named.named.clone();
    let mut new_named: Punctuated<Field, Token![,]> = Punctuated::new();

    for (name, ty) in required.iter() {
        if let Some(existing) = old_named.iter().find(|f| is_named(f, name)) {
            new_named.push(existing.clone());
        } else {
            let ident = syn::Ident::new(name, proc_macro2::Span::call_site());
            let field: Field = syn::parse_quote! { #ident: #ty };
            new_named.push(field);
        }
    }

    for f in old_named.into_iter() {
        if !required.iter().any(|(n, _)| is_named(&f, n)) {
            new_named.push(f);
        }
    }

    fields_named.named = new_named;
}

/// 移除字段上的 `#[field(skip)]`，返回该字段是否被跳过
pub(crate) fn take_skip_attr(field: &mut Field) -> syn::Result<bool> {
    let mut skip = false;
    let mut retained = Vec::with_capacity(field.attrs.len());
    for attr in field.attrs.drain(..) {
        if !attr.path().is_ident("field") {
            retained.push(attr);
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
                Ok(())
            } else {
                Err(meta.error("unknown key in #[field(..)]; expected 'skip'"))
            }
        })?;
    }
    field.attrs = retained;
    Ok(skip)
}

fn is_named(field: &Field, name: &str) -> bool {
    field.ident.as_ref().map(|i| i == name).unwrap_or(false)
}

/// `OrderLine` -> `order_line`
pub(crate) fn snake_case(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 4);
    for (i, ch) in ident.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_names() {
        assert_eq!(snake_case("Order"), "order");
        assert_eq!(snake_case("OrderLine"), "order_line");
    }

    #[test]
    fn leading_fields_are_moved_first() {
        let mut fields: FieldsNamed = syn::parse_quote!({ name: String, id: u64 });
        let id_ty: Type = syn::parse_quote!(String);
        ensure_leading_fields(&mut fields, &[("id", &id_ty)]);

        let names: Vec<String> = fields
            .named
            .iter()
            .filter_map(|f| f.ident.as_ref().map(|i| i.to_string()))
            .collect();
        assert_eq!(names, vec!["id", "name"]);
    }
}
