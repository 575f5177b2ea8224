//! Attribute parsing utilities

use syn::{Attribute, ExprLit, Field, Lit};

/// Write policy requested by a field's marker attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Default,
    SkipWrite,
    AutoUuid,
    Json,
}

const POLICY_ATTRIBUTES: [(&str, Policy); 3] = [
    ("skip_write", Policy::SkipWrite),
    ("auto_uuid", Policy::AutoUuid),
    ("json", Policy::Json),
];

/// Extract a `#[name = "value"]` string attribute
///
/// Returns an error if the attribute is present but not a string literal.
pub fn extract_str(attrs: &[Attribute], name: &str) -> syn::Result<Option<String>> {
    for attr in attrs {
        if !attr.path().is_ident(name) {
            continue;
        }
        let meta = attr.meta.require_name_value()?;
        if let syn::Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) = &meta.value
        {
            return Ok(Some(s.value()));
        }
        return Err(syn::Error::new_spanned(
            &meta.value,
            format!("`{name}` expects a string literal, e.g. #[{name} = \"...\"]"),
        ));
    }
    Ok(None)
}

/// Extract the table name from struct attributes
pub fn extract_table_name(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    extract_str(attrs, "table_name")
}

/// Extract the identifier column override from struct attributes
pub fn extract_identifier(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    extract_str(attrs, "identifier")
}

/// Extract the column name from field attributes
pub fn extract_column_name(field: &Field) -> syn::Result<Option<String>> {
    extract_str(&field.attrs, "column_name")
}

/// Resolve the field's write policy; at most one marker may be present.
pub fn extract_policy(field: &Field) -> syn::Result<Policy> {
    let mut found: Option<(&str, Policy)> = None;
    for attr in &field.attrs {
        let Some((name, policy)) = POLICY_ATTRIBUTES
            .iter()
            .copied()
            .find(|(name, _)| attr.path().is_ident(name))
        else {
            continue;
        };
        attr.meta.require_path_only()?;
        if let Some((previous, _)) = found {
            return Err(syn::Error::new_spanned(
                attr,
                format!("`#[{name}]` conflicts with `#[{previous}]` on the same field"),
            ));
        }
        found = Some((name, policy));
    }
    Ok(found.map(|(_, policy)| policy).unwrap_or(Policy::Default))
}
