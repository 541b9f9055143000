use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Flat field-key -> field-value map stored on every page.
///
/// Keys are opaque strings scoped by convention per page (`"heroTitle"`,
/// `"stat1"`, ...). Values are strings, HTML strings or JSON primitives.
pub(crate) type PageContent = serde_json::Map<String, Value>;

/// Backend account info object.
///
/// The auth service owns this shape; we keep it flexible and only read the
/// admin flag from it.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct AccountInfo {
    #[serde(flatten)]
    pub extra: Value,
}

impl AccountInfo {
    /// Accepts `{"role": "admin"}` as well as `{"isAdmin": true}` / `{"is_admin": true}`.
    pub fn is_admin(&self) -> bool {
        let role_admin = self
            .extra
            .get("role")
            .and_then(|v| v.as_str())
            .map(|r| r.eq_ignore_ascii_case("admin"))
            .unwrap_or(false);

        let flag_admin = ["isAdmin", "is_admin"]
            .iter()
            .filter_map(|k| self.extra.get(*k))
            .any(|v| v.as_bool() == Some(true));

        role_admin || flag_admin
    }
}

#[derive(
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    strum::Display,
    strum::AsRefStr,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub(crate) enum PageStatus {
    Draft,
    #[default]
    Published,
    Archived,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageDocument {
    pub page_key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: PageContent,
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub status: PageStatus,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl PageDocument {
    pub fn field_text(&self, field_key: &str) -> Option<String> {
        field_text(&self.content, field_key)
    }
}

/// Body of `PATCH /pages/{page_key}`.
///
/// `content` always carries the whole merged map; the server replaces the
/// stored content field with it.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<PageContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PageStatus>,
}

/// Render a content value as display text. `null` and nested values read as absent.
pub(crate) fn field_text(content: &PageContent, field_key: &str) -> Option<String> {
    match content.get(field_key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_document_deserializes_camel_case() {
        let json = r#"{
            "pageKey": "homepage",
            "title": "Homepage",
            "content": {"heroTitle": "Find your next home", "stat1": 12000},
            "metaTitle": "Rentals",
            "metaDescription": null,
            "status": "draft",
            "createdAt": "2024-01-01T00:00:00Z"
        }"#;
        let doc: PageDocument = serde_json::from_str(json).expect("page should parse");
        assert_eq!(doc.page_key, "homepage");
        assert_eq!(doc.status, PageStatus::Draft);
        assert_eq!(doc.meta_title.as_deref(), Some("Rentals"));
        assert_eq!(doc.field_text("heroTitle").as_deref(), Some("Find your next home"));
        assert_eq!(doc.field_text("stat1").as_deref(), Some("12000"));
        assert!(doc.updated_at.is_none());
    }

    #[test]
    fn test_page_document_missing_content_defaults_to_empty_map() {
        let doc: PageDocument =
            serde_json::from_str(r#"{"pageKey": "about"}"#).expect("page should parse");
        assert!(doc.content.is_empty());
        assert_eq!(doc.status, PageStatus::Published);
    }

    #[test]
    fn test_page_update_skips_absent_fields() {
        let mut content = PageContent::new();
        content.insert("heroTitle".to_string(), Value::from("Welcome Home"));
        let update = PageUpdate {
            title: Some("Homepage".to_string()),
            content: Some(content),
            ..Default::default()
        };
        let v = serde_json::to_value(update).expect("should serialize");
        assert_eq!(v["title"], "Homepage");
        assert_eq!(v["content"]["heroTitle"], "Welcome Home");
        assert!(v.get("metaTitle").is_none());
        assert!(v.get("status").is_none());
    }

    #[test]
    fn test_field_text_ignores_nested_and_null() {
        let content: PageContent = serde_json::from_str(
            r#"{"a": null, "b": {"x": 1}, "c": [1], "d": true}"#,
        )
        .expect("content should parse");
        assert!(field_text(&content, "a").is_none());
        assert!(field_text(&content, "b").is_none());
        assert!(field_text(&content, "c").is_none());
        assert_eq!(field_text(&content, "d").as_deref(), Some("true"));
        assert!(field_text(&content, "missing").is_none());
    }

    #[test]
    fn test_account_info_admin_detection() {
        let admin = AccountInfo {
            extra: serde_json::json!({"id": 1, "role": "ADMIN"}),
        };
        let flagged = AccountInfo {
            extra: serde_json::json!({"id": 2, "isAdmin": true}),
        };
        let user = AccountInfo {
            extra: serde_json::json!({"id": 3, "role": "tenant", "is_admin": false}),
        };
        assert!(admin.is_admin());
        assert!(flagged.is_admin());
        assert!(!user.is_admin());
    }

    #[test]
    fn test_page_status_display() {
        assert_eq!(PageStatus::Draft.to_string(), "draft");
        assert_eq!(PageStatus::Archived.as_ref(), "archived");
        assert_eq!("published".parse::<PageStatus>().ok(), Some(PageStatus::Published));
        assert!("live".parse::<PageStatus>().is_err());
    }
}
