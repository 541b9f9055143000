use crate::models::{PageDocument, PageUpdate};
use crate::storage::{load_string_from_storage, remove_from_storage};
use crate::storage::{TOKEN_KEY, USER_KEY};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ApiErrorKind {
    Unauthorized,
    NotFound,
    Network,
    Http,
    Parse,
}

#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub(crate) struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    fn network(e: reqwest::Error) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            message: e.to_string(),
        }
    }

    fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            message: e.to_string(),
        }
    }

    fn unauthorized() -> Self {
        Self {
            kind: ApiErrorKind::Unauthorized,
            message: "Unauthorized".to_string(),
        }
    }

    fn not_found(path: &str) -> Self {
        Self {
            kind: ApiErrorKind::NotFound,
            message: format!("Not found: {path}"),
        }
    }

    pub(crate) fn http(status: u16, body: String, ctx: &str) -> Self {
        Self {
            kind: ApiErrorKind::Http,
            message: format!("{ctx} ({status}): {body}"),
        }
    }
}

pub(crate) type ApiResult<T> = Result<T, ApiError>;

/// Page persistence as seen by the editing core.
///
/// The HTTP client implements this for the app; tests drive the reconciler
/// with in-memory fakes.
#[allow(async_fn_in_trait)]
pub(crate) trait PagesApi {
    /// `Ok(None)` when the page has never been written.
    async fn fetch_page(&self, page_key: &str) -> ApiResult<Option<PageDocument>>;

    async fn update_page(&self, page_key: &str, update: &PageUpdate) -> ApiResult<PageDocument>;
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct EnvConfig {
    pub api_url: String,
}

impl EnvConfig {
    pub fn new() -> Self {
        let default_api_url = "http://localhost:6689".to_string();

        // Both `window.ENV.API_URL` and the lowercase `window.ENV.api_url` are accepted.
        if let Some(window) = web_sys::window() {
            if let Some(env) = window.get("ENV") {
                if !env.is_undefined() && env.is_object() {
                    for key in ["API_URL", "api_url"] {
                        if let Ok(api_url) = js_sys::Reflect::get(&env, &key.into()) {
                            if let Some(url_str) = api_url.as_string() {
                                return Self {
                                    api_url: url_str.trim_end_matches('/').to_string(),
                                };
                            }
                        }
                    }
                }
            }
        }

        Self {
            api_url: default_api_url,
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub(crate) struct ApiClient {
    pub(crate) base_url: String,
    pub(crate) token: Option<String>,
}

impl ApiClient {
    pub fn load_from_storage() -> Self {
        Self {
            base_url: EnvConfig::new().api_url,
            token: load_string_from_storage(TOKEN_KEY),
        }
    }

    pub fn clear_storage() {
        remove_from_storage(TOKEN_KEY);
        remove_from_storage(USER_KEY);
    }

    pub fn logout(&mut self) {
        self.token = None;
        Self::clear_storage();
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn auth_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {t}"))
    }

    pub(crate) fn page_path(page_key: &str) -> String {
        format!("/pages/{}", urlencoding::encode(page_key))
    }

    async fn request_api<T: serde::de::DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&impl Serialize>,
    ) -> ApiResult<T> {
        let client = reqwest::Client::new();
        let url = format!("{}{}", self.base_url, path);
        let mut req = client.request(method, url);
        if let Some(header) = self.auth_header() {
            req = req.header("Authorization", header);
        }

        if let Some(b) = body {
            req = req.json(b);
        }

        let res = req.send().await.map_err(ApiError::network)?;

        let status = res.status();
        if status.is_success() {
            res.json().await.map_err(ApiError::parse)
        } else if status.as_u16() == 401 || status.as_u16() == 403 {
            Err(ApiError::unauthorized())
        } else if status.as_u16() == 404 {
            Err(ApiError::not_found(path))
        } else {
            let body = res.text().await.unwrap_or_default();
            Err(ApiError::http(status.as_u16(), body, "Request failed"))
        }
    }

    pub async fn get_page(&self, page_key: &str) -> ApiResult<Option<PageDocument>> {
        let path = Self::page_path(page_key);
        match self
            .request_api::<serde_json::Value>(reqwest::Method::GET, &path, None::<&()>)
            .await
        {
            Ok(data) => Self::parse_page_response(data).map(Some),
            Err(e) if e.kind == ApiErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn list_pages(&self) -> ApiResult<Vec<PageDocument>> {
        let data: serde_json::Value = self
            .request_api(reqwest::Method::GET, "/pages", None::<&()>)
            .await?;
        Ok(Self::parse_page_list_response(data))
    }

    pub async fn update_page(
        &self,
        page_key: &str,
        update: &PageUpdate,
    ) -> ApiResult<PageDocument> {
        let data: serde_json::Value = self
            .request_api(reqwest::Method::PATCH, &Self::page_path(page_key), Some(update))
            .await?;
        Self::parse_page_response(data)
    }

    /// Accepts the document either bare or wrapped as `{"page": {...}}` / `{"data": {...}}`.
    pub(crate) fn parse_page_response(data: serde_json::Value) -> ApiResult<PageDocument> {
        let inner = match data {
            serde_json::Value::Object(mut map)
                if !map.contains_key("pageKey")
                    && (map.contains_key("page") || map.contains_key("data")) =>
            {
                map.remove("page")
                    .or_else(|| map.remove("data"))
                    .unwrap_or_default()
            }
            other => other,
        };
        serde_json::from_value(inner).map_err(ApiError::parse)
    }

    pub(crate) fn parse_page_list_response(data: serde_json::Value) -> Vec<PageDocument> {
        let list = match data {
            serde_json::Value::Array(items) => items,
            serde_json::Value::Object(mut map) => map
                .remove("pages")
                .or_else(|| map.remove("data"))
                .and_then(|v| match v {
                    serde_json::Value::Array(items) => Some(items),
                    _ => None,
                })
                .unwrap_or_default(),
            _ => vec![],
        };

        list.into_iter()
            .filter_map(|item| serde_json::from_value::<PageDocument>(item).ok())
            .filter(|p| !p.page_key.trim().is_empty())
            .collect()
    }
}

impl PagesApi for ApiClient {
    async fn fetch_page(&self, page_key: &str) -> ApiResult<Option<PageDocument>> {
        self.get_page(page_key).await
    }

    async fn update_page(&self, page_key: &str, update: &PageUpdate) -> ApiResult<PageDocument> {
        ApiClient::update_page(self, page_key, update).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(token: Option<&str>) -> ApiClient {
        ApiClient {
            base_url: "http://localhost:6689".to_string(),
            token: token.map(str::to_string),
        }
    }

    #[test]
    fn test_api_client_without_token() {
        let client = client(None);
        assert!(!client.is_authenticated());
        assert!(client.auth_header().is_none());
    }

    #[test]
    fn test_api_client_auth_header_with_token() {
        let client = client(Some("my-jwt-token"));
        assert!(client.is_authenticated());
        assert_eq!(client.auth_header().as_deref(), Some("Bearer my-jwt-token"));
    }

    #[test]
    fn test_page_path_encodes_key() {
        assert_eq!(ApiClient::page_path("homepage"), "/pages/homepage");
        assert_eq!(ApiClient::page_path("for rent"), "/pages/for%20rent");
    }

    #[test]
    fn test_parse_page_response_bare_and_wrapped() {
        let bare = serde_json::json!({"pageKey": "about", "content": {"title": "B"}});
        let wrapped = serde_json::json!({"page": {"pageKey": "about", "content": {"title": "B"}}});
        let data = serde_json::json!({"data": {"pageKey": "about"}});

        assert_eq!(
            ApiClient::parse_page_response(bare).expect("bare").field_text("title").as_deref(),
            Some("B")
        );
        assert_eq!(
            ApiClient::parse_page_response(wrapped).expect("wrapped").page_key,
            "about"
        );
        assert_eq!(ApiClient::parse_page_response(data).expect("data").page_key, "about");
    }

    #[test]
    fn test_parse_page_response_rejects_garbage() {
        let err = ApiClient::parse_page_response(serde_json::json!("nope"))
            .expect_err("string is not a page");
        assert_eq!(err.kind, ApiErrorKind::Parse);
    }

    #[test]
    fn test_parse_page_list_response_skips_invalid_items() {
        let data = serde_json::json!({
            "pages": [
                {"pageKey": "homepage"},
                {"pageKey": ""},
                {"title": "no key"},
                {"pageKey": "about", "title": "About"}
            ]
        });
        let pages = ApiClient::parse_page_list_response(data);
        let keys: Vec<&str> = pages.iter().map(|p| p.page_key.as_str()).collect();
        assert_eq!(keys, vec!["homepage", "about"]);

        let bare = serde_json::json!([{"pageKey": "faq"}]);
        assert_eq!(ApiClient::parse_page_list_response(bare).len(), 1);
    }

    #[test]
    fn test_api_error_display_is_message() {
        let e = ApiError::http(500, "boom".to_string(), "Request failed");
        assert_eq!(e.kind, ApiErrorKind::Http);
        assert_eq!(e.to_string(), "Request failed (500): boom");
    }
}
