//! Help-center publisher
//!
//! [`Publisher`] is the seam the relationship service writes through.
//! [`HttpPublisher`] talks to an Intercom-style articles API; its writes go
//! through [`retry::with_retry`]. [`catalog`] publishes new documents and
//! records them in the ledger.

pub mod catalog;
pub mod retry;

pub use catalog::{publish_document, DocumentKind, NewDocument, PublishOutcome};

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::config::{PublisherConfig, RetryConfig};
use crate::error::{FieldGraphError, Result};

const SERVICE: &str = "publisher";
const PAGE_SIZE: usize = 50;

/// Identity of a published article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedRef {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleState {
    #[default]
    Published,
    Draft,
}

impl ArticleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleState::Published => "published",
            ArticleState::Draft => "draft",
        }
    }
}

/// Partial update; `None` leaves the remote value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleUpdate {
    pub title: Option<String>,
    pub html: Option<String>,
    pub state: Option<ArticleState>,
}

impl ArticleUpdate {
    pub fn html(html: impl Into<String>) -> Self {
        Self {
            html: Some(html.into()),
            ..Self::default()
        }
    }
}

/// Article listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleSummary {
    pub id: String,
    pub title: String,
    pub url: String,
    pub parent_id: Option<String>,
}

/// Help-center operations used by the pipeline.
pub trait Publisher {
    fn create(
        &self,
        title: &str,
        html: &str,
        collection: Option<&str>,
        author: Option<&str>,
        state: ArticleState,
    ) -> Result<PublishedRef>;

    fn update(&self, id: &str, update: &ArticleUpdate) -> Result<PublishedRef>;

    /// Current body HTML of an article.
    fn get(&self, id: &str) -> Result<String>;

    fn delete(&self, id: &str) -> Result<()>;

    fn list_all(&self) -> Result<Vec<ArticleSummary>>;
}

// ============================================
// Wire mapping
// ============================================

fn value_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Create body. An explicit collection wins over `default_collection`.
pub fn create_payload(
    title: &str,
    html: &str,
    collection: Option<&str>,
    default_collection: Option<&str>,
    author: Option<&str>,
    state: ArticleState,
) -> Value {
    let mut payload = Map::new();
    payload.insert("title".into(), json!(title));
    payload.insert("body".into(), json!(html));
    payload.insert("state".into(), json!(state.as_str()));
    if let Some(parent) = collection.or(default_collection).filter(|c| !c.is_empty()) {
        payload.insert("parent_id".into(), json!(parent));
        payload.insert("parent_type".into(), json!("collection"));
    }
    if let Some(author) = author.filter(|a| !a.is_empty()) {
        payload.insert("author_id".into(), json!(author));
    }
    Value::Object(payload)
}

/// Update body with only the fields being changed.
pub fn update_payload(update: &ArticleUpdate) -> Value {
    let mut payload = Map::new();
    if let Some(title) = update.title.as_deref().filter(|t| !t.is_empty()) {
        payload.insert("title".into(), json!(title));
    }
    if let Some(html) = update.html.as_deref().filter(|h| !h.is_empty()) {
        payload.insert("body".into(), json!(html));
    }
    if let Some(state) = update.state {
        payload.insert("state".into(), json!(state.as_str()));
    }
    Value::Object(payload)
}

/// Read `{id, url}` from an article response, inventing the public URL
/// when the API leaves it out.
pub fn parse_published(body: &Value) -> Result<PublishedRef> {
    let id = value_text(body.get("id"));
    if id.is_empty() {
        return Err(FieldGraphError::ParseFailure {
            message: "publisher response has no article id".to_string(),
        });
    }
    let url = match value_text(body.get("url")) {
        url if url.is_empty() => format!("https://help.intercom.com/articles/{}", id),
        url => url,
    };
    Ok(PublishedRef { id, url })
}

/// One page of a listing plus the total page count.
pub fn parse_article_page(body: &Value) -> (Vec<ArticleSummary>, u64) {
    let articles = body
        .get("data")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| ArticleSummary {
                    id: value_text(item.get("id")),
                    title: value_text(item.get("title")),
                    url: value_text(item.get("url")),
                    parent_id: Some(value_text(item.get("parent_id"))).filter(|p| !p.is_empty()),
                })
                .collect()
        })
        .unwrap_or_default();
    let total_pages = body
        .get("pages")
        .and_then(|p| p.get("total_pages"))
        .and_then(Value::as_u64)
        .unwrap_or(1);
    (articles, total_pages)
}

// ============================================
// HTTP publisher
// ============================================

pub struct HttpPublisher {
    client: reqwest::blocking::Client,
    base_url: String,
    token: String,
    api_version: String,
    default_collection: Option<String>,
    retry: RetryConfig,
}

impl HttpPublisher {
    pub fn new(config: &PublisherConfig) -> Result<Self> {
        if config.token.trim().is_empty() {
            return Err(FieldGraphError::ConfigError {
                message: "publisher.token is not set".to_string(),
            });
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FieldGraphError::transport(SERVICE, e))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.trim().to_string(),
            api_version: config.api_version.clone(),
            default_collection: config.default_collection.clone(),
            retry: config.retry,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::blocking::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .header("Intercom-Version", &self.api_version)
    }

    fn send(&self, builder: reqwest::blocking::RequestBuilder, what: &str) -> Result<Value> {
        let response = builder
            .send()
            .map_err(|e| FieldGraphError::transport(SERVICE, e))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| FieldGraphError::transport(SERVICE, e))?;
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FieldGraphError::NotFound {
                what: what.to_string(),
            });
        }
        if !status.is_success() {
            return Err(FieldGraphError::Status {
                service: SERVICE.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl Publisher for HttpPublisher {
    fn create(
        &self,
        title: &str,
        html: &str,
        collection: Option<&str>,
        author: Option<&str>,
        state: ArticleState,
    ) -> Result<PublishedRef> {
        let payload = create_payload(
            title,
            html,
            collection,
            self.default_collection.as_deref(),
            author,
            state,
        );
        let body = retry::with_retry(&self.retry, "create article", || {
            self.send(
                self.request(reqwest::Method::POST, "/articles").json(&payload),
                "articles endpoint",
            )
        })?;
        let published = parse_published(&body)?;
        tracing::info!(id = %published.id, title, "article created");
        Ok(published)
    }

    fn update(&self, id: &str, update: &ArticleUpdate) -> Result<PublishedRef> {
        let payload = update_payload(update);
        let path = format!("/articles/{}", id);
        let what = format!("article {}", id);
        let body = retry::with_retry(&self.retry, "update article", || {
            self.send(self.request(reqwest::Method::PUT, &path).json(&payload), &what)
        })?;
        let published = parse_published(&body)?;
        tracing::info!(id, "article updated");
        Ok(published)
    }

    fn get(&self, id: &str) -> Result<String> {
        let body = self.send(
            self.request(reqwest::Method::GET, &format!("/articles/{}", id)),
            &format!("article {}", id),
        )?;
        Ok(value_text(body.get("body")))
    }

    fn delete(&self, id: &str) -> Result<()> {
        let path = format!("/articles/{}", id);
        let what = format!("article {}", id);
        retry::with_retry(&self.retry, "delete article", || {
            self.send(self.request(reqwest::Method::DELETE, &path), &what)
        })?;
        tracing::info!(id, "article deleted");
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<ArticleSummary>> {
        let mut all = Vec::new();
        let mut page = 1u64;
        loop {
            let body = self.send(
                self.request(reqwest::Method::GET, "/articles")
                    .query(&[("page", page.to_string()), ("per_page", PAGE_SIZE.to_string())]),
                "articles endpoint",
            )?;
            let (articles, total_pages) = parse_article_page(&body);
            let done = articles.is_empty() || page >= total_pages;
            all.extend(articles);
            if done {
                break;
            }
            page += 1;
        }
        tracing::debug!(count = all.len(), "listed articles");
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_payload_collection_fallback() {
        let payload = create_payload("T", "<p/>", None, Some("42"), None, ArticleState::Published);
        assert_eq!(payload["parent_id"], "42");
        assert_eq!(payload["parent_type"], "collection");
        assert_eq!(payload["state"], "published");
        assert!(payload.get("author_id").is_none());

        let payload = create_payload("T", "<p/>", Some("7"), Some("42"), Some("99"), ArticleState::Draft);
        assert_eq!(payload["parent_id"], "7");
        assert_eq!(payload["author_id"], "99");

        let payload = create_payload("T", "<p/>", None, None, None, ArticleState::Draft);
        assert!(payload.get("parent_id").is_none());
    }

    #[test]
    fn test_update_payload_only_changed_fields() {
        let payload = update_payload(&ArticleUpdate::html("<p>new</p>"));
        assert_eq!(payload, json!({"body": "<p>new</p>"}));
        assert_eq!(update_payload(&ArticleUpdate::default()), json!({}));
    }

    #[test]
    fn test_parse_published() {
        let published = parse_published(&json!({"id": 123, "url": null})).unwrap();
        assert_eq!(published.id, "123");
        assert_eq!(published.url, "https://help.intercom.com/articles/123");
        assert!(parse_published(&json!({"type": "error.list"})).is_err());
    }

    #[test]
    fn test_parse_article_page() {
        let body = json!({
            "data": [
                {"id": "1", "title": "Capacity", "url": "https://help/1", "parent_id": 55},
                {"id": "2", "title": "Region", "parent_id": null}
            ],
            "pages": {"page": 1, "total_pages": 3}
        });
        let (articles, total) = parse_article_page(&body);
        assert_eq!(total, 3);
        assert_eq!(articles[0].parent_id.as_deref(), Some("55"));
        assert_eq!(articles[1].parent_id, None);
        assert_eq!(articles[1].url, "");
    }

    #[test]
    fn test_new_requires_token() {
        assert!(matches!(
            HttpPublisher::new(&PublisherConfig::default()),
            Err(FieldGraphError::ConfigError { .. })
        ));
    }
}
