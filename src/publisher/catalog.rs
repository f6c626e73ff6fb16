//! Publishing new documents
//!
//! A document is published once per original name: the kind's ledger table
//! is checked first, then the article is created in the kind's collection and
//! recorded so later runs (and the relationship service) can find it.

use serde::{Deserialize, Serialize};

use super::{ArticleState, Publisher};
use crate::config::{LedgerConfig, PublisherConfig};
use crate::error::Result;
use crate::ledger::{self, check_duplicate, Ledger, LedgerRecord};
use crate::normalize::{smart_title, strip_trailing_parenthetical};
use crate::status::UnitStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Field,
    Chart,
    Article,
}

impl DocumentKind {
    /// Ledger table recording documents of this kind.
    pub fn table<'a>(&self, tables: &'a LedgerConfig) -> &'a str {
        match self {
            DocumentKind::Field => &tables.data_dictionary,
            DocumentKind::Chart => &tables.chart_library,
            DocumentKind::Article => &tables.article_library,
        }
    }

    pub fn collection<'a>(&self, config: &'a PublisherConfig) -> Option<&'a str> {
        match self {
            DocumentKind::Field => config.data_dictionary_collection(),
            DocumentKind::Chart => config.chart_collection(),
            DocumentKind::Article => config.article_collection(),
        }
    }

    /// Article title as shown in the help center.
    pub fn display_title(&self, title: &str) -> String {
        match self {
            DocumentKind::Field => title.trim().to_string(),
            DocumentKind::Chart => smart_title(title.trim()),
            DocumentKind::Article => strip_trailing_parenthetical(title).to_string(),
        }
    }
}

/// A rendered document ready for publishing.
#[derive(Debug, Clone)]
pub struct NewDocument {
    /// Identity in the ledger (field name, sheet name, article id).
    pub original_name: String,
    pub title: String,
    pub html: String,
    pub state: ArticleState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishOutcome {
    pub name: String,
    #[serde(flatten)]
    pub status: UnitStatus,
    pub human_name: String,
    pub url: String,
    pub remote_id: String,
}

impl PublishOutcome {
    /// Ledger record for a document that reached the publisher.
    pub fn record(&self, html: &str) -> Option<LedgerRecord> {
        if self.remote_id.is_empty() {
            return None;
        }
        Some(LedgerRecord {
            original_name: self.name.clone(),
            human_name: self.human_name.clone(),
            url: self.url.clone(),
            remote_id: self.remote_id.clone(),
            html: html.to_string(),
        })
    }
}

/// Publish `doc` unless its kind's table already records it.
///
/// A failed ledger read is returned as an error. A failed publish, or a
/// ledger write failing after the article went out, is reported in the
/// outcome status; in the second case the article's id and URL are kept.
pub fn publish_document(
    ledger: &dyn Ledger,
    publisher: &dyn Publisher,
    tables: &LedgerConfig,
    config: &PublisherConfig,
    kind: DocumentKind,
    doc: &NewDocument,
) -> Result<PublishOutcome> {
    let table = kind.table(tables);
    let name = doc.original_name.trim().to_string();

    let duplicate = check_duplicate(ledger, table, &name)?;
    if duplicate.exists {
        tracing::debug!(table, name = %name, "already published");
        return Ok(PublishOutcome {
            name,
            status: UnitStatus::skipped(format!("duplicate in {}", table)),
            human_name: duplicate.human_name,
            url: duplicate.url,
            remote_id: String::new(),
        });
    }

    let title = kind.display_title(&doc.title);
    let published = match publisher.create(
        &title,
        &doc.html,
        kind.collection(config),
        config.author_id.as_deref(),
        doc.state,
    ) {
        Ok(published) => published,
        Err(e) => {
            tracing::error!(name = %name, error = %e, "publish failed");
            return Ok(PublishOutcome {
                name,
                status: UnitStatus::error(e),
                human_name: title,
                url: String::new(),
                remote_id: String::new(),
            });
        }
    };

    let mut outcome = PublishOutcome {
        name,
        status: UnitStatus::Success,
        human_name: title,
        url: published.url,
        remote_id: published.id,
    };
    if let Some(record) = outcome.record(&doc.html) {
        if let Err(e) = ledger::record(ledger, table, &record) {
            tracing::error!(name = %outcome.name, error = %e, "published, but ledger write failed");
            outcome.status = UnitStatus::error(format!("ledger write failed: {}", e));
        }
    }
    tracing::info!(table, name = %outcome.name, url = %outcome.url, "published document");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FieldGraphError;
    use crate::ledger::{find_row, MemoryLedger};
    use crate::publisher::{ArticleSummary, ArticleUpdate, PublishedRef};
    use std::cell::RefCell;

    #[derive(Default)]
    struct CreatingPublisher {
        created: RefCell<Vec<(String, Option<String>, Option<String>)>>,
        down: bool,
    }

    impl Publisher for CreatingPublisher {
        fn create(
            &self,
            title: &str,
            _html: &str,
            collection: Option<&str>,
            author: Option<&str>,
            _state: ArticleState,
        ) -> Result<PublishedRef> {
            if self.down {
                return Err(FieldGraphError::transport("publisher", "connection refused"));
            }
            let mut created = self.created.borrow_mut();
            created.push((
                title.to_string(),
                collection.map(str::to_string),
                author.map(str::to_string),
            ));
            Ok(PublishedRef {
                id: created.len().to_string(),
                url: format!("https://help/{}", created.len()),
            })
        }

        fn update(&self, _: &str, _: &ArticleUpdate) -> Result<PublishedRef> {
            unreachable!()
        }

        fn get(&self, _: &str) -> Result<String> {
            unreachable!()
        }

        fn delete(&self, _: &str) -> Result<()> {
            unreachable!()
        }

        fn list_all(&self) -> Result<Vec<ArticleSummary>> {
            Ok(Vec::new())
        }
    }

    fn doc(name: &str, title: &str) -> NewDocument {
        NewDocument {
            original_name: name.to_string(),
            title: title.to_string(),
            html: "<p>body</p>".to_string(),
            state: ArticleState::Published,
        }
    }

    fn publisher_config() -> PublisherConfig {
        PublisherConfig {
            author_id: Some("77".to_string()),
            default_collection: Some("10".to_string()),
            chart_collection: Some("20".to_string()),
            ..PublisherConfig::default()
        }
    }

    #[test]
    fn test_publish_records_and_then_skips() {
        let ledger = MemoryLedger::new();
        let publisher = CreatingPublisher::default();
        let tables = LedgerConfig::default();
        let config = publisher_config();

        let first = publish_document(
            &ledger,
            &publisher,
            &tables,
            &config,
            DocumentKind::Chart,
            &doc("Sheet 4", "installed mw by region"),
        )
        .unwrap();
        assert_eq!(first.status, UnitStatus::Success);
        assert_eq!(first.human_name, "Installed MW by Region");
        assert_eq!(
            publisher.created.borrow()[0],
            (
                "Installed MW by Region".to_string(),
                Some("20".to_string()),
                Some("77".to_string())
            )
        );
        let stored = find_row(&ledger, "chart_library", "Sheet 4").unwrap().unwrap();
        assert_eq!(stored.remote_id, "1");
        assert_eq!(stored.html, "<p>body</p>");

        let again = publish_document(
            &ledger,
            &publisher,
            &tables,
            &config,
            DocumentKind::Chart,
            &doc("Sheet 4", "installed mw by region"),
        )
        .unwrap();
        assert!(matches!(again.status, UnitStatus::Skipped { .. }));
        assert_eq!(again.url, "https://help/1");
        assert_eq!(publisher.created.borrow().len(), 1);
    }

    #[test]
    fn test_article_kind_uses_article_library() {
        let ledger = MemoryLedger::new();
        let publisher = CreatingPublisher::default();
        let tables = LedgerConfig::default();

        let outcome = publish_document(
            &ledger,
            &publisher,
            &tables,
            &publisher_config(),
            DocumentKind::Article,
            &doc("1234", "Q3 Market Update (Members Only)"),
        )
        .unwrap();
        assert_eq!(outcome.human_name, "Q3 Market Update");
        assert_eq!(publisher.created.borrow()[0].1.as_deref(), Some("10"));
        assert!(find_row(&ledger, &tables.article_library, "1234").unwrap().is_some());
    }

    #[test]
    fn test_publish_failure_is_reported_not_recorded() {
        let ledger = MemoryLedger::new();
        let publisher = CreatingPublisher {
            down: true,
            ..CreatingPublisher::default()
        };
        let tables = LedgerConfig::default();

        let outcome = publish_document(
            &ledger,
            &publisher,
            &tables,
            &PublisherConfig::default(),
            DocumentKind::Field,
            &doc("Capacity", "System Capacity"),
        )
        .unwrap();
        assert!(matches!(outcome.status, UnitStatus::Error { .. }));
        assert!(outcome.record("<p/>").is_none());
        assert!(ledger.get_rows(&tables.data_dictionary).unwrap().is_empty());
    }
}
