//! In-process help center and a ledger with failing tables

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};

use fieldgraph_engine::ledger::Row;
use fieldgraph_engine::publisher::ArticleSummary;
use fieldgraph_engine::{
    ArticleState, ArticleUpdate, FieldGraphError, Ledger, MemoryLedger, PublishedRef, Publisher,
    Result,
};

#[derive(Debug, Clone)]
pub struct StoredArticle {
    pub title: String,
    pub html: String,
    pub collection: Option<String>,
    pub state: ArticleState,
}

/// Publisher that keeps articles in memory and records calls.
#[derive(Default)]
pub struct MemoryPublisher {
    pub articles: RefCell<BTreeMap<String, StoredArticle>>,
    pub update_calls: RefCell<Vec<String>>,
    failing: HashSet<String>,
    next_id: RefCell<u64>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates to `id` fail with a 500.
    pub fn failing_on(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    pub fn html(&self, id: &str) -> Option<String> {
        self.articles.borrow().get(id).map(|a| a.html.clone())
    }

    fn url(id: &str) -> String {
        format!("https://help.example.com/articles/{}", id)
    }
}

impl Publisher for MemoryPublisher {
    fn create(
        &self,
        title: &str,
        html: &str,
        collection: Option<&str>,
        _author: Option<&str>,
        state: ArticleState,
    ) -> Result<PublishedRef> {
        let mut next = self.next_id.borrow_mut();
        *next += 1;
        let id = next.to_string();
        self.articles.borrow_mut().insert(
            id.clone(),
            StoredArticle {
                title: title.to_string(),
                html: html.to_string(),
                collection: collection.map(str::to_string),
                state,
            },
        );
        Ok(PublishedRef {
            url: Self::url(&id),
            id,
        })
    }

    fn update(&self, id: &str, update: &ArticleUpdate) -> Result<PublishedRef> {
        self.update_calls.borrow_mut().push(id.to_string());
        if self.failing.contains(id) {
            return Err(FieldGraphError::Status {
                service: "publisher".into(),
                status: 500,
                body: "internal error".into(),
            });
        }
        let mut articles = self.articles.borrow_mut();
        let article = articles.get_mut(id).ok_or_else(|| FieldGraphError::NotFound {
            what: format!("article {}", id),
        })?;
        if let Some(title) = &update.title {
            article.title = title.clone();
        }
        if let Some(html) = &update.html {
            article.html = html.clone();
        }
        if let Some(state) = update.state {
            article.state = state;
        }
        Ok(PublishedRef {
            id: id.to_string(),
            url: Self::url(id),
        })
    }

    fn get(&self, id: &str) -> Result<String> {
        self.html(id).ok_or_else(|| FieldGraphError::NotFound {
            what: format!("article {}", id),
        })
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.articles
            .borrow_mut()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| FieldGraphError::NotFound {
                what: format!("article {}", id),
            })
    }

    fn list_all(&self) -> Result<Vec<ArticleSummary>> {
        Ok(self
            .articles
            .borrow()
            .iter()
            .map(|(id, a)| ArticleSummary {
                id: id.clone(),
                title: a.title.clone(),
                url: Self::url(id),
                parent_id: a.collection.clone(),
            })
            .collect())
    }
}

/// [`MemoryLedger`] whose chosen tables fail to read or to write.
#[derive(Default)]
pub struct FaultyLedger {
    pub inner: MemoryLedger,
    unreadable: HashSet<String>,
    unwritable: HashSet<String>,
}

impl FaultyLedger {
    pub fn new(inner: MemoryLedger) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn unreadable(mut self, table: &str) -> Self {
        self.unreadable.insert(table.to_string());
        self
    }

    pub fn unwritable(mut self, table: &str) -> Self {
        self.unwritable.insert(table.to_string());
        self
    }

    fn outage(table: &str) -> FieldGraphError {
        FieldGraphError::Status {
            service: "ledger".into(),
            status: 503,
            body: format!("{} unavailable", table),
        }
    }
}

impl Ledger for FaultyLedger {
    fn get_rows(&self, table: &str) -> Result<Vec<Row>> {
        if self.unreadable.contains(table) {
            return Err(Self::outage(table));
        }
        self.inner.get_rows(table)
    }

    fn upsert_row(&self, table: &str, fields: &[String]) -> Result<()> {
        if self.unwritable.contains(table) {
            return Err(Self::outage(table));
        }
        self.inner.upsert_row(table, fields)
    }

    fn delete_row(&self, table: &str, match_column: usize, value: &str) -> Result<usize> {
        if self.unwritable.contains(table) {
            return Err(Self::outage(table));
        }
        self.inner.delete_row(table, match_column, value)
    }
}
