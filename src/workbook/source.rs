//! Workbook sources
//!
//! Given an opaque workbook identifier, a source returns the workbook
//! definition text. Authentication against the BI server happens elsewhere;
//! the server source is handed an already issued token and site id.

use std::fs;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::time::Duration;

use super::document::WorkbookDocument;
use crate::config::WorkbookConfig;
use crate::error::{FieldGraphError, Result};

const SERVICE: &str = "workbook server";

/// Anything that can produce workbook XML for an identifier.
pub trait WorkbookSource {
    fn fetch(&self, workbook_id: &str) -> Result<String>;
}

/// Fetch and parse a workbook.
///
/// Transport failures propagate. Malformed XML degrades to an empty tree
/// that still carries the raw text, so filter scraping keeps working.
pub fn load_document(source: &dyn WorkbookSource, workbook_id: &str) -> Result<WorkbookDocument> {
    let raw = source.fetch(workbook_id)?;
    match WorkbookDocument::parse(raw.clone()) {
        Ok(doc) => Ok(doc),
        Err(e) => {
            tracing::warn!(workbook = workbook_id, error = %e, "workbook XML unparseable, using empty registry");
            Ok(WorkbookDocument {
                raw,
                ..WorkbookDocument::empty()
            })
        }
    }
}

/// Reads `<dir>/<workbook_id>` or, when the id is itself a path, that file.
#[derive(Debug, Clone, Default)]
pub struct FileWorkbookSource {
    pub dir: Option<PathBuf>,
}

impl WorkbookSource for FileWorkbookSource {
    fn fetch(&self, workbook_id: &str) -> Result<String> {
        let path = match &self.dir {
            Some(dir) => dir.join(workbook_id),
            None => PathBuf::from(workbook_id),
        };
        if !path.exists() {
            return Err(FieldGraphError::NotFound {
                what: format!("workbook file {}", path.display()),
            });
        }
        let bytes = fs::read(&path)?;
        decode_workbook_bytes(&bytes)
    }
}

/// Downloads workbook content from the BI server REST API.
pub struct ServerWorkbookSource {
    client: reqwest::blocking::Client,
    base_url: String,
    api_version: String,
    site_id: String,
    auth_token: String,
}

impl ServerWorkbookSource {
    pub fn new(config: &WorkbookConfig, site_id: &str, auth_token: &str) -> Result<Self> {
        if config.server_url.is_empty() {
            return Err(FieldGraphError::ConfigError {
                message: "workbook.server_url is not set".to_string(),
            });
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FieldGraphError::transport(SERVICE, e))?;
        Ok(Self {
            client,
            base_url: config.server_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            site_id: site_id.to_string(),
            auth_token: auth_token.to_string(),
        })
    }

    pub fn content_url(&self, workbook_id: &str) -> String {
        format!(
            "{}/api/{}/sites/{}/workbooks/{}/content",
            self.base_url, self.api_version, self.site_id, workbook_id
        )
    }
}

impl WorkbookSource for ServerWorkbookSource {
    fn fetch(&self, workbook_id: &str) -> Result<String> {
        let response = self
            .client
            .get(self.content_url(workbook_id))
            .header("X-Tableau-Auth", &self.auth_token)
            .header("Accept", "*/*")
            .send()
            .map_err(|e| FieldGraphError::transport(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FieldGraphError::Status {
                service: SERVICE.to_string(),
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        let bytes = response
            .bytes()
            .map_err(|e| FieldGraphError::transport(SERVICE, e))?;
        decode_workbook_bytes(&bytes)
    }
}

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Workbook XML as text.
///
/// Packaged workbooks (`.twbx`) are zip archives; the first `.twb` member is
/// returned. Anything else is read as text with a leading BOM removed.
pub fn decode_workbook_bytes(bytes: &[u8]) -> Result<String> {
    if bytes.starts_with(ZIP_MAGIC) {
        return extract_packaged_workbook(bytes);
    }
    let text = String::from_utf8_lossy(bytes);
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

fn extract_packaged_workbook(bytes: &[u8]) -> Result<String> {
    let archive_error = |e: zip::result::ZipError| FieldGraphError::ParseFailure {
        message: format!("packaged workbook unreadable: {}", e),
    };
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(archive_error)?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(archive_error)?;
        if !entry.is_file() || !entry.name().to_ascii_lowercase().ends_with(".twb") {
            continue;
        }
        tracing::debug!(member = entry.name(), "reading packaged workbook member");
        let mut member = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut member)?;
        let text = String::from_utf8_lossy(&member);
        return Ok(text.trim_start_matches('\u{feff}').to_string());
    }

    Err(FieldGraphError::ParseFailure {
        message: "packaged workbook has no .twb member".to_string(),
    })
}
