/// Help document service
///
/// Fetches the portal's markdown help document for a locale and lifts out
/// the structure UIs need: a table of contents built from the headings and
/// the ```info / ```tip callout blocks. The markdown itself is returned
/// untouched; rendering belongs to the consumer.
use crate::config::Config;
use crate::errors::AppError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Locale used when no document exists for the requested one.
pub const FALLBACK_HELP_LOCALE: &str = "en-US";

/// File name of the portal help document within a locale directory.
const HELP_DOC_FILE: &str = "my-account.md";

/// Table-of-contents entry extracted from a markdown heading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TocEntry {
    /// Heading text.
    pub text: String,
    /// Anchor slug derived from the text.
    pub slug: String,
    /// Heading level (2 for `##`, 3 for `###`, ...).
    pub level: usize,
}

/// Kind of a callout block.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CalloutKind {
    Info,
    Tip,
}

impl CalloutKind {
    fn default_title(&self) -> &'static str {
        match self {
            CalloutKind::Info => "Info",
            CalloutKind::Tip => "Tip",
        }
    }
}

/// An ```info or ```tip fenced block lifted out of the document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Callout {
    pub kind: CalloutKind,
    /// Title from the leading `*Title*` marker, or the kind's default.
    pub title: String,
    pub body: String,
}

/// A help document with its extracted navigation structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelpDocument {
    /// The raw markdown source.
    pub content: String,
    /// Table of contents over every heading below the document title.
    pub toc: Vec<TocEntry>,
    /// Callout blocks found in the document.
    pub callouts: Vec<Callout>,
}

/// Client fetching localized help documents from the docs source.
///
/// Documents live at `{help_docs_base_url}/{locale}/my-account.md`.
#[derive(Clone)]
pub struct HelpService {
    client: reqwest::Client,
    base_url: String,
}

impl HelpService {
    /// Creates a new `HelpService` from the application configuration.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create help client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.help_docs_base_url.clone(),
        })
    }

    /// Fetches and transforms the help document for a locale.
    ///
    /// A locale without a document falls back to the en-US document; any
    /// other upstream failure surfaces as an error.
    pub async fn fetch_document(&self, locale: &str) -> Result<HelpDocument, AppError> {
        match self.fetch_raw(locale).await {
            Ok(source) => Ok(transform_document(&source)),
            Err(AppError::NotFound(_)) if locale != FALLBACK_HELP_LOCALE => {
                tracing::info!(
                    "No help document for locale '{}', falling back to {}",
                    locale,
                    FALLBACK_HELP_LOCALE
                );
                let source = self.fetch_raw(FALLBACK_HELP_LOCALE).await?;
                Ok(transform_document(&source))
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_raw(&self, locale: &str) -> Result<String, AppError> {
        let url = format!("{}/{}/{}", self.base_url, locale, HELP_DOC_FILE);
        tracing::info!("Fetching help document: {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            AppError::ExternalApiError(format!("Help document request failed: {}", e))
        })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!(
                "No help document for locale '{}'",
                locale
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Help document fetch returned {}: {}",
                status, error_text
            )));
        }

        response.text().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to read help document: {}", e))
        })
    }
}

/// Builds the table of contents and lifts callout blocks out of a markdown
/// document. The content itself is returned unmodified.
pub fn transform_document(source: &str) -> HelpDocument {
    HelpDocument {
        content: source.to_string(),
        toc: extract_toc(source),
        callouts: extract_callouts(source),
    }
}

/// Collects every heading below the document title into a table of contents.
pub fn extract_toc(source: &str) -> Vec<TocEntry> {
    let heading = Regex::new(r"(?m)^(#{1,6})[ \t]+(.+?)[ \t]*$").unwrap();

    let mut toc = Vec::new();
    for captures in heading.captures_iter(source) {
        let level = captures[1].len();
        // The document title is not part of the ToC.
        if level <= 1 {
            continue;
        }

        let text = captures[2].to_string();
        toc.push(TocEntry {
            slug: slugify(&text),
            text,
            level,
        });
    }

    toc
}

/// Anchor slug for a heading: lowercased, every non-word character replaced
/// by a dash.
pub fn slugify(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

/// Lifts every ```info and ```tip fenced block out of the document.
pub fn extract_callouts(source: &str) -> Vec<Callout> {
    let fence = Regex::new(r"(?ms)^```[ \t]*(info|tip)[ \t]*\r?\n(.*?)^```[ \t]*$").unwrap();

    fence
        .captures_iter(source)
        .map(|captures| {
            let kind = if &captures[1] == "tip" {
                CalloutKind::Tip
            } else {
                CalloutKind::Info
            };
            parse_callout(kind, &captures[2])
        })
        .collect()
}

/// Splits a callout body into its `*Title*` marker and content.
fn parse_callout(kind: CalloutKind, value: &str) -> Callout {
    let marker = Regex::new(r"^\*[^*]+\*[ \t]*").unwrap();

    match marker.find(value) {
        Some(found) => Callout {
            kind,
            title: found.as_str().replace('*', "").trim().to_string(),
            body: value[found.end()..].trim().to_string(),
        },
        None => Callout {
            kind,
            title: kind.default_title().to_string(),
            body: value.trim().to_string(),
        },
    }
}
