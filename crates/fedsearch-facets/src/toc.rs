use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One entry of the library's table of contents, as served by the search TOC
/// endpoint: either a category with nested contents or a single book.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TocEntry {
    Category {
        category: String,
        #[serde(rename = "heCategory", default)]
        he_category: String,
        #[serde(default)]
        contents: Vec<TocEntry>,
    },
    Text {
        title: String,
        #[serde(rename = "heTitle", default)]
        he_title: String,
    },
}

impl TocEntry {
    pub fn category(name: &str, he: &str, contents: Vec<TocEntry>) -> Self {
        Self::Category { category: name.to_string(), he_category: he.to_string(), contents }
    }

    pub fn text(title: &str, he: &str) -> Self {
        Self::Text { title: title.to_string(), he_title: he.to_string() }
    }

    /// English and Hebrew display names.
    pub fn names(&self) -> (&str, &str) {
        match self {
            Self::Category { category, he_category, .. } => (category, he_category),
            Self::Text { title, he_title } => (title, he_title),
        }
    }

    pub fn contents(&self) -> &[TocEntry] {
        match self {
            Self::Category { contents, .. } => contents,
            Self::Text { .. } => &[],
        }
    }
}

pub fn load_toc(path: &Path) -> Result<Vec<TocEntry>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read TOC file {}: {}", path.display(), e))?;
    let toc: Vec<TocEntry> = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("Failed to parse TOC file {}: {}", path.display(), e))?;
    Ok(toc)
}
