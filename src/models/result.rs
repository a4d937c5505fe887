//! Normalized search result model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of intellectual-property record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    #[default]
    Patent,
    Trademark,
}

impl ResultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultKind::Patent => "patent",
            ResultKind::Trademark => "trademark",
        }
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patent" => Ok(ResultKind::Patent),
            "trademark" => Ok(ResultKind::Trademark),
            other => Err(format!("unknown record kind: {}", other)),
        }
    }
}

/// A search hit in the one shape every provider is mapped into
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Provider's own identifier for the record
    pub id: String,

    pub kind: ResultKind,

    pub title: String,

    /// Application, registration or publication number
    pub number: String,

    /// Filing date as reported by the provider
    pub date: String,

    pub status: String,

    /// Plain-text description with markup removed
    pub description: String,

    /// Similarity in `[0, 1]`, only set for image-origin results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Owning company, when the provider reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

impl SearchResult {
    /// Whether this result came from an image similarity search
    pub fn is_image_match(&self) -> bool {
        self.similarity_score.is_some()
    }

    /// Similarity as a percentage string, e.g. `"95.0%"`
    pub fn similarity_percent(&self) -> Option<String> {
        self.similarity_score.map(|s| format!("{:.1}%", s * 100.0))
    }
}
