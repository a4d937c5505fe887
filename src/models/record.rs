//! Raw records as decoded from provider payloads, before normalization.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider identifier; some providers send numbers, others strings
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{}", n),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::Text(s.to_string())
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        RecordId::Number(n)
    }
}

/// One hit from a full-text provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRecord {
    pub id: RecordId,

    #[serde(default, alias = "type")]
    pub kind: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default, alias = "application_number", alias = "applicationNumber")]
    pub number: Option<String>,

    #[serde(default, alias = "filing_date", alias = "filingDate")]
    pub date: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default, alias = "snippet")]
    pub description: Option<String>,

    #[serde(default, alias = "company_name", alias = "companyName")]
    pub company: Option<String>,
}

impl TextRecord {
    /// A record carrying only an id; every other field takes its default
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            kind: None,
            title: None,
            number: None,
            date: None,
            status: None,
            description: None,
            company: None,
        }
    }
}

/// One hit from an image-similarity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: RecordId,

    #[serde(default, alias = "type")]
    pub kind: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub number: Option<String>,

    #[serde(default)]
    pub date: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default, alias = "similarityScore")]
    pub similarity_score: Option<f64>,

    #[serde(default, alias = "imageUrl")]
    pub image_url: Option<String>,

    #[serde(default, alias = "company_name", alias = "companyName")]
    pub company: Option<String>,

    #[serde(default, alias = "patentDetails", alias = "patent_details")]
    pub details: Option<PatentDetails>,
}

/// Nested filing details some image providers attach to a hit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatentDetails {
    #[serde(default, alias = "filingDate")]
    pub filing_date: Option<String>,

    #[serde(default, alias = "expiryDate")]
    pub expiry_date: Option<String>,

    #[serde(default)]
    pub inventors: Vec<String>,

    #[serde(default)]
    pub description: Option<String>,
}

impl ImageRecord {
    pub fn new(id: impl Into<RecordId>, similarity_score: f64) -> Self {
        Self {
            id: id.into(),
            kind: None,
            title: None,
            number: None,
            date: None,
            status: None,
            description: None,
            similarity_score: Some(similarity_score),
            image_url: None,
            company: None,
            details: None,
        }
    }

    /// Own description, else the one nested in `details`
    pub fn description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .or_else(|| self.details.as_ref()?.description.as_deref())
    }

    /// Own date, else the nested filing date
    pub fn date(&self) -> Option<&str> {
        self.date
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .or_else(|| self.details.as_ref()?.filing_date.as_deref())
    }
}

/// A raw provider record of either shape
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    Text(TextRecord),
    Image(ImageRecord),
}

impl RawRecord {
    pub fn id(&self) -> &RecordId {
        match self {
            RawRecord::Text(r) => &r.id,
            RawRecord::Image(r) => &r.id,
        }
    }
}

impl From<TextRecord> for RawRecord {
    fn from(record: TextRecord) -> Self {
        RawRecord::Text(record)
    }
}

impl From<ImageRecord> for RawRecord {
    fn from(record: ImageRecord) -> Self {
        RawRecord::Image(record)
    }
}

/// Envelope both HTTP providers answer with
#[derive(Debug, Deserialize)]
pub(crate) struct ResultsEnvelope<T> {
    pub results: Vec<T>,
}
