//! Mapping of raw provider records into [`SearchResult`].

use regex::Regex;
use std::sync::OnceLock;

use crate::models::{ImageRecord, RawRecord, ResultKind, SearchResult, TextRecord};

pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_STATUS: &str = "Unknown";

fn markup_regex() -> &'static Regex {
    static MARKUP: OnceLock<Regex> = OnceLock::new();
    // an unterminated tag at the end of a snippet is dropped too
    MARKUP.get_or_init(|| Regex::new(r"</?[A-Za-z!][^>]*(?:>|$)").expect("markup regex is valid"))
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Strip markup tags, decode common entities, drop control characters and
/// collapse whitespace. Entities are decoded until none remain, so cleaning
/// already-clean text is a no-op.
pub fn clean_text(raw: &str) -> String {
    let stripped = markup_regex().replace_all(raw, " ");

    let mut decoded = stripped.into_owned();
    loop {
        let next = decode_entities(&decoded);
        if next == decoded {
            break;
        }
        decoded = next;
    }

    decoded
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| !c.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn text_or(value: Option<&str>, default: &str) -> String {
    value
        .map(clean_text)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn field(value: Option<&str>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

fn kind(value: Option<&str>) -> ResultKind {
    value.and_then(|k| k.parse().ok()).unwrap_or_default()
}

fn optional(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn normalize_text(record: &TextRecord) -> SearchResult {
    SearchResult {
        id: record.id.to_string(),
        kind: kind(record.kind.as_deref()),
        title: text_or(record.title.as_deref(), DEFAULT_TITLE),
        number: field(record.number.as_deref()),
        date: field(record.date.as_deref()),
        status: text_or(record.status.as_deref(), DEFAULT_STATUS),
        description: record.description.as_deref().map(clean_text).unwrap_or_default(),
        similarity_score: None,
        image_url: None,
        company: optional(record.company.as_deref()),
    }
}

fn normalize_image(record: &ImageRecord) -> SearchResult {
    SearchResult {
        id: record.id.to_string(),
        kind: kind(record.kind.as_deref()),
        title: text_or(record.title.as_deref(), DEFAULT_TITLE),
        number: field(record.number.as_deref()),
        date: field(record.date()),
        status: text_or(record.status.as_deref(), DEFAULT_STATUS),
        description: record.description().map(clean_text).unwrap_or_default(),
        similarity_score: Some(
            record
                .similarity_score
                .filter(|s| s.is_finite())
                .map(|s| s.clamp(0.0, 1.0))
                .unwrap_or(0.0),
        ),
        image_url: optional(record.image_url.as_deref()),
        company: optional(record.company.as_deref()),
    }
}

/// Map one raw provider record to a [`SearchResult`]. Never fails: missing
/// optional fields take defaults, and the id is the provider's own.
pub fn normalize(record: &RawRecord) -> SearchResult {
    match record {
        RawRecord::Text(r) => normalize_text(r),
        RawRecord::Image(r) => normalize_image(r),
    }
}

/// Normalize a provider response, preserving provider order
pub fn normalize_all(records: &[RawRecord]) -> Vec<SearchResult> {
    records.iter().map(normalize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordId;

    fn as_text_record(result: &SearchResult) -> RawRecord {
        RawRecord::Text(TextRecord {
            id: RecordId::Text(result.id.clone()),
            kind: Some(result.kind.to_string()),
            title: Some(result.title.clone()),
            number: Some(result.number.clone()),
            date: Some(result.date.clone()),
            status: Some(result.status.clone()),
            description: Some(result.description.clone()),
            company: result.company.clone(),
        })
    }

    #[test]
    fn test_clean_text_strips_markup() {
        assert_eq!(
            clean_text(r#"A <span class="searchmatch">solar</span> panel&nbsp;mount"#),
            "A solar panel mount"
        );
        assert_eq!(clean_text("tracking\u{0007} array\r\n  frame"), "tracking array frame");
        assert_eq!(clean_text("Smith &amp; Sons &quot;Pro&quot;"), "Smith & Sons \"Pro\"");
        assert_eq!(clean_text("cut off <b"), "cut off");
        // comparisons survive, only tag-shaped text is removed
        assert_eq!(clean_text("efficiency < 5% and > 2%"), "efficiency < 5% and > 2%");
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let result = normalize(&RawRecord::Text(TextRecord::new(42i64)));
        assert_eq!(result.id, "42");
        assert_eq!(result.kind, ResultKind::Patent);
        assert_eq!(result.title, DEFAULT_TITLE);
        assert_eq!(result.status, DEFAULT_STATUS);
        assert_eq!(result.number, "");
        assert_eq!(result.description, "");
        assert_eq!(result.similarity_score, None);
    }

    #[test]
    fn test_trademark_kind_and_id_kept() {
        let mut record = TextRecord::new("TM-77");
        record.kind = Some("Trademark".to_string());
        record.status = Some("  ".to_string());
        let result = normalize(&RawRecord::Text(record));
        assert_eq!(result.id, "TM-77");
        assert_eq!(result.kind, ResultKind::Trademark);
        assert_eq!(result.status, DEFAULT_STATUS);
    }

    #[test]
    fn test_image_score_clamped() {
        let high = normalize(&RawRecord::Image(ImageRecord::new("a", 1.7)));
        assert_eq!(high.similarity_score, Some(1.0));

        let nan = normalize(&RawRecord::Image(ImageRecord::new("b", f64::NAN)));
        assert_eq!(nan.similarity_score, Some(0.0));

        let mut record = ImageRecord::new("c", 0.42);
        record.image_url = Some("https://example.com/c.png".to_string());
        let result = normalize(&RawRecord::Image(record));
        assert_eq!(result.similarity_score, Some(0.42));
        assert_eq!(result.image_url.as_deref(), Some("https://example.com/c.png"));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut record = TextRecord::new("7");
        record.title = Some("  Solar <em>panel</em>\tframe ".to_string());
        record.number = Some("US7".to_string());
        record.date = Some("2021-02-03".to_string());
        record.description = Some("<p>Mounting &amp; tracking</p>".to_string());
        record.company = Some("Helio".to_string());

        let once = normalize(&RawRecord::Text(record));
        let twice = normalize(&as_text_record(&once));
        assert_eq!(once, twice);
        assert_eq!(once.title, "Solar panel frame");
        assert_eq!(once.description, "Mounting & tracking");
    }

    #[test]
    fn test_double_escaped_entities_settle_in_one_pass() {
        assert_eq!(clean_text("AT&amp;amp;T"), "AT&T");
        assert_eq!(clean_text("solar&amp;nbsp;panel"), "solar panel");

        let mut record = TextRecord::new("8");
        record.title = Some("AT&amp;amp;T &amp;quot;Pro&amp;quot;".to_string());
        record.description = Some("Mounting &amp;amp; tracking".to_string());

        let once = normalize(&RawRecord::Text(record));
        let twice = normalize(&as_text_record(&once));
        assert_eq!(once, twice);
        assert_eq!(once.title, "AT&T \"Pro\"");
        assert_eq!(once.description, "Mounting & tracking");
    }

    #[test]
    fn test_image_details_fill_description_and_date() {
        let json = r#"{
            "id": "1",
            "type": "patent",
            "title": "Smart Device Design Pattern",
            "number": "US20230123456",
            "date": "2023-01-01",
            "status": "Active",
            "similarityScore": 0.95,
            "imageUrl": "https://images.example.com/1.png",
            "companyName": "TechCorp Industries",
            "patentDetails": {
                "filingDate": "2022-01-01",
                "description": "A novel design pattern for smart device interfaces..."
            }
        }"#;
        let record: ImageRecord = serde_json::from_str(json).unwrap();
        let result = normalize(&RawRecord::Image(record));
        assert_eq!(
            result.description,
            "A novel design pattern for smart device interfaces..."
        );
        assert_eq!(result.date, "2023-01-01");
        assert_eq!(result.similarity_score, Some(0.95));

        let mut bare = ImageRecord::new("2", 0.5);
        bare.details = Some(crate::models::PatentDetails {
            filing_date: Some("2021-06-30".to_string()),
            ..Default::default()
        });
        assert_eq!(normalize(&RawRecord::Image(bare)).date, "2021-06-30");
    }

    #[test]
    fn test_distinct_ids_do_not_collide() {
        let records = vec![
            RawRecord::Text(TextRecord::new(1i64)),
            RawRecord::Text(TextRecord::new("1a")),
            RawRecord::Text(TextRecord::new(2i64)),
        ];
        let ids: Vec<String> = normalize_all(&records).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["1", "1a", "2"]);
    }
}
