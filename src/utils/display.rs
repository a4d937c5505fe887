//! Terminal rendering of search results.

use comfy_table::{presets, Attribute, Cell, ContentArrangement, Table};
use std::sync::OnceLock;
use terminal_size::terminal_size;
use unicode_width::UnicodeWidthChar;

use crate::models::SearchResult;
use crate::utils::SavedSearch;

/// Default width when terminal size cannot be determined.
pub const DEFAULT_WIDTH: usize = 100;

static TERMINAL_WIDTH: OnceLock<usize> = OnceLock::new();

/// Terminal width in columns, measured once.
pub fn terminal_width() -> usize {
    *TERMINAL_WIDTH.get_or_init(|| {
        terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(DEFAULT_WIDTH)
    })
}

/// Truncate text to `max_width` display columns, appending an ellipsis if
/// anything was cut.
///
/// ```
/// use patent_search::utils::truncate_with_ellipsis;
///
/// assert_eq!(truncate_with_ellipsis("Solar panel", 8), "Solar...");
/// assert_eq!(truncate_with_ellipsis("Solar", 8), "Solar");
/// ```
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }

    let width = |c: char| UnicodeWidthChar::width(c).unwrap_or(1);
    let total: usize = text.chars().map(width).sum();
    if total <= max_width {
        return text.to_string();
    }

    // too narrow for an ellipsis, so dots alone fill the columns
    if max_width < 3 {
        return ".".repeat(max_width);
    }

    let budget = max_width - 3;
    let mut used = 0;
    let mut kept = String::new();
    for c in text.chars() {
        let w = width(c);
        if used + w > budget {
            break;
        }
        used += w;
        kept.push(c);
    }

    format!("{}...", kept.trim_end())
}

/// Similarity percentage, blank for text matches
pub fn format_score(result: &SearchResult) -> String {
    result.similarity_percent().unwrap_or_default()
}

/// Results as a table sized for `width` columns. Image matches get a
/// similarity column.
pub fn results_table(results: &[SearchResult], width: usize) -> Table {
    let with_score = results.iter().any(SearchResult::is_image_match);
    let title_width = (width / 2).max(20);

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(width.min(u16::MAX as usize) as u16);

    let mut header = vec!["Number", "Title", "Type", "Date", "Status"];
    if with_score {
        header.push("Match");
    }
    table.set_header(header);

    for result in results {
        let mut row = vec![
            Cell::new(&result.number),
            Cell::new(truncate_with_ellipsis(&result.title, title_width))
                .add_attribute(Attribute::Bold),
            Cell::new(result.kind),
            Cell::new(&result.date),
            Cell::new(&result.status),
        ];
        if with_score {
            row.push(Cell::new(format_score(result)));
        }
        table.add_row(row);
    }
    table
}

/// One result as plain text lines
pub fn format_plain(result: &SearchResult) -> String {
    let mut out = format!("{} - {} [{}]", result.number, result.title, result.kind);
    if !result.status.is_empty() {
        out.push_str(&format!(" ({})", result.status));
    }
    if let Some(score) = result.similarity_percent() {
        out.push_str(&format!("\n  Match: {}", score));
    }
    if !result.date.is_empty() {
        out.push_str(&format!("\n  Date: {}", result.date));
    }
    if let Some(ref company) = result.company {
        out.push_str(&format!("\n  Owner: {}", company));
    }
    if !result.description.is_empty() {
        out.push_str(&format!("\n  {}", truncate_with_ellipsis(&result.description, 200)));
    }
    out
}

/// Saved searches as a table
pub fn history_table(entries: &[SavedSearch]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.set_header(vec!["When", "Query", "Type", "Filters", "Results"]);

    for entry in entries {
        let filters = entry
            .filters
            .to_params()
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        let query = if entry.image {
            format!("[image] {}", entry.query)
        } else {
            entry.query.clone()
        };
        table.add_row(vec![
            Cell::new(entry.saved_at.format("%Y-%m-%d %H:%M")),
            Cell::new(truncate_with_ellipsis(&query, 40)),
            Cell::new(entry.kind),
            Cell::new(filters),
            Cell::new(entry.result_count),
        ]);
    }
    table
}
