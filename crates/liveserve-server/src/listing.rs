//! HTML directory listings.

use std::fmt::Write as _;
use std::path::Path;

use axum::response::Html;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::error::RequestError;

/// Characters left unescaped in listing links: A-Z a-z 0-9 - . _ ~
const HREF_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// A directory entry shown in a listing.
#[derive(Debug, PartialEq, Eq)]
struct ListingEntry {
    name: String,
    is_dir: bool,
}

/// Render the listing of `dir`, requested as `uri_path`.
pub(crate) async fn render(dir: &Path, uri_path: &str) -> Result<Html<String>, RequestError> {
    let entries = read_entries(dir)
        .await
        .map_err(|e| RequestError::from_io(uri_path, e))?;
    let display_path = percent_decode_str(uri_path).decode_utf8_lossy();
    Ok(Html(render_html(&display_path, &entries)))
}

/// Read and sort the entries of `dir` (case-insensitive by name).
async fn read_entries(dir: &Path) -> std::io::Result<Vec<ListingEntry>> {
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = read_dir.next_entry().await? {
        // Follows symlinks; dangling links are listed as files
        let is_dir = tokio::fs::metadata(entry.path())
            .await
            .is_ok_and(|m| m.is_dir());
        entries.push(ListingEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir,
        });
    }

    entries.sort_by_cached_key(|e| e.name.to_lowercase());
    Ok(entries)
}

fn render_html(display_path: &str, entries: &[ListingEntry]) -> String {
    let title = format!("Directory listing for {}", escape_html(display_path));

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{title}</title>");
    html.push_str("</head>\n<body>\n");
    let _ = writeln!(html, "<h1>{title}</h1>\n<hr>\n<ul>");

    for entry in entries {
        let suffix = if entry.is_dir { "/" } else { "" };
        let _ = writeln!(
            html,
            "<li><a href=\"{}{suffix}\">{}{suffix}</a></li>",
            utf8_percent_encode(&entry.name, HREF_ENCODE_SET),
            escape_html(&entry.name),
        );
    }

    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");
    html
}

/// Escape HTML special characters.
fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}
