//! Annotated-CSV decoding for Flux query responses.

use chrono::{DateTime, Utc};

use super::{Item, QueryError, QueryOutcome};

/// Parse an annotated-CSV Flux response into typed items.
///
/// Tables are delimited by annotation lines or blank lines; each table has
/// its own header. Rows with `disable` set are filtered out here. An error
/// table aborts the result when no data preceded it, and degrades to a soft
/// warning otherwise.
pub fn parse_result(text: &str) -> Result<QueryOutcome, QueryError> {
    let mut outcome = QueryOutcome::default();
    let mut header: Option<Header> = None;

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with('#') {
            // Annotation or table separator: the next row is a header.
            header = None;
            continue;
        }
        let fields = split_fields(line);
        if header.is_none() {
            header = Some(Header::from_fields(&fields));
            continue;
        }
        let Some(current) = header.as_ref() else {
            continue;
        };

        if let Some(error) = current.error {
            let message = fields.get(error).cloned().unwrap_or_default();
            if outcome.items.is_empty() {
                return Err(QueryError::Parse(message));
            }
            outcome.warning = Some(message);
            continue;
        }

        match current.row(&fields) {
            Some(item) => outcome.items.push(item),
            None => continue, // short or disabled row
        }
    }
    Ok(outcome)
}

struct Header {
    value: Option<usize>,
    mirror: Option<usize>,
    path: Option<usize>,
    disable: Option<usize>,
    time: Option<usize>,
    error: Option<usize>,
}

impl Header {
    fn from_fields(fields: &[String]) -> Self {
        let find = |name: &str| fields.iter().position(|f| f == name);
        Self {
            value: find("_value"),
            mirror: find("mirror"),
            path: find("path"),
            disable: find("disable"),
            time: find("_time"),
            error: find("error"),
        }
    }

    fn row(&self, fields: &[String]) -> Option<Item> {
        if let Some(i) = self.disable {
            if fields.get(i).map(String::as_str) == Some("true") {
                return None;
            }
        }
        let value = fields.get(self.value?)?;
        let value = value
            .parse::<i64>()
            .or_else(|_| value.parse::<f64>().map(|v| v as i64))
            .ok()?;
        let mirror = fields.get(self.mirror?)?.clone();
        let path = self
            .path
            .and_then(|i| fields.get(i))
            .cloned()
            .unwrap_or_default();
        let time = self
            .time
            .and_then(|i| fields.get(i))
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_default();
        Some(Item {
            value,
            mirror,
            path,
            time,
        })
    }
}

/// Split one CSV line, honouring double-quoted fields.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
