use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

/// Fallback database name when the schema carries no title text
pub const UNKNOWN_DATABASE: &str = "Unknown";
/// Fallback page title when a page has no title text
pub const UNTITLED_PAGE: &str = "Untitled";
/// Display format of the page title property
pub const TITLE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Names of the three database properties a summary page fills in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryProperties {
    /// `title`-typed property holding the local time
    pub title: String,
    /// `rich_text`-typed property holding the summary
    pub summary: String,
    /// `date`-typed property holding the ISO-8601 timestamp
    pub timestamp: String,
}

impl Default for SummaryProperties {
    fn default() -> Self {
        Self { title: "Time".to_string(), summary: "Summary".to_string(), timestamp: "Timestamp".to_string() }
    }
}

impl From<&notechat_core::config::NotionConfig> for SummaryProperties {
    fn from(config: &notechat_core::config::NotionConfig) -> Self {
        Self {
            title: config.title_property.clone(),
            summary: config.summary_property.clone(),
            timestamp: config.timestamp_property.clone(),
        }
    }
}

/// `POST /v1/pages` body for a new summary record
pub fn summary_page_payload<Tz>(
    database_id: &str, properties: &SummaryProperties, summary: &str, now: &DateTime<Tz>,
) -> Value
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let mut props = serde_json::Map::new();
    props.insert(
        properties.title.clone(),
        json!({ "title": [{ "text": { "content": now.format(TITLE_TIME_FORMAT).to_string() } }] }),
    );
    props.insert(properties.summary.clone(), json!({ "rich_text": [{ "text": { "content": summary } }] }));
    props.insert(properties.timestamp.clone(), json!({ "date": { "start": now.to_rfc3339() } }));

    json!({
        "parent": { "database_id": database_id },
        "properties": Value::Object(props),
    })
}

/// First `text.content` of a rich-text array
fn first_text(items: &Value) -> Option<&str> {
    items.get(0)?.get("text")?.get("content")?.as_str()
}

/// Name and property layout of a database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSchema {
    pub title: String,
    /// `(name, type)` in the order the API returned them
    pub properties: Vec<(String, String)>,
}

impl DatabaseSchema {
    pub fn from_value(data: &Value) -> Self {
        let title = data
            .get("title")
            .and_then(first_text)
            .unwrap_or(UNKNOWN_DATABASE)
            .to_string();

        let properties = data
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, prop)| {
                        let kind = prop.get("type").and_then(Value::as_str).unwrap_or("unknown");
                        (name.clone(), kind.to_string())
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self { title, properties }
    }
}

impl fmt::Display for DatabaseSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Database: {}", self.title)?;
        write!(f, "Properties:")?;
        for (name, kind) in &self.properties {
            write!(f, "\n• {} ({})", name, kind)?;
        }
        Ok(())
    }
}

/// One database page, reduced to what the listing shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    pub id: String,
    pub title: String,
}

impl PageSummary {
    /// Title is the first text of the first `title`-typed property
    pub fn from_value(page: &Value) -> Self {
        let id = page.get("id").and_then(Value::as_str).unwrap_or_default().to_string();

        let title = page
            .get("properties")
            .and_then(Value::as_object)
            .and_then(|props| props.values().find(|prop| prop.get("type").and_then(Value::as_str) == Some("title")))
            .and_then(|prop| prop.get("title"))
            .and_then(first_text)
            .unwrap_or(UNTITLED_PAGE)
            .to_string();

        Self { id, title }
    }
}

impl fmt::Display for PageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "- {} (ID: {})", self.title, self.id)
    }
}

/// One page of a database query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPage {
    pub results: Vec<PageSummary>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

impl QueryPage {
    pub fn from_value(data: &Value) -> Self {
        let results = data
            .get("results")
            .and_then(Value::as_array)
            .map(|pages| pages.iter().map(PageSummary::from_value).collect())
            .unwrap_or_default();

        Self {
            results,
            has_more: data.get("has_more").and_then(Value::as_bool).unwrap_or(false),
            next_cursor: data.get("next_cursor").and_then(Value::as_str).map(str::to_string),
        }
    }
}
