//! Notion connector: writes conversation summaries into a database and
//! reads the database back (schema and page listing).

pub mod client;
pub mod types;

pub use client::{NOTION_VERSION, NotionClient, PageQuery, collect_pages};
pub use types::{DatabaseSchema, PageSummary, QueryPage, SummaryProperties, summary_page_payload};
