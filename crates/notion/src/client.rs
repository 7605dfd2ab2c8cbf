use chrono::{DateTime, Local};
use notechat_core::{AppConfig, Error, Result};
use reqwest::Client as HttpClient;
use serde_json::{Value, json};

use crate::types::*;

pub const NOTION_VERSION: &str = "2022-06-28";
/// Largest page the query endpoint hands out
pub const PAGE_SIZE: u32 = 100;

/// One round trip of a paginated database query
#[async_trait::async_trait]
pub trait PageQuery: Send + Sync {
    async fn query_page(&self, cursor: Option<&str>) -> Result<QueryPage>;
}

/// Follow `next_cursor` until the database reports no more pages.
///
/// Stops as well when `has_more` is set without a cursor to continue from.
pub async fn collect_pages(source: &dyn PageQuery) -> Result<Vec<PageSummary>> {
    let mut pages = Vec::new();
    let mut cursor: Option<String> = None;
    let mut round = 0usize;

    loop {
        let page = source.query_page(cursor.as_deref()).await?;
        round += 1;
        pages.extend(page.results);

        match (page.has_more, page.next_cursor) {
            (true, Some(next)) => cursor = Some(next),
            (true, None) => {
                tracing::warn!(round, "query reported more pages without a cursor; stopping");
                break;
            }
            (false, _) => break,
        }
    }

    tracing::info!(pages = pages.len(), rounds = round, "fetched database pages");
    Ok(pages)
}

/// REST client for one Notion database
pub struct NotionClient {
    http: HttpClient,
    api_base: String,
    token: String,
    database_id: String,
    properties: SummaryProperties,
}

impl NotionClient {
    pub fn new(
        api_base: impl Into<String>, token: impl Into<String>, database_id: impl Into<String>,
        properties: SummaryProperties,
    ) -> Self {
        let api_base: String = api_base.into();
        Self {
            http: HttpClient::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.into(),
            database_id: database_id.into(),
            properties,
        }
    }

    /// Client for the configured database; fails if a secret is missing
    pub fn from_config(app: &AppConfig) -> Result<Self> {
        let notion = &app.config.notion;
        Ok(Self::new(
            notion.api_base.clone(),
            app.secrets.notion_token()?,
            app.secrets.notion_database_id()?,
            SummaryProperties::from(notion),
        ))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        tracing::info!(method = method.as_str(), endpoint = path, "notion request");
        self.http
            .request(method, self.url(path))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Notion-Version", NOTION_VERSION)
    }

    /// Send and read the body as JSON, failing on any non-2xx status
    async fn send_json(&self, builder: reqwest::RequestBuilder) -> Result<Value> {
        let response = builder.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "notion request failed");
            return Err(Error::http(status.as_u16(), body));
        }

        serde_json::from_str(&body).map_err(|e| Error::Decode(format!("invalid notion response: {}", e)))
    }

    /// Record a summary as a new database page.
    ///
    /// Only `200 OK` counts as written; any other status returns the body verbatim.
    pub async fn create_summary_page(&self, summary: &str, now: DateTime<Local>) -> Result<()> {
        let payload = summary_page_payload(&self.database_id, &self.properties, summary, &now);

        let response = self
            .request(reqwest::Method::POST, "/v1/pages")
            .json(&payload)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status, "summary page was not created");
            return Err(Error::http(status, body));
        }

        tracing::info!(chars = summary.chars().count(), "summary page created");
        Ok(())
    }

    pub async fn database_schema(&self) -> Result<DatabaseSchema> {
        let path = format!("/v1/databases/{}", self.database_id);
        let data = self.send_json(self.request(reqwest::Method::GET, &path)).await?;
        Ok(DatabaseSchema::from_value(&data))
    }

    /// Every page in the database, across as many queries as it takes
    pub async fn query_all_pages(&self) -> Result<Vec<PageSummary>> {
        collect_pages(self).await
    }
}

#[async_trait::async_trait]
impl PageQuery for NotionClient {
    async fn query_page(&self, cursor: Option<&str>) -> Result<QueryPage> {
        let mut payload = json!({ "page_size": PAGE_SIZE });
        if let Some(cursor) = cursor {
            payload["start_cursor"] = json!(cursor);
        }

        let path = format!("/v1/databases/{}/query", self.database_id);
        let data = self.send_json(self.request(reqwest::Method::POST, &path).json(&payload)).await?;
        Ok(QueryPage::from_value(&data))
    }
}

fn transport(err: reqwest::Error) -> Error {
    Error::Transport(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notechat_core::{Config, Secrets};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned pages keyed by cursor and records what was asked
    struct FakeDatabase {
        pages: HashMap<Option<String>, QueryPage>,
        seen: Mutex<Vec<Option<String>>>,
    }

    impl FakeDatabase {
        fn new(pages: Vec<(Option<&str>, QueryPage)>) -> Self {
            let pages = pages.into_iter().map(|(cursor, page)| (cursor.map(str::to_string), page)).collect();
            Self { pages, seen: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait::async_trait]
    impl PageQuery for FakeDatabase {
        async fn query_page(&self, cursor: Option<&str>) -> Result<QueryPage> {
            let key = cursor.map(str::to_string);
            self.seen.lock().unwrap().push(key.clone());
            self.pages
                .get(&key)
                .cloned()
                .ok_or_else(|| Error::http(400, format!("unknown cursor {:?}", key)))
        }
    }

    fn page(ids: &[&str], has_more: bool, next_cursor: Option<&str>) -> QueryPage {
        QueryPage {
            results: ids
                .iter()
                .map(|id| PageSummary { id: id.to_string(), title: format!("title {}", id) })
                .collect(),
            has_more,
            next_cursor: next_cursor.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_collect_pages_follows_cursors() {
        let db = FakeDatabase::new(vec![
            (None, page(&["a", "b"], true, Some("c1"))),
            (Some("c1"), page(&["c"], true, Some("c2"))),
            (Some("c2"), page(&["d"], false, None)),
        ]);

        let pages = collect_pages(&db).await.unwrap();
        let ids: Vec<&str> = pages.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert_eq!(*db.seen.lock().unwrap(), vec![None, Some("c1".to_string()), Some("c2".to_string())]);
    }

    #[tokio::test]
    async fn test_collect_pages_stops_without_cursor() {
        let db = FakeDatabase::new(vec![(None, page(&["a"], true, None))]);

        let pages = collect_pages(&db).await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(db.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_collect_pages_ignores_cursor_when_done() {
        let db = FakeDatabase::new(vec![(None, page(&[], false, Some("stale")))]);
        assert!(collect_pages(&db).await.unwrap().is_empty());
        assert_eq!(db.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_collect_pages_propagates_errors() {
        let db = FakeDatabase::new(vec![(None, page(&["a"], true, Some("missing")))]);
        let err = collect_pages(&db).await.unwrap_err();
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_from_config_requires_secrets() {
        let config = Config::default();
        let secrets = Secrets::resolve(&config, |_| None);
        let app = AppConfig::new(config, secrets);
        assert!(matches!(NotionClient::from_config(&app), Err(Error::MissingSecret(_))));
    }

    #[test]
    fn test_from_config() {
        let config = Config::default();
        let secrets = Secrets::resolve(&config, |name| match name {
            "NOTION_TOKEN" => Some("tok".to_string()),
            "database_id" => Some("db-9".to_string()),
            _ => None,
        });
        let client = NotionClient::from_config(&AppConfig::new(config, secrets)).unwrap();
        assert_eq!(client.database_id, "db-9");
        assert_eq!(client.url("/v1/pages"), "https://api.notion.com/v1/pages");
        assert_eq!(client.properties, SummaryProperties::default());
    }
}
