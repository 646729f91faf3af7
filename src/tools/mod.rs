//! Data-source collaborator
//!
//! Resolves fetch parameters to game records and a total count.
//! The HTTP-backed implementation calls the RAWG games endpoint.

use crate::config::Settings;
use crate::error::OrchestrationError;
use crate::models::{FetchParams, FetchResponse, Record};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

pub mod catalog;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 40;
const REDACTED: &str = "[redacted]";

/// Trait for the game data source
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self, params: &FetchParams) -> Result<FetchResponse>;
}

/// RAWG REST client
#[derive(Clone)]
pub struct RawgClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RawgClient {
    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            settings.rawg_api_key.clone(),
            &settings.rawg_base_url,
            settings.http_timeout,
        )
    }

    /// Query pairs for a fetch, excluding the API key.
    ///
    /// Unknown platform or genre names are dropped.
    pub fn query_pairs(params: &FetchParams) -> Vec<(String, String)> {
        let mut pairs = Vec::new();

        let page_size = params
            .page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        pairs.push(("page_size".to_string(), page_size.to_string()));

        let platform_ids = resolve_ids(&params.platforms, catalog::platform_id, "platform");
        if !platform_ids.is_empty() {
            pairs.push(("platforms".to_string(), platform_ids));
        }

        let genre_ids = resolve_ids(&params.genres, catalog::genre_id, "genre");
        if !genre_ids.is_empty() {
            pairs.push(("genres".to_string(), genre_ids));
        }

        if let Some(dates) = &params.dates {
            pairs.push(("dates".to_string(), format!("{},{}", dates.from, dates.to)));
        }

        if let Some(range) = &params.metacritic {
            let min = range.min.unwrap_or(0).min(100);
            let max = range.max.unwrap_or(100).min(100);
            pairs.push(("metacritic".to_string(), format!("{},{}", min, max)));
        }

        if let Some(search) = params.search.as_deref().filter(|s| !s.trim().is_empty()) {
            pairs.push(("search".to_string(), search.trim().to_string()));
            if params.search_exact {
                pairs.push(("search_exact".to_string(), "true".to_string()));
            }
        }

        if let Some(developers) = params.developers.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("developers".to_string(), developers.to_string()));
        }

        if let Some(publishers) = params.publishers.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("publishers".to_string(), publishers.to_string()));
        }

        if params.exclude_additions {
            pairs.push(("exclude_additions".to_string(), "true".to_string()));
        }

        if let Some(ordering) = params.ordering.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("ordering".to_string(), ordering.to_string()));
        }

        pairs
    }
}

fn resolve_ids(names: &[String], lookup: fn(&str) -> Option<u32>, label: &str) -> String {
    names
        .iter()
        .filter_map(|name| {
            let id = lookup(name);
            if id.is_none() {
                debug!(name = %name, kind = label, "Dropping unknown name");
            }
            id
        })
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Echo of the sent query with the API key redacted.
fn echo_params(pairs: &[(String, String)]) -> Value {
    let mut echoed = Map::new();
    for (key, value) in pairs {
        echoed.insert(key.clone(), Value::String(value.clone()));
    }
    echoed.insert("key".to_string(), Value::String(REDACTED.to_string()));
    Value::Object(echoed)
}

#[async_trait]
impl DataSource for RawgClient {
    async fn fetch(&self, params: &FetchParams) -> Result<FetchResponse> {
        if self.api_key.is_empty() {
            return Err(OrchestrationError::Config(
                "RAWG_API_KEY not configured".to_string(),
            ));
        }

        let pairs = Self::query_pairs(params);
        let url = format!("{}/games", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&pairs)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                OrchestrationError::DataSource(format!("RAWG request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "RAWG returned an error status");
            return Err(OrchestrationError::DataSource(format!(
                "RAWG returned {}: {}",
                status, body
            )));
        }

        let page: RawgPage = response.json().await.map_err(|e| {
            OrchestrationError::DataSource(format!("Invalid RAWG response: {}", e))
        })?;

        debug!(
            total_count = page.count,
            returned = page.results.len(),
            "RAWG fetch complete"
        );

        Ok(FetchResponse {
            total_count: page.count,
            records: page.results.into_iter().map(Record::from).collect(),
            echoed_params: echo_params(&pairs),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawgPage {
    count: u64,
    #[serde(default)]
    results: Vec<RawgGame>,
}

#[derive(Debug, Deserialize)]
struct RawgGame {
    id: i64,
    name: String,
    #[serde(default)]
    slug: String,
    released: Option<String>,
    metacritic: Option<f64>,
    rating: Option<f64>,
    ratings_count: Option<f64>,
    #[serde(default)]
    platforms: Option<Vec<RawgPlatformEntry>>,
    #[serde(default)]
    genres: Option<Vec<RawgNamed>>,
}

#[derive(Debug, Deserialize)]
struct RawgPlatformEntry {
    platform: RawgNamed,
}

#[derive(Debug, Deserialize)]
struct RawgNamed {
    name: String,
}

impl From<RawgGame> for Record {
    fn from(game: RawgGame) -> Self {
        Record {
            id: game.id,
            name: game.name,
            slug: game.slug,
            released: game.released,
            metacritic: game.metacritic,
            rating: game.rating,
            ratings_count: game.ratings_count,
            platforms: game
                .platforms
                .unwrap_or_default()
                .into_iter()
                .map(|p| p.platform.name)
                .collect(),
            genres: game
                .genres
                .unwrap_or_default()
                .into_iter()
                .map(|g| g.name)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateRange, ScoreRange};
    use mockito::Matcher;
    use serde_json::json;

    fn pair<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_query_pairs_resolve_names_and_drop_unknown() {
        let params = FetchParams {
            platforms: vec!["PS5".to_string(), "Dreamcast".to_string(), "PC".to_string()],
            genres: vec!["Made Up Genre".to_string()],
            dates: Some(DateRange {
                from: "2020-01-01".to_string(),
                to: "2020-12-31".to_string(),
            }),
            metacritic: Some(ScoreRange { min: Some(80), max: None }),
            page_size: Some(100),
            ..FetchParams::default()
        };

        let pairs = RawgClient::query_pairs(&params);
        assert_eq!(pair(&pairs, "platforms"), Some("187,4"));
        assert_eq!(pair(&pairs, "genres"), None);
        assert_eq!(pair(&pairs, "dates"), Some("2020-01-01,2020-12-31"));
        assert_eq!(pair(&pairs, "metacritic"), Some("80,100"));
        assert_eq!(pair(&pairs, "page_size"), Some("40"));
        assert_eq!(pair(&pairs, "key"), None);
    }

    #[test]
    fn test_search_exact_only_sent_with_search() {
        let params = FetchParams {
            search_exact: true,
            ..FetchParams::default()
        };
        let pairs = RawgClient::query_pairs(&params);
        assert_eq!(pair(&pairs, "search_exact"), None);
        assert_eq!(pair(&pairs, "page_size"), Some("20"));
    }

    #[tokio::test]
    async fn test_fetch_maps_records_and_redacts_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/games")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("key".into(), "secret-key".into()),
                Matcher::UrlEncoded("genres".into(), "5".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "count": 1234,
                    "results": [
                        {
                            "id": 1,
                            "slug": "elden-ring",
                            "name": "Elden Ring",
                            "released": "2022-02-25",
                            "metacritic": 94,
                            "rating": 4.4,
                            "ratings_count": 3000,
                            "platforms": [{ "platform": { "id": 4, "name": "PC" } }],
                            "genres": [{ "id": 5, "name": "RPG" }]
                        },
                        {
                            "id": 2,
                            "slug": "obscure",
                            "name": "Obscure",
                            "metacritic": null,
                            "rating": 0,
                            "ratings_count": 0,
                            "platforms": null
                        }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = RawgClient::new(
            "secret-key".to_string(),
            &server.url(),
            Duration::from_secs(5),
        )
        .unwrap();
        let params = FetchParams {
            genres: vec!["RPG".to_string()],
            ..FetchParams::default()
        };

        let response = client.fetch(&params).await.unwrap();
        mock.assert_async().await;

        assert_eq!(response.total_count, 1234);
        assert_eq!(response.records.len(), 2);
        assert_eq!(response.records[0].metacritic, Some(94.0));
        assert_eq!(response.records[0].platforms, vec!["PC".to_string()]);
        assert_eq!(response.records[1].metacritic, None);
        assert!(response.records[1].platforms.is_empty());
        assert_eq!(response.echoed_params["key"], REDACTED);
        assert_eq!(response.echoed_params["genres"], "5");
    }

    #[tokio::test]
    async fn test_error_status_is_data_source_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/games")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("{\"error\": \"bad key\"}")
            .create_async()
            .await;

        let client =
            RawgClient::new("wrong".to_string(), &server.url(), Duration::from_secs(5)).unwrap();
        let err = client.fetch(&FetchParams::default()).await.unwrap_err();

        match err {
            OrchestrationError::DataSource(message) => assert!(message.contains("401")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_key_is_config_error() {
        let client =
            RawgClient::new(String::new(), "http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let err = client.fetch(&FetchParams::default()).await.unwrap_err();
        assert!(matches!(err, OrchestrationError::Config(_)));
    }
}
