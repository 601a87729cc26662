//! Reqwest-backed client for the Modrinth v2 REST API.

use std::time::Duration;

use anyhow::Context;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::error::CatalogError;
use super::models::{LoaderFilter, PluginDetails, PluginSummary, PluginVersion};
use super::CatalogClient;

/// Production API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.modrinth.com/v2";

/// Per-request timeout; a timeout surfaces as [`CatalogError::Transient`].
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Search page size.
const SEARCH_LIMIT: usize = 20;

const USER_AGENT: &str = concat!("quarry/", env!("CARGO_PKG_VERSION"));

/// Typed access to the Modrinth catalog.
///
/// Holds a shared [`reqwest::Client`]; cloning is cheap and all clones
/// reuse the same connection pool.
#[derive(Debug, Clone)]
pub struct ModrinthClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ModrinthClient {
    /// Build a client against the production API.
    pub fn new() -> anyhow::Result<Self> {
        let base_url = Url::parse(DEFAULT_API_URL).context("Failed to parse default API URL")?;
        Self::with_base_url(base_url)
    }

    /// Build a client against a custom endpoint (mirrors, tests).
    pub fn with_base_url(base_url: Url) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http, base_url })
    }

    /// The underlying HTTP client, for sharing with the downloader.
    pub fn http(&self) -> reqwest::Client {
        self.http.clone()
    }

    fn endpoint(&self, segments: &[&str]) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            segments.join("/")
        )
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
        resource: &str,
    ) -> Result<T, CatalogError> {
        let url = self.endpoint(segments);
        tracing::debug!(%url, "catalog request");

        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|err| classify_send_error(&err))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::not_found(resource));
        }
        if status == StatusCode::REQUEST_TIMEOUT
            || status == StatusCode::TOO_MANY_REQUESTS
            || status.is_server_error()
        {
            return Err(CatalogError::transient(format!(
                "catalog answered HTTP {status}"
            )));
        }
        if !status.is_success() {
            return Err(CatalogError::malformed(format!(
                "unexpected HTTP {status} from catalog"
            )));
        }

        response.json::<T>().await.map_err(|err| {
            if err.is_decode() {
                CatalogError::malformed(format!("response did not match the expected shape: {err}"))
            } else {
                CatalogError::transient(err.to_string())
            }
        })
    }
}

/// Facet expression for a plugin search: always restricted to plugins,
/// optionally OR-restricted to a loader set.
fn search_facets(filter: &LoaderFilter) -> String {
    let mut facets = vec![vec!["project_type:plugin".to_string()]];
    let loaders = filter.loaders();
    if !loaders.is_empty() {
        facets.push(loaders.iter().map(|l| format!("categories:{l}")).collect());
    }
    let value = Value::Array(
        facets
            .into_iter()
            .map(|group| Value::Array(group.into_iter().map(Value::String).collect()))
            .collect(),
    );
    value.to_string()
}

fn classify_send_error(err: &reqwest::Error) -> CatalogError {
    if err.is_timeout() {
        CatalogError::transient("request timed out")
    } else {
        CatalogError::transient(err.to_string())
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: Vec<PluginSummary>,
}

impl CatalogClient for ModrinthClient {
    async fn search(
        &self,
        query: &str,
        filter: &LoaderFilter,
    ) -> Result<Vec<PluginSummary>, CatalogError> {
        let params = [
            ("query", query.to_string()),
            ("facets", search_facets(filter)),
            ("limit", SEARCH_LIMIT.to_string()),
            ("index", "relevance".to_string()),
        ];
        let response: SearchResponse = self
            .get_json(&["search"], &params, "search results")
            .await?;
        Ok(response.hits)
    }

    async fn get_plugin(&self, id_or_slug: &str) -> Result<PluginDetails, CatalogError> {
        self.get_json(
            &["project", id_or_slug],
            &[],
            &format!("plugin '{id_or_slug}'"),
        )
        .await
    }

    async fn get_versions(&self, plugin_id: &str) -> Result<Vec<PluginVersion>, CatalogError> {
        self.get_json(
            &["project", plugin_id, "version"],
            &[],
            &format!("versions of plugin '{plugin_id}'"),
        )
        .await
    }

    async fn get_version(&self, version_id: &str) -> Result<PluginVersion, CatalogError> {
        self.get_json(
            &["version", version_id],
            &[],
            &format!("version '{version_id}'"),
        )
        .await
    }
}
