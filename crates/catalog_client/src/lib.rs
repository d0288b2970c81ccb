//! DriverCore catalog HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required). One client, and so
//! one connection pool, is reused for every call of a run.

use std::time::Duration;

use drivercore_recon::config::CatalogConfig;
use drivercore_recon::model::{CatalogEntity, Lookup};
use drivercore_recon::{CatalogClient, CatalogError};

const API_PATH: &str = "/api/DriverCore";

/// DriverCore catalog client (blocking).
#[derive(Clone)]
pub struct HttpCatalogClient {
    http: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpCatalogClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, CatalogError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("oxldut/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Network(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: endpoint.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &CatalogConfig) -> Result<Self, CatalogError> {
        Self::new(&config.endpoint, Duration::from_secs(config.timeout_secs))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn send(&self, request: reqwest::blocking::RequestBuilder) -> Result<reqwest::blocking::Response, CatalogError> {
        request.send().map_err(|e| CatalogError::Network(e.to_string()))
    }

    fn check(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, CatalogError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(CatalogError::Http(status.as_u16(), body));
        }
        Ok(response)
    }
}

impl CatalogClient for HttpCatalogClient {
    fn lookup_by_uid(&self, uid: &str) -> Result<Lookup, CatalogError> {
        let url = format!("{}{API_PATH}/uid/{uid}", self.endpoint);
        log::debug!("GET {url}");

        let response = self.send(self.http.get(&url))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Lookup::NotFound);
        }
        let body = Self::check(response)?
            .text()
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        if body.trim().is_empty() {
            return Ok(Lookup::NotFound);
        }
        let matches: Vec<CatalogEntity> =
            serde_json::from_str(&body).map_err(|e| CatalogError::Parse(format!("lookup {uid}: {e}")))?;
        Ok(Lookup::from_matches(matches))
    }

    fn create(&self, entity: &CatalogEntity) -> Result<Option<i64>, CatalogError> {
        let url = format!("{}{API_PATH}", self.endpoint);
        log::debug!("POST {url} ({})", entity.uid);

        let response = Self::check(self.send(self.http.post(&url).json(entity))?)?;
        // The record is written at this point; an unreadable echo only
        // costs us the id.
        let body = response.text().unwrap_or_default();
        Ok(assigned_id(&body))
    }

    fn update(&self, id: i64, entity: &CatalogEntity) -> Result<(), CatalogError> {
        let url = format!("{}{API_PATH}/{id}", self.endpoint);
        log::debug!("PUT {url} ({})", entity.uid);

        Self::check(self.send(self.http.put(&url).json(entity))?)?;
        Ok(())
    }
}

/// Id from a create response: the echoed record, or a bare number.
fn assigned_id(body: &str) -> Option<i64> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .as_i64()
        .or_else(|| value.get("id").and_then(|v| v.as_i64()))
        .or_else(|| value.get("Id").and_then(|v| v.as_i64()))
}
