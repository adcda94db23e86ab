//! Thin typed client over Trilium's ETAPI.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, info};

use wikilink_core::defaults::QUERY_TIMEOUT_MS;
use wikilink_core::{Error, Result};

use crate::types::{
    CreateAttributeRequest, CreateNoteRequest, CreateNoteResponse, EtapiAttribute,
    EtapiErrorBody, EtapiNote, PatchAttributeRequest, SearchResponse,
};

/// Connection settings for an ETAPI endpoint.
#[derive(Debug, Clone)]
pub struct EtapiConfig {
    /// Server URL, e.g. `http://localhost:8080`. `/etapi` is appended.
    pub base_url: String,
    /// ETAPI token from Trilium's Options → ETAPI.
    pub token: String,
    pub timeout: Duration,
}

impl EtapiConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            timeout: Duration::from_millis(QUERY_TIMEOUT_MS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read `TRILIUM_ETAPI_URL` and `TRILIUM_ETAPI_TOKEN`.
    ///
    /// Returns `None` when either is unset.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("TRILIUM_ETAPI_URL").ok()?;
        let token = std::env::var("TRILIUM_ETAPI_TOKEN").ok()?;
        Some(Self::new(url, token))
    }

    fn api_root(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/etapi") {
            base.to_string()
        } else {
            format!("{base}/etapi")
        }
    }
}

/// ETAPI client.
pub struct EtapiClient {
    client: Client,
    api_root: String,
    token: String,
}

impl EtapiClient {
    pub fn new(config: EtapiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Request(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "etapi",
            component = "client",
            url = %config.base_url,
            timeout_ms = config.timeout.as_millis() as u64,
            "Initializing ETAPI client"
        );

        Ok(Self {
            client,
            api_root: config.api_root(),
            token: config.token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_root, path)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("Authorization", &self.token)
    }

    /// Run a search expression, optionally under an ancestor.
    pub async fn search(
        &self,
        search: &str,
        ancestor_note_id: Option<&str>,
        order_by: Option<(&str, &str)>,
        limit: Option<usize>,
    ) -> Result<Vec<EtapiNote>> {
        let mut params: Vec<(&str, String)> = vec![("search", search.to_string())];
        if let Some(ancestor) = ancestor_note_id {
            params.push(("ancestorNoteId", ancestor.to_string()));
        }
        if let Some((field, direction)) = order_by {
            params.push(("orderBy", field.to_string()));
            params.push(("orderDirection", direction.to_string()));
        }
        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }

        debug!(subsystem = "etapi", op = "search", search, "ETAPI search");

        let response = self
            .authed(self.client.get(self.url("/notes")))
            .query(&params)
            .send()
            .await?;
        let body: SearchResponse = check(response).await?.json().await?;
        Ok(body.results)
    }

    /// Fetch a note; `None` on 404.
    pub async fn get_note(&self, note_id: &str) -> Result<Option<EtapiNote>> {
        let response = self
            .authed(self.client.get(self.url(&format!("/notes/{note_id}"))))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check(response).await?.json().await?))
    }

    pub async fn get_content(&self, note_id: &str) -> Result<String> {
        let response = self
            .authed(self.client.get(self.url(&format!("/notes/{note_id}/content"))))
            .send()
            .await?;
        Ok(check(response).await?.text().await?)
    }

    pub async fn put_content(&self, note_id: &str, content: &str) -> Result<()> {
        let response = self
            .authed(self.client.put(self.url(&format!("/notes/{note_id}/content"))))
            .header("Content-Type", "text/plain")
            .body(content.to_string())
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    pub async fn create_note(&self, request: &CreateNoteRequest<'_>) -> Result<CreateNoteResponse> {
        let response = self
            .authed(self.client.post(self.url("/create-note")))
            .json(request)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn create_attribute(
        &self,
        request: &CreateAttributeRequest<'_>,
    ) -> Result<EtapiAttribute> {
        let response = self
            .authed(self.client.post(self.url("/attributes")))
            .json(request)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn patch_attribute(&self, attribute_id: &str, value: &str) -> Result<()> {
        let response = self
            .authed(
                self.client
                    .patch(self.url(&format!("/attributes/{attribute_id}"))),
            )
            .json(&PatchAttributeRequest { value })
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    pub async fn delete_note(&self, note_id: &str) -> Result<()> {
        let response = self
            .authed(self.client.delete(self.url(&format!("/notes/{note_id}"))))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NoteNotFound(note_id.to_string()));
        }
        check(response).await?;
        Ok(())
    }
}

/// Turn a non-2xx response into [`Error::Store`].
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body: EtapiErrorBody = response.json().await.unwrap_or(EtapiErrorBody {
        code: None,
        message: "Unknown error".to_string(),
    });
    let message = match body.code {
        Some(code) => format!("{code}: {}", body.message),
        None => body.message,
    };
    Err(Error::Store {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_root_appends_etapi_once() {
        assert_eq!(
            EtapiConfig::new("http://localhost:8080/", "t").api_root(),
            "http://localhost:8080/etapi"
        );
        assert_eq!(
            EtapiConfig::new("http://localhost:8080/etapi", "t").api_root(),
            "http://localhost:8080/etapi"
        );
    }
}
