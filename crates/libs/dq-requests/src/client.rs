//! Management API client.

use std::time::Duration;

use dq_output::TaskOutput;
use dq_results::{ChangeMsg, WatchDecoder};
use reqwest::{Response, StatusCode, header};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc::Sender;
use tracing::{debug, info, trace};

use crate::{
    manifest::{DEFAULT_API_VERSION, Manifest, Resource, kind_route},
    prelude::*,
};

/// HTTP client for the management API.
///
/// Multi-resource operations report one task per manifest and stop at the
/// first failure.
#[derive(Debug, Clone)]
pub struct ApiClient {
    url: String,
    client: reqwest::Client,
}

impl ApiClient {
    /// Client for the API rooted at `url`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dq_requests::ApiClient;
    ///
    /// let client = ApiClient::new("http://localhost:8080/");
    /// assert_eq!(client.url(), "http://localhost:8080");
    /// ```
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into().trim_end_matches('/').to_string();
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn resource_url(&self, api_version: &str, kind: &str, name: &str) -> Result<String> {
        Ok(format!("{}/{api_version}/{}/{name}", self.url, kind_route(kind)?))
    }

    /// Create or replace every manifest.
    pub async fn apply(&self, manifests: &[Manifest], output: &TaskOutput) -> Result<()> {
        for manifest in manifests {
            let subject = format!("Apply: {}/{}", manifest.kind, manifest.name);
            output.add_task(&subject, &subject).await;

            match self.apply_one(manifest).await {
                Ok(()) => output.succeed_task(&subject, format!("{subject}: complete")).await,
                Err(err) => {
                    output
                        .fail_task(&subject, format!("Error: {subject}: {err}"))
                        .await;
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    async fn apply_one(&self, manifest: &Manifest) -> Result<()> {
        let url = self.resource_url(
            manifest.api_version(),
            &manifest.kind,
            &manifest.resource_name(),
        )?;
        let body = serde_json::to_vec(&manifest.spec)?;
        debug!("PUT {url}");
        let response = self
            .client
            .put(url)
            .header(header::CONTENT_TYPE, "application/json")
            .header("api-version", manifest.api_version())
            .body(body)
            .send()
            .await?;
        expect_status(response, StatusCode::OK).await?;
        Ok(())
    }

    /// Delete every manifest's resource.
    pub async fn delete(&self, manifests: &[Manifest], output: &TaskOutput) -> Result<()> {
        for manifest in manifests {
            let subject = format!("Delete: {}/{}", manifest.kind, manifest.name);
            output.add_task(&subject, &subject).await;

            match self.delete_one(manifest).await {
                Ok(()) => output.succeed_task(&subject, format!("{subject}: complete")).await,
                Err(err) => {
                    output
                        .fail_task(&subject, format!("Error: {subject}: {err}"))
                        .await;
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    async fn delete_one(&self, manifest: &Manifest) -> Result<()> {
        let url = self.resource_url(
            manifest.api_version(),
            &manifest.kind,
            &manifest.resource_name(),
        )?;
        debug!("DELETE {url}");
        let response = self.client.delete(url).send().await?;
        expect_status(response, StatusCode::NO_CONTENT).await?;
        Ok(())
    }

    /// Wait until every manifest's resource reports ready.
    ///
    /// The server holds each request for up to `timeout_secs`.
    pub async fn ready_wait(
        &self,
        manifests: &[Manifest],
        timeout_secs: u64,
        output: &TaskOutput,
    ) -> Result<()> {
        for manifest in manifests {
            let subject = format!("Wait {}/{}", manifest.kind, manifest.name);
            output
                .add_task(
                    &subject,
                    format!("Waiting for {}/{} to come online", manifest.kind, manifest.name),
                )
                .await;

            match self.ready_wait_one(manifest, timeout_secs).await {
                Ok(()) => output.succeed_task(&subject, format!("{subject} online")).await,
                Err(err) => {
                    output
                        .fail_task(&subject, format!("Error: {subject}: {err}"))
                        .await;
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    async fn ready_wait_one(&self, manifest: &Manifest, timeout_secs: u64) -> Result<()> {
        let url = format!(
            "{}/ready-wait",
            self.resource_url(manifest.api_version(), &manifest.kind, &manifest.name)?
        );
        debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .query(&[("timeout", timeout_secs)])
            .timeout(Duration::from_secs(timeout_secs + 1))
            .send()
            .await?;
        expect_status(response, StatusCode::OK).await?;
        Ok(())
    }

    /// Fetch one resource.
    pub async fn get_resource(&self, kind: &str, name: &str) -> Result<Resource> {
        let url = self.resource_url(DEFAULT_API_VERSION, kind, name)?;
        self.get_json(url).await
    }

    /// List every resource of a kind.
    pub async fn list_resources(&self, kind: &str) -> Result<Vec<Resource>> {
        let url = format!("{}/{DEFAULT_API_VERSION}/{}", self.url, kind_route(kind)?);
        self.get_json(url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        debug!("GET {url}");
        let response = self.client.get(url).send().await?;
        let response = expect_status(response, StatusCode::OK).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Stream the change batches of a resource's watch into `tx`.
    ///
    /// Returns once the server closes the stream or the receiver is dropped.
    pub async fn watch(&self, kind: &str, name: &str, tx: Sender<ChangeMsg>) -> Result<()> {
        let url = format!("{}/watch", self.resource_url(DEFAULT_API_VERSION, kind, name)?);
        debug!("GET {url}");
        let response = self.client.get(url).send().await?;
        let mut response = expect_status(response, StatusCode::OK).await?;

        let mut decoder = WatchDecoder::new();
        while let Some(chunk) = response.chunk().await? {
            trace!("Watch chunk of {} bytes", chunk.len());
            for change in decoder.push(&chunk)? {
                if tx.send(change).await.is_err() {
                    info!("Watch receiver dropped, closing stream for {kind}/{name}");
                    return Ok(());
                }
            }
        }
        decoder.finish()?;
        Ok(())
    }
}

async fn expect_status(response: Response, expected: StatusCode) -> Result<Response> {
    let status = response.status();
    if status == expected {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Status { status, body })
}
