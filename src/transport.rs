//! Single low-level HTTP helper shared by both clients.
//!
//! Every operation method performs exactly one call through here; there is
//! no retry and redirects are capped. Non-2xx responses are decoded into
//! [`PgError::Vendor`] when the gateway sent a structured error body.

use std::time::Duration;

use http::HeaderMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::{PgError, PgResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_REDIRECTS: usize = 10;

/// Fields the gateway puts in structured error bodies. Both API generations
/// use some subset of these; everything is optional.
#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
}

impl Transport {
    pub fn new() -> PgResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| PgError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Transport { client })
    }

    /// Use a caller-provided reqwest client instead of the default one.
    pub fn with_client(client: reqwest::Client) -> Self {
        Transport { client }
    }

    pub async fn post_json<Req, Res>(
        &self,
        url: &str,
        headers: HeaderMap,
        body: &Req,
    ) -> PgResult<Res>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        debug!(url, "POST");
        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn get_json<Res>(&self, url: &str, headers: HeaderMap) -> PgResult<Res>
    where
        Res: DeserializeOwned,
    {
        debug!(url, "GET");
        let response = self.client.get(url).headers(headers).send().await?;
        Self::decode(response).await
    }

    /// Form-encoded POST, used by the OAuth token endpoint.
    pub async fn post_form<Req, Res>(
        &self,
        url: &str,
        headers: HeaderMap,
        form: &Req,
    ) -> PgResult<Res>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        debug!(url, "POST (form)");
        let response = self
            .client
            .post(url)
            .headers(headers)
            .form(form)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<Res: DeserializeOwned>(response: reqwest::Response) -> PgResult<Res> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            debug!(status = status.as_u16(), "gateway returned error status");
            let (code, message) = match serde_json::from_str::<ErrorBody>(&text) {
                Ok(body) => (
                    body.code
                        .or(body.error_code)
                        .unwrap_or_else(|| status.as_str().to_string()),
                    body.message.unwrap_or_else(|| text.clone()),
                ),
                Err(_) => (status.as_str().to_string(), text),
            };
            return Err(PgError::Vendor {
                status: status.as_u16(),
                code,
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            PgError::Protocol(format!("Unexpected response body ({status}): {e}"))
        })
    }
}
