//! Client for the v1 (Hermes) API, authenticated per request with the
//! `X-VERIFY` signature scheme.

use http::HeaderMap;
use http::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;

use crate::credentials::MerchantCredentials;
use crate::env::{Environment, join_url};
use crate::errors::{PgError, PgResult};
use crate::normalize::{
    HermesEnvelope, normalize_hermes_refund, normalize_pay_page, normalize_transaction_status,
};
use crate::signature::{encode_payload, sign_path, sign_payload};
use crate::transport::Transport;
use crate::types::{HermesRefundRequest, PayPageOutcome, PayPageRequest, RefundOutcome, TransactionStatus};

const PAY_PATH: &str = "/pg/v1/pay";
const STATUS_PATH: &str = "/pg/v1/status";
const REFUND_PATH: &str = "/pg/v1/refund";

/// The signed payload travels base64-encoded inside this envelope.
#[derive(Debug, Serialize)]
struct RequestEnvelope {
    request: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PayPagePayload<'a> {
    merchant_id: &'a str,
    merchant_transaction_id: &'a str,
    merchant_user_id: &'a str,
    amount: i64,
    redirect_url: &'a str,
    redirect_mode: &'a str,
    callback_url: &'a str,
    mobile_number: &'a str,
    payment_instrument: PaymentInstrument<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentInstrument<'a> {
    #[serde(rename = "type")]
    instrument_type: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefundPayload<'a> {
    merchant_id: &'a str,
    merchant_transaction_id: &'a str,
    original_transaction_id: &'a str,
    amount: i64,
    callback_url: &'a str,
}

pub struct HermesClient {
    credentials: MerchantCredentials,
    base_url: String,
    transport: Transport,
}

/// Builder for [`HermesClient`].
pub struct HermesClientBuilder {
    credentials: MerchantCredentials,
    environment: Environment,
    base_url: Option<String>,
    transport: Option<Transport>,
}

impl HermesClientBuilder {
    /// Select the gateway environment (default: sandbox).
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Override the resolved base URL (mainly for tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Override the underlying transport (optional).
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> PgResult<HermesClient> {
        let transport = match self.transport {
            Some(t) => t,
            None => Transport::new()?,
        };
        Ok(HermesClient {
            credentials: self.credentials,
            base_url: self
                .base_url
                .unwrap_or_else(|| self.environment.hermes_base_url().to_string()),
            transport,
        })
    }
}

impl HermesClient {
    pub fn builder(credentials: MerchantCredentials) -> HermesClientBuilder {
        HermesClientBuilder {
            credentials,
            environment: Environment::default(),
            base_url: None,
            transport: None,
        }
    }

    pub fn new(credentials: MerchantCredentials, environment: Environment) -> PgResult<Self> {
        Self::builder(credentials)
            .with_environment(environment)
            .build()
    }

    pub fn merchant_id(&self) -> &str {
        &self.credentials.merchant_id
    }

    /// Initiate a PAY_PAGE payment. The returned redirect URL must be opened
    /// in the end user's browser; it is never followed here.
    pub async fn pay(&self, request: &PayPageRequest) -> PgResult<PayPageOutcome> {
        request.validate()?;

        let payload = PayPagePayload {
            merchant_id: &self.credentials.merchant_id,
            merchant_transaction_id: &request.merchant_transaction_id,
            merchant_user_id: &request.merchant_user_id,
            amount: request.amount,
            redirect_url: &request.redirect_url,
            redirect_mode: "POST",
            callback_url: &request.callback_url,
            mobile_number: &request.mobile_number,
            payment_instrument: PaymentInstrument {
                instrument_type: "PAY_PAGE",
            },
        };

        let envelope = self.post_signed(PAY_PATH, &payload).await?;
        normalize_pay_page(envelope, &request.merchant_transaction_id)
    }

    /// Check the status of a transaction by its merchant transaction id.
    pub async fn status(&self, merchant_transaction_id: &str) -> PgResult<TransactionStatus> {
        if merchant_transaction_id.is_empty() {
            return Err(PgError::Validation(
                "merchantTransactionId must not be empty".to_string(),
            ));
        }

        let api_path = format!(
            "{}/{}/{}",
            STATUS_PATH, self.credentials.merchant_id, merchant_transaction_id
        );
        let verify = sign_path(&api_path, &self.credentials.salt_key, self.credentials.salt_index);

        let mut headers = self.base_headers(&verify)?;
        headers.insert(
            "X-MERCHANT-ID",
            self.credentials.merchant_id.parse().map_err(|_| {
                PgError::Config("Merchant ID is not a valid header value".to_string())
            })?,
        );

        let url = join_url(&self.base_url, &api_path);
        let envelope: HermesEnvelope = self.transport.get_json(&url, headers).await?;
        normalize_transaction_status(envelope)
    }

    /// Refund a completed transaction.
    pub async fn refund(&self, request: &HermesRefundRequest) -> PgResult<RefundOutcome> {
        request.validate()?;

        let payload = RefundPayload {
            merchant_id: &self.credentials.merchant_id,
            merchant_transaction_id: &request.refund_transaction_id,
            original_transaction_id: &request.original_transaction_id,
            amount: request.amount,
            callback_url: &request.callback_url,
        };

        let envelope = self.post_signed(REFUND_PATH, &payload).await?;
        normalize_hermes_refund(envelope, &request.refund_transaction_id)
    }

    async fn post_signed<P: Serialize>(&self, api_path: &str, payload: &P) -> PgResult<HermesEnvelope> {
        let payload_json = serde_json::to_string(payload)?;
        let base64_payload = encode_payload(&payload_json);
        let verify = sign_payload(
            &base64_payload,
            api_path,
            &self.credentials.salt_key,
            self.credentials.salt_index,
        );

        let headers = self.base_headers(&verify)?;
        let url = join_url(&self.base_url, api_path);
        let body = RequestEnvelope {
            request: base64_payload,
        };
        self.transport.post_json(&url, headers, &body).await
    }

    fn base_headers(&self, verify: &str) -> PgResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "application/json".parse().map_err(|_| {
            PgError::Config("Invalid content-type header".to_string())
        })?);
        headers.insert(ACCEPT, "application/json".parse().map_err(|_| {
            PgError::Config("Invalid accept header".to_string())
        })?);
        headers.insert(
            "X-VERIFY",
            verify.parse().map_err(|_| {
                PgError::Config("Signature is not a valid header value".to_string())
            })?,
        );
        Ok(headers)
    }
}
