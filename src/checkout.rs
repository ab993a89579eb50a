//! Client for the v2 Standard Checkout API, authenticated with an
//! `O-Bearer` token acquired via the client-credentials grant.

use http::HeaderMap;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use rand::Rng;
use serde::Serialize;

use crate::credentials::ClientCredentials;
use crate::env::{Environment, join_url};
use crate::errors::{PgError, PgResult};
use crate::normalize::{
    OrderStatusBody, PayResponseBody, RefundResponseBody, RefundStatusBody, normalize_order_status,
    normalize_pay, normalize_refund, normalize_refund_status,
};
use crate::token::TokenManager;
use crate::transport::Transport;
use crate::types::{
    MetaInfo, OrderStatus, PayOutcome, PayRequest, PaymentMode, RefundOutcome, RefundRequest,
    RefundStatus,
};

const PAY_PATH: &str = "/checkout/v2/pay";
const ORDER_STATUS_PATH: &str = "/checkout/v2/order";
const REFUND_PATH: &str = "/payments/v2/refund";
const TOKEN_PATH: &str = "/v1/oauth/token";

const PAYMENT_FLOW_TYPE: &str = "PG_CHECKOUT";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PayPayload<'a> {
    merchant_order_id: &'a str,
    amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    expire_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta_info: Option<&'a MetaInfo>,
    payment_flow: PaymentFlow<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentFlow<'a> {
    #[serde(rename = "type")]
    flow_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    merchant_urls: Option<MerchantUrls<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_mode_config: Option<PaymentModeConfig<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MerchantUrls<'a> {
    redirect_url: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentModeConfig<'a> {
    enabled_payment_modes: &'a [PaymentMode],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefundPayload<'a> {
    merchant_refund_id: &'a str,
    original_merchant_order_id: &'a str,
    amount: i64,
}

pub struct StandardCheckoutClient {
    base_url: String,
    token_manager: TokenManager,
    transport: Transport,
}

/// Builder for [`StandardCheckoutClient`].
pub struct StandardCheckoutClientBuilder {
    credentials: ClientCredentials,
    environment: Environment,
    base_url: Option<String>,
    auth_base_url: Option<String>,
    transport: Option<Transport>,
}

impl StandardCheckoutClientBuilder {
    /// Select the gateway environment (default: sandbox).
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Override the resolved API base URL (mainly for tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Override the resolved token-endpoint base URL (mainly for tests).
    pub fn with_auth_base_url(mut self, auth_base_url: impl Into<String>) -> Self {
        self.auth_base_url = Some(auth_base_url.into());
        self
    }

    /// Override the underlying transport (optional).
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> PgResult<StandardCheckoutClient> {
        let transport = match self.transport {
            Some(t) => t,
            None => Transport::new()?,
        };
        let auth_base = self
            .auth_base_url
            .unwrap_or_else(|| self.environment.auth_base_url().to_string());
        let token_url = join_url(&auth_base, TOKEN_PATH);
        Ok(StandardCheckoutClient {
            base_url: self
                .base_url
                .unwrap_or_else(|| self.environment.checkout_base_url().to_string()),
            token_manager: TokenManager::new(self.credentials, token_url),
            transport,
        })
    }
}

impl StandardCheckoutClient {
    pub fn builder(credentials: ClientCredentials) -> StandardCheckoutClientBuilder {
        StandardCheckoutClientBuilder {
            credentials,
            environment: Environment::default(),
            base_url: None,
            auth_base_url: None,
            transport: None,
        }
    }

    pub fn new(credentials: ClientCredentials, environment: Environment) -> PgResult<Self> {
        Self::builder(credentials)
            .with_environment(environment)
            .build()
    }

    /// Initiate a checkout payment. The returned redirect URL must be opened
    /// in the end user's browser; it is never followed here.
    pub async fn pay(&self, request: &PayRequest) -> PgResult<PayOutcome> {
        request.validate()?;

        let payload = PayPayload {
            merchant_order_id: &request.merchant_order_id,
            amount: request.amount,
            expire_after: request.expire_after,
            meta_info: request.meta_info.as_ref(),
            payment_flow: PaymentFlow {
                flow_type: PAYMENT_FLOW_TYPE,
                message: request.message.as_deref(),
                merchant_urls: request
                    .redirect_url
                    .as_deref()
                    .map(|redirect_url| MerchantUrls { redirect_url }),
                payment_mode_config: request
                    .enabled_payment_modes
                    .as_deref()
                    .map(|enabled_payment_modes| PaymentModeConfig {
                        enabled_payment_modes,
                    }),
            },
        };

        let headers = self.authorized_headers().await?;
        let url = join_url(&self.base_url, PAY_PATH);
        let body: PayResponseBody = self.transport.post_json(&url, headers, &payload).await?;
        normalize_pay(body)
    }

    /// Fetch the status of an order. With `details` set, every payment
    /// attempt is returned under `payment_details`; otherwise only the
    /// latest attempt is.
    pub async fn order_status(
        &self,
        merchant_order_id: &str,
        details: bool,
    ) -> PgResult<OrderStatus> {
        if merchant_order_id.is_empty() {
            return Err(PgError::Validation(
                "merchantOrderId must not be empty".to_string(),
            ));
        }

        let headers = self.authorized_headers().await?;
        let url = format!(
            "{}/{}/status?details={}",
            join_url(&self.base_url, ORDER_STATUS_PATH),
            merchant_order_id,
            details
        );
        let body: OrderStatusBody = self.transport.get_json(&url, headers).await?;
        normalize_order_status(body)
    }

    /// Initiate a refund against a previously completed order.
    pub async fn refund(&self, request: &RefundRequest) -> PgResult<RefundOutcome> {
        request.validate()?;

        let payload = RefundPayload {
            merchant_refund_id: &request.merchant_refund_id,
            original_merchant_order_id: &request.original_merchant_order_id,
            amount: request.amount,
        };

        let headers = self.authorized_headers().await?;
        let url = join_url(&self.base_url, REFUND_PATH);
        let body: RefundResponseBody = self.transport.post_json(&url, headers, &payload).await?;
        normalize_refund(body, &request.merchant_refund_id)
    }

    /// Fetch the status of a refund by its merchant refund id.
    pub async fn refund_status(&self, merchant_refund_id: &str) -> PgResult<RefundStatus> {
        if merchant_refund_id.is_empty() {
            return Err(PgError::Validation(
                "merchantRefundId must not be empty".to_string(),
            ));
        }

        let headers = self.authorized_headers().await?;
        let url = format!(
            "{}/{}/status",
            join_url(&self.base_url, REFUND_PATH),
            merchant_refund_id
        );
        let body: RefundStatusBody = self.transport.get_json(&url, headers).await?;
        normalize_refund_status(body)
    }

    /// Initiate a refund, generating a `REFUND_<epoch>_<nnnn>` id when the
    /// caller does not supply one.
    pub async fn process_refund(
        &self,
        original_merchant_order_id: &str,
        amount: i64,
        merchant_refund_id: Option<String>,
    ) -> PgResult<RefundOutcome> {
        let merchant_refund_id = merchant_refund_id.unwrap_or_else(generate_refund_id);
        let request = RefundRequest::new(merchant_refund_id, original_merchant_order_id, amount);
        self.refund(&request).await
    }

    async fn authorized_headers(&self) -> PgResult<HeaderMap> {
        let token = self.token_manager.ensure_token(&self.transport).await?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "application/json".parse().map_err(|_| {
            PgError::Config("Invalid content-type header".to_string())
        })?);
        headers.insert(ACCEPT, "application/json".parse().map_err(|_| {
            PgError::Config("Invalid accept header".to_string())
        })?);
        headers.insert(
            AUTHORIZATION,
            token.authorization_value().parse().map_err(|_| {
                PgError::Auth("Token is not a valid header value".to_string())
            })?,
        );
        Ok(headers)
    }
}

fn generate_refund_id() -> String {
    let suffix: u16 = rand::rng().random_range(1000..=9999);
    format!("REFUND_{}_{}", chrono::Utc::now().timestamp(), suffix)
}
