use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{PgError, PgResult};

/// Maximum length of a single user-defined metadata field.
pub const UDF_MAX_LEN: usize = 256;

/// Gateway-reported lifecycle stage of a payment or refund.
///
/// The three canonical states get their own variants; anything else the
/// gateway may introduce is carried verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentState {
    Pending,
    Completed,
    Failed,
    Other(String),
}

impl PaymentState {
    pub fn is_pending(&self) -> bool {
        matches!(self, PaymentState::Pending)
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, PaymentState::Completed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PaymentState::Failed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            PaymentState::Pending => "PENDING",
            PaymentState::Completed => "COMPLETED",
            PaymentState::Failed => "FAILED",
            PaymentState::Other(s) => s,
        }
    }
}

impl From<&str> for PaymentState {
    fn from(s: &str) -> Self {
        match s {
            "PENDING" => PaymentState::Pending,
            "COMPLETED" => PaymentState::Completed,
            "FAILED" => PaymentState::Failed,
            other => PaymentState::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for PaymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PaymentState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PaymentState {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(PaymentState::from(s.as_str()))
    }
}

/// User-defined metadata attached to a v2 payment (udf1 through udf5).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub udf1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub udf2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub udf3: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub udf4: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub udf5: Option<String>,
}

impl MetaInfo {
    /// Build from a key/value map, keeping only `udf1`..`udf5` entries that
    /// fit the length cap. Unknown keys fail validation rather than being
    /// silently dropped.
    pub fn from_map(fields: &BTreeMap<String, String>) -> PgResult<Self> {
        let mut info = MetaInfo::default();
        for (key, value) in fields {
            if value.len() > UDF_MAX_LEN {
                return Err(PgError::Validation(format!(
                    "Meta field {key} exceeds {UDF_MAX_LEN} characters"
                )));
            }
            let slot = match key.as_str() {
                "udf1" => &mut info.udf1,
                "udf2" => &mut info.udf2,
                "udf3" => &mut info.udf3,
                "udf4" => &mut info.udf4,
                "udf5" => &mut info.udf5,
                other => {
                    return Err(PgError::Validation(format!(
                        "Unknown meta field {other}; expected udf1..udf5"
                    )));
                }
            };
            *slot = Some(value.clone());
        }
        Ok(info)
    }

    pub(crate) fn validate(&self) -> PgResult<()> {
        for (name, value) in [
            ("udf1", &self.udf1),
            ("udf2", &self.udf2),
            ("udf3", &self.udf3),
            ("udf4", &self.udf4),
            ("udf5", &self.udf5),
        ] {
            if let Some(v) = value
                && v.len() > UDF_MAX_LEN
            {
                return Err(PgError::Validation(format!(
                    "Meta field {name} exceeds {UDF_MAX_LEN} characters"
                )));
            }
        }
        Ok(())
    }
}

/// A payment-mode descriptor enabled for a checkout (e.g. `UPI_INTENT`,
/// `CARD`, `NET_BANKING`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMode {
    #[serde(rename = "type")]
    pub mode_type: String,
}

impl PaymentMode {
    pub fn new(mode_type: impl Into<String>) -> Self {
        PaymentMode {
            mode_type: mode_type.into(),
        }
    }
}

/// Inputs for a v2 Standard Checkout payment. Amounts are in paisa.
#[derive(Debug, Clone)]
pub struct PayRequest {
    pub merchant_order_id: String,
    pub amount: i64,
    pub redirect_url: Option<String>,
    pub message: Option<String>,
    pub meta_info: Option<MetaInfo>,
    pub enabled_payment_modes: Option<Vec<PaymentMode>>,
    /// Order expiry in seconds, if the default should be overridden.
    pub expire_after: Option<u64>,
}

impl PayRequest {
    pub fn new(merchant_order_id: impl Into<String>, amount: i64) -> Self {
        PayRequest {
            merchant_order_id: merchant_order_id.into(),
            amount,
            redirect_url: None,
            message: None,
            meta_info: None,
            enabled_payment_modes: None,
            expire_after: None,
        }
    }

    pub fn with_redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = Some(url.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_meta_info(mut self, meta_info: MetaInfo) -> Self {
        self.meta_info = Some(meta_info);
        self
    }

    pub fn with_enabled_payment_modes(mut self, modes: Vec<PaymentMode>) -> Self {
        self.enabled_payment_modes = Some(modes);
        self
    }

    pub fn with_expire_after(mut self, seconds: u64) -> Self {
        self.expire_after = Some(seconds);
        self
    }

    pub(crate) fn validate(&self) -> PgResult<()> {
        require_positive_amount(self.amount)?;
        require_non_empty("merchantOrderId", &self.merchant_order_id)?;
        if let Some(meta) = &self.meta_info {
            meta.validate()?;
        }
        Ok(())
    }
}

/// Inputs for a v2 refund. Amounts are in paisa.
#[derive(Debug, Clone)]
pub struct RefundRequest {
    pub merchant_refund_id: String,
    pub original_merchant_order_id: String,
    pub amount: i64,
}

impl RefundRequest {
    pub fn new(
        merchant_refund_id: impl Into<String>,
        original_merchant_order_id: impl Into<String>,
        amount: i64,
    ) -> Self {
        RefundRequest {
            merchant_refund_id: merchant_refund_id.into(),
            original_merchant_order_id: original_merchant_order_id.into(),
            amount,
        }
    }

    pub(crate) fn validate(&self) -> PgResult<()> {
        require_positive_amount(self.amount)?;
        require_non_empty("merchantRefundId", &self.merchant_refund_id)?;
        require_non_empty("originalMerchantOrderId", &self.original_merchant_order_id)?;
        Ok(())
    }
}

/// Inputs for a v1 (Hermes) PAY_PAGE payment.
#[derive(Debug, Clone)]
pub struct PayPageRequest {
    pub merchant_transaction_id: String,
    pub merchant_user_id: String,
    pub amount: i64,
    pub redirect_url: String,
    pub callback_url: String,
    pub mobile_number: String,
}

impl PayPageRequest {
    pub(crate) fn validate(&self) -> PgResult<()> {
        require_positive_amount(self.amount)?;
        require_non_empty("merchantTransactionId", &self.merchant_transaction_id)?;
        require_non_empty("merchantUserId", &self.merchant_user_id)?;
        Ok(())
    }
}

/// Inputs for a v1 (Hermes) refund.
#[derive(Debug, Clone)]
pub struct HermesRefundRequest {
    /// Caller-assigned id for this refund attempt.
    pub refund_transaction_id: String,
    /// The original transaction being refunded.
    pub original_transaction_id: String,
    pub amount: i64,
    pub callback_url: String,
}

impl HermesRefundRequest {
    pub(crate) fn validate(&self) -> PgResult<()> {
        require_positive_amount(self.amount)?;
        require_non_empty("merchantTransactionId", &self.refund_transaction_id)?;
        require_non_empty("originalTransactionId", &self.original_transaction_id)?;
        Ok(())
    }
}

/// Normalized outcome of a v2 payment initiation. The caller is responsible
/// for sending the end user to `redirect_url`.
#[derive(Debug, Clone, PartialEq)]
pub struct PayOutcome {
    pub order_id: String,
    pub state: PaymentState,
    pub redirect_url: String,
    pub expire_at: Option<DateTime<Utc>>,
}

/// One payment attempt inside a status response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetail {
    pub transaction_id: Option<String>,
    pub payment_mode: Option<String>,
    pub timestamp: Option<i64>,
    pub state: Option<PaymentState>,
    pub amount: Option<i64>,
    pub error_code: Option<String>,
    pub detailed_error_code: Option<String>,
    pub split_instruments: Option<serde_json::Value>,
}

/// Normalized v2 order status.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderStatus {
    pub order_id: Option<String>,
    /// Transaction id of the first attempt carrying one, if any.
    pub transaction_id: Option<String>,
    pub state: PaymentState,
    pub amount: Option<i64>,
    pub expire_at: Option<DateTime<Utc>>,
    pub meta_info: Option<MetaInfo>,
    pub error_code: Option<String>,
    pub detailed_error_code: Option<String>,
    pub payment_details: Vec<PaymentDetail>,
}

/// Normalized outcome of a v2 refund initiation.
#[derive(Debug, Clone, PartialEq)]
pub struct RefundOutcome {
    pub refund_id: String,
    pub state: PaymentState,
    pub amount: Option<i64>,
    /// Caller-assigned refund id, echoed back for generated ids.
    pub merchant_refund_id: Option<String>,
}

/// Normalized v2 refund status.
#[derive(Debug, Clone, PartialEq)]
pub struct RefundStatus {
    pub merchant_refund_id: Option<String>,
    pub original_merchant_order_id: Option<String>,
    pub refund_id: Option<String>,
    pub state: PaymentState,
    pub amount: Option<i64>,
    pub payment_details: Vec<PaymentDetail>,
}

/// Normalized outcome of a v1 PAY_PAGE initiation.
#[derive(Debug, Clone, PartialEq)]
pub struct PayPageOutcome {
    pub merchant_transaction_id: String,
    pub redirect_url: String,
    pub code: Option<String>,
    pub message: Option<String>,
}

/// Normalized v1 transaction status.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionStatus {
    pub merchant_transaction_id: Option<String>,
    pub transaction_id: Option<String>,
    pub state: PaymentState,
    pub amount: Option<i64>,
    pub response_code: Option<String>,
}

fn require_positive_amount(amount: i64) -> PgResult<()> {
    if amount <= 0 {
        return Err(PgError::Validation(
            "Amount must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

fn require_non_empty(field: &str, value: &str) -> PgResult<()> {
    if value.is_empty() {
        return Err(PgError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}
