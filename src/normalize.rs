//! Vendor response schemas and their mapping into the normalized outcome
//! types.
//!
//! Each response shape is declared once, here, as a serde struct with
//! optional fields; nothing downstream probes dynamic JSON. Mapping is pure:
//! absent optional fields become `None`, a field the operation cannot do
//! without becomes a [`PgError::Protocol`], and a malformed entry in a
//! `paymentDetails` list is skipped while its siblings are kept.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::errors::{PgError, PgResult};
use crate::types::{
    MetaInfo, OrderStatus, PayOutcome, PayPageOutcome, PaymentDetail, PaymentState, RefundOutcome,
    RefundStatus, TransactionStatus,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PayResponseBody {
    pub order_id: Option<String>,
    pub state: Option<PaymentState>,
    pub redirect_url: Option<String>,
    pub expire_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrderStatusBody {
    pub order_id: Option<String>,
    pub state: Option<PaymentState>,
    pub amount: Option<i64>,
    pub expire_at: Option<i64>,
    pub meta_info: Option<MetaInfo>,
    pub error_code: Option<String>,
    pub detailed_error_code: Option<String>,
    pub payment_details: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefundResponseBody {
    pub refund_id: Option<String>,
    pub state: Option<PaymentState>,
    pub amount: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefundStatusBody {
    pub merchant_refund_id: Option<String>,
    pub original_merchant_order_id: Option<String>,
    pub refund_id: Option<String>,
    pub state: Option<PaymentState>,
    pub amount: Option<i64>,
    pub payment_details: Option<Vec<Value>>,
}

/// Hermes (v1) wraps every response in a `{success, code, message, data}`
/// envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct HermesEnvelope {
    pub success: Option<bool>,
    pub code: Option<String>,
    pub message: Option<String>,
    pub data: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HermesPayData {
    instrument_response: Option<HermesInstrumentResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HermesInstrumentResponse {
    redirect_info: Option<HermesRedirectInfo>,
}

#[derive(Debug, Deserialize)]
struct HermesRedirectInfo {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HermesStatusData {
    merchant_transaction_id: Option<String>,
    transaction_id: Option<String>,
    state: Option<PaymentState>,
    amount: Option<i64>,
    response_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HermesRefundData {
    state: Option<PaymentState>,
    amount: Option<i64>,
    merchant_transaction_id: Option<String>,
}

pub(crate) fn normalize_pay(body: PayResponseBody) -> PgResult<PayOutcome> {
    Ok(PayOutcome {
        order_id: required("orderId", body.order_id)?,
        state: required("state", body.state)?,
        redirect_url: required("redirectUrl", body.redirect_url)?,
        expire_at: body.expire_at.and_then(epoch_secs),
    })
}

pub(crate) fn normalize_order_status(body: OrderStatusBody) -> PgResult<OrderStatus> {
    let payment_details = collect_details(body.payment_details);
    let transaction_id = payment_details
        .iter()
        .find_map(|d| d.transaction_id.clone());
    Ok(OrderStatus {
        order_id: body.order_id,
        transaction_id,
        state: required("state", body.state)?,
        amount: body.amount,
        expire_at: body.expire_at.and_then(epoch_secs),
        meta_info: body.meta_info,
        error_code: body.error_code,
        detailed_error_code: body.detailed_error_code,
        payment_details,
    })
}

pub(crate) fn normalize_refund(
    body: RefundResponseBody,
    merchant_refund_id: &str,
) -> PgResult<RefundOutcome> {
    Ok(RefundOutcome {
        refund_id: required("refundId", body.refund_id)?,
        state: required("state", body.state)?,
        amount: body.amount,
        merchant_refund_id: Some(merchant_refund_id.to_string()),
    })
}

pub(crate) fn normalize_refund_status(body: RefundStatusBody) -> PgResult<RefundStatus> {
    Ok(RefundStatus {
        merchant_refund_id: body.merchant_refund_id,
        original_merchant_order_id: body.original_merchant_order_id,
        refund_id: body.refund_id,
        state: required("state", body.state)?,
        amount: body.amount,
        payment_details: collect_details(body.payment_details),
    })
}

pub(crate) fn normalize_pay_page(
    envelope: HermesEnvelope,
    merchant_transaction_id: &str,
) -> PgResult<PayPageOutcome> {
    let envelope = accepted(envelope)?;
    let data: HermesPayData = parse_data(envelope.data)?;
    let redirect_url = data
        .instrument_response
        .and_then(|r| r.redirect_info)
        .and_then(|r| r.url)
        .ok_or_else(|| missing("data.instrumentResponse.redirectInfo.url"))?;
    Ok(PayPageOutcome {
        merchant_transaction_id: merchant_transaction_id.to_string(),
        redirect_url,
        code: envelope.code,
        message: envelope.message,
    })
}

pub(crate) fn normalize_transaction_status(envelope: HermesEnvelope) -> PgResult<TransactionStatus> {
    let envelope = accepted(envelope)?;
    let data: HermesStatusData = parse_data(envelope.data)?;
    Ok(TransactionStatus {
        merchant_transaction_id: data.merchant_transaction_id,
        transaction_id: data.transaction_id,
        state: required("data.state", data.state)?,
        amount: data.amount,
        response_code: data.response_code,
    })
}

pub(crate) fn normalize_hermes_refund(
    envelope: HermesEnvelope,
    refund_transaction_id: &str,
) -> PgResult<RefundOutcome> {
    let envelope = accepted(envelope)?;
    let data: HermesRefundData = parse_data(envelope.data)?;
    Ok(RefundOutcome {
        refund_id: data
            .merchant_transaction_id
            .unwrap_or_else(|| refund_transaction_id.to_string()),
        state: required("data.state", data.state)?,
        amount: data.amount,
        merchant_refund_id: Some(refund_transaction_id.to_string()),
    })
}

/// Reject a 2xx Hermes envelope whose `success` flag says otherwise: that is
/// a gateway-reported failure, not a protocol problem.
fn accepted(envelope: HermesEnvelope) -> PgResult<HermesEnvelope> {
    if envelope.success == Some(true) {
        return Ok(envelope);
    }
    Err(PgError::Vendor {
        status: 200,
        code: envelope.code.unwrap_or_else(|| "UNKNOWN".to_string()),
        message: envelope
            .message
            .unwrap_or_else(|| "Error from PhonePe server".to_string()),
    })
}

fn parse_data<T: serde::de::DeserializeOwned>(data: Option<Value>) -> PgResult<T> {
    let data = data.ok_or_else(|| missing("data"))?;
    serde_json::from_value(data)
        .map_err(|e| PgError::Protocol(format!("Unexpected data shape: {e}")))
}

fn collect_details(raw: Option<Vec<Value>>) -> Vec<PaymentDetail> {
    raw.unwrap_or_default()
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(detail) => Some(detail),
            Err(e) => {
                debug!(error = %e, "skipping malformed paymentDetails entry");
                None
            }
        })
        .collect()
}

fn epoch_secs(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

fn required<T>(field: &str, value: Option<T>) -> PgResult<T> {
    value.ok_or_else(|| missing(field))
}

fn missing(field: &str) -> PgError {
    PgError::Protocol(format!("Response is missing expected field {field}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_tolerates_missing_error_code() {
        let body: OrderStatusBody = serde_json::from_str(
            r#"{"orderId":"OPX1","state":"COMPLETED","amount":10000}"#,
        )
        .unwrap();
        let status = normalize_order_status(body).unwrap();
        assert_eq!(status.error_code, None);
        assert_eq!(status.detailed_error_code, None);
        assert!(status.state.is_completed());
    }

    #[test]
    fn test_order_status_requires_state() {
        let body: OrderStatusBody = serde_json::from_str(r#"{"orderId":"OPX1"}"#).unwrap();
        assert!(matches!(
            normalize_order_status(body),
            Err(PgError::Protocol(_))
        ));
    }

    #[test]
    fn test_malformed_payment_detail_is_skipped() {
        let body: OrderStatusBody = serde_json::from_str(
            r#"{
                "orderId": "OPX1",
                "state": "COMPLETED",
                "paymentDetails": [
                    {"transactionId": "T1", "state": "COMPLETED", "amount": 10000},
                    {"transactionId": 42, "amount": "not-a-number"},
                    {"transactionId": "T2", "state": "FAILED"}
                ]
            }"#,
        )
        .unwrap();
        let status = normalize_order_status(body).unwrap();
        assert_eq!(status.payment_details.len(), 2);
        assert_eq!(status.payment_details[0].transaction_id.as_deref(), Some("T1"));
        assert_eq!(status.payment_details[1].transaction_id.as_deref(), Some("T2"));
        assert_eq!(status.transaction_id.as_deref(), Some("T1"));
    }

    #[test]
    fn test_hermes_envelope_failure_maps_to_vendor_error() {
        let envelope: HermesEnvelope = serde_json::from_str(
            r#"{"success":false,"code":"PAYMENT_ERROR","message":"declined"}"#,
        )
        .unwrap();
        let err = normalize_pay_page(envelope, "TXN1").unwrap_err();
        match err {
            PgError::Vendor { code, message, .. } => {
                assert_eq!(code, "PAYMENT_ERROR");
                assert_eq!(message, "declined");
            }
            other => panic!("Expected Vendor error, got {other:?}"),
        }
    }

    #[test]
    fn test_hermes_pay_extracts_nested_redirect_url() {
        let envelope: HermesEnvelope = serde_json::from_str(
            r#"{
                "success": true,
                "code": "PAYMENT_INITIATED",
                "message": "Payment initiated",
                "data": {
                    "merchantTransactionId": "TXN1",
                    "instrumentResponse": {
                        "type": "PAY_PAGE",
                        "redirectInfo": {"url": "https://pay.example/redirect", "method": "POST"}
                    }
                }
            }"#,
        )
        .unwrap();
        let outcome = normalize_pay_page(envelope, "TXN1").unwrap();
        assert_eq!(outcome.redirect_url, "https://pay.example/redirect");
        assert_eq!(outcome.code.as_deref(), Some("PAYMENT_INITIATED"));
    }

    #[test]
    fn test_pay_outcome_requires_redirect_url() {
        let body: PayResponseBody =
            serde_json::from_str(r#"{"orderId":"OPX1","state":"PENDING"}"#).unwrap();
        assert!(matches!(normalize_pay(body), Err(PgError::Protocol(_))));
    }
}
