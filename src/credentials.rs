use bon::bon;

use crate::errors::PgError;

/// Merchant identity and salt material for the v1 (Hermes) API.
///
/// Values fall back to the `PHONEPE_MERCHANT_ID`, `PHONEPE_SALT_KEY` and
/// `PHONEPE_SALT_INDEX` environment variables. Read-only after construction.
#[derive(Debug, Clone)]
pub struct MerchantCredentials {
    pub merchant_id: String,
    pub salt_key: String,
    pub salt_index: u32,
}

#[bon]
impl MerchantCredentials {
    #[builder]
    pub fn new(
        /// The PhonePe-assigned merchant ID
        merchant_id: Option<String>,
        /// Salt key used for request signatures
        salt_key: Option<String>,
        /// Salt index identifying the key version
        salt_index: Option<u32>,
    ) -> Result<Self, PgError> {
        use std::env;

        let merchant_id = non_empty(merchant_id.or_else(|| env::var("PHONEPE_MERCHANT_ID").ok()))
            .ok_or_else(|| missing("Merchant ID", "PHONEPE_MERCHANT_ID"))?;

        let salt_key = non_empty(salt_key.or_else(|| env::var("PHONEPE_SALT_KEY").ok()))
            .ok_or_else(|| missing("Salt Key", "PHONEPE_SALT_KEY"))?;

        let salt_index = salt_index
            .or_else(|| {
                env::var("PHONEPE_SALT_INDEX")
                    .ok()
                    .and_then(|v| v.parse().ok())
            })
            .ok_or_else(|| missing("Salt Index", "PHONEPE_SALT_INDEX"))?;

        Ok(MerchantCredentials {
            merchant_id,
            salt_key,
            salt_index,
        })
    }
}

/// Client identity and secret for the v2 (Standard Checkout) OAuth flow.
///
/// Values fall back to the `PHONEPE_CLIENT_ID`, `PHONEPE_CLIENT_VERSION` and
/// `PHONEPE_CLIENT_SECRET` environment variables.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_version: u32,
    pub client_secret: String,
}

#[bon]
impl ClientCredentials {
    #[builder]
    pub fn new(
        /// The PhonePe-assigned client ID
        client_id: Option<String>,
        /// The client version issued alongside the ID
        client_version: Option<u32>,
        /// The client secret
        client_secret: Option<String>,
    ) -> Result<Self, PgError> {
        use std::env;

        let client_id = non_empty(client_id.or_else(|| env::var("PHONEPE_CLIENT_ID").ok()))
            .ok_or_else(|| missing("Client ID", "PHONEPE_CLIENT_ID"))?;

        let client_version = client_version
            .or_else(|| {
                env::var("PHONEPE_CLIENT_VERSION")
                    .ok()
                    .and_then(|v| v.parse().ok())
            })
            .ok_or_else(|| missing("Client Version", "PHONEPE_CLIENT_VERSION"))?;

        let client_secret =
            non_empty(client_secret.or_else(|| env::var("PHONEPE_CLIENT_SECRET").ok()))
                .ok_or_else(|| missing("Client Secret", "PHONEPE_CLIENT_SECRET"))?;

        Ok(ClientCredentials {
            client_id,
            client_version,
            client_secret,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn missing(field: &str, var: &str) -> PgError {
    PgError::Config(format!(
        "Missing required {field} configuration.\n\n\
         Set the {var} environment variable or pass the value to the builder."
    ))
}
