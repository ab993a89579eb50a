//! Environment selection and the base URLs it resolves to.
//!
//! The environment is chosen explicitly at client construction (never
//! auto-detected) and resolved once into concrete base URLs. Clients hold
//! the resolved strings and never re-select per call.

/// Gateway environment. `Sandbox` maps to PhonePe's pre-prod (UAT) hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Production,
    #[default]
    Sandbox,
}

impl Environment {
    /// Base URL for the v1 (Hermes) API.
    pub fn hermes_base_url(self) -> &'static str {
        match self {
            Environment::Production => "https://api.phonepe.com/apis/hermes",
            Environment::Sandbox => "https://api-preprod.phonepe.com/apis/pg-sandbox",
        }
    }

    /// Base URL for the v2 (Standard Checkout) API.
    pub fn checkout_base_url(self) -> &'static str {
        match self {
            Environment::Production => "https://api.phonepe.com/apis/pg",
            Environment::Sandbox => "https://api-preprod.phonepe.com/apis/pg-sandbox",
        }
    }

    /// Base URL for the v2 OAuth token endpoint.
    pub fn auth_base_url(self) -> &'static str {
        match self {
            Environment::Production => "https://api.phonepe.com/apis/identity-manager",
            Environment::Sandbox => "https://api-preprod.phonepe.com/apis/pg-sandbox",
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{}/{}", base, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sandbox_hosts_are_preprod() {
        assert!(Environment::Sandbox.hermes_base_url().contains("preprod"));
        assert!(Environment::Sandbox.checkout_base_url().contains("preprod"));
        assert!(Environment::Sandbox.auth_base_url().contains("preprod"));
        assert!(!Environment::Sandbox.is_production());
    }

    #[test]
    fn test_production_hosts() {
        assert_eq!(
            Environment::Production.hermes_base_url(),
            "https://api.phonepe.com/apis/hermes"
        );
        assert!(Environment::Production.is_production());
    }

    #[test]
    fn test_join_url_normalizes_slashes() {
        assert_eq!(join_url("http://a/", "/b"), "http://a/b");
        assert_eq!(join_url("http://a", "b"), "http://a/b");
    }
}
