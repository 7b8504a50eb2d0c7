use std::sync::OnceLock;
use std::time::Duration;

use anyhow::Context;
use regex::Regex;
use serde::{Deserialize, de::DeserializeOwned};

/// The env vars needed to log in to the portal.
#[derive(Debug, Deserialize)]
struct PortalEnv {
    portal_username: String,
    portal_password: String,
}

/// The env vars needed to reach the document store.
#[derive(Debug, Deserialize)]
struct StoreEnv {
    document_store_url: String,
    document_store_fallback_url: Option<String>,
}

// Extension trait.
pub trait LoadFromEnv: DeserializeOwned {
    fn load_from_env() -> anyhow::Result<Self> {
        // Don't throw an error if .env file doesn't exist.
        let _ = dotenv::dotenv();
        let config =
            envy::from_env::<Self>().context("failed to load env variables into config struct")?;
        Ok(config)
    }
}

impl<T: DeserializeOwned> LoadFromEnv for T {}

/// Portal login credentials, environment-derived.
#[derive(Debug, Clone)]
pub struct PortalCredentials {
    pub username: String,
    pub password: String,
}

impl PortalCredentials {
    pub fn from_env() -> anyhow::Result<Self> {
        let portal_env = PortalEnv::load_from_env()?;
        Ok(Self {
            username: portal_env.portal_username,
            password: portal_env.portal_password,
        })
    }

    pub fn is_blank(&self) -> bool {
        self.username.trim().is_empty() || self.password.trim().is_empty()
    }
}

/// Ordered document-store endpoint candidates, primary first.
#[derive(Debug, Clone)]
pub struct StoreEndpoints {
    pub candidates: Vec<String>,
}

impl StoreEndpoints {
    pub fn from_env() -> anyhow::Result<Self> {
        let store_env = StoreEnv::load_from_env()?;
        let mut candidates = vec![store_env.document_store_url];
        candidates.extend(store_env.document_store_fallback_url);
        Ok(Self { candidates })
    }
}

/// Call-site configuration for one portal extraction run.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub base_url: String,
    pub report_path: String,
    /// Query parameter carrying the period hint, `startFrom=YYYY-MM`.
    pub period_param: String,
    /// Selector of the optional "show more data" control; its absence on a
    /// page is not an error.
    pub expand_control_selector: String,
    /// Fixed delay after navigation for client-side rendering to finish.
    pub settle_delay: Duration,
    pub nav_timeout: Duration,
}

impl PortalConfig {
    pub fn new(base_url: impl Into<String>, report_path: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            report_path: report_path.into(),
            period_param: "startFrom".to_string(),
            expand_control_selector: "button.expanded-view".to_string(),
            settle_delay: Duration::from_secs(3),
            nav_timeout: Duration::from_secs(30),
        }
    }

    /// The portal entry URL; unauthenticated visits land on the login form.
    pub fn login_url(&self) -> String {
        format!("{}/", self.base_url)
    }

    pub fn report_url(&self, period_hint: Option<&str>) -> String {
        let url = format!("{}{}", self.base_url, self.report_path);
        match period_hint {
            Some(period) => format!("{}?{}={}", url, self.period_param, period),
            None => url,
        }
    }
}

/// Whether a period label is ISO `YYYY-MM`, the only label shape that
/// string-sorts chronologically.
pub fn is_iso_period(label: &str) -> bool {
    static ISO_PERIOD: OnceLock<Regex> = OnceLock::new();
    let pattern = ISO_PERIOD.get_or_init(|| Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$").unwrap());
    pattern.is_match(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_url_appends_the_period_hint() {
        let config = PortalConfig::new("https://portal.example.com/", "/reports/revenue-report/");
        assert_eq!(
            config.report_url(None),
            "https://portal.example.com/reports/revenue-report/"
        );
        assert_eq!(
            config.report_url(Some("2023-01")),
            "https://portal.example.com/reports/revenue-report/?startFrom=2023-01"
        );
    }

    #[test]
    fn login_url_is_the_portal_entry() {
        let config = PortalConfig::new("https://portal.example.com", "/reports/revenue-report/");
        assert_eq!(config.login_url(), "https://portal.example.com/");
    }

    #[test]
    fn iso_period_shapes() {
        assert!(is_iso_period("2023-01"));
        assert!(is_iso_period("1999-12"));
        assert!(!is_iso_period("2023-13"));
        assert!(!is_iso_period("23-01"));
        assert!(!is_iso_period("2025 November second half"));
        assert!(!is_iso_period("latest"));
    }

    #[test]
    fn blank_credentials_are_detected() {
        let blank = PortalCredentials {
            username: "  ".to_string(),
            password: "secret".to_string(),
        };
        assert!(blank.is_blank());
        let full = PortalCredentials {
            username: "ops".to_string(),
            password: "secret".to_string(),
        };
        assert!(!full.is_blank());
    }
}
