use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::invoice::amount::lenient;
use crate::invoice::{DownloadPolicy, InvoiceTemplate, PartyInfo, PaymentTerms};

/// Environment variable that overrides `services.api_key`.
pub const API_KEY_ENV: &str = "INVOICEKIT_API_KEY";

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub company: PartyInfo,
    pub invoice: InvoiceSettings,
    #[serde(default)]
    pub services: ServiceSettings,
    #[serde(default)]
    pub entitlements: DownloadPolicy,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct InvoiceSettings {
    pub number_format: String,
    pub currency: String,
    pub currency_symbol: String,
    #[serde(default)]
    pub payment_terms: PaymentTerms,
    /// Percentage, e.g. 8.25
    #[serde(default, with = "lenient")]
    pub tax_rate: Decimal,
    #[serde(default)]
    pub template: InvoiceTemplate,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ServiceSettings {
    #[serde(default)]
    pub document_url: Option<String>,
    #[serde(default)]
    pub payment_url: Option<String>,
    #[serde(default)]
    pub email_url: Option<String>,
    #[serde(default)]
    pub auth_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Price charged for a download once the free allowance is used up.
    #[serde(default = "default_download_price", with = "lenient")]
    pub download_price: Decimal,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_download_price() -> Decimal {
    Decimal::new(299, 2)
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            document_url: None,
            payment_url: None,
            email_url: None,
            auth_url: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
            download_price: default_download_price(),
        }
    }
}

impl ServiceSettings {
    /// API key from the environment, falling back to config.toml.
    pub fn resolved_api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.api_key.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses() {
        let config: Config = toml::from_str(super::super::CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.company.name, "Your Company Name");
        assert_eq!(config.invoice.payment_terms, PaymentTerms::Net30);
        assert_eq!(config.invoice.tax_rate, Decimal::ZERO);
        assert_eq!(config.entitlements, DownloadPolicy::default());
        assert_eq!(config.services.timeout_secs, 30);
        assert!(config.services.document_url.is_some());
    }

    #[test]
    fn services_section_is_optional() {
        let config: Config = toml::from_str(
            r#"
            [company]
            name = "Acme"

            [invoice]
            number_format = "{seq}"
            currency = "EUR"
            currency_symbol = "€"
            "#,
        )
        .unwrap();
        assert!(config.services.document_url.is_none());
        assert_eq!(config.services.download_price, Decimal::new(299, 2));
        assert_eq!(config.invoice.template, InvoiceTemplate::Standard);
    }
}
