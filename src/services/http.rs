use serde::Serialize;
use std::time::Duration;
use ureq::Agent;

use super::{
    CheckoutSession, DocumentGenerator, DocumentRequest, EmailKind, Mailer, PaymentGateway,
    PaymentRequest,
};
use crate::config::ServiceSettings;
use crate::error::{InvoiceError, Result};

/// Shared blocking HTTP client for the hosted services.
///
/// Non-2xx responses are returned to the caller instead of surfacing as
/// transport errors so the JSON error body can be read.
#[derive(Clone)]
pub struct ServiceClient {
    agent: Agent,
    api_key: Option<String>,
}

/// Status and raw body of a service response.
#[derive(Debug)]
pub(crate) struct Reply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Message from a `{ "error": "..." }` body, falling back to
    /// [`Reply::error_message`].
    pub fn error_field_message(&self) -> String {
        serde_json::from_slice::<serde_json::Value>(&self.body)
            .ok()
            .and_then(|json| json["error"].as_str().map(str::to_string))
            .unwrap_or_else(|| self.error_message())
    }

    /// Best-effort human message from an error body.
    pub fn error_message(&self) -> String {
        if let Ok(json) = serde_json::from_slice::<serde_json::Value>(&self.body) {
            for key in ["error_description", "message", "msg"] {
                if let Some(text) = json[key].as_str() {
                    return text.to_string();
                }
            }
            match &json["error"] {
                serde_json::Value::String(text) => return text.clone(),
                serde_json::Value::Object(inner) => {
                    if let Some(text) = inner.get("message").and_then(|m| m.as_str()) {
                        return text.to_string();
                    }
                }
                _ => {}
            }
        }

        let text = String::from_utf8_lossy(&self.body);
        let text = text.trim();
        if text.is_empty() || text.len() > 200 {
            format!("HTTP {}", self.status)
        } else {
            format!("HTTP {}: {}", self.status, text)
        }
    }
}

impl ServiceClient {
    pub fn new(timeout: Duration, api_key: Option<String>) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self { agent, api_key }
    }

    pub fn from_settings(settings: &ServiceSettings) -> Self {
        Self::new(
            Duration::from_secs(settings.timeout_secs),
            settings.resolved_api_key(),
        )
    }

    /// POST a JSON body. `bearer` overrides the API key in the Authorization header.
    pub(crate) fn post_json<T: Serialize>(
        &self,
        url: &str,
        body: &T,
        bearer: Option<&str>,
    ) -> Result<Reply> {
        let payload = serde_json::to_string(body).map_err(|e| InvoiceError::Serialize {
            what: "request body".to_string(),
            reason: e.to_string(),
        })?;

        let mut request = self
            .agent
            .post(url)
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key.as_str());
        }
        if let Some(token) = bearer.or(self.api_key.as_deref()) {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        tracing::debug!(url, bytes = payload.len(), "POST");
        let mut response = request
            .send(payload.as_str())
            .map_err(|e| InvoiceError::Http {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| InvoiceError::Http {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!(url, status, bytes = body.len(), "response");
        Ok(Reply { status, body })
    }
}

/// Document generation over HTTP: JSON in, PDF bytes out.
pub struct HttpDocumentGenerator {
    client: ServiceClient,
    url: String,
}

impl HttpDocumentGenerator {
    pub fn new(client: ServiceClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl DocumentGenerator for HttpDocumentGenerator {
    fn generate(&self, request: &DocumentRequest) -> Result<Vec<u8>> {
        let reply = self.client.post_json(&self.url, request, None)?;
        if !reply.is_success() {
            return Err(InvoiceError::DocumentService(reply.error_field_message()));
        }
        if reply.body.is_empty() {
            return Err(InvoiceError::DocumentService(
                "service returned an empty document".to_string(),
            ));
        }
        Ok(reply.body)
    }
}

pub struct HttpPaymentGateway {
    client: ServiceClient,
    url: String,
}

impl HttpPaymentGateway {
    pub fn new(client: ServiceClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl PaymentGateway for HttpPaymentGateway {
    fn create_session(&self, request: &PaymentRequest) -> Result<CheckoutSession> {
        let reply = self.client.post_json(&self.url, request, None)?;
        if !reply.is_success() {
            return Err(InvoiceError::PaymentService(reply.error_message()));
        }
        serde_json::from_slice(&reply.body)
            .map_err(|e| InvoiceError::PaymentService(format!("unexpected response: {e}")))
    }
}

pub struct HttpMailer {
    client: ServiceClient,
    url: String,
}

#[derive(Serialize)]
struct EmailBody<'a> {
    to: &'a str,
    template: EmailKind,
    data: &'a serde_json::Value,
}

impl HttpMailer {
    pub fn new(client: ServiceClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl Mailer for HttpMailer {
    fn send(&self, to: &str, kind: EmailKind, data: &serde_json::Value) -> Result<()> {
        let body = EmailBody {
            to,
            template: kind,
            data,
        };
        let reply = self.client.post_json(&self.url, &body, None)?;
        if !reply.is_success() {
            return Err(InvoiceError::Email(reply.error_message()));
        }
        Ok(())
    }
}
