use crate::domain::payment::PaymentIntent;
use crate::domain::ports::PaymentProvider;
use crate::error::{Result, WorkflowError};
use async_trait::async_trait;
use serde::Deserialize;

pub const STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Minimal client for the Stripe PaymentIntents API.
///
/// Authenticates with the secret key as a bearer token. Every call is a single
/// request; failures of any kind surface as `WorkflowError::ExternalService`.
#[derive(Clone)]
pub struct StripeProvider {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

impl StripeProvider {
    pub fn new(secret_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        }
    }

    async fn parse(resp: reqwest::Response) -> Result<PaymentIntent> {
        let status = resp.status();
        let body = resp.text().await.map_err(external)?;

        if !status.is_success() {
            let detail = serde_json::from_str::<StripeErrorBody>(&body)
                .ok()
                .map(|b| {
                    format!(
                        "{}: {}",
                        b.error.kind.unwrap_or_else(|| "api_error".to_string()),
                        b.error.message.unwrap_or_default()
                    )
                })
                .unwrap_or(body);
            return Err(WorkflowError::ExternalService(format!(
                "stripe returned {}: {detail}",
                status.as_u16()
            )));
        }

        serde_json::from_str::<PaymentIntent>(&body).map_err(|e| {
            WorkflowError::ExternalService(format!("invalid payment intent response: {e}"))
        })
    }
}

fn external(e: reqwest::Error) -> WorkflowError {
    WorkflowError::ExternalService(e.to_string())
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    async fn create_intent(&self, amount_minor_units: i64, currency: &str) -> Result<PaymentIntent> {
        let amount = amount_minor_units.to_string();
        let form = [
            ("amount", amount.as_str()),
            ("currency", currency),
            ("payment_method_types[]", "card"),
        ];

        let resp = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(external)?;

        Self::parse(resp).await
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent> {
        let resp = self
            .client
            .get(format!("{}/v1/payment_intents/{intent_id}", self.api_base))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(external)?;

        Self::parse(resp).await
    }
}
