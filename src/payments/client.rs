use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Checkout session rejected: {0}")]
    SessionRejected(String),
    #[error("Invalid response from payment provider: {0}")]
    InvalidResponse(String),
}

/// One billable line of a checkout session. The collaborator only ever sees
/// descriptions and amounts, never payment-method details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub unit_amount: i64,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize)]
struct SessionRequest<'a> {
    reference: &'a str,
    line_items: &'a [LineItem],
    total_amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub session_id: String,
    pub redirect_url: String,
}

/// HTTP client for the hosted-payment collaborator.
#[derive(Clone)]
pub struct HostedPaymentClient {
    client: Client,
    base_url: String,
}

impl HostedPaymentClient {
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        HostedPaymentClient { client, base_url }
    }

    /// Opens a checkout session and returns the customer redirect URL.
    pub async fn create_session(
        &self,
        reference: &str,
        line_items: &[LineItem],
        total_amount: i64,
    ) -> Result<CheckoutSession, PaymentError> {
        let url = format!(
            "{}/checkout/sessions",
            self.base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .json(&SessionRequest {
                reference,
                line_items,
                total_amount,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::SessionRejected(format!(
                "{}: {}",
                status, body
            )));
        }

        let session = response.json::<CheckoutSession>().await?;
        if session.redirect_url.is_empty() {
            return Err(PaymentError::InvalidResponse(
                "missing redirect_url".to_string(),
            ));
        }
        Ok(session)
    }
}
