//! Hosted payment gateway: order creation over REST and checkout signature checks.

use crate::{config::PaymentConfig, errors::ServiceError};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use tracing::{error, info, instrument};

type HmacSha256 = Hmac<Sha256>;

/// Order as created on the gateway side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Public key handed to the browser checkout form
    fn key_id(&self) -> &str;

    /// Registers an order of `amount_minor` (paise for INR) with the gateway.
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, ServiceError>;

    /// `Ok(false)` for a signature mismatch; `Err` when the check itself cannot run.
    fn verify_signature(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<bool, ServiceError>;
}

#[derive(Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    payment_capture: u8,
}

/// Razorpay-style REST client
#[derive(Clone)]
pub struct RazorpayGateway {
    client: Client,
    api_base: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayGateway {
    pub fn new(config: &PaymentConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("payment client: {e}")))?;
        Ok(Self::with_client(config, client))
    }

    /// Build a gateway from an existing client (useful for testing).
    pub fn with_client(config: &PaymentConfig, client: Client) -> Self {
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        }
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    #[instrument(skip(self))]
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, ServiceError> {
        let url = format!("{}/orders", self.api_base);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&CreateOrderBody {
                amount: amount_minor,
                currency,
                receipt,
                payment_capture: 1,
            })
            .send()
            .await
            .map_err(|e| {
                error!("gateway order request failed: {}", e);
                ServiceError::PaymentGateway(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, body = %body, "gateway rejected order creation");
            return Err(ServiceError::PaymentGateway(format!(
                "order creation returned {status}"
            )));
        }

        let order: GatewayOrder = response
            .json()
            .await
            .map_err(|e| ServiceError::PaymentGateway(format!("invalid order payload: {e}")))?;
        info!(gateway_order_id = %order.id, "gateway order created");
        Ok(order)
    }

    fn verify_signature(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<bool, ServiceError> {
        let expected = payment_signature(&self.key_secret, gateway_order_id, payment_id)?;
        Ok(constant_time_eq(&expected, signature))
    }
}

/// hex(HMAC-SHA256(secret, "{order_id}|{payment_id}"))
pub fn payment_signature(
    secret: &str,
    gateway_order_id: &str,
    payment_id: &str,
) -> Result<String, ServiceError> {
    if secret.is_empty() {
        return Err(ServiceError::PaymentGateway(
            "payment key secret is not configured".to_string(),
        ));
    }
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ServiceError::InternalError(e.to_string()))?;
    mac.update(format!("{gateway_order_id}|{payment_id}").as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

/// Rupees to paise, truncating any fraction below one paisa.
pub fn amount_in_minor_units(total: Decimal) -> Result<i64, ServiceError> {
    (total * Decimal::ONE_HUNDRED)
        .trunc()
        .to_i64()
        .ok_or_else(|| ServiceError::BadRequest(format!("Order total {total} is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{body_partial_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(api_base: String) -> PaymentConfig {
        PaymentConfig {
            key_id: "rzp_test_key".into(),
            key_secret: "rzp_test_secret".into(),
            api_base,
            currency: "INR".into(),
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn creates_order_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .and(header_exists("authorization"))
            .and(body_partial_json(serde_json::json!({
                "amount": 28000,
                "currency": "INR",
                "receipt": "order_AB12CD34",
                "payment_capture": 1
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "order_gw_1",
                "entity": "order",
                "amount": 28000,
                "currency": "INR",
                "receipt": "order_AB12CD34",
                "status": "created"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = RazorpayGateway::new(&config(server.uri())).unwrap();
        let order = gateway
            .create_order(28000, "INR", "order_AB12CD34")
            .await
            .unwrap();
        assert_eq!(order.id, "order_gw_1");
        assert_eq!(order.amount, 28000);
        assert_eq!(order.status.as_deref(), Some("created"));
    }

    #[tokio::test]
    async fn gateway_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let gateway = RazorpayGateway::new(&config(server.uri())).unwrap();
        let err = gateway.create_order(100, "INR", "order_X").await.unwrap_err();
        assert!(matches!(err, ServiceError::PaymentGateway(_)));
    }

    #[test]
    fn signature_round_trip() {
        let gateway = RazorpayGateway::new(&config("http://localhost".into())).unwrap();
        let signature = payment_signature("rzp_test_secret", "order_gw_1", "pay_9").unwrap();
        assert_eq!(signature.len(), 64);
        assert!(gateway
            .verify_signature("order_gw_1", "pay_9", &signature)
            .unwrap());
        assert!(!gateway
            .verify_signature("order_gw_1", "pay_10", &signature)
            .unwrap());
        assert!(!gateway
            .verify_signature("order_gw_1", "pay_9", "deadbeef")
            .unwrap());
    }

    #[test]
    fn missing_secret_is_an_error_not_a_mismatch() {
        let mut cfg = config("http://localhost".into());
        cfg.key_secret.clear();
        let gateway = RazorpayGateway::new(&cfg).unwrap();
        assert!(gateway.verify_signature("o", "p", "s").is_err());
    }

    #[test]
    fn minor_units() {
        assert_eq!(amount_in_minor_units(dec!(280.00)).unwrap(), 28000);
        assert_eq!(amount_in_minor_units(dec!(1299.99)).unwrap(), 129999);
        assert_eq!(amount_in_minor_units(dec!(0.005)).unwrap(), 0);
    }
}
