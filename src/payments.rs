//! Payment function client.
//!
//! ARCHITECTURE
//! ============
//! Checkout, webhooks and refunds are handled by externally hosted functions.
//! This service only invokes them by name with a small JSON body and reads
//! back the result:
//!
//! - `verify-booking-payment`: `{ sessionId }` -> `{ booking: { id, .. } }`
//! - `verify-game-payment`: `{ sessionId }` -> `{ success, gameTitle }`
//! - `refund-booking`: `{ bookingId }` -> `{ success }`
//!
//! The trait seam lets tests substitute a scripted implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::config::FunctionsConfig;

pub const VERIFY_BOOKING_PAYMENT: &str = "verify-booking-payment";
pub const VERIFY_GAME_PAYMENT: &str = "verify-game-payment";
pub const REFUND_BOOKING: &str = "refund-booking";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("function request failed: {0}")]
    Http(String),
    #[error("function {function} returned {status}: {body}")]
    Status { function: &'static str, status: u16, body: String },
    #[error("unexpected function response: {0}")]
    Decode(String),
    #[error("payment was not completed")]
    Rejected,
}

/// Booking record as echoed by `verify-booking-payment`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedBookingRef {
    pub id: Uuid,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct VerifyBookingResponse {
    pub booking: VerifiedBookingRef,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerifyGameResponse {
    pub success: bool,
    #[serde(default)]
    pub game_title: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RefundResponse {
    pub success: bool,
}

#[async_trait]
pub trait PaymentFunctions: Send + Sync {
    async fn verify_booking_payment(&self, session_id: &str) -> Result<VerifyBookingResponse, PaymentError>;

    async fn verify_game_payment(&self, session_id: &str) -> Result<VerifyGameResponse, PaymentError>;

    async fn refund_booking(&self, booking_id: Uuid) -> Result<RefundResponse, PaymentError>;
}

/// Invokes functions over HTTPS at `{base_url}/{name}`.
pub struct HttpPaymentFunctions {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpPaymentFunctions {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &FunctionsConfig) -> Result<Self, PaymentError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PaymentError::Http(e.to_string()))?;
        Ok(Self { http, base_url: config.base_url.clone(), api_key: config.api_key.clone() })
    }

    #[must_use]
    pub fn function_url(&self, function: &str) -> String {
        format!("{}/{function}", self.base_url)
    }

    async fn invoke<T: DeserializeOwned>(
        &self,
        function: &'static str,
        body: serde_json::Value,
    ) -> Result<T, PaymentError> {
        let mut req = self.http.post(self.function_url(function)).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| PaymentError::Http(e.to_string()))?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| PaymentError::Http(e.to_string()))?;
        if !status.is_success() {
            tracing::warn!(function, status = status.as_u16(), "payment function returned error status");
            return Err(PaymentError::Status { function, status: status.as_u16(), body: text });
        }

        parse_response(&text)
    }
}

pub(crate) fn parse_response<T: DeserializeOwned>(body: &str) -> Result<T, PaymentError> {
    serde_json::from_str(body).map_err(|e| PaymentError::Decode(format!("{e}: {body}")))
}

#[async_trait]
impl PaymentFunctions for HttpPaymentFunctions {
    async fn verify_booking_payment(&self, session_id: &str) -> Result<VerifyBookingResponse, PaymentError> {
        self.invoke(VERIFY_BOOKING_PAYMENT, serde_json::json!({ "sessionId": session_id }))
            .await
    }

    async fn verify_game_payment(&self, session_id: &str) -> Result<VerifyGameResponse, PaymentError> {
        let resp: VerifyGameResponse = self
            .invoke(VERIFY_GAME_PAYMENT, serde_json::json!({ "sessionId": session_id }))
            .await?;
        if !resp.success {
            return Err(PaymentError::Rejected);
        }
        Ok(resp)
    }

    async fn refund_booking(&self, booking_id: Uuid) -> Result<RefundResponse, PaymentError> {
        let resp: RefundResponse = self
            .invoke(REFUND_BOOKING, serde_json::json!({ "bookingId": booking_id }))
            .await?;
        if !resp.success {
            return Err(PaymentError::Rejected);
        }
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> HttpPaymentFunctions {
        HttpPaymentFunctions::new(&FunctionsConfig { base_url: base_url.into(), api_key: None }).unwrap()
    }

    #[test]
    fn function_url_joins_name() {
        let fns = client("https://fn.example.test/functions/v1");
        assert_eq!(
            fns.function_url(VERIFY_BOOKING_PAYMENT),
            "https://fn.example.test/functions/v1/verify-booking-payment"
        );
    }

    #[test]
    fn parses_verify_booking_response() {
        let id = Uuid::new_v4();
        let body = format!(r#"{{"booking":{{"id":"{id}","status":"confirmed","venueId":"x"}}}}"#);
        let resp: VerifyBookingResponse = parse_response(&body).unwrap();
        assert_eq!(resp.booking.id, id);
        assert_eq!(resp.booking.status.as_deref(), Some("confirmed"));
    }

    #[test]
    fn parses_verify_game_response() {
        let resp: VerifyGameResponse = parse_response(r#"{"success":true,"gameTitle":"Sunday Futsal"}"#).unwrap();
        assert!(resp.success);
        assert_eq!(resp.game_title.as_deref(), Some("Sunday Futsal"));
    }

    #[test]
    fn game_title_is_optional() {
        let resp: VerifyGameResponse = parse_response(r#"{"success":false}"#).unwrap();
        assert!(!resp.success);
        assert!(resp.game_title.is_none());
    }

    #[test]
    fn malformed_body_is_decode_error() {
        let err = parse_response::<RefundResponse>("<html>").unwrap_err();
        assert!(matches!(err, PaymentError::Decode(_)));
    }

    #[test]
    fn status_error_display_names_function() {
        let err = PaymentError::Status { function: REFUND_BOOKING, status: 502, body: "bad gateway".into() };
        assert_eq!(err.to_string(), "function refund-booking returned 502: bad gateway");
    }
}
