//! HTTP client for `POST {base}/api/bookings/create-booking`.

use std::time::Duration;

use reqwest::StatusCode;

use super::{BookingOutcome, CreateBookingArgs};
use crate::error::BookingError;

const CREATE_BOOKING_PATH: &str = "/api/bookings/create-booking";
const DEFAULT_ERROR_MESSAGE: &str = "Booking failed";
const DEFAULT_ERROR_CODE: &str = "UNKNOWN_ERROR";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Calls the booking service.
#[derive(Clone)]
pub struct BookingGateway {
    base_url: String,
    client: reqwest::Client,
}

impl BookingGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a booking.
    ///
    /// `Ok` covers every answer the service gave in the expected shape,
    /// including rejections; `Err` means the call itself failed or the body
    /// was unreadable.
    pub async fn create_booking(
        &self,
        args: &CreateBookingArgs,
    ) -> Result<BookingOutcome, BookingError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, CREATE_BOOKING_PATH))
            .timeout(REQUEST_TIMEOUT)
            .json(args)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        let parsed: serde_json::Value =
            serde_json::from_slice(&body).map_err(|e| BookingError::InvalidResponse {
                status: status.as_u16(),
                reason: e.to_string(),
            })?;

        if status == StatusCode::CREATED {
            let data = parsed
                .get("data")
                .cloned()
                .unwrap_or_else(|| serde_json::json!({}));
            tracing::info!(slots = args.timeslots.len(), "Booking created");
            return Ok(BookingOutcome::created(data));
        }

        let message = parsed
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_ERROR_MESSAGE)
            .to_string();
        let code = parsed
            .get("code")
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_ERROR_CODE)
            .to_string();

        tracing::warn!(
            status = status.as_u16(),
            code = %code,
            message = %message,
            "Booking rejected"
        );
        Ok(BookingOutcome::Error {
            message,
            code: Some(code),
        })
    }
}
