//! Booking gateway — the sibling booking service and the payloads exchanged
//! with it.

pub mod gateway;

pub use gateway::BookingGateway;

use serde::{Deserialize, Serialize};

/// Arguments of `create_booking`, also the request body for the booking
/// service. Fields the model adds beyond the schema are forwarded untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBookingArgs {
    pub user: BookingUser,
    pub timeslots: Vec<Timeslot>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingUser {
    pub email: String,
    pub full_name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One hourly slot, identified by its start.
///
/// `start_time` is passed through as written (ISO-8601, with or without an
/// offset); the booking service decides whether it is acceptable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeslot {
    pub start_time: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// What the assistant is told about a booking attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum BookingOutcome {
    Success {
        message: String,
        data: serde_json::Value,
    },
    Error {
        message: String,
        code: Option<String>,
    },
}

impl BookingOutcome {
    pub fn created(data: serde_json::Value) -> Self {
        Self::Success {
            message: "Booking created successfully".to_string(),
            data,
        }
    }

    /// Error without a service-provided code (local failures).
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            code: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Tool output payload.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Success { message, data } => serde_json::json!({
                "status": "success",
                "message": message,
                "data": data,
            }),
            Self::Error {
                message,
                code: Some(code),
            } => serde_json::json!({
                "status": "error",
                "message": message,
                "code": code,
            }),
            Self::Error {
                message,
                code: None,
            } => serde_json::json!({
                "status": "error",
                "message": message,
            }),
        }
    }
}
