//! Tools surfaced to the assistant.
//!
//! The set is closed: every tool the assistant may call is a variant of
//! `ToolInvocation`, parsed from the raw call into typed arguments before
//! anything runs.

pub mod dispatch;

pub use dispatch::ToolDispatcher;

use serde::Serialize;

use crate::assistant::ToolCall;
use crate::booking::CreateBookingArgs;
use crate::error::ToolError;

/// Name of the booking tool.
pub const CREATE_BOOKING: &str = "create_booking";

/// Function schema handed to the assistant.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A parsed tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    CreateBooking(CreateBookingArgs),
}

impl ToolInvocation {
    /// Parse a raw call by name and JSON arguments.
    pub fn parse(call: &ToolCall) -> Result<Self, ToolError> {
        match call.function.name.as_str() {
            CREATE_BOOKING => serde_json::from_str(&call.function.arguments)
                .map(Self::CreateBooking)
                .map_err(|e| ToolError::InvalidArguments {
                    name: CREATE_BOOKING.to_string(),
                    reason: e.to_string(),
                }),
            other => Err(ToolError::Unknown {
                name: other.to_string(),
            }),
        }
    }
}

/// Definitions for every tool in `ToolInvocation`.
pub fn available_tools() -> Vec<ToolDefinition> {
    vec![create_booking_definition()]
}

fn create_booking_definition() -> ToolDefinition {
    ToolDefinition {
        name: CREATE_BOOKING.to_string(),
        description: "Create a booking for the BSL cafe".to_string(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "user": {
                    "type": "object",
                    "properties": {
                        "email": {
                            "type": "string",
                            "description": "User's email address"
                        },
                        "full_name": {
                            "type": "string",
                            "description": "User's full name"
                        }
                    },
                    "required": ["email", "full_name"]
                },
                "timeslots": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "start_time": {
                                "type": "string",
                                "description": "Start time in ISO format (YYYY-MM-DDTHH:MM:SS+00:00)"
                            }
                        },
                        "required": ["start_time"]
                    }
                }
            },
            "required": ["user", "timeslots"]
        }),
    }
}
