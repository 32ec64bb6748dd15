//! Tool dispatcher — runs pending tool calls and builds their outputs.
//!
//! Failures never escape: a bad argument payload, a refused connection or a
//! rejected booking all become an error payload the assistant can explain.

use std::time::Instant;

use crate::assistant::{ToolCall, ToolOutput};
use crate::booking::{BookingGateway, BookingOutcome};
use crate::tools::ToolInvocation;

/// Executes tool calls against their backing services.
#[derive(Clone)]
pub struct ToolDispatcher {
    gateway: BookingGateway,
}

impl ToolDispatcher {
    pub fn new(gateway: BookingGateway) -> Self {
        Self { gateway }
    }

    /// Execute every call in order, one output per call.
    pub async fn execute_all(&self, calls: &[ToolCall]) -> Vec<ToolOutput> {
        let mut outputs = Vec::with_capacity(calls.len());
        for call in calls {
            outputs.push(self.execute(call).await);
        }
        outputs
    }

    /// Execute a single call.
    pub async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let start = Instant::now();
        let outcome = match ToolInvocation::parse(call) {
            Ok(invocation) => self.run(invocation).await,
            Err(e) => {
                tracing::warn!(
                    tool_call_id = %call.id,
                    tool = %call.function.name,
                    error = %e,
                    "Rejected tool call"
                );
                BookingOutcome::failed(e.to_string())
            }
        };

        tracing::info!(
            tool_call_id = %call.id,
            tool = %call.function.name,
            success = outcome.is_success(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Tool call finished"
        );

        ToolOutput {
            tool_call_id: call.id.clone(),
            output: outcome.to_json().to_string(),
        }
    }

    async fn run(&self, invocation: ToolInvocation) -> BookingOutcome {
        match invocation {
            ToolInvocation::CreateBooking(args) => match self.gateway.create_booking(&args).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(error = %e, "Booking call failed");
                    BookingOutcome::failed(e.to_string())
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use tokio::net::TcpListener;

    use crate::assistant::types::FunctionCall;

    const VALID_ARGS: &str = r#"{"user":{"email":"sam@example.com","full_name":"Sam Lee"},
        "timeslots":[{"start_time":"2025-03-04T13:00:00+00:00"}]}"#;

    async fn start_booking_service(
        status: StatusCode,
        body: serde_json::Value,
    ) -> String {
        let app = Router::new().route(
            "/api/bookings/create-booking",
            post(move |Json(_req): Json<serde_json::Value>| {
                let body = body.clone();
                async move { (status, Json(body)) }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// Booking service that accepts anything and returns the request body as
    /// its `data`.
    async fn start_echo_service() -> String {
        let app = Router::new().route(
            "/api/bookings/create-booking",
            post(|Json(req): Json<serde_json::Value>| async move {
                (StatusCode::CREATED, Json(serde_json::json!({"data": req})))
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn call(arguments: &str) -> ToolCall {
        ToolCall {
            id: "call_42".to_string(),
            function: FunctionCall {
                name: "create_booking".to_string(),
                arguments: arguments.to_string(),
            },
        }
    }

    fn payload(output: &ToolOutput) -> serde_json::Value {
        serde_json::from_str(&output.output).unwrap()
    }

    #[tokio::test]
    async fn created_booking_reports_success_with_data() {
        let base = start_booking_service(
            StatusCode::CREATED,
            serde_json::json!({"data": {"booking_id": 7}}),
        )
        .await;
        let dispatcher = ToolDispatcher::new(BookingGateway::new(base));

        let output = dispatcher.execute(&call(VALID_ARGS)).await;
        assert_eq!(output.tool_call_id, "call_42");
        let json = payload(&output);
        assert_eq!(json["status"], "success");
        assert_eq!(json["message"], "Booking created successfully");
        assert_eq!(json["data"], serde_json::json!({"booking_id": 7}));
    }

    #[tokio::test]
    async fn rejected_booking_carries_service_message_and_code() {
        let base = start_booking_service(
            StatusCode::BAD_REQUEST,
            serde_json::json!({"message": "Outside opening hours", "code": "BAD_TIME"}),
        )
        .await;
        let dispatcher = ToolDispatcher::new(BookingGateway::new(base));

        let json = payload(&dispatcher.execute(&call(VALID_ARGS)).await);
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "Outside opening hours");
        assert_eq!(json["code"], "BAD_TIME");
    }

    #[tokio::test]
    async fn rejected_booking_without_details_uses_defaults() {
        let base =
            start_booking_service(StatusCode::INTERNAL_SERVER_ERROR, serde_json::json!({})).await;
        let dispatcher = ToolDispatcher::new(BookingGateway::new(base));

        let json = payload(&dispatcher.execute(&call(VALID_ARGS)).await);
        assert_eq!(json["message"], "Booking failed");
        assert_eq!(json["code"], "UNKNOWN_ERROR");
    }

    #[tokio::test]
    async fn timestamps_without_offset_reach_the_booking_service() {
        let dispatcher = ToolDispatcher::new(BookingGateway::new(start_echo_service().await));

        let json = payload(
            &dispatcher
                .execute(&call(
                    r#"{"user":{"email":"sam@example.com","full_name":"Sam Lee"},
                        "timeslots":[{"start_time":"2025-03-04T13:00:00"}]}"#,
                ))
                .await,
        );
        assert_eq!(json["status"], "success");
        assert_eq!(json["data"]["timeslots"][0]["start_time"], "2025-03-04T13:00:00");
        assert_eq!(json["data"]["user"]["email"], "sam@example.com");
    }

    #[tokio::test]
    async fn malformed_arguments_become_error_output() {
        // Gateway is never reached.
        let dispatcher = ToolDispatcher::new(BookingGateway::new("http://127.0.0.1:9"));

        let json = payload(&dispatcher.execute(&call("{\"user\": ")).await);
        assert_eq!(json["status"], "error");
        assert!(
            json["message"]
                .as_str()
                .unwrap()
                .contains("EOF while parsing")
        );
        assert!(json.get("code").is_none());
    }

    #[tokio::test]
    async fn unreachable_gateway_becomes_error_output() {
        let dispatcher = ToolDispatcher::new(BookingGateway::new("http://127.0.0.1:9"));

        let outputs = dispatcher
            .execute_all(&[call(VALID_ARGS), call("not json")])
            .await;
        assert_eq!(outputs.len(), 2);
        for output in &outputs {
            assert_eq!(payload(output)["status"], "error");
        }
    }
}
