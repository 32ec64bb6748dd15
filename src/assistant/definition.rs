//! Assistant definition — persona, instructions, sampling, tools.

use chrono::NaiveDate;
use serde::Serialize;

use crate::tools::ToolDefinition;

/// Display name of the cafe assistant.
pub const ASSISTANT_NAME: &str = "DialogueBot";

/// Request body for creating an assistant.
#[derive(Debug, Clone, Serialize)]
pub struct AssistantDefinition {
    pub name: String,
    /// Model deployment name.
    pub model: String,
    pub instructions: String,
    pub tools: Vec<FunctionTool>,
    pub temperature: f32,
    pub top_p: f32,
}

/// `{"type": "function", "function": {...}}` wrapper.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionTool {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: ToolDefinition,
}

impl From<ToolDefinition> for FunctionTool {
    fn from(function: ToolDefinition) -> Self {
        Self {
            kind: "function",
            function,
        }
    }
}

impl AssistantDefinition {
    /// The cafe assistant bound to `deployment`, with the given tools.
    pub fn cafe(deployment: &str, today: NaiveDate, tools: Vec<ToolDefinition>) -> Self {
        Self {
            name: ASSISTANT_NAME.to_string(),
            model: deployment.to_string(),
            instructions: cafe_instructions(today),
            tools: tools.into_iter().map(FunctionTool::from).collect(),
            temperature: 0.7,
            top_p: 1.0,
        }
    }
}

/// Instructions for the cafe assistant. Opening hours and multi-slot handling
/// live here, not in code.
pub fn cafe_instructions(today: NaiveDate) -> String {
    format!(
        "You are an AI Assistant for Dialogue Hub's British Sign Language Cafe. \
         Today's date is {}. \
         Help users with information about the Cafe, BSL queries, accessibility needs, \
         and booking assistance. Create bookings when users request them.\n\
         Opening Hours:\n\
         - Monday to Thursday: 8:00 AM - 5:00 PM (08:00-17:00)\n\
         - Friday: 8:00 AM - 1:00 PM (08:00-13:00)\n\
         - Weekend: Closed\n\
         When helping with bookings:\n\
         - Only accept bookings during opening hours\n\
         - Reject and explain if requested time is outside opening hours\n\
         - For Friday bookings, no slots after 13:00 should be created\n\
         - Collect all required information: full name, email, and desired time\n\
         - For bookings longer than 1 hour, create multiple consecutive hourly timeslots\n\
         - For example, if a user requests 1-3pm, create two timeslots: 1-2pm and 2-3pm\n\
         - Format dates and times in ISO format (YYYY-MM-DDTHH:MM:SS+00:00)\n\
         - Once you have all information, ALWAYS attempt to create the booking\n\
         - Keep track of information provided across messages\n\
         - If a booking fails, explain why and help fix the issue\n\
         - Confirm successful bookings with a summary\n\
         - Never forget previously provided information",
        today.format("%Y-%m-%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::available_tools;

    #[test]
    fn cafe_definition_serializes_like_the_api_expects() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        let def = AssistantDefinition::cafe("gpt-4o-deploy", today, available_tools());
        let json = serde_json::to_value(&def).unwrap();

        assert_eq!(json["name"], "DialogueBot");
        assert_eq!(json["model"], "gpt-4o-deploy");
        assert_eq!(json["tools"][0]["type"], "function");
        assert_eq!(json["tools"][0]["function"]["name"], "create_booking");
        assert!((json["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert_eq!(json["top_p"], 1.0);
        assert!(
            json["instructions"]
                .as_str()
                .unwrap()
                .contains("Today's date is 2025-03-04.")
        );
    }
}
