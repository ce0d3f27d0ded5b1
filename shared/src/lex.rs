//! Amazon Lex V2 fulfillment event and response types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Session attribute carrying the property address the user is asking about.
pub const LOCATION_ATTRIBUTE: &str = "Location";

/// Slot patched with the resolved property address.
pub const LOCATION_SLOT: &str = "Location";

/// Fulfillment request from Lex.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LexEvent {
    pub input_transcript: String,
    pub session_id: String,
    pub session_state: SessionState,
    #[serde(default)]
    pub request_attributes: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub session_attributes: HashMap<String, String>,
    pub intent: Intent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Intent {
    pub name: String,
    /// Slot values keyed by slot name; unfilled slots are `null`
    #[serde(default)]
    pub slots: Option<Map<String, Value>>,
}

impl LexEvent {
    /// The property address from the session attributes.
    pub fn location(&self) -> Option<&str> {
        self.session_state
            .session_attributes
            .get(LOCATION_ATTRIBUTE)
            .map(String::as_str)
    }
}

/// Reply returned to Lex.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LexResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_state: Option<ResponseSessionState>,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_attributes: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSessionState {
    pub dialog_action: DialogAction,
    pub intent: FulfilledIntent,
}

#[derive(Debug, Clone, Serialize)]
pub struct DialogAction {
    #[serde(rename = "type")]
    pub action_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FulfilledIntent {
    pub name: String,
    pub slots: Map<String, Value>,
    pub state: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub content_type: String,
    pub content: String,
}

impl Message {
    pub fn plain_text(content: impl Into<String>) -> Self {
        Self {
            content_type: "PlainText".to_string(),
            content: content.into(),
        }
    }
}

impl LexResponse {
    /// Close the dialog with `content`, marking `intent` fulfilled.
    pub fn fulfilled(
        intent_name: impl Into<String>,
        slots: Map<String, Value>,
        content: impl Into<String>,
        request_attributes: HashMap<String, String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            session_state: Some(ResponseSessionState {
                dialog_action: DialogAction {
                    action_type: "Close".to_string(),
                },
                intent: FulfilledIntent {
                    name: intent_name.into(),
                    slots,
                    state: "Fulfilled".to_string(),
                },
            }),
            messages: vec![Message::plain_text(content)],
            request_attributes: Some(request_attributes),
            session_id: Some(session_id.into()),
        }
    }

    /// A bare plain-text reply without session state.
    pub fn message_only(content: impl Into<String>) -> Self {
        Self {
            session_state: None,
            messages: vec![Message::plain_text(content)],
            request_attributes: None,
            session_id: None,
        }
    }
}

/// Set `slot` to a fully resolved value of `value`.
pub fn resolve_slot(slots: &mut Map<String, Value>, slot: &str, value: &str) {
    slots.insert(
        slot.to_string(),
        json!({
            "value": {
                "originalValue": value,
                "interpretedValue": value,
                "resolvedValues": [value]
            }
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_json() -> Value {
        json!({
            "inputTranscript": "What's the square footage?",
            "sessionId": "abc123",
            "invocationSource": "FulfillmentCodeHook",
            "sessionState": {
                "sessionAttributes": {"Location": "123 Main St"},
                "intent": {
                    "name": "AskProperty",
                    "slots": {"Location": null},
                    "state": "ReadyForFulfillment",
                    "confirmationState": "None"
                }
            }
        })
    }

    #[test]
    fn test_parse_event() {
        let event: LexEvent = serde_json::from_value(event_json()).unwrap();

        assert_eq!(event.input_transcript, "What's the square footage?");
        assert_eq!(event.location(), Some("123 Main St"));
        assert_eq!(event.session_state.intent.name, "AskProperty");
        assert!(event.request_attributes.is_none());
        assert_eq!(event.session_state.intent.slots.unwrap()["Location"], Value::Null);
    }

    #[test]
    fn test_missing_session_attributes_is_rejected() {
        let mut raw = event_json();
        raw["sessionState"].as_object_mut().unwrap().remove("sessionAttributes");
        assert!(serde_json::from_value::<LexEvent>(raw).is_err());
    }

    #[test]
    fn test_resolve_slot_replaces_null() {
        let mut slots = Map::new();
        slots.insert("Location".to_string(), Value::Null);

        resolve_slot(&mut slots, LOCATION_SLOT, "123 Main St");

        assert_eq!(
            slots["Location"],
            json!({"value": {
                "originalValue": "123 Main St",
                "interpretedValue": "123 Main St",
                "resolvedValues": ["123 Main St"]
            }})
        );
    }

    #[test]
    fn test_message_only_omits_session_fields() {
        let value = serde_json::to_value(LexResponse::message_only("oops")).unwrap();
        assert_eq!(
            value,
            json!({"messages": [{"contentType": "PlainText", "content": "oops"}]})
        );
    }

    #[test]
    fn test_fulfilled_shape() {
        let value = serde_json::to_value(LexResponse::fulfilled(
            "AskProperty",
            Map::new(),
            "Done",
            HashMap::new(),
            "abc123",
        ))
        .unwrap();

        assert_eq!(value["sessionState"]["dialogAction"]["type"], "Close");
        assert_eq!(value["sessionState"]["intent"]["state"], "Fulfilled");
        assert_eq!(value["sessionState"]["intent"]["name"], "AskProperty");
        assert_eq!(value["messages"][0]["content"], "Done");
        assert_eq!(value["requestAttributes"], json!({}));
        assert_eq!(value["sessionId"], "abc123");
    }
}
