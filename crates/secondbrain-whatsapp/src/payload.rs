//! WhatsApp Cloud API webhook payload parsing, grounded on the
//! `WhatsAppWebhook._parse_data`/`_parse_value`/`_parse_message` pipeline:
//! `object: "whatsapp_business_account"` -> `entry[].changes[]` with
//! `field == "messages"` -> a `value` object holding `messages`/`statuses`/
//! `errors` arrays.
//!
//! Only text, voice/audio, and location messages are translated into
//! something the processor understands — interactive replies, documents,
//! stickers and the like fall outside this spec's inbox-capture scope.

use serde_json::Value;

/// A single inbound WhatsApp message extracted from a webhook payload.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundWhatsappMessage {
    pub message_id: String,
    pub from_number: String,
    pub kind: InboundKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundKind {
    Text(String),
    Audio { media_id: String },
    Location { latitude: f64, longitude: f64 },
    Unsupported,
}

/// Extracts every message entry from a parsed webhook body. Status and
/// error callbacks (`statuses`, `errors`) are not message events and are
/// silently skipped — there is nothing actionable for this assistant to do
/// with a delivery receipt.
pub fn extract_messages(body: &Value) -> Vec<InboundWhatsappMessage> {
    let mut out = Vec::new();

    if body.get("object").and_then(Value::as_str) != Some("whatsapp_business_account") {
        return out;
    }

    let Some(entries) = body.get("entry").and_then(Value::as_array) else {
        return out;
    };

    for entry in entries {
        let Some(changes) = entry.get("changes").and_then(Value::as_array) else {
            continue;
        };
        for change in changes {
            if change.get("field").and_then(Value::as_str) != Some("messages") {
                continue;
            }
            let Some(value) = change.get("value") else {
                continue;
            };
            let Some(messages) = value.get("messages").and_then(Value::as_array) else {
                continue;
            };
            for message in messages {
                if let Some(parsed) = parse_message(message) {
                    out.push(parsed);
                }
            }
        }
    }

    out
}

fn parse_message(message: &Value) -> Option<InboundWhatsappMessage> {
    let message_id = message.get("id").and_then(Value::as_str)?.to_string();
    let from_number = message.get("from").and_then(Value::as_str)?.to_string();
    let msg_type = message.get("type").and_then(Value::as_str).unwrap_or("text");

    let kind = match msg_type {
        "text" => InboundKind::Text(message.get("text").and_then(|t| t.get("body")).and_then(Value::as_str).unwrap_or("").to_string()),
        "audio" => match message.get("audio").and_then(|a| a.get("id")).and_then(Value::as_str) {
            Some(id) => InboundKind::Audio { media_id: id.to_string() },
            None => InboundKind::Unsupported,
        },
        "location" => {
            let lat = message.get("location").and_then(|l| l.get("latitude")).and_then(Value::as_f64);
            let lng = message.get("location").and_then(|l| l.get("longitude")).and_then(Value::as_f64);
            match (lat, lng) {
                (Some(latitude), Some(longitude)) => InboundKind::Location { latitude, longitude },
                _ => InboundKind::Unsupported,
            }
        }
        "interactive" => {
            let interactive = message.get("interactive");
            let text = interactive
                .and_then(|i| i.get("button_reply").or_else(|| i.get("list_reply")))
                .and_then(|r| r.get("title"))
                .and_then(Value::as_str);
            match text {
                Some(t) => InboundKind::Text(t.to_string()),
                None => InboundKind::Unsupported,
            }
        }
        _ => InboundKind::Unsupported,
    };

    Some(InboundWhatsappMessage { message_id, from_number, kind })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wrap(messages: Value) -> Value {
        json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "waba-id",
                "changes": [{
                    "field": "messages",
                    "value": { "messages": messages }
                }]
            }]
        })
    }

    #[test]
    fn extracts_text_message() {
        let body = wrap(json!([{
            "id": "wamid.1",
            "from": "15551234567",
            "type": "text",
            "text": { "body": "remind me to call mom" }
        }]));
        let messages = extract_messages(&body);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].from_number, "15551234567");
        assert_eq!(messages[0].kind, InboundKind::Text("remind me to call mom".to_string()));
    }

    #[test]
    fn extracts_audio_message() {
        let body = wrap(json!([{
            "id": "wamid.2",
            "from": "15551234567",
            "type": "audio",
            "audio": { "id": "media-abc", "mime_type": "audio/ogg" }
        }]));
        let messages = extract_messages(&body);
        assert_eq!(messages[0].kind, InboundKind::Audio { media_id: "media-abc".to_string() });
    }

    #[test]
    fn extracts_location_message() {
        let body = wrap(json!([{
            "id": "wamid.3",
            "from": "15551234567",
            "type": "location",
            "location": { "latitude": 37.7749, "longitude": -122.4194 }
        }]));
        let messages = extract_messages(&body);
        assert_eq!(messages[0].kind, InboundKind::Location { latitude: 37.7749, longitude: -122.4194 });
    }

    #[test]
    fn ignores_non_message_object_types() {
        let body = json!({ "object": "page" });
        assert!(extract_messages(&body).is_empty());
    }

    #[test]
    fn ignores_status_only_payloads() {
        let body = json!({
            "object": "whatsapp_business_account",
            "entry": [{ "changes": [{ "field": "messages", "value": { "statuses": [{"id": "s1", "status": "delivered"}] } }] }]
        });
        assert!(extract_messages(&body).is_empty());
    }
}
