use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Events fanned out to user-configured webhook subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    MessageReceived,
    ResponseSent,
    FlowCompleted,
    Error,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::MessageReceived => "message_received",
            EventKind::ResponseSent => "response_sent",
            EventKind::FlowCompleted => "flow_completed",
            EventKind::Error => "error",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fixed delivery envelope: `{event, timestamp, data}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event: EventKind,
    pub timestamp: String,
    pub data: Value,
}

impl EventEnvelope {
    pub fn new(event: EventKind, data: Value) -> Self {
        EventEnvelope {
            event,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_has_the_fixed_shape() {
        let envelope = EventEnvelope::new(EventKind::MessageReceived, json!({"from": "+15550001"}));
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["event"], "message_received");
        assert_eq!(value["data"]["from"], "+15550001");
        assert!(value["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn kinds_round_trip_through_their_names() {
        for kind in [
            EventKind::MessageReceived,
            EventKind::ResponseSent,
            EventKind::FlowCompleted,
            EventKind::Error,
        ] {
            let parsed: EventKind =
                serde_json::from_value(serde_json::Value::String(kind.as_str().to_owned()))
                    .unwrap();
            assert_eq!(parsed, kind);
        }
    }
}
