//! Control envelopes exchanged with the stream API.

use crate::error::WsResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Envelope method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Subscribe,
    Unsubscribe,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outgoing subscribe/unsubscribe request.
///
/// Wire format: `{"method": "SUBSCRIBE", "params": ["btcusdt@trade"], "id": 1}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub method: Method,
    /// Stream names, in caller order.
    pub params: Vec<String>,
    /// Request id, echoed back in the acknowledgement.
    pub id: u64,
}

impl Envelope {
    pub fn new(method: Method, params: Vec<String>, id: u64) -> Self {
        Self { method, params, id }
    }

    /// Serialize for a text frame.
    pub fn to_json(&self) -> WsResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subscribe_envelope_wire_format() {
        let envelope = Envelope::new(
            Method::Subscribe,
            vec!["btcusdt@trade".to_string(), "ethusdt@trade".to_string()],
            1,
        );

        let text = envelope.to_json().unwrap();
        assert_eq!(
            text,
            r#"{"method":"SUBSCRIBE","params":["btcusdt@trade","ethusdt@trade"],"id":1}"#
        );
    }

    #[test]
    fn test_unsubscribe_envelope_value() {
        let envelope = Envelope::new(Method::Unsubscribe, vec!["x@trade".to_string()], 9);
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(
            value,
            json!({"method": "UNSUBSCRIBE", "params": ["x@trade"], "id": 9})
        );
    }

    #[test]
    fn test_empty_params_still_well_formed() {
        let envelope = Envelope::new(Method::Subscribe, Vec::new(), 3);
        let parsed: Envelope = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();
        assert!(parsed.params.is_empty());
        assert_eq!(parsed.id, 3);
    }
}
