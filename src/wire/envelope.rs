//! Wire request / response envelopes
//!
//! ```json
//! { "name": "counter", "state": "<encoded>.<sig>",
//!   "action": "increment", "params": [],
//!   "models": {"count": 3},
//!   "event": {"name": "refresh", "payload": {}} }
//! ```

use super::error::WireError;
use crate::component::{Params, StateSnapshot, WireEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client → server envelope, validated
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    /// Registered component type
    pub type_name: String,
    /// Signed state token
    pub state: String,
    pub action: Option<String>,
    pub params: Params,
    /// Property updates, in the order the client sent them
    pub models: StateSnapshot,
    pub event: Option<WireEvent>,
}

/// Raw body shape before validation
///
/// `name` and `state` are optional here so a missing field becomes a
/// protocol-level 400 with a clear message rather than a serde error string.
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    name: Option<String>,
    state: Option<String>,
    action: Option<String>,
    params: Option<Params>,
    models: Option<StateSnapshot>,
    event: Option<WireEvent>,
}

impl WireRequest {
    pub fn new(type_name: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            state: state.into(),
            action: None,
            params: Vec::new(),
            models: StateSnapshot::new(),
            event: None,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>, params: Params) -> Self {
        self.action = Some(action.into());
        self.params = params;
        self
    }

    pub fn with_model(mut self, property: impl Into<String>, value: Value) -> Self {
        self.models.insert(property.into(), value);
        self
    }

    pub fn with_event(mut self, event: WireEvent) -> Self {
        self.event = Some(event);
        self
    }

    /// Parse and validate a request body
    pub fn parse(body: &[u8]) -> Result<Self, WireError> {
        let raw: RawEnvelope = serde_json::from_slice(body)
            .map_err(|e| WireError::BadRequest(format!("Invalid wire envelope: {}", e)))?;

        let type_name = raw
            .name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| WireError::BadRequest("Missing component name".to_string()))?;
        let state = raw
            .state
            .ok_or_else(|| WireError::BadRequest("Missing component state".to_string()))?;

        Ok(Self {
            type_name,
            state,
            // An empty action name means "no action", as with a bare re-render
            action: raw.action.filter(|a| !a.is_empty()),
            params: raw.params.unwrap_or_default(),
            models: raw.models.unwrap_or_default(),
            event: raw.event,
        })
    }
}

/// Server → client envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireResponse {
    pub html: String,
    pub events: Vec<WireEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Result<WireRequest, WireError> {
        WireRequest::parse(value.to_string().as_bytes())
    }

    #[test]
    fn test_parse_full_envelope() {
        let request = parse(json!({
            "name": "counter",
            "state": "abc.def",
            "action": "add",
            "params": [5],
            "models": {"b": 2, "a": 1},
            "event": {"name": "refresh", "payload": {"x": true}}
        }))
        .unwrap();

        assert_eq!(request.type_name, "counter");
        assert_eq!(request.state, "abc.def");
        assert_eq!(request.action.as_deref(), Some("add"));
        assert_eq!(request.params, vec![json!(5)]);
        assert_eq!(request.event.unwrap().name, "refresh");
    }

    #[test]
    fn test_models_keep_client_order() {
        let body = r#"{"name":"c","state":"s","models":{"zeta":1,"alpha":2,"mid":3}}"#;
        let request = WireRequest::parse(body.as_bytes()).unwrap();

        let keys: Vec<&str> = request.models.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_optional_fields_default() {
        let request = parse(json!({"name": "counter", "state": ""})).unwrap();

        assert!(request.action.is_none());
        assert!(request.params.is_empty());
        assert!(request.models.is_empty());
        assert!(request.event.is_none());
    }

    #[test]
    fn test_null_collections_default() {
        let request = parse(json!({
            "name": "counter", "state": "s", "params": null, "models": null, "action": ""
        }))
        .unwrap();

        assert!(request.params.is_empty());
        assert!(request.models.is_empty());
        assert!(request.action.is_none());
    }

    #[test]
    fn test_missing_name_or_state_is_bad_request() {
        assert!(matches!(
            parse(json!({"state": "s"})),
            Err(WireError::BadRequest(_))
        ));
        assert!(matches!(
            parse(json!({"name": "", "state": "s"})),
            Err(WireError::BadRequest(_))
        ));
        assert!(matches!(
            parse(json!({"name": "counter"})),
            Err(WireError::BadRequest(_))
        ));
    }

    #[test]
    fn test_invalid_json_is_bad_request() {
        assert!(matches!(
            WireRequest::parse(b"{not json"),
            Err(WireError::BadRequest(_))
        ));
        assert!(matches!(
            parse(json!({"name": "counter", "state": "s", "params": "oops"})),
            Err(WireError::BadRequest(_))
        ));
    }

    #[test]
    fn test_response_shape() {
        let response = WireResponse {
            html: "<p>1</p>".to_string(),
            events: vec![WireEvent::new("refresh", Default::default())],
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"html": "<p>1</p>", "events": [{"name": "refresh", "payload": {}}]})
        );
    }
}
