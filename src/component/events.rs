// Cross-component events
//
// Components emit these during action handling. The orchestrator drains them
// after rendering and ships them in the response; the client may replay one
// as the `event` field of a later request to another component.

use super::Payload;
use serde::{Deserialize, Serialize};

/// A named payload emitted by a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEvent {
    pub name: String,
    #[serde(default)]
    pub payload: Payload,
}

impl WireEvent {
    pub fn new(name: impl Into<String>, payload: Payload) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}
