// Wire module - HTTP surface of the component protocol
//
// Parses the request envelope, drives the registry through the fixed phase
// sequence, renders the resulting instance and returns the markup together
// with any events the component dispatched.

pub mod envelope;
pub mod error;
pub mod handler;
pub mod render;
pub mod server;

pub use envelope::{WireRequest, WireResponse};
pub use error::WireError;
pub use handler::{is_wire_request, WireState};
pub use render::{BareRenderer, HtmlRenderer, Renderer};
pub use server::{router, start_server};
