//! wirebound: server-driven UI components over a stateless wire protocol
//!
//! Component state travels to the client inside an HMAC-signed token and comes
//! back with every request. The server rebuilds the component from that token,
//! applies property updates, events and an action, renders, and forgets it.
//!
//! - [`codec`]: signed state tokens
//! - [`component`]: the component contract
//! - [`registry`]: factories, tracked instances, the request phase sequence
//! - [`wire`]: HTTP envelope, orchestrator, router

pub mod cli;
pub mod codec;
pub mod component;
pub mod config;
pub mod demo;
pub mod logging;
pub mod registry;
pub mod startup;
pub mod wire;

pub use codec::{SecretKey, StateCodec};
pub use component::{Component, LiveComponent, WireEvent, Wiring};
pub use registry::Registry;
pub use wire::{WireRequest, WireResponse, WireState};
