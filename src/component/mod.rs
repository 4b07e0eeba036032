//! Component contract
//!
//! Two traits split the contract by audience:
//!
//! - [`Component`] is what application code implements. It is generic over the
//!   concrete type so handler tables can hold plain function pointers.
//! - [`LiveComponent`] is the object-safe view the registry and the wire
//!   handler work with. Every `Component` gets it through a blanket impl, so
//!   nobody implements it by hand.
//!
//! # Lifecycle
//!
//! ```text
//! createInstance:  construct → mount
//! wire request:    construct → set_state(token) → [update_property → updated]* → prepare
//!                  → listener(event)? → action? → before_render → build → drain events
//! ```
//!
//! Hooks and handlers return `anyhow::Result`. Nothing in this module catches
//! their errors; the wire handler is the only place that turns them into a
//! response.

mod events;
pub mod handlers;
pub mod snapshot;

#[cfg(test)]
pub(crate) mod testing;

pub use events::WireEvent;
pub use handlers::{Actions, Handler, HandlerTable, Listeners};
pub use snapshot::{Params, Payload, StateSnapshot};

use crate::codec::StateCodec;
use anyhow::Result;
use futures::future::{self, BoxFuture};
use serde_json::Value;

// ─────────────────────────────────────────────────────────────────────────────
// Per-instance protocol state
// ─────────────────────────────────────────────────────────────────────────────

/// Protocol bookkeeping every component embeds
///
/// Holds the action table built in `prepare()` and the events dispatched while
/// handling the current request. Neither is part of the component's state
/// snapshot; both start empty on every ephemeral reconstruction.
pub struct Wiring<C> {
    /// Action name -> handler, populated in `prepare()`
    pub actions: Actions<C>,
    events: Vec<WireEvent>,
}

impl<C> Wiring<C> {
    pub fn new() -> Self {
        Self {
            actions: Actions::new(),
            events: Vec::new(),
        }
    }

    pub fn push_event(&mut self, event: WireEvent) {
        self.events.push(event);
    }

    pub fn pending_events(&self) -> &[WireEvent] {
        &self.events
    }

    /// Read and clear the pending events
    pub fn take_events(&mut self) -> Vec<WireEvent> {
        std::mem::take(&mut self.events)
    }
}

impl<C> Default for Wiring<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for Wiring<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wiring")
            .field("actions", &self.actions)
            .field("events", &self.events)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Author-facing contract
// ─────────────────────────────────────────────────────────────────────────────

/// A server-driven UI component
///
/// # Example
///
/// ```ignore
/// #[derive(Default)]
/// struct Counter {
///     wiring: Wiring<Self>,
///     count: i64,
/// }
///
/// impl Component for Counter {
///     fn component_id(&self) -> &str { "counter" }
///     fn wiring(&self) -> &Wiring<Self> { &self.wiring }
///     fn wiring_mut(&mut self) -> &mut Wiring<Self> { &mut self.wiring }
///
///     fn state(&self) -> StateSnapshot {
///         let mut s = StateSnapshot::new();
///         s.insert("count".into(), self.count.into());
///         s
///     }
///
///     fn set_state(&mut self, state: &StateSnapshot) -> anyhow::Result<()> {
///         snapshot::assign(state, "count", &mut self.count)
///     }
///
///     fn prepare(&mut self) -> anyhow::Result<()> {
///         self.wiring.actions.on_sync("increment", |c, _| { c.count += 1; Ok(()) });
///         Ok(())
///     }
///
///     fn render(&self) -> String { format!("<span>{}</span>", self.count) }
/// }
/// ```
pub trait Component: Send + Sized + 'static {
    /// Stable identity used for routing and state tagging
    fn component_id(&self) -> &str;

    fn wiring(&self) -> &Wiring<Self>;

    fn wiring_mut(&mut self) -> &mut Wiring<Self>;

    /// Snapshot of every client-visible property
    fn state(&self) -> StateSnapshot;

    /// Apply a (possibly partial) snapshot
    ///
    /// Keys absent from `state` must leave their fields untouched, and
    /// `set_state(&state())` must not change anything.
    fn set_state(&mut self, state: &StateSnapshot) -> Result<()>;

    /// Markup for the current state, with no side effects
    fn render(&self) -> String;

    /// Runs once when the registry creates a tracked instance
    fn mount(&mut self) -> Result<()> {
        Ok(())
    }

    /// Runs on every request before events and actions; register actions here
    fn prepare(&mut self) -> Result<()> {
        Ok(())
    }

    /// Runs after a single property has been changed by the client
    fn updated(&mut self, _property: &str) -> Result<()> {
        Ok(())
    }

    /// Last chance to load data before markup is generated
    fn before_render(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(future::ready(Ok(())))
    }

    /// Cross-component events this component reacts to
    fn listeners(&self) -> Listeners<Self> {
        Listeners::new()
    }

    /// Visibility gate; `false` means the component is not rendered at all
    fn can_view(&self) -> bool {
        true
    }

    fn actions(&self) -> &Actions<Self> {
        &self.wiring().actions
    }

    /// Queue an event for the response
    ///
    /// Delivery to other components happens only if the client replays it on
    /// a later request.
    fn dispatch(&mut self, name: impl Into<String>, payload: Payload) {
        self.wiring_mut().push_event(WireEvent::new(name, payload));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry-facing contract
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of an action or event dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A handler was found and completed
    Handled,
    /// No handler under that name; nothing ran
    Unhandled,
}

/// Outcome of a client property update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyUpdate {
    Applied,
    /// The property is not part of the component's state and was skipped
    Undeclared,
}

/// A component packaged for the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltComponent {
    /// Registered type name the client must send back as `name`
    pub type_name: String,
    pub component_id: String,
    /// Event names this instance listens to
    pub listeners: Vec<String>,
    /// Freshly signed state for the next request
    pub state_token: String,
    /// Empty when `visible` is false
    pub markup: String,
    pub visible: bool,
}

/// Object-safe view of a [`Component`]
///
/// Implemented for every `Component`; the registry stores
/// `Box<dyn LiveComponent>`.
pub trait LiveComponent: Send {
    fn component_id(&self) -> &str;

    fn mount(&mut self) -> Result<()>;

    fn prepare(&mut self) -> Result<()>;

    fn state(&self) -> StateSnapshot;

    fn set_state(&mut self, state: &StateSnapshot) -> Result<()>;

    /// `set_state` with a single property, then the `updated` hook
    fn update_property(&mut self, property: &str, value: Value) -> Result<PropertyUpdate>;

    /// Run the action registered under `action` in `prepare()`
    fn call_action<'a>(&'a mut self, action: &str, params: Params)
        -> BoxFuture<'a, Result<Dispatch>>;

    /// Run the listener for `event.name`, if this component declares one
    fn deliver_event<'a>(&'a mut self, event: WireEvent) -> BoxFuture<'a, Result<Dispatch>>;

    fn before_render(&mut self) -> BoxFuture<'_, Result<()>>;

    fn action_names(&self) -> Vec<String>;

    fn listener_names(&self) -> Vec<String>;

    fn can_view(&self) -> bool;

    fn render(&self) -> String;

    /// Render and attach protocol metadata (id, listeners, signed state)
    fn build(&self, type_name: &str, codec: &StateCodec) -> Result<BuiltComponent>;

    fn pending_events(&self) -> &[WireEvent];

    /// Read and clear the pending events
    fn take_events(&mut self) -> Vec<WireEvent>;
}

impl<C: Component> LiveComponent for C {
    fn component_id(&self) -> &str {
        Component::component_id(self)
    }

    fn mount(&mut self) -> Result<()> {
        Component::mount(self)
    }

    fn prepare(&mut self) -> Result<()> {
        Component::prepare(self)
    }

    fn state(&self) -> StateSnapshot {
        Component::state(self)
    }

    fn set_state(&mut self, state: &StateSnapshot) -> Result<()> {
        Component::set_state(self, state)
    }

    fn update_property(&mut self, property: &str, value: Value) -> Result<PropertyUpdate> {
        if !Component::state(self).contains_key(property) {
            return Ok(PropertyUpdate::Undeclared);
        }

        let mut partial = StateSnapshot::new();
        partial.insert(property.to_string(), value);
        Component::set_state(self, &partial)?;
        Component::updated(self, property)?;
        Ok(PropertyUpdate::Applied)
    }

    fn call_action<'a>(
        &'a mut self,
        action: &str,
        params: Params,
    ) -> BoxFuture<'a, Result<Dispatch>> {
        let handler = Component::actions(self).get(action);
        match handler {
            Some(handler) => Box::pin(async move {
                handler.invoke(self, params).await?;
                Ok(Dispatch::Handled)
            }),
            None => Box::pin(future::ready(Ok(Dispatch::Unhandled))),
        }
    }

    fn deliver_event<'a>(&'a mut self, event: WireEvent) -> BoxFuture<'a, Result<Dispatch>> {
        let handler = Component::listeners(self).get(&event.name);
        match handler {
            Some(handler) => Box::pin(async move {
                handler.invoke(self, event.payload).await?;
                Ok(Dispatch::Handled)
            }),
            None => Box::pin(future::ready(Ok(Dispatch::Unhandled))),
        }
    }

    fn before_render(&mut self) -> BoxFuture<'_, Result<()>> {
        Component::before_render(self)
    }

    fn action_names(&self) -> Vec<String> {
        Component::actions(self).names()
    }

    fn listener_names(&self) -> Vec<String> {
        Component::listeners(self).names()
    }

    fn can_view(&self) -> bool {
        Component::can_view(self)
    }

    fn render(&self) -> String {
        Component::render(self)
    }

    fn build(&self, type_name: &str, codec: &StateCodec) -> Result<BuiltComponent> {
        let component_id = Component::component_id(self).to_string();
        let state_token = codec.serialize(&component_id, &Component::state(self))?;
        let visible = Component::can_view(self);
        let markup = if visible {
            Component::render(self)
        } else {
            String::new()
        };

        Ok(BuiltComponent {
            type_name: type_name.to_string(),
            component_id,
            listeners: Component::listeners(self).names(),
            state_token,
            markup,
            visible,
        })
    }

    fn pending_events(&self) -> &[WireEvent] {
        self.wiring().pending_events()
    }

    fn take_events(&mut self) -> Vec<WireEvent> {
        self.wiring_mut().take_events()
    }
}
