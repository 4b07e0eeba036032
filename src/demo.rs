// Demo components: a small set of components to exercise the wire protocol
//
// - counter: actions with and without parameters, emits `counted`
// - todo-list: client-bound properties, `updated` hook, emits `refresh`
// - notifier: listens to the events the other two emit, hides itself once
//   dismissed
//
// Enabled by default; turn off with `[demo] enabled = false` or WIREBOUND_DEMO=0.
//
// Try it:
//   curl localhost:8080/mount/counter
//   curl -X POST localhost:8080/wire/counter-1 \
//        -d '{"name":"counter","state":"<token>","action":"increment"}'

use crate::component::{snapshot, Component, Listeners, Params, Payload, StateSnapshot, Wiring};
use crate::registry::Registry;
use crate::wire::render::escape_html;
use anyhow::{bail, Result};
use serde_json::{json, Value};

/// Register every demo component type
pub fn register_all(registry: &Registry) {
    registry.register::<Counter>(Counter::TYPE_NAME);
    registry.register::<TodoList>(TodoList::TYPE_NAME);
    registry.register::<Notifier>(Notifier::TYPE_NAME);
}

fn object(value: Value) -> StateSnapshot {
    match value {
        Value::Object(map) => map,
        _ => StateSnapshot::new(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Counter
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct Counter {
    wiring: Wiring<Self>,
    count: i64,
}

impl Counter {
    pub const TYPE_NAME: &'static str = "counter";

    fn increment(&mut self, _params: Params) -> Result<()> {
        self.count = self.offset(1)?;
        self.dispatch("counted", object(json!({"count": self.count})));
        Ok(())
    }

    fn decrement(&mut self, _params: Params) -> Result<()> {
        self.count = self.offset(-1)?;
        Ok(())
    }

    fn add(&mut self, params: Params) -> Result<()> {
        let amount = snapshot::param::<i64>(&params, 0)?;
        self.count = self.offset(amount)?;
        Ok(())
    }

    /// Count moved by `amount`; the client chooses `amount`, so overflow is an error
    fn offset(&self, amount: i64) -> Result<i64> {
        match self.count.checked_add(amount) {
            Some(count) => Ok(count),
            None => bail!("Counter overflow: {} + {}", self.count, amount),
        }
    }

    fn on_reset(&mut self, _payload: Payload) -> Result<()> {
        self.count = 0;
        Ok(())
    }
}

impl Component for Counter {
    fn component_id(&self) -> &str {
        "counter-1"
    }

    fn wiring(&self) -> &Wiring<Self> {
        &self.wiring
    }

    fn wiring_mut(&mut self) -> &mut Wiring<Self> {
        &mut self.wiring
    }

    fn state(&self) -> StateSnapshot {
        object(json!({"count": self.count}))
    }

    fn set_state(&mut self, state: &StateSnapshot) -> Result<()> {
        snapshot::assign(state, "count", &mut self.count)
    }

    fn prepare(&mut self) -> Result<()> {
        self.wiring
            .actions
            .on_sync("increment", Self::increment)
            .on_sync("decrement", Self::decrement)
            .on_sync("add", Self::add);
        Ok(())
    }

    fn listeners(&self) -> Listeners<Self> {
        Listeners::new().with_sync("reset", Self::on_reset)
    }

    fn render(&self) -> String {
        format!(
            r#"<button data-wire-action="decrement">-</button><span class="count">{}</span><button data-wire-action="increment">+</button>"#,
            self.count
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Todo list
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct TodoList {
    wiring: Wiring<Self>,
    items: Vec<String>,
    /// Bound to the input field
    draft: String,
}

impl TodoList {
    pub const TYPE_NAME: &'static str = "todo-list";

    fn add(&mut self, _params: Params) -> Result<()> {
        let item = self.draft.trim();
        if item.is_empty() {
            tracing::debug!("Ignoring empty todo item");
            return Ok(());
        }

        self.items.push(item.to_string());
        self.draft.clear();
        self.dispatch("refresh", Payload::new());
        Ok(())
    }

    fn remove(&mut self, params: Params) -> Result<()> {
        let index = snapshot::param::<usize>(&params, 0)?;
        if index >= self.items.len() {
            tracing::debug!(index, len = self.items.len(), "Todo index out of range");
            return Ok(());
        }

        self.items.remove(index);
        self.dispatch("refresh", Payload::new());
        Ok(())
    }

    fn clear(&mut self, _params: Params) -> Result<()> {
        self.items.clear();
        self.dispatch("refresh", Payload::new());
        Ok(())
    }
}

impl Component for TodoList {
    fn component_id(&self) -> &str {
        "todo-list-1"
    }

    fn wiring(&self) -> &Wiring<Self> {
        &self.wiring
    }

    fn wiring_mut(&mut self) -> &mut Wiring<Self> {
        &mut self.wiring
    }

    fn state(&self) -> StateSnapshot {
        object(json!({"items": self.items, "draft": self.draft}))
    }

    fn set_state(&mut self, state: &StateSnapshot) -> Result<()> {
        snapshot::assign(state, "items", &mut self.items)?;
        snapshot::assign(state, "draft", &mut self.draft)
    }

    fn prepare(&mut self) -> Result<()> {
        self.wiring
            .actions
            .on_sync("add", Self::add)
            .on_sync("remove", Self::remove)
            .on_sync("clear", Self::clear);
        Ok(())
    }

    fn updated(&mut self, property: &str) -> Result<()> {
        if property == "draft" {
            self.draft = self.draft.trim_start().to_string();
        }
        Ok(())
    }

    fn render(&self) -> String {
        let mut html = String::from("<ul>");
        for (index, item) in self.items.iter().enumerate() {
            html.push_str(&format!(
                r#"<li>{}<button data-wire-action="remove" data-wire-params="[{}]">x</button></li>"#,
                escape_html(item),
                index
            ));
        }
        html.push_str("</ul>");
        html.push_str(&format!(
            r#"<input data-wire-model="draft" value="{}"><button data-wire-action="add">Add</button>"#,
            escape_html(&self.draft)
        ));
        html
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Notifier
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct Notifier {
    wiring: Wiring<Self>,
    message: String,
    seen: bool,
}

impl Notifier {
    pub const TYPE_NAME: &'static str = "notifier";

    fn notify(&mut self, message: String) {
        self.message = message;
        self.seen = false;
    }

    fn on_refresh(&mut self, _payload: Payload) -> Result<()> {
        self.notify("List updated".to_string());
        Ok(())
    }

    fn on_counted(&mut self, payload: Payload) -> Result<()> {
        let count = snapshot::field::<i64>(&payload, "count")?.unwrap_or_default();
        self.notify(format!("Count is now {}", count));
        Ok(())
    }

    fn dismiss(&mut self, _params: Params) -> Result<()> {
        self.seen = true;
        Ok(())
    }
}

impl Component for Notifier {
    fn component_id(&self) -> &str {
        "notifier-1"
    }

    fn wiring(&self) -> &Wiring<Self> {
        &self.wiring
    }

    fn wiring_mut(&mut self) -> &mut Wiring<Self> {
        &mut self.wiring
    }

    fn state(&self) -> StateSnapshot {
        object(json!({"message": self.message, "seen": self.seen}))
    }

    fn set_state(&mut self, state: &StateSnapshot) -> Result<()> {
        snapshot::assign(state, "message", &mut self.message)?;
        snapshot::assign(state, "seen", &mut self.seen)
    }

    fn prepare(&mut self) -> Result<()> {
        self.wiring.actions.on_sync("dismiss", Self::dismiss);
        Ok(())
    }

    fn listeners(&self) -> Listeners<Self> {
        Listeners::new()
            .with_sync("refresh", Self::on_refresh)
            .with_sync("counted", Self::on_counted)
    }

    fn can_view(&self) -> bool {
        !self.seen
    }

    fn render(&self) -> String {
        format!(
            r#"<p class="notice">{}</p><button data-wire-action="dismiss">Dismiss</button>"#,
            escape_html(&self.message)
        )
    }
}
