// Instrumented component shared by unit tests across the crate

use super::snapshot::{self, Params, Payload, StateSnapshot};
use super::{Component, Listeners, Wiring};
use crate::codec::{SecretKey, StateCodec};
use anyhow::Result;
use futures::future::BoxFuture;
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Call journal shared between a test and the instances its factory builds
pub(crate) type Journal = Arc<Mutex<Vec<String>>>;

pub(crate) fn test_codec() -> StateCodec {
    StateCodec::new(SecretKey::new("unit-test-key-0123456789").unwrap())
}

/// Records every hook and handler call, in order
#[derive(Default)]
pub(crate) struct Probe {
    wiring: Wiring<Self>,
    pub count: i64,
    pub label: String,
    pub hidden: bool,
    journal: Journal,
}

impl Probe {
    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    pub fn with_count(count: i64) -> Self {
        Self {
            count,
            ..Self::default()
        }
    }

    /// Builds but never renders
    pub fn hidden() -> Self {
        Self {
            hidden: true,
            ..Self::default()
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    fn record(&self, entry: impl Into<String>) {
        self.journal.lock().unwrap().push(entry.into());
    }

    fn increment(&mut self, _params: Params) -> Result<()> {
        self.record("action:increment");
        self.count += 1;
        Ok(())
    }

    fn add(&mut self, params: Params) -> Result<()> {
        self.record("action:add");
        self.count += snapshot::param::<i64>(&params, 0)?;
        Ok(())
    }

    fn announce(&mut self, _params: Params) -> Result<()> {
        self.record("action:announce");
        self.dispatch("refresh", Payload::new());
        Ok(())
    }

    fn fail(&mut self, _params: Params) -> Result<()> {
        self.record("action:fail");
        anyhow::bail!("handler exploded")
    }

    fn explode(&mut self, _params: Params) -> Result<()> {
        panic!("handler panicked");
    }

    fn settle(&mut self, _params: Params) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.record("action:settle");
            self.label = "settled".to_string();
            Ok(())
        })
    }

    fn on_ping(&mut self, payload: Payload) -> Result<()> {
        self.record("listener:ping");
        if let Some(label) = snapshot::field::<String>(&payload, "label")? {
            self.label = label;
        }
        Ok(())
    }
}

impl Component for Probe {
    fn component_id(&self) -> &str {
        "probe-1"
    }

    fn wiring(&self) -> &Wiring<Self> {
        &self.wiring
    }

    fn wiring_mut(&mut self) -> &mut Wiring<Self> {
        &mut self.wiring
    }

    fn state(&self) -> StateSnapshot {
        json!({"count": self.count, "label": self.label})
            .as_object()
            .cloned()
            .unwrap_or_default()
    }

    fn set_state(&mut self, state: &StateSnapshot) -> Result<()> {
        snapshot::assign(state, "count", &mut self.count)?;
        snapshot::assign(state, "label", &mut self.label)
    }

    fn render(&self) -> String {
        format!("<p>count={} label={}</p>", self.count, self.label)
    }

    fn mount(&mut self) -> Result<()> {
        self.record("mount");
        Ok(())
    }

    fn prepare(&mut self) -> Result<()> {
        self.record("prepare");
        self.wiring
            .actions
            .on_sync("increment", Self::increment)
            .on_sync("add", Self::add)
            .on_sync("announce", Self::announce)
            .on_sync("fail", Self::fail)
            .on_sync("explode", Self::explode)
            .on("settle", Self::settle);
        Ok(())
    }

    fn updated(&mut self, property: &str) -> Result<()> {
        self.record(format!("updated:{}", property));
        Ok(())
    }

    fn before_render(&mut self) -> BoxFuture<'_, Result<()>> {
        self.record("before_render");
        Box::pin(futures::future::ready(Ok(())))
    }

    fn listeners(&self) -> Listeners<Self> {
        Listeners::new().with_sync("ping", Self::on_ping)
    }

    fn can_view(&self) -> bool {
        !self.hidden
    }
}
