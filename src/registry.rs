//! Component registry
//!
//! Owns two tables:
//!
//! - **factories**: type name -> constructor, written at boot, read on every
//!   request
//! - **instances**: id -> tracked instance, for components application code
//!   explicitly keeps alive (server-initiated pushes and the like)
//!
//! Ephemeral instances built by [`Registry::handle_wire_request`] never enter
//! the instance table, so a later request cannot reach them.
//!
//! # Trust boundary
//!
//! `handle_wire_request` is the only path that accepts untrusted input, and it
//! only trusts state that carries a valid signature. The direct persistent
//! operations (`dispatch_action`, `update_property`) skip signature checks
//! entirely and are for in-process callers only; the HTTP layer never routes
//! to them.

use crate::codec::StateCodec;
use crate::component::{Component, Dispatch, LiveComponent, Params, PropertyUpdate};
use crate::wire::WireRequest;
use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Constructs a fresh, zero-value instance of one component type
pub type Factory = Arc<dyn Fn() -> Box<dyn LiveComponent> + Send + Sync>;

/// A tracked instance; lock it to call into the component
pub type SharedInstance = Arc<tokio::sync::Mutex<Box<dyn LiveComponent>>>;

/// Factory table, tracked instances, and the wire request phase sequence
pub struct Registry {
    codec: StateCodec,
    factories: RwLock<HashMap<String, Factory>>,
    instances: RwLock<HashMap<String, SharedInstance>>,
}

impl Registry {
    pub fn new(codec: StateCodec) -> Self {
        Self {
            codec,
            factories: RwLock::new(HashMap::new()),
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// Codec used to verify incoming tokens and sign outgoing ones
    pub fn codec(&self) -> &StateCodec {
        &self.codec
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Factories
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a constructor for `type_name` (last registration wins)
    pub fn register_factory<C, F>(&self, type_name: impl Into<String>, factory: F)
    where
        C: Component,
        F: Fn() -> C + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        let factory: Factory = Arc::new(move || Box::new(factory()) as Box<dyn LiveComponent>);

        let replaced = self
            .factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(type_name.clone(), factory)
            .is_some();

        if replaced {
            tracing::debug!(component = %type_name, "Replaced component factory");
        } else {
            tracing::debug!(component = %type_name, "Registered component factory");
        }
    }

    /// Register `C::default` as the constructor for `type_name`
    pub fn register<C: Component + Default>(&self, type_name: impl Into<String>) {
        self.register_factory(type_name, C::default);
    }

    pub fn has_factory(&self, type_name: &str) -> bool {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(type_name)
    }

    /// Registered type names, sorted
    pub fn factory_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Build a fresh instance, or `None` if the type is unknown
    fn construct(&self, type_name: &str) -> Option<Box<dyn LiveComponent>> {
        // Clone the factory out so component code never runs under the lock
        let factory = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(type_name)
            .cloned()?;
        Some(factory())
    }

    /// Construct and mount an instance without tracking it
    ///
    /// Used for a component's very first render, before any token exists.
    pub fn mount_ephemeral(&self, type_name: &str) -> Result<Option<Box<dyn LiveComponent>>> {
        let Some(mut instance) = self.construct(type_name) else {
            tracing::info!(component = %type_name, "Component factory not found");
            return Ok(None);
        };
        instance.mount()?;
        Ok(Some(instance))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tracked instances
    // ─────────────────────────────────────────────────────────────────────────

    /// Construct, mount and track an instance
    ///
    /// Stored under `instance_id`, or the component's own id when `None`.
    /// An unknown type is logged and yields `Ok(None)`.
    pub fn create_instance(
        &self,
        type_name: &str,
        instance_id: Option<&str>,
    ) -> Result<Option<SharedInstance>> {
        let Some(mut instance) = self.construct(type_name) else {
            tracing::info!(component = %type_name, "Component factory not found");
            return Ok(None);
        };
        instance.mount()?;

        let id = instance_id
            .map(str::to_string)
            .unwrap_or_else(|| instance.component_id().to_string());
        tracing::debug!(component = %type_name, instance = %id, "Created tracked instance");
        Ok(Some(self.register_instance_as(id, instance)))
    }

    /// Track an existing instance under its own component id
    pub fn register_instance(&self, instance: Box<dyn LiveComponent>) -> SharedInstance {
        let id = instance.component_id().to_string();
        self.register_instance_as(id, instance)
    }

    /// Track an existing instance under `id`, replacing any previous one
    pub fn register_instance_as(
        &self,
        id: impl Into<String>,
        instance: Box<dyn LiveComponent>,
    ) -> SharedInstance {
        let shared: SharedInstance = Arc::new(tokio::sync::Mutex::new(instance));
        self.instances
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.into(), shared.clone());
        shared
    }

    pub fn get_instance(&self, id: &str) -> Option<SharedInstance> {
        self.instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn remove_instance(&self, id: &str) -> Option<SharedInstance> {
        self.instances
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    /// Tracked instance ids, sorted
    pub fn instance_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Run an action on a tracked instance, outside the signed-token flow
    ///
    /// `prepare()` runs first so the action table is current. An unknown
    /// instance yields `Ok(None)`; an unknown action is logged and the
    /// instance is still returned. Events the action dispatches stay on the
    /// instance until the caller drains them.
    pub async fn dispatch_action(
        &self,
        instance_id: &str,
        action: &str,
        params: Params,
    ) -> Result<Option<SharedInstance>> {
        let Some(shared) = self.get_instance(instance_id) else {
            tracing::info!(instance = %instance_id, "Tracked instance not found");
            return Ok(None);
        };

        {
            let mut instance = shared.lock().await;
            instance.prepare()?;
            if instance.call_action(action, params).await? == Dispatch::Unhandled {
                tracing::warn!(
                    instance = %instance_id,
                    action = %action,
                    available = ?instance.action_names(),
                    "Action not handled by tracked instance"
                );
            }
        }

        Ok(Some(shared))
    }

    /// Set one property on a tracked instance and run its `updated` hook
    pub async fn update_property(
        &self,
        instance_id: &str,
        property: &str,
        value: Value,
    ) -> Result<Option<SharedInstance>> {
        let Some(shared) = self.get_instance(instance_id) else {
            tracing::info!(instance = %instance_id, "Tracked instance not found");
            return Ok(None);
        };

        {
            let mut instance = shared.lock().await;
            if instance.update_property(property, value)? == PropertyUpdate::Undeclared {
                tracing::warn!(
                    instance = %instance_id,
                    property = %property,
                    "Ignoring update to undeclared property"
                );
            }
        }

        Ok(Some(shared))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Wire request phases
    // ─────────────────────────────────────────────────────────────────────────

    /// Rebuild an ephemeral instance from a wire request and apply it
    ///
    /// Phases, in order: construct → restore signed state → property updates
    /// → `prepare()` → incoming event → action. Returns `Ok(None)` when the
    /// type is not registered. Hook and handler errors propagate unchanged.
    pub async fn handle_wire_request(
        &self,
        request: WireRequest,
    ) -> Result<Option<Box<dyn LiveComponent>>> {
        let WireRequest {
            type_name,
            state,
            action,
            params,
            models,
            event,
        } = request;

        let Some(mut instance) = self.construct(&type_name) else {
            tracing::info!(component = %type_name, "Component factory not found");
            return Ok(None);
        };

        // A forged or stale token, or one issued to another component, leaves
        // the zero-value state in place. The caller gets no signal either way.
        match self.codec.verify(&state) {
            Ok(token) if token.component_id == instance.component_id() => {
                instance.set_state(&token.state)?
            }
            Ok(token) => tracing::debug!(
                component = %type_name,
                token_id = %token.component_id,
                "State token belongs to another component; continuing with zero-value state"
            ),
            Err(reason) => tracing::debug!(
                component = %type_name,
                %reason,
                "State token not accepted; continuing with zero-value state"
            ),
        }

        for (property, value) in models {
            if instance.update_property(&property, value)? == PropertyUpdate::Undeclared {
                tracing::warn!(
                    component = %type_name,
                    property = %property,
                    "Ignoring update to undeclared property"
                );
            }
        }

        instance.prepare()?;

        if let Some(event) = event {
            let name = event.name.clone();
            if instance.deliver_event(event).await? == Dispatch::Unhandled {
                tracing::debug!(component = %type_name, event = %name, "No listener for event");
            }
        }

        if let Some(action) = action {
            if instance.call_action(&action, params).await? == Dispatch::Unhandled {
                tracing::warn!(
                    component = %type_name,
                    action = %action,
                    available = ?instance.action_names(),
                    "Action not handled"
                );
            }
        }

        Ok(Some(instance))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("factories", &self.factory_names())
            .field("instances", &self.instance_ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::testing::{test_codec, Journal, Probe};
    use crate::component::{Payload, StateSnapshot, WireEvent};
    use serde_json::json;

    fn registry_with_probe(journal: &Journal) -> Registry {
        let registry = Registry::new(test_codec());
        let journal = journal.clone();
        registry.register_factory("probe", move || Probe::with_journal(journal.clone()));
        registry
    }

    fn signed(registry: &Registry, state: serde_json::Value) -> String {
        let snapshot: StateSnapshot = state.as_object().cloned().unwrap();
        registry.codec().serialize("probe-1", &snapshot).unwrap()
    }

    fn entries(journal: &Journal) -> Vec<String> {
        journal.lock().unwrap().clone()
    }

    #[test]
    fn test_factory_registration_last_write_wins() {
        let registry = Registry::new(test_codec());
        assert!(!registry.has_factory("probe"));

        registry.register::<Probe>("probe");
        registry.register_factory("probe", || Probe::with_count(99));

        assert!(registry.has_factory("probe"));
        assert_eq!(registry.factory_names(), vec!["probe".to_string()]);
        let instance = registry.construct("probe").unwrap();
        assert_eq!(instance.state()["count"], json!(99));
    }

    #[tokio::test]
    async fn test_phase_order_prepare_before_event_and_action() {
        let journal = Journal::default();
        let registry = registry_with_probe(&journal);
        let request = WireRequest::new("probe", signed(&registry, json!({"count": 1})))
            .with_model("label", json!("x"))
            .with_event(WireEvent::new("ping", Payload::new()))
            .with_action("increment", vec![]);

        registry.handle_wire_request(request).await.unwrap().unwrap();

        assert_eq!(
            entries(&journal),
            vec!["updated:label", "prepare", "listener:ping", "action:increment"]
        );
    }

    #[tokio::test]
    async fn test_mount_not_run_for_ephemeral_instances() {
        let journal = Journal::default();
        let registry = registry_with_probe(&journal);

        let request = WireRequest::new("probe", signed(&registry, json!({"count": 0})));
        registry.handle_wire_request(request).await.unwrap();

        assert!(!entries(&journal).contains(&"mount".to_string()));
    }

    #[tokio::test]
    async fn test_action_applies_to_restored_state() {
        let registry = registry_with_probe(&Journal::default());
        let request = WireRequest::new("probe", signed(&registry, json!({"count": 41})))
            .with_action("increment", vec![]);

        let instance = registry.handle_wire_request(request).await.unwrap().unwrap();
        assert_eq!(instance.state()["count"], json!(42));
    }

    #[tokio::test]
    async fn test_forged_token_degrades_to_zero_value_state() {
        let registry = registry_with_probe(&Journal::default());
        let token = signed(&registry, json!({"count": 41, "label": "kept"}));
        let encoded = token.split('.').next().unwrap();
        let request = WireRequest::new("probe", format!("{}.XXXX", encoded))
            .with_action("increment", vec![]);

        let instance = registry.handle_wire_request(request).await.unwrap().unwrap();

        assert_eq!(instance.state()["count"], json!(1));
        assert_eq!(instance.state()["label"], json!(""));
    }

    #[tokio::test]
    async fn test_token_for_another_component_degrades_to_zero_value_state() {
        let registry = registry_with_probe(&Journal::default());
        let snapshot: StateSnapshot = json!({"count": 41, "label": "borrowed"})
            .as_object()
            .cloned()
            .unwrap();
        let token = registry.codec().serialize("counter-1", &snapshot).unwrap();

        let instance = registry
            .handle_wire_request(WireRequest::new("probe", token))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(instance.state()["count"], json!(0));
        assert_eq!(instance.state()["label"], json!(""));
    }

    #[tokio::test]
    async fn test_tampered_payload_degrades_to_zero_value_state() {
        let registry = registry_with_probe(&Journal::default());
        let token = signed(&registry, json!({"count": 5}));
        let mut bytes = token.into_bytes();
        bytes[3] ^= 0x01;
        let tampered = String::from_utf8(bytes).unwrap();

        let instance = registry
            .handle_wire_request(WireRequest::new("probe", tampered))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(instance.state()["count"], json!(0));
    }

    #[tokio::test]
    async fn test_property_updates_are_idempotent() {
        let registry = registry_with_probe(&Journal::default());
        let token = signed(&registry, json!({"count": 1, "label": "a"}));

        let once = registry
            .handle_wire_request(WireRequest::new("probe", token.clone()).with_model("count", json!(7)))
            .await
            .unwrap()
            .unwrap();

        // Apply the same update again on top of the first result
        let token_after = once.build("probe", registry.codec()).unwrap().state_token;
        let twice = registry
            .handle_wire_request(WireRequest::new("probe", token_after).with_model("count", json!(7)))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(once.state(), twice.state());
        assert_eq!(twice.state()["count"], json!(7));
    }

    #[tokio::test]
    async fn test_property_updates_apply_in_order_each_with_hook() {
        let journal = Journal::default();
        let registry = registry_with_probe(&journal);
        let body = format!(
            r#"{{"name":"probe","state":"{}","models":{{"label":"b","count":3}}}}"#,
            signed(&registry, json!({"count": 0}))
        );
        let request = WireRequest::parse(body.as_bytes()).unwrap();

        registry.handle_wire_request(request).await.unwrap();

        assert_eq!(
            entries(&journal),
            vec!["updated:label", "updated:count", "prepare"]
        );
    }

    #[tokio::test]
    async fn test_undeclared_property_is_skipped() {
        let journal = Journal::default();
        let registry = registry_with_probe(&journal);
        let request = WireRequest::new("probe", signed(&registry, json!({"count": 2})))
            .with_model("hidden", json!(true));

        let instance = registry.handle_wire_request(request).await.unwrap().unwrap();

        assert!(instance.can_view());
        assert_eq!(entries(&journal), vec!["prepare"]);
    }

    #[tokio::test]
    async fn test_unknown_action_is_not_an_error() {
        let registry = registry_with_probe(&Journal::default());
        let request = WireRequest::new("probe", signed(&registry, json!({"count": 3})))
            .with_action("doesNotExist", vec![]);

        let instance = registry.handle_wire_request(request).await.unwrap().unwrap();
        assert_eq!(instance.state()["count"], json!(3));
    }

    #[tokio::test]
    async fn test_unknown_event_is_ignored() {
        let journal = Journal::default();
        let registry = registry_with_probe(&journal);
        let request = WireRequest::new("probe", signed(&registry, json!({})))
            .with_event(WireEvent::new("unrelated", Payload::new()));

        registry.handle_wire_request(request).await.unwrap().unwrap();
        assert_eq!(entries(&journal), vec!["prepare"]);
    }

    #[tokio::test]
    async fn test_unknown_type_yields_none() {
        let registry = registry_with_probe(&Journal::default());
        let request = WireRequest::new("unregistered-type", "x.y").with_action("x", vec![]);

        assert!(registry.handle_wire_request(request).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_handler_error_propagates() {
        let registry = registry_with_probe(&Journal::default());
        let request = WireRequest::new("probe", signed(&registry, json!({})))
            .with_action("fail", vec![]);

        let err = registry.handle_wire_request(request).await.err().unwrap();
        assert_eq!(err.to_string(), "handler exploded");
    }

    #[tokio::test]
    async fn test_invalid_state_shape_under_valid_signature_is_an_error() {
        let registry = registry_with_probe(&Journal::default());
        let request = WireRequest::new("probe", signed(&registry, json!({"count": "many"})));

        assert!(registry.handle_wire_request(request).await.is_err());
    }

    #[tokio::test]
    async fn test_ephemeral_instances_are_not_tracked() {
        let registry = registry_with_probe(&Journal::default());
        let request = WireRequest::new("probe", signed(&registry, json!({})));

        registry.handle_wire_request(request).await.unwrap();
        assert!(registry.instance_ids().is_empty());
        assert!(registry.get_instance("probe-1").is_none());
    }

    #[tokio::test]
    async fn test_create_instance_mounts_and_tracks() {
        let journal = Journal::default();
        let registry = registry_with_probe(&journal);

        let shared = registry.create_instance("probe", None).unwrap().unwrap();
        assert_eq!(entries(&journal), vec!["mount"]);
        assert_eq!(registry.instance_ids(), vec!["probe-1".to_string()]);
        assert!(Arc::ptr_eq(&shared, &registry.get_instance("probe-1").unwrap()));

        registry.create_instance("probe", Some("sidebar")).unwrap().unwrap();
        assert_eq!(
            registry.instance_ids(),
            vec!["probe-1".to_string(), "sidebar".to_string()]
        );
    }

    #[test]
    fn test_create_unknown_type_yields_none() {
        let registry = Registry::new(test_codec());
        assert!(registry.create_instance("nope", None).unwrap().is_none());
        assert!(registry.instance_ids().is_empty());
    }

    #[tokio::test]
    async fn test_register_and_remove_instance() {
        let registry = Registry::new(test_codec());
        registry.register_instance(Box::new(Probe::default()));

        assert!(registry.get_instance("probe-1").is_some());
        assert!(registry.remove_instance("probe-1").is_some());
        assert!(registry.get_instance("probe-1").is_none());
        assert!(registry.remove_instance("probe-1").is_none());
    }

    #[tokio::test]
    async fn test_dispatch_action_on_tracked_instance() {
        let journal = Journal::default();
        let registry = registry_with_probe(&journal);
        registry.create_instance("probe", Some("p")).unwrap();

        let shared = registry
            .dispatch_action("p", "add", vec![json!(5)])
            .await
            .unwrap()
            .unwrap();

        assert_eq!(shared.lock().await.state()["count"], json!(5));
        assert_eq!(entries(&journal), vec!["mount", "prepare", "action:add"]);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_action_still_returns_instance() {
        let registry = registry_with_probe(&Journal::default());
        registry.create_instance("probe", Some("p")).unwrap();

        let result = registry.dispatch_action("p", "nope", vec![]).await.unwrap();
        assert!(result.is_some());
    }

    #[tokio::test]
    async fn test_dispatch_to_unknown_instance_yields_none() {
        let registry = registry_with_probe(&Journal::default());
        assert!(registry
            .dispatch_action("ghost", "increment", vec![])
            .await
            .unwrap()
            .is_none());
        assert!(registry
            .update_property("ghost", "count", json!(1))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_failed_action_keeps_earlier_state() {
        let registry = registry_with_probe(&Journal::default());
        registry.create_instance("probe", Some("p")).unwrap();
        registry.update_property("p", "count", json!(4)).await.unwrap();

        assert!(registry.dispatch_action("p", "fail", vec![]).await.is_err());

        let shared = registry.get_instance("p").unwrap();
        assert_eq!(shared.lock().await.state()["count"], json!(4));
    }

    #[test]
    fn test_mount_ephemeral_is_not_tracked() {
        let journal = Journal::default();
        let registry = registry_with_probe(&journal);

        let instance = registry.mount_ephemeral("probe").unwrap().unwrap();
        assert_eq!(instance.component_id(), "probe-1");
        assert_eq!(entries(&journal), vec!["mount"]);
        assert!(registry.instance_ids().is_empty());
        assert!(registry.mount_ephemeral("missing").unwrap().is_none());
    }
}
