//! Name -> handler tables for actions and listeners
//!
//! Components declare their callable surface explicitly instead of relying on
//! method lookup by name. A handler is a plain function pointer over the
//! concrete component type, tagged by whether it completes synchronously or
//! may suspend for I/O:
//!
//! ```ignore
//! impl Counter {
//!     fn increment(&mut self, _params: Params) -> anyhow::Result<()> {
//!         self.count += 1;
//!         Ok(())
//!     }
//!
//!     fn reload(&mut self, _params: Params) -> BoxFuture<'_, anyhow::Result<()>> {
//!         Box::pin(async move {
//!             self.count = fetch_count().await?;
//!             Ok(())
//!         })
//!     }
//! }
//!
//! // inside prepare()
//! self.wiring_mut().actions.on_sync("increment", Self::increment);
//! self.wiring_mut().actions.on("reload", Self::reload);
//! ```

use super::{Params, Payload};
use anyhow::Result;
use futures::future::{self, BoxFuture};
use std::collections::HashMap;
use std::fmt;

/// Handler that completes without suspending
pub type SyncHandlerFn<C, A> = fn(&mut C, A) -> Result<()>;

/// Handler that may await external I/O while holding the component
pub type AsyncHandlerFn<C, A> = for<'a> fn(&'a mut C, A) -> BoxFuture<'a, Result<()>>;

/// A callable bound to component type `C` taking arguments `A`
pub enum Handler<C, A> {
    Sync(SyncHandlerFn<C, A>),
    Async(AsyncHandlerFn<C, A>),
}

impl<C, A> Clone for Handler<C, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C, A> Copy for Handler<C, A> {}

impl<C, A> fmt::Debug for Handler<C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => write!(f, "Handler::Sync"),
            Self::Async(_) => write!(f, "Handler::Async"),
        }
    }
}

impl<C, A> Handler<C, A> {
    /// Run the handler against `target`
    pub fn invoke<'a>(self, target: &'a mut C, args: A) -> BoxFuture<'a, Result<()>> {
        match self {
            Self::Sync(f) => Box::pin(future::ready(f(target, args))),
            Self::Async(f) => f(target, args),
        }
    }
}

/// Named handlers for one component type
pub struct HandlerTable<C, A> {
    entries: HashMap<String, Handler<C, A>>,
}

/// Action table, rebuilt in `prepare()` on every request
pub type Actions<C> = HandlerTable<C, Params>;

/// Listener table, keyed by event name
pub type Listeners<C> = HandlerTable<C, Payload>;

impl<C, A> HandlerTable<C, A> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register an async handler (replaces any handler of the same name)
    pub fn on(&mut self, name: impl Into<String>, handler: AsyncHandlerFn<C, A>) -> &mut Self {
        self.entries.insert(name.into(), Handler::Async(handler));
        self
    }

    /// Register a sync handler (replaces any handler of the same name)
    pub fn on_sync(&mut self, name: impl Into<String>, handler: SyncHandlerFn<C, A>) -> &mut Self {
        self.entries.insert(name.into(), Handler::Sync(handler));
        self
    }

    /// Builder form of [`on_sync`](Self::on_sync), for `listeners()` bodies
    pub fn with_sync(mut self, name: impl Into<String>, handler: SyncHandlerFn<C, A>) -> Self {
        self.on_sync(name, handler);
        self
    }

    /// Builder form of [`on`](Self::on)
    pub fn with(mut self, name: impl Into<String>, handler: AsyncHandlerFn<C, A>) -> Self {
        self.on(name, handler);
        self
    }

    pub fn get(&self, name: &str) -> Option<Handler<C, A>> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted for deterministic output
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<C, A> Default for HandlerTable<C, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, A> fmt::Debug for HandlerTable<C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerTable")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Tally {
        total: i64,
    }

    impl Tally {
        fn add(&mut self, params: Params) -> Result<()> {
            self.total += params.first().and_then(|v| v.as_i64()).unwrap_or(1);
            Ok(())
        }

        fn add_later(&mut self, params: Params) -> BoxFuture<'_, Result<()>> {
            Box::pin(async move {
                tokio::task::yield_now().await;
                self.add(params)
            })
        }

        fn fail(&mut self, _params: Params) -> Result<()> {
            anyhow::bail!("refused")
        }
    }

    #[tokio::test]
    async fn test_sync_and_async_handlers_invoke() {
        let mut table: Actions<Tally> = HandlerTable::new();
        table.on_sync("add", Tally::add).on("add_later", Tally::add_later);

        let mut tally = Tally::default();
        table.get("add").unwrap().invoke(&mut tally, vec![json!(2)]).await.unwrap();
        table
            .get("add_later")
            .unwrap()
            .invoke(&mut tally, vec![json!(3)])
            .await
            .unwrap();

        assert_eq!(tally.total, 5);
    }

    #[tokio::test]
    async fn test_handler_error_propagates() {
        let table: Actions<Tally> = HandlerTable::new().with_sync("fail", Tally::fail);
        let mut tally = Tally::default();

        let err = table.get("fail").unwrap().invoke(&mut tally, vec![]).await.unwrap_err();
        assert_eq!(err.to_string(), "refused");
    }

    #[test]
    fn test_reregistering_replaces() {
        let mut table: Actions<Tally> = HandlerTable::new();
        table.on_sync("go", Tally::add);
        table.on("go", Tally::add_later);

        assert_eq!(table.len(), 1);
        assert!(matches!(table.get("go"), Some(Handler::Async(_))));
    }

    #[test]
    fn test_names_are_sorted() {
        let table: Actions<Tally> = HandlerTable::new()
            .with_sync("zeta", Tally::add)
            .with_sync("alpha", Tally::add);

        assert_eq!(table.names(), vec!["alpha".to_string(), "zeta".to_string()]);
        assert!(table.get("missing").is_none());
    }
}
