//! Event dispatch: handler registration and synchronous fan-out

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::{
    error::{AriError, AriResult, HandlerError, HandlerFailure},
    event::{AriEvent, AriEventType, EventVariant},
    payload::{AriMessage, RawMessage},
};

/// Opaque handle returned by registration, accepted by [`EventRouter::off`].
///
/// Every registration gets a fresh id, so registering the same closure twice
/// yields two independently removable subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Numeric value, unique per router.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a router does with a message whose `type` is not in the event table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownEventPolicy {
    /// Project to [`AriEvent::Other`] and deliver it to catch-all handlers.
    #[default]
    Fallback,
    /// Fail the dispatch with [`AriError::UnknownEventType`].
    Reject,
}

/// Router configuration, fixed at construction.
///
/// Deserializable so hosts can embed it in their own config files:
///
/// ```
/// use asterisk_ari_events::{RouterOptions, UnknownEventPolicy};
///
/// let opts: RouterOptions = serde_json::from_str(r#"{"unknown_events":"reject"}"#).unwrap();
/// assert_eq!(opts.unknown_events, UnknownEventPolicy::Reject);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterOptions {
    /// Unknown discriminant handling. Default: [`UnknownEventPolicy::Fallback`].
    pub unknown_events: UnknownEventPolicy,
}

/// Outcome of a dispatch in which every handler succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Wire discriminant of the dispatched event.
    pub event_type: String,
    /// Typed discriminant, `None` for generic fallback events.
    pub typed: Option<AriEventType>,
    /// Number of handlers invoked (variant-specific plus catch-all).
    pub handlers_invoked: usize,
}

type DynHandler = Arc<dyn Fn(&AriEvent) -> Result<(), HandlerError> + Send + Sync>;

#[derive(Clone)]
struct Registration {
    id: SubscriptionId,
    handler: DynHandler,
}

/// `None` key in `index` means the catch-all list.
#[derive(Default)]
struct Registry {
    by_type: HashMap<AriEventType, Vec<Registration>>,
    any: Vec<Registration>,
    index: HashMap<SubscriptionId, Option<AriEventType>>,
}

impl Registry {
    fn insert(&mut self, key: Option<AriEventType>, registration: Registration) {
        self.index
            .insert(registration.id, key);
        match key {
            Some(event_type) => self
                .by_type
                .entry(event_type)
                .or_default()
                .push(registration),
            None => self
                .any
                .push(registration),
        }
    }

    fn remove(&mut self, id: SubscriptionId) -> bool {
        let Some(key) = self
            .index
            .remove(&id)
        else {
            return false;
        };
        let list = match key {
            Some(event_type) => match self
                .by_type
                .get_mut(&event_type)
            {
                Some(list) => list,
                None => return false,
            },
            None => &mut self.any,
        };
        list.retain(|r| r.id != id);
        let now_empty = list.is_empty();
        if let (Some(event_type), true) = (key, now_empty) {
            self.by_type
                .remove(&event_type);
        }
        true
    }

    /// Handlers for one event, variant-specific first, in registration order.
    fn snapshot(&self, event_type: Option<AriEventType>) -> Vec<Registration> {
        let specific = event_type
            .and_then(|t| {
                self.by_type
                    .get(&t)
            })
            .map(Vec::as_slice)
            .unwrap_or_default();
        specific
            .iter()
            .chain(self.any.iter())
            .cloned()
            .collect()
    }
}

/// Routes projected ARI events to registered handlers.
///
/// `EventRouter` is `Send + Sync`; share it behind an `Arc`. Registration and
/// deregistration are safe from any thread, including from inside a handler.
/// Dispatch runs handlers synchronously on the calling thread.
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use asterisk_ari_events::{EventRouter, StasisStart};
///
/// let router = EventRouter::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = seen.clone();
/// router.on(move |start: &StasisStart| {
///     sink.lock().unwrap().push(start.channel().id().to_string());
///     Ok(())
/// });
///
/// router
///     .dispatch(r#"{"type":"StasisStart","channel":{"id":"1","name":"SIP/foo-1","state":"Up"},"args":[]}"#)
///     .unwrap();
/// assert_eq!(*seen.lock().unwrap(), ["1"]);
/// ```
pub struct EventRouter {
    registry: RwLock<Registry>,
    next_id: AtomicU64,
    options: RouterOptions,
}

impl fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRouter")
            .field("handlers", &self.handler_count())
            .field("options", &self.options)
            .finish()
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventRouter {
    /// Router with default options.
    pub fn new() -> Self {
        Self::with_options(RouterOptions::default())
    }

    /// Router with explicit options.
    pub fn with_options(options: RouterOptions) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            next_id: AtomicU64::new(1),
            options,
        }
    }

    /// Options this router was built with.
    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    fn register(&self, key: Option<AriEventType>, handler: DynHandler) -> SubscriptionId {
        let id = SubscriptionId(
            self.next_id
                .fetch_add(1, Ordering::Relaxed),
        );
        self.registry
            .write()
            .insert(key, Registration { id, handler });
        match key {
            Some(event_type) => debug!("[ROUTER] Registered handler {} for {}", id, event_type),
            None => debug!("[ROUTER] Registered catch-all handler {}", id),
        }
        id
    }

    /// Register a typed handler for the variant `E`.
    pub fn on<E, F>(&self, handler: F) -> SubscriptionId
    where
        E: EventVariant,
        F: Fn(&E) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.register(
            Some(E::EVENT_TYPE),
            Arc::new(move |event: &AriEvent| match E::from_event(event) {
                Some(e) => handler(e),
                None => Ok(()),
            }),
        )
    }

    /// Register a handler for one event type, receiving the [`AriEvent`] enum.
    pub fn on_type<F>(&self, event_type: AriEventType, handler: F) -> SubscriptionId
    where
        F: Fn(&AriEvent) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.register(Some(event_type), Arc::new(handler))
    }

    /// Register a catch-all handler.
    ///
    /// Catch-all handlers see every dispatched event, including generic
    /// fallback events, after the variant-specific handlers.
    pub fn on_any<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&AriEvent) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.register(None, Arc::new(handler))
    }

    /// Deregister a handler. Returns `false` if the id was not registered.
    ///
    /// A dispatch already in progress keeps its snapshot and may still call
    /// the handler once; no later dispatch will.
    pub fn off(&self, id: SubscriptionId) -> bool {
        let removed = self
            .registry
            .write()
            .remove(id);
        if removed {
            debug!("[ROUTER] Removed handler {}", id);
        } else {
            trace!("[ROUTER] Handler {} was not registered", id);
        }
        removed
    }

    /// Total registered handlers, catch-all included.
    pub fn handler_count(&self) -> usize {
        self.registry
            .read()
            .index
            .len()
    }

    /// Remove every handler.
    pub fn clear(&self) {
        let mut registry = self
            .registry
            .write();
        *registry = Registry::default();
        debug!("[ROUTER] Cleared all handlers");
    }

    /// Project a raw message and dispatch it.
    ///
    /// Projection errors are returned before any handler runs. Handler
    /// failures are collected and returned together once every handler has
    /// run, as [`AriError::HandlerExecution`].
    pub fn dispatch(&self, raw: impl Into<RawMessage>) -> AriResult<DispatchReport> {
        let message = AriMessage::parse(raw).inspect_err(|e| {
            warn!("[DISPATCH] Dropping undecodable message: {}", e);
        })?;
        self.check_known(message.message_type(), message.event_type())?;
        let event = AriEvent::from_message(message).inspect_err(|e| {
            warn!("[DISPATCH] Dropping message: {}", e);
        })?;
        self.dispatch_event(&event)
    }

    /// Dispatch an already projected event.
    pub fn dispatch_event(&self, event: &AriEvent) -> AriResult<DispatchReport> {
        let typed = event.event_type();
        self.check_known(event.type_name(), typed)?;

        let handlers = self
            .registry
            .read()
            .snapshot(typed);
        trace!(
            "[DISPATCH] {} -> {} handler(s)",
            event.type_name(),
            handlers.len()
        );

        let mut failures = Vec::new();
        for registration in &handlers {
            if let Err(failure) = self.invoke(registration, event) {
                warn!("[DISPATCH] {}", failure);
                failures.push(failure);
            }
        }

        if failures.is_empty() {
            Ok(DispatchReport {
                event_type: event
                    .type_name()
                    .to_string(),
                typed,
                handlers_invoked: handlers.len(),
            })
        } else {
            Err(AriError::HandlerExecution(failures))
        }
    }

    fn check_known(&self, type_name: &str, typed: Option<AriEventType>) -> AriResult<()> {
        if typed.is_none() && self.options.unknown_events == UnknownEventPolicy::Reject {
            warn!("[DISPATCH] Rejecting unknown event type {}", type_name);
            return Err(AriError::UnknownEventType(type_name.to_string()));
        }
        Ok(())
    }

    fn invoke(&self, registration: &Registration, event: &AriEvent) -> Result<(), HandlerFailure> {
        let failure = |message: String, panicked: bool| HandlerFailure {
            subscription: registration.id,
            event_type: event
                .type_name()
                .to_string(),
            message,
            panicked,
        };

        match catch_unwind(AssertUnwindSafe(|| (registration.handler)(event))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(failure(e.to_string(), false)),
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| {
                        payload
                            .downcast_ref::<String>()
                            .cloned()
                    })
                    .unwrap_or_else(|| "handler panicked".to_string());
                Err(failure(message, true))
            }
        }
    }
}
