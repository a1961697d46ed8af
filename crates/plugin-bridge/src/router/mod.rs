//! Inbound message routing.
//!
//! The [`InboundRouter`] is the only entry point for messages arriving from
//! the host. It classifies each message by its `type` and delivers it to the
//! listeners stored in the session's [`SubscriptionRegistry`]:
//!
//! - `ReadyToRender` initialises the registry once and runs the ready
//!   callback; repeats are no-ops.
//! - `DataUpdate` reaches every data listener whose paths contain the
//!   message's `path`, in registration order. Updates without a path reach
//!   nobody.
//! - `EventUpdate` reaches every event listener, whatever event names it was
//!   registered with.
//! - Anything else is dropped without a trace.
//!
//! Matching callbacks are collected before any of them runs and the registry
//! borrow is released during delivery, so callbacks may register further
//! listeners or send messages. Listeners added while a message is being
//! delivered first see the next message.
//!
//! [`SubscriptionRegistry`]: crate::registry::SubscriptionRegistry

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use plugin_bridge_config::ListenerIsolation;
use serde_json::Value;
use tracing::{debug, error, trace, warn};

use crate::protocol::{DataUpdate, EventUpdate, InboundMessage, ReadyToRender};
use crate::registry::{SharedCallback, SharedRegistry};

/// What happened to a routed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The first `ReadyToRender` of the session was recorded.
    Initialised {
        /// Whether a ready callback was stored and ran to completion.
        ready_callback_invoked: bool,
    },
    /// A later `ReadyToRender` was ignored.
    AlreadyInitialised,
    /// A `DataUpdate` was offered to the matching data listeners.
    DataDelivered(Delivery),
    /// An `EventUpdate` was offered to every event listener.
    EventDelivered(Delivery),
    /// The message had no recognised `type`.
    Ignored,
}

/// Per-message delivery counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Listeners that handled the message.
    pub delivered: usize,
    /// Listeners that panicked or were already running.
    pub failed: usize,
}

impl Delivery {
    fn record(&mut self, succeeded: bool) {
        if succeeded {
            self.delivered += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Dispatches host messages to the listeners of one session.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// use plugin_bridge::registry::SubscriptionRegistry;
/// use plugin_bridge::router::{Delivery, InboundRouter, RouteOutcome};
/// use plugin_bridge::ListenerIsolation;
///
/// let registry = SubscriptionRegistry::shared();
/// let hits = Rc::new(Cell::new(0));
/// let counter = Rc::clone(&hits);
/// registry
///     .borrow_mut()
///     .register_data_listener(vec!["metadata".into()], move |_| counter.set(counter.get() + 1));
///
/// let router = InboundRouter::new(registry, ListenerIsolation::Isolate);
/// let outcome = router.route_json(r#"{"type":"DataUpdate","path":"metadata","data":{"x":1}}"#);
/// assert_eq!(outcome, RouteOutcome::DataDelivered(Delivery { delivered: 1, failed: 0 }));
/// assert_eq!(hits.get(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct InboundRouter {
    registry: SharedRegistry,
    isolation: ListenerIsolation,
}

impl InboundRouter {
    /// Creates a router over `registry`.
    #[must_use]
    pub const fn new(registry: SharedRegistry, isolation: ListenerIsolation) -> Self {
        Self {
            registry,
            isolation,
        }
    }

    /// Returns the listener failure policy.
    #[must_use]
    pub const fn isolation(&self) -> ListenerIsolation {
        self.isolation
    }

    /// Decodes JSON text and routes it. Invalid JSON is ignored.
    pub fn route_json(&self, text: &str) -> RouteOutcome {
        self.route(InboundMessage::from_json(text))
    }

    /// Decodes a structured value and routes it.
    pub fn route_value(&self, value: Value) -> RouteOutcome {
        self.route(InboundMessage::from_value(value))
    }

    /// Routes a decoded message.
    ///
    /// # Panics
    ///
    /// With [`ListenerIsolation::Propagate`], a panicking listener unwinds
    /// through this call.
    pub fn route(&self, message: InboundMessage) -> RouteOutcome {
        match message {
            InboundMessage::ReadyToRender(ready) => self.on_ready(ready),
            InboundMessage::DataUpdate(update) => self.on_data(&update),
            InboundMessage::EventUpdate(event) => self.on_event(&event),
            InboundMessage::Ignored => RouteOutcome::Ignored,
        }
    }

    fn on_ready(&self, ready: ReadyToRender) -> RouteOutcome {
        let (config, resource, settings) = ready.into_parts();
        let pending = {
            let mut registry = self.registry.borrow_mut();
            if !registry.try_set_ready(config, resource, settings) {
                trace!("ignoring repeated ReadyToRender");
                return RouteOutcome::AlreadyInitialised;
            }
            registry
                .take_ready_callback()
                .map(|callback| (callback, registry.payload().clone()))
        };

        let ready_callback_invoked = match pending {
            Some((callback, payload)) => self.invoke("ReadyToRender", move || callback(&payload)),
            None => false,
        };
        debug!(ready_callback_invoked, "plugin initialised");
        RouteOutcome::Initialised {
            ready_callback_invoked,
        }
    }

    fn on_data(&self, update: &DataUpdate) -> RouteOutcome {
        let Some(path) = update.path().filter(|path| !path.is_empty()) else {
            debug!("dropping DataUpdate without a path");
            return RouteOutcome::DataDelivered(Delivery::default());
        };
        let callbacks = self.registry.borrow().data_callbacks_for(path);
        let delivery = self.deliver("DataUpdate", &callbacks, update);
        debug!(
            path,
            delivered = delivery.delivered,
            failed = delivery.failed,
            "routed DataUpdate"
        );
        RouteOutcome::DataDelivered(delivery)
    }

    fn on_event(&self, event: &EventUpdate) -> RouteOutcome {
        let callbacks = self.registry.borrow().event_callbacks();
        let delivery = self.deliver("EventUpdate", &callbacks, event);
        debug!(
            delivered = delivery.delivered,
            failed = delivery.failed,
            "routed EventUpdate"
        );
        RouteOutcome::EventDelivered(delivery)
    }

    fn deliver<M: 'static>(
        &self,
        kind: &'static str,
        callbacks: &[SharedCallback<M>],
        message: &M,
    ) -> Delivery {
        let mut delivery = Delivery::default();
        for callback in callbacks {
            let Ok(mut callback) = callback.try_borrow_mut() else {
                warn!(kind, "skipping listener that is already handling a message");
                delivery.record(false);
                continue;
            };
            let succeeded = self.invoke(kind, || (&mut *callback)(message));
            delivery.record(succeeded);
        }
        delivery
    }

    /// Runs one listener under the isolation policy. Returns `false` when the
    /// listener panicked and the panic was contained.
    fn invoke(&self, kind: &'static str, call: impl FnOnce()) -> bool {
        match self.isolation {
            ListenerIsolation::Propagate => {
                call();
                true
            }
            ListenerIsolation::Isolate => match panic::catch_unwind(AssertUnwindSafe(call)) {
                Ok(()) => true,
                Err(payload) => {
                    error!(
                        kind,
                        panic = panic_message(payload.as_ref()),
                        "listener panicked; continuing delivery"
                    );
                    false
                }
            },
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests;
