//! Unit tests for inbound routing.

use std::cell::RefCell;
use std::rc::Rc;

use rstest::{fixture, rstest};
use serde_json::json;

use super::*;
use crate::registry::{ReadyPayload, SubscriptionRegistry};

type Log = Rc<RefCell<Vec<String>>>;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

#[fixture]
fn registry() -> SharedRegistry {
    SubscriptionRegistry::shared()
}

#[fixture]
fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

fn router_for(registry: &SharedRegistry) -> InboundRouter {
    InboundRouter::new(Rc::clone(registry), ListenerIsolation::Isolate)
}

fn add_data_listener(registry: &SharedRegistry, log: &Log, label: &'static str, paths: &[&str]) {
    let sink = Rc::clone(log);
    registry.borrow_mut().register_data_listener(
        paths.iter().map(|path| (*path).to_owned()).collect(),
        move |update: &DataUpdate| {
            sink.borrow_mut()
                .push(format!("{label}:{}", update.path().unwrap_or_default()));
        },
    );
}

fn add_event_listener(registry: &SharedRegistry, log: &Log, label: &'static str) {
    let sink = Rc::clone(log);
    registry
        .borrow_mut()
        .register_event_listener(move |_event: &EventUpdate| sink.borrow_mut().push(label.to_owned()));
}

fn ready_message(slot: &str) -> serde_json::Value {
    json!({
        "type": "ReadyToRender",
        "config": {"name": "card", "config": {"slot": slot}},
        "resource": {"run_number": 5},
        "settings": {"compact": true},
    })
}

// ---------------------------------------------------------------------------
// ReadyToRender
// ---------------------------------------------------------------------------

#[rstest]
fn first_ready_invokes_callback_with_payload(registry: SharedRegistry) {
    let received: Rc<RefCell<Option<ReadyPayload>>> = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&received);
    registry
        .borrow_mut()
        .set_ready_callback(move |payload| *sink.borrow_mut() = Some(payload.clone()));

    let outcome = router_for(&registry).route_value(ready_message("S"));

    assert_eq!(
        outcome,
        RouteOutcome::Initialised {
            ready_callback_invoked: true
        }
    );
    let payload = received.borrow().clone().expect("callback ran");
    assert_eq!(payload.parameters()["name"], "card");
    assert_eq!(payload.resource(), &json!({"run_number": 5}));
    assert_eq!(payload.settings(), &json!({"compact": true}));
    assert_eq!(registry.borrow().identity().slot(), Some("S"));
}

#[rstest]
fn repeated_ready_is_a_complete_no_op(registry: SharedRegistry, log: Log) {
    let sink = Rc::clone(&log);
    registry
        .borrow_mut()
        .set_ready_callback(move |_| sink.borrow_mut().push("ready".to_owned()));
    let router = router_for(&registry);

    router.route_value(ready_message("first"));
    let sink = Rc::clone(&log);
    registry
        .borrow_mut()
        .set_ready_callback(move |_| sink.borrow_mut().push("late".to_owned()));
    let outcome = router.route_value(ready_message("second"));

    assert_eq!(outcome, RouteOutcome::AlreadyInitialised);
    assert_eq!(*log.borrow(), vec!["ready"]);
    let registry = registry.borrow();
    assert_eq!(registry.identity().slot(), Some("first"));
    assert!(registry.has_ready_callback(), "late callback is kept, never run");
}

#[rstest]
fn ready_without_callback_still_initialises(registry: SharedRegistry) {
    let outcome = router_for(&registry).route_json(r#"{"type":"ReadyToRender","config":{}}"#);
    assert_eq!(
        outcome,
        RouteOutcome::Initialised {
            ready_callback_invoked: false
        }
    );
    assert!(registry.borrow().is_initialised());
    assert_eq!(registry.borrow().identity().slot(), None);
}

#[rstest]
fn ready_callback_may_register_listeners(registry: SharedRegistry, log: Log) {
    let inner_registry = Rc::clone(&registry);
    let inner_log = Rc::clone(&log);
    registry.borrow_mut().set_ready_callback(move |_| {
        add_data_listener(&inner_registry, &inner_log, "late", &["metadata"]);
    });
    let router = router_for(&registry);

    router.route_value(ready_message("S"));
    router.route_value(json!({"type": "DataUpdate", "path": "metadata"}));

    assert_eq!(*log.borrow(), vec!["late:metadata"]);
}

// ---------------------------------------------------------------------------
// DataUpdate
// ---------------------------------------------------------------------------

#[rstest]
fn data_update_reaches_matching_listeners_in_order(registry: SharedRegistry, log: Log) {
    add_data_listener(&registry, &log, "a", &["metadata", "info"]);
    add_data_listener(&registry, &log, "b", &["run-info"]);
    add_data_listener(&registry, &log, "c", &["metadata"]);

    let outcome = router_for(&registry)
        .route_value(json!({"type": "DataUpdate", "path": "metadata", "data": {"x": 1}}));

    assert_eq!(
        outcome,
        RouteOutcome::DataDelivered(Delivery {
            delivered: 2,
            failed: 0
        })
    );
    assert_eq!(*log.borrow(), vec!["a:metadata", "c:metadata"]);
}

#[rstest]
#[case::missing(json!({"type": "DataUpdate", "data": 1}))]
#[case::null(json!({"type": "DataUpdate", "path": null}))]
#[case::empty(json!({"type": "DataUpdate", "path": ""}))]
fn data_update_without_path_reaches_nobody(
    registry: SharedRegistry,
    log: Log,
    #[case] message: serde_json::Value,
) {
    add_data_listener(&registry, &log, "a", &["", "metadata"]);
    let outcome = router_for(&registry).route_value(message);
    assert_eq!(outcome, RouteOutcome::DataDelivered(Delivery::default()));
    assert!(log.borrow().is_empty());
}

#[rstest]
fn listener_receives_full_message(registry: SharedRegistry) {
    let received: Rc<RefCell<Option<DataUpdate>>> = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&received);
    registry
        .borrow_mut()
        .register_data_listener(vec!["metadata".into()], move |update| {
            *sink.borrow_mut() = Some(update.clone());
        });

    router_for(&registry)
        .route_value(json!({"type": "DataUpdate", "path": "metadata", "data": {"x": 1}, "seq": 2}));

    let update = received.borrow().clone().expect("listener ran");
    assert_eq!(update.data(), &json!({"x": 1}));
    assert_eq!(update.extra().get("seq"), Some(&json!(2)));
}

#[rstest]
fn data_listener_added_during_dispatch_waits_for_next_message(registry: SharedRegistry, log: Log) {
    let inner_registry = Rc::clone(&registry);
    let inner_log = Rc::clone(&log);
    let added = Rc::new(RefCell::new(false));
    registry
        .borrow_mut()
        .register_data_listener(vec!["info".into()], move |_| {
            if !added.replace(true) {
                add_data_listener(&inner_registry, &inner_log, "added", &["info"]);
            }
        });
    let router = router_for(&registry);

    let first = router.route_value(json!({"type": "DataUpdate", "path": "info"}));
    let second = router.route_value(json!({"type": "DataUpdate", "path": "info"}));

    assert_eq!(
        first,
        RouteOutcome::DataDelivered(Delivery {
            delivered: 1,
            failed: 0
        })
    );
    assert_eq!(
        second,
        RouteOutcome::DataDelivered(Delivery {
            delivered: 2,
            failed: 0
        })
    );
    assert_eq!(*log.borrow(), vec!["added:info"]);
}

#[rstest]
fn listener_re_entering_router_is_skipped_for_nested_message(registry: SharedRegistry) {
    let calls = Rc::new(RefCell::new(0_u32));
    let nested: Rc<RefCell<Option<InboundRouter>>> = Rc::new(RefCell::new(None));
    let inner_calls = Rc::clone(&calls);
    let inner_router = Rc::clone(&nested);
    registry
        .borrow_mut()
        .register_data_listener(vec!["info".into()], move |_| {
            *inner_calls.borrow_mut() += 1;
            if let Some(router) = inner_router.borrow().as_ref() {
                let outcome = router.route_value(json!({"type": "DataUpdate", "path": "info"}));
                assert_eq!(
                    outcome,
                    RouteOutcome::DataDelivered(Delivery {
                        delivered: 0,
                        failed: 1
                    })
                );
            }
        });
    let router = router_for(&registry);
    *nested.borrow_mut() = Some(router.clone());

    let outcome = router.route_value(json!({"type": "DataUpdate", "path": "info"}));

    assert_eq!(
        outcome,
        RouteOutcome::DataDelivered(Delivery {
            delivered: 1,
            failed: 0
        })
    );
    assert_eq!(*calls.borrow(), 1);
}

// ---------------------------------------------------------------------------
// EventUpdate
// ---------------------------------------------------------------------------

#[rstest]
#[case::named(json!({"type": "EventUpdate", "event": "RUN_SELECTED"}))]
#[case::bare(json!({"type": "EventUpdate"}))]
#[case::unrelated(json!({"type": "EventUpdate", "event": "SOMETHING_ELSE", "data": [1]}))]
fn every_event_listener_receives_every_event(
    registry: SharedRegistry,
    log: Log,
    #[case] message: serde_json::Value,
) {
    add_event_listener(&registry, &log, "first");
    add_event_listener(&registry, &log, "second");

    let outcome = router_for(&registry).route_value(message);

    assert_eq!(
        outcome,
        RouteOutcome::EventDelivered(Delivery {
            delivered: 2,
            failed: 0
        })
    );
    assert_eq!(*log.borrow(), vec!["first", "second"]);
}

// ---------------------------------------------------------------------------
// Ignored messages
// ---------------------------------------------------------------------------

#[rstest]
#[case::unknown(r#"{"type":"Ping"}"#)]
#[case::untyped(r#"{"path":"metadata"}"#)]
#[case::garbage("not json")]
fn unknown_messages_touch_nothing(registry: SharedRegistry, log: Log, #[case] text: &str) {
    add_data_listener(&registry, &log, "a", &["metadata"]);
    add_event_listener(&registry, &log, "e");

    assert_eq!(router_for(&registry).route_json(text), RouteOutcome::Ignored);
    assert!(log.borrow().is_empty());
    assert!(!registry.borrow().is_initialised());
}

// ---------------------------------------------------------------------------
// Listener isolation
// ---------------------------------------------------------------------------

#[rstest]
fn panicking_listener_does_not_block_others(registry: SharedRegistry, log: Log) {
    registry
        .borrow_mut()
        .register_event_listener(|_| panic!("listener bug"));
    add_event_listener(&registry, &log, "survivor");

    let outcome = router_for(&registry).route_json(r#"{"type":"EventUpdate"}"#);

    assert_eq!(
        outcome,
        RouteOutcome::EventDelivered(Delivery {
            delivered: 1,
            failed: 1
        })
    );
    assert_eq!(*log.borrow(), vec!["survivor"]);
}

#[rstest]
fn panicking_ready_callback_still_initialises(registry: SharedRegistry) {
    registry
        .borrow_mut()
        .set_ready_callback(|_| panic!("ready bug"));

    let outcome = router_for(&registry).route_value(ready_message("S"));

    assert_eq!(
        outcome,
        RouteOutcome::Initialised {
            ready_callback_invoked: false
        }
    );
    assert!(registry.borrow().is_initialised());
}

#[rstest]
#[should_panic(expected = "listener bug")]
fn propagate_policy_lets_panics_through(registry: SharedRegistry) {
    registry
        .borrow_mut()
        .register_event_listener(|_| panic!("listener bug"));
    let router = InboundRouter::new(Rc::clone(&registry), ListenerIsolation::Propagate);
    router.route_json(r#"{"type":"EventUpdate"}"#);
}

#[test]
fn panic_message_handles_common_payloads() {
    let text: Box<dyn Any + Send> = Box::new("static text");
    let owned: Box<dyn Any + Send> = Box::new(String::from("owned text"));
    let other: Box<dyn Any + Send> = Box::new(7_u8);
    assert_eq!(panic_message(text.as_ref()), "static text");
    assert_eq!(panic_message(owned.as_ref()), "owned text");
    assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
}
