//! Crate-level integration and BDD tests.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;

use crate::bridge::PluginBridge;
use crate::protocol::OutboundMessage;
use crate::router::RouteOutcome;
use crate::transport::RecordingTransport;
use crate::{BridgeConfig, DataUpdate};


#[test]
fn end_to_end_session_over_recording_transport() {
    let transport = Rc::new(RecordingTransport::new());
    let config = BridgeConfig::default().with_frame_name("run-card");
    let bridge = PluginBridge::new(&config, Rc::clone(&transport));
    let router = bridge.router();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let handle = bridge.clone();
    let sink = Rc::clone(&seen);
    bridge
        .on_ready(move |_| {
            let sink = Rc::clone(&sink);
            handle
                .subscribe_to_run_info(move |update: &DataUpdate| {
                    sink.borrow_mut().push(update.data().clone());
                })
                .expect("subscribe from ready callback");
            handle.set_height(Some(180)).expect("height");
        })
        .expect("register");

    let outcome = router.route_json(
        r#"{"type":"ReadyToRender","config":{"config":{"slot":"run-header"}},"resource":{"run_number":3}}"#,
    );
    assert_eq!(
        outcome,
        RouteOutcome::Initialised {
            ready_callback_invoked: true
        }
    );
    router.route_json(r#"{"type":"DataUpdate","path":"run-info","data":{"status":"running"}}"#);

    assert_eq!(*seen.borrow(), vec![json!({"status": "running"})]);
    assert_eq!(bridge.identity().slot(), Some("run-header"));
    let kinds: Vec<&str> = transport
        .messages()
        .iter()
        .map(OutboundMessage::kind)
        .collect();
    assert_eq!(
        kinds,
        [
            "PluginRegisterEvent",
            "PluginSubscribeToData",
            "PluginHeightCheck"
        ]
    );
    assert!(
        transport
            .envelopes()
            .iter()
            .all(|envelope| envelope.name() == "run-card")
    );
}
