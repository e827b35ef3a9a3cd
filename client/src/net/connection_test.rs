use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use serde_json::json;

use super::*;
use crate::net::testing::Harness;

use crate::net::types::ConnectionState::{Connected, Connecting, Disconnected, Error};

fn setup() -> (Harness, ConnectionManager, EventDispatcher) {
    let harness = Harness::new();
    let dispatcher = EventDispatcher::new("General");
    let connection = ConnectionManager::new(
        harness.config.clone(),
        harness.transport(),
        harness.runtime(),
        dispatcher.clone(),
    );
    (harness, connection, dispatcher)
}

fn record(connection: &ConnectionManager) -> Rc<RefCell<Vec<ConnectionState>>> {
    let states = Rc::new(RefCell::new(Vec::new()));
    let states_ref = Rc::clone(&states);
    let _sub = connection.on_state_change(move |state| {
        states_ref.borrow_mut().push(state);
        Ok(())
    });
    states
}

/// Every observed step must be one of the lifecycle edges.
fn assert_valid_transitions(states: &[ConnectionState]) {
    let mut previous = Disconnected;
    for &next in states {
        let allowed = matches!(
            (previous, next),
            (Disconnected | Error, Connecting)
                | (Connecting, Connected | Error)
                | (Connected, Connecting | Error)
                | (_, Disconnected)
        );
        assert!(allowed, "invalid transition {previous} -> {next} in {states:?}");
        previous = next;
    }
}

// =============================================================
// connect
// =============================================================

#[test]
fn connect_opens_session_endpoint_and_reaches_connected() {
    let (mut harness, connection, _) = setup();
    let states = record(&connection);

    connection.connect("s1");
    assert_eq!(connection.state(), Connecting);
    harness.run();

    assert_eq!(connection.state(), Connected);
    assert_eq!(connection.session_id().as_deref(), Some("s1"));
    assert_eq!(connection.epoch(), 1);
    assert_eq!(harness.transport.opens(), vec!["ws://localhost:8080/api/v1/ws/s1".to_owned()]);
    assert_eq!(*states.borrow(), vec![Connecting, Connected]);
}

#[test]
fn connect_same_session_twice_opens_once() {
    let (mut harness, connection, _) = setup();
    connection.connect("s1");
    connection.connect("s1");
    harness.run();
    connection.connect("s1");
    harness.run();

    assert_eq!(harness.transport.opens().len(), 1);
    assert_eq!(connection.state(), Connected);
    assert_eq!(connection.epoch(), 1);
}

#[test]
fn connect_with_blank_session_is_ignored() {
    let (mut harness, connection, _) = setup();
    connection.connect("  ");
    harness.run();
    assert_eq!(connection.state(), Disconnected);
    assert!(harness.transport.opens().is_empty());
}

#[test]
fn switching_sessions_tears_down_first() {
    let (mut harness, connection, _) = setup();
    connection.connect("s1");
    harness.run();
    let states = record(&connection);

    connection.connect("s2");
    harness.run();

    assert_eq!(*states.borrow(), vec![Disconnected, Connecting, Connected]);
    assert_eq!(harness.transport.opens().len(), 2);
    assert!(harness.transport.opens()[1].ends_with("/s2"));
    assert_eq!(connection.session_id().as_deref(), Some("s2"));
}

#[test]
fn first_open_failure_settles_in_error() {
    let (mut harness, connection, _) = setup();
    let states = record(&connection);
    harness.transport.fail_opens(1);

    connection.connect("s1");
    harness.run();

    assert_eq!(connection.state(), Error);
    assert_eq!(*states.borrow(), vec![Connecting, Error]);
    assert!(matches!(
        connection.last_error(),
        Some(ConnectionError::Transport(TransportError::Open(_)))
    ));
    assert!(harness.runtime.sleeps().is_empty());
}

#[test]
fn reconnect_from_error_resumes_last_session() {
    let (mut harness, connection, _) = setup();
    harness.transport.fail_opens(1);
    connection.connect("s1");
    harness.run();
    let states = record(&connection);

    connection.reconnect();
    harness.run();

    assert_eq!(connection.state(), Connected);
    assert!(connection.last_error().is_none());
    assert_eq!(*states.borrow(), vec![Connecting, Connected]);
    assert_eq!(harness.transport.opens().len(), 2);
}

#[test]
fn reconnect_without_session_is_ignored() {
    let (mut harness, connection, _) = setup();
    connection.reconnect();
    harness.run();
    assert_eq!(connection.state(), Disconnected);
    assert!(harness.transport.opens().is_empty());
}

// =============================================================
// Automatic reconnection
// =============================================================

#[test]
fn unexpected_close_retries_with_backoff() {
    let (mut harness, connection, _) = setup();
    let states = record(&connection);
    connection.connect("s1");
    harness.run();

    harness.transport.fail_opens(2);
    harness.transport.drop_link();
    harness.run();

    assert_eq!(connection.state(), Connected);
    assert_eq!(connection.epoch(), 2);
    assert_eq!(
        harness.runtime.sleeps(),
        vec![Duration::from_millis(1000), Duration::from_millis(2000), Duration::from_millis(4000)]
    );
    assert_eq!(*states.borrow(), vec![Connecting, Connected, Connecting, Connected]);
    assert_valid_transitions(&states.borrow());
}

#[test]
fn exhausted_retries_settle_in_error() {
    let (mut harness, connection, _) = setup();
    let states = record(&connection);
    connection.connect("s1");
    harness.run();

    harness.transport.fail_opens(10);
    harness.transport.drop_link();
    harness.run();

    assert_eq!(connection.state(), Error);
    assert_eq!(harness.transport.opens().len(), 6);
    assert_eq!(
        harness.runtime.sleeps(),
        [1000, 2000, 4000, 8000, 10_000].map(Duration::from_millis).to_vec()
    );
    assert!(matches!(
        connection.last_error(),
        Some(ConnectionError::RetriesExhausted { attempts: 5, last: Some(TransportError::Open(_)) })
    ));
    assert_eq!(*states.borrow(), vec![Connecting, Connected, Connecting, Error]);
    assert_valid_transitions(&states.borrow());
}

#[test]
fn successful_reconnect_resets_retry_budget() {
    let (mut harness, connection, _) = setup();
    connection.connect("s1");
    harness.run();

    for _ in 0..3 {
        harness.transport.fail_opens(4);
        harness.transport.drop_link();
        harness.run();
        assert_eq!(connection.state(), Connected);
    }
    assert_eq!(connection.epoch(), 4);
}

#[test]
fn repeated_drops_only_visit_lifecycle_edges() {
    let (mut harness, connection, _) = setup();
    let states = record(&connection);
    connection.connect("s1");
    harness.run();
    for failures in [0, 1, 3, 0] {
        harness.transport.fail_opens(failures);
        harness.transport.drop_link();
        harness.run();
    }
    connection.disconnect();
    connection.connect("s1");
    harness.run();

    let states = states.borrow();
    assert_valid_transitions(&states);
    for (index, state) in states.iter().enumerate() {
        if *state == Connected {
            assert_eq!(states[index - 1], Connecting);
        }
    }
}

// =============================================================
// disconnect
// =============================================================

#[test]
fn disconnect_closes_link_and_is_idempotent() {
    let (mut harness, connection, _) = setup();
    connection.connect("s1");
    harness.run();
    assert!(harness.transport.link_open());
    let states = record(&connection);

    connection.disconnect();
    connection.disconnect();
    harness.run();

    assert_eq!(connection.state(), Disconnected);
    assert_eq!(*states.borrow(), vec![Disconnected]);
    assert!(!harness.transport.link_open());
    assert_eq!(harness.transport.opens().len(), 1);
}

#[test]
fn disconnect_while_connecting_never_connects() {
    let (mut harness, connection, _) = setup();
    let states = record(&connection);
    connection.connect("s1");
    connection.disconnect();
    harness.run();

    assert_eq!(connection.state(), Disconnected);
    assert_eq!(*states.borrow(), vec![Connecting, Disconnected]);
}

// =============================================================
// send
// =============================================================

#[test]
fn send_never_reaches_transport_unless_connected() {
    let (mut harness, connection, _) = setup();
    assert!(!connection.send("CHAT_MESSAGE", json!({ "text": "early" })));

    connection.connect("s1");
    assert!(!connection.send("CHAT_MESSAGE", json!({ "text": "connecting" })));
    harness.run();

    harness.transport.fail_opens(10);
    harness.transport.drop_link();
    harness.run();
    assert_eq!(connection.state(), Error);
    assert!(!connection.send("CHAT_MESSAGE", json!({ "text": "broken" })));

    connection.disconnect();
    assert!(!connection.send("CHAT_MESSAGE", json!({ "text": "late" })));
    harness.run();

    assert!(harness.transport.written().is_empty());
}

#[test]
fn send_while_connected_writes_stamped_frame() {
    let (mut harness, connection, _) = setup();
    connection.connect("s1");
    harness.run();

    assert!(connection.send("CHAT_MESSAGE", json!({ "text": "hi" })));
    harness.run();

    let written = harness.transport.written_json();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0]["type"], "CHAT_MESSAGE");
    assert_eq!(written[0]["payload"]["text"], "hi");
    assert!(written[0]["timestamp"].is_string());
}

#[test]
fn send_uses_configured_payload_field() {
    let mut harness = Harness::new();
    harness.config.payload_field = frames::PayloadField::Data;
    let connection = ConnectionManager::new(
        harness.config.clone(),
        harness.transport(),
        harness.runtime(),
        EventDispatcher::new("General"),
    );
    connection.connect("s1");
    harness.run();

    assert!(connection.send("USER_IDENTIFY", json!({ "userId": "u1" })));
    harness.run();

    let written = harness.transport.written_json();
    assert_eq!(written[0]["data"]["userId"], "u1");
    assert!(written[0].get("payload").is_none());
}

#[test]
fn send_with_empty_type_is_rejected() {
    let (mut harness, connection, _) = setup();
    connection.connect("s1");
    harness.run();
    assert!(!connection.send("", json!({})));
    harness.run();
    assert!(harness.transport.written().is_empty());
}

// =============================================================
// Inbound routing and listeners
// =============================================================

#[test]
fn inbound_frames_reach_dispatcher_in_order() {
    let (mut harness, connection, dispatcher) = setup();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_ref = Rc::clone(&seen);
    let _sub = dispatcher.on("USER_JOINED", move |frame| {
        seen_ref.borrow_mut().push(frame.payload["userId"].as_str().unwrap_or_default().to_owned());
        Ok(())
    });

    connection.connect("s1");
    harness.run();
    for user in ["u1", "u2", "u3"] {
        harness
            .transport
            .inject_json(&json!({ "type": "USER_JOINED", "payload": { "userId": user, "userName": user } }));
    }
    harness.run();

    assert_eq!(*seen.borrow(), vec!["u1", "u2", "u3"]);
}

#[test]
fn failing_state_listener_does_not_block_siblings() {
    let (mut harness, connection, _) = setup();
    let _failing = connection.on_state_change(|_| Err("listener failed".into()));
    let states = record(&connection);

    connection.connect("s1");
    harness.run();
    assert_eq!(*states.borrow(), vec![Connecting, Connected]);
}

#[test]
fn unsubscribed_state_listener_stops_receiving() {
    let (mut harness, connection, _) = setup();
    let count = Rc::new(RefCell::new(0));
    let count_ref = Rc::clone(&count);
    let sub = connection.on_state_change(move |_| {
        *count_ref.borrow_mut() += 1;
        Ok(())
    });

    connection.connect("s1");
    harness.run();
    sub.unsubscribe();
    connection.disconnect();

    assert_eq!(*count.borrow(), 2);
}

#[test]
fn handler_may_disconnect_from_inside_delivery() {
    let (mut harness, connection, dispatcher) = setup();
    let handle = connection.clone();
    let _sub = dispatcher.on("ERROR", move |_| {
        handle.disconnect();
        Ok(())
    });

    connection.connect("s1");
    harness.run();
    harness.transport.inject_json(&json!({ "type": "ERROR", "payload": { "message": "kicked" } }));
    harness.run();

    assert_eq!(connection.state(), Disconnected);
    assert!(!harness.transport.link_open());
    assert_eq!(harness.transport.opens().len(), 1);
}

#[test]
fn state_listener_may_disconnect_from_inside_delivery() {
    let (mut harness, connection, _) = setup();
    let handle = connection.clone();
    let _sub = connection.on_state_change(move |state| {
        if state == Connected {
            handle.disconnect();
        }
        Ok(())
    });
    let states = record(&connection);

    connection.connect("s1");
    harness.run();

    assert_eq!(connection.state(), Disconnected);
    assert_eq!(*states.borrow(), vec![Connecting, Connected, Disconnected]);
    assert_eq!(states.borrow().last().copied(), Some(connection.state()));
    assert_valid_transitions(&states.borrow());
    assert!(!harness.transport.link_open());
}
