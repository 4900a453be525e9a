// tests/integration/connection_test.rs

//! Integration tests for the connection lifecycle
//! Tests: open, close, send_event, metadata, equality

use super::test_helpers::{FakeTransport, fake_connection, wait_until};
use connector::connection::{Connection, SocketConnection};
use connector::core::ConnectorError;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(2);

// ===== Close =====

#[tokio::test]
async fn test_close_twice_closes_transport_once() {
    let (conn, remote) = fake_connection();
    conn.open();

    conn.close().await;
    conn.close().await;

    assert!(conn.closed());
    assert_eq!(remote.close_count(), 1);
    assert!(conn.close_signal().is_cancelled());
}

#[tokio::test]
async fn test_close_ends_message_channel() {
    let (conn, remote) = fake_connection();
    conn.open();
    conn.close().await;

    // Frames pushed after close are never delivered.
    remote.push(r#"{"type":1,"data":null}"#);
    let next = tokio::time::timeout(WAIT, conn.next_message()).await.unwrap();
    assert!(next.is_none());
}

#[tokio::test]
async fn test_close_stops_read_loop() {
    let (conn, _remote) = fake_connection();
    conn.open();
    assert!(wait_until(WAIT, || conn.opened()).await);

    conn.close().await;
    assert!(wait_until(WAIT, || !conn.opened()).await);
    assert!(conn.closed());
}

#[tokio::test]
async fn test_close_signal_fires_before_transport_close() {
    let (conn, remote) = fake_connection();
    conn.open();
    remote.stall_close();

    let closing = conn.clone();
    let close_task = tokio::spawn(async move { closing.close().await });

    assert!(wait_until(WAIT, || conn.close_signal().is_cancelled()).await);
    assert!(wait_until(WAIT, || !conn.opened()).await);
    let next = tokio::time::timeout(WAIT, conn.next_message()).await.unwrap();
    assert!(next.is_none());
    assert_eq!(remote.close_count(), 1);
    assert!(!close_task.is_finished());

    close_task.abort();
}

// ===== Open =====

#[tokio::test]
async fn test_open_delivers_frames_in_order() {
    let (conn, remote) = fake_connection();
    conn.open();

    for frame in ["m1", "m2", "m3"] {
        remote.push(frame);
    }

    for expected in ["m1", "m2", "m3"] {
        let message = tokio::time::timeout(WAIT, conn.next_message())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&message[..], expected.as_bytes());
    }
}

#[tokio::test]
async fn test_open_twice_runs_single_read_loop() {
    let (conn, remote) = fake_connection();
    conn.open();
    conn.open();

    remote.push("only");
    let message = tokio::time::timeout(WAIT, conn.next_message())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&message[..], b"only");
    assert!(conn.opened());
}

#[tokio::test]
async fn test_open_after_close_is_noop() {
    let (conn, _remote) = fake_connection();
    conn.close().await;
    conn.open();

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!conn.opened());
}

#[tokio::test]
async fn test_receive_error_closes_connection() {
    let (conn, remote) = fake_connection();
    conn.open();
    remote.fail();

    assert!(wait_until(WAIT, || conn.closed()).await);
    assert!(wait_until(WAIT, || !conn.opened()).await);
    assert_eq!(remote.close_count(), 1);
    assert!(conn.close_signal().is_cancelled());
}

#[tokio::test]
async fn test_remote_hangup_closes_connection() {
    let (conn, remote) = fake_connection();
    conn.open();
    drop(remote);

    assert!(wait_until(WAIT, || conn.closed()).await);
}

// ===== SendEvent =====

#[tokio::test]
async fn test_send_event_writes_envelope() {
    let (conn, remote) = fake_connection();

    conn.send_event(5, &json!({"a": 1})).await.unwrap();
    conn.send_event(6, "text").await.unwrap();

    assert_eq!(
        remote.written(),
        vec![
            r#"{"type":5,"data":{"a":1}}"#.to_string(),
            r#"{"type":6,"data":"text"}"#.to_string(),
        ]
    );
}

#[tokio::test]
async fn test_send_event_after_close_is_noop() {
    let (conn, remote) = fake_connection();
    conn.close().await;

    let result = conn.send_event(1, &json!({"ignored": true})).await;

    assert!(result.is_ok());
    assert!(remote.written().is_empty());
}

#[tokio::test]
async fn test_send_event_serialization_failure() {
    let (conn, remote) = fake_connection();
    let mut data = HashMap::new();
    data.insert((1u8, 2u8), 3u8);

    let result = conn.send_event(1, &data).await;

    assert!(matches!(result, Err(ConnectorError::Serialization(_))));
    assert!(remote.written().is_empty());
}

#[tokio::test]
async fn test_send_event_write_failure() {
    let (conn, remote) = fake_connection();
    remote.fail_writes();

    let result = conn.send_event(1, &json!(null)).await;

    assert_eq!(
        result,
        Err(ConnectorError::Transport("broken pipe".to_string()))
    );
    assert!(!conn.closed());
}

// ===== Metadata & identity =====

#[tokio::test]
async fn test_metadata_operations() {
    let (conn, _remote) = fake_connection();
    assert!(conn.metadata().is_empty());

    conn.with_metadata("user", json!("alice"));
    conn.with_metadata("room", json!(7));
    assert_eq!(conn.get_metadata("user"), Some(json!("alice")));
    assert_eq!(conn.metadata().len(), 2);

    conn.delete_metadata("user");
    assert_eq!(conn.get_metadata("user"), None);
    assert_eq!(conn.metadata().len(), 1);

    // Deleting a missing key is harmless.
    conn.delete_metadata("missing");
    assert_eq!(conn.metadata().len(), 1);
}

#[tokio::test]
async fn test_new_with_metadata_seeds_store() {
    let (transport, _remote) = FakeTransport::pair();
    let seed = HashMap::from([("role".to_string(), json!("admin"))]);
    let conn = SocketConnection::new_with_metadata(transport, seed);

    assert_eq!(conn.get_metadata("role"), Some(json!("admin")));
}

#[tokio::test]
async fn test_metadata_is_shared_between_clones() {
    let (conn, _remote) = fake_connection();
    let other = conn.clone();

    other.with_metadata("seen", json!(true));
    assert_eq!(conn.get_metadata("seen"), Some(json!(true)));
}

#[tokio::test]
async fn test_equals_by_identifier() {
    let (a, _ra) = fake_connection();
    let (b, _rb) = fake_connection();
    let a_clone = a.clone();

    assert!(a.equals(Some(&a_clone)));
    assert!(!a.equals(Some(&b)));
    assert!(!a.equals::<super::test_helpers::FakeConnection>(None));
    assert_ne!(a.id(), b.id());
    assert_eq!(a, a_clone);
}
