use super::*;
use crate::frame::TransportError;
use breeze_core::CommandResult;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex as PlMutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use url::Url;

#[tokio::test]
async fn connects_dispatches_an_inbound_command_and_sends_back_a_result() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let command_frame = json!({
            "type": "run_script",
            "id": "cmd-1",
            "payload": {"script": "echo hi"},
        });
        ws.send(Message::Text(command_frame.to_string())).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("server should receive a reply before the test timeout")
            .expect("stream should yield a message")
            .expect("message should not be a protocol error")
    });

    let url = Url::parse(&format!("ws://{addr}/")).unwrap();
    let config = SessionConfig::new(url);

    let received = Arc::new(PlMutex::new(Vec::new()));
    let received_in_callback = received.clone();
    let on_command: OnCommand = Arc::new(move |cmd| {
        received_in_callback.lock().push(cmd);
    });

    let session = Session::start(config, on_command);

    tokio::time::sleep(Duration::from_millis(200)).await;
    {
        let commands = received.lock();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].id, "cmd-1");
        assert_eq!(commands[0].kind, "run_script");
    }

    let now = Utc::now();
    session
        .send_result(&CommandResult::completed("cmd-1", json!({"ok": true}), now, now))
        .expect("text queue should have room");

    let reply = server.await.expect("server task should not panic");
    match reply {
        Message::Text(text) => {
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(value["type"], "command_result");
            assert_eq!(value["commandId"], "cmd-1");
            assert_eq!(value["status"], "completed");
        }
        other => panic!("expected a text frame, got {other:?}"),
    }

    session.stop_and_wait().await;
}

#[tokio::test]
async fn control_frames_without_an_id_are_not_dispatched() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let control_frame = json!({"type": "connected"});
        ws.send(Message::Text(control_frame.to_string())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
    });

    let url = Url::parse(&format!("ws://{addr}/")).unwrap();
    let received = Arc::new(PlMutex::new(Vec::new()));
    let received_in_callback = received.clone();
    let on_command: OnCommand = Arc::new(move |cmd| {
        received_in_callback.lock().push(cmd);
    });

    let session = Session::start(SessionConfig::new(url), on_command);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(received.lock().is_empty());

    session.stop_and_wait().await;
    let _ = server.await;
}

#[tokio::test]
async fn full_text_queue_rejects_further_sends() {
    // Port 1 refuses connections immediately, so the reconnect loop never
    // leaves its backoff branch and the queue is never drained.
    let url = Url::parse("ws://127.0.0.1:1/").unwrap();
    let mut config = SessionConfig::new(url);
    config.text_queue_depth = 2;
    let session = Session::start(config, Arc::new(|_cmd| {}));

    let now = Utc::now();
    let result = CommandResult::completed("a", json!({}), now, now);
    assert!(session.send_result(&result).is_ok());
    assert!(session.send_result(&result).is_ok());
    assert_eq!(session.send_result(&result), Err(TransportError::QueueFull));

    session.stop();
}

#[tokio::test]
async fn short_session_id_is_rejected_before_touching_the_queue() {
    let url = Url::parse("ws://127.0.0.1:1/").unwrap();
    let session = Session::start(SessionConfig::new(url), Arc::new(|_cmd| {}));
    let result = session.send_binary("too-short", b"payload");
    assert_eq!(result, Err(TransportError::InvalidSessionId(9)));
    session.stop();
}
