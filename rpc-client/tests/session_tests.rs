//! Session tests for the RPC client.
//!
//! These tests run the client against an in-memory peer that speaks the
//! IPC frame protocol, so no voice client needs to be installed.

use std::time::Duration;

use rpc_client::frame::{read_frame, write_frame, Frame, Opcode};
use rpc_client::{ClientOptions, Credentials, EventKind, RpcClient, RpcError, RpcEvent};
use serde_json::{json, Value};
use tokio::io::{DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::mpsc;

/// Peer side of an in-memory session
struct FakeVoiceClient {
    reader: ReadHalf<DuplexStream>,
    writer: WriteHalf<DuplexStream>,
}

impl FakeVoiceClient {
    async fn accept(stream: DuplexStream) -> Self {
        let (mut reader, mut writer) = tokio::io::split(stream);
        let hello = read_frame(&mut reader).await.unwrap().unwrap();
        assert_eq!(hello.opcode, Opcode::Handshake);
        assert_eq!(hello.payload["v"], 1);

        write_frame(
            &mut writer,
            &Frame::new(
                Opcode::Frame,
                json!({
                    "cmd": "DISPATCH",
                    "evt": "READY",
                    "data": {"v": 1, "user": {"id": "me", "username": "tester"}},
                    "nonce": null
                }),
            ),
        )
        .await
        .unwrap();

        Self { reader, writer }
    }

    async fn next_request(&mut self) -> Value {
        let frame = read_frame(&mut self.reader).await.unwrap().unwrap();
        assert_eq!(frame.opcode, Opcode::Frame);
        frame.payload
    }

    async fn reply(&mut self, request: &Value, data: Value) {
        let payload = json!({
            "cmd": request["cmd"],
            "data": data,
            "evt": null,
            "nonce": request["nonce"],
        });
        write_frame(&mut self.writer, &Frame::new(Opcode::Frame, payload))
            .await
            .unwrap();
    }

    async fn reply_error(&mut self, request: &Value, code: i64, message: &str) {
        let payload = json!({
            "cmd": request["cmd"],
            "data": {"code": code, "message": message},
            "evt": "ERROR",
            "nonce": request["nonce"],
        });
        write_frame(&mut self.writer, &Frame::new(Opcode::Frame, payload))
            .await
            .unwrap();
    }

    async fn push(&mut self, evt: &str, data: Value) {
        let payload = json!({"cmd": "DISPATCH", "evt": evt, "data": data, "nonce": null});
        write_frame(&mut self.writer, &Frame::new(Opcode::Frame, payload))
            .await
            .unwrap();
    }
}

async fn session(
    options: ClientOptions,
) -> (RpcClient, mpsc::UnboundedReceiver<RpcEvent>, FakeVoiceClient) {
    let (client_side, server_side) = tokio::io::duplex(64 * 1024);
    let server = tokio::spawn(FakeVoiceClient::accept(server_side));
    let (client, events) = RpcClient::from_stream(client_side, options).await.unwrap();
    let server = server.await.unwrap();
    (client, events, server)
}

#[tokio::test]
async fn test_handshake_reports_ready_user() {
    let (client, _events, _server) = session(ClientOptions::new("42")).await;
    assert_eq!(client.user().map(|u| u.id.as_str()), Some("me"));
    assert!(!client.is_closed());
}

#[tokio::test]
async fn test_handshake_close_is_error() {
    let (client_side, server_side) = tokio::io::duplex(4096);
    tokio::spawn(async move {
        let (mut reader, mut writer) = tokio::io::split(server_side);
        let _ = read_frame(&mut reader).await;
        write_frame(
            &mut writer,
            &Frame::new(Opcode::Close, json!({"code": 4000, "message": "Invalid Client ID"})),
        )
        .await
        .unwrap();
    });

    let err = RpcClient::from_stream(client_side, ClientOptions::new("bad"))
        .await
        .unwrap_err();
    match err {
        RpcError::Handshake(msg) => assert!(msg.contains("Invalid Client ID")),
        other => panic!("Expected handshake error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_voice_settings_roundtrip() {
    let (client, _events, mut server) = session(ClientOptions::new("42")).await;

    let server_task = tokio::spawn(async move {
        let request = server.next_request().await;
        assert_eq!(request["cmd"], "GET_VOICE_SETTINGS");
        server
            .reply(&request, json!({"mute": true, "deaf": false, "input": {}}))
            .await;
        server
    });

    let settings = client.voice_settings().await.unwrap();
    assert!(settings.mute);
    assert!(!settings.deaf);
    server_task.await.unwrap();
}

#[tokio::test]
async fn test_selected_channel_null_means_not_in_channel() {
    let (client, _events, mut server) = session(ClientOptions::new("42")).await;

    let server_task = tokio::spawn(async move {
        let request = server.next_request().await;
        assert_eq!(request["cmd"], "GET_SELECTED_VOICE_CHANNEL");
        server.reply(&request, Value::Null).await;
        server
    });

    assert!(client.selected_voice_channel().await.unwrap().is_none());
    server_task.await.unwrap();
}

#[tokio::test]
async fn test_error_reply_is_classified() {
    let (client, _events, mut server) = session(ClientOptions::new("42")).await;

    let server_task = tokio::spawn(async move {
        let request = server.next_request().await;
        server
            .reply_error(&request, 4006, "Not authenticated or invalid scope")
            .await;
        server
    });

    let err = client.voice_settings().await.unwrap_err();
    assert!(err.is_expected_absence());
    server_task.await.unwrap();
}

#[tokio::test]
async fn test_subscribe_sends_event_and_channel() {
    let (client, _events, mut server) = session(ClientOptions::new("42")).await;

    let server_task = tokio::spawn(async move {
        let request = server.next_request().await;
        assert_eq!(request["cmd"], "SUBSCRIBE");
        assert_eq!(request["evt"], "SPEAKING_START");
        assert_eq!(request["args"]["channel_id"], "c1");
        server.reply(&request, json!({"evt": "SPEAKING_START"})).await;
        server
    });

    client
        .subscribe(EventKind::SpeakingStart, Some("c1"))
        .await
        .unwrap();
    server_task.await.unwrap();
}

#[tokio::test]
async fn test_channel_scoped_subscribe_needs_channel() {
    let (client, _events, _server) = session(ClientOptions::new("42")).await;
    let err = client
        .subscribe(EventKind::SpeakingStop, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::Protocol(_)));
}

#[tokio::test]
async fn test_dispatch_events_are_forwarded() {
    let (_client, mut events, mut server) = session(ClientOptions::new("42")).await;

    server
        .push("SPEAKING_START", json!({"user_id": "me", "channel_id": "c1"}))
        .await;

    let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        event,
        RpcEvent::SpeakingStart {
            user_id: "me".to_string(),
            channel_id: Some("c1".to_string())
        }
    );
}

#[tokio::test]
async fn test_peer_disconnect_closes_session() {
    let (client, mut events, server) = session(ClientOptions::new("42")).await;
    drop(server);

    let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event, RpcEvent::Closed { .. }));

    let err = client.voice_settings().await.unwrap_err();
    assert!(err.is_connection_lost());
}

#[tokio::test]
async fn test_request_timeout() {
    let options = ClientOptions::new("42").with_request_timeout(Duration::from_millis(50));
    let (client, _events, _server) = session(options).await;

    let err = client.voice_settings().await.unwrap_err();
    assert!(matches!(err, RpcError::Timeout(cmd) if cmd == "GET_VOICE_SETTINGS"));
}

#[tokio::test]
async fn test_login_with_access_token() {
    let (mut client, _events, mut server) = session(ClientOptions::new("42")).await;

    let server_task = tokio::spawn(async move {
        let request = server.next_request().await;
        assert_eq!(request["cmd"], "AUTHENTICATE");
        assert_eq!(request["args"]["access_token"], "tok");
        server
            .reply(
                &request,
                json!({"user": {"id": "me", "username": "tester"}, "scopes": ["rpc"]}),
            )
            .await;
        server
    });

    let user = client
        .login(&Credentials::AccessToken("tok".to_string()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.id, "me");
    server_task.await.unwrap();
}

#[tokio::test]
async fn test_ping_is_answered() {
    let (_client, _events, mut server) = session(ClientOptions::new("42")).await;

    write_frame(&mut server.writer, &Frame::new(Opcode::Ping, json!({"t": 1})))
        .await
        .unwrap();
    let pong = read_frame(&mut server.reader).await.unwrap().unwrap();
    assert_eq!(pong.opcode, Opcode::Pong);
    assert_eq!(pong.payload, json!({"t": 1}));
}
