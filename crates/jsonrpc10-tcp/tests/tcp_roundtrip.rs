//! Client and server talking over a real socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use jsonrpc10::{Dispatcher, ErrorCode, Params, SerializerConfig};
use jsonrpc10_tcp::{
    ClientConfig, ClientError, DEFAULT_MAX_MESSAGE_SIZE, MessageReader, RpcClient, ServerConfig, TcpServer,
    TestApi, TransportError,
};
use serde_json::{Map, Value, json};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

struct TestServer {
    addr: SocketAddr,
    api: Arc<TestApi>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn start_server(serializer: SerializerConfig) -> TestServer {
    let api = Arc::new(TestApi::new());
    let mut dispatcher = Dispatcher::from_config(serializer.clone());
    dispatcher.register_collection(Arc::clone(&api), Some("test"));

    let config = ServerConfig {
        bind: "127.0.0.1:0".parse().unwrap(),
        read_timeout: Duration::from_secs(5),
        serializer,
        ..Default::default()
    };
    let server = TcpServer::new(config, Arc::new(dispatcher));
    let listener = server.bind().await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(server.serve(listener, async move {
        let _ = rx.await;
    }));

    TestServer {
        addr,
        api,
        shutdown: Some(tx),
    }
}

fn client_config(server: &TestServer) -> ClientConfig {
    ClientConfig::new("127.0.0.1", server.addr.port())
        .with_prefix("test.")
        .with_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn call_over_persistent_connection() {
    let server = start_server(SerializerConfig::default()).await;
    let mut client = RpcClient::new(client_config(&server));
    client.connect().await.unwrap();

    let sum = client
        .call("add", Params::from(vec![json!(7), json!(8)]))
        .await
        .unwrap();
    assert_eq!(sum, json!(15));

    let echoed = client
        .call("echo", Params::from(vec![json!({"nested": ["}", "{"]})]))
        .await
        .unwrap();
    assert_eq!(echoed, json!([{"nested": ["}", "{"]}]));

    assert_eq!(client.call("ping", Params::default()).await.unwrap(), json!("pong"));
    assert!(client.is_connected());
    assert_eq!(server.api.calls(), 3);
}

#[tokio::test]
async fn fault_reply_becomes_client_error() {
    let server = start_server(SerializerConfig::default()).await;
    let mut client = RpcClient::new(client_config(&server));
    client.connect().await.unwrap();

    match client.call("deny", Params::default()).await {
        Err(ClientError::Fault(fault)) => {
            assert_eq!(fault.kind(), Some(ErrorCode::PermissionDenied));
            assert_eq!(fault.data, Some(json!("no")));
        }
        other => panic!("expected fault, got {other:?}"),
    }

    match client.call("missing", Params::default()).await {
        Err(ClientError::Fault(fault)) => assert!(fault.is(ErrorCode::MethodNotFound)),
        other => panic!("expected fault, got {other:?}"),
    }

    // a fault is a normal reply; the connection stays usable
    assert!(client.is_connected());
    assert_eq!(client.call("ping", Params::default()).await.unwrap(), json!("pong"));
}

#[tokio::test]
async fn call_requires_connection_unless_reconnecting() {
    let server = start_server(SerializerConfig::default()).await;

    let mut client = RpcClient::new(client_config(&server));
    assert!(matches!(
        client.call("ping", Params::default()).await,
        Err(ClientError::NotConnected)
    ));

    let mut client = RpcClient::new(client_config(&server).with_reconnect(true));
    assert_eq!(client.call("ping", Params::default()).await.unwrap(), json!("pong"));
    assert!(!client.is_connected());
    assert_eq!(client.call("ping", Params::default()).await.unwrap(), json!("pong"));
}

#[tokio::test]
async fn notification_gets_no_reply() {
    let server = start_server(SerializerConfig::default()).await;
    let mut client = RpcClient::new(client_config(&server));
    client.connect().await.unwrap();

    client.notify("ping", Params::default()).await.unwrap();
    // the next reply on the stream must belong to the call, not the notification
    let result = client.call("echo", Params::from(vec![json!("after")])).await.unwrap();
    assert_eq!(result, json!(["after"]));
    assert_eq!(server.api.calls(), 2);
}

#[tokio::test]
async fn named_params_when_enabled() {
    let serializer = SerializerConfig {
        accept_named_params: true,
        ..Default::default()
    };
    let server = start_server(serializer.clone()).await;

    let mut config = client_config(&server);
    config.serializer = serializer;
    let mut client = RpcClient::new(config);
    client.connect().await.unwrap();

    let mut named = Map::new();
    named.insert("x".to_string(), json!(1));
    let echoed = client.call("echo", Params::from(named.clone())).await.unwrap();
    assert_eq!(echoed, Value::Object(named.clone()));

    match client.call("add", Params::from(named)).await {
        Err(ClientError::Fault(fault)) => assert!(fault.is(ErrorCode::InvalidMethodParams)),
        other => panic!("expected fault, got {other:?}"),
    }
}

#[tokio::test]
async fn raw_socket_sees_exact_wire_bytes() {
    let server = start_server(SerializerConfig::default()).await;
    let stream = TcpStream::connect(server.addr).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    let mut replies = MessageReader::new(reader, DEFAULT_MAX_MESSAGE_SIZE);

    writer
        .write_all(br#"{"method": "test.add", "params": [7, 8], "id": 1}"#)
        .await
        .unwrap();
    let reply = replies.next_message().await.unwrap().unwrap();
    assert_eq!(reply, br#"{"result": 15, "error": null, "id": 1}"#);

    writer.write_all(b"{\"method\": oops}").await.unwrap();
    let reply = replies.next_message().await.unwrap().unwrap();
    let value: Value = serde_json::from_slice(&reply).unwrap();
    assert_eq!(value["error"]["code"], json!(-32700));
    assert_eq!(value["id"], Value::Null);

    drop(writer);
    assert!(replies.next_message().await.unwrap().is_none());
}

#[tokio::test]
async fn truncated_request_before_half_close_gets_parse_error() {
    let server = start_server(SerializerConfig::default()).await;
    let stream = TcpStream::connect(server.addr).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    let mut replies = MessageReader::new(reader, DEFAULT_MAX_MESSAGE_SIZE);

    writer
        .write_all(br#"{"method": "test.ping", "params": ["#)
        .await
        .unwrap();
    writer.shutdown().await.unwrap();

    let reply = replies.next_message().await.unwrap().unwrap();
    let value: Value = serde_json::from_slice(&reply).unwrap();
    assert_eq!(value["error"]["code"], json!(-32700));
    assert_eq!(value["id"], Value::Null);
    assert!(replies.next_message().await.unwrap().is_none());
    assert_eq!(server.api.calls(), 0);
}

#[tokio::test]
async fn client_times_out_on_silent_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        // accept and never answer
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let config = ClientConfig::new("127.0.0.1", addr.port()).with_timeout(Duration::from_millis(100));
    let mut client = RpcClient::new(config);
    client.connect().await.unwrap();

    let result = client.call("ping", Params::default()).await;
    assert!(matches!(
        result,
        Err(ClientError::Transport(TransportError::Timeout))
    ));
    assert!(!client.is_connected());
}
