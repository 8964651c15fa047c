// tests/integration/tcp_test.rs

//! End-to-end tests over real sockets with the echo processor.

use super::test_helpers::{frame, init_tracing};
use spinelrpc::AsyncServer;
use spinelrpc::core::processor::EchoProcessor;
use spinelrpc::core::protocol::FramedProtocolFactory;
use spinelrpc::server::TcpAcceptQueue;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const TIMEOUT: Duration = Duration::from_secs(5);

struct RunningServer {
    addr: SocketAddr,
    registry: spinelrpc::ContextRegistry,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

async fn start_server() -> RunningServer {
    init_tracing();
    let listener = TcpAcceptQueue::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr();
    let mut server = AsyncServer::new(
        listener,
        Arc::new(EchoProcessor),
        Arc::new(FramedProtocolFactory::new(1024)),
    );
    let registry = server.registry().clone();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let task = tokio::spawn(async move { server.run(shutdown_rx).await });
    RunningServer {
        addr,
        registry,
        shutdown_tx,
        task,
    }
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

async fn read_frame(client: &mut TcpStream) -> Vec<u8> {
    let len = tokio::time::timeout(TIMEOUT, client.read_u32())
        .await
        .expect("timed out")
        .unwrap();
    let mut payload = vec![0u8; len as usize];
    tokio::time::timeout(TIMEOUT, client.read_exact(&mut payload))
        .await
        .expect("timed out")
        .unwrap();
    payload
}

#[tokio::test]
async fn test_echo_over_tcp() {
    let server = start_server().await;
    let mut client = TcpStream::connect(server.addr).await.unwrap();

    client.write_all(&frame(b"ping")).await.unwrap();
    assert_eq!(read_frame(&mut client).await, b"ping");

    client.write_all(&frame(b"one")).await.unwrap();
    client.write_all(&frame(b"two")).await.unwrap();
    assert_eq!(read_frame(&mut client).await, b"one");
    assert_eq!(read_frame(&mut client).await, b"two");

    let registry = server.registry.clone();
    wait_for(|| registry.len() == 1).await;

    server.shutdown_tx.send(()).unwrap();
    server.task.await.unwrap();
}

#[tokio::test]
async fn test_client_close_evicts_context() {
    let server = start_server().await;
    let client = TcpStream::connect(server.addr).await.unwrap();

    let registry = server.registry.clone();
    wait_for(|| registry.len() == 1).await;

    drop(client);
    wait_for(|| registry.is_empty()).await;

    server.shutdown_tx.send(()).unwrap();
    server.task.await.unwrap();
}

#[tokio::test]
async fn test_many_clients_are_tracked_independently() {
    let server = start_server().await;
    let mut clients = Vec::new();
    for _ in 0..5 {
        clients.push(TcpStream::connect(server.addr).await.unwrap());
    }

    let registry = server.registry.clone();
    wait_for(|| registry.len() == 5).await;

    clients.truncate(2);
    wait_for(|| registry.len() == 2).await;

    for (i, client) in clients.iter_mut().enumerate() {
        let payload = format!("client-{i}");
        client.write_all(&frame(payload.as_bytes())).await.unwrap();
        assert_eq!(read_frame(client).await, payload.as_bytes());
    }

    server.shutdown_tx.send(()).unwrap();
    server.task.await.unwrap();
    assert!(server.registry.is_empty(), "shutdown evicts remaining connections");
}

#[tokio::test]
async fn test_oversized_frame_evicts_connection() {
    let server = start_server().await;
    let mut client = TcpStream::connect(server.addr).await.unwrap();

    let registry = server.registry.clone();
    wait_for(|| registry.len() == 1).await;

    // The server was built with a 1 KiB frame limit.
    client.write_u32(64 * 1024).await.unwrap();
    wait_for(|| registry.is_empty()).await;

    // The server closed its side: the client sees EOF.
    let mut buf = [0u8; 16];
    let n = tokio::time::timeout(TIMEOUT, client.read(&mut buf))
        .await
        .expect("timed out")
        .unwrap_or(0);
    assert_eq!(n, 0);

    server.shutdown_tx.send(()).unwrap();
    server.task.await.unwrap();
}
