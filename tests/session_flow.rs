//! End-to-end session flows against a local WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing_subscriber::EnvFilter;

use twidder_session::{
    ConnectionState, CredentialStore, MemoryCredentialStore, ServerAction, SessionClient,
    SessionConfig,
};

const WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// Test Server
// ============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Local server under test.
struct TestServer {
    addr: SocketAddr,
    /// Every client frame as `(connection, frame)`.
    frames: mpsc::UnboundedReceiver<(usize, Value)>,
    /// Index of every accepted connection.
    accepts: mpsc::UnboundedReceiver<usize>,
}

/// Accepts connections and answers `LOGIN` with `LOGGED_IN` and one
/// `NEW_MESSAGE`.
///
/// With `drop_first`, the first connection is closed right after login.
async fn spawn_server(drop_first: bool) -> Result<TestServer> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (frames_tx, frames) = mpsc::unbounded_channel();
    let (accepts_tx, accepts) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut index = 0;
        while let Ok((stream, _)) = listener.accept().await {
            let frames_tx = frames_tx.clone();
            let connection = index;
            index += 1;
            let _ = accepts_tx.send(connection);

            tokio::spawn(async move {
                let Ok(mut ws) = accept_async(stream).await else {
                    return;
                };

                while let Some(Ok(message)) = ws.next().await {
                    let Message::Text(text) = message else {
                        continue;
                    };
                    let Ok(frame) = serde_json::from_str::<Value>(text.as_str()) else {
                        continue;
                    };
                    let action = frame["message"]["action"].as_str().unwrap_or_default().to_string();
                    let _ = frames_tx.send((connection, frame));

                    if action == "LOGIN" {
                        let logged_in = json!({"action": "LOGGED_IN"}).to_string();
                        let pushed = json!({"action": "NEW_MESSAGE", "data": {"text": "hi"}}).to_string();
                        if ws.send(Message::Text(logged_in.into())).await.is_err()
                            || ws.send(Message::Text(pushed.into())).await.is_err()
                        {
                            break;
                        }

                        if drop_first && connection == 0 {
                            let _ = ws.close(None).await;
                            break;
                        }
                    }
                }
            });
        }
    });

    Ok(TestServer {
        addr,
        frames,
        accepts,
    })
}

fn config(addr: SocketAddr) -> Result<SessionConfig> {
    Ok(SessionConfig::builder()
        .host(addr.to_string())
        .secure(false)
        .reconnect_delay(Duration::from_millis(50))
        .build()?)
}

async fn wait_for_state(rx: &mut watch::Receiver<ConnectionState>, target: ConnectionState) -> Result<()> {
    timeout(WAIT, rx.wait_for(|state| *state == target))
        .await
        .with_context(|| format!("timed out waiting for {target}"))??;
    Ok(())
}

async fn next_accept(rx: &mut mpsc::UnboundedReceiver<usize>) -> Result<usize> {
    timeout(WAIT, rx.recv())
        .await
        .context("timed out waiting for a connection")?
        .context("server stopped")
}

async fn next_frame(rx: &mut mpsc::UnboundedReceiver<(usize, Value)>) -> Result<(usize, Value)> {
    timeout(WAIT, rx.recv())
        .await
        .context("timed out waiting for a client frame")?
        .context("server stopped")
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_login_and_receive_push() -> Result<()> {
    init_tracing();
    let TestServer {
        addr,
        mut frames,
        mut accepts,
    } = spawn_server(false).await?;

    let client = SessionClient::start(config(addr)?, Arc::new(MemoryCredentialStore::new()))?;
    let (pushed_tx, mut pushed_rx) = mpsc::unbounded_channel();
    client.subscribe(
        ServerAction::NewMessage,
        Box::new(move |payload| {
            let _ = pushed_tx.send(payload.cloned());
        }),
    )?;

    let mut state = client.watch_state();
    assert_eq!(next_accept(&mut accepts).await?, 0);
    wait_for_state(&mut state, ConnectionState::Open).await?;

    client.login_with("tok123").await?;
    let (connection, frame) = next_frame(&mut frames).await?;
    assert_eq!(connection, 0);
    assert_eq!(frame, json!({"id": 0, "message": {"action": "LOGIN", "data": "tok123"}}));

    wait_for_state(&mut state, ConnectionState::Authenticated).await?;
    assert!(client.is_authenticated());

    let payload = timeout(WAIT, pushed_rx.recv()).await?.context("handler dropped")?;
    assert_eq!(payload, Some(json!({"text": "hi"})));

    client.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_cached_token_logs_in_again_after_server_drop() -> Result<()> {
    init_tracing();
    let TestServer {
        addr,
        mut frames,
        mut accepts,
    } = spawn_server(true).await?;

    let store = Arc::new(MemoryCredentialStore::with_token("tok123"));
    let client = SessionClient::start(config(addr)?, store)?;

    let (first, frame) = next_frame(&mut frames).await?;
    assert_eq!(first, 0);
    assert_eq!(frame["message"]["action"], "LOGIN");

    assert_eq!(next_accept(&mut accepts).await?, 0);
    assert_eq!(next_accept(&mut accepts).await?, 1);

    let (second, frame) = next_frame(&mut frames).await?;
    assert_eq!(second, 1);
    assert_eq!(frame["id"], 0);
    assert_eq!(frame["message"]["data"], "tok123");

    let mut state = client.watch_state();
    wait_for_state(&mut state, ConnectionState::Authenticated).await?;

    client.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_logout_reconnects_anonymously() -> Result<()> {
    init_tracing();
    let TestServer {
        addr,
        mut frames,
        mut accepts,
    } = spawn_server(false).await?;

    let store = Arc::new(MemoryCredentialStore::with_token("tok123"));
    let client = SessionClient::start(config(addr)?, store.clone())?;
    let mut state = client.watch_state();
    wait_for_state(&mut state, ConnectionState::Authenticated).await?;

    let (_, login) = next_frame(&mut frames).await?;
    assert_eq!(login["message"]["action"], "LOGIN");

    assert_eq!(next_accept(&mut accepts).await?, 0);

    client.logout()?;
    let (connection, logout) = next_frame(&mut frames).await?;
    assert_eq!(connection, 0);
    assert_eq!(logout["message"]["action"], "LOGOUT");
    assert_eq!(client.token().await?, None);
    assert_eq!(store.load(), None);

    // A fresh connection comes up and stays anonymous
    assert_eq!(next_accept(&mut accepts).await?, 1);
    wait_for_state(&mut state, ConnectionState::Open).await?;
    assert!(!client.is_authenticated());
    assert!(timeout(Duration::from_millis(200), frames.recv()).await.is_err());

    client.shutdown().await;
    Ok(())
}
