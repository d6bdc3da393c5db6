//! Real-time messaging socket client with automatic reconnection.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace, warn};

use crate::config::RetryConfig;
use crate::error::{TransportError, TransportResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Receives frames from the socket.
#[async_trait]
pub trait SocketHandler: Send + Sync {
    /// Called for every text frame, in arrival order.
    async fn on_text(&self, text: String);

    /// Called once when the client stops for good.
    async fn on_disconnect(&self) {}
}

/// Supplies the URL to connect to. Slack hands out a fresh one per session.
#[async_trait]
pub trait SocketUrl: Send + Sync {
    async fn socket_url(&self) -> TransportResult<String>;
}

/// A fixed URL, for tests and self-hosted relays.
#[derive(Debug, Clone)]
pub struct StaticUrl(pub String);

#[async_trait]
impl SocketUrl for StaticUrl {
    async fn socket_url(&self) -> TransportResult<String> {
        Ok(self.0.clone())
    }
}

/// Why the receive loop stopped.
enum Ended {
    Cancelled,
    Dropped,
}

/// Socket client that forwards every text frame to a [`SocketHandler`].
pub struct SocketClient {
    source: Arc<dyn SocketUrl>,
    retry: RetryConfig,
}

impl SocketClient {
    pub fn new(source: Arc<dyn SocketUrl>, retry: RetryConfig) -> Self {
        Self { source, retry }
    }

    /// Runs until `cancel` fires, the server drops us with reconnection
    /// disabled, or the retry budget is spent.
    ///
    /// A failed first connection goes through the same backoff as a dropped
    /// one; it is only returned as-is when reconnection is disabled.
    pub async fn run(
        &self,
        handler: Arc<dyn SocketHandler>,
        cancel: CancellationToken,
    ) -> TransportResult<()> {
        let mut retry_count = 0u32;
        let mut current_delay = self.retry.initial_delay();

        let (mut ws_tx, mut ws_rx) = match self.connect().await {
            Ok(pair) => pair,
            Err(e) if !self.retry.auto_reconnect => {
                handler.on_disconnect().await;
                return Err(e);
            }
            Err(e) => {
                warn!(error = %e, "Initial connection failed");
                match self
                    .reconnect(&cancel, &mut retry_count, &mut current_delay)
                    .await
                {
                    Ok(Some(pair)) => pair,
                    other => {
                        handler.on_disconnect().await;
                        return other.map(|_| ());
                    }
                }
            }
        };

        loop {
            match receive_loop(&mut ws_tx, &mut ws_rx, handler.as_ref(), &cancel).await {
                Ended::Cancelled => {
                    info!("Socket client shutting down");
                    let _ = ws_tx.close().await;
                    handler.on_disconnect().await;
                    return Ok(());
                }
                Ended::Dropped if !self.retry.auto_reconnect => {
                    handler.on_disconnect().await;
                    return Ok(());
                }
                Ended::Dropped => {}
            }

            match self
                .reconnect(&cancel, &mut retry_count, &mut current_delay)
                .await
            {
                Ok(Some((new_tx, new_rx))) => {
                    ws_tx = new_tx;
                    ws_rx = new_rx;
                }
                other => {
                    handler.on_disconnect().await;
                    return other.map(|_| ());
                }
            }
        }
    }

    /// Retries until a connection is made. `Ok(None)` means cancelled.
    async fn reconnect(
        &self,
        cancel: &CancellationToken,
        retry_count: &mut u32,
        current_delay: &mut Duration,
    ) -> TransportResult<Option<(WsSink, WsSource)>> {
        loop {
            match self.try_reconnect(cancel, retry_count, current_delay).await {
                Some(Ok(pair)) => return Ok(Some(pair)),
                Some(Err(())) => continue,
                None if cancel.is_cancelled() => return Ok(None),
                None => {
                    return Err(TransportError::RetriesExhausted {
                        attempts: *retry_count,
                    });
                }
            }
        }
    }

    async fn connect(&self) -> TransportResult<(WsSink, WsSource)> {
        let url = self.source.socket_url().await?;
        info!("Connecting to socket");
        let (ws_stream, _response) =
            connect_async(url.as_str())
                .await
                .map_err(|e| TransportError::ConnectionFailed {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;
        info!("Socket connected");
        Ok(ws_stream.split())
    }

    /// Attempts one reconnection after the current backoff delay.
    /// Returns `None` when giving up.
    async fn try_reconnect(
        &self,
        cancel: &CancellationToken,
        retry_count: &mut u32,
        current_delay: &mut Duration,
    ) -> Option<Result<(WsSink, WsSource), ()>> {
        if let Some(max) = self.retry.max_retries {
            if *retry_count >= max {
                error!(attempts = *retry_count, "Max retries reached, giving up");
                return None;
            }
        }

        warn!(delay = ?current_delay, "Reconnecting...");
        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(*current_delay) => {}
        }

        match self.connect().await {
            Ok(pair) => {
                info!("Reconnected successfully");
                *retry_count = 0;
                *current_delay = self.retry.initial_delay();
                Some(Ok(pair))
            }
            Err(e) => {
                warn!(error = %e, "Reconnection failed");
                *retry_count += 1;
                *current_delay = self.retry.next_delay(*current_delay);
                Some(Err(()))
            }
        }
    }
}

async fn receive_loop(
    ws_tx: &mut WsSink,
    ws_rx: &mut WsSource,
    handler: &dyn SocketHandler,
    cancel: &CancellationToken,
) -> Ended {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ended::Cancelled,

            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    trace!(len = text.len(), "Received text");
                    handler.on_text(text.as_str().to_owned()).await;
                }
                Some(Ok(Message::Ping(data))) => {
                    trace!("Received ping, sending pong");
                    let _ = ws_tx.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Binary(_))) | Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | Some(Ok(Message::Frame(_))) => {
                    info!("Server closed connection");
                    return Ended::Dropped;
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Socket error");
                    return Ended::Dropped;
                }
                None => {
                    info!("Socket stream ended");
                    return Ended::Dropped;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    #[derive(Default)]
    struct Collector {
        frames: Mutex<Vec<String>>,
        disconnects: Mutex<u32>,
        stop_on: Option<(String, CancellationToken)>,
    }

    #[async_trait]
    impl SocketHandler for Collector {
        async fn on_text(&self, text: String) {
            if let Some((stop, cancel)) = &self.stop_on {
                if *stop == text {
                    cancel.cancel();
                }
            }
            self.frames.lock().push(text);
        }

        async fn on_disconnect(&self) {
            *self.disconnects.lock() += 1;
        }
    }

    async fn serve(sessions: Vec<Vec<&'static str>>, hold_last: bool) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let count = sessions.len();
            for (i, frames) in sessions.into_iter().enumerate() {
                let (stream, _) = listener.accept().await.unwrap();
                let mut ws = accept_async(stream).await.unwrap();
                for frame in frames {
                    ws.send(Message::Text(frame.to_string().into())).await.unwrap();
                }
                if hold_last && i + 1 == count {
                    while ws.next().await.is_some() {}
                } else {
                    let _ = ws.close(None).await;
                }
            }
        });
        format!("ws://{}", addr)
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            initial_delay_ms: 10,
            max_delay_ms: 50,
            ..RetryConfig::default()
        }
    }

    #[tokio::test]
    async fn test_forwards_frames_in_order() {
        let url = serve(vec![vec![r#"{"type":"hello"}"#, r#"{"type":"message"}"#]], false).await;
        let handler = Arc::new(Collector::default());
        let client = SocketClient::new(Arc::new(StaticUrl(url)), RetryConfig::no_reconnect());

        client
            .run(handler.clone(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            *handler.frames.lock(),
            vec![r#"{"type":"hello"}"#, r#"{"type":"message"}"#]
        );
        assert_eq!(*handler.disconnects.lock(), 1);
    }

    #[tokio::test]
    async fn test_reconnects_after_close() {
        let url = serve(vec![vec!["one"], vec!["two"]], true).await;
        let cancel = CancellationToken::new();
        let handler = Arc::new(Collector {
            stop_on: Some(("two".into(), cancel.clone())),
            ..Collector::default()
        });
        let client = SocketClient::new(Arc::new(StaticUrl(url)), fast_retry());

        client.run(handler.clone(), cancel).await.unwrap();

        assert_eq!(*handler.frames.lock(), vec!["one", "two"]);
        assert_eq!(*handler.disconnects.lock(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        // One session, then nothing listens on the port.
        let url = serve(vec![vec!["only"]], false).await;
        let handler = Arc::new(Collector::default());
        let client = SocketClient::new(Arc::new(StaticUrl(url)), fast_retry().with_max_retries(2));

        let err = client
            .run(handler.clone(), CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::RetriesExhausted { attempts: 2 }));
        assert_eq!(*handler.frames.lock(), vec!["only"]);
    }

    /// `rtm.connect` fails `failures` times, then hands out `url`.
    struct FlakyUrl {
        url: String,
        failures: u32,
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl SocketUrl for FlakyUrl {
        async fn socket_url(&self) -> TransportResult<String> {
            let mut calls = self.calls.lock();
            *calls += 1;
            if *calls <= self.failures {
                return Err(TransportError::Http("rtm.connect unavailable".into()));
            }
            Ok(self.url.clone())
        }
    }

    async fn dead_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        drop(listener);
        url
    }

    #[tokio::test]
    async fn test_initial_connect_failure_is_retried() {
        let url = serve(vec![vec!["hi"]], true).await;
        let source = Arc::new(FlakyUrl {
            url,
            failures: 1,
            calls: Mutex::new(0),
        });
        let cancel = CancellationToken::new();
        let handler = Arc::new(Collector {
            stop_on: Some(("hi".into(), cancel.clone())),
            ..Collector::default()
        });
        let client = SocketClient::new(source.clone(), fast_retry());

        client.run(handler.clone(), cancel).await.unwrap();

        assert_eq!(*source.calls.lock(), 2);
        assert_eq!(*handler.frames.lock(), vec!["hi"]);
    }

    #[tokio::test]
    async fn test_initial_connect_failure_respects_retry_budget() {
        let handler = Arc::new(Collector::default());
        let client = SocketClient::new(
            Arc::new(StaticUrl(dead_url().await)),
            fast_retry().with_max_retries(2),
        );

        let err = client
            .run(handler.clone(), CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::RetriesExhausted { attempts: 2 }));
        assert_eq!(*handler.disconnects.lock(), 1);
    }

    #[tokio::test]
    async fn test_initial_connect_failure_without_reconnect_is_returned() {
        let client = SocketClient::new(
            Arc::new(StaticUrl(dead_url().await)),
            RetryConfig::no_reconnect(),
        );
        let err = client
            .run(Arc::new(Collector::default()), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::ConnectionFailed { .. }));
    }

    #[tokio::test]
    async fn test_cancel_during_initial_backoff() {
        let cancel = CancellationToken::new();
        let client = SocketClient::new(
            Arc::new(StaticUrl(dead_url().await)),
            RetryConfig {
                initial_delay_ms: 60_000,
                ..RetryConfig::default()
            },
        );

        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            stopper.cancel();
        });

        client
            .run(Arc::new(Collector::default()), cancel)
            .await
            .unwrap();
    }
}
