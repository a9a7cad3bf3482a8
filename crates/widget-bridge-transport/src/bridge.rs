//! Bridge bootstrap: wires connection, listener and dispatcher together.

use std::sync::Arc;

use tokio::task::JoinHandle;
use widget_bridge_core::{BridgeConfig, BridgeContext, Connect};

use crate::{
    dispatcher::InboundDispatcher,
    guard::{OutboundGuard, SendOutcome},
    listener::mutation_listener,
    protocol::OutboundMessage,
    websocket::{ConnectionManager, init_socket},
    window::WidgetWindow,
};

/// A wired bridge.
pub struct Bridge {
    connection: Arc<ConnectionManager>,
    outbound: OutboundGuard<Arc<ConnectionManager>>,
    dispatcher: JoinHandle<()>,
}

/// Wire the bridge for `ctx` and announce readiness to the parent frame.
///
/// The connection manager, the mutation listener and the inbound dispatcher
/// are all in place before the handshake is posted, so no parent message can
/// arrive ahead of the reaction table. Must be called within a tokio runtime.
pub fn init(ctx: BridgeContext, config: &BridgeConfig, window: WidgetWindow) -> Bridge {
    let connection = init_socket(config.ws_link.clone(), Arc::clone(&ctx.store));

    let as_connect: Arc<dyn Connect> = connection.clone();
    ctx.store.subscribe(mutation_listener(
        Arc::clone(&as_connect),
        Arc::clone(&ctx.credentials),
        ctx.redirect.clone(),
    ));

    let dispatcher = InboundDispatcher::new(
        Arc::clone(&ctx.store),
        Arc::clone(&ctx.credentials),
        as_connect,
    )
    .attach(window);
    tracing::info!(connection_id = %connection.id(), "bridge ready");

    Bridge {
        outbound: OutboundGuard::new(Arc::clone(&connection), ctx.credentials),
        connection,
        dispatcher,
    }
}

impl Bridge {
    /// Send a payload to the backend through the outbound guard.
    pub fn send(&self, payload: OutboundMessage) -> SendOutcome {
        self.outbound.send(payload)
    }

    /// The outbound guard wrapping the connection.
    #[must_use]
    pub const fn outbound(&self) -> &OutboundGuard<Arc<ConnectionManager>> {
        &self.outbound
    }

    #[must_use]
    pub const fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }

    /// Stop handling parent messages and close the connection.
    pub fn shutdown(self) {
        self.dispatcher.abort();
        self.connection.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Mutex, PoisonError},
        time::Duration,
    };

    use axum::{
        Router,
        extract::{
            State, WebSocketUpgrade,
            ws::{Message as WsMessage, WebSocket},
        },
        response::IntoResponse,
        routing::get,
    };
    use serde_json::{Value, json};
    use tokio::sync::mpsc;
    use url::Url;
    use widget_bridge_core::{
        CredentialStore, MemoryStore, Redirect, SessionCredential, Store, StoreState, Subscriber,
        paths,
    };
    use widget_bridge_session::MemoryCredentialStore;

    use super::*;
    use crate::{protocol::READY_SENTINEL, websocket::ConnectionState, window::frame_pair};

    /// Store that records subscriptions on top of a [`MemoryStore`].
    #[derive(Default)]
    struct RecordingStore {
        inner: MemoryStore,
        subscribed: Mutex<Vec<&'static str>>,
    }

    impl Store for RecordingStore {
        fn dispatch(&self, action: &str, payload: Value) {
            self.inner.dispatch(action, payload);
        }

        fn commit(&self, mutation: &str, payload: Value) {
            self.inner.commit(mutation, payload);
        }

        fn subscribe(&self, subscriber: Subscriber) {
            self.subscribed
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(subscriber.name());
            self.inner.subscribe(subscriber);
        }

        fn state(&self) -> StoreState {
            self.inner.state()
        }
    }

    async fn ws_handler(
        ws: WebSocketUpgrade,
        State(tx): State<mpsc::UnboundedSender<String>>,
    ) -> impl IntoResponse {
        let _ = tx.send("accepted".to_string());
        ws.on_upgrade(move |socket| serve(socket, tx))
    }

    async fn serve(mut socket: WebSocket, tx: mpsc::UnboundedSender<String>) {
        while let Some(Ok(msg)) = socket.recv().await {
            if let WsMessage::Text(text) = msg {
                let _ = tx.send(text.as_str().to_owned());
            }
        }
    }

    async fn spawn_backend() -> (Url, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = Router::new().route("/ws", get(ws_handler)).with_state(tx);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (Url::parse(&format!("ws://{addr}/ws")).unwrap(), rx)
    }

    fn config(ws_link: Url) -> BridgeConfig {
        BridgeConfig {
            ws_link,
            base: "/".to_string(),
            fb_app_id: "app".to_string(),
        }
    }

    fn context(store: Arc<dyn Store>, redirects: Arc<Mutex<Vec<String>>>) -> BridgeContext {
        let credentials = Arc::new(MemoryCredentialStore::new());
        let redirect: Redirect = Arc::new(move |target: &str| {
            redirects.lock().unwrap().push(target.to_owned());
        });
        BridgeContext::new(store, redirect, credentials)
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<String>) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .ok()
            .flatten()
    }

    #[tokio::test]
    async fn test_init_sequence() {
        let (url, mut backend) = spawn_backend().await;
        let store = Arc::new(RecordingStore::default());
        let (widget, mut parent) = frame_pair();

        let bridge = init(
            context(store.clone(), Arc::default()),
            &config(url.clone()),
            widget,
        );

        assert_eq!(*store.subscribed.lock().unwrap(), vec!["mutation_dispatcher"]);
        assert_eq!(bridge.connection().endpoint(), &url);
        assert_eq!(bridge.connection().state(), ConnectionState::ManualPending);
        assert_eq!(parent.recv().await.as_deref(), Some(READY_SENTINEL));
        assert_eq!(parent.try_recv(), None);
        assert!(
            tokio::time::timeout(Duration::from_millis(150), backend.recv())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_login_from_parent_opens_one_connection_and_unlocks_sends() {
        let (url, mut backend) = spawn_backend().await;
        let credentials = Arc::new(MemoryCredentialStore::new());
        let store = Arc::new(MemoryStore::with_credentials(credentials.clone()));
        let ctx = BridgeContext::new(store.clone(), Arc::new(|_: &str| {}), credentials.clone());
        let (widget, parent) = frame_pair();

        let bridge = init(ctx, &config(url), widget);
        assert_eq!(
            bridge.send(OutboundMessage::new().with("item", json!({}))),
            SendOutcome::Skipped
        );

        parent
            .post_message(r#"{"type":"loggedIn","userToken":"t1"}"#)
            .unwrap();

        assert_eq!(next(&mut backend).await.as_deref(), Some("accepted"));
        assert_eq!(
            credentials.get().unwrap(),
            Some(SessionCredential::new("t1"))
        );
        assert_eq!(bridge.connection().state(), ConnectionState::Connected);

        assert_eq!(
            bridge.send(
                OutboundMessage::new()
                    .with("item", json!({}))
                    .with("guid", "g")
                    .with("ts", 123)
            ),
            SendOutcome::Sent
        );
        assert_eq!(next(&mut backend).await.as_deref(), Some(r#"{"item":{}}"#));
        assert!(
            tokio::time::timeout(Duration::from_millis(150), backend.recv())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_login_unlocks_sends_with_non_persisting_store() {
        let (url, mut backend) = spawn_backend().await;
        let credentials = Arc::new(MemoryCredentialStore::new());
        let store = Arc::new(MemoryStore::new());
        let ctx = BridgeContext::new(store.clone(), Arc::new(|_: &str| {}), credentials.clone());
        let (widget, parent) = frame_pair();

        let bridge = init(ctx, &config(url), widget);
        parent
            .post_message(r#"{"type":"loggedIn","userToken":"t1"}"#)
            .unwrap();
        assert_eq!(next(&mut backend).await.as_deref(), Some("accepted"));

        assert_eq!(
            credentials.get().unwrap(),
            Some(SessionCredential::new("t1"))
        );
        assert_eq!(
            bridge.send(OutboundMessage::new().with("item", json!({}))),
            SendOutcome::Sent
        );
        assert_eq!(next(&mut backend).await.as_deref(), Some(r#"{"item":{}}"#));

        store.commit(paths::LOGOUT, Value::Null);

        assert_eq!(credentials.get().unwrap(), None);
        assert_eq!(
            bridge.send(OutboundMessage::new().with("item", json!({}))),
            SendOutcome::Skipped
        );
    }

    #[tokio::test]
    async fn test_send_after_connection_fault_fails() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let credentials = Arc::new(MemoryCredentialStore::new());
        let store = Arc::new(MemoryStore::with_credentials(credentials.clone()));
        let ctx = BridgeContext::new(store.clone(), Arc::new(|_: &str| {}), credentials);
        let (widget, _parent) = frame_pair();
        let url = Url::parse(&format!("ws://{addr}/ws")).unwrap();

        let bridge = init(ctx, &config(url), widget);
        store.commit(paths::SET_TOKEN, json!("t1"));

        for _ in 0..250 {
            if store.state().socket.error.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(bridge.connection().state(), ConnectionState::Closed);

        for _ in 0..3 {
            assert_eq!(
                bridge.send(OutboundMessage::new().with("item", json!({}))),
                SendOutcome::Failed
            );
        }
    }

    #[tokio::test]
    async fn test_logout_tears_down_and_redirects() {
        let (url, mut backend) = spawn_backend().await;
        let redirects = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::new(MemoryStore::new());
        let (widget, _parent) = frame_pair();

        let bridge = init(context(store.clone(), redirects.clone()), &config(url), widget);

        store.commit(paths::SET_TOKEN, json!("t1"));
        assert_eq!(next(&mut backend).await.as_deref(), Some("accepted"));

        store.commit(paths::LOGOUT, Value::Null);

        assert_eq!(bridge.connection().state(), ConnectionState::Closed);
        assert_eq!(*redirects.lock().unwrap(), vec!["/login".to_string()]);
        bridge.shutdown();
    }
}
