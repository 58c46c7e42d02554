//! End-to-end cart synchronization through a real relay.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use stockcart_client::{
    CartReconciler, ChannelEvent, CommandSink, ConnectionState, MemoryKeyStorage, PushChannel,
    QueryClient, Reconciled, ReconnectPolicy, SessionKeyStore,
};
use stockcart_relay::{seed::demo_catalogue, state::RelayState};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite;

fn fast_policy() -> ReconnectPolicy {
    ReconnectPolicy {
        initial_delay: Duration::from_millis(50),
        max_delay: Duration::from_millis(200),
        heartbeat_interval: Duration::from_secs(25),
    }
}

async fn start_relay(state: RelayState) -> (std::net::SocketAddr, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = stockcart_relay::app(state);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, handle)
}

fn reconciler(key: &str) -> CartReconciler {
    CartReconciler::new(SessionKeyStore::new(MemoryKeyStorage::with_key(key))).unwrap()
}

async fn connected_channel(addr: std::net::SocketAddr) -> PushChannel {
    let mut channel = PushChannel::connect(format!("ws://{addr}/ws"), fast_policy());
    assert_eq!(
        next_event(&mut channel).await,
        ChannelEvent::State(ConnectionState::Connected)
    );
    channel
}

async fn next_event(channel: &mut PushChannel) -> ChannelEvent {
    tokio::time::timeout(Duration::from_secs(5), channel.next_event())
        .await
        .expect("timed out waiting for channel event")
        .expect("channel closed")
}

/// Feeds server events into `reconciler` until one is not discarded.
async fn reconcile_next(channel: &mut PushChannel, reconciler: &mut CartReconciler) -> Reconciled {
    loop {
        if let ChannelEvent::Server(event) = next_event(channel).await {
            match reconciler.handle(event) {
                Reconciled::Discarded => continue,
                outcome => return outcome,
            }
        }
    }
}

async fn wait_for_connections(state: &RelayState, n: usize) {
    for _ in 0..200 {
        if state.connections.len() == n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("relay has {} connections, expected {n}", state.connections.len());
}

#[tokio::test]
async fn tabs_sharing_a_key_converge_and_others_ignore() {
    let relay = RelayState::new(demo_catalogue());
    let (addr, server) = start_relay(relay.clone()).await;

    let mut tab_a = reconciler("shared01");
    let mut tab_b = reconciler("shared01");
    let mut stranger = reconciler("zzzz0000");
    let mut chan_a = connected_channel(addr).await;
    let mut chan_b = connected_channel(addr).await;
    let mut chan_s = connected_channel(addr).await;
    wait_for_connections(&relay, 3).await;

    assert!(tab_a.request_add(Some(1), &chan_a));
    // Nothing changes locally until the broadcast arrives.
    assert!(tab_a.cart().is_empty());

    assert_eq!(reconcile_next(&mut chan_a, &mut tab_a).await, Reconciled::CartReplaced);
    assert_eq!(reconcile_next(&mut chan_b, &mut tab_b).await, Reconciled::CartReplaced);
    assert_eq!(tab_a.cart(), tab_b.cart());
    assert_eq!(tab_a.cart().len(), 1);
    assert_eq!(tab_a.cart()[0].material.as_deref(), Some("8517681"));

    // Second add from the other tab.
    assert!(tab_b.request_add(Some(2), &chan_b));
    reconcile_next(&mut chan_a, &mut tab_a).await;
    reconcile_next(&mut chan_b, &mut tab_b).await;
    assert_eq!(tab_a.cart(), tab_b.cart());
    assert_eq!(tab_a.cart().len(), 2);
    assert_eq!(relay.cart("shared01"), tab_a.cart().to_vec());

    // The stranger saw both broadcasts and discarded them.
    for _ in 0..2 {
        match next_event(&mut chan_s).await {
            ChannelEvent::Server(event) => {
                assert_eq!(stranger.handle(event), Reconciled::Discarded)
            }
            other => panic!("unexpected {other:?}"),
        }
    }
    assert!(stranger.cart().is_empty());

    chan_a.close();
    chan_b.close();
    chan_s.close();
    server.abort();
}

#[tokio::test]
async fn rejected_add_surfaces_error_and_keeps_cart() {
    let relay = RelayState::new(demo_catalogue());
    let (addr, server) = start_relay(relay.clone()).await;

    let mut tab = reconciler("a1b2c3d4");
    let mut chan = connected_channel(addr).await;
    wait_for_connections(&relay, 1).await;

    assert!(tab.request_add(Some(4242), &chan));
    assert_eq!(reconcile_next(&mut chan, &mut tab).await, Reconciled::ErrorReported);
    assert_eq!(
        tab.notification().unwrap().message,
        "Movimentação 4242 não encontrada"
    );
    assert!(tab.cart().is_empty());

    chan.close();
    server.abort();
}

#[tokio::test]
async fn regenerated_key_ignores_broadcasts_for_old_key() {
    let relay = RelayState::new(demo_catalogue());
    let (addr, server) = start_relay(relay.clone()).await;

    let mut tab = reconciler("a1b2c3d4");
    let mut chan = connected_channel(addr).await;
    wait_for_connections(&relay, 1).await;

    tab.request_add(Some(1), &chan);
    reconcile_next(&mut chan, &mut tab).await;
    assert_eq!(tab.cart().len(), 1);

    tab.regenerate_key().unwrap();
    assert!(tab.cart().is_empty());

    // Another device keeps adding to the old key.
    relay.add_item("a1b2c3d4", 2).unwrap();
    match next_event(&mut chan).await {
        ChannelEvent::Server(event) => assert_eq!(tab.handle(event), Reconciled::Discarded),
        other => panic!("unexpected {other:?}"),
    }
    assert!(tab.cart().is_empty());

    chan.close();
    server.abort();
}

#[tokio::test]
async fn load_cart_then_broadcast_for_same_state() {
    let relay = RelayState::new(demo_catalogue());
    relay.add_item("a1b2c3d4", 3).unwrap();
    let (addr, server) = start_relay(relay.clone()).await;

    let api = QueryClient::with_client(reqwest::Client::new(), &format!("http://{addr}"));
    let mut tab = reconciler("a1b2c3d4");
    tab.load_cart(&api).await.unwrap();
    assert_eq!(tab.cart(), relay.cart("a1b2c3d4").as_slice());

    let before = tab.cart().to_vec();
    let mut chan = connected_channel(addr).await;
    wait_for_connections(&relay, 1).await;
    relay.broadcast(&stockcart_types::ServerEvent::CartUpdated(stockcart_types::CartUpdated {
        chave: "a1b2c3d4".into(),
        produtos: relay.cart("a1b2c3d4"),
    }));
    assert_eq!(reconcile_next(&mut chan, &mut tab).await, Reconciled::CartReplaced);
    assert_eq!(tab.cart(), &before[..]);

    chan.close();
    server.abort();
}

#[tokio::test]
async fn wait_connected_returns_once_the_relay_accepts() {
    let relay = RelayState::new(demo_catalogue());
    let (addr, server) = start_relay(relay.clone()).await;

    let chan = PushChannel::connect(format!("ws://{addr}/ws"), fast_policy());
    assert!(chan.wait_connected(Duration::from_secs(5)).await);
    assert!(chan.is_connected());
    // Already connected: returns immediately.
    assert!(chan.wait_connected(Duration::from_millis(1)).await);

    chan.close();
    server.abort();
}

#[tokio::test]
async fn closing_the_channel_releases_the_connection() {
    let relay = RelayState::new(demo_catalogue());
    let (addr, server) = start_relay(relay.clone()).await;

    let chan = connected_channel(addr).await;
    wait_for_connections(&relay, 1).await;
    chan.close();
    wait_for_connections(&relay, 0).await;

    server.abort();
}

#[tokio::test]
async fn channel_reconnects_after_drop_and_does_not_replay() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let mut channel = PushChannel::connect(format!("ws://{addr}/ws"), fast_policy());

    // First connection: accept, then drop it from the server side.
    let (tcp, _) = listener.accept().await.unwrap();
    let mut first = tokio_tungstenite::accept_async(tcp).await.unwrap();
    assert_eq!(
        next_event(&mut channel).await,
        ChannelEvent::State(ConnectionState::Connected)
    );
    first.close(None).await.unwrap();
    drop(first);
    assert_eq!(
        next_event(&mut channel).await,
        ChannelEvent::State(ConnectionState::Disconnected)
    );
    assert!(!channel.is_connected());
    assert!(!channel.emit(stockcart_types::ClientCommand::AddItem(
        stockcart_types::AddItem::default()
    )));

    // The channel retries on its own.
    let (tcp, _) = tokio::time::timeout(Duration::from_secs(5), listener.accept())
        .await
        .unwrap()
        .unwrap();
    let mut second = tokio_tungstenite::accept_async(tcp).await.unwrap();
    assert_eq!(
        next_event(&mut channel).await,
        ChannelEvent::State(ConnectionState::Connected)
    );

    // Events flow again on the new connection.
    second
        .send(tungstenite::Message::Text(
            r#"{"event":"erro","data":{"mensagem":"manutenção"}}"#.into(),
        ))
        .await
        .unwrap();
    match next_event(&mut channel).await {
        ChannelEvent::Server(stockcart_types::ServerEvent::Error(e)) => {
            assert_eq!(e.mensagem.as_deref(), Some("manutenção"))
        }
        other => panic!("unexpected {other:?}"),
    }

    // The dropped command was never delivered; the next frame is the live one.
    let key = stockcart_types::SessionKey::parse("a1b2c3d4").unwrap();
    assert!(channel.emit(stockcart_types::ClientCommand::AddItem(
        stockcart_types::AddItem::new(5, &key)
    )));
    let frame = loop {
        match tokio::time::timeout(Duration::from_secs(5), second.next()).await {
            Ok(Some(Ok(tungstenite::Message::Text(text)))) => break text.to_string(),
            Ok(Some(Ok(_))) => continue,
            other => panic!("unexpected {other:?}"),
        }
    };
    let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(value["data"]["id"], 5);

    channel.close();
}
