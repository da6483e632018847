//! Client transport tests against a live relay server.

use std::time::Duration;

use relaychat_client::{ClientEvent, ConnectedClient, connect};
use relaychat_server::{Server, ServerHandle, ServerRuntimeConfig};
use tokio::time::{sleep, timeout};

async fn start_server() -> (String, ServerHandle) {
    let config = ServerRuntimeConfig {
        bind_address: "127.0.0.1:0".to_string(),
        ..Default::default()
    };

    let server = Server::bind(config).await.expect("bind on ephemeral port");
    let addr = server.local_addr().expect("local addr").to_string();
    let handle = server.handle();

    tokio::spawn(server.run());

    (addr, handle)
}

async fn wait_for_peers(handle: &ServerHandle, expected: usize) {
    timeout(Duration::from_secs(5), async {
        while handle.peer_count().await != expected {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("server should reach the expected peer count");
}

async fn next_event(client: &mut ConnectedClient) -> ClientEvent {
    timeout(Duration::from_secs(5), client.next_event())
        .await
        .expect("event should arrive")
        .expect("event stream should be open")
}

#[tokio::test]
async fn two_clients_exchange_messages() {
    let (addr, handle) = start_server().await;

    let mut alice = connect(&addr, "alice").await.expect("alice connects");
    wait_for_peers(&handle, 1).await;

    let mut bob = connect(&addr, "bob").await.expect("bob connects");
    wait_for_peers(&handle, 2).await;

    alice.send("hi bob").await.expect("send");

    let event = next_event(&mut bob).await;
    assert_eq!(
        event,
        ClientEvent::Message { sender: "alice".to_string(), text: "hi bob".to_string() }
    );

    // And the other direction.
    bob.send("hi alice").await.expect("send");

    let event = next_event(&mut alice).await;
    assert_eq!(
        event,
        ClientEvent::Message { sender: "bob".to_string(), text: "hi alice".to_string() }
    );
}

#[tokio::test]
async fn multibyte_text_survives_the_round_trip() {
    let (addr, handle) = start_server().await;

    let mut sender = connect(&addr, "世界").await.expect("connects");
    wait_for_peers(&handle, 1).await;
    let mut receiver = connect(&addr, "rx").await.expect("connects");
    wait_for_peers(&handle, 2).await;

    sender.send("héllo 🌍").await.expect("send");

    let event = next_event(&mut receiver).await;
    assert_eq!(
        event,
        ClientEvent::Message { sender: "世界".to_string(), text: "héllo 🌍".to_string() }
    );
}

#[tokio::test]
async fn peer_departure_does_not_disturb_the_rest() {
    let (addr, handle) = start_server().await;

    let alice = connect(&addr, "alice").await.expect("connects");
    wait_for_peers(&handle, 1).await;
    let mut bob = connect(&addr, "bob").await.expect("connects");
    wait_for_peers(&handle, 2).await;

    // Dropping the handle closes alice's connection.
    drop(alice);
    wait_for_peers(&handle, 1).await;

    // Bob's sends still succeed with nobody listening. Wait until the
    // relay has processed the message so carol cannot receive it.
    bob.send("anyone?").await.expect("send into empty room");
    timeout(Duration::from_secs(5), async {
        while handle.frames_relayed().await != 1 {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("server should process the empty-room broadcast");

    let mut carol = connect(&addr, "carol").await.expect("connects");
    wait_for_peers(&handle, 2).await;

    bob.send("welcome carol").await.expect("send");

    let event = next_event(&mut carol).await;
    assert_eq!(
        event,
        ClientEvent::Message { sender: "bob".to_string(), text: "welcome carol".to_string() }
    );
}

#[tokio::test]
async fn server_closing_surfaces_a_disconnect_event() {
    // A bare listener that accepts the registration and then hangs up.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr").to_string();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        // Consume the identity frame, then drop the socket.
        let mut buf = [0u8; 15];
        use tokio::io::AsyncReadExt;
        let _ = stream.read_exact(&mut buf).await;
    });

    let mut client = connect(&addr, "alice").await.expect("connects");

    let event = next_event(&mut client).await;
    assert!(
        matches!(event, ClientEvent::Disconnected { .. }),
        "expected a disconnect event, got {event:?}"
    );
}
