//! Binds a PUSH socket where the viewer expects its producer and sends each
//! argument as one message, e.g. `cargo run --example send_trigger ShowImage SaveImage`.

use futures::StreamExt;
use rdreamer::config::DEFAULT_SOCKET_ENDPOINT;
use std::time::Duration;
use zeromq::{PushSocket, Socket, SocketEvent, SocketSend, ZmqMessage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    rdreamer::logger::init()?;

    let endpoint = std::env::var("DREAMER_SOCKET_ENDPOINT")
        .unwrap_or_else(|_| DEFAULT_SOCKET_ENDPOINT.to_string());
    let mut messages: Vec<String> = std::env::args().skip(1).collect();
    if messages.is_empty() {
        messages.push("ShowImage".to_string());
    }

    let mut socket = PushSocket::new();
    let mut events = socket.monitor();
    socket.bind(&endpoint).await?;
    log::info!("📤 Bound {}, waiting for the viewer", endpoint);

    // A push socket with no peer returns the message instead of queueing it.
    loop {
        match events.next().await {
            Some(SocketEvent::Accepted(_, _)) => break,
            Some(_) => continue,
            None => return Err("socket monitor closed before the viewer connected".into()),
        }
    }
    log::info!("🔌 Viewer connected");

    for message in messages {
        socket.send(ZmqMessage::from(message.clone().into_bytes())).await?;
        log::info!("Sent {}", message);
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    Ok(())
}
