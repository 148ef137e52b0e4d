use crate::{
    error::{DreamerError, Result},
    models::ListenerEvent,
};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc::UnboundedSender, watch};
use tokio::task::JoinHandle;
use zeromq::util::PeerIdentity;
use zeromq::{Endpoint, PullSocket, Socket, SocketOptions, SocketRecv, ZmqMessage};

/// How long the old and the fresh socket are both read after a reconnect.
const HANDOVER_GRACE: Duration = Duration::from_millis(100);

/// Background task that forwards every message from a PULL socket onto the queue.
///
/// The task stops when [`Listener::shutdown`] is called, when the listener is
/// dropped, or when the receiving end of the queue goes away. A socket error
/// ends it too, after pushing [`ListenerEvent::Disconnected`].
///
/// A PULL socket never reports that its producer went away, so after
/// `idle_reconnect` without a message the listener opens a fresh connection
/// and retires the old one. A restarted producer is picked up that way.
/// Every connection carries the same peer identity, so a producer that is
/// still alive swaps the old connection for the fresh one instead of keeping
/// a stale peer it would later write into.
pub struct Listener {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl Listener {
    pub fn spawn(
        handle: &Handle,
        endpoint: impl Into<String>,
        idle_reconnect: Duration,
        sender: UnboundedSender<ListenerEvent>,
    ) -> Self {
        let endpoint = endpoint.into();
        let (shutdown, stop) = watch::channel(false);

        let task = handle.spawn(async move {
            match run(&endpoint, idle_reconnect, &sender, stop).await {
                Ok(()) => log::info!("Listener on {} stopped", endpoint),
                Err(err) => {
                    log::error!("❌ Listener on {} failed: {}", endpoint, err);
                    let _ = sender.send(ListenerEvent::Disconnected(err.to_string()));
                }
            }
        });

        Self {
            shutdown,
            task: Some(task),
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Signals shutdown and waits for the task to end.
    pub async fn join(mut self) {
        self.shutdown();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// `connect` keeps retrying a refused connection with its own backoff, so
/// this only returns once a producer accepted us or on a hard error.
async fn open(endpoint: &str, identity: &PeerIdentity) -> Result<PullSocket> {
    let mut options = SocketOptions::default();
    options.peer_identity(identity.clone());
    let mut socket = PullSocket::with_options(options);
    socket.connect(endpoint).await?;
    Ok(socket)
}

fn forward(sender: &UnboundedSender<ListenerEvent>, message: ZmqMessage) -> bool {
    let bytes = message_bytes(message);
    log::debug!("📨 Received {}", bytes.escape_ascii());
    sender.send(ListenerEvent::Message(bytes)).is_ok()
}

async fn run(
    endpoint: &str,
    idle_reconnect: Duration,
    sender: &UnboundedSender<ListenerEvent>,
    mut stop: watch::Receiver<bool>,
) -> Result<()> {
    endpoint
        .parse::<Endpoint>()
        .map_err(|e| DreamerError::Socket(format!("invalid endpoint {:?}: {}", endpoint, e)))?;

    let identity = PeerIdentity::new();
    log::info!("⏳ Waiting for a producer on {}", endpoint);
    let mut socket = tokio::select! {
        opened = open(endpoint, &identity) => opened?,
        _ = stop.changed() => return Ok(()),
    };
    log::info!("🔌 Listening for triggers on {}", endpoint);

    loop {
        tokio::select! {
            received = socket.recv() => {
                if !forward(sender, received?) {
                    return Ok(());
                }
                continue;
            }
            _ = tokio::time::sleep(idle_reconnect) => {}
            _ = stop.changed() => return Ok(()),
        }

        log::debug!(
            "No trigger for {:?}, refreshing connection to {}",
            idle_reconnect,
            endpoint
        );

        // The old socket keeps delivering while the new one connects.
        let opening = open(endpoint, &identity);
        tokio::pin!(opening);
        let mut fresh = loop {
            tokio::select! {
                opened = &mut opening => break opened?,
                received = socket.recv() => {
                    if !forward(sender, received?) {
                        return Ok(());
                    }
                }
                _ = stop.changed() => return Ok(()),
            }
        };

        let grace = tokio::time::sleep(HANDOVER_GRACE);
        tokio::pin!(grace);
        loop {
            tokio::select! {
                biased;
                _ = stop.changed() => return Ok(()),
                received = socket.recv() => {
                    if !forward(sender, received?) {
                        return Ok(());
                    }
                }
                received = fresh.recv() => {
                    if !forward(sender, received?) {
                        return Ok(());
                    }
                }
                _ = &mut grace => break,
            }
        }
        socket = fresh;
    }
}

fn message_bytes(message: ZmqMessage) -> Vec<u8> {
    let mut bytes = Vec::new();
    for frame in message.into_vec() {
        bytes.extend_from_slice(&frame);
    }
    bytes
}
