//! Network runtime integration.
//!
//! Bridges the synchronous game loop with the async TCP link. The bridge owns
//! a tokio runtime and one task that sets up the connection and then shuttles
//! packets both ways; the game loop only sees [`PacketLink`].

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::BattleConfig;
use crate::link::{LinkEvent, PacketLink};
use crate::protocol::Packet;
use crate::transport::{accept, connect, listen, PeerLink};

/// How long [`NetBridge::close`] waits for queued packets to go out
const CLOSE_GRACE: Duration = Duration::from_millis(500);

enum Dial {
    Accept(TcpListener, Duration),
    Connect(SocketAddr, Duration),
}

/// Running network link.
pub struct NetBridge {
    rt: Runtime,
    local_addr: Option<SocketAddr>,
    out_tx: Option<mpsc::UnboundedSender<Packet>>,
    in_rx: mpsc::UnboundedReceiver<LinkEvent>,
    task: Option<JoinHandle<()>>,
}

impl NetBridge {
    /// Listen on the configured address and wait for one opponent.
    ///
    /// Binding happens before this returns; accepting happens in the
    /// background and shows up as a `Connected` or `Closed` event.
    pub fn host(config: &BattleConfig) -> Result<Self> {
        let addr = config.socket_addr()?;
        let rt = Runtime::new().context("failed to create tokio runtime")?;
        let listener = rt
            .block_on(listen(addr))
            .with_context(|| format!("failed to listen on {addr}"))?;
        let local_addr = listener.local_addr().ok();
        let wait = Duration::from_millis(config.ready_timeout_ms);
        Ok(Self::start(rt, local_addr, Dial::Accept(listener, wait)))
    }

    /// Dial the configured address
    pub fn join(config: &BattleConfig) -> Result<Self> {
        Self::join_addr(config.socket_addr()?, config.connect_timeout())
    }

    pub fn join_addr(addr: SocketAddr, wait: Duration) -> Result<Self> {
        let rt = Runtime::new().context("failed to create tokio runtime")?;
        Ok(Self::start(rt, None, Dial::Connect(addr, wait)))
    }

    fn start(rt: Runtime, local_addr: Option<SocketAddr>, dial: Dial) -> Self {
        let (out_tx, out_rx) = mpsc::unbounded_channel::<Packet>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<LinkEvent>();
        let task = rt.spawn(run_link(dial, out_rx, in_tx));
        Self {
            rt,
            local_addr,
            out_tx: Some(out_tx),
            in_rx,
            task: Some(task),
        }
    }

    /// Bound address when hosting
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Wait up to `wait` for the next event. Blocks the calling thread.
    pub fn recv_timeout(&mut self, wait: Duration) -> Option<LinkEvent> {
        let in_rx = &mut self.in_rx;
        self.rt
            .block_on(async { tokio::time::timeout(wait, in_rx.recv()).await.ok().flatten() })
    }
}

async fn run_link(dial: Dial, mut out_rx: mpsc::UnboundedReceiver<Packet>, in_tx: mpsc::UnboundedSender<LinkEvent>) {
    let link = match dial {
        Dial::Accept(listener, wait) => accept(&listener, wait).await,
        Dial::Connect(addr, wait) => connect(addr, wait).await,
    };
    let mut link: PeerLink = match link {
        Ok(link) => link,
        Err(reason) => {
            let _ = in_tx.send(LinkEvent::Closed(reason));
            return;
        }
    };

    loop {
        tokio::select! {
            outgoing = out_rx.recv() => match outgoing {
                Some(packet) => link.send(packet),
                None => {
                    link.shutdown().await;
                    break;
                }
            },
            incoming = link.recv() => match incoming {
                Some(event) => {
                    let closed = matches!(event, LinkEvent::Closed(_));
                    if in_tx.send(event).is_err() || closed {
                        break;
                    }
                }
                None => break,
            },
        }
    }
    debug!("link task finished");
}

impl PacketLink for NetBridge {
    fn send(&mut self, packet: Packet) {
        if let Some(tx) = &self.out_tx {
            let _ = tx.send(packet);
        }
    }

    fn try_recv(&mut self) -> Option<LinkEvent> {
        self.in_rx.try_recv().ok()
    }

    fn close(&mut self) {
        if self.out_tx.take().is_none() {
            return;
        }
        if let Some(task) = self.task.take() {
            let _ = self.rt.block_on(tokio::time::timeout(CLOSE_GRACE, task));
        }
    }
}

impl Drop for NetBridge {
    fn drop(&mut self) {
        self.close();
    }
}
