//! Links carry packets between the session and a peer
//!
//! [`PacketLink`] is the seam the battle loop talks to. The TCP link lives in
//! [`crate::runtime`]; [`MemoryLink`] connects two sessions in-process and
//! pushes every packet through the line codec, so tests see the same bytes a
//! socket would.

use std::collections::VecDeque;
use std::net::SocketAddr;

use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::warn;

use crate::error::{DisconnectReason, ProtocolError};
use crate::protocol::{decode_packet, encode_packet, Packet};

/// What a link reports upward
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Connected { peer: Option<SocketAddr> },
    Packet(Packet),
    /// No more events will follow
    Closed(DisconnectReason),
}

/// Non-blocking packet transport
pub trait PacketLink {
    /// Queue a packet. Dropped silently once the link is closed.
    fn send(&mut self, packet: Packet);

    fn try_recv(&mut self) -> Option<LinkEvent>;

    /// Close the link. Idempotent.
    fn close(&mut self);
}

#[derive(Debug)]
enum Wire {
    Line(String),
    Hangup,
}

/// In-process link; see [`memory_link_pair`]
#[derive(Debug)]
pub struct MemoryLink {
    tx: mpsc::UnboundedSender<Wire>,
    rx: mpsc::UnboundedReceiver<Wire>,
    pending: VecDeque<LinkEvent>,
    closed: bool,
}

/// Two connected in-process links
pub fn memory_link_pair() -> (MemoryLink, MemoryLink) {
    let (a_tx, b_rx) = mpsc::unbounded_channel();
    let (b_tx, a_rx) = mpsc::unbounded_channel();
    (MemoryLink::new(a_tx, a_rx), MemoryLink::new(b_tx, b_rx))
}

impl MemoryLink {
    fn new(tx: mpsc::UnboundedSender<Wire>, rx: mpsc::UnboundedReceiver<Wire>) -> Self {
        let mut pending = VecDeque::new();
        pending.push_back(LinkEvent::Connected { peer: None });
        Self {
            tx,
            rx,
            pending,
            closed: false,
        }
    }

    /// Push a raw line as if the peer had written it
    pub fn inject_line(&mut self, line: &str) {
        let _ = self.tx.send(Wire::Line(line.to_string()));
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn shut(&mut self, reason: DisconnectReason) -> Option<LinkEvent> {
        self.closed = true;
        Some(LinkEvent::Closed(reason))
    }
}

impl PacketLink for MemoryLink {
    fn send(&mut self, packet: Packet) {
        if self.closed {
            return;
        }
        match encode_packet(&packet) {
            Ok(line) => {
                let _ = self.tx.send(Wire::Line(line));
            }
            Err(e) => warn!(kind = packet.kind(), error = %e, "dropping unencodable packet"),
        }
    }

    fn try_recv(&mut self) -> Option<LinkEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }
        if self.closed {
            return None;
        }
        loop {
            match self.rx.try_recv() {
                Ok(Wire::Line(line)) => match decode_packet(&line) {
                    Ok(packet) => return Some(LinkEvent::Packet(packet)),
                    Err(ProtocolError::Empty) => continue,
                    Err(e @ ProtocolError::VersionMismatch { .. }) => {
                        warn!(error = %e, "closing link");
                        let _ = self.tx.send(Wire::Hangup);
                        return self.shut(DisconnectReason::VersionMismatch);
                    }
                    Err(e) => warn!(error = %e, "dropping bad line"),
                },
                Ok(Wire::Hangup) | Err(TryRecvError::Disconnected) => {
                    return self.shut(DisconnectReason::Unknown);
                }
                Err(TryRecvError::Empty) => return None,
            }
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = self.tx.send(Wire::Hangup);
    }
}
