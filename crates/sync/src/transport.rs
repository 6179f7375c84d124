//! TCP transport for battle packets
//!
//! One peer listens, the other dials. Once a stream exists it is split into a
//! reader task and a writer task that talk to the owner over channels:
//!
//! - reader: bounded `read_until` -> `decode_packet` -> `LinkEvent`
//! - writer: `Packet` -> `encode_packet` -> line + `\n` -> flush
//!
//! Malformed, non-UTF-8, and overlong lines are logged and skipped; a line is
//! never buffered past `MAX_LINE_BYTES`. A version mismatch or EOF ends the
//! reader with a `Closed` event.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{DisconnectReason, ProtocolError};
use crate::link::{LinkEvent, PacketLink};
use crate::protocol::{decode_packet, encode_packet, Packet, MAX_LINE_BYTES};

fn classify(context: &str, err: std::io::Error) -> DisconnectReason {
    let reason = DisconnectReason::from_io_error(&err);
    warn!(error = %err, reason = %reason, "{context}");
    reason
}

/// Discard the rest of an overlong line. Returns false at EOF.
async fn skip_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<bool> {
    loop {
        let (used, found) = {
            let chunk = reader.fill_buf().await?;
            if chunk.is_empty() {
                return Ok(false);
            }
            match chunk.iter().position(|&b| b == b'\n') {
                Some(end) => (end + 1, true),
                None => (chunk.len(), false),
            }
        };
        reader.consume(used);
        if found {
            return Ok(true);
        }
    }
}

/// Bind the listening socket
pub async fn listen(addr: SocketAddr) -> Result<TcpListener, DisconnectReason> {
    let listener = TcpListener::bind(addr).await.map_err(|e| classify("bind failed", e))?;
    if let Ok(local) = listener.local_addr() {
        info!(addr = %local, "waiting for opponent");
    }
    Ok(listener)
}

/// Wait up to `wait` for one peer
pub async fn accept(listener: &TcpListener, wait: Duration) -> Result<PeerLink, DisconnectReason> {
    match timeout(wait, listener.accept()).await {
        Err(_) => {
            warn!(wait_ms = wait.as_millis() as u64, "no opponent arrived");
            Err(DisconnectReason::Timeout)
        }
        Ok(Err(e)) => Err(classify("accept failed", e)),
        Ok(Ok((stream, addr))) => Ok(PeerLink::spawn(stream, Some(addr))),
    }
}

/// Dial a listening peer, giving up after `wait`
pub async fn connect(addr: SocketAddr, wait: Duration) -> Result<PeerLink, DisconnectReason> {
    match timeout(wait, TcpStream::connect(addr)).await {
        Err(_) => {
            warn!(%addr, "connect timed out");
            Err(DisconnectReason::Timeout)
        }
        Ok(Err(e)) => Err(classify("connect failed", e)),
        Ok(Ok(stream)) => Ok(PeerLink::spawn(stream, Some(addr))),
    }
}

/// A live TCP connection to the opponent
#[derive(Debug)]
pub struct PeerLink {
    peer: Option<SocketAddr>,
    out_tx: Option<mpsc::UnboundedSender<Packet>>,
    in_rx: mpsc::UnboundedReceiver<LinkEvent>,
    reader: JoinHandle<()>,
    writer: Option<JoinHandle<()>>,
}

impl PeerLink {
    /// Must be called inside a tokio runtime
    pub fn spawn(stream: TcpStream, peer: Option<SocketAddr>) -> Self {
        let _ = stream.set_nodelay(true);
        info!(peer = ?peer, "link established");

        let (reader, mut writer) = tokio::io::split(stream);
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Packet>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<LinkEvent>();
        let _ = in_tx.send(LinkEvent::Connected { peer });

        let reader = tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let limit = MAX_LINE_BYTES as u64 + 1;
            let mut line = Vec::with_capacity(1024);
            loop {
                line.clear();
                let read = (&mut reader).take(limit).read_until(b'\n', &mut line).await;
                let event = match read {
                    Ok(0) => LinkEvent::Closed(DisconnectReason::Unknown),
                    Err(e) => LinkEvent::Closed(DisconnectReason::from_io_error(&e)),
                    Ok(n) if n as u64 == limit && !line.ends_with(b"\n") => {
                        warn!(max = MAX_LINE_BYTES, "dropping overlong line");
                        match skip_line(&mut reader).await {
                            Ok(true) => continue,
                            Ok(false) => LinkEvent::Closed(DisconnectReason::Unknown),
                            Err(e) => LinkEvent::Closed(DisconnectReason::from_io_error(&e)),
                        }
                    }
                    Ok(_) => match std::str::from_utf8(&line).map_err(|e| ProtocolError::Malformed(e.to_string())) {
                        Err(e) => {
                            warn!(error = %e, "dropping bad line");
                            continue;
                        }
                        Ok(text) => match decode_packet(text) {
                            Ok(packet) => LinkEvent::Packet(packet),
                            Err(ProtocolError::Empty) => continue,
                            Err(e @ ProtocolError::VersionMismatch { .. }) => {
                                warn!(error = %e, "closing link");
                                LinkEvent::Closed(DisconnectReason::VersionMismatch)
                            }
                            Err(e) => {
                                warn!(error = %e, "dropping bad line");
                                continue;
                            }
                        },
                    },
                };
                let closed = matches!(event, LinkEvent::Closed(_));
                if in_tx.send(event).is_err() || closed {
                    break;
                }
            }
            debug!("reader finished");
        });

        let writer = tokio::spawn(async move {
            while let Some(packet) = out_rx.recv().await {
                let line = match encode_packet(&packet) {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(kind = packet.kind(), error = %e, "dropping unencodable packet");
                        continue;
                    }
                };
                if writer.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
                if writer.write_all(b"\n").await.is_err() {
                    break;
                }
                if writer.flush().await.is_err() {
                    break;
                }
            }
            let _ = writer.shutdown().await;
            debug!("writer finished");
        });

        Self {
            peer,
            out_tx: Some(out_tx),
            in_rx,
            reader,
            writer: Some(writer),
        }
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Next event, waiting for it. None once the reader is gone.
    pub async fn recv(&mut self) -> Option<LinkEvent> {
        self.in_rx.recv().await
    }

    /// Close and wait for queued packets to reach the socket
    pub async fn shutdown(&mut self) {
        self.close();
        if let Some(writer) = self.writer.take() {
            let _ = writer.await;
        }
    }
}

impl PacketLink for PeerLink {
    fn send(&mut self, packet: Packet) {
        if let Some(tx) = &self.out_tx {
            let _ = tx.send(packet);
        }
    }

    fn try_recv(&mut self) -> Option<LinkEvent> {
        self.in_rx.try_recv().ok()
    }

    fn close(&mut self) {
        if self.out_tx.take().is_some() {
            self.reader.abort();
        }
    }
}

impl Drop for PeerLink {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
