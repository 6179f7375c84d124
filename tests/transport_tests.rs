//! TCP transport against a raw socket peer

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use tetris_battle::sync::{accept, connect, listen, DisconnectReason, LinkEvent, Packet, PacketBody, PacketLink};

async fn next_event(link: &mut tetris_battle::sync::PeerLink) -> LinkEvent {
    tokio::time::timeout(Duration::from_secs(2), link.recv())
        .await
        .expect("timed out waiting for link event")
        .expect("link gone")
}

#[tokio::test]
async fn peer_link_speaks_line_delimited_json() {
    let listener = listen("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let stream = TcpStream::connect(addr).await.expect("connect failed");
    let mut link = accept(&listener, Duration::from_secs(2)).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    assert!(matches!(next_event(&mut link).await, LinkEvent::Connected { peer: Some(_) }));

    // raw peer -> link
    let hello = r#"{"v":1,"seq":1,"ts":0,"type":"hello","name":"raw"}"#;
    write_half.write_all(hello.as_bytes()).await.unwrap();
    write_half.write_all(b"\n").await.unwrap();
    write_half.flush().await.unwrap();
    assert_eq!(
        next_event(&mut link).await,
        LinkEvent::Packet(Packet::new(
            1,
            0,
            PacketBody::Hello {
                name: "raw".to_string()
            }
        ))
    );

    // link -> raw peer
    link.send(Packet::new(7, 42, PacketBody::Ping { nonce: 3, sent_ms: 42 }));
    let line = tokio::time::timeout(Duration::from_secs(2), lines.next_line())
        .await
        .unwrap()
        .unwrap()
        .expect("expected ping line");
    let v: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(v["type"], "ping");
    assert_eq!(v["v"], 1);
    assert_eq!(v["seq"], 7);
    assert_eq!(v["nonce"], 3);

    // hangup
    drop(write_half);
    drop(lines);
    assert_eq!(next_event(&mut link).await, LinkEvent::Closed(DisconnectReason::Unknown));
}

#[tokio::test]
async fn connect_to_closed_port_is_refused() {
    let addr = {
        let listener = listen("127.0.0.1:0".parse().unwrap()).await.unwrap();
        listener.local_addr().unwrap()
    };
    let err = connect(addr, Duration::from_secs(2)).await.unwrap_err();
    assert_eq!(err, DisconnectReason::Refused);
}

#[tokio::test]
async fn bind_conflict_is_refused() {
    let first = listen("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = first.local_addr().unwrap();
    let err = listen(addr).await.unwrap_err();
    assert_eq!(err, DisconnectReason::Refused);
}
