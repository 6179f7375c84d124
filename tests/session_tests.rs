//! Session flows between two in-process peers

use tetris_battle::core::{EngineConfig, GameEngine};
use tetris_battle::sync::{
    BattleConfig, ConnectionState, DisconnectReason, Packet, PacketBody, Role, SessionEvent, StateSummary,
    SyncSession,
};
use tetris_battle::types::{BattleEffect, GameMode};

fn seed_42() -> u64 {
    42
}

fn seed_99() -> u64 {
    99
}

fn no_seed() -> u64 {
    panic!("only the server generates seeds")
}

fn deliver(from: &mut SyncSession, to: &mut SyncSession, now: u64) -> Vec<SessionEvent> {
    from.drain_outbox()
        .into_iter()
        .flat_map(|packet| to.handle_packet(packet, now))
        .collect()
}

fn connected_pair() -> (SyncSession, SyncSession) {
    let config = |name: &str| BattleConfig {
        player_name: name.to_string(),
        ..BattleConfig::default()
    };
    let mut server = SyncSession::new(config("alice")).with_seed_source(seed_42);
    let mut client = SyncSession::new(config("bob")).with_seed_source(no_seed);
    assert!(server.choose_role(Role::Server, 0));
    assert!(client.choose_role(Role::Client, 0));
    assert_eq!(server.state(), ConnectionState::ServerWaiting);
    assert_eq!(client.state(), ConnectionState::ClientConnecting);

    server.on_connected(None, 10);
    client.on_connected(Some("127.0.0.1:7788".parse().unwrap()), 10);
    deliver(&mut server, &mut client, 11);
    deliver(&mut client, &mut server, 11);
    (server, client)
}

fn playing_pair(mode: GameMode) -> (SyncSession, SyncSession) {
    let (mut server, mut client) = connected_pair();
    server.select_mode(mode, 20);
    deliver(&mut server, &mut client, 21);
    client.set_ready(22);
    server.set_ready(22);
    deliver(&mut client, &mut server, 23);
    deliver(&mut server, &mut client, 23);
    (server, client)
}

#[test]
fn test_only_the_server_picks_the_mode() {
    let (mut server, mut client) = connected_pair();
    assert!(!client.select_mode(GameMode::Item, 20));
    assert!(server.select_mode(GameMode::TimeAttack, 20));

    let events = deliver(&mut server, &mut client, 21);
    assert_eq!(events, vec![SessionEvent::ModeSelected(GameMode::TimeAttack)]);
    assert_eq!(client.state(), ConnectionState::ReadyWaiting);
}

#[test]
fn test_both_peers_deal_the_same_first_pieces() {
    let (server, client) = playing_pair(GameMode::Item);
    assert_eq!(server.seed(), Some(42));
    assert_eq!(client.seed(), Some(42));
    assert_eq!(client.mode(), GameMode::Item);

    let mut mine = GameEngine::new(server.seed().unwrap(), EngineConfig::battle(server.mode()));
    let mut theirs = GameEngine::new(client.seed().unwrap(), EngineConfig::battle(client.mode()));
    mine.start();
    theirs.start();
    assert_eq!(mine.snapshot().upcoming, theirs.snapshot().upcoming);
    for _ in 0..5 {
        assert_eq!(mine.active(), theirs.active());
        mine.hard_drop();
        theirs.hard_drop();
    }
}

#[test]
fn test_match_waits_for_both_ready() {
    let (mut server, mut client) = connected_pair();
    server.select_mode(GameMode::Normal, 20);
    deliver(&mut server, &mut client, 21);

    assert!(server.set_ready(22).is_empty());
    let events = deliver(&mut server, &mut client, 23);
    assert_eq!(events, vec![SessionEvent::PeerReady]);
    assert_eq!(client.state(), ConnectionState::ReadyWaiting);

    client.set_ready(24);
    let events = deliver(&mut client, &mut server, 25);
    assert_eq!(
        events,
        vec![
            SessionEvent::PeerReady,
            SessionEvent::MatchStarted {
                seed: 42,
                mode: GameMode::Normal
            }
        ]
    );
}

#[test]
fn test_state_summaries_follow_the_cadence() {
    let (mut server, mut client) = playing_pair(GameMode::Normal);
    server.drain_outbox();

    let summary = StateSummary {
        score: 300,
        ..StateSummary::default()
    };
    assert!(server.publish_state(summary.clone(), 100, false));
    assert!(!server.publish_state(summary.clone(), 200, false));
    assert!(server.publish_state(summary.clone(), 200, true));
    assert!(!server.publish_state(summary.clone(), 350, false));
    assert!(server.publish_state(summary, 450, false));

    let events = deliver(&mut server, &mut client, 460);
    assert_eq!(events, vec![SessionEvent::OpponentUpdated; 3]);
    assert_eq!(client.opponent().summary.score, 300);
    assert_eq!(client.opponent().updated_ms, Some(460));
}

#[test]
fn test_opponent_game_over_is_reported() {
    let (mut server, mut client) = playing_pair(GameMode::Normal);
    server.drain_outbox();

    assert!(client.note_local_game_over(100));
    assert_eq!(client.state(), ConnectionState::GameOverLocal);
    client.publish_state(
        StateSummary {
            game_over: true,
            ..StateSummary::default()
        },
        100,
        true,
    );

    let events = deliver(&mut client, &mut server, 101);
    assert!(events.contains(&SessionEvent::OpponentGameOver));
    assert_eq!(server.state(), ConnectionState::GameOverRemote);
    assert!(!server.match_finished());

    server.note_local_game_over(200);
    assert!(server.match_finished());
}

#[test]
fn test_effects_reach_the_opponent() {
    let (mut server, mut client) = playing_pair(GameMode::Item);
    server.drain_outbox();

    let stop = BattleEffect::TimeStop { duration_ms: 5000 };
    assert!(server.queue_effect(stop, 50));
    let events = deliver(&mut server, &mut client, 51);
    assert_eq!(events, vec![SessionEvent::EffectReceived(stop)]);
}

#[test]
fn test_effects_after_local_game_over_are_dropped() {
    let (mut server, mut client) = playing_pair(GameMode::Item);
    server.drain_outbox();
    client.note_local_game_over(40);

    server.queue_effect(BattleEffect::TimeStop { duration_ms: 5000 }, 50);
    assert!(deliver(&mut server, &mut client, 51).is_empty());
}

#[test]
fn test_out_of_state_packets_are_ignored() {
    let (mut server, mut client) = connected_pair();
    let early = Packet::new(99, 0, PacketBody::GameState(StateSummary::default()));
    assert!(server.handle_packet(early, 12).is_empty());
    assert_eq!(server.state(), ConnectionState::ModeSelect);

    // Only the server may start a match
    let start = Packet::new(
        100,
        0,
        PacketBody::GameStart {
            seed: 1,
            mode: GameMode::Normal.into(),
        },
    );
    assert!(server.handle_packet(start, 12).is_empty());
    assert_eq!(server.seed(), None);
    assert!(client.is_connected());
}

#[test]
fn test_disconnect_while_playing() {
    let (mut server, mut client) = playing_pair(GameMode::Normal);
    server.drain_outbox();

    assert!(client.disconnect(500));
    assert_eq!(client.state(), ConnectionState::Disconnected(DisconnectReason::Quit));
    let events = deliver(&mut client, &mut server, 501);
    assert_eq!(events, vec![SessionEvent::Disconnected(DisconnectReason::Quit)]);

    // Later packets and a second hangup change nothing
    assert!(server.handle_link_closed(DisconnectReason::Unknown, 502).is_empty());
    assert_eq!(server.state(), ConnectionState::Disconnected(DisconnectReason::Quit));
}

#[test]
fn test_link_loss_is_a_disconnect() {
    let (mut server, _client) = playing_pair(GameMode::Normal);
    let events = server.handle_link_closed(DisconnectReason::Unknown, 300);
    assert_eq!(events, vec![SessionEvent::Disconnected(DisconnectReason::Unknown)]);
    assert!(!server.is_connected());
}

#[test]
fn test_restart_deals_a_new_seed() {
    let (server, mut client) = playing_pair(GameMode::Item);
    let mut server = server.with_seed_source(seed_99);
    server.drain_outbox();

    server.request_restart(1000);
    let events = deliver(&mut server, &mut client, 1001);
    assert_eq!(events, vec![SessionEvent::RestartRequested]);
    assert_eq!(client.seed(), Some(42), "one side alone cannot restart");

    client.request_restart(1002);
    deliver(&mut client, &mut server, 1003);
    let events = deliver(&mut server, &mut client, 1004);
    assert!(events.contains(&SessionEvent::MatchStarted {
        seed: 99,
        mode: GameMode::Item
    }));
    assert_eq!(server.seed(), Some(99));
    assert_eq!(client.seed(), Some(99));
    assert_eq!(client.state(), ConnectionState::Playing);
}

#[test]
fn test_old_match_summaries_stay_out_after_restart() {
    let (mut server, mut client) = playing_pair(GameMode::Normal);
    server.drain_outbox();

    let topped_out = StateSummary {
        game_over: true,
        ..StateSummary::default()
    };
    assert!(client.publish_state(topped_out.clone(), 500, true));
    let late = client.drain_outbox();

    client.request_restart(510);
    assert!(!client.state_due(800));
    assert!(!client.publish_state(topped_out, 800, true));
    deliver(&mut client, &mut server, 520);
    assert_eq!(
        server.request_restart(530),
        vec![SessionEvent::MatchStarted {
            seed: 42,
            mode: GameMode::Normal
        }]
    );
    deliver(&mut server, &mut client, 531);
    assert_eq!(client.state(), ConnectionState::Playing);

    // A summary of the finished match turning up after the restart is stale
    let events: Vec<_> = late.into_iter().flat_map(|p| server.handle_packet(p, 540)).collect();
    assert!(events.is_empty());
    assert!(!server.opponent().is_game_over());
    assert_eq!(server.state(), ConnectionState::Playing);

    assert!(client.publish_state(StateSummary::default(), 600, true));
    let events = deliver(&mut client, &mut server, 601);
    assert_eq!(events, vec![SessionEvent::OpponentUpdated]);
}

#[test]
fn test_connect_attempt_times_out() {
    let mut client = SyncSession::new(BattleConfig {
        connect_timeout_ms: 1000,
        ..BattleConfig::default()
    });
    client.choose_role(Role::Client, 0);
    assert!(client.poll(999).is_empty());
    assert_eq!(
        client.poll(1000),
        vec![SessionEvent::Disconnected(DisconnectReason::Timeout)]
    );
}

#[test]
fn test_ready_wait_is_bounded() {
    let (mut server, _client) = connected_pair();
    server.select_mode(GameMode::Normal, 20);
    let config = server.config().clone();

    // Keep the peer alive by answering every ping, but never declare ready
    let mut now = 20;
    let mut seq = 100;
    while now < 20 + config.ready_timeout_ms - 1000 {
        now += 1000;
        assert!(server.poll(now).is_empty());
        for packet in server.drain_outbox() {
            if let PacketBody::Ping { nonce, sent_ms } = packet.body {
                seq += 1;
                server.handle_packet(Packet::new(seq, now, PacketBody::Pong { nonce, sent_ms }), now);
            }
        }
    }
    let events = server.poll(20 + config.ready_timeout_ms);
    assert_eq!(events, vec![SessionEvent::Disconnected(DisconnectReason::Timeout)]);
}

#[test]
fn test_reconnect_after_drop() {
    let (_server, mut client) = connected_pair();
    client.handle_link_closed(DisconnectReason::Unknown, 50);
    let target = client.reconnect_target();
    assert_eq!(target, Some("127.0.0.1:7788".parse().unwrap()));

    assert!(client.choose_role(Role::Client, 60));
    assert_eq!(client.state(), ConnectionState::ClientConnecting);
    assert_eq!(client.reconnect_target(), None);
}

#[test]
fn test_chat_passes_through() {
    let (mut server, mut client) = connected_pair();
    assert!(client.send_chat("gl hf", 30));
    let events = deliver(&mut client, &mut server, 31);
    assert_eq!(events, vec![SessionEvent::Chat("gl hf".to_string())]);
}
