//! Integration tests for the session server
//!
//! These tests run a real server on a loopback port and drive it with the
//! headless client over TCP.

use client::network::{Assignment, Client};
use server::config::ServerConfig;
use server::network::{Server, ServerHandle};
use shared::{read_packet, Direction, Packet};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

const STEP_TIMEOUT: Duration = Duration::from_secs(5);

async fn start_server() -> (SocketAddr, ServerHandle) {
    let server = Server::bind(ServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        ..ServerConfig::default()
    })
    .await
    .expect("Failed to bind server");

    let addr = server.local_addr().unwrap();
    let handle = server.handle();
    tokio::spawn(server.run());
    (addr, handle)
}

async fn within<F: Future>(future: F) -> F::Output {
    timeout(STEP_TIMEOUT, future)
        .await
        .expect("Timed out waiting for the server")
}

/// Connects and waits until the server has queued the connection.
async fn connect_queued(addr: SocketAddr) -> Client {
    let mut client = within(Client::connect(&addr.to_string())).await.unwrap();
    assert_eq!(within(client.next_packet()).await.unwrap(), Some(Packet::Waiting));
    client
}

async fn assignment(client: &mut Client) -> Assignment {
    within(client.wait_for_assignment()).await.unwrap()
}

async fn wait_for_no_sessions(handle: &ServerHandle) {
    within(async {
        while !handle.active_sessions().await.is_empty() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
}

/// PAIRING TESTS
mod pairing_tests {
    use super::*;

    #[tokio::test]
    async fn two_clients_pair_in_arrival_order() {
        let (addr, handle) = start_server().await;

        let mut first = connect_queued(addr).await;
        assert_eq!(handle.pending_count().await, 1);
        let mut second = connect_queued(addr).await;

        let a = assignment(&mut first).await;
        let b = assignment(&mut second).await;

        assert_eq!(a.session_id, b.session_id);
        assert_eq!(a.slot, 0);
        assert_eq!(b.slot, 1);
        assert_eq!(a.config, ServerConfig::default().game);

        let sessions = handle.active_sessions().await;
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].occupied, [true, true]);
        assert_eq!(handle.pending_count().await, 0);

        handle.shutdown();
    }

    #[tokio::test]
    async fn four_clients_form_two_sessions() {
        let (addr, handle) = start_server().await;

        let mut clients = Vec::new();
        for _ in 0..4 {
            clients.push(connect_queued(addr).await);
        }

        let mut assignments = Vec::new();
        for client in &mut clients {
            assignments.push(assignment(client).await);
        }

        assert_eq!(assignments[0].session_id, assignments[1].session_id);
        assert_eq!(assignments[2].session_id, assignments[3].session_id);
        assert_ne!(assignments[0].session_id, assignments[2].session_id);

        let slots: Vec<usize> = assignments.iter().map(|a| a.slot).collect();
        assert_eq!(slots, vec![0, 1, 0, 1]);

        assert_eq!(handle.active_sessions().await.len(), 2);
        handle.shutdown();
    }

    #[tokio::test]
    async fn odd_client_stays_pending() {
        let (addr, handle) = start_server().await;

        let mut first = connect_queued(addr).await;
        let mut second = connect_queued(addr).await;
        let _third = connect_queued(addr).await;

        assignment(&mut first).await;
        assignment(&mut second).await;

        assert_eq!(handle.pending_count().await, 1);
        assert_eq!(handle.active_sessions().await.len(), 1);
        handle.shutdown();
    }
}

/// GAMEPLAY TESTS
mod gameplay_tests {
    use super::*;

    #[tokio::test]
    async fn paddle_moves_are_reflected_in_snapshots() {
        let (addr, handle) = start_server().await;

        let mut first = connect_queued(addr).await;
        let mut second = connect_queued(addr).await;
        let config = assignment(&mut first).await.config;
        assignment(&mut second).await;

        let start = config.initial_paddle_position();
        let moved = start - config.paddle_step as i32;

        within(first.send_move(Direction::Up)).await.unwrap();
        within(second.send_move(Direction::Up)).await.unwrap();

        within(async {
            loop {
                let snapshot = first.next_snapshot().await.unwrap();
                for paddle in snapshot.paddles {
                    assert!(
                        paddle == start || paddle == moved,
                        "Unexpected paddle position {}",
                        paddle
                    );
                }
                if snapshot.paddles == [moved, moved] {
                    break;
                }
            }
        })
        .await;

        handle.shutdown();
    }

    #[tokio::test]
    async fn snapshot_ticks_increase() {
        let (addr, handle) = start_server().await;

        let mut first = connect_queued(addr).await;
        let mut second = connect_queued(addr).await;
        assignment(&mut first).await;
        assignment(&mut second).await;

        let mut last_tick = 0;
        for _ in 0..10 {
            let snapshot = within(first.next_snapshot()).await.unwrap();
            assert!(snapshot.tick > last_tick);
            last_tick = snapshot.tick;

            let config = ServerConfig::default().game;
            assert!(snapshot.ball.y >= 0.0);
            assert!(snapshot.ball.y <= (config.field_height - config.ball_size) as f32);
        }

        handle.shutdown();
    }
}

/// DISCONNECT AND ERROR HANDLING TESTS
mod disconnect_tests {
    use super::*;

    #[tokio::test]
    async fn remaining_player_is_told_to_wait() {
        let (addr, handle) = start_server().await;

        let mut first = connect_queued(addr).await;
        let mut second = connect_queued(addr).await;
        assignment(&mut first).await;
        assignment(&mut second).await;

        second.close().await.unwrap();

        within(async {
            loop {
                match first.next_packet().await.unwrap() {
                    Some(Packet::Waiting) => break,
                    Some(_) => continue,
                    None => panic!("Server closed the remaining player's connection"),
                }
            }
        })
        .await;

        let sessions = handle.active_sessions().await;
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].occupied, [true, false]);

        handle.shutdown();
    }

    #[tokio::test]
    async fn session_is_removed_after_both_players_leave() {
        let (addr, handle) = start_server().await;

        let mut first = connect_queued(addr).await;
        let mut second = connect_queued(addr).await;
        assignment(&mut first).await;
        assignment(&mut second).await;
        assert_eq!(handle.active_sessions().await.len(), 1);

        first.close().await.unwrap();
        second.close().await.unwrap();

        wait_for_no_sessions(&handle).await;
        handle.shutdown();
    }

    #[tokio::test]
    async fn garbage_only_disconnects_the_sender() {
        let (addr, handle) = start_server().await;

        // Session 1 with a misbehaving player in slot 1
        let mut honest = connect_queued(addr).await;
        let mut rogue = within(TcpStream::connect(addr)).await.unwrap();
        assert_eq!(
            within(read_packet(&mut rogue)).await.unwrap(),
            Some(Packet::Waiting)
        );
        assignment(&mut honest).await;

        // Session 2 is left alone
        let mut bystander_a = connect_queued(addr).await;
        let mut bystander_b = connect_queued(addr).await;
        let bystander_session = assignment(&mut bystander_a).await.session_id;
        assignment(&mut bystander_b).await;

        // Well-formed frame with an undecodable payload
        rogue
            .write_all(&[0, 0, 0, 4, 0xFF, 0xFF, 0xFF, 0xFF])
            .await
            .unwrap();

        within(async {
            loop {
                match read_packet(&mut rogue).await {
                    Ok(Some(_)) => continue,
                    Ok(None) | Err(_) => break,
                }
            }
        })
        .await;

        within(async {
            loop {
                if let Some(Packet::Waiting) = honest.next_packet().await.unwrap() {
                    break;
                }
            }
        })
        .await;

        let sessions = handle.active_sessions().await;
        let bystanders = sessions
            .iter()
            .find(|s| s.id == bystander_session)
            .expect("Unrelated session was removed");
        assert_eq!(bystanders.occupied, [true, true]);

        let before = within(bystander_a.next_snapshot()).await.unwrap().tick;
        let after = within(bystander_a.next_snapshot()).await.unwrap().tick;
        assert!(after > before);

        handle.shutdown();
    }

    #[tokio::test]
    async fn pending_peer_leaving_is_never_paired() {
        let (addr, handle) = start_server().await;

        let early = connect_queued(addr).await;
        early.close().await.unwrap();

        within(async {
            while handle.pending_count().await > 0 {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await;

        let mut first = connect_queued(addr).await;
        let mut second = connect_queued(addr).await;
        let a = assignment(&mut first).await;
        let b = assignment(&mut second).await;

        assert_eq!(a.session_id, b.session_id);
        assert_eq!((a.slot, b.slot), (0, 1));

        let sessions = handle.active_sessions().await;
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].occupied, [true, true]);

        let snapshot = within(first.next_snapshot()).await.unwrap();
        assert!(snapshot.tick > 0);

        handle.shutdown();
    }
}
