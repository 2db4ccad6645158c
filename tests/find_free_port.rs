// tests/find_free_port.rs

mod common;
use crate::common::init_tracing;

use runwatch::debug::{find_free_port, PORT_PROBE_ATTEMPTS};
use runwatch::errors::RunwatchError;
use tokio::net::TcpListener;

/// Bind and hold `count` consecutive ports starting at `base`, returning
/// the guards. Picks a different base if the range is not entirely free.
async fn occupy_range(count: u16) -> (u16, Vec<TcpListener>) {
    'bases: for base in [47613u16, 48731, 49417, 50923, 51531] {
        let mut held = Vec::new();
        for offset in 0..count {
            match TcpListener::bind(("127.0.0.1", base + offset)).await {
                Ok(listener) => held.push(listener),
                Err(_) => continue 'bases,
            }
        }
        return (base, held);
    }
    panic!("no contiguous port range available for the test");
}

#[tokio::test]
async fn skips_occupied_ports() {
    init_tracing();

    // Occupy base..=base+5, then release base+5 so it is provably free.
    let (base, mut held) = occupy_range(6).await;
    drop(held.pop());

    // Ports base..base+4 are taken; base+5 is the first free one.
    let port = find_free_port(base).await.expect("a free port");
    assert_eq!(port, base + 5);
}

#[tokio::test]
async fn returns_base_when_free() {
    init_tracing();

    let (base, held) = occupy_range(1).await;
    drop(held);

    let port = find_free_port(base).await.expect("a free port");
    assert_eq!(port, base);
}

#[tokio::test]
async fn exhausts_after_twenty_attempts() {
    init_tracing();

    let (base, _held) = occupy_range(PORT_PROBE_ATTEMPTS).await;

    let err = find_free_port(base).await.expect_err("range is full");
    match err {
        RunwatchError::ResourceExhausted {
            base: b, attempts, ..
        } => {
            assert_eq!(b, base);
            assert_eq!(attempts, u32::from(PORT_PROBE_ATTEMPTS));
        }
        other => panic!("expected ResourceExhausted, got {other:?}"),
    }
}
