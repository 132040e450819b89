// tests/poller.rs

mod common;
use crate::common::with_timeout;

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use trainwatch::poll::{Poller, Tick};

#[tokio::test]
async fn first_tick_is_immediate_then_periodic() {
    let mut poller = Poller::new(Duration::from_millis(100));
    let start = Instant::now();

    assert_eq!(poller.tick().await, Tick::Due);
    assert!(start.elapsed() < Duration::from_millis(50));

    assert_eq!(poller.tick().await, Tick::Due);
    assert!(start.elapsed() >= Duration::from_millis(90));
}

#[tokio::test]
async fn deadline_interrupts_a_long_interval() {
    let mut poller = Poller::new(Duration::from_secs(30)).with_deadline(Duration::from_millis(150));

    assert_eq!(poller.tick().await, Tick::Due);
    let start = Instant::now();
    assert_eq!(with_timeout(poller.tick()).await, Tick::DeadlineReached);
    assert!(start.elapsed() < Duration::from_secs(2));

    // Stays reached.
    assert_eq!(poller.tick().await, Tick::DeadlineReached);
}

#[tokio::test]
async fn cancellation_wins_over_due_ticks() {
    let token = CancellationToken::new();
    let mut poller = Poller::new(Duration::from_secs(30)).with_cancel(token.clone());

    assert_eq!(poller.tick().await, Tick::Due);

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    assert_eq!(with_timeout(poller.tick()).await, Tick::Cancelled);
    assert_eq!(poller.tick().await, Tick::Cancelled);
}

#[tokio::test]
async fn unrepresentable_deadline_means_no_deadline() {
    let mut poller = Poller::new(Duration::from_millis(20)).with_deadline(Duration::MAX);

    assert_eq!(poller.tick().await, Tick::Due);
    assert_eq!(with_timeout(poller.tick()).await, Tick::Due);
}

#[tokio::test]
async fn huge_period_still_ticks_immediately() {
    let mut poller = Poller::new(Duration::MAX);
    assert_eq!(with_timeout(poller.tick()).await, Tick::Due);
}
