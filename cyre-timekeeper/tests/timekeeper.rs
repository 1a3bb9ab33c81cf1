use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cyre_core::{DurationMs, Repeat};
use cyre_timekeeper::{Status, TimeKeeper};

fn counting_tick(counter: Arc<AtomicU64>) -> cyre_timekeeper::TickFn {
    Arc::new(move || {
        let counter = Arc::clone(&counter);
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    })
}

#[tokio::test(start_paused = true)]
async fn immediate_first_tick_runs_without_waiting() {
    let keeper = TimeKeeper::new();
    let counter = Arc::new(AtomicU64::new(0));

    keeper
        .keep(
            "immediate",
            DurationMs::ZERO,
            DurationMs::from_millis(1000),
            Repeat::Times(1),
            counting_tick(Arc::clone(&counter)),
            None,
        )
        .unwrap();

    tokio::task::yield_now().await;
    tokio::time::advance(Duration::from_millis(1)).await;
    tokio::task::yield_now().await;

    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn formation_completes_after_repeat_count() {
    let keeper = TimeKeeper::new();
    let counter = Arc::new(AtomicU64::new(0));

    let handle = keeper
        .keep(
            "finite",
            DurationMs::ZERO,
            DurationMs::from_millis(10),
            Repeat::Times(3),
            counting_tick(Arc::clone(&counter)),
            None,
        )
        .unwrap();

    for _ in 0..3 {
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(10)).await;
    }
    tokio::task::yield_now().await;

    assert_eq!(counter.load(Ordering::SeqCst), 3);
    assert_eq!(handle.state.status(), Status::Completed);
}

#[tokio::test(start_paused = true)]
async fn zero_repeat_is_rejected() {
    let keeper = TimeKeeper::new();
    let err = keeper
        .keep(
            "bad",
            DurationMs::ZERO,
            DurationMs::from_millis(10),
            Repeat::Times(0),
            counting_tick(Arc::new(AtomicU64::new(0))),
            None,
        )
        .unwrap_err();
    assert_eq!(err, cyre_core::TimeKeeperError::ZeroRepeat);
}

#[tokio::test(start_paused = true)]
async fn pause_suspends_ticking_and_resume_continues() {
    let keeper = TimeKeeper::new();
    let counter = Arc::new(AtomicU64::new(0));

    keeper
        .keep(
            "pausable",
            DurationMs::ZERO,
            DurationMs::from_millis(10),
            Repeat::Forever,
            counting_tick(Arc::clone(&counter)),
            None,
        )
        .unwrap();

    tokio::task::yield_now().await;
    tokio::time::advance(Duration::from_millis(1)).await;
    tokio::task::yield_now().await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    keeper.pause(Some("pausable"));
    tokio::time::advance(Duration::from_secs(5)).await;
    tokio::task::yield_now().await;
    assert_eq!(counter.load(Ordering::SeqCst), 1, "no ticks while paused");

    keeper.resume(Some("pausable"));
    tokio::task::yield_now().await;
    tokio::time::advance(Duration::from_millis(10)).await;
    tokio::task::yield_now().await;
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn forget_aborts_the_formation() {
    let keeper = TimeKeeper::new();
    let counter = Arc::new(AtomicU64::new(0));

    keeper
        .keep(
            "cancel-me",
            DurationMs::ZERO,
            DurationMs::from_millis(10),
            Repeat::Forever,
            counting_tick(Arc::clone(&counter)),
            None,
        )
        .unwrap();

    tokio::task::yield_now().await;
    tokio::time::advance(Duration::from_millis(1)).await;
    tokio::task::yield_now().await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    assert!(keeper.forget("cancel-me"));
    assert!(!keeper.forget("cancel-me"), "second forget is a no-op");

    tokio::time::advance(Duration::from_secs(5)).await;
    tokio::task::yield_now().await;
    assert_eq!(counter.load(Ordering::SeqCst), 1, "no further ticks after forget");
}

#[tokio::test(start_paused = true)]
async fn breathing_stress_lengthens_but_never_shortens_the_interval() {
    let keeper = TimeKeeper::new();
    let counter = Arc::new(AtomicU64::new(0));
    let stress: cyre_timekeeper::StressFn = Arc::new(|| 1.0);

    keeper
        .keep(
            "stressed",
            DurationMs::ZERO,
            DurationMs::from_millis(10),
            Repeat::Times(2),
            counting_tick(Arc::clone(&counter)),
            Some(stress),
        )
        .unwrap();

    tokio::task::yield_now().await;
    tokio::time::advance(Duration::from_millis(1)).await;
    tokio::task::yield_now().await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    // stress=1.0 doubles the 10ms interval to 20ms; it must not have
    // fired yet at the unscaled 10ms mark.
    tokio::time::advance(Duration::from_millis(10)).await;
    tokio::task::yield_now().await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    tokio::time::advance(Duration::from_millis(10)).await;
    tokio::task::yield_now().await;
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}
