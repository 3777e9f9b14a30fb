use super::support::{ScriptedOperation, Step, invoke};
use stability_breaker::{Breaker, BreakerLayer};
use std::time::Duration;
use tokio::time::advance;
use tower::Layer;

const MS: Duration = Duration::from_millis(1);

/// With threshold zero a single failure gates for exactly one second
#[tokio::test(start_paused = true)]
async fn cooldown_expires_after_one_second() {
    let op = ScriptedOperation::always_failing();
    let mut breaker = Breaker::new(op.clone(), 0);

    let _ = invoke(&mut breaker).await;

    advance(Duration::from_secs(1) - MS).await;
    assert!(invoke(&mut breaker).await.unwrap_err().is_gated());
    assert_eq!(op.calls(), 1);

    advance(2 * MS).await;
    let err = invoke(&mut breaker).await.unwrap_err();
    assert!(!err.is_gated(), "probe should reach the operation");
    assert_eq!(op.calls(), 2);
}

/// After k failures with threshold zero the window is 2^(k-1) seconds
#[tokio::test(start_paused = true)]
async fn window_doubles_with_each_failed_probe() {
    let op = ScriptedOperation::always_failing();
    let mut breaker = Breaker::new(op.clone(), 0);

    let _ = invoke(&mut breaker).await;

    for k in 1..=6u32 {
        let window = Duration::from_secs(1 << (k - 1));
        assert_eq!(breaker.snapshot().await.retry_after(), Some(window));

        advance(window - MS).await;
        assert!(invoke(&mut breaker).await.unwrap_err().is_gated(), "k={k}");

        advance(2 * MS).await;
        assert!(!invoke(&mut breaker).await.unwrap_err().is_gated(), "k={k}");
        assert_eq!(op.calls(), k as usize + 1);
    }
}

/// Threshold five, six failures one second apart, then probes around the window
///
/// The gate engages only once the streak exceeds the threshold, so the first
/// window is one second rather than the two seconds a streak-minus-threshold
/// exponent would give. The sixth failure is the first one past the
/// threshold and opens a one second window; the failed probe after it
/// doubles the window to two seconds.
#[tokio::test(start_paused = true)]
async fn threshold_five_streak_scenario() {
    let op = ScriptedOperation::always_failing();
    let mut breaker = Breaker::new(op.clone(), 5);

    for i in 0..6 {
        if i > 0 {
            advance(Duration::from_secs(1)).await;
        }
        assert!(!invoke(&mut breaker).await.unwrap_err().is_gated());
    }
    let t5 = breaker.snapshot().await.last_attempt;
    assert_eq!(breaker.snapshot().await.consecutive_failures, 6);

    advance(Duration::from_millis(900)).await;
    assert!(invoke(&mut breaker).await.unwrap_err().is_gated());

    advance(Duration::from_millis(200)).await;
    assert!(!invoke(&mut breaker).await.unwrap_err().is_gated());
    assert_eq!(op.calls(), 7);

    let probe = breaker.snapshot().await;
    assert_eq!(probe.last_attempt, t5 + Duration::from_millis(1_100));
    assert_eq!(probe.retry_after(), Some(Duration::from_secs(2)));

    advance(Duration::from_millis(1_900)).await;
    assert!(invoke(&mut breaker).await.unwrap_err().is_gated());

    advance(Duration::from_millis(200)).await;
    assert!(!invoke(&mut breaker).await.unwrap_err().is_gated());
    assert_eq!(op.calls(), 8);
}

/// The gated error reports the time left in the window
#[tokio::test(start_paused = true)]
async fn gated_error_reports_retry_after() {
    let op = ScriptedOperation::always_failing();
    let mut breaker = Breaker::new(op, 0);

    let _ = invoke(&mut breaker).await;
    advance(Duration::from_millis(1_001)).await;
    let _ = invoke(&mut breaker).await;

    advance(Duration::from_millis(500)).await;
    match invoke(&mut breaker).await.unwrap_err() {
        super::support::OpError::Unreachable(err) => {
            assert_eq!(err.to_string(), "service unreachable");
            assert_eq!(err.retry_after(), Some(Duration::from_millis(1_500)));
        }
        other => panic!("expected gated error, got {other:?}"),
    }
}

/// Base cooldown and cap from the builder shape the window
#[tokio::test(start_paused = true)]
async fn configured_base_and_cap() {
    let op = ScriptedOperation::always_failing();
    let mut breaker = BreakerLayer::builder()
        .failure_threshold(1)
        .base_cooldown(Duration::from_millis(100))
        .max_cooldown(Duration::from_millis(400))
        .name("capped")
        .build()
        .layer(op.clone());

    let mut expected = [100u64, 200, 400, 400, 400].into_iter();
    let _ = invoke(&mut breaker).await;
    let _ = invoke(&mut breaker).await;

    loop {
        let Some(window) = breaker.snapshot().await.retry_after() else {
            panic!("breaker should be gated");
        };
        let Some(want) = expected.next() else { break };
        assert_eq!(window, Duration::from_millis(want));

        advance(window + MS).await;
        let _ = invoke(&mut breaker).await;
    }

    assert_eq!(op.calls(), 7);
}

/// A small base keeps growing finite windows well past 32 doublings
#[tokio::test(start_paused = true)]
async fn small_base_window_reopens_after_many_failures() {
    let op = ScriptedOperation::always_failing();
    let mut breaker = BreakerLayer::builder()
        .failure_threshold(0)
        .base_cooldown(MS)
        .build()
        .layer(op.clone());

    for k in 1..=33u32 {
        assert!(!invoke(&mut breaker).await.unwrap_err().is_gated(), "k={k}");
        let window = Duration::from_millis(1 << (k - 1));
        assert_eq!(breaker.snapshot().await.retry_after(), Some(window), "k={k}");
        advance(window + MS).await;
    }

    let snapshot = breaker.snapshot().await;
    assert_eq!(snapshot.consecutive_failures, 33);
    assert!(!snapshot.is_gated());

    op.push([Step::Succeed]);
    assert_eq!(invoke(&mut breaker).await.unwrap(), "success #34");
    assert_eq!(breaker.consecutive_failures().await, 0);
}

/// Without a cap, a window ending past the clock's range gates until a success
#[tokio::test(start_paused = true)]
async fn unbounded_window_gates_indefinitely() {
    let op = ScriptedOperation::always_failing();
    let mut breaker = BreakerLayer::builder()
        .failure_threshold(0)
        .base_cooldown(Duration::MAX)
        .build()
        .layer(op.clone());

    let err = invoke(&mut breaker).await.unwrap_err();
    assert!(!err.is_gated());

    let snapshot = breaker.snapshot().await;
    assert!(snapshot.is_gated());
    assert_eq!(snapshot.retry_after(), None);

    advance(Duration::from_secs(86_400 * 365)).await;
    assert!(invoke(&mut breaker).await.unwrap_err().is_gated());
    assert_eq!(op.calls(), 1);

    // Nothing else can clear it; the script never gets another turn
    op.push([Step::Succeed]);
    assert!(invoke(&mut breaker).await.unwrap_err().is_gated());
}
