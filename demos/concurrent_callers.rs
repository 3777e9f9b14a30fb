//! Fires concurrent callers at a breaker guarding a coin-flip handler.
//!
//! Run with: cargo run --example concurrent_callers [threshold] [callers]
//! With gate logs: RUST_LOG=trace cargo run --example concurrent_callers --features tracing

use rand::Rng;
use stability_breaker::BreakerLayer;
use tower::{BoxError, Layer, Service, ServiceExt, service_fn};

async fn handler(_ctx: ()) -> Result<String, BoxError> {
    let roll = rand::rng().random_range(1..10);
    if roll % 2 == 0 {
        Ok("success".to_string())
    } else {
        Err("fail".into())
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let threshold = args.next().and_then(|s| s.parse().ok()).unwrap_or(5u32);
    let callers = args.next().and_then(|s| s.parse().ok()).unwrap_or(100usize);

    let breaker = BreakerLayer::builder()
        .failure_threshold(threshold)
        .name("coin-flip")
        .build()
        .layer(service_fn(handler));

    let mut handles = Vec::with_capacity(callers);
    for _ in 0..callers {
        let mut breaker = breaker.clone();
        handles.push(tokio::spawn(async move {
            match breaker.ready().await {
                Ok(svc) => svc.call(()).await,
                Err(err) => Err(err),
            }
        }));
    }

    for handle in handles {
        match handle.await {
            Ok(Ok(result)) => println!("result = [{result}]"),
            Ok(Err(err)) => println!("error = [{err}]"),
            Err(join_err) => eprintln!("caller panicked: {join_err}"),
        }
    }

    let snapshot = breaker.snapshot().await;
    println!(
        "consecutive failures = {}, gated = {}",
        snapshot.consecutive_failures,
        snapshot.is_gated()
    );
}
