use std::time::Instant;

use stackdriver_log::{Clock, ServiceContext, StackdriverLayer};
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

fn main() {
    let layer = StackdriverLayer::new(Some(ServiceContext::new("custom-load", "latest")))
        .with_writer(std::io::sink)
        .with_clock(Clock::Fixed(0))
        .with_source_location(true);
    let subscriber = Registry::default().with(layer);

    let n: u64 = 100_000;
    let start = Instant::now();

    tracing::subscriber::with_default(subscriber, || {
        let span = tracing::info_span!("load", operation.id = "custom-load", worker = 1);
        let _guard = span.enter();
        for i in 0..n {
            error!(iteration = i, "custom load test error");
        }
    });

    let elapsed = start.elapsed();
    println!(
        "custom config: encoded {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
}
