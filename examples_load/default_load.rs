use std::time::Instant;

use stackdriver_log::{fields, ErrorRecord, Logger, ServiceContext};

fn main() -> stackdriver_log::Result<()> {
    let logger = Logger::builder()
        .service_context(ServiceContext::new("default-load", "latest"))
        .writer(std::io::sink)
        .build()?;

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        let err = ErrorRecord::new("LoadError", "default load test error")
            .with_property("iteration", i);
        logger.error((fields! { "iteration" => i }.with_error(err), "default load test error"));
    }

    let elapsed = start.elapsed();
    println!(
        "default config: encoded {} records in {:?} (~{:.0} rec/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
    Ok(())
}
