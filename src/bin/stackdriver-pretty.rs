use std::io::ErrorKind;

use stackdriver_log::pretty::PrettyFormatter;
use tokio::io::BufReader;

/// Reads Cloud Logging JSON lines on stdin and writes them to stdout in a
/// human-readable form.
///
/// ```text
/// my-service | stackdriver-pretty
/// ```
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    if let Err(e) = PrettyFormatter::new().run(stdin, stdout).await {
        if e.kind() == ErrorKind::BrokenPipe {
            return;
        }
        eprintln!("stackdriver-pretty: {}", e);
        std::process::exit(1);
    }
}
