#![cfg(feature = "pretty")]

use chrono::FixedOffset;
use regex::Regex;
use stackdriver_log::pretty::PrettyFormatter;
use stackdriver_log::{fields, Clock, ErrorRecord, Level, Logger, Operation, ServiceContext};

fn strip_ansi(s: &str) -> String {
    Regex::new("\x1b\\[[0-9;]*m").unwrap().replace_all(s, "").into_owned()
}

fn logger() -> Logger {
    Logger::builder()
        .level(Level::Trace)
        .service_context(ServiceContext::new("orders", "2.1.0"))
        .clock(Clock::Fixed(1536248050595))
        .writer(std::io::sink)
        .build()
        .unwrap()
}

fn formatter() -> PrettyFormatter {
    PrettyFormatter::new().with_offset(FixedOffset::east_opt(0).unwrap())
}

#[test]
fn message_and_label_survive_a_round_trip() {
    let log = logger();
    for level in Level::ALL {
        let message = format!("a \"quoted\" message at {}", level.name());
        let line = log.render(level, message.as_str()).unwrap();
        let pretty = strip_ansi(&formatter().format_line(line.trim_end()));
        assert_eq!(
            pretty,
            format!(
                "[2018-09-06T15:34:10+00:00] {} {}\n",
                level.severity().label(),
                message
            )
        );
    }
}

#[test]
fn errors_render_with_stack_and_fields() {
    let err = ErrorRecord::new("TimeoutError", "upstream timed out").with_property("retryable", true);
    let line = logger()
        .render(Level::Error, (fields! { "orderId" => 42 }.with_error(err), "could not reserve stock"))
        .unwrap();

    assert_eq!(
        strip_ansi(&formatter().format_line(line.trim_end())),
        "[2018-09-06T15:34:10+00:00] ERROR could not reserve stock\n\
         \x20   stack: TimeoutError: upstream timed out\n\
         \x20   orderId: 42\n\
         \x20   retryable: true\n"
    );
}

#[test]
fn operations_render_as_annotations() {
    let op = logger().operation(Operation::new("100", "se.example.test"));
    let line = op
        .render(Level::Info, (fields! { "first" => true }, "Start of operation"))
        .unwrap();
    assert_eq!(
        strip_ansi(&formatter().format_line(line.trim_end())),
        "[2018-09-06T15:34:10+00:00] INFO (se.example.test:100 first) Start of operation\n"
    );
}

#[tokio::test]
async fn pipe_of_mixed_lines() {
    let log = logger();
    let mut input = String::new();
    input.push_str("starting up\n");
    input.push_str(&log.render(Level::Info, "ready").unwrap());
    input.push_str("{\"message\":\"no severity\"}\n");
    input.push_str(&log.render(Level::Warn, "slow").unwrap());

    let mut output = Vec::new();
    formatter().run(input.as_bytes(), &mut output).await.unwrap();

    assert_eq!(
        strip_ansi(&String::from_utf8(output).unwrap()),
        "starting up\n\
         [2018-09-06T15:34:10+00:00] INFO ready\n\
         {\"message\":\"no severity\"}\n\
         [2018-09-06T15:34:10+00:00] WARNING slow\n"
    );
}
