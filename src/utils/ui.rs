use crate::result::{SessionSummary, WindowResult};

const RULE: &str = "-------------------------------";

pub fn print_window(result: &WindowResult) {
    println!("{}", window_report(result));
}

pub fn print_summary(summary: &SessionSummary) {
    println!("{}", final_report(summary));
}

pub fn window_report(result: &WindowResult) -> String {
    format!(
        "Summary over the last {} seconds:\n  Sent packets: {}\n  Received packets: {}\n  Packet loss rate: {}\n  Bandwidth throughput: {}\n  Average latency: {}\n{}",
        result.window.as_secs(),
        result.sent,
        result.received,
        or_na(result.loss_percent, "%"),
        or_na(result.bandwidth_mib, " MiB/sec"),
        or_na(result.avg_latency_ms, " ms"),
        RULE
    )
}

pub fn final_report(summary: &SessionSummary) -> String {
    format!(
        "Total Summary ({:.2}s):\n  Total sent packets: {}\n  Total received packets: {}\n  Total received bytes: {}\n  Total packet loss rate: {}\n  Total bandwidth throughput: {}\n  Total average latency: {}\n{}",
        summary.elapsed.as_secs_f64(),
        summary.total_sent,
        summary.total_received,
        summary.total_received_bytes,
        or_na(summary.loss_percent, "%"),
        or_na(summary.bandwidth_mib, " MiB/sec"),
        or_na(summary.avg_latency_ms, " ms"),
        RULE
    )
}

// statistics with an empty denominator print as n/a
fn or_na(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.2}{}", v, unit),
        None => "n/a".to_string(),
    }
}
