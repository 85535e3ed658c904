use std::fmt::Write;

use chrono::Local;
use pingwatch_core::HostStatistics;

/// Render one block per host, in the order given.
pub fn render(stats: &[HostStatistics]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Ping Monitor  ({})", Local::now().format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "══════════════════════════════════════════");

    if stats.is_empty() {
        let _ = writeln!(out, "  No hosts are being monitored.");
        return out;
    }

    for s in stats {
        let _ = writeln!(out, "  Host:            {}", s.host);
        let _ = writeln!(out, "  Status:          {}", s.status);
        let _ = writeln!(out, "  Last latency:    {}", latency(s.last_latency_ms));
        let _ = writeln!(out, "  Mean latency:    {:.2} ms", s.mean_latency_ms);
        let _ = writeln!(
            out,
            "  Min/Max:         {:.2} / {:.2} ms",
            s.min_latency_ms, s.max_latency_ms
        );
        let _ = writeln!(out, "  Total failures:  {}", s.failure_count);
        let _ = writeln!(out, "  Time in failure: {:.1} s", s.total_failure_secs);
        let last_failure = s
            .last_failure_at
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(out, "  Last failure:    {}", last_failure);
        let _ = writeln!(out, "──────────────────────────────────────────");
    }
    out
}

fn latency(ms: Option<f64>) -> String {
    match ms {
        Some(ms) => format!("{:.2} ms", ms),
        None => "-".to_string(),
    }
}

/// Clear the terminal and move the cursor home.
pub fn clear_screen() {
    print!("\x1B[2J\x1B[H");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pingwatch_core::{HostMonitor, ProbeStatus};

    #[test]
    fn test_render_fresh_host() {
        let stats = vec![HostMonitor::new("8.8.8.8").statistics()];
        let text = render(&stats);
        assert!(text.contains("Host:            8.8.8.8"));
        assert!(text.contains("Status:          starting"));
        assert!(text.contains("Last latency:    -"));
        assert!(text.contains("Last failure:    -"));
    }

    #[test]
    fn test_render_failing_host() {
        let mut monitor = HostMonitor::new("db.internal");
        monitor.record_result(Some(20.0), ProbeStatus::Success, chrono::Utc::now());
        monitor.record_result(None, ProbeStatus::Timeout, chrono::Utc::now());
        let text = render(&[monitor.statistics()]);

        assert!(text.contains("Status:          timeout"));
        assert!(text.contains("Mean latency:    20.00 ms"));
        assert!(text.contains("Total failures:  1"));
        assert!(!text.contains("Last failure:    -"));
    }

    #[test]
    fn test_render_empty() {
        assert!(render(&[]).contains("No hosts are being monitored."));
    }
}
