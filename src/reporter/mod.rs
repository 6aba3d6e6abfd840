use std::fmt::Write;
use std::time::Duration;

use crossterm::style::Stylize;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::pipeline::aggregator::AggregateResult;

/// JSON shape of a run's result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TripperResult {
    #[serde(rename = "dnsLookUp")]
    pub dns_lookup: String,
    #[serde(rename = "tcpConnect")]
    pub tcp_connect: String,
    #[serde(rename = "tlsHandshake")]
    pub tls_handshake: String,
    pub ttfb: String,
    pub took: String,
}

impl From<&AggregateResult> for TripperResult {
    fn from(result: &AggregateResult) -> Self {
        Self {
            dns_lookup: format_duration(result.dns_lookup),
            tcp_connect: format_duration(result.tcp_connect),
            tls_handshake: format_duration(result.tls_handshake),
            ttfb: format_duration(result.ttfb),
            took: format_duration(result.took),
        }
    }
}

/// Format a duration the way Go prints one: `0s`, `850ns`, `12.5µs`,
/// `1.234567ms`, `2.5s`, `1m3s`, `1h0m0s`.
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    match nanos {
        0 => "0s".to_string(),
        1..1_000 => format!("{nanos}ns"),
        1_000..1_000_000 => format!("{}µs", fraction(nanos, 1_000)),
        1_000_000..1_000_000_000 => format!("{}ms", fraction(nanos, 1_000_000)),
        _ => {
            let total_secs = d.as_secs();
            let hours = total_secs / 3600;
            let minutes = (total_secs % 3600) / 60;

            let mut out = String::new();
            if hours > 0 {
                let _ = write!(out, "{hours}h");
            }
            if hours > 0 || minutes > 0 {
                let _ = write!(out, "{minutes}m");
            }
            let _ = write!(out, "{}s", fraction(nanos % 60_000_000_000, 1_000_000_000));
            out
        }
    }
}

// `value / unit` with the remainder as trailing-zero-free decimals.
fn fraction(value: u128, unit: u128) -> String {
    let whole = value / unit;
    let rest = value % unit;
    if rest == 0 {
        return whole.to_string();
    }
    let width = unit.ilog10() as usize;
    let decimals = format!("{rest:0width$}");
    format!("{whole}.{}", decimals.trim_end_matches('0'))
}

fn to_fixed_width(input: &str, width: usize) -> String {
    use unicode_truncate::UnicodeTruncateStr;

    let (truncated, _) = input.unicode_truncate(width);
    format!("{:<width$}", truncated, width = width)
}

const LABEL_WIDTH: usize = 14;

/// Human readable report.
pub fn render_text(result: &AggregateResult, url: &str) -> String {
    let tr = TripperResult::from(result);
    let mut out = String::new();

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{} \t {}",
        "Check connection data for : ".green(),
        url.yellow()
    );
    let _ = writeln!(out);

    if result.is_empty() {
        let _ = writeln!(out, "{}", "No probe completed, nothing to average".red());
    } else {
        for (label, value) in [
            ("DNS lookup", &tr.dns_lookup),
            ("TCP connection", &tr.tcp_connect),
            ("TLS handshake", &tr.tls_handshake),
            ("ttfb", &tr.ttfb),
        ] {
            let _ = writeln!(out, "{} \t {}", to_fixed_width(label, LABEL_WIDTH), value);
        }
    }

    if result.failures > 0 {
        let _ = writeln!(
            out,
            "{} \t {}",
            to_fixed_width("Failed probes", LABEL_WIDTH),
            result.failures.to_string().red()
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Tripper took \t{}", tr.took.magenta());
    out
}

/// JSON report, indented with four spaces.
pub fn render_json(result: &AggregateResult) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    TripperResult::from(result).serialize(&mut serializer)?;
    // serde_json only ever writes valid UTF-8.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
