//! Human-readable latency strings.
//!
//! Downstream consumers of access records parse `latency` with Go's
//! `time.ParseDuration`, so the format follows Go's `Duration.String()`:
//! `"0s"`, `"850ns"`, `"12.5µs"`, `"1.5ms"`, `"2.25s"`, `"1m30s"`, `"1h0m0.5s"`.

use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Format a duration the way Go's `time.Duration.String()` does.
pub fn format_duration(d: Duration) -> String {
    let ns = d.as_nanos();
    if ns == 0 {
        return "0s".to_string();
    }

    if ns < NANOS_PER_SEC {
        let (prec, unit) = if ns < 1_000 {
            (0, "ns")
        } else if ns < 1_000_000 {
            (3, "µs")
        } else {
            (6, "ms")
        };
        return format!("{}{}", fmt_frac(ns, prec), unit);
    }

    let total_secs = ns / NANOS_PER_SEC;
    let sub_nanos = ns % NANOS_PER_SEC;
    let hours = total_secs / 3600;
    let minutes = (total_secs / 60) % 60;
    let seconds = fmt_frac((total_secs % 60) * NANOS_PER_SEC + sub_nanos, 9);

    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Nanosecond count stored alongside the string. Saturates at `i64::MAX`.
pub fn duration_nanos(d: Duration) -> i64 {
    i64::try_from(d.as_nanos()).unwrap_or(i64::MAX)
}

/// `v / 10^prec` with trailing fractional zeros (and a bare dot) removed.
fn fmt_frac(v: u128, prec: u32) -> String {
    let div = 10u128.pow(prec);
    let int = v / div;
    let frac = v % div;
    if frac == 0 {
        return int.to_string();
    }
    let digits = format!("{:0width$}", frac, width = prec as usize);
    format!("{}.{}", int, digits.trim_end_matches('0'))
}
