// ChatVault - Archived Chat Media Console
// Copyright (C) 2026 ChatVault contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Throughput and ETA estimation from noisy progress samples
//!
//! Poll responses that already carry `download_speed` and
//! `estimated_time_remaining` win; local estimation from consecutive samples
//! is the fallback. Estimates are undefined (rendered as "calculating...")
//! rather than ever being zero-divided or negative: samples arrive from a
//! polled endpoint and occasionally regress or share a timestamp.

use chrono::{DateTime, Utc};

/// One time-stamped progress observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    pub bytes: u64,
    pub at: DateTime<Utc>,
}

impl ProgressSample {
    pub fn new(bytes: u64, at: DateTime<Utc>) -> Self {
        Self { bytes, at }
    }
}

/// Derived transfer metrics; either field may be unknown
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransferEstimate {
    pub speed_bytes_per_sec: Option<f64>,
    pub eta_seconds: Option<u64>,
}

/// Estimate speed and ETA from two consecutive samples
///
/// Speed is defined only when time moved forward and bytes did not regress.
/// ETA is defined only when speed is positive and the total is known.
pub fn estimate(
    prev: &ProgressSample,
    next: &ProgressSample,
    total_bytes: Option<u64>,
) -> TransferEstimate {
    let elapsed = (next.at - prev.at).num_milliseconds() as f64 / 1000.0;

    let speed = if elapsed > 0.0 && next.bytes >= prev.bytes {
        Some((next.bytes - prev.bytes) as f64 / elapsed)
    } else {
        None
    };

    let eta = match (speed, total_bytes) {
        (Some(s), Some(total)) if s > 0.0 => {
            let remaining = total.saturating_sub(next.bytes);
            Some((remaining as f64 / s) as u64)
        }
        _ => None,
    };

    TransferEstimate {
        speed_bytes_per_sec: speed,
        eta_seconds: eta,
    }
}

/// Combine service-reported metrics with a local fallback estimate
///
/// The service's own numbers are preferred when present and sane; anything
/// negative or non-finite is discarded as noise.
pub fn estimate_with_report(
    reported_speed: Option<f64>,
    reported_eta: Option<u64>,
    prev: Option<&ProgressSample>,
    next: &ProgressSample,
    total_bytes: Option<u64>,
) -> TransferEstimate {
    let local = match prev {
        Some(p) => estimate(p, next, total_bytes),
        None => TransferEstimate::default(),
    };

    TransferEstimate {
        speed_bytes_per_sec: reported_speed
            .filter(|s| s.is_finite() && *s >= 0.0)
            .or(local.speed_bytes_per_sec),
        eta_seconds: reported_eta.or(local.eta_seconds),
    }
}

/// Format speed as a human-readable string (e.g. "2.5 MB/s")
pub fn speed_string(speed_bytes_per_sec: Option<f64>) -> String {
    match speed_bytes_per_sec {
        Some(speed) => format!("{:.1} MB/s", speed / 1_000_000.0),
        None => "calculating...".to_string(),
    }
}

/// Format ETA bucketed into seconds/minutes/hours (e.g. "5m 30s")
pub fn eta_string(eta_seconds: Option<u64>) -> String {
    let eta = match eta_seconds {
        Some(eta) => eta,
        None => return "calculating...".to_string(),
    };

    let hours = eta / 3600;
    let minutes = (eta % 3600) / 60;
    let seconds = eta % 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Format bytes as a human-readable string (e.g. "45.2 MB")
pub fn bytes_string(bytes: u64) -> String {
    if bytes < 1_000_000 {
        format!("{:.1} KB", bytes as f64 / 1_000.0)
    } else {
        format!("{:.1} MB", bytes as f64 / 1_000_000.0)
    }
}
