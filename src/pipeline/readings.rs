use std::time::Duration;

use crate::types::{Overlay, Readings};

pub const LATENCY_LABEL: &str = "Speed";

/// `00.0` style: at least two integer digits, one decimal, sign kept.
fn two_digit(value: f64) -> String {
    if value < 0.0 {
        format!("-{:04.1}", -value)
    } else {
        // abs() folds -0.0 into 0.0
        format!("{:04.1}", value.abs())
    }
}

pub fn format_percent(score: f32) -> String {
    format!("{}%", two_digit(score as f64 * 100.0))
}

pub fn format_latency(latency: Duration) -> String {
    format!("{}[ms]", two_digit(latency.as_secs_f64() * 1_000.0))
}

impl Readings {
    pub fn percent_strings(&self) -> [String; 3] {
        self.scores.map(format_percent)
    }

    pub fn latency_string(&self) -> String {
        format_latency(self.latency)
    }
}

impl Overlay {
    /// One caption per class followed by the latency line.
    pub fn caption_lines(&self) -> [String; 4] {
        let [a, b, c] = self.readings.percent_strings();
        [
            format!("{} {a}", self.labels[0]),
            format!("{} {b}", self.labels[1]),
            format!("{} {c}", self.labels[2]),
            format!("{LATENCY_LABEL} {}", self.readings.latency_string()),
        ]
    }
}
