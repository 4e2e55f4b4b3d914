//! Single-line live gauge for terminals

use super::colored::speed_color;
use super::formatter::format_speed;
use crate::{
    executor::ProgressObserver,
    models::{ProgressSnapshot, TestResult},
    types::TestPhase,
};
use colored::*;
use std::io::{self, Write};
use std::sync::Mutex;

const DEFAULT_WIDTH: usize = 30;

/// Redraws one stderr line per progress update
pub struct GaugeRenderer {
    width: usize,
    use_color: bool,
    /// Whether a partially drawn line is on screen
    drawn: Mutex<bool>,
}

impl GaugeRenderer {
    pub fn new(use_color: bool) -> Self {
        Self::with_width(use_color, DEFAULT_WIDTH)
    }

    pub fn with_width(use_color: bool, width: usize) -> Self {
        Self {
            width: width.max(1),
            use_color,
            drawn: Mutex::new(false),
        }
    }

    /// The gauge line for `snapshot`, without carriage return
    pub fn render_line(&self, snapshot: &ProgressSnapshot) -> String {
        let filled = ((snapshot.percent_complete / 100.0) * self.width as f64).round() as usize;
        let filled = filled.min(self.width);
        let bar = format!("{}{}", "#".repeat(filled), "-".repeat(self.width - filled));

        let speed = match snapshot.phase {
            TestPhase::Download | TestPhase::Upload => format_speed(snapshot.current_speed_mbps),
            _ => String::new(),
        };

        if self.use_color {
            let color = speed_color(snapshot.current_speed_mbps);
            format!(
                "{:<9} [{}] {:>5.1}%  {}",
                snapshot.phase.as_str().bold(),
                bar.color(color),
                snapshot.percent_complete,
                speed.color(color)
            )
        } else {
            format!(
                "{:<9} [{}] {:>5.1}%  {}",
                snapshot.phase.as_str(),
                bar,
                snapshot.percent_complete,
                speed
            )
        }
    }

    fn draw(&self, line: &str) {
        let mut stderr = io::stderr().lock();
        // Pad to clear leftovers of a longer previous line
        let _ = write!(stderr, "\r{:<80}", line);
        let _ = stderr.flush();
        if let Ok(mut drawn) = self.drawn.lock() {
            *drawn = true;
        }
    }

    fn finish_line(&self) {
        if let Ok(mut drawn) = self.drawn.lock() {
            if *drawn {
                let _ = writeln!(io::stderr());
                *drawn = false;
            }
        }
    }
}

impl ProgressObserver for GaugeRenderer {
    fn on_phase_change(&self, phase: TestPhase) {
        if matches!(phase, TestPhase::Idle | TestPhase::Complete) {
            self.finish_line();
        }
    }

    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        if snapshot.phase.is_active() {
            self.draw(&self.render_line(snapshot));
        }
    }

    fn on_complete(&self, _result: &TestResult) {
        self.finish_line();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_gauge_line() {
        let gauge = GaugeRenderer::with_width(false, 10);
        let line = gauge.render_line(&ProgressSnapshot::new(TestPhase::Download, 50.0, 87.3));
        assert_eq!(line, "download  [#####-----]  50.0%  87.3 Mbps");
    }

    #[test]
    fn test_ping_phase_has_no_speed() {
        let gauge = GaugeRenderer::with_width(false, 4);
        let line = gauge.render_line(&ProgressSnapshot::new(TestPhase::Ping, 0.0, 0.0));
        assert_eq!(line.trim_end(), "ping      [----]   0.0%");
    }

    #[test]
    fn test_full_bar() {
        let gauge = GaugeRenderer::with_width(false, 5);
        let line = gauge.render_line(&ProgressSnapshot::new(TestPhase::Upload, 100.0, 12.0));
        assert!(line.contains("[#####]"));
        assert!(line.contains("100.0%"));
    }

    #[test]
    fn test_finish_line_only_after_draw() {
        let gauge = GaugeRenderer::new(false);
        gauge.on_phase_change(TestPhase::Complete);
        assert!(!*gauge.drawn.lock().unwrap());

        gauge.on_progress(&ProgressSnapshot::new(TestPhase::Ping, 10.0, 0.0));
        assert!(*gauge.drawn.lock().unwrap());
        gauge.on_phase_change(TestPhase::Idle);
        assert!(!*gauge.drawn.lock().unwrap());
    }
}
