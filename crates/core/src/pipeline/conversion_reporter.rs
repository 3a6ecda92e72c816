use std::io::Write;

use crate::shared::constants::{PROGRESS_BAR_WIDTH, PROGRESS_THROTTLE_FRAMES};

/// Console side of a conversion: status lines plus a progress indicator.
///
/// Keeps the use case independent of where output goes, so tests can
/// capture the exact lines a user would see.
pub trait ConversionReporter: Send {
    /// Print one human-readable status line.
    fn status(&mut self, line: &str);

    /// Report frame-level progress. `total` is 0 when unknown.
    fn progress(&mut self, current: usize, total: usize);

    /// Terminate an in-place progress line. Default: no-op.
    fn finish_progress(&mut self) {}
}

/// Discards everything.
pub struct NullReporter;

impl ConversionReporter for NullReporter {
    fn status(&mut self, _line: &str) {}
    fn progress(&mut self, _current: usize, _total: usize) {}
}

/// Writes status lines to stdout and redraws a single-line progress bar
/// every `throttle_frames` frames.
pub struct StdoutReporter {
    throttle_frames: usize,
    bar_active: bool,
}

impl StdoutReporter {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            bar_active: false,
        }
    }
}

impl Default for StdoutReporter {
    fn default() -> Self {
        Self::new(PROGRESS_THROTTLE_FRAMES)
    }
}

impl ConversionReporter for StdoutReporter {
    fn status(&mut self, line: &str) {
        self.finish_progress();
        println!("{line}");
    }

    fn progress(&mut self, current: usize, total: usize) {
        if current % self.throttle_frames != 0 && current != total {
            return;
        }
        print!("\r{}", progress_line(current, total, PROGRESS_BAR_WIDTH));
        let _ = std::io::stdout().flush();
        self.bar_active = true;
    }

    fn finish_progress(&mut self) {
        if self.bar_active {
            println!();
            self.bar_active = false;
        }
    }
}

/// `[#####-----]  50% (5/10 frames)`, or a bare frame counter when the total
/// is unknown.
pub fn progress_line(current: usize, total: usize, width: usize) -> String {
    if total == 0 {
        return format!("Encoding frame {current}");
    }
    let current = current.min(total);
    let filled = current * width / total;
    let pct = current * 100 / total;
    format!(
        "[{}{}] {pct:3}% ({current}/{total} frames)",
        "#".repeat(filled),
        "-".repeat(width - filled)
    )
}
