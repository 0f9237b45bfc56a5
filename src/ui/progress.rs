use crate::wipe_orchestrator::ProgressEvent;
use colored::Colorize;
use std::io::{self, Write};
use std::path::Path;
use std::time::Instant;

pub(crate) const SPINNER_FRAMES: [&str; 4] = ["·", "˚", "•", "˚"];

/// Single-line terminal progress bar fed by [`ProgressEvent`]s
pub struct ProgressBar {
    width: usize,
    spinner_frame: usize,
    start: Instant,
    rendered: bool,
}

impl ProgressBar {
    /// width = number of bar character slots (not including the brackets)
    pub fn new(width: usize) -> Self {
        Self {
            width,
            spinner_frame: 0,
            start: Instant::now(),
            rendered: false,
        }
    }

    /// Build the status line for `event` without printing it
    pub fn line(&mut self, event: &ProgressEvent) -> String {
        let pct = percent(event.bytes_written, event.bytes_total);
        let (filled, empty) = bar_cells(pct, self.width);
        self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();

        let bar = format!(
            "{}{}",
            "█".repeat(filled).green().bold(),
            "░".repeat(empty).bright_black()
        );

        let elapsed = self.start.elapsed().as_secs_f64().max(0.0001);
        let speed = event.bytes_written as f64 / elapsed;
        let remaining = event.bytes_total.saturating_sub(event.bytes_written);
        let eta = if speed > 0.0 {
            (remaining as f64 / speed).round() as u64
        } else {
            0
        };

        format!(
            "{} [{}] {}  target {}/{}  pass {}/{}  {}  {} @ {}/s  ETA {}",
            SPINNER_FRAMES[self.spinner_frame],
            bar,
            format!("{:.1}%", pct).bold(),
            (event.targets_completed).min(event.targets_total),
            event.targets_total,
            event.pass_index + 1,
            event.pass_total,
            short_name(&event.current_target).cyan(),
            human_bytes(event.bytes_written as f64),
            human_bytes(speed),
            format_duration(eta)
        )
    }

    /// Redraw the bar in place on stderr
    pub fn render(&mut self, event: &ProgressEvent) {
        let line = self.line(event);
        let mut err = io::stderr();
        // \r + clear line, redraw
        let _ = write!(err, "\r\x1b[2K{}", line);
        let _ = err.flush();
        self.rendered = true;
    }

    /// Leave the last drawn line on screen
    pub fn finish(&mut self) {
        if self.rendered {
            let _ = writeln!(io::stderr());
            self.rendered = false;
        }
    }
}

/// Completion percentage; an empty job counts as done
pub(crate) fn percent(written: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (written as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

/// (filled, empty) cells for `pct` on a bar of `width` slots
pub(crate) fn bar_cells(pct: f64, width: usize) -> (usize, usize) {
    let pct = if pct.is_nan() { 0.0 } else { pct.clamp(0.0, 100.0) };
    let filled = ((pct / 100.0) * width as f64).round() as usize;
    (filled, width.saturating_sub(filled))
}

fn short_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Convert bytes (or bytes/sec) to readable string
pub(crate) fn human_bytes(bps: f64) -> String {
    let units = ["B", "KB", "MB", "GB", "TB"];
    if bps <= 0.0 {
        return "0B".to_string();
    }
    let mut val = bps;
    let mut i = 0usize;
    while val >= 1024.0 && i + 1 < units.len() {
        val /= 1024.0;
        i += 1;
    }
    format!("{:.2}{}", val, units[i])
}

/// Format seconds to H:MM:SS or M:SS
pub(crate) fn format_duration(secs: u64) -> String {
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}
