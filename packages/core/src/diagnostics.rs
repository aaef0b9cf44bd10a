//! Backend log tailing for failure diagnostics

use std::collections::VecDeque;
use std::io;
use std::path::Path;

/// Prefix of the marker line written before every backend launch
pub const LAUNCH_MARKER_PREFIX: &str = "=== bootgate: launching";

/// Return the last `max_lines` lines of the backend log
///
/// Only lines after the most recent launch marker are considered, so a
/// persisted log does not mix output from earlier boots into the tail.
/// Invalid UTF-8 is replaced rather than rejected.
pub fn tail_log(path: &Path, max_lines: usize) -> io::Result<Vec<String>> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(tail_lines(&text, max_lines))
}

/// Same as [`tail_log`], but a missing or unreadable log yields a single
/// explanatory line instead of an error
pub fn tail_log_or_note(path: &Path, max_lines: usize) -> Vec<String> {
    match tail_log(path, max_lines) {
        Ok(lines) => lines,
        Err(e) => vec![format!(
            "(backend log {} unavailable: {e})",
            path.display()
        )],
    }
}

fn tail_lines(text: &str, max_lines: usize) -> Vec<String> {
    if max_lines == 0 {
        return Vec::new();
    }

    let mut tail = VecDeque::with_capacity(max_lines);
    for line in text.lines() {
        if line.starts_with(LAUNCH_MARKER_PREFIX) {
            tail.clear();
            continue;
        }
        if tail.len() == max_lines {
            tail.pop_front();
        }
        tail.push_back(line.to_string());
    }
    tail.into()
}
