//! Diagnostic cleanup for the report.
//!
//! Raw diagnostics may carry host tracebacks. Only the lines a reader
//! needs survive: the mismatch itself, the violating input, and frames
//! that implicate the original or candidate sources.

const KEEP_MARKERS: [&str; 3] = ["Mismatch", "input", "Falsifying"];

/// Filter `raw` down to the lines worth showing.
///
/// When nothing matches, the last non-empty line is kept so the reader
/// still sees the final error message.
pub fn clean_diagnostic(raw: &str, original_name: &str, candidate_name: &str) -> String {
    let implicates = |line: &str| {
        (!original_name.is_empty() && line.contains(original_name))
            || (!candidate_name.is_empty() && line.contains(candidate_name))
            || KEEP_MARKERS.iter().any(|m| line.contains(m))
    };

    let kept: Vec<&str> = raw
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty() && implicates(line))
        .collect();
    if !kept.is_empty() {
        return kept.join("\n");
    }
    raw.lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string()
}
