//! Console rendering of inference results.

use kiln_runtime::InferenceReport;
use std::fmt::Write;

/// Render a report the way `kiln` prints it.
///
/// Timing is only included when `show_time` is set.
pub fn render(report: &InferenceReport, show_time: bool) -> String {
    let mut out = String::new();
    if show_time {
        let _ = writeln!(
            out,
            "Time taken by function: {} microseconds",
            report.elapsed.as_micros()
        );
    }

    out.push_str("Output:\n");
    let scores: Vec<String> = report.output.iter().map(f32::to_string).collect();
    out.push_str(&scores.join(" "));
    out.push('\n');

    let c = &report.classification;
    let _ = writeln!(out, "Max value: {} at index: {}", c.value, c.index);
    let _ = writeln!(out, "Predicted label: {}", c.label);
    out
}
