use colored::Colorize;

use herald_core::Severity;

/// Format one row of the severity ladder: rank, name and output stream.
pub fn level_row(level: Severity, min_severity: Severity) -> String {
    let stream = if level.prefers_stderr() {
        "stderr"
    } else {
        "stdout"
    };
    let marker = if level >= min_severity { "shown" } else { "hidden" };
    format!("{}  {:<8} {:<7} {}", level.rank(), level.as_str(), stream, marker)
}

/// Print the severity levels in ascending order.
pub fn run(min_severity: Severity) {
    println!("{}", "Severity levels (lowest first):".bold());
    for level in Severity::ALL {
        let row = level_row(level, min_severity);
        if level >= min_severity {
            println!("  {}", row);
        } else {
            println!("  {}", row.dimmed());
        }
    }
}
