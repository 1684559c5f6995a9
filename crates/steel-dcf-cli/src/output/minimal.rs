use super::Report;

/// Just the headline numbers, one line each.
pub fn print_minimal(report: &Report) {
    for line in report.headline() {
        println!("{}", line);
    }
}
