use colored::Colorize;
use tabled::{builder::Builder, Table};

use super::{Report, Section};

pub fn render_section(section: &Section) -> String {
    let mut builder = Builder::default();
    builder.push_record(section.headers.iter().cloned());
    for row in &section.rows {
        builder.push_record(row.iter().map(|c| c.display()));
    }
    Table::from(builder).to_string()
}

/// Every section as a titled table, then warnings and methodology.
pub fn print_table(report: &Report) {
    for (i, section) in report.sections().iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{}", section.name.as_str().bold());
        println!("{}", render_section(section));
    }

    let (warnings, methodology) = report.notes();
    if !warnings.is_empty() {
        println!("\n{}", "Warnings:".yellow());
        for w in warnings {
            println!("  - {}", w);
        }
    }
    if let Some(m) = methodology {
        println!("\nMethodology: {}", m);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Cell;
    use rust_decimal::Decimal;

    #[test]
    fn test_rendered_table_uses_display_form() {
        let mut section = Section::new("wacc", &["component", "rate"]);
        section.push(vec![Cell::text("irp_wacc"), Cell::Rate(Decimal::new(81188, 6))]);
        let out = render_section(&section);
        assert!(out.contains("component"));
        assert!(out.contains("8.12%"));
    }
}
