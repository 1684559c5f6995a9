use std::io;

use super::{Report, Section};

/// Long-form CSV: each section restates its header, and every row is keyed
/// by the section name in the first column.
pub fn write_sections<W: io::Write>(sections: &[Section], out: W) -> csv::Result<()> {
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(out);
    for section in sections {
        let mut header = vec!["section"];
        header.extend(section.headers.iter().map(String::as_str));
        wtr.write_record(&header)?;
        for row in &section.rows {
            let mut record = vec![section.name.clone()];
            record.extend(row.iter().map(|c| c.raw()));
            wtr.write_record(&record)?;
        }
    }
    wtr.flush()?;
    Ok(())
}

pub fn print_csv(report: &Report) {
    let stdout = io::stdout();
    if let Err(e) = write_sections(&report.sections(), stdout.lock()) {
        eprintln!("CSV write error: {}", e);
    }
}
