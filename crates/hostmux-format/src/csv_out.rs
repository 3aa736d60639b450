//! CSV output.

use std::io::Write;

use crate::error::FormatError;
use crate::event::Event;
use crate::lister::{FormatOptions, Lister};
use crate::value::cell_text;

/// Streams rows as RFC-4180 CSV.
///
/// Fields are quoted only when they contain a comma, a double quote, or a
/// newline; embedded quotes are doubled. Host markers are not represented
/// in CSV output - the format carries data rows and headers only, so a
/// multi-host batch concatenates its per-host tables.
pub struct CsvLister<W: Write> {
    writer: csv::Writer<W>,
    options: FormatOptions,
}

impl<W: Write> CsvLister<W> {
    pub fn new(writer: W, options: FormatOptions) -> Self {
        let writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Necessary)
            .from_writer(writer);
        Self { writer, options }
    }
}

impl<W: Write> Lister for CsvLister<W> {
    fn push(&mut self, event: Event) -> Result<(), FormatError> {
        match event {
            Event::Row(cells) => {
                let record: Vec<String> = cells.iter().map(cell_text).collect();
                self.writer.write_record(&record)?;
            }
            Event::NewTableHeader(columns) => {
                if self.options.show_headings {
                    self.writer.write_record(&columns)?;
                }
            }
            Event::NewHost(_) | Event::NewTable => {}
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), FormatError> {
        self.writer.flush()?;
        Ok(())
    }
}
