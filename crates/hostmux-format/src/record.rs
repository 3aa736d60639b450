//! Single-record output.

use std::io::Write;

use crate::error::FormatError;
use crate::event::Event;
use crate::lister::{write_host_heading, FormatOptions, Lister};
use crate::value::cell_text;

/// Renders one object's fields as `name=value` lines.
///
/// Each row is a `[name, value]` pair; field order is whatever order the
/// rows arrive in. Producers emit caller-declared order when they have one
/// and alphabetical order when the record came from a plain map, so this
/// renderer never sorts.
pub struct RecordLister<W: Write> {
    writer: W,
    options: FormatOptions,
    any_host: bool,
}

impl<W: Write> RecordLister<W> {
    pub fn new(writer: W, options: FormatOptions) -> Self {
        Self {
            writer,
            options,
            any_host: false,
        }
    }
}

impl<W: Write> Lister for RecordLister<W> {
    fn push(&mut self, event: Event) -> Result<(), FormatError> {
        match event {
            Event::Row(cells) => {
                let name = cells.first().map(cell_text).unwrap_or_default();
                let value = cells.get(1).map(cell_text).unwrap_or_default();
                writeln!(self.writer, "{}={}", name, value)?;
            }
            Event::NewHost(host) => {
                if self.options.show_headings {
                    write_host_heading(&mut self.writer, &host, !self.any_host)?;
                }
                self.any_host = true;
            }
            // A record view has no tables; separators just delimit records.
            Event::NewTable | Event::NewTableHeader(_) => {
                writeln!(self.writer)?;
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), FormatError> {
        self.writer.flush()?;
        Ok(())
    }
}
