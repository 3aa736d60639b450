//! Immediate, unaligned output.

use std::io::Write;

use crate::error::FormatError;
use crate::event::Event;
use crate::lister::{write_host_heading, FormatOptions, Lister};
use crate::value::cell_text;

/// Prints each row the moment it arrives, cells separated by a single
/// space, no column alignment. The cheapest renderer and the only one that
/// never buffers, which makes it the default for piped output.
pub struct ImmediateLister<W: Write> {
    writer: W,
    options: FormatOptions,
    any_host: bool,
}

impl<W: Write> ImmediateLister<W> {
    pub fn new(writer: W, options: FormatOptions) -> Self {
        Self {
            writer,
            options,
            any_host: false,
        }
    }
}

impl<W: Write> Lister for ImmediateLister<W> {
    fn push(&mut self, event: Event) -> Result<(), FormatError> {
        match event {
            Event::Row(cells) => {
                let line = cells.iter().map(cell_text).collect::<Vec<_>>().join(" ");
                writeln!(self.writer, "{}", line)?;
            }
            Event::NewHost(host) => {
                if self.options.show_headings {
                    write_host_heading(&mut self.writer, &host, !self.any_host)?;
                }
                self.any_host = true;
            }
            Event::NewTable => {}
            Event::NewTableHeader(columns) => {
                if self.options.show_headings {
                    writeln!(self.writer, "{}", columns.join(" "))?;
                }
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), FormatError> {
        self.writer.flush()?;
        Ok(())
    }
}
