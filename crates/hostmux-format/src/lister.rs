//! The `Lister` trait and renderer selection.

use std::io::Write;

use crate::csv_out::CsvLister;
use crate::error::FormatError;
use crate::event::Event;
use crate::immediate::ImmediateLister;
use crate::record::RecordLister;
use crate::table::TableLister;

/// Options shared by every renderer.
#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// When false, table headers and host headings are suppressed.
    pub show_headings: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            show_headings: true,
        }
    }
}

impl FormatOptions {
    /// Options with headings suppressed (`--no-headings`).
    pub fn no_headings() -> Self {
        Self {
            show_headings: false,
        }
    }
}

/// A renderer for the formatter event stream.
///
/// Exactly one lister consumes the stream of one command run. Events arrive
/// in emission order; `finish` must be called once after the last event to
/// flush any buffered state (the table renderer holds the current table
/// until it knows every cell width).
pub trait Lister {
    /// Consumes the next event.
    fn push(&mut self, event: Event) -> Result<(), FormatError>;

    /// Flushes buffered state after the final event.
    fn finish(&mut self) -> Result<(), FormatError>;
}

/// Renderer selection, typically derived from CLI flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListerKind {
    /// Unaligned, printed as rows arrive.
    Immediate,
    /// Buffered, column-aligned table output.
    #[default]
    Table,
    /// RFC-4180 CSV.
    Csv,
    /// `name=value` lines for single-record views.
    Record,
}

impl ListerKind {
    /// Builds the renderer over `writer`. The writer's encoding is fixed
    /// here, once per command run: all renderers emit UTF-8.
    pub fn build<'w, W: Write + 'w>(
        self,
        writer: W,
        options: FormatOptions,
    ) -> Box<dyn Lister + 'w> {
        match self {
            ListerKind::Immediate => Box::new(ImmediateLister::new(writer, options)),
            ListerKind::Table => Box::new(TableLister::new(writer, options)),
            ListerKind::Csv => Box::new(CsvLister::new(writer, options)),
            ListerKind::Record => Box::new(RecordLister::new(writer, options)),
        }
    }
}

/// Writes the host separator heading shared by the text renderers.
pub(crate) fn write_host_heading<W: Write>(
    w: &mut W,
    host: &str,
    first: bool,
) -> std::io::Result<()> {
    if !first {
        writeln!(w)?;
    }
    writeln!(w, "==== {} ====", host)
}
