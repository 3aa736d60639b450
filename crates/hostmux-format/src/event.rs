//! The formatter event stream.
//!
//! Commands communicate with renderers through a flat sequence of events.
//! The sequence is single-pass: a renderer sees each event exactly once, in
//! emission order, and may buffer as little or as much as its output style
//! requires.

use serde_json::Value;

/// One element of the formatter event stream.
///
/// Data rows carry their cells as [`serde_json::Value`]s; the three control
/// markers delimit hosts and tables within one command run.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A data row. For tabular output each element is one cell; for the
    /// record renderer a row is a `[name, value]` pair.
    Row(Vec<Value>),
    /// Output for a new host begins. Renderers close any open table and,
    /// when headings are enabled, print a host separator.
    NewHost(String),
    /// The current table ends; subsequent rows belong to a fresh table.
    NewTable,
    /// The current table ends and the next table uses these column headers.
    NewTableHeader(Vec<String>),
}

impl Event {
    /// Builds a row event from anything cell-convertible.
    pub fn row<I, V>(cells: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Event::Row(cells.into_iter().map(Into::into).collect())
    }

    /// Builds a header event from string-like column names.
    pub fn header<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Event::NewTableHeader(columns.into_iter().map(Into::into).collect())
    }

    /// Returns true for the three control markers.
    pub fn is_control(&self) -> bool {
        !matches!(self, Event::Row(_))
    }
}
