//! Formatter event stream and renderers for hostmux.
//!
//! `hostmux-format` is the output half of the hostmux framework. Commands
//! don't print anything themselves - they emit an ordered, single-pass
//! sequence of [`Event`]s (data rows plus `NewHost`/`NewTable`/
//! `NewTableHeader` control markers) and exactly one [`Lister`] instance
//! consumes that sequence and renders it incrementally.
//!
//! # Renderers
//!
//! - [`ImmediateLister`]: prints each row as it arrives, no alignment
//! - [`TableLister`]: buffers the current table, aligns columns on close
//! - [`CsvLister`]: RFC-4180 quoting via the `csv` crate
//! - [`RecordLister`]: one object's fields as `name=value` lines
//!
//! Failures collected across a multi-host batch are rendered separately by
//! [`ErrorReport`], grouped by host.
//!
//! # Choosing a renderer
//!
//! ```rust
//! use hostmux_format::{Event, FormatOptions, Lister, ListerKind};
//! use serde_json::json;
//!
//! let mut out = Vec::new();
//! let mut lister = ListerKind::Table.build(&mut out, FormatOptions::default());
//! lister.push(Event::NewTableHeader(vec!["Name".into(), "Size".into()])).unwrap();
//! lister.push(Event::Row(vec![json!("vol0"), json!(2048)])).unwrap();
//! lister.finish().unwrap();
//! ```

mod csv_out;
mod error;
mod event;
mod immediate;
mod lister;
mod record;
mod report;
mod table;
mod value;

pub use csv_out::CsvLister;
pub use error::FormatError;
pub use event::Event;
pub use immediate::ImmediateLister;
pub use lister::{FormatOptions, Lister, ListerKind};
pub use record::RecordLister;
pub use report::{ErrorReport, HostFailure};
pub use table::TableLister;
pub use value::cell_text;
