//! Buffered, column-aligned table output.

use std::io::Write;

use unicode_width::UnicodeWidthStr;

use crate::error::FormatError;
use crate::event::Event;
use crate::lister::{write_host_heading, FormatOptions, Lister};
use crate::value::cell_text;

/// Buffers the rows of the current table and prints them aligned when the
/// table closes (at the next `NewTable`/`NewTableHeader`/`NewHost` marker or
/// at `finish`).
///
/// Column widths are computed in a single pass as
/// `max(header width, widest cell)`, using display width so CJK text and
/// other wide characters align correctly. Cells are left-aligned and
/// separated by two spaces; the last column is never padded.
pub struct TableLister<W: Write> {
    writer: W,
    options: FormatOptions,
    header: Option<Vec<String>>,
    rows: Vec<Vec<String>>,
    any_host: bool,
}

impl<W: Write> TableLister<W> {
    pub fn new(writer: W, options: FormatOptions) -> Self {
        Self {
            writer,
            options,
            header: None,
            rows: Vec::new(),
            any_host: false,
        }
    }

    /// Closes the current table: computes widths and writes header and rows.
    ///
    /// An empty table still prints its header (unless headings are
    /// suppressed); a table with neither header nor rows prints nothing.
    fn flush_table(&mut self) -> Result<(), FormatError> {
        let header = self.header.take();
        let rows = std::mem::take(&mut self.rows);
        if header.is_none() && rows.is_empty() {
            return Ok(());
        }

        let columns = header
            .as_ref()
            .map(|h| h.len())
            .into_iter()
            .chain(rows.iter().map(|r| r.len()))
            .max()
            .unwrap_or(0);

        let mut widths = vec![0usize; columns];
        if let Some(h) = &header {
            for (i, cell) in h.iter().enumerate() {
                widths[i] = widths[i].max(cell.width());
            }
        }
        for row in &rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.width());
            }
        }

        if self.options.show_headings {
            if let Some(h) = &header {
                self.write_row(h, &widths)?;
            }
        }
        for row in &rows {
            self.write_row(row, &widths)?;
        }
        Ok(())
    }

    fn write_row(&mut self, cells: &[String], widths: &[usize]) -> Result<(), FormatError> {
        let mut line = String::new();
        for (i, cell) in cells.iter().enumerate() {
            line.push_str(cell);
            if i + 1 < cells.len() {
                let pad = widths[i].saturating_sub(cell.width()) + 2;
                line.extend(std::iter::repeat(' ').take(pad));
            }
        }
        writeln!(self.writer, "{}", line.trim_end())?;
        Ok(())
    }
}

impl<W: Write> Lister for TableLister<W> {
    fn push(&mut self, event: Event) -> Result<(), FormatError> {
        match event {
            Event::Row(cells) => {
                self.rows.push(cells.iter().map(cell_text).collect());
            }
            Event::NewHost(host) => {
                self.flush_table()?;
                if self.options.show_headings {
                    write_host_heading(&mut self.writer, &host, !self.any_host)?;
                }
                self.any_host = true;
            }
            Event::NewTable => {
                self.flush_table()?;
            }
            Event::NewTableHeader(columns) => {
                self.flush_table()?;
                self.header = Some(columns);
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), FormatError> {
        self.flush_table()?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(events: Vec<Event>, options: FormatOptions) -> String {
        let mut buf = Vec::new();
        {
            let mut lister = TableLister::new(&mut buf, options);
            for ev in events {
                lister.push(ev).unwrap();
            }
            lister.finish().unwrap();
        }
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_columns_aligned() {
        let out = render(
            vec![
                Event::header(["Name", "Value"]),
                Event::row(["a", "1"]),
                Event::row(["b", "2"]),
            ],
            FormatOptions::default(),
        );
        assert_eq!(out, "Name  Value\na     1\nb     2\n");
    }

    #[test]
    fn test_width_from_widest_cell() {
        let out = render(
            vec![
                Event::header(["N", "V"]),
                Event::row(["abcdef", "1"]),
            ],
            FormatOptions::default(),
        );
        assert_eq!(out, "N       V\nabcdef  1\n");
    }

    #[test]
    fn test_width_property_holds() {
        let out = render(
            vec![
                Event::header(["Col", "Other"]),
                Event::row(["somewhat long", "x"]),
                Event::row(["y", "yy"]),
            ],
            FormatOptions::default(),
        );

        // Column 0 is max(len("Col"), len("somewhat long")) = 13 wide, so
        // the second column starts at offset 15 on every line.
        let second: Vec<&str> = out.lines().map(|l| &l[15..]).collect();
        assert_eq!(second, vec!["Other", "x", "yy"]);
    }

    #[test]
    fn test_empty_table_emits_header_only() {
        let out = render(
            vec![Event::header(["Name", "Size"])],
            FormatOptions::default(),
        );
        assert_eq!(out, "Name  Size\n");
    }

    #[test]
    fn test_empty_table_suppressed_header() {
        let out = render(vec![Event::header(["Name"])], FormatOptions::no_headings());
        assert_eq!(out, "");
    }

    #[test]
    fn test_new_host_closes_table() {
        let out = render(
            vec![
                Event::NewHost("h1".into()),
                Event::header(["A"]),
                Event::row(["x"]),
                Event::NewHost("h2".into()),
                Event::header(["A"]),
                Event::row(["longer"]),
            ],
            FormatOptions::default(),
        );
        // Widths are computed per table, not across hosts.
        assert_eq!(
            out,
            "==== h1 ====\nA\nx\n\n==== h2 ====\nA\nlonger\n"
        );
    }

    #[test]
    fn test_new_table_separates_width_scopes() {
        let out = render(
            vec![
                Event::row(["short", "1"]),
                Event::NewTable,
                Event::row(["a-very-long-cell", "2"]),
            ],
            FormatOptions::default(),
        );
        assert_eq!(out, "short  1\na-very-long-cell  2\n");
    }

    #[test]
    fn test_null_and_numbers() {
        let out = render(
            vec![
                Event::header(["K", "V"]),
                Event::Row(vec![json!("a"), json!(null)]),
                Event::Row(vec![json!("bb"), json!(10)]),
            ],
            FormatOptions::default(),
        );
        assert_eq!(out, "K   V\na\nbb  10\n");
    }

    #[test]
    fn test_wide_characters_counted_by_display_width() {
        let out = render(
            vec![
                Event::header(["Name", "V"]),
                Event::row(["你好", "1"]),
                Event::row(["abcde", "2"]),
            ],
            FormatOptions::default(),
        );
        // "你好" occupies 4 display columns; column width is 5 from "abcde".
        assert_eq!(out, "Name   V\n你好   1\nabcde  2\n");
    }
}
