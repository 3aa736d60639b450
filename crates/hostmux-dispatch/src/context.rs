//! Per-invocation context.
//!
//! The source design leaned on process-wide caches; here everything a
//! command needs at run time travels in one explicit [`RunContext`] built
//! by the application for each command run and dropped afterwards.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use hostmux_format::{FormatOptions, Lister, ListerKind};

/// A cloneable writer handle.
///
/// Commands and the formatter both need the output stream during one run;
/// a shared `Rc<RefCell<..>>` keeps that single-threaded sharing explicit.
#[derive(Clone)]
pub struct SharedWriter {
    inner: Rc<RefCell<Box<dyn Write>>>,
}

impl SharedWriter {
    pub fn new(writer: impl Write + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Box::new(writer))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }

    /// An in-memory writer plus a handle to read back what was written.
    /// Test support.
    pub fn buffer() -> (Self, Rc<RefCell<Vec<u8>>>) {
        let buf: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let writer = BufferWriter {
            buf: Rc::clone(&buf),
        };
        (Self::new(writer), buf)
    }
}

struct BufferWriter {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl Write for BufferWriter {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Write for SharedWriter {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.inner.borrow_mut().write(data)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.borrow_mut().flush()
    }
}

/// Everything one command invocation needs from its surroundings.
pub struct RunContext {
    pub out: SharedWriter,
    pub err: SharedWriter,
    /// Explicit `--lister-format`; overrides everything else.
    pub lister_format: Option<ListerKind>,
    /// `--human-friendly`: prefer the aligned table.
    pub human_friendly: bool,
    /// Fallback kind, resolved once at startup from TTY detection.
    pub default_kind: ListerKind,
    /// Cleared by `--no-headings`.
    pub show_headings: bool,
    /// Set by the interrupt handler; polled by the execution engine.
    pub interrupt: Arc<AtomicBool>,
    /// The command path walked so far, for usage text and diagnostics.
    pub command_path: Vec<String>,
}

impl RunContext {
    pub fn new(out: SharedWriter, err: SharedWriter) -> Self {
        Self {
            out,
            err,
            lister_format: None,
            human_friendly: false,
            default_kind: ListerKind::Immediate,
            show_headings: true,
            interrupt: Arc::new(AtomicBool::new(false)),
            command_path: Vec::new(),
        }
    }

    /// The dotted path of the command being run, e.g. `volume.list`.
    pub fn dotted_path(&self) -> String {
        self.command_path.join(".")
    }

    /// The space-joined path for usage lines, e.g. `volume list`.
    pub fn spaced_path(&self) -> String {
        self.command_path.join(" ")
    }

    /// Picks the renderer for a command run.
    ///
    /// Precedence: explicit `--lister-format`, then the command's declared
    /// view, then `--human-friendly`, then the startup default.
    pub fn make_lister(&self, preferred: Option<ListerKind>) -> Box<dyn Lister> {
        let kind = self
            .lister_format
            .or(preferred)
            .or(self.human_friendly.then_some(ListerKind::Table))
            .unwrap_or(self.default_kind);
        let options = if self.show_headings {
            FormatOptions::default()
        } else {
            FormatOptions::no_headings()
        };
        kind.build(self.out.clone(), options)
    }
}
