//! Interactive mode.
//!
//! Entered when no command is given: lines are read from standard input,
//! split like a shell would, and dispatched through the same command tree
//! with the same session, so connections and credentials established by
//! one line are reused by the next. `exit`, `quit`, or end-of-input raise
//! the terminate signal, which unwinds the loop cleanly - it is not an
//! error and the loop's exit code does not reflect it.

use std::io::{BufRead, Write};
use std::sync::atomic::Ordering;

use hostmux_dispatch::{MuxCommand, RunContext};
use hostmux_session::Session;

/// What one interactive line asked for.
enum LineOutcome {
    Ran(i32),
    Empty,
    Terminate,
}

fn dispatch_line(
    line: &str,
    root: &MuxCommand,
    session: &mut Session,
    ctx: &mut RunContext,
) -> LineOutcome {
    let words = match shell_words::split(line.trim()) {
        Ok(words) => words,
        Err(err) => {
            let _ = writeln!(ctx.err, "parse error: {}", err);
            return LineOutcome::Ran(1);
        }
    };
    match words.first().map(String::as_str) {
        None => LineOutcome::Empty,
        Some("exit") | Some("quit") => LineOutcome::Terminate,
        Some(_) => LineOutcome::Ran(root.run(&words, session, ctx)),
    }
}

/// Runs the interactive loop until terminate or end-of-input.
///
/// Each line clears the interrupt flag first, so a Ctrl-C that cut one
/// command short does not poison the next. Returns 0: terminating the
/// loop is a clean unwind, and per-line failures have already been
/// reported on their own output.
pub fn run_loop<R: BufRead>(
    mut input: R,
    prompt: Option<&str>,
    root: &MuxCommand,
    session: &mut Session,
    ctx: &mut RunContext,
) -> i32 {
    loop {
        ctx.interrupt.store(false, Ordering::Relaxed);
        if let Some(prompt) = prompt {
            let _ = write!(ctx.out, "{}> ", prompt);
            let _ = ctx.out.flush();
        }
        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        match dispatch_line(&line, root, session, ctx) {
            LineOutcome::Terminate => break,
            LineOutcome::Ran(_) | LineOutcome::Empty => {}
        }
    }
    0
}
