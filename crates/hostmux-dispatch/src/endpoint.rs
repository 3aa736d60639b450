//! End-point commands.
//!
//! An end-point command is a leaf of the command tree: it owns a usage
//! grammar, parses its slice of the argument vector, and repeats its
//! associated function across the session's hosts through the execution
//! engine. It never touches the session beyond that engine call, and it
//! never lets one host's failure abort the batch.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::bail;
use serde_json::Value;

use hostmux_format::{ErrorReport, Event, FormatError, HostFailure, Lister};
use hostmux_session::{run_per_host, Session};

use crate::context::RunContext;
use crate::grammar::Usage;
use crate::registry::{Binding, CallArgs, CommandFn, FnOutput, Property, PropertySource, Rows};
use crate::spec::{CheckOutcome, Columns, CommandSpec, Expect};
use crate::translate::{filter_for, translate, Shaping};

/// Rendered when a derived property names a field the result lacks.
pub const UNKNOWN_SENTINEL: &str = "UNKNOWN";
/// Rendered when a derived property's transform fails.
pub const ERROR_SENTINEL: &str = "ERROR";

/// A leaf command, built from a [`CommandSpec`] by the declaration
/// processor. Immutable after construction.
pub struct EndpointCommand {
    name: String,
    usage: Usage,
    function: Arc<dyn CommandFn>,
    binding: Binding,
    columns: Columns,
    expect: Expect,
    shaping: Shaping,
    view: Option<hostmux_format::ListerKind>,
    help: Option<String>,
}

/// What one host's invocation produced, after draining any lazy rows and
/// applying the expected-result check. Pure data: rendering happens after
/// the whole batch completes.
enum RenderPlan {
    Silent,
    Value(Value),
    Table {
        header: Option<Vec<String>>,
        rows: Vec<Vec<Value>>,
    },
    Record(Vec<(String, Value)>),
}

impl EndpointCommand {
    pub(crate) fn from_parts(
        spec: CommandSpec,
        usage: Usage,
        function: Arc<dyn CommandFn>,
    ) -> Self {
        Self {
            name: spec.name,
            usage,
            function,
            binding: spec.binding,
            columns: spec.columns,
            expect: spec.expect,
            shaping: spec.shaping,
            view: spec.view,
            help: spec.help,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// First help line, for multiplexer listings.
    pub fn summary(&self) -> &str {
        self.help
            .as_deref()
            .and_then(|h| h.lines().next())
            .unwrap_or("")
    }

    /// The usage line, prefixed with the parent command path.
    pub fn usage_text(&self, ctx: &RunContext) -> String {
        let path = &ctx.command_path;
        let prefix = match path.len() {
            0 | 1 => String::new(),
            n => format!("{} ", path[..n - 1].join(" ")),
        };
        format!("usage: {}{}", prefix, self.usage.line())
    }

    /// Parses `args`, runs the associated function (once per host for
    /// session-bound commands), renders the aggregate, and returns the
    /// process exit code.
    pub fn run(&self, args: &[String], session: &mut Session, ctx: &mut RunContext) -> i32 {
        if matches!(args.first().map(String::as_str), Some("--help") | Some("-h")) {
            let _ = writeln!(ctx.out, "{}", self.usage_text(ctx));
            return 0;
        }

        let raw = match self.usage.match_args(args) {
            Ok(raw) => raw,
            Err(err) => {
                let _ = writeln!(ctx.err, "{}: {}", self.name, err);
                let _ = writeln!(ctx.err, "{}", self.usage_text(ctx));
                return 1;
            }
        };
        let translated = match translate(&raw, &self.shaping) {
            Ok(args) => args,
            Err(err) => {
                let _ = writeln!(ctx.err, "{}: {}", self.name, err);
                return 1;
            }
        };
        let call_args = filter_for(translated, &self.function.params());

        if let Err(message) = self.function.verify_options(&call_args) {
            let _ = writeln!(ctx.err, "{}: {}", self.name, message);
            return 1;
        }

        match self.binding {
            Binding::None => self.run_unbound(&call_args, ctx),
            Binding::Session => self.run_session(&call_args, session, ctx),
        }
    }

    fn run_unbound(&self, call_args: &CallArgs, ctx: &mut RunContext) -> i32 {
        let outcome = self
            .function
            .invoke(None, call_args)
            .and_then(|output| self.collect(output, call_args, &ctx.interrupt));
        match outcome {
            Ok(plan) => {
                let mut lister = ctx.make_lister(self.view);
                if let Err(err) = plan.emit(lister.as_mut()).and_then(|_| lister.finish()) {
                    let _ = writeln!(ctx.err, "{}: {}", self.name, err);
                    return 1;
                }
                0
            }
            Err(err) => {
                let _ = writeln!(ctx.err, "{}: {}", self.name, err);
                1
            }
        }
    }

    fn run_session(&self, call_args: &CallArgs, session: &mut Session, ctx: &mut RunContext) -> i32 {
        let multi = session.len() > 1;
        let interrupt = Arc::clone(&ctx.interrupt);

        let batch = match run_per_host(session, Some(interrupt.as_ref()), |_host, conn| {
            let output = self.function.invoke(Some(conn), call_args)?;
            self.collect(output, call_args, &interrupt)
        }) {
            Ok(batch) => batch,
            // NoConnections is the only fatal batch outcome.
            Err(err) => {
                let _ = writeln!(ctx.err, "{}: {}", self.name, err);
                return 1;
            }
        };

        let mut lister = ctx.make_lister(self.view);
        let rendered = (|| -> Result<(), FormatError> {
            for result in &batch.results {
                if let Ok(plan) = &result.outcome {
                    if multi {
                        lister.push(Event::NewHost(result.host.clone()))?;
                    }
                    plan.emit(lister.as_mut())?;
                }
            }
            lister.finish()
        })();
        if let Err(err) = rendered {
            let _ = writeln!(ctx.err, "{}: {}", self.name, err);
            return 1;
        }

        let report = ErrorReport {
            failures: batch
                .failures()
                .into_iter()
                .map(|(host, message)| HostFailure::new(host, message))
                .collect(),
            unconnected: batch.unconnected.clone(),
        };
        let _ = report.write_to(&mut ctx.err);

        if batch.all_succeeded() {
            0
        } else {
            1
        }
    }

    /// Drains one invocation's output into a render plan, applying the
    /// expected-result check. Errors here are that host's failure.
    fn collect(
        &self,
        output: FnOutput,
        call_args: &CallArgs,
        interrupt: &AtomicBool,
    ) -> anyhow::Result<RenderPlan> {
        match output {
            FnOutput::Unit => {
                if !matches!(self.expect, Expect::None) {
                    self.check(call_args, &Value::Null)?;
                }
                Ok(RenderPlan::Silent)
            }
            FnOutput::Value(value) => {
                self.check(call_args, &value)?;
                Ok(RenderPlan::Value(value))
            }
            FnOutput::Rows(rows) => Ok(RenderPlan::Table {
                header: match &self.columns {
                    Columns::Fixed(columns) => Some(columns.clone()),
                    Columns::FromResult => None,
                },
                rows: drain(rows, interrupt)?,
            }),
            FnOutput::Listing { columns, rows } => Ok(RenderPlan::Table {
                header: match &self.columns {
                    // A fixed declaration is returned verbatim even when
                    // the result carries its own headers.
                    Columns::Fixed(fixed) => Some(fixed.clone()),
                    Columns::FromResult => Some(columns),
                },
                rows: drain(rows, interrupt)?,
            }),
            FnOutput::Derived { properties, items } => {
                let (header, rows) = derived_rows(&properties, &items);
                Ok(RenderPlan::Table {
                    header: Some(header),
                    rows,
                })
            }
            FnOutput::Record(pairs) => Ok(RenderPlan::Record(pairs)),
        }
    }

    fn check(&self, call_args: &CallArgs, result: &Value) -> anyhow::Result<()> {
        let outcome = match &self.expect {
            Expect::None => CheckOutcome::pass(),
            Expect::Value(expected) => {
                if result == expected {
                    CheckOutcome::pass()
                } else {
                    CheckOutcome::fail(format!(
                        "unexpected result {} (expected {})",
                        result, expected
                    ))
                }
            }
            Expect::Predicate(predicate) => predicate(call_args, result),
        };
        if outcome.passed {
            Ok(())
        } else {
            bail!(outcome
                .explanation
                .unwrap_or_else(|| "result check failed".to_string()))
        }
    }
}

/// Materializes a row stream, polling the interrupt flag between lazily
/// produced rows. An error mid-iteration fails the host.
fn drain(rows: Rows, interrupt: &AtomicBool) -> anyhow::Result<Vec<Vec<Value>>> {
    match rows {
        Rows::Eager(rows) => Ok(rows),
        Rows::Lazy(iter) => {
            let mut out = Vec::new();
            for item in iter {
                if interrupt.load(Ordering::Relaxed) {
                    break;
                }
                out.push(item?);
            }
            Ok(out)
        }
    }
}

/// Evaluates property descriptors over result items.
///
/// A missing field renders [`UNKNOWN_SENTINEL`], a failed transform
/// [`ERROR_SENTINEL`]; a present-but-null field stays null and renders
/// blank downstream.
fn derived_rows(properties: &[Property], items: &[Value]) -> (Vec<String>, Vec<Vec<Value>>) {
    let header: Vec<String> = properties.iter().map(|p| p.header.clone()).collect();
    let rows = items
        .iter()
        .map(|item| {
            properties
                .iter()
                .map(|p| match &p.source {
                    PropertySource::Field(field) => item
                        .get(field)
                        .cloned()
                        .unwrap_or_else(|| Value::String(UNKNOWN_SENTINEL.into())),
                    PropertySource::Transform(f) => {
                        f(item).unwrap_or_else(|_| Value::String(ERROR_SENTINEL.into()))
                    }
                })
                .collect()
        })
        .collect();
    (header, rows)
}

impl RenderPlan {
    fn emit(&self, lister: &mut dyn Lister) -> Result<(), FormatError> {
        match self {
            RenderPlan::Silent => Ok(()),
            RenderPlan::Value(Value::Object(map)) => {
                // A bare map renders as a record, fields alphabetical.
                for (key, value) in map {
                    lister.push(Event::Row(vec![
                        Value::String(key.clone()),
                        value.clone(),
                    ]))?;
                }
                Ok(())
            }
            RenderPlan::Value(value) => lister.push(Event::Row(vec![value.clone()])),
            RenderPlan::Table { header, rows } => {
                match header {
                    Some(columns) => lister.push(Event::NewTableHeader(columns.clone()))?,
                    None => lister.push(Event::NewTable)?,
                }
                for row in rows {
                    lister.push(Event::Row(row.clone()))?;
                }
                Ok(())
            }
            RenderPlan::Record(pairs) => {
                for (name, value) in pairs {
                    lister.push(Event::Row(vec![
                        Value::String(name.clone()),
                        value.clone(),
                    ]))?;
                }
                Ok(())
            }
        }
    }
}
