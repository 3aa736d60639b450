//! # hostmux - multi-host admin CLI framework
//!
//! hostmux is the reusable core under a family of system-administration
//! CLI plugins. A plugin supplies thin *associated functions* - each
//! performing one remote operation - and declares commands over them;
//! hostmux supplies everything else:
//!
//! - declarative commands: usage grammar, option translation, output
//!   columns, expected-result checks ([`CommandSpec`])
//! - the command tree: multiplexers routing to sub-commands
//!   ([`MuxCommand`]), end-points invoking functions ([`EndpointCommand`])
//! - the session: lazy one-connection-per-host, cached credentials,
//!   tolerant of unreachable hosts ([`Session`])
//! - batch execution: one invocation per host, per-host success/failure
//!   collected without aborting the batch
//! - the formatter pipeline: aligned tables, CSV, immediate rows,
//!   single-record views, and the host-grouped error report
//!
//! # Building a plugin CLI
//!
//! ```rust,ignore
//! use hostmux::{App, CommandSpec, MuxCommand};
//!
//! let mut registry = FunctionRegistry::new();
//! registry.register("volume.list", ListVolumes);
//!
//! App::builder("diskadm")
//!     .version("1.0.0")
//!     .connector(Box::new(WbemConnector::new()))
//!     .functions(registry)
//!     .group("volume", vec![
//!         CommandSpec::new("list")
//!             .usage("list [--long]")
//!             .function("volume.list"),
//!     ])
//!     .build()?
//!     .main();
//! ```

mod app;
mod cli;
mod interactive;
mod logging;

pub use app::{App, AppBuilder};
pub use cli::{GlobalOpts, ListerFormat};
pub use interactive::run_loop;
pub use logging::{init_logging, LogOptions};

// The framework surface, re-exported so plugins depend on one crate.
pub use hostmux_dispatch::{
    build_commands, Binding, CallArgs, CheckOutcome, Columns, CommandFn, CommandNode,
    CommandSpec, DeclarationError, EndpointCommand, Expect, FnOutput, FunctionRegistry,
    GrammarError, MuxCommand, OptionError, ParamSpec, Property, PropertySource, RawArgs, Rows,
    RunContext, SharedWriter, Usage,
};
pub use hostmux_format::{
    ErrorReport, Event, FormatError, FormatOptions, HostFailure, Lister, ListerKind,
};
pub use hostmux_session::{
    load_hosts_file, run_per_host, Batch, ConnectOptions, Connection, Connector, Credentials,
    HostResult, HostSpec, Session, SessionConfig, SessionError,
};
