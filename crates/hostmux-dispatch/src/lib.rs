//! Command declaration and dispatch for hostmux.
//!
//! This crate turns declaratively-described commands into runtime objects
//! and routes invocations through a command tree:
//!
//! - [`CommandSpec`]: the declarative description (usage grammar, function
//!   name, output columns, expected result, option shaping). Built once at
//!   plugin registration into an [`EndpointCommand`]; every declaration
//!   mistake (unknown function, bad grammar, name collisions, impossible
//!   parameters) fails at build time, not at call time.
//! - [`Usage`]: the restricted usage grammar an end-point command parses
//!   its argument slice against.
//! - The option translator: maps raw grammar names (`<pool>`, `SIZE`,
//!   `-f`, `--long-flag`) to function parameter names.
//! - [`MuxCommand`]: a non-leaf command that only routes to children by
//!   name; [`EndpointCommand`]: a leaf that parses options, repeats its
//!   associated function across the session's hosts through the execution
//!   engine, and feeds the formatter event stream.
//! - [`FunctionRegistry`]: the explicit name-to-function registry plugins
//!   populate; there is no dynamic import machinery.
//!
//! # Declaring a command
//!
//! ```rust,ignore
//! let spec = CommandSpec::new("list")
//!     .usage("list <pool> [--long]")
//!     .function("volume.list")
//!     .columns(["Name", "Size"]);
//! let command = spec.build(&registry)?;
//! ```

mod context;
mod endpoint;
mod grammar;
mod mux;
mod registry;
mod spec;
mod translate;

pub use context::{RunContext, SharedWriter};
pub use endpoint::{EndpointCommand, ERROR_SENTINEL, UNKNOWN_SENTINEL};
pub use grammar::{GrammarError, OptValue, OptionError, RawArgs, Usage};
pub use mux::{CommandNode, MuxCommand};
pub use registry::{
    Binding, CallArgs, CommandFn, FnOutput, FunctionRegistry, ParamSpec, Property,
    PropertySource, Rows,
};
pub use spec::{
    build_commands, CheckOutcome, Columns, CommandSpec, DeclarationError, Expect,
};
pub use translate::{param_name, translate, Shaping};
