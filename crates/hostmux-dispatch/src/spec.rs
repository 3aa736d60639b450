//! Command declaration processing.
//!
//! [`CommandSpec`] is the declarative description a plugin writes;
//! [`CommandSpec::build`] turns it into a working [`EndpointCommand`].
//! Everything that can be wrong with a declaration - unknown function,
//! bad grammar, binding mismatch, name collisions, required parameters the
//! grammar cannot produce - surfaces here, at registration, never at call
//! time.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use hostmux_format::ListerKind;

use crate::endpoint::EndpointCommand;
use crate::grammar::{GrammarError, OptionError, Usage};
use crate::registry::{Binding, CallArgs, FunctionRegistry};
use crate::translate::{translate, Shaping};

/// Declaration-time errors. These are programmer errors: the loader logs
/// them and skips the offending command instead of crashing the CLI.
#[derive(Debug, Error)]
pub enum DeclarationError {
    #[error("command '{name}': unknown function '{function}'")]
    UnknownFunction { name: String, function: String },

    #[error("command '{name}': no function declared")]
    NoFunction { name: String },

    #[error("command '{name}': usage grammar: {source}")]
    Grammar {
        name: String,
        #[source]
        source: GrammarError,
    },

    #[error("command '{name}': usage must begin with the command name")]
    UsageMismatch { name: String },

    #[error("command '{name}': function is {actual} but the command is declared {declared}")]
    BindingMismatch {
        name: String,
        declared: Binding,
        actual: Binding,
    },

    #[error(
        "command '{name}': function requires parameter '{param}' which the usage grammar never produces"
    )]
    MissingParameter { name: String, param: String },

    #[error("command '{name}': {source}")]
    Collision {
        name: String,
        #[source]
        source: OptionError,
    },

    #[error("command '{name}': empty column list")]
    EmptyColumns { name: String },
}

/// Output column declaration.
#[derive(Debug, Clone, Default)]
pub enum Columns {
    /// The result itself supplies headers (listing) or property
    /// descriptors (derived).
    #[default]
    FromResult,
    /// A fixed header list, returned verbatim.
    Fixed(Vec<String>),
}

/// Outcome of an expected-result check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub passed: bool,
    pub explanation: Option<String>,
}

impl CheckOutcome {
    pub fn pass() -> Self {
        Self {
            passed: true,
            explanation: None,
        }
    }

    pub fn fail(explanation: impl Into<String>) -> Self {
        Self {
            passed: false,
            explanation: Some(explanation.into()),
        }
    }
}

/// Expected-result declaration.
#[derive(Clone, Default)]
pub enum Expect {
    #[default]
    None,
    /// Structural equality against this value.
    Value(Value),
    /// A predicate over `(options, result)`.
    Predicate(Arc<dyn Fn(&CallArgs, &Value) -> CheckOutcome>),
}

impl std::fmt::Debug for Expect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expect::None => write!(f, "None"),
            Expect::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Expect::Predicate(_) => f.debug_tuple("Predicate").finish(),
        }
    }
}

/// The declarative description of one end-point command.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub(crate) name: String,
    pub(crate) usage: Option<String>,
    pub(crate) function: Option<String>,
    pub(crate) columns: Columns,
    pub(crate) expect: Expect,
    pub(crate) shaping: Shaping,
    pub(crate) binding: Binding,
    pub(crate) view: Option<ListerKind>,
    pub(crate) help: Option<String>,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            usage: None,
            function: None,
            columns: Columns::FromResult,
            expect: Expect::None,
            shaping: Shaping::default(),
            binding: Binding::Session,
            view: None,
            help: None,
        }
    }

    /// The usage line. Must begin with the command name. Defaults to the
    /// bare command name (no arguments) when omitted.
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    /// The associated function's registered name.
    pub fn function(mut self, name: impl Into<String>) -> Self {
        self.function = Some(name.into());
        self
    }

    /// Fixed output columns.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Columns::Fixed(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Expect this exact result from every host.
    pub fn expect_value(mut self, value: impl Into<Value>) -> Self {
        self.expect = Expect::Value(value.into());
        self
    }

    /// Expect the predicate to pass on every host's result.
    pub fn expect_with<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CallArgs, &Value) -> CheckOutcome + 'static,
    {
        self.expect = Expect::Predicate(Arc::new(predicate));
        self
    }

    /// Suffix list-valued option names (shaping rule for `...` grammars).
    pub fn list_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.shaping.list_suffix = Some(suffix.into());
        self
    }

    /// Drop dashes from option names instead of underscoring them.
    pub fn strip_dashes(mut self) -> Self {
        self.shaping.strip_dashes = true;
        self
    }

    /// The command runs once, without a session connection.
    pub fn unbound(mut self) -> Self {
        self.binding = Binding::None;
        self
    }

    /// Prefer the single-record `name=value` view.
    pub fn record_view(mut self) -> Self {
        self.view = Some(ListerKind::Record);
        self
    }

    /// One-line description shown in multiplexer listings.
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Builds the runtime command, verifying the whole declaration.
    pub fn build(self, registry: &FunctionRegistry) -> Result<EndpointCommand, DeclarationError> {
        let name = self.name.clone();

        let function_name = self.function.clone().ok_or(DeclarationError::NoFunction {
            name: name.clone(),
        })?;
        let function =
            registry
                .get(&function_name)
                .ok_or_else(|| DeclarationError::UnknownFunction {
                    name: name.clone(),
                    function: function_name.clone(),
                })?;

        if function.binding() != self.binding {
            return Err(DeclarationError::BindingMismatch {
                name,
                declared: self.binding,
                actual: function.binding(),
            });
        }

        let usage_line = self.usage.clone().unwrap_or_else(|| name.clone());
        let mut usage = Usage::parse(&usage_line).map_err(|source| DeclarationError::Grammar {
            name: name.clone(),
            source,
        })?;
        if !usage.strip_leading_literal(&name) {
            return Err(DeclarationError::UsageMismatch { name });
        }

        // Precompute the translation over the grammar's full name set so
        // collisions surface now rather than on some argv.
        let empty = usage.match_args(&usage.skeleton()).map_err(|_| {
            // A grammar that cannot match its own required skeleton is a
            // usage mismatch in practice; report it as such.
            DeclarationError::UsageMismatch { name: name.clone() }
        })?;
        let translated =
            translate(&empty, &self.shaping).map_err(|source| DeclarationError::Collision {
                name: name.clone(),
                source,
            })?;

        let params = function.params();
        for required in &params.required {
            if !translated.contains_key(required) {
                return Err(DeclarationError::MissingParameter {
                    name,
                    param: required.clone(),
                });
            }
        }

        if let Columns::Fixed(columns) = &self.columns {
            if columns.is_empty() {
                return Err(DeclarationError::EmptyColumns { name });
            }
        }

        Ok(EndpointCommand::from_parts(self, usage, function))
    }
}

/// Builds every spec, skipping the ones that fail declaration checks.
///
/// This is the plugin-loading behavior: a broken declaration loses that
/// command (with a logged warning) without taking the rest of the plugin
/// down.
pub fn build_commands(
    specs: Vec<CommandSpec>,
    registry: &FunctionRegistry,
) -> Vec<EndpointCommand> {
    let mut commands = Vec::new();
    for spec in specs {
        let name = spec.name.clone();
        match spec.build(registry) {
            Ok(command) => commands.push(command),
            Err(err) => warn!(command = %name, error = %err, "command declaration rejected"),
        }
    }
    commands
}
