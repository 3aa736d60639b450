//! Multiplexer commands and the command tree.
//!
//! A multiplexer never executes an associated function itself: it routes
//! the next unconsumed argument token to the child of that name, or to a
//! declared fallback child with the full remaining argument list, or
//! reports "command not found".

use std::io::Write;

use hostmux_session::Session;

use crate::context::RunContext;
use crate::endpoint::EndpointCommand;

/// A node of the command tree.
pub enum CommandNode {
    Endpoint(EndpointCommand),
    Mux(MuxCommand),
}

impl CommandNode {
    pub fn name(&self) -> &str {
        match self {
            CommandNode::Endpoint(cmd) => cmd.name(),
            CommandNode::Mux(mux) => mux.name(),
        }
    }

    pub fn summary(&self) -> &str {
        match self {
            CommandNode::Endpoint(cmd) => cmd.summary(),
            CommandNode::Mux(mux) => mux.summary(),
        }
    }

    /// Runs this node with its slice of the argument vector. The node's
    /// own name has already been consumed and pushed onto the context's
    /// command path by the parent.
    pub fn run(&self, args: &[String], session: &mut Session, ctx: &mut RunContext) -> i32 {
        match self {
            CommandNode::Endpoint(cmd) => cmd.run(args, session, ctx),
            CommandNode::Mux(mux) => mux.run(args, session, ctx),
        }
    }
}

impl From<EndpointCommand> for CommandNode {
    fn from(cmd: EndpointCommand) -> Self {
        CommandNode::Endpoint(cmd)
    }
}

impl From<MuxCommand> for CommandNode {
    fn from(mux: MuxCommand) -> Self {
        CommandNode::Mux(mux)
    }
}

/// A non-leaf command: routes a sub-name to a child.
pub struct MuxCommand {
    name: String,
    help: Option<String>,
    children: Vec<CommandNode>,
    fallback: Option<Box<CommandNode>>,
}

impl MuxCommand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: None,
            children: Vec::new(),
            fallback: None,
        }
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn child(mut self, node: impl Into<CommandNode>) -> Self {
        self.children.push(node.into());
        self
    }

    /// The child that receives the full remaining argument list when no
    /// declared child name matches.
    pub fn fallback(mut self, node: impl Into<CommandNode>) -> Self {
        self.fallback = Some(Box::new(node.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn summary(&self) -> &str {
        self.help
            .as_deref()
            .and_then(|h| h.lines().next())
            .unwrap_or("")
    }

    pub fn children(&self) -> &[CommandNode] {
        &self.children
    }

    /// The auto-generated usage listing: child names and summaries.
    pub fn usage_text(&self, ctx: &RunContext) -> String {
        let path = ctx.spaced_path();
        let mut text = format!("usage: {} <command> [<args>...]\n\ncommands:\n", path);
        let width = self
            .children
            .iter()
            .map(|c| c.name().len())
            .max()
            .unwrap_or(0);
        for child in &self.children {
            let summary = child.summary();
            if summary.is_empty() {
                text.push_str(&format!("  {}\n", child.name()));
            } else {
                text.push_str(&format!(
                    "  {:<width$}  {}\n",
                    child.name(),
                    summary,
                    width = width
                ));
            }
        }
        text
    }

    pub fn run(&self, args: &[String], session: &mut Session, ctx: &mut RunContext) -> i32 {
        match args.first().map(String::as_str) {
            None => {
                if let Some(fallback) = &self.fallback {
                    return fallback.run(args, session, ctx);
                }
                let _ = write!(ctx.err, "{}", self.usage_text(ctx));
                1
            }
            Some("--help") | Some("-h") | Some("help") => {
                let _ = write!(ctx.out, "{}", self.usage_text(ctx));
                0
            }
            Some(token) => {
                if let Some(child) = self.children.iter().find(|c| c.name() == token) {
                    ctx.command_path.push(token.to_string());
                    let code = child.run(&args[1..], session, ctx);
                    ctx.command_path.pop();
                    return code;
                }
                if let Some(fallback) = &self.fallback {
                    // The fallback sees the full remaining argument list.
                    return fallback.run(args, session, ctx);
                }
                let _ = writeln!(ctx.err, "{}: command not found: {}", self.name, token);
                let _ = write!(ctx.err, "{}", self.usage_text(ctx));
                1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SharedWriter;
    use crate::registry::{CallArgs, CommandFn, FnOutput, FunctionRegistry, ParamSpec};
    use crate::spec::CommandSpec;
    use hostmux_session::{
        ConnectOptions, Connection, Connector, Credentials, HostSpec, SessionConfig,
    };
    use serde_json::{json, Value};
    use std::any::Any;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct FakeConnection {
        host: String,
    }

    impl Connection for FakeConnection {
        fn hostname(&self) -> &str {
            &self.host
        }

        fn as_any(&mut self) -> &mut dyn Any {
            self
        }
    }

    struct FakeConnector;

    impl Connector for FakeConnector {
        fn connect(
            &self,
            host: &HostSpec,
            _credentials: &Credentials,
            _options: &ConnectOptions,
        ) -> anyhow::Result<Box<dyn Connection>> {
            Ok(Box::new(FakeConnection {
                host: host.host.clone(),
            }))
        }
    }

    fn session() -> Session {
        Session::new(
            vec![HostSpec::new("h")],
            Box::new(FakeConnector),
            SessionConfig::default(),
        )
    }

    fn context() -> (RunContext, Rc<RefCell<Vec<u8>>>, Rc<RefCell<Vec<u8>>>) {
        let (out, out_buf) = SharedWriter::buffer();
        let (err, err_buf) = SharedWriter::buffer();
        let mut ctx = RunContext::new(out, err);
        ctx.command_path = vec!["app".into()];
        (ctx, out_buf, err_buf)
    }

    fn text(buf: &Rc<RefCell<Vec<u8>>>) -> String {
        String::from_utf8(buf.borrow().clone()).unwrap()
    }

    struct EchoFn(Value);

    impl CommandFn for EchoFn {
        fn params(&self) -> ParamSpec {
            ParamSpec::new()
        }

        fn invoke(
            &self,
            _conn: Option<&mut dyn Connection>,
            _args: &CallArgs,
        ) -> anyhow::Result<FnOutput> {
            Ok(FnOutput::Value(self.0.clone()))
        }
    }

    fn endpoint(name: &str, value: Value) -> EndpointCommand {
        let mut registry = FunctionRegistry::new();
        registry.register("echo", EchoFn(value));
        CommandSpec::new(name)
            .function("echo")
            .help(format!("run {}", name))
            .build(&registry)
            .unwrap()
    }

    #[test]
    fn test_routes_to_named_child() {
        let mux = MuxCommand::new("volume")
            .child(endpoint("list", json!("listed")))
            .child(endpoint("show", json!("shown")));
        let (mut ctx, out, _) = context();
        let code = mux.run(
            &["show".to_string()],
            &mut session(),
            &mut ctx,
        );
        assert_eq!(code, 0);
        assert_eq!(text(&out), "shown\n");
        // Path is restored after the child returns.
        assert_eq!(ctx.command_path, vec!["app"]);
    }

    #[test]
    fn test_unknown_child_without_fallback() {
        let mux = MuxCommand::new("volume").child(endpoint("list", json!(1)));
        let (mut ctx, _, err) = context();
        let code = mux.run(&["frobnicate".to_string()], &mut session(), &mut ctx);
        assert_eq!(code, 1);
        let message = text(&err);
        assert!(message.contains("command not found: frobnicate"));
        assert!(message.contains("list"));
    }

    #[test]
    fn test_fallback_receives_full_args() {
        let mux = MuxCommand::new("volume")
            .child(endpoint("list", json!(1)))
            .fallback(endpoint("show", json!("fell back")));
        let (mut ctx, out, _) = context();
        // "v0" is not a child name; the fallback sees it as its argument
        // list. EchoFn's grammar has no positionals, so pass nothing.
        let code = mux.run(&[] as &[String], &mut session(), &mut ctx);
        assert_eq!(code, 0);
        assert_eq!(text(&out), "fell back\n");
    }

    #[test]
    fn test_help_lists_children() {
        let mux = MuxCommand::new("volume")
            .child(endpoint("list", json!(1)))
            .child(endpoint("show", json!(2)));
        let (mut ctx, out, _) = context();
        let code = mux.run(&["--help".to_string()], &mut session(), &mut ctx);
        assert_eq!(code, 0);
        let help = text(&out);
        assert!(help.contains("usage: app <command>"));
        assert!(help.contains("list"));
        assert!(help.contains("run show"));
    }

    #[test]
    fn test_naked_mux_without_fallback_prints_usage() {
        let mux = MuxCommand::new("volume").child(endpoint("list", json!(1)));
        let (mut ctx, _, err) = context();
        let code = mux.run(&[] as &[String], &mut session(), &mut ctx);
        assert_eq!(code, 1);
        assert!(text(&err).contains("commands:"));
    }

    #[test]
    fn test_nested_mux_path() {
        let inner = MuxCommand::new("snapshot").child(endpoint("list", json!("snaps")));
        let mux = MuxCommand::new("volume").child(inner);
        let (mut ctx, out, _) = context();
        let code = mux.run(
            &["snapshot".to_string(), "list".to_string()],
            &mut session(),
            &mut ctx,
        );
        assert_eq!(code, 0);
        assert_eq!(text(&out), "snaps\n");
    }
}
