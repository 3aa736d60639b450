//! Application assembly and the top-level run loop.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use clap::{CommandFactory, FromArgMatches};
use tracing::warn;

use hostmux_dispatch::{
    build_commands, CommandNode, CommandSpec, FunctionRegistry, MuxCommand, RunContext,
    SharedWriter,
};
use hostmux_format::ListerKind;
use hostmux_session::{
    load_hosts_file, ConnectOptions, Connector, HostSpec, Session, SessionConfig,
};

use crate::cli::GlobalOpts;
use crate::interactive;
use crate::logging::{init_logging, LogOptions};

/// The process-wide interrupt flag, flipped by Ctrl-C.
///
/// Signal delivery is inherently process-global; everything else the
/// framework shares travels through explicit contexts.
fn interrupt_flag() -> Arc<AtomicBool> {
    static FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();
    let flag = FLAG.get_or_init(|| {
        let flag = Arc::new(AtomicBool::new(false));
        let handler_flag = Arc::clone(&flag);
        // Installation fails in environments without signal access; the
        // flag then simply never fires.
        let _ = ctrlc::set_handler(move || {
            handler_flag.store(true, Ordering::Relaxed);
        });
        flag
    });
    Arc::clone(flag)
}

enum Pending {
    Command(CommandSpec),
    Group {
        name: String,
        help: Option<String>,
        specs: Vec<CommandSpec>,
    },
    Node(CommandNode),
}

/// Builder for [`App`].
pub struct AppBuilder {
    name: String,
    version: Option<String>,
    about: Option<String>,
    registry: FunctionRegistry,
    pending: Vec<Pending>,
    fallback: Option<CommandSpec>,
    connector: Option<Box<dyn Connector>>,
    connect_timeout: Duration,
    out: SharedWriter,
    err: SharedWriter,
}

impl AppBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            about: None,
            registry: FunctionRegistry::new(),
            pending: Vec::new(),
            fallback: None,
            connector: None,
            connect_timeout: Duration::from_secs(30),
            out: SharedWriter::stdout(),
            err: SharedWriter::stderr(),
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    /// The function registry commands resolve against.
    pub fn functions(mut self, registry: FunctionRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// A top-level end-point command.
    pub fn command(mut self, spec: CommandSpec) -> Self {
        self.pending.push(Pending::Command(spec));
        self
    }

    /// A multiplexer with the given sub-command declarations.
    pub fn group(mut self, name: impl Into<String>, specs: Vec<CommandSpec>) -> Self {
        self.pending.push(Pending::Group {
            name: name.into(),
            help: None,
            specs,
        });
        self
    }

    /// Like [`AppBuilder::group`] with a summary line for listings.
    pub fn group_with_help(
        mut self,
        name: impl Into<String>,
        help: impl Into<String>,
        specs: Vec<CommandSpec>,
    ) -> Self {
        self.pending.push(Pending::Group {
            name: name.into(),
            help: Some(help.into()),
            specs,
        });
        self
    }

    /// A prebuilt tree node.
    pub fn node(mut self, node: impl Into<CommandNode>) -> Self {
        self.pending.push(Pending::Node(node.into()));
        self
    }

    /// The command that receives unrecognized top-level tokens.
    pub fn fallback(mut self, spec: CommandSpec) -> Self {
        self.fallback = Some(spec);
        self
    }

    pub fn connector(mut self, connector: Box<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Connect timeout handed to the connector for every host.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Redirects output streams; defaults are stdout/stderr.
    pub fn output(mut self, out: SharedWriter, err: SharedWriter) -> Self {
        self.out = out;
        self.err = err;
        self
    }

    /// Assembles the application. Broken command declarations are logged
    /// and skipped; a missing connector is fatal.
    pub fn build(self) -> anyhow::Result<App> {
        let connector = self
            .connector
            .ok_or_else(|| anyhow::anyhow!("no connector configured"))?;

        let mut root = MuxCommand::new(self.name.clone());
        for pending in self.pending {
            match pending {
                Pending::Command(spec) => {
                    for command in build_commands(vec![spec], &self.registry) {
                        root = root.child(command);
                    }
                }
                Pending::Group { name, help, specs } => {
                    let commands = build_commands(specs, &self.registry);
                    if commands.is_empty() {
                        warn!(group = %name, "group has no valid commands, skipped");
                        continue;
                    }
                    let mut mux = MuxCommand::new(name);
                    if let Some(help) = help {
                        mux = mux.help(help);
                    }
                    for command in commands {
                        mux = mux.child(command);
                    }
                    root = root.child(mux);
                }
                Pending::Node(node) => {
                    root = root.child(node);
                }
            }
        }
        if let Some(spec) = self.fallback {
            match spec.build(&self.registry) {
                Ok(command) => root = root.fallback(command),
                Err(err) => warn!(error = %err, "fallback declaration rejected"),
            }
        }

        Ok(App {
            name: self.name,
            version: self.version,
            about: self.about,
            root,
            connector,
            connect_timeout: self.connect_timeout,
            out: self.out,
            err: self.err,
        })
    }
}

/// A fully assembled CLI application: the command tree plus everything
/// needed to build a session and dispatch one invocation (or an
/// interactive run of them).
pub struct App {
    name: String,
    version: Option<String>,
    about: Option<String>,
    root: MuxCommand,
    connector: Box<dyn Connector>,
    connect_timeout: Duration,
    out: SharedWriter,
    err: SharedWriter,
}

impl App {
    pub fn builder(name: impl Into<String>) -> AppBuilder {
        AppBuilder::new(name)
    }

    /// Parses argv, builds the session, and dispatches. Returns the
    /// process exit code.
    pub fn run<I, S>(self, argv: I) -> i32
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv: Vec<String> = argv.into_iter().map(Into::into).collect();

        let mut command = GlobalOpts::command().name(self.name.clone());
        if let Some(version) = &self.version {
            command = command.version(version.clone());
        }
        if let Some(about) = &self.about {
            command = command.about(about.clone());
        }

        let matches = match command.try_get_matches_from(&argv) {
            Ok(matches) => matches,
            Err(err) => {
                use clap::error::ErrorKind;
                let code = match err.kind() {
                    ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                    _ => 1,
                };
                let _ = err.print();
                return code;
            }
        };
        let opts = match GlobalOpts::from_arg_matches(&matches) {
            Ok(opts) => opts,
            Err(err) => {
                let _ = err.print();
                return 1;
            }
        };

        self.execute(opts)
    }

    /// Parses `std::env::args` and exits the process with the result.
    pub fn main(self) -> ! {
        let args: Vec<String> = std::env::args().collect();
        std::process::exit(self.run(args))
    }

    fn execute(self, opts: GlobalOpts) -> i32 {
        let mut err = self.err.clone();

        if let Err(error) = init_logging(&LogOptions {
            verbosity: opts.verbose,
            quiet: opts.quiet,
            trace: opts.trace && !opts.notrace,
            log_file: opts.log_file.clone(),
        }) {
            let _ = writeln!(err, "{}: cannot open log file: {}", self.name, error);
            return 1;
        }

        let mut hosts = Vec::new();
        for spec in &opts.hosts {
            match HostSpec::parse(spec) {
                Ok(host) => hosts.push(host),
                Err(error) => {
                    let _ = writeln!(err, "{}: {}", self.name, error);
                    return 1;
                }
            }
        }
        if let Some(path) = &opts.hosts_file {
            match load_hosts_file(path) {
                Ok(file_hosts) => hosts.extend(file_hosts),
                Err(error) => {
                    let _ = writeln!(err, "{}: {}", self.name, error);
                    return 1;
                }
            }
        }

        let config = SessionConfig {
            user: opts.user.clone(),
            same_credentials: opts.same_credentials,
            connect: ConnectOptions {
                namespace: opts.namespace.clone().unwrap_or_default(),
                verify_tls: !opts.noverify,
                timeout: self.connect_timeout,
            },
        };
        let mut session = Session::new(hosts, self.connector, config);

        let mut ctx = RunContext::new(self.out, self.err);
        ctx.lister_format = opts.lister_format.map(Into::into);
        ctx.human_friendly = opts.human_friendly;
        ctx.show_headings = !opts.no_headings;
        ctx.default_kind = if atty::is(atty::Stream::Stdout) {
            ListerKind::Table
        } else {
            ListerKind::Immediate
        };
        ctx.interrupt = interrupt_flag();
        ctx.interrupt.store(false, Ordering::Relaxed);
        ctx.command_path = vec![self.name.clone()];

        if opts.command.is_empty() {
            let prompt = atty::is(atty::Stream::Stdin).then_some(self.name.as_str());
            let stdin = std::io::stdin();
            interactive::run_loop(stdin.lock(), prompt, &self.root, &mut session, &mut ctx)
        } else {
            self.root.run(&opts.command, &mut session, &mut ctx)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostmux_dispatch::{CallArgs, CommandFn, FnOutput, ParamSpec};
    use hostmux_session::{Connection, Credentials};
    use serde_json::json;
    use std::any::Any;
    use std::cell::RefCell;
    use std::io::Write as _;
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

    struct FakeConnector {
        fail: Vec<String>,
        seen: Rc<RefCell<Vec<(String, Credentials)>>>,
    }

    impl FakeConnector {
        fn new() -> Self {
            Self {
                fail: Vec::new(),
                seen: Rc::new(RefCell::new(Vec::new())),
            }
        }
    }

    impl Connector for FakeConnector {
        fn connect(
            &self,
            host: &HostSpec,
            credentials: &Credentials,
            _options: &ConnectOptions,
        ) -> anyhow::Result<Box<dyn Connection>> {
            self.seen
                .borrow_mut()
                .push((host.host.clone(), credentials.clone()));
            if self.fail.contains(&host.host) {
                anyhow::bail!("unreachable");
            }
            Ok(Box::new(FakeConnection {
                host: host.host.clone(),
            }))
        }
    }

    struct PingFn;

    impl CommandFn for PingFn {
        fn params(&self) -> ParamSpec {
            ParamSpec::new()
        }

        fn invoke(
            &self,
            _conn: Option<&mut dyn Connection>,
            _args: &CallArgs,
        ) -> anyhow::Result<FnOutput> {
            Ok(FnOutput::Value(json!("pong")))
        }
    }

    fn registry() -> FunctionRegistry {
        let mut registry = FunctionRegistry::new();
        registry.register("ping", PingFn);
        registry
    }

    fn app(connector: FakeConnector) -> (App, Rc<RefCell<Vec<u8>>>, Rc<RefCell<Vec<u8>>>) {
        let (out, out_buf) = SharedWriter::buffer();
        let (err, err_buf) = SharedWriter::buffer();
        let app = App::builder("adm")
            .version("0.0.1")
            .connector(Box::new(connector))
            .functions(registry())
            .command(CommandSpec::new("ping").function("ping"))
            .output(out, err)
            .build()
            .unwrap();
        (app, out_buf, err_buf)
    }

    fn text(buf: &Rc<RefCell<Vec<u8>>>) -> String {
        String::from_utf8(buf.borrow().clone()).unwrap()
    }

    #[test]
    fn test_single_command_roundtrip() {
        let (app, out, _) = app(FakeConnector::new());
        let code = app.run(["adm", "--host", "h1", "ping"]);
        assert_eq!(code, 0);
        assert_eq!(text(&out), "pong\n");
    }

    #[test]
    fn test_unknown_command_exits_one() {
        let (app, _, err) = app(FakeConnector::new());
        let code = app.run(["adm", "--host", "h1", "nosuch"]);
        assert_eq!(code, 1);
        assert!(text(&err).contains("command not found: nosuch"));
    }

    #[test]
    fn test_hosts_file_builds_session() {
        // --hosts-file with two bare hostnames and no --user: both hosts
        // registered, both with empty credentials.
        let connector = FakeConnector::new();
        let seen = Rc::clone(&connector.seen);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"host1\nhost2\n").unwrap();

        let (app, _, _) = app(connector);
        let code = app.run([
            "adm",
            "--hosts-file",
            file.path().to_str().unwrap(),
            "ping",
        ]);
        assert_eq!(code, 0);
        let seen = seen.borrow();
        let hosts: Vec<&str> = seen.iter().map(|(h, _)| h.as_str()).collect();
        assert_eq!(hosts, vec!["host1", "host2"]);
        assert!(seen.iter().all(|(_, creds)| creds.is_empty()));
    }

    #[test]
    fn test_partial_failure_exit_code_and_report() {
        let mut connector = FakeConnector::new();
        connector.fail = vec!["bad".into()];
        let (app, out, err) = app(connector);
        let code = app.run(["adm", "--host", "good", "--host", "bad", "ping"]);
        assert_eq!(code, 1);
        assert!(text(&out).contains("==== good ===="));
        assert!(text(&err).contains("Could not connect:\n  bad"));
    }

    #[test]
    fn test_user_flag_reaches_connector() {
        let connector = FakeConnector::new();
        let seen = Rc::clone(&connector.seen);
        let (app, _, _) = app(connector);
        let code = app.run(["adm", "--host", "h1", "--user", "admin", "ping"]);
        assert_eq!(code, 0);
        assert_eq!(seen.borrow()[0].1.user.as_deref(), Some("admin"));
    }

    #[test]
    fn test_lister_format_csv() {
        let (app, out, _) = app(FakeConnector::new());
        let code = app.run(["adm", "--host", "h1", "--lister-format", "csv", "ping"]);
        assert_eq!(code, 0);
        assert_eq!(text(&out), "pong\n");
    }

    #[test]
    fn test_bad_host_spec_fails_before_dispatch() {
        let connector = FakeConnector::new();
        let seen = Rc::clone(&connector.seen);
        let (app, _, err) = app(connector);
        let code = app.run(["adm", "--host", "h:badport", "ping"]);
        assert_eq!(code, 1);
        assert_eq!(seen.borrow().len(), 0);
        assert!(text(&err).contains("invalid port"));
    }

    #[test]
    fn test_missing_connector_rejected() {
        let result = App::builder("adm").functions(registry()).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_broken_declaration_skipped_not_fatal() {
        let (out, _) = SharedWriter::buffer();
        let (err, _) = SharedWriter::buffer();
        let app = App::builder("adm")
            .connector(Box::new(FakeConnector::new()))
            .functions(registry())
            .command(CommandSpec::new("ping").function("ping"))
            .command(CommandSpec::new("broken").function("missing"))
            .output(out, err)
            .build()
            .unwrap();
        // The broken command is gone; the good one still dispatches.
        assert_eq!(app.run(["adm", "--host", "h", "ping"]), 0);
    }

    #[test]
    fn test_group_routes_two_levels() {
        let (out, out_buf) = SharedWriter::buffer();
        let (err, _) = SharedWriter::buffer();
        let app = App::builder("adm")
            .connector(Box::new(FakeConnector::new()))
            .functions(registry())
            .group("net", vec![CommandSpec::new("ping").function("ping")])
            .output(out, err)
            .build()
            .unwrap();
        assert_eq!(app.run(["adm", "--host", "h", "net", "ping"]), 0);
        assert_eq!(text(&out_buf), "pong\n");
    }
}
