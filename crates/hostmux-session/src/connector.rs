//! The transport seam.
//!
//! The framework never speaks the management protocol itself. Plugins
//! provide a [`Connector`] that knows how to open a connection to one host
//! and a [`Connection`] type representing an open connection. Associated
//! functions downcast the connection (via [`Connection::as_any`]) to
//! whatever concrete type their connector produced.

use std::any::Any;
use std::time::Duration;

use crate::credentials::Credentials;
use crate::host::HostSpec;

/// Connection parameters shared by every host of a session.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Protocol namespace handed to the connector (`--namespace`).
    pub namespace: String,
    /// Whether to verify TLS certificates (`--noverify` clears this).
    pub verify_tls: bool,
    /// Connect timeout applied by the connector.
    pub timeout: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            verify_tls: true,
            timeout: Duration::from_secs(30),
        }
    }
}

/// An open connection to one host.
pub trait Connection {
    /// The hostname this connection belongs to.
    fn hostname(&self) -> &str;

    /// Downcast support for associated functions.
    fn as_any(&mut self) -> &mut dyn Any;
}

/// Opens connections. Implemented by plugins; the framework calls it at
/// most once per host and never retries.
pub trait Connector {
    fn connect(
        &self,
        host: &HostSpec,
        credentials: &Credentials,
        options: &ConnectOptions,
    ) -> anyhow::Result<Box<dyn Connection>>;
}
