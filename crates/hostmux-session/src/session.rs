//! The session: target hosts, lazy connections, cached credentials.

use tracing::{debug, warn};

use crate::connector::{ConnectOptions, Connection, Connector};
use crate::credentials::Credentials;
use crate::host::HostSpec;

/// Session-wide settings resolved from the global CLI flags.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Explicit `--user`; takes precedence over hosts-file credentials.
    pub user: Option<String>,
    /// Share the first verified host's credentials with later hosts.
    pub same_credentials: bool,
    /// Connection parameters passed to the connector.
    pub connect: ConnectOptions,
}

struct HostSlot {
    spec: HostSpec,
    credentials: Credentials,
    connection: Option<Box<dyn Connection>>,
    failed: bool,
}

/// The set of target hosts for one CLI invocation.
///
/// Hosts keep their registration order. Each host gets at most one
/// connection, created on first access; a host whose connection attempt
/// fails is marked unconnected and never retried. The session is the only
/// owner of the connection map and the credential cache - commands reach
/// both exclusively through the execution engine.
pub struct Session {
    slots: Vec<HostSlot>,
    connector: Box<dyn Connector>,
    config: SessionConfig,
    /// Credentials of the first verified host, when sharing is enabled.
    shared: Option<Credentials>,
}

impl Session {
    /// Builds a session over `hosts` in the given order.
    ///
    /// A hostname that appears twice keeps its first entry only; duplicates
    /// are dropped with a warning so the one-connection-per-host invariant
    /// holds by construction.
    pub fn new(hosts: Vec<HostSpec>, connector: Box<dyn Connector>, config: SessionConfig) -> Self {
        let mut slots: Vec<HostSlot> = Vec::with_capacity(hosts.len());
        for spec in hosts {
            if slots.iter().any(|s| s.spec.host == spec.host) {
                warn!(host = %spec.host, "duplicate host ignored");
                continue;
            }
            let user = config.user.clone().or_else(|| spec.user.clone());
            let credentials = Credentials::new(user, spec.password.clone());
            slots.push(HostSlot {
                spec,
                credentials,
                connection: None,
                failed: false,
            });
        }
        Self {
            slots,
            connector,
            config,
            shared: None,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Hostnames in registration order.
    pub fn hostnames(&self) -> Vec<String> {
        self.slots.iter().map(|s| s.spec.host.clone()).collect()
    }

    pub fn hostname(&self, index: usize) -> &str {
        &self.slots[index].spec.host
    }

    /// The cached credentials for a host, if the host is registered.
    pub fn credentials(&self, host: &str) -> Option<&Credentials> {
        self.slots
            .iter()
            .find(|s| s.spec.host == host)
            .map(|s| &s.credentials)
    }

    /// Returns the host's connection, connecting on first access.
    ///
    /// On failure the slot is marked unconnected, the error is logged, and
    /// `None` is returned - now and on every later call. There is no
    /// automatic retry.
    pub fn connect_on_demand(&mut self, index: usize) -> Option<&mut (dyn Connection + 'static)> {
        let needs_attempt = {
            let slot = &self.slots[index];
            slot.connection.is_none() && !slot.failed
        };

        if needs_attempt {
            // Borrow shared credentials before taking the slot mutably.
            let shared = self.shared.clone();
            let slot = &mut self.slots[index];
            if slot.credentials.is_empty() && self.config.same_credentials {
                if let Some(shared) = shared {
                    debug!(host = %slot.spec.host, "using shared credentials");
                    slot.credentials.user = shared.user;
                    slot.credentials.password = shared.password;
                }
            }
            match self
                .connector
                .connect(&slot.spec, &slot.credentials, &self.config.connect)
            {
                Ok(connection) => {
                    debug!(host = %slot.spec.host, "connected");
                    slot.connection = Some(connection);
                    slot.credentials.verified = true;
                    if self.config.same_credentials && self.shared.is_none() {
                        self.shared = Some(slot.credentials.clone());
                    }
                }
                Err(err) => {
                    warn!(host = %slot.spec.host, error = %err, "connection failed");
                    slot.failed = true;
                }
            }
        }

        self.slots[index].connection.as_deref_mut()
    }

    /// Hostnames that never yielded a connection, in registration order.
    pub fn unconnected(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter(|s| s.failed)
            .map(|s| s.spec.host.clone())
            .collect()
    }

    /// Number of currently live connections.
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.connection.is_some()).count()
    }
}
