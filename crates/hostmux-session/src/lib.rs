//! Host sessions and per-host batch execution.
//!
//! A [`Session`] owns the set of target hosts for one CLI invocation. It
//! establishes at most one connection per host, lazily, on first use, and
//! tolerates hosts that cannot be reached: a failed host is remembered in
//! the unconnected set and excluded from iteration instead of aborting the
//! batch.
//!
//! The actual transport is a plugin concern. Plugins implement
//! [`Connector`] (how to open a connection) and [`Connection`] (what an
//! open connection is); the framework never looks inside either beyond the
//! hostname.
//!
//! [`run_per_host`] is the execution engine: it walks the session's live
//! connections in registration order, invokes a closure once per host, and
//! collects per-host success or failure into a [`Batch`] without letting
//! any single host's error escape.

mod connector;
mod credentials;
mod engine;
mod error;
mod host;
mod hostsfile;
mod session;

pub use connector::{ConnectOptions, Connection, Connector};
pub use credentials::Credentials;
pub use engine::{run_per_host, Batch, HostResult};
pub use error::SessionError;
pub use host::HostSpec;
pub use hostsfile::load_hosts_file;
pub use session::{Session, SessionConfig};
