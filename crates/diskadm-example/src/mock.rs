//! A mock management connection serving canned storage inventory.
//!
//! Stands in for a real management-protocol client so the example runs
//! anywhere. Each "host" gets the same inventory, tagged with its own
//! hostname; hosts named `down*` refuse to connect, which makes partial
//! batches easy to demonstrate.

use std::any::Any;

use serde_json::{json, Value};

use hostmux::{ConnectOptions, Connection, Connector, Credentials, HostSpec};

pub struct MockConnection {
    hostname: String,
    pools: Vec<Value>,
    volumes: Vec<Value>,
}

impl MockConnection {
    fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            pools: vec![
                json!({"name": "tank", "size_gb": 512, "free_gb": 320}),
                json!({"name": "scratch", "size_gb": 128, "free_gb": 9}),
            ],
            volumes: vec![
                json!({"name": "home", "pool": "tank", "bytes": 107374182400u64, "owner": "alice"}),
                json!({"name": "builds", "pool": "scratch", "bytes": 64424509440u64, "owner": null}),
            ],
        }
    }

    pub fn pools(&self) -> &[Value] {
        &self.pools
    }

    pub fn volumes(&self) -> &[Value] {
        &self.volumes
    }

    pub fn find_pool(&self, name: &str) -> Option<&Value> {
        self.pools
            .iter()
            .find(|p| p.get("name").and_then(Value::as_str) == Some(name))
    }

    pub fn create_volume(&mut self, name: &str, pool: &str, bytes: u64) -> anyhow::Result<()> {
        if self.find_pool(pool).is_none() {
            anyhow::bail!("pool '{}' does not exist on {}", pool, self.hostname);
        }
        self.volumes.push(json!({
            "name": name,
            "pool": pool,
            "bytes": bytes,
            "owner": null,
        }));
        Ok(())
    }
}

impl Connection for MockConnection {
    fn hostname(&self) -> &str {
        &self.hostname
    }

    fn as_any(&mut self) -> &mut dyn Any {
        self
    }
}

pub struct MockConnector;

impl Connector for MockConnector {
    fn connect(
        &self,
        host: &HostSpec,
        _credentials: &Credentials,
        _options: &ConnectOptions,
    ) -> anyhow::Result<Box<dyn Connection>> {
        if host.host.starts_with("down") {
            anyhow::bail!("connection refused");
        }
        Ok(Box::new(MockConnection::new(&host.host)))
    }
}

/// Downcasts the framework connection to the mock type.
pub fn mock(conn: Option<&mut dyn Connection>) -> anyhow::Result<&mut MockConnection> {
    conn.ok_or_else(|| anyhow::anyhow!("command is session-bound"))?
        .as_any()
        .downcast_mut::<MockConnection>()
        .ok_or_else(|| anyhow::anyhow!("not a mock connection"))
}
