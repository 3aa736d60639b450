//! Associated functions and command declarations for the example plugin.

use serde_json::{json, Value};

use hostmux::{
    CallArgs, CommandFn, CommandSpec, Connection, FnOutput, FunctionRegistry, ParamSpec,
    Property, Rows,
};

use crate::mock::mock;

/// `pool.list`: fixed-column listing.
struct PoolList;

impl CommandFn for PoolList {
    fn params(&self) -> ParamSpec {
        ParamSpec::new()
    }

    fn invoke(
        &self,
        conn: Option<&mut dyn Connection>,
        _args: &CallArgs,
    ) -> anyhow::Result<FnOutput> {
        let conn = mock(conn)?;
        let rows: Vec<Vec<Value>> = conn
            .pools()
            .iter()
            .map(|p| {
                vec![
                    p["name"].clone(),
                    p["size_gb"].clone(),
                    p["free_gb"].clone(),
                ]
            })
            .collect();
        Ok(FnOutput::Rows(Rows::Eager(rows)))
    }
}

/// `pool.show`: one pool as a record.
struct PoolShow;

impl CommandFn for PoolShow {
    fn params(&self) -> ParamSpec {
        ParamSpec::new().required(["pool"])
    }

    fn invoke(
        &self,
        conn: Option<&mut dyn Connection>,
        args: &CallArgs,
    ) -> anyhow::Result<FnOutput> {
        let conn = mock(conn)?;
        let name = args
            .get("pool")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("missing pool name"))?;
        let pool = conn
            .find_pool(name)
            .ok_or_else(|| anyhow::anyhow!("pool '{}' not found", name))?;
        Ok(FnOutput::Record(vec![
            ("name".into(), pool["name"].clone()),
            ("size_gb".into(), pool["size_gb"].clone()),
            ("free_gb".into(), pool["free_gb"].clone()),
        ]))
    }
}

/// `volume.list`: derived columns with a transform.
struct VolumeList;

impl CommandFn for VolumeList {
    fn params(&self) -> ParamSpec {
        ParamSpec::new().optional(["pool"])
    }

    fn invoke(
        &self,
        conn: Option<&mut dyn Connection>,
        args: &CallArgs,
    ) -> anyhow::Result<FnOutput> {
        let conn = mock(conn)?;
        let filter = args.get("pool").and_then(Value::as_str).map(str::to_string);
        let items: Vec<Value> = conn
            .volumes()
            .iter()
            .filter(|v| match &filter {
                Some(pool) => v.get("pool").and_then(Value::as_str) == Some(pool),
                None => true,
            })
            .cloned()
            .collect();
        Ok(FnOutput::Derived {
            properties: vec![
                Property::field("Name", "name"),
                Property::field("Pool", "pool"),
                Property::field("Owner", "owner"),
                Property::transform("GiB", |v| {
                    let bytes = v
                        .get("bytes")
                        .and_then(Value::as_u64)
                        .ok_or_else(|| anyhow::anyhow!("no byte count"))?;
                    Ok(json!(bytes >> 30))
                }),
            ],
            items,
        })
    }
}

/// `volume.create`: mutation with option verification.
struct VolumeCreate;

fn parse_size(size: &str) -> Option<u64> {
    let size = size.to_ascii_lowercase();
    let (digits, shift) = match size.strip_suffix('g') {
        Some(d) => (d, 30),
        None => (size.strip_suffix('m')?, 20),
    };
    digits.parse::<u64>().ok().map(|n| n << shift)
}

impl CommandFn for VolumeCreate {
    fn params(&self) -> ParamSpec {
        ParamSpec::new().required(["vol", "pool", "size"])
    }

    fn verify_options(&self, args: &CallArgs) -> Result<(), String> {
        match args.get("size").and_then(Value::as_str) {
            Some(size) if parse_size(size).is_some() => Ok(()),
            Some(size) => Err(format!("invalid size '{}': use e.g. 10g or 512m", size)),
            None => Err("missing size".into()),
        }
    }

    fn invoke(
        &self,
        conn: Option<&mut dyn Connection>,
        args: &CallArgs,
    ) -> anyhow::Result<FnOutput> {
        let conn = mock(conn)?;
        let vol = args.get("vol").and_then(Value::as_str).unwrap_or_default();
        let pool = args.get("pool").and_then(Value::as_str).unwrap_or_default();
        let bytes = args
            .get("size")
            .and_then(Value::as_str)
            .and_then(parse_size)
            .ok_or_else(|| anyhow::anyhow!("invalid size"))?;
        conn.create_volume(vol, pool, bytes)?;
        Ok(FnOutput::Unit)
    }
}

/// `ping`: expected-result command, returns 0 on a healthy target.
struct Ping;

impl CommandFn for Ping {
    fn params(&self) -> ParamSpec {
        ParamSpec::new()
    }

    fn invoke(
        &self,
        conn: Option<&mut dyn Connection>,
        _args: &CallArgs,
    ) -> anyhow::Result<FnOutput> {
        let _ = mock(conn)?;
        Ok(FnOutput::Value(json!(0)))
    }
}

/// Registers every associated function.
pub fn functions() -> FunctionRegistry {
    let mut registry = FunctionRegistry::new();
    registry.register("pool.list", PoolList);
    registry.register("pool.show", PoolShow);
    registry.register("volume.list", VolumeList);
    registry.register("volume.create", VolumeCreate);
    registry.register("ping", Ping);
    registry
}

/// The `pool` sub-command declarations.
pub fn pool_commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("list")
            .usage("list")
            .function("pool.list")
            .columns(["Name", "SizeGB", "FreeGB"])
            .help("List storage pools"),
        CommandSpec::new("show")
            .usage("show <pool>")
            .function("pool.show")
            .record_view()
            .help("Show one pool in detail"),
    ]
}

/// The `volume` sub-command declarations.
pub fn volume_commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("list")
            .usage("list [<pool>]")
            .function("volume.list")
            .help("List volumes, optionally for one pool"),
        CommandSpec::new("create")
            .usage("create <vol> <pool> [--size <size>]")
            .function("volume.create")
            .help("Create a volume"),
    ]
}

/// Top-level command declarations.
pub fn top_commands() -> Vec<CommandSpec> {
    vec![CommandSpec::new("ping")
        .usage("ping")
        .function("ping")
        .expect_value(0)
        .help("Check that every host answers")]
}
