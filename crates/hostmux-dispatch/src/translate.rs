//! Option-name translation.
//!
//! Maps the raw option map a usage grammar produced into the keyword
//! arguments an associated function receives. Pure: the same raw map
//! always translates to the same arguments.

use serde_json::Value;
use tracing::debug;

use crate::grammar::{OptValue, OptionError, RawArgs};
use crate::registry::{CallArgs, ParamSpec};

/// Per-command shaping rules applied during translation.
#[derive(Debug, Clone, Default)]
pub struct Shaping {
    /// Suffix appended to every list-valued parameter name. Disambiguates
    /// singular/plural when the same grammar token is reused with `...`.
    pub list_suffix: Option<String>,
    /// Drop dashes from option names entirely instead of mapping interior
    /// dashes to underscores: `--long-flag` becomes `longflag`.
    pub strip_dashes: bool,
}

/// Translates one raw name to a parameter name.
///
/// - `<name>` keeps its inner name, dashes to underscores
/// - `UPPER` is lowercased
/// - `-x` drops the dash
/// - `--long-flag` becomes `long_flag`, or `longflag` under `strip_dashes`
pub fn param_name(raw: &str, strip_dashes: bool) -> String {
    if let Some(inner) = raw.strip_prefix('<').and_then(|r| r.strip_suffix('>')) {
        return inner.replace('-', "_");
    }
    if let Some(stem) = raw.strip_prefix("--") {
        return if strip_dashes {
            stem.replace('-', "")
        } else {
            stem.replace('-', "_")
        };
    }
    if let Some(stem) = raw.strip_prefix('-') {
        return stem.to_string();
    }
    raw.to_ascii_lowercase().replace('-', "_")
}

fn opt_value_to_json(value: &OptValue) -> Value {
    match value {
        OptValue::Flag(b) => Value::Bool(*b),
        OptValue::Count(n) => Value::from(*n),
        OptValue::Single(None) => Value::Null,
        OptValue::Single(Some(s)) => Value::String(s.clone()),
        OptValue::List(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
    }
}

/// Translates a raw option map into call arguments.
///
/// Applies the shaping rules and fails when two distinct raw names land on
/// the same parameter name. Collision checking also runs at declaration
/// time over the whole grammar, so a collision here means the declaration
/// check was bypassed - it is still reported, never ignored.
pub fn translate(raw: &RawArgs, shaping: &Shaping) -> Result<CallArgs, OptionError> {
    let mut args = CallArgs::new();
    let mut origin: Vec<(String, String)> = Vec::new();

    for (raw_name, value) in raw.iter() {
        let mut name = param_name(raw_name, shaping.strip_dashes);
        if value.is_list() {
            if let Some(suffix) = &shaping.list_suffix {
                name.push_str(suffix);
            }
        }
        if let Some((first, _)) = origin.iter().find(|(_, p)| *p == name) {
            return Err(OptionError::Collision {
                first: first.clone(),
                second: raw_name.clone(),
                param: name,
            });
        }
        origin.push((raw_name.clone(), name.clone()));
        args.insert(name, opt_value_to_json(value));
    }

    Ok(args)
}

/// Drops translated arguments the function does not declare.
///
/// Dropped names are logged, not fatal; a function that accepts arbitrary
/// keywords keeps everything. (The reverse direction - a required
/// parameter the grammar cannot produce - is a declaration-time error.)
pub fn filter_for(args: CallArgs, params: &ParamSpec) -> CallArgs {
    if params.accepts_extra {
        return args;
    }
    args.into_iter()
        .filter(|(name, _)| {
            let keep = params.declares(name);
            if !keep {
                debug!(param = %name, "option not accepted by function, dropped");
            }
            keep
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Usage;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_param_name_shapes() {
        assert_eq!(param_name("<name>", false), "name");
        assert_eq!(param_name("<two-part>", false), "two_part");
        assert_eq!(param_name("SIZE", false), "size");
        assert_eq!(param_name("-x", false), "x");
        assert_eq!(param_name("--long-flag", false), "long_flag");
    }

    #[test]
    fn test_param_name_strip_dashes() {
        assert_eq!(param_name("--long-flag", true), "longflag");
        assert_eq!(param_name("--force", true), "force");
        // Positionals are unaffected by the option rule.
        assert_eq!(param_name("<two-part>", true), "two_part");
    }

    #[test]
    fn test_translate_values() {
        let usage = Usage::parse("x <vol> [--force] [-v]... [--size <size>]").unwrap();
        let raw = usage
            .match_args(&["x", "v0", "--force", "-v", "-v", "--size", "1g"].map(String::from))
            .unwrap();
        let args = translate(&raw, &Shaping::default()).unwrap();
        assert_eq!(args["vol"], json!("v0"));
        assert_eq!(args["force"], json!(true));
        assert_eq!(args["v"], json!(2));
        assert_eq!(args["size"], json!("1g"));
    }

    #[test]
    fn test_translate_collision() {
        let usage = Usage::parse("x [<force>] [--force]").unwrap();
        let raw = usage.match_args(&["x".to_string()]).unwrap();
        let err = translate(&raw, &Shaping::default()).unwrap_err();
        match err {
            OptionError::Collision { param, .. } => assert_eq!(param, "force"),
            other => panic!("expected collision, got {other:?}"),
        }
    }

    #[test]
    fn test_list_suffix_applied_to_lists_only() {
        let usage = Usage::parse("x <vol>... [--size <size>]").unwrap();
        let raw = usage
            .match_args(&["x", "a", "b"].map(String::from))
            .unwrap();
        let shaping = Shaping {
            list_suffix: Some("s".into()),
            strip_dashes: false,
        };
        let args = translate(&raw, &shaping).unwrap();
        assert_eq!(args["vols"], json!(["a", "b"]));
        assert!(args.contains_key("size"));
        assert!(!args.contains_key("sizes"));
    }

    #[test]
    fn test_filter_drops_undeclared() {
        let mut args = CallArgs::new();
        args.insert("keep".into(), json!(1));
        args.insert("drop".into(), json!(2));
        let params = ParamSpec::new().required(["keep"]);
        let filtered = filter_for(args, &params);
        assert!(filtered.contains_key("keep"));
        assert!(!filtered.contains_key("drop"));
    }

    #[test]
    fn test_filter_keeps_all_with_accepts_extra() {
        let mut args = CallArgs::new();
        args.insert("anything".into(), json!(1));
        let params = ParamSpec::new().extra();
        let filtered = filter_for(args, &params);
        assert!(filtered.contains_key("anything"));
    }

    proptest! {
        /// Translation is a pure function of the raw map.
        #[test]
        fn prop_translate_idempotent(
            vol in "[a-z]{1,10}",
            force in any::<bool>(),
            labels in proptest::collection::vec("[a-z]{1,5}", 0..4),
        ) {
            let usage = Usage::parse("x [<vol>] [--force] [--label <label>]...").unwrap();
            let mut argv = vec!["x".to_string(), vol];
            if force {
                argv.push("--force".into());
            }
            for label in &labels {
                argv.push("--label".into());
                argv.push(label.clone());
            }
            let raw = usage.match_args(&argv).unwrap();
            let first = translate(&raw, &Shaping::default()).unwrap();
            let second = translate(&raw, &Shaping::default()).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
