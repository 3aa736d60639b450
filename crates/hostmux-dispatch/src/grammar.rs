//! The restricted usage grammar.
//!
//! Each end-point command owns one usage line, e.g.
//!
//! ```text
//! create <pool> SIZE [--thin] [--label <label>]... [-v]
//! ```
//!
//! Recognized shapes:
//!
//! - bare words are literals (the first one is the command name itself)
//! - `<name>` and `UPPER` are positionals
//! - `-x` is a short flag (single character, never valued)
//! - `--long-flag` is a long option; it takes a value when written
//!   `--opt=<val>` or when immediately followed by a `<placeholder>` whose
//!   name matches the option stem (`--size <size>`)
//! - `[...]` marks the enclosed elements optional (no nesting)
//! - `...` after a positional or a valued option collects repetitions
//!
//! Matching argv against the grammar produces a [`RawArgs`] map keyed by
//! the raw spelling (`<name>`, `UPPER`, `-x`, `--long-flag`). Every
//! declared name is always present, with its kind's empty value when
//! absent from argv, so downstream translation is total.

use std::collections::BTreeMap;

use thiserror::Error;

/// Errors in the usage grammar itself: declaration-time, programmer error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GrammarError {
    #[error("empty usage line")]
    Empty,

    #[error("unbalanced '[' / ']'")]
    Unbalanced,

    #[error("nested '[' groups are not supported")]
    Nested,

    #[error("'...' must follow a positional or a valued option")]
    DanglingEllipsis,

    #[error("short option '{0}' must be a single character")]
    LongShortOption(String),

    #[error("duplicate name '{0}' in usage")]
    Duplicate(String),
}

/// Errors from matching user-supplied arguments against the grammar, and
/// from translating the matched options. These are user errors: reported
/// with the usage line, exit code 1, no host contacted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionError {
    #[error("unknown option '{option}'")]
    UnknownOption { option: String },

    #[error("option '{option}' requires a value")]
    MissingOptionValue { option: String },

    #[error("option '{option}' does not take a value")]
    UnexpectedOptionValue { option: String },

    #[error("missing argument '{name}'")]
    MissingArgument { name: String },

    #[error("unexpected argument '{value}'")]
    UnexpectedArgument { value: String },

    #[error("expected '{word}'")]
    ExpectedLiteral { word: String },

    #[error("options '{first}' and '{second}' both translate to parameter '{param}'")]
    Collision {
        first: String,
        second: String,
        param: String,
    },

    #[error("{0}")]
    Verification(String),
}

/// A parsed option value, by syntactic kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptValue {
    /// Plain flag: present or not.
    Flag(bool),
    /// Repeatable flag: occurrence count.
    Count(u64),
    /// Valued option or positional, at most once.
    Single(Option<String>),
    /// Repeated valued option or positional.
    List(Vec<String>),
}

impl OptValue {
    pub fn is_list(&self) -> bool {
        matches!(self, OptValue::List(_))
    }
}

/// The raw option map: raw spelling to parsed value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawArgs {
    map: BTreeMap<String, OptValue>,
}

impl RawArgs {
    pub fn get(&self, raw: &str) -> Option<&OptValue> {
        self.map.get(raw)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OptValue)> {
        self.map.iter()
    }

    fn set(&mut self, raw: String, value: OptValue) {
        self.map.insert(raw, value);
    }
}

#[derive(Debug, Clone)]
struct Positional {
    /// Raw spelling: `<name>` or `UPPER`.
    raw: String,
    required: bool,
    repeating: bool,
}

#[derive(Debug, Clone)]
enum Elem {
    Literal { word: String, required: bool },
    Positional(Positional),
}

#[derive(Debug, Clone)]
struct OptDef {
    /// Raw spelling: `--long-flag` or `-x`.
    raw: String,
    takes_value: bool,
    repeating: bool,
}

/// A parsed usage line, ready to match argument vectors.
#[derive(Debug, Clone)]
pub struct Usage {
    line: String,
    elems: Vec<Elem>,
    options: Vec<OptDef>,
}

fn is_placeholder(token: &str) -> bool {
    (token.starts_with('<') && token.ends_with('>') && token.len() > 2)
        || (!token.is_empty()
            && token.chars().next().is_some_and(|c| c.is_ascii_uppercase())
            && token
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'))
}

/// The stem a placeholder refers to: `<size>` and `SIZE` both give "size".
fn placeholder_stem(token: &str) -> String {
    let inner = token.trim_start_matches('<').trim_end_matches('>');
    inner.to_ascii_lowercase()
}

impl Usage {
    /// Parses a usage line. Grammar mistakes are declaration errors.
    pub fn parse(line: &str) -> Result<Usage, GrammarError> {
        let spaced = line.replace('[', " [ ").replace(']', " ] ");
        let tokens: Vec<&str> = spaced.split_whitespace().collect();
        if tokens.is_empty() {
            return Err(GrammarError::Empty);
        }

        let mut elems: Vec<Elem> = Vec::new();
        let mut options: Vec<OptDef> = Vec::new();
        let mut optional = false;
        // Index of the most recently added element, for '...' attribution:
        // Some(Ok(i)) = elems[i], Some(Err(i)) = options[i].
        let mut last: Option<Result<usize, usize>> = None;

        let mut i = 0;
        while i < tokens.len() {
            let mut token = tokens[i];
            i += 1;

            match token {
                "[" => {
                    if optional {
                        return Err(GrammarError::Nested);
                    }
                    optional = true;
                    continue;
                }
                "]" => {
                    if !optional {
                        return Err(GrammarError::Unbalanced);
                    }
                    optional = false;
                    continue;
                }
                "..." => {
                    mark_repeating(&mut elems, &mut options, last)?;
                    continue;
                }
                _ => {}
            }

            let mut repeating = false;
            if let Some(stripped) = token.strip_suffix("...") {
                token = stripped;
                repeating = true;
            }

            if let Some(stem) = token.strip_prefix("--") {
                let (stem, inline_value) = match stem.split_once('=') {
                    Some((s, _value)) => (s, true),
                    None => (stem, false),
                };
                let raw = format!("--{}", stem);
                if options.iter().any(|o| o.raw == raw) {
                    return Err(GrammarError::Duplicate(raw));
                }
                // `--size <size>` marks a valued option when the adjacent
                // placeholder names the option stem.
                let mut takes_value = inline_value;
                if !takes_value {
                    if let Some(next) = tokens.get(i) {
                        let next_base = next.strip_suffix("...").unwrap_or(next);
                        if is_placeholder(next_base)
                            && placeholder_stem(next_base) == stem.replace('-', "_")
                        {
                            takes_value = true;
                            if next.ends_with("...") {
                                repeating = true;
                            }
                            i += 1;
                        }
                    }
                }
                options.push(OptDef {
                    raw,
                    takes_value,
                    repeating,
                });
                last = Some(Err(options.len() - 1));
            } else if token.starts_with('-') && token != "-" {
                let stem = &token[1..];
                if stem.chars().count() != 1 {
                    return Err(GrammarError::LongShortOption(token.to_string()));
                }
                let raw = token.to_string();
                if options.iter().any(|o| o.raw == raw) {
                    return Err(GrammarError::Duplicate(raw));
                }
                options.push(OptDef {
                    raw,
                    takes_value: false,
                    repeating,
                });
                last = Some(Err(options.len() - 1));
            } else if is_placeholder(token) {
                let raw = token.to_string();
                if elems.iter().any(|e| matches!(e, Elem::Positional(p) if p.raw == raw)) {
                    return Err(GrammarError::Duplicate(raw));
                }
                elems.push(Elem::Positional(Positional {
                    raw,
                    required: !optional,
                    repeating,
                }));
                last = Some(Ok(elems.len() - 1));
            } else {
                elems.push(Elem::Literal {
                    word: token.to_string(),
                    required: !optional,
                });
                last = Some(Ok(elems.len() - 1));
            }
        }

        if optional {
            return Err(GrammarError::Unbalanced);
        }

        Ok(Usage {
            line: line.trim().to_string(),
            elems,
            options,
        })
    }

    /// The usage line as declared.
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Removes the leading literal when it equals `name`. Returns false
    /// when the usage does not begin with that literal.
    pub fn strip_leading_literal(&mut self, name: &str) -> bool {
        match self.elems.first() {
            Some(Elem::Literal { word, .. }) if word == name => {
                self.elems.remove(0);
                true
            }
            _ => false,
        }
    }

    /// Every raw name the grammar can produce (positionals and options;
    /// literals are matched, not captured).
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .elems
            .iter()
            .filter_map(|e| match e {
                Elem::Positional(p) => Some(p.raw.clone()),
                Elem::Literal { .. } => None,
            })
            .collect();
        names.extend(self.options.iter().map(|o| o.raw.clone()));
        names
    }

    /// True when the named raw option/positional collects a list.
    pub fn is_list(&self, raw: &str) -> bool {
        self.elems.iter().any(
            |e| matches!(e, Elem::Positional(p) if p.raw == raw && p.repeating),
        ) || self
            .options
            .iter()
            .any(|o| o.raw == raw && o.takes_value && o.repeating)
    }

    /// A minimal argument vector satisfying the grammar: required literals
    /// verbatim, one placeholder value per required positional. Used at
    /// declaration time to exercise matching and translation.
    pub fn skeleton(&self) -> Vec<String> {
        let mut argv = Vec::new();
        for elem in &self.elems {
            match elem {
                Elem::Literal {
                    word,
                    required: true,
                } => argv.push(word.clone()),
                Elem::Positional(p) if p.required => argv.push("x".to_string()),
                _ => {}
            }
        }
        argv
    }

    fn defaults(&self) -> RawArgs {
        let mut raw = RawArgs::default();
        for elem in &self.elems {
            if let Elem::Positional(p) = elem {
                let value = if p.repeating {
                    OptValue::List(Vec::new())
                } else {
                    OptValue::Single(None)
                };
                raw.set(p.raw.clone(), value);
            }
        }
        for opt in &self.options {
            let value = match (opt.takes_value, opt.repeating) {
                (true, true) => OptValue::List(Vec::new()),
                (true, false) => OptValue::Single(None),
                (false, true) => OptValue::Count(0),
                (false, false) => OptValue::Flag(false),
            };
            raw.set(opt.raw.clone(), value);
        }
        raw
    }

    fn option(&self, raw: &str) -> Option<&OptDef> {
        self.options.iter().find(|o| o.raw == raw)
    }

    /// Matches an argument vector against this grammar.
    pub fn match_args(&self, argv: &[String]) -> Result<RawArgs, OptionError> {
        let mut raw = self.defaults();
        let mut positionals: Vec<&str> = Vec::new();
        let mut no_more_options = false;

        let mut i = 0;
        while i < argv.len() {
            let token = argv[i].as_str();
            i += 1;

            if no_more_options || token == "-" || !token.starts_with('-') {
                positionals.push(token);
                continue;
            }
            if token == "--" {
                no_more_options = true;
                continue;
            }

            if let Some(stem) = token.strip_prefix("--") {
                let (name, inline) = match stem.split_once('=') {
                    Some((n, v)) => (format!("--{}", n), Some(v.to_string())),
                    None => (token.to_string(), None),
                };
                let def = self.option(&name).ok_or(OptionError::UnknownOption {
                    option: token.to_string(),
                })?;
                if def.takes_value {
                    let value = match inline {
                        Some(v) => v,
                        None => {
                            let v = argv.get(i).ok_or(OptionError::MissingOptionValue {
                                option: name.clone(),
                            })?;
                            i += 1;
                            v.clone()
                        }
                    };
                    record_value(&mut raw, &name, value);
                } else {
                    if inline.is_some() {
                        return Err(OptionError::UnexpectedOptionValue { option: name });
                    }
                    record_flag(&mut raw, &name);
                }
            } else {
                // Short cluster: -vf is -v -f.
                for ch in token.chars().skip(1) {
                    let name = format!("-{}", ch);
                    if self.option(&name).is_none() {
                        return Err(OptionError::UnknownOption {
                            option: name.clone(),
                        });
                    }
                    record_flag(&mut raw, &name);
                }
            }
        }

        // Assign positionals in declaration order.
        let mut queue = positionals.into_iter();
        let mut pending: Option<&str> = None;
        for elem in &self.elems {
            let next = pending.take().or_else(|| queue.next());
            match elem {
                Elem::Literal { word, required } => match next {
                    Some(tok) if tok == word => {}
                    Some(tok) if !required => pending = Some(tok),
                    _ if !required => {}
                    _ => {
                        return Err(OptionError::ExpectedLiteral { word: word.clone() });
                    }
                },
                Elem::Positional(p) if p.repeating => {
                    let mut values: Vec<String> = Vec::new();
                    if let Some(tok) = next {
                        values.push(tok.to_string());
                    }
                    values.extend(queue.by_ref().map(str::to_string));
                    if p.required && values.is_empty() {
                        return Err(OptionError::MissingArgument {
                            name: p.raw.clone(),
                        });
                    }
                    raw.set(p.raw.clone(), OptValue::List(values));
                }
                Elem::Positional(p) => match next {
                    Some(tok) => raw.set(p.raw.clone(), OptValue::Single(Some(tok.to_string()))),
                    None if p.required => {
                        return Err(OptionError::MissingArgument {
                            name: p.raw.clone(),
                        });
                    }
                    None => {}
                },
            }
        }
        if let Some(extra) = pending.take().or_else(|| queue.next()) {
            return Err(OptionError::UnexpectedArgument {
                value: extra.to_string(),
            });
        }

        Ok(raw)
    }
}

fn record_flag(raw: &mut RawArgs, name: &str) {
    match raw.map.get_mut(name) {
        Some(OptValue::Flag(v)) => *v = true,
        Some(OptValue::Count(n)) => *n += 1,
        _ => {}
    }
}

fn record_value(raw: &mut RawArgs, name: &str, value: String) {
    match raw.map.get_mut(name) {
        Some(OptValue::Single(slot)) => *slot = Some(value),
        Some(OptValue::List(items)) => items.push(value),
        _ => {}
    }
}

fn mark_repeating(
    elems: &mut [Elem],
    options: &mut [OptDef],
    last: Option<Result<usize, usize>>,
) -> Result<(), GrammarError> {
    match last {
        Some(Ok(i)) => match &mut elems[i] {
            Elem::Positional(p) => {
                p.repeating = true;
                Ok(())
            }
            Elem::Literal { .. } => Err(GrammarError::DanglingEllipsis),
        },
        Some(Err(i)) => {
            options[i].repeating = true;
            Ok(())
        }
        None => Err(GrammarError::DanglingEllipsis),
    }
}
