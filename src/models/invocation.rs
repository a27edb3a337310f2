// Invocation context handed to a command implementation

use serde_json::{Map, Value};

use crate::utils::error::{CliError, Result};

/// Prefix marking options that only the host CLI understands
pub const INTERNAL_PREFIX: char = '_';

/// Back-reference key to the parent command, never forwarded
pub const PARENT_KEY: &str = "parent";

/// Positional arguments plus the trailing options object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvocationContext {
    pub args: Vec<Value>,
    pub options: Map<String, Value>,
}

impl InvocationContext {
    pub fn new(args: Vec<Value>, options: Map<String, Value>) -> Self {
        Self { args, options }
    }

    /// Split a raw invocation vector into positionals and the trailing options
    /// object.
    pub fn from_argv(mut argv: Vec<Value>) -> Result<Self> {
        match argv.pop() {
            Some(Value::Object(options)) => Ok(Self { args: argv, options }),
            Some(other) => Err(CliError::InvalidArguments(format!(
                "the last argument must be an options object, got {other}"
            ))),
            None => Err(CliError::InvalidArguments(
                "argument list cannot be empty".to_string(),
            )),
        }
    }

    /// Build a context from raw command-line words.
    ///
    /// `--key value`, `--key=value`, `--flag` and `--no-flag` become options
    /// (kebab-case keys are camelCased); a lone `--` ends option parsing.
    /// A negative number after `--key` is its value, not a short flag.
    pub fn from_cli_args(words: &[String]) -> Self {
        let mut args = Vec::new();
        let mut options = Map::new();
        let mut iter = words.iter().peekable();
        let mut options_done = false;

        while let Some(word) = iter.next() {
            if options_done {
                args.push(Value::String(word.clone()));
                continue;
            }
            if word == "--" {
                options_done = true;
                continue;
            }
            if let Some(flag) = word.strip_prefix("--") {
                if let Some((key, value)) = flag.split_once('=') {
                    options.insert(camel_case(key), Value::String(value.to_string()));
                } else if let Some(negated) = flag.strip_prefix("no-") {
                    options.insert(camel_case(negated), Value::Bool(false));
                } else if iter.peek().is_some_and(|next| takes_as_value(next)) {
                    let value = iter.next().cloned().unwrap_or_default();
                    options.insert(camel_case(flag), Value::String(value));
                } else {
                    options.insert(camel_case(flag), Value::Bool(true));
                }
            } else if word.len() > 1 && word.starts_with('-') {
                for short in word.chars().skip(1) {
                    options.insert(short.to_string(), Value::Bool(true));
                }
            } else {
                args.push(Value::String(word.clone()));
            }
        }

        Self { args, options }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn positional_str(&self, index: usize) -> Option<&str> {
        self.args.get(index).and_then(Value::as_str)
    }

    pub fn option_bool(&self, key: &str) -> bool {
        match self.options.get(key) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(text)) => !text.is_empty() && text != "false",
            Some(Value::Null) | None => false,
            Some(_) => true,
        }
    }

    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }

    /// Options safe to send across the process boundary
    pub fn sanitized_options(&self) -> Map<String, Value> {
        self.options
            .iter()
            .filter(|(key, _)| !key.starts_with(INTERNAL_PREFIX) && key.as_str() != PARENT_KEY)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// JSON array `[...args, options]` with internal keys stripped
    pub fn to_payload(&self) -> Result<String> {
        let mut payload = self.args.clone();
        payload.push(Value::Object(self.sanitized_options()));
        serde_json::to_string(&payload)
            .map_err(|e| CliError::InvalidArguments(format!("cannot serialize arguments: {e}")))
    }
}

/// Whether the word following `--key` is that key's value
fn takes_as_value(word: &str) -> bool {
    !word.starts_with('-') || (word.len() > 1 && word.parse::<f64>().is_ok())
}

fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
