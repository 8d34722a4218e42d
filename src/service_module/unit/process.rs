use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Service process configuration
pub struct Process {
    /// Argv used to run the service
    pub argv: Vec<String>,
}

impl Process {
    /// Process running `binary` without arguments
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            argv: vec![binary.into()],
        }
    }

    /// Append `flag` followed by `value`
    pub fn push_flag(&mut self, flag: &str, value: &Path) {
        self.argv.push(flag.to_string());
        self.argv.push(value.to_string_lossy().into_owned());
    }

    /// Program to run
    pub fn binary(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    /// Arguments after the program
    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }

    /// Render the argv as a systemd `ExecStart=` value
    pub fn exec_start(&self) -> String {
        self.argv
            .iter()
            .map(|arg| quote_exec_arg(arg))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Quote a single argv token for a unit file
///
/// `%` and `$` are doubled so systemd doesn't expand them, tokens holding
/// whitespace, quotes or backslashes are double quoted.
fn quote_exec_arg(arg: &str) -> String {
    let escaped = arg.replace('%', "%%").replace('$', "$$");

    let needs_quotes = escaped.is_empty()
        || escaped
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\' | ';'));

    if !needs_quotes {
        return escaped;
    }

    let mut quoted = String::with_capacity(escaped.len() + 2);
    quoted.push('"');
    for c in escaped.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
