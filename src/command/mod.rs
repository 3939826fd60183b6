//! Typed invocation builder
//!
//! A stage is described once as a [`StageSpec`]: the program to run and the
//! shape of its argument list. Concrete values are supplied per run through
//! [`Params`], and [`StageSpec::format`] turns the pair into an
//! [`Invocation`]. Arguments are kept as separate tokens all the way down to
//! `std::process::Command`, so paths with spaces are never re-split.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// A single parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Path(PathBuf),
    Int(u64),
    Switch(bool),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Path(_) => "path",
            Value::Int(_) => "integer",
            Value::Switch(_) => "switch",
        }
    }
}

/// Shape of one slot in a stage's argument list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgSpec {
    /// Bare value taken from the named parameter
    Positional(&'static str),
    /// `flag value`, value taken from the named parameter
    Option {
        flag: &'static str,
        param: &'static str,
    },
    /// `flag` emitted only when the named switch parameter is true
    Switch {
        flag: &'static str,
        param: &'static str,
    },
    /// Literal token, always emitted
    Fixed(&'static str),
}

/// Errors raised while forming an invocation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("stage '{stage}' requires parameter '{param}'")]
    MissingParam { stage: String, param: String },

    #[error("stage '{stage}' expects parameter '{param}' to be a {expected}, got a {got}")]
    WrongKind {
        stage: String,
        param: String,
        expected: &'static str,
        got: &'static str,
    },
}

/// Named parameter values for one run of a stage
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: BTreeMap<&'static str, Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, name: &'static str, path: impl Into<PathBuf>) -> Self {
        self.values.insert(name, Value::Path(path.into()));
        self
    }

    pub fn int(mut self, name: &'static str, value: u64) -> Self {
        self.values.insert(name, Value::Int(value));
        self
    }

    pub fn switch(mut self, name: &'static str, on: bool) -> Self {
        self.values.insert(name, Value::Switch(on));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

/// Declarative description of a stage executable and its argument layout
#[derive(Debug, Clone)]
pub struct StageSpec {
    pub label: String,
    pub program: PathBuf,
    pub args: Vec<ArgSpec>,
}

impl StageSpec {
    pub fn new(label: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn positional(mut self, param: &'static str) -> Self {
        self.args.push(ArgSpec::Positional(param));
        self
    }

    pub fn option(mut self, flag: &'static str, param: &'static str) -> Self {
        self.args.push(ArgSpec::Option { flag, param });
        self
    }

    pub fn switch(mut self, flag: &'static str, param: &'static str) -> Self {
        self.args.push(ArgSpec::Switch { flag, param });
        self
    }

    pub fn fixed(mut self, token: &'static str) -> Self {
        self.args.push(ArgSpec::Fixed(token));
        self
    }

    /// Build the invocation, failing on the first missing or mistyped parameter
    pub fn format(&self, params: &Params) -> Result<Invocation, FormatError> {
        let mut invocation = Invocation::new(&self.program).with_label(&self.label);

        for spec in &self.args {
            match *spec {
                ArgSpec::Positional(param) => {
                    invocation = invocation.arg(self.value_token(params, param)?);
                }
                ArgSpec::Option { flag, param } => {
                    let token = self.value_token(params, param)?;
                    invocation = invocation.arg(flag).arg(token);
                }
                ArgSpec::Switch { flag, param } => match self.lookup(params, param)? {
                    Value::Switch(true) => invocation = invocation.arg(flag),
                    Value::Switch(false) => {}
                    other => return Err(self.wrong_kind(param, "switch", other)),
                },
                ArgSpec::Fixed(token) => invocation = invocation.arg(token),
            }
        }

        Ok(invocation)
    }

    fn lookup<'p>(&self, params: &'p Params, param: &str) -> Result<&'p Value, FormatError> {
        params.get(param).ok_or_else(|| FormatError::MissingParam {
            stage: self.label.clone(),
            param: param.to_string(),
        })
    }

    fn value_token(&self, params: &Params, param: &str) -> Result<OsString, FormatError> {
        match self.lookup(params, param)? {
            Value::Path(p) => Ok(p.as_os_str().to_os_string()),
            Value::Int(n) => Ok(OsString::from(n.to_string())),
            other => Err(self.wrong_kind(param, "path or integer", other)),
        }
    }

    fn wrong_kind(&self, param: &str, expected: &'static str, got: &Value) -> FormatError {
        FormatError::WrongKind {
            stage: self.label.clone(),
            param: param.to_string(),
            expected,
            got: got.kind(),
        }
    }
}

/// A fully formed external command: program plus ordered argument tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    label: String,
    program: PathBuf,
    args: Vec<OsString>,
}

impl Invocation {
    pub fn new(program: impl AsRef<Path>) -> Self {
        let program = program.as_ref().to_path_buf();
        let label = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            label,
            program,
            args: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Run this invocation under a wrapper program, e.g. a resource reporter
    pub fn wrapped_by(self, wrapper: Invocation) -> Invocation {
        let label = self.label.clone();
        wrapper
            .arg(self.program.as_os_str())
            .args(self.args)
            .with_label(label)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }

    /// Shell-like rendering for messages; tokens with whitespace are quoted
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(|a| a.as_os_str()))
            .map(|token| {
                let token = token.to_string_lossy();
                if token.is_empty() || token.chars().any(|c| c.is_whitespace() || c == '\'') {
                    format!("'{}'", token.replace('\'', r"'\''"))
                } else {
                    token.into_owned()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ebwt_spec() -> StageSpec {
        StageSpec::new("eBWT", "/opt/bin/bebwtNT.x")
            .positional("input")
            .option("-w", "window")
            .fixed("-r")
            .fixed("-s")
            .switch("-f", "first")
    }

    #[test]
    fn test_format_orders_tokens() {
        let params = Params::new()
            .path("input", "/data/reads.fa")
            .int("window", 10)
            .switch("first", true);

        let inv = ebwt_spec().format(&params).unwrap();
        assert_eq!(inv.program(), Path::new("/opt/bin/bebwtNT.x"));
        assert_eq!(
            inv.arguments(),
            &["/data/reads.fa", "-w", "10", "-r", "-s", "-f"].map(OsString::from)
        );
        assert_eq!(inv.label(), "eBWT");
    }

    #[test]
    fn test_false_switch_is_omitted() {
        let params = Params::new()
            .path("input", "x.fa")
            .int("window", 4)
            .switch("first", false);

        let inv = ebwt_spec().format(&params).unwrap();
        assert!(!inv.arguments().iter().any(|a| a == "-f"));
    }

    #[test]
    fn test_missing_param_fails() {
        let params = Params::new().path("input", "x.fa").switch("first", false);

        let err = ebwt_spec().format(&params).unwrap_err();
        assert_eq!(
            err,
            FormatError::MissingParam {
                stage: "eBWT".to_string(),
                param: "window".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_switch_fails() {
        let params = Params::new().path("input", "x.fa").int("window", 10);
        assert!(matches!(
            ebwt_spec().format(&params),
            Err(FormatError::MissingParam { .. })
        ));
    }

    #[test]
    fn test_wrong_kind_fails() {
        let params = Params::new()
            .switch("input", true)
            .int("window", 10)
            .switch("first", false);

        assert!(matches!(
            ebwt_spec().format(&params),
            Err(FormatError::WrongKind { got: "switch", .. })
        ));
    }

    #[test]
    fn test_paths_with_spaces_stay_single_tokens() {
        let params = Params::new()
            .path("input", "/data/my reads.fa")
            .int("window", 10)
            .switch("first", false);

        let inv = ebwt_spec().format(&params).unwrap();
        assert_eq!(inv.arguments()[0], OsString::from("/data/my reads.fa"));
        assert_eq!(
            inv.command_line(),
            "/opt/bin/bebwtNT.x '/data/my reads.fa' -w 10 -r -s"
        );
    }

    #[test]
    fn test_wrapped_by_prefixes_wrapper() {
        let inner = Invocation::new("/bin/er-index").arg("x.fa").arg("-q").arg("0");
        let wrapped = inner.wrapped_by(
            Invocation::new("/usr/bin/time").args(["-v", "-o", "x.res"]),
        );

        assert_eq!(wrapped.program(), Path::new("/usr/bin/time"));
        assert_eq!(
            wrapped.command_line(),
            "/usr/bin/time -v -o x.res /bin/er-index x.fa -q 0"
        );
        assert_eq!(wrapped.label(), "er-index");
    }
}
