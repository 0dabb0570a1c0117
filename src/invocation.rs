// src/invocation.rs

//! Argv-style process invocations.
//!
//! An [`Invocation`] is an ordered, immutable sequence of string tokens,
//! program path/name followed by its arguments, plus an optional
//! environment overlay applied additively for that invocation only.
//!
//! Tokens always reach the OS as discrete argv elements. Nothing here is
//! ever concatenated into a shell command line, so arguments cannot be
//! reinterpreted through word splitting, globbing, or injection.

use std::fmt;

/// One external-program invocation: argv tokens + env overlay.
///
/// Built with the fluent constructors and immutable afterwards; there is
/// no mutation API once an invocation has been handed to an executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    tokens: Vec<String>,
    env: Vec<(String, String)>,
}

impl Invocation {
    /// Start an invocation for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            tokens: vec![program.into()],
            env: Vec::new(),
        }
    }

    /// Build an invocation from a pre-tokenised argv.
    ///
    /// An empty token list is representable but rejected with
    /// [`ExecError::EmptyInvocation`](crate::ExecError::EmptyInvocation)
    /// at spawn time.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            env: Vec::new(),
        }
    }

    /// Append one argument token.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.tokens.push(arg.into());
        self
    }

    /// Append several argument tokens.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tokens.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add a `NAME=value` entry to the environment overlay.
    ///
    /// The overlay is applied on top of the inherited environment, for
    /// this invocation only.
    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((name.into(), value.into()));
        self
    }

    /// True when there is no program token at all.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The program token, if any.
    pub fn program(&self) -> Option<&str> {
        self.tokens.first().map(String::as_str)
    }

    /// All argv tokens, program first.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// The environment overlay entries, in registration order.
    pub fn env_overlay(&self) -> &[(String, String)] {
        &self.env
    }

    /// Build a `tokio::process::Command`. Callers must reject empty
    /// invocations first.
    pub(crate) fn to_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.tokens[0]);
        cmd.args(&self.tokens[1..]);
        for (name, value) in &self.env {
            cmd.env(name, value);
        }
        cmd
    }

    /// Build a blocking `std::process::Command` for contexts without a
    /// runtime (teardown-time cleanup commands). Same non-empty
    /// precondition as [`to_command`](Self::to_command).
    pub(crate) fn to_std_command(&self) -> std::process::Command {
        let mut cmd = std::process::Command::new(&self.tokens[0]);
        cmd.args(&self.tokens[1..]);
        for (name, value) in &self.env {
            cmd.env(name, value);
        }
        cmd
    }
}

impl fmt::Display for Invocation {
    /// Space-joined tokens, for log messages only, never fed back into a
    /// parser.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens.join(" "))
    }
}
