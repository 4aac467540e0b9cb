// ── Command contract ──
//
// Every remote or local action is an `Invocation` handed to a
// `Commander`. Implementations decide where it runs; callers only see
// the captured `Output`.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::Error;

/// A single program invocation with optional stdin payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<Vec<u8>>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Attach bytes to be written to the child's stdin.
    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Wrap this invocation in `sudo`.
    pub fn sudo(self) -> Self {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: "sudo".into(),
            args,
            stdin: self.stdin,
        }
    }

    /// Program and arguments joined by spaces, for logs and diagnostics.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    /// Exit status; `None` when terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl Output {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Stdout with surrounding whitespace removed.
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// Stdout and stderr joined, trimmed.
    pub fn combined(&self) -> String {
        let stdout = self.stdout.trim();
        let stderr = self.stderr.trim();
        match (stdout.is_empty(), stderr.is_empty()) {
            (true, _) => stderr.to_owned(),
            (false, true) => stdout.to_owned(),
            (false, false) => format!("{stdout}\n{stderr}"),
        }
    }

    /// Output to carry into an error for `invocation`.
    ///
    /// Commands fed through stdin may echo it (`tee`), and that payload
    /// can hold keys, so only their stderr is kept.
    pub fn diagnostic(&self, invocation: &Invocation) -> String {
        if invocation.stdin.is_some() {
            self.stderr.trim().to_owned()
        } else {
            self.combined()
        }
    }

    /// Turn a non-zero exit into [`Error::Exit`].
    pub fn check(self, invocation: &Invocation) -> Result<Self, Error> {
        if self.success() {
            Ok(self)
        } else {
            Err(Error::Exit {
                command: invocation.command_line(),
                code: self.code,
                output: self.diagnostic(invocation),
            })
        }
    }
}

/// Executes invocations against one host.
///
/// Commands are awaited one at a time by callers; implementations are
/// never asked to pipeline. Dropping a returned future must terminate
/// the underlying process.
pub trait Commander: Send + Sync {
    /// Run the invocation to completion and capture its output.
    ///
    /// A non-zero exit is NOT an error at this level; use
    /// [`Output::check`] or [`Commander::exec`] for that.
    fn run(&self, invocation: &Invocation) -> impl Future<Output = Result<Output, Error>> + Send;

    /// Release any channel held open for this host.
    fn close(&self) -> impl Future<Output = ()> + Send {
        std::future::ready(())
    }

    /// Run and require success, returning trimmed stdout.
    fn exec(&self, invocation: &Invocation) -> impl Future<Output = Result<String, Error>> + Send {
        async move {
            let output = self.run(invocation).await?.check(invocation)?;
            Ok(output.stdout_trimmed().to_owned())
        }
    }
}

impl<T: Commander> Commander for Arc<T> {
    fn run(&self, invocation: &Invocation) -> impl Future<Output = Result<Output, Error>> + Send {
        (**self).run(invocation)
    }

    fn close(&self) -> impl Future<Output = ()> + Send {
        (**self).close()
    }
}
