// Local process execution shared by the local and SSH commanders.

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::command::{Commander, Invocation, Output};
use crate::error::Error;

/// Runs invocations as child processes on this machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalCommander;

impl LocalCommander {
    pub fn new() -> Self {
        Self
    }
}

impl Commander for LocalCommander {
    async fn run(&self, invocation: &Invocation) -> Result<Output, Error> {
        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        debug!(command = %invocation, "running local command");
        spawn(command, &invocation.program, invocation.stdin.as_deref()).await
    }
}

/// Spawn `command`, feed `stdin`, and collect its output.
///
/// The child is killed if the returned future is dropped before it exits.
pub(crate) async fn spawn(
    mut command: Command,
    program: &str,
    stdin: Option<&[u8]>,
) -> Result<Output, Error> {
    command
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|source| Error::Spawn {
        program: program.to_owned(),
        source,
    })?;

    // Feed stdin concurrently with draining stdout so a child that echoes
    // its input (`tee`) cannot fill the pipe and stall.
    let pipe = child.stdin.take();
    let feed = async move {
        if let (Some(mut pipe), Some(input)) = (pipe, stdin) {
            pipe.write_all(input).await?;
            pipe.shutdown().await?;
        }
        Ok::<(), std::io::Error>(())
    };
    let (fed, output) = tokio::join!(feed, child.wait_with_output());
    let output = output?;
    fed?;

    Ok(Output {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
