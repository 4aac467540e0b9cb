// SSH execution via the system OpenSSH client.
//
// Each invocation becomes one `ssh` process. With a control directory
// configured, all processes for a host share one multiplexed master
// connection, so a run holds a single logical channel per host.

use tokio::process::Command;
use tracing::debug;

use crate::command::{Commander, Invocation, Output};
use crate::error::Error;
use crate::local::spawn;
use crate::transport::{SshOptions, SshTarget};

/// Runs invocations on a remote host through `ssh`.
#[derive(Debug, Clone)]
pub struct SshCommander {
    target: SshTarget,
    options: SshOptions,
}

impl SshCommander {
    pub fn new(target: SshTarget, options: SshOptions) -> Result<Self, Error> {
        target.validate()?;
        Ok(Self { target, options })
    }

    pub fn target(&self) -> &SshTarget {
        &self.target
    }

    /// Arguments passed to the `ssh` binary, excluding the remote command.
    pub fn connection_args(&self) -> Vec<String> {
        let mut args = vec![
            "-T".to_owned(),
            "-o".to_owned(),
            "BatchMode=yes".to_owned(),
            "-o".to_owned(),
            format!("ConnectTimeout={}", self.options.connect_timeout.as_secs().max(1)),
        ];
        if let Some(dir) = &self.options.control_dir {
            args.extend([
                "-o".to_owned(),
                "ControlMaster=auto".to_owned(),
                "-o".to_owned(),
                format!("ControlPath={}", dir.join("%C").display()),
                "-o".to_owned(),
                format!("ControlPersist={}", self.options.control_persist.as_secs()),
            ]);
        }
        if let Some(port) = self.target.port {
            args.extend(["-p".to_owned(), port.to_string()]);
        }
        if let Some(identity) = &self.target.identity_file {
            args.extend(["-i".to_owned(), identity.display().to_string()]);
        }
        args
    }

    /// The remote command line, quoted for the remote shell.
    pub fn remote_command(invocation: &Invocation) -> String {
        std::iter::once(invocation.program.as_str())
            .chain(invocation.args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn build(&self, invocation: &Invocation) -> Command {
        let mut command = Command::new(&self.options.binary);
        command
            .args(self.connection_args())
            .arg(self.target.destination())
            .arg("--")
            .arg(Self::remote_command(invocation));
        command
    }
}

impl Commander for SshCommander {
    async fn run(&self, invocation: &Invocation) -> Result<Output, Error> {
        debug!(
            host = %self.target.hostname,
            command = %invocation,
            "running remote command"
        );
        let command = self.build(invocation);
        let output = spawn(command, &self.options.binary, invocation.stdin.as_deref()).await?;
        // 255 is ssh's own failure status, never the remote command's.
        if output.code == Some(255) {
            return Err(Error::Exit {
                command: format!("ssh {}", self.target.destination()),
                code: output.code,
                output: output.diagnostic(invocation),
            });
        }
        Ok(output)
    }

    async fn close(&self) {
        let Some(dir) = &self.options.control_dir else {
            return;
        };
        let mut command = Command::new(&self.options.binary);
        command
            .arg("-o")
            .arg(format!("ControlPath={}", dir.join("%C").display()))
            .args(["-O", "exit"])
            .arg(self.target.destination());
        if let Err(e) = spawn(command, &self.options.binary, None).await {
            debug!(host = %self.target.hostname, error = %e, "closing master connection failed");
        }
    }
}

/// Quote `word` for a POSIX shell unless it is made of safe characters.
pub fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c));
    if safe {
        word.to_owned()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}
