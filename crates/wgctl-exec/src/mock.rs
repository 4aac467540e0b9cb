// ── Scripted in-memory host ──
//
// `FakeHost` answers the handful of commands wgctl issues (`wg`,
// `install`, `tee`, `systemctl`) the way a real host would, including
// systemctl's non-zero exits for "disabled" and "inactive". Every
// invocation is recorded for assertions.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::command::{Commander, Invocation, Output};
use crate::error::Error;

/// Unit state as systemd would report it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FakeUnit {
    pub enabled: bool,
    pub active: bool,
}

/// A file written on the fake host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FakeFile {
    /// Mode passed to `install -m`, if the file was created that way.
    pub mode: Option<String>,
    pub content: Vec<u8>,
}

#[derive(Debug, Default)]
struct FakeState {
    history: Vec<Invocation>,
    units: HashMap<String, FakeUnit>,
    files: HashMap<String, FakeFile>,
    key_counter: u64,
    failures: Vec<(String, String)>,
}

/// In-memory stand-in for a managed host.
#[derive(Debug, Default)]
pub struct FakeHost {
    state: Mutex<FakeState>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset the state of a systemd unit.
    pub fn with_unit(self, unit: &str, enabled: bool, active: bool) -> Self {
        self.lock()
            .units
            .insert(unit.to_owned(), FakeUnit { enabled, active });
        self
    }

    /// Make every command whose command line contains `needle` exit 1
    /// with `message` on stderr.
    pub fn fail_on(self, needle: &str, message: &str) -> Self {
        self.lock()
            .failures
            .push((needle.to_owned(), message.to_owned()));
        self
    }

    /// Remove all configured failures.
    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Command lines issued so far, in order.
    pub fn history(&self) -> Vec<String> {
        self.lock()
            .history
            .iter()
            .map(Invocation::command_line)
            .collect()
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.lock().history.clone()
    }

    pub fn clear_history(&self) {
        self.lock().history.clear();
    }

    pub fn unit(&self, unit: &str) -> FakeUnit {
        self.lock().units.get(unit).copied().unwrap_or_default()
    }

    pub fn file(&self, path: &str) -> Option<FakeFile> {
        self.lock().files.get(path).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn respond(&self, invocation: &Invocation) -> Output {
        let mut state = self.lock();
        state.history.push(invocation.clone());

        let mut words: Vec<&str> = std::iter::once(invocation.program.as_str())
            .chain(invocation.args.iter().map(String::as_str))
            .collect();
        if words.first() == Some(&"sudo") {
            words.remove(0);
        }
        let stdin = invocation
            .stdin
            .as_deref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default();

        let line = invocation.command_line();
        if let Some((_, message)) = state.failures.iter().find(|(n, _)| line.contains(n.as_str())) {
            // tee copies its input to stdout even when the file cannot be opened
            let echoed = if words.first() == Some(&"tee") { stdin.as_str() } else { "" };
            return exit(1, echoed, message);
        }

        match words.as_slice() {
            ["wg", "genkey"] => {
                state.key_counter += 1;
                ok(&format!("private-key-{}\n", state.key_counter))
            }
            ["wg", "genpsk"] => {
                state.key_counter += 1;
                ok(&format!("preshared-key-{}\n", state.key_counter))
            }
            ["wg", "pubkey"] => {
                let private = stdin.trim();
                if private.is_empty() {
                    exit(1, "", "Error: Key is not the correct length or format")
                } else {
                    ok(&format!("public-of-{private}\n"))
                }
            }
            ["install", "-m", mode, "/dev/null", path] => {
                state.files.insert(
                    (*path).to_owned(),
                    FakeFile {
                        mode: Some((*mode).to_owned()),
                        content: Vec::new(),
                    },
                );
                ok("")
            }
            ["tee", path] => {
                let file = state.files.entry((*path).to_owned()).or_default();
                file.content = stdin.clone().into_bytes();
                ok(&stdin)
            }
            ["systemctl", "is-enabled", unit] => {
                if state.units.get(*unit).is_some_and(|u| u.enabled) {
                    ok("enabled\n")
                } else {
                    exit(1, "disabled\n", "")
                }
            }
            ["systemctl", "is-active", unit] => {
                if state.units.get(*unit).is_some_and(|u| u.active) {
                    ok("active\n")
                } else {
                    exit(3, "inactive\n", "")
                }
            }
            ["systemctl", "enable", "--now", unit] => {
                let u = state.units.entry((*unit).to_owned()).or_default();
                u.enabled = true;
                u.active = true;
                ok("")
            }
            ["systemctl", "start" | "restart", unit] => {
                state.units.entry((*unit).to_owned()).or_default().active = true;
                ok("")
            }
            _ => exit(127, "", &format!("{}: command not found", invocation.program)),
        }
    }
}

impl Commander for FakeHost {
    async fn run(&self, invocation: &Invocation) -> Result<Output, Error> {
        Ok(self.respond(invocation))
    }
}

fn ok(stdout: &str) -> Output {
    exit(0, stdout, "")
}

fn exit(code: i32, stdout: &str, stderr: &str) -> Output {
    Output {
        code: Some(code),
        stdout: stdout.to_owned(),
        stderr: stderr.to_owned(),
    }
}
