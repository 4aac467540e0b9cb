//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod apply;
pub mod clients;
pub mod config_cmd;
pub mod devices;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::config::Config;
use crate::error::CliError;

/// Dispatch a store-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Apply(args) => apply::handle(args, cfg, global).await,
        Command::Devices(args) => devices::handle(args, cfg, global),
        Command::Clients(args) => clients::handle(args, cfg, global),
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
