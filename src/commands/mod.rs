//! # CLI Subcommands
//!
//! Contains modules that run the subcommands.

pub mod gen;
pub mod disk;
pub mod cmp;
pub mod run;
pub mod completions;

use log::error;

#[derive(thiserror::Error,Debug)]
pub enum CommandError {
    #[error("Command could not be interpreted")]
    InvalidCommand,
    #[error("One of the parameters was out of range")]
    OutOfRange,
    #[error("Input source could not be interpreted")]
    UnknownFormat,
    #[error("Tool `{0}` is not configured")]
    MissingTool(String),
    #[error("{0} scenarios failed")]
    ScenariosFailed(usize)
}

/// Parse an address given in decimal or with a `0x` prefix
pub fn parse_address(s: &str) -> Result<u16,CommandError> {
    let parsed = match s.strip_prefix("0x").or(s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex,16),
        None => s.parse::<u16>()
    };
    match parsed {
        Ok(addr) => Ok(addr),
        Err(_) => {
            error!("address `{}` should be a 16 bit number",s);
            Err(CommandError::OutOfRange)
        }
    }
}
