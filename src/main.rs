//! # Command Line Interface
//!
//! The argument parser lives in `cli.rs`, where the build script can also find it.
//! The subcommands are in the `commands` module.

mod cli;

use env_logger;
#[cfg(windows)]
use colored;
use log::error;
use ti99check::commands;
use ti99check::commands::CommandError;

fn main() -> Result<(),Box<dyn std::error::Error>>
{
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).unwrap();

    let main_cmd = cli::build_cli();
    let matches = main_cmd.clone().get_matches();

    if let Some(cmd) = matches.subcommand_matches("completions") {
        return commands::completions::generate(main_cmd,cmd);
    }

    // Memory images for feeding tools by hand
    if let Some(cmd) = matches.subcommand_matches("gen") {
        return commands::gen::generate(cmd);
    }

    // Disk volumes
    if let Some(cmd) = matches.subcommand_matches("mkdsk") {
        return commands::disk::mkdsk(cmd);
    }
    if let Some(cmd) = matches.subcommand_matches("catalog") {
        return commands::disk::catalog(cmd);
    }
    if let Some(cmd) = matches.subcommand_matches("put") {
        return commands::disk::put(cmd);
    }
    if let Some(cmd) = matches.subcommand_matches("get") {
        return commands::disk::get(cmd);
    }
    if let Some(cmd) = matches.subcommand_matches("delete") {
        return commands::disk::delete(cmd);
    }
    if let Some(cmd) = matches.subcommand_matches("rename") {
        return commands::disk::rename(cmd);
    }
    if let Some(cmd) = matches.subcommand_matches("protect") {
        return commands::disk::protect(cmd);
    }

    if let Some(cmd) = matches.subcommand_matches("cmp") {
        return commands::cmp::compare(cmd);
    }

    if let Some(cmd) = matches.subcommand_matches("run") {
        return commands::run::run(cmd);
    }

    error!("No subcommand was found, try `ti99check --help`");
    return Err(Box::new(CommandError::InvalidCommand));
}
