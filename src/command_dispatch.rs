//! Purpose: Hold top-level CLI command dispatch for `partition-link`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Success output is one JSON object per command on stdout.

use std::io;

use clap::CommandFactory;
use partition_link::api::{Error, LibraryResolver, LoaderConfig, PlatformReport, ResolveReport};

use super::{Cli, Command, RunOutcome, emit_json};

pub(super) fn dispatch_command(command: Command, config: LoaderConfig) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "partition-link", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Platform => {
            emit_json(&PlatformReport::from_config(&config))?;
            Ok(RunOutcome::ok())
        }
        Command::Resolve {
            library_dirs,
            resource_dir,
        } => {
            let mut config = config;
            if !library_dirs.is_empty() {
                config = config.with_library_dirs(library_dirs);
            }
            if let Some(dir) = resource_dir {
                config = config.with_resource_dir(dir);
            }
            let resolver = LibraryResolver::from_config(config);
            resolver.ensure_loaded()?;
            emit_json(&ResolveReport::from_resolver(&resolver))?;
            Ok(RunOutcome::ok())
        }
    }
}
