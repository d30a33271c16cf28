//! Purpose: `partition-link` CLI entry point for diagnosing native library resolution.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Successful commands print one JSON line on stdout.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod command_dispatch;

use partition_link::api::{Error, ErrorKind, LoaderConfig, to_exit_code};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Try `partition-link --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    init_tracing();
    let color_mode = cli.color;
    let config = cli.loader_config();
    command_dispatch::dispatch_command(cli.command, config).map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "partition-link",
    version,
    about = "Locate and load the partition-link native library",
    long_about = r#"Diagnose how the partition-link native library is found.

Resolution tries the platform library search path first, then a bundled copy
extracted to a temporary file. Settings come from PARTITION_LINK_* environment
variables; flags override them."#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        help = "Library base name (default: libpartition_link_java)"
    )]
    base_name: Option<String>,
    #[arg(
        long,
        global = true,
        help = "OS name used for suffix selection, e.g. \"Windows 10\" (default: this platform)"
    )]
    os_name: Option<String>,
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn loader_config(&self) -> LoaderConfig {
        let mut config = LoaderConfig::from_env();
        if let Some(base_name) = &self.base_name {
            config = config.with_base_name(base_name.clone());
        }
        if let Some(os_name) = &self.os_name {
            config = config.with_os_name(os_name.clone());
        }
        config
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Show platform naming for the native library",
        after_help = r#"EXAMPLES
  $ partition-link platform
  $ partition-link platform --os-name "Mac OS X" --base-name foo"#
    )]
    Platform,
    #[command(
        about = "Load the native library and report how it was found",
        long_about = r#"Run the full resolution chain once and report the outcome.

Prints {loaded, origin, path, attempts} on success. On failure the error lists
every strategy attempt and the process exits non-zero."#,
        after_help = r#"EXAMPLES
  $ partition-link resolve
  $ partition-link resolve --library-dir ./target/release
  $ partition-link resolve --resource-dir ./bundle

NOTES
  - --library-dir may be repeated; directories are tried in order
  - Extracted copies are deleted when the process exits"#
    )]
    Resolve {
        #[arg(
            long = "library-dir",
            value_name = "DIR",
            help = "Directory searched before the platform search path (repeatable)",
            value_hint = ValueHint::DirPath
        )]
        library_dirs: Vec<PathBuf>,
        #[arg(
            long,
            value_name = "DIR",
            help = "Directory holding bundled libraries (default: resources/ next to the executable)",
            value_hint = ValueHint::DirPath
        )]
        resource_dir: Option<PathBuf>,
    },
    #[command(
        arg_required_else_help = true,
        about = "Generate shell completions",
        after_help = r#"EXAMPLES
  $ partition-link completion bash > ~/.local/share/bash-completion/completions/partition-link
  $ partition-link completion zsh > ~/.zfunc/_partition-link"#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn emit_json(value: &impl Serialize) -> Result<(), Error> {
    let json = serde_json::to_string(value).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("json encode failed")
            .with_source(err)
    })?;
    println!("{json}");
    Ok(())
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
        ErrorKind::LibraryLoad => "native library could not be loaded".to_string(),
        ErrorKind::ResourceExtraction => "bundled library could not be extracted".to_string(),
        ErrorKind::SymbolNotFound => "native symbol not found".to_string(),
        ErrorKind::UseAfterDispose => "handle already closed".to_string(),
        ErrorKind::Native => "native call failed".to_string(),
    }
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    let causes = err.causes();
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = vec![format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    )];
    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }
    for cause in err.causes() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }
    lines.join("\n")
}

#[derive(Copy, Clone)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}
