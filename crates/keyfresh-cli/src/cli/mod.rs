use std::path::PathBuf;

use clap::Parser;

pub mod global;
pub mod root_commands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::{Commands, SignInArgs};

/// Top-level CLI parser for the `kf` binary.
#[derive(Debug, Parser)]
#[command(name = "kf", version, about = "keyfresh - access/refresh token lifecycle")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, raw
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Cookie jar file (defaults to config `store.jar_path` or ~/.keyfresh/cookies.json)
    #[arg(long, global = true)]
    pub jar: Option<PathBuf>,
}

impl Cli {
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            quiet: self.quiet,
            verbose: self.verbose,
            jar: self.jar.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Cli, Commands, OutputFormat};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["kf", "status", "--format", "raw", "--jar", "/tmp/jar.json"])
            .expect("cli should parse");
        assert_eq!(cli.format, OutputFormat::Raw);
        assert_eq!(
            cli.global_flags().jar.as_deref(),
            Some(std::path::Path::new("/tmp/jar.json"))
        );
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn sign_in_requires_both_tokens() {
        assert!(Cli::try_parse_from(["kf", "sign-in", "--access-token", "at"]).is_err());

        let cli = Cli::try_parse_from([
            "kf",
            "sign-in",
            "--access-token",
            "at",
            "--refresh-token",
            "rt",
        ])
        .expect("cli should parse");
        match cli.command {
            Commands::SignIn(args) => {
                assert_eq!(args.access_token, "at");
                assert_eq!(args.refresh_token, "rt");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn output_format_rejects_invalid_value() {
        assert!(Cli::try_parse_from(["kf", "--format", "yaml", "status"]).is_err());
    }
}
