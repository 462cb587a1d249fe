use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "mediaconv", version, about = "Media conversion job orchestrator")]
pub struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long, global = true, default_value = "mediaconv.json")]
    pub config: PathBuf,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register an item from its source URL
    Register {
        url: String,
        /// Owning account
        #[arg(long)]
        owner: Option<i64>,
        /// Network address recorded as the requester
        #[arg(long, default_value = "127.0.0.1")]
        ip: String,
    },

    /// List registered items
    Items,

    /// List the variants the converter offers for an item
    Formats {
        item: String,
        #[command(flatten)]
        credentials: CookieArgs,
    },

    /// Request a conversion and wait for it to finish
    Convert {
        item: String,
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        credentials: CookieArgs,
    },

    /// Show every job of an item
    Status { item: String },

    /// Print the completed artifact of an item variant
    Locate { item: String, variant: String },

    /// Delete an item, its jobs and their artifacts
    Delete { item: String },

    /// Manage the stored cookie bundle
    #[command(subcommand)]
    Cookies(CookiesCommand),
}

#[derive(ClapArgs, Debug)]
#[group(required = true, multiple = false)]
pub struct TargetArgs {
    /// Video resolution, e.g. 720p
    #[arg(long)]
    pub resolution: Option<String>,

    /// Audio only
    #[arg(long)]
    pub audio: bool,
}

#[derive(ClapArgs, Debug)]
pub struct CookieArgs {
    /// Cookie file handed to the converter for this request only
    #[arg(long)]
    pub cookies: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum CookiesCommand {
    /// Replace the stored cookie bundle
    Upload { file: PathBuf },
    /// Show the stored cookie bundle's status
    Info,
    /// Delete the stored cookie bundle
    Remove,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_convert_requires_exactly_one_target() {
        assert!(Args::try_parse_from(["mediaconv", "convert", "abc123"]).is_err());
        assert!(Args::try_parse_from([
            "mediaconv",
            "convert",
            "abc123",
            "--audio",
            "--resolution",
            "720p"
        ])
        .is_err());

        let args =
            Args::try_parse_from(["mediaconv", "convert", "abc123", "--resolution", "720p"])
                .unwrap();
        match args.command {
            Commands::Convert { item, target, .. } => {
                assert_eq!(item, "abc123");
                assert_eq!(target.resolution.as_deref(), Some("720p"));
                assert!(!target.audio);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cookies_subcommands() {
        let args = Args::try_parse_from(["mediaconv", "cookies", "upload", "c.txt"]).unwrap();
        assert!(matches!(
            args.command,
            Commands::Cookies(CookiesCommand::Upload { .. })
        ));
    }
}
