use clap::{Parser, Subcommand, ValueEnum};
use strata_core::LayerCategory;

#[derive(Debug, Parser)]
#[command(name = "strata", about = "Query layered settings files")]
pub struct Cli {
    /// Global (lowest priority) settings files.
    #[arg(long = "global", env = "STRATA_GLOBAL", value_delimiter = ',')]
    pub global: Vec<String>,

    #[arg(long = "plugin", env = "STRATA_PLUGIN", value_delimiter = ',')]
    pub plugin: Vec<String>,

    #[arg(long = "user", env = "STRATA_USER", value_delimiter = ',')]
    pub user: Vec<String>,

    /// Runtime override as PATH=VALUE. VALUE is parsed as JSON, falling back
    /// to a plain string.
    #[arg(long = "set", value_name = "PATH=VALUE")]
    pub overrides: Vec<String>,

    #[arg(long, default_value_t = '.')]
    pub separator: char,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    #[arg(long, env = "STRATA_LOG", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Resolve one path.
    Get {
        path: String,
        /// Deep-merge mapping values across layers.
        #[arg(long)]
        merge: bool,
        /// Show every layer that defines the path.
        #[arg(long, conflicts_with = "merge")]
        explain: bool,
        /// Value (JSON or plain string) printed when no layer defines the path.
        #[arg(long)]
        default: Option<String>,
    },
    /// Print the effective tree, or the subtree at PATH.
    Dump {
        #[arg(default_value = "")]
        path: String,
        #[arg(long, value_enum)]
        category: Option<CategoryArg>,
        /// One `path = value` line per leaf.
        #[arg(long)]
        flat: bool,
    },
    /// List layers lowest priority first.
    Layers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CategoryArg {
    Global,
    Plugin,
    User,
    Runtime,
}

impl From<CategoryArg> for LayerCategory {
    fn from(value: CategoryArg) -> Self {
        match value {
            CategoryArg::Global => Self::Global,
            CategoryArg::Plugin => Self::Plugin,
            CategoryArg::User => Self::User,
            CategoryArg::Runtime => Self::Runtime,
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, OutputFormat};
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_sources_overrides_and_get() {
        let cli = Cli::try_parse_from([
            "strata",
            "--global",
            "a.json,b.json",
            "--user",
            "u.toml",
            "--set",
            "ui.theme=\"dark\"",
            "--output",
            "json",
            "get",
            "ui.theme",
            "--merge",
        ])
        .expect("arguments parse");

        assert_eq!(cli.global, vec!["a.json", "b.json"]);
        assert_eq!(cli.user, vec!["u.toml"]);
        assert_eq!(cli.overrides, vec!["ui.theme=\"dark\""]);
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(matches!(
            cli.command,
            Command::Get { ref path, merge: true, explain: false, default: None } if path == "ui.theme"
        ));
    }

    #[test]
    fn explain_conflicts_with_merge() {
        let result = Cli::try_parse_from(["strata", "get", "a", "--merge", "--explain"]);
        assert!(result.is_err());
    }
}
