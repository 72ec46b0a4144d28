//! Clipline CLI — assemble, trim, and export clip scenes.
//!
//! Usage:
//!   clipline init <NAME>            Create a project from a clip library
//!   clipline info <PROJECT>         Show a project's scene
//!   clipline probe <SOURCE>         Show media metadata
//!   clipline trim <PROJECT> <CLIP>  Set a clip's trim window
//!   clipline remove <PROJECT> <CLIP>
//!   clipline move <PROJECT> <FROM> <TO>
//!   clipline export <PROJECT>       Export the active (or given) clip
//!   clipline check                  Check system capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use clipline_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "clipline",
    about = "Multi-clip scene timeline: trim, play back, and export generated clips",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Override the configured projects directory
    #[arg(long, global = true)]
    projects_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new project
    Init {
        /// Project name
        name: String,

        /// JSON array of task records to use as the clip library
        #[arg(short, long)]
        library: Option<PathBuf>,

        /// Generate filmstrip thumbnails for clips without a preview
        #[arg(long)]
        thumbnails: bool,
    },

    /// Show a project's scene
    Info {
        /// Project id
        project: String,

        /// Probe sources for their real durations
        #[arg(long)]
        probe: bool,
    },

    /// Show media metadata for a source
    Probe {
        /// Path or file:// URL
        source: String,
    },

    /// Set a clip's trim window (clamped to the clip)
    Trim {
        project: String,

        /// Clip id
        clip: String,

        /// New trim start (seconds)
        #[arg(long)]
        start: Option<f64>,

        /// New trim end (seconds)
        #[arg(long)]
        end: Option<f64>,
    },

    /// Remove a clip from the scene
    Remove { project: String, clip: String },

    /// Move a clip to a new position
    Move {
        project: String,
        from: usize,
        to: usize,
    },

    /// Export a clip's trim window
    Export {
        project: String,

        /// Clip id (defaults to the first clip)
        #[arg(short, long)]
        clip: Option<String>,
    },

    /// Check system capabilities
    Check {
        /// Write the effective configuration to the config file
        #[arg(long)]
        write_config: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load();
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if let Some(dir) = cli.projects_dir {
        config.projects_dir = dir;
    }
    clipline_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Init {
            name,
            library,
            thumbnails,
        } => commands::init::run(&config, name, library, thumbnails),
        Commands::Info { project, probe } => commands::info::run(&config, &project, probe),
        Commands::Probe { source } => commands::probe::run(&source),
        Commands::Trim {
            project,
            clip,
            start,
            end,
        } => commands::edit::trim(&config, &project, &clip, start, end),
        Commands::Remove { project, clip } => commands::edit::remove(&config, &project, &clip),
        Commands::Move { project, from, to } => commands::edit::move_clip(&config, &project, from, to),
        Commands::Export { project, clip } => {
            commands::export::run(&config, &project, clip.as_deref()).await
        }
        Commands::Check { write_config } => commands::check::run(&config, write_config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_trim_arguments_parse() {
        let cli = Cli::parse_from(["clipline", "trim", "p1", "clipA", "--start", "1.5"]);
        match cli.command {
            Commands::Trim {
                project,
                clip,
                start,
                end,
            } => {
                assert_eq!(project, "p1");
                assert_eq!(clip, "clipA");
                assert_eq!(start, Some(1.5));
                assert_eq!(end, None);
            }
            _ => panic!("expected trim"),
        }
    }
}
