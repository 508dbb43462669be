//! Command-line interface.

pub mod commands;
pub mod context;
pub mod display;
pub mod exit;
pub mod output;
pub mod types;

pub use context::CliContext;
pub use exit::{CiExit, COMMAND_FAILED};
pub use types::{Cli, Commands, GlobalArgs};

use anyhow::Result;

/// Route a parsed command to its implementation.
pub async fn run(command: Commands, ctx: &CliContext) -> Result<CiExit> {
    match command {
        Commands::Projects(args) => commands::projects::execute(args, ctx).await,
        Commands::Branches(args) => commands::branches::execute(args, ctx).await,
        Commands::Systems(args) => commands::systems::execute(args, ctx).await,
        Commands::Builds(args) => commands::builds::execute(args, ctx).await,
        Commands::Experiences(args) => commands::experiences::execute(args, ctx).await,
        Commands::ExperienceTags(args) => commands::experience_tags::execute(args, ctx).await,
        Commands::MetricsBuilds(args) => commands::metrics_builds::execute(args, ctx).await,
        Commands::Batches(args) => commands::batches::execute(args, ctx).await,
        Commands::Sweeps(args) => commands::sweeps::execute(args, ctx).await,
        Commands::Suites(args) => commands::suites::execute(args, ctx).await,
        Commands::Reports(args) => commands::reports::execute(args, ctx).await,
        Commands::Workflows(args) => commands::workflows::execute(args, ctx).await,
        Commands::Ingest(args) => commands::ingest::execute(args, ctx).await,
        Commands::Logs(args) => commands::logs::execute(args, ctx).await,
        Commands::Debug(args) => commands::debug::execute(args, ctx).await,
        Commands::Metrics(args) => commands::metrics::execute(args, ctx).await,
    }
}

/// Report a failed command on stderr and return the process exit code.
pub fn handle_error(err: &anyhow::Error, json_mode: bool, silent: bool) -> i32 {
    if silent {
        return COMMAND_FAILED;
    }
    if json_mode {
        let body = serde_json::json!({ "error": format!("{err:#}") });
        eprintln!("{body}");
    } else {
        eprintln!("{}", display::action_failure(&format!("{err:#}")));
    }
    COMMAND_FAILED
}
