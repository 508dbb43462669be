//! ReSim CLI entry point.

use clap::Parser;

use resim::cli::{handle_error, run, Cli, CliContext, COMMAND_FAILED};
use resim::infrastructure::config::ConfigLoader;
use resim::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => std::process::exit(usage_exit(&err)),
    };
    let silent = cli.is_silent();
    let output = cli.global.output_mode();

    let code = match start(cli, silent).await {
        Ok(code) => code,
        Err(err) => handle_error(&err, output.json, silent),
    };
    std::process::exit(code);
}

async fn start(cli: Cli, silent: bool) -> anyhow::Result<i32> {
    let mut config = ConfigLoader::load()?;
    cli.global.apply(&mut config);
    ConfigLoader::validate(&config)?;

    let _logger = LoggerImpl::init(
        &LogConfig::from(&config.logging)
            .verbose(cli.global.verbose)
            .silent(silent),
    )?;

    let ctx = CliContext::connect(config, cli.global.output_mode())?;
    let exit = run(cli.command, &ctx).await?;
    Ok(exit.code())
}

/// Help and version requests exit 0. Other usage errors exit with
/// [`COMMAND_FAILED`], never the code of a failed batch.
fn usage_exit(err: &clap::Error) -> i32 {
    let _ = err.print();
    if err.use_stderr() {
        COMMAND_FAILED
    } else {
        0
    }
}
