use std::process::ExitCode;

use anyhow::Result;
use batchsplit::cli::{AppContext, Cli, Commands};
use batchsplit::error::SplitError;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        dry_run: cli.dry_run,
    };

    init_tracing(&ctx);
    init_diagnostics(&ctx);

    match dispatch(cli.command, &ctx) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(err);
            ExitCode::FAILURE
        }
    }
}

fn dispatch(command: Commands, ctx: &AppContext) -> Result<()> {
    match command {
        Commands::Split(args) => batchsplit::split_run(args, ctx),
        Commands::Init(args) => batchsplit::infra::config_init(args, ctx),
        Commands::Completions(args) => batchsplit::completion::run(args, ctx),
    }
}

/// RUST_LOG wins; otherwise warnings, or errors only under --quiet.
fn init_tracing(ctx: &AppContext) {
    let default = if ctx.quiet { "error" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!ctx.no_color)
        .with_target(false)
        .init();
}

/// Plain diagnostics under --no-color.
fn init_diagnostics(ctx: &AppContext) {
    if !ctx.no_color {
        return;
    }
    let hook = miette::set_hook(Box::new(|_| {
        Box::new(miette::MietteHandlerOpts::new().color(false).build())
    }));
    if let Err(err) = hook {
        tracing::warn!("diagnostic hook not installed: {err}");
    }
}

/// Render split errors as diagnostics with help text, everything else plainly.
fn report(err: anyhow::Error) {
    match err.downcast::<SplitError>() {
        Ok(split) => eprintln!("{:?}", miette::Report::new(split)),
        Err(other) => eprintln!("Error: {other:#}"),
    }
}
