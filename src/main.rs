mod cli;
mod commands;
mod config;
mod paths;
mod progress;
mod ui;

use anyhow::Result;
use cibkit::backend::CommandRunner;
use cibkit::backend::cli::CliRunner;
use cibkit::{CibStore, Options};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command, SettingsArgs};
use std::io;
use std::sync::Arc;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub options: Options,
    runner: Arc<dyn CommandRunner>,
}

impl Context {
    pub fn new(verbose: u8, quiet: bool, options: Options) -> Self {
        let runner = CliRunner::new().with_default_timeout(options.attempt_timeout());
        Self::with_runner(verbose, quiet, options, Arc::new(runner))
    }

    pub fn with_runner(
        verbose: u8,
        quiet: bool,
        options: Options,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            verbose,
            quiet,
            options,
            runner,
        }
    }

    /// A fresh store over the live CIB, or over a shadow CIB
    pub fn store(&self, shadow: Option<&str>) -> CibStore {
        self.store_with(self.options.clone(), shadow)
    }

    /// Like [`Context::store`], with different options
    pub fn store_with(&self, options: Options, shadow: Option<&str>) -> CibStore {
        let store = CibStore::new(Arc::clone(&self.runner), options);
        match shadow {
            Some(shadow) => store.with_shadow(shadow),
            None => store,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "pcmkctl", &mut io::stdout());
        return Ok(());
    }

    let options = load_options(&cli.settings)?;
    let ctx = Context::new(cli.verbose, cli.quiet, options);

    match cli.command {
        Command::Status { tag } => commands::status::run(&ctx, tag.as_deref()),
        Command::List { target } => commands::list::run(&ctx, target),
        Command::Diff(args) => commands::apply::diff(&ctx, &args.manifest, args.target.as_deref()),
        Command::Apply(args) => commands::apply::apply(
            &ctx,
            &args.manifest.manifest,
            args.manifest.target.as_deref(),
            args.dry_run,
            args.yes,
        ),
        Command::Wait(args) => commands::wait::run(&ctx, &args.condition, args.fail_on_timeout),
        Command::Completions { .. } => Ok(()),
    }
}

/// Settings file values, overridden by command line flags
fn load_options(settings: &SettingsArgs) -> Result<Options> {
    let mut options = config::load_options(settings.config.as_deref())?;
    apply_overrides(&mut options, settings);
    Ok(options)
}

fn apply_overrides(options: &mut Options, settings: &SettingsArgs) {
    if let Some(cib_file) = &settings.cib_file {
        options.cib_file = Some(paths::expand(&cib_file.to_string_lossy()));
    }
    if settings.debug {
        options.debug_enabled = true;
    }
    if let Some(count) = settings.retry_count {
        options.retry_count = count;
    }
    if let Some(step) = settings.retry_step {
        options.retry_step = step;
    }
    if let Some(timeout) = settings.retry_timeout {
        options.retry_timeout = timeout;
    }
}
