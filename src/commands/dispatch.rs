//! Command dispatch logic for codejudge

use std::future::Future;
use std::time::Instant;

use codejudge_core::client::RetryPolicy;
use codejudge_core::config::JudgeConfig;
use codejudge_core::error::Result;
use tracing::debug;

use crate::cli::{Cli, Commands};

/// Shared context for command execution
pub struct CommandContext<'a> {
    pub cli: &'a Cli,
    pub config: JudgeConfig,
    pub start: Instant,
}

impl<'a> CommandContext<'a> {
    /// Resolve configuration; CLI flags win over environment and file.
    pub fn new(cli: &'a Cli, start: Instant) -> Result<Self> {
        let mut config = JudgeConfig::resolve(cli.config.as_deref())?;
        if let Some(url) = &cli.backend_url {
            config.backend.url = url.clone();
        }
        config.validate()?;

        Ok(Self { cli, config, start })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.config.retry)
    }

    /// `--model` if given, else `configured`
    pub fn model_or(&self, configured: &str) -> String {
        self.cli
            .model
            .clone()
            .unwrap_or_else(|| configured.to_string())
    }

    /// Drive a future to completion on a fresh runtime.
    pub fn block_on<F: Future>(&self, future: F) -> Result<F::Output> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        Ok(runtime.block_on(future))
    }
}

/// Trait for commands that can be executed
pub trait Command {
    fn execute(&self, ctx: &CommandContext) -> Result<()>;
}

impl Command for Commands {
    fn execute(&self, ctx: &CommandContext) -> Result<()> {
        match self {
            Commands::Analyze(args) => args.execute(ctx),
            Commands::GenTests(args) => args.execute(ctx),
        }
    }
}

pub fn run(cli: &Cli, start: Instant) -> Result<()> {
    let ctx = CommandContext::new(cli, start)?;

    debug!(elapsed = ?start.elapsed(), backend = %ctx.config.backend.url, "resolve_config");

    cli.command.execute(&ctx)
}
