// CLI modules
mod cli;

use std::io::Write;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use cli::{
    args::Args,
    op::{Op, OpContext, Report},
    Open, Seal, UnsealBytes, UnsealDevice, Version,
};

use common::error::{Categorized, ErrorCategory};
use kms_seals::config::{self, Config, ConfigError, ConfigFile};
use kms_seals::guard::{self, GuardDecision};
use kms_seals::process;

/// Exit status after SIGINT or SIGTERM, as a shell would report it
const EXIT_INTERRUPTED: u8 = 130;

command_enum! {
    (Open, Open),
    (Seal, Seal),
    (UnsealDevice, UnsealDevice),
    (UnsealBytes, UnsealBytes),
    (Version, Version),
}

fn main() -> ExitCode {
    let args = Args::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {}", e);
            return ExitCode::from(ErrorCategory::Environment.exit_code());
        }
    };
    let code = runtime.block_on(run(args));
    // An interrupted stdin read is still parked on the blocking pool and only
    // returns at EOF; waiting for it would keep the process alive.
    runtime.shutdown_background();

    ExitCode::from(code)
}

async fn run(args: Args) -> u8 {
    // The guard goes first: a skipped node must succeed even with a broken config
    if let GuardDecision::Skip {
        only_on_node,
        node_name,
    } = guard::evaluate(args.only_on_node.as_deref(), args.node_name.as_deref())
    {
        let level = args
            .log_level
            .as_deref()
            .and_then(|level| config::parse_log_level(level).ok())
            .unwrap_or(config::DEFAULT_LOG_LEVEL);
        let _log_guard = process::init_logging(level);
        tracing::info!(
            %only_on_node,
            node_name = node_name.as_deref().unwrap_or("<unset>"),
            "node name mismatch, skipping"
        );
        return 0;
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return e.category().exit_code();
        }
    };
    let _log_guard = process::init_logging(config.log_level);

    let ctx = match OpContext::new(config) {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!("failed to create KMS client: {}", e);
            return e.category().exit_code();
        }
    };

    let result = tokio::select! {
        result = args.command.execute(&ctx) => result,
        signal = process::utils::interrupted() => {
            tracing::warn!(signal, "interrupted, aborting operation");
            return EXIT_INTERRUPTED;
        }
    };

    match result {
        Ok(output) => {
            let mut stdout = std::io::stdout().lock();
            match output.report(&mut stdout).and_then(|_| stdout.flush()) {
                Ok(()) => 0,
                Err(e) => {
                    tracing::error!("failed to write output: {}", e);
                    ErrorCategory::Environment.exit_code()
                }
            }
        }
        Err(e) => {
            tracing::error!(category = %e.category(), "{}", e);
            e.category().exit_code()
        }
    }
}

fn load_config(args: &Args) -> Result<Config, ConfigError> {
    let file = args.config.as_deref().map(ConfigFile::load).transpose()?;
    Config::resolve(&args.overrides(), file.as_ref())
}
