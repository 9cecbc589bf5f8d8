//! manifest-runner - applies the ordered SQL migration manifest to a database

use clap::Parser;

mod cli;
mod commands;

use cli::Cli;
use commands::common::ExitCode;
use commands::{list, run};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_diagnostics(cli.global.verbose);

    let result = if cli.run.list {
        list::execute(&cli.run, &cli.global)
    } else {
        run::execute(&cli.run, &cli.global).await
    };

    if let Err(err) = result {
        let code = match err.downcast_ref::<ExitCode>() {
            Some(ec) => ec.0,
            None => {
                eprintln!("[FATAL] {err:#}");
                1
            }
        };
        std::process::exit(code);
    }
}

/// Route `log` output to stderr; `RUST_LOG` overrides the default level.
fn init_diagnostics(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}
