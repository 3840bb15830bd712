//! OpenAPI Bake - command-line tool that bakes an OpenAPI document from an
//! application's routes, tables and annotations.
//!
//! # Usage
//!
//! ```bash
//! openapi-bake [OPTIONS] <APP_PATH>
//! ```
//!
//! # Examples
//!
//! Bake with the default configuration at `<APP_PATH>/config/swagger_bake.yml`:
//! ```bash
//! openapi-bake ./app
//! ```
//!
//! Write somewhere else, with debug logging:
//! ```bash
//! openapi-bake ./app -o /webroot/api.json -v
//! ```

use clap::Parser;
use log::{error, info};
use openapi_bake::cli;
use openapi_bake::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("OpenAPI Bake starting...");

    let result = cli::parse_args_from_parsed(args).and_then(cli::run);
    match result {
        Ok(_) => {
            info!("OpenAPI document generation completed successfully");
            ExitCode::SUCCESS
        }
        Err(err) => {
            match err.downcast_ref::<Error>() {
                Some(bake_error) => error!("{}: {}", bake_error.kind(), bake_error),
                None => error!("{:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}
