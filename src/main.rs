use std::io;
use std::process;
use anyhow::Result;
use log::error;
use devpanel::{app, cli, logging};

fn main() {
    logging::install_panic_hook();

    match run() {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!("Application error: {:#}", e);
            eprintln!("Error: {:#}", e);
            process::exit(2);
        }
    }
}

fn run() -> Result<bool> {
    let args = cli::parse_args();
    cli::validate_args(&args)?;

    let config_manager = app::load_configuration(&args)?;

    let log_config = app::configure_logging(&args, &config_manager)?;
    logging::init_logger(log_config)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    app::run_session(&args, &config_manager, &mut out)
}
