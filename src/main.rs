// Virtual wallet - CLI

use clap::Parser;
use virtual_wallet::{Cli, CliHandler, Config};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load(&cli.data_dir) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.as_str()),
    )
    .init();

    let handler = match CliHandler::new(config) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Error initializing: {}", e);
            std::process::exit(1);
        }
    };

    let result = handler.handle(cli).await;
    log::logger().flush();

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
