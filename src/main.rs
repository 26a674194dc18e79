// src/main.rs

use runboard::types::CommandStatus;
use runboard::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(CommandStatus::Successful) => {}
        Ok(_) => std::process::exit(1),
        Err(err) => {
            eprintln!("runboard error: {err:?}");
            std::process::exit(2);
        }
    }
}

async fn run_main() -> anyhow::Result<CommandStatus> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
