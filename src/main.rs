// src/main.rs

use trainwatch::{cli, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("trainwatch error: {err}");
        std::process::exit(err.exit_code());
    }
}

async fn run_main() -> trainwatch::errors::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
