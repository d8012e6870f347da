// src/main.rs

use watchrun::{cli, logging, run, RunOutcome};

#[tokio::main]
async fn main() {
    let code = match run_main().await {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => {
            eprintln!("watchrun error: {err:?}");
            1
        }
    };
    std::process::exit(code);
}

async fn run_main() -> anyhow::Result<RunOutcome> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    Ok(run(args).await?)
}
