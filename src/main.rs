use clap::Parser;
use dotenv::dotenv;
use healthcare_assistant::cli::Args;
use log::error;
use std::error::Error;
use std::process;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.llm_config().api_key.is_none() {
        error!("Groq API key not found. Please set the `GROQ_API_KEY` environment variable.");
        process::exit(1);
    }

    healthcare_assistant::run(args).await
}
