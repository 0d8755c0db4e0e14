use anyhow::Result;
use clap::Parser;
use nimble_agent::{App, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    App::new(cli).run().await
}
