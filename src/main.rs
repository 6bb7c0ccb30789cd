use clap::Parser;
use pet_vision_lib::commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    pet_vision_lib::run(cli).await
}
