use anyhow::Result;

mod chat;
mod cli;
mod console;
mod log;

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = cli::run().await {
        console::present_error(&e);
        std::process::exit(1);
    }
    Ok(())
}
