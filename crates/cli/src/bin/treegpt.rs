use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    treegpt_cli::main_entry().await
}
