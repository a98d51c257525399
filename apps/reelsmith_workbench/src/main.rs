#[tokio::main]
async fn main() -> anyhow::Result<()> {
    reelsmith_workbench::run().await
}
