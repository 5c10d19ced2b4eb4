#[tokio::main]
async fn main() -> anyhow::Result<()> {
    veea_lib::run().await
}
