#[tokio::main]
async fn main() -> anyhow::Result<()> {
    radar_app::run().await
}
