#[tokio::main]
async fn main() -> std::io::Result<()> {
    tactics_server::run_with_config().await
}
