#[tokio::main]
async fn main() {
    if let Err(err) = ats_api::run().await {
        tracing::error!(error = %err, "ats-api failed");
        std::process::exit(1);
    }
}
