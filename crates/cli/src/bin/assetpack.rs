#[tokio::main]
async fn main() {
    if let Err(err) = assetpack_cli::main_entry().await {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}
