pub async fn run() {
    if let Err(e) = server::run().await {
        eprintln!("server error: {e}");
    }
}
