#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = codeassess_rust::run().await {
        eprintln!("codeassess-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
