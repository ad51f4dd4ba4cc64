//! Thin entrypoint for the `roster` binary.

#[tokio::main]
async fn main() {
    let code = roster_cli::run().await;
    std::process::exit(code);
}
