#[tokio::main]
async fn main() {
    if let Err(e) = receituario_lib::run().await {
        eprintln!("receituario: {e}");
        std::process::exit(1);
    }
}
