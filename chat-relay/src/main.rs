use clap::Parser;

use chat_relay_lib::{init_tracing, run, Cli};

#[tokio::main]
async fn main() {
    // .env 不存在时忽略
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    tracing::info!("chat-relay starting, data dir {:?}", cli.data_dir);

    if let Err(e) = run(cli).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
