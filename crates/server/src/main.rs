use server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    chat_common::init_tracing("server=info,chat_store=info,tower_http=info,warn");
    server::run(ServerConfig::from_env()).await
}
