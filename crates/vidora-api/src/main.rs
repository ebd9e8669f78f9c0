use vidora_core::Config;

// mimalloc keeps fragmentation low under many concurrent streams
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let (state, router) = vidora_api::setup::initialize_app(config.clone()).await?;

    vidora_api::setup::server::start_server(&config, state, router).await?;

    Ok(())
}
