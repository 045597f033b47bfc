use std::sync::Arc;

use dotenv::dotenv;
use env::{Env, StorageKind};
use eyre::{eyre, Context};
use hostel::{Hostel, HostelConfig};
use log::{info, warn};
use storage::{MemoryStore, RecordStore, Storage};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    if let Err(err) = dotenv() {
        info!("Failed to load .env file: {}", err);
    }
    pretty_env_logger::init();
    color_eyre::install()?;

    let env = Env::load().context("Failed to load configuration")?;
    let store: Arc<dyn RecordStore> = match env.storage() {
        StorageKind::Mongo => {
            let url = env
                .mongo_url()
                .ok_or_else(|| eyre!("MONGO_URL is not set"))?;
            info!("using mongo database {}", env.mongo_db());
            let storage = Storage::new(url, env.mongo_db());
            if let Err(err) = storage.connect().await {
                warn!("mongo is not reachable yet, will retry on first request: {:#}", err);
            }
            Arc::new(storage)
        }
        StorageKind::Memory => {
            warn!("using in-memory storage, data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    info!("creating hostel");
    let hostel = Hostel::new(
        store,
        HostelConfig {
            rate_per_day: env.rate_per_day(),
            request_timeout: env.request_timeout(),
        },
    );

    info!("Starting web api...");
    web::serve(hostel, &env).await
}
