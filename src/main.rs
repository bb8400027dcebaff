use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;

use dollynstorm::settings::{Settings, StorageBackend};
use dollynstorm::storage::{FileStore, Storage};
use dollynstorm::services;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    #[arg(short, long)]
    listen: Option<String>,
    #[arg(long, default_value = "log4rs.yaml")]
    log4rs: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    init_logging(&args.log4rs).expect("Failed to initialize logging.");
    let mut settings = Settings::new(&args.config).expect("Could not load config file.");
    if let Some(listen) = args.listen {
        settings.server.listen = listen;
    }

    let storage = match settings.storage.backend {
        StorageBackend::Memory => {
            log::warn!("Using in-memory storage, purchases will be lost on restart.");
            Storage::memory()
        }
        StorageBackend::File => {
            let dir = match &settings.storage.data_dir {
                Some(dir) => PathBuf::from(dir),
                None => FileStore::default_dir()?,
            };
            log::info!("Storing data under {}.", dir.display());
            Storage::new(FileStore::new(dir)?)
        }
    };

    log::info!("Starting Dollyn Storm storefront.");
    services::start_services(storage, settings).await
}

fn init_logging(path: &str) -> Result<(), anyhow::Error> {
    if !Path::new("logs").exists() {
        fs::create_dir("logs")?;
    }

    match log4rs::init_file(path, Default::default()) {
        Ok(_) => {
            println!("[*] Logging initialized successfully.");
            Ok(())
        }
        Err(e) => {
            println!("[ERROR] Failed to initialize logging: {}", e);
            Err(anyhow::anyhow!("Could not initialize logging: {}", e))
        }
    }
}
