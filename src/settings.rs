use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Server {
    pub listen: String,
}

#[derive(Debug, Deserialize)]
pub struct Pix {
    pub key: String,
    pub merchant_name: String,
    pub merchant_city: String,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
    pub backend: StorageBackend,
    pub data_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Admin {
    pub email: String,
    pub password_sha256: String,
}

#[derive(Debug, Deserialize)]
pub struct Qr {
    pub image_url: String,
    pub size: u32,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub pix: Pix,
    pub storage: Storage,
    pub admin: Admin,
    pub qr: Qr,
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.listen", "0.0.0.0:8080")?
            .set_default("pix.merchant_name", crate::pix::DEFAULT_MERCHANT_NAME)?
            .set_default("pix.merchant_city", crate::pix::DEFAULT_MERCHANT_CITY)?
            .set_default("storage.backend", "file")?
            .set_default("qr.image_url", "https://api.qrserver.com/v1/create-qr-code/")?
            .set_default("qr.size", 250)?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("DOLLYNSTORM").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
