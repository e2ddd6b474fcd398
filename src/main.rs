use clap::Parser;
use dotenv::dotenv;
use handler::Cli;
use serde::{Deserialize, Serialize};

mod handler;
mod document;
mod storage;
mod server;
mod client;
mod controller;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = read_config()?;
    let args = Cli::parse();
    handler::handler(args, config).await?;
    Ok(())
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    // Server
    host: String,
    port: u16,

    // Folders
    upload_folder: String,
    data_folder: String,
    static_folder: String,

    // Limits
    max_file_size_mb: u64,

    // Client
    server_url: String,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `config.toml` is optional; environment variables (`UPLOAD_FOLDER`, `PORT`, ...) win over it.
fn read_config() -> anyhow::Result<Config> {
    Ok(config::Config::builder()
        .set_default("host", "0.0.0.0")?
        .set_default("port", 8000)?
        .set_default("upload_folder", "uploads")?
        .set_default("data_folder", "data")?
        .set_default("static_folder", "static")?
        .set_default("max_file_size_mb", document::MAX_FILE_SIZE_MB)?
        .set_default("server_url", "http://localhost:8000")?
        .add_source(config::File::with_name("config").required(false))
        .add_source(config::Environment::default().try_parsing(true))
        .build()?
        .try_deserialize::<Config>()?)
}

#[cfg(test)]
pub(crate) fn test_config(root: &std::path::Path) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        upload_folder: root.join("uploads").display().to_string(),
        data_folder: root.join("data").display().to_string(),
        static_folder: root.join("static").display().to_string(),
        max_file_size_mb: document::MAX_FILE_SIZE_MB,
        server_url: "http://127.0.0.1:0".to_string(),
    }
}
