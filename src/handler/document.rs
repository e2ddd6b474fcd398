use std::path::PathBuf;

use crate::client::ApiClient;
use crate::controller::{
    AssumeYes, Confirm, ConsoleScreen, DocumentController, FileOutcome, ServerStatus, StdinConfirm,
};
use crate::Config;

pub async fn check_health(config: &Config) -> anyhow::Result<()> {
    let client = ApiClient::from_config(config)?;
    let controller = DocumentController::new(&client, &ConsoleScreen, config.max_file_size_mb);
    match controller.check_health().await {
        ServerStatus::Healthy => Ok(()),
        other => Err(anyhow::anyhow!("Server at {} is {}", config.server_url, other)),
    }
}

pub async fn upload_documents(config: &Config, paths: Vec<PathBuf>) -> anyhow::Result<()> {
    let client = ApiClient::from_config(config)?;
    let controller = DocumentController::new(&client, &ConsoleScreen, config.max_file_size_mb);

    let report = controller.upload(&paths).await;
    for outcome in &report.outcomes {
        match outcome {
            FileOutcome::Uploaded { filename, size_mb } => println!("\t{} ({:.2} MB)", filename, size_mb),
            FileOutcome::Failed { filename, error } => println!("\t{} failed: {}", filename, error),
        }
    }

    if report.succeeded() == 0 {
        anyhow::bail!("Nothing was uploaded");
    }
    if !report.is_clean() {
        anyhow::bail!("{} of {} file(s) were not uploaded", paths.len() - report.succeeded(), paths.len());
    }
    Ok(())
}

pub async fn list_documents(config: &Config) -> anyhow::Result<()> {
    let client = ApiClient::from_config(config)?;
    let controller = DocumentController::new(&client, &ConsoleScreen, config.max_file_size_mb);
    controller.refresh().await?;
    Ok(())
}

pub async fn remove_document(config: &Config, name: &str, yes: bool) -> anyhow::Result<()> {
    let client = ApiClient::from_config(config)?;
    let controller = DocumentController::new(&client, &ConsoleScreen, config.max_file_size_mb);
    let confirm: &dyn Confirm = if yes { &AssumeYes } else { &StdinConfirm };
    controller.delete(name, confirm).await?;
    Ok(())
}

pub async fn download_document(config: &Config, name: &str, out: PathBuf) -> anyhow::Result<()> {
    let client = ApiClient::from_config(config)?;
    let controller = DocumentController::new(&client, &ConsoleScreen, config.max_file_size_mb);
    controller.download(name, &out).await
}
