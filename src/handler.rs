use std::path::PathBuf;
use clap::{command, Parser};
use crate::Config;

mod document;

#[derive(Parser)]
#[command(name = "pdf-learner")]
#[command(about = "Upload, list and manage PDF documents for PDF Learner", version = "1.0")]
pub enum Cli {
    /// Start the document server
    Serve {
        #[arg(long, help = "Address to bind, overrides HOST")]
        host: Option<String>,

        #[arg(short, long, help = "Port to listen on, overrides PORT")]
        port: Option<u16>,
    },

    /// Check whether the server is healthy
    Health,

    /// Document management commands
    #[command(subcommand)]
    Doc(DocCommand),
}

#[derive(Parser)]
pub enum DocCommand {
    /// Upload PDF files, one request per file
    Upload {
        #[arg(required = true, help = "PDF files to upload")]
        paths: Vec<PathBuf>,
    },

    /// List uploaded documents
    List,

    /// Delete an uploaded document
    Remove {
        #[arg(help = "Document file name")]
        name: String,

        #[arg(short, long, help = "Skip the confirmation prompt")]
        yes: bool,
    },

    /// Download an uploaded document
    Download {
        #[arg(help = "Document file name")]
        name: String,

        #[arg(short, long, help = "Output path, defaults to the file name")]
        out: Option<PathBuf>,
    },
}

pub async fn handler(args: Cli, mut config: Config) -> anyhow::Result<()> {
    match args {
        Cli::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            crate::server::serve(&config).await
        }
        Cli::Health => document::check_health(&config).await,
        Cli::Doc(cmd) => handle_doc_command(cmd, &config).await,
    }
}

async fn handle_doc_command(cmd: DocCommand, config: &Config) -> anyhow::Result<()> {
    use document::*;

    match cmd {
        DocCommand::Upload { paths } => upload_documents(config, paths).await,
        DocCommand::List => list_documents(config).await,
        DocCommand::Remove { name, yes } => remove_document(config, &name, yes).await,
        DocCommand::Download { name, out } => {
            let out = out.unwrap_or_else(|| PathBuf::from(&name));
            download_document(config, &name, out).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_remove() {
        let cli = Cli::try_parse_from(["pdf-learner", "doc", "remove", "a.pdf", "--yes"]);
        assert!(matches!(cli, Ok(Cli::Doc(DocCommand::Remove { yes: true, .. }))));
    }

    #[test]
    fn test_upload_needs_paths() {
        assert!(Cli::try_parse_from(["pdf-learner", "doc", "upload"]).is_err());
        let cli = Cli::try_parse_from(["pdf-learner", "doc", "upload", "a.pdf", "b.pdf"]);
        assert!(matches!(cli, Ok(Cli::Doc(DocCommand::Upload { paths })) if paths.len() == 2));
    }
}
