//! Export command implementation.
//!
//! Export requests live in a JSON file next to the artifact directory so the
//! exactly-once download guarantee survives across CLI invocations.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::{Args, Subcommand};
use tokio::fs;
use uuid::Uuid;

use super::{Cli, Context};
use crate::error::{Result, VaultError};
use crate::export::{DataExportRequest, ExportService};
use crate::record::OwnerId;

/// Arguments for the export command
#[derive(Args, Clone)]
pub struct ExportArgs {
    #[command(subcommand)]
    pub action: ExportAction,
}

#[derive(Subcommand, Clone)]
pub enum ExportAction {
    /// Create an export of one owner's data
    Request {
        #[arg(long)]
        owner: OwnerId,
    },
    /// Download a previously requested export (exactly once)
    Download {
        #[arg(long)]
        request_id: Uuid,
    },
}

/// Run the export command
pub async fn run(cli: &Cli, args: ExportArgs) -> Result<()> {
    let ctx = Context::build(cli).await?;
    let service = ExportService::new(Arc::new(ctx.backup_engine()), &ctx.config);
    let requests_path = cli.output.join("exports.json");

    let mut requests = load_requests(&requests_path).await?;

    match args.action {
        ExportAction::Request { owner } => {
            let request = service.request_export(owner).await?;
            println!("Export prepared for owner {owner}");
            println!("  Request ID: {}", request.id);
            println!("  Expires at: {}", request.expires_at);
            requests.push(request);
        }
        ExportAction::Download { request_id } => {
            let request = requests
                .iter_mut()
                .find(|r| r.id == request_id)
                .ok_or_else(|| VaultError::export(format!("unknown request {request_id}")))?;
            let location = service.take_download(request, Utc::now())?;
            println!("Download: {}", cli.output.join(location).display());
        }
    }

    save_requests(&requests_path, &requests).await
}

async fn load_requests(path: &PathBuf) -> Result<Vec<DataExportRequest>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read(path).await?;
    Ok(serde_json::from_slice(&content)?)
}

async fn save_requests(path: &PathBuf, requests: &[DataExportRequest]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_vec_pretty(requests)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}
