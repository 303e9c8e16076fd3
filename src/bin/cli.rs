// Examina Client Core - Exam and Training File Preparation
// Copyright (C) 2025 Examina contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use examina_core::config::ENV_ACCESS_TOKEN;
use examina_core::download::progress::format_file_size;
use examina_core::preparation::{task_name_for, FileDownloadPreparationViewModel};
use examina_core::{
    DownloadConfig, FileDownloadService, FileDownloadTaskType, HttpFileDownloadService,
    PreparationPhase, PreparationSnapshot,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "examina-prep")]
#[command(about = "Examina CLI - list, download and clean up exam and training files", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Examina server, e.g. https://examina.example.org
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Directory files are stored under
    #[arg(long, global = true)]
    download_root: Option<PathBuf>,

    /// Bearer token for the file endpoints
    #[arg(long, global = true, env = ENV_ACCESS_TOKEN, hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the files attached to an exam or training
    List {
        /// mock-exam, online-exam, comprehensive-training or specialized-training
        task_type: FileDownloadTaskType,
        /// Exam or training id
        id: i64,
    },
    /// Download every file of an exam or training (Ctrl-C cancels)
    Prepare {
        task_type: FileDownloadTaskType,
        id: i64,
        /// Name shown in progress output
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Delete previously downloaded files
    Cleanup {
        task_type: FileDownloadTaskType,
        id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("examina_core=info,examina_prep=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let service = Arc::new(
        HttpFileDownloadService::new(config).context("Failed to create download service")?,
    );

    match cli.command {
        Commands::List { task_type, id } => list(&service, task_type, id).await,
        Commands::Prepare { task_type, id, name } => {
            let name = name.unwrap_or_else(|| format!("#{}", id));
            prepare(service, task_type, id, &name).await
        }
        Commands::Cleanup { task_type, id } => {
            service
                .cleanup_downloaded_files(task_type, id)
                .await
                .context("Failed to remove downloaded files")?;
            println!(
                "Removed {}",
                service.download_directory(task_type, id).display()
            );
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<DownloadConfig> {
    let config = match &cli.config {
        Some(path) => DownloadConfig::from_json_file(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => DownloadConfig::default(),
    };
    let mut config = config.with_env_overrides();

    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(root) = &cli.download_root {
        config.download_root = root.clone();
    }
    if let Some(token) = &cli.token {
        config.access_token = Some(token.clone());
    }
    Ok(config)
}

async fn list(
    service: &HttpFileDownloadService,
    task_type: FileDownloadTaskType,
    id: i64,
) -> anyhow::Result<()> {
    let files = service
        .get_files(id, task_type)
        .await
        .context("Failed to get file list")?;

    if files.is_empty() {
        println!("No files for {} {}", task_type, id);
        return Ok(());
    }

    for file in &files {
        let packed = if file.is_compressed { " (archive)" } else { "" };
        println!("{:>10}  {}{}", file.size_string(), file.file_name, packed);
    }
    let total: u64 = files.iter().map(|f| f.total_size).sum();
    println!("{} files, {}", files.len(), format_file_size(total));
    Ok(())
}

async fn prepare(
    service: Arc<HttpFileDownloadService>,
    task_type: FileDownloadTaskType,
    id: i64,
    name: &str,
) -> anyhow::Result<()> {
    let view_model = FileDownloadPreparationViewModel::new(service);
    view_model
        .initialize(&task_name_for(task_type, name), task_type, id)
        .await?;

    let snapshot = view_model.snapshot();
    println!("{}", snapshot.status_message);
    if let Some(error) = &snapshot.error_message {
        bail!("{}", error);
    }
    if !snapshot.can_start_download {
        return Ok(());
    }

    let printer = tokio::spawn(print_progress(view_model.subscribe()));

    let download = view_model.start_download();
    tokio::pin!(download);
    let interrupted = tokio::select! {
        result = &mut download => {
            result?;
            false
        }
        _ = tokio::signal::ctrl_c() => true,
    };
    if interrupted {
        eprintln!("Cancelling...");
        view_model.cancel_download()?;
        download.await?;
    }
    printer.abort();

    let snapshot = view_model.snapshot();
    match snapshot.phase {
        PreparationPhase::Completed => {
            println!(
                "{}: {}/{} files ready",
                snapshot.status_message, snapshot.completed_file_count, snapshot.total_file_count
            );
            Ok(())
        }
        PreparationPhase::Cancelled => {
            println!("{}", snapshot.status_message);
            Ok(())
        }
        _ => bail!(
            "{}",
            snapshot
                .error_message
                .unwrap_or(snapshot.status_message)
        ),
    }
}

async fn print_progress(mut snapshots: watch::Receiver<PreparationSnapshot>) {
    let mut last_line = String::new();
    while snapshots.changed().await.is_ok() {
        let line = {
            let snapshot = snapshots.borrow_and_update();
            match &snapshot.current_file {
                Some(file) => format!(
                    "[{:>5.1}%] {} ({}/{} files) {} {:.1}%",
                    snapshot.overall_progress,
                    snapshot.status_message,
                    snapshot.completed_file_count,
                    snapshot.total_file_count,
                    file.file_name,
                    file.progress
                ),
                None => format!("[{:>5.1}%] {}", snapshot.overall_progress, snapshot.status_message),
            }
        };
        if line != last_line {
            println!("{}", line);
            last_line = line;
        }
    }
}
