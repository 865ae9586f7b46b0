// ChatVault - Archived Chat Media Console
// Copyright (C) 2026 ChatVault contributors
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


use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use chatvault_media::api::client::DownloadService;
use chatvault_media::{
    DownloadConfig, HttpDownloadService, MediaFlag, MediaItemKey, MediaListCoordinator, MediaStatus,
};

#[derive(Parser)]
#[command(name = "chatvault-media-cli")]
#[command(about = "ChatVault media CLI - desktop testing tool", long_about = None)]
struct Cli {
    /// Base URL of the download service
    #[arg(long, default_value = "http://127.0.0.1:8900")]
    api_base: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one attachment and watch it until it lands
    Fetch {
        group_id: i64,
        message_id: i64,
        /// Per-session wall-clock budget in seconds
        #[arg(long, default_value_t = 60)]
        timeout: u64,
    },
    /// One-shot status query against the engine
    Status { group_id: i64, message_id: i64 },
    /// Ask the engine to abort its fetch
    Cancel { group_id: i64, message_id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch {
            group_id,
            message_id,
            timeout,
        } => {
            let config = DownloadConfig {
                session_timeout: Duration::from_secs(timeout),
                ..DownloadConfig::new(cli.api_base)
            };
            fetch(config, MediaItemKey::new(group_id, message_id)).await
        }
        Commands::Status {
            group_id,
            message_id,
        } => {
            let service = HttpDownloadService::new(&DownloadConfig::new(cli.api_base))?;
            let response = service
                .download_status(&MediaItemKey::new(group_id, message_id))
                .await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Commands::Cancel {
            group_id,
            message_id,
        } => {
            let service = HttpDownloadService::new(&DownloadConfig::new(cli.api_base))?;
            let response = service
                .cancel_download(&MediaItemKey::new(group_id, message_id))
                .await?;
            println!("engine answered: {}", response.status);
            Ok(())
        }
    }
}

async fn fetch(config: DownloadConfig, key: MediaItemKey) -> Result<()> {
    let coordinator = MediaListCoordinator::over_http(config)?;

    coordinator.subscribe(Arc::new(|key, state, _origin| {
        println!("{}: {}", key, state.display_string());
    }));

    coordinator.mount(key, &MediaFlag::missing());
    coordinator.start(&key)?;

    let state = loop {
        tokio::time::sleep(Duration::from_millis(250)).await;
        match coordinator.state_of(&key) {
            Some(state) if state.is_terminal() => break state,
            Some(_) => {}
            None => bail!("item {} vanished from the coordinator", key),
        }
    };

    match state.status {
        MediaStatus::Downloaded => {
            match coordinator.resolved_url(&key) {
                Some(url) => println!("done: {}", url),
                None => println!("done"),
            }
            Ok(())
        }
        _ => bail!(
            "{}",
            state.error.unwrap_or_else(|| "download failed".to_string())
        ),
    }
}
