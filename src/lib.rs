//! ChatVault media-core
//!
//! Client-side download lifecycle for the ChatVault console: per-item
//! controllers polling the backend download engine, reconciliation against
//! refreshed message records, transfer metrics, and stored-path resolution.
//!
//! The rendering layer mounts one item per visible media attachment on a
//! [`MediaListCoordinator`], issues `start`/`cancel` commands, and renders
//! from the coordinator's state snapshots.

pub mod api;
pub mod config;
pub mod download;
pub mod error;
pub mod media;

pub use api::{DownloadService, HttpDownloadService, SharedDownloadService};
pub use config::DownloadConfig;
pub use download::{
    DownloadController, MediaDownloadState, MediaFlag, MediaItemKey, MediaListCoordinator,
    MediaStatus, UpdateOrigin,
};
pub use error::{Result, VaultError};
pub use media::resolve_media_url;
