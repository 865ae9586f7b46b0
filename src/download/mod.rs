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


//! Download lifecycle management
//!
//! The controller runs one polling session per item against the backend
//! engine; the reconciler keeps refreshed message records from trampling
//! live sessions; the coordinator owns the per-item map the console and the
//! gallery render from.

pub mod controller;
pub mod coordinator;
pub mod metrics;
pub mod reconcile;
pub mod state;

// Re-export commonly used types
pub use controller::DownloadController;
pub use coordinator::MediaListCoordinator;
pub use reconcile::{reconcile, ReconcileOutcome};
pub use state::{
    MediaDownloadState, MediaFlag, MediaItemKey, MediaStatus, StateCallback, UpdateOrigin,
};
