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


//! Merge policy between record flags and live download state
//!
//! The message list refreshes its records independently of any download
//! session: scrolling, sibling edits, and background reloads all hand the
//! controller a fresh `MediaFlag` for an item it may be actively working on.
//! The flag reflects what was on disk when the list query ran, which during a
//! session is stale by construction.
//!
//! Invariant: a flag never overwrites a Downloading state. It is held back
//! and settled when the session reaches a terminal state. Everything visible
//! going wrong with this subsystem has historically been a violation of this
//! rule.

use crate::download::state::{MediaDownloadState, MediaFlag, MediaStatus};

/// What to do with an incoming record flag
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// Flag agrees with the current state; touch nothing, re-render nothing
    Unchanged,
    /// Replace the current state with this one
    Apply(MediaDownloadState),
    /// A session is in flight; hold the flag until it settles
    Defer,
}

/// Reconcile a refreshed record flag against the current item state
pub fn reconcile(current: &MediaDownloadState, flag: &MediaFlag) -> ReconcileOutcome {
    if current.status == MediaStatus::Downloading {
        return ReconcileOutcome::Defer;
    }

    if flag.is_downloaded {
        // Failed and NotDownloaded both disagree with an on-disk flag
        let same_path =
            flag.stored_path.is_none() || flag.stored_path == current.resolved_url;
        if current.status == MediaStatus::Downloaded && same_path {
            return ReconcileOutcome::Unchanged;
        }
        return ReconcileOutcome::Apply(MediaDownloadState::from_flag(flag));
    }

    // Flag says the file is not on disk. NotDownloaded already agrees, and a
    // Failed state carries strictly more information (the error and the retry
    // affordance) than the flag does; resetting it on every unrelated list
    // refresh would wipe visible errors.
    match current.status {
        MediaStatus::NotDownloaded | MediaStatus::Failed => ReconcileOutcome::Unchanged,
        MediaStatus::Downloaded => {
            ReconcileOutcome::Apply(MediaDownloadState::from_flag(flag))
        }
        MediaStatus::Downloading => ReconcileOutcome::Defer,
    }
}

/// Settle a flag that was deferred while a session was in flight
///
/// Returns the state to apply, or None when the flag should be dropped.
/// A not-on-disk flag buffered before the session completed is older than the
/// completion itself; applying it would un-download a file the controller
/// just watched materialize.
pub fn resolve_deferred(
    terminal: &MediaDownloadState,
    flag: &MediaFlag,
) -> Option<MediaDownloadState> {
    if terminal.status == MediaStatus::Downloaded && !flag.is_downloaded {
        return None;
    }

    match reconcile(terminal, flag) {
        ReconcileOutcome::Apply(state) => Some(state),
        ReconcileOutcome::Unchanged | ReconcileOutcome::Defer => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn downloading(progress: f64) -> MediaDownloadState {
        let mut state = MediaDownloadState::not_downloaded();
        state.status = MediaStatus::Downloading;
        state.progress_percent = progress;
        state
    }

    fn failed(message: &str) -> MediaDownloadState {
        let mut state = MediaDownloadState::not_downloaded();
        state.status = MediaStatus::Failed;
        state.error = Some(message.to_string());
        state
    }

    #[test]
    fn test_flag_never_interrupts_active_download() {
        let current = downloading(62.0);

        assert_eq!(reconcile(&current, &MediaFlag::missing()), ReconcileOutcome::Defer);
        assert_eq!(
            reconcile(&current, &MediaFlag::downloaded("media/x.jpg")),
            ReconcileOutcome::Defer
        );
    }

    #[test]
    fn test_agreeing_flag_is_a_no_op() {
        let current = MediaDownloadState::downloaded(Some("media/x.jpg".to_string()));
        let flag = MediaFlag::downloaded("media/x.jpg");
        assert_eq!(reconcile(&current, &flag), ReconcileOutcome::Unchanged);

        let current = MediaDownloadState::not_downloaded();
        assert_eq!(reconcile(&current, &MediaFlag::missing()), ReconcileOutcome::Unchanged);
    }

    #[test]
    fn test_flag_with_new_path_applies() {
        let current = MediaDownloadState::downloaded(Some("media/old.jpg".to_string()));
        let flag = MediaFlag::downloaded("media/relocated.jpg");

        match reconcile(&current, &flag) {
            ReconcileOutcome::Apply(state) => {
                assert_eq!(state.status, MediaStatus::Downloaded);
                assert_eq!(state.resolved_url.as_deref(), Some("media/relocated.jpg"));
            }
            other => panic!("expected Apply, got {:?}", other),
        }
    }

    #[test]
    fn test_flag_materialized_elsewhere_clears_failure() {
        let current = failed("engine out of disk");
        let flag = MediaFlag::downloaded("media/x.jpg");

        match reconcile(&current, &flag) {
            ReconcileOutcome::Apply(state) => {
                assert_eq!(state.status, MediaStatus::Downloaded);
                assert!(state.error.is_none());
            }
            other => panic!("expected Apply, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_flag_leaves_failure_visible() {
        let current = failed("engine out of disk");
        assert_eq!(reconcile(&current, &MediaFlag::missing()), ReconcileOutcome::Unchanged);
    }

    #[test]
    fn test_file_deleted_on_disk_applies() {
        let current = MediaDownloadState::downloaded(Some("media/x.jpg".to_string()));

        match reconcile(&current, &MediaFlag::missing()) {
            ReconcileOutcome::Apply(state) => {
                assert_eq!(state.status, MediaStatus::NotDownloaded);
            }
            other => panic!("expected Apply, got {:?}", other),
        }
    }

    #[test]
    fn test_stale_deferred_flag_dropped_after_completion() {
        // Buffered while downloading, settled after the file landed
        let terminal = MediaDownloadState::downloaded(Some("/media/x.jpg".to_string()));
        assert_eq!(resolve_deferred(&terminal, &MediaFlag::missing()), None);
    }

    #[test]
    fn test_deferred_flag_applies_after_failure() {
        // The record learned the file exists while our session was failing
        let terminal = failed("timed out");
        let settled = resolve_deferred(&terminal, &MediaFlag::downloaded("media/x.jpg")).unwrap();
        assert_eq!(settled.status, MediaStatus::Downloaded);
    }
}
