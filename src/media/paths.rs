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


//! Stored media path resolution
//!
//! The download engine and older archive imports disagree about how they
//! record a file's location: full URLs, paths under the `/media/` mount with
//! or without a leading slash or `./`, and bare filenames all occur. The
//! resolver normalizes every historical shape into one absolute fetchable URL.
//! No I/O, no failure mode, and already-absolute inputs pass through
//! untouched, so resolving twice is the same as resolving once.

/// Resolve a stored media path into an absolute fetchable URL
///
/// Rules apply in order, first match wins. `api_origin` is only consulted for
/// absolute paths living outside the media mount (engine-served routes like
/// `/downloads/...`).
pub fn resolve_media_url(raw: &str, api_origin: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    if raw.starts_with("http://") || raw.starts_with("https://") {
        return raw.to_string();
    }

    if raw.starts_with("/media/") {
        return raw.to_string();
    }

    if raw.starts_with("media/") {
        return format!("/{}", raw);
    }

    if let Some(rest) = raw.strip_prefix("./media/") {
        return format!("/media/{}", rest);
    }

    if !raw.starts_with('/') {
        return format!("/media/{}", raw);
    }

    format!("{}{}", api_origin.trim_end_matches('/'), raw)
}
