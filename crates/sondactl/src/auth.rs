//! Credential retrieval for backend calls.
//!
//! The detection core only ever receives an opaque token string; where it
//! comes from is this module's problem.

use std::fs;
use std::path::{Path, PathBuf};

/// Bearer token for the backend API.
///
/// Priority:
/// 1. `$SONDA_AUTH_TOKEN` (explicit override)
/// 2. token file under the config directory
/// 3. empty string (the backend will reject the call)
pub fn auth_token() -> String {
    if let Ok(token) = std::env::var("SONDA_AUTH_TOKEN") {
        if !token.trim().is_empty() {
            return token.trim().to_string();
        }
    }

    token_path()
        .and_then(|path| read_token_file(&path))
        .unwrap_or_default()
}

/// Identifier sent with installer generation requests.
pub fn user_id() -> String {
    std::env::var("SONDA_USER_ID")
        .ok()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| "anonymous".to_string())
}

fn token_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("SONDA_TOKEN_FILE") {
        return Some(PathBuf::from(path));
    }

    dirs::config_dir().map(|dir| dir.join("sonda").join("token"))
}

fn read_token_file(path: &Path) -> Option<String> {
    let raw = fs::read_to_string(path).ok()?;
    let token = raw.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
