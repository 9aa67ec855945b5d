//! Command implementations for sondactl.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use sonda_common::{installer_filename, AgentClient, ProbeConfig, SystemDetector};

use crate::auth;
use crate::backend::{BackendClient, BackendError};
use crate::errors::{EXIT_BACKEND_UNAVAILABLE, EXIT_INCOMPATIBLE};
use crate::output;

/// Detect the local system and render the profile.
pub fn detect(json: bool) -> Result<()> {
    let mut detector = SystemDetector::new(ProbeConfig::load());
    let profile = detector.detect();

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
    } else {
        output::render_profile(&profile);
    }

    Ok(())
}

/// Probe the companion agent and render its state.
pub async fn agent() -> Result<()> {
    let config = ProbeConfig::load();
    let client = AgentClient::new(&config)?;
    let status = client.check_status().await;
    output::render_agent_status(&status);
    Ok(())
}

/// Show the recommended installer for the detected system.
pub fn recommend() -> Result<()> {
    let mut detector = SystemDetector::new(ProbeConfig::load());
    let profile = detector.detect();

    if !profile.is_compatible() {
        output::notify_error(&format!(
            "{} systems cannot run the companion agent",
            profile.os
        ));
        std::process::exit(EXIT_INCOMPATIBLE);
    }

    match profile.recommended_installer() {
        Some(rec) => output::render_recommendation(&rec),
        None => {
            output::notify_error("no installer is available for this system");
            std::process::exit(EXIT_INCOMPATIBLE);
        }
    }

    Ok(())
}

/// Generate the installer on the backend and save the artifact.
pub async fn download(output_path: Option<PathBuf>) -> Result<()> {
    let config = ProbeConfig::load();
    let mut detector = SystemDetector::new(config.clone());
    let profile = detector.detect();

    if !profile.is_compatible() {
        output::notify_error(&format!(
            "{} systems cannot run the companion agent",
            profile.os
        ));
        std::process::exit(EXIT_INCOMPATIBLE);
    }

    let backend = BackendClient::new(&config.api_base, &auth::auth_token())?;
    let artifact = match backend.generate_installer(&profile, &auth::user_id()).await {
        Ok(artifact) => artifact,
        Err(e) => {
            output::notify_error(&format!("could not generate the installer: {e}"));
            std::process::exit(EXIT_BACKEND_UNAVAILABLE);
        }
    };

    let path = output_path.unwrap_or_else(|| {
        PathBuf::from(installer_filename(
            profile.os,
            profile.arch,
            Utc::now().date_naive(),
        ))
    });

    tokio::fs::write(&path, &artifact)
        .await
        .with_context(|| format!("writing {}", path.display()))?;

    output::notify_success(&format!(
        "installer saved to {} ({} bytes)",
        path.display(),
        artifact.len()
    ));
    Ok(())
}

/// Ask the backend to open the case folder for a session.
pub async fn open_folder(session_id: &str) -> Result<()> {
    let config = ProbeConfig::load();
    let backend = BackendClient::new(&config.api_base, &auth::auth_token())?;

    match backend.open_case_folder(session_id).await {
        Ok(case) => {
            let message = case.message.unwrap_or_else(|| {
                if case.success {
                    "Command sent".to_string()
                } else {
                    "Error".to_string()
                }
            });
            if case.success {
                output::notify_success(&message);
            } else {
                output::notify_error(&message);
                std::process::exit(EXIT_BACKEND_UNAVAILABLE);
            }
        }
        Err(e) => {
            output::notify_error(&format!("connection error while opening the folder: {e}"));
            std::process::exit(EXIT_BACKEND_UNAVAILABLE);
        }
    }

    Ok(())
}

/// Finalize a case: it no longer appears in the active case list.
pub async fn complete_case(session_id: &str, yes: bool) -> Result<()> {
    if !yes
        && !confirm(
            "Finalize this case? Once finalized it no longer appears in the active case list.",
        )?
    {
        output::notify_info("cancelled");
        return Ok(());
    }

    let config = ProbeConfig::load();
    let backend = BackendClient::new(&config.api_base, &auth::auth_token())?;

    match backend.complete_case(session_id).await {
        Ok(()) => {
            output::notify_success("Case finalized.");
            output::notify_info("The case has been removed from the active list.");
        }
        Err(e @ BackendError::Status(_)) => {
            output::notify_error(&format!("the server failed to finalize the case: {e}"));
            std::process::exit(EXIT_BACKEND_UNAVAILABLE);
        }
        Err(e) => {
            output::notify_error(&format!("could not finalize the case: {e}"));
            std::process::exit(EXIT_BACKEND_UNAVAILABLE);
        }
    }

    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
