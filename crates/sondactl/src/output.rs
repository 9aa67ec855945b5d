//! Terminal output - clean, ASCII-only, sysadmin style.

use owo_colors::OwoColorize;
use sonda_common::{AgentStatus, InstallerRecommendation, SystemProfile};

/// Toast-style success notification.
pub fn notify_success(message: &str) {
    println!("[OK] {}", message.green());
}

/// Toast-style error notification.
pub fn notify_error(message: &str) {
    eprintln!("[ERROR] {}", message.red());
}

pub fn notify_info(message: &str) {
    println!("[INFO] {}", message);
}

/// Render a detected profile.
pub fn render_profile(profile: &SystemProfile) {
    println!("[SYSTEM]");
    println!("  os:          {}", profile.os);
    println!("  arch:        {}", profile.arch);
    println!("  browser:     {}", profile.browser);
    println!("  user agent:  {}", profile.user_agent);
    println!("  platform:    {}", profile.platform);
    if let Some(locale) = &profile.locale {
        println!("  locale:      {}", locale);
    }
    if !profile.languages.is_empty() {
        println!("  languages:   {}", profile.languages.join(", "));
    }
    println!("  online:      {}", if profile.online { "yes" } else { "no" });
    if let Some(hostname) = &profile.hostname {
        println!("  hostname:    {}", hostname);
    }
    if let Some(terminal) = &profile.terminal {
        println!("  terminal:    {}x{}", terminal.cols, terminal.rows);
    }
    println!("  captured:    {}", profile.timestamp.to_rfc3339());

    println!();
    println!("[CAPABILITIES]");
    for (name, available) in &profile.capabilities {
        if *available {
            println!("  * {:20} {}", name, "yes".green());
        } else {
            println!("  * {:20} {}", name, "no".dimmed());
        }
    }
}

/// Render the companion agent state.
pub fn render_agent_status(status: &AgentStatus) {
    if status.connected {
        println!("{} Companion agent connected", "[OK]".green());
        if let Some(state) = &status.status {
            println!("  status:   {}", state);
        }
        if let Some(version) = &status.version {
            println!("  version:  {}", version);
        }
        if !status.capabilities.is_empty() {
            let formats: Vec<&str> = status
                .capabilities
                .iter()
                .filter(|(_, available)| **available)
                .map(|(format, _)| format.as_str())
                .collect();
            println!("  formats:  {}", formats.join(", "));
        }
        if let Some(last_seen) = &status.last_seen {
            println!("  seen:     {}", last_seen.to_rfc3339());
        }
    } else {
        println!("{} Companion agent not reachable", "[ERROR]".red());
        println!("Download and install the agent for this system:");
        println!("  sondactl download");
    }
}

/// Render an installer recommendation.
pub fn render_recommendation(rec: &InstallerRecommendation) {
    println!("[INSTALLER]");
    println!("  os:        {}", rec.os);
    println!("  arch:      {}", rec.arch);
    println!("  package:   {}", rec.package_type);
    println!("  priority:  {}", rec.priority);
}
