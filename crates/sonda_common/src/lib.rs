//! Sonda Common - shared detection core for the Sonda forensic toolkit.
//!
//! Best-effort environment identification, runtime capability probing,
//! companion agent liveness checks, and installer recommendation. Consumed
//! by sondactl and the web front end glue.

pub mod agent;
pub mod capabilities;
pub mod config;
pub mod detector;
pub mod installer;
pub mod profile;

pub use agent::{AgentClient, AgentStatus};
pub use capabilities::{detect_capabilities, ProbePaths};
pub use config::{ArchFallback, ProbeConfig};
pub use detector::{detect_arch, detect_browser, detect_os, SystemDetector};
pub use installer::{
    installer_filename, is_compatible, recommended_installer, InstallerRecommendation, PackageType,
};
pub use profile::{Arch, Browser, OsFamily, SystemProfile, TerminalGeometry};
