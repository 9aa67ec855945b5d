//! System profile types shared between the detector and its consumers.
//!
//! A profile is an immutable snapshot. Re-running detection produces a fresh
//! snapshot; nothing mutates an existing one.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::installer::{self, InstallerRecommendation};

/// Operating system family, as inferred from reported user agent and
/// platform strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Windows,
    Macos,
    Linux,
    Android,
    Ios,
    #[default]
    Unknown,
}

impl OsFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            OsFamily::Windows => "windows",
            OsFamily::Macos => "macos",
            OsFamily::Linux => "linux",
            OsFamily::Android => "android",
            OsFamily::Ios => "ios",
            OsFamily::Unknown => "unknown",
        }
    }

    /// Desktop systems are the only ones the agent installer supports.
    pub fn is_desktop(&self) -> bool {
        matches!(self, OsFamily::Windows | OsFamily::Macos | OsFamily::Linux)
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU architecture, as inferred from reported strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X64,
    X86,
    Arm64,
    Arm,
    Ppc,
    #[default]
    Unknown,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X64 => "x64",
            Arch::X86 => "x86",
            Arch::Arm64 => "arm64",
            Arch::Arm => "arm",
            Arch::Ppc => "ppc",
            Arch::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Browser family for user agent strings reported by the web front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    Chrome,
    Firefox,
    Safari,
    Edge,
    Opera,
    #[default]
    Unknown,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
            Browser::Safari => "safari",
            Browser::Edge => "edge",
            Browser::Opera => "opera",
            Browser::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal geometry at capture time, when attached to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalGeometry {
    pub cols: u16,
    pub rows: u16,
}

/// Immutable snapshot of the detected environment.
///
/// Built once per detection call. A later call supersedes the snapshot
/// rather than updating it in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemProfile {
    pub os: OsFamily,
    pub arch: Arch,
    pub browser: Browser,

    /// Capability name -> availability. Every known probe key is present.
    pub capabilities: BTreeMap<String, bool>,

    /// Capture time.
    pub timestamp: DateTime<Utc>,

    /// The raw strings detection ran against.
    pub user_agent: String,
    pub platform: String,

    /// Ambient metadata captured alongside detection.
    pub locale: Option<String>,
    pub languages: Vec<String>,
    pub online: bool,
    pub hostname: Option<String>,
    pub terminal: Option<TerminalGeometry>,
}

impl SystemProfile {
    /// Whether this system can run the companion agent at all.
    pub fn is_compatible(&self) -> bool {
        installer::is_compatible(self.os)
    }

    /// Preferred installer package for this system, if one exists.
    pub fn recommended_installer(&self) -> Option<InstallerRecommendation> {
        installer::recommended_installer(self.os, self.arch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_tokens_are_lowercase() {
        assert_eq!(OsFamily::Windows.to_string(), "windows");
        assert_eq!(Arch::Arm64.to_string(), "arm64");
        assert_eq!(Browser::Edge.to_string(), "edge");
    }

    #[test]
    fn serde_uses_lowercase_tokens() {
        assert_eq!(serde_json::to_string(&OsFamily::Macos).unwrap(), "\"macos\"");
        assert_eq!(serde_json::from_str::<Arch>("\"x64\"").unwrap(), Arch::X64);
    }

    #[test]
    fn desktop_systems() {
        assert!(OsFamily::Windows.is_desktop());
        assert!(OsFamily::Linux.is_desktop());
        assert!(OsFamily::Macos.is_desktop());
        assert!(!OsFamily::Android.is_desktop());
        assert!(!OsFamily::Ios.is_desktop());
        assert!(!OsFamily::Unknown.is_desktop());
    }
}
