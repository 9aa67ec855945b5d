//! Installer recommendation for the companion agent.
//!
//! A static (OS, architecture) table maps to the preferred distributable
//! package. This only suggests a download, it never fetches one.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::profile::{Arch, OsFamily};

/// Distributable package kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    Exe,
    Deb,
    Dmg,
}

impl PackageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageType::Exe => "exe",
            PackageType::Deb => "deb",
            PackageType::Dmg => "dmg",
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Suggested installer for a detected system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallerRecommendation {
    pub os: OsFamily,
    pub arch: Arch,
    pub package_type: PackageType,
    pub priority: u8,
}

/// OS -> (arch -> package, priority). Architectures missing under a listed
/// OS fall back to that OS's x64 entry.
const INSTALLER_TABLE: &[(OsFamily, &[(Arch, PackageType, u8)])] = &[
    (
        OsFamily::Windows,
        &[(Arch::X64, PackageType::Exe, 1), (Arch::X86, PackageType::Exe, 2)],
    ),
    (
        OsFamily::Linux,
        &[(Arch::X64, PackageType::Deb, 1), (Arch::Arm64, PackageType::Deb, 2)],
    ),
    (
        OsFamily::Macos,
        &[(Arch::X64, PackageType::Dmg, 1), (Arch::Arm64, PackageType::Dmg, 2)],
    ),
];

/// Look up the preferred installer for an OS/architecture pair.
///
/// Returns `None` for systems with no packaged agent. When the specific
/// architecture has no entry, the OS's x64 entry is used but the returned
/// value keeps the requested architecture.
pub fn recommended_installer(os: OsFamily, arch: Arch) -> Option<InstallerRecommendation> {
    let (_, entries) = INSTALLER_TABLE.iter().find(|(table_os, _)| *table_os == os)?;

    let entry = entries
        .iter()
        .find(|(table_arch, _, _)| *table_arch == arch)
        .or_else(|| entries.iter().find(|(table_arch, _, _)| *table_arch == Arch::X64))?;

    let (_, package_type, priority) = *entry;
    Some(InstallerRecommendation {
        os,
        arch,
        package_type,
        priority,
    })
}

/// Whether the companion agent can be installed on this OS at all.
pub fn is_compatible(os: OsFamily) -> bool {
    os.is_desktop()
}

/// File name the generated installer artifact is saved under.
pub fn installer_filename(os: OsFamily, arch: Arch, date: NaiveDate) -> String {
    let stamp = date.format("%Y-%m-%d");
    match os {
        OsFamily::Windows => format!("forensic_agent_windows_{arch}_{stamp}.exe"),
        OsFamily::Linux => format!("forensic_agent_linux_{arch}_{stamp}.sh"),
        OsFamily::Macos => format!("forensic_agent_macos_{arch}_{stamp}.pkg"),
        _ => format!("forensic_agent_{os}_{arch}_{stamp}.zip"),
    }
}
