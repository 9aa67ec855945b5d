//! Heuristic system detection.
//!
//! Best-effort identification from reported user agent and platform strings.
//! Matching is case-insensitive: both inputs are lower-cased before any token
//! check. The result is never authoritative; the strings are self-reported
//! and incomplete by nature.

use std::panic::{self, AssertUnwindSafe};

use chrono::Utc;
use tracing::{debug, warn};

use crate::capabilities::{detect_capabilities, ProbePaths};
use crate::config::{ArchFallback, ProbeConfig};
use crate::profile::{Arch, Browser, OsFamily, SystemProfile, TerminalGeometry};

/// Detect the operating system family. First matching token wins.
pub fn detect_os(user_agent: &str, platform: &str) -> OsFamily {
    let ua = user_agent.to_lowercase();
    let platform = platform.to_lowercase();

    if ua.contains("windows") || platform.starts_with("win") {
        return OsFamily::Windows;
    }

    if ua.contains("mac os x") || ua.contains("macintosh") || ua.contains("macos")
        || platform.starts_with("mac")
    {
        return OsFamily::Macos;
    }

    const LINUX_TOKENS: [&str; 7] =
        ["linux", "x11", "ubuntu", "debian", "centos", "red hat", "fedora"];
    if LINUX_TOKENS.iter().any(|token| ua.contains(token)) || platform.contains("linux") {
        return OsFamily::Linux;
    }

    if ua.contains("android") {
        return OsFamily::Android;
    }

    if ua.contains("iphone") || ua.contains("ipad") {
        return OsFamily::Ios;
    }

    OsFamily::Unknown
}

/// Detect the CPU architecture.
///
/// 64-bit tokens are checked before 32-bit ones so `x86_64` never reads as
/// x86. Strings no heuristic resolves yield the configured fallback.
pub fn detect_arch(user_agent: &str, platform: &str, fallback: ArchFallback) -> Arch {
    let ua = user_agent.to_lowercase();
    let platform = platform.to_lowercase();

    if ua.contains("x64") || ua.contains("x86_64") || ua.contains("amd64") {
        return Arch::X64;
    }

    if ua.contains("x86") || ua.contains("i386") || ua.contains("i686") {
        return Arch::X86;
    }

    if ua.contains("arm64") || ua.contains("aarch64") {
        return Arch::Arm64;
    }

    if ua.contains("arm") {
        return Arch::Arm;
    }

    if platform.contains("win64") || platform.contains("x86_64") || platform.contains("x64") {
        return Arch::X64;
    }
    if platform.contains("win32") || platform.contains("x86") {
        return Arch::X86;
    }
    if platform.contains("macintel") {
        return Arch::X64;
    }
    if platform.contains("macppc") {
        return Arch::Ppc;
    }
    if platform.contains("aarch64") || platform.contains("arm64") {
        return Arch::Arm64;
    }

    match fallback {
        ArchFallback::Unknown => Arch::Unknown,
        ArchFallback::X64 => Arch::X64,
    }
}

/// Detect the browser family from a user agent string.
///
/// Edge agents carry Chrome and Safari tokens, and Opera agents carry a
/// Chrome token, so the more specific tokens are checked first. Safari is
/// only reported when neither Chrome nor Edge tokens are present.
pub fn detect_browser(user_agent: &str) -> Browser {
    let ua = user_agent.to_lowercase();

    if ua.contains("edg") {
        return Browser::Edge;
    }

    if ua.contains("opr") || ua.contains("opera") {
        return Browser::Opera;
    }

    if ua.contains("chrome") {
        return Browser::Chrome;
    }

    if ua.contains("firefox") {
        return Browser::Firefox;
    }

    if ua.contains("safari") {
        return Browser::Safari;
    }

    Browser::Unknown
}

type Observer = Box<dyn Fn(&SystemProfile) + Send + Sync>;

/// Aggregating detector.
///
/// Construction is explicit; nothing runs at load time. Each `detect` call
/// yields a fresh immutable snapshot and broadcasts it to the registered
/// observers in registration order.
pub struct SystemDetector {
    config: ProbeConfig,
    paths: ProbePaths,
    observers: Vec<Observer>,
    last: Option<SystemProfile>,
}

impl SystemDetector {
    pub fn new(config: ProbeConfig) -> Self {
        Self {
            config,
            paths: ProbePaths::default(),
            observers: Vec::new(),
            last: None,
        }
    }

    /// Override the probe roots. Used by tests.
    pub fn with_paths(mut self, paths: ProbePaths) -> Self {
        self.paths = paths;
        self
    }

    /// Register an observer for future detection results.
    ///
    /// Observers run synchronously in registration order. A panicking
    /// observer is isolated; the rest still run.
    pub fn on_detect(&mut self, observer: impl Fn(&SystemProfile) + Send + Sync + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Run a full detection pass and return the snapshot.
    ///
    /// Safe to call repeatedly; each call supersedes the previous snapshot.
    pub fn detect(&mut self) -> SystemProfile {
        let user_agent = ambient_user_agent();
        let platform = ambient_platform();

        let profile = SystemProfile {
            os: detect_os(&user_agent, &platform),
            arch: detect_arch(&user_agent, &platform, self.config.unknown_arch_default),
            browser: detect_browser(&user_agent),
            capabilities: detect_capabilities(&self.paths),
            timestamp: Utc::now(),
            user_agent,
            platform,
            locale: ambient_locale(),
            languages: ambient_languages(),
            online: ambient_online(),
            hostname: sysinfo::System::host_name(),
            terminal: terminal_geometry(),
        };

        debug!(
            os = %profile.os,
            arch = %profile.arch,
            browser = %profile.browser,
            "system detected"
        );

        for observer in &self.observers {
            if panic::catch_unwind(AssertUnwindSafe(|| observer(&profile))).is_err() {
                warn!("detection observer panicked, continuing with the rest");
            }
        }

        self.last = Some(profile.clone());
        profile
    }

    /// Most recent snapshot, if detection has run.
    pub fn last_profile(&self) -> Option<&SystemProfile> {
        self.last.as_ref()
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }
}

/// Reported user agent for this process.
///
/// `SONDA_USER_AGENT` overrides (set by the web front end glue when it
/// forwards a browser profile); otherwise one is synthesized from the host.
fn ambient_user_agent() -> String {
    if let Ok(ua) = std::env::var("SONDA_USER_AGENT") {
        return ua;
    }

    let os = sysinfo::System::long_os_version().unwrap_or_else(|| std::env::consts::OS.to_string());
    let kernel = sysinfo::System::kernel_version().unwrap_or_else(|| "unknown".to_string());
    let arch =
        sysinfo::System::cpu_arch().unwrap_or_else(|| std::env::consts::ARCH.to_string());

    format!(
        "Sonda/{} ({os}; {arch}; kernel {kernel})",
        env!("CARGO_PKG_VERSION")
    )
}

/// Reported platform string, `SONDA_PLATFORM` override or `os arch`.
fn ambient_platform() -> String {
    if let Ok(platform) = std::env::var("SONDA_PLATFORM") {
        return platform;
    }

    format!("{} {}", std::env::consts::OS, std::env::consts::ARCH)
}

fn ambient_locale() -> Option<String> {
    let raw = std::env::var("LC_ALL")
        .or_else(|_| std::env::var("LANG"))
        .ok()?;
    let locale = raw.split('.').next().unwrap_or(&raw).trim();
    if locale.is_empty() || locale == "C" {
        None
    } else {
        Some(locale.to_string())
    }
}

fn ambient_languages() -> Vec<String> {
    let Ok(raw) = std::env::var("LANGUAGE") else {
        return ambient_locale().into_iter().collect();
    };
    raw.split(':')
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
        .collect()
}

/// Any non-loopback interface reporting an `up` operstate counts as online.
fn ambient_online() -> bool {
    let Ok(entries) = std::fs::read_dir("/sys/class/net") else {
        return false;
    };

    entries.flatten().any(|entry| {
        let name = entry.file_name();
        if name.to_string_lossy() == "lo" {
            return false;
        }
        std::fs::read_to_string(entry.path().join("operstate"))
            .map(|state| state.trim() == "up")
            .unwrap_or(false)
    })
}

fn terminal_geometry() -> Option<TerminalGeometry> {
    let term = console::Term::stdout();
    if !term.is_term() {
        return None;
    }
    let (rows, cols) = term.size();
    Some(TerminalGeometry { cols, rows })
}
