//! Runtime capability probes.
//!
//! Each probe answers "is this feature available here?" with a minimal safe
//! test. A failing probe reports `false`; it never aborts the others and
//! never surfaces an error to the caller.

use std::collections::BTreeMap;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

/// Roots the probes inspect. Tests point these at scratch trees.
#[derive(Debug, Clone)]
pub struct ProbePaths {
    /// Persistent scratch location (write-then-delete probe).
    pub state_dir: PathBuf,
    /// Session-scoped scratch location.
    pub session_dir: PathBuf,
    /// Device tree root, `/dev` on a real system.
    pub dev_dir: PathBuf,
}

impl Default for ProbePaths {
    fn default() -> Self {
        Self {
            state_dir: crate::config::state_dir(),
            session_dir: std::env::temp_dir(),
            dev_dir: PathBuf::from("/dev"),
        }
    }
}

/// Run every capability probe and collect the results.
///
/// Every key is always present in the returned map, each probe failing
/// independently to `false`.
pub fn detect_capabilities(paths: &ProbePaths) -> BTreeMap<String, bool> {
    let mut capabilities = BTreeMap::new();

    let probes: [(&str, Box<dyn FnOnce() -> bool>); 11] = [
        ("graphics", Box::new({
            let dev = paths.dev_dir.clone();
            move || check_graphics(&dev)
        })),
        ("media_capture", Box::new({
            let dev = paths.dev_dir.clone();
            move || check_media_capture(&dev)
        })),
        ("persistent_storage", Box::new({
            let dir = paths.state_dir.clone();
            move || check_storage(&dir)
        })),
        ("session_storage", Box::new({
            let dir = paths.session_dir.clone();
            move || check_storage(&dir)
        })),
        ("structured_db", Box::new(check_structured_db)),
        ("background_worker", Box::new(check_background_worker)),
        ("notifications", Box::new(check_notifications)),
        ("geolocation", Box::new(check_geolocation)),
        ("camera", Box::new({
            let dev = paths.dev_dir.clone();
            move || check_camera(&dev)
        })),
        ("microphone", Box::new({
            let dev = paths.dev_dir.clone();
            move || check_microphone(&dev)
        })),
        ("bytecode_runtime", Box::new(check_bytecode_runtime)),
    ];

    for (name, probe) in probes {
        let available = match panic::catch_unwind(AssertUnwindSafe(probe)) {
            Ok(value) => value,
            Err(_) => {
                debug!(probe = name, "capability probe panicked, reporting false");
                false
            }
        };
        capabilities.insert(name.to_string(), available);
    }

    capabilities
}

/// A hardware-accelerated rendering context is plausible: a display server
/// is reachable and a DRM render node exists.
fn check_graphics(dev_dir: &Path) -> bool {
    let display = std::env::var_os("WAYLAND_DISPLAY").is_some()
        || std::env::var_os("DISPLAY").is_some();
    if !display {
        return false;
    }

    dir_has_entry(&dev_dir.join("dri"), |name| name.starts_with("renderD"))
}

/// Any media device is enumerable.
fn check_media_capture(dev_dir: &Path) -> bool {
    dir_has_entry(dev_dir, |name| name.starts_with("video")) || dev_dir.join("snd").is_dir()
}

/// Write-then-delete of a throwaway key. Any error means no storage.
fn check_storage(dir: &Path) -> bool {
    let attempt = || -> std::io::Result<()> {
        fs::create_dir_all(dir)?;
        let key = dir.join(format!(".sonda-probe-{}", Uuid::new_v4()));
        fs::write(&key, b"probe")?;
        fs::remove_file(&key)?;
        Ok(())
    };
    attempt().is_ok()
}

/// An embedded database can be opened and used.
fn check_structured_db() -> bool {
    let attempt = || -> rusqlite::Result<()> {
        let conn = rusqlite::Connection::open_in_memory()?;
        conn.execute_batch("CREATE TABLE probe (k INTEGER); DROP TABLE probe;")?;
        Ok(())
    };
    attempt().is_ok()
}

/// A worker thread can be spawned and joined.
fn check_background_worker() -> bool {
    std::thread::Builder::new()
        .name("sonda-probe".to_string())
        .spawn(|| {})
        .map(|handle| handle.join().is_ok())
        .unwrap_or(false)
}

/// A desktop notification route exists.
fn check_notifications() -> bool {
    binary_on_path("notify-send")
}

/// A geolocation service binding exists.
fn check_geolocation() -> bool {
    Path::new("/usr/lib/geoclue-2.0").is_dir()
        || Path::new("/usr/libexec/geoclue-2.0").is_dir()
        || Path::new("/usr/share/dbus-1/system-services/org.freedesktop.GeoClue2.service").is_file()
}

fn check_camera(dev_dir: &Path) -> bool {
    dir_has_entry(dev_dir, |name| name.starts_with("video"))
}

/// ALSA capture devices are named `pcmC*D*c`.
fn check_microphone(dev_dir: &Path) -> bool {
    dir_has_entry(&dev_dir.join("snd"), |name| {
        name.starts_with("pcm") && name.ends_with('c')
    })
}

/// A portable bytecode runtime is installed.
fn check_bytecode_runtime() -> bool {
    binary_on_path("wasmtime") || binary_on_path("wasmer")
}

fn dir_has_entry(dir: &Path, matches: impl Fn(&str) -> bool) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    entries
        .flatten()
        .any(|entry| matches(&entry.file_name().to_string_lossy()))
}

fn binary_on_path(name: &str) -> bool {
    let Some(path) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path).any(|dir| is_executable(&dir.join(name)))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPECTED_KEYS: [&str; 11] = [
        "background_worker",
        "bytecode_runtime",
        "camera",
        "geolocation",
        "graphics",
        "media_capture",
        "microphone",
        "notifications",
        "persistent_storage",
        "session_storage",
        "structured_db",
    ];

    #[test]
    fn every_key_is_present_with_a_bool() {
        let capabilities = detect_capabilities(&ProbePaths::default());
        for key in EXPECTED_KEYS {
            assert!(capabilities.contains_key(key), "missing key {key}");
        }
        assert_eq!(capabilities.len(), EXPECTED_KEYS.len());
    }

    #[test]
    fn probes_survive_unreadable_roots() {
        let paths = ProbePaths {
            state_dir: PathBuf::from("/proc/no-such-dir/sonda"),
            session_dir: PathBuf::from("/proc/no-such-dir/session"),
            dev_dir: PathBuf::from("/no-such-dev"),
        };
        let capabilities = detect_capabilities(&paths);
        assert_eq!(capabilities["persistent_storage"], false);
        assert_eq!(capabilities["session_storage"], false);
        assert_eq!(capabilities["camera"], false);
        assert_eq!(capabilities["media_capture"], false);
        assert_eq!(capabilities["microphone"], false);
        assert_eq!(capabilities.len(), EXPECTED_KEYS.len());
    }

    #[test]
    fn storage_probe_leaves_no_key_behind() {
        let scratch = tempfile::tempdir().unwrap();
        assert!(check_storage(scratch.path()));
        let leftovers = fs::read_dir(scratch.path()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn device_probes_see_a_fabricated_tree() {
        let scratch = tempfile::tempdir().unwrap();
        let dev = scratch.path().to_path_buf();
        fs::write(dev.join("video0"), b"").unwrap();
        fs::create_dir(dev.join("snd")).unwrap();
        fs::write(dev.join("snd").join("pcmC0D0c"), b"").unwrap();

        assert!(check_camera(&dev));
        assert!(check_media_capture(&dev));
        assert!(check_microphone(&dev));
    }

    #[test]
    fn playback_only_sound_tree_has_no_microphone() {
        let scratch = tempfile::tempdir().unwrap();
        let dev = scratch.path().to_path_buf();
        fs::create_dir(dev.join("snd")).unwrap();
        fs::write(dev.join("snd").join("pcmC0D0p"), b"").unwrap();

        assert!(!check_microphone(&dev));
        assert!(check_media_capture(&dev));
    }

    #[test]
    fn worker_and_db_probes_pass_locally() {
        assert!(check_background_worker());
        assert!(check_structured_db());
    }
}
