use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use crate::error::WatcherError;

/// File suffixes that trigger a reload when touched in the watched directory.
const SHADER_EXTENSIONS: [&str; 2] = ["glsl", "frag"];

/// Watches the shader's parent directory and raises a single reload flag.
///
/// The flag is a boolean, not a queue: editors emit bursts of events per save
/// (modify, rename, create for atomic saves) and all of them coalesce into
/// one reload serviced at the top of the next frame. The notify backend runs
/// its own thread; nothing besides the flag crosses the thread boundary.
pub struct HotReloadWatcher {
    _watcher: RecommendedWatcher,
    flag: Arc<AtomicBool>,
    watched_dir: PathBuf,
}

impl HotReloadWatcher {
    pub fn spawn(shader_path: &Path) -> Result<Self, WatcherError> {
        let watched_dir = shader_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let flag = Arc::new(AtomicBool::new(false));
        let callback_flag = flag.clone();
        let mut watcher =
            notify::recommended_watcher(move |result: Result<notify::Event, notify::Error>| {
                match result {
                    Ok(event) => {
                        // Atomic saves surface as rename/create rather than
                        // modify, so accept all mutating kinds and filter by
                        // extension instead.
                        let mutating = matches!(
                            event.kind,
                            EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                        );
                        if mutating && event.paths.iter().any(|path| is_shader_source(path)) {
                            callback_flag.store(true, Ordering::Release);
                        }
                    }
                    Err(err) => warn!(error = %err, "filesystem watcher error"),
                }
            })
            .map_err(WatcherError::Create)?;

        watcher
            .watch(&watched_dir, RecursiveMode::NonRecursive)
            .map_err(|source| WatcherError::Watch {
                path: watched_dir.clone(),
                source,
            })?;

        let watcher = Self {
            _watcher: watcher,
            flag,
            watched_dir,
        };
        debug!(dir = %watcher.watched_dir().display(), "watching for shader changes");
        Ok(watcher)
    }

    /// Checks and clears the reload flag. Called once per frame.
    pub fn take_reload_request(&self) -> bool {
        self.flag.swap(false, Ordering::AcqRel)
    }

    pub fn watched_dir(&self) -> &Path {
        &self.watched_dir
    }
}

fn is_shader_source(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SHADER_EXTENSIONS.contains(&ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, Instant};

    #[test]
    fn recognizes_shader_extensions() {
        assert!(is_shader_source(Path::new("demo.glsl")));
        assert!(is_shader_source(Path::new("dir/effect.frag")));
        assert!(!is_shader_source(Path::new("notes.txt")));
        assert!(!is_shader_source(Path::new("glsl")));
    }

    #[test]
    fn modify_event_sets_the_flag() {
        let dir = tempfile::tempdir().expect("tempdir");
        let shader = dir.path().join("demo.glsl");
        fs::write(&shader, "void mainImage(out vec4 c, in vec2 p) {}").expect("seed file");

        let watcher = HotReloadWatcher::spawn(&shader).expect("watcher");
        assert!(!watcher.take_reload_request());

        fs::write(&shader, "void mainImage(out vec4 c, in vec2 p) { c = vec4(1.0); }")
            .expect("edit file");

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut fired = false;
        while Instant::now() < deadline {
            if watcher.take_reload_request() {
                fired = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(25));
        }
        assert!(fired, "watcher never observed the edit");
        // Coalesced: the flag is clear again until the next event.
        assert!(!watcher.take_reload_request());

        // A sibling file with a non-shader extension must not raise it.
        fs::write(dir.path().join("notes.txt"), "scratch").expect("write sibling");
        std::thread::sleep(Duration::from_millis(500));
        assert!(!watcher.take_reload_request());
    }
}
