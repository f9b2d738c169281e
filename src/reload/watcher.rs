//! Project source watcher for live reload.

use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::reload::hub::{ReloadEvent, ReloadHub};

/// Directory names never watched, wherever they appear.
const IGNORED_DIRS: &[&str] = &["node_modules", "target", ".git"];

/// Changes to the same path inside this window collapse into one reload.
const DEBOUNCE: Duration = Duration::from_millis(100);

/// Watches the project root and broadcasts a full reload on change.
pub struct SourceWatcher {
    root: PathBuf,
    ignored: Vec<PathBuf>,
    hub: ReloadHub,
}

impl SourceWatcher {
    /// `ignored` holds extra directories to skip (usually the build output).
    pub fn new(root: &Path, ignored: Vec<PathBuf>, hub: ReloadHub) -> Self {
        let root = absolute(root);
        let ignored = ignored
            .into_iter()
            .map(|dir| if dir.is_absolute() { dir } else { root.join(dir) })
            .map(|dir| absolute(&dir))
            .collect();
        Self { root, ignored, hub }
    }

    /// Start watching in notify's background thread. The watcher stops
    /// when the returned handle is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let root = self.root.clone();
        let mut last: Option<(PathBuf, Instant)> = None;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !(event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove()) {
                        return;
                    }
                    for path in &event.paths {
                        if self.should_ignore(path) {
                            continue;
                        }

                        let now = Instant::now();
                        if let Some((last_path, at)) = &last {
                            if last_path == path && now.duration_since(*at) < DEBOUNCE {
                                continue;
                            }
                        }
                        last = Some((path.clone(), now));

                        let relative = self.relative(path);
                        let receivers = self.hub.notify(ReloadEvent::FullReload {
                            path: relative.clone(),
                        });
                        tracing::info!(path = %relative, clients = receivers, "File changed, reloading");
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&root, RecursiveMode::Recursive)?;

        tracing::info!(path = ?root, "Source watcher started");
        Ok(watcher)
    }

    fn should_ignore(&self, path: &Path) -> bool {
        if self.ignored.iter().any(|dir| path.starts_with(dir)) {
            return true;
        }
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative.components().any(|c| match c {
            Component::Normal(name) => IGNORED_DIRS.iter().any(|dir| name == *dir),
            _ => false,
        })
    }

    /// Root-relative path with forward slashes.
    fn relative(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watcher(root: &Path) -> SourceWatcher {
        SourceWatcher::new(root, vec![PathBuf::from("dist")], ReloadHub::default())
    }

    #[test]
    fn test_ignores_dependency_and_output_dirs() {
        let temp = tempfile::TempDir::new().unwrap();
        let w = watcher(temp.path());
        let root = w.root.clone();

        assert!(w.should_ignore(&root.join("node_modules/react/index.js")));
        assert!(w.should_ignore(&root.join("target/debug/app")));
        assert!(w.should_ignore(&root.join("dist/server.js")));
        assert!(!w.should_ignore(&root.join("src/server.rs")));
        assert!(!w.should_ignore(&root.join("index.html")));
    }

    #[test]
    fn test_relative_path() {
        let temp = tempfile::TempDir::new().unwrap();
        let w = watcher(temp.path());
        let root = w.root.clone();

        assert_eq!(w.relative(&root.join("src").join("app.ts")), "src/app.ts");
    }
}
