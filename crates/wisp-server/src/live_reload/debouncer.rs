//! Event debouncing for live reload.
//!
//! Collapses the burst of filesystem events an editor emits per save into a
//! single reload trigger, using a leading-edge policy: the first qualifying
//! event fires immediately and everything else inside the window is dropped.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A raw filesystem change as seen by the watch callback.
#[derive(Clone, Debug)]
pub(crate) struct ChangeEvent {
    pub path: PathBuf,
    pub is_directory: bool,
    pub timestamp: Instant,
}

impl ChangeEvent {
    /// Build an event for `path`, capturing directory status and the current
    /// time. Called once per path in the watch callback.
    pub(crate) fn capture(path: PathBuf) -> Self {
        let is_directory = path.is_dir();
        Self {
            path,
            is_directory,
            timestamp: Instant::now(),
        }
    }
}

/// Thread-safe leading-edge debouncer.
///
/// One instance gates the whole watched root: a qualifying event fires iff
/// more than `window` has passed since the previous fire. A flurry of saves
/// therefore reloads on the *first* event of the flurry; a save landing
/// inside the window after a fire is dropped, not deferred.
pub(crate) struct ReloadDebouncer {
    last_fire: Mutex<Option<Instant>>,
    window: Duration,
    extensions: Vec<String>,
}

impl ReloadDebouncer {
    /// Create a debouncer with the given window and watched extensions.
    ///
    /// Extensions are matched ASCII case-insensitively and must not carry a
    /// leading dot (config normalization guarantees this).
    pub(crate) fn new(window: Duration, extensions: Vec<String>) -> Self {
        Self {
            last_fire: Mutex::new(None),
            window,
            extensions,
        }
    }

    /// Record an event and decide whether to fire a reload.
    ///
    /// Thread-safe, called from the notify callback. Directory events and
    /// paths outside the watched extension set never touch debounce state, so
    /// a filtered event cannot consume the leading edge.
    pub(crate) fn observe(&self, event: &ChangeEvent) -> bool {
        if !self.is_watched(event) {
            return false;
        }

        let mut last_fire = self.last_fire.lock().unwrap();
        match *last_fire {
            Some(prev) if event.timestamp.duration_since(prev) <= self.window => false,
            _ => {
                *last_fire = Some(event.timestamp);
                true
            }
        }
    }

    /// Whether an event qualifies for debounce evaluation.
    fn is_watched(&self, event: &ChangeEvent) -> bool {
        !event.is_directory && has_watched_extension(&event.path, &self.extensions)
    }
}

/// Whether `path` has one of `extensions` (ASCII case-insensitive).
///
/// Paths without an extension, or with a non-UTF-8 one, are non-matching.
fn has_watched_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|w| w.eq_ignore_ascii_case(ext)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debouncer(window_ms: u64) -> ReloadDebouncer {
        ReloadDebouncer::new(
            Duration::from_millis(window_ms),
            vec![
                "html".to_owned(),
                "js".to_owned(),
                "json".to_owned(),
                "css".to_owned(),
            ],
        )
    }

    fn file_event(path: &str, at: Instant) -> ChangeEvent {
        ChangeEvent {
            path: PathBuf::from(path),
            is_directory: false,
            timestamp: at,
        }
    }

    #[test]
    fn test_first_event_fires() {
        let debouncer = debouncer(300);
        let event = file_event("/site/index.html", Instant::now());

        assert!(debouncer.observe(&event));
    }

    #[test]
    fn test_burst_fires_on_leading_edge_only() {
        let debouncer = debouncer(300);
        let base = Instant::now();

        // Events at t=0, t=0.05, t=0.1, t=0.35 with a 300ms window:
        // exactly the first and the last fire.
        assert!(debouncer.observe(&file_event("/site/app.js", base)));
        assert!(!debouncer.observe(&file_event(
            "/site/app.js",
            base + Duration::from_millis(50)
        )));
        assert!(!debouncer.observe(&file_event(
            "/site/app.js",
            base + Duration::from_millis(100)
        )));
        assert!(debouncer.observe(&file_event(
            "/site/app.js",
            base + Duration::from_millis(350)
        )));
    }

    #[test]
    fn test_suppressed_event_does_not_extend_window() {
        let debouncer = debouncer(300);
        let base = Instant::now();

        assert!(debouncer.observe(&file_event("/site/a.css", base)));
        // Suppressed; the window still counts from `base`.
        assert!(!debouncer.observe(&file_event(
            "/site/a.css",
            base + Duration::from_millis(290)
        )));
        assert!(debouncer.observe(&file_event(
            "/site/a.css",
            base + Duration::from_millis(301)
        )));
    }

    #[test]
    fn test_extension_filter() {
        let debouncer = debouncer(300);
        let base = Instant::now();

        // A .tmp file never reaches the debounce check...
        assert!(!debouncer.observe(&file_event("/site/data.tmp", base)));
        // ...so it does not consume the leading edge for a real change.
        assert!(debouncer.observe(&file_event(
            "/site/style.css",
            base + Duration::from_millis(10)
        )));
    }

    #[test]
    fn test_extension_matching_is_case_insensitive() {
        let debouncer = debouncer(300);

        assert!(debouncer.observe(&file_event("/site/INDEX.HTML", Instant::now())));
    }

    #[test]
    fn test_no_extension_is_ignored() {
        let debouncer = debouncer(300);

        assert!(!debouncer.observe(&file_event("/site/Makefile", Instant::now())));
    }

    #[test]
    fn test_directory_events_ignored() {
        let debouncer = debouncer(300);
        let base = Instant::now();

        let dir_event = ChangeEvent {
            path: PathBuf::from("/site/assets.css"),
            is_directory: true,
            timestamp: base,
        };
        assert!(!debouncer.observe(&dir_event));

        // Directory events leave debounce state untouched.
        assert!(debouncer.observe(&file_event(
            "/site/assets.css",
            base + Duration::from_millis(10)
        )));
    }

    #[test]
    fn test_has_watched_extension() {
        let exts = vec!["html".to_owned(), "css".to_owned()];

        assert!(has_watched_extension(Path::new("a/b/page.html"), &exts));
        assert!(has_watched_extension(Path::new("style.CSS"), &exts));
        assert!(!has_watched_extension(Path::new("notes.md"), &exts));
        assert!(!has_watched_extension(Path::new("html"), &exts));
    }
}
