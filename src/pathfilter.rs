//! Path Filter / Trace Config: decides whether a host source
//! path is in scope for attribution, with memoized lookups and wholesale
//! swap-on-reregistration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Paths under these substrings are assumed to be the host language's own
/// standard library or this profiler's own instrumentation, and are never
/// traced even if they'd otherwise match a user substring or the base path.
#[cfg(unix)]
const BUILTIN_EXCLUDE: &[&str] = &["/lib/python", "/lib64/python", "/site-packages/", "/scalene/"];
#[cfg(windows)]
const BUILTIN_EXCLUDE: &[&str] = &["\\Lib\\", "\\site-packages\\", "\\scalene\\"];
#[cfg(not(any(unix, windows)))]
const BUILTIN_EXCLUDE: &[&str] = &[];

/// The immutable configuration installed by `register_files_to_profile`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceConfig {
    pub base_path: PathBuf,
    pub user_substrings: Vec<String>,
    pub profile_all: bool,
}

impl TraceConfig {
    pub fn new(base_path: impl Into<PathBuf>, user_substrings: Vec<String>, profile_all: bool) -> Self {
        Self {
            base_path: base_path.into(),
            user_substrings,
            profile_all,
        }
    }

    fn matches(&self, path: &str) -> bool {
        if self.profile_all {
            return true;
        }
        if BUILTIN_EXCLUDE.iter().any(|needle| path.contains(needle)) {
            return false;
        }
        if self.user_substrings.iter().any(|needle| path.contains(needle.as_str())) {
            return true;
        }
        Path::new(path).starts_with(&self.base_path)
    }
}

struct Inner {
    config: Arc<TraceConfig>,
    memo: HashMap<PathBuf, bool>,
}

/// Swappable, memoized path filter. The active [`TraceConfig`] is replaced
/// wholesale on re-registration; in-flight lookups always observe either the
/// old or the new configuration in full, never a partial mix.
pub struct PathFilter {
    inner: Mutex<Inner>,
}

impl PathFilter {
    pub fn new(config: TraceConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                config: Arc::new(config),
                memo: HashMap::new(),
            }),
        }
    }

    /// Installs a new configuration, discarding the memoization table built
    /// against the old one.
    pub fn register(&self, config: TraceConfig) {
        let mut inner = self.inner.lock().unwrap();
        inner.config = Arc::new(config);
        inner.memo.clear();
    }

    pub fn current(&self) -> Arc<TraceConfig> {
        self.inner.lock().unwrap().config.clone()
    }

    /// Rules, in order: "profile all" short-circuits true; a builtin
    /// exclusion (host stdlib / this profiler's own code) short-circuits
    /// false; a user substring match is true; otherwise the path is in scope
    /// iff it resolves under the registered base path.
    pub fn should_trace(&self, path: &Path) -> bool {
        let key = path.to_path_buf();
        let mut inner = self.inner.lock().unwrap();
        if let Some(&cached) = inner.memo.get(&key) {
            return cached;
        }
        let path_str = path.to_string_lossy();
        let result = inner.config.matches(&path_str);
        inner.memo.insert(key, result);
        result
    }
}

impl Default for PathFilter {
    fn default() -> Self {
        Self::new(TraceConfig::new(PathBuf::new(), Vec::new(), false))
    }
}

#[cfg(test)]
mod test;
