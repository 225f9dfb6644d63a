use super::{PathFilter, TraceConfig};
use std::path::Path;

#[test]
fn profile_all_overrides_everything() {
    let filter = PathFilter::new(TraceConfig::new("/proj", vec![], true));
    assert!(filter.should_trace(Path::new("/usr/lib/python3.11/os.py")));
}

#[test]
fn builtin_stdlib_paths_are_excluded() {
    let filter = PathFilter::new(TraceConfig::new("/", vec![], false));
    assert!(!filter.should_trace(Path::new("/usr/lib/python3.11/os.py")));
    assert!(!filter.should_trace(Path::new("/usr/lib/python3.11/site-packages/numpy/core.py")));
}

#[test]
fn user_substring_matches_even_outside_base() {
    let filter = PathFilter::new(TraceConfig::new("/proj", vec!["/vendor/mylib".to_string()], false));
    assert!(filter.should_trace(Path::new("/opt/vendor/mylib/thing.py")));
}

#[test]
fn base_path_containment_decides_remaining_cases() {
    let filter = PathFilter::new(TraceConfig::new("/proj", vec![], false));
    assert!(filter.should_trace(Path::new("/proj/a.py")));
    assert!(!filter.should_trace(Path::new("/elsewhere/a.py")));
}

#[test]
fn lookups_are_memoized() {
    let filter = PathFilter::new(TraceConfig::new("/proj", vec![], false));
    assert!(filter.should_trace(Path::new("/proj/a.py")));
    // second call must hit the memo table and return the same answer
    assert!(filter.should_trace(Path::new("/proj/a.py")));
}

#[test]
fn reregistration_clears_memoization() {
    let filter = PathFilter::new(TraceConfig::new("/proj", vec![], false));
    assert!(!filter.should_trace(Path::new("/other/a.py")));

    filter.register(TraceConfig::new("/other", vec![], false));
    assert!(filter.should_trace(Path::new("/other/a.py")), "stale memo entry must not survive re-registration");
}
