use super::{register_files_to_profile, DoneFlag, HostBindings, NullHostBindings};
use crate::attribution::{AttributionHook, AttributionSlot};
use crate::pathfilter::PathFilter;

unsafe extern "C" fn stub_attribution(slot: *mut AttributionSlot) -> bool {
    unsafe {
        (*slot).line = 1;
    }
    false
}

#[test]
fn done_flag_starts_clear() {
    let flag = DoneFlag::new();
    assert!(!flag.is_done());
    flag.set(true);
    assert!(flag.is_done());
    flag.set(false);
    assert!(!flag.is_done());
}

#[test]
fn null_host_bindings_accept_every_call() {
    let host = NullHostBindings;
    host.set_last_profiled_invalidated(true);
    host.populate_struct();
    host.depopulate_struct();
    host.enable_settrace();
    host.disable_settrace();
}

#[test]
fn register_files_to_profile_installs_both_filter_and_hook() {
    let filter = PathFilter::default();
    let hook = AttributionHook::new();
    assert!(!hook.is_installed());

    register_files_to_profile(&filter, &hook, stub_attribution, vec![], "/proj", false);

    assert!(hook.is_installed());
    assert!(filter.should_trace(std::path::Path::new("/proj/a.py")));
}
