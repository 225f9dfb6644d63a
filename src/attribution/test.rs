use super::{AttributionHook, AttributionSlot};
use std::ffi::CString;
use std::sync::OnceLock;

unsafe extern "C" fn found_proj_a(slot: *mut AttributionSlot) -> bool {
    static PATH: OnceLock<CString> = OnceLock::new();
    let path = PATH.get_or_init(|| CString::new("/proj/a.py").unwrap());
    unsafe {
        (*slot).file = path.as_ptr();
        (*slot).line = 17;
        (*slot).bytei = 3;
    }
    true
}

unsafe extern "C" fn never_found(_slot: *mut AttributionSlot) -> bool {
    false
}

#[test]
fn null_hook_yields_no_attribution() {
    let hook = AttributionHook::new();
    assert!(!hook.is_installed());
    assert!(hook.call().is_none());
}

#[test]
fn installed_hook_resolves_attribution() {
    let hook = AttributionHook::new();
    hook.install(found_proj_a);
    assert!(hook.is_installed());

    let attribution = hook.call().expect("hook should resolve a frame");
    assert_eq!(attribution.file, "/proj/a.py");
    assert_eq!(attribution.line, 17);
    assert_eq!(attribution.bytei, 3);
}

#[test]
fn hook_returning_false_yields_no_attribution() {
    let hook = AttributionHook::new();
    hook.install(never_found);
    assert!(hook.call().is_none());
}

#[test]
fn uninstall_reverts_to_no_attribution() {
    let hook = AttributionHook::new();
    hook.install(found_proj_a);
    assert!(hook.call().is_some());
    hook.uninstall();
    assert!(!hook.is_installed());
    assert!(hook.call().is_none());
}
