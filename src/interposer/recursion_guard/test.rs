use super::RecursionGuard;

#[test]
fn top_level_guard_is_not_in_allocator() {
    let guard = RecursionGuard::enter();
    assert!(!guard.was_in_allocator());
}

#[test]
fn nested_guard_reports_reentrancy() {
    let _outer = RecursionGuard::enter();
    let inner = RecursionGuard::enter();
    assert!(inner.was_in_allocator());
}

#[test]
fn guard_clears_on_drop() {
    {
        let _g = RecursionGuard::enter();
        let nested = RecursionGuard::enter();
        assert!(nested.was_in_allocator());
    }
    let g = RecursionGuard::enter();
    assert!(!g.was_in_allocator(), "flag must be cleared after the outer guard dropped");
}

#[test]
fn s6_reentrancy_is_thread_local() {
    let _guard = RecursionGuard::enter();
    let handle = std::thread::spawn(|| {
        let g = RecursionGuard::enter();
        g.was_in_allocator()
    });
    assert!(!handle.join().unwrap(), "a fresh thread must not inherit another thread's flag");
}
