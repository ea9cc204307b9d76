//! Tests for the process-wide default injector
//!
//! The ambient instance is shared by every test in this binary, so each test
//! uses its own keys and runs serially.

use std::sync::{Arc, Mutex};

use injector::{InjectError, Injector, Service, ambient};
use serial_test::serial;

#[test]
#[serial]
fn test_inner_returns_same_instance() {
    let first = ambient::inner() as *const Injector;
    let second = ambient::inner() as *const Injector;
    assert_eq!(first, second);
}

#[test]
#[serial]
fn test_concurrent_first_use_yields_one_instance() {
    let handles: Vec<_> = (0..8)
        .map(|_| std::thread::spawn(|| ambient::inner() as *const Injector as usize))
        .collect();
    let addrs: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(addrs.windows(2).all(|w| w[0] == w[1]));
}

#[test]
#[serial]
fn test_install_after_first_use_fails() {
    ambient::inner();
    assert_eq!(
        ambient::install(Injector::new()),
        Err(InjectError::AmbientAlreadyInitialized)
    );
}

#[test]
#[serial]
fn test_free_functions_share_state() {
    assert!(!ambient::has("ambient.db"));
    assert!(ambient::set("ambient.db", Service::new("conn1".to_string())).is_none());
    assert!(ambient::has("ambient.db"));

    let conn = ambient::get("ambient.db").unwrap();
    assert_eq!(conn.downcast_ref::<String>().map(String::as_str), Some("conn1"));
    assert!(ambient::inner().has("ambient.db"));
}

#[test]
#[serial]
fn test_free_function_joins() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    ambient::when(["ambient.a", "ambient.b"], move |values| {
        let ints: Vec<u32> = values.iter().map(|v| *v.downcast_ref::<u32>().unwrap()).collect();
        s.lock().unwrap().push(ints);
    });
    let capture = ambient::capture("ambient.b");

    let pending = ambient::list_unfulfilled().unwrap();
    assert!(pending.iter().any(|u| u.name == "ambient.a"));

    let mut rx = ambient::subscribe();
    ambient::set("ambient.a", Service::new(1u32));
    ambient::set("ambient.b", Service::new(2u32));
    assert_eq!(rx.try_recv().unwrap().name, "ambient.a");

    ambient::settle();
    assert_eq!(*seen.lock().unwrap(), vec![vec![1, 2]]);
    assert!(capture.is_satisfied());

    let mut injected = None;
    let fired = ambient::inject_with(
        ["ambient.a", "ambient.missing"],
        |values| injected = Some(values.len()),
        |_| true,
    );
    assert!(fired);
    assert_eq!(injected, Some(2));
    assert!(!ambient::inject("ambient.missing", |_| {}));
}
