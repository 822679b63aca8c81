//! Blocking Call Integration Tests
//!
//! Cross-thread behavior of `BlockingCall` against a live I/O thread.

mod common;

use common::*;
use host_bridge::host::{FixedProxyConfigService, ProxyConfig, RequestContext};
use host_bridge::sync::WaitPolicy;
use host_bridge::threading::ThreadAffine;
use host_bridge::{BlockingCall, BridgeError, HostThread, ScopedAllowWait, ThreadRegistry};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

#[test]
fn test_direct_policy_visible_on_io_after_call() {
    let registry = ThreadRegistry::start(&test_threads_config("bcc-scenario-io")).unwrap();
    let context = Arc::new(ThreadAffine::new(
        HostThread::Io,
        registry.checker(),
        RequestContext::default(),
    ));
    let permit = ScopedAllowWait::new();
    let call = BlockingCall::new(&registry);

    let install = context.clone();
    call.call(&permit, HostThread::Io, move || {
        install.with_mut(|ctx| {
            ctx.proxy_resolution_service_mut()
                .reset_config_service(Box::new(FixedProxyConfigService::new(ProxyConfig::Direct)));
        })
    })
    .unwrap();

    let read = context.clone();
    let observed = call
        .call(&permit, HostThread::Io, move || {
            read.with(|ctx| ctx.proxy_resolution_service().config())
        })
        .unwrap();
    assert_eq!(observed, ProxyConfig::Direct);

    // The calling thread never touches the I/O-owned state directly
    assert!(matches!(
        context.with(|ctx| ctx.proxy_resolution_service().config()),
        Err(BridgeError::WrongThread { .. })
    ));
}

#[test]
fn test_wait_returns_only_after_work_item_ran() {
    let registry = ThreadRegistry::start(&test_threads_config("bcc-order-io")).unwrap();
    let permit = ScopedAllowWait::new();
    let executed = Arc::new(AtomicBool::new(false));

    for _ in 0..50 {
        executed.store(false, Ordering::SeqCst);
        let flag = executed.clone();
        BlockingCall::new(&registry)
            .call(&permit, HostThread::Io, move || {
                std::thread::sleep(Duration::from_micros(200));
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
        assert!(executed.load(Ordering::SeqCst));
    }
}

#[test]
fn test_concurrent_calls_to_one_thread_are_totally_ordered() {
    let registry = ThreadRegistry::start(&test_threads_config("bcc-concurrent-io")).unwrap();
    let log = Arc::new(ThreadAffine::new(HostThread::Io, registry.checker(), Vec::<u32>::new()));
    let barrier = Arc::new(Barrier::new(2));

    let callers: Vec<_> = (1..=2u32)
        .map(|id| {
            let registry = registry.clone();
            let log = log.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                let permit = ScopedAllowWait::new();
                barrier.wait();
                BlockingCall::new(&registry)
                    .call(&permit, HostThread::Io, move || {
                        log.with_mut(|entries| {
                            entries.push(id);
                            entries.clone()
                        })
                    })
                    .unwrap()
            })
        })
        .collect();

    let mut snapshots: Vec<Vec<u32>> = callers.into_iter().map(|h| h.join().unwrap()).collect();
    snapshots.sort_by_key(Vec::len);

    // Each caller sees its own entry; the later one also sees the earlier one
    assert_eq!(snapshots[0].len(), 1);
    assert_eq!(snapshots[1].len(), 2);
    assert_eq!(snapshots[1][0], snapshots[0][0]);
    assert_ne!(snapshots[1][0], snapshots[1][1]);
}

#[test]
fn test_bounded_call_on_stalled_target_times_out_but_applies() {
    let registry = ThreadRegistry::start(&test_threads_config("bcc-stalled-io")).unwrap();
    let permit = ScopedAllowWait::new();
    let (release_tx, release_rx) = crossbeam::channel::bounded::<()>(1);

    // Stall the I/O thread
    registry
        .post_task(HostThread::Io, move || {
            let _ = release_rx.recv();
        })
        .unwrap();

    let applied = Arc::new(AtomicBool::new(false));
    let flag = applied.clone();
    let err = BlockingCall::with_policy(&registry, WaitPolicy::Bounded(Duration::from_millis(25)))
        .call(&permit, HostThread::Io, move || {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, BridgeError::Timeout { .. }));
    assert!(!applied.load(Ordering::SeqCst));

    release_tx.send(()).unwrap();

    // A follow-up call is queued behind the late item, so it observes its effect
    let observed = applied.clone();
    let seen = BlockingCall::new(&registry)
        .call(&permit, HostThread::Io, move || Ok(observed.load(Ordering::SeqCst)))
        .unwrap();
    assert!(seen);
}

#[test]
fn test_call_after_shutdown_is_target_unavailable() {
    let registry = ThreadRegistry::start(&test_threads_config("bcc-shutdown-io")).unwrap();
    registry.shutdown();

    let permit = ScopedAllowWait::new();
    let err = BlockingCall::new(&registry)
        .call(&permit, HostThread::Io, || Ok(()))
        .unwrap_err();
    assert!(matches!(err, BridgeError::TargetUnavailable { .. }));
}

#[test]
fn test_restricted_ui_thread_blocks_only_with_permit() {
    let registry = ThreadRegistry::start(&test_threads_config("bcc-permit-io")).unwrap();
    let _binding = registry.adopt_current_thread(HostThread::Ui).unwrap();
    assert!(!host_bridge::threading::restrictions::wait_allowed());

    let signal = host_bridge::CompletionSignal::one_shot();
    assert!(matches!(
        signal.wait_timeout(Duration::from_millis(1)),
        Err(BridgeError::WaitDisallowed { .. })
    ));

    let permit = ScopedAllowWait::new();
    let value = BlockingCall::new(&registry)
        .call(&permit, HostThread::Io, || Ok("from io"))
        .unwrap();
    assert_eq!(value, "from io");
    drop(permit);

    assert!(!host_bridge::threading::restrictions::wait_allowed());
}

#[test]
fn test_call_from_ui_into_ui_is_reentrant() {
    let registry = ThreadRegistry::start(&test_threads_config("bcc-reentrant-io")).unwrap();
    let _binding = registry.adopt_current_thread(HostThread::Ui).unwrap();
    let permit = ScopedAllowWait::new();

    let err = BlockingCall::new(&registry)
        .call(&permit, HostThread::Ui, || Ok(()))
        .unwrap_err();
    assert!(matches!(err, BridgeError::ReentrantCall { .. }));
    assert_eq!(registry.task_runner(HostThread::Ui).pending_tasks(), 0);
}

