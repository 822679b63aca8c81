//! Bridge Performance Benchmarks
//!
//! Round-trip cost of the blocking call and the callback adapter compared to
//! plain task posting, plus proxy rules parsing.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use host_bridge::config::ThreadsConfig;
use host_bridge::host::{
    BrowsingDataService, BrowsingDataStore, DataTypeMask, OriginTypeMask, ProxyRules,
    RemovalRequest, TimeRange,
};
use host_bridge::{BlockingCall, CallbackAdapter, HostThread, ScopedAllowWait, ThreadRegistry};

fn benchmark_blocking_call(c: &mut Criterion) {
    let registry = ThreadRegistry::start(&ThreadsConfig::default()).unwrap();
    let permit = ScopedAllowWait::new();
    let call = BlockingCall::new(&registry);

    c.bench_function("blocking_call_round_trip", |b| {
        b.iter(|| call.call(&permit, HostThread::Io, || Ok(black_box(42u64))).unwrap());
    });

    let mut group = c.benchmark_group("blocking_call_batch");
    for batch in [1usize, 10, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(batch), &batch, |b, &batch| {
            b.iter(|| {
                for i in 0..batch {
                    call.call(&permit, HostThread::Io, move || Ok(i)).unwrap();
                }
            });
        });
    }
    group.finish();

    c.bench_function("post_task_and_channel_reply", |b| {
        b.iter(|| {
            let (tx, rx) = crossbeam::channel::bounded(1);
            registry
                .post_task(HostThread::Io, move || {
                    let _ = tx.send(black_box(42u64));
                })
                .unwrap();
            rx.recv().unwrap()
        });
    });

    registry.shutdown();
}

fn benchmark_callback_adapter(c: &mut Criterion) {
    let registry = ThreadRegistry::start(&ThreadsConfig::default()).unwrap();
    let _binding = registry.adopt_current_thread(HostThread::Ui).unwrap();
    let service = BrowsingDataService::new(registry.clone(), BrowsingDataStore::new());
    let adapter = CallbackAdapter::new(&registry);
    let request = RemovalRequest {
        data_types: DataTypeMask::CACHE,
        origin_types: OriginTypeMask::UNPROTECTED_WEB,
        range: TimeRange::all_time(),
    };

    c.bench_function("callback_adapter_clear_cache", |b| {
        b.iter(|| adapter.call_sync(service.remover(), request).unwrap());
    });
}

fn benchmark_proxy_rules(c: &mut Criterion) {
    let rules = "http=proxy1:8080,proxy2:8080;https=socks5://secure:1080;socks=fallback";

    c.bench_function("proxy_rules_parse", |b| {
        b.iter(|| ProxyRules::parse_from_string(black_box(rules)).unwrap());
    });
}

criterion_group!(
    benches,
    benchmark_blocking_call,
    benchmark_callback_adapter,
    benchmark_proxy_rules
);
criterion_main!(benches);
