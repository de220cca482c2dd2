#![allow(unsafe_code, clippy::undocumented_unsafe_blocks)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::ffi::{c_char, c_int, c_uint, c_void};
use std::path::Path;

use pkgbridge_abi::abi::DownloadProgressError;
use pkgbridge_abi::adapters::DownloadAdapter;
use pkgbridge_abi::callbacks::DownloadProgressCallbacks;
use pkgbridge_abi::ProgressThrottle;
use pkgbridge_engine::report::{DownloadError, DownloadProgressReport};

unsafe extern "C" fn count(
    _value: c_int,
    _url: *const c_char,
    _bps_avg: f64,
    _bps_current: f64,
    user_data: *mut c_void,
) -> bool {
    *user_data.cast::<u64>() += 1;
    true
}

unsafe extern "C" fn retry(
    _url: *const c_char,
    _error: DownloadProgressError,
    _description: *const c_char,
    _user_data: *mut c_void,
) -> c_uint {
    0
}

fn bench_throttle(c: &mut Criterion) {
    c.bench_function("throttle_check_0_to_100", |b| {
        b.iter(|| {
            let mut throttle = ProgressThrottle::default();
            for value in 0..=100 {
                black_box(throttle.check(black_box(value)));
            }
        });
    });
}

fn bench_progress_dispatch(c: &mut Criterion) {
    let mut forwarded: u64 = 0;
    let callbacks = DownloadProgressCallbacks {
        progress: Some(count),
        progress_data: (&raw mut forwarded).cast(),
        ..DownloadProgressCallbacks::default()
    };
    let adapter = DownloadAdapter::new();
    unsafe { adapter.binding.bind(&callbacks) };

    c.bench_function("download_progress_dispatch", |b| {
        b.iter(|| {
            adapter.start("https://download.example.org/oss", Path::new("/tmp/repomd.xml"));
            for value in 0..=100 {
                black_box(adapter.progress(value, "https://download.example.org/oss", 0.0, 0.0));
            }
        });
    });
    adapter.binding.clear();
}

fn bench_problem_dispatch(c: &mut Criterion) {
    let callbacks = DownloadProgressCallbacks {
        problem: Some(retry),
        ..DownloadProgressCallbacks::default()
    };
    let adapter = DownloadAdapter::new();
    unsafe { adapter.binding.bind(&callbacks) };

    c.bench_function("download_problem_dispatch", |b| {
        b.iter(|| {
            black_box(adapter.problem(
                "https://download.example.org/oss",
                DownloadError::Io,
                "Connection reset by peer",
            ))
        });
    });
    adapter.binding.clear();
}

criterion_group!(
    benches,
    bench_throttle,
    bench_progress_dispatch,
    bench_problem_dispatch,
);
criterion_main!(benches);
