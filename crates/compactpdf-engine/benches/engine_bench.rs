// CompactPDF - Adaptive PDF Compression Engine
// Copyright (C) 2025 CompactPDF Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
#![allow(clippy::unwrap_used)]
//! Engine performance benchmarks
//!
//! Benchmarks:
//! - Content analysis over documents of increasing size
//! - Fingerprint computation
//! - Cache lookups on a warm cache
//! - Full selection on a cold and a warm cache

use bytes::Bytes;
use compactpdf_config::{CompressionConfig, Config};
use compactpdf_engine::{CompressionEngine, CompressionResult, ContentAnalyzer, Fingerprint, FingerprintCache};
use compactpdf_test_utils::{MarkerScorer, PdfBuilder, StubStrategy};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

fn document(images: usize, image_len: usize) -> Bytes {
    (0..images)
        .fold(PdfBuilder::new().pages(4).fonts(3), |builder, i| {
            builder.noisy_image(image_len, i as u8)
        })
        .bytes()
}

fn bench_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze");
    let analyzer = ContentAnalyzer::new();

    for images in [1, 8, 64] {
        let data = document(images, 16 * 1024);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(images), &data, |b, data| {
            b.iter(|| black_box(analyzer.analyze(black_box(data)).unwrap()));
        });
    }
    group.finish();
}

fn bench_fingerprint(c: &mut Criterion) {
    let mut group = c.benchmark_group("fingerprint");
    let config = CompressionConfig::default();

    for size_kb in [16, 256, 4096] {
        let data = vec![0x5Au8; size_kb * 1024];
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size_kb), &data, |b, data| {
            b.iter(|| black_box(Fingerprint::compute(black_box(data), &config)));
        });
    }
    group.finish();
}

fn bench_cache_lookup(c: &mut Criterion) {
    let cache = FingerprintCache::new(1024);
    let config = CompressionConfig::default();
    let fingerprints: Vec<_> = (0..1024u32)
        .map(|i| {
            let data = i.to_le_bytes();
            let fingerprint = Fingerprint::compute(&data, &config);
            let result = CompressionResult::pass_through(Bytes::copy_from_slice(&data), Duration::ZERO);
            cache.put(fingerprint, result, Duration::from_secs(3600));
            fingerprint
        })
        .collect();

    c.bench_function("cache_hit", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % fingerprints.len();
            black_box(cache.get(&fingerprints[i]))
        });
    });
}

fn bench_select(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let data = document(4, 16 * 1024);
    let config = CompressionConfig::default().with_quality_threshold(0.8);

    let build_engine = || {
        CompressionEngine::builder(Config::default())
            .scorer(Arc::new(MarkerScorer::new().with(b'A', 0.5).with(b'B', 0.95)))
            .strategy(StubStrategy::marker("reject", b'A', 1024, 0.6).handle())
            .strategy(StubStrategy::marker("accept", b'B', 2048, 0.3).handle())
            .build()
            .unwrap()
    };

    let mut group = c.benchmark_group("select");

    let uncached = config.clone().with_cache(false);
    let engine = build_engine();
    group.bench_function("cold", |b| {
        b.to_async(&runtime)
            .iter(|| async { black_box(engine.select(data.clone(), &uncached).await.unwrap()) });
    });

    let engine = build_engine();
    runtime.block_on(engine.select(data.clone(), &config)).unwrap();
    group.bench_function("warm", |b| {
        b.to_async(&runtime)
            .iter(|| async { black_box(engine.select(data.clone(), &config).await.unwrap()) });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_analyze,
    bench_fingerprint,
    bench_cache_lookup,
    bench_select
);
criterion_main!(benches);
