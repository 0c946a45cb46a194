//! Benchmarks for probe output parsing and compatibility analysis
//!
//! Tests ffprobe JSON deserialization and the per-merge decision work.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mergeforged_av::compat::{check_compatibility, difference_summary, TargetParams};
use mergeforged_av::probe::{parse_ffprobe_json, StreamProfile};
use mergeforged_av::StandardizeSettings;
use std::path::Path;

/// ffprobe output for a typical single-audio file
const FFPROBE_SIMPLE: &str = r#"{
    "streams": [
        {
            "index": 0,
            "codec_type": "video",
            "codec_name": "h264",
            "width": 1920,
            "height": 1080,
            "r_frame_rate": "30000/1001",
            "pix_fmt": "yuv420p",
            "bit_rate": "4500000"
        },
        {
            "index": 1,
            "codec_type": "audio",
            "codec_name": "aac",
            "sample_rate": "48000",
            "channels": 2
        }
    ],
    "format": {
        "filename": "/merges/part1.mkv",
        "format_name": "matroska,webm",
        "duration": "1320.480000",
        "size": "734003200",
        "bit_rate": "4446000"
    }
}"#;

/// ffprobe output for a file with several audio and subtitle streams
const FFPROBE_COMPLEX: &str = r#"{
    "streams": [
        {"index": 0, "codec_type": "video", "codec_name": "hevc", "width": 3840, "height": 2160,
         "r_frame_rate": "24000/1001", "pix_fmt": "yuv420p10le"},
        {"index": 1, "codec_type": "audio", "codec_name": "eac3", "sample_rate": "48000", "channels": 6},
        {"index": 2, "codec_type": "audio", "codec_name": "aac", "sample_rate": "48000", "channels": 2},
        {"index": 3, "codec_type": "audio", "codec_name": "ac3", "sample_rate": "48000", "channels": 6},
        {"index": 4, "codec_type": "subtitle", "codec_name": "subrip"},
        {"index": 5, "codec_type": "subtitle", "codec_name": "subrip"},
        {"index": 6, "codec_type": "subtitle", "codec_name": "hdmv_pgs_subtitle"},
        {"index": 7, "codec_type": "attachment", "codec_name": "ttf"}
    ],
    "format": {
        "filename": "/merges/episode.mkv",
        "format_name": "matroska,webm",
        "duration": "3540.000000",
        "bit_rate": "18000000"
    }
}"#;

fn profiles(count: usize, vary_every: usize) -> Vec<StreamProfile> {
    let base = parse_ffprobe_json(Path::new("/merges/part.mkv"), FFPROBE_SIMPLE).unwrap();
    (0..count)
        .map(|i| {
            let mut p = base.clone();
            if vary_every > 0 && i % vary_every == vary_every - 1 {
                p.width = 1280;
                p.height = 720;
            }
            p
        })
        .collect()
}

fn bench_ffprobe_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("ffprobe_parsing");

    group.throughput(Throughput::Bytes(FFPROBE_SIMPLE.len() as u64));
    group.bench_with_input(
        BenchmarkId::new("parse", "simple"),
        &FFPROBE_SIMPLE,
        |b, json| b.iter(|| parse_ffprobe_json(Path::new("/merges/part1.mkv"), black_box(json))),
    );

    group.throughput(Throughput::Bytes(FFPROBE_COMPLEX.len() as u64));
    group.bench_with_input(
        BenchmarkId::new("parse", "complex"),
        &FFPROBE_COMPLEX,
        |b, json| b.iter(|| parse_ffprobe_json(Path::new("/merges/episode.mkv"), black_box(json))),
    );

    group.finish();
}

fn bench_compatibility(c: &mut Criterion) {
    let mut group = c.benchmark_group("compatibility");
    let settings = StandardizeSettings::default();

    for count in [2usize, 10, 50] {
        let identical = profiles(count, 0);
        group.bench_with_input(
            BenchmarkId::new("check/identical", count),
            &identical,
            |b, p| b.iter(|| check_compatibility(black_box(p))),
        );

        let mixed = profiles(count, 2);
        group.bench_with_input(BenchmarkId::new("check/mixed", count), &mixed, |b, p| {
            b.iter(|| check_compatibility(black_box(p)))
        });
        group.bench_with_input(BenchmarkId::new("summary/mixed", count), &mixed, |b, p| {
            b.iter(|| difference_summary(black_box(p)))
        });
        group.bench_with_input(BenchmarkId::new("target/mixed", count), &mixed, |b, p| {
            b.iter(|| TargetParams::from_profiles(black_box(p), &settings))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_ffprobe_parsing, bench_compatibility);
criterion_main!(benches);
