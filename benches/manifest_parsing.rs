//! Benchmarks for manifest parsing and requirement resolution.

use std::fs;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use depsize::manifest;

const MINIMAL_MANIFEST: &str = "module example.com/app\n\ngo 1.21\n";

const TYPICAL_MANIFEST: &str = r#"
module github.com/example/service

go 1.21

toolchain go1.21.5

require (
	github.com/gorilla/mux v1.8.1
	github.com/lib/pq v1.10.9
	github.com/sirupsen/logrus v1.9.3
	golang.org/x/net v0.17.0 // indirect
	golang.org/x/sys v0.13.0 // indirect
	gopkg.in/yaml.v3 v3.0.1
)

replace (
	github.com/lib/pq => github.com/example/pq v1.10.10
	github.com/example/internal => ./internal
)

exclude golang.org/x/net v0.16.0
"#;

/// Generate a manifest with `count` requirements and every tenth one replaced.
fn generate_manifest(count: usize) -> String {
    let mut content = String::from("module example.com/large\n\ngo 1.21\n\nrequire (\n");
    for i in 0..count {
        content.push_str(&format!("\texample.com/dep{} v1.{}.0\n", i, i % 20));
    }
    content.push_str(")\n\nreplace (\n");
    for i in (0..count).step_by(10) {
        content.push_str(&format!(
            "\texample.com/dep{} => example.com/fork{} v2.0.0\n",
            i, i
        ));
    }
    content.push_str(")\n");
    content
}

fn bench_manifest_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("manifest_parsing");

    group.bench_function("minimal", |b| {
        b.iter(|| manifest::parse(black_box(MINIMAL_MANIFEST)))
    });

    group.bench_function("typical", |b| {
        b.iter(|| manifest::parse(black_box(TYPICAL_MANIFEST)))
    });

    for count in [10, 100, 1000] {
        let content = generate_manifest(count);
        group.bench_with_input(BenchmarkId::new("requires", count), &content, |b, content| {
            b.iter(|| manifest::parse(black_box(content)))
        });
    }

    group.finish();
}

fn bench_requirement_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("requirement_resolution");
    let temp = tempfile::TempDir::new().unwrap();

    let internal = temp.path().join("internal");
    fs::create_dir_all(&internal).unwrap();
    fs::write(
        internal.join("go.mod"),
        "module github.com/example/internal\n\nrequire example.com/nested v0.1.0\n",
    )
    .unwrap();

    let typical = manifest::parse(TYPICAL_MANIFEST).unwrap();
    group.bench_function("typical_with_local_replace", |b| {
        b.iter(|| manifest::resolve_requirements(black_box(&typical), temp.path()))
    });

    for count in [100, 1000] {
        let large = manifest::parse(&generate_manifest(count)).unwrap();
        group.bench_with_input(BenchmarkId::new("requires", count), &large, |b, large| {
            b.iter(|| manifest::resolve_requirements(black_box(large), temp.path()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_manifest_parsing, bench_requirement_resolution);
criterion_main!(benches);
