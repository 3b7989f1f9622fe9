use criterion::{black_box, criterion_group, criterion_main, Criterion};
use forgekit_semver::{sort_descending, Requirement, Version};

fn bench_parse(c: &mut Criterion) {
    let versions = [
        "1.2.3",
        "1.0.0-rc1",
        "1.0.0.rc1",
        "2.7.13",
        "10.20.30",
        "0.0.1",
        "bogus",
    ];

    c.bench_function("parse_versions", |b| {
        b.iter(|| {
            for version in versions {
                black_box(Version::parse(black_box(version)).ok());
            }
        })
    });
}

fn bench_sort(c: &mut Criterion) {
    let versions: Vec<String> = (0..200)
        .map(|i| format!("{}.{}.{}", i % 7, i % 13, i))
        .collect();

    c.bench_function("sort_descending_200", |b| {
        b.iter(|| black_box(sort_descending(black_box(&versions))))
    });
}

fn bench_requirement(c: &mut Criterion) {
    let requirement = Requirement::parse(">= 1.0.0 < 3.0.0").unwrap();
    let candidates: Vec<Version> = ["0.9.0", "1.0.0", "2.5.1", "3.0.0"]
        .iter()
        .map(|v| Version::parse(v).unwrap())
        .collect();

    c.bench_function("requirement_matches", |b| {
        b.iter(|| {
            for candidate in &candidates {
                black_box(requirement.matches(black_box(candidate)));
            }
        })
    });
}

criterion_group!(benches, bench_parse, bench_sort, bench_requirement);
criterion_main!(benches);
