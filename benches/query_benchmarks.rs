//! Benchmarks for extraction and query evaluation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use spaql::{parse_and_extract, QueryEngine};

/// A program with loops, branches, and a call chain, large enough to make
/// the joins non-trivial.
fn sample_source() -> String {
    let mut source = String::from("procedure main {\n");
    for i in 0..50 {
        source.push_str(&format!("    v{i} = v{prev} + {i};\n", prev = i.max(1) - 1));
    }
    source.push_str(
        r#"
        while (v0 > 0) {
            if (v1 == 1) then {
                v2 = v3 + v4;
            } else {
                call helper;
            }
            v0 = v0 - 1;
        }
    }
    procedure helper {
        while (h > 0) {
            h = h - 1;
        }
        v3 = h;
    }
    "#,
    );
    source
}

fn bench_extraction(c: &mut Criterion) {
    let source = sample_source();
    c.bench_function("parse_and_extract", |b| {
        b.iter(|| parse_and_extract(black_box(&source)).unwrap())
    });
}

fn bench_queries(c: &mut Criterion) {
    let source = sample_source();
    let mut engine = QueryEngine::new();
    engine.parse_source(&source).unwrap();

    let queries = [
        ("follows_star", "stmt s; Select s such that Follows*(1, s)"),
        ("two_synonym_join", "assign a; stmt s; Select a such that Follows(s, a)"),
        ("pattern_sub", "assign a; Select a pattern a(_, _\"v3\"_)"),
        ("affects_star", "assign a; Select a such that Affects*(1, a)"),
        ("next_bip_star", "stmt s; Select s such that NextBip*(51, s)"),
    ];

    for (name, query) in queries {
        c.bench_function(name, |b| {
            b.iter(|| {
                let mut results = Vec::new();
                engine.evaluate(black_box(query), &mut results);
                results
            })
        });
    }
}

criterion_group!(benches, bench_extraction, bench_queries);
criterion_main!(benches);
