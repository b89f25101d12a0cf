//! Performance benchmarks for phrasedex
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use phrasedex::index::store::IndexService;
use phrasedex::index::types::{Schema, TermOccurrence};
use phrasedex::index::{IndexReader, IndexWriter};
use phrasedex::query::{locate, search_reader};
use phrasedex::utils::analyze;
use tempfile::TempDir;

/// Source-like text where `needle haystack` shows up on every tenth line
fn sample_text(lines: usize) -> String {
    let mut text = String::new();
    for i in 0..lines {
        if i % 10 == 0 {
            text.push_str(&format!("let needle_{i} = haystack(needle, {i});\n"));
        } else {
            text.push_str(&format!("    println!(\"line {i} of the haystack\");\n"));
        }
    }
    text
}

fn occurrences(text: &str, words: &[&str]) -> Vec<TermOccurrence> {
    analyze(text)
        .into_iter()
        .filter(|t| words.contains(&t.text.as_str()))
        .map(|t| TermOccurrence {
            word: t.text,
            position: t.position,
            start: t.start,
            end: t.end,
        })
        .collect()
}

fn bench_locate(c: &mut Criterion) {
    let mut group = c.benchmark_group("locate");

    for lines in [100, 1_000, 10_000] {
        let text = sample_text(lines);
        let occ = occurrences(&text, &["needle", "haystack"]);

        group.bench_with_input(BenchmarkId::from_parameter(lines), &lines, |b, _| {
            b.iter(|| locate(black_box(&text), black_box(&occ), 2).count())
        });
    }

    group.finish();
}

fn bench_analyze(c: &mut Criterion) {
    let text = sample_text(1_000);
    c.bench_function("analyze_1000_lines", |b| b.iter(|| analyze(black_box(&text))));
}

/// Build an index over 50 in-memory documents
fn create_benchmark_index() -> (TempDir, IndexReader) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let index_path = temp_dir.path().join("idx");

    let mut writer = IndexWriter::create(&index_path, temp_dir.path(), Schema { store_content: true })
        .expect("Failed to create index");
    for i in 0..50 {
        writer
            .add_document(temp_dir.path().join(format!("file_{i}.rs")), sample_text(200), 1)
            .expect("Failed to add document");
    }
    writer.commit().expect("Failed to commit");
    drop(writer);

    let reader = IndexReader::open(&index_path).expect("Failed to open index");
    (temp_dir, reader)
}

fn bench_search(c: &mut Criterion) {
    let (_temp_dir, reader) = create_benchmark_index();
    let mut group = c.benchmark_group("search");

    group.bench_function("phrase_hits", |b| {
        b.iter(|| reader.search_phrase(black_box("needle haystack")))
    });

    group.bench_function("phrase_with_fragments", |b| {
        b.iter(|| {
            search_reader(&reader, black_box("needle haystack"))
                .map(|docs| docs.iter().map(|d| d.fragments().count()).sum::<usize>())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_locate, bench_analyze, bench_search);
criterion_main!(benches);
