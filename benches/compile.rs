//! Performance benchmarks for document compilation.
//!
//! Run with: `cargo bench --bench compile`
//!
//! ## Performance Targets
//!
//! | Operation | Target | Notes |
//! |-----------|--------|-------|
//! | Table parse | <1ms per 100 sentences | Column discovery included |
//! | Cold compile | <10ms per 100 sentences | All layers, coreference on |
//! | Cached compile | <100µs | LRU hit, source hash only |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::thread;

use semhyp_kernel::{AnnotationTable, CacheConfig, CompilePolicy, HypergraphCompiler};

/// One sentence of the 17-column format; `{s}` is the sentence id.
const SENTENCE: &str = "\
{s}\t0\tPatrick\t+\tPatrick\tPROPN\tNNP\tnsubj\t1\tB-PERSON\t-\tB-ARG0\tO\tO\tB\tMAIN1\t-
{s}\t1\tknew\t+\tknow\tVERB\tVBD\tROOT\t1\tO\tknow.01\tB-V\tO\tO\t-\t-\t-
{s}\t2\tabout\t+\tabout\tADP\tIN\tprep\t1\tO\t-\tB-ARG1\tO\tO\t-\t-\t-
{s}\t3\tIBM\t-\tIBM\tPROPN\tNNP\tposs\t5\tB-ORG\t-\tI-ARG1\tO\tO\tB\tMAIN2\t-
{s}\t4\t's\t+\t's\tPART\tPOS\tcase\t3\tO\t-\tI-ARG1\tO\tO\t-\t-\t-
{s}\t5\tplans\t-\tplan\tNOUN\tNNS\tpobj\t2\tO\t-\tI-ARG1\tO\tO\t-\t-\t-
{s}\t6\t,\t+\t,\tPUNCT\t,\tpunct\t1\tO\t-\tO\tO\tO\t-\t-\t-
{s}\t7\tbut\t+\tbut\tCCONJ\tCC\tcc\t1\tO\t-\tO\tO\tO\t-\t-\t-
{s}\t8\the\t+\the\tPRON\tPRP\tnsubj\t11\tO\t-\tO\tB-ARG0\tO\tB\tREF1\t-
{s}\t9\tdid\t+\tdo\tAUX\tVBD\taux\t11\tO\t-\tO\tO\tO\t-\t-\t-
{s}\t10\tnot\t+\tnot\tPART\tRB\tneg\t11\tO\t-\tO\tB-ARGM-NEG\tO\t-\t-\t-
{s}\t11\ttalk\t+\ttalk\tVERB\tVB\tconj\t1\tO\ttalk.01\tO\tB-V\tO\t-\t-\t-
{s}\t12\tabout\t+\tabout\tADP\tIN\tprep\t11\tO\t-\tO\tB-ARG1\tO\t-\t-\t-
{s}\t13\tthem\t-\tthem\tPRON\tPRP\tpobj\t12\tO\t-\tO\tI-ARG1\tO\t-\t-\t-
{s}\t14\t.\t-\t.\tPUNCT\t.\tpunct\t1\tO\t-\tO\tO\tO\t-\t-\t-
";

/// Create a document of `sentences` sentences.
fn make_document(sentences: usize) -> String {
    (0..sentences)
        .map(|s| SENTENCE.replace("{s}", &s.to_string()))
        .collect()
}

/// Benchmark table parsing alone.
fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for sentences in [1, 10, 100] {
        let source = make_document(sentences);

        group.throughput(Throughput::Elements(sentences as u64));
        group.bench_with_input(BenchmarkId::new("sentences", sentences), &source, |b, source| {
            b.iter(|| {
                let table = AnnotationTable::parse(black_box(source));
                assert_eq!(table.len(), sentences);
                table
            })
        });
    }

    group.finish();
}

/// Benchmark cold compilation (no cache).
fn bench_cold_compile(c: &mut Criterion) {
    let compiler = HypergraphCompiler::new(CompilePolicy::default());

    let mut group = c.benchmark_group("cold_compile");

    for sentences in [1, 10, 100] {
        let source = make_document(sentences);

        group.throughput(Throughput::Elements(sentences as u64));
        group.bench_with_input(BenchmarkId::new("sentences", sentences), &source, |b, source| {
            b.iter(|| {
                let document = compiler.compile_str(black_box(source));
                assert_eq!(document.hypergraph.sentences.len(), sentences);
                document
            })
        });
    }

    group.finish();
}

/// Benchmark structural compilation (optional layers ignored).
fn bench_structural_compile(c: &mut Criterion) {
    let compiler = HypergraphCompiler::new(CompilePolicy::structural());
    let source = make_document(100);

    c.bench_function("structural_compile_100", |b| {
        b.iter(|| compiler.compile_str(black_box(&source)))
    });
}

/// Benchmark cached compilation (cache hit).
fn bench_cached_compile(c: &mut Criterion) {
    let compiler = HypergraphCompiler::with_cache(CompilePolicy::default(), CacheConfig::default());

    let mut group = c.benchmark_group("cached_compile");

    for sentences in [1, 10, 100] {
        let source = make_document(sentences);

        // Warm the cache
        compiler.compile_cached(&source);

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("sentences", sentences), &source, |b, source| {
            b.iter(|| compiler.compile_cached(black_box(source)))
        });
    }

    group.finish();
}

/// Benchmark cache contention (multi-threaded).
fn bench_cache_contention(c: &mut Criterion) {
    let compiler = Arc::new(HypergraphCompiler::with_cache(
        CompilePolicy::default(),
        CacheConfig::default(),
    ));
    let source = Arc::new(make_document(10));
    compiler.compile_cached(&source);

    let mut group = c.benchmark_group("cache_contention");

    for thread_count in [1, 2, 4, 8] {
        group.throughput(Throughput::Elements(thread_count as u64));
        group.bench_with_input(BenchmarkId::new("threads", thread_count), &thread_count, |b, &threads| {
            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let compiler = Arc::clone(&compiler);
                        let source = Arc::clone(&source);
                        thread::spawn(move || compiler.compile_cached(&source))
                    })
                    .collect();
                for handle in handles {
                    black_box(handle.join().unwrap());
                }
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_parse,
    bench_cold_compile,
    bench_structural_compile,
    bench_cached_compile,
    bench_cache_contention,
);
criterion_main!(benches);
