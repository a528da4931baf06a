//! Benchmarks for cell normalization and table construction.
//!
//! A full reload normalizes every key and value of the sheet, so both costs
//! scale with the table. The fixtures mimic a constitution-sized sheet of a
//! few hundred articles with typographic punctuation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lexis_core::normalize::normalize;
use lexis_core::types::{ArticleTable, RawRow};

/// Generate an article body (~80 words) with smart quotes and ragged spacing.
fn generate_article(index: usize) -> String {
    format!(
        "  {}-modda.  O\u{2018}zbekiston Respublikasida  \u{201C}inson\u{201D}, uning hayoti, \
         erkinligi, sha\u{02BB}ni, qadr-qimmati va boshqa daxlsiz huquqlari oliy \
         qadriyatdir.\n\nDemokratik huquq va erkinliklar Konstitutsiya hamda \
         qonunlar bilan himoya qilinadi.\u{00A0}\u{00A0}Davlat o\u{2019}z faoliyatini \
         inson va jamiyat farovonligini ko\u{02BC}zlab, ijtimoiy adolat va \
         qonuniylik prinsiplari asosida amalga oshiradi.\t ",
        index
    )
}

fn generate_rows(count: usize) -> Vec<RawRow> {
    (1..=count)
        .map(|i| RawRow::new(i.to_string(), generate_article(i)))
        .collect()
}

fn bench_normalize(c: &mut Criterion) {
    let article = generate_article(42);
    c.bench_function("normalize_article", |b| {
        b.iter(|| normalize(black_box(&article)))
    });

    let clean = normalize(&article);
    c.bench_function("normalize_already_clean", |b| {
        b.iter(|| normalize(black_box(&clean)))
    });
}

fn bench_table_build(c: &mut Criterion) {
    let rows = generate_rows(300);
    c.bench_function("build_table_300_rows", |b| {
        b.iter(|| ArticleTable::build(black_box(rows.clone())))
    });
}

criterion_group!(benches, bench_normalize, bench_table_build);
criterion_main!(benches);
