use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pakfile::archive::{Archive, OpenOptions};
use pakfile::builder::ArchiveBuilder;
use pakfile::index::FileTable;
use std::io::Cursor;

fn sample_files(count: usize, size: usize) -> FileTable {
    (0..count)
        .map(|i| (format!("maps/{i}.dlm"), vec![(i % 251) as u8; size]))
        .collect()
}

fn build(files: &FileTable) -> Vec<u8> {
    let template = Archive::<Cursor<Vec<u8>>>::unopened();
    let mut builder = ArchiveBuilder::new();
    builder.set_template(&template);
    builder.set_files(files.clone()).unwrap();
    let mut out = Cursor::new(Vec::new());
    builder.build(&mut out).unwrap();
    out.into_inner()
}

fn bench_build(c: &mut Criterion) {
    let files = sample_files(1000, 4096);
    c.bench_function("build_1000x4k", |b| b.iter(|| build(black_box(&files))));
}

fn bench_open(c: &mut Criterion) {
    let bytes = build(&sample_files(1000, 4096));

    c.bench_function("open_index_only_1000", |b| {
        b.iter(|| {
            let opts = OpenOptions { autoload: false };
            Archive::open_with(Cursor::new(black_box(&bytes[..])), opts).unwrap()
        })
    });

    c.bench_function("open_and_load_1000x4k", |b| {
        b.iter(|| Archive::open(Cursor::new(black_box(&bytes[..]))).unwrap())
    });
}

criterion_group!(benches, bench_build, bench_open);
criterion_main!(benches);
