use criterion::{Criterion, criterion_group, criterion_main};
use docs_qa::chunker::{ChunkingConfig, chunk_documents};
use docs_qa::loader::{Document, DocumentMetadata};
use std::hint::black_box;
use std::path::PathBuf;

fn synthetic_document() -> Document {
    let paragraph = "Rice is grown during the monsoon season. Wheat is sown in winter. \
        Irrigation schedules depend on soil type and rainfall patterns in the region. \
        Crop rotation preserves nitrogen levels and reduces pest pressure over time.";
    let content = std::iter::repeat_n(paragraph, 200)
        .collect::<Vec<_>>()
        .join("\n\n");

    Document {
        content,
        metadata: DocumentMetadata {
            source: PathBuf::from("data/docs/agronomy.txt"),
            page: None,
        },
    }
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let documents = vec![synthetic_document()];
    let config = ChunkingConfig::default();
    c.bench_function("chunking", |b| {
        b.iter(|| chunk_documents(black_box(&documents), black_box(&config)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
