#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

//! End-to-end pipeline tests against a stubbed Ollama server
//!
//! The embedding endpoint is stubbed with a deterministic bag-of-words
//! vector so that similarity search behaves like a real embedding model
//! without requiring one.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use docs_qa::chain::AnswerChain;
use docs_qa::chunker::{ChunkingConfig, chunk_documents};
use docs_qa::config::OllamaConfig;
use docs_qa::loader::load_documents;
use docs_qa::ollama::OllamaClient;
use docs_qa::store::{ChunkMetadata, EmbeddingRecord, IndexState, VectorStore};

const EMBED_MODEL: &str = "stub-embed";
const CHAT_MODEL: &str = "stub-chat";
const DIMENSION: usize = 8;

/// Deterministic bag-of-words embedding: words hash into a fixed number of
/// buckets, counts are L2-normalized. Shared vocabulary between a question
/// and a chunk yields nearby vectors.
fn stub_embedding(text: &str) -> Vec<f32> {
    let mut buckets = vec![0.0f32; DIMENSION];
    for word in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut hasher = DefaultHasher::new();
        word.hash(&mut hasher);
        buckets[(hasher.finish() % DIMENSION as u64) as usize] += 1.0;
    }

    let norm = buckets.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut buckets {
            *v /= norm;
        }
    }
    buckets
}

struct EmbedResponder;

impl Respond for EmbedResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value =
            serde_json::from_slice(&request.body).expect("embed request body should be JSON");
        let embeddings: Vec<Vec<f32>> = body["input"]
            .as_array()
            .expect("embed request should carry an input array")
            .iter()
            .map(|text| stub_embedding(text.as_str().unwrap_or_default()))
            .collect();

        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "embeddings": embeddings }))
    }
}

async fn start_stub_ollama() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "models": [
                { "name": EMBED_MODEL },
                { "name": CHAT_MODEL },
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(EmbedResponder)
        .mount(&server)
        .await;

    server
}

fn client_for(server: &MockServer) -> OllamaClient {
    let url = Url::parse(&server.uri()).expect("mock server URI should parse");
    let config = OllamaConfig {
        protocol: "http".to_string(),
        host: url.host_str().expect("mock server should have a host").to_string(),
        port: url.port().expect("mock server should have a port"),
        embedding_model: EMBED_MODEL.to_string(),
        chat_model: CHAT_MODEL.to_string(),
        batch_size: 16,
    };
    OllamaClient::new(&config).expect("Failed to create Ollama client")
}

fn record_for(id: &str, content: &str) -> EmbeddingRecord {
    EmbeddingRecord {
        id: id.to_string(),
        vector: stub_embedding(content),
        metadata: ChunkMetadata {
            source: "data/docs/farming.txt".to_string(),
            page: None,
            chunk_index: 0,
            content: content.to_string(),
            created_at: "2025-01-01T00:00:00Z".to_string(),
        },
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn end_to_end_monsoon_scenario() {
    let server = start_stub_ollama().await;

    // The generator must see the retrieved chunk text inside its prompt
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_string_contains("Rice is grown during the monsoon season."))
        .and(body_string_contains("What season is rice grown in?"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": "Rice is grown in the monsoon season."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let docs_dir = TempDir::new().expect("should create docs dir");
    std::fs::write(
        docs_dir.path().join("rice.txt"),
        "Rice is grown during the monsoon season.",
    )
    .expect("write doc");

    let index_dir = TempDir::new().expect("should create index dir");
    let index_path = index_dir.path().join("vector_db");
    assert_eq!(IndexState::detect(&index_path), IndexState::Fresh);

    let client = client_for(&server);
    client.health_check().expect("stub server should be healthy");

    let documents = load_documents(docs_dir.path()).expect("load should succeed");
    assert_eq!(documents.len(), 1);

    let chunks = chunk_documents(&documents, &ChunkingConfig::default());
    assert_eq!(chunks.len(), 1);

    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let vectors = client.embed_batch(&texts).expect("embedding should succeed");

    let records: Vec<EmbeddingRecord> = chunks
        .iter()
        .zip(vectors)
        .enumerate()
        .map(|(i, (chunk, vector))| EmbeddingRecord {
            id: format!("{i}"),
            vector,
            metadata: ChunkMetadata {
                source: chunk.metadata.source.display().to_string(),
                page: chunk.metadata.page,
                chunk_index: chunk.chunk_index,
                content: chunk.content.clone(),
                created_at: "2025-01-01T00:00:00Z".to_string(),
            },
        })
        .collect();

    let store = VectorStore::build(&index_path, EMBED_MODEL, records)
        .await
        .expect("build should succeed");
    assert_eq!(IndexState::detect(&index_path), IndexState::Existing);

    let chain = AnswerChain::new(store, client, 2);
    let answer = chain
        .ask("What season is rice grown in?")
        .await
        .expect("ask should succeed");

    assert!(
        answer.contains("monsoon"),
        "answer should mention the monsoon, got: {answer}"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn build_then_load_round_trip_returns_own_chunk_first() {
    let server = start_stub_ollama().await;
    let client = client_for(&server);

    let index_dir = TempDir::new().expect("should create index dir");
    let index_path = index_dir.path().join("vector_db");

    let chunk_texts = [
        "Rice is grown during the monsoon season.",
        "Wheat is sown in winter and harvested in spring.",
        "Tractors reduced manual labour on large farms.",
    ];
    let records: Vec<EmbeddingRecord> = chunk_texts
        .iter()
        .enumerate()
        .map(|(i, text)| record_for(&format!("{i}"), text))
        .collect();

    VectorStore::build(&index_path, EMBED_MODEL, records)
        .await
        .expect("build should succeed");

    // reopen from disk with the same model; no re-embedding happens
    let store = VectorStore::open(&index_path, EMBED_MODEL)
        .await
        .expect("open should succeed");

    for text in &chunk_texts {
        let query = client.embed(text).expect("query embedding should succeed");
        let results = store
            .search_similar(&query, 2)
            .await
            .expect("search should succeed");

        assert!(results.len() <= 2);
        assert_eq!(results[0].metadata.content, *text);
        if results.len() == 2 {
            assert!(results[0].distance <= results[1].distance);
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn embed_count_mismatch_is_an_error() {
    let server = MockServer::start().await;

    // one input, two embeddings back
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embeddings": [[0.1, 0.2], [0.3, 0.4]]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.embed("single text").is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).with_retry_attempts(3);
    assert!(client.generate("prompt").is_err());

    // mock expectation of exactly one call is verified on drop
    server.verify().await;
}
