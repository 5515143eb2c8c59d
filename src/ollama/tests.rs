use super::*;

#[test]
fn client_configuration() {
    let config = OllamaConfig {
        protocol: "http".to_string(),
        host: "test-host".to_string(),
        port: 1234,
        embedding_model: "embed-model".to_string(),
        chat_model: "chat-model".to_string(),
        batch_size: 128,
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");

    assert_eq!(client.embedding_model, "embed-model");
    assert_eq!(client.chat_model, "chat-model");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
}

#[test]
fn client_builder_methods() {
    let config = OllamaConfig::default();
    let client = OllamaClient::new(&config)
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(5);

    assert_eq!(client.retry_attempts, 5);
}

#[test]
fn generate_request_shape() {
    let request = GenerateRequest {
        model: "chat-model".to_string(),
        prompt: "Question: why?".to_string(),
        stream: false,
        options: GenerateOptions {
            temperature: GENERATION_TEMPERATURE,
        },
    };

    let json = serde_json::to_value(&request).expect("serialize");
    assert_eq!(json["model"], "chat-model");
    assert_eq!(json["stream"], false);
    assert_eq!(json["options"]["temperature"], 0.0);
}

#[test]
fn embed_batch_with_no_texts_is_a_no_op() {
    let client = OllamaClient::new(&OllamaConfig::default()).expect("Failed to create client");
    let embeddings = client.embed_batch(&[]).expect("empty batch should succeed");
    assert!(embeddings.is_empty());
}
