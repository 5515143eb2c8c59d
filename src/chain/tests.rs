use super::*;
use crate::store::ChunkMetadata;

fn result_with_content(content: &str) -> SearchResult {
    SearchResult {
        metadata: ChunkMetadata {
            source: "data/docs/farming.txt".to_string(),
            page: None,
            chunk_index: 0,
            content: content.to_string(),
            created_at: "2025-01-01T00:00:00Z".to_string(),
        },
        similarity_score: 0.9,
        distance: 0.1,
    }
}

#[test]
fn context_joins_chunks_with_blank_line() {
    let results = vec![
        result_with_content("Rice is grown during the monsoon season."),
        result_with_content("Wheat is sown in winter."),
    ];

    assert_eq!(
        format_context(&results),
        "Rice is grown during the monsoon season.\n\nWheat is sown in winter."
    );
}

#[test]
fn context_of_no_results_is_empty() {
    assert_eq!(format_context(&[]), "");
}

#[test]
fn prompt_substitutes_both_placeholders() {
    let prompt = render_prompt("Some context.", "What season is rice grown in?");

    assert_eq!(
        prompt,
        "Answer the question based only on the following context:\n\n\
         Some context.\n\n\
         Question: What season is rice grown in?\n\n\
         Answer:"
    );
}

#[test]
fn prompt_leaves_no_placeholders_behind() {
    let prompt = render_prompt("context text", "question text");
    assert!(!prompt.contains("{context}"));
    assert!(!prompt.contains("{question}"));
}
