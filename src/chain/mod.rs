// Answer chain module
// Retrieval, prompt templating, and generation composed into one
// question-to-answer call

#[cfg(test)]
mod tests;

use itertools::Itertools;
use tracing::debug;

use crate::ollama::OllamaClient;
use crate::store::{SearchResult, VectorStore};
use crate::{QaError, Result};

/// Instructs the model to answer strictly from the retrieved context
const PROMPT_TEMPLATE: &str = "\
Answer the question based only on the following context:

{context}

Question: {question}

Answer:";

/// Stateless question-to-answer pipeline over a built vector index.
/// No conversation memory is kept between invocations.
pub struct AnswerChain {
    store: VectorStore,
    ollama: OllamaClient,
    top_k: usize,
}

impl AnswerChain {
    #[inline]
    pub fn new(store: VectorStore, ollama: OllamaClient, top_k: usize) -> Self {
        Self {
            store,
            ollama,
            top_k,
        }
    }

    /// Answer a single question: embed it, retrieve the top-k most similar
    /// chunks, render the prompt, and return the model's response verbatim
    #[inline]
    pub async fn ask(&self, question: &str) -> Result<String> {
        let query_vector = self
            .ollama
            .embed(question)
            .map_err(|e| QaError::Embedding(format!("Failed to embed question: {:#}", e)))?;

        let results = self
            .store
            .search_similar(&query_vector, self.top_k)
            .await?;

        debug!("Retrieved {} context chunks", results.len());

        let context = format_context(&results);
        let prompt = render_prompt(&context, question);

        self.ollama
            .generate(&prompt)
            .map_err(|e| QaError::Generation(format!("Failed to generate answer: {:#}", e)))
    }
}

/// Join retrieved chunk texts with a blank-line separator
fn format_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|result| result.metadata.content.as_str())
        .join("\n\n")
}

fn render_prompt(context: &str, question: &str) -> String {
    PROMPT_TEMPLATE
        .replace("{context}", context)
        .replace("{question}", question)
}
