// Resume matching: merged resume documents, embeddings and the vector index,
// the candidate shortlist and LLM scoring/ranking.
// All LLM calls go through llm_client::TextGenerator.

pub mod document;
pub mod embedder;
pub mod handlers;
pub mod index;
pub mod indexer;
pub mod matcher;
pub mod prompts;
pub mod scoring;
