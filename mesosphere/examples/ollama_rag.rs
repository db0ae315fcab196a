//! Retrieval with Ollama embeddings.
//!
//! Documents and questions are embedded by a local Ollama server; the rows
//! live in the in-memory engine.
//!
//! ```text
//! ollama pull mxbai-embed-large
//! cargo run --example ollama_rag
//! ```

use std::sync::Arc;

use mesosphere::engine::MemoryEngine;
use mesosphere::prelude::*;
use mesosphere::EmbeddingProvider;

const KNOWLEDGE: &[(&str, &str, &str)] = &[
    ("rust-1", "Rust guarantees memory safety without a garbage collector.", "rust"),
    ("rust-2", "Cargo is Rust's build system and package manager.", "rust"),
    ("rust-3", "Traits define shared behaviour across types in Rust.", "rust"),
    ("db-1", "A vector database indexes embeddings for similarity search.", "databases"),
    ("db-2", "Cosine distance compares the angle between two vectors.", "databases"),
    ("ml-1", "Embedding models map text to dense numeric vectors.", "ml"),
];

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    println!("🦙 Mesosphere + Ollama RAG Example\n");

    let provider = EmbeddingProvider::from_config(&EmbeddingProviderConfig::ollama())?;
    let client = Client::with_engine(Arc::new(MemoryEngine::new()))
        .with_embedding_function(Arc::new(provider));
    let kb = client.get_or_create_collection("knowledge", None).await?;

    println!("📚 Embedding {} documents...", KNOWLEDGE.len());
    kb.add(
        AddItems::new(KNOWLEDGE.iter().map(|k| k.0))
            .with_documents(KNOWLEDGE.iter().map(|k| k.1))
            .with_metadatas(
                KNOWLEDGE
                    .iter()
                    .map(|k| Metadata::new().with_field("topic", k.2))
                    .collect(),
            ),
    )
    .await?;

    let questions = [
        ("How does Rust manage memory?", None),
        ("What is an embedding?", None),
        ("How are vectors compared?", Some("databases")),
    ];

    for (question, topic) in questions {
        println!("\n❓ {question}");
        let mut request = QueryItems::texts([question]).with_n_results(2);
        if let Some(topic) = topic {
            request = request.with_where(Where::field("topic").eq(topic));
        }
        let answers = kb.query(request).await?;
        for hit in answers.matches(0) {
            println!(
                "   [{:.3}] {}",
                hit.distance.unwrap_or_default(),
                hit.document.unwrap_or_default()
            );
        }
    }

    Ok(())
}
