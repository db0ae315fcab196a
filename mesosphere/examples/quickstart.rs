//! Quick start example for Mesosphere.
//!
//! Runs entirely in process against the in-memory engine.

use std::sync::Arc;

use mesosphere::engine::MemoryEngine;
use mesosphere::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    println!("🌟 Mesosphere Quick Start Example\n");

    let client = Client::with_engine(Arc::new(MemoryEngine::new()));
    let docs = client.get_or_create_collection("articles", None).await?;

    // Small dimension for demonstration; real embeddings are 384-1536 dim
    let articles = [
        ("rust-intro", "Introduction to Rust programming", "rust", [0.9, 0.8, 0.1, 0.0]),
        ("rust-patterns", "Advanced Rust patterns and idioms", "rust", [0.85, 0.9, 0.15, 0.05]),
        ("py-data", "Python for data science", "python", [0.1, 0.2, 0.9, 0.85]),
        ("ml-basics", "Machine learning fundamentals", "python", [0.2, 0.1, 0.7, 0.8]),
        ("rust-systems", "Systems programming with Rust", "rust", [0.8, 0.7, 0.2, 0.1]),
    ];

    println!("📥 Adding {} articles...", articles.len());
    docs.add(
        AddItems::new(articles.iter().map(|a| a.0))
            .with_documents(articles.iter().map(|a| a.1))
            .with_metadatas(
                articles
                    .iter()
                    .map(|a| Metadata::new().with_field("lang", a.2))
                    .collect(),
            )
            .with_embeddings(articles.iter().map(|a| a.3.to_vec()).collect()),
    )
    .await?;
    println!("✅ Collection holds {} rows\n", docs.count().await?);

    println!("🔍 Nearest to 'Rust programming'...\n");
    let hits = docs
        .query(QueryItems::embeddings(vec![vec![0.88, 0.85, 0.12, 0.03]]).with_n_results(3))
        .await?;

    println!("📊 Top 3 Results:");
    println!("{:-<60}", "");
    for (rank, hit) in hits.matches(0).iter().enumerate() {
        println!(
            "{}. {} (distance: {:.4})",
            rank + 1,
            hit.document.as_deref().unwrap_or("<no document>"),
            hit.distance.unwrap_or_default()
        );
    }

    println!("\n🔎 Python articles only:");
    let python = docs
        .get(GetItems::new().with_where(Where::field("lang").eq("python")))
        .await?;
    for id in &python.ids {
        println!("   - {id}");
    }

    println!("\n✨ Done!");
    Ok(())
}
