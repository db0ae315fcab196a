//! Talks to a remote collection API configured from the environment.
//!
//! Start the development server first:
//!
//! ```text
//! cargo run -p mesosphere-devserver -- --api-key secret
//! MESOSPHERE_API_URL=http://127.0.0.1:8000 MESOSPHERE_API_KEY=secret \
//!     cargo run --example remote_client
//! ```

use std::time::Instant;

use mesosphere::prelude::*;
use tracing_subscriber::EnvFilter;

const DIM: usize = 32;
const ROWS: usize = 200;
const BATCH: usize = 25;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Remote Mesosphere Demo\n");

    let client = Client::from_env()?;
    let collection = client
        .get_or_create_collection("remote-demo", Some(Metadata::new().with_field("purpose", "demo")))
        .await?;
    println!("Using collection '{}' ({})\n", collection.name(), collection.id());

    println!("⏳ Adding {ROWS} vectors in concurrent batches...");
    let start = Instant::now();
    let mut handles = Vec::new();
    for batch in 0..ROWS / BATCH {
        let collection = collection.clone();
        handles.push(tokio::spawn(async move {
            let ids: Vec<String> = (0..BATCH).map(|i| format!("row-{}", batch * BATCH + i)).collect();
            let vectors = ids.iter().map(|id| vector_for(id)).collect();
            let metadatas = (0..BATCH)
                .map(|i| Metadata::new().with_field("bucket", ((batch * BATCH + i) % 4) as i64))
                .collect();
            collection
                .add(AddItems::new(ids).with_embeddings(vectors).with_metadatas(metadatas))
                .await
        }));
    }
    for handle in handles {
        match handle.await {
            Ok(result) => {
                result?;
            }
            Err(e) => return Err(Error::contract(format!("batch task failed: {e}"))),
        }
    }
    println!("   [OK] Added in {:?}", start.elapsed());
    println!("   Total rows: {}\n", collection.count().await?);

    println!("Searching bucket 2...");
    let results = collection
        .query(
            QueryItems::embeddings(vec![vector_for("row-42")])
                .with_where(Where::field("bucket").eq(2))
                .with_n_results(5)
                .with_include([Include::Distances]),
        )
        .await?;
    println!("   Top 5 results:");
    for (i, hit) in results.matches(0).iter().enumerate() {
        println!("     {}. {} (distance: {:.4})", i + 1, hit.id, hit.distance.unwrap_or_default());
    }

    client.delete_collection(collection.name()).await?;
    println!("\nRemote demo complete!");
    Ok(())
}

fn vector_for(id: &str) -> Embedding {
    let seed = id.bytes().fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));
    (0..DIM).map(|j| ((seed as usize + j) as f32).sin()).collect()
}
