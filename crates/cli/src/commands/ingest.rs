//! `nugget ingest`: Index scraped restaurant records.

use std::path::Path;

use nugget_config::AppConfig;
use nugget_core::document::DocumentStore;
use nugget_store::FileStore;
use nugget_store::ingest::ingest_file;

pub async fn run(config: &AppConfig, file: &Path, replace: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileStore::open(config.retrieval.documents_path(), config.retrieval.min_score).await;

    if replace {
        store.clear().await?;
    }

    println!("📥 Ingesting {}...", file.display());
    let written = ingest_file(file, &store).await?;
    let total = store.count().await?;

    println!("   ✅ {written} restaurants indexed ({total} documents total)");
    println!("   Index: {}", store.path().display());
    Ok(())
}
