// Dump a stored insight chunk as JSON (decodes the wincode BLOB).
//
// Usage: cargo run --example dump_chunk -- [DB_PATH] [APPLICATION_ID] [KIND]
//   DB_PATH         default: ./data/insights.db
//   APPLICATION_ID  omitted: list stored chunk paths
//   KIND            default: deployment_frequency

use insightd::chunk_repo::ChunkRepo;
use insightd::models::MetricKind;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let path = args.get(1).map(String::as_str).unwrap_or("./data/insights.db");

    let pool = insightd::db::connect(path, 1).await?;
    let repo = ChunkRepo::new(pool);
    repo.init().await?;

    let Some(application_id) = args.get(2) else {
        for p in repo.list_paths().await? {
            println!("{}", p);
        }
        return Ok(());
    };
    let kind: MetricKind = args
        .get(3)
        .map(String::as_str)
        .unwrap_or("deployment_frequency")
        .parse()?;

    match repo.load(application_id, kind).await? {
        Some(chunk) => println!("{}", serde_json::to_string_pretty(&chunk)?),
        None => println!("no {} chunk for {}", kind, application_id),
    }
    Ok(())
}
