//! Run with: cargo run --bin cleanup [-- --apply]
//!
//! Audits the database and deletes orphaned modules, lessons, quizzes and
//! progress records. Without `--apply` it only reports what it would delete.

use lmsctl::config::{database, logging, Overrides, Settings};
use lmsctl::workflow::audit::{audit, Snapshot};
use lmsctl::workflow::mutator::Mutator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let apply = std::env::args().skip(1).any(|arg| arg == "--apply");

    let settings = Settings::from_env(&Overrides::default())?;
    println!("Connecting to MongoDB ({})...", settings.database);
    let db = database::connect(&settings).await?;

    println!("Auditing...");
    let findings = audit(&Snapshot::load(&db).await?);
    print!("{}", findings);

    if findings.orphan_count() == 0 {
        println!("\n✓ Nothing to clean up");
        return Ok(());
    }

    let report = Mutator::new(&db, !apply).delete_orphans(&findings).await?;
    println!();
    print!("{}", report);

    if apply {
        println!("\n✓ Cleanup complete!");
    } else {
        println!("\nRe-run with --apply to delete.");
    }
    Ok(())
}
