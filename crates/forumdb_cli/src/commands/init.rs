//! Init command implementation.

use forumdb::{Forum, BUCKETS};
use std::path::Path;

/// Runs the init command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let forum = Forum::open(path)?;
    println!("Initialized forum store at {}", path.display());
    for bucket in BUCKETS {
        println!("  bucket {bucket}");
    }
    forum.close()?;
    Ok(())
}
