//! Matches command - print stored rankings.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;
use tubelens_types::VideoId;

use super::Context;

/// Arguments for the matches command.
#[derive(Args, Debug)]
pub struct MatchesArgs {
    /// Video URL or 11-character id
    pub video: String,

    /// Database path
    #[arg(long)]
    pub db: Option<PathBuf>,
}

/// Run the matches command.
pub async fn run(args: MatchesArgs, ctx: &Context) -> Result<()> {
    let video_id = VideoId::parse(&args.video)?;
    let path = ctx.store_path(args.db.as_deref())?;
    if !path.exists() {
        bail!("no store at {}; run `tubelens run` first", path.display());
    }

    let store = ctx.open_store(&path)?;
    let matches = store.topic_matches(&video_id)?;
    if ctx.verbose {
        eprintln!("{} stored matches for {}", matches.len(), video_id);
    }

    println!("{}", serde_json::to_string_pretty(&matches)?);
    Ok(())
}
