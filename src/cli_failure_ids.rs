//! Lists the song ids recorded in failure ledgers, for feeding back into a
//! retry run.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;

use score_fetcher::config::ledger_prefix;
use score_fetcher::failure_ledger::review::{collect_ids, find_ledgers, latest};

#[derive(Parser, Debug)]
#[command(name = "failure-ids")]
struct CliArgs {
    /// A single ledger file. Takes precedence over --dir.
    #[clap(long)]
    pub file: Option<PathBuf>,

    /// Directory holding `_failures_<region>_*.json` ledgers.
    #[clap(long, default_value = "output/musicscore")]
    pub dir: PathBuf,

    /// Region whose ledgers are listed.
    #[clap(long, default_value = "cn")]
    pub region: String,

    /// Only read the most recent ledger.
    #[clap(long)]
    pub latest: bool,

    /// Also write the ids, one per line, to this file.
    #[clap(long)]
    pub out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    let mut paths = match &cli_args.file {
        Some(file) => vec![file.clone()],
        None => find_ledgers(&cli_args.dir, &ledger_prefix(&cli_args.region))?,
    };
    if paths.is_empty() {
        bail!(
            "No failure ledgers for region {} in {:?}",
            cli_args.region,
            cli_args.dir
        );
    }
    if cli_args.latest {
        paths = latest(&paths).into_iter().collect();
    }

    let ids = collect_ids(&paths)?;

    println!("count={}", ids.len());
    for id in &ids {
        println!("{}", id);
    }

    if let Some(out) = &cli_args.out {
        let mut body = ids.join("\n");
        if !body.is_empty() {
            body.push('\n');
        }
        std::fs::write(out, body).with_context(|| format!("Failed to write {:?}", out))?;
    }
    Ok(())
}
