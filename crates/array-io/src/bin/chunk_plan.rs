//! Chunk planner.
//!
//! Prints the contiguous reads needed to fetch a section of a variable:
//! one line per chunk followed by a summary.

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use array_io::{Layout, ReaderConfig, Section};

#[derive(Parser, Debug)]
#[command(name = "chunk-plan")]
#[command(about = "Print the contiguous reads for a section of a variable")]
struct Args {
    /// Variable shape, comma separated (e.g. 4,5,6)
    #[arg(long)]
    shape: String,

    /// Section to read (e.g. "1:2,:,0:8:2"); whole variable if omitted
    #[arg(long)]
    section: Option<String>,

    /// Element size in bytes
    #[arg(long, default_value = "4")]
    elem_size: usize,

    /// Byte position of the first element of the variable
    #[arg(long, default_value = "0")]
    start_pos: u64,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_shape(s: &str) -> Result<Vec<usize>> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    s.split(',')
        .map(|dim| {
            dim.trim()
                .parse::<usize>()
                .with_context(|| format!("invalid dimension '{}' in shape", dim))
        })
        .collect()
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = ReaderConfig::from_env();
    if let Err(e) = config.validate() {
        bail!("invalid configuration: {}", e);
    }
    debug!(?config, "Loaded reader configuration");

    let shape = parse_shape(&args.shape)?;
    let section: Option<Section> = args
        .section
        .as_deref()
        .map(str::parse::<Section>)
        .transpose()
        .context("invalid section")?;

    let layout = Layout::regular(args.start_pos, args.elem_size, &shape, section.as_ref())?;
    let total = layout.total_nelems();
    if total > config.max_request_elems {
        bail!(
            "section {} selects {} elements, limit is {}",
            layout.section(),
            total,
            config.max_request_elems
        );
    }

    info!(shape = ?shape, section = %layout.section(), "Planning reads");

    let mut count = 0usize;
    for chunk in layout {
        println!(
            "{} {} {} {}",
            chunk.src_elem(),
            chunk.dest_elem(),
            chunk.nelems(),
            chunk.src_pos
        );
        count += 1;
    }
    println!("chunks={} elements={}", count, total);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shape() {
        assert_eq!(parse_shape("4, 5,6").unwrap(), vec![4, 5, 6]);
        assert!(parse_shape("").unwrap().is_empty());
        assert!(parse_shape("4,x").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from(["chunk-plan", "--shape", "4,5,6", "--section", "1:2,:,:"]);
        assert_eq!(args.elem_size, 4);
        assert_eq!(args.start_pos, 0);
        assert_eq!(args.section.as_deref(), Some("1:2,:,:"));
    }
}
