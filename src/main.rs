use clap::Parser;
use env_logger::Env;
use log::{error, info};
use std::path::PathBuf;
use tagwalk::errors::Result;
use tagwalk::page::DEFAULT_BASE_URL;
use tagwalk::{Crawler, CrawlerConfig, OutputFormat, OutputTarget};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Random walk over a video platform's tag pages", long_about = None)]
struct Args {
    /// Seed tags; discovered from the default feed when omitted
    #[clap(short, long, multiple_values = true)]
    tags: Vec<String>,

    /// Tags followed after each seed page
    #[clap(short = 'n', long, default_value_t = 10)]
    steps: usize,

    #[clap(short, long, default_value = "META.csv")]
    output: PathBuf,

    /// Output format, overriding the one implied by the file extension
    #[clap(long, parse(try_from_str = parse_format))]
    format: Option<OutputFormat>,

    #[clap(short, long, default_value_t = 5)]
    concurrency: usize,

    #[clap(short, long, default_value_t = 13)]
    seed: u64,

    #[clap(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,
}

fn parse_format(s: &str) -> std::result::Result<OutputFormat, String> {
    s.parse().map_err(|e: tagwalk::Error| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let target = match args.format {
        Some(format) => OutputTarget::new(args.output, format),
        None => OutputTarget::from_path(args.output),
    };
    info!("Seed tags: {:?}", args.tags);
    info!("Concurrency: {}", args.concurrency);

    let crawler = Crawler::new(CrawlerConfig {
        concurrency: args.concurrency,
        seed: args.seed,
        base_url: args.base_url,
        ..CrawlerConfig::default()
    })?;

    match crawler.run(&args.tags, args.steps, &target).await {
        Ok(summary) => {
            info!(
                "Wrote {} rows from {} seeds to {} in {:?}",
                summary.rows_written,
                summary.seeds,
                summary.output.display(),
                summary.elapsed
            );
            Ok(())
        }
        Err(e) => {
            error!("Error during crawling: {}", e);
            Err(e)
        }
    }
}
