use anyhow::Context;
use clap::Parser;
use log::info;
use proxy2surge::{
    config::{parse_output_style, Config},
    proxy::{
        dedup_first_seen, render, CheckerConfig, FetcherConfig, OutputStyle, ProxyChecker,
        ProxyFetcher, ProxyParser,
    },
};
use std::time::Duration;

/// Fetches a free proxy list and renders it as a Surge configuration
#[derive(Parser)]
#[command(name = "proxy2surge")]
#[command(about = "Fetches a free proxy list and renders it as a Surge configuration")]
struct Cli {
    /// Source URL for the proxy listing
    #[arg(short, long)]
    url: Option<String>,

    /// Output file name
    #[arg(short, long)]
    output: Option<String>,

    /// Final output size cap (0 = unlimited)
    #[arg(long)]
    max_nodes: Option<usize>,

    /// Candidate cap applied before probing (0 = unlimited)
    #[arg(long)]
    candidate_limit: Option<usize>,

    /// Skip the TCP connectivity probe
    #[arg(long)]
    no_check: bool,

    /// Connect probe timeout in seconds
    #[arg(long)]
    connect_timeout: Option<f64>,

    /// Number of concurrent probes
    #[arg(long)]
    concurrency: Option<usize>,

    /// Output style (flat or grouped)
    #[arg(long)]
    style: Option<String>,

    /// Label prefix for generated proxy names
    #[arg(long)]
    tag: Option<String>,
}

impl Cli {
    /// Apply CLI overrides on top of the environment configuration
    fn apply(self, mut config: Config) -> Config {
        if let Some(url) = self.url {
            config.api_url = url;
        }
        if let Some(output) = self.output {
            config.output_file = output;
        }
        if let Some(max_nodes) = self.max_nodes {
            config.max_nodes = max_nodes;
        }
        if let Some(candidate_limit) = self.candidate_limit {
            config.candidate_limit = candidate_limit;
        }
        if self.no_check {
            config.test_connectivity = false;
        }
        if let Some(secs) = self.connect_timeout {
            if secs > 0.0 {
                config.connect_timeout = Duration::from_secs_f64(secs);
            }
        }
        if let Some(concurrency) = self.concurrency {
            config.probe_concurrency = concurrency.max(1);
        }
        if let Some(style) = self.style.as_deref().and_then(parse_output_style) {
            config.output_style = style;
        }
        if let Some(tag) = self.tag {
            config.group_tag = tag;
        }
        config
    }
}

#[tokio::main]
async fn main() -> proxy2surge::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Cli::parse().apply(Config::from_env());

    let fetcher =
        ProxyFetcher::with_config(FetcherConfig::new().with_timeout(config.fetch_timeout))?;
    let body = fetcher.fetch(&config.api_url).await?;

    let entries =
        ProxyParser::parse_body(body.trim(), config.text_fallback, config.default_protocol)?;
    info!("normalized {} candidate entries", entries.len());

    let city_aware = config.output_style == OutputStyle::GroupedByCity;
    let mut entries = dedup_first_seen(entries, city_aware);
    info!("{} entries after deduplication", entries.len());

    if config.candidate_limit > 0 {
        entries.truncate(config.candidate_limit);
    }

    if config.test_connectivity {
        let checker = ProxyChecker::with_config(
            CheckerConfig::new()
                .with_timeout(config.connect_timeout)
                .with_concurrency(config.probe_concurrency),
        );
        entries = checker.filter_reachable(entries).await;
        info!("{} entries reachable", entries.len());
    }

    if config.max_nodes > 0 {
        entries.truncate(config.max_nodes);
    }

    let conf = render(&entries, config.output_style, &config.group_tag);
    std::fs::write(&config.output_file, conf)
        .with_context(|| format!("failed to write {}", config.output_file))?;

    println!("{} written, {} nodes", config.output_file, entries.len());

    Ok(())
}
