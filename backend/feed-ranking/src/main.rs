use anyhow::Context;
use chrono::Utc;
use feed_ranking::jobs::{refresh_inflation_series, FileInflationSource};
use feed_ranking::{Config, KarmaInflationHandle, SiteConfig, ViewResolver, ViewTerms};
use std::io::Read;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Reads view terms as JSON on stdin and prints the compiled query plan.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    // Load config
    let config = Config::from_env().context("Failed to load config")?;
    let site = SiteConfig::load_optional(config.site_config_path.as_deref())
        .context("Failed to load site config")?;

    info!(
        service = %config.service.service_name,
        suggested_tags = site.suggested_tags.len(),
        modifiers = site.global_score_modifiers.len(),
        "Starting plan compiler"
    );

    let inflation = KarmaInflationHandle::default();
    if let Some(path) = &config.inflation.series_path {
        let source = FileInflationSource::new(path);
        if let Err(e) = refresh_inflation_series(&inflation, &source).await {
            warn!(error = %e, path = %path.display(), "Using neutral karma inflation series");
        }
    }

    let resolver = ViewResolver::new(site, config.feed, &config.decay, inflation);

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read view terms from stdin")?;
    let terms: ViewTerms = if input.trim().is_empty() {
        ViewTerms::default()
    } else {
        serde_json::from_str(&input).context("Invalid view terms")?
    };

    let plan = resolver.compile_request(&terms, Utc::now());
    println!("{}", serde_json::to_string_pretty(&plan)?);

    Ok(())
}
