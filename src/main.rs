use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use wxproxy_core::Config;
use wxproxy_weather::WeatherLookupCache;

/// Look up current weather for one or more cities through the cache
#[derive(Parser, Debug)]
#[command(name = "wxproxy", version, about = "Cached city-weather lookup")]
struct Cli {
    /// Configuration file (default: <config dir>/wxproxy/config.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Cities to look up, in order. Repeating a city is served from the cache.
    #[arg(required = true, value_name = "CITY")]
    cities: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    wxproxy_core::init()?;

    let (config, _) =
        Config::load_validated(cli.config.as_deref()).context("Failed to load configuration")?;

    let lookup = WeatherLookupCache::from_config(&config.weather)
        .context("Failed to create weather client")?;

    let mut failed = false;
    for city in &cli.cities {
        match lookup.lookup(city).await {
            Ok(result) => println!("{}", serde_json::to_string_pretty(&result)?),
            Err(e) => {
                tracing::error!("Lookup for '{}' failed: {}", city, e);
                eprintln!("{} ({}): {}", city, e.status_code(), e.user_message());
                failed = true;
            }
        }
    }

    let stats = lookup.stats();
    tracing::info!(
        "Cache holds {} of {} entries",
        stats.entries,
        stats.max_entries
    );

    if failed {
        anyhow::bail!("One or more lookups failed");
    }
    Ok(())
}
