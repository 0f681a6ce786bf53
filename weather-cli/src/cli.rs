use anyhow::anyhow;
use clap::{Parser, Subcommand};
use inquire::{Password, Select, Text};
use std::path::PathBuf;
use weather_core::{
    CacheStore, CityKey, Config, ProviderId, WeatherError, WeatherService, WeatherSummary,
    fetcher_from_config,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Current weather for a city, cached locally")]
pub struct Cli {
    /// Log cache and network activity to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also append log output to this file.
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Directory holding cached responses.
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// How long a cached response stays usable, in seconds.
    #[arg(long, global = true)]
    pub ttl_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store API credentials in the config file.
    Configure,

    /// Show current weather for a city.
    Show {
        /// City name; prompted for when omitted.
        city: Option<String>,
    },

    /// Inspect the local cache.
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Print where the cached response for a city is stored.
    Path { city: String },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load()?;
        if let Some(dir) = self.cache_dir {
            config.cache.dir = Some(dir);
        }
        if let Some(ttl) = self.ttl_secs {
            config.cache.ttl_secs = ttl;
        }

        match self.command {
            Command::Configure => configure(config),
            Command::Show { city } => {
                let city = match city {
                    Some(city) => city,
                    None => Text::new("Enter a city name:").prompt()?,
                };
                show(&config, &city).await
            }
            Command::Cache { action } => match action {
                CacheCommand::Path { city } => {
                    let key = CityKey::parse(&city).map_err(user_error)?;
                    println!("{}", cache_store(&config).path_for(&key).display());
                    Ok(())
                }
            },
        }
    }
}

fn user_error(err: WeatherError) -> anyhow::Error {
    anyhow!(err.user_message())
}

fn cache_store(config: &Config) -> CacheStore {
    CacheStore::new(config.cache_dir(), config.cache_ttl())
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let provider = Select::new("Provider:", ProviderId::all().to_vec()).prompt()?;

    let api_key = Password::new("API key:").without_confirmation().prompt()?;

    let default_url = config
        .base_url
        .clone()
        .unwrap_or_else(|| provider.default_base_url().to_string());
    let base_url = Text::new("Base URL:").with_default(&default_url).prompt()?;

    config.set_provider(provider);
    config.set_api_key(api_key);
    config.set_base_url(base_url);
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn show(config: &Config, city: &str) -> anyhow::Result<()> {
    let service = WeatherService::new(cache_store(config), fetcher_from_config(config)?);

    let payload = service.get_weather(city).await.map_err(user_error)?;

    let key = CityKey::parse(city).map_err(user_error)?;
    let summary = WeatherSummary::from_payload(&payload, &key).map_err(user_error)?;

    println!("{summary}");
    Ok(())
}
