use anyhow::Context;
use clap::{Parser, Subcommand};
use forecast_core::{Config, ForecastMode, ForecastTask};
use inquire::{Password, PasswordDisplayMode};
use tracing::info;

use crate::render::Printer;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "forecast", version, about = "Weather forecast CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the weather service API key in the config file.
    Configure,

    /// Show the forecast for a zip code.
    Show {
        /// Zip or postal code.
        zipcode: String,

        /// Show the next five days instead of current conditions.
        #[arg(long)]
        five_day: bool,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { zipcode, five_day, json } => {
                let mode = if five_day { ForecastMode::FiveDay } else { ForecastMode::SingleDay };
                show(&zipcode, mode, json).await
            }
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    config.set_api_key(api_key.trim().to_string());
    config.save()?;

    info!(path = %Config::config_file_path()?.display(), "configuration saved");
    Ok(())
}

async fn show(zipcode: &str, mode: ForecastMode, json: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    if config.api_key().is_none() {
        info!("no API key configured; hint: run `forecast configure` or set FORECAST_API_KEY");
    }

    let (task, mut queue) = ForecastTask::new(&config);
    task.start(zipcode, mode);
    drop(task);

    let mut printer = Printer::new(zipcode, json);
    while queue.dispatch_next(&mut printer).await.is_some() {}

    print!("{}", printer.into_output()?);
    Ok(())
}
