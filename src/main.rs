//! Scrapewise command line
//!
//! One-shot scraping and extraction, or a long-running REST server with the
//! web UI.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use scrapewise::config::Config;
use scrapewise::fetch::FetchMethod;
use scrapewise::handlers::{app_router, AppState};
use scrapewise::llm::OllamaClient;
use scrapewise::service::{ExtractionService, Pipeline, ScrapeOptions, ScrapingService};

/// AI-assisted web scraper
#[derive(Parser, Debug)]
#[command(name = "scrapewise")]
#[command(version)]
#[command(about = "Fetch a page, clean it, and extract information with a local model")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Model to use instead of AI_MODEL
    #[arg(long, global = true)]
    model: Option<String>,

    /// Run the browser headless (true/false) instead of HEADLESS
    #[arg(long, global = true)]
    headless: Option<bool>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape a page and print the cleaned result
    Scrape {
        url: String,
        /// Render with a browser instead of a plain GET
        #[arg(long)]
        browser: bool,
        /// Include links
        #[arg(long)]
        links: bool,
        /// Include images
        #[arg(long)]
        images: bool,
    },
    /// Scrape a page and extract information from it
    Extract {
        url: String,
        instructions: String,
        #[arg(long)]
        browser: bool,
    },
    /// Scrape several pages concurrently
    Batch {
        #[arg(required = true)]
        urls: Vec<String>,
        #[arg(long)]
        browser: bool,
        /// Maximum pages in flight (defaults to MAX_CONCURRENT)
        #[arg(short, long)]
        concurrency: Option<usize>,
    },
    /// Serve the REST API and web UI
    Serve {
        #[arg(short = 'H', long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Serve the web UI on UI_PORT
    Ui {
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print service information and model health
    Info,
}

fn method(browser: bool) -> FetchMethod {
    if browser {
        FetchMethod::Browser
    } else {
        FetchMethod::Http
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn serve(pipeline: Pipeline, config: &Config, host: &str, port: u16) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(pipeline, config.max_concurrent));
    let app = app_router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = Config::from_env().context("invalid configuration")?;
    if let Some(model) = cli.model {
        config.ai_model = model;
    }
    if let Some(headless) = cli.headless {
        config.headless = headless;
    }

    // Logs go to stderr so JSON output stays clean
    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config.log_filter()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let model = Arc::new(OllamaClient::from_config(&config)?);
    let pipeline = Pipeline::new(
        ScrapingService::from_config(&config)?,
        ExtractionService::from_config(model, &config),
    );

    match cli.command {
        Command::Scrape {
            url,
            browser,
            links,
            images,
        } => {
            let options = ScrapeOptions {
                method: method(browser),
                extract_links: links,
                extract_images: images,
            };
            let result = pipeline.scraping().scrape(&url, &options).await;
            print_json(&result)?;
            Ok(exit_code(result.success))
        }
        Command::Extract {
            url,
            instructions,
            browser,
        } => {
            let options = ScrapeOptions::with_method(method(browser));
            let result = pipeline.run(&url, &instructions, &options).await;
            print_json(&result)?;
            Ok(exit_code(result.success))
        }
        Command::Batch {
            urls,
            browser,
            concurrency,
        } => {
            let options = ScrapeOptions::with_method(method(browser));
            let max = concurrency.unwrap_or(config.max_concurrent);
            let results = pipeline.scraping().scrape_many(&urls, &options, max).await;
            print_json(&results)?;
            Ok(exit_code(results.iter().all(|r| r.success)))
        }
        Command::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.api_host.clone());
            let port = port.unwrap_or(config.api_port);
            info!("Starting API server with model {}", config.ai_model);
            serve(pipeline, &config, &host, port).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Ui { port } => {
            let port = port.unwrap_or(config.ui_port);
            info!(
                "Web UI available at http://{}:{}/",
                config.api_host, port
            );
            serve(pipeline, &config, &config.api_host, port).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Info => {
            let info = serde_json::json!({
                "name": scrapewise::NAME,
                "version": scrapewise::VERSION,
                "scraping": pipeline.scraping().info(),
                "extraction": pipeline.extraction().info(),
                "model_health": pipeline.extraction().model_health().await,
            });
            print_json(&info)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
