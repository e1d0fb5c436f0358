use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fetchscribe::cli::{Cli, Commands};
use fetchscribe::config::Config;
use fetchscribe::extractors::{content_id_from_input, youtube::YtDlpEngine};
use fetchscribe::fetch::FetchPipeline;
use fetchscribe::transcribe::{sarvam::SarvamClient, TranscriptionPipeline};
use fetchscribe::{utils, FetchscribeError};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose { "fetchscribe=debug" } else { "fetchscribe=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::load().await?;

    match cli.command {
        Commands::Fetch { ids, output, mode } => {
            // Non-fatal: the tools may live outside PATH checks (e.g. in containers)
            let missing_deps = utils::check_dependencies(&config.fetch.yt_dlp_path).await;
            if !missing_deps.is_empty() {
                eprintln!("⚠️  Dependency check warnings:");
                for dep in missing_deps {
                    eprintln!("   • {}", dep);
                }
                eprintln!("   (Continuing anyway - tools may be available)");
            }

            let engine = YtDlpEngine::with_path(config.fetch.yt_dlp_path.clone());
            let pipeline = FetchPipeline::new(config, Box::new(engine))?.with_progress(!cli.quiet);

            let mut content_ids = Vec::with_capacity(ids.len());
            let mut failures = 0usize;
            for input in &ids {
                match content_id_from_input(input) {
                    Ok(id) => content_ids.push(id),
                    Err(e) => {
                        tracing::error!("{:#}", e);
                        println!("✗ {}", input);
                        failures += 1;
                    }
                }
            }

            tracing::info!("Staging directory: {}", pipeline.staging_dir().display());

            for (id, ok) in pipeline.process_batch(&content_ids, &output, mode).await {
                if ok {
                    println!("✓ {} -> {}", id, output.join(&id).display());
                } else {
                    println!("✗ {}", id);
                    failures += 1;
                }
            }

            if failures > 0 {
                anyhow::bail!("{} of {} items failed", failures, ids.len());
            }
        }
        Commands::Transcribe {
            files,
            language,
            model,
            output_dir,
            api_key,
        } => {
            if api_key.is_some() {
                config.transcription.api_key = api_key;
            }

            let client = SarvamClient::from_config(&config, !cli.quiet)?;
            let mut pipeline = TranscriptionPipeline::new(&config, Box::new(client));
            if let Some(language) = language {
                pipeline = pipeline.with_language(language);
            }
            if let Some(model) = model {
                pipeline = pipeline.with_model(model);
            }
            if let Some(output_dir) = output_dir {
                pipeline = pipeline.with_output_dir(output_dir);
            }

            let outcome = pipeline.run(&files).await?;

            if outcome.is_failed() {
                return Err(FetchscribeError::JobFailed {
                    job_id: outcome.job_id,
                    reason: outcome
                        .error_message
                        .unwrap_or_else(|| "no reason given".to_string()),
                }
                .into());
            }

            if let Some(dir) = &outcome.output_dir {
                println!(
                    "{} output files saved to: {} (job {} finished {})",
                    outcome.downloaded.len(),
                    dir.display(),
                    outcome.job_id,
                    outcome.completed_at.format("%Y-%m-%d %H:%M:%S UTC")
                );
            }
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                println!("Edit the config file to change settings:");
                println!("  {}", Config::config_path()?.display());
            }
        }
    }

    Ok(())
}
