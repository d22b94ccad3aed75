//! Subcommand dispatch shared by the binary and its tests.

use std::env;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use log::info;

use crate::alert::{AudioAlert, CommandPlayer};
use crate::api::ApiClient;
use crate::camera::open_camera;
use crate::classifier::{Classifier, RemoteClassifier};
use crate::cli::{AppArgs, Command};
use crate::config::{MonitorConfig, Settings};
use crate::evaluation::{Evaluation, ppe_target};
use crate::monitor::Monitor;
use crate::preview::{PreviewOptions, run_preview};

pub fn run(args: AppArgs) -> Result<()> {
    run_with_env(args, |key| env::var(key).ok())
}

/// Runs one subcommand, reading environment variables through `lookup`.
pub fn run_with_env<F>(args: AppArgs, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let config_path = args.config.as_deref();

    match args.command {
        Command::Monitor {
            audio,
            wait,
            camera,
            backend,
        } => {
            // A bad sound file ends the run cleanly before settings are read.
            let alert = match AudioAlert::new(&audio) {
                Ok(alert) => alert,
                Err(err) => {
                    println!("\n{err}");
                    return Ok(());
                }
            };

            let settings = Settings::load_with(config_path, lookup)?;
            let classifier = remote_classifier(&settings)?;
            let target = settings.target("ppe").cloned().unwrap_or_else(ppe_target);
            let detector = classifier
                .get_or_create_detector(&target.detector)
                .context("failed to resolve the PPE detector")?;

            let camera = open_camera(backend, camera.or(settings.camera.clone()))?;
            let player = CommandPlayer::system_default();
            let stop = AtomicBool::new(false);

            Monitor::new(
                camera.as_ref(),
                &classifier,
                &player,
                detector,
                alert,
                target.query_options(),
                Duration::from_secs(wait),
            )
            .run(&stop);
            Ok(())
        }
        Command::Evaluate {
            evaluation,
            target,
            pattern,
        } => {
            let settings = Settings::load_with(config_path, lookup)?;
            let target = settings.target(&target).cloned().ok_or_else(|| {
                let known: Vec<&str> = settings.targets.keys().map(String::as_str).collect();
                anyhow!("unknown target `{target}` (known: {})", known.join(", "))
            })?;

            let classifier = remote_classifier(&settings)?;
            let detector = classifier
                .get_or_create_detector(&target.detector)
                .with_context(|| format!("failed to resolve detector `{}`", target.detector.name))?;

            let dir = target.directory(evaluation);
            let pattern = pattern.unwrap_or_else(|| target.pattern.clone());
            Evaluation::new(&classifier, &detector, target.query_options())
                .run_directory(dir, &pattern)
                .with_context(|| format!("failed to list images in {}", dir.display()))?;
            Ok(())
        }
        Command::Preview {
            camera,
            backend,
            output,
            frames,
            interval_ms,
        } => {
            let file = MonitorConfig::load(config_path)?;
            let camera = open_camera(backend, camera.or(file.camera))?;
            let options = PreviewOptions {
                output,
                frames,
                interval: Duration::from_millis(interval_ms),
            };
            let stats = run_preview(camera.as_ref(), &options, &AtomicBool::new(false))?;
            info!(
                "Preview finished: {} captured, {} failed",
                stats.captured, stats.failed
            );
            Ok(())
        }
    }
}

fn remote_classifier(settings: &Settings) -> Result<RemoteClassifier> {
    let api = ApiClient::new(&settings.api_url, &settings.api_token)?;
    info!("Using Groundlight endpoint {}", api.base_url());
    Ok(RemoteClassifier::new(api))
}
