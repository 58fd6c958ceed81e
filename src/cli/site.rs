//! Site build commands: `playbook`, `build` and `dev`

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use super::output::Output;
use super::watch::{self, WatchEvent};
use crate::storage::{Config, DevPlaybook, PlaybookOptions, SiteConfig};

#[derive(Args, Clone)]
pub struct SiteArgs {
    /// Site playbook used as the template
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Use this playbook as-is instead of generating one
    #[arg(short, long)]
    pub playbook: Option<PathBuf>,

    /// Local clone for the content sources (repeatable, assigned round-robin)
    #[arg(short, long = "dir")]
    pub dirs: Vec<PathBuf>,

    /// Output directory of the generated site
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Keep the generated playbook on exit
    #[arg(short, long)]
    pub keep: bool,
}

impl SiteArgs {
    fn playbook_options(&self) -> PlaybookOptions {
        PlaybookOptions {
            source: self.source.clone(),
            playbook: self.playbook.clone(),
            dirs: self.dirs.clone(),
            output: self.output.clone(),
            keep: self.keep,
        }
    }
}

/// Writes the local-dev playbook and leaves it in place
pub fn playbook(args: SiteArgs, config: &Config, output: &Output) -> Result<()> {
    let mut options = args.playbook_options();
    options.keep = true;

    let dev = DevPlaybook::prepare(&options, &config.site)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "playbook": dev.path().display().to_string(),
            "title": dev.playbook().title(),
            "sources": dev.playbook().content.sources.iter().map(|s| s.url.as_str()).collect::<Vec<_>>(),
            "output": dev.playbook().output.dir,
        }));
    } else {
        output.success(&format!("Wrote playbook {}", dev.path().display()));
    }
    Ok(())
}

/// Generates the site once
pub fn build(args: SiteArgs, config: &Config, output: &Output) -> Result<()> {
    let dev = DevPlaybook::prepare(&args.playbook_options(), &config.site)?;
    let started = Instant::now();

    run_generator(&config.site, &dev)?;

    let elapsed = started.elapsed();
    if output.is_json() {
        output.data(&serde_json::json!({
            "playbook": dev.path().display().to_string(),
            "output": dev.playbook().output.dir,
            "playbook_removed": dev.is_temporary(),
            "elapsed_ms": elapsed.as_millis() as u64,
        }));
    } else {
        output.success(&format!(
            "Built {} in {:.1}s",
            dev.playbook().title(),
            elapsed.as_secs_f64()
        ));
    }
    Ok(())
}

/// Generates the site, then rebuilds whenever sources or the playbook change
pub fn dev(args: SiteArgs, config: &Config, output: &Output) -> Result<()> {
    let mut dev = DevPlaybook::prepare(&args.playbook_options(), &config.site)?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))
            .context("Failed to install Ctrl+C handler")?;
    }

    rebuild(&config.site, &dev, output);

    let mut roots = dev.playbook().local_source_dirs();
    roots.push(dev.path().to_path_buf());
    let playbook_dir = dev
        .path()
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let ignore: Vec<PathBuf> = dev
        .playbook()
        .output
        .dir
        .iter()
        .map(|dir| playbook_dir.join(dir))
        .collect();

    output.success(&format!(
        "Watching {} path(s) for {}. Press Ctrl+C to stop.",
        roots.len(),
        dev.playbook().title()
    ));

    let debounce = Duration::from_millis(config.site.debounce_ms);
    watch::watch(&roots, &ignore, debounce, &stop, |event| {
        match event {
            WatchEvent::Changed(paths) => {
                info!(count = paths.len(), "change detected");
                if watch::contains_path(&paths, dev.path()) {
                    if let Err(e) = dev.reload() {
                        warn!("{}", e);
                    }
                }
                rebuild(&config.site, &dev, output);
            }
            WatchEvent::Error(message) => warn!("watch error: {}", message),
        }
    })?;

    output.success("Stopped watching");
    Ok(())
}

/// Builds and reports, without stopping dev mode on failure
fn rebuild(site: &SiteConfig, dev: &DevPlaybook, output: &Output) {
    let started = Instant::now();
    match run_generator(site, dev) {
        Ok(()) => output.success(&format!("Rebuilt in {:.1}s", started.elapsed().as_secs_f64())),
        Err(e) => output.error(&format!("{:#}", e)),
    }
}

fn run_generator(site: &SiteConfig, dev: &DevPlaybook) -> Result<()> {
    let (program, args) = site
        .generator
        .split_first()
        .context("No site generator configured")?;

    info!(generator = %program, playbook = %dev.path().display(), "running site generator");

    let status = Command::new(program)
        .args(args)
        .arg("--playbook")
        .arg(dev.path())
        .status()
        .with_context(|| format!("Failed to run site generator '{}'", program))?;

    if !status.success() {
        anyhow::bail!("Site generator exited with {}", status);
    }
    Ok(())
}
