use std::path::PathBuf;

use anyhow::{Context, Result};
use hostbridge::{HostConfig, PageRuntime};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: hostbridge <file.html> [--dump-dom]";

fn main() {
    if let Err(err) = run() {
        eprintln!("hostbridge: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut input: Option<PathBuf> = None;
    let mut dump_dom = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--dump-dom" => dump_dom = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                return Ok(());
            }
            _ if input.is_none() => input = Some(PathBuf::from(arg)),
            _ => anyhow::bail!("unexpected argument '{arg}'\n{USAGE}"),
        }
    }
    let input = input.context(USAGE)?;

    let config = HostConfig::from_env().context("failed to load host configuration")?;
    init_tracing(config.log_filter.as_deref());

    let html = std::fs::read_to_string(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let mut page = PageRuntime::load(&html, &config)?;
    let summary = page.run()?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    if dump_dom {
        println!("{}", page.window().document_html()?);
    }
    Ok(())
}

fn init_tracing(log_filter: Option<&str>) {
    let filter = match log_filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let subscriber_result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    if subscriber_result.is_err() {
        // tracing was already initialised; continue silently
    }
}
