use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use domshim::host::HostCall;
use domshim::{HtmlHost, RecordingHost, ScriptEnvironment, ShimConfig};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: domshim <page.html> <script.js> [--calls]";

#[derive(Serialize)]
struct RunReport {
    html: String,
    calls: Vec<HostCall>,
}

fn main() {
    let config = ShimConfig::from_env().unwrap_or_else(|err| {
        eprintln!("Failed to load shim configuration: {err}. Using defaults.");
        ShimConfig::default()
    });

    let subscriber_result = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    if subscriber_result.is_err() {
        // tracing was already initialised; continue silently
    }

    if let Err(err) = run(&config) {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run(config: &ShimConfig) -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut print_calls = false;
    for flag in args.iter().filter(|arg| arg.starts_with("--")) {
        match flag.as_str() {
            "--calls" => print_calls = true,
            other => bail!("unknown option `{other}`\n{USAGE}"),
        }
    }
    let paths: Vec<&String> = args.iter().filter(|arg| !arg.starts_with("--")).collect();
    let [page, script] = paths.as_slice() else {
        bail!(USAGE);
    };

    let html = fs::read_to_string(page).with_context(|| format!("failed to read {page}"))?;
    let source =
        fs::read_to_string(script).with_context(|| format!("failed to read {script}"))?;

    let page_host = Rc::new(HtmlHost::new(&html));
    let recorder = Rc::new(RecordingHost::new(page_host.clone()));
    let environment = ScriptEnvironment::new(recorder.clone(), config)
        .context("failed to initialize QuickJS environment")?;

    let filename = Path::new(script.as_str())
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(script.as_str());
    environment.eval(&source, filename)?;
    info!(calls = recorder.calls().len(), "script finished");

    if config.echo_console {
        for message in page_host.console_messages() {
            eprintln!("{message}");
        }
    }
    if print_calls {
        let report = RunReport {
            html: page_host.to_html(),
            calls: recorder.take_calls(),
        };
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!("{}", page_host.to_html());
    }
    Ok(())
}
