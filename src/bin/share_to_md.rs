//! Scrape a chat share link and print its Markdown.
//!
//! Usage: `share-to-md [options] <share-url>`
//!
//! Options:
//!   --html PATH        also write the standalone HTML page to PATH
//!   --out PATH         write the Markdown to PATH instead of stdout
//!   --json             print the full export (messages, trace) as JSON
//!   --selector CSS     skip discovery and use this selector
//!   --title TEXT       override the document title
//!   --timeout SECS     overall timeout budget
//!   --headful          start with a visible browser
//!   --attach           go straight to attach mode
//!   --no-attach        never escalate to attach mode
//!   --no-scroll        do not scroll before taking the snapshot
//!
//! Logs go to stderr; set `RUST_LOG` to adjust (default `info`).

use std::env;
use std::fs;
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use share_scribe::{render_document, scrape, ScrapeOptions};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Grace period for blocking tasks when the runtime shuts down.
///
/// A terminal prompt that timed out still has a thread parked in
/// `read_line`; it is abandoned rather than joined.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

const USAGE: &str = "usage: share-to-md [--html PATH] [--out PATH] [--json] [--selector CSS] [--title TEXT] [--timeout SECS] [--headful] [--attach] [--no-attach] [--no-scroll] <share-url>";

#[derive(Debug, Default)]
struct Args {
    url: Option<String>,
    html: Option<PathBuf>,
    out: Option<PathBuf>,
    json: bool,
}

fn parse_args(options: &mut ScrapeOptions) -> Result<Args, String> {
    let mut args = Args::default();
    let mut argv = env::args().skip(1);
    while let Some(arg) = argv.next() {
        let mut value = |flag: &str| argv.next().ok_or_else(|| format!("{flag} needs a value"));
        match arg.as_str() {
            "--html" => args.html = Some(PathBuf::from(value("--html")?)),
            "--out" => args.out = Some(PathBuf::from(value("--out")?)),
            "--json" => args.json = true,
            "--selector" => options.override_selector = Some(value("--selector")?),
            "--title" => options.title_override = Some(value("--title")?),
            "--timeout" => {
                let secs = value("--timeout")?
                    .parse::<u64>()
                    .map_err(|e| format!("--timeout: {e}"))?;
                options.timeout = Duration::from_secs(secs);
            }
            "--headful" => options.start_headful = true,
            "--attach" => options.force_attach = true,
            "--no-attach" => options.allow_attach = false,
            "--no-scroll" => options.auto_scroll = false,
            "-h" | "--help" => return Err(USAGE.to_string()),
            flag if flag.starts_with("--") => return Err(format!("unknown option {flag}\n{USAGE}")),
            url => args.url = Some(url.to_string()),
        }
    }
    Ok(args)
}

/// Drive `future` on a fresh runtime and shut it down without waiting on
/// blocking tasks that are still running.
fn block_on_and_release<F: Future>(future: F) -> std::io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let output = runtime.block_on(future);
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    Ok(output)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match block_on_and_release(run()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: cannot start async runtime: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> ExitCode {
    let mut options = ScrapeOptions::from_env();
    let args = match parse_args(&mut options) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };
    let Some(url) = args.url.as_deref() else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };

    let export = match scrape(url, &options).await {
        Ok(export) => export,
        Err(e) => {
            eprintln!("error: {e}\nhint: {}", e.hint());
            return ExitCode::FAILURE;
        }
    };

    if let Some(path) = &args.html {
        let rendered = render_document(&export.result, export.source.url());
        if let Err(e) = fs::write(path, rendered.html) {
            eprintln!("error: cannot write {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
        info!(path = %path.display(), "wrote html");
    }

    let output = if args.json {
        match serde_json::to_string_pretty(&export) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("error: cannot serialize export: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        export.markdown
    };

    match &args.out {
        Some(path) => {
            if let Err(e) = fs::write(path, output) {
                eprintln!("error: cannot write {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
            info!(path = %path.display(), title = %export.title, "wrote markdown");
        }
        None => println!("{output}"),
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_stuck_blocking_read_does_not_hold_exit() {
        let started = Instant::now();
        let output = block_on_and_release(async {
            let stuck = tokio::task::spawn_blocking(|| std::thread::sleep(Duration::from_secs(30)));
            tokio::time::timeout(Duration::from_millis(10), stuck).await.is_err()
        });

        assert!(matches!(output, Ok(true)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
