//! Read a saved share-page snapshot from stdin and print its Markdown.
//!
//! Usage: `extract-snapshot [--html PATH] [--json] [--selector CSS] [--title TEXT] <share-url> < page.html`
//!
//! The URL only selects the provider; nothing is fetched.

use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use share_scribe::{extract_snapshot, render_document, ScrapeOptions};
use tracing_subscriber::EnvFilter;

const USAGE: &str =
    "usage: extract-snapshot [--html PATH] [--json] [--selector CSS] [--title TEXT] <share-url> < page.html";

#[derive(Debug, Default)]
struct Args {
    url: Option<String>,
    html: Option<PathBuf>,
    json: bool,
    help: bool,
}

fn parse_args(
    argv: impl IntoIterator<Item = String>,
    options: &mut ScrapeOptions,
) -> Result<Args, String> {
    let mut args = Args::default();
    let mut argv = argv.into_iter();
    while let Some(arg) = argv.next() {
        let mut value = |flag: &str| argv.next().ok_or_else(|| format!("{flag} needs a value"));
        match arg.as_str() {
            "--html" => args.html = Some(PathBuf::from(value("--html")?)),
            "--json" => args.json = true,
            "--selector" => options.override_selector = Some(value("--selector")?),
            "--title" => options.title_override = Some(value("--title")?),
            "-h" | "--help" => args.help = true,
            flag if flag.starts_with("--") => return Err(format!("unknown option {flag}\n{USAGE}")),
            url => args.url = Some(url.to_string()),
        }
    }
    Ok(args)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let mut options = ScrapeOptions::default();
    let args = match parse_args(env::args().skip(1), &mut options) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };
    if args.help {
        eprintln!("{USAGE}");
        return ExitCode::SUCCESS;
    }
    let Some(url) = args.url else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };

    // Read HTML from stdin
    let mut html = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut html) {
        eprintln!("error: failed to read stdin: {e}");
        return ExitCode::FAILURE;
    }

    let export = match extract_snapshot(&html, &url, &options) {
        Ok(export) => export,
        Err(e) => {
            eprintln!("error: {e}\nhint: {}", e.hint());
            return ExitCode::FAILURE;
        }
    };

    if let Some(path) = &args.html {
        let rendered = render_document(&export.result, &url);
        if let Err(e) = fs::write(path, rendered.html) {
            eprintln!("error: cannot write {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
    }

    if args.json {
        match serde_json::to_string_pretty(&export) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("error: cannot serialize export: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", export.markdown);
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> (Result<Args, String>, ScrapeOptions) {
        let mut options = ScrapeOptions::default();
        let args = parse_args(argv.iter().map(|a| (*a).to_string()), &mut options);
        (args, options)
    }

    #[test]
    fn test_flags_and_url() {
        let (args, options) = parse(&["--selector", "section.turn", "--json", "https://claude.ai/share/x"]);
        let args = args.unwrap_or_default();

        assert_eq!(args.url.as_deref(), Some("https://claude.ai/share/x"));
        assert!(args.json);
        assert_eq!(options.override_selector.as_deref(), Some("section.turn"));
    }

    #[test]
    fn test_flag_without_value_is_an_error() {
        for flag in ["--html", "--selector", "--title"] {
            let (args, options) = parse(&["https://chatgpt.com/share/x", flag]);
            assert_eq!(args.err(), Some(format!("{flag} needs a value")));
            assert!(options.override_selector.is_none());
            assert!(options.title_override.is_none());
        }
    }

    #[test]
    fn test_unknown_flag_is_not_taken_as_url() {
        let (args, _) = parse(&["--verbose", "https://chatgpt.com/share/x"]);
        assert!(args.is_err_and(|e| e.starts_with("unknown option --verbose")));
    }
}
