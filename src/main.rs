//! # Quire CLI
//!
//! Usage:
//!   quire input.html -o output.pdf
//!   quire input.html -c print.css -c extra.css --config options.json
//!   cat input.html | quire -o output.pdf

use std::env;
use std::fs;
use std::io::{self, Read};

use anyhow::{Context, Result};
use quire::layout::RenderOptions;

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}

#[derive(Debug, Default)]
struct Args {
    input: Option<String>,
    stylesheets: Vec<String>,
    config: Option<String>,
    output: Option<String>,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut parsed = Args::default();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .with_context(|| format!("{flag} needs a value"))
        };
        match arg.as_str() {
            "-c" | "--css" => parsed.stylesheets.push(value("-c")?),
            "--config" => parsed.config = Some(value("--config")?),
            "-o" | "--output" => parsed.output = Some(value("-o")?),
            flag if flag.starts_with('-') => anyhow::bail!("unknown option {flag}"),
            path => parsed.input = Some(path.to_string()),
        }
    }
    Ok(parsed)
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let args = parse_args(&args)?;

    let html = match &args.input {
        Some(path) => fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };

    let mut stylesheets = Vec::with_capacity(args.stylesheets.len());
    for path in &args.stylesheets {
        stylesheets.push(fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?);
    }
    let css: Vec<&str> = stylesheets.iter().map(String::as_str).collect();

    let options = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
            RenderOptions::from_json(&json).with_context(|| format!("invalid options in {path}"))?
        }
        None => RenderOptions::default(),
    };

    let output_path = args.output.unwrap_or_else(|| "output.pdf".to_string());
    let pdf_bytes = quire::render_html(&html, &css, &options).context("failed to render document")?;
    fs::write(&output_path, &pdf_bytes).with_context(|| format!("failed to write {output_path}"))?;
    eprintln!("✓ Written {} bytes to {}", pdf_bytes.len(), output_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn flags_and_input() {
        let parsed = parse_args(&args(&["quire", "in.html", "-c", "a.css", "-c", "b.css", "-o", "out.pdf"])).unwrap();
        assert_eq!(parsed.input.as_deref(), Some("in.html"));
        assert_eq!(parsed.stylesheets, vec!["a.css", "b.css"]);
        assert_eq!(parsed.output.as_deref(), Some("out.pdf"));
        assert!(parsed.config.is_none());
    }

    #[test]
    fn missing_value_and_unknown_flag() {
        assert!(parse_args(&args(&["quire", "-o"])).is_err());
        assert!(parse_args(&args(&["quire", "--fast"])).is_err());
    }
}
