//! yamlscript command line: load a document, substitute it, print JSON.

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use yamlscript::{load, LoadOptions, Value};

#[derive(Parser)]
#[command(name = "yamlscript")]
#[command(about = "Substitute variables and expressions in a JSON or YAML document")]
#[command(version)]
struct Cli {
    /// Document to load
    path: PathBuf,

    /// Context for `${...}` variables, as a JSON object
    #[arg(long)]
    values: Option<String>,

    /// Override one context value: POINTER=JSON (e.g. `names/0/name="Eve"`)
    #[arg(long = "set", value_name = "POINTER=JSON")]
    overrides: Vec<String>,

    /// File type (json, yaml, yml); inferred from the extension by default
    #[arg(long)]
    file_type: Option<String>,

    /// Print the document without substituting it
    #[arg(long)]
    no_parse: bool,

    /// Pretty-print the output
    #[arg(long)]
    pretty: bool,
}

/// Parse `POINTER=JSON`; a value that is not JSON is taken as a plain string
fn parse_override(raw: &str) -> anyhow::Result<(String, Value)> {
    let (pointer, text) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("override '{}' must have the form POINTER=JSON", raw))?;
    let value = Value::from_json_str(text).unwrap_or_else(|_| Value::from(text));
    Ok((pointer.to_string(), value))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut options = LoadOptions::new().with_parse(!cli.no_parse);
    if let Some(file_type) = cli.file_type {
        options = options.with_file_type(file_type);
    }
    if let Some(values) = &cli.values {
        let context = Value::from_json_str(values).context("--values is not valid JSON")?;
        options = options.with_context(context);
    }
    for raw in &cli.overrides {
        let (pointer, value) = parse_override(raw)?;
        options = options.with_value(pointer, value);
    }

    let document = load(&cli.path, &options)
        .with_context(|| format!("failed to load {}", cli.path.display()))?;

    let output = if cli.pretty {
        document.to_json_string_pretty()?
    } else {
        document.to_json_string()?
    };
    println!("{}", output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_override_json_value() {
        let (pointer, value) = parse_override("a/b=1").unwrap();
        assert_eq!(pointer, "a/b");
        assert_eq!(value, Value::Int(1));

        let (_, value) = parse_override(r#"names/-={"name": "Eve"}"#).unwrap();
        assert_eq!(value, Value::from_json_str(r#"{"name": "Eve"}"#).unwrap());
    }

    #[test]
    fn test_parse_override_plain_string() {
        let (pointer, value) = parse_override("a=hello").unwrap();
        assert_eq!(pointer, "a");
        assert_eq!(value, Value::from("hello"));

        let (_, value) = parse_override("a=x=y").unwrap();
        assert_eq!(value, Value::from("x=y"));
    }

    #[test]
    fn test_parse_override_requires_equals() {
        let err = parse_override("a/b").unwrap_err();
        assert!(err.to_string().contains("POINTER=JSON"));
    }
}
