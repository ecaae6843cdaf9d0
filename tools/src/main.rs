use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use demo::DemoConfig;
use glob::Pattern;
use tools::{apply_assignments, format_report, inspect_demo, parse_assignment, DemoReport};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "snapdelta-tools",
    version,
    about = "snapdelta demo inspection and maintenance tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a demo's metadata and per-record sizes.
    Inspect {
        /// Demo file, or a directory of demos.
        path: PathBuf,
        /// Optional schema JSON; frames are checked against its hash.
        #[arg(long)]
        schema: Option<PathBuf>,
        /// Glob filter when inspecting a directory.
        #[arg(long)]
        glob: Option<String>,
        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Rewrite a demo's metadata in place.
    SetMeta {
        /// Demo file.
        path: PathBuf,
        /// `key=value` pairs; an empty value removes the key.
        #[arg(required = true, value_parser = parse_assignment)]
        assignments: Vec<(String, String)>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = DemoConfig::default();
    match cli.command {
        Command::Inspect {
            path,
            schema,
            glob,
            json,
        } => {
            let hash = schema
                .as_deref()
                .map(load_schema)
                .transpose()
                .context("load schema")?
                .map(|schema| schema::schema_hash(&schema));
            let paths = if path.is_dir() {
                collect_demo_paths(&path, glob.as_deref())?
            } else {
                vec![path]
            };
            for path in paths {
                let file = File::open(&path)
                    .with_context(|| format!("open demo {}", path.display()))?;
                let report = inspect_demo(BufReader::new(file), &config, hash)
                    .with_context(|| format!("inspect demo {}", path.display()))?;
                print_report(&path, &report, json)?;
            }
        }
        Command::SetMeta { path, assignments } => {
            let mut metadata = demo::read_metadata(&path, &config)
                .with_context(|| format!("read metadata {}", path.display()))?;
            apply_assignments(&mut metadata, &assignments).context("apply metadata")?;
            demo::rewrite_metadata(&path, &metadata, &config)
                .with_context(|| format!("rewrite metadata {}", path.display()))?;
            println!("{}: {} metadata entries", path.display(), metadata.len());
        }
    }
    Ok(())
}

fn print_report(path: &Path, report: &DemoReport, json: bool) -> Result<()> {
    if json {
        let value = serde_json::json!({
            "path": path.display().to_string(),
            "report": report,
        });
        let json = serde_json::to_string_pretty(&value).context("serialize json")?;
        println!("{json}");
    } else {
        println!("== {} ==", path.display());
        print!("{}", format_report(report));
    }
    Ok(())
}

fn load_schema(path: &Path) -> Result<schema::Schema> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read schema {}", path.display()))?;
    let schema: schema::Schema = serde_json::from_str(&contents).context("parse schema json")?;
    schema.validate().context("schema validation failed")?;
    Ok(schema)
}

fn collect_demo_paths(dir: &Path, glob: Option<&str>) -> Result<Vec<PathBuf>> {
    let pattern = glob
        .map(Pattern::new)
        .transpose()
        .context("invalid glob pattern")?;

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(pattern) = &pattern {
            let matches_path = pattern.matches_path(&path);
            let matches_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| pattern.matches(name));
            if !matches_path && !matches_name {
                continue;
            }
        }
        paths.push(path);
    }
    paths.sort();
    Ok(paths)
}
