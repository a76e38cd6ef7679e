use crate::annotator::Annotator;
use crate::config::load_config;
use crate::job::{AnnotationJob, SourceMetadata};
use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pdfco", version, about = "Annotate PDF evidence with margin callouts")]
pub struct Args {
    /// Input PDF files
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Job spec JSON (quotes, metadata, criterion)
    #[arg(short = 'j', long = "job")]
    pub job: PathBuf,

    /// Output file (single input) or directory
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config JSON file overriding layout and theme defaults
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,
}

/// On-disk job description. Document bytes come from the input files.
#[derive(Debug, Deserialize)]
struct JobSpec {
    #[serde(default)]
    quotes: Vec<String>,
    #[serde(default)]
    metadata: SourceMetadata,
    criterion: String,
}

pub fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let spec: JobSpec = serde_json::from_str(
        &std::fs::read_to_string(&args.job)
            .with_context(|| format!("reading job spec {}", args.job.display()))?,
    )
    .context("parsing job spec")?;

    let annotator = Annotator::new(config);
    let total = args.inputs.len();
    let mut annotated = 0usize;

    // One bad document must not sink the batch.
    for input in &args.inputs {
        match annotate_one(&annotator, &spec, input, args.output.as_deref(), total) {
            Ok(output) => {
                tracing::info!(input = %input.display(), output = %output.display(), "annotated");
                annotated += 1;
            }
            Err(err) => {
                tracing::error!(input = %input.display(), "annotation failed: {err:#}");
            }
        }
    }

    println!("annotated {annotated} of {total}");
    if annotated == 0 && total > 0 {
        anyhow::bail!("no documents could be annotated");
    }
    Ok(())
}

fn annotate_one(
    annotator: &Annotator,
    spec: &JobSpec,
    input: &Path,
    output: Option<&Path>,
    total: usize,
) -> Result<PathBuf> {
    let document = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let job = AnnotationJob {
        document,
        quotes: spec.quotes.clone(),
        metadata: spec.metadata.clone(),
        criterion: spec.criterion.clone(),
    };
    let annotated = annotator.annotate(&job)?;
    let path = output_path(input, output, total)?;
    std::fs::write(&path, annotated.bytes)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

fn output_path(input: &Path, output: Option<&Path>, total: usize) -> Result<PathBuf> {
    let default_name = || {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document");
        format!("{stem}.annotated.pdf")
    };
    match output {
        Some(path) if total == 1 && !path.is_dir() => Ok(path.to_path_buf()),
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
            Ok(dir.join(default_name()))
        }
        None => Ok(input.with_file_name(default_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_spec_parses_with_defaults() {
        let spec: JobSpec = serde_json::from_str(r#"{"criterion": "awards"}"#).expect("parse");
        assert!(spec.quotes.is_empty());
        assert!(spec.metadata.venue.is_none());
        assert_eq!(spec.criterion, "awards");
    }

    #[test]
    fn single_input_writes_to_named_output() {
        let path = output_path(
            Path::new("in/doc.pdf"),
            Some(Path::new("out.pdf")),
            1,
        )
        .expect("path");
        assert_eq!(path, PathBuf::from("out.pdf"));
    }

    #[test]
    fn missing_output_lands_next_to_input() {
        let path = output_path(Path::new("in/doc.pdf"), None, 3).expect("path");
        assert_eq!(path, PathBuf::from("in/doc.annotated.pdf"));
    }
}
