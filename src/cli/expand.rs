//! `docsh expand`: run shell includes in a single document

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use super::output::Output;
use crate::domain::{Document, DocumentContext, DocumentOrigin};
use crate::include;
use crate::storage::Config;

#[derive(Args)]
pub struct ExpandArgs {
    /// AsciiDoc file to process
    pub file: PathBuf,

    /// Document attribute, NAME=VALUE (repeatable)
    #[arg(short = 'a', long = "attribute", value_name = "NAME=VALUE", value_parser = parse_attribute)]
    pub attributes: Vec<(String, String)>,

    /// Treat the document as coming from this remote repository
    #[arg(long, requires_all = ["component", "branch"])]
    pub remote: Option<String>,

    /// Component name of the remote document
    #[arg(long, requires = "remote")]
    pub component: Option<String>,

    /// Branch or tag of the remote document
    #[arg(long, requires = "remote")]
    pub branch: Option<String>,

    /// Path of the document inside the remote repository
    #[arg(long = "path", requires = "remote")]
    pub relative_path: Option<PathBuf>,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

fn parse_attribute(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        Some(_) => Err(format!("attribute name missing in '{}'", s)),
        None => Ok((s.trim().to_string(), String::new())),
    }
}

pub fn run(args: ExpandArgs, config: &Config, output: &Output) -> Result<()> {
    let source = fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read document: {}", args.file.display()))?;

    let mut doc = args
        .attributes
        .iter()
        .fold(Document::new(origin(&args)), |doc, (name, value)| {
            doc.with_attribute(name, value)
        });

    let registry = include::shell_registry(config);
    let file_name = args.file.display().to_string();
    let text = include::expand(&registry, &mut doc, &source, &file_name);
    let lines = text.lines().count();

    match &args.output {
        Some(path) => write_output(path, &text, output, lines)?,
        None if output.is_json() => {
            output.data(&serde_json::json!({
                "file": file_name,
                "origin": doc.origin().display_name(),
                "lines": lines,
                "content": text,
            }));
        }
        None => print!("{}", text),
    }

    Ok(())
}

fn origin(args: &ExpandArgs) -> DocumentOrigin {
    match (&args.remote, &args.component, &args.branch) {
        (Some(url), Some(component), Some(branch)) => {
            let origin = DocumentOrigin::remote(url, component, branch);
            match &args.relative_path {
                Some(path) => origin.with_relative_path(path),
                None => origin,
            }
        }
        _ => DocumentOrigin::worktree(&args.file),
    }
}

fn write_output(path: &Path, text: &str, output: &Output, lines: usize) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "output": path.display().to_string(),
            "lines": lines,
        }));
    } else {
        output.success(&format!("Wrote {} ({} lines)", path.display(), lines));
    }
    Ok(())
}
