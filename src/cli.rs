//! Command line: compile a declaration file and validate JSON documents
//! against it.
use std::path::{Path as FsPath, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::{Value, json};

use crate::declaration::Declaration;
use crate::report::{FailureKind, ValidationReport};
use crate::schema::Schema;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// validate JSON/NDJSON documents against a declarative schema
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// compile a declaration file and report definition errors
    Check(CheckCmd),
    /// validate documents and print their failures
    Validate(ValidateCmd),
}

#[derive(Args, Debug, Clone)]
struct SchemaSettings {
    /// declaration file (JSON)
    #[arg(long, short)]
    schema: PathBuf,

    /// report only rules that ran and failed, not the ones skipped behind them
    #[arg(long, default_value_t = false)]
    no_hints: bool,

    /// prefix every message with its dotted path
    #[arg(long, default_value_t = false)]
    full_messages: bool,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Human,
    Json,
}

#[derive(clap::Parser, Debug)]
struct CheckCmd {
    #[command(flatten)]
    schema_settings: SchemaSettings,
}

#[derive(clap::Parser, Debug)]
struct ValidateCmd {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// One parsed input document and where it came from.
struct Document {
    source: String,
    value: Value,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl SchemaSettings {
    fn load(&self) -> Result<(Declaration, Schema)> {
        let src = std::fs::read_to_string(&self.schema)
            .with_context(|| format!("failed to read declaration file {}", self.schema.display()))?;
        let mut declaration = Declaration::parse(&src)
            .with_context(|| format!("failed to parse declaration file {}", self.schema.display()))?;
        if self.no_hints {
            declaration.config.hints = false;
        }
        if self.full_messages {
            declaration.config.full_messages = true;
        }
        let schema = declaration
            .compile()
            .with_context(|| format!("failed to compile declaration file {}", self.schema.display()))?;
        Ok((declaration, schema))
    }
}

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let source_paths = resolve_file_path_patterns(&self.input)?;
        let mut documents = Vec::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file {source_path_str}"))?;
            if self.ndjson {
                for (ix, line) in source.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let label = format!("{source_path_str}:{}", ix + 1);
                    let value = serde_json::from_str::<Value>(line)
                        .with_context(|| format!("failed to parse NDJSON line ({label})"))?;
                    documents.push(self.select(label, value)?);
                }
            } else {
                let value = serde_json::from_str::<Value>(&source)
                    .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?;
                documents.push(self.select(source_path_str, value)?);
            }
        }
        tracing::info!(documents = documents.len(), "loaded input documents");
        Ok(documents)
    }

    fn select(&self, source: String, value: Value) -> Result<Document> {
        let Some(pointer) = self.json_pointer.as_deref() else {
            return Ok(Document { source, value });
        };
        let selected = value
            .pointer(pointer)
            .cloned()
            .ok_or_else(|| anyhow!("JSON pointer {pointer} selects nothing in {source}"))?;
        Ok(Document { source, value: selected })
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// `Ok(false)` when at least one document failed validation.
    pub fn run(&self) -> Result<bool> {
        match &self.cmd {
            Command::Check(target) => {
                let (declaration, schema) = target.schema_settings.load()?;
                println!(
                    "{} {} ({} keys, {:?} processor)",
                    "ok".green().bold(),
                    target.schema_settings.schema.display(),
                    schema.root().key_names().len(),
                    declaration.config.processor,
                );
                Ok(true)
            }
            Command::Validate(target) => {
                let (_, schema) = target.schema_settings.load()?;
                let documents = target.input_settings.load_documents()?;
                let reports: Vec<ValidationReport> = documents.par_iter().map(|doc| schema.call(&doc.value)).collect();
                let failed = reports.iter().filter(|r| !r.is_success()).count();
                tracing::info!(documents = reports.len(), failed, "validated documents");

                let rendered = match target.format {
                    OutputFormat::Human => render_human(&documents, &reports),
                    OutputFormat::Json => render_json(&documents, &reports)?,
                };
                match target.out.as_ref() {
                    Some(out) => write_output(out, &rendered)?,
                    None => print!("{rendered}"),
                }
                Ok(failed == 0)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn render_human(documents: &[Document], reports: &[ValidationReport]) -> String {
    let mut out = String::new();
    for (doc, report) in documents.iter().zip(reports) {
        if report.is_success() {
            out.push_str(&format!("{} {}\n", "✓".green(), doc.source));
            continue;
        }
        out.push_str(&format!("{} {}\n", "✗".red().bold(), doc.source));
        for failure in &report.failures {
            let path = if failure.path.is_root() { "(root)".to_string() } else { failure.path.to_string() };
            let line = format!("    {}: {}", path.bold(), failure.message);
            match failure.kind {
                FailureKind::Error => out.push_str(&line),
                FailureKind::Hint => out.push_str(&line.dimmed().to_string()),
            }
            out.push('\n');
        }
    }
    let failed = reports.iter().filter(|r| !r.is_success()).count();
    let summary = format!("{} documents, {} failed", reports.len(), failed);
    if failed == 0 {
        out.push_str(&format!("{}\n", summary.green()));
    } else {
        out.push_str(&format!("{}\n", summary.red()));
    }
    out
}

fn render_json(documents: &[Document], reports: &[ValidationReport]) -> Result<String> {
    let entries = documents
        .iter()
        .zip(reports)
        .map(|(doc, report)| {
            let mut entry = serde_json::to_value(report)?;
            if let Value::Object(map) = &mut entry {
                map.insert("source".to_string(), json!(doc.source));
            }
            Ok(entry)
        })
        .collect::<Result<Vec<_>, serde_json::Error>>()?;
    let mut rendered = serde_json::to_string_pretty(&entries)?;
    rendered.push('\n');
    Ok(rendered)
}

fn write_output(out: &FsPath, contents: &str) -> Result<()> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory {}", parent.display()))?;
    }
    std::fs::write(out, contents).with_context(|| format!("failed to write {}", out.display()))
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // an explicit glob that matched nothing is almost always a typo
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Path;
    use crate::report::Failure;

    fn doc(source: &str) -> Document {
        Document { source: source.to_string(), value: Value::Null }
    }

    #[test]
    fn json_output_tags_each_report_with_its_source() {
        let report = ValidationReport {
            success: false,
            failures: vec![Failure {
                path: Path::from("foo"),
                message: "is missing".into(),
                predicate: "key?".into(),
                kind: FailureKind::Error,
            }],
            output: Some(json!({})),
        };
        let rendered = render_json(&[doc("a.json")], &[report]).unwrap();
        let parsed: Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed[0]["source"], json!("a.json"));
        assert_eq!(parsed[0]["failures"][0]["path"], json!(["foo"]));
    }

    #[test]
    fn human_output_lists_failures_under_their_document() {
        colored::control::set_override(false);
        let ok = ValidationReport { success: true, failures: vec![], output: None };
        let bad = ValidationReport {
            success: false,
            failures: vec![Failure {
                path: Path::from("foo"),
                message: "must be even".into(),
                predicate: "even?".into(),
                kind: FailureKind::Error,
            }],
            output: None,
        };
        let rendered = render_human(&[doc("a.json"), doc("b.json")], &[ok, bad]);
        assert_eq!(rendered, "✓ a.json\n✗ b.json\n    foo: must be even\n2 documents, 1 failed\n");
    }

    #[test]
    fn json_pointer_selects_a_subnode() {
        let settings = InputSettings { ndjson: false, json_pointer: Some("/data/0".into()), input: vec![] };
        let selected = settings.select("x".into(), json!({ "data": [{ "foo": 1 }] })).unwrap();
        assert_eq!(selected.value, json!({ "foo": 1 }));
        assert!(settings.select("y".into(), json!({})).is_err());
    }

    #[test]
    fn literal_paths_pass_through_unglobbed() {
        let paths = resolve_file_path_patterns(["does/not/exist.json"]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("does/not/exist.json")]);
    }
}
