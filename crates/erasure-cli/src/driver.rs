//! Subcommand implementations. Each run decodes into a fresh interner.

use crate::args::{CliArgs, Command};
use anyhow::{Context, Result};
use erasure_expr::codec;
use erasure_expr::{EntityTypeSubstitutor, Expr, SubstitutorOptions, find_entity_types};
use erasure_types::{RegistryTypeFactory, TypeInterner};
use serde::Serialize;
use serde_json::Value as Json;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Output of `erasure analyze`.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    pub entities: Vec<String>,
    pub enums: Vec<String>,
}

pub fn run(args: &CliArgs, out: &mut dyn Write) -> Result<()> {
    match &args.command {
        Command::Analyze { file } => {
            let report = analyze(file)?;
            let text = serde_json::to_string_pretty(&report)?;
            writeln!(out, "{text}")?;
        }
        Command::Rewrite {
            file,
            options,
            compact,
        } => {
            let options = match options {
                Some(text) => SubstitutorOptions::from_json(text)
                    .context("invalid --options")?,
                None => SubstitutorOptions::default(),
            };
            let document = rewrite(file, options)?;
            let text = if *compact {
                serde_json::to_string(&document)?
            } else {
                serde_json::to_string_pretty(&document)?
            };
            writeln!(out, "{text}")?;
        }
    }
    Ok(())
}

fn load(interner: &TypeInterner, path: &Path) -> Result<Expr> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let document: Json = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    let expr = codec::deserialize(interner, &document)
        .with_context(|| format!("failed to decode {}", path.display()))?;
    Ok(expr)
}

pub fn analyze(path: &Path) -> Result<AnalysisReport> {
    let interner = TypeInterner::new();
    let expr = load(&interner, path)?;
    let found = find_entity_types(&interner, &expr);
    info!(
        entities = found.entities.len(),
        enums = found.enums.len(),
        "analyzed {}",
        path.display()
    );
    Ok(AnalysisReport {
        entities: found.entities.iter().map(|&ty| interner.type_name(ty)).collect(),
        enums: found.enums.iter().map(|&ty| interner.type_name(ty)).collect(),
    })
}

pub fn rewrite(path: &Path, options: SubstitutorOptions) -> Result<Json> {
    let interner = TypeInterner::new();
    let factory = RegistryTypeFactory::new();
    let expr = load(&interner, path)?;
    let rewritten = EntityTypeSubstitutor::with_options(&interner, &factory, options)
        .apply(&expr)
        .with_context(|| format!("failed to rewrite {}", path.display()))?;
    info!(generated = factory.len(), "rewrote {}", path.display());
    Ok(codec::serialize(&interner, &rewritten)?)
}
