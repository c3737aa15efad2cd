/* Inspect command - show the functions a header and prefix would intercept */

use super::common::{RuleArgs, load_config};
use anyhow::Context;
use brahma_gen::codegen::gotcha_gen::format_parameter;
use brahma_gen::extract;
use brahma_loader::{CHeaderSource, DeclarationSource};
use brahma_types::{Signature, TypeDescriptor};
use serde_derive::Serialize;
use std::path::PathBuf;

pub struct InspectArgs {
  pub header_path: PathBuf,
  pub prefix: String,
  pub include_dirs: Vec<PathBuf>,
  pub strip_macros: Vec<String>,
  pub defines: Vec<String>,
  pub json: bool,
}

/* JSON shape of the inspect output */
#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct InspectReport<'a> {
  header: &'a std::path::Path,
  prefix: &'a str,
  declaration_count: usize,
  functions: &'a [Signature],
}

/* Execute the inspect command */
pub fn run(args: InspectArgs) -> anyhow::Result<()> {
  let rule_args = RuleArgs {
    header_path: Some(args.header_path),
    prefix: Some(args.prefix),
    ..RuleArgs::default()
  };
  let config = load_config(None, rule_args, args.include_dirs, args.strip_macros, args.defines)?;
  let rule = &config.interfaces[0];

  let declarations = CHeaderSource::for_rule(&config, rule)
    .parse(&rule.header_path)
    .with_context(|| format!("Failed to parse {}", rule.header_path.display()))?;
  let signatures = extract(&declarations, &rule.prefix);

  if args.json {
    let report = InspectReport {
      header: &rule.header_path,
      prefix: &rule.prefix,
      declaration_count: declarations.len(),
      functions: &signatures,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    return Ok(());
  }

  println!(
    "[~] {} declarations, {} functions matching '{}'",
    declarations.len(),
    signatures.len(),
    rule.prefix
  );
  for signature in &signatures {
    print_signature(signature);
  }

  Ok(())
}

fn print_signature(signature: &Signature) {
  println!(
    "\n{} -> {} ({} parameters)",
    signature.name,
    signature.return_type,
    signature.arity()
  );
  for (index, param) in signature.parameters.iter().enumerate() {
    let shape = match &param.ty {
      TypeDescriptor::Scalar { .. } => "scalar".to_string(),
      TypeDescriptor::IncompleteArray { element } => format!("incomplete array of '{}'", element),
      TypeDescriptor::FixedArray { element, count } => format!("array of {} '{}'", count, element),
    };
    println!("  [{}] {} ({})", index, format_parameter(param), shape);
  }
}
