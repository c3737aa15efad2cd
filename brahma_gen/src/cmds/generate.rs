/* Generate command - write interface and implementation files for each configured interface */

use super::common::{RuleArgs, load_config};
use anyhow::Context;
use brahma_gen::{FormatStatus, FsSink, InterfaceRegistry};
use std::path::PathBuf;

pub struct GenerateArgs {
  pub config: Option<PathBuf>,
  pub rule: RuleArgs,
  pub include_dirs: Vec<PathBuf>,
  pub strip_macros: Vec<String>,
  pub defines: Vec<String>,
  pub output_root: Option<PathBuf>,
  pub no_format: bool,
  pub verbose: bool,
}

/* Execute the generate command */
pub fn run(args: GenerateArgs) -> anyhow::Result<()> {
  let mut config = load_config(args.config, args.rule, args.include_dirs, args.strip_macros, args.defines)?;
  if let Some(root) = args.output_root {
    config.output.root = root;
  }
  if args.no_format {
    config.output.format = false;
  }

  if args.verbose {
    println!("[~] Configuration:");
    println!("  Output root: {}", config.output.root.display());
    println!("  Interfaces: {}", config.interfaces.len());
    for rule in &config.interfaces {
      println!("    - {} ({}, prefix '{}')", rule.name, rule.header_path.display(), rule.prefix);
    }
    if !config.include_dirs.is_empty() {
      println!("  Include directories: {}", config.include_dirs.len());
      for dir in &config.include_dirs {
        println!("    - {}", dir.display());
      }
    }
    if !config.strip_macros.is_empty() {
      println!("  Stripped macros: {}", config.strip_macros.join(", "));
    }
    if !config.defines.is_empty() {
      println!("  Defines: {}", config.defines.join(", "));
    }
    println!();
  }

  let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
  let registry = InterfaceRegistry::from_config(&config)?.with_timestamp(Some(timestamp));
  let sink = FsSink::from_config(&config.output);

  let written = registry.run_all(&sink).context("Interface generation failed")?;

  for module in &written {
    println!(
      "[✓] Generated {} functions: {} and {}",
      module.matched_count,
      module.interface_path.display(),
      module.implementation_path.display()
    );
    match module.format {
      FormatStatus::Formatted => println!("    formatted with {}", config.output.formatter),
      FormatStatus::Failed(code) => println!("    formatting failed (exit code {:?})", code),
      FormatStatus::Missing | FormatStatus::Disabled => {}
    }
  }

  Ok(())
}
