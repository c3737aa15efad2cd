/* Common utilities shared between generate and inspect commands */

use anyhow::{Context, bail};
use brahma_loader::{GeneratorConfig, InterfaceRule};
use std::path::PathBuf;

/* Interface settings given on the command line */
#[derive(Debug, Clone, Default)]
pub struct RuleArgs {
  pub name: Option<String>,
  pub header_file: Option<String>,
  pub header_path: Option<PathBuf>,
  pub prefix: Option<String>,
}

impl RuleArgs {
  pub fn is_empty(&self) -> bool {
    self.name.is_none() && self.header_file.is_none() && self.header_path.is_none() && self.prefix.is_none()
  }

  /* Build a rule, defaulting to the HDF5 interface. The header path is mandatory. */
  pub fn into_rule(self) -> anyhow::Result<InterfaceRule> {
    let Some(header_path) = self.header_path else {
      bail!("--header-path is required when no config file is given");
    };

    let mut rule = InterfaceRule::hdf5(header_path);
    if let Some(name) = self.name {
      rule.name = name;
    }
    if let Some(header_file) = self.header_file {
      rule.header_file = header_file;
    }
    if let Some(prefix) = self.prefix {
      rule.prefix = prefix;
    }
    Ok(rule)
  }
}

/* Load the config file if one was given, otherwise build a single-rule config from flags */
pub fn load_config(
  config_path: Option<PathBuf>,
  rule_args: RuleArgs,
  include_dirs: Vec<PathBuf>,
  strip_macros: Vec<String>,
  defines: Vec<String>,
) -> anyhow::Result<GeneratorConfig> {
  let mut config = match config_path {
    Some(path) => {
      if !rule_args.is_empty() {
        bail!("interface flags cannot be combined with a config file");
      }
      GeneratorConfig::load(&path).with_context(|| format!("Failed to load config {}", path.display()))?
    }
    None => GeneratorConfig::single(rule_args.into_rule()?),
  };

  config.include_dirs.extend(include_dirs);
  config.strip_macros.extend(strip_macros);
  config.defines.extend(defines);
  config.validate().context("Invalid configuration")?;
  Ok(config)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flags_default_to_hdf5() {
    let args = RuleArgs {
      header_path: Some(PathBuf::from("/usr/include/hdf5.h")),
      ..RuleArgs::default()
    };
    let config = load_config(
      None,
      args,
      vec![PathBuf::from("/opt/include")],
      vec!["H5_DLL".to_string()],
      vec!["H5_HAVE_PARALLEL".to_string()],
    )
    .unwrap();

    assert_eq!(config.interfaces, vec![InterfaceRule::hdf5("/usr/include/hdf5.h")]);
    assert_eq!(config.include_dirs, vec![PathBuf::from("/opt/include")]);
    assert_eq!(config.strip_macros, vec!["H5_DLL".to_string()]);
    assert_eq!(config.defines, vec!["H5_HAVE_PARALLEL".to_string()]);
  }

  #[test]
  fn header_path_is_required_without_config() {
    assert!(load_config(None, RuleArgs::default(), Vec::new(), Vec::new(), Vec::new()).is_err());
  }

  #[test]
  fn malformed_define_flag_is_rejected() {
    let args = RuleArgs {
      header_path: Some(PathBuf::from("/usr/include/hdf5.h")),
      ..RuleArgs::default()
    };
    let err = load_config(None, args, Vec::new(), Vec::new(), vec!["=1".to_string()]).unwrap_err();
    assert!(format!("{:#}", err).contains("NAME=VALUE"));
  }

  #[test]
  fn flags_override_the_default_rule() {
    let args = RuleArgs {
      name: Some("netcdf".to_string()),
      header_file: Some("netcdf.h".to_string()),
      header_path: Some(PathBuf::from("/usr/include/netcdf.h")),
      prefix: Some("nc_".to_string()),
    };
    let rule = args.into_rule().unwrap();
    assert_eq!(rule.name, "netcdf");
    assert_eq!(rule.header_file, "netcdf.h");
    assert_eq!(rule.prefix, "nc_");
  }
}
