use crate::error::ConfigError;
use crate::macros::{MacroDefinition, is_identifier};
use crate::strip::strip_entry_name;
use serde_derive::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/* ============================================================================
   Generator configuration
   ============================================================================ */

pub const DEFAULT_INTERFACE_DIR: &str = "include/brahma/interface";
pub const DEFAULT_IMPLEMENTATION_DIR: &str = "src/brahma/interface";
pub const DEFAULT_FORMATTER: &str = "clang-format";

/* Export and attribute macros of the HDF5 public headers. Entries ending in
 * "()" take an argument list. */
pub const HDF5_STRIP_MACROS: &[&str] = &[
    "H5_DLL",
    "H5_HLDLL",
    "H5_DLLVAR",
    "H5TEST_DLL",
    "H5_ATTR_FORMAT()",
    "H5_ATTR_UNUSED",
    "H5_ATTR_DEPRECATED_USED",
    "H5_ATTR_NDEBUG_UNUSED",
    "H5_ATTR_DEBUG_API_USED",
    "H5_ATTR_PARALLEL_UNUSED",
    "H5_ATTR_PARALLEL_USED",
    "H5_ATTR_NORETURN",
    "H5_ATTR_CONST",
    "H5_ATTR_PURE",
    "H5_ATTR_FALLTHROUGH",
    "H5_ATTR_MALLOC",
];

/* One header to intercept: (name, header file, header path, prefix) */
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct InterfaceRule {
    /* Short library name, e.g. "hdf5". Upper-cased it becomes the namespace token */
    pub name: String,
    /* Header reference quoted in the generated include directive */
    pub header_file: String,
    /* Header to parse on this machine */
    pub header_path: PathBuf,
    /* Substring a function name must contain to be intercepted */
    pub prefix: String,
    /* Macros blanked only while parsing this rule's header */
    #[serde(default)]
    pub strip_macros: Vec<String>,
}

impl InterfaceRule {
    /* The HDF5 rule the generator was first written for */
    pub fn hdf5(header_path: impl Into<PathBuf>) -> Self {
        Self {
            name: "hdf5".to_string(),
            header_file: "hdf5.h".to_string(),
            header_path: header_path.into(),
            prefix: "H5".to_string(),
            strip_macros: HDF5_STRIP_MACROS.iter().map(|name| name.to_string()).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_interface_dir")]
    pub interface_dir: PathBuf,
    #[serde(default = "default_implementation_dir")]
    pub implementation_dir: PathBuf,
    /* Run the formatter over each generated file */
    #[serde(default = "default_true")]
    pub format: bool,
    #[serde(default = "default_formatter")]
    pub formatter: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            interface_dir: default_interface_dir(),
            implementation_dir: default_implementation_dir(),
            format: true,
            formatter: default_formatter(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct GeneratorConfig {
    /* Search path for #include directives */
    #[serde(default)]
    pub include_dirs: Vec<PathBuf>,
    /* Export/attribute macros blanked out before parsing, e.g. H5_DLL */
    #[serde(default)]
    pub strip_macros: Vec<String>,
    /* Predefined macros: NAME (defined as 1) or NAME=VALUE */
    #[serde(default)]
    pub defines: Vec<String>,
    #[serde(default = "default_true")]
    pub follow_includes: bool,
    #[serde(default)]
    pub output: OutputConfig,
    pub interfaces: Vec<InterfaceRule>,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_interface_dir() -> PathBuf {
    PathBuf::from(DEFAULT_INTERFACE_DIR)
}

fn default_implementation_dir() -> PathBuf {
    PathBuf::from(DEFAULT_IMPLEMENTATION_DIR)
}

fn default_formatter() -> String {
    DEFAULT_FORMATTER.to_string()
}

fn default_true() -> bool {
    true
}

impl GeneratorConfig {
    /* Configuration with a single rule and every other setting at its default */
    pub fn single(rule: InterfaceRule) -> Self {
        Self {
            include_dirs: Vec::new(),
            strip_macros: Vec::new(),
            defines: Vec::new(),
            follow_includes: true,
            output: OutputConfig::default(),
            interfaces: vec![rule],
        }
    }

    /* Load and validate a YAML config file */
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: GeneratorConfig = serde_yml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interfaces.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one interface must be configured".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for rule in &self.interfaces {
            if rule.name.trim().is_empty() {
                return Err(ConfigError::Invalid("interface name is empty".to_string()));
            }
            if rule.prefix.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "interface '{}' has an empty prefix",
                    rule.name
                )));
            }
            if rule.header_file.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "interface '{}' has an empty header-file",
                    rule.name
                )));
            }
            if rule.header_path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "interface '{}' has an empty header-path",
                    rule.name
                )));
            }
            validate_strip_macros(&rule.strip_macros)?;
            /* Names collide case-insensitively since the namespace token is upper-cased */
            if !seen.insert(rule.name.to_uppercase()) {
                return Err(ConfigError::Invalid(format!(
                    "interface '{}' is configured more than once",
                    rule.name
                )));
            }
        }

        validate_strip_macros(&self.strip_macros)?;

        if let Some(bad) = self
            .defines
            .iter()
            .find(|spec| MacroDefinition::from_command_line(spec).is_none())
        {
            return Err(ConfigError::Invalid(format!(
                "define '{}' is not NAME or NAME=VALUE",
                bad
            )));
        }

        Ok(())
    }
}

/* Entries are NAME or NAME() */
fn validate_strip_macros(entries: &[String]) -> Result<(), ConfigError> {
    for entry in entries {
        let (name, _) = strip_entry_name(entry);
        if name.is_empty() {
            return Err(ConfigError::Invalid(
                "strip-macros contains an empty entry".to_string(),
            ));
        }
        if !is_identifier(name) {
            return Err(ConfigError::Invalid(format!(
                "strip-macros entry '{}' is not a macro name",
                entry
            )));
        }
    }
    Ok(())
}
