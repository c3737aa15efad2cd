use crate::codegen::gotcha_gen::{GeneratedModule, Namespace};
use crate::error::GenError;
use brahma_loader::OutputConfig;
use brahma_loader::config::{DEFAULT_FORMATTER, DEFAULT_IMPLEMENTATION_DIR, DEFAULT_INTERFACE_DIR};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/* ============================================================================
   Output sink
   ============================================================================ */

/* What became of a generated file after formatting was attempted */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatStatus {
    Formatted,
    /* Formatting turned off */
    Disabled,
    /* Formatter program not installed */
    Missing,
    /* Formatter ran and exited non-zero */
    Failed(Option<i32>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenModule {
    pub interface_path: PathBuf,
    pub implementation_path: PathBuf,
    pub matched_count: usize,
    pub format: FormatStatus,
}

/* Destination for finished modules */
pub trait OutputSink {
    fn write(&self, namespace: &Namespace, module: &GeneratedModule) -> Result<WrittenModule, GenError>;

    /* Formatter run over written files, if any */
    fn formatter(&self) -> Option<&Formatter> {
        None
    }
}

/// Runs an in-place source formatter (`<program> -i <path>`) over generated
/// files.
///
/// Formatting is best-effort: a missing program is reported once and every
/// later call is skipped, a failing run is logged and otherwise ignored.
#[derive(Debug)]
pub struct Formatter {
    program: String,
    missing: AtomicBool,
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(DEFAULT_FORMATTER)
    }
}

impl Formatter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            missing: AtomicBool::new(false),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn format(&self, path: &Path) -> FormatStatus {
        if self.missing.load(Ordering::Relaxed) {
            return FormatStatus::Missing;
        }

        match Command::new(&self.program).arg("-i").arg(path).status() {
            Ok(status) if status.success() => {
                debug!(program = %self.program, path = %path.display(), "formatted");
                FormatStatus::Formatted
            }
            Ok(status) => {
                warn!(program = %self.program, path = %path.display(), ?status, "formatter failed");
                FormatStatus::Failed(status.code())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                if !self.missing.swap(true, Ordering::Relaxed) {
                    info!("{} not found, skipping formatting", self.program);
                }
                FormatStatus::Missing
            }
            Err(err) => {
                warn!(program = %self.program, path = %path.display(), error = %err, "failed to run formatter");
                FormatStatus::Failed(None)
            }
        }
    }

    /* Combined status of formatting several files; the first non-success wins */
    pub fn format_all(&self, paths: &[&Path]) -> FormatStatus {
        let mut combined = FormatStatus::Formatted;
        for path in paths {
            let status = self.format(path);
            if combined == FormatStatus::Formatted {
                combined = status;
            }
        }
        combined
    }
}

/* Writes `<root>/<interface-dir>/<name>.h` and `<root>/<implementation-dir>/<name>.cpp` */
#[derive(Debug)]
pub struct FsSink {
    root: PathBuf,
    interface_dir: PathBuf,
    implementation_dir: PathBuf,
    formatter: Option<Formatter>,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            interface_dir: PathBuf::from(DEFAULT_INTERFACE_DIR),
            implementation_dir: PathBuf::from(DEFAULT_IMPLEMENTATION_DIR),
            formatter: None,
        }
    }

    pub fn from_config(output: &OutputConfig) -> Self {
        Self {
            root: output.root.clone(),
            interface_dir: output.interface_dir.clone(),
            implementation_dir: output.implementation_dir.clone(),
            formatter: output.format.then(|| Formatter::new(output.formatter.clone())),
        }
    }

    pub fn with_formatter(mut self, formatter: Option<Formatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn interface_path(&self, namespace: &Namespace) -> PathBuf {
        self.root
            .join(&self.interface_dir)
            .join(format!("{}.h", namespace.name()))
    }

    pub fn implementation_path(&self, namespace: &Namespace) -> PathBuf {
        self.root
            .join(&self.implementation_dir)
            .join(format!("{}.cpp", namespace.name()))
    }

    fn write_document(path: &Path, contents: &str) -> Result<(), GenError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| GenError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, contents).map_err(|source| GenError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl OutputSink for FsSink {
    fn formatter(&self) -> Option<&Formatter> {
        self.formatter.as_ref()
    }

    fn write(&self, namespace: &Namespace, module: &GeneratedModule) -> Result<WrittenModule, GenError> {
        let interface_path = self.interface_path(namespace);
        let implementation_path = self.implementation_path(namespace);

        Self::write_document(&interface_path, &module.interface_document)?;
        Self::write_document(&implementation_path, &module.implementation_document)?;
        debug!(
            namespace = %namespace,
            interface = %interface_path.display(),
            implementation = %implementation_path.display(),
            "wrote interface module"
        );

        let format = match &self.formatter {
            Some(formatter) => formatter.format_all(&[&interface_path, &implementation_path]),
            None => FormatStatus::Disabled,
        };

        Ok(WrittenModule {
            interface_path,
            implementation_path,
            matched_count: module.matched_count,
            format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn module() -> GeneratedModule {
        GeneratedModule {
            interface_document: "// interface\n".to_string(),
            implementation_document: "// implementation\n".to_string(),
            matched_count: 3,
        }
    }

    #[test]
    fn paths_follow_the_namespace_name() {
        let sink = FsSink::new("/out");
        let ns = Namespace::new("hdf5");
        assert_eq!(
            sink.interface_path(&ns),
            PathBuf::from("/out/include/brahma/interface/hdf5.h")
        );
        assert_eq!(
            sink.implementation_path(&ns),
            PathBuf::from("/out/src/brahma/interface/hdf5.cpp")
        );
    }

    #[test]
    fn writes_both_documents() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsSink::new(dir.path());

        let written = sink.write(&Namespace::new("hdf5"), &module()).unwrap();
        assert_eq!(written.matched_count, 3);
        assert_eq!(written.format, FormatStatus::Disabled);
        assert_eq!(fs::read_to_string(&written.interface_path).unwrap(), "// interface\n");
        assert_eq!(
            fs::read_to_string(&written.implementation_path).unwrap(),
            "// implementation\n"
        );
    }

    #[test]
    fn missing_formatter_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsSink::new(dir.path())
            .with_formatter(Some(Formatter::new("brahma-gen-no-such-formatter")));

        let written = sink.write(&Namespace::new("mpi"), &module()).unwrap();
        assert_eq!(written.format, FormatStatus::Missing);
        assert!(written.interface_path.exists());

        let again = sink.write(&Namespace::new("mpi"), &module()).unwrap();
        assert_eq!(again.format, FormatStatus::Missing);
    }

    #[test]
    fn unwritable_root_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();

        let err = FsSink::new(&blocker).write(&Namespace::new("hdf5"), &module()).unwrap_err();
        assert_matches!(err, GenError::Write { .. });
    }

    #[test]
    fn config_disables_formatting() {
        let output = OutputConfig {
            format: false,
            ..OutputConfig::default()
        };
        let sink = FsSink::from_config(&output);
        assert!(sink.formatter().is_none());

        let sink = FsSink::from_config(&OutputConfig::default());
        assert_eq!(sink.formatter().map(Formatter::program), Some("clang-format"));
    }
}
