use crate::codegen::gotcha::{GotchaCodeGenerator, GotchaCodeGeneratorOptions};
use crate::codegen::gotcha_gen::{GeneratedModule, Namespace};
use crate::error::GenError;
use crate::sink::{OutputSink, WrittenModule};
use brahma_loader::{CHeaderSource, DeclarationSource, GeneratorConfig, InterfaceRule};
use indexmap::IndexMap;
use tracing::{debug, info};

/* One configured interface and the source its declarations come from */
pub struct InterfaceTarget {
    pub rule: InterfaceRule,
    pub source: Box<dyn DeclarationSource>,
}

impl InterfaceTarget {
    pub fn new(rule: InterfaceRule, source: Box<dyn DeclarationSource>) -> Self {
        Self { rule, source }
    }

    pub fn namespace(&self) -> Namespace {
        Namespace::new(self.rule.name.clone())
    }
}

/// Every interface the generator will produce, keyed by namespace token.
///
/// Targets run in registration order. A token may be registered only once,
/// so `hdf5` and `HDF5` collide.
#[derive(Default)]
pub struct InterfaceRegistry {
    targets: IndexMap<String, InterfaceTarget>,
    timestamp: Option<String>,
}

impl InterfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /* One tree-sitter backed target per configured interface */
    pub fn from_config(config: &GeneratorConfig) -> Result<Self, GenError> {
        let mut registry = Self::new();
        for rule in &config.interfaces {
            registry.register(rule.clone(), Box::new(CHeaderSource::for_rule(config, rule)))?;
        }
        Ok(registry)
    }

    pub fn with_timestamp(mut self, timestamp: Option<String>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn register(&mut self, rule: InterfaceRule, source: Box<dyn DeclarationSource>) -> Result<(), GenError> {
        let target = InterfaceTarget::new(rule, source);
        let token = target.namespace().token().to_string();
        if self.targets.contains_key(&token) {
            return Err(GenError::DuplicateNamespace(token));
        }
        debug!(namespace = %token, header = %target.rule.header_path.display(), "registered interface");
        self.targets.insert(token, target);
        Ok(())
    }

    pub fn get(&self, token: &str) -> Option<&InterfaceTarget> {
        self.targets.get(token)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /* Parse and generate one target without writing anything */
    pub fn generate(&self, target: &InterfaceTarget) -> Result<GeneratedModule, GenError> {
        let namespace = target.namespace();
        let declarations = target
            .source
            .parse(&target.rule.header_path)
            .map_err(|source| GenError::Load {
                namespace: namespace.name().to_string(),
                source,
            })?;

        let options = GotchaCodeGeneratorOptions::from_rule(&target.rule).with_timestamp(self.timestamp.clone());
        Ok(GotchaCodeGenerator::new(options).generate(&declarations))
    }

    /* Generate every target in order and hand each finished module to the sink */
    pub fn run_all(&self, sink: &dyn OutputSink) -> Result<Vec<WrittenModule>, GenError> {
        let mut written = Vec::with_capacity(self.targets.len());
        for target in self.targets.values() {
            let namespace = target.namespace();
            info!("[{}] Generating interface...", namespace);

            let module = self.generate(target)?;
            info!("[{}] Generated {} functions", namespace, module.matched_count);

            if let Some(formatter) = sink.formatter() {
                info!("[{}] Formatting files using {}...", namespace, formatter.program());
            }
            written.push(sink.write(&namespace, &module)?);
            info!("[{}] Done!", namespace);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{FormatStatus, Formatter};
    use assert_matches::assert_matches;
    use brahma_loader::LoadError;
    use brahma_types::{Declaration, RawParameter};
    use std::cell::RefCell;
    use std::io;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingSink {
        modules: RefCell<Vec<(String, GeneratedModule)>>,
        formatter: Option<Formatter>,
    }

    /* Collects formatted log output */
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn logged<T>(run: impl FnOnce() -> T) -> (T, String) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .without_time()
            .with_target(false)
            .finish();
        let result = tracing::subscriber::with_default(subscriber, run);
        (result, buffer.contents())
    }

    impl OutputSink for RecordingSink {
        fn formatter(&self) -> Option<&Formatter> {
            self.formatter.as_ref()
        }

        fn write(&self, namespace: &Namespace, module: &GeneratedModule) -> Result<WrittenModule, GenError> {
            self.modules
                .borrow_mut()
                .push((namespace.name().to_string(), module.clone()));
            Ok(WrittenModule {
                interface_path: PathBuf::from(format!("{}.h", namespace.name())),
                implementation_path: PathBuf::from(format!("{}.cpp", namespace.name())),
                matched_count: module.matched_count,
                format: FormatStatus::Disabled,
            })
        }
    }

    struct FailingSource;

    impl DeclarationSource for FailingSource {
        fn parse(&self, header: &Path) -> Result<Vec<Declaration>, LoadError> {
            Err(LoadError::Parse(header.to_path_buf()))
        }
    }

    fn rule(name: &str, prefix: &str) -> InterfaceRule {
        InterfaceRule {
            name: name.to_string(),
            header_file: format!("{}.h", name),
            header_path: PathBuf::from(format!("/usr/include/{}.h", name)),
            prefix: prefix.to_string(),
            strip_macros: Vec::new(),
        }
    }

    #[test]
    fn duplicate_namespace_is_rejected() {
        let mut registry = InterfaceRegistry::new();
        registry.register(rule("hdf5", "H5"), Box::new(Vec::<Declaration>::new())).unwrap();

        let err = registry
            .register(rule("HDF5", "H5"), Box::new(Vec::<Declaration>::new()))
            .unwrap_err();
        assert_matches!(err, GenError::DuplicateNamespace(ref token) if token == "HDF5");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn runs_targets_in_registration_order() {
        let mut registry = InterfaceRegistry::new();
        registry
            .register(
                rule("mpi", "MPI_"),
                Box::new(vec![Declaration::function(
                    "MPI_Init",
                    "int",
                    vec![
                        RawParameter::scalar("argc", "int *"),
                        RawParameter::scalar("argv", "char ***"),
                    ],
                )]),
            )
            .unwrap();
        registry
            .register(
                rule("hdf5", "H5"),
                Box::new(vec![
                    Declaration::function("H5open", "herr_t", vec![]),
                    Declaration::function("H5close", "herr_t", vec![]),
                ]),
            )
            .unwrap();

        assert_eq!(registry.tokens().collect::<Vec<_>>(), vec!["MPI", "HDF5"]);

        let sink = RecordingSink::default();
        let written = registry.run_all(&sink).unwrap();

        let counts: Vec<usize> = written.iter().map(|w| w.matched_count).collect();
        assert_eq!(counts, vec![1, 2]);

        let modules = sink.modules.borrow();
        assert_eq!(modules[0].0, "mpi");
        assert!(modules[0].1.implementation_document.contains("int update_mpi("));
        assert_eq!(modules[1].0, "hdf5");
        assert!(modules[1].1.interface_document.contains("virtual herr_t H5close();"));
    }

    #[test]
    fn progress_is_logged_per_target() {
        let mut registry = InterfaceRegistry::new();
        registry
            .register(
                rule("hdf5", "H5"),
                Box::new(vec![Declaration::function("H5open", "herr_t", vec![])]),
            )
            .unwrap();
        let sink = RecordingSink {
            formatter: Some(Formatter::new("clang-format")),
            ..RecordingSink::default()
        };

        let (written, logs) = logged(|| registry.run_all(&sink));
        assert_eq!(written.unwrap().len(), 1);

        let lines = [
            "[hdf5] Generating interface...",
            "[hdf5] Generated 1 functions",
            "[hdf5] Formatting files using clang-format...",
            "[hdf5] Done!",
        ];
        let positions: Vec<usize> = lines
            .iter()
            .map(|line| logs.find(line).unwrap_or_else(|| panic!("missing {:?} in {}", line, logs)))
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]), "{}", logs);
    }

    #[test]
    fn formatting_is_not_announced_without_a_formatter() {
        let mut registry = InterfaceRegistry::new();
        registry.register(rule("hdf5", "H5"), Box::new(Vec::<Declaration>::new())).unwrap();

        let (_, logs) = logged(|| registry.run_all(&RecordingSink::default()));
        assert!(logs.contains("[hdf5] Done!"));
        assert!(!logs.contains("Formatting files"));
    }

    #[test]
    fn load_failure_stops_before_writing() {
        let mut registry = InterfaceRegistry::new();
        registry.register(rule("hdf5", "H5"), Box::new(FailingSource)).unwrap();

        let sink = RecordingSink::default();
        let err = registry.run_all(&sink).unwrap_err();
        assert_matches!(err, GenError::Load { ref namespace, source: LoadError::Parse(_) } if namespace == "hdf5");
        assert!(sink.modules.borrow().is_empty());
    }

    #[test]
    fn from_config_registers_every_interface() {
        let mut config = brahma_loader::GeneratorConfig::single(rule("hdf5", "H5"));
        config.interfaces.push(rule("netcdf", "nc_"));

        let registry = InterfaceRegistry::from_config(&config).unwrap();
        assert_eq!(registry.tokens().collect::<Vec<_>>(), vec!["HDF5", "NETCDF"]);
        assert_eq!(registry.get("NETCDF").map(|t| t.rule.prefix.as_str()), Some("nc_"));
    }
}
