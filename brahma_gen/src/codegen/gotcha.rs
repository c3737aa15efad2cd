use crate::codegen::gotcha_gen::{GeneratedModule, ModuleAssembler, Namespace, emit_all};
use crate::extract::extract;
use brahma_loader::InterfaceRule;
use brahma_types::Declaration;
use tracing::debug;

pub struct GotchaCodeGenerator {
    options: GotchaCodeGeneratorOptions,
}

pub struct GotchaCodeGeneratorOptions {
    pub namespace: Namespace,
    /* Quoted in the interface's #include, e.g. "hdf5.h" */
    pub header_reference: String,
    pub prefix: String,
    /* Banner timestamp; None keeps the output reproducible */
    pub timestamp: Option<String>,
}

impl Default for GotchaCodeGeneratorOptions {
    fn default() -> Self {
        Self {
            namespace: Namespace::new("hdf5"),
            header_reference: "hdf5.h".to_string(),
            prefix: "H5".to_string(),
            timestamp: None,
        }
    }
}

impl GotchaCodeGeneratorOptions {
    pub fn from_rule(rule: &InterfaceRule) -> Self {
        Self {
            namespace: Namespace::new(rule.name.clone()),
            header_reference: rule.header_file.clone(),
            prefix: rule.prefix.clone(),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: Option<String>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

impl GotchaCodeGenerator {
    pub fn new(options: GotchaCodeGeneratorOptions) -> Self {
        Self { options }
    }

    /* Extract, emit and assemble in one pass over the declarations */
    pub fn generate(&self, declarations: &[Declaration]) -> GeneratedModule {
        let signatures = extract(declarations, &self.options.prefix);
        let bundles = emit_all(&signatures, &self.options.namespace);

        let mut assembler =
            ModuleAssembler::new(self.options.namespace.clone(), self.options.header_reference.clone());
        if let Some(timestamp) = &self.options.timestamp {
            assembler = assembler.with_timestamp(timestamp.clone());
        }

        let module = assembler.assemble(&bundles);
        debug!(
            namespace = %self.options.namespace,
            matched = module.matched_count,
            "assembled interface module"
        );
        module
    }
}
