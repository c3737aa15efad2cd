use super::fragments::FragmentBundle;
use super::namespace::Namespace;

pub const GENERATOR_NAME: &str = "brahma-gen";

/* Fragments of every bundle, grouped by kind, in emission order */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentSet {
    pub macros: Vec<String>,
    pub bindings: Vec<String>,
    pub typedefs: Vec<String>,
    pub virtuals: Vec<String>,
    pub wrappers: Vec<String>,
}

impl FragmentSet {
    pub fn from_bundles(bundles: &[FragmentBundle]) -> Self {
        let mut set = Self::default();
        for bundle in bundles {
            set.push(bundle);
        }
        set
    }

    pub fn push(&mut self, bundle: &FragmentBundle) {
        self.macros.push(bundle.macro_decl.clone());
        self.bindings.push(bundle.binding.clone());
        self.typedefs.push(bundle.typedef.clone());
        self.virtuals.push(bundle.virtual_decl.clone());
        self.wrappers.push(bundle.wrapper.clone());
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }
}

/* The two documents produced for one interface */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedModule {
    pub interface_document: String,
    pub implementation_document: String,
    /* Always equal to the number of macro fragments */
    pub matched_count: usize,
}

/// Combines fragment bundles with the fixed interface and implementation
/// skeletons.
///
/// The interface document declares `brahma::<TOKEN>` with one virtual method
/// per function; the implementation document defines the GOTCHA bindings,
/// the binding installer and counter, the lazy singleton accessors and the
/// pass-through wrappers.
#[derive(Debug, Clone)]
pub struct ModuleAssembler {
    namespace: Namespace,
    header_reference: String,
    timestamp: Option<String>,
}

impl ModuleAssembler {
    pub fn new(namespace: Namespace, header_reference: impl Into<String>) -> Self {
        Self {
            namespace,
            header_reference: header_reference.into(),
            timestamp: None,
        }
    }

    /* Stamp the banner with a generation time. Without one output is reproducible. */
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn assemble(&self, bundles: &[FragmentBundle]) -> GeneratedModule {
        let fragments = FragmentSet::from_bundles(bundles);

        GeneratedModule {
            interface_document: self.interface_document(&fragments),
            implementation_document: self.implementation_document(&fragments),
            matched_count: fragments.len(),
        }
    }

    fn banner(&self) -> String {
        let mut banner = String::from("\n///\n");
        banner.push_str(&format!("/// This file is generated by {}\n", GENERATOR_NAME));
        if let Some(timestamp) = &self.timestamp {
            banner.push_str(&format!("/// Generated on: {}\n", timestamp));
        }
        banner.push_str("///\n");
        banner
    }

    fn interface_document(&self, fragments: &FragmentSet) -> String {
        let ns = self.namespace.token();
        format!(
            r#"{banner}
#ifndef BRAHMA_{ns}_H
#define BRAHMA_{ns}_H
#include <brahma/brahma_config.hpp>
#ifdef BRAHMA_ENABLE_{ns}
#include <brahma/interceptor.h>
#include <brahma/interface/interface.h>
#include <stdexcept>
#include <{header_file}>

namespace brahma {{
    class {ns} : public Interface {{
        private:
            static std::shared_ptr<{ns}> my_instance;

        public:
            {ns}() : Interface() {{}};

            virtual ~{ns}() {{}};

            static std::shared_ptr<{ns}> get_instance();

            static int set_instance(std::shared_ptr<{ns}> instance_i);

            {virtual_functions}
    }};
}}

{macro_typedefs}

#endif // BRAHMA_ENABLE_{ns}
#endif // BRAHMA_{ns}_H
"#,
            banner = self.banner(),
            ns = ns,
            header_file = self.header_reference,
            virtual_functions = fragments.virtuals.concat(),
            macro_typedefs = fragments.typedefs.concat(),
        )
    }

    fn implementation_document(&self, fragments: &FragmentSet) -> String {
        let ns = self.namespace.token();
        format!(
            r#"{banner}
#include <brahma/interface/{name}.h>
#include <stdexcept>

#ifdef BRAHMA_ENABLE_{ns}

{macros}

int update_{name}(gotcha_binding_t *&bindings, size_t &binding_index) {{
    {macro_bindings}
    return 0;
}}

size_t count_{name}() {{
    return {count};
}}

namespace brahma {{
    std::shared_ptr<{ns}> {ns}::my_instance = nullptr;

    std::shared_ptr<{ns}> {ns}::get_instance() {{
        if (my_instance == nullptr) {{
            BRAHMA_LOG_INFO("{ns} class not intercepted but used", "");
            my_instance = std::make_shared<{ns}>();
        }}
        return my_instance;
    }}

    int {ns}::set_instance(std::shared_ptr<{ns}> instance_i) {{
        if (instance_i != nullptr) {{
            my_instance = instance_i;
            return 0;
        }} else {{
            BRAHMA_LOG_ERROR("%s instance_i is not set", "{ns}");
            throw std::runtime_error("instance_i is not set");
        }}
    }}

    {wrapper_functions}
}}

#endif // BRAHMA_ENABLE_{ns}
"#,
            banner = self.banner(),
            name = self.namespace.name(),
            ns = ns,
            macros = fragments.macros.concat(),
            macro_bindings = fragments.bindings.concat(),
            count = fragments.len(),
            wrapper_functions = fragments.wrappers.concat(),
        )
    }
}
