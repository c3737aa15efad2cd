use super::args::{RenderedArgs, render};
use super::namespace::Namespace;
use brahma_types::Signature;

/* The five code blocks generated for one intercepted function */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentBundle {
    pub function_name: String,
    /* The single rendering every fragment below was built from */
    pub args: RenderedArgs,
    pub macro_decl: String,
    pub binding: String,
    pub typedef: String,
    pub virtual_decl: String,
    pub wrapper: String,
}

/* GOTCHA_MACRO declaration, placed in the implementation file */
pub fn emit_macro(signature: &Signature, args: &RenderedArgs, namespace: &Namespace) -> String {
    format!(
        "\n    GOTCHA_MACRO({}, {}, ({}), ({}), brahma::{});\n",
        signature.name,
        signature.return_type,
        args.declaration_list,
        args.name_list,
        namespace.token()
    )
}

/* Entry of the binding table installed by update_<name> */
pub fn emit_binding(signature: &Signature) -> String {
    format!("\n    GOTCHA_BINDING_MACRO({});\n", signature.name)
}

pub fn emit_typedef(signature: &Signature, args: &RenderedArgs, namespace: &Namespace) -> String {
    format!(
        "\n    GOTCHA_MACRO_TYPEDEF({}, {}, ({}), ({}), brahma::{});\n",
        signature.name,
        signature.return_type,
        args.declaration_list,
        args.name_list,
        namespace.token()
    )
}

pub fn emit_virtual(signature: &Signature, args: &RenderedArgs) -> String {
    format!(
        "\n    virtual {} {}({});\n",
        signature.return_type, signature.name, args.declaration_list
    )
}

/* Default method body: call through to the unwrapped library function */
pub fn emit_wrapper(signature: &Signature, args: &RenderedArgs, namespace: &Namespace) -> String {
    format!(
        "\n    {ret} {ns}::{name}({decls}) {{\n        BRAHMA_UNWRAPPED_FUNC({name}, {ret}, ({names}));\n        return result;\n    }}\n",
        ret = signature.return_type,
        ns = namespace.token(),
        name = signature.name,
        decls = args.declaration_list,
        names = args.name_list,
    )
}

impl FragmentBundle {
    /* Build all five fragments from one already-rendered argument list */
    pub fn emit(signature: &Signature, args: &RenderedArgs, namespace: &Namespace) -> Self {
        Self {
            function_name: signature.name.clone(),
            args: args.clone(),
            macro_decl: emit_macro(signature, args, namespace),
            binding: emit_binding(signature),
            typedef: emit_typedef(signature, args, namespace),
            virtual_decl: emit_virtual(signature, args),
            wrapper: emit_wrapper(signature, args, namespace),
        }
    }
}

/* Emit bundles in signature order, rendering each argument list exactly once */
pub fn emit_all(signatures: &[Signature], namespace: &Namespace) -> Vec<FragmentBundle> {
    signatures
        .iter()
        .map(|signature| {
            let args = render(&signature.parameters);
            FragmentBundle::emit(signature, &args, namespace)
        })
        .collect()
}
