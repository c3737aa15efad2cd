use brahma_types::{Parameter, TypeDescriptor};

/* Argument text shared by every fragment of one signature */
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderedArgs {
    /* "const char * filename, double buf[4]" */
    pub declaration_list: String,
    /* "filename, buf" */
    pub name_list: String,
}

/* Format one parameter as it appears in a C declaration */
pub fn format_parameter(param: &Parameter) -> String {
    match &param.ty {
        TypeDescriptor::Scalar { spelling } => format!("{} {}", spelling, param.name),
        TypeDescriptor::IncompleteArray { element } => format!("{} {}[]", element, param.name),
        TypeDescriptor::FixedArray { element, count } => {
            format!("{} {}[{}]", element, param.name, count)
        }
    }
}

/* Render a parameter list. Pure: identical input always yields identical text. */
pub fn render(parameters: &[Parameter]) -> RenderedArgs {
    let declaration_list = parameters
        .iter()
        .map(format_parameter)
        .collect::<Vec<_>>()
        .join(", ");
    let name_list = parameters
        .iter()
        .map(|param| param.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    RenderedArgs {
        declaration_list,
        name_list,
    }
}
