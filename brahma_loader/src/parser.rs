/* Tree-sitter based C declaration parser
 *
 * Walks the syntax tree of a preprocessed translation unit and reports every
 * top-level declaration in source order. Included headers sit at the point
 * of their #include, and only active conditional branches remain. Type spellings follow libclang's conventions so generated code reads the
 * same as code written against a clang-based declaration source:
 *
 *   const char *filename      -> "const char *"
 *   char *const *argv         -> "char *const *"
 *   herr_t (*func)(hid_t)     -> "herr_t (*)(hid_t)"
 *   double buf[4]             -> "double[4]", element "double", count 4
 */

use crate::error::LoadError;
use crate::expr::evaluate_constant;
use crate::macros::MacroTable;
use crate::preprocess::{Preprocessor, TranslationUnit};
use crate::resolver::HeaderResolver;
use crate::strip::MacroStripper;
use brahma_types::{Declaration, ParamTypeKind, RawParameter};
use std::path::Path;
use tracing::debug;
use tree_sitter::{Language, Node, Parser};

/* Nodes whose children may hold further top-level declarations */
const CONTAINER_KINDS: &[&str] = &["translation_unit", "linkage_specification", "declaration_list"];

/* One step of a declarator, outermost first */
#[derive(Debug, Clone, Copy)]
enum Layer<'t> {
    Pointer(Node<'t>),
    Array(Option<Node<'t>>),
    Function(Node<'t>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ArrayBound {
    Unsized,
    Count(u64),
    Expr(String),
}

/* Get text for a tree-sitter node */
fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

fn normalize_spelling(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/* Qualifiers attached directly to a node (const, volatile, restrict) */
fn qualifiers(node: Node, source: &str) -> Vec<String> {
    let mut cursor = node.walk();
    let found: Vec<String> = node
        .children(&mut cursor)
        .filter(|child| child.kind() == "type_qualifier")
        .map(|child| normalize_spelling(node_text(child, source)))
        .collect();
    found
}

/* Base type of a declaration or parameter: qualifiers first, then the specifier */
fn base_type_spelling(owner: Node, type_node: Node, source: &str) -> String {
    let mut parts = qualifiers(owner, source);
    parts.push(normalize_spelling(node_text(type_node, source)));
    parts.join(" ")
}

fn is_declarator_kind(kind: &str) -> bool {
    kind == "identifier" || kind.ends_with("declarator")
}

/* Peel a declarator down to its identifier, recording each layer on the way */
fn unwrap_declarator<'t>(node: Node<'t>, source: &str, layers: &mut Vec<Layer<'t>>) -> Option<String> {
    let inner = match node.kind() {
        "identifier" | "field_identifier" | "type_identifier" => {
            return Some(node_text(node, source).to_string());
        }
        "pointer_declarator" | "abstract_pointer_declarator" => {
            layers.push(Layer::Pointer(node));
            node.child_by_field_name("declarator")
        }
        "array_declarator" | "abstract_array_declarator" => {
            layers.push(Layer::Array(node.child_by_field_name("size")));
            node.child_by_field_name("declarator")
        }
        "function_declarator" | "abstract_function_declarator" => {
            if let Some(parameters) = node.child_by_field_name("parameters") {
                layers.push(Layer::Function(parameters));
            }
            node.child_by_field_name("declarator")
        }
        "init_declarator" => node.child_by_field_name("declarator"),
        "parenthesized_declarator" | "abstract_parenthesized_declarator" | "attributed_declarator" => {
            let mut cursor = node.walk();
            let found = node
                .named_children(&mut cursor)
                .find(|child| is_declarator_kind(child.kind()));
            found
        }
        _ => None,
    };

    inner.and_then(|inner| unwrap_declarator(inner, source, layers))
}

fn array_bound(size: Option<Node>, source: &str, macros: &MacroTable) -> ArrayBound {
    let Some(size) = size else {
        return ArrayBound::Unsized;
    };
    let text = normalize_spelling(node_text(size, source));
    match evaluate_constant(&text, macros) {
        Some(count) => ArrayBound::Count(count),
        None => ArrayBound::Expr(text),
    }
}

/* Spell a type from its base and declarator layers (outermost first) */
fn spell_type(base: &str, layers: &[Layer], source: &str, macros: &MacroTable) -> String {
    let mut inner = String::new();

    /* The innermost layer is the top-level type constructor, so build outwards from it */
    for layer in layers.iter().rev() {
        match layer {
            Layer::Pointer(node) => {
                let quals = qualifiers(*node, source);
                let mut pointer = String::from("*");
                if !quals.is_empty() {
                    pointer.push_str(&quals.join(" "));
                    if !inner.is_empty() {
                        pointer.push(' ');
                    }
                }
                inner = pointer + &inner;
            }
            Layer::Array(size) => {
                if inner.starts_with('*') {
                    inner = format!("({})", inner);
                }
                match array_bound(*size, source, macros) {
                    ArrayBound::Unsized => inner.push_str("[]"),
                    ArrayBound::Count(count) => inner.push_str(&format!("[{}]", count)),
                    ArrayBound::Expr(expr) => inner.push_str(&format!("[{}]", expr)),
                }
            }
            Layer::Function(parameters) => {
                if inner.starts_with('*') {
                    inner = format!("({})", inner);
                }
                inner.push_str(&format!("({})", spell_parameter_list(*parameters, source, macros)));
            }
        }
    }

    if inner.is_empty() {
        base.to_string()
    } else if inner.starts_with('[') {
        format!("{}{}", base, inner)
    } else {
        format!("{} {}", base, inner)
    }
}

fn parameter_declarations<'t>(list: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = list.walk();
    let found: Vec<Node<'t>> = list
        .named_children(&mut cursor)
        .filter(|child| child.kind() == "parameter_declaration")
        .collect();
    found
}

fn has_variadic_tail(list: Node) -> bool {
    let mut cursor = list.walk();
    let found = list
        .named_children(&mut cursor)
        .any(|child| child.kind() == "variadic_parameter");
    found
}

/* "(void)" declares no parameters */
fn is_void_parameter_list(declarations: &[Node], source: &str) -> bool {
    match declarations {
        [only] => {
            only.child_by_field_name("declarator").is_none()
                && qualifiers(*only, source).is_empty()
                && only
                    .child_by_field_name("type")
                    .map(|ty| node_text(ty, source).trim() == "void")
                    .unwrap_or(false)
        }
        _ => false,
    }
}

/* Parameter types without names, as used inside function pointer spellings */
fn spell_parameter_list(list: Node, source: &str, macros: &MacroTable) -> String {
    let declarations = parameter_declarations(list);
    if is_void_parameter_list(&declarations, source) {
        return "void".to_string();
    }

    let mut parts: Vec<String> = declarations
        .iter()
        .map(|param| ParameterParts::of(*param, source, macros).spelling)
        .collect();
    if has_variadic_tail(list) {
        parts.push("...".to_string());
    }
    parts.join(", ")
}

/* A parameter_declaration broken into name, base type and declarator layers */
struct ParameterParts<'t> {
    name: String,
    base: String,
    layers: Vec<Layer<'t>>,
    spelling: String,
}

impl<'t> ParameterParts<'t> {
    fn of(param: Node<'t>, source: &str, macros: &MacroTable) -> Self {
        let base = match param.child_by_field_name("type") {
            Some(type_node) => base_type_spelling(param, type_node, source),
            None => normalize_spelling(node_text(param, source)),
        };
        let mut layers = Vec::new();
        let name = param
            .child_by_field_name("declarator")
            .and_then(|declarator| unwrap_declarator(declarator, source, &mut layers))
            .unwrap_or_default();
        let spelling = spell_type(&base, &layers, source, macros);
        Self {
            name,
            base,
            layers,
            spelling,
        }
    }
}

fn raw_parameter(param: Node, source: &str, macros: &MacroTable) -> RawParameter {
    let ParameterParts {
        name,
        base,
        layers,
        spelling,
    } = ParameterParts::of(param, source, macros);

    let Some((Layer::Array(size), outer)) = layers.split_last() else {
        return RawParameter::scalar(name, spelling);
    };

    let element = spell_type(&base, outer, source, macros);
    match array_bound(*size, source, macros) {
        ArrayBound::Unsized => RawParameter {
            name,
            kind: ParamTypeKind::IncompleteArray,
            spelling,
            element_spelling: Some(element),
            element_count: None,
        },
        ArrayBound::Count(count) => RawParameter {
            name,
            kind: ParamTypeKind::ConstantArray,
            spelling,
            element_spelling: Some(element),
            element_count: Some(count),
        },
        ArrayBound::Expr(expr) => {
            debug!(parameter = %name, bound = %expr, "array bound is not a constant");
            RawParameter {
                name,
                kind: ParamTypeKind::ConstantArray,
                spelling,
                element_spelling: Some(element),
                element_count: None,
            }
        }
    }
}

/* Parser for one generation run. The preprocessor builds the translation
 * unit and export macros are blanked before tree-sitter sees it */
pub struct HeaderParser {
    parser: Parser,
    preprocessor: Preprocessor,
    stripper: MacroStripper,
}

impl HeaderParser {
    pub fn new(preprocessor: Preprocessor, stripper: MacroStripper) -> Result<Self, LoadError> {
        let mut parser = Parser::new();
        let language: Language = tree_sitter_c::LANGUAGE.into();
        parser
            .set_language(&language)
            .map_err(|e| LoadError::Language(e.to_string()))?;

        Ok(Self {
            parser,
            preprocessor,
            stripper,
        })
    }

    /* Parse a header from disk, following its includes */
    pub fn parse_file(&mut self, path: &Path) -> Result<Vec<Declaration>, LoadError> {
        let unit = self.preprocessor.run_file(path)?;
        self.parse_unit(&unit, path)
    }

    /* Parse in-memory header text; `path` anchors relative includes */
    pub fn parse_source(&mut self, source: &str, path: &Path) -> Result<Vec<Declaration>, LoadError> {
        let unit = self.preprocessor.run_source(source, path)?;
        self.parse_unit(&unit, path)
    }

    pub fn loaded_file_count(&self) -> usize {
        self.preprocessor.loaded_file_count()
    }

    fn parse_unit(&mut self, unit: &TranslationUnit, path: &Path) -> Result<Vec<Declaration>, LoadError> {
        let text = self.stripper.strip(unit.text());
        let tree = self
            .parser
            .parse(&text, None)
            .ok_or_else(|| LoadError::Parse(path.to_path_buf()))?;

        let root = tree.root_node();
        if root.has_error() {
            debug!(file = %path.display(), "header has syntax errors, continuing with recovered tree");
        }

        let mut declarations = Vec::new();
        self.visit(root, &text, unit, &mut declarations);
        Ok(declarations)
    }

    fn visit(&self, node: Node, source: &str, unit: &TranslationUnit, out: &mut Vec<Declaration>) {
        match node.kind() {
            "declaration" | "function_definition" => {
                self.collect_declarations(node, source, unit, out);
            }
            kind if node.is_error() || CONTAINER_KINDS.contains(&kind) => {
                let mut cursor = node.walk();
                let children: Vec<Node> = node.children(&mut cursor).collect();
                for child in children {
                    self.visit(child, source, unit, out);
                }
            }
            _ => {}
        }
    }

    fn collect_declarations(&self, node: Node, source: &str, unit: &TranslationUnit, out: &mut Vec<Declaration>) {
        let Some(type_node) = node.child_by_field_name("type") else {
            return;
        };
        let base = base_type_spelling(node, type_node, source);
        let macros = self.preprocessor.macros();

        let mut cursor = node.walk();
        let declarators: Vec<Node> = node.children_by_field_name("declarator", &mut cursor).collect();

        for declarator in declarators {
            let mut layers = Vec::new();
            let Some(name) = unwrap_declarator(declarator, source, &mut layers) else {
                continue;
            };

            let mut declaration = match layers.split_last() {
                Some((Layer::Function(parameters), outer)) => {
                    let return_type = spell_type(&base, outer, source, macros);
                    let parameters = collect_parameters(&name, *parameters, source, macros);
                    Declaration::function(name, return_type, parameters)
                }
                _ => Declaration::other(name),
            };
            if let Some(location) = unit.location(declarator.start_position().row) {
                declaration = declaration.with_location(location);
            }
            out.push(declaration);
        }
    }
}

fn collect_parameters(function: &str, list: Node, source: &str, macros: &MacroTable) -> Vec<RawParameter> {
    let declarations = parameter_declarations(list);
    if has_variadic_tail(list) {
        debug!(function, "variadic tail is not intercepted");
    }
    if is_void_parameter_list(&declarations, source) {
        return Vec::new();
    }
    declarations
        .into_iter()
        .map(|param| raw_parameter(param, source, macros))
        .collect()
}

/* Parse header text without touching the filesystem */
pub fn parse_header_source(
    source: &str,
    path: &Path,
    macros: MacroTable,
    stripper: MacroStripper,
) -> Result<Vec<Declaration>, LoadError> {
    let preprocessor = Preprocessor::new(HeaderResolver::new(Vec::new()), macros, false);
    HeaderParser::new(preprocessor, stripper)?.parse_source(source, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use brahma_types::DeclarationKind;

    fn parse(source: &str) -> Vec<Declaration> {
        parse_header_source(source, Path::new("test.h"), MacroTable::new(), MacroStripper::default()).unwrap()
    }

    fn parse_with(source: &str, defines: &[&str], strip: &[&str]) -> Vec<Declaration> {
        parse_header_source(
            source,
            Path::new("test.h"),
            MacroTable::from_command_line(defines),
            MacroStripper::new(strip),
        )
        .unwrap()
    }

    fn only_function(source: &str) -> Declaration {
        let declarations = parse(source);
        assert_eq!(declarations.len(), 1, "{:?}", declarations);
        declarations.into_iter().next().unwrap()
    }

    #[test]
    fn scalar_parameters_keep_their_spelling() {
        let decl = only_function("hid_t H5Fopen(const char *filename, unsigned int flags, hid_t fapl_id);");

        assert_eq!(decl.name, "H5Fopen");
        assert_eq!(decl.kind, DeclarationKind::Function);
        assert_eq!(decl.return_type, "hid_t");
        assert_eq!(
            decl.parameters,
            vec![
                RawParameter::scalar("filename", "const char *"),
                RawParameter::scalar("flags", "unsigned int"),
                RawParameter::scalar("fapl_id", "hid_t"),
            ]
        );
        assert_eq!(decl.location.as_ref().map(|l| l.line), Some(1));
    }

    #[test]
    fn void_parameter_list_is_empty() {
        let decl = only_function("herr_t H5open(void);");
        assert!(decl.parameters.is_empty());
    }

    #[test]
    fn pointer_return_types_are_spelled() {
        let decl = only_function("char *H5Iget_name_str(hid_t id);");
        assert_eq!(decl.name, "H5Iget_name_str");
        assert_eq!(decl.return_type, "char *");
    }

    #[test]
    fn pointer_qualifiers_follow_the_star() {
        let decl = only_function("int H5argv(const char *const *argv);");
        assert_eq!(decl.parameters, vec![RawParameter::scalar("argv", "const char *const *")]);
    }

    #[test]
    fn array_parameters_are_classified() {
        let decl = only_function("double H5norm(double buf[4], char path[], char *argv[]);");
        assert_eq!(
            decl.parameters,
            vec![
                RawParameter::constant_array("buf", "double", 4),
                RawParameter::incomplete_array("path", "char"),
                RawParameter::incomplete_array("argv", "char *"),
            ]
        );
    }

    #[test]
    fn array_bounds_resolve_through_defines() {
        let decl = parse("#define H5_RANK 3\nint H5dims(hsize_t dims[H5_RANK]);\n")
            .into_iter()
            .find(|d| d.name == "H5dims")
            .unwrap();
        assert_eq!(decl.parameters, vec![RawParameter::constant_array("dims", "hsize_t", 3)]);
    }

    #[test]
    fn unknown_array_bounds_keep_the_array_kind_without_a_count() {
        let decl = only_function("int H5dims(hsize_t dims[RANK]);");
        let param = &decl.parameters[0];
        assert_eq!(param.kind, ParamTypeKind::ConstantArray);
        assert_eq!(param.element_spelling.as_deref(), Some("hsize_t"));
        assert_eq!(param.element_count, None);
        assert_eq!(param.spelling, "hsize_t[RANK]");
    }

    #[test]
    fn function_pointer_parameters_pass_through() {
        let decl = only_function("herr_t H5Eset_auto(hid_t estack, herr_t (*func)(hid_t, void *), void *client_data);");
        assert_eq!(
            decl.parameters,
            vec![
                RawParameter::scalar("estack", "hid_t"),
                RawParameter::scalar("func", "herr_t (*)(hid_t, void *)"),
                RawParameter::scalar("client_data", "void *"),
            ]
        );
    }

    #[test]
    fn unnamed_parameters_have_empty_names() {
        let decl = only_function("int H5z(int, double *);");
        assert_eq!(
            decl.parameters,
            vec![RawParameter::scalar("", "int"), RawParameter::scalar("", "double *")]
        );
    }

    #[test]
    fn variables_are_not_functions() {
        let declarations = parse("extern int H5_global;\nint (*H5_hook)(int);\n");
        assert_eq!(declarations.len(), 2);
        assert!(declarations.iter().all(|d| !d.is_function()));
        assert_eq!(declarations[0].name, "H5_global");
        assert_eq!(declarations[1].name, "H5_hook");
    }

    #[test]
    fn only_the_active_conditional_branch_is_reported() {
        let source =
            "#ifdef H5_HAVE_PARALLEL\nherr_t H5Pset_mpio(hid_t fapl_id, int comm);\n#else\nherr_t H5Pset_mpio(hid_t fapl_id);\n#endif\n";

        let serial = parse(source);
        assert_eq!(serial.len(), 1);
        assert_eq!(serial[0].parameters.len(), 1);
        assert_eq!(serial[0].location.as_ref().map(|l| l.line), Some(4));

        let parallel = parse_with(source, &["H5_HAVE_PARALLEL"], &[]);
        assert_eq!(parallel.len(), 1);
        assert_eq!(parallel[0].parameters.len(), 2);
    }

    #[test]
    fn disabled_blocks_are_skipped() {
        let declarations = parse("#if 0\nint H5old(void);\n#endif\n#if 1\nint H5new(void);\n#endif\n");
        let names: Vec<&str> = declarations.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["H5new"]);
    }

    #[test]
    fn cplusplus_linkage_wrapper_is_not_a_declaration() {
        let source = r#"#ifdef __cplusplus
extern "C" {
#endif

H5_DLL herr_t H5open(void);
H5_DLL hid_t H5Fopen(const char *filename, unsigned flags, hid_t fapl_id);

#ifdef __cplusplus
}
#endif
"#;
        let declarations = parse_with(source, &[], &["H5_DLL"]);

        assert_eq!(declarations.len(), 2, "{:?}", declarations);
        assert!(declarations.iter().all(|d| d.is_function()));
        assert_eq!(declarations[0].name, "H5open");
        assert_eq!(declarations[0].return_type, "herr_t");
        assert!(declarations[0].parameters.is_empty());
        assert_eq!(declarations[1].name, "H5Fopen");
        assert_eq!(declarations[1].return_type, "hid_t");
        assert_eq!(declarations[1].parameters.len(), 3);
        assert_eq!(declarations[1].location.as_ref().map(|l| l.line), Some(6));
    }

    #[test]
    fn cplusplus_linkage_block_is_entered_when_defined() {
        let source = "#ifdef __cplusplus\nextern \"C\" {\n#endif\nint H5open(void);\n#ifdef __cplusplus\n}\n#endif\n";
        let declarations = parse_with(source, &["__cplusplus=201703L"], &[]);
        assert_eq!(declarations.len(), 1);
        assert_eq!(declarations[0].name, "H5open");
    }

    #[test]
    fn export_macros_are_stripped_before_parsing() {
        let declarations = parse_with("H5_DLL herr_t H5close(void);\n", &[], &["H5_DLL"]);
        assert_eq!(declarations.len(), 1);
        assert_eq!(declarations[0].name, "H5close");
        assert_eq!(declarations[0].return_type, "herr_t");
    }

    #[test]
    fn attribute_arguments_are_stripped_with_their_macro() {
        let declarations = parse_with(
            "H5_DLL herr_t H5Epush2(hid_t err_stack, const char *file, unsigned line, const char *fmt, ...) H5_ATTR_FORMAT(printf, 4, 5);\n",
            &[],
            &["H5_DLL", "H5_ATTR_FORMAT()"],
        );
        assert_eq!(declarations.len(), 1, "{:?}", declarations);
        assert_eq!(declarations[0].name, "H5Epush2");
        assert_eq!(declarations[0].return_type, "herr_t");
        assert_eq!(declarations[0].parameters.len(), 4);
    }

    #[test]
    fn array_bounds_accept_constant_expressions() {
        let decl = parse("#define H5_RANK 3\nint H5dims(hsize_t dims[H5_RANK * 2]);\n")
            .into_iter()
            .next()
            .unwrap();
        assert_eq!(decl.parameters, vec![RawParameter::constant_array("dims", "hsize_t", 6)]);
    }

    #[test]
    fn inline_definitions_are_functions() {
        let decl = only_function("static inline int H5max(int a, int b) { return a > b ? a : b; }");
        assert!(decl.is_function());
        assert_eq!(decl.return_type, "int");
        assert_eq!(decl.parameters.len(), 2);
    }
}
