use brahma_types::{Declaration, ParamTypeKind, Parameter, RawParameter, Signature, TypeDescriptor};
use std::collections::HashSet;
use tracing::{debug, warn};

/* ============================================================================
   Signature extraction
   ============================================================================ */

/// Select the function declarations whose name contains `prefix` and
/// normalize each into a [`Signature`].
///
/// Matching is a case-sensitive substring test, so `"H5"` also selects
/// `myH5helper`. Declaration order is kept and nothing is deduplicated.
pub fn extract(declarations: &[Declaration], prefix: &str) -> Vec<Signature> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut signatures = Vec::new();

    for declaration in declarations {
        if !declaration.is_function() || !declaration.name.contains(prefix) {
            continue;
        }

        if !seen.insert(declaration.name.as_str()) {
            warn!(function = %declaration.name, "function declared more than once, emitting every declaration");
        }

        signatures.push(extract_signature(declaration));
    }

    debug!(
        prefix,
        declarations = declarations.len(),
        matched = signatures.len(),
        "extracted signatures"
    );
    signatures
}

fn extract_signature(declaration: &Declaration) -> Signature {
    let parameters = declaration
        .parameters
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            if raw.name.is_empty() {
                warn!(
                    function = %declaration.name,
                    index,
                    "parameter has no name, generated argument lists will contain an empty token"
                );
            }
            Parameter::new(raw.name.clone(), classify(&declaration.name, raw))
        })
        .collect();

    Signature::new(
        declaration.name.clone(),
        declaration.return_type.clone(),
        parameters,
    )
}

/* Array kinds missing their element data fall back to the raw spelling */
fn classify(function: &str, raw: &RawParameter) -> TypeDescriptor {
    match (raw.kind, &raw.element_spelling, raw.element_count) {
        (ParamTypeKind::IncompleteArray, Some(element), _) => TypeDescriptor::incomplete_array(element.clone()),
        (ParamTypeKind::ConstantArray, Some(element), Some(count)) => {
            TypeDescriptor::fixed_array(element.clone(), count)
        }
        (ParamTypeKind::Scalar, _, _) => TypeDescriptor::scalar(raw.spelling.clone()),
        (kind, _, _) => {
            debug!(
                function,
                parameter = %raw.name,
                ?kind,
                spelling = %raw.spelling,
                "array parameter without element data, keeping raw spelling"
            );
            TypeDescriptor::scalar(raw.spelling.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(signatures: &[Signature]) -> Vec<&str> {
        signatures.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn keeps_only_functions_containing_prefix() {
        let declarations = vec![
            Declaration::function("H5Fopen", "hid_t", vec![]),
            Declaration::other("H5F_ACC_RDONLY"),
            Declaration::function("printf", "int", vec![]),
            Declaration::function("myH5helper", "void", vec![]),
            Declaration::function("h5lower", "void", vec![]),
        ];

        let signatures = extract(&declarations, "H5");
        assert_eq!(names(&signatures), vec!["H5Fopen", "myH5helper"]);
    }

    #[test]
    fn classifies_parameters() {
        let declarations = vec![Declaration::function(
            "H5Dwrite_chunk",
            "herr_t",
            vec![
                RawParameter::scalar("dset_id", "hid_t"),
                RawParameter::constant_array("offset", "hsize_t", 3),
                RawParameter::incomplete_array("buf", "const char *"),
            ],
        )];

        let signature = &extract(&declarations, "H5")[0];
        assert_eq!(signature.return_type, "herr_t");
        assert_eq!(
            signature.parameters,
            vec![
                Parameter::new("dset_id", TypeDescriptor::scalar("hid_t")),
                Parameter::new("offset", TypeDescriptor::fixed_array("hsize_t", 3)),
                Parameter::new("buf", TypeDescriptor::incomplete_array("const char *")),
            ]
        );
    }

    #[test]
    fn malformed_arrays_degrade_to_scalar() {
        let mut unbounded = RawParameter::constant_array("dims", "hsize_t", 0);
        unbounded.spelling = "hsize_t[H5S_MAX_RANK]".to_string();
        unbounded.element_count = None;

        let mut no_element = RawParameter::incomplete_array("names", "char *");
        no_element.element_spelling = None;

        let declarations = vec![Declaration::function("H5Sget", "int", vec![unbounded, no_element])];
        let signature = &extract(&declarations, "H5")[0];

        assert_eq!(signature.parameters[0].ty, TypeDescriptor::scalar("hsize_t[H5S_MAX_RANK]"));
        assert_eq!(signature.parameters[1].ty, TypeDescriptor::scalar("char *[]"));
    }

    #[test]
    fn duplicates_and_order_are_kept() {
        let declarations = vec![
            Declaration::function("H5Fclose", "herr_t", vec![]),
            Declaration::function("H5Fopen", "hid_t", vec![]),
            Declaration::function("H5Fclose", "herr_t", vec![]),
        ];
        assert_eq!(
            names(&extract(&declarations, "H5")),
            vec!["H5Fclose", "H5Fopen", "H5Fclose"]
        );
    }

    #[test]
    fn empty_parameter_names_pass_through() {
        let declarations = vec![Declaration::function(
            "H5Xf",
            "int",
            vec![RawParameter::scalar("", "int"), RawParameter::scalar("x", "double")],
        )];
        let signature = &extract(&declarations, "H5")[0];
        assert_eq!(signature.parameters[0].name, "");
        assert_eq!(signature.parameters[1].name, "x");
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(extract(&[], "H5").is_empty());
    }
}
