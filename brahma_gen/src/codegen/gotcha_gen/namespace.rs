/* Scope of one generated interface.
 *
 * The short name ("hdf5") names the generated files and the update_/count_
 * functions; the token ("HDF5") names the C++ class and the include and
 * BRAHMA_ENABLE_ guards. */
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    name: String,
    token: String,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let token = name.to_uppercase();
        Self { name, token }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_upper_cased_name() {
        let ns = Namespace::new("hdf5");
        assert_eq!(ns.name(), "hdf5");
        assert_eq!(ns.token(), "HDF5");
        assert_eq!(ns.to_string(), "hdf5");
    }
}
