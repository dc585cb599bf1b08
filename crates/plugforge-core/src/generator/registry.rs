//! Backend lookup for the session driver.
//!
//! Backends register under [`Generator::name`]; the driver resolves the
//! configured name at session start and falls back to the first available
//! backend when the requested one is missing. Storage is ordered by name
//! so that fallback choice is deterministic however backends were
//! registered.

use std::collections::BTreeMap;

use super::trait_def::Generator;

/// The available generation backends, ordered by name.
#[derive(Default)]
pub struct GeneratorRegistry {
    generators: BTreeMap<String, Box<dyn Generator>>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under its own [`Generator::name`], returning the
    /// previously registered backend of the same name, if any.
    pub fn register(&mut self, generator: impl Generator + 'static) -> Option<Box<dyn Generator>> {
        self.generators
            .insert(generator.name().to_owned(), Box::new(generator))
    }

    pub fn get(&self, name: &str) -> Option<&dyn Generator> {
        self.generators.get(name).map(Box::as_ref)
    }

    /// The alphabetically first registered backend, used as the fallback
    /// when a requested backend is not registered.
    pub fn first(&self) -> Option<&str> {
        self.generators.keys().next().map(String::as_str)
    }

    /// Registered backend names, in name order.
    pub fn list(&self) -> Vec<&str> {
        self.generators.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}

impl std::fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("generators", &self.list())
            .finish()
    }
}
