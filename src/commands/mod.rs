//! Commands served by this process.
//!
//! - `/ping` - health check
//! - `/wiki` - record lookup with live autocomplete on `query`

pub mod ping;
pub mod wiki;

use std::sync::Arc;

use crate::config::WikiConfig;
use crate::router::{CommandDeclaration, CommandRegistry};
use crate::store::DocumentStore;

pub use wiki::Wiki;

/// Declarations for every command registered by [`registry`].
pub fn declarations() -> Vec<CommandDeclaration> {
    vec![ping::declaration(), wiki::declaration()]
}

/// Build the registry for every command, sharing one store handle.
pub fn registry(store: Arc<dyn DocumentStore>, config: &WikiConfig) -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    ping::register(&mut registry);
    wiki::register(&mut registry, Arc::new(Wiki::new(store, config.clone())));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_registry_matches_declarations() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let router = registry(store, &WikiConfig::default()).seal().unwrap();

        assert_eq!(router.paths(), vec!["/ping", "/wiki"]);
        router.check_declarations(&declarations()).unwrap();
    }
}
