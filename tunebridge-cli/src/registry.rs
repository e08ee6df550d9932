//! # Provider Registry
//!
//! Holds the provider facades that are configured for this run, keyed by the
//! service they talk to. Providers are stored as trait objects so the rest of
//! the client works with any [`MusicProvider`].

use std::collections::HashMap;
use std::sync::Arc;
use tunebridge_core::prelude::*;

/// Registry of configured providers.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use provider_apple_music::{AppleMusicProvider, MusicKit};
/// use tunebridge_cli::registry::ProviderRegistry;
/// use tunebridge_core::MusicProviderType;
///
/// # fn example(kit: Arc<dyn MusicKit>) {
/// let mut registry = ProviderRegistry::new();
/// registry.register(AppleMusicProvider::new(kit));
///
/// assert!(registry.contains(MusicProviderType::AppleMusic));
/// # }
/// ```
pub struct ProviderRegistry {
    providers: HashMap<MusicProviderType, Arc<dyn MusicProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Register a provider, replacing any provider of the same type.
    pub fn register<P>(&mut self, provider: P)
    where
        P: MusicProvider + 'static,
    {
        self.register_shared(Arc::new(provider));
    }

    /// Register a provider the caller keeps a handle to.
    pub fn register_shared(&mut self, provider: Arc<dyn MusicProvider>) {
        self.providers.insert(provider.provider_type(), provider);
    }

    pub fn get(&self, provider_type: MusicProviderType) -> Option<Arc<dyn MusicProvider>> {
        self.providers.get(&provider_type).cloned()
    }

    /// Registered provider types, in a stable order.
    pub fn list(&self) -> Vec<MusicProviderType> {
        MusicProviderType::ALL
            .into_iter()
            .filter(|provider_type| self.providers.contains_key(provider_type))
            .collect()
    }

    pub fn count(&self) -> usize {
        self.providers.len()
    }

    pub fn contains(&self, provider_type: MusicProviderType) -> bool {
        self.providers.contains_key(&provider_type)
    }

    pub fn remove(&mut self, provider_type: MusicProviderType) -> Option<Arc<dyn MusicProvider>> {
        self.providers.remove(&provider_type)
    }

    /// Deep link for an entry from any provider.
    ///
    /// Uses the registered facade of the entry's own provider, or the pure
    /// builder when that provider is not configured.
    pub fn deep_link(&self, item: LibraryItem<'_>) -> Option<DeepLink> {
        match self.providers.get(&item.source_provider()) {
            Some(provider) => provider.deep_link(item),
            None => deeplink::deep_link(item),
        }
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
