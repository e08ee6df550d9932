//! Tunebridge client library
//!
//! Wires configuration, the credential store and the provider facades
//! together for the `tunebridge` binary. Exported for integration tests.

pub mod config;
pub mod consent_host;
pub mod registry;
pub mod unified;

use anyhow::{Context, Result};
use provider_apple_music::{AppleMusicProvider, MusicKit};
use provider_spotify::consent::ConsentFlow;
use provider_spotify::SpotifyProvider;
use std::sync::Arc;
use tracing::info;
use tunebridge_core::prelude::*;
use tunebridge_credentials::CredentialStore;

use config::Config;
use registry::ProviderRegistry;
use unified::UnifiedLibrary;

/// Authorization state of one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderStatus {
    pub provider: MusicProviderType,
    pub configured: bool,
    pub authorized: bool,
    /// Access token expiry, for providers with bearer tokens.
    pub token_expiry: Option<chrono::DateTime<chrono::Utc>>,
}

/// The configured providers of one client run.
pub struct Tunebridge {
    registry: Arc<ProviderRegistry>,
    spotify: Option<Arc<SpotifyProvider>>,
}

impl Tunebridge {
    /// Build the providers enabled in `config`.
    ///
    /// Apple Music is only available when the host supplies a MusicKit
    /// binding.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn CredentialStore>,
        consent: Arc<dyn ConsentFlow>,
        music_kit: Option<Arc<dyn MusicKit>>,
    ) -> Result<Self> {
        let mut registry = ProviderRegistry::new();

        let spotify = if config.spotify.enabled {
            let provider = SpotifyProvider::new(config.spotify.provider_config()?, store, consent)
                .context("Failed to create Spotify provider")?;
            let provider = Arc::new(provider);
            registry.register_shared(provider.clone());
            Some(provider)
        } else {
            None
        };

        if let Some(kit) = music_kit {
            registry.register(AppleMusicProvider::with_config(
                kit,
                config.apple_music.provider_config(),
            ));
        }

        info!("Configured providers: {:?}", registry.list());
        Ok(Self {
            registry: Arc::new(registry),
            spotify,
        })
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn library(&self) -> UnifiedLibrary {
        UnifiedLibrary::new(Arc::clone(&self.registry))
    }

    fn provider(&self, provider_type: MusicProviderType) -> Result<Arc<dyn MusicProvider>> {
        self.registry
            .get(provider_type)
            .with_context(|| format!("{} is not configured", provider_type))
    }

    pub async fn authorize(&self, provider_type: MusicProviderType) -> Result<()> {
        self.provider(provider_type)?
            .authorize()
            .await
            .with_context(|| format!("{} authorization failed", provider_type))
    }

    /// Forget stored authorization for `provider_type`.
    pub async fn logout(&self, provider_type: MusicProviderType) -> Result<()> {
        match provider_type {
            MusicProviderType::Spotify => {
                let spotify = self.spotify.as_ref().context("Spotify is not configured")?;
                spotify.deauthorize().await.context("Failed to remove Spotify tokens")
            }
            MusicProviderType::AppleMusic => {
                anyhow::bail!("Apple Music access is managed in the system privacy settings")
            }
        }
    }

    /// Status of every known provider, configured or not.
    pub async fn status(&self) -> Vec<ProviderStatus> {
        let mut statuses = Vec::new();
        for provider_type in MusicProviderType::ALL {
            let Some(provider) = self.registry.get(provider_type) else {
                statuses.push(ProviderStatus {
                    provider: provider_type,
                    configured: false,
                    authorized: false,
                    token_expiry: None,
                });
                continue;
            };

            let authorized = provider.is_authorized().await;
            let token_expiry = match (provider_type, &self.spotify) {
                (MusicProviderType::Spotify, Some(spotify)) if authorized => {
                    spotify.token_manager().token_expiry().await
                }
                _ => None,
            };

            statuses.push(ProviderStatus {
                provider: provider_type,
                configured: true,
                authorized,
                token_expiry,
            });
        }
        statuses
    }
}
