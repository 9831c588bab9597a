//! Card lookup.
//!
//! Ties the table resolver, the record cache and the image resolver together
//! behind cancellable async calls that are safe to use from several tasks at
//! once (an interactive preview and background deck loads, for example).

use crate::api::{ImageHosts, ImageResolver};
use crate::cache::{RecordCache, WaitOutcome};
use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use crate::models::{normalize_name, CardImage, CardRecord};
use crate::tables::CardRecordResolver;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

/// Outcome of the one-time startup work
#[derive(Debug)]
struct Setup {
    placeholder: Option<CardImage>,
}

/// Resolves card names to records and artwork
#[derive(Debug)]
pub struct CardProvider {
    resolver: CardRecordResolver,
    images: ImageResolver,
    cache: RecordCache,
    card_back_url: String,
    setup: OnceCell<std::result::Result<Setup, ProviderError>>,
    scans: AtomicUsize,
}

impl CardProvider {
    /// Create a provider. Tables are not touched until the first lookup or
    /// an explicit [`initialise`](Self::initialise).
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| ProviderError::HttpClient(e.to_string()))?;

        Ok(Self {
            resolver: CardRecordResolver::new(&config.cards_path, &config.identifiers_path),
            images: ImageResolver::new(client, config.hosts),
            cache: RecordCache::new(),
            card_back_url: config.card_back_url,
            setup: OnceCell::new(),
            scans: AtomicUsize::new(0),
        })
    }

    /// Run the startup checks and download the placeholder back now.
    ///
    /// Runs at most once; later calls (and lookups) get the same outcome,
    /// including the same error if the tables are unusable.
    pub async fn initialise(&self) -> Result<()> {
        self.setup().await.map(|_| ())
    }

    async fn setup(&self) -> Result<&Setup> {
        self.setup
            .get_or_init(|| self.run_setup())
            .await
            .as_ref()
            .map_err(Clone::clone)
    }

    async fn run_setup(&self) -> std::result::Result<Setup, ProviderError> {
        log::info!("Initialising card provider");

        let resolver = self.resolver.clone();
        let validated = tokio::task::spawn_blocking(move || resolver.validate())
            .await
            .map_err(|e| ProviderError::ScanAborted(e.to_string()))
            .and_then(|result| result);
        if let Err(e) = validated {
            log::error!("Card provider setup failed: {}", e);
            return Err(e);
        }

        // Shared by every caller, so no single caller's token applies
        let placeholder = self
            .images
            .try_fetch_image(&self.card_back_url, &CancellationToken::new())
            .await;
        if placeholder.is_none() {
            log::warn!("No placeholder card back available");
        }

        Ok(Setup { placeholder })
    }

    /// Resolve a single card by name (any case).
    ///
    /// `Ok(None)` means the card is unknown, or the lookup was cancelled.
    pub async fn resolve_one(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Arc<CardRecord>>> {
        if name.is_empty() {
            return Ok(None);
        }
        Ok(self.resolve_many([name], cancel).await?.pop())
    }

    /// Resolve many cards with at most one pass over each table.
    ///
    /// Returns one record per name that was found, in no particular order.
    /// Names another caller is already resolving are awaited rather than
    /// scanned for again.
    pub async fn resolve_many<I, S>(
        &self,
        names: I,
        cancel: &CancellationToken,
    ) -> Result<Vec<Arc<CardRecord>>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pending: Vec<String> = names
            .into_iter()
            .filter(|name| !name.as_ref().is_empty())
            .map(|name| normalize_name(name.as_ref()))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        if cancel.is_cancelled() {
            return Ok(Vec::new());
        }
        // An abandoned setup leaves the cell empty for the next caller
        tokio::select! {
            _ = cancel.cancelled() => return Ok(Vec::new()),
            setup = self.setup() => {
                setup?;
            }
        }

        let mut found = Vec::new();
        while !pending.is_empty() && !cancel.is_cancelled() {
            let plan = self.cache.plan(std::mem::take(&mut pending));
            found.extend(plan.hits);

            if let Some(claim) = plan.claim {
                let manifest = claim.names().clone();
                self.scans.fetch_add(1, Ordering::Relaxed);
                let resolution = self.resolver.resolve(manifest, cancel).await?;
                found.extend(claim.complete(resolution.records, !resolution.cancelled));
            }

            for lookup in plan.waiting {
                let name = lookup.name().to_string();
                match lookup.wait(cancel).await {
                    WaitOutcome::Finished => found.extend(self.cache.get(&name)),
                    WaitOutcome::Abandoned => pending.push(name),
                    WaitOutcome::Cancelled => {}
                }
            }
        }

        log::debug!("Resolved {} card(s)", found.len());
        Ok(found)
    }

    /// Front and back artwork for a card.
    ///
    /// Download failures give `None` for that face; an unknown card gives
    /// `(None, None)`.
    pub async fn fetch_images(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<(Option<CardImage>, Option<CardImage>)> {
        let Some(card) = self.resolve_one(name, cancel).await? else {
            return Ok((None, None));
        };
        let placeholder = self.placeholder_back();
        Ok(self
            .images
            .fetch_images(&card, placeholder.as_ref(), cancel)
            .await)
    }

    /// Generic card back, once startup has downloaded it
    pub fn placeholder_back(&self) -> Option<CardImage> {
        self.setup
            .get()?
            .as_ref()
            .ok()?
            .placeholder
            .clone()
    }

    pub fn hosts(&self) -> &ImageHosts {
        self.images.hosts()
    }

    /// Number of records resolved so far
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Number of table resolutions started so far
    pub fn table_scans(&self) -> usize {
        self.scans.load(Ordering::Relaxed)
    }
}
