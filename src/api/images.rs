//! Card artwork downloads.
//!
//! Uses async reqwest for non-blocking HTTP requests. Every failure is typed
//! as a [`FetchFailure`] internally and collapsed to `None` for callers.

use crate::api::hosts::ImageHosts;
use crate::error::FetchFailure;
use crate::models::{CardImage, CardRecord, Face};
use tokio_util::sync::CancellationToken;

/// Downloads and memoises front/back images for card records
#[derive(Debug, Clone)]
pub struct ImageResolver {
    client: reqwest::Client,
    hosts: ImageHosts,
}

impl ImageResolver {
    pub fn new(client: reqwest::Client, hosts: ImageHosts) -> Self {
        Self { client, hosts }
    }

    pub fn hosts(&self) -> &ImageHosts {
        &self.hosts
    }

    /// Fetch image bytes from a URL and check that they decode
    pub async fn fetch_image(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<CardImage, FetchFailure> {
        if cancel.is_cancelled() {
            return Err(FetchFailure::Cancelled);
        }
        log::debug!("Fetching image from URL: {}", url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(FetchFailure::Status(response.status()));
        }

        let bytes = response.bytes().await?;
        Ok(CardImage::from_bytes(bytes.to_vec())?)
    }

    /// Like [`fetch_image`](Self::fetch_image) but logs and drops failures
    pub async fn try_fetch_image(&self, url: &str, cancel: &CancellationToken) -> Option<CardImage> {
        match self.fetch_image(url, cancel).await {
            Ok(image) => Some(image),
            Err(FetchFailure::Cancelled) => None,
            Err(e) => {
                log::warn!("Failed to fetch image from {}: {}", url, e);
                None
            }
        }
    }

    /// Front and back artwork for `card`.
    ///
    /// Each face is downloaded at most once per record; later calls return
    /// the memoised image without network access. A back face that cannot
    /// be fetched falls back to `placeholder`.
    ///
    /// Only successes are memoised. A front download that failed or was
    /// cancelled yields `None` and is attempted again on the next call, so
    /// a host that keeps failing is contacted once per call.
    pub async fn fetch_images(
        &self,
        card: &CardRecord,
        placeholder: Option<&CardImage>,
        cancel: &CancellationToken,
    ) -> (Option<CardImage>, Option<CardImage>) {
        let front = card
            .front_image
            .get_or_try_init(|| self.fetch_front(card, cancel))
            .await
            .ok()
            .cloned();

        let back = card
            .back_image
            .get_or_try_init(|| self.fetch_back(card, placeholder, cancel))
            .await
            .ok()
            .cloned();

        (front, back)
    }

    async fn fetch_front(
        &self,
        card: &CardRecord,
        cancel: &CancellationToken,
    ) -> Result<CardImage, FetchFailure> {
        let url = self.hosts.front_url(card).ok_or(FetchFailure::NoSource)?;
        self.fetch_image(&url, cancel).await.inspect_err(|e| {
            if !matches!(e, FetchFailure::Cancelled) {
                log::warn!("No front image for {} ({}): {}", card.name, url, e);
            }
        })
    }

    async fn fetch_back(
        &self,
        card: &CardRecord,
        placeholder: Option<&CardImage>,
        cancel: &CancellationToken,
    ) -> Result<CardImage, FetchFailure> {
        if let Some(url) = self.hosts.scryfall_url(card, Face::Back) {
            match self.fetch_image(&url, cancel).await {
                Ok(image) => return Ok(image),
                Err(FetchFailure::Cancelled) => return Err(FetchFailure::Cancelled),
                Err(e) => log::debug!("No back face for {} ({}): {}", card.name, url, e),
            }
        }
        if cancel.is_cancelled() {
            return Err(FetchFailure::Cancelled);
        }
        placeholder.cloned().ok_or(FetchFailure::NoSource)
    }
}

#[cfg(test)]
#[path = "images_tests.rs"]
mod tests;
