//! URL construction for the remote image and tagging hosts

use crate::models::{CardRecord, Face};

pub const SCRYFALL_CDN: &str = "https://cards.scryfall.io";
pub const GATHERER: &str = "https://gatherer.wizards.com";
pub const SCRYFALL_TAGGER: &str = "https://tagger.scryfall.com";

/// Base URLs of the hosts a card's images and tag page live on.
///
/// Overridable so tests can point everything at a mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHosts {
    pub scryfall_base: String,
    pub gatherer_base: String,
    pub tagger_base: String,
}

impl Default for ImageHosts {
    fn default() -> Self {
        Self {
            scryfall_base: SCRYFALL_CDN.to_string(),
            gatherer_base: GATHERER.to_string(),
            tagger_base: SCRYFALL_TAGGER.to_string(),
        }
    }
}

impl ImageHosts {
    /// Point every host at the same base URL
    pub fn all_at(base: &str) -> Self {
        Self {
            scryfall_base: base.to_string(),
            gatherer_base: base.to_string(),
            tagger_base: base.to_string(),
        }
    }

    /// Scryfall CDN image for one face, if the record has a Scryfall id
    pub fn scryfall_url(&self, card: &CardRecord, face: Face) -> Option<String> {
        let id = card.scryfall_id.as_deref()?;
        let mut chars = id.chars();
        let (first, second) = (chars.next()?, chars.next()?);

        Some(format!(
            "{}/large/{}/{}/{}/{}.jpg",
            self.scryfall_base.trim_end_matches('/'),
            face.as_str(),
            first,
            second,
            id
        ))
    }

    /// Gatherer image handler URL, if the record has a multiverse id
    pub fn gatherer_url(&self, card: &CardRecord) -> Option<String> {
        let id = card.multiverse_id.as_deref()?;
        Some(format!(
            "{}/Handlers/Image.ashx?multiverseid={}&type=card",
            self.gatherer_base.trim_end_matches('/'),
            id
        ))
    }

    /// Front image source: Scryfall first, Gatherer only when there is no
    /// Scryfall id
    pub fn front_url(&self, card: &CardRecord) -> Option<String> {
        self.scryfall_url(card, Face::Front)
            .or_else(|| self.gatherer_url(card))
    }

    pub fn tagger_url(&self, card: &CardRecord) -> Option<String> {
        let set_code = card.set_code.as_deref()?;
        let number = card.collector_number.as_deref()?;
        Some(format!(
            "{}/card/{}/{}",
            self.tagger_base.trim_end_matches('/'),
            set_code.to_lowercase(),
            number
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn card(scryfall_id: &str, multiverse_id: &str) -> CardRecord {
        let mut card = CardRecord::new(
            "Sol Ring".to_string(),
            "u1".to_string(),
            "267",
            "OTC",
            BTreeSet::new(),
        );
        card.set_image_ids(scryfall_id, multiverse_id);
        card
    }

    #[test]
    fn test_scryfall_front_and_back() {
        let hosts = ImageHosts::default();
        let card = card("abc123", "");

        assert_eq!(
            hosts.scryfall_url(&card, Face::Front).as_deref(),
            Some("https://cards.scryfall.io/large/front/a/b/abc123.jpg")
        );
        assert_eq!(
            hosts.scryfall_url(&card, Face::Back).as_deref(),
            Some("https://cards.scryfall.io/large/back/a/b/abc123.jpg")
        );
    }

    #[test]
    fn test_scryfall_id_too_short() {
        let hosts = ImageHosts::default();
        assert!(hosts.scryfall_url(&card("a", ""), Face::Front).is_none());
    }

    #[test]
    fn test_gatherer_url() {
        let hosts = ImageHosts::default();
        assert_eq!(
            hosts.gatherer_url(&card("", "130550")).as_deref(),
            Some("https://gatherer.wizards.com/Handlers/Image.ashx?multiverseid=130550&type=card")
        );
        assert!(hosts.gatherer_url(&card("abc", "")).is_none());
    }

    #[test]
    fn test_front_url_prefers_scryfall() {
        let hosts = ImageHosts::default();
        let both = card("abc123", "130550");
        assert!(hosts.front_url(&both).unwrap().contains("cards.scryfall.io"));

        let gatherer_only = card("", "130550");
        assert!(hosts
            .front_url(&gatherer_only)
            .unwrap()
            .contains("multiverseid=130550"));

        assert!(hosts.front_url(&card("", "")).is_none());
    }

    #[test]
    fn test_tagger_url_lowercases_set() {
        let hosts = ImageHosts::default();
        assert_eq!(
            hosts.tagger_url(&card("", "")).as_deref(),
            Some("https://tagger.scryfall.com/card/otc/267")
        );
    }

    #[test]
    fn test_tagger_url_requires_set_and_number() {
        let hosts = ImageHosts::default();
        let card = CardRecord::new(
            "Forest".to_string(),
            "u1".to_string(),
            "",
            "LEA",
            BTreeSet::new(),
        );
        assert!(hosts.tagger_url(&card).is_none());
    }

    #[test]
    fn test_trailing_slash_in_base() {
        let hosts = ImageHosts::all_at("http://127.0.0.1:9000/");
        assert_eq!(
            hosts.gatherer_url(&card("", "1")).as_deref(),
            Some("http://127.0.0.1:9000/Handlers/Image.ashx?multiverseid=1&type=card")
        );
    }
}
