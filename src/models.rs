use crate::api::hosts::ImageHosts;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Normalise a card name into its cache key.
///
/// Names are used verbatim apart from case folding, so "Fire // Ice" and
/// accented names keep their punctuation.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
}

/// Split the three type classification fields of a card row into one
/// de-duplicated tag set.
pub fn parse_type_tags<'a, I>(fields: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    fields
        .into_iter()
        .flat_map(|field| field.split([',', ';']))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Which side of a card an image shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Front,
    Back,
}

impl Face {
    /// Path segment used by the Scryfall CDN
    pub fn as_str(&self) -> &'static str {
        match self {
            Face::Front => "front",
            Face::Back => "back",
        }
    }
}

/// Downloaded card artwork.
///
/// Bytes are checked by the `image` crate on construction, so holding a
/// `CardImage` means the host returned something decodable. Clones share the
/// same buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct CardImage {
    bytes: Arc<[u8]>,
    width: u32,
    height: u32,
}

impl CardImage {
    /// Validate raw bytes as an image and read its dimensions
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, image::ImageError> {
        let (width, height) = image::ImageReader::new(Cursor::new(&bytes))
            .with_guessed_format()
            .map_err(image::ImageError::IoError)?
            .into_dimensions()?;

        Ok(Self {
            bytes: bytes.into(),
            width,
            height,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl fmt::Debug for CardImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardImage")
            .field("len", &self.bytes.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// One printing of a card, joined from the card and identifier tables.
///
/// Identity fields never change once the record is cached. The two image
/// slots are filled lazily, at most once each.
#[derive(Debug)]
pub struct CardRecord {
    pub name: String,
    /// Join key between the two tables
    pub(crate) uuid: String,
    /// Preferred image identifier (Scryfall CDN)
    pub scryfall_id: Option<String>,
    /// Fallback image identifier (Gatherer)
    pub multiverse_id: Option<String>,
    pub collector_number: Option<String>,
    pub set_code: Option<String>,
    pub type_tags: BTreeSet<String>,
    pub(crate) front_image: OnceCell<CardImage>,
    pub(crate) back_image: OnceCell<CardImage>,
}

impl CardRecord {
    pub(crate) fn new(
        name: String,
        uuid: String,
        collector_number: &str,
        set_code: &str,
        type_tags: BTreeSet<String>,
    ) -> Self {
        Self {
            name,
            uuid,
            scryfall_id: None,
            multiverse_id: None,
            collector_number: non_empty(collector_number),
            set_code: non_empty(set_code),
            type_tags,
            front_image: OnceCell::new(),
            back_image: OnceCell::new(),
        }
    }

    /// Copy image identifiers from an identifier table row
    pub(crate) fn set_image_ids(&mut self, scryfall_id: &str, multiverse_id: &str) {
        self.scryfall_id = non_empty(scryfall_id);
        self.multiverse_id = non_empty(multiverse_id);
    }

    /// Cache key this record is stored under
    pub fn key(&self) -> String {
        normalize_name(&self.name)
    }

    /// True if either image identifier is known
    pub fn has_downloadable_image(&self) -> bool {
        self.scryfall_id.is_some() || self.multiverse_id.is_some()
    }

    /// Type tags in the `type:<Type>` form used by role tagging
    pub fn type_tag_names(&self) -> Vec<String> {
        self.type_tags.iter().map(|t| format!("type:{}", t)).collect()
    }

    /// Tagging-site page for this printing, if set and number are known
    pub fn tagger_url(&self, hosts: &ImageHosts) -> Option<String> {
        hosts.tagger_url(self)
    }

    /// Front image if it has already been fetched
    pub fn front_image(&self) -> Option<&CardImage> {
        self.front_image.get()
    }

    /// Back image if it has already been fetched
    pub fn back_image(&self) -> Option<&CardImage> {
        self.back_image.get()
    }

    /// Plain-data view of the record
    pub fn summary(&self, hosts: &ImageHosts) -> CardSummary {
        CardSummary {
            name: self.name.clone(),
            set_code: self.set_code.clone(),
            collector_number: self.collector_number.clone(),
            scryfall_id: self.scryfall_id.clone(),
            multiverse_id: self.multiverse_id.clone(),
            type_tags: self.type_tags.iter().cloned().collect(),
            front_image_url: hosts.front_url(self),
            back_image_url: hosts.scryfall_url(self, Face::Back),
            tagger_url: hosts.tagger_url(self),
        }
    }
}

/// Serializable snapshot of a [`CardRecord`] without image data
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CardSummary {
    pub name: String,
    pub set_code: Option<String>,
    pub collector_number: Option<String>,
    pub scryfall_id: Option<String>,
    pub multiverse_id: Option<String>,
    pub type_tags: Vec<String>,
    pub front_image_url: Option<String>,
    pub back_image_url: Option<String>,
    pub tagger_url: Option<String>,
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
