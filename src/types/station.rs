//! Defines the data structures representing MeteoSwiss weather stations and their
//! downloadable assets, together with the STAC wire records they are parsed from.
//!
//! Catalog responses are deserialized into loose wire records first and then
//! validated into [`Station`] values, so the rest of the crate never touches
//! untyped JSON.

use crate::catalog::error::CatalogError;
use log::warn;
use reqwest::Url;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Title used when a feature carries no `properties.title`.
pub const UNKNOWN_TITLE: &str = "N/A";

// --- Data Structures ---

/// A single downloadable file belonging to a station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// The asset name, e.g. `"abo_t_historical_1990-1999.csv"`. Encodes the station and
    /// the role of the file, and doubles as the local file name.
    pub name: String,
    /// Where the file can be downloaded from.
    pub href: Url,
}

/// A weather station as listed by the catalog.
///
/// A snapshot valid for one synchronization run; stations are fetched again on
/// every run and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Station {
    /// The catalog assigned identifier (e.g. `"abo"`), also the local directory name.
    pub id: String,
    /// Display name of the station (e.g. `"Adelboden"`).
    pub title: String,
    /// All files published for the station, in catalog order. Names are unique.
    pub assets: Vec<Asset>,
}

impl Station {
    pub fn asset(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|asset| asset.name == name)
    }
}

// --- Wire records ---

/// Body of `POST {api_base}/search`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SearchRequest {
    pub collections: Vec<String>,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// One page of search results.
#[derive(Debug, Deserialize)]
pub(crate) struct SearchPage {
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Link {
    pub rel: Option<String>,
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Feature {
    pub id: Option<String>,
    #[serde(default)]
    pub properties: Option<FeatureProperties>,
    #[serde(default, deserialize_with = "entries_in_order")]
    pub assets: Vec<(String, RawAsset)>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeatureProperties {
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAsset {
    pub href: Option<String>,
}

/// Reads a JSON object as its entries in document order.
fn entries_in_order<'de, D>(deserializer: D) -> Result<Vec<(String, RawAsset)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct EntriesVisitor;

    impl<'de> Visitor<'de> for EntriesVisitor {
        type Value = Vec<(String, RawAsset)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of assets")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(EntriesVisitor)
}

impl SearchPage {
    /// The cursor of the `next` link. `None` ends the pagination, also when a
    /// `next` link is present but carries no (or an empty) cursor.
    pub fn next_cursor(&self) -> Option<String> {
        let next = self
            .links
            .iter()
            .find(|link| link.rel.as_deref() == Some("next"))?;
        next.body
            .as_ref()?
            .get("cursor")?
            .as_str()
            .filter(|cursor| !cursor.is_empty())
            .map(str::to_owned)
    }
}

/// Whether a catalog supplied name can be used as a single path component.
fn is_safe_path_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.contains('\0')
}

impl TryFrom<Feature> for Station {
    type Error = CatalogError;

    fn try_from(feature: Feature) -> Result<Self, Self::Error> {
        let id = feature.id.unwrap_or_default();
        if !is_safe_path_component(&id) {
            return Err(CatalogError::InvalidFeature {
                id,
                reason: "station id is missing or not usable as a directory name".to_string(),
            });
        }

        let title = feature
            .properties
            .and_then(|p| p.title)
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());

        let mut assets: Vec<Asset> = Vec::with_capacity(feature.assets.len());
        for (name, raw) in feature.assets {
            if !is_safe_path_component(&name) {
                warn!("Dropping asset {:?} of station {}: unsafe file name", name, id);
                continue;
            }
            if assets.iter().any(|asset| asset.name == name) {
                warn!("Dropping duplicate asset {} of station {}", name, id);
                continue;
            }
            let Some(href) = raw.href else {
                warn!("Dropping asset {} of station {}: no href", name, id);
                continue;
            };
            match Url::parse(&href) {
                Ok(href) => assets.push(Asset { name, href }),
                Err(e) => {
                    warn!(
                        "Dropping asset {} of station {}: invalid href {:?} ({})",
                        name, id, href, e
                    );
                }
            }
        }

        Ok(Station { id, title, assets })
    }
}
