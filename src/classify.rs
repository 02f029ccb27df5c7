//! Selection of the assets that belong to a freshness tier.

use crate::types::station::Asset;
use crate::types::tier::Tier;

/// Restricts `assets` to the ones matching `tier`, keeping their order.
///
/// Historical stations return every matching decade file. Recent and now return at
/// most one file; should the catalog ever list several, the first one in catalog
/// order wins. A station without files for the tier yields an empty list, which is
/// not an error.
///
/// # Examples
///
/// ```
/// use meteoswiss_sync::{select, Asset, Tier};
/// use reqwest::Url;
///
/// let assets: Vec<Asset> = ["abc_t_historical_1990-1999.csv", "abc_t_now.csv", "abc_t_recent.csv"]
///     .into_iter()
///     .map(|name| Asset {
///         name: name.to_string(),
///         href: Url::parse(&format!("https://example.org/{name}")).unwrap(),
///     })
///     .collect();
///
/// let now = select(&assets, Tier::Now);
/// assert_eq!(now.len(), 1);
/// assert_eq!(now[0].name, "abc_t_now.csv");
/// ```
pub fn select(assets: &[Asset], tier: Tier) -> Vec<&Asset> {
    let mut matching = assets.iter().filter(|asset| tier.matches(&asset.name));

    if tier.allows_multiple() {
        matching.collect()
    } else {
        matching.next().into_iter().collect()
    }
}
