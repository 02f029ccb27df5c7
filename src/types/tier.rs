//! Freshness tiers of the station data files and the rules that go with them.

use std::fmt;

/// Infix carried by every decade file of 10-minute historical measurements.
pub const HISTORICAL_INFIX: &str = "_t_historical_";
/// Extension of the mirrored data files.
pub const CSV_EXTENSION: &str = ".csv";
/// Suffix of the year-to-date file (January 1st until yesterday).
pub const RECENT_SUFFIX: &str = "_t_recent.csv";
/// Suffix of the rolling near-real-time file (yesterday 12:00 UTC until now).
pub const NOW_SUFFIX: &str = "_t_now.csv";

/// How an artifact that already exists locally is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresencePolicy {
    /// An existing file is complete; it is never fetched again.
    SkipIfExists,
    /// The remote file changes under the same name, so it is fetched every run.
    AlwaysOverwrite,
}

/// Represents the freshness tier of MeteoSwiss station data.
///
/// Each tier selects its own files out of a station's asset set and decides
/// whether a local copy is refreshed.
///
/// # Examples
///
/// ```
/// use meteoswiss_sync::{PresencePolicy, Tier};
///
/// assert!(Tier::Historical.matches("ABC_t_historical_1990-1999.csv"));
/// assert!(!Tier::Recent.matches("ABC_t_now.csv"));
/// assert_eq!(Tier::Now.presence_policy(), PresencePolicy::AlwaysOverwrite);
/// assert_eq!(Tier::Recent.to_string(), "recent");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Decade files from measurement start until December 31st of last year.
    /// Published once a year and immutable afterwards.
    Historical,
    /// Year-to-date file, refreshed daily at 12:00 UTC.
    Recent,
    /// Rolling realtime file, refreshed every 10 minutes.
    Now,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Historical, Tier::Recent, Tier::Now];

    /// Directory segment below the output root, also used for display.
    pub(crate) fn path_segment(&self) -> &'static str {
        match self {
            Tier::Historical => "historical",
            Tier::Recent => "recent",
            Tier::Now => "now",
        }
    }

    /// Whether an asset name belongs to this tier.
    pub fn matches(&self, asset_name: &str) -> bool {
        match self {
            Tier::Historical => {
                asset_name.contains(HISTORICAL_INFIX) && asset_name.ends_with(CSV_EXTENSION)
            }
            Tier::Recent => asset_name.ends_with(RECENT_SUFFIX),
            Tier::Now => asset_name.ends_with(NOW_SUFFIX),
        }
    }

    /// Historical stations carry one file per decade, the other tiers at most one file.
    pub fn allows_multiple(&self) -> bool {
        matches!(self, Tier::Historical)
    }

    pub fn presence_policy(&self) -> PresencePolicy {
        match self {
            Tier::Historical => PresencePolicy::SkipIfExists,
            Tier::Recent | Tier::Now => PresencePolicy::AlwaysOverwrite,
        }
    }

    /// Human readable label used in run reports.
    pub fn label(&self) -> &'static str {
        match self {
            Tier::Historical => "historical",
            Tier::Recent => "recent",
            Tier::Now => "realtime",
        }
    }

    /// Publication cadence of the upstream files.
    pub fn update_note(&self) -> &'static str {
        match self {
            Tier::Historical => "Historical data is updated once per year by MeteoSwiss",
            Tier::Recent => "Recent data is updated daily at 12:00 UTC by MeteoSwiss",
            Tier::Now => "Realtime data is updated every 10 minutes by MeteoSwiss",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_segment())
    }
}
