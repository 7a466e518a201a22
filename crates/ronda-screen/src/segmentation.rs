//! Segmentation registry: named functions that assign companies to peer groups.
//!
//! Built-in strategies:
//!
//! - `universe` - every company in a single peer group
//! - `sector` - by sector
//! - `industry` - by industry
//! - `cap_bucket` - by market-capitalization bucket
//! - `sector_cap` - by sector and cap bucket, joined as `sector|bucket`

use ronda_traits::{CompanyProfile, Result, RondaError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Opaque identifier of a peer group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentKey(String);

impl SegmentKey {
    /// Wrap a key string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A segmentation strategy.
///
/// Must be pure. A company lacking a required attribute yields
/// [`RondaError::SegmentationUnresolvable`].
pub type SegmentationFn = Arc<dyn Fn(&CompanyProfile) -> Result<SegmentKey> + Send + Sync>;

/// Market-capitalization bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapBucket {
    /// Below $50M.
    Nano,
    /// $50M to $300M.
    Micro,
    /// $300M to $2B.
    Small,
    /// $2B to $10B.
    Mid,
    /// $10B to $200B.
    Large,
    /// $200B and above.
    Mega,
}

impl CapBucket {
    /// Bucket for a market capitalization in dollars.
    pub fn from_market_cap(market_cap: f64) -> Self {
        match market_cap {
            c if c < 50e6 => Self::Nano,
            c if c < 300e6 => Self::Micro,
            c if c < 2e9 => Self::Small,
            c if c < 10e9 => Self::Mid,
            c if c < 200e9 => Self::Large,
            _ => Self::Mega,
        }
    }

    /// Lowercase label.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Nano => "nano",
            Self::Micro => "micro",
            Self::Small => "small",
            Self::Mid => "mid",
            Self::Large => "large",
            Self::Mega => "mega",
        }
    }
}

impl fmt::Display for CapBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn unresolvable(segmentation: &str, profile: &CompanyProfile, attribute: &str) -> RondaError {
    RondaError::SegmentationUnresolvable {
        segmentation: segmentation.to_string(),
        ticker: profile.ticker().to_string(),
        attribute: attribute.to_string(),
    }
}

fn sector_of<'p>(segmentation: &str, profile: &'p CompanyProfile) -> Result<&'p str> {
    profile
        .sector()
        .ok_or_else(|| unresolvable(segmentation, profile, "sector"))
}

fn bucket_of(segmentation: &str, profile: &CompanyProfile) -> Result<CapBucket> {
    match profile.market_cap() {
        Some(cap) if cap.is_finite() && cap > 0.0 => Ok(CapBucket::from_market_cap(cap)),
        _ => Err(unresolvable(segmentation, profile, "market_cap")),
    }
}

/// Every company in one peer group.
pub fn universe(_profile: &CompanyProfile) -> Result<SegmentKey> {
    Ok(SegmentKey::new("all"))
}

/// Peer group by sector.
pub fn by_sector(profile: &CompanyProfile) -> Result<SegmentKey> {
    sector_of("sector", profile).map(SegmentKey::new)
}

/// Peer group by industry.
pub fn by_industry(profile: &CompanyProfile) -> Result<SegmentKey> {
    profile
        .industry()
        .map(SegmentKey::new)
        .ok_or_else(|| unresolvable("industry", profile, "industry"))
}

/// Peer group by market-cap bucket.
pub fn by_cap_bucket(profile: &CompanyProfile) -> Result<SegmentKey> {
    bucket_of("cap_bucket", profile).map(|b| SegmentKey::new(b.as_str()))
}

/// Peer group by sector and market-cap bucket.
pub fn by_sector_cap(profile: &CompanyProfile) -> Result<SegmentKey> {
    let sector = sector_of("sector_cap", profile)?;
    let bucket = bucket_of("sector_cap", profile)?;
    Ok(SegmentKey::new(format!("{sector}|{bucket}")))
}

/// Metadata about a registered segmentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationInfo {
    /// Registered name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
}

struct Entry {
    description: String,
    func: SegmentationFn,
}

/// Name to segmentation function mapping.
///
/// Populated once before any screening run, then only borrowed.
#[derive(Default)]
pub struct SegmentationRegistry {
    entries: BTreeMap<String, Entry>,
}

impl fmt::Debug for SegmentationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentationRegistry")
            .field("names", &self.list())
            .finish()
    }
}

impl SegmentationRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in strategies.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let builtins: [(&str, &str, fn(&CompanyProfile) -> Result<SegmentKey>); 5] = [
            ("universe", "All companies in one peer group", universe),
            ("sector", "Peer group by sector", by_sector),
            ("industry", "Peer group by industry", by_industry),
            ("cap_bucket", "Peer group by market-cap bucket", by_cap_bucket),
            ("sector_cap", "Peer group by sector and market-cap bucket", by_sector_cap),
        ];
        for (name, description, func) in builtins {
            registry.entries.insert(
                name.to_string(),
                Entry {
                    description: description.to_string(),
                    func: Arc::new(func),
                },
            );
        }
        registry
    }

    /// Register a strategy under a new name.
    ///
    /// # Errors
    ///
    /// [`RondaError::DuplicateRegistration`] if the name is taken.
    pub fn register<F>(&mut self, name: &str, description: &str, func: F) -> Result<()>
    where
        F: Fn(&CompanyProfile) -> Result<SegmentKey> + Send + Sync + 'static,
    {
        if self.entries.contains_key(name) {
            return Err(RondaError::DuplicateRegistration(name.to_string()));
        }
        self.entries.insert(
            name.to_string(),
            Entry {
                description: description.to_string(),
                func: Arc::new(func),
            },
        );
        Ok(())
    }

    /// Look up a strategy.
    pub fn get(&self, name: &str) -> Option<SegmentationFn> {
        self.entries.get(name).map(|e| Arc::clone(&e.func))
    }

    /// Look up a strategy, failing on unknown names.
    ///
    /// # Errors
    ///
    /// [`RondaError::UnknownSegmentation`].
    pub fn require(&self, name: &str) -> Result<SegmentationFn> {
        self.get(name)
            .ok_or_else(|| RondaError::UnknownSegmentation(name.to_string()))
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Names with descriptions, sorted by name.
    pub fn infos(&self) -> Vec<SegmentationInfo> {
        self.entries
            .iter()
            .map(|(name, e)| SegmentationInfo {
                name: name.clone(),
                description: e.description.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn profile(sector: Option<&str>, cap: Option<f64>) -> CompanyProfile {
        CompanyProfile::builder("ACME", NaiveDate::from_ymd_opt(2020, 6, 30).unwrap())
            .sector(sector.map(str::to_string))
            .industry(Some("Widgets".to_string()))
            .market_cap(cap)
            .build()
    }

    #[test]
    fn test_cap_buckets() {
        assert_eq!(CapBucket::from_market_cap(10e6), CapBucket::Nano);
        assert_eq!(CapBucket::from_market_cap(50e6), CapBucket::Micro);
        assert_eq!(CapBucket::from_market_cap(1e9), CapBucket::Small);
        assert_eq!(CapBucket::from_market_cap(2e9), CapBucket::Mid);
        assert_eq!(CapBucket::from_market_cap(150e9), CapBucket::Large);
        assert_eq!(CapBucket::from_market_cap(2e12), CapBucket::Mega);
    }

    #[test]
    fn test_builtins() {
        let registry = SegmentationRegistry::with_defaults();
        assert_eq!(
            registry.list(),
            vec!["cap_bucket", "industry", "sector", "sector_cap", "universe"]
        );

        let p = profile(Some("Technology"), Some(5e9));
        let key = registry.require("sector_cap").unwrap()(&p).unwrap();
        assert_eq!(key.as_str(), "Technology|mid");
        assert_eq!(registry.require("industry").unwrap()(&p).unwrap().as_str(), "Widgets");
        assert_eq!(registry.require("universe").unwrap()(&p).unwrap().as_str(), "all");
    }

    #[test]
    fn test_missing_attribute_is_unresolvable() {
        let registry = SegmentationRegistry::with_defaults();
        let p = profile(None, Some(5e9));
        let err = registry.require("sector").unwrap()(&p).unwrap_err();
        assert!(matches!(
            err,
            RondaError::SegmentationUnresolvable { ref attribute, .. } if attribute == "sector"
        ));
        assert!(err.is_exclusion());

        let p = profile(Some("Energy"), None);
        assert!(registry.require("cap_bucket").unwrap()(&p).is_err());
    }

    #[test]
    fn test_register_custom_and_duplicate() {
        let mut registry = SegmentationRegistry::with_defaults();
        registry
            .register("first_letter", "By first ticker letter", |p| {
                Ok(SegmentKey::new(&p.ticker()[..1]))
            })
            .unwrap();
        let p = profile(Some("Energy"), None);
        assert_eq!(registry.require("first_letter").unwrap()(&p).unwrap().as_str(), "A");

        let err = registry
            .register("sector", "again", by_sector)
            .unwrap_err();
        assert!(matches!(err, RondaError::DuplicateRegistration(n) if n == "sector"));
    }

    #[test]
    fn test_unknown_segmentation() {
        let registry = SegmentationRegistry::with_defaults();
        assert!(matches!(
            registry.require("nope"),
            Err(RondaError::UnknownSegmentation(_))
        ));
    }
}
