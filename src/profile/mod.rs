//! Emulated browser profiles.
//!
//! A [`BrowserProfile`] is fixed once built: every gate in the catalogue and every
//! conditional table row is evaluated against it, so lookups stay O(1).

mod condition;
mod features;

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

pub use condition::BrowserCondition;
pub use features::{FeatureSet, FeatureTag};

/// Major version of the Firefox extended support release. `FFESR` and `FFLatest`
/// both compare against this value.
pub const FIREFOX_ESR_VERSION: u32 = 91;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BrowserFamily {
    Chrome,
    Edge,
    Firefox,
    InternetExplorer,
}

#[derive(Debug, Clone)]
pub struct BrowserProfile {
    family: BrowserFamily,
    version: u32,
    firefox_esr_version: u32,
    features: FeatureSet,
}

impl BrowserProfile {
    pub fn new(family: BrowserFamily, version: u32) -> Self {
        let mut profile = Self {
            family,
            version,
            firefox_esr_version: FIREFOX_ESR_VERSION,
            features: FeatureSet::empty(),
        };
        profile.features = FeatureSet::for_profile(&profile);
        profile
    }

    pub fn chrome() -> Self {
        Self::new(BrowserFamily::Chrome, 105)
    }

    pub fn edge() -> Self {
        Self::new(BrowserFamily::Edge, 105)
    }

    pub fn firefox() -> Self {
        Self::new(BrowserFamily::Firefox, 104)
    }

    pub fn firefox_esr() -> Self {
        Self::new(BrowserFamily::Firefox, FIREFOX_ESR_VERSION)
    }

    pub fn internet_explorer() -> Self {
        Self::new(BrowserFamily::InternetExplorer, 11)
    }

    /// The profiles the catalogue is validated against.
    pub fn presets() -> [BrowserProfile; 5] {
        [
            Self::chrome(),
            Self::edge(),
            Self::firefox(),
            Self::firefox_esr(),
            Self::internet_explorer(),
        ]
    }

    pub fn family(&self) -> BrowserFamily {
        self.family
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn firefox_esr_version(&self) -> u32 {
        self.firefox_esr_version
    }

    pub fn is_chrome(&self) -> bool {
        self.family == BrowserFamily::Chrome
    }

    pub fn is_edge(&self) -> bool {
        self.family == BrowserFamily::Edge
    }

    pub fn is_firefox(&self) -> bool {
        self.family == BrowserFamily::Firefox
    }

    pub fn is_ie(&self) -> bool {
        self.family == BrowserFamily::InternetExplorer
    }

    pub fn has(&self, feature: FeatureTag) -> bool {
        self.features.contains(feature)
    }

    pub fn satisfies(&self, condition: BrowserCondition) -> bool {
        condition.matches(self)
    }

    /// Short label used in logs, e.g. `FF104` or `IE11`.
    pub fn nickname(&self) -> String {
        let prefix = match self.family {
            BrowserFamily::Chrome => "Chrome",
            BrowserFamily::Edge => "Edge",
            BrowserFamily::Firefox => "FF",
            BrowserFamily::InternetExplorer => "IE",
        };
        format!("{prefix}{}", self.version)
    }
}

impl PartialEq for BrowserProfile {
    fn eq(&self, other: &Self) -> bool {
        self.family == other.family && self.version == other.version
    }
}

impl Eq for BrowserProfile {}

impl Hash for BrowserProfile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.family.hash(state);
        self.version.hash(state);
    }
}

impl fmt::Display for BrowserProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.nickname())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_feature_set() {
        assert_eq!(BrowserProfile::chrome(), BrowserProfile::new(BrowserFamily::Chrome, 105));
        assert_ne!(BrowserProfile::firefox(), BrowserProfile::firefox_esr());
    }

    #[test]
    fn predicates_follow_family() {
        let ie = BrowserProfile::internet_explorer();
        assert!(ie.is_ie());
        assert!(!ie.is_chrome());
        assert!(BrowserProfile::edge().is_edge());
        assert!(!BrowserProfile::edge().is_chrome());
        assert_eq!(BrowserProfile::firefox_esr().nickname(), "FF91");
    }

    #[test]
    fn features_come_from_registry() {
        assert!(BrowserProfile::internet_explorer().has(FeatureTag::JsXmlSupportViaActiveXObject));
        assert!(!BrowserProfile::chrome().has(FeatureTag::JsXmlSupportViaActiveXObject));
        assert!(BrowserProfile::firefox().has(FeatureTag::HtmlkeygenEndTagForbidden));
    }
}
