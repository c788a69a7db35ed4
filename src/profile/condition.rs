use super::{BrowserFamily, BrowserProfile};

/// Predicate over a [`BrowserProfile`].
///
/// This closed set replaces per-browser marker types: gates in the catalogue and
/// rows in conditional tables both use it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrowserCondition {
    ChromeAndEdge,
    Chrome,
    Edge,
    ChromeAndEdgeAndFirefox,
    /// Any Firefox, latest or ESR.
    FF,
    /// Firefox newer than the ESR reference.
    FFLatest,
    /// Firefox exactly at the ESR reference.
    FFESR,
    IE,
    Any,
}

impl BrowserCondition {
    pub fn matches(self, profile: &BrowserProfile) -> bool {
        let family = profile.family();
        match self {
            Self::ChromeAndEdge => matches!(family, BrowserFamily::Chrome | BrowserFamily::Edge),
            Self::Chrome => family == BrowserFamily::Chrome,
            Self::Edge => family == BrowserFamily::Edge,
            Self::ChromeAndEdgeAndFirefox => family != BrowserFamily::InternetExplorer,
            Self::FF => family == BrowserFamily::Firefox,
            Self::FFLatest => {
                family == BrowserFamily::Firefox
                    && profile.version() > profile.firefox_esr_version()
            }
            Self::FFESR => {
                family == BrowserFamily::Firefox
                    && profile.version() == profile.firefox_esr_version()
            }
            Self::IE => family == BrowserFamily::InternetExplorer,
            Self::Any => true,
        }
    }

    /// Number of preset profiles this condition admits. Lower is more specific.
    pub fn breadth(self) -> usize {
        BrowserProfile::presets()
            .iter()
            .filter(|profile| self.matches(profile))
            .count()
    }

    /// True when every preset admitted by `self` is also admitted by `outer`.
    pub fn is_within(self, outer: BrowserCondition) -> bool {
        BrowserProfile::presets()
            .iter()
            .all(|profile| !self.matches(profile) || outer.matches(profile))
    }

    /// True when some preset is admitted by both conditions.
    pub fn overlaps(self, other: BrowserCondition) -> bool {
        BrowserProfile::presets()
            .iter()
            .any(|profile| self.matches(profile) && other.matches(profile))
    }
}

impl Default for BrowserCondition {
    fn default() -> Self {
        Self::Any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::FIREFOX_ESR_VERSION;

    #[test]
    fn esr_and_latest_split_on_reference() {
        let esr = BrowserProfile::new(BrowserFamily::Firefox, FIREFOX_ESR_VERSION);
        let latest = BrowserProfile::new(BrowserFamily::Firefox, FIREFOX_ESR_VERSION + 1);
        let older = BrowserProfile::new(BrowserFamily::Firefox, FIREFOX_ESR_VERSION - 1);

        assert!(BrowserCondition::FFESR.matches(&esr));
        assert!(!BrowserCondition::FFLatest.matches(&esr));
        assert!(BrowserCondition::FFLatest.matches(&latest));
        assert!(!BrowserCondition::FFESR.matches(&latest));
        assert!(!BrowserCondition::FFLatest.matches(&older));
        assert!(!BrowserCondition::FFESR.matches(&older));
        assert!(BrowserCondition::FF.matches(&older));
    }

    #[test]
    fn breadth_orders_by_specificity() {
        assert_eq!(BrowserCondition::Any.breadth(), 5);
        assert_eq!(BrowserCondition::ChromeAndEdgeAndFirefox.breadth(), 4);
        assert_eq!(BrowserCondition::FF.breadth(), 2);
        assert_eq!(BrowserCondition::FFESR.breadth(), 1);
        assert!(BrowserCondition::FFLatest.is_within(BrowserCondition::FF));
        assert!(!BrowserCondition::IE.overlaps(BrowserCondition::ChromeAndEdge));
    }
}
