use super::{BrowserCondition, BrowserProfile};

/// Closed set of capability flags a profile may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureTag {
    /// `<basefont>` is serialised without an end tag.
    HtmlbasefontEndTagForbidden,
    /// `<keygen>` is serialised without an end tag.
    HtmlkeygenEndTagForbidden,
    /// Legacy XML properties (`cite`) are exposed through the ActiveXObject mechanism.
    JsXmlSupportViaActiveXObject,
    /// `align` setters store any value instead of rejecting unknown keywords.
    JsAlignAcceptsArbitraryValues,
    /// Returning `false` from an `on<type>` handler cancels the event.
    JsEventHandlerReturnFalsePreventsDefault,
}

impl FeatureTag {
    pub const ALL: [FeatureTag; 5] = [
        FeatureTag::HtmlbasefontEndTagForbidden,
        FeatureTag::HtmlkeygenEndTagForbidden,
        FeatureTag::JsXmlSupportViaActiveXObject,
        FeatureTag::JsAlignAcceptsArbitraryValues,
        FeatureTag::JsEventHandlerReturnFalsePreventsDefault,
    ];

    /// Registry entry: the profiles that enable this feature.
    pub fn enabled_for(self) -> BrowserCondition {
        match self {
            Self::HtmlbasefontEndTagForbidden => BrowserCondition::IE,
            Self::HtmlkeygenEndTagForbidden => BrowserCondition::ChromeAndEdgeAndFirefox,
            Self::JsXmlSupportViaActiveXObject => BrowserCondition::IE,
            Self::JsAlignAcceptsArbitraryValues => BrowserCondition::ChromeAndEdgeAndFirefox,
            Self::JsEventHandlerReturnFalsePreventsDefault => BrowserCondition::Any,
        }
    }

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureSet(u32);

impl FeatureSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub(super) fn for_profile(profile: &BrowserProfile) -> Self {
        FeatureTag::ALL
            .iter()
            .filter(|tag| tag.enabled_for().matches(profile))
            .fold(Self::empty(), |set, tag| Self(set.0 | tag.bit()))
    }

    pub fn contains(&self, tag: FeatureTag) -> bool {
        self.0 & tag.bit() != 0
    }
}
