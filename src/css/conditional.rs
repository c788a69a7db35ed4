use crate::profile::{BrowserCondition, BrowserProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionalRow {
    pub condition: BrowserCondition,
    pub value: &'static str,
    pub iteratable: bool,
}

impl ConditionalRow {
    pub const fn new(condition: BrowserCondition, value: &'static str) -> Self {
        Self {
            condition,
            value,
            iteratable: true,
        }
    }

    pub const fn hidden(condition: BrowserCondition, value: &'static str) -> Self {
        Self {
            condition,
            value,
            iteratable: false,
        }
    }
}

/// The row selected for a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub value: &'static str,
    pub iteratable: bool,
}

/// Ordered rows resolved by first match. Rows are never reordered.
#[derive(Debug, Clone, Copy)]
pub struct ConditionalValueTable {
    rows: &'static [ConditionalRow],
}

impl ConditionalValueTable {
    pub const fn new(rows: &'static [ConditionalRow]) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &'static [ConditionalRow] {
        self.rows
    }

    pub fn resolve(&self, profile: &BrowserProfile) -> Option<Resolved> {
        resolve(profile, self.rows)
    }
}

pub fn resolve(profile: &BrowserProfile, rows: &[ConditionalRow]) -> Option<Resolved> {
    rows.iter()
        .find(|row| row.condition.matches(profile))
        .map(|row| Resolved {
            value: row.value,
            iteratable: row.iteratable,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROWS: &[ConditionalRow] = &[
        ConditionalRow::new(BrowserCondition::FFLatest, "latest"),
        ConditionalRow::new(BrowserCondition::FF, "any-firefox"),
        ConditionalRow::hidden(BrowserCondition::IE, "ie"),
    ];

    #[test]
    fn first_matching_row_wins() {
        let table = ConditionalValueTable::new(ROWS);
        assert_eq!(table.resolve(&BrowserProfile::firefox()).map(|r| r.value), Some("latest"));
        assert_eq!(
            table.resolve(&BrowserProfile::firefox_esr()).map(|r| r.value),
            Some("any-firefox")
        );
        assert_eq!(table.resolve(&BrowserProfile::chrome()), None);
    }

    #[test]
    fn hidden_rows_still_match() {
        let resolved = resolve(&BrowserProfile::internet_explorer(), ROWS).expect("ie row");
        assert_eq!(resolved.value, "ie");
        assert!(!resolved.iteratable);
    }

    #[test]
    fn resolution_is_idempotent() {
        for profile in BrowserProfile::presets() {
            assert_eq!(resolve(&profile, ROWS), resolve(&profile, ROWS));
        }
    }
}
