//! Domain selection grammar.
//!
//! A selection is a comma-separated list of terms, each a single
//! non-negative integer or an inclusive range `a-b` (swapped when `b < a`).
//! `"0,2-4,6"` selects `{0, 2, 3, 4, 6}`.

use std::collections::BTreeSet;

use crate::domain::foundation::DomainId;

/// Domains joined when no selection (or an empty one) is given.
pub const DEFAULT_DOMAINS: [u32; 6] = [0, 1, 2, 3, 4, 5];

/// Largest number of domains a single range term may expand to.
pub const MAX_RANGE_SPAN: u32 = 1024;

/// Deduplicated, ordered set of domains to subscribe to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DomainSet(BTreeSet<DomainId>);

/// Result of parsing a selection: the accepted domains plus every term that
/// could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DomainSelection {
    pub domains: DomainSet,
    pub rejected: Vec<String>,
}

impl DomainSet {
    pub fn default_set() -> Self {
        DEFAULT_DOMAINS.iter().copied().map(DomainId::new).collect()
    }

    /// Parses a selection string. Malformed terms are reported, not fatal.
    pub fn parse(input: &str) -> DomainSelection {
        let mut selection = DomainSelection::default();

        for term in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match parse_term(term) {
                Some((start, end)) => {
                    for id in start..=end {
                        selection.domains.0.insert(DomainId::new(id));
                    }
                }
                None => selection.rejected.push(term.to_string()),
            }
        }

        selection
    }

    /// Parses `input` when present, falling back to [`DEFAULT_DOMAINS`] when it
    /// is absent or selects nothing.
    pub fn parse_or_default(input: Option<&str>) -> DomainSelection {
        let mut selection = input.map(Self::parse).unwrap_or_default();
        if selection.domains.is_empty() {
            selection.domains = Self::default_set();
        }
        selection
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, id: DomainId) -> bool {
        self.0.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = DomainId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<DomainId> for DomainSet {
    fn from_iter<I: IntoIterator<Item = DomainId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Returns the inclusive bounds selected by one term.
fn parse_term(term: &str) -> Option<(u32, u32)> {
    match term.split_once('-') {
        Some((start, end)) => {
            let start: DomainId = start.parse().ok()?;
            let end: DomainId = end.parse().ok()?;
            let (low, high) = if end < start { (end, start) } else { (start, end) };
            if high.value() - low.value() >= MAX_RANGE_SPAN {
                return None;
            }
            Some((low.value(), high.value()))
        }
        None => {
            let id: DomainId = term.parse().ok()?;
            Some((id.value(), id.value()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ids(set: &DomainSet) -> Vec<u32> {
        set.iter().map(|d| d.value()).collect()
    }

    #[test]
    fn parses_mixed_terms() {
        let selection = DomainSet::parse("0,2-4,6");
        assert_eq!(ids(&selection.domains), vec![0, 2, 3, 4, 6]);
        assert!(selection.rejected.is_empty());
    }

    #[test]
    fn reversed_range_is_swapped() {
        let selection = DomainSet::parse("5-3");
        assert_eq!(ids(&selection.domains), vec![3, 4, 5]);
    }

    #[test]
    fn duplicates_collapse() {
        let selection = DomainSet::parse("1,1,0-2, 2");
        assert_eq!(ids(&selection.domains), vec![0, 1, 2]);
    }

    #[test]
    fn malformed_terms_are_reported_not_fatal() {
        let selection = DomainSet::parse("1,abc,3-,-2,4");
        assert_eq!(ids(&selection.domains), vec![1, 4]);
        assert_eq!(selection.rejected, vec!["abc", "3-", "-2"]);
    }

    #[test]
    fn oversized_range_is_rejected() {
        let selection = DomainSet::parse("0-100000");
        assert!(selection.domains.is_empty());
        assert_eq!(selection.rejected, vec!["0-100000"]);
    }

    #[test]
    fn absent_or_empty_input_uses_defaults() {
        assert_eq!(ids(&DomainSet::parse_or_default(None).domains), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(ids(&DomainSet::parse_or_default(Some("")).domains), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(ids(&DomainSet::parse_or_default(Some(" , ")).domains), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(ids(&DomainSet::parse_or_default(Some("7")).domains), vec![7]);
    }

    proptest! {
        #[test]
        fn range_term_selects_every_id_between_bounds(a in 0u32..500, b in 0u32..500) {
            let selection = DomainSet::parse(&format!("{}-{}", a, b));
            let (low, high) = if b < a { (b, a) } else { (a, b) };
            prop_assert_eq!(selection.domains.len() as u32, high - low + 1);
            prop_assert!(selection.domains.contains(DomainId::new(low)));
            prop_assert!(selection.domains.contains(DomainId::new(high)));
        }

        #[test]
        fn list_of_singles_is_its_own_set(values in proptest::collection::vec(0u32..1000, 1..20)) {
            let input = values.iter().map(u32::to_string).collect::<Vec<_>>().join(",");
            let selection = DomainSet::parse(&input);
            let expected: BTreeSet<u32> = values.into_iter().collect();
            prop_assert_eq!(ids(&selection.domains), expected.into_iter().collect::<Vec<_>>());
        }
    }
}
