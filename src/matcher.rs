//! URL-to-rule matching.
//!
//! The first rule in table order whose pattern occurs in the URL wins. The
//! linear scan is the reference behaviour; the indexed mode runs all
//! patterns in a single `RegexSet` pass and takes the lowest matching index,
//! which is the same rule.

use regex::RegexSet;
use tracing::warn;

use crate::options::MatchMode;
use crate::rule::Rule;

/// Selects the rule for a URL from an ordered rule slice.
///
/// A `Matcher` built for one slice must only be used with that slice; the
/// [`RuleSet`](crate::store::RuleSet) snapshot keeps the two together.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    index: Option<RegexSet>,
}

impl Matcher {
    /// Matcher that scans rules one by one.
    #[must_use]
    pub fn linear() -> Self {
        Self { index: None }
    }

    /// Builds a matcher for `rules` in the requested mode.
    ///
    /// An indexed matcher whose `RegexSet` exceeds the regex size limits is
    /// replaced by a linear one.
    #[must_use]
    pub fn build(rules: &[Rule], mode: MatchMode) -> Self {
        match mode {
            MatchMode::Linear => Self::linear(),
            MatchMode::Indexed => match RegexSet::new(rules.iter().map(Rule::url_pattern)) {
                Ok(set) => Self { index: Some(set) },
                Err(err) => {
                    warn!(rules = rules.len(), error = %err, "cannot index rule patterns, matching linearly");
                    Self::linear()
                }
            },
        }
    }

    /// Mode actually in use.
    #[must_use]
    pub fn mode(&self) -> MatchMode {
        if self.index.is_some() {
            MatchMode::Indexed
        } else {
            MatchMode::Linear
        }
    }

    /// Position of the first rule in `rules` whose pattern occurs in `url`.
    #[must_use]
    pub fn position(&self, rules: &[Rule], url: &str) -> Option<usize> {
        match &self.index {
            Some(set) => set.matches(url).iter().next(),
            None => rules.iter().position(|rule| rule.is_match(url)),
        }
    }

    /// First rule in `rules` whose pattern occurs in `url`.
    ///
    /// `None` is the ordinary outcome for pages without a rule.
    #[must_use]
    pub fn find<'r>(&self, rules: &'r [Rule], url: &str) -> Option<&'r Rule> {
        self.position(rules, url).and_then(|at| rules.get(at))
    }
}
