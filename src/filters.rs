//! numeric range rules that classify completed responses
use std::fmt::{self, Display, Formatter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::StrikeFuzzError;
use crate::pool::ResponseStats;

/// response attribute a rule is evaluated against
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ResponseAttr {
    /// http status code
    Code,

    /// body size in bytes
    Size,

    /// whitespace-separated word count of the body
    Words,

    /// newline count of the body
    Lines,

    /// round-trip time in milliseconds
    Duration,
}

/// whether a rule excludes responses inside its range or outside of it
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RuleAction {
    /// exclusionary: drop the response if its attribute falls inside the range
    Filter,

    /// inclusionary: drop the response if its attribute falls outside the range
    Match,
}

/// one numeric range predicate over a response attribute
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FilterRule {
    /// attribute the rule inspects
    pub attr: ResponseAttr,

    /// filter (exclude inside) or match (exclude outside)
    pub action: RuleAction,

    /// inclusive lower bound
    pub low: u64,

    /// inclusive upper bound
    pub high: u64,
}

impl FilterRule {
    /// create a rule over the inclusive range `low..=high`
    #[must_use]
    pub const fn new(attr: ResponseAttr, action: RuleAction, low: u64, high: u64) -> Self {
        Self {
            attr,
            action,
            low,
            high,
        }
    }

    /// parse a rule from its cli text: either a single value (`404`) or an
    /// inclusive range (`400-499`)
    ///
    /// # Errors
    ///
    /// returns an error when the text isn't a number or `LO-HI` pair, or
    /// when the range is inverted
    pub fn parse(
        attr: ResponseAttr,
        action: RuleAction,
        rule: &str,
    ) -> Result<Self, StrikeFuzzError> {
        let (low, high) = match rule.split_once('-') {
            Some((low, high)) => {
                let low = low
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| StrikeFuzzError::InvalidFilterRule {
                        rule: rule.to_string(),
                        reason: "lower bound is not a number",
                    })?;

                let high = high
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| StrikeFuzzError::InvalidFilterRule {
                        rule: rule.to_string(),
                        reason: "upper bound is not a number",
                    })?;

                (low, high)
            }
            None => {
                let value = rule
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| StrikeFuzzError::InvalidFilterRule {
                        rule: rule.to_string(),
                        reason: "not a number",
                    })?;

                (value, value)
            }
        };

        if low > high {
            return Err(StrikeFuzzError::InvalidFilterRule {
                rule: rule.to_string(),
                reason: "range is inverted",
            });
        }

        Ok(Self::new(attr, action, low, high))
    }

    /// true when `stats`'s relevant attribute falls inside the rule's
    /// inclusive range
    #[must_use]
    pub fn contains(&self, stats: &ResponseStats) -> bool {
        let value = match self.attr {
            ResponseAttr::Code => u64::from(stats.status_code),
            ResponseAttr::Size => stats.size_bytes as u64,
            ResponseAttr::Words => stats.word_count as u64,
            ResponseAttr::Lines => stats.line_count as u64,
            ResponseAttr::Duration => stats.duration_ms,
        };

        (self.low..=self.high).contains(&value)
    }

    /// true when the response survives this rule
    #[must_use]
    pub fn allows(&self, stats: &ResponseStats) -> bool {
        match self.action {
            RuleAction::Filter => !self.contains(stats),
            RuleAction::Match => self.contains(stats),
        }
    }
}

impl Display for FilterRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let action = match self.action {
            RuleAction::Filter => "filter",
            RuleAction::Match => "match",
        };

        write!(f, "{action} {:?} {}-{}", self.attr, self.low, self.high)
    }
}

/// ordered list of rules; a response is reported iff it survives every rule
///
/// when the user supplies no rules, a default inclusionary rule matching
/// http status 200-399 applies; the explicit no-filtering flag disables that
/// default. transport-level errors bypass evaluation and are always
/// reported
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FilterSet {
    rules: Vec<FilterRule>,
}

impl FilterSet {
    /// default inclusionary rule applied when the user supplies none
    #[must_use]
    pub const fn default_rule() -> FilterRule {
        FilterRule::new(ResponseAttr::Code, RuleAction::Match, 200, 399)
    }

    /// build the evaluation set from user rules; `no_default` suppresses the
    /// implicit 200-399 match when the rule list is empty
    #[must_use]
    pub fn from_rules(rules: Vec<FilterRule>, no_default: bool) -> Self {
        if rules.is_empty() && !no_default {
            return Self {
                rules: vec![Self::default_rule()],
            };
        }

        Self { rules }
    }

    /// decide whether a completed response is reported
    #[must_use]
    #[instrument(skip_all, level = "trace")]
    pub fn evaluate(&self, stats: &ResponseStats) -> bool {
        if stats.transport_error.is_some() {
            // no http status was obtained; always surfaced to the user
            return true;
        }

        self.rules.iter().all(|rule| rule.allows(stats))
    }

    /// the rules in evaluation order
    #[must_use]
    pub fn rules(&self) -> &[FilterRule] {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats_with_status(status_code: u16) -> ResponseStats {
        ResponseStats {
            status_code,
            ..ResponseStats::default()
        }
    }

    /// given the default rule, a 404 is not reported and a 200 is
    #[test]
    fn default_rule_matches_success_statuses() {
        let filters = FilterSet::from_rules(Vec::new(), false);

        assert!(filters.evaluate(&stats_with_status(200)));
        assert!(filters.evaluate(&stats_with_status(301)));
        assert!(!filters.evaluate(&stats_with_status(404)));
        assert!(!filters.evaluate(&stats_with_status(500)));
    }

    /// the explicit no-filtering flag reports everything
    #[test]
    fn no_default_flag_disables_the_implicit_rule() {
        let filters = FilterSet::from_rules(Vec::new(), true);

        assert!(filters.evaluate(&stats_with_status(404)));
        assert!(filters.evaluate(&stats_with_status(200)));
    }

    /// an exclusionary `--fc 400-499` drops a 404 while a 200 still passes
    #[test]
    fn exclusionary_code_rule_drops_inside_the_range() {
        let rule =
            FilterRule::parse(ResponseAttr::Code, RuleAction::Filter, "400-499").unwrap();
        let filters = FilterSet::from_rules(vec![FilterSet::default_rule(), rule], false);

        assert!(!filters.evaluate(&stats_with_status(404)));
        assert!(filters.evaluate(&stats_with_status(200)));
    }

    /// rules are conjunctive; a response must survive every rule in order
    #[test]
    fn rules_are_evaluated_conjunctively() {
        let by_code = FilterRule::new(ResponseAttr::Code, RuleAction::Match, 200, 299);
        let by_size = FilterRule::new(ResponseAttr::Size, RuleAction::Filter, 0, 10);

        let filters = FilterSet::from_rules(vec![by_code, by_size], false);

        let mut stats = ResponseStats::from_response(200, b"large enough body", 1);
        assert!(filters.evaluate(&stats));

        stats.size_bytes = 5; // now inside the exclusionary size range
        assert!(!filters.evaluate(&stats));
    }

    /// transport-level errors bypass every rule
    #[test]
    fn transport_errors_are_always_reported() {
        let filters = FilterSet::from_rules(
            vec![FilterRule::new(ResponseAttr::Code, RuleAction::Match, 200, 200)],
            false,
        );

        let stats = ResponseStats::from_transport_error("timeout".to_string(), 1000);

        assert!(filters.evaluate(&stats));
    }

    #[test]
    fn rule_parsing_accepts_single_values_and_ranges() {
        let single = FilterRule::parse(ResponseAttr::Code, RuleAction::Filter, "404").unwrap();
        assert_eq!((single.low, single.high), (404, 404));

        let range = FilterRule::parse(ResponseAttr::Words, RuleAction::Match, "10-20").unwrap();
        assert_eq!((range.low, range.high), (10, 20));

        assert!(FilterRule::parse(ResponseAttr::Code, RuleAction::Filter, "4xx").is_err());
        assert!(FilterRule::parse(ResponseAttr::Code, RuleAction::Filter, "500-200").is_err());
    }

    /// duration rules classify on round-trip milliseconds
    #[test]
    fn duration_rule_uses_elapsed_milliseconds() {
        let slow_only = FilterRule::new(ResponseAttr::Duration, RuleAction::Match, 100, u64::MAX);
        let filters = FilterSet::from_rules(vec![slow_only], false);

        let mut stats = stats_with_status(200);
        stats.duration_ms = 250;
        assert!(filters.evaluate(&stats));

        stats.duration_ms = 50;
        assert!(!filters.evaluate(&stats));
    }
}
