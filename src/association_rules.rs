use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;

use rayon::prelude::*;
use serde::{Serialize, Serializer};
use tracing::info;

use crate::apriori::FrequentItemsets;
use crate::config::Metric;
use crate::error::{MiningError, Result};
use crate::itemset::{combinations, sorted_difference, Itemset};

/// Scores attached to a rule `A -> C`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RuleMetrics {
    pub antecedent_support: f64,
    pub consequent_support: f64,
    /// Support of `A ∪ C`.
    pub support: f64,
    pub confidence: f64,
    #[serde(serialize_with = "non_finite_as_string")]
    pub lift: f64,
    pub leverage: f64,
    /// `+inf` when confidence is 1, serialized as `"inf"`.
    #[serde(serialize_with = "non_finite_as_string")]
    pub conviction: f64,
}

/// JSON has no infinity; write it as a string rather than letting it become `null`.
fn non_finite_as_string<S>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else if value.is_nan() {
        serializer.serialize_str("nan")
    } else if value.is_sign_positive() {
        serializer.serialize_str("inf")
    } else {
        serializer.serialize_str("-inf")
    }
}

impl RuleMetrics {
    #[inline]
    pub fn compute(s_ac: f64, s_a: f64, s_c: f64) -> Self {
        let confidence = if s_a == 0.0 { f64::INFINITY } else { s_ac / s_a };
        // The product keeps lift(A -> C) and lift(C -> A) bit-identical.
        let expected = s_a * s_c;
        let lift = if expected == 0.0 { f64::INFINITY } else { s_ac / expected };
        let leverage = s_ac - expected;
        let conviction = if confidence >= 1.0 {
            f64::INFINITY
        } else {
            (1.0 - s_c) / (1.0 - confidence)
        };
        RuleMetrics {
            antecedent_support: s_a,
            consequent_support: s_c,
            support: s_ac,
            confidence,
            lift,
            leverage,
            conviction,
        }
    }

    #[inline]
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Support => self.support,
            Metric::Confidence => self.confidence,
            Metric::Lift => self.lift,
            Metric::Leverage => self.leverage,
            Metric::Conviction => self.conviction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociationRule<I> {
    pub antecedent: Itemset<I>,
    pub consequent: Itemset<I>,
    #[serde(flatten)]
    pub metrics: RuleMetrics,
}

impl<I: fmt::Display> fmt::Display for AssociationRule<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} (support {:.4}, confidence {:.4}, lift {:.4})",
            self.antecedent,
            self.consequent,
            self.metrics.support,
            self.metrics.confidence,
            self.metrics.lift
        )
    }
}

struct RawRule {
    antecedent: Vec<u32>,
    consequent: Vec<u32>,
    score: f64,
    metrics: RuleMetrics,
}

/// Every (antecedent, consequent) split of `itemset` with both sides non-empty.
fn rule_combinations(itemset: &[u32]) -> impl Iterator<Item = (Vec<u32>, Vec<u32>)> + '_ {
    (1..itemset.len()).flat_map(move |ant_size| {
        combinations(itemset, ant_size).map(move |ant| {
            let con = sorted_difference(itemset, &ant);
            (ant, con)
        })
    })
}

fn missing<I: fmt::Debug + Ord + Hash + Clone>(
    itemsets: &FrequentItemsets<I>,
    role: &'static str,
    ids: &[u32],
) -> MiningError {
    MiningError::MissingSupport {
        role,
        items: format!("{:?}", itemsets.vocabulary().decode(ids).items()),
    }
}

fn rules_for_itemset<I: fmt::Debug + Ord + Hash + Clone>(
    itemsets: &FrequentItemsets<I>,
    ids: &[u32],
    s_ac: f64,
    metric: Metric,
    min_threshold: f64,
) -> Result<Vec<RawRule>> {
    let mut rules = Vec::new();
    for (ant, con) in rule_combinations(ids) {
        let s_a = itemsets
            .support_of_ids(&ant)
            .ok_or_else(|| missing(itemsets, "antecedent", &ant))?;
        let s_c = itemsets
            .support_of_ids(&con)
            .ok_or_else(|| missing(itemsets, "consequent", &con))?;
        let metrics = RuleMetrics::compute(s_ac, s_a, s_c);
        let score = metrics.get(metric);
        if score >= min_threshold {
            rules.push(RawRule {
                antecedent: ant,
                consequent: con,
                score,
                metrics,
            });
        }
    }
    Ok(rules)
}

/// Selected metric descending, then confidence descending, then antecedent and
/// consequent in canonical order. Vocabulary ids preserve item order, so
/// comparing id vectors matches comparing the itemsets.
fn rule_order(a: &RawRule, b: &RawRule) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.metrics.confidence.total_cmp(&a.metrics.confidence))
        .then_with(|| a.antecedent.cmp(&b.antecedent))
        .then_with(|| a.consequent.cmp(&b.consequent))
}

/// Derive, score and filter association rules from a frequent itemset collection.
///
/// Every frequent itemset of size >= 2 is split into every non-empty proper
/// antecedent and its complement. A rule is kept when `metric >= min_threshold`.
/// No qualifying rule is an empty list, not an error.
pub fn association_rules<I>(
    itemsets: &FrequentItemsets<I>,
    metric: Metric,
    min_threshold: f64,
) -> Result<Vec<AssociationRule<I>>>
where
    I: fmt::Debug + Ord + Hash + Clone + Send + Sync,
{
    metric.validate_threshold(min_threshold)?;

    let sources: Vec<(&[u32], f64)> = itemsets
        .id_itemsets()
        .filter(|(ids, _)| ids.len() >= 2)
        .collect();

    let per_itemset: Vec<Vec<RawRule>> = sources
        .par_iter()
        .map(|&(ids, s_ac)| rules_for_itemset(itemsets, ids, s_ac, metric, min_threshold))
        .collect::<Result<_>>()?;

    let mut raw: Vec<RawRule> = per_itemset.into_iter().flatten().collect();
    raw.sort_by(rule_order);

    let vocabulary = itemsets.vocabulary();
    let rules: Vec<AssociationRule<I>> = raw
        .into_iter()
        .map(|r| AssociationRule {
            antecedent: vocabulary.decode(&r.antecedent),
            consequent: vocabulary.decode(&r.consequent),
            metrics: r.metrics,
        })
        .collect();

    info!(
        source_itemsets = sources.len(),
        rules = rules.len(),
        metric = metric.name(),
        min_threshold,
        "association rules generated"
    );
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apriori::apriori;
    use crate::config::EmptyTransactionPolicy;
    use crate::encoder::encode;
    use crate::membership::Representation;

    const EPS: f64 = 1e-9;

    fn scenario_itemsets() -> FrequentItemsets<&'static str> {
        let encoded = encode(
            vec![
                vec!["A", "B"],
                vec!["A", "B", "C"],
                vec!["A", "B"],
                vec!["A", "C"],
                vec!["B", "C"],
            ],
            Representation::Auto,
            EmptyTransactionPolicy::Reject,
        )
        .unwrap();
        apriori(&encoded, 0.4, None).unwrap()
    }

    #[test]
    fn splits_cover_every_proper_subset() {
        let splits: Vec<(Vec<u32>, Vec<u32>)> = rule_combinations(&[1, 2, 3]).collect();
        assert_eq!(splits.len(), 6);
        assert_eq!(splits[0], (vec![1], vec![2, 3]));
        assert_eq!(splits[5], (vec![2, 3], vec![1]));
    }

    #[test]
    fn metrics_follow_definitions() {
        let m = RuleMetrics::compute(0.6, 0.8, 0.8);
        assert!((m.confidence - 0.75).abs() < EPS);
        assert!((m.lift - 0.9375).abs() < EPS);
        assert!((m.leverage - (0.6 - 0.64)).abs() < EPS);
        assert!((m.conviction - 0.8).abs() < EPS);
        assert_eq!(m.get(Metric::Support), 0.6);

        let forward = RuleMetrics::compute(3.0 / 6.0, 4.0 / 6.0, 5.0 / 6.0);
        let backward = RuleMetrics::compute(3.0 / 6.0, 5.0 / 6.0, 4.0 / 6.0);
        assert_eq!(forward.lift.to_bits(), backward.lift.to_bits());
        assert_eq!(forward.leverage.to_bits(), backward.leverage.to_bits());

        let certain = RuleMetrics::compute(0.5, 0.5, 0.7);
        assert_eq!(certain.conviction, f64::INFINITY);
    }

    #[test]
    fn lift_threshold_keeps_symmetric_pair_in_antecedent_order() {
        let rules = association_rules(&scenario_itemsets(), Metric::Lift, 0.9).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].antecedent, Itemset::new(["A"]));
        assert_eq!(rules[0].consequent, Itemset::new(["B"]));
        assert_eq!(rules[1].antecedent, Itemset::new(["B"]));
        assert_eq!(rules[1].consequent, Itemset::new(["A"]));
        for rule in &rules {
            assert!((rule.metrics.confidence - 0.75).abs() < EPS);
            assert!((rule.metrics.lift - 0.9375).abs() < EPS);
            assert!((rule.metrics.support - 0.6).abs() < EPS);
        }
    }

    #[test]
    fn unreachable_threshold_gives_empty_list() {
        let rules = association_rules(&scenario_itemsets(), Metric::Lift, 1.1).unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn confidence_ordering_breaks_ties_on_antecedent() {
        let rules = association_rules(&scenario_itemsets(), Metric::Confidence, 0.0).unwrap();
        assert_eq!(rules.len(), 6);
        let confidences: Vec<f64> = rules.iter().map(|r| r.metrics.confidence).collect();
        assert!(confidences.windows(2).all(|w| w[0] >= w[1]));
        // A->B and B->A share the top confidence, A first.
        assert_eq!(rules[0].antecedent, Itemset::new(["A"]));
        assert_eq!(rules[1].antecedent, Itemset::new(["B"]));
    }

    #[test]
    fn no_pairs_means_no_rules() {
        let encoded = encode(
            vec![vec!["A"], vec!["B"]],
            Representation::Auto,
            EmptyTransactionPolicy::Reject,
        )
        .unwrap();
        let itemsets = apriori(&encoded, 0.5, None).unwrap();
        assert_eq!(itemsets.len(), 2);
        assert!(association_rules(&itemsets, Metric::Lift, 0.0).unwrap().is_empty());
    }

    #[test]
    fn invalid_threshold_is_a_configuration_error() {
        let err = association_rules(&scenario_itemsets(), Metric::Confidence, 2.0).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn incomplete_collection_reports_missing_support() {
        let itemsets = FrequentItemsets::from_supports(
            vec![(Itemset::new(["A"]), 0.5), (Itemset::new(["A", "B"]), 0.4)],
            10,
        )
        .unwrap();
        let err = association_rules(&itemsets, Metric::Lift, 0.0).unwrap_err();
        assert!(matches!(err, MiningError::MissingSupport { role: "consequent", .. }));
    }

    #[test]
    fn infinite_conviction_survives_json() {
        let rule = AssociationRule {
            antecedent: Itemset::new(["A"]),
            consequent: Itemset::new(["B"]),
            metrics: RuleMetrics::compute(0.5, 0.5, 0.7),
        };
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["conviction"], serde_json::json!("inf"));
        assert_eq!(json["confidence"], serde_json::json!(1.0));
        assert!(json["lift"].is_f64());
    }

    #[test]
    fn displays_rule() {
        let rules = association_rules(&scenario_itemsets(), Metric::Lift, 0.9).unwrap();
        assert_eq!(
            rules[0].to_string(),
            "{A} -> {B} (support 0.6000, confidence 0.7500, lift 0.9375)"
        );
    }
}
