//! Latency statistics over matched pairs.

use serde::{Deserialize, Serialize};

use crate::pairing::MatchedPair;

/// Aggregate statistics over a set of matched pairs.
///
/// All durations are in milliseconds. With no pairs every number is zero and
/// both extremal pairs are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencySummary {
    /// Mean duration, rounded half away from zero.
    pub average: i64,
    pub max: i64,
    pub min: i64,
    #[serde(rename = "total")]
    pub count: usize,
    /// First pair in list order with the maximum duration.
    #[serde(rename = "maxPair")]
    pub pair_at_max: Option<MatchedPair>,
    /// First pair in list order with the minimum duration.
    #[serde(rename = "minPair")]
    pub pair_at_min: Option<MatchedPair>,
}

/// Reduces matched pairs into a [`LatencySummary`].
pub fn summarize(pairs: &[MatchedPair]) -> LatencySummary {
    let Some(first) = pairs.first() else {
        return LatencySummary::default();
    };

    let mut at_min = first;
    let mut at_max = first;
    let mut total: i64 = 0;

    for pair in pairs {
        total = total.saturating_add(pair.duration_ms);
        // Strict comparisons keep the first occurrence on ties.
        if pair.duration_ms < at_min.duration_ms {
            at_min = pair;
        }
        if pair.duration_ms > at_max.duration_ms {
            at_max = pair;
        }
    }

    LatencySummary {
        average: rounded_mean(total, pairs.len()),
        max: at_max.duration_ms,
        min: at_min.duration_ms,
        count: pairs.len(),
        pair_at_max: Some(at_max.clone()),
        pair_at_min: Some(at_min.clone()),
    }
}

/// Integer mean of `total / count`, rounded half away from zero.
///
/// Returns 0 when `count` is 0.
pub fn rounded_mean(total: i64, count: usize) -> i64 {
    if count == 0 {
        return 0;
    }
    let total = i128::from(total);
    let count = i128::try_from(count).unwrap_or(i128::MAX);
    let rounded = (total.abs() * 2 + count) / (count * 2);
    let signed = if total < 0 { -rounded } else { rounded };
    i64::try_from(signed).unwrap_or(if signed < 0 { i64::MIN } else { i64::MAX })
}
