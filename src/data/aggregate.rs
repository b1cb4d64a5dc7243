use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::model::{Dimension, Record, RecordStore};

// ---------------------------------------------------------------------------
// Grouping key
// ---------------------------------------------------------------------------

/// Column the filtered relation is grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GroupKey {
    /// One row per drug / item name.
    #[default]
    Item,
    /// One row per value of a categorical dimension, e.g. provider
    /// distribution for a chosen set of drugs.
    Dimension(Dimension),
}

impl GroupKey {
    fn value<'a>(&self, record: &'a Record) -> Option<&'a str> {
        match self {
            GroupKey::Item => record.item_name.as_deref(),
            GroupKey::Dimension(dim) => record.dimension(*dim),
        }
    }
}

impl std::str::FromStr for GroupKey {
    type Err = super::model::UnknownDimension;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "item" | "itemName" | "Nama Item Garda Medika" => Ok(GroupKey::Item),
            other => other.parse().map(GroupKey::Dimension),
        }
    }
}

impl TryFrom<String> for GroupKey {
    type Error = super::model::UnknownDimension;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GroupKey> for String {
    fn from(value: GroupKey) -> Self {
        match value {
            GroupKey::Item => "item".to_string(),
            GroupKey::Dimension(dim) => dim.name().to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// GroupSummary – one output row
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    /// Value of the grouping column (the item name unless grouped otherwise).
    pub key: String,
    pub total_quantity: f64,
    pub total_bill_amount: f64,
    /// Quantity-weighted median of the unit price.
    pub representative_unit_price: f64,
    pub drug_class: Option<String>,
    pub drug_subclass: Option<String>,
    pub active_ingredient_composition: Option<String>,
}

impl GroupSummary {
    pub fn rounded_quantity(&self) -> i64 {
        round_to_int(self.total_quantity)
    }

    pub fn rounded_bill_amount(&self) -> i64 {
        round_to_int(self.total_bill_amount)
    }

    pub fn rounded_unit_price(&self) -> i64 {
        round_to_int(self.representative_unit_price)
    }
}

/// Display rounding for every aggregated number: half-to-even, then cast.
pub fn round_to_int(value: f64) -> i64 {
    value.round_ties_even() as i64
}

// ---------------------------------------------------------------------------
// Weighted median
// ---------------------------------------------------------------------------

/// Quantity-weighted median of `(price, quantity)` observations.
///
/// Observations are stably sorted by price; the answer is the price of the
/// first observation whose running quantity reaches half the total. With a
/// zero total the first sorted observation wins. `None` only for no input.
pub fn weighted_median(observations: &[(f64, f64)]) -> Option<f64> {
    let mut sorted = observations.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let target = sorted.iter().map(|(_, qty)| qty).sum::<f64>() / 2.0;
    let mut cumulative = 0.0;
    for &(price, qty) in &sorted {
        cumulative += qty;
        if cumulative >= target {
            return Some(price);
        }
    }
    // Float rounding can leave the last running sum a hair under target.
    sorted.last().map(|(price, _)| *price)
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

struct GroupAccumulator<'a> {
    key: &'a str,
    quantity: f64,
    bill_amount: f64,
    prices: Vec<(f64, f64)>,
    drug_class: Option<&'a str>,
    drug_subclass: Option<&'a str>,
    active_ingredient_composition: Option<&'a str>,
}

/// Keep the first non-missing value seen for a descriptor column.
fn fill_first<'a>(slot: &mut Option<&'a str>, value: &'a Option<String>) {
    if slot.is_none() {
        *slot = value.as_deref();
    }
}

/// Group the records at `indices` by `key`, in first-seen key order.
///
/// Descriptor columns take the first non-missing value in row order, each
/// column on its own. Records with a missing key are skipped. An empty
/// `indices` slice yields an empty result.
pub fn aggregate(store: &RecordStore, indices: &[usize], key: GroupKey) -> Vec<GroupSummary> {
    let mut slots = HashMap::<&str, usize>::new();
    let mut groups = Vec::<GroupAccumulator<'_>>::new();

    for record in indices.iter().filter_map(|&i| store.record(i)) {
        let Some(value) = key.value(record) else {
            continue;
        };
        let slot = *slots.entry(value).or_insert_with(|| {
            groups.push(GroupAccumulator {
                key: value,
                quantity: 0.0,
                bill_amount: 0.0,
                prices: Vec::new(),
                drug_class: None,
                drug_subclass: None,
                active_ingredient_composition: None,
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.quantity += record.quantity;
        group.bill_amount += record.bill_amount;
        group.prices.push((record.unit_price, record.quantity));
        fill_first(&mut group.drug_class, &record.drug_class);
        fill_first(&mut group.drug_subclass, &record.drug_subclass);
        fill_first(
            &mut group.active_ingredient_composition,
            &record.active_ingredient_composition,
        );
    }

    groups
        .into_iter()
        .map(|g| GroupSummary {
            key: g.key.to_string(),
            total_quantity: g.quantity,
            total_bill_amount: g.bill_amount,
            representative_unit_price: weighted_median(&g.prices).unwrap_or(0.0),
            drug_class: g.drug_class.map(str::to_string),
            drug_subclass: g.drug_subclass.map(str::to_string),
            active_ingredient_composition: g.active_ingredient_composition.map(str::to_string),
        })
        .collect()
}

/// Sum of bill amounts across all groups.
pub fn total_bill_amount(summaries: &[GroupSummary]) -> f64 {
    summaries.iter().map(|s| s.total_bill_amount).sum()
}

// ---------------------------------------------------------------------------
// Word-cloud corpus
// ---------------------------------------------------------------------------

/// Space-joined, de-duplicated group keys in summary order.
pub fn word_corpus(summaries: &[GroupSummary]) -> String {
    let mut seen = HashSet::new();
    summaries
        .iter()
        .map(|s| s.key.as_str())
        .filter(|k| seen.insert(*k))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Upper-cased token counts of a corpus.
pub fn word_frequencies(corpus: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for token in corpus.split_whitespace() {
        *counts.entry(token.to_uppercase()).or_insert(0) += 1;
    }
    counts
}
