use std::collections::{BTreeMap, BTreeSet};

use super::model::{Dimension, Record, RecordStore};

// ---------------------------------------------------------------------------
// Filter predicate: which values are selected per dimension
// ---------------------------------------------------------------------------

/// Per-dimension selection state: maps dimension → set of selected values.
/// If a dimension is absent or its set is empty, it means "no filter" (show all).
pub type FilterState = BTreeMap<Dimension, BTreeSet<String>>;

/// Options offered for one dimension after the earlier dimensions narrowed
/// the candidate rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionOptions {
    pub dimension: Dimension,
    /// `false` when the source never carried this column.
    pub available: bool,
    /// Sorted, distinct, non-missing values.
    pub options: Vec<String>,
}

/// Result of one pass of the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainOutcome {
    pub options: Vec<DimensionOptions>,
    /// Indices of records passing every selection, in source order.
    pub indices: Vec<usize>,
}

/// Ordered list of dimensions. Each dimension only sees the rows left over
/// by the dimensions before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChain {
    dimensions: Vec<Dimension>,
}

impl Default for FilterChain {
    fn default() -> Self {
        FilterChain::new(Dimension::ALL)
    }
}

impl FilterChain {
    /// Repeated dimensions keep only their first position.
    pub fn new(dimensions: impl IntoIterator<Item = Dimension>) -> Self {
        let mut seen = BTreeSet::new();
        let dimensions = dimensions
            .into_iter()
            .filter(|d| seen.insert(*d))
            .collect();
        FilterChain { dimensions }
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Walk the chain front to back, computing options for each dimension
    /// and dropping selected values that are no longer offered.
    ///
    /// Selections for dimensions outside the chain are left untouched and
    /// still restrict the final relation.
    pub fn resolve(&self, store: &RecordStore, filters: &mut FilterState) -> ChainOutcome {
        let mut candidates: Vec<usize> = (0..store.len()).collect();
        let mut options = Vec::with_capacity(self.dimensions.len());

        for &dim in &self.dimensions {
            let available = store.schema().dimension_available(dim);
            let offered: BTreeSet<&str> = if available {
                candidates
                    .iter()
                    .filter_map(|&i| store.records()[i].dimension(dim))
                    .collect()
            } else {
                BTreeSet::new()
            };

            if let Some(selected) = filters.get_mut(&dim) {
                let before = selected.len();
                selected.retain(|v| offered.contains(v.as_str()));
                if selected.len() != before {
                    log::debug!(
                        "{dim}: dropped {} stale selection(s)",
                        before - selected.len()
                    );
                }
                let selected = &*selected;
                if !selected.is_empty() {
                    candidates.retain(|&i| matches_selection(&store.records()[i], dim, selected));
                }
            }

            options.push(DimensionOptions {
                dimension: dim,
                available,
                options: offered.into_iter().map(str::to_string).collect(),
            });
        }

        // Selections outside the chain still apply.
        for (dim, selected) in filters.iter() {
            if selected.is_empty() || self.dimensions.contains(dim) {
                continue;
            }
            candidates.retain(|&i| matches_selection(&store.records()[i], *dim, selected));
        }

        ChainOutcome {
            options,
            indices: candidates,
        }
    }
}

fn matches_selection(record: &Record, dim: Dimension, selected: &BTreeSet<String>) -> bool {
    match record.dimension(dim) {
        Some(value) => selected.contains(value),
        None => false,
    }
}

/// Return indices of records that pass all active filters.
///
/// A record passes a dimension filter when:
/// * The dimension is not present in `filters` → passes (no constraint)
/// * The selected set for that dimension is empty → passes (no constraint)
/// * The record's value for that dimension is in the selected set → passes
pub fn filtered_indices(store: &RecordStore, filters: &FilterState) -> Vec<usize> {
    store
        .records()
        .iter()
        .enumerate()
        .filter(|(_, rec)| {
            filters.iter().all(|(dim, selected)| {
                selected.is_empty() || matches_selection(rec, *dim, selected)
            })
        })
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Column, Schema};

    fn rec(provider: &str, place: &str, doctor: Option<&str>, item: &str) -> Record {
        Record {
            group_provider: Some(provider.to_string()),
            treatment_place: Some(place.to_string()),
            doctor_name: doctor.map(str::to_string),
            item_name: Some(item.to_string()),
            quantity: 1.0,
            ..Record::default()
        }
    }

    fn store() -> RecordStore {
        RecordStore::new(
            vec![
                rec("Mitra", "Bekasi", Some("dr. Ani"), "PARACETAMOL"),
                rec("Mitra", "Depok", Some("dr. Budi"), "AMOXICILLIN"),
                rec("Hermina", "Bekasi", None, "CETIRIZINE"),
                rec("Hermina", "Bogor", Some("dr. Citra"), "PARACETAMOL"),
            ],
            Schema::full(),
        )
        .expect("store")
    }

    fn select(filters: &mut FilterState, dim: Dimension, values: &[&str]) {
        filters.insert(dim, values.iter().map(|v| v.to_string()).collect());
    }

    fn options_for(outcome: &ChainOutcome, dim: Dimension) -> Vec<String> {
        outcome
            .options
            .iter()
            .find(|o| o.dimension == dim)
            .map(|o| o.options.clone())
            .unwrap_or_default()
    }

    #[test]
    fn empty_state_passes_every_row() {
        let store = store();
        let mut filters = FilterState::new();
        let outcome = FilterChain::default().resolve(&store, &mut filters);
        assert_eq!(outcome.indices, vec![0, 1, 2, 3]);
        assert_eq!(
            options_for(&outcome, Dimension::GroupProvider),
            vec!["Hermina", "Mitra"]
        );
        // Missing doctor is not offered as an option.
        assert_eq!(
            options_for(&outcome, Dimension::DoctorName),
            vec!["dr. Ani", "dr. Budi", "dr. Citra"]
        );
    }

    #[test]
    fn later_options_narrow_but_earlier_do_not() {
        let store = store();
        let mut filters = FilterState::new();
        select(&mut filters, Dimension::TreatmentPlace, &["Bekasi"]);
        let outcome = FilterChain::default().resolve(&store, &mut filters);

        assert_eq!(outcome.indices, vec![0, 2]);
        // Provider comes first so it still sees every row.
        assert_eq!(
            options_for(&outcome, Dimension::GroupProvider),
            vec!["Hermina", "Mitra"]
        );
        assert_eq!(
            options_for(&outcome, Dimension::TreatmentPlace),
            vec!["Bekasi", "Bogor", "Depok"]
        );
        assert_eq!(options_for(&outcome, Dimension::DoctorName), vec!["dr. Ani"]);
    }

    #[test]
    fn stale_selection_is_dropped_silently() {
        let store = store();
        let mut filters = FilterState::new();
        select(&mut filters, Dimension::TreatmentPlace, &["Depok", "Bogor"]);
        select(&mut filters, Dimension::GroupProvider, &["Hermina"]);

        let outcome = FilterChain::default().resolve(&store, &mut filters);

        assert_eq!(
            filters.get(&Dimension::TreatmentPlace),
            Some(&BTreeSet::from(["Bogor".to_string()]))
        );
        assert_eq!(
            options_for(&outcome, Dimension::TreatmentPlace),
            vec!["Bekasi", "Bogor"]
        );
        assert_eq!(outcome.indices, vec![3]);
    }

    #[test]
    fn empty_selection_keeps_rows_with_missing_values() {
        let store = store();
        let mut filters = FilterState::new();
        select(&mut filters, Dimension::DoctorName, &[]);
        select(&mut filters, Dimension::GroupProvider, &["Hermina"]);
        let outcome = FilterChain::default().resolve(&store, &mut filters);
        assert_eq!(outcome.indices, vec![2, 3]);
    }

    #[test]
    fn unavailable_dimension_offers_nothing_and_filters_nothing() {
        let schema = Schema::new([Column::GroupProvider, Column::ItemName, Column::Quantity]);
        let store = RecordStore::new(store().records().to_vec(), schema).expect("store");
        let mut filters = FilterState::new();
        select(&mut filters, Dimension::ProductType, &["Obat"]);

        let outcome = FilterChain::default().resolve(&store, &mut filters);

        let product = outcome
            .options
            .iter()
            .find(|o| o.dimension == Dimension::ProductType)
            .expect("product options");
        assert!(!product.available);
        assert!(product.options.is_empty());
        assert!(filters[&Dimension::ProductType].is_empty());
        assert_eq!(outcome.indices.len(), 4);
    }

    #[test]
    fn no_match_yields_empty_relation() {
        let store = store();
        let mut filters = FilterState::new();
        select(&mut filters, Dimension::GroupProvider, &["Mitra"]);
        select(&mut filters, Dimension::DoctorName, &["dr. Ani"]);
        select(&mut filters, Dimension::TreatmentPlace, &["Depok"]);
        let outcome = FilterChain::default().resolve(&store, &mut filters);
        // Depok survives, which removes dr. Ani from the doctor options.
        assert_eq!(outcome.indices, vec![1]);
        assert!(filters[&Dimension::DoctorName].is_empty());

        let mut direct = FilterState::new();
        select(&mut direct, Dimension::GroupProvider, &["Mitra"]);
        select(&mut direct, Dimension::DoctorName, &["dr. Citra"]);
        assert!(filtered_indices(&store, &direct).is_empty());
    }

    #[test]
    fn chain_order_does_not_change_final_relation() {
        let store = store();
        let mut base = FilterState::new();
        select(&mut base, Dimension::GroupProvider, &["Mitra", "Hermina"]);
        select(&mut base, Dimension::TreatmentPlace, &["Bekasi"]);

        let forward = FilterChain::default();
        let reversed = FilterChain::new(Dimension::ALL.into_iter().rev());

        let mut a = base.clone();
        let mut b = base.clone();
        let out_a = forward.resolve(&store, &mut a);
        let out_b = reversed.resolve(&store, &mut b);

        assert_eq!(out_a.indices, out_b.indices);
        assert_eq!(out_a.indices, filtered_indices(&store, &base));
    }

    #[test]
    fn duplicate_dimensions_collapse() {
        let chain = FilterChain::new([
            Dimension::DoctorName,
            Dimension::GroupProvider,
            Dimension::DoctorName,
        ]);
        assert_eq!(
            chain.dimensions(),
            &[Dimension::DoctorName, Dimension::GroupProvider]
        );
    }

    #[test]
    fn selections_outside_chain_still_restrict() {
        let store = store();
        let mut filters = FilterState::new();
        select(&mut filters, Dimension::TreatmentPlace, &["Bogor"]);
        let chain = FilterChain::new([Dimension::GroupProvider]);
        let outcome = chain.resolve(&store, &mut filters);
        assert_eq!(outcome.indices, vec![3]);
    }
}
