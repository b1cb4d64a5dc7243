use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::aggregate::GroupKey;
use crate::data::filter::FilterChain;
use crate::data::model::{Dimension, RecordStore};
use crate::state::ComparisonSession;

/// Initial selections for one table: dimension → values.
pub type TableConfig = BTreeMap<Dimension, BTreeSet<String>>;

/// Session layout read from a JSON file.
///
/// ```json
/// {
///   "dimensions": ["GroupProvider", "TreatmentPlace"],
///   "group_by": "item",
///   "tables": [
///     { "GroupProvider": ["Mitra Keluarga"] },
///     { "GroupProvider": ["Hermina"], "ProductType": ["Obat"] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub dimensions: Vec<Dimension>,
    pub group_by: GroupKey,
    pub tables: Vec<TableConfig>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            dimensions: Dimension::ALL.to_vec(),
            group_by: GroupKey::Item,
            tables: vec![TableConfig::new()],
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading session config {}", path.display()))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("parsing session config")
    }

    /// Build a session with one table per configured entry.
    pub fn apply(&self, store: RecordStore) -> Result<ComparisonSession> {
        let chain = FilterChain::new(self.dimensions.iter().copied());
        let mut session = ComparisonSession::with_chain(store, chain);
        for table in &self.tables {
            let index = session.add_table();
            session.set_group_key(index, self.group_by)?;
            for (dim, values) in table {
                session.set_selection(index, *dim, values.iter().cloned())?;
            }
        }
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Record, Schema};

    fn store() -> RecordStore {
        let rec = |provider: &str, product: &str, item: &str| Record {
            group_provider: Some(provider.to_string()),
            product_type: Some(product.to_string()),
            item_name: Some(item.to_string()),
            quantity: 1.0,
            ..Record::default()
        };
        RecordStore::new(
            vec![
                rec("Mitra", "Obat", "PARACETAMOL"),
                rec("Hermina", "Obat", "AMOXICILLIN"),
                rec("Hermina", "Alkes", "KASA STERIL"),
            ],
            Schema::full(),
        )
        .expect("store")
    }

    #[test]
    fn parses_full_config() {
        let cfg = SessionConfig::from_json(
            r#"{
                "dimensions": ["ProductType", "groupProvider"],
                "group_by": "GroupProvider",
                "tables": [{ "ProductType": ["Obat"] }, {}]
            }"#,
        )
        .expect("config");
        assert_eq!(
            cfg.dimensions,
            vec![Dimension::ProductType, Dimension::GroupProvider]
        );
        assert_eq!(cfg.group_by, GroupKey::Dimension(Dimension::GroupProvider));
        assert_eq!(cfg.tables.len(), 2);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let cfg = SessionConfig::from_json("{}").expect("config");
        assert_eq!(cfg, SessionConfig::default());
    }

    #[test]
    fn rejects_unknown_dimension() {
        let err = SessionConfig::from_json(r#"{ "dimensions": ["Qty"] }"#).unwrap_err();
        assert!(format!("{err:#}").contains("unknown dimension"));
    }

    #[test]
    fn apply_builds_one_table_per_entry() {
        let cfg = SessionConfig::from_json(
            r#"{ "tables": [{ "ProductType": ["Obat"] }, { "GroupProvider": ["Hermina"] }] }"#,
        )
        .expect("config");
        let session = cfg.apply(store()).expect("session");
        assert_eq!(session.len(), 2);
        assert_eq!(session.view(0).expect("view").visible_indices, vec![0, 1]);
        assert_eq!(session.view(1).expect("view").visible_indices, vec![1, 2]);
    }
}
