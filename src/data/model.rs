use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Column – the fixed column contract of a billing export
// ---------------------------------------------------------------------------

/// Every column the dashboard understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    GroupProvider,
    TreatmentPlace,
    DoctorName,
    PrimaryDiagnosis,
    ProductType,
    ItemName,
    ActiveIngredientComposition,
    DrugClass,
    DrugSubclass,
    Quantity,
    BillAmount,
    UnitPrice,
}

impl Column {
    pub const ALL: [Column; 12] = [
        Column::GroupProvider,
        Column::TreatmentPlace,
        Column::DoctorName,
        Column::PrimaryDiagnosis,
        Column::ProductType,
        Column::ItemName,
        Column::ActiveIngredientComposition,
        Column::DrugClass,
        Column::DrugSubclass,
        Column::Quantity,
        Column::BillAmount,
        Column::UnitPrice,
    ];

    /// Header used by the billing workbook export.
    pub fn header(self) -> &'static str {
        match self {
            Column::GroupProvider => "GroupProvider",
            Column::TreatmentPlace => "TreatmentPlace",
            Column::DoctorName => "DoctorName",
            Column::PrimaryDiagnosis => "PrimaryDiagnosis",
            Column::ProductType => "ProductType",
            Column::ItemName => "Nama Item Garda Medika",
            Column::ActiveIngredientComposition => "Komposisi Zat Aktif",
            Column::DrugClass => "Golongan",
            Column::DrugSubclass => "Subgolongan",
            Column::Quantity => "Qty",
            Column::BillAmount => "Amount Bill",
            Column::UnitPrice => "Harga Satuan",
        }
    }

    /// camelCase field name.
    pub fn field_name(self) -> &'static str {
        match self {
            Column::GroupProvider => "groupProvider",
            Column::TreatmentPlace => "treatmentPlace",
            Column::DoctorName => "doctorName",
            Column::PrimaryDiagnosis => "primaryDiagnosis",
            Column::ProductType => "productType",
            Column::ItemName => "itemName",
            Column::ActiveIngredientComposition => "activeIngredientComposition",
            Column::DrugClass => "drugClass",
            Column::DrugSubclass => "drugSubclass",
            Column::Quantity => "quantity",
            Column::BillAmount => "billAmount",
            Column::UnitPrice => "unitPrice",
        }
    }

    /// Resolve a source header to a column. Matching is exact on either the
    /// workbook header or the camelCase field name, after trimming.
    pub fn from_header(header: &str) -> Option<Column> {
        let header = header.trim();
        Column::ALL
            .into_iter()
            .find(|c| c.header() == header || c.field_name() == header)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

// ---------------------------------------------------------------------------
// Dimension – categorical columns usable as filters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Dimension {
    GroupProvider,
    TreatmentPlace,
    DoctorName,
    PrimaryDiagnosis,
    ProductType,
}

impl Dimension {
    /// Default filter order, matching the dashboard's widget order.
    pub const ALL: [Dimension; 5] = [
        Dimension::GroupProvider,
        Dimension::TreatmentPlace,
        Dimension::DoctorName,
        Dimension::PrimaryDiagnosis,
        Dimension::ProductType,
    ];

    pub fn column(self) -> Column {
        match self {
            Dimension::GroupProvider => Column::GroupProvider,
            Dimension::TreatmentPlace => Column::TreatmentPlace,
            Dimension::DoctorName => Column::DoctorName,
            Dimension::PrimaryDiagnosis => Column::PrimaryDiagnosis,
            Dimension::ProductType => Column::ProductType,
        }
    }

    pub fn name(self) -> &'static str {
        self.column().header()
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown dimension '{0}'")]
pub struct UnknownDimension(pub String);

impl FromStr for Dimension {
    type Err = UnknownDimension;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let column = Column::from_header(s).ok_or_else(|| UnknownDimension(s.to_string()))?;
        Dimension::ALL
            .into_iter()
            .find(|d| d.column() == column)
            .ok_or_else(|| UnknownDimension(s.to_string()))
    }
}

impl TryFrom<String> for Dimension {
    type Error = UnknownDimension;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Dimension> for String {
    fn from(value: Dimension) -> Self {
        value.name().to_string()
    }
}

// ---------------------------------------------------------------------------
// Record – one billing line item
// ---------------------------------------------------------------------------

/// A single billing line (one row of the source export).
///
/// Categorical cells are `None` when the source cell was missing or blank.
/// Numeric cells are always finite; see [`coerce_numeric`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub group_provider: Option<String>,
    pub treatment_place: Option<String>,
    pub doctor_name: Option<String>,
    pub primary_diagnosis: Option<String>,
    pub product_type: Option<String>,
    pub item_name: Option<String>,
    pub active_ingredient_composition: Option<String>,
    pub drug_class: Option<String>,
    pub drug_subclass: Option<String>,
    pub quantity: f64,
    pub bill_amount: f64,
    pub unit_price: f64,
}

impl Record {
    pub fn dimension(&self, dim: Dimension) -> Option<&str> {
        match dim {
            Dimension::GroupProvider => self.group_provider.as_deref(),
            Dimension::TreatmentPlace => self.treatment_place.as_deref(),
            Dimension::DoctorName => self.doctor_name.as_deref(),
            Dimension::PrimaryDiagnosis => self.primary_diagnosis.as_deref(),
            Dimension::ProductType => self.product_type.as_deref(),
        }
    }

    /// Store a raw source cell into the matching field.
    pub fn set_cell(&mut self, column: Column, raw: &str) {
        match column {
            Column::GroupProvider => self.group_provider = text_cell(raw),
            Column::TreatmentPlace => self.treatment_place = text_cell(raw),
            Column::DoctorName => self.doctor_name = text_cell(raw),
            Column::PrimaryDiagnosis => self.primary_diagnosis = text_cell(raw),
            Column::ProductType => self.product_type = text_cell(raw),
            Column::ItemName => self.item_name = text_cell(raw),
            Column::ActiveIngredientComposition => {
                self.active_ingredient_composition = text_cell(raw)
            }
            Column::DrugClass => self.drug_class = text_cell(raw),
            Column::DrugSubclass => self.drug_subclass = text_cell(raw),
            Column::Quantity => self.quantity = coerce_numeric(raw),
            Column::BillAmount => self.bill_amount = coerce_numeric(raw),
            Column::UnitPrice => self.unit_price = coerce_numeric(raw),
        }
    }
}

/// Blank or whitespace-only cells are missing.
pub fn text_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse a numeric cell. Anything that is not a finite number becomes `0.0`.
pub fn coerce_numeric(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

// ---------------------------------------------------------------------------
// Schema – which columns the source actually carried
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    columns: BTreeSet<Column>,
}

impl Schema {
    pub fn new(columns: impl IntoIterator<Item = Column>) -> Self {
        Schema {
            columns: columns.into_iter().collect(),
        }
    }

    /// Schema with every known column present.
    pub fn full() -> Self {
        Schema::new(Column::ALL)
    }

    pub fn has(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    pub fn dimension_available(&self, dim: Dimension) -> bool {
        self.has(dim.column())
    }

    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.columns.iter().copied()
    }
}

// ---------------------------------------------------------------------------
// RecordStore – the complete loaded dataset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("dataset has no '{}' column to group by", Column::ItemName.header())]
    MissingGroupingKey,
}

/// Immutable billing relation. Row order is the source order.
#[derive(Debug, Clone)]
pub struct RecordStore {
    records: Vec<Record>,
    schema: Schema,
}

impl RecordStore {
    pub fn new(records: Vec<Record>, schema: Schema) -> Result<Self, StoreError> {
        if !schema.has(Column::ItemName) {
            return Err(StoreError::MissingGroupingKey);
        }
        Ok(RecordStore { records, schema })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_numeric_maps_garbage_to_zero() {
        assert_eq!(coerce_numeric("12.5"), 12.5);
        assert_eq!(coerce_numeric(" 3 "), 3.0);
        assert_eq!(coerce_numeric(""), 0.0);
        assert_eq!(coerce_numeric("n/a"), 0.0);
        assert_eq!(coerce_numeric("NaN"), 0.0);
        assert_eq!(coerce_numeric("inf"), 0.0);
    }

    #[test]
    fn headers_resolve_from_both_naming_styles() {
        assert_eq!(Column::from_header("Qty"), Some(Column::Quantity));
        assert_eq!(Column::from_header("quantity"), Some(Column::Quantity));
        assert_eq!(
            Column::from_header(" Nama Item Garda Medika "),
            Some(Column::ItemName)
        );
        assert_eq!(Column::from_header("Unrelated"), None);
    }

    #[test]
    fn dimension_parses_only_categorical_columns() {
        assert_eq!("doctorName".parse::<Dimension>(), Ok(Dimension::DoctorName));
        assert_eq!(
            "ProductType".parse::<Dimension>(),
            Ok(Dimension::ProductType)
        );
        assert!("Qty".parse::<Dimension>().is_err());
    }

    #[test]
    fn blank_text_cells_are_missing() {
        let mut rec = Record::default();
        rec.set_cell(Column::DoctorName, "   ");
        rec.set_cell(Column::GroupProvider, " Siloam ");
        assert_eq!(rec.doctor_name, None);
        assert_eq!(rec.dimension(Dimension::GroupProvider), Some("Siloam"));
    }

    #[test]
    fn store_requires_item_column() {
        let schema = Schema::new([Column::GroupProvider, Column::Quantity]);
        assert_eq!(
            RecordStore::new(Vec::new(), schema).unwrap_err(),
            StoreError::MissingGroupingKey
        );
        assert!(RecordStore::new(Vec::new(), Schema::full()).is_ok());
    }
}
