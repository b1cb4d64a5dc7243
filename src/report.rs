use std::fmt::Write;

use crate::data::aggregate::{GroupKey, round_to_int};
use crate::state::TableView;

// ---------------------------------------------------------------------------
// Plain-text rendering of a table for the command-line front end
// ---------------------------------------------------------------------------

/// `Rp 1.234.567` – dot thousands separator, no decimals.
pub fn format_rupiah(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("Rp {sign}{grouped}")
}

/// Render one table: filter options, summary rows, total and corpus.
pub fn render_table(label: &str, key: GroupKey, view: &TableView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {label} ==");

    for opts in &view.options {
        if !opts.available {
            let _ = writeln!(out, "  {}: (not in dataset)", opts.dimension);
            continue;
        }
        let _ = writeln!(
            out,
            "  {} ({}): {}",
            opts.dimension,
            opts.options.len(),
            opts.options.join(", ")
        );
    }

    if view.is_empty() {
        let _ = writeln!(out, "  No data for the selected filters in {label}.");
        return out;
    }

    let key_header = match key {
        GroupKey::Item => "Item",
        GroupKey::Dimension(dim) => dim.name(),
    };
    let _ = writeln!(
        out,
        "  {key_header} | Golongan | Subgolongan | Komposisi Zat Aktif | Qty | AmountBill | HargaSatuan"
    );
    for row in &view.summaries {
        let _ = writeln!(
            out,
            "  {} | {} | {} | {} | {} | {} | {}",
            row.key,
            row.drug_class.as_deref().unwrap_or(""),
            row.drug_subclass.as_deref().unwrap_or(""),
            row.active_ingredient_composition.as_deref().unwrap_or(""),
            row.rounded_quantity(),
            row.rounded_bill_amount(),
            row.rounded_unit_price(),
        );
    }

    let _ = writeln!(
        out,
        "  Total Amount Bill: {}",
        format_rupiah(round_to_int(view.total_bill_amount))
    );
    let _ = writeln!(out, "  Corpus: {}", view.corpus);
    out
}
