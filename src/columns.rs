//! Column-name normalization for the training CSV.
//!
//! The published dataset carries a few misspelled or whitespace-padded
//! headers. Everything downstream addresses columns by canonical name, so
//! headers are rewritten once at load time.

/// Known header variants and their canonical spellings.
const COLUMN_VARIANTS: &[(&str, &str)] = &[
    (" Age (yrs)", "Age (yrs)"),
    (" Height(Cm)", "Height(Cm)"),
    ("Height(Cm) ", "Height(Cm)"),
    ("Marraige Status (Yrs)", "Marriage Status (Yrs)"),
];

/// Map a single header to its canonical name. Unknown headers pass through
/// unchanged, which also makes the mapping idempotent: canonical names are
/// never on the left-hand side of the variant table.
pub fn normalize_name(name: &str) -> &str {
    COLUMN_VARIANTS
        .iter()
        .find(|(variant, _)| *variant == name)
        .map_or(name, |(_, canonical)| canonical)
}

/// Normalize a whole header row.
pub fn normalize_columns(columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .map(|c| normalize_name(c).to_string())
        .collect()
}
