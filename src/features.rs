//! The fixed 17-feature contract shared by training and serving.
//!
//! Feature order is significant: the classifier was fit on vectors assembled
//! in exactly this order, so both the CSV column selection at training time
//! and the JSON encoding at serving time go through [`FEATURES`].

use serde_json::Value;
use thiserror::Error;

/// How a raw value is turned into its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    /// Plain numeric value (number, numeric string, or boolean).
    Numeric,
    /// Blood group code lookup, 11..=18.
    BloodGroup,
    /// Cycle regularity lookup, R/I.
    Cycle,
    /// Y/N lookup.
    YesNo,
}

#[derive(Debug, Clone, Copy)]
pub struct Feature {
    pub name: &'static str,
    pub kind: FeatureKind,
}

/// The 17 model features, in fit order. Names must match the JSON keys sent
/// by clients and the (normalized) CSV headers exactly.
pub const FEATURES: [Feature; 17] = [
    Feature { name: "Age (yrs)", kind: FeatureKind::Numeric },
    Feature { name: "Weight (Kg)", kind: FeatureKind::Numeric },
    Feature { name: "Height(Cm)", kind: FeatureKind::Numeric },
    Feature { name: "BMI", kind: FeatureKind::Numeric },
    Feature { name: "Blood Group", kind: FeatureKind::BloodGroup },
    Feature { name: "Cycle(R/I)", kind: FeatureKind::Cycle },
    Feature { name: "Cycle length(days)", kind: FeatureKind::Numeric },
    Feature { name: "Marriage Status (Yrs)", kind: FeatureKind::Numeric },
    Feature { name: "Pregnant(Y/N)", kind: FeatureKind::YesNo },
    Feature { name: "No. of aborptions", kind: FeatureKind::Numeric },
    Feature { name: "Weight gain(Y/N)", kind: FeatureKind::YesNo },
    Feature { name: "hair growth(Y/N)", kind: FeatureKind::YesNo },
    Feature { name: "Skin darkening (Y/N)", kind: FeatureKind::YesNo },
    Feature { name: "Hair loss(Y/N)", kind: FeatureKind::YesNo },
    Feature { name: "Pimples(Y/N)", kind: FeatureKind::YesNo },
    Feature { name: "Fast food (Y/N)", kind: FeatureKind::YesNo },
    Feature { name: "Reg.Exercise(Y/N)", kind: FeatureKind::YesNo },
];

pub const FEATURE_COUNT: usize = FEATURES.len();

/// Label column in the training CSV.
pub const LABEL_COLUMN: &str = "PCOS (Y/N)";

const BLOOD_GROUP_CODES: &[(&str, f64)] = &[
    ("A+", 11.0),
    ("A-", 12.0),
    ("B+", 13.0),
    ("B-", 14.0),
    ("O+", 15.0),
    ("O-", 16.0),
    ("AB+", 17.0),
    ("AB-", 18.0),
];

pub const CYCLE_REGULAR: f64 = 2.0;
pub const CYCLE_IRREGULAR: f64 = 4.0;

/// Irregular-cycle code used by the manual-entry prompt in the training
/// binary. Differs from [`CYCLE_IRREGULAR`]; both literal values are kept
/// as-is (see DESIGN.md).
pub const CYCLE_IRREGULAR_MANUAL: f64 = 5.0;

/// Unrecognized categorical values encode to 0 instead of failing.
pub const UNRECOGNIZED_CODE: f64 = 0.0;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Missing required feature: '{0}'")]
    MissingFeature(String),
    #[error("could not convert value for '{feature}': {detail}")]
    InvalidNumber { feature: String, detail: String },
}

/// Blood group lookup, case-insensitive, default 0 on miss.
pub fn encode_blood_group(raw: &str) -> f64 {
    let upper = raw.trim().to_uppercase();
    BLOOD_GROUP_CODES
        .iter()
        .find(|(name, _)| *name == upper)
        .map_or(UNRECOGNIZED_CODE, |(_, code)| *code)
}

/// Cycle regularity lookup (serving-time codes), default 0 on miss.
pub fn encode_cycle(raw: &str) -> f64 {
    match raw.trim().to_uppercase().as_str() {
        "R" => CYCLE_REGULAR,
        "I" => CYCLE_IRREGULAR,
        _ => UNRECOGNIZED_CODE,
    }
}

/// Y/N lookup, default 0 on miss.
pub fn encode_yes_no(raw: &str) -> f64 {
    match raw.trim().to_uppercase().as_str() {
        "Y" => 1.0,
        "N" => 0.0,
        _ => UNRECOGNIZED_CODE,
    }
}

/// Stringify a JSON value for a categorical lookup. Non-string values are
/// rendered and then looked up like any other text, so they fall back to
/// the default code rather than erroring.
fn categorical_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn numeric_value(feature: &Feature, value: &Value) -> Result<f64, EncodeError> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| EncodeError::InvalidNumber {
            feature: feature.name.to_string(),
            detail: format!("{n} is out of range for a 64-bit float"),
        }),
        Value::String(s) => s.trim().parse::<f64>().map_err(|e| EncodeError::InvalidNumber {
            feature: feature.name.to_string(),
            detail: format!("could not convert string to float: '{s}' ({e})"),
        }),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => Err(EncodeError::InvalidNumber {
            feature: feature.name.to_string(),
            detail: format!("expected a number, got {other}"),
        }),
    }
}

/// Encode a JSON record into the ordered 17-element feature vector.
///
/// Absent keys and JSON nulls are missing-feature errors. Categorical
/// lookups never fail; numeric conversion failures carry the underlying
/// parse error text.
pub fn encode_record(record: &serde_json::Map<String, Value>) -> Result<[f64; FEATURE_COUNT], EncodeError> {
    let mut encoded = [0.0; FEATURE_COUNT];
    for (slot, feature) in encoded.iter_mut().zip(FEATURES.iter()) {
        let value = match record.get(feature.name) {
            None | Some(Value::Null) => {
                return Err(EncodeError::MissingFeature(feature.name.to_string()))
            }
            Some(v) => v,
        };
        *slot = match feature.kind {
            FeatureKind::Numeric => numeric_value(feature, value)?,
            FeatureKind::BloodGroup => encode_blood_group(&categorical_text(value)),
            FeatureKind::Cycle => encode_cycle(&categorical_text(value)),
            FeatureKind::YesNo => encode_yes_no(&categorical_text(value)),
        };
    }
    Ok(encoded)
}
