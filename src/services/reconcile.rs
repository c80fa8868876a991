//! Financial reconciliation: recompute a document total from its line
//! items and compare it to the model-reported total.
//!
//! This runs on the untyped extraction result because model output is not
//! guaranteed to match the prompted shape; anything missing or non-numeric
//! degrades the comparison instead of failing the job.

use std::str::FromStr;

use serde_json::{Map, Value};

use crate::models::extraction::RiskLevel;

/// Totals within this distance of each other count as a match.
pub const TOTAL_TOLERANCE: f64 = 0.10;

/// Discrepancies above this escalate a LOW risk level to MEDIUM.
pub const ESCALATION_THRESHOLD: f64 = 1.00;

/// Reconcile the extraction result in place.
///
/// Sets `financials.calculated_total` and the tri-state
/// `financials.is_match` (`true`/`false`/`null`; callers must not read
/// `null` as a match), and on a mismatch marks
/// `fraud_analysis.math_mismatch_detected`, appends a deduplicated flag,
/// and escalates the risk level one tier from the lowest. Idempotent: it
/// only reads the line items and the original `extracted_total`, neither of
/// which it touches.
pub fn reconcile(result: &mut Value) {
    let calculated_total = round2(sum_line_items(result));
    let extracted_total = result
        .get("financials")
        .and_then(|f| f.get("extracted_total"))
        .and_then(numeric);

    let is_match = extracted_total.map(|total| (total - calculated_total).abs() < TOTAL_TOLERANCE);

    let Some(root) = result.as_object_mut() else {
        return;
    };

    let financials = ensure_object(root, "financials");
    financials.insert("calculated_total".to_string(), number(calculated_total));
    financials.insert(
        "is_match".to_string(),
        is_match.map_or(Value::Null, Value::Bool),
    );

    let fraud = ensure_object(root, "fraud_analysis");
    if let (Some(false), Some(total)) = (is_match, extracted_total) {
        fraud.insert("math_mismatch_detected".to_string(), Value::Bool(true));

        let flag = format!("Math mismatch: extracted {total:.2} vs calculated {calculated_total:.2}");
        let flags = fraud
            .entry("flags".to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(list) = flags {
            if !list.iter().any(|f| f.as_str() == Some(flag.as_str())) {
                list.push(Value::String(flag));
            }
        }

        if (total - calculated_total).abs() > ESCALATION_THRESHOLD {
            if let Some(level) = fraud
                .get("risk_level")
                .and_then(Value::as_str)
                .and_then(|s| RiskLevel::from_str(s).ok())
            {
                fraud.insert(
                    "risk_level".to_string(),
                    Value::String(level.escalated().to_string()),
                );
            }
        }
    } else {
        fraud.insert("math_mismatch_detected".to_string(), Value::Bool(false));
    }
}

/// Sum the `amount` of every line item across all pages, or of a flat
/// `line_items` list when no page structure exists. Items with a missing or
/// non-numeric amount are skipped silently.
fn sum_line_items(result: &Value) -> f64 {
    let items: Vec<&Value> = if let Some(pages) = result.get("pages").and_then(Value::as_array) {
        pages
            .iter()
            .filter_map(|page| page.get("line_items").and_then(Value::as_array))
            .flatten()
            .collect()
    } else if let Some(items) = result.get("line_items").and_then(Value::as_array) {
        items.iter().collect()
    } else {
        Vec::new()
    };

    items
        .iter()
        .filter_map(|item| item.get("amount").and_then(numeric))
        .sum()
}

/// Accept JSON numbers and numeric strings (models emit both).
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn number(value: f64) -> Value {
    serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
}

fn ensure_object<'a>(root: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let slot = root
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(map) => map,
        _ => unreachable!("slot was just normalized to an object"),
    }
}
