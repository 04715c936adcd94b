//! Single-validator evaluation.

use regex::Regex;

use crate::model::{Arrangement, Validator, ValidatorKind};

/// Decide whether one validator passes for an arrangement.
///
/// A validator whose target placeholder has no placement never passes.
/// Malformed regex patterns fail the validator instead of erroring.
pub fn evaluate(validator: &Validator, arrangement: &Arrangement) -> bool {
    let Some(placement) = arrangement.placement_for(&validator.target) else {
        return false;
    };
    // Contains and regex need a non-empty payload; equals compares it verbatim.
    let payload = placement.payload.as_deref().filter(|p| !p.is_empty());

    match validator.kind {
        ValidatorKind::Equals => validator.expected.iter().any(|e| {
            *e == placement.draggable_id || Some(e.as_str()) == placement.payload.as_deref()
        }),
        ValidatorKind::Contains => {
            let Some(payload) = payload else {
                return false;
            };
            let haystack = payload.to_lowercase();
            validator
                .expected
                .iter()
                .any(|e| haystack.contains(&e.to_lowercase()))
        }
        ValidatorKind::Regex => {
            let (Some(payload), Some(pattern)) = (payload, validator.expected.first()) else {
                return false;
            };
            match Regex::new(pattern) {
                Ok(re) => re.is_match(payload),
                Err(e) => {
                    tracing::debug!(
                        validator = %validator.id,
                        error = %e,
                        "malformed regex pattern, failing validator"
                    );
                    false
                }
            }
        }
        // Sequence checking is not implemented yet; every order_match
        // validator currently passes.
        ValidatorKind::OrderMatch => true,
        ValidatorKind::Custom => false,
    }
}
