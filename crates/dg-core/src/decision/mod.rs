//! Decision rule: pick the most probable label.
//!
//! Ties resolve to the smallest label. Posteriors are stored in ascending
//! label order and only a strictly larger probability replaces the running
//! best, so the first maximum encountered wins.

use dg_common::{Error, Label, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::inference::PosteriorVector;

/// The chosen label and its posterior probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Decision {
    pub label: Label,
    pub probability: f64,
}

/// Select the label with the largest posterior probability.
pub fn decide(posterior: &PosteriorVector) -> Result<Decision> {
    let mut best: Option<Decision> = None;
    for entry in posterior.iter() {
        match best {
            Some(current) if entry.probability <= current.probability => {}
            _ => {
                best = Some(Decision {
                    label: entry.label,
                    probability: entry.probability,
                })
            }
        }
    }
    best.ok_or_else(|| Error::InternalComputation("empty posterior vector".to_string()))
}
