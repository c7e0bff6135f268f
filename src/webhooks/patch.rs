//! JSON Patch generation.
//!
//! Patches are computed as a structural diff between the original object and
//! a mutated clone, both rendered as generic JSON trees. Object keys are
//! walked in sorted order and arrays by index, so identical inputs always
//! produce byte-identical patches.

use json_patch::Patch;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// Diff two JSON trees. `None` when they are deep-equal.
pub fn diff(original: &Value, mutated: &Value) -> Option<Patch> {
    let patch = json_patch::diff(original, mutated);
    if patch.0.is_empty() { None } else { Some(patch) }
}

/// Serialize both objects and diff the resulting trees.
pub fn diff_objects<T: Serialize>(original: &T, mutated: &T) -> Result<Option<Patch>> {
    let original = serde_json::to_value(original)?;
    let mutated = serde_json::to_value(mutated)?;
    Ok(diff(&original, &mutated))
}

/// JSON pointers touched by a patch, in patch order.
pub fn touched_paths(patch: &Patch) -> Vec<String> {
    patch
        .0
        .iter()
        .map(|op| match op {
            json_patch::PatchOperation::Add(op) => op.path.to_string(),
            json_patch::PatchOperation::Remove(op) => op.path.to_string(),
            json_patch::PatchOperation::Replace(op) => op.path.to_string(),
            json_patch::PatchOperation::Move(op) => op.path.to_string(),
            json_patch::PatchOperation::Copy(op) => op.path.to_string(),
            json_patch::PatchOperation::Test(op) => op.path.to_string(),
        })
        .collect()
}
