//! Common resource metadata.

use std::collections::BTreeMap;

/// Value of `app.kubernetes.io/managed-by` on every object we write
pub const MANAGED_BY: &str = "pod-ca-trust";

/// Standard labels applied to all managed objects
pub fn standard_labels(component: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("app.kubernetes.io/name".to_string(), MANAGED_BY.to_string());
    labels.insert(
        "app.kubernetes.io/managed-by".to_string(),
        MANAGED_BY.to_string(),
    );
    labels.insert(
        "app.kubernetes.io/component".to_string(),
        component.to_string(),
    );
    labels
}
