//! Option file merging
//!
//! Files are merged as raw YAML documents before deserialization, so an
//! option left unset in a later file never resets an earlier value to its
//! default. Precedence, lowest first:
//! 1. devstack-bootstrap.yaml
//! 2. devstack-bootstrap.d/*.yaml (sorted alphabetically)

use serde_yaml::Value;
use tracing::debug;

/// Merge two YAML values recursively
///
/// Mappings merge key by key, lists and scalars from `overlay` replace
/// those in `base`, and a null overlay keeps the base value.
pub fn merge_yaml_values(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            let mut result = base_map.clone();

            for (key, overlay_value) in overlay_map {
                let merged = match result.get(key) {
                    Some(base_value) => merge_yaml_values(base_value, overlay_value),
                    None => overlay_value.clone(),
                };
                result.insert(key.clone(), merged);
            }

            Value::Mapping(result)
        }

        (base_value, Value::Null) => base_value.clone(),

        (_, overlay_value) => overlay_value.clone(),
    }
}

/// Merge documents in order (later documents have higher priority)
pub fn merge_all_documents(documents: &[Value]) -> Value {
    let mut result = Value::Null;
    for doc in documents {
        debug!("Merging option document");
        result = merge_yaml_values(&result, doc);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_overlay_scalar_wins() {
        let merged = merge_yaml_values(&yaml("vm_cpus: 2"), &yaml("vm_cpus: 4"));
        assert_eq!(merged, yaml("vm_cpus: 4"));
    }

    #[test]
    fn test_keeps_base_when_overlay_missing() {
        let merged = merge_yaml_values(&yaml("vm_cpus: 2\nvm_memory: 4096"), &yaml("hostname: dev"));
        assert_eq!(merged, yaml("vm_cpus: 2\nvm_memory: 4096\nhostname: dev"));
    }

    #[test]
    fn test_nested_guest_section() {
        let base = yaml("guest:\n  user: vagrant\n  project: cue");
        let overlay = yaml("guest:\n  user: stack");

        let merged = merge_yaml_values(&base, &overlay);
        assert_eq!(merged["guest"]["user"], yaml("stack"));
        assert_eq!(merged["guest"]["project"], yaml("cue"));
    }

    #[test]
    fn test_lists_replace() {
        let base = yaml("guest:\n  siblings: [a, b, c]");
        let overlay = yaml("guest:\n  siblings: [d]");

        let merged = merge_yaml_values(&base, &overlay);
        assert_eq!(merged["guest"]["siblings"], yaml("[d]"));
    }

    #[test]
    fn test_null_overlay_keeps_base() {
        let merged = merge_yaml_values(&yaml("package_proxy: http://proxy:3128"), &yaml("package_proxy: ~"));
        assert_eq!(merged["package_proxy"], yaml("http://proxy:3128"));
    }

    #[test]
    fn test_merge_all_documents() {
        let docs = vec![
            yaml("hostname: first"),
            yaml("hostname: second\nvm_cpus: 8"),
            yaml("hostname: third"),
        ];

        let merged = merge_all_documents(&docs);
        assert_eq!(merged["hostname"], yaml("third"));
        assert_eq!(merged["vm_cpus"], yaml("8"));
    }

    #[test]
    fn test_merge_no_documents() {
        assert_eq!(merge_all_documents(&[]), Value::Null);
    }
}
