//! JSON Patch construction
//!
//! One decided mutation becomes exactly one `replace` operation. The
//! pointer into the pod is assembled from tokens, so label keys that
//! contain `/` or `~` are escaped per JSON Pointer (`~1`, `~0`) instead
//! of corrupting the path.

use json_patch::{Patch, PatchOperation, ReplaceOperation};
use jsonptr::PointerBuf;
use serde_json::Value;

use crate::decision::LabelMutation;

/// Build the patch for a decided label mutation
///
/// `replace` rather than `add`: a mutation is only ever decided for a
/// key that was observed on the incoming pod.
pub fn build(mutation: &LabelMutation) -> Patch {
    Patch(vec![PatchOperation::Replace(ReplaceOperation {
        path: PointerBuf::from_tokens(["metadata", "labels", mutation.key.as_str()]),
        value: Value::String(mutation.to.clone()),
    })])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mutation(key: &str) -> LabelMutation {
        LabelMutation {
            key: key.to_string(),
            from: "false".to_string(),
            to: "true".to_string(),
        }
    }

    // ==========================================================================
    // Unit Tests: Patch Shape
    // ==========================================================================

    #[test]
    fn builds_a_single_replace_operation() {
        let patch = build(&mutation("changed"));
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!([{
                "op": "replace",
                "path": "/metadata/labels/changed",
                "value": "true"
            }])
        );
    }

    #[test]
    fn slashes_in_label_keys_are_escaped() {
        let patch = build(&mutation("example.com/changed"));
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value[0]["path"], "/metadata/labels/example.com~1changed");
    }

    #[test]
    fn tildes_in_label_keys_are_escaped() {
        let patch = build(&mutation("odd~key"));
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value[0]["path"], "/metadata/labels/odd~0key");
    }

    // ==========================================================================
    // Story Tests: Applying the Patch
    // ==========================================================================

    /// Story: the emitted patch does what the decision promised
    ///
    /// Applying the operations to the pod document the API server holds
    /// must flip the label and change nothing else.
    #[test]
    fn story_patch_applies_cleanly_to_the_pod_document() {
        let mut pod = json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {
                "name": "web-0",
                "labels": {"app": "web", "changed": "false"}
            },
            "spec": {"containers": [{"name": "web", "image": "nginx:1.27"}]}
        });

        json_patch::patch(&mut pod, &build(&mutation("changed"))).unwrap();

        assert_eq!(pod["metadata"]["labels"]["changed"], "true");
        assert_eq!(pod["metadata"]["labels"]["app"], "web");
        assert_eq!(pod["spec"]["containers"][0]["image"], "nginx:1.27");
    }

    /// Story: prefixed label keys survive the round trip
    ///
    /// Keys like `example.com/changed` are routine on real pods. The
    /// escaped pointer must address the key as one path segment.
    #[test]
    fn story_prefixed_keys_patch_the_right_entry() {
        let mut pod = json!({
            "metadata": {
                "labels": {
                    "example.com/changed": "false",
                    "example.com": {"changed": "unrelated"}
                }
            }
        });

        json_patch::patch(&mut pod, &build(&mutation("example.com/changed"))).unwrap();

        assert_eq!(pod["metadata"]["labels"]["example.com/changed"], "true");
        // The nested object with the same spelling stays untouched
        assert_eq!(pod["metadata"]["labels"]["example.com"]["changed"], "unrelated");
    }
}
