//! Label mutation rules
//!
//! The decision engine interprets the raw object body as a typed pod
//! and evaluates an ordered list of mutation rules against it. A rule
//! pairs a predicate with the label rewrite to apply when the predicate
//! holds; the first matching rule wins. One rule ships today: a pod
//! labeled `changed: "false"` gets that label rewritten to `"true"`.
//!
//! A body that cannot be interpreted never fails the webhook call. It
//! produces [`Outcome::DecodeFailure`] and the pod is admitted anyway.

use k8s_openapi::api::core::v1::Pod;
use serde_json::Value;

/// Label key examined by the shipped rule
pub const CHANGED_LABEL: &str = "changed";
/// Exact value that triggers the shipped rule
pub const CHANGED_FROM: &str = "false";
/// Replacement value written by the shipped rule
pub const CHANGED_TO: &str = "true";

/// A label rewrite decided by the engine
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelMutation {
    /// Label key to rewrite
    pub key: String,
    /// Value observed on the incoming pod
    pub from: String,
    /// Value the patch will write
    pub to: String,
}

/// Verdict of one decision pass
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// No rule matched; admit unchanged
    NoOp,
    /// A rule matched; build and attach a patch
    Mutate(LabelMutation),
    /// The body could not be interpreted as a pod; admit anyway and
    /// report the message in the response status
    DecodeFailure(String),
}

/// A predicate-to-rewrite pair evaluated against the typed pod
pub trait MutationRule: Send + Sync {
    /// The mutation to apply when this rule matches, `None` otherwise
    fn evaluate(&self, pod: &Pod) -> Option<LabelMutation>;
}

/// Rule that rewrites a label currently holding an exact value
#[derive(Clone, Debug)]
pub struct LabelFlipRule {
    label: String,
    expect: String,
    replacement: String,
}

impl LabelFlipRule {
    /// Rule replacing `label` with `replacement` when it equals `expect`
    pub fn new(
        label: impl Into<String>,
        expect: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            expect: expect.into(),
            replacement: replacement.into(),
        }
    }
}

impl MutationRule for LabelFlipRule {
    fn evaluate(&self, pod: &Pod) -> Option<LabelMutation> {
        let labels = pod.metadata.labels.as_ref()?;
        let value = labels.get(&self.label)?;
        // Exact string equality; "False", "FALSE" and friends do not count
        if value == &self.expect {
            Some(LabelMutation {
                key: self.label.clone(),
                from: value.clone(),
                to: self.replacement.clone(),
            })
        } else {
            None
        }
    }
}

/// Ordered rule list; the first matching rule decides
pub struct RuleSet {
    rules: Vec<Box<dyn MutationRule>>,
}

impl RuleSet {
    /// Rule set with the shipped rule (`changed: "false"` to `"true"`)
    pub fn new() -> Self {
        Self::empty().with_rule(LabelFlipRule::new(CHANGED_LABEL, CHANGED_FROM, CHANGED_TO))
    }

    /// Rule set with no rules; every pod is a no-op
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule; earlier rules take precedence
    pub fn with_rule(mut self, rule: impl MutationRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Decide the outcome for a raw object body
    ///
    /// Interpreting the body happens here rather than in the codec so
    /// that a body the engine cannot read fails open instead of failing
    /// the admission call.
    pub fn decide(&self, object: Option<&Value>) -> Outcome {
        let raw = match object {
            Some(raw) => raw,
            None => return Outcome::DecodeFailure("request carries no object body".to_string()),
        };
        let pod: Pod = match serde_json::from_value(raw.clone()) {
            Ok(pod) => pod,
            Err(e) => return Outcome::DecodeFailure(format!("could not decode pod object: {e}")),
        };
        for rule in &self.rules {
            if let Some(mutation) = rule.evaluate(&pod) {
                return Outcome::Mutate(mutation);
            }
        }
        Outcome::NoOp
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new()
    }
}
