//! Value objects for the context store
//!
//! A [`SemanticKey`] names one fact inside a namespace; a [`ContextValue`]
//! is the typed value recorded under it. Values are a closed sum type
//! rather than free-form JSON so that conflict detection can compare value
//! domains before comparing contents.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Namespaced key identifying one fact in a context snapshot.
///
/// Rendered as `namespace.name`, e.g. `deploy.targetVersion`. Keys without
/// an explicit namespace parse into the `general` namespace. Two keys in
/// different namespaces never collide, even with identical names.
///
/// # Example
///
/// ```
/// use inquest_domain::SemanticKey;
///
/// let key: SemanticKey = "deploy.targetVersion".parse().unwrap();
/// assert_eq!(key.namespace(), "deploy");
/// assert_eq!(key.name(), "targetVersion");
/// assert_eq!(key.to_string(), "deploy.targetVersion");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SemanticKey {
    namespace: String,
    name: String,
}

impl SemanticKey {
    /// Namespace used when a key string carries no explicit namespace.
    pub const DEFAULT_NAMESPACE: &'static str = "general";

    /// Create a key from namespace and name parts.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized form of the name used for alias detection: lowercase
    /// with separator characters removed, so `target-version`,
    /// `target_version` and `targetVersion` all normalize identically.
    pub fn normalized_name(&self) -> String {
        self.name
            .chars()
            .filter(|c| *c != '-' && *c != '_' && *c != ' ')
            .flat_map(|c| c.to_lowercase())
            .collect()
    }

    /// Whether two keys are label variants of the same concept: same
    /// namespace, different label, identical normalized name.
    pub fn is_alias_of(&self, other: &SemanticKey) -> bool {
        self.namespace == other.namespace
            && self.name != other.name
            && self.normalized_name() == other.normalized_name()
    }

    /// Of two alias keys, pick the canonical label: the longer (more
    /// specific) name wins, lexicographic order breaks ties.
    pub fn canonical<'a>(a: &'a SemanticKey, b: &'a SemanticKey) -> &'a SemanticKey {
        match a.name.len().cmp(&b.name.len()) {
            std::cmp::Ordering::Greater => a,
            std::cmp::Ordering::Less => b,
            std::cmp::Ordering::Equal => {
                if a.name <= b.name {
                    a
                } else {
                    b
                }
            }
        }
    }
}

impl FromStr for SemanticKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DomainError::InvalidKey("empty key".to_string()));
        }
        match s.split_once('.') {
            Some((ns, name)) if !ns.is_empty() && !name.is_empty() => {
                Ok(Self::new(ns, name))
            }
            Some(_) => Err(DomainError::InvalidKey(s.to_string())),
            None => Ok(Self::new(Self::DEFAULT_NAMESPACE, s)),
        }
    }
}

impl TryFrom<String> for SemanticKey {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SemanticKey> for String {
    fn from(key: SemanticKey) -> Self {
        key.to_string()
    }
}

impl std::fmt::Display for SemanticKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

/// Typed value of a context entry.
///
/// The closed set of domains keeps conflict classification honest: a
/// `TypeMismatch` is exactly "two values from different domains", checked
/// before any semantic comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ContextValue {
    /// Free text (descriptions, version strings, identifiers)
    Text(String),
    /// Numeric measurement or count
    Number(f64),
    /// Boolean fact (e.g. a deployment status)
    Flag(bool),
    /// Reference to a structured artifact held elsewhere (ticket id, commit hash, URL)
    Reference(String),
}

impl ContextValue {
    /// Name of this value's domain, for conflict rationales.
    pub fn domain_name(&self) -> &'static str {
        match self {
            ContextValue::Text(_) => "text",
            ContextValue::Number(_) => "number",
            ContextValue::Flag(_) => "flag",
            ContextValue::Reference(_) => "reference",
        }
    }

    /// Whether both values are drawn from the same domain.
    pub fn same_domain(&self, other: &ContextValue) -> bool {
        self.domain_name() == other.domain_name()
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContextValue::Text(s) | ContextValue::Reference(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            ContextValue::Flag(b) => Some(*b),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContextValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextValue::Text(s) => write!(f, "{}", s),
            ContextValue::Number(n) => write!(f, "{}", n),
            ContextValue::Flag(b) => write!(f, "{}", b),
            ContextValue::Reference(r) => write!(f, "ref:{}", r),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_parse_with_namespace() {
        let key: SemanticKey = "deploy.targetVersion".parse().unwrap();
        assert_eq!(key.namespace(), "deploy");
        assert_eq!(key.name(), "targetVersion");
    }

    #[test]
    fn test_key_parse_without_namespace_uses_default() {
        let key: SemanticKey = "owner".parse().unwrap();
        assert_eq!(key.namespace(), SemanticKey::DEFAULT_NAMESPACE);
        assert_eq!(key.name(), "owner");
    }

    #[test]
    fn test_key_parse_rejects_empty_parts() {
        assert!("".parse::<SemanticKey>().is_err());
        assert!(".name".parse::<SemanticKey>().is_err());
        assert!("ns.".parse::<SemanticKey>().is_err());
    }

    #[test]
    fn test_alias_detection_across_label_variants() {
        let a = SemanticKey::new("deploy", "target-version");
        let b = SemanticKey::new("deploy", "targetVersion");
        assert!(a.is_alias_of(&b));
        assert!(b.is_alias_of(&a));
    }

    #[test]
    fn test_alias_requires_same_namespace() {
        let a = SemanticKey::new("deploy", "targetVersion");
        let b = SemanticKey::new("env", "targetVersion");
        assert!(!a.is_alias_of(&b));
    }

    #[test]
    fn test_identical_keys_are_not_aliases() {
        let a = SemanticKey::new("deploy", "targetVersion");
        assert!(!a.is_alias_of(&a.clone()));
    }

    #[test]
    fn test_canonical_prefers_longer_label() {
        let short = SemanticKey::new("deploy", "targetver");
        let long = SemanticKey::new("deploy", "target_version");
        assert_eq!(SemanticKey::canonical(&short, &long), &long);
        assert_eq!(SemanticKey::canonical(&long, &short), &long);
    }

    #[test]
    fn test_canonical_tiebreak_is_deterministic() {
        let a = SemanticKey::new("deploy", "abc");
        let b = SemanticKey::new("deploy", "abd");
        assert_eq!(SemanticKey::canonical(&a, &b), &a);
        assert_eq!(SemanticKey::canonical(&b, &a), &a);
    }

    #[test]
    fn test_value_domains() {
        let text = ContextValue::Text("2.15".to_string());
        let number = ContextValue::Number(2.15);
        let flag = ContextValue::Flag(true);

        assert!(text.same_domain(&ContextValue::Text("x".to_string())));
        assert!(!text.same_domain(&number));
        assert!(!flag.same_domain(&number));
        assert_eq!(flag.domain_name(), "flag");
    }

    #[test]
    fn test_key_serde_round_trip_as_string() {
        let key = SemanticKey::new("deploy", "status");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"deploy.status\"");
        let back: SemanticKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn test_value_serde_is_tagged() {
        let value = ContextValue::Flag(false);
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["type"], "flag");
        assert_eq!(json["value"], false);
    }
}
