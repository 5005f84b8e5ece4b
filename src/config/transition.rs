//! Schema transitions between configuration minor versions.
//!
//! A transition rewrites deprecated keys of an older schema into the shape the
//! host expects, in place. Transitions are keyed by `(from_minor, to_minor)`;
//! an unmapped pair is not an error.

use crate::error::{ConfigError, ConfigResult};
use crate::store::{SettingsStore, Tree};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

type TransitionFn = Box<dyn Fn(&mut Tree) -> anyhow::Result<()> + Send + Sync>;

/// Registry of schema transitions.
#[derive(Default)]
pub struct TransitionRegistry {
    transitions: HashMap<(u64, u64), TransitionFn>,
}

impl TransitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transition from `from_minor` to `to_minor`, replacing any
    /// previous one for the same pair.
    pub fn register<F>(mut self, from_minor: u64, to_minor: u64, transition: F) -> Self
    where
        F: Fn(&mut Tree) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.transitions
            .insert((from_minor, to_minor), Box::new(transition));
        self
    }

    /// Register a transition that moves values from old keys to new keys.
    ///
    /// A missing old key is skipped; an existing new key is overwritten.
    pub fn rename(
        self,
        from_minor: u64,
        to_minor: u64,
        moves: &[(&str, &str)],
    ) -> Self {
        let moves: Vec<(String, String)> = moves
            .iter()
            .map(|(old, new)| (old.to_string(), new.to_string()))
            .collect();

        self.register(from_minor, to_minor, move |tree| {
            for (old, new) in &moves {
                if let Some(value) = tree.remove(old) {
                    debug!(from = %old, to = %new, "moving deprecated key");
                    tree.set(new, value);
                }
            }
            Ok(())
        })
    }

    pub fn contains(&self, from_minor: u64, to_minor: u64) -> bool {
        self.transitions.contains_key(&(from_minor, to_minor))
    }

    /// Run the transition for `(from_minor, to_minor)` against `tree`.
    ///
    /// Returns whether a transition was registered for the pair.
    pub fn apply(&self, from_minor: u64, to_minor: u64, tree: &mut Tree) -> ConfigResult<bool> {
        let Some(transition) = self.transitions.get(&(from_minor, to_minor)) else {
            debug!(from_minor, to_minor, "no transition registered, keeping config as is");
            return Ok(false);
        };

        transition(tree).map_err(|source| ConfigError::Transition {
            from: from_minor,
            to: to_minor,
            source,
        })?;
        info!(from_minor, to_minor, "configuration transitioned to current schema");
        Ok(true)
    }
}

impl fmt::Debug for TransitionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pairs: Vec<_> = self.transitions.keys().collect();
        pairs.sort();
        f.debug_struct("TransitionRegistry")
            .field("transitions", &pairs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_unmapped_transition_is_noop() {
        let registry = TransitionRegistry::new();
        let mut tree = Tree::new();
        tree.set("http.address", json!("0.0.0.0:80"));
        let before = tree.clone();

        assert!(!registry.apply(6, 7, &mut tree).unwrap());
        assert_eq!(tree, before);
    }

    #[test]
    fn test_rename_transition() {
        let registry = TransitionRegistry::new().rename(
            6,
            7,
            &[("server.relay", "server.command"), ("absent", "elsewhere")],
        );
        assert!(registry.contains(6, 7));
        assert!(!registry.contains(7, 8));

        let mut tree = Tree::new();
        tree.set("server.relay", json!("pipes"));

        assert!(registry.apply(6, 7, &mut tree).unwrap());
        assert_eq!(tree.get("server.command"), Some(&json!("pipes")));
        assert!(!tree.has("server.relay"));
        assert!(!tree.has("elsewhere"));
    }

    #[test]
    fn test_failing_transition() {
        let registry = TransitionRegistry::new()
            .register(7, 8, |_| Err(anyhow::anyhow!("cannot migrate jobs section")));
        let err = registry.apply(7, 8, &mut Tree::new()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Transition);
    }

    #[test]
    fn test_debug_lists_pairs() {
        let registry = TransitionRegistry::new()
            .register(7, 8, |_| Ok(()))
            .register(6, 8, |_| Ok(()));
        assert_eq!(
            format!("{:?}", registry),
            "TransitionRegistry { transitions: [(6, 8), (7, 8)] }"
        );
    }
}
