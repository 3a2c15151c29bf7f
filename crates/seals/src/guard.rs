/// Outcome of the `--only-on-node` check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Run,
    /// This invocation targets another node; do nothing and succeed
    Skip {
        only_on_node: String,
        node_name: Option<String>,
    },
}

/// Decide whether this node should run the requested operation.
///
/// An unset or empty `only_on_node` always runs.
pub fn evaluate(only_on_node: Option<&str>, node_name: Option<&str>) -> GuardDecision {
    let wanted = match only_on_node.map(str::trim).filter(|n| !n.is_empty()) {
        Some(wanted) => wanted,
        None => return GuardDecision::Run,
    };

    let node_name = node_name.map(str::trim).filter(|n| !n.is_empty());
    if node_name == Some(wanted) {
        GuardDecision::Run
    } else {
        GuardDecision::Skip {
            only_on_node: wanted.to_string(),
            node_name: node_name.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_guard_runs() {
        assert_eq!(evaluate(None, None), GuardDecision::Run);
        assert_eq!(evaluate(None, Some("node-a")), GuardDecision::Run);
        assert_eq!(evaluate(Some(""), Some("node-a")), GuardDecision::Run);
    }

    #[test]
    fn test_matching_node_runs() {
        assert_eq!(evaluate(Some("node-a"), Some("node-a")), GuardDecision::Run);
        assert_eq!(evaluate(Some("node-a"), Some("node-a\n")), GuardDecision::Run);
    }

    #[test]
    fn test_mismatch_skips() {
        assert_eq!(
            evaluate(Some("node-a"), Some("node-b")),
            GuardDecision::Skip {
                only_on_node: "node-a".to_string(),
                node_name: Some("node-b".to_string()),
            }
        );
    }

    #[test]
    fn test_unknown_node_name_skips() {
        assert_eq!(
            evaluate(Some("node-a"), None),
            GuardDecision::Skip {
                only_on_node: "node-a".to_string(),
                node_name: None,
            }
        );
        assert!(matches!(
            evaluate(Some("node-a"), Some("")),
            GuardDecision::Skip { node_name: None, .. }
        ));
    }
}
