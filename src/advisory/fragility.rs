use crate::dag::Dag;
use std::collections::{BTreeMap, VecDeque};

#[derive(Debug, Clone, Copy)]
pub struct FragilityScore {
    pub own_risk: f64,
    pub upstream_risk: f64,
    pub cascade_risk: f64,
    pub composite: f64,
    pub critical_path: bool,
}

/// For each node, combines its own failure probability with a
/// depth-decayed upstream risk and a downstream-count-weighted cascade
/// risk into one 0-10 composite (spec.md §4.6).
pub fn score_fragility(dag: &Dag, failure_probability: &BTreeMap<String, f64>, node: &str) -> FragilityScore {
    let own_prob = failure_probability.get(node).copied().unwrap_or(0.0).clamp(0.0, 1.0);
    let own_risk = own_prob * 10.0;

    let upstream_contribution = bfs_upstream_decay(dag, failure_probability, node);
    let upstream_risk = (upstream_contribution * 10.0).min(10.0);

    let downstream_count = dag.downstream_closure(node).len();
    let cascade_risk = ((downstream_count as f64) * own_prob).min(10.0);

    let composite = (0.4 * own_risk + 0.3 * upstream_risk + 0.3 * cascade_risk).clamp(0.0, 10.0);

    let ancestors = upstream_closure(dag, node);
    let critical_path = !ancestors.is_empty()
        && ancestors
            .iter()
            .all(|a| failure_probability.get(a).copied().unwrap_or(0.0) > 0.3);

    FragilityScore {
        own_risk,
        upstream_risk,
        cascade_risk,
        composite,
        critical_path,
    }
}

fn upstream_closure(dag: &Dag, node: &str) -> Vec<String> {
    let mut visited = Vec::new();
    let mut seen = std::collections::BTreeSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(node.to_string());
    while let Some(current) = queue.pop_front() {
        for parent in dag.upstream_of(&current) {
            if seen.insert(parent.clone()) {
                visited.push(parent.clone());
                queue.push_back(parent);
            }
        }
    }
    visited
}

/// BFS upstream from `node`, decaying each ancestor's failure probability
/// by `0.8^depth` before summing (spec.md §4.6).
fn bfs_upstream_decay(dag: &Dag, failure_probability: &BTreeMap<String, f64>, node: &str) -> f64 {
    let mut total = 0.0;
    let mut seen = std::collections::BTreeSet::new();
    let mut queue = VecDeque::new();
    queue.push_back((node.to_string(), 0u32));
    seen.insert(node.to_string());
    while let Some((current, depth)) = queue.pop_front() {
        for parent in dag.upstream_of(&current) {
            if seen.insert(parent.clone()) {
                let prob = failure_probability.get(&parent).copied().unwrap_or(0.0).clamp(0.0, 1.0);
                total += prob * 0.8f64.powi((depth + 1) as i32);
                queue.push_back((parent, depth + 1));
            }
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn critical_path_flag_requires_every_ancestor_above_threshold() {
        let nodes: BTreeSet<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let mut refs = BTreeMap::new();
        refs.insert("b".to_string(), vec!["a".to_string()]);
        refs.insert("c".to_string(), vec!["b".to_string()]);
        let dag = Dag::build(&nodes, &refs, &BTreeMap::new()).unwrap();

        let mut probs = BTreeMap::new();
        probs.insert("a".to_string(), 0.5);
        probs.insert("b".to_string(), 0.4);
        probs.insert("c".to_string(), 0.9);
        let score = score_fragility(&dag, &probs, "c");
        assert!(score.critical_path);

        probs.insert("a".to_string(), 0.1);
        let score = score_fragility(&dag, &probs, "c");
        assert!(!score.critical_path);
    }

    #[test]
    fn composite_is_clamped_to_ten() {
        let nodes: BTreeSet<String> = ["a"].iter().map(|s| s.to_string()).collect();
        let dag = Dag::build(&nodes, &BTreeMap::new(), &BTreeMap::new()).unwrap();
        let mut probs = BTreeMap::new();
        probs.insert("a".to_string(), 1.0);
        let score = score_fragility(&dag, &probs, "a");
        assert!(score.composite <= 10.0);
    }
}
