//! Dependency graph construction over a model set, with deterministic
//! topological ordering (Kahn's algorithm, tie-broken on canonical name).

use crate::error::{IronlayerError, Result};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Adjacency is stored as canonical-name strings rather than owning pointers
/// into model objects (spec.md §9 design note on cyclic ownership) — lookups
/// go through the model registry the DAG was built from.
#[derive(Debug, Clone, Default)]
pub struct Dag {
    nodes: BTreeSet<String>,
    /// node -> set of nodes it depends on (upstream)
    edges: BTreeMap<String, BTreeSet<String>>,
    /// node -> set of nodes that depend on it (downstream)
    reverse_edges: BTreeMap<String, BTreeSet<String>>,
}

impl Dag {
    /// Build a graph from each model's referenced tables plus any explicit
    /// declared dependencies. The edge set is restricted to nodes present
    /// in `model_names`; anything else is an external sink and does not
    /// become a node.
    pub fn build(
        model_names: &BTreeSet<String>,
        referenced_tables: &BTreeMap<String, Vec<String>>,
        explicit_deps: &BTreeMap<String, Vec<String>>,
    ) -> Result<Self> {
        let mut dag = Dag {
            nodes: model_names.clone(),
            edges: BTreeMap::new(),
            reverse_edges: BTreeMap::new(),
        };

        for name in model_names {
            dag.edges.entry(name.clone()).or_default();
            dag.reverse_edges.entry(name.clone()).or_default();
        }

        for name in model_names {
            let mut deps: BTreeSet<String> = BTreeSet::new();
            if let Some(refs) = referenced_tables.get(name) {
                deps.extend(refs.iter().filter(|r| model_names.contains(*r)).cloned());
            }
            if let Some(explicit) = explicit_deps.get(name) {
                deps.extend(explicit.iter().filter(|r| model_names.contains(*r)).cloned());
            }
            for dep in &deps {
                dag.reverse_edges.entry(dep.clone()).or_default().insert(name.clone());
            }
            dag.edges.insert(name.clone(), deps);
        }

        dag.check_acyclic()?;
        Ok(dag)
    }

    pub fn upstream_of(&self, name: &str) -> BTreeSet<String> {
        self.edges.get(name).cloned().unwrap_or_default()
    }

    pub fn downstream_of(&self, name: &str) -> BTreeSet<String> {
        self.reverse_edges.get(name).cloned().unwrap_or_default()
    }

    /// Every descendant (transitive downstream) of `name`, not including
    /// itself.
    pub fn downstream_closure(&self, name: &str) -> BTreeSet<String> {
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(name.to_string());
        while let Some(current) = queue.pop_front() {
            for child in self.downstream_of(&current) {
                if visited.insert(child.clone()) {
                    queue.push_back(child);
                }
            }
        }
        visited
    }

    /// Kahn's algorithm with deterministic tie-breaking: among nodes with
    /// zero remaining in-degree, always pick the lexicographically smallest
    /// canonical name next.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        let mut in_degree: BTreeMap<String, usize> = self
            .nodes
            .iter()
            .map(|n| (n.clone(), self.edges.get(n).map(|d| d.len()).unwrap_or(0)))
            .collect();

        let mut ready: BTreeSet<String> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(n, _)| n.clone())
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(next) = ready.iter().next().cloned() {
            ready.remove(&next);
            order.push(next.clone());
            for downstream in self.downstream_of(&next) {
                if let Some(deg) = in_degree.get_mut(&downstream) {
                    *deg -= 1;
                    if *deg == 0 {
                        ready.insert(downstream);
                    }
                }
            }
        }

        if order.len() != self.nodes.len() {
            let cycle = self.find_cycle();
            return Err(IronlayerError::DagCycle(cycle.join(" -> ")));
        }
        Ok(order)
    }

    /// Longest-path depth from any source (a node with no upstream within
    /// the induced subgraph of `subset`). Used by the planner to assign
    /// `parallel_group`.
    pub fn depths_within(&self, subset: &BTreeSet<String>) -> BTreeMap<String, u32> {
        let mut depths: BTreeMap<String, u32> = BTreeMap::new();
        let order = self.topological_order().unwrap_or_default();
        for name in &order {
            if !subset.contains(name) {
                continue;
            }
            let upstream_depth = self
                .upstream_of(name)
                .iter()
                .filter(|u| subset.contains(*u))
                .filter_map(|u| depths.get(u))
                .max()
                .copied();
            let depth = upstream_depth.map(|d| d + 1).unwrap_or(0);
            depths.insert(name.clone(), depth);
        }
        depths
    }

    fn check_acyclic(&self) -> Result<()> {
        self.topological_order().map(|_| ())
    }

    /// DFS-based cycle extraction used only for error reporting; the
    /// happy-path Kahn's algorithm above never calls into this.
    fn find_cycle(&self) -> Vec<String> {
        #[derive(PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }
        let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();
        let mut stack: Vec<String> = Vec::new();

        fn visit<'a>(
            dag: &'a Dag,
            node: &'a str,
            marks: &mut BTreeMap<&'a str, Mark>,
            stack: &mut Vec<String>,
        ) -> Option<Vec<String>> {
            if let Some(Mark::Visiting) = marks.get(node) {
                let start = stack.iter().position(|n| n == node).unwrap_or(0);
                let mut cycle: Vec<String> = stack[start..].to_vec();
                cycle.push(node.to_string());
                return Some(cycle);
            }
            if marks.get(node) == Some(&Mark::Done) {
                return None;
            }
            marks.insert(node, Mark::Visiting);
            stack.push(node.to_string());
            if let Some(deps) = dag.edges.get(node) {
                for dep in deps {
                    if let Some(cycle) = visit(dag, dep, marks, stack) {
                        return Some(cycle);
                    }
                }
            }
            stack.pop();
            marks.insert(node, Mark::Done);
            None
        }

        for node in &self.nodes {
            if let Some(cycle) = visit(self, node, &mut marks, &mut stack) {
                return cycle;
            }
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(pairs: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    #[test]
    fn topo_order_is_deterministic_on_ties() {
        let nodes: BTreeSet<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let dag = Dag::build(&nodes, &BTreeMap::new(), &BTreeMap::new()).unwrap();
        assert_eq!(dag.topological_order().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn detects_cycle() {
        let nodes: BTreeSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        let refs = deps(&[("a", &["b"]), ("b", &["a"])]);
        let err = Dag::build(&nodes, &refs, &BTreeMap::new()).unwrap_err();
        assert_eq!(err.kind(), "DAG_CYCLE");
    }

    #[test]
    fn depths_assign_longest_path() {
        let nodes: BTreeSet<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let refs = deps(&[("b", &["a"]), ("c", &["b"])]);
        let dag = Dag::build(&nodes, &refs, &BTreeMap::new()).unwrap();
        let depths = dag.depths_within(&nodes);
        assert_eq!(depths["a"], 0);
        assert_eq!(depths["b"], 1);
        assert_eq!(depths["c"], 2);
    }

    #[test]
    fn external_tables_are_not_nodes() {
        let nodes: BTreeSet<String> = ["a"].iter().map(|s| s.to_string()).collect();
        let refs = deps(&[("a", &["external_table"])]);
        let dag = Dag::build(&nodes, &refs, &BTreeMap::new()).unwrap();
        assert!(dag.upstream_of("a").is_empty());
    }
}
