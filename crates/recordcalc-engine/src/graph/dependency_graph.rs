//! The reverse index from property names to dependent formulas, and the
//! collection-level cycle check.

use ahash::{AHashMap, AHashSet};
use recordcalc_model::RecordId;

/// Tracks, per record, the set of property names its formula currently
/// reads. Queried when a property changes to find the formulas that need
/// recalculating.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    dependencies: AHashMap<RecordId, AHashSet<String>>,
}

impl DependencyGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Union `names` into the record's tracked dependency set.
    pub fn update_dependencies<I, S>(&mut self, record_id: RecordId, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies
            .entry(record_id)
            .or_default()
            .extend(names.into_iter().map(Into::into));
    }

    /// Replace the record's tracked set entirely (used on re-evaluation when
    /// the formula text changed).
    pub fn set_dependencies<I, S>(&mut self, record_id: RecordId, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.insert(
            record_id,
            names.into_iter().map(Into::into).collect(),
        );
    }

    /// Every tracked record whose dependency set intersects the changed
    /// property names — the fan-out of a property edit. Sorted for
    /// deterministic output.
    #[must_use]
    pub fn dependents_of(&self, changed: &[String]) -> Vec<RecordId> {
        let mut out: Vec<RecordId> = self
            .dependencies
            .iter()
            .filter(|(_, deps)| changed.iter().any(|name| deps.contains(name)))
            .map(|(record, _)| record.clone())
            .collect();
        out.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        out
    }

    #[must_use]
    pub fn dependencies_of(&self, record_id: &RecordId) -> Option<&AHashSet<String>> {
        self.dependencies.get(record_id)
    }

    /// Drop a record's tracking (formula deleted).
    pub fn remove(&mut self, record_id: &RecordId) -> bool {
        self.dependencies.remove(record_id).is_some()
    }

    pub fn clear(&mut self) {
        self.dependencies.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InStack,
    Done,
}

/// Find every dependency cycle in a collection's formulas.
///
/// `formulas` maps each formula name to the property names it reads; an edge
/// exists where a dependency is itself a formula name. Each detected cycle is
/// reported as the chain of names from the first revisited node onward.
#[must_use]
pub fn detect_cycles(formulas: &[(String, Vec<String>)]) -> Vec<Vec<String>> {
    let by_name: AHashMap<&str, &[String]> = formulas
        .iter()
        .map(|(name, deps)| (name.as_str(), deps.as_slice()))
        .collect();

    let mut state: AHashMap<&str, VisitState> = AHashMap::new();
    let mut stack: Vec<String> = Vec::new();
    let mut cycles: Vec<Vec<String>> = Vec::new();

    for (name, _) in formulas {
        if !state.contains_key(name.as_str()) {
            visit(name, &by_name, &mut state, &mut stack, &mut cycles);
        }
    }
    cycles
}

fn visit<'a>(
    name: &'a str,
    by_name: &AHashMap<&'a str, &'a [String]>,
    state: &mut AHashMap<&'a str, VisitState>,
    stack: &mut Vec<String>,
    cycles: &mut Vec<Vec<String>>,
) {
    match state.get(name) {
        Some(VisitState::Done) => return,
        Some(VisitState::InStack) => {
            if let Some(pos) = stack.iter().position(|n| n == name) {
                cycles.push(stack[pos..].to_vec());
            }
            return;
        }
        None => {}
    }

    state.insert(name, VisitState::InStack);
    stack.push(name.to_string());

    if let Some(deps) = by_name.get(name) {
        for dep in deps.iter() {
            // Only dependencies that are themselves formulas form edges.
            if let Some((&key, _)) = by_name.get_key_value(dep.as_str()) {
                visit(key, by_name, state, stack, cycles);
            }
        }
    }

    stack.pop();
    state.insert(name, VisitState::Done);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn formula(name: &str, deps: &[&str]) -> (String, Vec<String>) {
        (
            name.to_string(),
            deps.iter().map(|d| d.to_string()).collect(),
        )
    }

    #[test]
    fn update_unions_and_set_replaces() {
        let mut graph = DependencyGraph::new();
        graph.update_dependencies("rec-1".into(), ["A", "B"]);
        graph.update_dependencies("rec-1".into(), ["B", "C"]);
        assert_eq!(graph.dependencies_of(&"rec-1".into()).unwrap().len(), 3);

        graph.set_dependencies("rec-1".into(), ["D"]);
        assert_eq!(graph.dependencies_of(&"rec-1".into()).unwrap().len(), 1);
    }

    #[test]
    fn dependents_intersect_changed_names() {
        let mut graph = DependencyGraph::new();
        graph.update_dependencies("rec-1".into(), ["Price", "Tax"]);
        graph.update_dependencies("rec-2".into(), ["Tax"]);
        graph.update_dependencies("rec-3".into(), ["Name"]);

        let dependents = graph.dependents_of(&["Tax".to_string()]);
        assert_eq!(dependents, vec![RecordId::from("rec-1"), RecordId::from("rec-2")]);

        assert!(graph.dependents_of(&["Missing".to_string()]).is_empty());
    }

    #[test]
    fn removal_stops_tracking() {
        let mut graph = DependencyGraph::new();
        graph.update_dependencies("rec-1".into(), ["A"]);
        assert!(graph.remove(&"rec-1".into()));
        assert!(graph.dependents_of(&["A".to_string()]).is_empty());
    }

    #[test]
    fn two_formula_cycle_is_detected() {
        let formulas = vec![formula("F1", &["F2"]), formula("F2", &["F1"])];
        let cycles = detect_cycles(&formulas);
        assert_eq!(cycles.len(), 1);
        let mut cycle = cycles[0].clone();
        cycle.sort();
        assert_eq!(cycle, vec!["F1".to_string(), "F2".to_string()]);
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let cycles = detect_cycles(&[formula("F1", &["F1"])]);
        assert_eq!(cycles, vec![vec!["F1".to_string()]]);
    }

    #[test]
    fn acyclic_chains_pass() {
        let formulas = vec![
            formula("Total", &["Subtotal", "Tax"]),
            formula("Subtotal", &["Price", "Quantity"]),
            formula("Tax", &["Subtotal"]),
        ];
        assert!(detect_cycles(&formulas).is_empty());
    }

    #[test]
    fn longer_cycle_reports_the_loop_slice() {
        let formulas = vec![
            formula("Entry", &["A"]),
            formula("A", &["B"]),
            formula("B", &["C"]),
            formula("C", &["A"]),
        ];
        let cycles = detect_cycles(&formulas);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 3);
        assert!(cycles[0].contains(&"A".to_string()));
        assert!(!cycles[0].contains(&"Entry".to_string()));
    }
}
