//! Ordering a batch so that parents exist before their children are created,
//! and children are gone before their parents are removed.

use std::collections::{BTreeSet, HashMap};

use apideploy_core::{ActionKind, Change, ElemId};

/// Reorder `changes` by parent/child dependency.
///
/// Additions and modifications come first, each after any ancestor that is
/// also in the batch. Removals follow, each before any ancestor that is also
/// being removed. Otherwise the input order is kept, including among changes
/// that depend on each other in a cycle.
pub fn order_by_dependencies(changes: Vec<Change>) -> Vec<Change> {
    let order = dependency_order(&changes);
    let mut slots: Vec<Option<Change>> = changes.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect()
}

/// The permutation applied by [`order_by_dependencies`], as input indices.
pub fn dependency_order(changes: &[Change]) -> Vec<usize> {
    let (removals, upserts): (Vec<usize>, Vec<usize>) =
        (0..changes.len()).partition(|&i| changes[i].action() == ActionKind::Remove);

    let mut order = stable_sort(&upserts, parent_edges(changes, &upserts));
    let child_first = parent_edges(changes, &removals)
        .into_iter()
        .map(|(parent, child)| (child, parent))
        .collect();
    order.extend(stable_sort(&removals, child_first));
    order
}

/// `(parent, child)` pairs of positions in `nodes`.
fn parent_edges(changes: &[Change], nodes: &[usize]) -> Vec<(usize, usize)> {
    let mut positions: HashMap<&ElemId, Vec<usize>> = HashMap::new();
    for (position, &index) in nodes.iter().enumerate() {
        positions
            .entry(changes[index].elem_id())
            .or_default()
            .push(position);
    }
    let mut edges = Vec::new();
    for (child, &index) in nodes.iter().enumerate() {
        for parent in &changes[index].data().parents {
            if let Some(parents) = positions.get(&parent.elem_id) {
                edges.extend(parents.iter().map(|&p| (p, child)));
            }
        }
    }
    edges
}

/// Topological sort of `nodes` along `(before, after)` position pairs,
/// always taking the earliest ready node.
fn stable_sort(nodes: &[usize], edges: Vec<(usize, usize)>) -> Vec<usize> {
    let n = nodes.len();
    let mut successors = vec![Vec::new(); n];
    let mut waiting_on = vec![0usize; n];
    for (before, after) in edges {
        if before != after {
            successors[before].push(after);
            waiting_on[after] += 1;
        }
    }
    let mut ready: BTreeSet<usize> = (0..n).filter(|&p| waiting_on[p] == 0).collect();
    let mut placed = vec![false; n];
    let mut next_unplaced = 0;
    let mut sorted = Vec::with_capacity(n);
    while sorted.len() < n {
        let position = match ready.pop_first() {
            Some(position) => position,
            None => {
                // Everything left waits on something; break the cycle in input order.
                while placed[next_unplaced] {
                    next_unplaced += 1;
                }
                next_unplaced
            }
        };
        placed[position] = true;
        sorted.push(nodes[position]);
        for &successor in &successors[position] {
            waiting_on[successor] -= 1;
            if waiting_on[successor] == 0 && !placed[successor] {
                ready.insert(successor);
            }
        }
    }
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use apideploy_core::{Entity, ObjectType};
    use serde_json::Map;

    fn entity(type_name: &str, name: &str) -> Entity {
        Entity::new(
            ElemId::new("jira", type_name, name),
            ObjectType::default(),
            Map::new(),
        )
    }

    fn names(changes: &[Change]) -> Vec<String> {
        changes.iter().map(|c| c.elem_id().name.clone()).collect()
    }

    #[test]
    fn additions_put_parents_first() {
        let dashboard = entity("Dashboard", "d");
        let gadget = entity("DashboardGadget", "g").with_parent(&dashboard);
        let other = entity("Field", "f");
        let ordered = order_by_dependencies(vec![
            Change::add(gadget),
            Change::add(other),
            Change::add(dashboard),
        ]);
        assert_eq!(names(&ordered), vec!["f", "d", "g"]);
    }

    #[test]
    fn removals_put_children_first_and_come_last() {
        let dashboard = entity("Dashboard", "d");
        let gadget = entity("DashboardGadget", "g").with_parent(&dashboard);
        let added = entity("Field", "f");
        let ordered = order_by_dependencies(vec![
            Change::remove(dashboard),
            Change::remove(gadget),
            Change::add(added),
        ]);
        assert_eq!(names(&ordered), vec!["f", "g", "d"]);
    }

    #[test]
    fn independent_changes_keep_input_order() {
        let changes: Vec<Change> = ["a", "b", "c"]
            .into_iter()
            .map(|n| Change::add(entity("Field", n)))
            .collect();
        assert_eq!(dependency_order(&changes), vec![0, 1, 2]);
    }

    #[test]
    fn cycles_terminate_in_input_order() {
        let a = entity("T", "a");
        let b = entity("T", "b").with_parent(&a);
        let a = a.with_parent(&b);
        let changes = vec![Change::add(b), Change::add(a)];
        assert_eq!(dependency_order(&changes), vec![0, 1]);
    }

    #[test]
    fn long_chains_given_in_reverse() {
        let mut entities = vec![entity("T", "0")];
        for i in 1..200 {
            let parent = &entities[i - 1];
            let child = entity("T", &i.to_string()).with_parent(parent);
            entities.push(child);
        }
        let changes: Vec<Change> = entities.into_iter().rev().map(Change::add).collect();
        let expected: Vec<usize> = (0..200).rev().collect();
        assert_eq!(dependency_order(&changes), expected);

        let removals: Vec<Change> = changes
            .into_iter()
            .map(|c| Change::remove(c.data().clone()))
            .collect();
        let expected: Vec<usize> = (0..200).collect();
        assert_eq!(dependency_order(&removals), expected);
    }
}
