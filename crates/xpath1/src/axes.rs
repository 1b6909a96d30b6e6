//! Node collection along each XPath axis, for a single context node.
//!
//! Forward axes yield document order; reverse axes yield proximity order
//! (nearest node first), which is what positional predicates count in.

use crate::datasource::DataSourceNode;

pub fn collect_child_nodes<'a, N: DataSourceNode<'a>>(node: N, results: &mut Vec<N>) {
    results.extend(node.children());
}

pub fn collect_attribute_nodes<'a, N: DataSourceNode<'a>>(node: N, results: &mut Vec<N>) {
    results.extend(node.attributes());
}

/// Pre-order walk, so results come out in document order.
pub fn collect_descendant_nodes<'a, N: DataSourceNode<'a>>(node: N, results: &mut Vec<N>) {
    let mut stack: Vec<N> = node.children().collect();
    stack.reverse();
    while let Some(current) = stack.pop() {
        results.push(current);
        let first_child_at = stack.len();
        stack.extend(current.children());
        stack[first_child_at..].reverse();
    }
}

pub fn collect_descendant_or_self_nodes<'a, N: DataSourceNode<'a>>(
    node: N,
    results: &mut Vec<N>,
) {
    results.push(node);
    collect_descendant_nodes(node, results);
}

pub fn collect_parent_nodes<'a, N: DataSourceNode<'a>>(node: N, results: &mut Vec<N>) {
    results.extend(node.parent());
}

pub fn collect_ancestor_nodes<'a, N: DataSourceNode<'a>>(node: N, results: &mut Vec<N>) {
    let mut current = node.parent();
    while let Some(p) = current {
        results.push(p);
        current = p.parent();
    }
}

pub fn collect_following_sibling_nodes<'a, N: DataSourceNode<'a>>(
    node: N,
    results: &mut Vec<N>,
) {
    if let Some(parent) = node.parent() {
        results.extend(parent.children().skip_while(|s| *s != node).skip(1));
    }
}

pub fn collect_preceding_sibling_nodes<'a, N: DataSourceNode<'a>>(
    node: N,
    results: &mut Vec<N>,
) {
    if let Some(parent) = node.parent() {
        let before: Vec<N> = parent.children().take_while(|s| *s != node).collect();
        results.extend(before.into_iter().rev());
    }
}

pub fn collect_following_nodes<'a, N: DataSourceNode<'a>>(node: N, results: &mut Vec<N>) {
    let mut current = node;
    while let Some(parent) = current.parent() {
        for sibling in parent.children().skip_while(|s| *s != current).skip(1) {
            collect_descendant_or_self_nodes(sibling, results);
        }
        current = parent;
    }
}

pub fn collect_preceding_nodes<'a, N: DataSourceNode<'a>>(node: N, results: &mut Vec<N>) {
    let mut current = node;
    let mut in_order = Vec::new();
    while let Some(parent) = current.parent() {
        let mut level = Vec::new();
        for sibling in parent.children().take_while(|s| *s != current) {
            collect_descendant_or_self_nodes(sibling, &mut level);
        }
        // Earlier levels sit before later ones in document order.
        level.append(&mut in_order);
        in_order = level;
        current = parent;
    }
    results.extend(in_order.into_iter().rev());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::tests::{MockNode, create_entry_tree};

    fn ids(nodes: &[MockNode<'_>]) -> Vec<usize> {
        nodes.iter().map(|n| n.id).collect()
    }

    #[test]
    fn test_collect_child() {
        let tree = create_entry_tree();
        let entry = MockNode { id: 1, tree: &tree };
        let mut results = Vec::new();
        collect_child_nodes(entry, &mut results);
        assert_eq!(ids(&results), vec![2, 5, 8, 12]);
    }

    #[test]
    fn test_collect_descendant_in_document_order() {
        let tree = create_entry_tree();
        let entry = MockNode { id: 1, tree: &tree };
        let mut results = Vec::new();
        collect_descendant_nodes(entry, &mut results);
        // The attribute (id 10) is not a child, so it is skipped.
        assert_eq!(ids(&results), vec![2, 3, 4, 5, 6, 7, 8, 9, 11, 12, 13, 14]);
    }

    #[test]
    fn test_collect_ancestor_nearest_first() {
        let tree = create_entry_tree();
        let text = MockNode { id: 4, tree: &tree };
        let mut results = Vec::new();
        collect_ancestor_nodes(text, &mut results);
        assert_eq!(ids(&results), vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_collect_siblings() {
        let tree = create_entry_tree();
        let gram_grp = MockNode { id: 8, tree: &tree };

        let mut following = Vec::new();
        collect_following_sibling_nodes(gram_grp, &mut following);
        assert_eq!(ids(&following), vec![12]);

        let mut preceding = Vec::new();
        collect_preceding_sibling_nodes(gram_grp, &mut preceding);
        assert_eq!(ids(&preceding), vec![5, 2]);
    }

    #[test]
    fn test_collect_following_and_preceding() {
        let tree = create_entry_tree();
        let second_orth_text = MockNode { id: 7, tree: &tree };

        let mut following = Vec::new();
        collect_following_nodes(second_orth_text, &mut following);
        assert_eq!(ids(&following), vec![8, 9, 11, 12, 13, 14]);

        let mut preceding = Vec::new();
        collect_preceding_nodes(second_orth_text, &mut preceding);
        // Ancestors (form 5, entry 1, root 0) are not on the preceding axis.
        assert_eq!(ids(&preceding), vec![4, 3, 2]);
    }
}
