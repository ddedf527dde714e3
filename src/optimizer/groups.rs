// groups.rs - Group-level passes: empty groups, useless wrappers, nested
// groups, and anchors inside capturing groups.

use crate::ast::{Alternative, CapturingGroup, Node};
use crate::error::RegexError;
use crate::traverser::{Parent, Path, Visitor};

use super::holds_flag_directive;

fn is_empty_group(node: &Node) -> bool {
    match node {
        Node::Group(g) => g.body.iter().all(|alt| alt.elements().is_some_and(Vec::is_empty)),
        Node::Quantifier(q) => is_empty_group(&q.body),
        _ => false,
    }
}

fn is_atomic_element(node: &Node) -> bool {
    matches!(
        node,
        Node::Assertion(_)
            | Node::Backreference(_)
            | Node::Character(_)
            | Node::CharacterClass(_)
            | Node::CharacterSet(_)
            | Node::Directive(_)
    )
}

/// `(?:)`, `(?>)`, `(?i:)`, quantified or not.
pub(super) struct RemoveEmptyGroups;

impl Visitor for RemoveEmptyGroups {
    fn exit(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        if let Some(elements) = path.node_mut().elements_mut() {
            elements.retain(|node| !is_empty_group(node));
        }
        Ok(())
    }
}

/// Drop non-capturing wrappers that cannot affect matching.
pub(super) struct UnwrapUselessGroups;

impl Visitor for UnwrapUselessGroups {
    fn exit(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        let Node::Group(group) = path.node() else {
            return Ok(());
        };
        if group.body.len() != 1 || holds_flag_directive(&group.body) {
            return Ok(());
        }
        if group.flags.is_some_and(|flags| !flags.is_effectless()) {
            return Ok(());
        }
        let Some(elements) = group.body[0].elements() else {
            return Ok(());
        };
        if group.atomic && !elements.iter().all(is_atomic_element) {
            return Ok(());
        }
        if matches!(path.parent(), Some(Parent::Quantifier { .. })) {
            match elements.as_slice() {
                [only] if only.is_quantifiable() && !matches!(only, Node::Quantifier(_)) => {
                    let only = only.clone();
                    *path.node_mut() = only;
                }
                _ => {}
            }
        } else if path.container().is_some() {
            let elements = elements.clone();
            path.replace_with_multiple(elements, false)?;
        }
        Ok(())
    }
}

/// `(?:(?:a|b))` → `(?:a|b)`, and a plain group that is a container's whole
/// content merges into it.
pub(super) struct Ungroup;

impl Visitor for Ungroup {
    fn enter(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        let outer_atomic = matches!(path.node(), Node::Group(g) if g.atomic);
        let Some(alternatives) = path.node().alternatives() else {
            return Ok(());
        };
        let inner = match alternatives.as_slice() {
            [alt] => match alt.elements().map(Vec::as_slice) {
                Some([Node::Group(inner)]) => inner,
                _ => return Ok(()),
            },
            _ => return Ok(()),
        };
        let compatible = inner.flags.is_none() && (!inner.atomic || outer_atomic);
        if !compatible || holds_flag_directive(&inner.body) {
            return Ok(());
        }
        let body = inner.body.clone();
        if let Some(alternatives) = path.node_mut().alternatives_mut() {
            *alternatives = body;
        }
        Ok(())
    }
}

/// `(^a$)` → `^(a)$` for groups nothing else calls.
pub(super) struct ExposeAnchors;

impl Visitor for ExposeAnchors {
    fn enter(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        if path.container().is_none() {
            return Ok(());
        }
        let Node::CapturingGroup(group) = path.node() else {
            return Ok(());
        };
        if group.is_subroutined {
            return Ok(());
        }
        let elements = match group.body.as_slice() {
            [alt] => match alt.elements() {
                Some(elements) => elements,
                None => return Ok(()),
            },
            _ => return Ok(()),
        };
        let is_assertion = |n: &&Node| matches!(n, Node::Assertion(_));
        let lead = elements.iter().take_while(is_assertion).count();
        let trail = elements[lead..].iter().rev().take_while(is_assertion).count();
        if lead + trail == 0 || lead + trail == elements.len() {
            return Ok(());
        }
        let middle = elements[lead..elements.len() - trail].to_vec();
        let mut nodes: Vec<Node> = elements[..lead].to_vec();
        nodes.push(Node::CapturingGroup(CapturingGroup {
            body: vec![Node::Alternative(Alternative::new(middle))],
            ..group.clone()
        }));
        nodes.extend_from_slice(&elements[elements.len() - trail..]);
        path.replace_with_multiple(nodes, false)
    }
}
