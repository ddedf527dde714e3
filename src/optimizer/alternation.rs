// alternation.rs - Passes that restructure the alternatives of one container.
//
// Lookbehinds are left alone: Oniguruma accepts alternatives of different
// lengths at their top level but not inside nested groups or quantifiers.

use crate::ast::{Alternative, Group, LookaroundKind, Node, Quantifier, QuantifierKind};
use crate::error::RegexError;
use crate::generator::print_elements;
use crate::traverser::{Path, Visitor};

use super::{holds_flag_directive, is_simple};

/// Element lists of a container's alternatives, when it may be restructured.
fn branches(node: &Node) -> Option<Vec<&[Node]>> {
    if matches!(node, Node::LookaroundAssertion(l) if l.kind == LookaroundKind::Lookbehind) {
        return None;
    }
    let alternatives = node.alternatives()?;
    if alternatives.len() < 2 || holds_flag_directive(alternatives) {
        return None;
    }
    alternatives.iter().map(|alt| alt.elements().map(Vec::as_slice)).collect()
}

fn common_prefix_len(branches: &[&[Node]]) -> usize {
    let Some((first, rest)) = branches.split_first() else {
        return 0;
    };
    first
        .iter()
        .enumerate()
        .take_while(|&(i, node)| is_simple(node) && rest.iter().all(|b| b.get(i) == Some(node)))
        .count()
}

fn common_suffix_len(branches: &[&[Node]]) -> usize {
    let Some((first, rest)) = branches.split_first() else {
        return 0;
    };
    first
        .iter()
        .rev()
        .enumerate()
        .take_while(|&(i, node)| {
            is_simple(node)
                && rest.iter().all(|b| b.len() > i && b.get(b.len() - 1 - i) == Some(node))
        })
        .count()
}

/// Whether factoring `affix` out of the alternatives pays off. Pulling out a
/// single element only pays when `single_needs_unlock` is unset or the
/// remainders become trivial.
fn worth_extracting(
    affix: &[Node],
    remainders: &[Vec<Node>],
    single_needs_unlock: bool,
) -> Result<bool, RegexError> {
    let unlocks = remainders.iter().all(|r| r.len() <= 1) || matches!(affix, [Node::Assertion(_)]);
    if unlocks {
        return Ok(true);
    }
    if single_needs_unlock && affix.len() == 1 {
        return Ok(false);
    }
    let saved = (remainders.len() - 1) * print_elements(affix)?.chars().count();
    Ok(saved >= 4)
}

fn group_of(alternatives: Vec<Vec<Node>>) -> Node {
    Node::Group(Group::new(alternatives.into_iter().map(Alternative::new).collect()))
}

fn set_single_alternative(path: &mut Path<'_>, body: Vec<Node>) {
    if let Some(alternatives) = path.node_mut().alternatives_mut() {
        *alternatives = vec![Node::alternative(body)];
    }
}

/// `^a|^ab|^ac` → `^a(?:|b|c)`.
pub(super) struct ExtractPrefix;

impl Visitor for ExtractPrefix {
    fn enter(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        let Some(branches) = branches(path.node()) else {
            return Ok(());
        };
        let k = common_prefix_len(&branches);
        if k == 0 {
            return Ok(());
        }
        let prefix = branches[0][..k].to_vec();
        let remainders: Vec<Vec<Node>> = branches.iter().map(|b| b[k..].to_vec()).collect();
        if !worth_extracting(&prefix, &remainders, false)? {
            return Ok(());
        }
        let mut body = prefix;
        body.push(group_of(remainders));
        set_single_alternative(path, body);
        Ok(())
    }
}

/// `ab|cb|ad|cd` → `(?:a|c)(?:b|d)`: two prefixes taking turns over the
/// same run of remainders.
pub(super) struct ExtractPrefix2;

impl Visitor for ExtractPrefix2 {
    fn enter(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        let Some(branches) = branches(path.node()) else {
            return Ok(());
        };
        if branches.len() < 4 || branches.len() % 2 != 0 {
            return Ok(());
        }
        let evens: Vec<&[Node]> = branches.iter().step_by(2).copied().collect();
        let odds: Vec<&[Node]> = branches.iter().skip(1).step_by(2).copied().collect();
        let (k1, k2) = (common_prefix_len(&evens), common_prefix_len(&odds));
        if k1 == 0 || k2 == 0 || evens[0][..k1] == odds[0][..k2] {
            return Ok(());
        }
        if !evens.iter().zip(&odds).all(|(e, o)| e[k1..] == o[k2..]) {
            return Ok(());
        }
        let heads = vec![evens[0][..k1].to_vec(), odds[0][..k2].to_vec()];
        let tails = evens.iter().map(|e| e[k1..].to_vec()).collect();
        set_single_alternative(path, vec![group_of(heads), group_of(tails)]);
        Ok(())
    }
}

/// `aa$|a$|ca$` → `(?:a||c)a$`.
pub(super) struct ExtractSuffix;

impl Visitor for ExtractSuffix {
    fn enter(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        let Some(branches) = branches(path.node()) else {
            return Ok(());
        };
        let k = common_suffix_len(&branches);
        if k == 0 {
            return Ok(());
        }
        let first = branches[0];
        let suffix = first[first.len() - k..].to_vec();
        let remainders: Vec<Vec<Node>> = branches.iter().map(|b| b[..b.len() - k].to_vec()).collect();
        if !worth_extracting(&suffix, &remainders, true)? {
            return Ok(());
        }
        let mut body = vec![group_of(remainders)];
        body.extend(suffix);
        set_single_alternative(path, body);
        Ok(())
    }
}

/// Merge two adjacent alternatives: identical ones collapse, and `A|AX`
/// becomes `AX??` while `AX|A` becomes `AX?`.
fn merge_pair(a: &[Node], b: &[Node]) -> Result<Option<Vec<Node>>, RegexError> {
    if a == b {
        return Ok(Some(a.to_vec()));
    }
    let (short, long, kind) = if a.len() + 1 == b.len() {
        (a, b, QuantifierKind::Lazy)
    } else if b.len() + 1 == a.len() {
        (b, a, QuantifierKind::Greedy)
    } else {
        return Ok(None);
    };
    let Some((last, head)) = long.split_last() else {
        return Ok(None);
    };
    if head != short || !last.is_quantifiable() || matches!(last, Node::Quantifier(_)) {
        return Ok(None);
    }
    let mut merged = short.to_vec();
    merged.push(Node::Quantifier(Quantifier::new(last.clone(), 0, Some(1), kind)?));
    Ok(Some(merged))
}

pub(super) struct Optionalize;

impl Visitor for Optionalize {
    fn enter(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        let Some(branches) = branches(path.node()) else {
            return Ok(());
        };
        let mut merged: Vec<Vec<Node>> = Vec::with_capacity(branches.len());
        let mut changed = false;
        for branch in branches {
            let combined = match merged.last() {
                Some(prev) => merge_pair(prev, branch)?,
                None => None,
            };
            match (combined, merged.last_mut()) {
                (Some(combined), Some(prev)) => {
                    *prev = combined;
                    changed = true;
                }
                _ => merged.push(branch.to_vec()),
            }
        }
        if changed {
            if let Some(alternatives) = path.node_mut().alternatives_mut() {
                *alternatives = merged.into_iter().map(Node::alternative).collect();
            }
        }
        Ok(())
    }
}
