// traverser.rs - Depth-first AST walk with in-place editing.
//
// Each visited node gets a `Path`. Edits requested through the path
// (remove, replace, replace with many) are applied once the callback
// returns, so the node stays readable for the whole callback. The walk of a
// child list continues from the index the edit leaves behind, which keeps
// sibling positions consistent when several siblings are edited in one pass.

use crate::ast::{ClassKind, LookaroundKind, Node, NodeKind, OnigurumaAst, QuantifierKind};
use crate::error::RegexError;
use crate::flags::{FlagGroupModifiers, Flags};

/// Where a node sits in its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Root,
    Index(usize),
    Field(&'static str),
}

/// Scalar snapshot of an ancestor. Nodes never store their parent; the
/// traversal hands this out for the duration of a callback only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parent {
    Pattern,
    Alternative,
    Group { atomic: bool, flags: Option<FlagGroupModifiers> },
    CapturingGroup { number: u32, is_subroutined: bool },
    LookaroundAssertion { kind: LookaroundKind, negate: bool },
    AbsentFunction,
    CharacterClass { kind: ClassKind, negate: bool },
    CharacterClassRange,
    Quantifier { kind: QuantifierKind, min: u32, max: Option<u32> },
}

impl Parent {
    fn of(node: &Node) -> Option<Parent> {
        Some(match node {
            Node::Pattern(_) => Parent::Pattern,
            Node::Alternative(_) => Parent::Alternative,
            Node::Group(g) => Parent::Group { atomic: g.atomic, flags: g.flags },
            Node::CapturingGroup(g) => Parent::CapturingGroup {
                number: g.number,
                is_subroutined: g.is_subroutined,
            },
            Node::LookaroundAssertion(l) => Parent::LookaroundAssertion { kind: l.kind, negate: l.negate },
            Node::AbsentFunction(_) => Parent::AbsentFunction,
            Node::CharacterClass(c) => Parent::CharacterClass { kind: c.kind, negate: c.negate },
            Node::CharacterClassRange(_) => Parent::CharacterClassRange,
            Node::Quantifier(q) => Parent::Quantifier { kind: q.kind, min: q.min, max: q.max },
            _ => return None,
        })
    }
}

enum Slot<'a> {
    Item { container: &'a mut Vec<Node>, index: usize },
    Field(&'a mut Node),
}

enum Action {
    Continue,
    Skip,
    Remove,
    Replace { nodes: Vec<Node>, traverse: bool },
}

/// Read-only state shared by every path of one walk.
struct Context<'a> {
    flags: &'a Flags,
    root: Option<&'a OnigurumaAst>,
}

/// Access to the visited node, its position and its ancestry.
pub struct Path<'a> {
    slot: Slot<'a>,
    key: Key,
    ancestors: &'a [Parent],
    cx: &'a Context<'a>,
    action: Action,
}

impl<'a> Path<'a> {
    pub fn node(&self) -> &Node {
        match &self.slot {
            Slot::Item { container, index } => &container[*index],
            Slot::Field(node) => node,
        }
    }

    pub fn node_mut(&mut self) -> &mut Node {
        match &mut self.slot {
            Slot::Item { container, index } => &mut container[*index],
            Slot::Field(node) => node,
        }
    }

    pub fn key(&self) -> Key {
        match &self.slot {
            Slot::Item { index, .. } => Key::Index(*index),
            Slot::Field(_) => self.key,
        }
    }

    /// Nearest ancestor.
    pub fn parent(&self) -> Option<&Parent> {
        self.ancestors.last()
    }

    /// Ancestors from the root down to the parent.
    pub fn ancestors(&self) -> &[Parent] {
        self.ancestors
    }

    /// Pattern-wide flags.
    pub fn flags(&self) -> &Flags {
        self.cx.flags
    }

    /// The AST as it was when the walk started. `None` unless the visitor
    /// asked for it through [`Visitor::wants_root`].
    pub fn root(&self) -> Option<&OnigurumaAst> {
        self.cx.root
    }

    /// The sibling list that owns this node, if it sits in one.
    pub fn container(&self) -> Option<&[Node]> {
        match &self.slot {
            Slot::Item { container, .. } => Some(container.as_slice()),
            Slot::Field(_) => None,
        }
    }

    fn require_container(&self, op: &str) -> Result<(), RegexError> {
        match self.slot {
            Slot::Item { .. } => Ok(()),
            Slot::Field(_) => Err(RegexError::bug(format!(
                "{} on a node without a container; assign the field instead",
                op
            ))),
        }
    }

    pub fn remove(&mut self) -> Result<(), RegexError> {
        self.require_container("remove")?;
        self.action = Action::Remove;
        Ok(())
    }

    /// Overwrite this node's slot. With `traverse`, the new node is walked.
    pub fn replace_with(&mut self, node: Node, traverse: bool) -> Result<(), RegexError> {
        self.require_container("replace_with")?;
        self.action = Action::Replace { nodes: vec![node], traverse };
        Ok(())
    }

    /// Splice `nodes` in place of this node. With `traverse`, each is walked.
    pub fn replace_with_multiple(&mut self, nodes: Vec<Node>, traverse: bool) -> Result<(), RegexError> {
        self.require_container("replace_with_multiple")?;
        self.action = Action::Replace { nodes, traverse };
        Ok(())
    }

    pub fn remove_all_next_siblings(&mut self) -> Result<Vec<Node>, RegexError> {
        self.require_container("remove_all_next_siblings")?;
        self.mark_handled();
        match &mut self.slot {
            Slot::Item { container, index } => Ok(container.drain(*index + 1..).collect()),
            Slot::Field(_) => Ok(Vec::new()),
        }
    }

    pub fn remove_all_prev_siblings(&mut self) -> Result<Vec<Node>, RegexError> {
        self.require_container("remove_all_prev_siblings")?;
        self.mark_handled();
        match &mut self.slot {
            Slot::Item { container, index } => {
                let removed = container.drain(..*index).collect();
                *index = 0;
                Ok(removed)
            }
            Slot::Field(_) => Ok(Vec::new()),
        }
    }

    /// Do not descend into this node's children. Exit hooks still fire.
    pub fn skip(&mut self) {
        self.mark_handled();
    }

    fn mark_handled(&mut self) {
        if matches!(self.action, Action::Continue) {
            self.action = Action::Skip;
        }
    }

    /// The node is still in place: not removed or replaced by a hook.
    fn is_present(&self) -> bool {
        matches!(self.action, Action::Continue | Action::Skip)
    }

    fn index(&self) -> usize {
        match &self.slot {
            Slot::Item { index, .. } => *index,
            Slot::Field(_) => 0,
        }
    }
}

macro_rules! visitor_hooks {
    ($($kind:ident => $enter:ident, $exit:ident;)*) => {
        /// Walk callbacks. `enter` and `exit` fire for every node; the typed
        /// hooks fire for one node kind, after `enter` and before `exit`.
        /// A hook that removes or replaces the node ends the hooks for it.
        pub trait Visitor {
            fn enter(&mut self, _path: &mut Path<'_>) -> Result<(), RegexError> {
                Ok(())
            }

            fn exit(&mut self, _path: &mut Path<'_>) -> Result<(), RegexError> {
                Ok(())
            }

            /// Request a snapshot of the AST for [`Path::root`].
            fn wants_root(&self) -> bool {
                false
            }

            $(
                fn $enter(&mut self, _path: &mut Path<'_>) -> Result<(), RegexError> {
                    Ok(())
                }

                fn $exit(&mut self, _path: &mut Path<'_>) -> Result<(), RegexError> {
                    Ok(())
                }
            )*
        }

        fn enter_typed<V: Visitor + ?Sized>(
            visitor: &mut V,
            kind: NodeKind,
            path: &mut Path<'_>,
        ) -> Result<(), RegexError> {
            match kind {
                $(NodeKind::$kind => visitor.$enter(path),)*
            }
        }

        fn exit_typed<V: Visitor + ?Sized>(
            visitor: &mut V,
            kind: NodeKind,
            path: &mut Path<'_>,
        ) -> Result<(), RegexError> {
            match kind {
                $(NodeKind::$kind => visitor.$exit(path),)*
            }
        }
    };
}

visitor_hooks! {
    AbsentFunction => enter_absent_function, exit_absent_function;
    Alternative => enter_alternative, exit_alternative;
    Assertion => enter_assertion, exit_assertion;
    Backreference => enter_backreference, exit_backreference;
    CapturingGroup => enter_capturing_group, exit_capturing_group;
    Character => enter_character, exit_character;
    CharacterClass => enter_character_class, exit_character_class;
    CharacterClassRange => enter_character_class_range, exit_character_class_range;
    CharacterSet => enter_character_set, exit_character_set;
    Directive => enter_directive, exit_directive;
    Group => enter_group, exit_group;
    LookaroundAssertion => enter_lookaround_assertion, exit_lookaround_assertion;
    NamedCallout => enter_named_callout, exit_named_callout;
    Pattern => enter_pattern, exit_pattern;
    Quantifier => enter_quantifier, exit_quantifier;
    Subroutine => enter_subroutine, exit_subroutine;
}

fn run_enter<V: Visitor + ?Sized>(visitor: &mut V, path: &mut Path<'_>) -> Result<(), RegexError> {
    visitor.enter(path)?;
    if path.is_present() {
        let kind = path.node().kind();
        enter_typed(visitor, kind, path)?;
    }
    Ok(())
}

fn run_exit<V: Visitor + ?Sized>(visitor: &mut V, path: &mut Path<'_>) -> Result<(), RegexError> {
    let kind = path.node().kind();
    exit_typed(visitor, kind, path)?;
    if path.is_present() {
        visitor.exit(path)?;
    }
    Ok(())
}

/// Walk the whole AST, starting at the pattern.
pub fn traverse<V: Visitor + ?Sized>(ast: &mut OnigurumaAst, visitor: &mut V) -> Result<(), RegexError> {
    let snapshot = visitor.wants_root().then(|| ast.clone());
    let cx = Context { flags: &ast.flags, root: snapshot.as_ref() };
    let mut root = Node::Pattern(std::mem::take(&mut ast.pattern));
    let mut ancestors = Vec::new();
    let result = visit_field(&mut root, Key::Root, &mut ancestors, &cx, visitor);
    match root {
        Node::Pattern(pattern) => ast.pattern = pattern,
        other => {
            return Err(RegexError::bug(format!(
                "root pattern was replaced by {:?}",
                other.kind()
            )))
        }
    }
    result
}

fn visit_field<V: Visitor + ?Sized>(
    node: &mut Node,
    key: Key,
    ancestors: &mut Vec<Parent>,
    cx: &Context<'_>,
    visitor: &mut V,
) -> Result<(), RegexError> {
    let action = {
        let mut path = Path { slot: Slot::Field(&mut *node), key, ancestors, cx, action: Action::Continue };
        run_enter(visitor, &mut path)?;
        path.action
    };
    if matches!(action, Action::Continue) {
        visit_children(node, ancestors, cx, visitor)?;
    }
    let mut path = Path { slot: Slot::Field(node), key, ancestors, cx, action: Action::Continue };
    run_exit(visitor, &mut path)
}

/// Visit `container[index]`; returns the index to continue from.
fn visit_item<V: Visitor + ?Sized>(
    container: &mut Vec<Node>,
    index: usize,
    ancestors: &mut Vec<Parent>,
    cx: &Context<'_>,
    visitor: &mut V,
) -> Result<usize, RegexError> {
    let (action, index) = {
        let mut path = Path {
            slot: Slot::Item { container: &mut *container, index },
            key: Key::Index(index),
            ancestors,
            cx,
            action: Action::Continue,
        };
        run_enter(visitor, &mut path)?;
        let index = path.index();
        (path.action, index)
    };
    match action {
        Action::Remove => {
            container.remove(index);
            Ok(index)
        }
        Action::Replace { nodes, traverse } => {
            let count = nodes.len();
            let tail = container.len() - index - 1;
            container.splice(index..=index, nodes);
            if !traverse {
                return Ok(index + count);
            }
            let mut i = index;
            while i < container.len().saturating_sub(tail) {
                i = visit_item(container, i, ancestors, cx, visitor)?;
            }
            Ok(i)
        }
        Action::Continue | Action::Skip => {
            if matches!(action, Action::Continue) {
                visit_children(&mut container[index], ancestors, cx, visitor)?;
            }
            let (action, index) = {
                let mut path = Path {
                    slot: Slot::Item { container: &mut *container, index },
                    key: Key::Index(index),
                    ancestors,
                    cx,
                    action: Action::Continue,
                };
                run_exit(visitor, &mut path)?;
                let index = path.index();
                (path.action, index)
            };
            Ok(match action {
                Action::Remove => {
                    container.remove(index);
                    index
                }
                Action::Replace { nodes, .. } => {
                    let count = nodes.len();
                    container.splice(index..=index, nodes);
                    index + count
                }
                Action::Continue | Action::Skip => index + 1,
            })
        }
    }
}

fn visit_container<V: Visitor + ?Sized>(
    container: &mut Vec<Node>,
    ancestors: &mut Vec<Parent>,
    cx: &Context<'_>,
    visitor: &mut V,
) -> Result<(), RegexError> {
    let mut i = 0;
    while i < container.len() {
        i = visit_item(container, i, ancestors, cx, visitor)?;
    }
    Ok(())
}

fn visit_children<V: Visitor + ?Sized>(
    node: &mut Node,
    ancestors: &mut Vec<Parent>,
    cx: &Context<'_>,
    visitor: &mut V,
) -> Result<(), RegexError> {
    let Some(parent) = Parent::of(node) else {
        return Ok(());
    };
    ancestors.push(parent);
    let result = match node {
        Node::Pattern(n) => visit_container(&mut n.body, ancestors, cx, visitor),
        Node::Group(n) => visit_container(&mut n.body, ancestors, cx, visitor),
        Node::CapturingGroup(n) => visit_container(&mut n.body, ancestors, cx, visitor),
        Node::LookaroundAssertion(n) => visit_container(&mut n.body, ancestors, cx, visitor),
        Node::AbsentFunction(n) => visit_container(&mut n.body, ancestors, cx, visitor),
        Node::Alternative(n) => visit_container(&mut n.body, ancestors, cx, visitor),
        Node::CharacterClass(n) => visit_container(&mut n.body, ancestors, cx, visitor),
        Node::Quantifier(q) => visit_field(&mut q.body, Key::Field("body"), ancestors, cx, visitor),
        Node::CharacterClassRange(range) => {
            let mut result = Ok(());
            for (key, bound) in [("min", &mut range.min), ("max", &mut range.max)] {
                let mut wrapped = Node::Character(*bound);
                result = visit_field(&mut wrapped, Key::Field(key), ancestors, cx, visitor);
                if result.is_err() {
                    break;
                }
                match wrapped.as_character() {
                    Some(c) => *bound = c,
                    None => {
                        result = Err(RegexError::bug("range bound must remain a character"));
                        break;
                    }
                }
            }
            result
        }
        _ => Ok(()),
    };
    ancestors.pop();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Alternative, Pattern};

    fn ast_of(chars: &str) -> OnigurumaAst {
        let body = chars.chars().map(Node::character).collect();
        OnigurumaAst { pattern: Pattern::new(vec![Alternative::new(body)]), flags: Flags::default() }
    }

    fn text(ast: &OnigurumaAst) -> String {
        ast.pattern.body[0]
            .elements()
            .unwrap()
            .iter()
            .filter_map(|n| n.as_character().and_then(|c| char::from_u32(c.value)))
            .collect()
    }

    /// Records visited characters and applies `edit` to them.
    struct Editor<F: FnMut(char, &mut Path<'_>) -> Result<(), RegexError>> {
        seen: String,
        edit: F,
    }

    impl<F: FnMut(char, &mut Path<'_>) -> Result<(), RegexError>> Visitor for Editor<F> {
        fn enter(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
            if let Some(c) = path.node().as_character().and_then(|c| char::from_u32(c.value)) {
                self.seen.push(c);
                (self.edit)(c, path)?;
            }
            Ok(())
        }
    }

    fn run<F>(chars: &str, edit: F) -> (String, String)
    where
        F: FnMut(char, &mut Path<'_>) -> Result<(), RegexError>,
    {
        let mut ast = ast_of(chars);
        let mut editor = Editor { seen: String::new(), edit };
        traverse(&mut ast, &mut editor).unwrap();
        (editor.seen, text(&ast))
    }

    #[test]
    fn removes_two_siblings_in_one_pass() {
        let (seen, out) = run("abcde", |c, p| if c == 'b' || c == 'd' { p.remove() } else { Ok(()) });
        assert_eq!(seen, "abcde");
        assert_eq!(out, "ace");
    }

    #[test]
    fn replace_with_zero_one_and_many() {
        let (seen, out) = run("abc", |c, p| match c {
            'a' => p.replace_with_multiple(vec![], false),
            'b' => p.replace_with(Node::character('B'), false),
            'c' => p.replace_with_multiple(vec![Node::character('x'), Node::character('y')], false),
            _ => Ok(()),
        });
        assert_eq!(seen, "abc");
        assert_eq!(out, "Bxy");
    }

    #[test]
    fn replacement_is_walked_when_requested() {
        let (seen, out) = run("abz", |c, p| match c {
            'a' => p.replace_with_multiple(vec![Node::character('x'), Node::character('y')], true),
            'y' => p.remove(),
            _ => Ok(()),
        });
        assert_eq!(seen, "axybz");
        assert_eq!(out, "xbz");
    }

    #[test]
    fn bulk_sibling_removal() {
        let mut removed = Vec::new();
        let (seen, out) = run("abcde", |c, p| {
            if c == 'c' {
                removed = p.remove_all_next_siblings()?;
                removed.extend(p.remove_all_prev_siblings()?);
            }
            Ok(())
        });
        assert_eq!(seen, "abc");
        assert_eq!(out, "c");
        assert_eq!(removed.len(), 4);
    }

    #[test]
    fn field_slots_reject_array_edits() {
        struct RootEdit;
        impl Visitor for RootEdit {
            fn enter(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
                if path.key() == Key::Root {
                    assert!(path.container().is_none());
                    return path.remove();
                }
                Ok(())
            }
        }
        let mut ast = ast_of("a");
        assert!(traverse(&mut ast, &mut RootEdit).is_err());
        assert_eq!(text(&ast), "a");
    }

    #[test]
    fn skip_suppresses_descent_but_not_exit() {
        struct Skipper {
            exits: usize,
            chars: usize,
        }
        impl Visitor for Skipper {
            fn enter(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
                match path.node() {
                    Node::Alternative(_) => path.skip(),
                    Node::Character(_) => self.chars += 1,
                    _ => {}
                }
                Ok(())
            }
            fn exit(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
                if matches!(path.node(), Node::Alternative(_)) {
                    self.exits += 1;
                }
                Ok(())
            }
        }
        let mut ast = ast_of("abc");
        let mut v = Skipper { exits: 0, chars: 0 };
        traverse(&mut ast, &mut v).unwrap();
        assert_eq!((v.exits, v.chars), (1, 0));
    }

    #[test]
    fn ancestors_are_reported() {
        struct Depth(Vec<usize>);
        impl Visitor for Depth {
            fn enter(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
                if matches!(path.node(), Node::Character(_)) {
                    assert_eq!(path.parent(), Some(&Parent::Alternative));
                    self.0.push(path.ancestors().len());
                }
                Ok(())
            }
        }
        let mut ast = ast_of("ab");
        let mut v = Depth(Vec::new());
        traverse(&mut ast, &mut v).unwrap();
        assert_eq!(v.0, vec![2, 2]);
    }
}
