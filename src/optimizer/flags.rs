// flags.rs - removeUselessFlags.
//
// Tracks the effective `i`/`m` state per group. Modifiers that match the
// state they apply to are dropped, as is `x` everywhere.

use crate::ast::Node;
use crate::error::RegexError;
use crate::flags::{FlagGroupModifiers, FlagMods, Flags};
use crate::traverser::{Path, Visitor};

#[derive(Default)]
pub(super) struct RemoveUselessFlags {
    stack: Vec<FlagMods>,
}

fn root_mods(flags: &Flags) -> FlagMods {
    let mut mods = FlagMods::empty();
    mods.set(FlagMods::IGNORE_CASE, flags.ignore_case);
    mods.set(FlagMods::DOT_ALL, flags.dot_all);
    mods
}

/// Strip no-op entries; returns the reduced modifiers and the state after them.
fn reduce(mods: FlagGroupModifiers, current: FlagMods) -> (FlagGroupModifiers, FlagMods) {
    let enable = mods.enable - FlagMods::EXTENDED - current;
    let disable = (mods.disable - FlagMods::EXTENDED) & current;
    let reduced = FlagGroupModifiers { enable, disable };
    (reduced, (current | enable) - disable)
}

impl RemoveUselessFlags {
    fn current(&self, path: &Path<'_>) -> FlagMods {
        self.stack.last().copied().unwrap_or_else(|| root_mods(path.flags()))
    }
}

impl Visitor for RemoveUselessFlags {
    fn enter(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        let current = self.current(path);
        match path.node_mut() {
            Node::Group(group) => {
                let mut effective = current;
                if let Some(mods) = group.flags {
                    let (reduced, after) = reduce(mods, current);
                    effective = after;
                    group.flags = (reduced != FlagGroupModifiers::default()).then_some(reduced);
                }
                self.stack.push(effective);
            }
            Node::Directive(directive) => {
                if let Some(mods) = directive.flags {
                    let (reduced, after) = reduce(mods, current);
                    if let Some(top) = self.stack.last_mut() {
                        *top = after;
                    }
                    if reduced == FlagGroupModifiers::default() {
                        path.remove()?;
                    } else {
                        directive.flags = Some(reduced);
                    }
                }
            }
            node if node.is_alternative_container() => self.stack.push(current),
            _ => {}
        }
        Ok(())
    }

    fn exit(&mut self, path: &mut Path<'_>) -> Result<(), RegexError> {
        if path.node().is_alternative_container() {
            self.stack.pop();
        }
        Ok(())
    }
}
