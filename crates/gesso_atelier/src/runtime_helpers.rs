//! Runtime helper bookkeeping.
//!
//! Transforms require helpers while building descriptors and release them
//! when a later decision makes them unnecessary, e.g. a vnode call turned
//! into a block. The root receives whatever is still required, in the
//! declaration order of [`RuntimeHelper`].

use std::collections::BTreeMap;

use crate::RuntimeHelper;

/// Usage counts of runtime helpers, keyed in canonical order.
#[derive(Debug, Default, Clone)]
pub struct RuntimeHelpers {
    uses: BTreeMap<RuntimeHelper, u32>,
}

impl RuntimeHelpers {
    pub fn require(&mut self, helper: RuntimeHelper) {
        *self.uses.entry(helper).or_default() += 1;
    }

    /// Drop one usage. Returns whether the helper is still required.
    pub fn release(&mut self, helper: RuntimeHelper) -> bool {
        let Some(count) = self.uses.get_mut(&helper) else {
            return false;
        };
        *count -= 1;
        if *count > 0 {
            return true;
        }
        self.uses.remove(&helper);
        false
    }

    pub fn contains(&self, helper: RuntimeHelper) -> bool {
        self.uses.contains_key(&helper)
    }

    pub fn uses(&self, helper: RuntimeHelper) -> u32 {
        self.uses.get(&helper).copied().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.uses.is_empty()
    }

    /// Require what a vnode call of this shape is created with. Blocks also
    /// need `openBlock`.
    pub fn require_vnode(&mut self, block: bool, component: bool, ssr: bool) {
        if block {
            self.require(RuntimeHelper::OpenBlock);
        }
        self.require(vnode_factory(block, component, ssr));
    }

    /// Move one vnode call between its plain and block factories.
    pub fn switch_vnode(&mut self, to_block: bool, component: bool, ssr: bool) {
        if to_block {
            self.release(vnode_factory(false, component, ssr));
        } else {
            self.release(RuntimeHelper::OpenBlock);
            self.release(vnode_factory(true, component, ssr));
        }
        self.require_vnode(to_block, component, ssr);
    }

    /// Helpers still required, in canonical order.
    pub fn sorted(&self) -> std::vec::Vec<RuntimeHelper> {
        self.uses.keys().copied().collect()
    }
}

/// Creation helper for a vnode call.
///
/// Components, and everything under SSR, go through the generic factories;
/// plain elements use the element-specialized ones.
pub fn vnode_factory(block: bool, component: bool, ssr: bool) -> RuntimeHelper {
    match (block, component || ssr) {
        (false, false) => RuntimeHelper::CreateElementVNode,
        (false, true) => RuntimeHelper::CreateVNode,
        (true, false) => RuntimeHelper::CreateElementBlock,
        (true, true) => RuntimeHelper::CreateBlock,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_reports_remaining_use() {
        let mut helpers = RuntimeHelpers::default();
        helpers.require(RuntimeHelper::CreateVNode);
        helpers.require(RuntimeHelper::CreateVNode);
        assert_eq!(helpers.uses(RuntimeHelper::CreateVNode), 2);

        assert!(helpers.release(RuntimeHelper::CreateVNode));
        assert!(!helpers.release(RuntimeHelper::CreateVNode));
        assert!(!helpers.contains(RuntimeHelper::CreateVNode));
        assert!(!helpers.release(RuntimeHelper::Fragment));
        assert!(helpers.is_empty());
    }

    #[test]
    fn test_sorted_follows_declaration_order() {
        let mut helpers = RuntimeHelpers::default();
        helpers.require(RuntimeHelper::ToDisplayString);
        helpers.require(RuntimeHelper::OpenBlock);
        helpers.require(RuntimeHelper::Fragment);
        assert_eq!(
            helpers.sorted(),
            vec![
                RuntimeHelper::Fragment,
                RuntimeHelper::OpenBlock,
                RuntimeHelper::ToDisplayString
            ]
        );
    }

    #[test]
    fn test_vnode_factory() {
        assert_eq!(vnode_factory(false, false, false), RuntimeHelper::CreateElementVNode);
        assert_eq!(vnode_factory(false, false, true), RuntimeHelper::CreateVNode);
        assert_eq!(vnode_factory(true, true, false), RuntimeHelper::CreateBlock);
        assert_eq!(vnode_factory(true, false, false), RuntimeHelper::CreateElementBlock);
    }

    #[test]
    fn test_switch_vnode_round_trip() {
        let mut helpers = RuntimeHelpers::default();
        helpers.require_vnode(false, false, false);
        helpers.require_vnode(false, false, false);

        helpers.switch_vnode(true, false, false);
        assert_eq!(
            helpers.sorted(),
            vec![
                RuntimeHelper::OpenBlock,
                RuntimeHelper::CreateElementBlock,
                RuntimeHelper::CreateElementVNode
            ]
        );

        helpers.switch_vnode(false, false, false);
        assert_eq!(helpers.sorted(), vec![RuntimeHelper::CreateElementVNode]);
        assert_eq!(helpers.uses(RuntimeHelper::CreateElementVNode), 2);
    }
}
