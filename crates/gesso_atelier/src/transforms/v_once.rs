//! v-once directive transform.
//!
//! Renders the subtree once: its codegen is wrapped in a cache slot and
//! expressions inside are left as written.

use crate::ast::*;
use crate::transform::{exit_fn, ExitFn, TransformContext, TransformNode};

/// Check if element has v-once directive
pub fn has_v_once(el: &ElementNode<'_>) -> bool {
    el.find_dir("once", true).is_some()
}

/// Transform v-once directive
pub fn transform_once<'a>(
    ctx: &mut TransformContext<'a>,
    node: &mut TransformNode<'_, 'a>,
) -> Option<std::vec::Vec<ExitFn<'a>>> {
    let el = node.element(ctx.cursor)?;
    // Trailing branches leave the sibling list before their exit runs; they
    // are handled when the conditional traverses them.
    if !has_v_once(el) || el.has_dir("else") || el.has_dir("else-if") {
        return None;
    }
    let id = NodeId::of(el);
    if ctx.in_v_once || ctx.options.ssr || !ctx.once_seen.insert(id) {
        return None;
    }

    ctx.in_v_once = true;
    ctx.scopes.v_once += 1;
    ctx.helper(RuntimeHelper::SetBlockTracking);

    Some(vec![exit_fn(|ctx, node| {
        ctx.scopes.v_once -= 1;
        // The node under the cursor may be a conditional or loop container
        // that took the element's place.
        if let Some(slot) = node.current_mut(ctx.cursor).and_then(|n| n.codegen_node_mut()) {
            if let Some(codegen) = slot.take() {
                *slot = Some(ctx.cache(codegen, true));
            }
        }
        ctx.in_v_once = false;
    })])
}
