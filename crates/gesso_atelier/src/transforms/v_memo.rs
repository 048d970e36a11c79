//! v-memo directive transform.
//!
//! Wraps an element's vnode in `withMemo(deps, () => vnode, _cache, n)`.
//! Inside `v-for` the loop memoizes per item instead, see `v_for`.

use gesso_carton::{Box, CloneIn, String};

use crate::ast::*;
use crate::errors::ErrorCode;
use crate::transform::{exit_fn, ExitFn, ParentKind, TransformContext, TransformNode};
use crate::transforms::utils::{call_expression, convert_to_block};

/// Check if element has v-memo directive
pub fn has_v_memo(el: &ElementNode<'_>) -> bool {
    el.has_dir("memo")
}

pub fn transform_memo<'a>(
    ctx: &mut TransformContext<'a>,
    node: &mut TransformNode<'_, 'a>,
) -> Option<std::vec::Vec<ExitFn<'a>>> {
    let cursor = ctx.cursor;
    let el = node.element(cursor)?;
    let dir = el.find_dir("memo", true)?;
    if el.has_dir("for") || cursor.parent == Some(ParentKind::For) {
        return None;
    }
    if !ctx.memo_seen.insert(NodeId::of(el)) {
        return None;
    }
    if dir.exp.as_ref().is_none_or(|exp| exp.content().trim().is_empty()) {
        ctx.on_error(ErrorCode::VMemoNoExpression, Some(&dir.loc));
        return None;
    }

    Some(vec![exit_fn(|ctx, node| {
        let cursor = ctx.cursor;
        let allocator = ctx.allocator;
        let Some(el) = node.element_mut(cursor) else {
            return;
        };
        let Some(memo) = el
            .find_dir("memo", false)
            .and_then(|dir| dir.exp.clone_in(allocator))
        else {
            return;
        };
        let is_component = el.tag_type == ElementType::Component;
        if !matches!(el.codegen_node, Some(JsChildNode::VNodeCall(_))) {
            return;
        }
        let Some(JsChildNode::VNodeCall(mut call)) = el.codegen_node.take() else {
            return;
        };

        if !is_component {
            convert_to_block(&mut call, ctx);
        }
        let factory = FunctionExpression {
            params: None,
            returns: Some(JsChildNode::VNodeCall(call)),
            body: None,
            newline: false,
            is_slot: false,
            loc: SourceLocation::STUB,
        };
        let index = ctx.next_cache_index();
        let helper = ctx.helper(RuntimeHelper::WithMemo);
        let with_memo = call_expression(
            allocator,
            helper,
            [
                CallArgument::Js(JsChildNode::from_expression(memo)),
                CallArgument::Js(JsChildNode::Function(Box::new_in(factory, allocator))),
                CallArgument::String(String::const_new("_cache")),
                CallArgument::String(String::from(index.to_string())),
            ],
        );
        el.codegen_node = Some(JsChildNode::Call(Box::new_in(with_memo, allocator)));
    })])
}
