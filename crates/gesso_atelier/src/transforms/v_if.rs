//! v-if / v-else-if / v-else transform.
//!
//! The `v-if` element is replaced by a conditional container holding one
//! branch per clause. `v-else-if` and `v-else` siblings are moved into the
//! container of the nearest preceding `v-if`, skipping comments and blank
//! text on the way, and traversed there.
//!
//! Every branch gets a key: its position among all branches of the
//! conditional containers in the same child list.

use gesso_carton::{Box, Bump, CloneIn, PatchFlags, Vec};

use crate::ast::*;
use crate::errors::ErrorCode;
use crate::transform::{
    create_structural_directive_transform, exit_fn, traverse_node, vnode_call_helpers, Cursor,
    DirectiveMatcher, ExitFn, ExpressionMode, NodeTransform, ParentKind, TransformContext,
    TransformNode,
};
use crate::transforms::utils::{
    convert_to_block, inject_prop, inject_slot_prop, js_call, key_property, memoed_vnode_call_mut,
    object_expression,
};

/// Node transform for `v-if`, `v-else-if` and `v-else`.
pub fn transform_if<'a>() -> NodeTransform<'a> {
    create_structural_directive_transform(
        DirectiveMatcher::Names(&["if", "else", "else-if"]),
        process_if,
    )
}

fn process_if<'a>(
    ctx: &mut TransformContext<'a>,
    node: &mut TransformNode<'_, 'a>,
    mut dir: Box<'a, DirectiveNode<'a>>,
) -> Option<ExitFn<'a>> {
    if dir.name != "else" {
        let missing = dir
            .exp
            .as_ref()
            .map_or(true, |exp| exp.content().trim().is_empty());
        if missing {
            ctx.on_error(ErrorCode::VIfNoExpression, Some(&dir.loc));
            dir.exp = Some(ExpressionNode::simple(
                ctx.allocator,
                SimpleExpressionNode::new("true", false, dir.loc.clone()),
            ));
        }
        // The directive left the element before expressions were processed.
        if let Some(exp) = dir.exp.take() {
            dir.exp = Some(ctx.process_expression(exp, ExpressionMode::Normal));
        }
    }

    if dir.name == "if" {
        process_root_branch(ctx, node, dir)
    } else {
        process_sibling_branch(ctx, node, dir);
        None
    }
}

/// `v-if`: swap the element for a conditional container.
fn process_root_branch<'a>(
    ctx: &mut TransformContext<'a>,
    node: &mut TransformNode<'_, 'a>,
    dir: Box<'a, DirectiveNode<'a>>,
) -> Option<ExitFn<'a>> {
    let allocator = ctx.allocator;
    let loc = node.element(ctx.cursor)?.loc.clone();
    let key = preceding_branch_count(node, ctx.cursor.child_index);

    let container = IfNode {
        branches: Vec::new_in(allocator),
        loc,
        codegen_node: None,
    };
    let old = ctx
        .replace_node(node, TemplateChildNode::If(Box::new_in(container, allocator)))
        .ok()?;
    let TemplateChildNode::Element(el) = old else {
        return None;
    };
    let branch = create_branch(allocator, el, dir);
    if let Some(TemplateChildNode::If(if_node)) = node.current_mut(ctx.cursor) {
        if_node.branches.push(branch);
    }

    Some(exit_fn(move |ctx, node| {
        let cursor = ctx.cursor;
        if let Some(TemplateChildNode::If(if_node)) = node.current_mut(cursor) {
            let codegen = create_branch_codegen(ctx, if_node, 0, key);
            if_node.codegen_node = Some(codegen);
        }
    }))
}

enum Sibling {
    Comment,
    Blank,
    Conditional,
    Other,
}

fn sibling_kind(node: &TransformNode<'_, '_>, index: usize) -> Sibling {
    let TransformNode::Child(siblings) = node else {
        return Sibling::Other;
    };
    match siblings.get(index) {
        Some(TemplateChildNode::Comment(_)) => Sibling::Comment,
        Some(TemplateChildNode::Text(text)) if text.content.trim().is_empty() => Sibling::Blank,
        Some(TemplateChildNode::If(_)) => Sibling::Conditional,
        _ => Sibling::Other,
    }
}

/// `v-else-if` / `v-else`: move the element into the preceding container.
fn process_sibling_branch<'a>(
    ctx: &mut TransformContext<'a>,
    node: &mut TransformNode<'_, 'a>,
    dir: Box<'a, DirectiveNode<'a>>,
) {
    let allocator = ctx.allocator;
    let Some(el_loc) = node.element(ctx.cursor).map(|el| el.loc.clone()) else {
        return;
    };

    let mut comments = std::vec::Vec::new();
    let mut index = ctx.cursor.child_index;
    let mut target = None;
    while index > 0 {
        index -= 1;
        match sibling_kind(node, index) {
            Sibling::Comment | Sibling::Blank => {
                let Ok(removed) = ctx.remove_child_at(node, index) else {
                    break;
                };
                if matches!(removed, TemplateChildNode::Comment(_)) {
                    comments.insert(0, removed);
                }
            }
            Sibling::Conditional => {
                target = Some(index);
                break;
            }
            Sibling::Other => break,
        }
    }

    let Some(target) = target else {
        // The element stays in place as a plain element.
        ctx.on_error(ErrorCode::VElseNoAdjacentIf, Some(&el_loc));
        return;
    };

    let in_transition = matches!(
        ctx.cursor.parent,
        Some(ParentKind::Element {
            is_transition: true,
            ..
        })
    );
    let Ok(TemplateChildNode::Element(el)) = ctx.remove_node(node) else {
        return;
    };
    let mut branch = create_branch(allocator, el, dir);
    if ctx.options.dev && !in_transition {
        for (i, comment) in comments.into_iter().enumerate() {
            branch.children.insert(i, comment);
        }
    }

    let key_base = preceding_branch_count(node, target);
    let TransformNode::Child(siblings) = node else {
        return;
    };
    let Some(TemplateChildNode::If(if_node)) = siblings.get_mut(target) else {
        return;
    };

    if if_node
        .branches
        .last()
        .is_some_and(|last| last.condition.is_none())
    {
        ctx.on_error(ErrorCode::VElseNoAdjacentIf, Some(&el_loc));
    }
    if let Some(key) = &branch.user_key {
        let duplicate = if_node
            .branches
            .iter()
            .filter_map(|b| b.user_key.as_ref())
            .any(|existing| is_same_key(existing, key));
        if duplicate {
            ctx.on_error(ErrorCode::VIfSameKey, Some(key.loc()));
        }
    }

    if_node.branches.push(branch);
    let branch_index = if_node.branches.len() - 1;
    tracing::trace!(branch = branch_index, "attached conditional branch");

    // Removed from the sibling list, so the branch is traversed here.
    let saved = ctx.cursor;
    ctx.cursor = Cursor::DETACHED;
    traverse_node(ctx, &mut TransformNode::Branch(&mut if_node.branches[branch_index]));
    ctx.cursor = saved;

    let alternate = create_branch_codegen(ctx, if_node, branch_index, key_base + branch_index);
    attach_alternate(if_node, alternate);
}

/// Number of branches held by conditional containers before `index`.
fn preceding_branch_count(node: &TransformNode<'_, '_>, index: usize) -> usize {
    match node {
        TransformNode::Child(siblings) => siblings
            .iter()
            .take(index)
            .filter_map(|child| match child {
                TemplateChildNode::If(if_node) => Some(if_node.branches.len()),
                _ => None,
            })
            .sum(),
        _ => 0,
    }
}

fn create_branch<'a>(
    allocator: &'a Bump,
    mut el: Box<'a, ElementNode<'a>>,
    mut dir: Box<'a, DirectiveNode<'a>>,
) -> IfBranchNode<'a> {
    let is_template_if = el.is_template();
    let user_key = el
        .find_prop("key", false, false)
        .map(|key| key.clone_in(allocator));
    let loc = el.loc.clone();
    let children = if is_template_if && !el.has_dir("for") {
        std::mem::replace(&mut el.children, Vec::new_in(allocator))
    } else {
        let mut children = Vec::new_in(allocator);
        children.push(TemplateChildNode::Element(el));
        children
    };

    IfBranchNode {
        condition: if dir.name == "else" { None } else { dir.exp.take() },
        children,
        user_key,
        is_template_if,
        loc,
    }
}

fn is_same_key(a: &PropNode<'_>, b: &PropNode<'_>) -> bool {
    match (a, b) {
        (PropNode::Attribute(a), PropNode::Attribute(b)) => {
            a.value.as_ref().map(|v| v.content.as_str()) == b.value.as_ref().map(|v| v.content.as_str())
        }
        (PropNode::Directive(a), PropNode::Directive(b)) => match (&a.exp, &b.exp) {
            (Some(ExpressionNode::Simple(x)), Some(ExpressionNode::Simple(y))) => {
                x.is_static == y.is_static && x.content == y.content
            }
            _ => false,
        },
        _ => false,
    }
}

fn create_branch_codegen<'a>(
    ctx: &mut TransformContext<'a>,
    if_node: &mut IfNode<'a>,
    index: usize,
    key: usize,
) -> JsChildNode<'a> {
    let allocator = ctx.allocator;
    let branch = &mut if_node.branches[index];
    let consequent = create_children_codegen(ctx, branch, index, key);

    let Some(condition) = &branch.condition else {
        return consequent;
    };
    // The comment call closes the current block when the branch is inactive.
    let placeholder = if ctx.options.dev { "\"v-if\"" } else { "\"\"" };
    ctx.helper(RuntimeHelper::CreateComment);
    let alternate = js_call(
        allocator,
        RuntimeHelper::CreateComment,
        [
            CallArgument::String(placeholder.into()),
            CallArgument::String("true".into()),
        ],
    );
    JsChildNode::Conditional(Box::new_in(
        ConditionalExpression {
            test: condition.clone_in(allocator),
            consequent,
            alternate,
            newline: true,
            loc: SourceLocation::STUB,
        },
        allocator,
    ))
}

fn create_children_codegen<'a>(
    ctx: &mut TransformContext<'a>,
    branch: &mut IfBranchNode<'a>,
    index: usize,
    key: usize,
) -> JsChildNode<'a> {
    let allocator = ctx.allocator;
    let key_prop = key_property(allocator, None, key);
    let single = branch.children.len() == 1;

    if single && matches!(branch.children[0], TemplateChildNode::Element(_)) {
        if let Some(codegen) = branch.children[0].codegen_node_mut().and_then(Option::as_mut) {
            match codegen {
                JsChildNode::Call(call) if call.callee == Callee::Symbol(RuntimeHelper::RenderSlot) => {
                    inject_slot_prop(call, key_prop, ctx);
                }
                other => {
                    if let Some(call) = memoed_vnode_call_mut(other) {
                        convert_to_block(call, ctx);
                        inject_prop(call, key_prop, ctx);
                    }
                }
            }
        }
        return JsChildNode::Tree(TreeRef::BranchChild(index));
    }

    if single && matches!(branch.children[0], TemplateChildNode::For(_)) {
        // A loop is already a fragment block; it takes the key directly.
        if let Some(call) = branch.children[0]
            .codegen_node_mut()
            .and_then(Option::as_mut)
            .and_then(JsChildNode::as_vnode_call_mut)
        {
            inject_prop(call, key_prop, ctx);
        }
        return JsChildNode::Tree(TreeRef::BranchChild(index));
    }

    let mut patch_flag = PatchFlags::STABLE_FRAGMENT;
    let real_children = branch
        .children
        .iter()
        .filter(|c| !matches!(c, TemplateChildNode::Comment(_)))
        .count();
    if ctx.options.dev && !branch.is_template_if && real_children == 1 {
        patch_flag |= PatchFlags::DEV_ROOT_FRAGMENT;
    }

    let call = VNodeCall {
        tag: VNodeTag::Symbol(ctx.helper(RuntimeHelper::Fragment)),
        props: Some(PropsExpression::Object(Box::new_in(
            object_expression(allocator, [key_prop]),
            allocator,
        ))),
        children: Some(VNodeChildren::Tree(TreeRef::BranchChildren(index))),
        patch_flag: Some(patch_flag),
        dynamic_props: None,
        directives: None,
        is_block: true,
        disable_tracking: false,
        is_component: false,
        loc: branch.loc.clone(),
    };
    vnode_call_helpers(ctx, &call);
    JsChildNode::VNodeCall(Box::new_in(call, allocator))
}

/// Hang `alternate` off the innermost conditional of the chain.
fn attach_alternate<'a>(if_node: &mut IfNode<'a>, alternate: JsChildNode<'a>) {
    let Some(mut js) = if_node.codegen_node.as_mut() else {
        return;
    };
    loop {
        match js {
            JsChildNode::Cache(cache) => js = &mut cache.value,
            JsChildNode::Conditional(cond) => {
                if matches!(cond.alternate, JsChildNode::Conditional(_)) {
                    js = &mut cond.alternate;
                } else {
                    cond.alternate = alternate;
                    return;
                }
            }
            _ => return,
        }
    }
}
