//! Static hoisting transform.
//!
//! Ranks finished subtrees on the constant lattice and moves whatever can
//! never change between renders into the hoist registry: whole plain
//! elements, static props objects, text calls and, when every child of an
//! element went, the child array itself.

use gesso_carton::{Box, CloneIn, PatchFlags, Vec};

use crate::ast::*;
use crate::transform::{is_transition_tag, ParentKind, TransformContext};
use crate::transforms::utils::{props_into_js, set_block, simple_js, string_literal};

/// Hoist static parts of the finished tree.
///
/// A single root element may be hoisted as a whole; the children of a loop
/// body or a branch with exactly one child never are, their vnode carries
/// the key of the fragment.
pub fn hoist_static<'a>(root: &mut RootNode<'a>, ctx: &mut TransformContext<'a>) {
    let before = ctx.hoists.len();
    walk(&mut root.children, ParentKind::Root, None, ctx, false);
    tracing::debug!(hoisted = ctx.hoists.len() - before, "static hoisting finished");
}

fn walk<'a>(
    children: &mut Vec<'a, TemplateChildNode<'a>>,
    parent: ParentKind,
    parent_call: Option<&mut VNodeCall<'a>>,
    ctx: &mut TransformContext<'a>,
    do_not_hoist: bool,
) {
    let original_count = children.len();
    let mut hoisted_count = 0usize;

    for child in children.iter_mut() {
        match child {
            TemplateChildNode::Element(el) if el.tag_type == ElementType::Element => {
                let constant_type = if do_not_hoist {
                    ConstantType::NotConstant
                } else {
                    element_constant_type(el, ctx)
                };
                if constant_type >= ConstantType::CanHoist {
                    if hoist_element(el, ctx) {
                        hoisted_count += 1;
                    }
                    continue;
                }
                if constant_type < ConstantType::CanHoist {
                    hoist_props(el, ctx);
                }
            }
            TemplateChildNode::TextCall(call) => {
                if matches!(call.codegen_node, Some(JsChildNode::Call(_)))
                    && text_call_constant_type(&call.content) >= ConstantType::CanHoist
                {
                    if let Some(codegen) = call.codegen_node.take() {
                        let hoisted = ctx.hoist(codegen);
                        call.codegen_node = Some(JsChildNode::Simple(Box::new_in(hoisted, ctx.allocator)));
                        hoisted_count += 1;
                    }
                }
            }
            _ => {}
        }

        match child {
            TemplateChildNode::Element(el) => {
                let is_component = el.tag_type == ElementType::Component;
                if is_component {
                    ctx.scopes.v_slot += 1;
                }
                let kind = ParentKind::Element {
                    tag_type: el.tag_type,
                    is_transition: is_transition_tag(&el.tag),
                };
                let ElementNode {
                    children, codegen_node, ..
                } = &mut **el;
                let call = match codegen_node {
                    Some(JsChildNode::VNodeCall(call)) => Some(&mut **call),
                    _ => None,
                };
                walk(children, kind, call, ctx, false);
                if is_component {
                    ctx.scopes.v_slot -= 1;
                }
            }
            TemplateChildNode::For(for_node) => {
                let single = for_node.children.len() == 1;
                walk(&mut for_node.children, ParentKind::For, None, ctx, single);
            }
            TemplateChildNode::If(if_node) => {
                for branch in if_node.branches.iter_mut() {
                    let single = branch.children.len() == 1;
                    walk(&mut branch.children, ParentKind::IfBranch, None, ctx, single);
                }
            }
            _ => {}
        }
    }

    if hoisted_count > 0 {
        if let Some(hook) = ctx.transform_hoist {
            hook(children, ctx, parent);
        }
    }

    let plain_parent = matches!(
        parent,
        ParentKind::Element {
            tag_type: ElementType::Element,
            ..
        }
    );
    if hoisted_count > 0 && hoisted_count == original_count && plain_parent {
        if let Some(call) = parent_call {
            if matches!(call.children, Some(VNodeChildren::Tree(TreeRef::Children))) {
                hoist_child_array(children, call, ctx);
            }
        }
    }
}

/// Replace the element's vnode call with a hoist reference. Children still
/// in the tree move into the hoisted call.
fn hoist_element<'a>(el: &mut ElementNode<'a>, ctx: &mut TransformContext<'a>) -> bool {
    let allocator = ctx.allocator;
    if !matches!(el.codegen_node, Some(JsChildNode::VNodeCall(_))) {
        return false;
    }
    let Some(JsChildNode::VNodeCall(mut call)) = el.codegen_node.take() else {
        return false;
    };
    call.patch_flag = Some(PatchFlags::HOISTED);
    match call.children {
        Some(VNodeChildren::Tree(TreeRef::Children)) => {
            let children = std::mem::replace(&mut el.children, Vec::new_in(allocator));
            call.children = Some(VNodeChildren::Nodes(children));
        }
        Some(VNodeChildren::TreeText) => {
            if let Some(text) = el.children.pop() {
                call.children = Some(VNodeChildren::Text(text));
            }
        }
        _ => {}
    }
    tracing::trace!(tag = %el.tag, "hoisting element");
    let hoisted = ctx.hoist(JsChildNode::VNodeCall(call));
    el.codegen_node = Some(JsChildNode::Simple(Box::new_in(hoisted, allocator)));
    true
}

/// Hoist the props object of an element that stays dynamic, when the props
/// themselves never change.
fn hoist_props<'a>(el: &mut ElementNode<'a>, ctx: &mut TransformContext<'a>) {
    let allocator = ctx.allocator;
    let Some(JsChildNode::VNodeCall(call)) = &mut el.codegen_node else {
        return;
    };

    let flag_allows = match call.patch_flag {
        None => true,
        Some(flag) => flag == PatchFlags::NEED_PATCH || flag == PatchFlags::TEXT,
    };
    if flag_allows
        && matches!(call.props, Some(PropsExpression::Object(_)))
        && generated_props_constant_type(call.props.as_ref()) >= ConstantType::CanHoist
    {
        if let Some(props) = call.props.take() {
            let hoisted = ctx.hoist(props_into_js(props));
            call.props = Some(PropsExpression::Expression(ExpressionNode::Simple(Box::new_in(
                hoisted, allocator,
            ))));
        }
    }

    if let Some(DynamicProps::Names(names)) = &call.dynamic_props {
        let list = names.iter().map(|name| string_literal(name)).collect::<std::vec::Vec<_>>();
        let value = simple_js(
            allocator,
            format!("[{}]", list.join(", ")),
            false,
            ConstantType::CanStringify,
        );
        let hoisted = ctx.hoist(value);
        call.dynamic_props = Some(DynamicProps::Hoisted(Box::new_in(hoisted, allocator)));
    }
}

/// Hoist `[child, ...]` of an element whose children were all hoisted.
fn hoist_child_array<'a>(
    children: &[TemplateChildNode<'a>],
    call: &mut VNodeCall<'a>,
    ctx: &mut TransformContext<'a>,
) {
    let allocator = ctx.allocator;
    let mut elements = Vec::new_in(allocator);
    for child in children {
        match child.codegen_node() {
            Some(JsChildNode::Simple(reference)) => {
                elements.push(JsChildNode::Simple(reference.clone_in(allocator)));
            }
            _ => return,
        }
    }
    let array = ArrayExpression {
        elements,
        loc: SourceLocation::STUB,
    };
    let hoisted = ctx.hoist(JsChildNode::Array(Box::new_in(array, allocator)));
    call.children = Some(VNodeChildren::Hoisted(Box::new_in(hoisted, allocator)));
}

/// Rank of a template child.
///
/// Element ranks are cached per node. A static `<svg>`, `<foreignObject>`
/// or `<math>` block without runtime directives is turned back into a plain
/// vnode, there is nothing inside it to track.
pub fn get_constant_type<'a>(node: &mut TemplateChildNode<'a>, ctx: &mut TransformContext<'a>) -> ConstantType {
    match node {
        TemplateChildNode::Element(el) => element_constant_type(el, ctx),
        TemplateChildNode::If(_) | TemplateChildNode::For(_) => ConstantType::NotConstant,
        other => text_constant_type(other),
    }
}

fn element_constant_type<'a>(el: &mut ElementNode<'a>, ctx: &mut TransformContext<'a>) -> ConstantType {
    if el.tag_type != ElementType::Element {
        return ConstantType::NotConstant;
    }
    let Some(JsChildNode::VNodeCall(call)) = &el.codegen_node else {
        return ConstantType::NotConstant;
    };
    let id = NodeId::of(&*el);
    if let Some(&cached) = ctx.constant_cache.get(&id) {
        return cached;
    }

    let is_foreign = matches!(el.tag.as_str(), "svg" | "foreignObject" | "math");
    if call.is_block && !is_foreign {
        return ConstantType::NotConstant;
    }
    if call.patch_flag.is_some() {
        ctx.constant_cache.insert(id, ConstantType::NotConstant);
        return ConstantType::NotConstant;
    }

    let mut rank = derive_element_rank(el, ctx);
    if rank > ConstantType::NotConstant {
        if let Some(JsChildNode::VNodeCall(call)) = &mut el.codegen_node {
            if call.is_block {
                if el.props.iter().any(|p| matches!(p, PropNode::Directive(_))) {
                    rank = ConstantType::NotConstant;
                } else {
                    set_block(call, false, ctx);
                    tracing::trace!(tag = %el.tag, "static foreign block turned into a vnode");
                }
            }
        }
    }
    ctx.constant_cache.insert(id, rank);
    rank
}

/// Lowest rank among the generated props, the children and the bound
/// values of an element that has no patch flag.
fn derive_element_rank<'a>(el: &mut ElementNode<'a>, ctx: &mut TransformContext<'a>) -> ConstantType {
    // Keys injected by the compiler and cached handlers only show up in the
    // generated props.
    let props_rank = match &el.codegen_node {
        Some(JsChildNode::VNodeCall(call)) => generated_props_constant_type(call.props.as_ref()),
        _ => return ConstantType::NotConstant,
    };
    if props_rank == ConstantType::NotConstant {
        return ConstantType::NotConstant;
    }
    let mut rank = props_rank;

    for child in el.children.iter_mut() {
        let child_rank = get_constant_type(child, ctx);
        if child_rank == ConstantType::NotConstant {
            return ConstantType::NotConstant;
        }
        rank = rank.min(child_rank);
    }

    // Without a patch flag the element is at least skip-patch already.
    if rank > ConstantType::CanSkipPatch {
        for prop in el.props.iter() {
            let PropNode::Directive(dir) = prop else {
                continue;
            };
            if dir.name != "bind" {
                continue;
            }
            if let Some(exp) = &dir.exp {
                let exp_rank = expression_constant_type(exp);
                if exp_rank == ConstantType::NotConstant {
                    return ConstantType::NotConstant;
                }
                rank = rank.min(exp_rank);
            }
        }
    }
    rank
}

/// Rank of the props argument of a vnode call.
pub fn generated_props_constant_type(props: Option<&PropsExpression<'_>>) -> ConstantType {
    let mut rank = ConstantType::CanStringify;
    match props {
        None => {}
        Some(PropsExpression::Object(object)) => {
            for property in object.properties.iter() {
                let key_rank = expression_constant_type(&property.key);
                if key_rank == ConstantType::NotConstant {
                    return key_rank;
                }
                rank = rank.min(key_rank);

                let value_rank = match &property.value {
                    JsChildNode::Simple(simple) => simple.const_type,
                    JsChildNode::Compound(compound) => compound_constant_type(compound),
                    JsChildNode::Call(call) => helper_call_constant_type(call),
                    _ => ConstantType::NotConstant,
                };
                if value_rank == ConstantType::NotConstant {
                    return value_rank;
                }
                rank = rank.min(value_rank);
            }
        }
        Some(PropsExpression::Call(call)) => rank = rank.min(helper_call_constant_type(call)),
        Some(PropsExpression::Expression(exp)) => rank = rank.min(expression_constant_type(exp)),
    }
    rank
}

/// Normalization helpers wrapped around a constant stay constant.
fn helper_call_constant_type(call: &CallExpression<'_>) -> ConstantType {
    let allowed = matches!(
        call.callee,
        Callee::Symbol(
            RuntimeHelper::NormalizeClass
                | RuntimeHelper::NormalizeStyle
                | RuntimeHelper::NormalizeProps
                | RuntimeHelper::GuardReactiveProps
        )
    );
    if !allowed {
        return ConstantType::NotConstant;
    }
    match call.arguments.first() {
        Some(CallArgument::Js(JsChildNode::Simple(simple))) => simple.const_type,
        Some(CallArgument::Js(JsChildNode::Compound(compound))) => compound_constant_type(compound),
        Some(CallArgument::Js(JsChildNode::Call(inner))) => helper_call_constant_type(inner),
        _ => ConstantType::NotConstant,
    }
}

pub fn expression_constant_type(exp: &ExpressionNode<'_>) -> ConstantType {
    match exp {
        ExpressionNode::Simple(simple) => simple.const_type,
        ExpressionNode::Compound(compound) => compound_constant_type(compound),
    }
}

/// Lowest rank among the non-literal parts of a compound expression.
pub fn compound_constant_type(compound: &CompoundExpressionNode<'_>) -> ConstantType {
    let mut rank = ConstantType::CanStringify;
    for child in compound.children.iter() {
        let child_rank = match child {
            CompoundExpressionChild::String(_) | CompoundExpressionChild::Symbol(_) => continue,
            CompoundExpressionChild::Text(_) => ConstantType::CanStringify,
            CompoundExpressionChild::Simple(simple) => simple.const_type,
            CompoundExpressionChild::Compound(inner) => compound_constant_type(inner),
            CompoundExpressionChild::Interpolation(node) => expression_constant_type(&node.content),
        };
        if child_rank == ConstantType::NotConstant {
            return ConstantType::NotConstant;
        }
        rank = rank.min(child_rank);
    }
    rank
}

fn text_call_constant_type(content: &TextCallContent<'_>) -> ConstantType {
    match content {
        TextCallContent::Text(_) => ConstantType::CanStringify,
        TextCallContent::Interpolation(node) => expression_constant_type(&node.content),
        TextCallContent::Compound(compound) => compound_constant_type(compound),
    }
}

/// Rank of a text-like child. Elements and structural containers are not
/// ranked here and count as not constant.
pub fn text_constant_type(node: &TemplateChildNode<'_>) -> ConstantType {
    match node {
        TemplateChildNode::Text(_) | TemplateChildNode::Comment(_) => ConstantType::CanStringify,
        TemplateChildNode::Interpolation(node) => expression_constant_type(&node.content),
        TemplateChildNode::CompoundExpression(compound) => compound_constant_type(compound),
        TemplateChildNode::TextCall(call) => text_call_constant_type(&call.content),
        TemplateChildNode::Element(_) | TemplateChildNode::If(_) | TemplateChildNode::For(_) => {
            ConstantType::NotConstant
        }
    }
}
