//! Builders and tree queries shared by the transforms.

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;

use gesso_carton::{is_simple_identifier, Box, Bump, String, Vec};

use crate::ast::*;
use crate::transform::TransformContext;

static MEMBER_EXP_RE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z_$\x{A0}-\x{FFFF}][\w$\x{A0}-\x{FFFF}]*(?:\s*(?:\.\s*[A-Za-z_$\x{A0}-\x{FFFF}][\w$\x{A0}-\x{FFFF}]*|\[(?:[^\[\]]|\[[^\[\]]*\])*\]))*$",
    )
    .ok()
});

static FN_EXP_RE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:async\s*)?(?:\([^)]*?\)|[\w$]+)\s*(?::[^=]+)?=>|^\s*(?:async\s+)?function(?:\s+[\w$]+)?\s*\(",
    )
    .ok()
});

/// `a`, `a.b`, `a[b].c`: something an assignment can target.
pub fn is_member_expression(exp: &str) -> bool {
    MEMBER_EXP_RE
        .as_ref()
        .is_some_and(|re| re.is_match(exp.trim()))
}

/// Arrow function or `function` expression.
pub fn is_fn_expression(exp: &str) -> bool {
    FN_EXP_RE.as_ref().is_some_and(|re| re.is_match(exp))
}

/// JSON string literal for `s`.
pub fn string_literal(s: &str) -> String {
    String::from(serde_json::Value::String(s.into()).to_string())
}

pub fn simple_expression<'a>(
    allocator: &'a Bump,
    content: impl Into<String>,
    is_static: bool,
) -> ExpressionNode<'a> {
    ExpressionNode::simple(
        allocator,
        SimpleExpressionNode::new(content, is_static, SourceLocation::STUB),
    )
}

pub fn simple_js<'a>(
    allocator: &'a Bump,
    content: impl Into<String>,
    is_static: bool,
    const_type: ConstantType,
) -> JsChildNode<'a> {
    JsChildNode::Simple(Box::new_in(
        SimpleExpressionNode::with_const_type(content, is_static, SourceLocation::STUB, const_type),
        allocator,
    ))
}

/// Property with a static key.
pub fn property<'a>(allocator: &'a Bump, key: &str, value: JsChildNode<'a>) -> Property<'a> {
    Property {
        key: simple_expression(allocator, key, true),
        value,
        loc: SourceLocation::STUB,
    }
}

pub fn object_expression<'a>(
    allocator: &'a Bump,
    properties: impl IntoIterator<Item = Property<'a>>,
) -> ObjectExpression<'a> {
    let mut object = ObjectExpression::new(allocator, SourceLocation::STUB);
    object.properties.extend(properties);
    object
}

pub fn call_expression<'a>(
    allocator: &'a Bump,
    helper: RuntimeHelper,
    arguments: impl IntoIterator<Item = CallArgument<'a>>,
) -> CallExpression<'a> {
    let mut call = CallExpression::new(allocator, Callee::Symbol(helper));
    call.arguments.extend(arguments);
    call
}

pub fn js_call<'a>(
    allocator: &'a Bump,
    helper: RuntimeHelper,
    arguments: impl IntoIterator<Item = CallArgument<'a>>,
) -> JsChildNode<'a> {
    JsChildNode::Call(Box::new_in(call_expression(allocator, helper, arguments), allocator))
}

pub fn js_object<'a>(
    allocator: &'a Bump,
    properties: impl IntoIterator<Item = Property<'a>>,
) -> JsChildNode<'a> {
    JsChildNode::Object(Box::new_in(object_expression(allocator, properties), allocator))
}

/// Arena list built from an iterator.
pub fn arena_vec<'a, T>(allocator: &'a Bump, items: impl IntoIterator<Item = T>) -> Vec<'a, T> {
    let mut list = Vec::new_in(allocator);
    list.extend(items);
    list
}

/// Property for a key, either a user `key` prop or a generated index.
pub fn key_property<'a>(
    allocator: &'a Bump,
    user_key: Option<&PropNode<'a>>,
    index: usize,
) -> Property<'a> {
    let value = match user_key {
        Some(PropNode::Attribute(attr)) => simple_js(
            allocator,
            attr.value.as_ref().map(|v| v.content.clone()).unwrap_or_default(),
            true,
            ConstantType::CanStringify,
        ),
        Some(PropNode::Directive(dir)) => match &dir.exp {
            Some(exp) => JsChildNode::from_expression(gesso_carton::CloneIn::clone_in(exp, allocator)),
            None => simple_js(allocator, "undefined", false, ConstantType::NotConstant),
        },
        None => simple_js(allocator, index.to_string(), false, ConstantType::CanHoist),
    };
    property(allocator, "key", value)
}

/// Turn a vnode call into a block, swapping its creation helper.
pub fn convert_to_block<'a>(call: &mut VNodeCall<'a>, ctx: &mut TransformContext<'a>) {
    set_block(call, true, ctx);
}

/// Set the block state of a vnode call, keeping helper usage balanced.
pub fn set_block<'a>(call: &mut VNodeCall<'a>, is_block: bool, ctx: &mut TransformContext<'a>) {
    if call.is_block == is_block {
        return;
    }
    ctx.helpers.switch_vnode(is_block, call.is_component, ctx.options.ssr);
    call.is_block = is_block;
}

/// Add `prop` to the props of a vnode call.
///
/// Existing static keys win. Merged or normalized props get the prop in
/// their first object argument; a bare binding is merged with a new object.
pub fn inject_prop<'a>(call: &mut VNodeCall<'a>, prop: Property<'a>, ctx: &mut TransformContext<'a>) {
    let props = call.props.take().map(props_into_js);
    call.props = Some(props_from_js(with_injected(props, prop, ctx), ctx));
}

/// Add `prop` to the props argument of a `renderSlot` call.
pub fn inject_slot_prop<'a>(
    call: &mut CallExpression<'a>,
    prop: Property<'a>,
    ctx: &mut TransformContext<'a>,
) {
    while call.arguments.len() < 3 {
        call.arguments.push(CallArgument::String(String::const_new("{}")));
    }
    let existing = match std::mem::replace(
        &mut call.arguments[2],
        CallArgument::String(String::const_new("{}")),
    ) {
        CallArgument::Js(js) => Some(js),
        _ => None,
    };
    call.arguments[2] = CallArgument::Js(with_injected(existing, prop, ctx));
}

fn with_injected<'a>(
    props: Option<JsChildNode<'a>>,
    prop: Property<'a>,
    ctx: &mut TransformContext<'a>,
) -> JsChildNode<'a> {
    let allocator = ctx.allocator;
    match props {
        None => js_object(allocator, [prop]),
        Some(JsChildNode::Object(mut object)) => {
            unshift_property(&mut object, prop);
            JsChildNode::Object(object)
        }
        Some(JsChildNode::Call(mut call)) => match call.callee {
            Callee::Symbol(RuntimeHelper::NormalizeProps) => {
                let inner = take_first_js(&mut call);
                // normalizeProps(guardReactiveProps(x)) becomes normalizeProps(mergeProps({prop}, x))
                let inner = match inner {
                    Some(JsChildNode::Call(mut guard))
                        if guard.callee == Callee::Symbol(RuntimeHelper::GuardReactiveProps) =>
                    {
                        ctx.remove_helper(RuntimeHelper::GuardReactiveProps);
                        take_first_js(&mut guard)
                    }
                    other => other,
                };
                let injected = with_injected(inner, prop, ctx);
                call.arguments.insert(0, CallArgument::Js(injected));
                JsChildNode::Call(call)
            }
            Callee::Symbol(RuntimeHelper::ToHandlers) => {
                merge_props(ctx, js_object(allocator, [prop]), JsChildNode::Call(call))
            }
            _ => {
                match call.arguments.first_mut() {
                    Some(CallArgument::Js(JsChildNode::Object(first))) => {
                        unshift_property(first, prop)
                    }
                    _ => call
                        .arguments
                        .insert(0, CallArgument::Js(js_object(allocator, [prop]))),
                }
                JsChildNode::Call(call)
            }
        },
        Some(other) => merge_props(ctx, js_object(allocator, [prop]), other),
    }
}

fn merge_props<'a>(
    ctx: &mut TransformContext<'a>,
    first: JsChildNode<'a>,
    second: JsChildNode<'a>,
) -> JsChildNode<'a> {
    ctx.helper(RuntimeHelper::MergeProps);
    js_call(
        ctx.allocator,
        RuntimeHelper::MergeProps,
        [CallArgument::Js(first), CallArgument::Js(second)],
    )
}

fn take_first_js<'a>(call: &mut CallExpression<'a>) -> Option<JsChildNode<'a>> {
    if call.arguments.is_empty() {
        return None;
    }
    match call.arguments.remove(0) {
        CallArgument::Js(js) => Some(js),
        _ => None,
    }
}

fn unshift_property<'a>(object: &mut ObjectExpression<'a>, prop: Property<'a>) {
    let exists = prop.key.is_static_exp()
        && object
            .properties
            .iter()
            .any(|p| p.key.is_static_exp() && p.key.content() == prop.key.content());
    if !exists {
        object.properties.insert(0, prop);
    }
}

/// Vnode call of a codegen node, looking through a `withMemo` wrapper.
pub fn memoed_vnode_call_mut<'a, 'b>(js: &'b mut JsChildNode<'a>) -> Option<&'b mut VNodeCall<'a>> {
    match js {
        JsChildNode::VNodeCall(call) => Some(&mut **call),
        JsChildNode::Call(call) if call.callee == Callee::Symbol(RuntimeHelper::WithMemo) => {
            match call.arguments.get_mut(1) {
                Some(CallArgument::Js(JsChildNode::Function(func))) => {
                    func.returns.as_mut().and_then(JsChildNode::as_vnode_call_mut)
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// Location of `loc.source[start..end]`, for sources on a single line.
pub fn sub_loc(loc: &SourceLocation, start: usize, end: usize) -> SourceLocation {
    let source = loc.source.get(start..end).unwrap_or_default();
    let shift = |n: usize| Position {
        offset: loc.start.offset + n as u32,
        line: loc.start.line,
        column: loc.start.column + n as u32,
    };
    SourceLocation::new(shift(start), shift(end), source)
}

/// `prefix` + `exp` + `suffix` as one compound expression.
pub fn wrap_expression<'a>(
    allocator: &'a Bump,
    prefix: &str,
    exp: ExpressionNode<'a>,
    suffix: &str,
) -> ExpressionNode<'a> {
    let mut compound = CompoundExpressionNode::new(allocator, exp.loc().clone());
    if !prefix.is_empty() {
        compound
            .children
            .push(CompoundExpressionChild::String(String::from(prefix)));
    }
    compound.children.push(match exp {
        ExpressionNode::Simple(simple) => CompoundExpressionChild::Simple(simple),
        ExpressionNode::Compound(inner) => CompoundExpressionChild::Compound(inner),
    });
    if !suffix.is_empty() {
        compound
            .children
            .push(CompoundExpressionChild::String(String::from(suffix)));
    }
    ExpressionNode::Compound(Box::new_in(compound, allocator))
}

pub(crate) fn props_into_js(props: PropsExpression<'_>) -> JsChildNode<'_> {
    match props {
        PropsExpression::Object(object) => JsChildNode::Object(object),
        PropsExpression::Call(call) => JsChildNode::Call(call),
        PropsExpression::Expression(exp) => JsChildNode::from_expression(exp),
    }
}

pub(crate) fn props_from_js<'a>(js: JsChildNode<'a>, ctx: &mut TransformContext<'a>) -> PropsExpression<'a> {
    match js {
        JsChildNode::Object(object) => PropsExpression::Object(object),
        JsChildNode::Call(call) => PropsExpression::Call(call),
        JsChildNode::Simple(exp) => PropsExpression::Expression(ExpressionNode::Simple(exp)),
        JsChildNode::Compound(exp) => PropsExpression::Expression(ExpressionNode::Compound(exp)),
        other => {
            ctx.helper(RuntimeHelper::MergeProps);
            PropsExpression::Call(Box::new_in(
                call_expression(ctx.allocator, RuntimeHelper::MergeProps, [CallArgument::Js(other)]),
                ctx.allocator,
            ))
        }
    }
}

// ----------------------------------------------------------------------------
// Scope references
// ----------------------------------------------------------------------------

/// Whether any expression under `children` reads a scope-local identifier.
pub fn children_have_scope_ref(
    children: &[TemplateChildNode<'_>],
    ids: &FxHashMap<String, u32>,
) -> bool {
    !ids.is_empty() && children.iter().any(|c| node_has_scope_ref(c, ids))
}

pub fn node_has_scope_ref(node: &TemplateChildNode<'_>, ids: &FxHashMap<String, u32>) -> bool {
    match node {
        TemplateChildNode::Element(el) => element_has_scope_ref(el, ids),
        TemplateChildNode::For(for_node) => {
            exp_has_scope_ref(&for_node.source, ids) || children_have_scope_ref(&for_node.children, ids)
        }
        TemplateChildNode::If(if_node) => if_node.branches.iter().any(|b| {
            b.condition.as_ref().is_some_and(|c| exp_has_scope_ref(c, ids))
                || children_have_scope_ref(&b.children, ids)
        }),
        TemplateChildNode::Interpolation(node) => exp_has_scope_ref(&node.content, ids),
        TemplateChildNode::CompoundExpression(exp) => compound_has_scope_ref(exp, ids),
        TemplateChildNode::TextCall(call) => match &call.content {
            TextCallContent::Interpolation(node) => exp_has_scope_ref(&node.content, ids),
            TextCallContent::Compound(exp) => compound_has_scope_ref(exp, ids),
            TextCallContent::Text(_) => false,
        },
        TemplateChildNode::Text(_) | TemplateChildNode::Comment(_) => false,
    }
}

/// Whether a directive of `el` or anything below it reads a scope-local
/// identifier.
pub fn element_has_scope_ref(el: &ElementNode<'_>, ids: &FxHashMap<String, u32>) -> bool {
    el.props.iter().any(|p| match p {
        PropNode::Directive(dir) => {
            dir.arg.as_ref().is_some_and(|e| exp_has_scope_ref(e, ids))
                || dir.exp.as_ref().is_some_and(|e| exp_has_scope_ref(e, ids))
        }
        PropNode::Attribute(_) => false,
    }) || children_have_scope_ref(&el.children, ids)
}

pub fn exp_has_scope_ref(exp: &ExpressionNode<'_>, ids: &FxHashMap<String, u32>) -> bool {
    match exp {
        ExpressionNode::Simple(simple) => {
            !simple.is_static
                && is_simple_identifier(&simple.content)
                && ids.contains_key(simple.content.as_str())
        }
        ExpressionNode::Compound(compound) => compound_has_scope_ref(compound, ids),
    }
}

fn compound_has_scope_ref(exp: &CompoundExpressionNode<'_>, ids: &FxHashMap<String, u32>) -> bool {
    exp.children.iter().any(|child| match child {
        CompoundExpressionChild::Simple(simple) => {
            !simple.is_static
                && is_simple_identifier(&simple.content)
                && ids.contains_key(simple.content.as_str())
        }
        CompoundExpressionChild::Compound(inner) => compound_has_scope_ref(inner, ids),
        CompoundExpressionChild::Interpolation(node) => exp_has_scope_ref(&node.content, ids),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransformOptions;

    #[test]
    fn test_member_expression() {
        assert!(is_member_expression("foo"));
        assert!(is_member_expression("foo.bar"));
        assert!(is_member_expression("foo[bar].baz"));
        assert!(is_member_expression(" obj.a[b[c]] "));
        assert!(!is_member_expression("foo()"));
        assert!(!is_member_expression("a + b"));
        assert!(!is_member_expression("1"));
    }

    #[test]
    fn test_fn_expression() {
        assert!(is_fn_expression("() => foo()"));
        assert!(is_fn_expression("e => bar(e)"));
        assert!(is_fn_expression("async (a, b) => a"));
        assert!(is_fn_expression("function (e) { go(e) }"));
        assert!(!is_fn_expression("foo($event)"));
        assert!(!is_fn_expression("count++"));
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(string_literal("default"), "\"default\"");
        assert_eq!(string_literal("a\"b"), "\"a\\\"b\"");
    }

    fn vnode<'a>(props: Option<PropsExpression<'a>>) -> VNodeCall<'a> {
        VNodeCall {
            tag: VNodeTag::String(String::const_new("\"div\"")),
            props,
            children: None,
            patch_flag: None,
            dynamic_props: None,
            directives: None,
            is_block: false,
            disable_tracking: false,
            is_component: false,
            loc: SourceLocation::STUB,
        }
    }

    fn key<'a>(allocator: &'a Bump) -> Property<'a> {
        key_property(allocator, None, 0)
    }

    #[test]
    fn test_inject_into_empty_props() {
        let allocator = Bump::new();
        let mut ctx = TransformContext::new(&allocator, TransformOptions::default());
        let mut call = vnode(None);
        inject_prop(&mut call, key(&allocator), &mut ctx);

        let Some(PropsExpression::Object(object)) = &call.props else {
            panic!("expected object props");
        };
        assert_eq!(object.properties.len(), 1);
        assert!(object.find("key").is_some());
    }

    #[test]
    fn test_inject_keeps_existing_key() {
        let allocator = Bump::new();
        let mut ctx = TransformContext::new(&allocator, TransformOptions::default());
        let existing = object_expression(
            &allocator,
            [property(
                &allocator,
                "key",
                simple_js(&allocator, "user", false, ConstantType::NotConstant),
            )],
        );
        let mut call = vnode(
            Some(PropsExpression::Object(Box::new_in(existing, &allocator))),
        );
        inject_prop(&mut call, key(&allocator), &mut ctx);

        let Some(PropsExpression::Object(object)) = &call.props else {
            panic!("expected object props");
        };
        assert_eq!(object.properties.len(), 1);
        assert_eq!(
            object.properties[0].value.as_simple().map(|s| s.content.as_str()),
            Some("user")
        );
    }

    #[test]
    fn test_inject_into_bare_binding() {
        let allocator = Bump::new();
        let mut ctx = TransformContext::new(&allocator, TransformOptions::default());
        let mut call = vnode(
            Some(PropsExpression::Expression(simple_expression(&allocator, "attrs", false))),
        );
        inject_prop(&mut call, key(&allocator), &mut ctx);

        let Some(PropsExpression::Call(merged)) = &call.props else {
            panic!("expected mergeProps call");
        };
        assert_eq!(merged.callee, Callee::Symbol(RuntimeHelper::MergeProps));
        assert_eq!(merged.arguments.len(), 2);
        assert!(ctx.helpers.contains(RuntimeHelper::MergeProps));
    }

    #[test]
    fn test_inject_into_normalized_props() {
        let allocator = Bump::new();
        let mut ctx = TransformContext::new(&allocator, TransformOptions::default());
        ctx.helper(RuntimeHelper::GuardReactiveProps);
        let guard = js_call(
            &allocator,
            RuntimeHelper::GuardReactiveProps,
            [CallArgument::Js(simple_js(&allocator, "attrs", false, ConstantType::NotConstant))],
        );
        let normalized = call_expression(
            &allocator,
            RuntimeHelper::NormalizeProps,
            [CallArgument::Js(guard)],
        );
        let mut call = vnode(
            Some(PropsExpression::Call(Box::new_in(normalized, &allocator))),
        );
        inject_prop(&mut call, key(&allocator), &mut ctx);

        let Some(PropsExpression::Call(outer)) = &call.props else {
            panic!("expected normalizeProps call");
        };
        assert_eq!(outer.callee, Callee::Symbol(RuntimeHelper::NormalizeProps));
        assert!(matches!(
            &outer.arguments[0],
            CallArgument::Js(JsChildNode::Call(inner))
                if inner.callee == Callee::Symbol(RuntimeHelper::MergeProps)
        ));
        assert!(!ctx.helpers.contains(RuntimeHelper::GuardReactiveProps));
    }

    #[test]
    fn test_block_swap() {
        let allocator = Bump::new();
        let mut ctx = TransformContext::new(&allocator, TransformOptions::default());
        let mut call = vnode(None);
        ctx.helpers.require_vnode(false, false, false);

        convert_to_block(&mut call, &mut ctx);
        assert!(call.is_block);
        assert_eq!(
            ctx.helpers.sorted(),
            vec![RuntimeHelper::OpenBlock, RuntimeHelper::CreateElementBlock]
        );

        // Idempotent.
        convert_to_block(&mut call, &mut ctx);
        assert_eq!(ctx.helpers.uses(RuntimeHelper::OpenBlock), 1);

        set_block(&mut call, false, &mut ctx);
        assert_eq!(ctx.helpers.sorted(), vec![RuntimeHelper::CreateElementVNode]);
    }

    #[test]
    fn test_scope_ref() {
        let allocator = Bump::new();
        let mut ids = FxHashMap::default();
        ids.insert(String::from("item"), 1);
        assert!(exp_has_scope_ref(&simple_expression(&allocator, "item", false), &ids));
        assert!(!exp_has_scope_ref(&simple_expression(&allocator, "item", true), &ids));
        assert!(!exp_has_scope_ref(&simple_expression(&allocator, "other", false), &ids));
    }
}
