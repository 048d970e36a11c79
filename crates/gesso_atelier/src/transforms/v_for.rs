//! v-for directive transform.
//!
//! Replaces the element with an iteration container. The container renders
//! as a fragment block over `renderList(source, (value, key, index) => item)`,
//! where `item` is the child's own block or a keyed fragment when the loop
//! body has several children.

use once_cell::sync::Lazy;
use regex::Regex;

use gesso_carton::{Box, Bump, CloneIn, PatchFlags, Vec};

use crate::ast::*;
use crate::errors::ErrorCode;
use crate::transform::{
    create_structural_directive_transform, exit_fn, vnode_call_helpers, DirectiveMatcher, ExitFn,
    ExpressionMode, NodeTransform, TransformContext, TransformNode,
};
use crate::transforms::utils::{
    arena_vec, call_expression, inject_prop, inject_slot_prop, object_expression, property,
    set_block, simple_expression, sub_loc,
};

static FOR_ALIAS_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?s)^(.*?)\s+(?:in|of)\s+(\S.*)$").ok());

static FOR_ITERATOR_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r",([^,}\]]*)(?:,([^,}\]]*))?$").ok());

/// Node transform for `v-for`.
pub fn transform_for<'a>() -> NodeTransform<'a> {
    create_structural_directive_transform(DirectiveMatcher::Name("for"), process_for)
}

/// Split `(item, key, index) in source` into its parts.
///
/// The parts are returned unprocessed; see [`finalize_for_parse_result`].
pub fn parse_for_expression<'a>(
    allocator: &'a Bump,
    exp: &ExpressionNode<'a>,
) -> Option<ForParseResult<'a>> {
    let content = exp.content();
    let loc = exp.loc();
    let caps = FOR_ALIAS_RE.as_ref()?.captures(content)?;
    let lhs = caps.get(1)?;
    let rhs = caps.get(2)?;

    let alias = |text: &str, from: usize| {
        let start = content
            .get(from..)
            .and_then(|rest| rest.find(text))
            .map_or(from, |i| i + from);
        ExpressionNode::simple(
            allocator,
            SimpleExpressionNode::new(text, false, sub_loc(loc, start, start + text.len())),
        )
    };

    let source = alias(rhs.as_str().trim(), rhs.start());

    let raw_value = lhs.as_str().trim();
    let raw_value = raw_value.strip_prefix('(').unwrap_or(raw_value);
    let raw_value = raw_value.strip_suffix(')').unwrap_or(raw_value);
    let mut value_content = raw_value.trim();
    let value_start = content.find(value_content).unwrap_or(lhs.start());

    let mut key = None;
    let mut index = None;
    if let Some(iter) = FOR_ITERATOR_RE
        .as_ref()
        .and_then(|re| re.captures(value_content))
    {
        if let Some(m) = iter.get(1) {
            let text = m.as_str().trim();
            if !text.is_empty() {
                key = Some(alias(text, value_start + m.start()));
            }
        }
        if let Some(m) = iter.get(2) {
            let text = m.as_str().trim();
            if !text.is_empty() {
                index = Some(alias(text, value_start + m.start()));
            }
        }
        if let Some(whole) = iter.get(0) {
            value_content = value_content[..whole.start()].trim();
        }
    }

    let value = (!value_content.is_empty()).then(|| alias(value_content, value_start));

    Some(ForParseResult {
        source,
        value,
        key,
        index,
        finalized: false,
    })
}

/// Run the loop source and aliases through the expression service once.
pub fn finalize_for_parse_result<'a>(ctx: &mut TransformContext<'a>, result: &mut ForParseResult<'a>) {
    if result.finalized {
        return;
    }
    let placeholder = simple_expression(ctx.allocator, "", false);
    let source = std::mem::replace(&mut result.source, placeholder);
    result.source = ctx.process_expression(source, ExpressionMode::Normal);
    for alias in [&mut result.key, &mut result.index, &mut result.value] {
        if let Some(exp) = alias.take() {
            *alias = Some(ctx.process_expression(exp, ExpressionMode::Params));
        }
    }
    result.finalized = true;
}

/// `(value, key, index)` parameter list, gaps filled with `_`, `__`, ...
pub fn create_for_loop_params<'a>(
    allocator: &'a Bump,
    result: &ForParseResult<'a>,
    memo: bool,
) -> FunctionParams<'a> {
    let mut params: std::vec::Vec<Option<ExpressionNode<'a>>> = vec![
        result.value.clone_in(allocator),
        result.key.clone_in(allocator),
        result.index.clone_in(allocator),
    ];
    if memo {
        params.push(Some(simple_expression(allocator, "_cached", false)));
    }
    while matches!(params.last(), Some(None)) {
        params.pop();
    }
    let list = params.into_iter().enumerate().map(|(i, param)| {
        param.unwrap_or_else(|| simple_expression(allocator, "_".repeat(i + 1), false))
    });
    FunctionParams::List(arena_vec(allocator, list))
}

fn aliases<'r, 'a>(result: &'r ForParseResult<'a>) -> impl Iterator<Item = &'r ExpressionNode<'a>> {
    [&result.value, &result.key, &result.index]
        .into_iter()
        .filter_map(Option::as_ref)
}

/// Key expression of an element: a static `key` attribute or a `:key` binding.
fn key_expression<'a>(ctx: &mut TransformContext<'a>, el: &ElementNode<'a>) -> Option<ExpressionNode<'a>> {
    let allocator = ctx.allocator;
    match el.find_prop("key", false, true)? {
        PropNode::Attribute(attr) => attr
            .value
            .as_ref()
            .map(|v| simple_expression(allocator, v.content.clone(), true)),
        PropNode::Directive(dir) => match &dir.exp {
            Some(exp) => Some(exp.clone_in(allocator)),
            // `:key` shorthand
            None => {
                let exp = simple_expression(allocator, "key", false);
                Some(ctx.process_expression(exp, ExpressionMode::Normal))
            }
        },
    }
}

fn process_for<'a>(
    ctx: &mut TransformContext<'a>,
    node: &mut TransformNode<'_, 'a>,
    dir: Box<'a, DirectiveNode<'a>>,
) -> Option<ExitFn<'a>> {
    let allocator = ctx.allocator;
    let Some(exp) = &dir.exp else {
        ctx.on_error(ErrorCode::VForNoExpression, Some(&dir.loc));
        return None;
    };
    let parsed = match &dir.for_parse_result {
        Some(result) => Some(result.clone_in(allocator)),
        None => parse_for_expression(allocator, exp),
    };
    let Some(mut parse_result) = parsed else {
        ctx.on_error(ErrorCode::VForMalformedExpression, Some(&dir.loc));
        return None;
    };
    finalize_for_parse_result(ctx, &mut parse_result);

    let el = node.element(ctx.cursor)?;
    let is_template = el.is_template();
    let has_key = el.find_prop("key", false, true).is_some();
    let is_stable = matches!(
        &parse_result.source,
        ExpressionNode::Simple(source) if source.const_type > ConstantType::NotConstant
    );
    let fragment_flag = if is_stable {
        PatchFlags::STABLE_FRAGMENT
    } else if has_key {
        PatchFlags::KEYED_FRAGMENT
    } else {
        PatchFlags::UNKEYED_FRAGMENT
    };

    let container = ForNode {
        source: parse_result.source.clone_in(allocator),
        value_alias: parse_result.value.clone_in(allocator),
        key_alias: parse_result.key.clone_in(allocator),
        object_index_alias: parse_result.index.clone_in(allocator),
        parse_result,
        children: Vec::new_in(allocator),
        loc: dir.loc.clone(),
        codegen_node: None,
    };
    let old = ctx
        .replace_node(node, TemplateChildNode::For(Box::new_in(container, allocator)))
        .ok()?;
    let TemplateChildNode::Element(mut el) = old else {
        return None;
    };

    let Some(TemplateChildNode::For(for_node)) = node.current_mut(ctx.cursor) else {
        return None;
    };
    ctx.scopes.v_for += 1;
    for alias in aliases(&for_node.parse_result) {
        ctx.add_identifiers(alias);
    }

    // A <template v-for> is dropped from the tree and never traversed, so
    // its own key and memo are processed here, inside the loop scope.
    let mut template_key = None;
    let mut template_memo = None;
    if is_template {
        template_key = key_expression(ctx, &el)
            .map(|exp| match exp {
                ExpressionNode::Simple(s) if s.is_static => ExpressionNode::Simple(s),
                other => ctx.process_expression(other, ExpressionMode::Normal),
            });
        template_memo = el
            .find_dir("memo", false)
            .and_then(|memo| memo.exp.clone_in(allocator))
            .map(|exp| ctx.process_expression(exp, ExpressionMode::Normal));
        for_node.children = std::mem::replace(&mut el.children, Vec::new_in(allocator));
    } else {
        for_node.children.push(TemplateChildNode::Element(el));
    }

    Some(exit_fn(move |ctx, node| {
        let cursor = ctx.cursor;
        if let Some(TemplateChildNode::For(for_node)) = node.current_mut(cursor) {
            let (key_exp, memo_exp) = if is_template {
                check_template_key_placement(ctx, for_node);
                (template_key, template_memo)
            } else {
                let child = for_node.children.first().and_then(TemplateChildNode::as_element);
                let key = child.and_then(|el| key_expression(ctx, el));
                let memo = child
                    .and_then(|el| el.find_dir("memo", false))
                    .and_then(|memo| memo.exp.clone_in(ctx.allocator));
                (key, memo)
            };
            let codegen = create_for_codegen(
                ctx,
                for_node,
                LoopShape {
                    is_template,
                    is_stable,
                    fragment_flag,
                },
                key_exp,
                memo_exp,
            );
            for_node.codegen_node = Some(codegen);

            for alias in aliases(&for_node.parse_result) {
                ctx.remove_identifiers(alias);
            }
        }
        ctx.scopes.v_for -= 1;
    }))
}

fn check_template_key_placement<'a>(ctx: &mut TransformContext<'a>, for_node: &ForNode<'a>) {
    let misplaced = for_node
        .children
        .iter()
        .filter_map(TemplateChildNode::as_element)
        .find_map(|child| child.find_prop("key", false, false));
    if let Some(key) = misplaced {
        ctx.on_error(ErrorCode::VForTemplateKeyPlacement, Some(key.loc()));
    }
}

#[derive(Clone, Copy)]
struct LoopShape {
    is_template: bool,
    is_stable: bool,
    fragment_flag: PatchFlags,
}

fn create_for_codegen<'a>(
    ctx: &mut TransformContext<'a>,
    for_node: &mut ForNode<'a>,
    shape: LoopShape,
    key_exp: Option<ExpressionNode<'a>>,
    memo_exp: Option<ExpressionNode<'a>>,
) -> JsChildNode<'a> {
    let allocator = ctx.allocator;
    let memo_key = key_exp.as_ref().map(|exp| exp.clone_in(allocator));
    let key_prop = key_exp.map(|exp| property(allocator, "key", JsChildNode::from_expression(exp)));

    let only_child = for_node.children.len() == 1;
    let first = for_node.children.first_mut();
    let child_block = match first {
        Some(TemplateChildNode::Element(el)) if only_child && el.is_slot_outlet() => {
            if shape.is_template {
                if let (Some(prop), Some(JsChildNode::Call(call))) = (key_prop, el.codegen_node.as_mut()) {
                    inject_slot_prop(call, prop, ctx);
                }
            }
            JsChildNode::Tree(TreeRef::OnlyChild)
        }
        Some(TemplateChildNode::Element(el)) if only_child => {
            if let Some(JsChildNode::VNodeCall(call)) = el.codegen_node.as_mut() {
                if shape.is_template {
                    if let Some(prop) = key_prop {
                        inject_prop(call, prop, ctx);
                    }
                }
                set_block(call, !shape.is_stable, ctx);
            }
            JsChildNode::Tree(TreeRef::OnlyChild)
        }
        _ => {
            let call = VNodeCall {
                tag: VNodeTag::Symbol(ctx.helper(RuntimeHelper::Fragment)),
                props: key_prop.map(|prop| {
                    PropsExpression::Object(Box::new_in(object_expression(allocator, [prop]), allocator))
                }),
                children: Some(VNodeChildren::Tree(TreeRef::Children)),
                patch_flag: Some(PatchFlags::STABLE_FRAGMENT),
                dynamic_props: None,
                directives: None,
                is_block: true,
                disable_tracking: false,
                is_component: false,
                loc: SourceLocation::STUB,
            };
            vnode_call_helpers(ctx, &call);
            JsChildNode::VNodeCall(Box::new_in(call, allocator))
        }
    };

    ctx.helper(RuntimeHelper::RenderList);
    let mut render_list = call_expression(
        allocator,
        RuntimeHelper::RenderList,
        [CallArgument::Js(JsChildNode::from_expression(
            for_node.source.clone_in(allocator),
        ))],
    );

    match memo_exp {
        Some(memo) => {
            ctx.helper(RuntimeHelper::IsMemoSame);
            let index = ctx.next_cache_index();
            let iterator = FunctionExpression {
                params: Some(create_for_loop_params(allocator, &for_node.parse_result, true)),
                returns: Some(child_block),
                body: Some(FunctionBody::MemoCheck {
                    memo,
                    key: memo_key,
                }),
                newline: false,
                is_slot: false,
                loc: SourceLocation::STUB,
            };
            render_list.arguments.push(CallArgument::Js(JsChildNode::Function(Box::new_in(
                iterator, allocator,
            ))));
            render_list.arguments.push(CallArgument::String("_cache".into()));
            render_list
                .arguments
                .push(CallArgument::String(index.to_string().into()));
        }
        None => {
            let iterator = FunctionExpression {
                params: Some(create_for_loop_params(allocator, &for_node.parse_result, false)),
                returns: Some(child_block),
                body: None,
                newline: true,
                is_slot: false,
                loc: SourceLocation::STUB,
            };
            render_list.arguments.push(CallArgument::Js(JsChildNode::Function(Box::new_in(
                iterator, allocator,
            ))));
        }
    }

    let call = VNodeCall {
        tag: VNodeTag::Symbol(ctx.helper(RuntimeHelper::Fragment)),
        props: None,
        children: Some(VNodeChildren::RenderList(Box::new_in(render_list, allocator))),
        patch_flag: Some(shape.fragment_flag),
        dynamic_props: None,
        directives: None,
        is_block: true,
        disable_tracking: !shape.is_stable,
        is_component: false,
        loc: for_node.loc.clone(),
    };
    vnode_call_helpers(ctx, &call);
    tracing::trace!(flag = ?shape.fragment_flag, "built loop fragment");
    JsChildNode::VNodeCall(Box::new_in(call, allocator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::transform;
    use crate::TransformOptions;
    use gesso_armature::parse;

    fn compile<'a>(
        allocator: &'a Bump,
        source: &'a str,
        options: TransformOptions,
    ) -> (RootNode<'a>, std::vec::Vec<ErrorCode>) {
        let (mut root, _) = parse(allocator, source);
        let errors = transform(allocator, &mut root, options);
        (root, errors.into_iter().map(|e| e.code).collect())
    }

    fn loop_node<'r, 'a>(root: &'r RootNode<'a>) -> &'r ForNode<'a> {
        match &root.children[0] {
            TemplateChildNode::For(for_node) => for_node,
            TemplateChildNode::Element(el) => match &el.children[0] {
                TemplateChildNode::For(for_node) => for_node,
                _ => panic!("expected for node"),
            },
            _ => panic!("expected for node"),
        }
    }

    fn parse_exp(source: &str) -> (Option<std::string::String>, [Option<std::string::String>; 3]) {
        let allocator = Bump::new();
        let exp = simple_expression(&allocator, source, false);
        let parsed = match parse_for_expression(&allocator, &exp) {
            Some(result) => (
                Some(result.source.content().to_string()),
                [
                    result.value.map(|v| v.content().to_string()),
                    result.key.map(|v| v.content().to_string()),
                    result.index.map(|v| v.content().to_string()),
                ],
            ),
            None => (None, [None, None, None]),
        };
        parsed
    }

    #[test]
    fn test_parse_for_expression() {
        let (source, [value, key, index]) = parse_exp("item in items");
        assert_eq!(source.as_deref(), Some("items"));
        assert_eq!(value.as_deref(), Some("item"));
        assert!(key.is_none() && index.is_none());

        let (source, [value, key, index]) = parse_exp("(value, key, index) of object");
        assert_eq!(source.as_deref(), Some("object"));
        assert_eq!(value.as_deref(), Some("value"));
        assert_eq!(key.as_deref(), Some("key"));
        assert_eq!(index.as_deref(), Some("index"));

        let (_, [value, key, index]) = parse_exp("({ id, name }, i) in list");
        assert_eq!(value.as_deref(), Some("{ id, name }"));
        assert_eq!(key.as_deref(), Some("i"));
        assert!(index.is_none());

        let (_, [value, key, _]) = parse_exp("(, i) in list");
        assert!(value.is_none());
        assert_eq!(key.as_deref(), Some("i"));

        assert!(parse_exp("items").0.is_none());
    }

    #[test]
    fn test_loop_codegen() {
        let allocator = Bump::new();
        let (root, errors) = compile(
            &allocator,
            r#"<div><span v-for="(item, i) in list">{{ item }}</span></div>"#,
            TransformOptions::default(),
        );
        assert!(errors.is_empty());

        let for_node = loop_node(&root);
        assert_eq!(for_node.source.content(), "list");
        let call = for_node.codegen_node.as_ref().and_then(JsChildNode::as_vnode_call).unwrap();
        assert!(call.is_block);
        assert!(call.disable_tracking);
        assert_eq!(call.patch_flag, Some(PatchFlags::UNKEYED_FRAGMENT));

        let Some(VNodeChildren::RenderList(render_list)) = &call.children else {
            panic!("expected renderList");
        };
        let CallArgument::Js(JsChildNode::Function(iterator)) = &render_list.arguments[1] else {
            panic!("expected iterator function");
        };
        let Some(FunctionParams::List(params)) = &iterator.params else {
            panic!("expected params");
        };
        let names: std::vec::Vec<_> = params.iter().map(|p| p.content().to_string()).collect();
        assert_eq!(names, vec!["item", "i"]);
        assert!(matches!(iterator.returns, Some(JsChildNode::Tree(TreeRef::OnlyChild))));

        let span = for_node.children[0].as_element().unwrap();
        let item = span.codegen_node.as_ref().and_then(JsChildNode::as_vnode_call).unwrap();
        assert!(item.is_block);
        assert!(root.has_helper(RuntimeHelper::RenderList));
        assert!(root.has_helper(RuntimeHelper::Fragment));
    }

    #[test]
    fn test_keyed_and_stable_flags() {
        let allocator = Bump::new();
        let (root, _) = compile(
            &allocator,
            r#"<div><p v-for="x in xs" :key="x.id"></p></div>"#,
            TransformOptions::default(),
        );
        let call = loop_node(&root).codegen_node.as_ref().and_then(JsChildNode::as_vnode_call).unwrap();
        assert_eq!(call.patch_flag, Some(PatchFlags::KEYED_FRAGMENT));

        let allocator = Bump::new();
        let (root, _) = compile(
            &allocator,
            r#"<div><p v-for="n in 10">{{ n }}</p></div>"#,
            TransformOptions::default(),
        );
        let for_node = loop_node(&root);
        let call = for_node.codegen_node.as_ref().and_then(JsChildNode::as_vnode_call).unwrap();
        assert_eq!(call.patch_flag, Some(PatchFlags::STABLE_FRAGMENT));
        assert!(!call.disable_tracking);
        // items of a stable loop are plain vnodes
        let p = for_node.children[0].as_element().unwrap();
        let item = p.codegen_node.as_ref().and_then(JsChildNode::as_vnode_call).unwrap();
        assert!(!item.is_block);
    }

    #[test]
    fn test_template_loop_fragment() {
        let allocator = Bump::new();
        let (root, errors) = compile(
            &allocator,
            r#"<div><template v-for="x in xs" :key="x"><a/><b/></template></div>"#,
            TransformOptions::default(),
        );
        assert!(errors.is_empty());
        let for_node = loop_node(&root);
        assert_eq!(for_node.children.len(), 2);

        let call = for_node.codegen_node.as_ref().and_then(JsChildNode::as_vnode_call).unwrap();
        let Some(VNodeChildren::RenderList(render_list)) = &call.children else {
            panic!("expected renderList");
        };
        let CallArgument::Js(JsChildNode::Function(iterator)) = &render_list.arguments[1] else {
            panic!("expected iterator function");
        };
        let Some(JsChildNode::VNodeCall(fragment)) = &iterator.returns else {
            panic!("expected per-item fragment");
        };
        assert_eq!(fragment.patch_flag, Some(PatchFlags::STABLE_FRAGMENT));
        let Some(PropsExpression::Object(props)) = &fragment.props else {
            panic!("expected key props");
        };
        assert!(props.find("key").is_some());
    }

    #[test]
    fn test_template_key_placement() {
        let allocator = Bump::new();
        let (_, errors) = compile(
            &allocator,
            r#"<template v-for="x in xs"><div :key="x"/></template>"#,
            TransformOptions::default(),
        );
        assert_eq!(errors, vec![ErrorCode::VForTemplateKeyPlacement]);
    }

    #[test]
    fn test_errors() {
        let allocator = Bump::new();
        let (root, errors) = compile(&allocator, r#"<div v-for></div>"#, TransformOptions::default());
        assert_eq!(errors, vec![ErrorCode::VForNoExpression]);
        assert!(matches!(root.children[0], TemplateChildNode::Element(_)));

        let allocator = Bump::new();
        let (_, errors) = compile(&allocator, r#"<div v-for="items"></div>"#, TransformOptions::default());
        assert_eq!(errors, vec![ErrorCode::VForMalformedExpression]);
    }

    #[test]
    fn test_aliases_are_scoped() {
        let allocator = Bump::new();
        let options = TransformOptions {
            prefix_identifiers: true,
            ..TransformOptions::default()
        };
        let (root, _) = compile(
            &allocator,
            r#"<div><p v-for="item in items">{{ item + other }}</p></div>"#,
            options,
        );
        let for_node = loop_node(&root);
        assert_eq!(for_node.source.content(), "items");
        let p = for_node.children[0].as_element().unwrap();
        let TemplateChildNode::Interpolation(interp) = &p.children[0] else {
            panic!("expected interpolation");
        };
        let ExpressionNode::Compound(compound) = &interp.content else {
            panic!("expected rewritten expression");
        };
        let parts: std::vec::Vec<_> = compound
            .children
            .iter()
            .filter_map(|c| match c {
                CompoundExpressionChild::Simple(s) => Some(s.content.to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(parts, vec!["item", "_ctx.other"]);
    }

    #[test]
    fn test_memo_loop() {
        let allocator = Bump::new();
        let (root, _) = compile(
            &allocator,
            r#"<div><p v-for="x in xs" :key="x.id" v-memo="[x.sel]">{{ x.name }}</p></div>"#,
            TransformOptions::default(),
        );
        let for_node = loop_node(&root);
        let call = for_node.codegen_node.as_ref().and_then(JsChildNode::as_vnode_call).unwrap();
        let Some(VNodeChildren::RenderList(render_list)) = &call.children else {
            panic!("expected renderList");
        };
        assert_eq!(render_list.arguments.len(), 4);
        let CallArgument::Js(JsChildNode::Function(iterator)) = &render_list.arguments[1] else {
            panic!("expected iterator function");
        };
        assert!(matches!(
            &iterator.body,
            Some(FunctionBody::MemoCheck { key: Some(_), .. })
        ));
        let Some(FunctionParams::List(params)) = &iterator.params else {
            panic!("expected params");
        };
        assert_eq!(params.last().map(|p| p.content()), Some("_cached"));
        assert!(root.has_helper(RuntimeHelper::IsMemoSame));
        assert!(!root.has_helper(RuntimeHelper::WithMemo));
        assert_eq!(root.cached, 1);
    }
}
