//! v-slot handling.
//!
//! Tracks slot-scope identifiers while the slot contents are traversed and
//! builds the slots object a component vnode receives as its children.

use gesso_carton::{Box, CloneIn, SlotFlags, String};

use crate::ast::*;
use crate::errors::ErrorCode;
use crate::transform::{exit_fn, ExitFn, ParentKind, TransformContext, TransformNode};
use crate::transforms::utils::{
    arena_vec, call_expression, element_has_scope_ref, js_object, property, simple_expression,
    simple_js,
};
use crate::transforms::v_for::{create_for_loop_params, finalize_for_parse_result, parse_for_expression};

/// Declare the slot props of `<Comp v-slot="props">` and
/// `<template v-slot:name="props">` for the duration of their children.
pub fn track_slot_scopes<'a>(
    ctx: &mut TransformContext<'a>,
    node: &mut TransformNode<'_, 'a>,
) -> Option<std::vec::Vec<ExitFn<'a>>> {
    let cursor = ctx.cursor;
    let el = node.element(cursor)?;
    if !matches!(el.tag_type, ElementType::Component | ElementType::Template) {
        return None;
    }
    let dir = el.find_dir("slot", true)?;

    if el.is_template()
        && !matches!(
            cursor.parent,
            Some(ParentKind::Element {
                tag_type: ElementType::Component,
                ..
            })
        )
    {
        ctx.on_error(ErrorCode::VSlotMisplaced, Some(&dir.loc));
    }

    let slot_props = dir.exp.clone_in(ctx.allocator);
    if let Some(props) = &slot_props {
        ctx.add_identifiers(props);
    }
    ctx.scopes.v_slot += 1;

    Some(vec![exit_fn(move |ctx, _| {
        if let Some(props) = &slot_props {
            ctx.remove_identifiers(props);
        }
        ctx.scopes.v_slot -= 1;
    })])
}

/// Declare the loop aliases of `<template v-slot v-for>`, which the loop
/// transform leaves to the slot builder.
pub fn track_v_for_slot_scopes<'a>(
    ctx: &mut TransformContext<'a>,
    node: &mut TransformNode<'_, 'a>,
) -> Option<std::vec::Vec<ExitFn<'a>>> {
    let cursor = ctx.cursor;
    let allocator = ctx.allocator;
    let el = node.element(cursor)?;
    if !el.is_template_with_slot() {
        return None;
    }
    let dir = el.find_dir("for", false)?;
    let parsed = match (&dir.for_parse_result, &dir.exp) {
        (Some(result), _) => Some(result.clone_in(allocator)),
        (None, Some(exp)) => parse_for_expression(allocator, exp),
        (None, None) => None,
    };
    let mut result = parsed?;
    finalize_for_parse_result(ctx, &mut result);

    let aliases: std::vec::Vec<ExpressionNode<'a>> = [&result.value, &result.key, &result.index]
        .into_iter()
        .filter_map(|alias| alias.clone_in(allocator))
        .collect();
    aliases.iter().for_each(|alias| ctx.add_identifiers(alias));

    if let Some(PropNode::Directive(dir)) = node
        .element_mut(cursor)
        .and_then(|el| el.props.iter_mut().find(|p| matches!(p, PropNode::Directive(d) if d.name == "for")))
    {
        dir.for_parse_result = Some(result);
    }

    Some(vec![exit_fn(move |ctx, _| {
        aliases.iter().for_each(|alias| ctx.remove_identifiers(alias));
    })])
}

/// Slots object of a component and whether it can change shape between
/// renders.
#[derive(Debug)]
pub struct SlotsBuildResult<'a> {
    pub slots: JsChildNode<'a>,
    pub has_dynamic_slots: bool,
}

/// Build the slots passed to a component.
///
/// Static slots become properties of the object, conditional and looped
/// `<template v-slot>` wrappers are collected into the array handed to
/// `createSlots` next to it.
pub fn build_slots<'a>(ctx: &mut TransformContext<'a>, el: &ElementNode<'a>) -> SlotsBuildResult<'a> {
    let allocator = ctx.allocator;
    ctx.helper(RuntimeHelper::WithCtx);

    let mut properties: std::vec::Vec<Property<'a>> = std::vec::Vec::new();
    let mut dynamic_slots: std::vec::Vec<JsChildNode<'a>> = std::vec::Vec::new();

    let mut has_dynamic_slots = if ctx.options.prefix_identifiers && !ctx.options.ssr {
        element_has_scope_ref(el, &ctx.identifiers)
    } else {
        ctx.scopes.v_slot > 0 || ctx.scopes.v_for > 0
    };

    // <Comp v-slot="{ prop }">
    let on_component_slot = el.find_dir("slot", true);
    if let Some(dir) = on_component_slot {
        if dir.arg.as_ref().is_some_and(|arg| !arg.is_static_exp()) {
            has_dynamic_slots = true;
        }
        let name = match &dir.arg {
            Some(arg) => arg.clone_in(allocator),
            None => simple_expression(allocator, "default", true),
        };
        let function = slot_function(ctx, dir.exp.as_ref(), TreeRef::Children);
        properties.push(Property {
            key: name,
            value: function,
            loc: SourceLocation::STUB,
        });
    }

    let mut has_template_slots = false;
    let mut has_named_default_slot = false;
    let mut implicit_default_children: std::vec::Vec<&TemplateChildNode<'a>> = std::vec::Vec::new();
    let mut seen_slot_names: std::vec::Vec<String> = std::vec::Vec::new();
    let mut conditional_branch_index = 0usize;

    for (i, child) in el.children.iter().enumerate() {
        let slot = child
            .as_element()
            .filter(|c| c.is_template())
            .and_then(|c| c.find_dir("slot", true).map(|dir| (c, dir)));
        let Some((template, slot_dir)) = slot else {
            if !matches!(child, TemplateChildNode::Comment(_)) {
                implicit_default_children.push(child);
            }
            continue;
        };

        if on_component_slot.is_some() {
            ctx.on_error(ErrorCode::VSlotMixedSlotUsage, Some(&slot_dir.loc));
            break;
        }
        has_template_slots = true;

        let slot_name = match &slot_dir.arg {
            Some(arg) => arg.clone_in(allocator),
            None => simple_expression(allocator, "default", true),
        };
        let static_name = if slot_name.is_static_exp() {
            Some(String::from(slot_name.content()))
        } else {
            has_dynamic_slots = true;
            None
        };

        let function = slot_function(ctx, slot_dir.exp.as_ref(), TreeRef::TemplateChildren(i));
        let v_for = template.find_dir("for", false);

        if let Some(v_if) = template.find_dir("if", false) {
            has_dynamic_slots = true;
            let test = condition(ctx, v_if);
            let slot = dynamic_slot(ctx, slot_name, function, Some(conditional_branch_index));
            conditional_branch_index += 1;
            dynamic_slots.push(conditional(ctx, test, slot));
        } else if let Some(v_else) = template
            .find_dir("else-if", true)
            .or_else(|| template.find_dir("else", true))
        {
            let previous = el.children[..i]
                .iter()
                .rev()
                .find(|c| !matches!(c, TemplateChildNode::Comment(_)));
            let follows_if = previous
                .and_then(TemplateChildNode::as_element)
                .is_some_and(|p| p.is_template() && (p.has_dir("if") || p.has_dir("else-if")));
            let chain = dynamic_slots
                .last_mut()
                .filter(|_| follows_if)
                .and_then(|last| deepest_alternate(last));
            let Some(alternate) = chain else {
                ctx.on_error(ErrorCode::VElseNoAdjacentIf, Some(&v_else.loc));
                continue;
            };
            let slot = dynamic_slot(ctx, slot_name, function, Some(conditional_branch_index));
            conditional_branch_index += 1;
            *alternate = if v_else.name == "else-if" {
                let test = condition(ctx, v_else);
                conditional(ctx, test, slot)
            } else {
                slot
            };
        } else if let Some(v_for) = v_for {
            has_dynamic_slots = true;
            let parsed = match (&v_for.for_parse_result, &v_for.exp) {
                (Some(result), _) => Some(result.clone_in(allocator)),
                (None, Some(exp)) => parse_for_expression(allocator, exp),
                (None, None) => None,
            };
            let Some(mut result) = parsed else {
                ctx.on_error(ErrorCode::VForMalformedExpression, Some(&v_for.loc));
                continue;
            };
            finalize_for_parse_result(ctx, &mut result);
            let params = create_for_loop_params(allocator, &result, false);
            let item = FunctionExpression {
                params: Some(params),
                returns: Some(dynamic_slot(ctx, slot_name, function, None)),
                body: None,
                newline: true,
                is_slot: false,
                loc: SourceLocation::STUB,
            };
            let helper = ctx.helper(RuntimeHelper::RenderList);
            let call = call_expression(
                allocator,
                helper,
                [
                    CallArgument::Js(JsChildNode::from_expression(result.source)),
                    CallArgument::Js(JsChildNode::Function(Box::new_in(item, allocator))),
                ],
            );
            dynamic_slots.push(JsChildNode::Call(Box::new_in(call, allocator)));
        } else {
            if let Some(name) = static_name {
                if seen_slot_names.contains(&name) {
                    ctx.on_error(ErrorCode::VSlotDuplicateSlotNames, Some(&slot_dir.loc));
                    continue;
                }
                has_named_default_slot |= name == "default";
                seen_slot_names.push(name);
            }
            properties.push(Property {
                key: slot_name,
                value: function,
                loc: SourceLocation::STUB,
            });
        }
    }

    if on_component_slot.is_none() {
        if !has_template_slots {
            let function = slot_function(ctx, None, TreeRef::Children);
            properties.push(property(allocator, "default", function));
        } else if implicit_default_children.iter().any(|c| is_non_whitespace_content(c)) {
            if has_named_default_slot {
                let loc = implicit_default_children[0].loc().clone();
                ctx.on_error(ErrorCode::VSlotExtraneousDefaultSlotChildren, Some(&loc));
            } else {
                let function = slot_function(ctx, None, TreeRef::ImplicitChildren);
                properties.push(property(allocator, "default", function));
            }
        }
    }

    let flag = if has_dynamic_slots {
        SlotFlags::Dynamic
    } else if has_forwarded_slots(&el.children) {
        SlotFlags::Forwarded
    } else {
        SlotFlags::Stable
    };
    let flag_value = if ctx.options.dev {
        format!("{} /* {} */", flag as u8, flag.name())
    } else {
        (flag as u8).to_string()
    };
    properties.push(property(
        allocator,
        "_",
        simple_js(allocator, flag_value, false, ConstantType::NotConstant),
    ));
    tracing::trace!(
        component = %el.tag,
        slots = properties.len() - 1,
        dynamic = dynamic_slots.len(),
        flag = flag.name(),
        "built slots"
    );

    let mut slots = js_object(allocator, properties);
    if !dynamic_slots.is_empty() {
        let helper = ctx.helper(RuntimeHelper::CreateSlots);
        let array = ArrayExpression {
            elements: arena_vec(allocator, dynamic_slots),
            loc: SourceLocation::STUB,
        };
        slots = JsChildNode::Call(Box::new_in(
            call_expression(
                allocator,
                helper,
                [
                    CallArgument::Js(slots),
                    CallArgument::Js(JsChildNode::Array(Box::new_in(array, allocator))),
                ],
            ),
            allocator,
        ));
    }

    SlotsBuildResult {
        slots,
        has_dynamic_slots,
    }
}

/// `(props) => children`, rendered inside `withCtx`.
fn slot_function<'a>(
    ctx: &TransformContext<'a>,
    props: Option<&ExpressionNode<'a>>,
    children: TreeRef,
) -> JsChildNode<'a> {
    let allocator = ctx.allocator;
    let function = FunctionExpression {
        params: props.map(|p| FunctionParams::Expression(p.clone_in(allocator))),
        returns: Some(JsChildNode::Tree(children)),
        body: None,
        newline: false,
        is_slot: true,
        loc: SourceLocation::STUB,
    };
    JsChildNode::Function(Box::new_in(function, allocator))
}

/// `{ name, fn, key? }` entry of the `createSlots` array.
fn dynamic_slot<'a>(
    ctx: &TransformContext<'a>,
    name: ExpressionNode<'a>,
    function: JsChildNode<'a>,
    index: Option<usize>,
) -> JsChildNode<'a> {
    let allocator = ctx.allocator;
    let mut properties = vec![
        property(allocator, "name", JsChildNode::from_expression(name)),
        property(allocator, "fn", function),
    ];
    if let Some(index) = index {
        properties.push(property(
            allocator,
            "key",
            simple_js(allocator, index.to_string(), true, ConstantType::CanStringify),
        ));
    }
    js_object(allocator, properties)
}

fn condition<'a>(ctx: &TransformContext<'a>, dir: &DirectiveNode<'a>) -> ExpressionNode<'a> {
    match &dir.exp {
        Some(exp) => exp.clone_in(ctx.allocator),
        None => simple_expression(ctx.allocator, "true", false),
    }
}

/// `test ? slot : undefined`
fn conditional<'a>(ctx: &TransformContext<'a>, test: ExpressionNode<'a>, slot: JsChildNode<'a>) -> JsChildNode<'a> {
    let allocator = ctx.allocator;
    let conditional = ConditionalExpression {
        test,
        consequent: slot,
        alternate: simple_js(allocator, "undefined", false, ConstantType::NotConstant),
        newline: true,
        loc: SourceLocation::STUB,
    };
    JsChildNode::Conditional(Box::new_in(conditional, allocator))
}

/// Open `alternate` slot at the end of a conditional chain.
fn deepest_alternate<'b, 'a>(js: &'b mut JsChildNode<'a>) -> Option<&'b mut JsChildNode<'a>> {
    let JsChildNode::Conditional(first) = js else {
        return None;
    };
    let mut current: &'b mut ConditionalExpression<'a> = first;
    loop {
        if !matches!(current.alternate, JsChildNode::Conditional(_)) {
            return Some(&mut current.alternate);
        }
        let JsChildNode::Conditional(next) = &mut current.alternate else {
            return None;
        };
        current = &mut **next;
    }
}

fn is_non_whitespace_content(node: &TemplateChildNode<'_>) -> bool {
    match node {
        TemplateChildNode::Text(text) => !text.content.trim().is_empty(),
        TemplateChildNode::TextCall(call) => match &call.content {
            TextCallContent::Text(text) => !text.content.trim().is_empty(),
            _ => true,
        },
        _ => true,
    }
}

/// Whether a `<slot>` outlet under `children` passes parent slots on.
fn has_forwarded_slots(children: &[TemplateChildNode<'_>]) -> bool {
    children.iter().any(|child| match child {
        TemplateChildNode::Element(el) => el.is_slot_outlet() || has_forwarded_slots(&el.children),
        TemplateChildNode::If(if_node) => if_node
            .branches
            .iter()
            .any(|branch| has_forwarded_slots(&branch.children)),
        TemplateChildNode::For(for_node) => has_forwarded_slots(&for_node.children),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{element_at, prefixed, render_js, transformed, vnode_call};
    use crate::TransformOptions;
    use gesso_carton::PatchFlags;

    fn slots<'r, 'a>(el: &'r ElementNode<'a>) -> &'r JsChildNode<'a> {
        match &vnode_call(el).children {
            Some(VNodeChildren::Slots(slots)) => slots,
            other => panic!("expected slots, got {other:?}"),
        }
    }

    fn codes(errors: &[crate::CompilerError]) -> std::vec::Vec<ErrorCode> {
        errors.iter().map(|e| e.code).collect()
    }

    #[test]
    fn test_implicit_default_slot() {
        transformed(r#"<Comp><div/></Comp>"#, TransformOptions::default(), |root, errors| {
            assert!(errors.is_empty());
            assert_eq!(
                render_js(slots(element_at(root, &[0]))),
                "{ default: () => <Children>, _: 1 /* STABLE */ }"
            );
            assert!(root.has_helper(RuntimeHelper::WithCtx));
            assert_eq!(vnode_call(element_at(root, &[0])).patch_flag, None);
        });
    }

    #[test]
    fn test_on_component_slot() {
        transformed(r#"<Comp v-slot="{ foo }">{{ foo }}</Comp>"#, prefixed(), |root, errors| {
            assert!(errors.is_empty());
            insta::assert_snapshot!(render_js(slots(element_at(root, &[0]))), @"{ default: ({ foo }) => <Children>, _: 1 /* STABLE */ }");
        });
    }

    #[test]
    fn test_named_template_slots() {
        transformed(
            r#"<Comp><template #header>h</template><template v-slot:default="p">{{ p.x }}</template></Comp>"#,
            TransformOptions::default(),
            |root, errors| {
                assert!(errors.is_empty());
                insta::assert_snapshot!(
                    render_js(slots(element_at(root, &[0]))),
                    @"{ header: () => <TemplateChildren(0)>, default: (p) => <TemplateChildren(1)>, _: 1 /* STABLE */ }"
                );
            },
        );
    }

    #[test]
    fn test_implicit_default_mixed_with_named() {
        transformed(
            r#"<Comp><template #header>h</template><span>body</span></Comp>"#,
            TransformOptions::default(),
            |root, _| {
                assert_eq!(
                    render_js(slots(element_at(root, &[0]))),
                    "{ header: () => <TemplateChildren(0)>, default: () => <ImplicitChildren>, _: 1 /* STABLE */ }"
                );
            },
        );
    }

    #[test]
    fn test_conditional_slots() {
        transformed(
            r#"<Comp><template v-if="a" #one>1</template><template v-else-if="b" #two>2</template><template v-else #three>3</template></Comp>"#,
            TransformOptions::default(),
            |root, errors| {
                assert!(errors.is_empty());
                let comp = element_at(root, &[0]);
                insta::assert_snapshot!(
                    render_js(slots(comp)),
                    @"_createSlots({ _: 2 /* DYNAMIC */ }, [a ? { name: one, fn: () => <TemplateChildren(0)>, key: 0 } : b ? { name: two, fn: () => <TemplateChildren(1)>, key: 1 } : { name: three, fn: () => <TemplateChildren(2)>, key: 2 }])"
                );
                assert_eq!(vnode_call(comp).patch_flag, Some(PatchFlags::DYNAMIC_SLOTS));
                assert!(root.has_helper(RuntimeHelper::CreateSlots));
            },
        );
    }

    #[test]
    fn test_looped_slots() {
        transformed(
            r#"<Comp><template v-for="item in list" #[item.name]="props">{{ props.x }}</template></Comp>"#,
            prefixed(),
            |root, errors| {
                assert!(errors.is_empty(), "{errors:?}");
                insta::assert_snapshot!(
                    render_js(slots(element_at(root, &[0]))),
                    @"_createSlots({ _: 2 /* DYNAMIC */ }, [_renderList(_ctx.list, (item) => { name: item.name, fn: (props) => <TemplateChildren(0)> })])"
                );
                assert!(root.has_helper(RuntimeHelper::RenderList));
            },
        );
    }

    #[test]
    fn test_dynamic_slot_name() {
        transformed(r#"<Comp><template #[name]>x</template></Comp>"#, TransformOptions::default(), |root, _| {
            let comp = element_at(root, &[0]);
            assert_eq!(render_js(slots(comp)), "{ [name]: () => <TemplateChildren(0)>, _: 2 /* DYNAMIC */ }");
            assert_eq!(vnode_call(comp).patch_flag, Some(PatchFlags::DYNAMIC_SLOTS));
        });
    }

    #[test]
    fn test_scope_reference_makes_slots_dynamic() {
        transformed(
            r#"<div v-for="i in list"><Comp>{{ i }}</Comp></div>"#,
            prefixed(),
            |root, _| {
                let TemplateChildNode::For(for_node) = &root.children[0] else {
                    panic!("expected for node");
                };
                let comp = for_node.children[0].as_element().unwrap().children[0].as_element().unwrap();
                assert_eq!(render_js(slots(comp)), "{ default: () => <Children>, _: 2 /* DYNAMIC */ }");
            },
        );
    }

    #[test]
    fn test_forwarded_slots() {
        transformed(r#"<Comp><slot/></Comp>"#, TransformOptions::default(), |root, _| {
            assert_eq!(render_js(slots(element_at(root, &[0]))), "{ default: () => <Children>, _: 3 /* FORWARDED */ }");
        });
    }

    #[test]
    fn test_production_flag() {
        let options = TransformOptions {
            dev: false,
            ..TransformOptions::default()
        };
        transformed(r#"<Comp>x</Comp>"#, options, |root, _| {
            assert_eq!(render_js(slots(element_at(root, &[0]))), "{ default: () => <Children>, _: 1 }");
        });
    }

    #[test]
    fn test_mixed_slot_usage() {
        transformed(
            r#"<Comp v-slot="p"><template #a>x</template></Comp>"#,
            TransformOptions::default(),
            |_, errors| assert_eq!(codes(errors), vec![ErrorCode::VSlotMixedSlotUsage]),
        );
    }

    #[test]
    fn test_duplicate_slot_names() {
        transformed(
            r#"<Comp><template #a>x</template><template #a>y</template></Comp>"#,
            TransformOptions::default(),
            |root, errors| {
                assert_eq!(codes(errors), vec![ErrorCode::VSlotDuplicateSlotNames]);
                assert_eq!(render_js(slots(element_at(root, &[0]))), "{ a: () => <TemplateChildren(0)>, _: 1 /* STABLE */ }");
            },
        );
    }

    #[test]
    fn test_extraneous_default_children() {
        transformed(
            r#"<Comp><template #default>x</template><span>stray</span></Comp>"#,
            TransformOptions::default(),
            |_, errors| assert_eq!(codes(errors), vec![ErrorCode::VSlotExtraneousDefaultSlotChildren]),
        );
    }

    #[test]
    fn test_whitespace_is_not_a_default_slot() {
        let source = "<Comp>\n  <template #a>x</template>\n  <!-- note -->\n</Comp>";
        transformed(source, TransformOptions::default(), |root, errors| {
            assert!(errors.is_empty());
            assert_eq!(render_js(slots(element_at(root, &[0]))), "{ a: () => <TemplateChildren(0)>, _: 1 /* STABLE */ }");
        });
    }

    #[test]
    fn test_misplaced_template_slot() {
        transformed(r#"<div><template #a>x</template></div>"#, TransformOptions::default(), |_, errors| {
            assert_eq!(codes(errors), vec![ErrorCode::VSlotMisplaced]);
        });
    }

    #[test]
    fn test_slot_on_plain_element() {
        transformed(r#"<div v-slot="p"></div>"#, TransformOptions::default(), |_, errors| {
            assert_eq!(codes(errors), vec![ErrorCode::VSlotMisplaced]);
        });
    }

    #[test]
    fn test_slot_props_are_scoped() {
        transformed(r#"<Comp v-slot="{ item }">{{ item }} {{ other }}</Comp>"#, prefixed(), |root, _| {
            let comp = element_at(root, &[0]);
            let text = match &comp.children[0] {
                TemplateChildNode::CompoundExpression(text) => text,
                TemplateChildNode::TextCall(call) => match &call.content {
                    TextCallContent::Compound(text) => text,
                    other => panic!("expected merged text, got {other:?}"),
                },
                other => panic!("expected merged text, got {other:?}"),
            };
            assert_eq!(
                crate::test_utils::render_compound(text),
                r#"_toDisplayString(item) + " " + _toDisplayString(_ctx.other)"#
            );
        });
    }
}
