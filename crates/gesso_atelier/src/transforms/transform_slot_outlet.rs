//! `<slot>` outlet transform.
//!
//! `<slot name="x" :foo="bar">fallback</slot>` renders as
//! `renderSlot($slots, "x", { foo: bar }, () => fallback)`.

use gesso_carton::{camelize, Box, CloneIn, String};

use crate::ast::*;
use crate::errors::ErrorCode;
use crate::transform::{ExitFn, ExpressionMode, TransformContext, TransformNode};
use crate::transforms::props::build_props;
use crate::transforms::utils::{call_expression, props_into_js, simple_expression, string_literal};

/// Name and props passed on by a slot outlet.
#[derive(Debug)]
pub struct SlotOutletProcessResult<'a> {
    pub slot_name: JsChildNode<'a>,
    pub slot_props: Option<PropsExpression<'a>>,
}

pub fn transform_slot_outlet<'a>(
    ctx: &mut TransformContext<'a>,
    node: &mut TransformNode<'_, 'a>,
) -> Option<std::vec::Vec<ExitFn<'a>>> {
    let cursor = ctx.cursor;
    let allocator = ctx.allocator;
    let el = node.element_mut(cursor)?;
    if !el.is_slot_outlet() {
        return None;
    }

    let SlotOutletProcessResult { slot_name, slot_props } = process_slot_outlet(ctx, el);
    let slots = if ctx.options.prefix_identifiers {
        "_ctx.$slots"
    } else {
        "$slots"
    };

    let mut arguments = vec![CallArgument::String(String::const_new(slots)), CallArgument::Js(slot_name)];
    let has_fallback = !el.children.is_empty();
    if slot_props.is_some() || has_fallback {
        arguments.push(match slot_props {
            Some(props) => CallArgument::Js(props_into_js(props)),
            None => CallArgument::String(String::const_new("{}")),
        });
    }
    if has_fallback {
        let fallback = FunctionExpression {
            params: None,
            returns: Some(JsChildNode::Tree(TreeRef::Children)),
            body: None,
            newline: false,
            is_slot: false,
            loc: el.loc.clone(),
        };
        arguments.push(CallArgument::Js(JsChildNode::Function(Box::new_in(fallback, allocator))));
    }

    let helper = ctx.helper(RuntimeHelper::RenderSlot);
    let mut call = call_expression(allocator, helper, arguments);
    call.loc = el.loc.clone();
    el.codegen_node = Some(JsChildNode::Call(Box::new_in(call, allocator)));
    None
}

/// Split the outlet's props into the slot name and the props forwarded to
/// the slot function. Forwarded prop names are camelized in place.
pub fn process_slot_outlet<'a>(
    ctx: &mut TransformContext<'a>,
    el: &mut ElementNode<'a>,
) -> SlotOutletProcessResult<'a> {
    let allocator = ctx.allocator;
    let mut slot_name = None;
    let mut forwarded = std::vec::Vec::new();

    for (i, prop) in el.props.iter_mut().enumerate() {
        match prop {
            PropNode::Attribute(attr) => {
                let Some(value) = &attr.value else {
                    continue;
                };
                if attr.name == "name" {
                    slot_name = Some(JsChildNode::Simple(Box::new_in(
                        SimpleExpressionNode::with_const_type(
                            string_literal(&value.content),
                            false,
                            value.loc.clone(),
                            ConstantType::CanStringify,
                        ),
                        allocator,
                    )));
                } else {
                    attr.name = camelize(&attr.name);
                    forwarded.push(i);
                }
            }
            PropNode::Directive(dir) => {
                if dir.name == "bind" && dir.is_static_arg("name") {
                    if dir.exp.is_none() {
                        // `:name` shorthand
                        let name = simple_expression(allocator, "name", false);
                        dir.exp = Some(ctx.process_expression(name, ExpressionMode::Normal));
                    }
                    slot_name = dir.exp.clone_in(allocator).map(JsChildNode::from_expression);
                    continue;
                }
                if dir.name == "bind" {
                    if let Some(ExpressionNode::Simple(arg)) = &mut dir.arg {
                        if arg.is_static {
                            arg.content = camelize(&arg.content);
                        }
                    }
                }
                forwarded.push(i);
            }
        }
    }

    let slot_name = slot_name.unwrap_or_else(|| {
        JsChildNode::Simple(Box::new_in(
            SimpleExpressionNode::with_const_type(
                "\"default\"",
                false,
                SourceLocation::STUB,
                ConstantType::CanStringify,
            ),
            allocator,
        ))
    });

    let mut slot_props = None;
    if !forwarded.is_empty() {
        let props: std::vec::Vec<&PropNode<'a>> = forwarded.iter().map(|&i| &el.props[i]).collect();
        let result = build_props(ctx, el, &props, false, false);
        if let Some(first) = result.directives.first() {
            ctx.on_error(ErrorCode::VSlotUnexpectedDirectiveOnSlotOutlet, Some(&first.dir.loc));
        }
        slot_props = result.props;
    }

    tracing::trace!(forwarded = forwarded.len(), "processed slot outlet");
    SlotOutletProcessResult { slot_name, slot_props }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{element_at, prefixed, render_call, transformed};
    use crate::TransformOptions;

    fn outlet_call<'r, 'a>(el: &'r ElementNode<'a>) -> &'r CallExpression<'a> {
        match &el.codegen_node {
            Some(JsChildNode::Call(call)) => call,
            other => panic!("expected renderSlot call, got {other:?}"),
        }
    }

    #[test]
    fn test_default_outlet() {
        transformed(r#"<div><slot/></div>"#, TransformOptions::default(), |root, errors| {
            assert!(errors.is_empty());
            assert_eq!(
                render_call(outlet_call(element_at(root, &[0, 0]))),
                r#"_renderSlot($slots, "default")"#
            );
            assert!(root.has_helper(RuntimeHelper::RenderSlot));
        });
    }

    #[test]
    fn test_named_outlet_with_props() {
        transformed(
            r#"<div><slot name="header" :user-id="id" foo-bar="baz"/></div>"#,
            prefixed(),
            |root, errors| {
                assert!(errors.is_empty());
                insta::assert_snapshot!(
                    render_call(outlet_call(element_at(root, &[0, 0]))),
                    @r#"_renderSlot(_ctx.$slots, "header", { userId: _ctx.id, fooBar: baz })"#
                );
            },
        );
    }

    #[test]
    fn test_dynamic_name() {
        transformed(r#"<div><slot :name="current"/></div>"#, prefixed(), |root, _| {
            assert_eq!(
                render_call(outlet_call(element_at(root, &[0, 0]))),
                "_renderSlot(_ctx.$slots, _ctx.current)"
            );
        });
    }

    #[test]
    fn test_name_shorthand() {
        transformed(r#"<div><slot :name/></div>"#, prefixed(), |root, _| {
            assert_eq!(
                render_call(outlet_call(element_at(root, &[0, 0]))),
                "_renderSlot(_ctx.$slots, _ctx.name)"
            );
        });
    }

    #[test]
    fn test_fallback_content() {
        transformed(r#"<div><slot>fallback</slot></div>"#, TransformOptions::default(), |root, _| {
            assert_eq!(
                render_call(outlet_call(element_at(root, &[0, 0]))),
                r#"_renderSlot($slots, "default", {}, () => <Children>)"#
            );
        });
    }

    #[test]
    fn test_unexpected_directive() {
        transformed(r#"<div><slot v-foo/></div>"#, TransformOptions::default(), |_, errors| {
            let codes: std::vec::Vec<_> = errors.iter().map(|e| e.code).collect();
            assert_eq!(codes, vec![ErrorCode::VSlotUnexpectedDirectiveOnSlotOutlet]);
        });
    }

    #[test]
    fn test_root_outlet_stays_a_call() {
        transformed(r#"<slot/>"#, TransformOptions::default(), |root, _| {
            assert!(matches!(root.codegen_node, Some(JsChildNode::Tree(TreeRef::OnlyChild))));
            outlet_call(element_at(root, &[0]));
            assert!(!root.has_helper(RuntimeHelper::OpenBlock));
        });
    }
}
