//! Text transform.
//!
//! Merges adjacent text and interpolation children into one compound
//! expression. In child lists rendered as vnodes, text is then wrapped in
//! `createTextVNode` calls.

use gesso_carton::{Box, Bump, CloneIn, PatchFlags, String, Vec};

use crate::ast::*;
use crate::transform::{exit_fn, ExitFn, TransformContext, TransformNode};
use crate::transforms::hoist_static::text_constant_type;
use crate::transforms::utils::call_expression;

/// Merge text children on exit of the root, elements, loop bodies and
/// branches.
pub fn transform_text<'a>(
    ctx: &mut TransformContext<'a>,
    node: &mut TransformNode<'_, 'a>,
) -> Option<std::vec::Vec<ExitFn<'a>>> {
    let applies = match node {
        TransformNode::Root(_) | TransformNode::Branch(_) => true,
        TransformNode::Child(_) => matches!(
            node.current(ctx.cursor),
            Some(TemplateChildNode::Element(_) | TemplateChildNode::For(_))
        ),
    };
    if !applies {
        return None;
    }

    Some(vec![exit_fn(|ctx, node| {
        let cursor = ctx.cursor;
        let allocator = ctx.allocator;
        // A lone text child of the root or of a plain element is set as the
        // element's text content directly.
        let renders_text_directly = match &*node {
            TransformNode::Root(_) => true,
            TransformNode::Branch(_) => false,
            TransformNode::Child(_) => node.element(cursor).is_some_and(|el| {
                el.tag_type == ElementType::Element
                    && !el.props.iter().any(|p| {
                        matches!(p, PropNode::Directive(dir) if !ctx.has_directive_transform(&dir.name))
                    })
            }),
        };
        let ssr = ctx.options.ssr;
        let dev = ctx.options.dev;

        let Some(children) = node.children_mut(cursor) else {
            return;
        };
        let has_text = merge_adjacent_text(allocator, children);
        if !has_text || (children.len() == 1 && renders_text_directly) {
            return;
        }

        let mut converted = 0usize;
        for child in children.iter_mut() {
            if !matches!(
                child,
                TemplateChildNode::Text(_)
                    | TemplateChildNode::Interpolation(_)
                    | TemplateChildNode::CompoundExpression(_)
            ) {
                continue;
            }
            let is_dynamic = !ssr && text_constant_type(child) == ConstantType::NotConstant;
            let loc = child.loc().clone();
            let placeholder = TemplateChildNode::Comment(Box::new_in(
                CommentNode::new("", SourceLocation::STUB),
                allocator,
            ));
            let content = match std::mem::replace(child, placeholder) {
                TemplateChildNode::Text(text) => TextCallContent::Text(text),
                TemplateChildNode::Interpolation(interpolation) => {
                    TextCallContent::Interpolation(interpolation)
                }
                TemplateChildNode::CompoundExpression(compound) => TextCallContent::Compound(compound),
                _ => continue,
            };

            let mut arguments = std::vec::Vec::new();
            let is_single_space = matches!(&content, TextCallContent::Text(text) if text.content == " ");
            if !is_single_space {
                arguments.push(CallArgument::Text(content.clone_in(allocator)));
            }
            if is_dynamic {
                arguments.push(CallArgument::String(text_flag(dev)));
            }
            let helper = ctx.helper(RuntimeHelper::CreateText);
            let call = call_expression(allocator, helper, arguments);

            *child = TemplateChildNode::TextCall(Box::new_in(
                TextCallNode {
                    content,
                    loc,
                    codegen_node: Some(JsChildNode::Call(Box::new_in(call, allocator))),
                },
                allocator,
            ));
            converted += 1;
        }
        tracing::trace!(converted, "created text calls");
    })])
}

fn is_text(node: &TemplateChildNode<'_>) -> bool {
    matches!(node, TemplateChildNode::Text(_) | TemplateChildNode::Interpolation(_))
}

fn compound_child(node: TemplateChildNode<'_>) -> Option<CompoundExpressionChild<'_>> {
    match node {
        TemplateChildNode::Text(text) => Some(CompoundExpressionChild::Text(text)),
        TemplateChildNode::Interpolation(interpolation) => {
            Some(CompoundExpressionChild::Interpolation(interpolation))
        }
        _ => None,
    }
}

/// Fold each run of adjacent text and interpolation children into a
/// compound expression joined with `+`. Returns whether any text was seen.
pub fn merge_adjacent_text<'a>(allocator: &'a Bump, children: &mut Vec<'a, TemplateChildNode<'a>>) -> bool {
    let mut has_text = false;
    let mut i = 0;
    while i < children.len() {
        if !is_text(&children[i]) {
            i += 1;
            continue;
        }
        has_text = true;

        while children.get(i + 1).is_some_and(is_text) {
            let next = children.remove(i + 1);
            if !matches!(children[i], TemplateChildNode::CompoundExpression(_)) {
                let loc = children[i].loc().clone();
                let container = TemplateChildNode::CompoundExpression(Box::new_in(
                    CompoundExpressionNode::new(allocator, loc),
                    allocator,
                ));
                let first = std::mem::replace(&mut children[i], container);
                if let (TemplateChildNode::CompoundExpression(compound), Some(first)) =
                    (&mut children[i], compound_child(first))
                {
                    compound.children.push(first);
                }
            }
            if let TemplateChildNode::CompoundExpression(compound) = &mut children[i] {
                compound.children.push(CompoundExpressionChild::String(String::const_new(" + ")));
                if let Some(next) = compound_child(next) {
                    compound.children.push(next);
                }
            }
        }
        i += 1;
    }
    has_text
}

fn text_flag(dev: bool) -> String {
    let value = PatchFlags::TEXT.bits();
    if dev {
        String::from(format!("{value} /* TEXT */"))
    } else {
        String::from(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{element_at, prefixed, render_call, render_compound, transformed, vnode_call};
    use crate::TransformOptions;

    fn text_call<'r, 'a>(node: &'r TemplateChildNode<'a>) -> &'r TextCallNode<'a> {
        match node {
            TemplateChildNode::TextCall(call) => call,
            other => panic!("expected text call, got {other:?}"),
        }
    }

    fn codegen_call<'r, 'a>(call: &'r TextCallNode<'a>) -> &'r CallExpression<'a> {
        match &call.codegen_node {
            Some(JsChildNode::Call(call)) => call,
            other => panic!("expected createTextVNode, got {other:?}"),
        }
    }

    #[test]
    fn test_single_text_child_is_left_alone() {
        transformed(r#"<div>hello</div>"#, TransformOptions::default(), |root, _| {
            let el = element_at(root, &[0]);
            assert!(matches!(el.children[0], TemplateChildNode::Text(_)));
            assert!(matches!(vnode_call(el).children, Some(VNodeChildren::TreeText)));
            assert!(!root.has_helper(RuntimeHelper::CreateText));
        });
    }

    #[test]
    fn test_adjacent_text_is_merged() {
        transformed(r#"<div>foo {{ bar }} baz</div>"#, prefixed(), |root, _| {
            let el = element_at(root, &[0]);
            assert_eq!(el.children.len(), 1);
            let TemplateChildNode::CompoundExpression(compound) = &el.children[0] else {
                panic!("expected compound");
            };
            assert_eq!(
                render_compound(compound),
                r#""foo " + _toDisplayString(_ctx.bar) + " baz""#
            );
            assert_eq!(vnode_call(el).patch_flag, Some(PatchFlags::TEXT));
        });
    }

    #[test]
    fn test_text_mixed_with_elements() {
        transformed(r#"<div>{{ a }} b<span/>c</div>"#, TransformOptions::default(), |root, _| {
            let el = element_at(root, &[0]);
            assert_eq!(el.children.len(), 3);
            let merged = text_call(&el.children[0]);
            assert!(matches!(merged.content, TextCallContent::Compound(_)));
            assert_eq!(render_call(codegen_call(merged)), "_createTextVNode(<text>, 1 /* TEXT */)");

            let plain = text_call(&el.children[2]);
            assert_eq!(render_call(codegen_call(plain)), "_createTextVNode(<text>)");
            assert!(root.has_helper(RuntimeHelper::CreateText));
        });
    }

    #[test]
    fn test_single_space_has_no_argument() {
        let options = TransformOptions {
            whitespace: gesso_relief::options::WhitespaceStrategy::Preserve,
            ..TransformOptions::default()
        };
        let allocator = Bump::new();
        let (mut root, _) = gesso_armature::parse_with_options(
            &allocator,
            r#"<div><span/> <span/></div>"#,
            options.parser_options(),
        );
        crate::transform(&allocator, &mut root, options);
        let el = root.children[0].as_element().unwrap();
        let space = text_call(&el.children[1]);
        assert_eq!(render_call(codegen_call(space)), "_createTextVNode()");
    }

    #[test]
    fn test_production_flag() {
        let options = TransformOptions {
            dev: false,
            ..TransformOptions::default()
        };
        transformed(r#"<div>{{ a }}<span/></div>"#, options, |root, _| {
            let call = text_call(&element_at(root, &[0]).children[0]);
            assert_eq!(render_call(codegen_call(call)), "_createTextVNode(<text>, 1)");
        });
    }

    #[test]
    fn test_component_children_become_text_calls() {
        transformed(r#"<Comp>{{ a }}</Comp>"#, TransformOptions::default(), |root, _| {
            let el = element_at(root, &[0]);
            assert!(matches!(el.children[0], TemplateChildNode::TextCall(_)));
        });
    }

    #[test]
    fn test_custom_directive_forces_text_call() {
        transformed(r#"<div v-foo>{{ a }}</div>"#, TransformOptions::default(), |root, _| {
            assert!(matches!(element_at(root, &[0]).children[0], TemplateChildNode::TextCall(_)));
        });
    }

    #[test]
    fn test_root_text_stays_text() {
        transformed(r#"{{ a }} b"#, TransformOptions::default(), |root, _| {
            assert_eq!(root.children.len(), 1);
            assert!(matches!(root.children[0], TemplateChildNode::CompoundExpression(_)));
        });
    }

    #[test]
    fn test_merge_adjacent_text() {
        let allocator = Bump::new();
        let (mut root, _) = gesso_armature::parse(&allocator, "a{{ b }}<i/>c");
        assert!(merge_adjacent_text(&allocator, &mut root.children));
        assert_eq!(root.children.len(), 3);
        assert!(matches!(root.children[0], TemplateChildNode::CompoundExpression(_)));
        assert!(matches!(root.children[2], TemplateChildNode::Text(_)));
    }
}
