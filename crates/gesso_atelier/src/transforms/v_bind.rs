//! v-bind directive transform.
//!
//! `v-bind:arg="exp"` becomes the property `arg: exp`. Object bindings
//! without an argument are merged by the props builder instead.

use compact_str::format_compact;

use gesso_carton::{camelize, Box, Bump, CloneIn};

use crate::ast::*;
use crate::errors::ErrorCode;
use crate::transform::{DirectiveTransformResult, ExpressionMode, TransformContext};
use crate::transforms::utils::wrap_expression;

pub fn transform_bind<'a>(
    dir: &DirectiveNode<'a>,
    _el: &ElementNode<'a>,
    ctx: &mut TransformContext<'a>,
) -> DirectiveTransformResult<'a> {
    let allocator = ctx.allocator;
    let Some(arg) = &dir.arg else {
        return DirectiveTransformResult::empty();
    };
    let mut arg = arg.clone_in(allocator);

    let blank = dir.exp.as_ref().is_some_and(|exp| {
        matches!(exp, ExpressionNode::Simple(s) if s.content.trim().is_empty())
    });
    if blank {
        ctx.on_error(ErrorCode::VBindNoExpression, Some(&dir.loc));
        return empty_value(allocator, arg, &dir.loc);
    }

    let exp = match &dir.exp {
        Some(exp) => exp.clone_in(allocator),
        // `:arg` is short for `:arg="arg"`
        None => {
            let shorthand = arg
                .as_simple()
                .filter(|a| a.is_static)
                .map(|a| (camelize(&a.content), a.loc.clone()));
            let Some((name, loc)) = shorthand else {
                ctx.on_error(ErrorCode::VBindNoExpression, Some(&dir.loc));
                return empty_value(allocator, arg, &dir.loc);
            };
            let exp = ExpressionNode::simple(allocator, SimpleExpressionNode::new(name, false, loc));
            ctx.process_expression(exp, ExpressionMode::Normal)
        }
    };

    // A dynamic name that evaluates to null or undefined renders no attribute.
    arg = match arg {
        ExpressionNode::Simple(mut simple) if !simple.is_static => {
            simple.content = format_compact!("{} || \"\"", simple.content);
            ExpressionNode::Simple(simple)
        }
        compound @ ExpressionNode::Compound(_) => wrap_expression(allocator, "(", compound, ") || \"\""),
        other => other,
    };

    if dir.has_modifier("camel") {
        arg = match arg {
            ExpressionNode::Simple(mut simple) => {
                simple.content = if simple.is_static {
                    camelize(&simple.content)
                } else {
                    let helper = ctx.helper(RuntimeHelper::Camelize);
                    format_compact!("_{}({})", helper.name(), simple.content)
                };
                ExpressionNode::Simple(simple)
            }
            compound => {
                let helper = ctx.helper(RuntimeHelper::Camelize);
                let prefix = format_compact!("_{}(", helper.name());
                wrap_expression(allocator, &prefix, compound, ")")
            }
        };
    }

    if !ctx.options.ssr {
        if dir.has_modifier("prop") {
            arg = inject_prefix(allocator, arg, '.');
        }
        if dir.has_modifier("attr") {
            arg = inject_prefix(allocator, arg, '^');
        }
    }

    DirectiveTransformResult::props(vec![Property {
        key: arg,
        value: JsChildNode::from_expression(exp),
        loc: dir.loc.clone(),
    }])
}

fn empty_value<'a>(
    allocator: &'a Bump,
    key: ExpressionNode<'a>,
    loc: &SourceLocation,
) -> DirectiveTransformResult<'a> {
    DirectiveTransformResult::props(vec![Property {
        key,
        value: JsChildNode::Simple(Box::new_in(
            SimpleExpressionNode::new("", true, loc.clone()),
            allocator,
        )),
        loc: loc.clone(),
    }])
}

/// `.prop` and `.attr` force how the runtime sets the key.
fn inject_prefix<'a>(
    allocator: &'a Bump,
    arg: ExpressionNode<'a>,
    prefix: char,
) -> ExpressionNode<'a> {
    match arg {
        ExpressionNode::Simple(mut simple) => {
            simple.content = if simple.is_static {
                format_compact!("{}{}", prefix, simple.content)
            } else {
                format_compact!("`{}${{{}}}`", prefix, simple.content)
            };
            ExpressionNode::Simple(simple)
        }
        compound => {
            let open = format_compact!("'{}' + (", prefix);
            wrap_expression(allocator, &open, compound, ")")
        }
    }
}
