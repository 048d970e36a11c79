//! v-on directive transform.
//!
//! `@click="handler"` becomes the property `onClick: handler`. Inline
//! statements are wrapped in a function taking `$event`, modifiers turn
//! into runtime guards, and with handler caching enabled the handler is
//! created once per component instance.

use compact_str::format_compact;

use gesso_carton::{camelize, capitalize, to_handler_key, Box, Bump, CloneIn, SmallVec, String};

use crate::ast::*;
use crate::transform::{DirectiveTransformResult, ExpressionMode, TransformContext};
use crate::transforms::utils::{
    exp_has_scope_ref, is_fn_expression, is_member_expression, js_call, string_literal,
    wrap_expression,
};

/// Modifiers of a listener, split by how the runtime applies them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventModifiers {
    /// Checked against the pressed key (`withKeys`)
    pub keys: SmallVec<[String; 2]>,
    /// Checked against the event itself (`withModifiers`)
    pub guards: SmallVec<[String; 4]>,
    /// Listener options, appended to the event name
    pub options: SmallVec<[String; 2]>,
}

fn is_event_option_modifier(name: &str) -> bool {
    matches!(name, "passive" | "once" | "capture")
}

fn is_non_key_modifier(name: &str) -> bool {
    matches!(
        name,
        "stop" | "prevent" | "self" | "ctrl" | "shift" | "alt" | "meta" | "exact" | "middle"
    )
}

fn is_keyboard_event(key: &str) -> bool {
    matches!(
        key.to_ascii_lowercase().as_str(),
        "onkeyup" | "onkeydown" | "onkeypress"
    )
}

/// Sort modifiers for the listener registered under `key`.
///
/// `left` and `right` are mouse buttons on pointer events and arrow keys on
/// keyboard events; with a dynamic event name both readings are kept.
pub fn resolve_modifiers(key: &ExpressionNode<'_>, modifiers: &[SimpleExpressionNode<'_>]) -> EventModifiers {
    let mut resolved = EventModifiers::default();
    for modifier in modifiers {
        let name = modifier.content.clone();
        if is_event_option_modifier(&name) {
            resolved.options.push(name);
        } else if name == "left" || name == "right" {
            match key {
                ExpressionNode::Simple(key) if key.is_static => {
                    if is_keyboard_event(&key.content) {
                        resolved.keys.push(name);
                    } else {
                        resolved.guards.push(name);
                    }
                }
                _ => {
                    resolved.keys.push(name.clone());
                    resolved.guards.push(name);
                }
            }
        } else if is_non_key_modifier(&name) {
            resolved.guards.push(name);
        } else {
            resolved.keys.push(name);
        }
    }
    resolved
}

/// Handler key for a static event name.
///
/// Element events with uppercase letters keep their exact name; the
/// runtime cannot recover it from a camelized key.
pub fn event_key_name(raw: &str, is_element: bool) -> String {
    let raw = match raw.strip_prefix("vue:") {
        Some(hook) => format_compact!("vnode-{hook}"),
        None => String::from(raw),
    };
    if !is_element || raw.starts_with("vnode") || !raw.chars().any(|c| c.is_ascii_uppercase()) {
        to_handler_key(&camelize(&raw))
    } else {
        format_compact!("on:{raw}")
    }
}

pub fn transform_on<'a>(
    dir: &DirectiveNode<'a>,
    el: &ElementNode<'a>,
    ctx: &mut TransformContext<'a>,
) -> DirectiveTransformResult<'a> {
    let allocator = ctx.allocator;
    let Some(arg) = &dir.arg else {
        return DirectiveTransformResult::empty();
    };
    let is_element = el.tag_type == ElementType::Element;

    let mut key = match arg.clone_in(allocator) {
        ExpressionNode::Simple(mut simple) if simple.is_static => {
            simple.content = event_key_name(&simple.content, is_element);
            ExpressionNode::Simple(simple)
        }
        dynamic => {
            let helper = ctx.helper(RuntimeHelper::ToHandlerKey);
            wrap_expression(allocator, &format_compact!("_{}(", helper.name()), dynamic, ")")
        }
    };

    let handler = dir
        .exp
        .as_ref()
        .filter(|exp| !exp.content().trim().is_empty())
        .map(|exp| exp.clone_in(allocator));
    let mut should_cache = ctx.options.cache_handlers && handler.is_none() && !ctx.in_v_once;

    let mut value = match handler {
        Some(handler) => {
            let source = String::from(handler.content());
            let is_member = is_member_expression(&source);
            let is_inline = !(is_member || is_fn_expression(&source));
            let has_multiple_statements = source.contains(';');

            if is_inline {
                ctx.track("$event");
            }
            let mode = if has_multiple_statements {
                ExpressionMode::Statements
            } else {
                ExpressionMode::Normal
            };
            let mut handler = ctx.process_expression(handler, mode);
            if is_inline {
                ctx.untrack("$event");
            }

            // Constant handlers and handlers closing over scope variables
            // cannot be created once.
            should_cache = ctx.options.cache_handlers
                && !ctx.in_v_once
                && !matches!(&handler, ExpressionNode::Simple(s) if s.const_type > ConstantType::NotConstant)
                && !(is_member && el.tag_type == ElementType::Component)
                && !exp_has_scope_ref(&handler, &ctx.identifiers);

            if should_cache && is_member {
                handler = guard_member_call(allocator, handler);
            }
            if is_inline || (should_cache && is_member) {
                let params = match (is_inline, ctx.options.is_ts) {
                    (true, true) => "($event: any)",
                    (true, false) => "$event",
                    (false, _) => "(...args)",
                };
                let (open, close) = if has_multiple_statements {
                    ("{", "}")
                } else {
                    ("(", ")")
                };
                handler = wrap_expression(allocator, &format_compact!("{params} => {open}"), handler, close);
            }
            JsChildNode::from_expression(handler)
        }
        None => JsChildNode::Simple(Box::new_in(
            SimpleExpressionNode::new("() => {}", false, dir.loc.clone()),
            allocator,
        )),
    };

    if !dir.modifiers.is_empty() {
        let modifiers = resolve_modifiers(&key, &dir.modifiers);
        if modifiers.guards.iter().any(|m| m == "right") {
            key = rename_click(allocator, key, "onContextmenu");
        }
        if modifiers.guards.iter().any(|m| m == "middle") {
            key = rename_click(allocator, key, "onMouseup");
        }
        if !modifiers.guards.is_empty() {
            let helper = ctx.helper(RuntimeHelper::WithModifiers);
            value = js_call(
                allocator,
                helper,
                [CallArgument::Js(value), CallArgument::String(json_list(&modifiers.guards))],
            );
        }
        if !modifiers.keys.is_empty() && (!key.is_static_exp() || is_keyboard_event(key.content())) {
            let helper = ctx.helper(RuntimeHelper::WithKeys);
            value = js_call(
                allocator,
                helper,
                [CallArgument::Js(value), CallArgument::String(json_list(&modifiers.keys))],
            );
        }
        if !modifiers.options.is_empty() {
            let mut postfix = String::default();
            for option in &modifiers.options {
                postfix.push_str(&capitalize(option));
            }
            key = match key {
                ExpressionNode::Simple(mut simple) if simple.is_static => {
                    simple.content.push_str(&postfix);
                    ExpressionNode::Simple(simple)
                }
                dynamic => wrap_expression(allocator, "(", dynamic, &format_compact!(") + \"{postfix}\"")),
            };
        }
    }

    if should_cache {
        value = ctx.cache(value, false);
    }
    key.set_handler_key();

    DirectiveTransformResult::props(vec![Property {
        key,
        value,
        loc: dir.loc.clone(),
    }])
}

/// `handler && handler(...args)`, so a handler bound later is still called.
fn guard_member_call<'a>(allocator: &'a Bump, handler: ExpressionNode<'a>) -> ExpressionNode<'a> {
    match handler {
        ExpressionNode::Simple(mut simple) => {
            simple.content = format_compact!("{0} && {0}(...args)", simple.content);
            ExpressionNode::Simple(simple)
        }
        ExpressionNode::Compound(compound) => {
            let mut guarded = CompoundExpressionNode::new(allocator, compound.loc.clone());
            let copy = compound.clone_in(allocator);
            guarded.children.push(CompoundExpressionChild::Compound(compound));
            guarded.children.push(CompoundExpressionChild::String(String::const_new(" && ")));
            guarded.children.push(CompoundExpressionChild::Compound(copy));
            guarded.children.push(CompoundExpressionChild::String(String::const_new("(...args)")));
            ExpressionNode::Compound(Box::new_in(guarded, allocator))
        }
    }
}

/// `.right` and `.middle` clicks fire as other DOM events.
fn rename_click<'a>(allocator: &'a Bump, key: ExpressionNode<'a>, event: &str) -> ExpressionNode<'a> {
    match key {
        ExpressionNode::Simple(mut simple) if simple.is_static => {
            if simple.content.eq_ignore_ascii_case("onclick") {
                simple.content = String::from(event);
            }
            ExpressionNode::Simple(simple)
        }
        ExpressionNode::Compound(compound) => {
            let mut renamed = CompoundExpressionNode::new(allocator, compound.loc.clone());
            let copy = compound.clone_in(allocator);
            renamed.children.push(CompoundExpressionChild::String(String::const_new("(")));
            renamed.children.push(CompoundExpressionChild::Compound(compound));
            renamed.children.push(CompoundExpressionChild::String(format_compact!(
                ") === \"onClick\" ? \"{event}\" : ("
            )));
            renamed.children.push(CompoundExpressionChild::Compound(copy));
            renamed.children.push(CompoundExpressionChild::String(String::const_new(")")));
            ExpressionNode::Compound(Box::new_in(renamed, allocator))
        }
        other => other,
    }
}

fn json_list(items: &[String]) -> String {
    let mut list = String::const_new("[");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            list.push(',');
        }
        list.push_str(&string_literal(item));
    }
    list.push(']');
    list
}
