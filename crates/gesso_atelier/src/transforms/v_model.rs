//! v-model directive transform.
//!
//! Components receive a value prop and an `onUpdate:*` listener. Native
//! form elements only get the listener; the value is applied by one of
//! the `vModel*` runtime directives.

use compact_str::format_compact;

use gesso_carton::{camelize, is_simple_identifier, Bump, CloneIn, String};

use crate::ast::*;
use crate::errors::ErrorCode;
use crate::options::BindingType;
use crate::transform::{DirectiveTransformResult, NeedRuntime, TransformContext};
use crate::transforms::utils::{exp_has_scope_ref, is_member_expression, property, simple_js, string_literal, wrap_expression};

pub fn transform_model<'a>(
    dir: &DirectiveNode<'a>,
    el: &ElementNode<'a>,
    ctx: &mut TransformContext<'a>,
) -> DirectiveTransformResult<'a> {
    let mut result = build_model_props(dir, el, ctx);
    if result.props.is_empty() || el.tag_type == ElementType::Component {
        return result;
    }

    if dir.arg.is_some() {
        ctx.on_error(ErrorCode::VModelArgOnElement, dir.arg.as_ref().map(|arg| arg.loc()));
    }
    match native_model_helper(el, ctx) {
        Ok(Some(helper)) => result.need_runtime = NeedRuntime::Helper(ctx.helper(helper)),
        Ok(None) => {}
        Err(code) => ctx.on_error(code, Some(&dir.loc)),
    }
    // The runtime directive receives the value as its binding.
    result.props.retain(|p| !p.key.is_static_named("modelValue"));
    result
}

/// The value/listener pair, shared by components and native elements.
fn build_model_props<'a>(
    dir: &DirectiveNode<'a>,
    el: &ElementNode<'a>,
    ctx: &mut TransformContext<'a>,
) -> DirectiveTransformResult<'a> {
    let allocator = ctx.allocator;
    let Some(exp) = &dir.exp else {
        ctx.on_error(ErrorCode::VModelNoExpression, Some(&dir.loc));
        return DirectiveTransformResult::empty();
    };

    let raw = raw_source(exp);
    let binding = ctx
        .options
        .binding_metadata
        .as_ref()
        .and_then(|metadata| metadata.get(&raw));
    if matches!(binding, Some(BindingType::Props | BindingType::PropsAliased)) {
        ctx.on_error(ErrorCode::VModelOnProps, Some(exp.loc()));
        return DirectiveTransformResult::empty();
    }

    let maybe_ref = ctx.options.inline
        && matches!(
            binding,
            Some(BindingType::SetupLet | BindingType::SetupRef | BindingType::SetupMaybeRef)
        );
    if raw.is_empty() || (!is_member_expression(&raw) && !maybe_ref) {
        ctx.on_error(ErrorCode::VModelMalformedExpression, Some(exp.loc()));
        return DirectiveTransformResult::empty();
    }
    // Loop aliases and slot props are copies; assigning to them is lost.
    if is_simple_identifier(&raw) && ctx.is_tracked(&raw) {
        ctx.on_error(ErrorCode::VModelOnScopeVariable, Some(exp.loc()));
        return DirectiveTransformResult::empty();
    }

    let prop_name = match &dir.arg {
        Some(arg) => arg.clone_in(allocator),
        None => ExpressionNode::simple(
            allocator,
            SimpleExpressionNode::new("modelValue", true, SourceLocation::STUB),
        ),
    };
    let event_name = match &dir.arg {
        Some(ExpressionNode::Simple(arg)) if arg.is_static => ExpressionNode::simple(
            allocator,
            SimpleExpressionNode::new(
                format_compact!("onUpdate:{}", camelize(&arg.content)),
                true,
                SourceLocation::STUB,
            ),
        ),
        Some(arg) => wrap_expression(allocator, "\"onUpdate:\" + ", arg.clone_in(allocator), ""),
        None => ExpressionNode::simple(
            allocator,
            SimpleExpressionNode::new("onUpdate:modelValue", true, SourceLocation::STUB),
        ),
    };

    let event_arg = if ctx.options.is_ts { "($event: any)" } else { "$event" };
    let assignment = if maybe_ref {
        let body = if binding == Some(BindingType::SetupRef) {
            format_compact!("{event_arg} => (({raw}).value = $event)")
        } else {
            let fallback = if binding == Some(BindingType::SetupLet) {
                format_compact!("{raw} = $event")
            } else {
                String::const_new("null")
            };
            let is_ref = ctx.helper(RuntimeHelper::IsRef);
            format_compact!(
                "{event_arg} => (_{}({raw}) ? ({raw}).value = $event : {fallback})",
                is_ref.name()
            )
        };
        simple_js(allocator, body, false, ConstantType::NotConstant)
    } else {
        let target = wrap_expression(
            allocator,
            &format_compact!("{event_arg} => (("),
            exp.clone_in(allocator),
            ") = $event)",
        );
        JsChildNode::from_expression(target)
    };

    let handler = if ctx.options.prefix_identifiers
        && !ctx.in_v_once
        && ctx.options.cache_handlers
        && !exp_has_scope_ref(exp, &ctx.identifiers)
    {
        ctx.cache(assignment, false)
    } else {
        assignment
    };

    let mut props = vec![
        Property {
            key: prop_name,
            value: JsChildNode::from_expression(exp.clone_in(allocator)),
            loc: dir.loc.clone(),
        },
        Property {
            key: event_name,
            value: handler,
            loc: dir.loc.clone(),
        },
    ];

    if !dir.modifiers.is_empty() && el.tag_type == ElementType::Component {
        props.push(modifiers_property(allocator, dir));
    }
    DirectiveTransformResult::props(props)
}

/// `modelModifiers: { trim: true }`, or `<arg>Modifiers` for named models.
fn modifiers_property<'a>(allocator: &'a Bump, dir: &DirectiveNode<'a>) -> Property<'a> {
    let mut object = String::const_new("{ ");
    for (i, modifier) in dir.modifiers.iter().enumerate() {
        if i > 0 {
            object.push_str(", ");
        }
        if is_simple_identifier(&modifier.content) {
            object.push_str(&modifier.content);
        } else {
            object.push_str(&string_literal(&modifier.content));
        }
        object.push_str(": true");
    }
    object.push_str(" }");
    let value = simple_js(allocator, object, false, ConstantType::CanHoist);

    match &dir.arg {
        Some(ExpressionNode::Simple(arg)) if arg.is_static => {
            property(allocator, &format_compact!("{}Modifiers", arg.content), value)
        }
        Some(arg) => Property {
            key: wrap_expression(allocator, "", arg.clone_in(allocator), " + \"Modifiers\""),
            value,
            loc: dir.loc.clone(),
        },
        None => property(allocator, "modelModifiers", value),
    }
}

/// Runtime directive for a native form element.
///
/// `Ok(None)` means the element cannot be bound (file inputs); the error
/// is reported here.
fn native_model_helper(
    el: &ElementNode<'_>,
    ctx: &mut TransformContext<'_>,
) -> Result<Option<RuntimeHelper>, ErrorCode> {
    match el.tag.as_str() {
        "input" => match el.find_prop("type", false, true) {
            Some(PropNode::Directive(_)) => Ok(Some(RuntimeHelper::VModelDynamic)),
            Some(PropNode::Attribute(attr)) => {
                match attr.value.as_ref().map(|v| v.content.as_str()) {
                    Some("radio") => Ok(Some(RuntimeHelper::VModelRadio)),
                    Some("checkbox") => Ok(Some(RuntimeHelper::VModelCheckbox)),
                    Some("file") => {
                        ctx.on_error(ErrorCode::VModelOnFileInputElement, Some(&attr.loc));
                        Ok(None)
                    }
                    _ => {
                        check_duplicated_value(el, ctx);
                        Ok(Some(RuntimeHelper::VModelText))
                    }
                }
            }
            None if has_dynamic_key_bind(el) => Ok(Some(RuntimeHelper::VModelDynamic)),
            None => {
                check_duplicated_value(el, ctx);
                Ok(Some(RuntimeHelper::VModelText))
            }
        },
        "select" => Ok(Some(RuntimeHelper::VModelSelect)),
        "textarea" => {
            check_duplicated_value(el, ctx);
            Ok(Some(RuntimeHelper::VModelText))
        }
        _ => Err(ErrorCode::VModelOnInvalidElement),
    }
}

/// `v-bind="obj"` or `:[key]` may set `type` at runtime.
fn has_dynamic_key_bind(el: &ElementNode<'_>) -> bool {
    el.props.iter().any(|prop| match prop {
        PropNode::Directive(dir) => dir.name == "bind" && !dir.arg.as_ref().is_some_and(ExpressionNode::is_static_exp),
        PropNode::Attribute(_) => false,
    })
}

fn check_duplicated_value(el: &ElementNode<'_>, ctx: &mut TransformContext<'_>) {
    if let Some(dir) = el.find_dir("bind", true).filter(|dir| dir.is_static_arg("value")) {
        ctx.on_error(ErrorCode::VModelUnnecessaryValue, Some(&dir.loc));
    }
}

/// Source text of the model target as the author wrote it.
fn raw_source(exp: &ExpressionNode<'_>) -> String {
    let source = exp.loc().source.trim();
    if source.is_empty() {
        String::from(exp.content().trim())
    } else {
        String::from(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::BindingMetadata;
    use crate::test_utils::{element_at, prefixed, render_js, render_props, transformed, vnode_call};
    use crate::TransformOptions;

    fn error_codes(source: &str, options: TransformOptions) -> std::vec::Vec<ErrorCode> {
        transformed(source, options, |_, errors| errors.iter().map(|e| e.code).collect())
    }

    fn props_and_directive(source: &str, options: TransformOptions) -> (std::string::String, Option<Callee>) {
        transformed(source, options, |root, errors| {
            assert!(errors.is_empty(), "{errors:?}");
            let call = vnode_call(element_at(root, &[0, 0]));
            let props = call.props.as_ref().map(render_props).unwrap_or_default();
            let directive = call
                .directives
                .as_ref()
                .map(|d| d.elements[0].directive.clone());
            (props, directive)
        })
    }

    #[test]
    fn test_text_input() {
        let (props, directive) = props_and_directive(
            r#"<div><input v-model="msg"></div>"#,
            TransformOptions::default(),
        );
        assert_eq!(props, r#"{ onUpdate:modelValue: $event => ((msg) = $event) }"#);
        assert_eq!(directive, Some(Callee::Symbol(RuntimeHelper::VModelText)));
    }

    #[test]
    fn test_native_helpers() {
        let cases = [
            (r#"<div><input type="checkbox" v-model="a"></div>"#, RuntimeHelper::VModelCheckbox),
            (r#"<div><input type="radio" v-model="a"></div>"#, RuntimeHelper::VModelRadio),
            (r#"<div><input :type="t" v-model="a"></div>"#, RuntimeHelper::VModelDynamic),
            (r#"<div><input v-bind="attrs" v-model="a"></div>"#, RuntimeHelper::VModelDynamic),
            (r#"<div><select v-model="a"></select></div>"#, RuntimeHelper::VModelSelect),
            (r#"<div><textarea v-model="a"></textarea></div>"#, RuntimeHelper::VModelText),
        ];
        for (source, helper) in cases {
            let (_, directive) = props_and_directive(source, TransformOptions::default());
            assert_eq!(directive, Some(Callee::Symbol(helper)), "{source}");
        }
    }

    #[test]
    fn test_component() {
        let (props, directive) = props_and_directive(
            r#"<div><Comp v-model="msg" /></div>"#,
            prefixed(),
        );
        assert_eq!(
            props,
            r#"{ modelValue: _ctx.msg, onUpdate:modelValue: $event => ((_ctx.msg) = $event) }"#
        );
        assert!(directive.is_none());
    }

    #[test]
    fn test_component_named_model_with_modifiers() {
        let (props, _) = props_and_directive(
            r#"<div><Comp v-model:title.trim.my-mod="t" /></div>"#,
            TransformOptions::default(),
        );
        assert_eq!(
            props,
            r#"{ title: t, onUpdate:title: $event => ((t) = $event), titleModifiers: { trim: true, "my-mod": true } }"#
        );
    }

    #[test]
    fn test_dynamic_model_name() {
        transformed(r#"<div><Comp v-model:[name]="v" /></div>"#, TransformOptions::default(), |root, _| {
            let call = vnode_call(element_at(root, &[0, 0]));
            let props = call.props.as_ref().map(render_props).unwrap_or_default();
            assert!(props.contains(r#"["onUpdate:" + name]"#), "{props}");
        });
    }

    #[test]
    fn test_cached_handler() {
        let options = TransformOptions {
            cache_handlers: true,
            ..prefixed()
        };
        transformed(r#"<div><input v-model="msg"></div>"#, options, |root, _| {
            let call = vnode_call(element_at(root, &[0, 0]));
            let Some(PropsExpression::Object(object)) = &call.props else {
                panic!("expected props object");
            };
            assert_eq!(
                render_js(&object.properties[0].value),
                "_cache[0]($event => ((_ctx.msg) = $event))"
            );
        });
    }

    #[test]
    fn test_setup_ref_inline() {
        let mut metadata = BindingMetadata::default();
        metadata.bindings.insert("count".into(), BindingType::SetupRef);
        metadata.bindings.insert("maybe".into(), BindingType::SetupMaybeRef);
        metadata.is_script_setup = true;
        let options = TransformOptions {
            inline: true,
            binding_metadata: Some(metadata),
            ..prefixed()
        };
        let (props, _) = props_and_directive(
            r#"<div><input v-model="count"><input v-model="maybe"></div>"#,
            options.clone(),
        );
        assert_eq!(props, r#"{ onUpdate:modelValue: $event => ((count).value = $event) }"#);

        transformed(r#"<div><input v-model="count"><input v-model="maybe"></div>"#, options, |root, _| {
            let call = vnode_call(element_at(root, &[0, 1]));
            let props = call.props.as_ref().map(render_props).unwrap_or_default();
            assert_eq!(
                props,
                r#"{ onUpdate:modelValue: $event => (_isRef(maybe) ? (maybe).value = $event : null) }"#
            );
            assert!(root.has_helper(RuntimeHelper::IsRef));
        });
    }

    #[test]
    fn test_errors() {
        let options = TransformOptions::default;
        assert_eq!(
            error_codes(r#"<div><input v-model></div>"#, options()),
            vec![ErrorCode::VModelNoExpression]
        );
        assert_eq!(
            error_codes(r#"<div><input v-model="a + b"></div>"#, options()),
            vec![ErrorCode::VModelMalformedExpression]
        );
        assert_eq!(
            error_codes(r#"<div><input v-model:foo="a"></div>"#, options()),
            vec![ErrorCode::VModelArgOnElement]
        );
        assert_eq!(
            error_codes(r#"<div><input type="file" v-model="a"></div>"#, options()),
            vec![ErrorCode::VModelOnFileInputElement]
        );
        assert_eq!(
            error_codes(r#"<div><input :value="b" v-model="a"></div>"#, options()),
            vec![ErrorCode::VModelUnnecessaryValue]
        );
        assert_eq!(
            error_codes(r#"<div><span v-model="a"></span></div>"#, options()),
            vec![ErrorCode::VModelOnInvalidElement]
        );
    }

    #[test]
    fn test_props_binding_is_rejected() {
        let mut metadata = BindingMetadata::default();
        metadata.bindings.insert("title".into(), BindingType::Props);
        let options = TransformOptions {
            binding_metadata: Some(metadata),
            ..prefixed()
        };
        assert_eq!(
            error_codes(r#"<div><input v-model="title"></div>"#, options),
            vec![ErrorCode::VModelOnProps]
        );
    }

    #[test]
    fn test_loop_alias_is_not_writable() {
        transformed(
            r#"<div><input v-for="item in list" v-model="item"></div>"#,
            TransformOptions::default(),
            |root, errors| {
                let codes: std::vec::Vec<_> = errors.iter().map(|e| e.code).collect();
                assert_eq!(codes, vec![ErrorCode::VModelOnScopeVariable]);
                let TemplateChildNode::For(for_node) = &element_at(root, &[0]).children[0] else {
                    panic!("expected for node");
                };
                let input = for_node.children[0].as_element().unwrap();
                let call = vnode_call(input);
                assert!(call.props.is_none());
            },
        );
    }
}
