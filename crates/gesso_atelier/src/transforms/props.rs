//! Props builder.
//!
//! Turns the attributes and directives of an element into the props
//! argument of its vnode call, and works out the patch flag and dynamic
//! prop names the runtime diff relies on.

use compact_str::format_compact;
use rustc_hash::FxHashMap;

use gesso_carton::{
    camelize, capitalize, is_builtin_directive, is_on, is_reserved_prop, to_valid_asset_id, Box,
    Bump, CloneIn, PatchFlags, String,
};

use crate::ast::*;
use crate::errors::ErrorCode;
use crate::options::BindingType;
use crate::transform::{NeedRuntime, TransformContext};
use crate::transforms::hoist_static::compound_constant_type;
use crate::transforms::utils::{
    arena_vec, call_expression, js_call, js_object, object_expression, property, props_from_js,
    simple_js, string_literal,
};

/// Directive applied at runtime through `withDirectives`.
#[derive(Debug)]
pub struct RuntimeDirective<'a> {
    pub dir: DirectiveNode<'a>,
    /// Built-in implementation; `None` resolves a user directive.
    pub helper: Option<RuntimeHelper>,
}

#[derive(Debug)]
pub struct PropsBuildResult<'a> {
    pub props: Option<PropsExpression<'a>>,
    pub directives: std::vec::Vec<RuntimeDirective<'a>>,
    pub patch_flag: PatchFlags,
    pub dynamic_prop_names: std::vec::Vec<String>,
    pub should_use_block: bool,
}

#[derive(Debug, Default)]
struct FlagAnalysis {
    has_ref: bool,
    has_class_binding: bool,
    has_style_binding: bool,
    has_hydration_event_binding: bool,
    has_dynamic_keys: bool,
    has_vnode_hook: bool,
    dynamic_prop_names: std::vec::Vec<String>,
}

impl FlagAnalysis {
    fn add_name(&mut self, name: &str) {
        if !self.dynamic_prop_names.iter().any(|n| n == name) {
            self.dynamic_prop_names.push(String::from(name));
        }
    }

    fn analyze(&mut self, prop: &Property<'_>, is_component: bool, is_dynamic_component: bool) {
        if !prop.key.is_static_exp() {
            self.has_dynamic_keys = true;
            return;
        }
        let name = prop.key.content();
        let is_event = is_on(name);
        if is_event
            && (!is_component || is_dynamic_component)
            && !name.eq_ignore_ascii_case("onclick")
            && name != "onUpdate:modelValue"
            && !is_reserved_prop(name)
        {
            self.has_hydration_event_binding = true;
        }
        if is_event && is_reserved_prop(name) {
            self.has_vnode_hook = true;
        }

        // Handlers wrapped by a runtime helper are judged by what they wrap.
        let value = match &prop.value {
            JsChildNode::Call(call) if is_event => match call.arguments.first() {
                Some(CallArgument::Js(inner)) => inner,
                _ => &prop.value,
            },
            other => other,
        };
        if is_constant_value(value) {
            return;
        }

        match name {
            "ref" => self.has_ref = true,
            "class" => self.has_class_binding = true,
            "style" => self.has_style_binding = true,
            "key" => {}
            _ => self.add_name(name),
        }
        if is_component && (name == "class" || name == "style") {
            self.add_name(name);
        }
    }
}

fn is_constant_value(value: &JsChildNode<'_>) -> bool {
    match value {
        JsChildNode::Cache(_) => true,
        JsChildNode::Simple(simple) => simple.const_type > ConstantType::NotConstant,
        JsChildNode::Compound(compound) => compound_constant_type(compound) > ConstantType::NotConstant,
        _ => false,
    }
}

/// `component` and `Component` take their real type from `is`.
pub fn is_component_tag(tag: &str) -> bool {
    tag == "component" || tag == "Component"
}

fn ref_for_marker(allocator: &Bump) -> Property<'_> {
    property(
        allocator,
        "ref_for",
        simple_js(allocator, "true", false, ConstantType::NotConstant),
    )
}

/// Move the pending object properties into the merge arguments.
fn push_pending<'a>(
    allocator: &'a Bump,
    properties: &mut std::vec::Vec<Property<'a>>,
    merge_args: &mut std::vec::Vec<JsChildNode<'a>>,
) {
    if !properties.is_empty() {
        let deduped = dedupe_properties(std::mem::take(properties), allocator);
        merge_args.push(js_object(allocator, deduped));
    }
}

/// Build the props of `el` from `props`.
///
/// `props` is usually the element's own prop list; slot outlets pass a
/// filtered copy with camelized names.
pub fn build_props<'a>(
    ctx: &mut TransformContext<'a>,
    el: &ElementNode<'a>,
    props: &[&PropNode<'a>],
    is_component: bool,
    is_dynamic_component: bool,
) -> PropsBuildResult<'a> {
    let allocator = ctx.allocator;
    let is_component_tag = is_component_tag(&el.tag);
    let has_children = !el.children.is_empty();

    let mut properties: std::vec::Vec<Property<'a>> = std::vec::Vec::new();
    let mut merge_args: std::vec::Vec<JsChildNode<'a>> = std::vec::Vec::new();
    let mut directives = std::vec::Vec::new();
    let mut analysis = FlagAnalysis::default();
    let mut patch_flag = PatchFlags::empty();
    let mut should_use_block = false;

    for prop in props {
        let dir = match prop {
            PropNode::Attribute(attr) => {
                let name = attr.name.as_str();
                let mut is_static = true;
                if name == "ref" {
                    analysis.has_ref = true;
                    if ctx.scopes.v_for > 0 {
                        properties.push(ref_for_marker(allocator));
                    }
                    // Inline render functions have no setup state to look the
                    // ref up by name; pass the binding itself.
                    if let Some(value) = &attr.value {
                        if ctx.options.inline && is_ref_binding(ctx, &value.content) {
                            is_static = false;
                            properties.push(property(
                                allocator,
                                "ref_key",
                                simple_js(allocator, value.content.clone(), true, ConstantType::CanStringify),
                            ));
                        }
                    }
                }
                if name == "is"
                    && (is_component_tag
                        || attr.value.as_ref().is_some_and(|v| v.content.starts_with("vue:")))
                {
                    continue;
                }
                let (content, value_loc) = match &attr.value {
                    Some(value) => (value.content.clone(), value.loc.clone()),
                    None => (String::default(), attr.loc.clone()),
                };
                let const_type = if is_static {
                    ConstantType::CanStringify
                } else {
                    ConstantType::NotConstant
                };
                properties.push(Property {
                    key: ExpressionNode::simple(
                        allocator,
                        SimpleExpressionNode::new(name, true, attr.name_loc.clone()),
                    ),
                    value: JsChildNode::Simple(Box::new_in(
                        SimpleExpressionNode::with_const_type(content, is_static, value_loc, const_type),
                        allocator,
                    )),
                    loc: attr.loc.clone(),
                });
                continue;
            }
            PropNode::Directive(dir) => &**dir,
        };

        let name = dir.name.as_str();
        let is_v_bind = name == "bind";
        let is_v_on = name == "on";

        if name == "slot" {
            if !is_component {
                ctx.on_error(ErrorCode::VSlotMisplaced, Some(&dir.loc));
            }
            continue;
        }
        if name == "once" || name == "memo" || name == "is" {
            continue;
        }
        if is_v_bind && dir.is_static_arg("is") && is_component_tag {
            continue;
        }
        if is_v_on && ctx.options.ssr {
            continue;
        }

        if (is_v_bind && dir.is_static_arg("key"))
            || (is_v_on && has_children && dir.is_static_arg("vue:before-update"))
        {
            should_use_block = true;
        }
        if is_v_bind && dir.is_static_arg("ref") && ctx.scopes.v_for > 0 {
            properties.push(ref_for_marker(allocator));
        }

        // `v-bind="obj"` and `v-on="handlers"`
        if dir.arg.is_none() && (is_v_bind || is_v_on) {
            analysis.has_dynamic_keys = true;
            let Some(exp) = &dir.exp else {
                let code = if is_v_bind {
                    ErrorCode::VBindNoExpression
                } else {
                    ErrorCode::VOnNoExpression
                };
                ctx.on_error(code, Some(&dir.loc));
                continue;
            };
            push_pending(allocator, &mut properties, &mut merge_args);
            let exp = JsChildNode::from_expression(exp.clone_in(allocator));
            if is_v_bind {
                merge_args.push(exp);
            } else {
                let mut arguments = vec![CallArgument::Js(exp)];
                if !is_component {
                    arguments.push(CallArgument::String(String::const_new("true")));
                }
                let helper = ctx.helper(RuntimeHelper::ToHandlers);
                merge_args.push(js_call(allocator, helper, arguments));
            }
            continue;
        }

        if is_v_bind && dir.has_modifier("prop") {
            patch_flag |= PatchFlags::NEED_HYDRATION;
        }

        if let Some(transform) = ctx.directive_transform(name) {
            let result = transform(dir, el, ctx);
            if !ctx.options.ssr {
                for prop in &result.props {
                    analysis.analyze(prop, is_component, is_dynamic_component);
                }
            }
            let has_dynamic_event = is_v_on && dir.arg.as_ref().is_some_and(|arg| !arg.is_static_exp());
            if has_dynamic_event {
                push_pending(allocator, &mut properties, &mut merge_args);
                merge_args.push(js_object(allocator, result.props));
            } else {
                properties.extend(result.props);
            }
            match result.need_runtime {
                NeedRuntime::None => {}
                NeedRuntime::Resolve => directives.push(RuntimeDirective {
                    dir: dir.clone_in(allocator),
                    helper: None,
                }),
                NeedRuntime::Helper(helper) => directives.push(RuntimeDirective {
                    dir: dir.clone_in(allocator),
                    helper: Some(helper),
                }),
            }
        } else if !is_builtin_directive(name) {
            directives.push(RuntimeDirective {
                dir: dir.clone_in(allocator),
                helper: None,
            });
            // Custom directives may touch children through their hooks.
            if has_children {
                should_use_block = true;
            }
        }
    }

    let mut props_expression = if !merge_args.is_empty() {
        push_pending(allocator, &mut properties, &mut merge_args);
        if merge_args.len() > 1 {
            let helper = ctx.helper(RuntimeHelper::MergeProps);
            let call = call_expression(allocator, helper, merge_args.into_iter().map(CallArgument::Js));
            Some(PropsExpression::Call(Box::new_in(call, allocator)))
        } else {
            merge_args.pop().map(|js| props_from_js(js, ctx))
        }
    } else if !properties.is_empty() {
        let deduped = dedupe_properties(properties, allocator);
        Some(PropsExpression::Object(Box::new_in(
            object_expression(allocator, deduped),
            allocator,
        )))
    } else {
        None
    };

    if analysis.has_dynamic_keys {
        patch_flag |= PatchFlags::FULL_PROPS;
    } else {
        if analysis.has_class_binding && !is_component {
            patch_flag |= PatchFlags::CLASS;
        }
        if analysis.has_style_binding && !is_component {
            patch_flag |= PatchFlags::STYLE;
        }
        if !analysis.dynamic_prop_names.is_empty() {
            patch_flag |= PatchFlags::PROPS;
        }
        if analysis.has_hydration_event_binding {
            patch_flag |= PatchFlags::NEED_HYDRATION;
        }
    }
    if !should_use_block
        && (patch_flag.is_empty() || patch_flag == PatchFlags::NEED_HYDRATION)
        && (analysis.has_ref || analysis.has_vnode_hook || !directives.is_empty())
    {
        patch_flag |= PatchFlags::NEED_PATCH;
    }

    if !ctx.options.ssr {
        props_expression = props_expression
            .map(|props| normalize_props(ctx, props, analysis.has_style_binding));
    }

    tracing::trace!(
        tag = %el.tag,
        flag = ?patch_flag.names(),
        directives = directives.len(),
        "built props"
    );
    PropsBuildResult {
        props: props_expression,
        directives,
        patch_flag,
        dynamic_prop_names: analysis.dynamic_prop_names,
        should_use_block,
    }
}

fn is_ref_binding(ctx: &TransformContext<'_>, name: &str) -> bool {
    matches!(
        ctx.options.binding_metadata.as_ref().and_then(|m| m.get(name)),
        Some(BindingType::SetupLet | BindingType::SetupRef | BindingType::SetupMaybeRef)
    )
}

/// Wrap class/style values (or the whole props) in their runtime normalizers.
fn normalize_props<'a>(
    ctx: &mut TransformContext<'a>,
    props: PropsExpression<'a>,
    has_style_binding: bool,
) -> PropsExpression<'a> {
    let allocator = ctx.allocator;
    match props {
        PropsExpression::Object(mut object) => {
            let has_dynamic_key = object
                .properties
                .iter()
                .any(|p| !p.key.is_static_exp() && !p.key.is_handler_key());
            if has_dynamic_key {
                let helper = ctx.helper(RuntimeHelper::NormalizeProps);
                let call = call_expression(
                    allocator,
                    helper,
                    [CallArgument::Js(JsChildNode::Object(object))],
                );
                return PropsExpression::Call(Box::new_in(call, allocator));
            }

            for prop in object.properties.iter_mut() {
                let wrap = if prop.key.is_static_named("class") {
                    let is_static = matches!(&prop.value, JsChildNode::Simple(s) if s.is_static);
                    (!is_static).then_some(RuntimeHelper::NormalizeClass)
                } else if prop.key.is_static_named("style") {
                    let needs = has_style_binding
                        || matches!(&prop.value, JsChildNode::Simple(s) if s.content.trim_start().starts_with('['))
                        || matches!(&prop.value, JsChildNode::Array(_));
                    needs.then_some(RuntimeHelper::NormalizeStyle)
                } else {
                    None
                };
                if let Some(helper) = wrap {
                    ctx.helper(helper);
                    let value = std::mem::replace(&mut prop.value, JsChildNode::Tree(TreeRef::Children));
                    prop.value = js_call(allocator, helper, [CallArgument::Js(value)]);
                }
            }
            PropsExpression::Object(object)
        }
        call @ PropsExpression::Call(_) => call,
        PropsExpression::Expression(exp) => {
            let guard = js_call(
                allocator,
                ctx.helper(RuntimeHelper::GuardReactiveProps),
                [CallArgument::Js(JsChildNode::from_expression(exp))],
            );
            let call = call_expression(
                allocator,
                ctx.helper(RuntimeHelper::NormalizeProps),
                [CallArgument::Js(guard)],
            );
            PropsExpression::Call(Box::new_in(call, allocator))
        }
    }
}

/// Drop repeated static keys. `class`, `style` and listeners merge into an
/// array instead, so both values reach the runtime.
fn dedupe_properties<'a>(
    properties: std::vec::Vec<Property<'a>>,
    allocator: &'a Bump,
) -> std::vec::Vec<Property<'a>> {
    let mut known: FxHashMap<String, usize> = FxHashMap::default();
    let mut deduped: std::vec::Vec<Property<'a>> = std::vec::Vec::with_capacity(properties.len());
    for prop in properties {
        if !prop.key.is_static_exp() {
            deduped.push(prop);
            continue;
        }
        let name = String::from(prop.key.content());
        match known.get(&name) {
            Some(&index) => {
                if name == "class" || name == "style" || is_on(&name) {
                    merge_as_array(allocator, &mut deduped[index], prop.value);
                }
            }
            None => {
                known.insert(name, deduped.len());
                deduped.push(prop);
            }
        }
    }
    deduped
}

fn merge_as_array<'a>(allocator: &'a Bump, existing: &mut Property<'a>, incoming: JsChildNode<'a>) {
    if let JsChildNode::Array(array) = &mut existing.value {
        array.elements.push(incoming);
        return;
    }
    let first = std::mem::replace(&mut existing.value, JsChildNode::Tree(TreeRef::Children));
    existing.value = JsChildNode::Array(Box::new_in(
        ArrayExpression {
            elements: arena_vec(allocator, [first, incoming]),
            loc: existing.loc.clone(),
        },
        allocator,
    ));
}

/// `[dir, exp, arg, modifiers]` entry of a `withDirectives` call.
pub fn build_directive_args<'a>(
    ctx: &mut TransformContext<'a>,
    runtime: RuntimeDirective<'a>,
) -> DirectiveArgumentNode<'a> {
    let allocator = ctx.allocator;
    let RuntimeDirective { dir, helper } = runtime;

    let directive = match helper {
        Some(helper) => Callee::Symbol(helper),
        None => {
            let setup_name = format_compact!("v-{}", dir.name);
            match resolve_setup_reference(ctx, &setup_name) {
                Some(reference) => Callee::String(reference),
                None => {
                    ctx.helper(RuntimeHelper::ResolveDirective);
                    ctx.add_directive(&dir.name);
                    Callee::String(to_valid_asset_id(&dir.name, "directive"))
                }
            }
        }
    };

    let modifiers = (!dir.modifiers.is_empty()).then(|| {
        let properties = dir.modifiers.iter().map(|modifier| Property {
            key: ExpressionNode::simple(allocator, modifier.clone_in(allocator)),
            value: JsChildNode::Simple(Box::new_in(
                SimpleExpressionNode::new("true", false, dir.loc.clone()),
                allocator,
            )),
            loc: modifier.loc.clone(),
        });
        Box::new_in(object_expression(allocator, properties), allocator)
    });

    DirectiveArgumentNode {
        directive,
        exp: dir.exp,
        arg: dir.arg,
        modifiers,
    }
}

/// Resolve `name` against the bindings of a `<script setup>` block.
///
/// Tries the name as written, camelized and PascalCased, in that order.
pub fn resolve_setup_reference(ctx: &mut TransformContext<'_>, name: &str) -> Option<String> {
    let bindings = ctx.options.binding_metadata.as_ref()?;
    if !bindings.is_script_setup {
        return None;
    }
    let camel = camelize(name);
    let pascal = capitalize(&camel);
    let check = |kinds: &[BindingType]| -> Option<String> {
        [name, camel.as_str(), pascal.as_str()]
            .into_iter()
            .find(|candidate| bindings.get(candidate).is_some_and(|t| kinds.contains(&t)))
            .map(String::from)
    };

    let inline = ctx.options.inline;
    if let Some(found) = check(&[
        BindingType::SetupConst,
        BindingType::SetupReactiveConst,
        BindingType::LiteralConst,
    ]) {
        return Some(if inline {
            found
        } else {
            format_compact!("$setup[{}]", string_literal(&found))
        });
    }
    if let Some(found) = check(&[
        BindingType::SetupLet,
        BindingType::SetupRef,
        BindingType::SetupMaybeRef,
    ]) {
        if !inline {
            return Some(format_compact!("$setup[{}]", string_literal(&found)));
        }
        let unref = ctx.helper(RuntimeHelper::Unref);
        return Some(format_compact!("_{}({})", unref.name(), found));
    }
    let found = check(&[BindingType::Props])?;
    let unref = ctx.helper(RuntimeHelper::Unref);
    let source = if inline { "__props" } else { "$props" };
    Some(format_compact!(
        "_{}({}[{}])",
        unref.name(),
        source,
        string_literal(&found)
    ))
}
