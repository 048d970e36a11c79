//! Element transform.
//!
//! Builds the vnode call of plain elements and components on exit, once
//! every child has its own codegen: tag, props, children, patch flag,
//! dynamic prop names and runtime directives.

use compact_str::format_compact;

use gesso_carton::{camelize, capitalize, to_valid_asset_id, Box, CloneIn, PatchFlags, String};

use crate::ast::*;
use crate::transform::{
    exit_fn, vnode_call_helpers, ExitFn, ExpressionMode, TransformContext, TransformNode,
};
use crate::transforms::hoist_static::text_constant_type;
use crate::transforms::props::{build_directive_args, build_props, is_component_tag, resolve_setup_reference};
use crate::transforms::utils::{arena_vec, call_expression, simple_expression, string_literal};
use crate::transforms::v_slot::build_slots;

/// Register the vnode call builder for elements and components.
pub fn transform_element<'a>(
    ctx: &mut TransformContext<'a>,
    node: &mut TransformNode<'_, 'a>,
) -> Option<std::vec::Vec<ExitFn<'a>>> {
    let el = node.element(ctx.cursor)?;
    if !matches!(el.tag_type, ElementType::Element | ElementType::Component) {
        return None;
    }

    Some(vec![exit_fn(|ctx, node| {
        let cursor = ctx.cursor;
        let Some(el) = node.element(cursor) else {
            return;
        };
        if !matches!(el.tag_type, ElementType::Element | ElementType::Component) {
            return;
        }
        let codegen = build_vnode_call(ctx, el);
        if let Some(el) = node.element_mut(cursor) {
            el.codegen_node = Some(codegen);
        }
    })])
}

fn build_vnode_call<'a>(ctx: &mut TransformContext<'a>, el: &ElementNode<'a>) -> JsChildNode<'a> {
    let allocator = ctx.allocator;
    let is_component = el.tag_type == ElementType::Component;
    let tag = if is_component {
        resolve_component_type(ctx, el)
    } else {
        VNodeTag::String(string_literal(&el.tag))
    };

    let is_dynamic_component = matches!(
        &tag,
        VNodeTag::Call(call) if call.callee == Callee::Symbol(RuntimeHelper::ResolveDynamicComponent)
    );
    let is_tag = |helper: RuntimeHelper| matches!(tag, VNodeTag::Symbol(h) if h == helper);
    let is_teleport = is_tag(RuntimeHelper::Teleport);
    let is_keep_alive = is_tag(RuntimeHelper::KeepAlive);

    // Dynamic components may resolve to plain elements, and svg/math
    // subtrees need their own block to keep the namespace at runtime.
    let mut should_use_block = is_dynamic_component
        || is_teleport
        || is_tag(RuntimeHelper::Suspense)
        || (!is_component && matches!(el.tag.as_str(), "svg" | "foreignObject" | "math"));

    let mut patch_flag = PatchFlags::empty();
    let mut props = None;
    let mut dynamic_props = None;
    let mut directives = None;

    if !el.props.is_empty() {
        let all: std::vec::Vec<&PropNode<'a>> = el.props.iter().collect();
        let result = build_props(ctx, el, &all, is_component, is_dynamic_component);
        props = result.props;
        patch_flag = result.patch_flag;
        should_use_block |= result.should_use_block;
        if !result.dynamic_prop_names.is_empty() {
            dynamic_props = Some(DynamicProps::Names(arena_vec(
                allocator,
                result.dynamic_prop_names,
            )));
        }
        if !result.directives.is_empty() {
            let elements = result
                .directives
                .into_iter()
                .map(|dir| build_directive_args(ctx, dir))
                .collect::<std::vec::Vec<_>>();
            directives = Some(DirectiveArguments {
                elements: arena_vec(allocator, elements),
                loc: el.loc.clone(),
            });
        }
    }

    let mut children = None;
    if !el.children.is_empty() {
        if is_keep_alive {
            // Children are rendered as slots the runtime must always refresh.
            should_use_block = true;
            patch_flag |= PatchFlags::DYNAMIC_SLOTS;
        }

        if is_component && !is_teleport && !is_keep_alive {
            let slots = build_slots(ctx, el);
            if slots.has_dynamic_slots {
                patch_flag |= PatchFlags::DYNAMIC_SLOTS;
            }
            children = Some(VNodeChildren::Slots(slots.slots));
        } else if el.children.len() == 1 && !is_teleport {
            let child = &el.children[0];
            let has_dynamic_text = matches!(
                child,
                TemplateChildNode::Interpolation(_) | TemplateChildNode::CompoundExpression(_)
            );
            if has_dynamic_text && text_constant_type(child) == ConstantType::NotConstant {
                patch_flag |= PatchFlags::TEXT;
            }
            children = Some(if has_dynamic_text || matches!(child, TemplateChildNode::Text(_)) {
                VNodeChildren::TreeText
            } else {
                VNodeChildren::Tree(TreeRef::Children)
            });
        } else {
            children = Some(VNodeChildren::Tree(TreeRef::Children));
        }
    }

    let call = VNodeCall {
        tag,
        props,
        children,
        patch_flag: (!patch_flag.is_empty()).then_some(patch_flag),
        dynamic_props,
        directives,
        is_block: should_use_block,
        disable_tracking: false,
        is_component,
        loc: el.loc.clone(),
    };
    vnode_call_helpers(ctx, &call);
    tracing::trace!(
        tag = %el.tag,
        block = call.is_block,
        flag = ?patch_flag.names(),
        "built vnode call"
    );
    JsChildNode::VNodeCall(Box::new_in(call, allocator))
}

/// Work out what a component tag renders: a dynamic component, a built-in,
/// a setup binding or a component resolved by name at runtime.
pub fn resolve_component_type<'a>(ctx: &mut TransformContext<'a>, el: &ElementNode<'a>) -> VNodeTag<'a> {
    let allocator = ctx.allocator;
    let mut tag = el.tag.clone();

    if let Some(is_prop) = el.find_prop("is", false, true) {
        if is_component_tag(&el.tag) {
            let exp = match is_prop {
                PropNode::Attribute(attr) => attr
                    .value
                    .as_ref()
                    .map(|v| simple_expression(allocator, v.content.clone(), true)),
                PropNode::Directive(dir) => Some(match &dir.exp {
                    Some(exp) => exp.clone_in(allocator),
                    // `:is` shorthand
                    None => {
                        let exp = simple_expression(allocator, "is", false);
                        ctx.process_expression(exp, ExpressionMode::Normal)
                    }
                }),
            };
            if let Some(exp) = exp {
                let helper = ctx.helper(RuntimeHelper::ResolveDynamicComponent);
                let call = call_expression(
                    allocator,
                    helper,
                    [CallArgument::Js(JsChildNode::from_expression(exp))],
                );
                return VNodeTag::Call(Box::new_in(call, allocator));
            }
        } else if let PropNode::Attribute(attr) = is_prop {
            if let Some(name) = attr.value.as_ref().and_then(|v| v.content.strip_prefix("vue:")) {
                tag = String::from(name);
            }
        }
    }

    if let Some(builtin) = RuntimeHelper::core_component(&tag) {
        if !ctx.options.ssr {
            ctx.helper(builtin);
        }
        return VNodeTag::Symbol(builtin);
    }

    if let Some(reference) = resolve_setup_reference(ctx, &tag) {
        return VNodeTag::String(reference);
    }
    // `<Foo.Bar>` reads a member of a setup binding.
    if let Some(dot) = tag.find('.').filter(|&i| i > 0) {
        if let Some(namespace) = resolve_setup_reference(ctx, &tag[..dot]) {
            return VNodeTag::String(format_compact!("{}{}", namespace, &tag[dot..]));
        }
    }

    ctx.helper(RuntimeHelper::ResolveComponent);
    if self_name(&ctx.options.filename).is_some_and(|name| capitalize(&camelize(&tag)) == name) {
        // A component may render itself; the suffix tells the runtime to
        // fall back to the current instance.
        ctx.add_component(&format_compact!("{}__self", tag));
    } else {
        ctx.add_component(&tag);
    }
    VNodeTag::String(to_valid_asset_id(&tag, "component"))
}

/// Component name implied by the file name: `path/my-comp.vue` is `MyComp`.
fn self_name(filename: &str) -> Option<String> {
    let path = filename.split('?').next()?;
    let file = path.rsplit(|c| c == '/' || c == '\\').next()?;
    let (stem, ext) = file.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(capitalize(&camelize(stem)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::transform;
    use crate::{BindingMetadata, BindingType, TransformOptions};
    use gesso_armature::parse;
    use gesso_carton::Bump;

    fn compile<'a>(allocator: &'a Bump, source: &'a str, options: TransformOptions) -> RootNode<'a> {
        let (mut root, _) = parse(allocator, source);
        let errors = transform(allocator, &mut root, options);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        root
    }

    fn call_of<'r, 'a>(node: &'r TemplateChildNode<'a>) -> &'r VNodeCall<'a> {
        node.codegen_node().and_then(JsChildNode::as_vnode_call).unwrap()
    }

    fn first_inner<'r, 'a>(root: &'r RootNode<'a>) -> &'r VNodeCall<'a> {
        let outer = root.children[0].as_element().unwrap();
        call_of(&outer.children[0])
    }

    #[test]
    fn test_plain_element() {
        let allocator = Bump::new();
        let root = compile(&allocator, r#"<div><p id="a">hi</p></div>"#, TransformOptions::default());
        let call = first_inner(&root);
        assert!(matches!(&call.tag, VNodeTag::String(tag) if tag == "\"p\""));
        assert!(!call.is_block);
        assert!(call.patch_flag.is_none());
        assert!(matches!(call.children, Some(VNodeChildren::TreeText)));
        assert!(root.has_helper(RuntimeHelper::CreateElementVNode));
    }

    #[test]
    fn test_dynamic_text_child() {
        let allocator = Bump::new();
        let root = compile(&allocator, r#"<div><p>{{ msg }}</p></div>"#, TransformOptions::default());
        assert_eq!(first_inner(&root).patch_flag, Some(PatchFlags::TEXT));
    }

    #[test]
    fn test_constant_text_child_has_no_flag() {
        let allocator = Bump::new();
        let root = compile(&allocator, r#"<div><p>{{ 1 + 2 }}</p></div>"#, TransformOptions::default());
        assert_eq!(first_inner(&root).patch_flag, None);
    }

    #[test]
    fn test_resolved_component() {
        let allocator = Bump::new();
        let root = compile(&allocator, r#"<div><my-comp></my-comp></div>"#, TransformOptions::default());
        let call = first_inner(&root);
        assert!(call.is_component);
        assert!(matches!(&call.tag, VNodeTag::String(tag) if tag == "_component_my_comp"));
        assert_eq!(root.components.as_slice(), &[String::from("my-comp")]);
        assert!(root.has_helper(RuntimeHelper::ResolveComponent));
        assert!(root.has_helper(RuntimeHelper::CreateVNode));
    }

    #[test]
    fn test_self_referencing_component() {
        let allocator = Bump::new();
        let options = TransformOptions {
            filename: "src/components/TreeItem.vue".into(),
            ..TransformOptions::default()
        };
        let root = compile(&allocator, r#"<div><tree-item></tree-item></div>"#, options);
        assert_eq!(root.components.as_slice(), &[String::from("tree-item__self")]);
    }

    #[test]
    fn test_dynamic_component() {
        let allocator = Bump::new();
        let root = compile(
            &allocator,
            r#"<div><component :is="view"></component></div>"#,
            TransformOptions::default(),
        );
        let call = first_inner(&root);
        assert!(call.is_block);
        let VNodeTag::Call(resolve) = &call.tag else {
            panic!("expected resolveDynamicComponent");
        };
        assert_eq!(resolve.callee, Callee::Symbol(RuntimeHelper::ResolveDynamicComponent));
        assert!(call.props.is_none());
    }

    #[test]
    fn test_static_is_on_component_tag() {
        let allocator = Bump::new();
        let root = compile(
            &allocator,
            r#"<div><component is="foo"></component></div>"#,
            TransformOptions::default(),
        );
        let VNodeTag::Call(resolve) = &first_inner(&root).tag else {
            panic!("expected resolveDynamicComponent");
        };
        assert!(matches!(
            &resolve.arguments[0],
            CallArgument::Js(JsChildNode::Simple(s)) if s.is_static && s.content == "foo"
        ));
    }

    #[test]
    fn test_vue_prefixed_is() {
        let allocator = Bump::new();
        let root = compile(
            &allocator,
            r#"<div><button is="vue:fancy-button"></button></div>"#,
            TransformOptions::default(),
        );
        let call = first_inner(&root);
        assert!(matches!(&call.tag, VNodeTag::String(tag) if tag == "_component_fancy_button"));
    }

    #[test]
    fn test_builtin_components() {
        let allocator = Bump::new();
        let root = compile(
            &allocator,
            r#"<div><Teleport to="body"><p/></Teleport><KeepAlive><Comp/></KeepAlive></div>"#,
            TransformOptions::default(),
        );
        let outer = root.children[0].as_element().unwrap();
        let teleport = call_of(&outer.children[0]);
        assert!(matches!(teleport.tag, VNodeTag::Symbol(RuntimeHelper::Teleport)));
        assert!(teleport.is_block);
        assert!(matches!(teleport.children, Some(VNodeChildren::Tree(TreeRef::Children))));

        let keep_alive = call_of(&outer.children[1]);
        assert!(keep_alive.is_block);
        assert_eq!(keep_alive.patch_flag, Some(PatchFlags::DYNAMIC_SLOTS));
        assert!(matches!(keep_alive.children, Some(VNodeChildren::Tree(TreeRef::Children))));
        assert!(root.has_helper(RuntimeHelper::Teleport));
        assert!(root.has_helper(RuntimeHelper::KeepAlive));
    }

    #[test]
    fn test_svg_is_block() {
        let allocator = Bump::new();
        let root = compile(&allocator, r#"<div><svg><path/></svg></div>"#, TransformOptions::default());
        assert!(first_inner(&root).is_block);
    }

    #[test]
    fn test_component_from_setup() {
        let allocator = Bump::new();
        let mut metadata = BindingMetadata {
            is_script_setup: true,
            ..BindingMetadata::default()
        };
        metadata.bindings.insert("Foo".into(), BindingType::SetupConst);
        let options = TransformOptions {
            binding_metadata: Some(metadata),
            inline: true,
            ..TransformOptions::default()
        };
        let root = compile(&allocator, r#"<div><Foo/><Foo.Bar/></div>"#, options);
        let outer = root.children[0].as_element().unwrap();
        assert!(matches!(&call_of(&outer.children[0]).tag, VNodeTag::String(t) if t == "Foo"));
        assert!(matches!(&call_of(&outer.children[1]).tag, VNodeTag::String(t) if t == "Foo.Bar"));
        assert!(root.components.is_empty());
    }

    #[test]
    fn test_self_name() {
        assert_eq!(self_name("a/b/my-comp.vue").as_deref(), Some("MyComp"));
        assert_eq!(self_name("C:\\x\\Foo.vue?type=template").as_deref(), Some("Foo"));
        assert_eq!(self_name("noext"), None);
    }
}
