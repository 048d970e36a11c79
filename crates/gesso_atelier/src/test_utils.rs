//! Compact renderings of codegen descriptors for assertions.

use gesso_armature::parse;
use gesso_carton::Bump;

use crate::ast::*;
use crate::errors::CompilerError;
use crate::options::TransformOptions;
use crate::transform::transform;

/// Parse and transform `source`, then hand the result to `f`.
pub fn transformed<R>(
    source: &str,
    options: TransformOptions,
    f: impl FnOnce(&RootNode<'_>, &[CompilerError]) -> R,
) -> R {
    let allocator = Bump::new();
    let (mut root, parse_errors) = parse(&allocator, source);
    assert!(parse_errors.is_empty(), "parse errors: {parse_errors:?}");
    let errors = transform(&allocator, &mut root, options);
    f(&root, &errors)
}

pub fn prefixed() -> TransformOptions {
    TransformOptions {
        prefix_identifiers: true,
        ..TransformOptions::default()
    }
}

/// Element at `path`, following child indices from the root.
pub fn element_at<'r, 'a>(root: &'r RootNode<'a>, path: &[usize]) -> &'r ElementNode<'a> {
    let mut children = &root.children;
    let mut found = None;
    for &index in path {
        let el = children[index]
            .as_element()
            .unwrap_or_else(|| panic!("no element at {path:?}"));
        children = &el.children;
        found = Some(el);
    }
    found.expect("empty path")
}

pub fn vnode_call<'r, 'a>(el: &'r ElementNode<'a>) -> &'r VNodeCall<'a> {
    el.codegen_node
        .as_ref()
        .and_then(JsChildNode::as_vnode_call)
        .unwrap_or_else(|| panic!("<{}> has no vnode call", el.tag))
}

pub fn render_js(js: &JsChildNode<'_>) -> String {
    match js {
        JsChildNode::Simple(s) => s.content.to_string(),
        JsChildNode::Compound(c) => render_compound(c),
        JsChildNode::Call(call) => render_call(call),
        JsChildNode::Object(object) => render_object(object),
        JsChildNode::Array(array) => {
            let elements: Vec<_> = array.elements.iter().map(render_js).collect();
            format!("[{}]", elements.join(", "))
        }
        JsChildNode::Function(func) => {
            let params = match &func.params {
                None => String::new(),
                Some(FunctionParams::Expression(exp)) => render_exp(exp),
                Some(FunctionParams::List(list)) => {
                    list.iter().map(render_exp).collect::<Vec<_>>().join(", ")
                }
            };
            let returns = func.returns.as_ref().map(render_js).unwrap_or_default();
            format!("({params}) => {returns}")
        }
        JsChildNode::Conditional(cond) => format!(
            "{} ? {} : {}",
            render_exp(&cond.test),
            render_js(&cond.consequent),
            render_js(&cond.alternate)
        ),
        JsChildNode::Cache(cache) => format!("_cache[{}]({})", cache.index, render_js(&cache.value)),
        JsChildNode::VNodeCall(call) => render_vnode(call),
        JsChildNode::Tree(tree) => format!("<{tree:?}>"),
    }
}

pub fn render_exp(exp: &ExpressionNode<'_>) -> String {
    match exp {
        ExpressionNode::Simple(s) => s.content.to_string(),
        ExpressionNode::Compound(c) => render_compound(c),
    }
}

pub fn render_compound(compound: &CompoundExpressionNode<'_>) -> String {
    compound
        .children
        .iter()
        .map(|child| match child {
            CompoundExpressionChild::Simple(s) => s.content.to_string(),
            CompoundExpressionChild::Compound(c) => render_compound(c),
            CompoundExpressionChild::Interpolation(i) => {
                format!("_toDisplayString({})", render_exp(&i.content))
            }
            CompoundExpressionChild::Text(t) => format!("{:?}", t.content.as_str()),
            CompoundExpressionChild::String(s) => s.to_string(),
            CompoundExpressionChild::Symbol(h) => format!("_{}", h.name()),
        })
        .collect()
}

pub fn render_call(call: &CallExpression<'_>) -> String {
    let callee = match &call.callee {
        Callee::Symbol(h) => format!("_{}", h.name()),
        Callee::String(s) => s.to_string(),
    };
    let arguments: Vec<_> = call
        .arguments
        .iter()
        .map(|arg| match arg {
            CallArgument::String(s) => s.to_string(),
            CallArgument::Symbol(h) => format!("_{}", h.name()),
            CallArgument::Js(js) => render_js(js),
            CallArgument::Text(_) => String::from("<text>"),
        })
        .collect();
    format!("{callee}({})", arguments.join(", "))
}

pub fn render_object(object: &ObjectExpression<'_>) -> String {
    let properties: Vec<_> = object
        .properties
        .iter()
        .map(|p| {
            let key = if p.key.is_static_exp() {
                p.key.content().to_string()
            } else {
                format!("[{}]", render_exp(&p.key))
            };
            format!("{key}: {}", render_js(&p.value))
        })
        .collect();
    format!("{{ {} }}", properties.join(", "))
}

pub fn render_props(props: &PropsExpression<'_>) -> String {
    match props {
        PropsExpression::Object(object) => render_object(object),
        PropsExpression::Call(call) => render_call(call),
        PropsExpression::Expression(exp) => render_exp(exp),
    }
}

pub fn render_vnode(call: &VNodeCall<'_>) -> String {
    let tag = match &call.tag {
        VNodeTag::String(s) => s.to_string(),
        VNodeTag::Symbol(h) => format!("_{}", h.name()),
        VNodeTag::Call(c) => render_call(c),
    };
    let props = call.props.as_ref().map(render_props).unwrap_or_else(|| String::from("null"));
    let flag = call
        .patch_flag
        .map(|f| format!(" /* {} */", f.names().join(", ")))
        .unwrap_or_default();
    let block = if call.is_block { "block " } else { "" };
    format!("{block}vnode({tag}, {props}){flag}")
}
