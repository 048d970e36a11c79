//! Template reader.
//!
//! A recursive-descent reader over the source bytes. It is not a conforming
//! HTML parser: it knows about elements, attributes, directives,
//! interpolations, comments and text, and recovers from the common mistakes
//! (unclosed elements, stray end tags, unterminated interpolations).

use memchr::{memchr, memchr_iter, memmem};

use gesso_carton::{Box, Bump, String, Vec};
use gesso_relief::ast::*;
use gesso_relief::errors::{CompilerError, ErrorCode};
use gesso_relief::options::{ParserOptions, WhitespaceStrategy};

/// Reader state for one template
pub struct Parser<'a> {
    /// Arena allocator
    allocator: &'a Bump,
    /// Source code
    source: &'a str,
    /// Parser options
    options: ParserOptions,
    /// Byte offset of the next unread character
    pos: usize,
    /// Open element tags, innermost last
    open_tags: Vec<'a, &'a str>,
    /// Errors collected during parsing
    errors: Vec<'a, CompilerError>,
    /// Newline positions for calculating line/column
    newlines: Vec<'a, usize>,
    /// Whether in pre block
    in_pre: bool,
    /// Whether in v-pre block
    in_v_pre: bool,
}

/// How a child list ended
enum ChildrenEnd {
    /// End of input
    Eof,
    /// The parent's end tag, ending at the given offset
    Closed(usize),
    /// An end tag of some ancestor; left unread
    Ancestor,
}

/// Attribute as written, before it becomes a prop
struct RawAttribute<'a> {
    name: &'a str,
    name_start: usize,
    value: Option<(usize, usize)>,
    start: usize,
    end: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser
    pub fn new(allocator: &'a Bump, source: &'a str) -> Self {
        Self::with_options(allocator, source, ParserOptions::default())
    }

    /// Create a new parser with options
    pub fn with_options(allocator: &'a Bump, source: &'a str, options: ParserOptions) -> Self {
        Self {
            allocator,
            source,
            options,
            pos: 0,
            open_tags: Vec::new_in(allocator),
            errors: Vec::new_in(allocator),
            newlines: Vec::from_iter_in(memchr_iter(b'\n', source.as_bytes()), allocator),
            in_pre: false,
            in_v_pre: false,
        }
    }

    /// Parse the source and return the tree
    pub fn parse(mut self) -> (RootNode<'a>, Vec<'a, CompilerError>) {
        let mut root = RootNode::new(self.allocator, self.source);
        let (mut children, _) = self.parse_children(Namespace::Html);
        self.condense_whitespace(&mut children);
        root.children = children;
        root.loc = self.create_loc(0, self.source.len());
        (root, self.errors)
    }

    fn parse_children(&mut self, ns: Namespace) -> (Vec<'a, TemplateChildNode<'a>>, ChildrenEnd) {
        let source = self.source;
        let mut children = Vec::new_in(self.allocator);

        while self.pos < source.len() {
            let rest = &source[self.pos..];
            let bytes = rest.as_bytes();

            if rest.starts_with("</") {
                let start = self.pos;
                let name_end = rest[2..]
                    .find(|c: char| c.is_ascii_whitespace() || c == '>')
                    .map_or(rest.len(), |i| i + 2);
                let name = &rest[2..name_end];
                let close_end = memchr(b'>', &bytes[name_end..])
                    .map_or(source.len(), |i| start + name_end + i + 1);

                if self
                    .open_tags
                    .last()
                    .is_some_and(|tag| tag.eq_ignore_ascii_case(name))
                {
                    self.pos = close_end;
                    return (children, ChildrenEnd::Closed(close_end));
                }
                if self.open_tags.iter().any(|tag| tag.eq_ignore_ascii_case(name)) {
                    return (children, ChildrenEnd::Ancestor);
                }
                self.on_error(ErrorCode::InvalidEndTag, start);
                self.pos = close_end;
                continue;
            }

            if rest.starts_with("<!--") {
                let comment = self.parse_comment();
                if self.options.comments {
                    children.push(comment);
                }
                continue;
            }

            if bytes.len() > 1 && bytes[0] == b'<' && bytes[1].is_ascii_alphabetic() {
                let element = self.parse_element(ns);
                children.push(TemplateChildNode::Element(Box::new_in(
                    element,
                    self.allocator,
                )));
                continue;
            }

            if !self.in_v_pre && rest.starts_with(self.options.delimiters.0.as_str()) {
                self.parse_interpolation(&mut children);
                continue;
            }

            self.parse_text(&mut children);
        }

        (children, ChildrenEnd::Eof)
    }

    fn parse_comment(&mut self) -> TemplateChildNode<'a> {
        let source = self.source;
        let start = self.pos;
        let content_start = start + 4;
        let (content_end, end) = match memmem::find(&source.as_bytes()[content_start..], b"-->") {
            Some(i) => (content_start + i, content_start + i + 3),
            None => {
                self.on_error(ErrorCode::EofInComment, source.len());
                (source.len(), source.len())
            }
        };
        self.pos = end;

        let comment = CommentNode::new(&source[content_start..content_end], self.create_loc(start, end));
        TemplateChildNode::Comment(Box::new_in(comment, self.allocator))
    }

    fn parse_interpolation(&mut self, children: &mut Vec<'a, TemplateChildNode<'a>>) {
        let source = self.source;
        let start = self.pos;
        let open_len = self.options.delimiters.0.len();
        let close = self.options.delimiters.1.clone();
        let inner_start = start + open_len;

        let Some(i) = memmem::find(&source.as_bytes()[inner_start..], close.as_bytes()) else {
            self.on_error(ErrorCode::MissingInterpolationEnd, start);
            self.push_text(children, start, source.len());
            self.pos = source.len();
            return;
        };

        let inner_end = inner_start + i;
        let end = inner_end + close.len();
        self.pos = end;

        let raw = &source[inner_start..inner_end];
        let trimmed = raw.trim();
        let content_start = inner_start + (raw.len() - raw.trim_start().len());
        let content_loc = self.create_loc(content_start, content_start + trimmed.len());

        let interpolation = InterpolationNode {
            content: ExpressionNode::simple(
                self.allocator,
                SimpleExpressionNode::new(trimmed, false, content_loc),
            ),
            loc: self.create_loc(start, end),
        };
        children.push(TemplateChildNode::Interpolation(Box::new_in(
            interpolation,
            self.allocator,
        )));
    }

    fn parse_text(&mut self, children: &mut Vec<'a, TemplateChildNode<'a>>) {
        let source = self.source;
        let start = self.pos;
        // Always consume at least one byte so a lone `<` makes progress.
        let scan_from = start + 1;
        let bytes = &source.as_bytes()[scan_from.min(source.len())..];

        let mut end = memchr(b'<', bytes).map_or(source.len(), |i| scan_from + i);
        if !self.in_v_pre {
            if let Some(i) = memmem::find(bytes, self.options.delimiters.0.as_bytes()) {
                end = end.min(scan_from + i);
            }
        }
        while !source.is_char_boundary(end) {
            end += 1;
        }

        self.push_text(children, start, end);
        self.pos = end;
    }

    /// Append text, merging with a directly preceding text node.
    fn push_text(&mut self, children: &mut Vec<'a, TemplateChildNode<'a>>, start: usize, end: usize) {
        let raw = &self.source[start..end];
        let content = if self.in_v_pre { String::from(raw) } else { decode_entities(raw) };

        if let Some(TemplateChildNode::Text(prev)) = children.last_mut() {
            if prev.loc.end.offset as usize == start {
                let prev_start = prev.loc.start.offset as usize;
                prev.content.push_str(&content);
                prev.loc = self.create_loc(prev_start, end);
                return;
            }
        }

        let text = TextNode::new(content, self.create_loc(start, end));
        children.push(TemplateChildNode::Text(Box::new_in(text, self.allocator)));
    }

    fn parse_element(&mut self, parent_ns: Namespace) -> ElementNode<'a> {
        let source = self.source;
        let start = self.pos;
        self.pos += 1;

        let tag_start = self.pos;
        self.skip_while(|b| !b.is_ascii_whitespace() && b != b'>' && b != b'/');
        let tag = &source[tag_start..self.pos];

        let ns = element_namespace(parent_ns, tag);
        let mut element = ElementNode::new(self.allocator, tag, SourceLocation::STUB);
        element.ns = ns;

        let mut attributes: Vec<'a, RawAttribute<'a>> = Vec::new_in(self.allocator);
        let mut closed_start_tag = false;
        while self.pos < source.len() {
            self.skip_while(|b| b.is_ascii_whitespace());
            let rest = &source[self.pos..];
            if rest.starts_with("/>") {
                self.pos += 2;
                element.is_self_closing = true;
                closed_start_tag = true;
                break;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                closed_start_tag = true;
                break;
            }
            if rest.starts_with('/') {
                self.pos += 1;
                continue;
            }
            if rest.is_empty() {
                break;
            }

            let attribute = self.parse_attribute();
            if attributes.iter().any(|a| a.name == attribute.name) {
                self.on_error(ErrorCode::DuplicateAttribute, attribute.start);
                continue;
            }
            attributes.push(attribute);
        }

        if !closed_start_tag {
            self.on_error(ErrorCode::EofInTag, source.len());
            self.build_props(&mut element, &attributes, false);
            element.loc = self.create_loc(start, source.len());
            return element;
        }

        let has_v_pre = !self.in_v_pre && attributes.iter().any(|a| a.name == "v-pre");
        self.build_props(&mut element, &attributes, has_v_pre);
        if !self.in_v_pre && !has_v_pre {
            element.tag_type = self.resolve_tag_type(&element);
        }

        if element.is_self_closing || (self.options.is_void_tag)(tag) {
            element.loc = self.create_loc(start, self.pos);
            return element;
        }

        if tag.eq_ignore_ascii_case("script") || tag.eq_ignore_ascii_case("style") {
            let end = self.parse_raw_text(&mut element, start);
            element.loc = self.create_loc(start, end);
            return element;
        }

        let was_in_pre = self.in_pre;
        let was_in_v_pre = self.in_v_pre;
        if tag == "pre" {
            self.in_pre = true;
        }
        if has_v_pre {
            self.in_v_pre = true;
        }
        self.open_tags.push(tag);

        let children_ns = match (ns, tag) {
            (Namespace::Svg, "foreignObject" | "desc" | "title") => Namespace::Html,
            _ => ns,
        };
        let (mut children, end) = self.parse_children(children_ns);

        self.open_tags.pop();
        let end_offset = match end {
            ChildrenEnd::Closed(offset) => offset,
            ChildrenEnd::Ancestor | ChildrenEnd::Eof => {
                self.on_error(ErrorCode::MissingEndTag, start);
                self.pos
            }
        };

        self.condense_whitespace(&mut children);
        if tag == "pre" {
            strip_leading_newline(&mut children);
        }

        self.in_pre = was_in_pre;
        self.in_v_pre = was_in_v_pre;

        element.children = children;
        element.loc = self.create_loc(start, end_offset);
        element
    }

    /// `<script>` and `<style>` bodies are kept verbatim.
    fn parse_raw_text(&mut self, element: &mut ElementNode<'a>, start: usize) -> usize {
        let source = self.source;
        let content_start = self.pos;
        let mut needle = std::string::String::with_capacity(element.tag.len() + 2);
        needle.push_str("</");
        needle.push_str(&element.tag);

        let (content_end, end) = match memmem::find(&source.as_bytes()[content_start..], needle.as_bytes()) {
            Some(i) => {
                let content_end = content_start + i;
                let end = memchr(b'>', &source.as_bytes()[content_end..])
                    .map_or(source.len(), |j| content_end + j + 1);
                (content_end, end)
            }
            None => {
                self.on_error(ErrorCode::MissingEndTag, start);
                (source.len(), source.len())
            }
        };

        if content_end > content_start {
            let text = TextNode::new(
                &source[content_start..content_end],
                self.create_loc(content_start, content_end),
            );
            element
                .children
                .push(TemplateChildNode::Text(Box::new_in(text, self.allocator)));
        }
        self.pos = end;
        end
    }

    fn parse_attribute(&mut self) -> RawAttribute<'a> {
        let source = self.source;
        let start = self.pos;

        // A leading `=` belongs to the name.
        self.pos += source[start..].chars().next().map_or(1, char::len_utf8);
        let mut in_brackets = source.as_bytes()[start] == b'[';
        while self.pos < source.len() {
            let b = source.as_bytes()[self.pos];
            if b == b'[' {
                in_brackets = true;
            } else if b == b']' {
                in_brackets = false;
            } else if !in_brackets && (b.is_ascii_whitespace() || b == b'=' || b == b'>' || b == b'/')
            {
                break;
            }
            self.pos += 1;
        }
        while !source.is_char_boundary(self.pos) {
            self.pos += 1;
        }
        let name = &source[start..self.pos];

        self.skip_while(|b| b.is_ascii_whitespace());
        let mut value = None;
        if source.as_bytes().get(self.pos) == Some(&b'=') {
            self.pos += 1;
            self.skip_while(|b| b.is_ascii_whitespace());
            match source.as_bytes().get(self.pos) {
                Some(&quote @ (b'"' | b'\'')) => {
                    let value_start = self.pos + 1;
                    match memchr(quote, &source.as_bytes()[value_start..]) {
                        Some(i) => {
                            value = Some((value_start, value_start + i));
                            self.pos = value_start + i + 1;
                        }
                        None => {
                            self.on_error(ErrorCode::EofInTag, source.len());
                            value = Some((value_start, source.len()));
                            self.pos = source.len();
                        }
                    }
                }
                Some(_) => {
                    let value_start = self.pos;
                    self.skip_while(|b| !b.is_ascii_whitespace() && b != b'>');
                    value = Some((value_start, self.pos));
                }
                None => {}
            }
        }

        RawAttribute {
            name,
            name_start: start,
            value,
            start,
            end: self.pos,
        }
    }

    fn build_props(
        &mut self,
        element: &mut ElementNode<'a>,
        attributes: &[RawAttribute<'a>],
        has_v_pre: bool,
    ) {
        let plain = self.in_v_pre || has_v_pre;
        for attribute in attributes {
            if has_v_pre && attribute.name == "v-pre" {
                continue;
            }
            let prop = if !plain && is_directive_name(attribute.name) {
                match self.build_directive(attribute) {
                    Some(dir) => PropNode::Directive(Box::new_in(dir, self.allocator)),
                    None => continue,
                }
            } else {
                PropNode::Attribute(Box::new_in(self.build_attribute(attribute), self.allocator))
            };
            element.props.push(prop);
        }
    }

    fn build_attribute(&self, attribute: &RawAttribute<'a>) -> AttributeNode {
        let mut node = AttributeNode::new(attribute.name, self.create_loc(attribute.start, attribute.end));
        node.name_loc = self.create_loc(
            attribute.name_start,
            attribute.name_start + attribute.name.len(),
        );
        node.value = attribute.value.map(|(start, end)| {
            TextNode::new(
                decode_entities(&self.source[start..end]),
                self.create_loc(start, end),
            )
        });
        node
    }

    fn build_directive(&mut self, attribute: &RawAttribute<'a>) -> Option<DirectiveNode<'a>> {
        let raw = attribute.name;
        let base = attribute.name_start;

        // (directive name, offset where `arg.modifiers` starts, has arg part)
        let (name, arg_offset, has_arg, prop_shorthand) = match raw.as_bytes()[0] {
            b':' => ("bind", 1, true, false),
            b'@' => ("on", 1, true, false),
            b'#' => ("slot", 1, true, false),
            b'.' => ("bind", 1, true, true),
            _ => {
                let body = &raw[2..];
                let end = body.find([':', '.']).unwrap_or(body.len());
                if end == 0 {
                    self.on_error(ErrorCode::MissingDirectiveName, attribute.start);
                    return None;
                }
                let has_arg = body[end..].starts_with(':');
                (&body[..end], 2 + end + usize::from(has_arg), has_arg, false)
            }
        };

        let mut dir = DirectiveNode::new(
            self.allocator,
            name,
            self.create_loc(attribute.start, attribute.end),
        );
        dir.raw_name = Some(String::from(raw));
        if prop_shorthand {
            dir.modifiers.push(SimpleExpressionNode::new(
                "prop",
                true,
                SourceLocation::STUB,
            ));
        }

        let rest = &raw[arg_offset..];
        let mut modifiers_start = arg_offset;
        if has_arg {
            if let Some(inner) = rest.strip_prefix('[') {
                let close = inner.find(']').unwrap_or(inner.len());
                let content = &inner[..close];
                let arg_start = base + arg_offset + 1;
                dir.arg = Some(ExpressionNode::simple(
                    self.allocator,
                    SimpleExpressionNode::new(
                        content,
                        false,
                        self.create_loc(arg_start, arg_start + content.len()),
                    ),
                ));
                modifiers_start = arg_offset + 1 + (close + 1).min(inner.len());
            } else {
                // Slot names may contain dots.
                let arg_len = if name == "slot" {
                    rest.len()
                } else {
                    rest.find('.').unwrap_or(rest.len())
                };
                let arg_start = base + arg_offset;
                if arg_len > 0 {
                    dir.arg = Some(ExpressionNode::simple(
                        self.allocator,
                        SimpleExpressionNode::new(
                            &rest[..arg_len],
                            true,
                            self.create_loc(arg_start, arg_start + arg_len),
                        ),
                    ));
                }
                modifiers_start = arg_offset + arg_len;
            }
        }

        let mut offset = modifiers_start;
        for modifier in raw[modifiers_start.min(raw.len())..].split('.') {
            if !modifier.is_empty() {
                let mod_start = base + offset;
                dir.modifiers.push(SimpleExpressionNode::new(
                    modifier,
                    true,
                    self.create_loc(mod_start, mod_start + modifier.len()),
                ));
            }
            offset += modifier.len() + 1;
        }

        if let Some((start, end)) = attribute.value {
            let content = &self.source[start..end];
            if !content.trim().is_empty() {
                dir.exp = Some(ExpressionNode::simple(
                    self.allocator,
                    SimpleExpressionNode::new(content, false, self.create_loc(start, end)),
                ));
            }
        }

        Some(dir)
    }

    fn resolve_tag_type(&self, element: &ElementNode<'a>) -> ElementType {
        let tag = element.tag.as_str();
        if tag == "slot" {
            return ElementType::Slot;
        }
        if tag == "template"
            && element.props.iter().any(|p| {
                matches!(p, PropNode::Directive(d)
                    if matches!(d.name.as_str(), "if" | "else" | "else-if" | "for" | "slot"))
            })
        {
            return ElementType::Template;
        }
        if tag == "component"
            || tag.starts_with(|c: char| c.is_ascii_uppercase())
            || RuntimeHelper::core_component(tag).is_some()
            || !(self.options.is_native_tag)(tag)
            || element.props.iter().any(|p| {
                matches!(p, PropNode::Attribute(attr)
                    if attr.name == "is"
                        && attr.value.as_ref().is_some_and(|v| v.content.starts_with("vue:")))
            })
        {
            return ElementType::Component;
        }
        ElementType::Element
    }

    /// Condense whitespace in a finished child list.
    fn condense_whitespace(&self, children: &mut Vec<'a, TemplateChildNode<'a>>) {
        let should_condense = self.options.whitespace != WhitespaceStrategy::Preserve;
        let mut i = 0;
        while i < children.len() {
            let action = match &children[i] {
                TemplateChildNode::Text(text) if !self.in_pre => {
                    if text.content.chars().all(char::is_whitespace) {
                        let prev = i.checked_sub(1).and_then(|j| children.get(j));
                        match (prev, children.get(i + 1)) {
                            (None, _) | (_, None) => WhitespaceAction::Remove,
                            (
                                Some(TemplateChildNode::Comment(_)),
                                Some(TemplateChildNode::Comment(_) | TemplateChildNode::Element(_)),
                            )
                            | (Some(TemplateChildNode::Element(_)), Some(TemplateChildNode::Comment(_)))
                                if should_condense =>
                            {
                                WhitespaceAction::Remove
                            }
                            (Some(TemplateChildNode::Element(_)), Some(TemplateChildNode::Element(_)))
                                if should_condense && text.content.contains('\n') =>
                            {
                                WhitespaceAction::Remove
                            }
                            _ => WhitespaceAction::Single,
                        }
                    } else if should_condense {
                        WhitespaceAction::Collapse
                    } else {
                        WhitespaceAction::Keep
                    }
                }
                _ => WhitespaceAction::Keep,
            };

            match action {
                WhitespaceAction::Remove => {
                    children.remove(i);
                    continue;
                }
                WhitespaceAction::Single => {
                    if let TemplateChildNode::Text(text) = &mut children[i] {
                        text.content = String::const_new(" ");
                    }
                }
                WhitespaceAction::Collapse => {
                    if let TemplateChildNode::Text(text) = &mut children[i] {
                        text.content = collapse_whitespace(&text.content);
                    }
                }
                WhitespaceAction::Keep => {}
            }
            i += 1;
        }
    }

    fn skip_while(&mut self, pred: impl Fn(u8) -> bool) {
        let bytes = self.source.as_bytes();
        while self.pos < bytes.len() && pred(bytes[self.pos]) {
            self.pos += 1;
        }
        while !self.source.is_char_boundary(self.pos) {
            self.pos += 1;
        }
    }

    fn position(&self, offset: usize) -> Position {
        let line_index = self.newlines.partition_point(|&nl| nl < offset);
        let line_start = if line_index == 0 {
            0
        } else {
            self.newlines[line_index - 1] + 1
        };
        Position::new(
            offset as u32,
            line_index as u32 + 1,
            (offset - line_start) as u32 + 1,
        )
    }

    fn create_loc(&self, start: usize, end: usize) -> SourceLocation {
        let end = end.min(self.source.len());
        let start = start.min(end);
        SourceLocation::new(
            self.position(start),
            self.position(end),
            &self.source[start..end],
        )
    }

    /// Handle error
    fn on_error(&mut self, code: ErrorCode, index: usize) {
        let loc = self.create_loc(index, index + 1);
        self.errors.push(CompilerError::new(code, Some(loc)));
    }
}

/// Action to take for a text node during condensing
enum WhitespaceAction {
    /// Keep the node as-is
    Keep,
    /// Remove the node entirely
    Remove,
    /// Whitespace-only node becomes a single space
    Single,
    /// Runs of whitespace become single spaces
    Collapse,
}

fn is_directive_name(name: &str) -> bool {
    match name.as_bytes().first() {
        Some(b':' | b'@' | b'#') => name.len() > 1,
        Some(b'.') => name.len() > 1,
        _ => name.starts_with("v-"),
    }
}

fn element_namespace(parent: Namespace, tag: &str) -> Namespace {
    match (parent, tag) {
        (Namespace::Html, "svg") => Namespace::Svg,
        (Namespace::Html, "math") => Namespace::MathMl,
        (Namespace::MathMl, "svg") => Namespace::Svg,
        (parent, _) => parent,
    }
}

fn decode_entities(raw: &str) -> String {
    if raw.contains('&') {
        String::from(htmlize::unescape(raw).as_ref())
    } else {
        String::from(raw)
    }
}

fn collapse_whitespace(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut in_whitespace = false;
    for c in content.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push(' ');
            }
            in_whitespace = true;
        } else {
            out.push(c);
            in_whitespace = false;
        }
    }
    out
}

fn strip_leading_newline(children: &mut Vec<'_, TemplateChildNode<'_>>) {
    let remove = match children.first_mut() {
        Some(TemplateChildNode::Text(text)) if text.content.starts_with('\n') => {
            text.content = String::from(&text.content[1..]);
            text.content.is_empty()
        }
        _ => false,
    };
    if remove {
        children.remove(0);
    }
}

/// Parse a template
pub fn parse<'a>(allocator: &'a Bump, source: &'a str) -> (RootNode<'a>, Vec<'a, CompilerError>) {
    Parser::new(allocator, source).parse()
}

/// Parse a template with options
pub fn parse_with_options<'a>(
    allocator: &'a Bump,
    source: &'a str,
    options: ParserOptions,
) -> (RootNode<'a>, Vec<'a, CompilerError>) {
    Parser::with_options(allocator, source, options).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_element<'r, 'a>(root: &'r RootNode<'a>) -> &'r ElementNode<'a> {
        match &root.children[0] {
            TemplateChildNode::Element(el) => &**el,
            other => panic!("Expected element node, got {}", other.kind()),
        }
    }

    fn directive<'r, 'a>(el: &'r ElementNode<'a>, index: usize) -> &'r DirectiveNode<'a> {
        match &el.props[index] {
            PropNode::Directive(dir) => &**dir,
            PropNode::Attribute(attr) => panic!("Expected directive, got {}", attr.name),
        }
    }

    #[test]
    fn test_parse_simple_element() {
        let allocator = Bump::new();
        let (root, errors) = parse(&allocator, "<div></div>");

        assert!(errors.is_empty());
        assert_eq!(root.children.len(), 1);
        let el = first_element(&root);
        assert_eq!(el.tag.as_str(), "div");
        assert!(!el.is_self_closing);
        assert_eq!(el.loc.source.as_str(), "<div></div>");
    }

    #[test]
    fn test_parse_text_and_interpolation() {
        let allocator = Bump::new();
        let (root, errors) = parse(&allocator, "hello {{ name }}!");

        assert!(errors.is_empty());
        assert_eq!(root.children.len(), 3);
        assert!(matches!(&root.children[0], TemplateChildNode::Text(t) if t.content == "hello "));
        match &root.children[1] {
            TemplateChildNode::Interpolation(node) => {
                assert_eq!(node.content.content(), "name");
                assert_eq!(node.loc.source.as_str(), "{{ name }}");
            }
            _ => panic!("Expected interpolation"),
        }
    }

    #[test]
    fn test_parse_directives() {
        let allocator = Bump::new();
        let (root, errors) = parse(
            &allocator,
            r#"<input v-model.trim="msg" :id="uid" @click.stop="go" .value="v" v-bind:[key]="x">"#,
        );

        assert!(errors.is_empty());
        let el = first_element(&root);
        assert_eq!(el.props.len(), 5);

        let model = directive(el, 0);
        assert_eq!(model.name.as_str(), "model");
        assert!(model.arg.is_none());
        assert!(model.has_modifier("trim"));

        let bind = directive(el, 1);
        assert_eq!(bind.name.as_str(), "bind");
        assert!(bind.is_static_arg("id"));
        assert_eq!(bind.exp.as_ref().map(|e| e.content()), Some("uid"));

        let on = directive(el, 2);
        assert_eq!(on.name.as_str(), "on");
        assert!(on.is_static_arg("click"));
        assert!(on.has_modifier("stop"));

        let prop = directive(el, 3);
        assert!(prop.is_static_arg("value"));
        assert!(prop.has_modifier("prop"));

        let dynamic = directive(el, 4);
        let arg = dynamic.arg.as_ref().and_then(|a| a.as_simple()).unwrap();
        assert!(!arg.is_static);
        assert_eq!(arg.content.as_str(), "key");
    }

    #[test]
    fn test_slot_arg_keeps_dots() {
        let allocator = Bump::new();
        let (root, _) = parse(&allocator, r#"<Comp><template #item.name="p">x</template></Comp>"#);
        let comp = first_element(&root);
        assert_eq!(comp.tag_type, ElementType::Component);
        let template = comp.children[0].as_element().unwrap();
        assert_eq!(template.tag_type, ElementType::Template);
        let slot = directive(template, 0);
        assert!(slot.is_static_arg("item.name"));
        assert!(slot.modifiers.is_empty());
    }

    #[test]
    fn test_tag_types() {
        let allocator = Bump::new();
        let (root, _) = parse(
            &allocator,
            "<slot/><template v-if=\"a\"></template><template></template><my-comp/><Teleport/><component/>",
        );
        let types: std::vec::Vec<_> = root
            .children
            .iter()
            .filter_map(|c| c.as_element().map(|e| e.tag_type))
            .collect();
        assert_eq!(
            types,
            vec![
                ElementType::Slot,
                ElementType::Template,
                ElementType::Element,
                ElementType::Component,
                ElementType::Component,
                ElementType::Component,
            ]
        );
    }

    #[test]
    fn test_condense_whitespace() {
        let allocator = Bump::new();
        let (root, _) = parse(&allocator, "<div>\n  <span>a   b</span>\n  <span/> <b/>\n</div>");
        let div = first_element(&root);
        assert_eq!(div.children.len(), 4);
        let span = div.children[0].as_element().unwrap();
        assert!(matches!(&span.children[0], TemplateChildNode::Text(t) if t.content == "a b"));
        assert!(matches!(&div.children[2], TemplateChildNode::Text(t) if t.content == " "));
    }

    #[test]
    fn test_preserve_whitespace() {
        let allocator = Bump::new();
        let options = ParserOptions {
            whitespace: WhitespaceStrategy::Preserve,
            ..Default::default()
        };
        let (root, _) = parse_with_options(&allocator, "<p>a   b</p>", options);
        let p = first_element(&root);
        assert!(matches!(&p.children[0], TemplateChildNode::Text(t) if t.content == "a   b"));
    }

    #[test]
    fn test_comments_dropped_when_disabled() {
        let allocator = Bump::new();
        let options = ParserOptions {
            comments: false,
            ..Default::default()
        };
        let (root, _) = parse_with_options(&allocator, "<!-- hi --><div/>", options);
        assert_eq!(root.children.len(), 1);

        let (root, _) = parse(&allocator, "<!-- hi --><div/>");
        assert!(matches!(&root.children[0], TemplateChildNode::Comment(c) if c.content == " hi "));
    }

    #[test]
    fn test_entities() {
        let allocator = Bump::new();
        let (root, _) = parse(&allocator, r#"<div title="a &amp; b">&lt;x&gt;</div>"#);
        let div = first_element(&root);
        match &div.props[0] {
            PropNode::Attribute(attr) => {
                assert_eq!(attr.value.as_ref().unwrap().content.as_str(), "a & b");
            }
            _ => panic!("Expected attribute"),
        }
        assert!(matches!(&div.children[0], TemplateChildNode::Text(t) if t.content == "<x>"));
    }

    #[test]
    fn test_v_pre() {
        let allocator = Bump::new();
        let (root, _) = parse(&allocator, r#"<div v-pre :id="a"><Comp v-if="b">{{ c }}</Comp></div>"#);
        let div = first_element(&root);
        assert!(matches!(&div.props[0], PropNode::Attribute(a) if a.name == ":id"));
        let comp = div.children[0].as_element().unwrap();
        assert_eq!(comp.tag_type, ElementType::Element);
        assert!(matches!(&comp.props[0], PropNode::Attribute(a) if a.name == "v-if"));
        assert!(matches!(&comp.children[0], TemplateChildNode::Text(t) if t.content == "{{ c }}"));
    }

    #[test]
    fn test_missing_end_tag() {
        let allocator = Bump::new();
        let (root, errors) = parse(&allocator, "<div><span>text</div>");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::MissingEndTag);
        let div = first_element(&root);
        assert_eq!(div.children.len(), 1);
        assert_eq!(root.children.len(), 1);
    }

    #[test]
    fn test_invalid_end_tag() {
        let allocator = Bump::new();
        let (root, errors) = parse(&allocator, "<div></span></div>");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::InvalidEndTag);
        assert_eq!(root.children.len(), 1);
    }

    #[test]
    fn test_missing_interpolation_end() {
        let allocator = Bump::new();
        let (root, errors) = parse(&allocator, "a {{ b");
        assert_eq!(errors[0].code, ErrorCode::MissingInterpolationEnd);
        assert!(matches!(&root.children[0], TemplateChildNode::Text(t) if t.content == "a {{ b"));
    }

    #[test]
    fn test_duplicate_attribute() {
        let allocator = Bump::new();
        let (root, errors) = parse(&allocator, r#"<div id="a" id="b"></div>"#);
        assert_eq!(errors[0].code, ErrorCode::DuplicateAttribute);
        assert_eq!(first_element(&root).props.len(), 1);
    }

    #[test]
    fn test_positions() {
        let allocator = Bump::new();
        let (root, _) = parse(&allocator, "<div>\n  <p>x</p>\n</div>");
        let div = first_element(&root);
        let p = div.children[0].as_element().unwrap();
        assert_eq!(p.loc.start.line, 2);
        assert_eq!(p.loc.start.column, 3);
        assert_eq!(p.loc.source.as_str(), "<p>x</p>");
    }

    #[test]
    fn test_svg_namespace() {
        let allocator = Bump::new();
        let (root, _) = parse(&allocator, "<svg><circle/></svg>");
        let svg = first_element(&root);
        assert_eq!(svg.ns, Namespace::Svg);
        assert_eq!(svg.children[0].as_element().unwrap().ns, Namespace::Svg);
    }
}
