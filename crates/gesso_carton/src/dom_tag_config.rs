//! DOM tag tables.

use phf::phf_set;

static HTML_TAGS: phf::Set<&'static str> = phf_set! {
    "html", "body", "base", "head", "link", "meta", "style", "title",
    "address", "article", "aside", "footer", "header", "hgroup", "h1", "h2",
    "h3", "h4", "h5", "h6", "nav", "section", "div", "dd", "dl", "dt",
    "figcaption", "figure", "picture", "hr", "img", "li", "main", "ol", "p",
    "pre", "ul", "a", "b", "abbr", "bdi", "bdo", "br", "cite", "code", "data",
    "dfn", "em", "i", "kbd", "mark", "q", "rp", "rt", "ruby", "s", "samp",
    "small", "span", "strong", "sub", "sup", "time", "u", "var", "wbr",
    "area", "audio", "map", "track", "video", "embed", "object", "param",
    "source", "canvas", "script", "noscript", "del", "ins", "caption", "col",
    "colgroup", "table", "thead", "tbody", "td", "th", "tr", "button",
    "datalist", "fieldset", "form", "input", "label", "legend", "meter",
    "optgroup", "option", "output", "progress", "select", "textarea",
    "details", "dialog", "menu", "summary", "template", "blockquote",
    "iframe", "tfoot", "search", "slot",
};

static SVG_TAGS: phf::Set<&'static str> = phf_set! {
    "svg", "animate", "animateMotion", "animateTransform", "circle",
    "clipPath", "defs", "desc", "ellipse", "feBlend", "feColorMatrix",
    "feComposite", "feGaussianBlur", "feOffset", "filter", "foreignObject",
    "g", "image", "line", "linearGradient", "marker", "mask", "metadata",
    "path", "pattern", "polygon", "polyline", "radialGradient", "rect",
    "stop", "switch", "symbol", "text", "textPath", "tspan", "use", "view",
};

static MATH_ML_TAGS: phf::Set<&'static str> = phf_set! {
    "math", "maction", "menclose", "merror", "mfenced", "mfrac", "mi",
    "mmultiscripts", "mn", "mo", "mover", "mpadded", "mphantom", "mroot",
    "mrow", "ms", "mspace", "msqrt", "mstyle", "msub", "msubsup", "msup",
    "mtable", "mtd", "mtext", "mtr", "munder", "munderover", "semantics",
};

static VOID_TAGS: phf::Set<&'static str> = phf_set! {
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link",
    "meta", "param", "source", "track", "wbr",
};

#[inline]
pub fn is_html_tag(tag: &str) -> bool {
    HTML_TAGS.contains(tag)
}

#[inline]
pub fn is_svg_tag(tag: &str) -> bool {
    SVG_TAGS.contains(tag)
}

#[inline]
pub fn is_math_ml_tag(tag: &str) -> bool {
    MATH_ML_TAGS.contains(tag)
}

#[inline]
pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(tag)
}

/// Tags the DOM renderer creates natively (everything else may be a component).
#[inline]
pub fn is_native_tag(tag: &str) -> bool {
    is_html_tag(tag) || is_svg_tag(tag) || is_math_ml_tag(tag)
}
