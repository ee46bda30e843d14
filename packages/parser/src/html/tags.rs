//! Tag-level metadata driving the template parser: namespaces, content
//! models, void elements, implicit-close rules, and the SVG/MathML
//! case-restoration maps.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Element namespaces, serialized as their namespace URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Namespace {
    #[serde(rename = "http://www.w3.org/1999/xhtml")]
    Html,
    #[serde(rename = "http://www.w3.org/1998/Math/MathML")]
    MathMl,
    #[serde(rename = "http://www.w3.org/2000/svg")]
    Svg,
    #[serde(rename = "http://www.w3.org/1999/xlink")]
    XLink,
    #[serde(rename = "http://www.w3.org/XML/1998/namespace")]
    Xml,
    #[serde(rename = "http://www.w3.org/2000/xmlns/")]
    XmlNs,
}

impl Namespace {
    pub fn uri(&self) -> &'static str {
        match self {
            Namespace::Html => "http://www.w3.org/1999/xhtml",
            Namespace::MathMl => "http://www.w3.org/1998/Math/MathML",
            Namespace::Svg => "http://www.w3.org/2000/svg",
            Namespace::XLink => "http://www.w3.org/1999/xlink",
            Namespace::Xml => "http://www.w3.org/XML/1998/namespace",
            Namespace::XmlNs => "http://www.w3.org/2000/xmlns/",
        }
    }

    pub fn from_uri(uri: &str) -> Option<Namespace> {
        match uri {
            "http://www.w3.org/1999/xhtml" => Some(Namespace::Html),
            "http://www.w3.org/1998/Math/MathML" => Some(Namespace::MathMl),
            "http://www.w3.org/2000/svg" => Some(Namespace::Svg),
            "http://www.w3.org/1999/xlink" => Some(Namespace::XLink),
            "http://www.w3.org/XML/1998/namespace" => Some(Namespace::Xml),
            "http://www.w3.org/2000/xmlns/" => Some(Namespace::XmlNs),
            _ => None,
        }
    }
}

/// Content model of an open element, pushed onto the tokenizer when the
/// template parser enters the element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentModel {
    ParsableData,
    RawText,
    EscapableRawText,
}

pub static VOID_ELEMENTS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
        "source", "track", "wbr",
    ]
    .into_iter()
    .collect()
});

/// Raw-text content in the HTML namespace. Mustache recognition is
/// suspended inside these.
pub static RAW_TEXT_ELEMENTS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["script", "style"].into_iter().collect());

pub static RCDATA_ELEMENTS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["title", "textarea"].into_iter().collect());

/// Tags a following sibling may close implicitly: tag → the set of opening
/// tag names that close it.
pub static CLOSED_BY_SIBLINGS: Lazy<HashMap<&'static str, HashSet<&'static str>>> =
    Lazy::new(|| {
        let mut map: HashMap<&'static str, HashSet<&'static str>> = HashMap::new();
        map.insert(
            "p",
            [
                "address", "article", "aside", "blockquote", "details", "div", "dl", "fieldset",
                "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
                "header", "hgroup", "hr", "main", "menu", "nav", "ol", "p", "pre", "section",
                "table", "ul",
            ]
            .into_iter()
            .collect(),
        );
        map.insert("li", ["li"].into_iter().collect());
        map.insert("dt", ["dt", "dd"].into_iter().collect());
        map.insert("dd", ["dt", "dd"].into_iter().collect());
        map.insert("rt", ["rt", "rp"].into_iter().collect());
        map.insert("rp", ["rt", "rp"].into_iter().collect());
        map.insert("optgroup", ["optgroup"].into_iter().collect());
        map.insert("option", ["option", "optgroup"].into_iter().collect());
        map.insert("thead", ["tbody", "tfoot"].into_iter().collect());
        map.insert("tbody", ["tbody", "tfoot"].into_iter().collect());
        map.insert("tfoot", ["tbody"].into_iter().collect());
        map.insert("tr", ["tr", "tbody", "tfoot"].into_iter().collect());
        map.insert("td", ["td", "th", "tr", "tbody", "tfoot"].into_iter().collect());
        map.insert("th", ["td", "th", "tr", "tbody", "tfoot"].into_iter().collect());
        map.insert("colgroup", ["colgroup", "thead", "tbody", "tfoot", "tr"].into_iter().collect());
        map.insert("caption", ["colgroup", "thead", "tbody", "tfoot", "tr", "col"].into_iter().collect());
        map
    });

pub static HTML_ELEMENTS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "abbr", "address", "area", "article", "aside", "audio", "b", "base", "bdi", "bdo",
        "blockquote", "body", "br", "button", "canvas", "caption", "cite", "code", "col",
        "colgroup", "data", "datalist", "dd", "del", "details", "dfn", "dialog", "div", "dl",
        "dt", "em", "embed", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2",
        "h3", "h4", "h5", "h6", "head", "header", "hgroup", "hr", "html", "i", "iframe", "img",
        "input", "ins", "kbd", "label", "legend", "li", "link", "main", "map", "mark", "menu",
        "meta", "meter", "nav", "noscript", "object", "ol", "optgroup", "option", "output", "p",
        "param", "picture", "pre", "progress", "q", "rp", "rt", "ruby", "s", "samp", "script",
        "section", "select", "slot", "small", "source", "span", "strong", "style", "sub",
        "summary", "sup", "table", "tbody", "td", "template", "textarea", "tfoot", "th", "thead",
        "time", "title", "tr", "track", "u", "ul", "var", "video", "wbr",
    ]
    .into_iter()
    .collect()
});

/// SVG element names whose canonical form is mixed-case. Keys are the
/// lowercased names the tokenizer produces.
pub static SVG_ELEMENT_CASE: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("altglyph", "altGlyph"),
        ("altglyphdef", "altGlyphDef"),
        ("altglyphitem", "altGlyphItem"),
        ("animatecolor", "animateColor"),
        ("animatemotion", "animateMotion"),
        ("animatetransform", "animateTransform"),
        ("clippath", "clipPath"),
        ("feblend", "feBlend"),
        ("fecolormatrix", "feColorMatrix"),
        ("fecomponenttransfer", "feComponentTransfer"),
        ("fecomposite", "feComposite"),
        ("feconvolvematrix", "feConvolveMatrix"),
        ("fediffuselighting", "feDiffuseLighting"),
        ("fedisplacementmap", "feDisplacementMap"),
        ("fedistantlight", "feDistantLight"),
        ("fedropshadow", "feDropShadow"),
        ("feflood", "feFlood"),
        ("fefunca", "feFuncA"),
        ("fefuncb", "feFuncB"),
        ("fefuncg", "feFuncG"),
        ("fefuncr", "feFuncR"),
        ("fegaussianblur", "feGaussianBlur"),
        ("feimage", "feImage"),
        ("femerge", "feMerge"),
        ("femergenode", "feMergeNode"),
        ("femorphology", "feMorphology"),
        ("feoffset", "feOffset"),
        ("fepointlight", "fePointLight"),
        ("fespecularlighting", "feSpecularLighting"),
        ("fespotlight", "feSpotLight"),
        ("fetile", "feTile"),
        ("feturbulence", "feTurbulence"),
        ("foreignobject", "foreignObject"),
        ("glyphref", "glyphRef"),
        ("lineargradient", "linearGradient"),
        ("radialgradient", "radialGradient"),
        ("textpath", "textPath"),
    ]
    .into_iter()
    .collect()
});

/// SVG attribute names with canonical mixed case.
pub static SVG_ATTRIBUTE_CASE: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("attributename", "attributeName"),
        ("attributetype", "attributeType"),
        ("basefrequency", "baseFrequency"),
        ("baseprofile", "baseProfile"),
        ("calcmode", "calcMode"),
        ("clippathunits", "clipPathUnits"),
        ("diffuseconstant", "diffuseConstant"),
        ("edgemode", "edgeMode"),
        ("filterunits", "filterUnits"),
        ("glyphref", "glyphRef"),
        ("gradienttransform", "gradientTransform"),
        ("gradientunits", "gradientUnits"),
        ("kernelmatrix", "kernelMatrix"),
        ("kernelunitlength", "kernelUnitLength"),
        ("keypoints", "keyPoints"),
        ("keysplines", "keySplines"),
        ("keytimes", "keyTimes"),
        ("lengthadjust", "lengthAdjust"),
        ("limitingconeangle", "limitingConeAngle"),
        ("markerheight", "markerHeight"),
        ("markerunits", "markerUnits"),
        ("markerwidth", "markerWidth"),
        ("maskcontentunits", "maskContentUnits"),
        ("maskunits", "maskUnits"),
        ("numoctaves", "numOctaves"),
        ("pathlength", "pathLength"),
        ("patterncontentunits", "patternContentUnits"),
        ("patterntransform", "patternTransform"),
        ("patternunits", "patternUnits"),
        ("pointsatx", "pointsAtX"),
        ("pointsaty", "pointsAtY"),
        ("pointsatz", "pointsAtZ"),
        ("preservealpha", "preserveAlpha"),
        ("preserveaspectratio", "preserveAspectRatio"),
        ("primitiveunits", "primitiveUnits"),
        ("refx", "refX"),
        ("refy", "refY"),
        ("repeatcount", "repeatCount"),
        ("repeatdur", "repeatDur"),
        ("requiredextensions", "requiredExtensions"),
        ("requiredfeatures", "requiredFeatures"),
        ("specularconstant", "specularConstant"),
        ("specularexponent", "specularExponent"),
        ("spreadmethod", "spreadMethod"),
        ("startoffset", "startOffset"),
        ("stddeviation", "stdDeviation"),
        ("stitchtiles", "stitchTiles"),
        ("surfacescale", "surfaceScale"),
        ("systemlanguage", "systemLanguage"),
        ("tablevalues", "tableValues"),
        ("targetx", "targetX"),
        ("targety", "targetY"),
        ("textlength", "textLength"),
        ("viewbox", "viewBox"),
        ("viewtarget", "viewTarget"),
        ("xchannelselector", "xChannelSelector"),
        ("ychannelselector", "yChannelSelector"),
        ("zoomandpan", "zoomAndPan"),
    ]
    .into_iter()
    .collect()
});

/// MathML attribute names with canonical mixed case.
pub static MATHML_ATTRIBUTE_CASE: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| [("definitionurl", "definitionURL")].into_iter().collect());

/// Foreign attributes mapping to a non-element namespace.
pub fn foreign_attribute_namespace(name: &str) -> Option<Namespace> {
    match name {
        "xlink:actuate" | "xlink:arcrole" | "xlink:href" | "xlink:role" | "xlink:show"
        | "xlink:title" | "xlink:type" => Some(Namespace::XLink),
        "xml:lang" | "xml:space" => Some(Namespace::Xml),
        "xmlns" | "xmlns:xlink" => Some(Namespace::XmlNs),
        _ => None,
    }
}

/// MathML text integration points (HTML parsing resumes inside them).
pub fn is_mathml_text_integration_point(namespace: Namespace, name: &str) -> bool {
    namespace == Namespace::MathMl && matches!(name, "mi" | "mo" | "mn" | "ms" | "mtext")
}

/// HTML integration points in the SVG subtree.
pub fn is_html_integration_point(
    namespace: Namespace,
    name: &str,
    encoding_attr: Option<&str>,
) -> bool {
    match namespace {
        Namespace::Svg => matches!(name, "foreignObject" | "desc" | "title"),
        Namespace::MathMl => {
            name == "annotation-xml"
                && encoding_attr.map_or(false, |v| {
                    let v = v.to_ascii_lowercase();
                    v == "text/html" || v == "application/xhtml+xml"
                })
        }
        _ => false,
    }
}

/// Content model of an element, given its adjusted name, namespace, and
/// `lang` attribute. Only the HTML namespace carries raw-text models;
/// a non-HTML `lang` forces raw text so foreign template content is left
/// untokenized.
pub fn content_model_of(name: &str, namespace: Namespace, lang: Option<&str>) -> ContentModel {
    if namespace != Namespace::Html {
        return ContentModel::ParsableData;
    }
    if let Some(lang) = lang {
        if !lang.is_empty() && lang != "html" {
            return ContentModel::RawText;
        }
    }
    if RAW_TEXT_ELEMENTS.contains(name) {
        ContentModel::RawText
    } else if RCDATA_ELEMENTS.contains(name) {
        ContentModel::EscapableRawText
    } else {
        ContentModel::ParsableData
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_void_elements() {
        assert!(VOID_ELEMENTS.contains("br"));
        assert!(VOID_ELEMENTS.contains("img"));
        assert!(!VOID_ELEMENTS.contains("div"));
    }

    #[test]
    fn test_p_closed_by_block_siblings() {
        let closers = &CLOSED_BY_SIBLINGS["p"];
        assert!(closers.contains("div"));
        assert!(closers.contains("p"));
        assert!(!closers.contains("span"));
    }

    #[test]
    fn test_svg_case_restoration() {
        assert_eq!(SVG_ELEMENT_CASE.get("foreignobject"), Some(&"foreignObject"));
        assert_eq!(SVG_ATTRIBUTE_CASE.get("viewbox"), Some(&"viewBox"));
        assert_eq!(MATHML_ATTRIBUTE_CASE.get("definitionurl"), Some(&"definitionURL"));
    }

    #[test]
    fn test_content_models() {
        assert_eq!(
            content_model_of("script", Namespace::Html, None),
            ContentModel::RawText
        );
        assert_eq!(
            content_model_of("title", Namespace::Html, None),
            ContentModel::EscapableRawText
        );
        assert_eq!(
            content_model_of("script", Namespace::Svg, None),
            ContentModel::ParsableData
        );
        assert_eq!(
            content_model_of("template", Namespace::Html, Some("pug")),
            ContentModel::RawText
        );
        assert_eq!(
            content_model_of("template", Namespace::Html, Some("html")),
            ContentModel::ParsableData
        );
    }

    #[test]
    fn test_integration_points() {
        assert!(is_mathml_text_integration_point(Namespace::MathMl, "mi"));
        assert!(!is_mathml_text_integration_point(Namespace::Svg, "mi"));
        assert!(is_html_integration_point(Namespace::Svg, "foreignObject", None));
        assert!(is_html_integration_point(
            Namespace::MathMl,
            "annotation-xml",
            Some("text/html")
        ));
        assert!(!is_html_integration_point(Namespace::MathMl, "annotation-xml", None));
    }
}
