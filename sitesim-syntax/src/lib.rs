//! tree-sitter frontends for the `sitesim-core` similarity engine.
//!
//! This crate provides one parser per artifact family, each implementing the
//! matching [`sitesim_core::analyzer`] trait:
//!
//! - [`HtmlParser`]: HTML documents to element trees
//! - [`JsxParser`]: JSX/TSX component markup to element trees
//! - [`ScriptFrontend`]: JavaScript/TypeScript to normalized ASTs and call graphs
//! - [`CssParser`]: stylesheets to rule lists
//!
//! [`registry`] bundles them for an analysis run.

pub mod css;
pub mod html;
pub mod jsx;
pub mod script;
pub mod tailwind;
mod tree;

pub use css::CssParser;
pub use html::HtmlParser;
pub use jsx::JsxParser;
pub use script::ScriptFrontend;

use sitesim_core::analyzer::FrontendRegistry;

/// The registry of tree-sitter frontends.
#[must_use]
pub fn registry() -> FrontendRegistry {
    FrontendRegistry {
        html: Box::new(HtmlParser::new()),
        jsx: Box::new(JsxParser::new()),
        script: Box::new(ScriptFrontend::new()),
        style: Box::new(CssParser::new()),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use sitesim_core::analyzer::ParseOptions;
    use sitesim_core::script::Dialect;

    use super::*;

    #[test]
    fn registry_wires_every_frontend() {
        let registry = registry();
        let options = ParseOptions::default();
        let page = registry
            .html
            .parse_markup(Path::new("a.html"), "<p>hi</p>", &options)
            .unwrap();
        assert_eq!(page.unwrap().tag(), "p");

        let component = registry
            .jsx
            .parse_markup(Path::new("A.jsx"), "const A = () => <div/>;", &options)
            .unwrap();
        assert_eq!(component.unwrap().tag(), "div");

        let module = registry
            .script
            .parse_script(Path::new("a.js"), "function f() {}", Dialect::JavaScript, &options)
            .unwrap();
        assert!(module.ast.is_some());

        let sheet = registry
            .style
            .parse_stylesheet(Path::new("a.css"), ".a { color: red; }", &options)
            .unwrap();
        assert_eq!(sheet.rules.len(), 1);
    }
}
