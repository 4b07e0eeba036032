//! Markup rendering collaborator
//!
//! The protocol does not define a markup language. A [`Renderer`] takes the
//! built component (markup plus protocol metadata) and produces the final
//! string placed in the response's `html` field.

pub use crate::component::BuiltComponent;

/// Turns a built component into the response markup
pub trait Renderer: Send + Sync {
    /// Name for logging
    fn name(&self) -> &'static str;

    /// Must not have side effects
    fn render(&self, component: &BuiltComponent) -> String;
}

/// Wraps component markup in a root element carrying the wire metadata
///
/// ```html
/// <div data-wire-component="counter" data-wire-id="counter-1"
///      data-wire-state="…" data-wire-listeners="reset">…</div>
/// ```
///
/// A hidden component renders as an empty string.
#[derive(Debug, Clone, Default)]
pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn name(&self) -> &'static str {
        "html"
    }

    fn render(&self, component: &BuiltComponent) -> String {
        if !component.visible {
            return String::new();
        }

        format!(
            r#"<div data-wire-component="{}" data-wire-id="{}" data-wire-state="{}" data-wire-listeners="{}">{}</div>"#,
            escape_html(&component.type_name),
            escape_html(&component.component_id),
            escape_html(&component.state_token),
            escape_html(&component.listeners.join(" ")),
            component.markup
        )
    }
}

/// Passes component markup through untouched
///
/// For hosts that embed the metadata themselves.
#[derive(Debug, Clone, Default)]
pub struct BareRenderer;

impl Renderer for BareRenderer {
    fn name(&self) -> &'static str {
        "bare"
    }

    fn render(&self, component: &BuiltComponent) -> String {
        component.markup.clone()
    }
}

/// Escape text for use in HTML content or a quoted attribute value
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
