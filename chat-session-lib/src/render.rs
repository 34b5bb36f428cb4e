//! Markdown rendering + sanitizing, injected into the session as a pair of
//! pure functions.
//!
//! The session never interprets markup itself: every resolved bot message
//! goes through `sanitize(render_markdown(text))` exactly once, and the
//! result is stored verbatim in the transcript.

/// Converts bot text into displayable markup and makes that markup safe.
pub trait MessageRenderer {
    /// Markdown to markup (HTML for the widget, styled text for a terminal)
    fn render_markdown(&self, text: &str) -> String;

    /// Remove anything from `markup` that must not reach the display
    fn sanitize(&self, markup: &str) -> String;
}

impl<R: MessageRenderer + ?Sized> MessageRenderer for &R {
    fn render_markdown(&self, text: &str) -> String {
        (**self).render_markdown(text)
    }

    fn sanitize(&self, markup: &str) -> String {
        (**self).sanitize(markup)
    }
}

/// Adapter turning two closures into a [`MessageRenderer`].
pub struct FnRenderer<M, S> {
    markdown: M,
    sanitize: S,
}

impl<M, S> FnRenderer<M, S>
where
    M: Fn(&str) -> String,
    S: Fn(&str) -> String,
{
    pub fn new(markdown: M, sanitize: S) -> Self {
        Self { markdown, sanitize }
    }
}

impl<M, S> MessageRenderer for FnRenderer<M, S>
where
    M: Fn(&str) -> String,
    S: Fn(&str) -> String,
{
    fn render_markdown(&self, text: &str) -> String {
        (self.markdown)(text)
    }

    fn sanitize(&self, markup: &str) -> String {
        (self.sanitize)(markup)
    }
}

#[cfg(feature = "html")]
pub use html::HtmlRenderer;

#[cfg(feature = "html")]
mod html {
    use pulldown_cmark::{html, Options, Parser};

    use super::MessageRenderer;

    /// pulldown-cmark for markdown, ammonia for sanitizing.
    pub struct HtmlRenderer {
        options: Options,
        cleaner: ammonia::Builder<'static>,
    }

    impl HtmlRenderer {
        pub fn new() -> Self {
            let mut options = Options::empty();
            options.insert(Options::ENABLE_TABLES);
            options.insert(Options::ENABLE_STRIKETHROUGH);

            let mut cleaner = ammonia::Builder::default();
            cleaner.link_rel(Some("noopener noreferrer"));

            Self { options, cleaner }
        }
    }

    impl Default for HtmlRenderer {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MessageRenderer for HtmlRenderer {
        fn render_markdown(&self, text: &str) -> String {
            let parser = Parser::new_ext(text, self.options);
            let mut out = String::with_capacity(text.len() * 3 / 2);
            html::push_html(&mut out, parser);
            out
        }

        fn sanitize(&self, markup: &str) -> String {
            self.cleaner.clean(markup).to_string()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn render(text: &str) -> String {
            let renderer = HtmlRenderer::new();
            renderer.sanitize(&renderer.render_markdown(text))
        }

        #[test]
        fn renders_basic_markdown() {
            let out = render("**Sentadillas**: 3x10\n\n- uno\n- dos");
            assert!(out.contains("<strong>Sentadillas</strong>"));
            assert!(out.contains("<li>uno</li>"));
        }

        #[test]
        fn renders_tables() {
            let out = render("| a | b |\n|---|---|\n| 1 | 2 |");
            assert!(out.contains("<table>"));
            assert!(out.contains("<td>1</td>"));
        }

        #[test]
        fn strips_raw_script() {
            let out = render("hola <script>alert(1)</script> <b onclick=\"x()\">chau</b>");
            assert!(!out.contains("<script"));
            assert!(!out.contains("onclick"));
            assert!(out.contains("chau"));
        }

        #[test]
        fn strips_javascript_links() {
            let out = render("[click](javascript:alert(1))");
            assert!(!out.contains("javascript:"));
        }

        #[test]
        fn links_get_safe_rel() {
            let out = render("[docs](https://example.com)");
            assert!(out.contains("href=\"https://example.com\""));
            assert!(out.contains("rel=\"noopener noreferrer\""));
        }
    }
}
