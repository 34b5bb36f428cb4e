//! Markdown to ANSI conversion for bot replies.
//!
//! Bot text is walked as pulldown-cmark events and styled with `colored`.
//! The sanitizer then drops every escape sequence except SGR styling so a
//! reply can never move the cursor, clear the screen or retitle the window.

use chat_session_lib::MessageRenderer;
use colored::{ColoredString, Colorize};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

const ESC: char = '\u{1b}';

/// Inline style flags in effect for a run of text.
#[derive(Debug, Clone, Copy, Default)]
struct Style {
    bold: bool,
    italic: bool,
    strike: bool,
    heading: bool,
    link: bool,
    quote: bool,
}

impl Style {
    fn apply(self, text: &str) -> ColoredString {
        let mut styled = text.normal();
        if self.heading {
            styled = styled.bright_magenta().bold();
        }
        if self.bold {
            styled = styled.bold();
        }
        if self.italic || self.quote {
            styled = styled.italic();
        }
        if self.strike {
            styled = styled.strikethrough();
        }
        if self.link {
            styled = styled.bright_blue().underline();
        }
        styled
    }
}

/// Markdown renderer state.
struct AnsiWriter {
    lines: Vec<String>,
    current: String,
    style_stack: Vec<Style>,
    in_code_block: bool,
    code_block_content: String,
    code_block_lang: Option<String>,
    /// One entry per open list; `Some(n)` for ordered lists
    lists: Vec<Option<u64>>,
    link_dest: Option<String>,
    table_row: Vec<String>,
    in_table_head: bool,
}

impl AnsiWriter {
    fn new() -> Self {
        Self {
            lines: Vec::new(),
            current: String::new(),
            style_stack: vec![Style::default()],
            in_code_block: false,
            code_block_content: String::new(),
            code_block_lang: None,
            lists: Vec::new(),
            link_dest: None,
            table_row: Vec::new(),
            in_table_head: false,
        }
    }

    fn current_style(&self) -> Style {
        self.style_stack.last().copied().unwrap_or_default()
    }

    fn push_style(&mut self, change: impl FnOnce(&mut Style)) {
        let mut style = self.current_style();
        change(&mut style);
        self.style_stack.push(style);
    }

    fn pop_style(&mut self) {
        if self.style_stack.len() > 1 {
            self.style_stack.pop();
        }
    }

    fn flush_line(&mut self) {
        if !self.current.is_empty() {
            let line = std::mem::take(&mut self.current);
            self.lines.push(line);
        }
    }

    fn add_blank_line(&mut self) {
        self.flush_line();
        if self.lines.last().is_some_and(|l| !l.is_empty()) {
            self.lines.push(String::new());
        }
    }

    fn add_text(&mut self, text: &str) {
        if self.in_code_block {
            self.code_block_content.push_str(text);
            return;
        }

        let style = self.current_style();
        for (i, part) in text.split('\n').enumerate() {
            if i > 0 {
                self.flush_line();
            }
            if !part.is_empty() {
                self.current.push_str(&style.apply(part).to_string());
            }
        }
    }

    fn render_code_block(&mut self) {
        let content = std::mem::take(&mut self.code_block_content);
        let lang = self.code_block_lang.take().unwrap_or_default();

        self.flush_line();
        if !lang.is_empty() {
            self.lines.push(format!("  {}", lang.dimmed()));
        }
        for line in content.lines() {
            self.lines.push(format!("  {} {}", "│".dimmed(), line.yellow()));
        }
        self.add_blank_line();
    }

    fn list_prefix(&mut self) -> String {
        let indent = "  ".repeat(self.lists.len().saturating_sub(1));
        match self.lists.last_mut() {
            Some(Some(n)) => {
                let prefix = format!("{}{}. ", indent, n);
                *n += 1;
                prefix
            }
            _ => format!("{}• ", indent),
        }
    }

    fn handle_start_tag(&mut self, tag: Tag) {
        match tag {
            Tag::Heading { .. } => {
                self.add_blank_line();
                self.push_style(|s| s.heading = true);
            }
            Tag::Paragraph => {
                self.flush_line();
            }
            Tag::BlockQuote(_) => {
                self.flush_line();
                self.push_style(|s| s.quote = true);
                self.current.push_str(&format!("{} ", "▌".dimmed()));
            }
            Tag::CodeBlock(kind) => {
                self.flush_line();
                self.in_code_block = true;
                if let CodeBlockKind::Fenced(lang) = kind {
                    let lang = lang.trim();
                    if !lang.is_empty() {
                        self.code_block_lang = Some(lang.to_string());
                    }
                }
            }
            Tag::List(first) => {
                self.flush_line();
                self.lists.push(first);
            }
            Tag::Item => {
                self.flush_line();
                let prefix = self.list_prefix();
                self.current.push_str(&prefix.bright_magenta().to_string());
            }
            Tag::Emphasis => self.push_style(|s| s.italic = true),
            Tag::Strong => self.push_style(|s| s.bold = true),
            Tag::Strikethrough => self.push_style(|s| s.strike = true),
            Tag::Link { dest_url, .. } => {
                self.link_dest = Some(dest_url.to_string());
                self.push_style(|s| s.link = true);
            }
            Tag::TableHead => self.in_table_head = true,
            Tag::TableRow => self.table_row.clear(),
            Tag::TableCell => self.flush_line(),
            _ => {}
        }
    }

    fn handle_end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Heading(_) => {
                self.pop_style();
                self.add_blank_line();
            }
            TagEnd::Paragraph => {
                if self.lists.is_empty() {
                    self.add_blank_line();
                } else {
                    self.flush_line();
                }
            }
            TagEnd::BlockQuote(_) => {
                self.pop_style();
                self.add_blank_line();
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.render_code_block();
            }
            TagEnd::List(_) => {
                self.lists.pop();
                self.flush_line();
                if self.lists.is_empty() {
                    self.add_blank_line();
                }
            }
            TagEnd::Item => self.flush_line(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_style(),
            TagEnd::Link => {
                self.pop_style();
                if let Some(dest) = self.link_dest.take() {
                    self.current.push_str(&format!(" ({})", dest.dimmed()));
                }
            }
            TagEnd::TableCell => {
                let cell = std::mem::take(&mut self.current);
                self.table_row.push(cell);
            }
            TagEnd::TableHead | TagEnd::TableRow => {
                let row = std::mem::take(&mut self.table_row);
                let separator = format!(" {} ", "│".dimmed());
                self.lines.push(row.join(&separator));
                if self.in_table_head {
                    self.in_table_head = false;
                    self.lines.push("─".repeat(24).dimmed().to_string());
                }
            }
            TagEnd::Table => self.add_blank_line(),
            _ => {}
        }
    }

    fn render(mut self, text: &str) -> String {
        let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES;
        let parser = Parser::new_ext(text, options);

        for event in parser {
            match event {
                Event::Start(tag) => self.handle_start_tag(tag),
                Event::End(tag) => self.handle_end_tag(tag),
                Event::Text(text) => self.add_text(&text),
                Event::Code(code) => {
                    self.current.push_str(&code.yellow().to_string());
                }
                Event::Html(raw) | Event::InlineHtml(raw) => {
                    // Shown literally, the sanitizer strips anything harmful
                    self.add_text(&raw);
                }
                // In a terminal a soft break reads better as a real line break
                Event::SoftBreak | Event::HardBreak => self.flush_line(),
                Event::Rule => {
                    self.flush_line();
                    self.lines.push("─".repeat(40).dimmed().to_string());
                }
                _ => {}
            }
        }

        self.flush_line();
        while self.lines.last().is_some_and(|l| l.is_empty()) {
            self.lines.pop();
        }

        self.lines.join("\n")
    }
}

/// Markdown to ANSI text, SGR-only sanitizing.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnsiRenderer;

impl AnsiRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl MessageRenderer for AnsiRenderer {
    fn render_markdown(&self, text: &str) -> String {
        AnsiWriter::new().render(text)
    }

    fn sanitize(&self, markup: &str) -> String {
        sanitize_ansi(markup)
    }
}

/// Keep SGR sequences (`ESC [ ... m`), newlines and tabs; drop every other
/// escape sequence and control character.
pub fn sanitize_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            ESC => match chars.peek() {
                Some('[') => {
                    chars.next();
                    let mut sequence = String::new();
                    let mut final_byte = None;
                    for c in chars.by_ref() {
                        if ('\u{40}'..='\u{7e}').contains(&c) {
                            final_byte = Some(c);
                            break;
                        }
                        sequence.push(c);
                    }
                    let is_sgr = final_byte == Some('m')
                        && sequence.chars().all(|c| c.is_ascii_digit() || c == ';');
                    if is_sgr {
                        out.push(ESC);
                        out.push('[');
                        out.push_str(&sequence);
                        out.push('m');
                    }
                }
                Some(']') => {
                    // OSC: runs to BEL or ESC '\'
                    chars.next();
                    while let Some(c) = chars.next() {
                        if c == '\u{7}' {
                            break;
                        }
                        if c == ESC {
                            chars.next_if_eq(&'\\');
                            break;
                        }
                    }
                }
                Some(_) => {
                    chars.next();
                }
                None => {}
            },
            '\n' | '\t' => out.push(c),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }

    out
}

/// Drop all control characters except newline and tab. Used for streamed
/// deltas, which are printed before any markdown styling exists.
pub fn strip_control(text: &str) -> String {
    text.chars()
        .filter(|&c| c == '\n' || c == '\t' || !c.is_control())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(text: &str) -> String {
        colored::control::set_override(true);
        let renderer = AnsiRenderer::new();
        renderer.sanitize(&renderer.render_markdown(text))
    }

    #[test]
    fn sgr_sequences_survive() {
        let input = "\u{1b}[1mbold\u{1b}[0m and \u{1b}[38;5;200mpink\u{1b}[0m";
        assert_eq!(sanitize_ansi(input), input);
    }

    #[test]
    fn cursor_and_screen_sequences_are_dropped() {
        assert_eq!(sanitize_ansi("a\u{1b}[2Jb\u{1b}[10;5Hc"), "abc");
        assert_eq!(sanitize_ansi("x\u{1b}[?25ly"), "xy");
    }

    #[test]
    fn osc_title_is_dropped() {
        assert_eq!(sanitize_ansi("\u{1b}]0;pwned\u{7}hola"), "hola");
        assert_eq!(sanitize_ansi("\u{1b}]0;pwned\u{1b}\\hola"), "hola");
    }

    #[test]
    fn control_characters_are_dropped() {
        assert_eq!(sanitize_ansi("a\rb\u{7}c\u{8}d\n\te"), "abcd\n\te");
        assert_eq!(strip_control("pa\u{1b}[2Jrt\r\n"), "pa[2Jrt\n");
    }

    #[test]
    fn renders_emphasis_without_markers() {
        let out = render("Hacé **3 series** de _sentadillas_");
        assert!(out.contains("3 series"));
        assert!(out.contains("sentadillas"));
        assert!(!out.contains("**"));
        assert!(out.contains("\u{1b}[1m"));
    }

    #[test]
    fn renders_lists_line_by_line() {
        let out = render("- uno\n- dos\n\n1. primero\n2. segundo");
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines.iter().any(|l| l.contains("• ") && l.contains("uno")));
        assert!(lines.iter().any(|l| l.contains("• ") && l.contains("dos")));
        assert!(lines.iter().any(|l| l.contains("1. ") && l.contains("primero")));
        assert!(lines.iter().any(|l| l.contains("2. ") && l.contains("segundo")));
    }

    #[test]
    fn renders_code_blocks_indented() {
        let out = render("```\nlet x = 1;\n```");
        assert!(out.lines().any(|l| l.starts_with("  ") && l.contains("let x = 1;")));
    }

    #[test]
    fn escape_sequences_in_replies_are_neutralized() {
        let out = render("hola \u{1b}[2J\u{1b}]0;x\u{7}mundo");
        assert!(out.contains("hola"));
        assert!(out.contains("mundo"));
        assert!(!out.contains("[2J"));
        assert!(!out.contains("\u{7}"));
    }

    #[test]
    fn links_show_destination() {
        let out = render("[docs](https://example.com)");
        assert!(out.contains("docs"));
        assert!(out.contains("https://example.com"));
    }
}
