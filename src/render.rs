//! Markdown → HTML adapter, including Obsidian wiki-link rewriting.

use once_cell::sync::Lazy;
use pulldown_cmark::{html, Options, Parser};
use regex::Regex;

// [[target|label]] must be rewritten before the bare [[target]] form, or the
// labeled variant would be half-consumed.
static WIKI_LINK_LABELED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\|\]]+)\|([^\]]+)\]\]").expect("valid regex"));
static WIKI_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\]]+)\]\]").expect("valid regex"));

/// Render a Markdown body to the HTML sent to the remote post `content`
/// field. Wiki links survive the Markdown pass as literal text and are
/// rewritten on the HTML output.
pub fn to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    rewrite_wiki_links(&out)
}

pub fn rewrite_wiki_links(html: &str) -> String {
    let html = WIKI_LINK_LABELED.replace_all(html, r##"<a href="#$1">$2</a>"##);
    WIKI_LINK
        .replace_all(&html, r##"<a href="#$1">$1</a>"##)
        .into_owned()
}
