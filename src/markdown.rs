use pulldown_cmark::{html, Event, Options, Parser, Tag};

/// Converts a markdown body to HTML. Headings are pushed down one level so a
/// post's own `#` headings stay subordinate to the page title (`h1`) that the
/// article template renders.
pub fn to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(
        &mut out,
        Parser::new_ext(markdown, options).map(|ev| match ev {
            Event::Start(Tag::Heading(level)) => Event::Start(Tag::Heading(demote(level))),
            Event::End(Tag::Heading(level)) => Event::End(Tag::Heading(demote(level))),
            _ => ev,
        }),
    );
    out
}

fn demote(level: u32) -> u32 {
    (level + 1).min(6)
}
