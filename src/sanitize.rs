use scraper::Html;

/// Strips markup and surrounding whitespace. Callers validate the result, never the raw input.
///
/// Text that only spelled markup through entities (`&lt;b&gt;`) stays escaped, so
/// `clean(clean(s)) == clean(s)` and the output never contains a tag.
pub fn clean(raw: &str) -> String {
    let fragment = Html::parse_fragment(raw);
    let text = fragment.root_element().text().collect::<String>();
    escape(text.trim())
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}
