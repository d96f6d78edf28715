//! HTML snippet the browser client injects as its hotbar.

/// One `<img>` per texture, in atlas order, with ids `hotbar0..`.
/// No wrapping element and no separators; the client queries the ids directly.
pub fn render_hotbar<S: AsRef<str>>(textures: &[S], src_prefix: &str) -> String {
    let mut out = String::new();
    for (i, name) in textures.iter().enumerate() {
        out.push_str(&format!(
            r#"<img src="{}{}" id="hotbar{}"/>"#,
            escape_attr(src_prefix),
            escape_attr(name.as_ref()),
            i
        ));
    }
    out
}

fn escape_attr(raw: &str) -> std::borrow::Cow<'_, str> {
    if !raw.contains(['&', '"', '<', '>']) {
        return raw.into();
    }
    let mut s = String::with_capacity(raw.len() + 8);
    for c in raw.chars() {
        match c {
            '&' => s.push_str("&amp;"),
            '"' => s.push_str("&quot;"),
            '<' => s.push_str("&lt;"),
            '>' => s.push_str("&gt;"),
            _ => s.push(c),
        }
    }
    s.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_historical_markup() {
        let html = render_hotbar(
            &["dirt.png", "cobblestone.png", "planks_oak.png"],
            "../assets/textures/",
        );
        assert_eq!(
            html,
            concat!(
                r#"<img src="../assets/textures/dirt.png" id="hotbar0"/>"#,
                r#"<img src="../assets/textures/cobblestone.png" id="hotbar1"/>"#,
                r#"<img src="../assets/textures/planks_oak.png" id="hotbar2"/>"#,
            )
        );
    }

    #[test]
    fn empty_list_renders_nothing() {
        let none: [&str; 0] = [];
        assert_eq!(render_hotbar(&none, "x/"), "");
    }

    #[test]
    fn attribute_breaking_characters_are_escaped() {
        let html = render_hotbar(&[r#"a"b&<c>.png"#], "");
        assert_eq!(html, r#"<img src="a&quot;b&amp;&lt;c&gt;.png" id="hotbar0"/>"#);
    }
}
