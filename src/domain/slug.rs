//! URL slug derived from a project title.

/// Lowercase, keep `[a-z0-9 -]`, whitespace runs become `-`, collapse and trim dashes.
pub fn generate_slug(title: &str) -> String {
    let kept: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == ' ' || *c == '-')
        .collect();

    let mut slug = String::with_capacity(kept.len());
    for c in kept.chars() {
        let c = if c == ' ' { '-' } else { c };
        if c == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(c);
    }
    slug.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::generate_slug;

    #[test]
    fn slug_from_title() {
        assert_eq!(generate_slug("Alpha Tool"), "alpha-tool");
        assert_eq!(generate_slug("  Hello,  World!  "), "hello-world");
        assert_eq!(generate_slug("C++ & Rust -- v2"), "c-rust-v2");
        assert_eq!(generate_slug("Café"), "caf");
        assert_eq!(generate_slug("---"), "");
    }
}
