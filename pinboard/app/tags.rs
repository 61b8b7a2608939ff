//! Free-form tag input.
//!
//! Tags are typed as one string, separated by commas when the input has any,
//! by whitespace otherwise. A double-quoted group is kept as a single tag.
//! Every tag is compared through its slug.

/// Splits user input into distinct tag names, sorted.
pub fn parse_tags(input: &str) -> Vec<String> {
    let raw: Vec<String> = if input.contains(',') {
        input.split(',').map(|s| s.to_owned()).collect()
    } else {
        split_whitespace_quoted(input)
    };
    let mut names: Vec<String> = Vec::new();
    for name in raw {
        let name = name.trim().trim_matches('"').trim();
        if name.is_empty() {
            continue;
        }
        if slugify(name).is_empty() {
            continue;
        }
        if !names.iter().any(|n| slugify(n) == slugify(name)) {
            names.push(name.to_owned());
        }
    }
    names.sort();
    names
}

fn split_whitespace_quoted(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in input.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                if !quoted && !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Lower-cases, drops punctuation and joins words with `-`. Letters outside
/// ASCII are kept.
pub fn slugify(tag: &str) -> String {
    let mut slug = String::with_capacity(tag.len());
    let mut pending_dash = false;
    for c in tag.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }
    slug.trim_matches('_').to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("autumn, nature", &["autumn", "nature"]; "comma separated")]
    #[test_case("autumn nature", &["autumn", "nature"]; "space separated")]
    #[test_case("black cat, nature", &["black cat", "nature"]; "commas keep spaces")]
    #[test_case("\"black cat\" nature", &["black cat", "nature"]; "quoted group")]
    #[test_case("cat, Cat ,, ", &["cat"]; "duplicates and blanks")]
    #[test_case("осень природа", &["осень", "природа"]; "non ascii")]
    #[test_case("  ", &[]; "nothing")]
    #[test_case("!!!, cat", &["cat"]; "punctuation only tags are dropped")]
    fn test_parse_tags(input: &str, expected: &[&str]) {
        assert_eq!(parse_tags(input), expected);
    }

    #[test_case("Cat", "cat")]
    #[test_case("Black  Cat", "black-cat")]
    #[test_case("black-cat", "black-cat")]
    #[test_case("  -cats!- ", "cats")]
    #[test_case("Осень", "осень")]
    #[test_case("c++", "c")]
    fn test_slugify(input: &str, expected: &str) {
        assert_eq!(slugify(input), expected);
    }
}
