/// Name under which the session token travels in the `Cookie` header.
pub const TOKEN_COOKIE: &str = "kindred";

/// Find `key` followed by `:` or `=` anywhere in a raw header value and return
/// the run of characters after it, up to whitespace or `;`.
///
/// The first occurrence with a non-empty value wins.
pub fn extract_token<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    if key.is_empty() {
        return None;
    }

    for (idx, _) in header.match_indices(key) {
        let rest = &header[idx + key.len()..];
        if !rest.starts_with([':', '=']) {
            continue;
        }

        let value = &rest[1..];
        let end = value
            .find(|c: char| c.is_whitespace() || c == ';')
            .unwrap_or(value.len());
        if end > 0 {
            return Some(&value[..end]);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_cookie_with_equals() {
        let header = "theme=dark; kindred=abc.def.ghi; lang=en";
        assert_eq!(extract_token(header, TOKEN_COOKIE), Some("abc.def.ghi"));
    }

    #[test]
    fn accepts_colon_separator() {
        assert_eq!(extract_token("kindred:tok123", TOKEN_COOKIE), Some("tok123"));
    }

    #[test]
    fn value_stops_at_whitespace() {
        assert_eq!(extract_token("kindred=tok123 trailing", TOKEN_COOKIE), Some("tok123"));
    }

    #[test]
    fn skips_empty_values() {
        assert_eq!(
            extract_token("kindred=; other=1; kindred=second", TOKEN_COOKIE),
            Some("second")
        );
    }

    #[test]
    fn missing_token_yields_none() {
        assert_eq!(extract_token("", TOKEN_COOKIE), None);
        assert_eq!(extract_token("session=xyz; theme=dark", TOKEN_COOKIE), None);
        assert_eq!(extract_token("kindred token", TOKEN_COOKIE), None);
    }
}
