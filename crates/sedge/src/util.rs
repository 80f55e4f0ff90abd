/// Quote a string for use as a single word in a POSIX shell command line
///
/// Strings made only of characters that are never special to the shell are returned unchanged.
pub(crate) fn shell_quote(value: &str) -> String {
    fn is_safe(c: char) -> bool {
        c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c)
    }

    if value.is_empty() {
        return "''".to_string();
    }

    if value.chars().all(is_safe) {
        return value.to_string();
    }

    format!("'{}'", value.replace('\'', r#"'"'"'"#))
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn safe_words_are_unchanged() {
        assert_eq!(shell_quote("gateway"), "gateway");
        assert_eq!(shell_quote("/home/user/.ssh/id_rsa"), "/home/user/.ssh/id_rsa");
        assert_eq!(shell_quote("user@host:22"), "user@host:22");
    }

    #[test]
    fn unsafe_words_are_quoted() {
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("my key"), "'my key'");
        assert_eq!(shell_quote("<gw>"), "'<gw>'");
        assert_eq!(shell_quote("it's"), r#"'it'"'"'s'"#);
    }
}
