//! Splitting a single configuration line into keyword and arguments
//!
//! From the ssh_config manual page:
//! > Configuration options may be separated by whitespace or optional whitespace and exactly one `=`;
//! > the latter format is useful to avoid the need to quote whitespace when specifying configuration
//! > options using the ssh, scp, and sftp -o option. Arguments may optionally be enclosed in double
//! > quotes (") in order to represent arguments containing spaces.
use crate::error::ParseIssue;

/// One `keyword arguments...` pair
#[derive(derive_new::new, Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Line {
    pub keyword: String,
    pub args: Vec<String>,
}

impl Line {
    /// Parse a trimmed line that is neither blank nor a comment
    ///
    /// A line containing `=` is split once on the first `=` and always yields exactly one
    /// argument, whitespace inside the value included.
    pub fn parse(line: &str) -> Result<Self, ParseIssue> {
        let line = line.trim();

        if let Some((keyword, value)) = line.split_once('=') {
            return Ok(Line::new(
                keyword.trim_end().to_string(),
                vec![value.trim_start().to_string()],
            ));
        }

        let (keyword, other) = line
            .split_once(char::is_whitespace)
            .unwrap_or((line, ""));

        Ok(Line::new(keyword.to_string(), split_arguments(other.trim())?))
    }
}

/// Whether a raw input line carries no directive
pub fn is_ignored(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with('#')
}

/// Tokenize whitespace separated arguments honoring double quotes
fn split_arguments(other: &str) -> Result<Vec<String>, ParseIssue> {
    let mut args = vec![];
    let mut current = String::new();
    let mut in_quote = false;

    fn pop(current: &mut String, args: &mut Vec<String>) {
        if !current.is_empty() {
            args.push(std::mem::take(current));
        }
    }

    for c in other.chars() {
        if in_quote {
            if c == '"' {
                in_quote = false;
                pop(&mut current, &mut args);
            } else {
                current.push(c);
            }
        } else if c == '"' {
            if !current.is_empty() {
                return Err(ParseIssue::QuoteWithinArgument);
            }
            in_quote = true;
        } else if c.is_whitespace() {
            pop(&mut current, &mut args);
        } else {
            current.push(c);
        }
    }

    if in_quote {
        return Err(ParseIssue::UnterminatedQuote);
    }
    pop(&mut current, &mut args);

    Ok(args)
}
