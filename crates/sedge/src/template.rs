//! Template variables and `<name>` substitution
//!
//! A Host carries the `@with` declarations that preceded it. Each declaration expands to a list of
//! values and the Host is emitted once for every combination of values ([Combinations]).
//!
//! Substitution ([substitute]) scans the text once. A value that itself contains `<other>` is never
//! expanded a second time.
use crate::directive::TemplateVar;
use crate::error::ParseIssue;
use crate::output::{host_header, Stanza};
use indexmap::IndexMap;

/// `name -> value` bindings visible to substitution
pub type Variables = IndexMap<String, String>;

/// Largest number of values a single range token may expand to
pub const MAX_RANGE_VALUES: i128 = 1_000_000;

/// Expand a single domain token
///
/// `{A..B}` and `{A..B/C}` are inclusive integer ranges. If `A` and `B` are written with the same
/// width every value is zero-padded to that width. Anything not enclosed in braces is a literal.
/// A range longer than [`MAX_RANGE_VALUES`] is malformed.
pub fn expand_token(token: &str) -> Result<Vec<String>, ParseIssue> {
    let Some(range) = token
        .strip_prefix('{')
        .and_then(|inner| inner.strip_suffix('}'))
    else {
        return Ok(vec![token.to_string()]);
    };

    let not_integer = || ParseIssue::RangeNotInteger(token.to_string());

    let (range, step) = match range.rsplit_once('/') {
        Some((range, step)) => (range, step.trim().parse::<i64>().map_err(|_| not_integer())?),
        None => (range, 1),
    };

    if step < 1 {
        return Err(ParseIssue::RangeFormat(token.to_string()));
    }

    let parts: Vec<&str> = range.split("..").collect();
    let [from, to] = parts.as_slice() else {
        return Err(ParseIssue::RangeFormat(token.to_string()));
    };

    let start: i64 = from.trim().parse().map_err(|_| not_integer())?;
    let end: i64 = to.trim().parse().map_err(|_| not_integer())?;
    let padded = from.len() == to.len();
    let width = to.len();

    let span = i128::from(end) - i128::from(start);
    if span >= 0 && span / i128::from(step) >= MAX_RANGE_VALUES {
        return Err(ParseIssue::RangeFormat(token.to_string()));
    }

    let values = (start..=end)
        .step_by(step as usize)
        .map(|value| {
            if padded {
                format!("{value:0width$}")
            } else {
                value.to_string()
            }
        })
        .collect();

    Ok(values)
}

/// Expand every token of a domain and concatenate the results
pub fn expand_domain(tokens: &[String]) -> Result<Vec<String>, ParseIssue> {
    let mut values = vec![];
    for token in tokens {
        values.extend(expand_token(token)?);
    }
    Ok(values)
}

/// Cross product over the domains of a Host's template variables
///
/// The first variable varies slowest. Without any variables there is exactly one (empty)
/// combination, if any domain is empty there are none. Cloning restarts the sequence.
#[derive(Debug, Clone)]
pub struct Combinations {
    names: Vec<String>,
    domains: Vec<Vec<String>>,
    cursor: Option<Vec<usize>>,
}

impl Combinations {
    pub fn new(vars: &[TemplateVar]) -> Result<Self, ParseIssue> {
        let mut names = Vec::with_capacity(vars.len());
        let mut domains = Vec::with_capacity(vars.len());
        for var in vars {
            names.push(var.name.clone());
            domains.push(expand_domain(&var.domain)?);
        }

        let cursor = if domains.iter().any(Vec::is_empty) {
            None
        } else {
            Some(vec![0; domains.len()])
        };

        Ok(Self {
            names,
            domains,
            cursor,
        })
    }

    /// Number of combinations
    pub fn count_all(&self) -> usize {
        self.domains.iter().map(Vec::len).product()
    }

    /// Move to the next combination, last position first
    fn advance(&mut self) {
        let Some(cursor) = self.cursor.as_mut() else {
            return;
        };

        for position in (0..cursor.len()).rev() {
            cursor[position] += 1;
            if cursor[position] < self.domains[position].len() {
                return;
            }
            cursor[position] = 0;
        }

        // wrapped around (or there are no variables at all)
        self.cursor = None;
    }
}

impl Iterator for Combinations {
    /// `(variable name, value)` in declaration order
    type Item = Vec<(String, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.as_ref()?;

        let item = self
            .names
            .iter()
            .zip(&self.domains)
            .zip(cursor)
            .map(|((name, domain), index)| (name.clone(), domain[*index].clone()))
            .collect();

        self.advance();
        Some(item)
    }
}

/// Replace every `<name>` span in `text`
///
/// A span is `<`, one or more characters that are neither whitespace nor angle brackets, then `>`.
/// `lookup` returning `None` leaves the span untouched when `strict` is false and fails otherwise.
pub fn substitute<'v>(
    text: &str,
    lookup: impl Fn(&str) -> Option<&'v str>,
    strict: bool,
) -> Result<String, ParseIssue> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let name_len = after
            .find(|c: char| c == '>' || c == '<' || c.is_whitespace())
            .filter(|end| *end > 0 && after[*end..].starts_with('>'));

        let Some(name_len) = name_len else {
            out.push('<');
            rest = after;
            continue;
        };

        let name = &after[..name_len];
        match lookup(name) {
            Some(value) => out.push_str(value),
            None if strict => return Err(ParseIssue::UnresolvedVariable(name.to_string())),
            None => {
                out.push('<');
                out.push_str(name);
                out.push('>');
            }
        }
        rest = &after[name_len + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Substitute against a single set of variables, leaving unknown names in place
pub fn substitute_known(text: &str, variables: &Variables) -> String {
    // never fails when not strict
    substitute(text, |name| variables.get(name).map(String::as_str), false)
        .unwrap_or_else(|_| text.to_string())
}

/// The stanzas of one Host, one per combination of its template variables
///
/// `template` is the unsubstituted host name followed by the rendered, indented lines. Template
/// variables shadow document variables of the same name.
#[derive(Debug, Clone)]
pub struct Expansion<'d> {
    template: Vec<String>,
    combinations: Combinations,
    variables: &'d Variables,
}

impl<'d> Expansion<'d> {
    pub fn new(
        template: Vec<String>,
        vars: &[TemplateVar],
        variables: &'d Variables,
    ) -> Result<Self, ParseIssue> {
        Ok(Self {
            template,
            combinations: Combinations::new(vars)?,
            variables,
        })
    }
}

impl Iterator for Expansion<'_> {
    type Item = Result<Stanza, ParseIssue>;

    fn next(&mut self) -> Option<Self::Item> {
        let values = self.combinations.next()?;
        let lookup = |name: &str| {
            values
                .iter()
                .find(|(var, _)| var == name)
                .map(|(_, value)| value.as_str())
                .or_else(|| self.variables.get(name).map(String::as_str))
        };

        let lines: Result<Vec<String>, ParseIssue> = self
            .template
            .iter()
            .map(|line| substitute(line, lookup, true))
            .collect();

        Some(lines.map(|mut lines| {
            let host = lines.remove(0);
            lines.insert(0, host_header(&host));
            Stanza::new(Some(host), lines)
        }))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn var(name: &str, domain: &[&str]) -> TemplateVar {
        TemplateVar::new(
            name.to_string(),
            domain.iter().map(|t| t.to_string()).collect(),
        )
    }

    #[test]
    fn ranges() {
        assert_eq!(expand_token("{1..3}").unwrap(), ["1", "2", "3"]);
        assert_eq!(expand_token("{001..003}").unwrap(), ["001", "002", "003"]);
        assert_eq!(expand_token("{1..3/2}").unwrap(), ["1", "3"]);
        assert_eq!(expand_token("{001..003/2}").unwrap(), ["001", "003"]);
        assert_eq!(expand_token("{01..003/2}").unwrap(), ["1", "3"]);
        assert_eq!(expand_token("{8..11}").unwrap(), ["8", "9", "10", "11"]);
        assert_eq!(expand_token("{3..1}").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn literal_tokens() {
        assert_eq!(expand_token("millet").unwrap(), ["millet"]);
        assert_eq!(expand_token("{open").unwrap(), ["{open"]);
    }

    #[test]
    fn malformed_ranges() {
        for token in ["{1}", "{1..2..4}", "{001..002..004}", "{}"] {
            assert_eq!(
                expand_token(token),
                Err(ParseIssue::RangeFormat(token.to_string())),
                "{token}"
            );
        }
        for token in ["{1..cat}", "{001..cat}", "{1..3/x}"] {
            assert_eq!(
                expand_token(token),
                Err(ParseIssue::RangeNotInteger(token.to_string())),
                "{token}"
            );
        }
        assert!(expand_token("{1..3/0}").is_err());
    }

    #[test]
    fn huge_ranges_are_rejected() {
        for token in ["{0..9999999999}", "{-9223372036854775808..9223372036854775807}"] {
            assert_eq!(
                expand_token(token),
                Err(ParseIssue::RangeFormat(token.to_string())),
                "{token}"
            );
        }
        assert_eq!(expand_token("{1..999999}").unwrap().len(), 999_999);
        assert_eq!(expand_token("{0..9999999999/10000}").unwrap().len(), 1_000_000);
        assert_eq!(expand_token("{5..1}").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn domains_concatenate() {
        let domain = ["{1..2}".to_string(), "web".to_string()];
        assert_eq!(expand_domain(&domain).unwrap(), ["1", "2", "web"]);
    }

    #[test]
    fn cross_product_in_declaration_order() {
        let combinations = Combinations::new(&[var("i", &["1", "2"]), var("j", &["4", "5"])])
            .expect("valid domains");
        assert_eq!(combinations.count_all(), 4);

        let rendered: Vec<String> = combinations
            .map(|values| format!("p{}-{}", values[0].1, values[1].1))
            .collect();
        assert_eq!(rendered, ["p1-4", "p1-5", "p2-4", "p2-5"]);
    }

    #[test]
    fn no_variables_yields_one_combination() {
        let combinations = Combinations::new(&[]).unwrap();
        assert_eq!(
            combinations.collect::<Vec<_>>(),
            vec![Vec::<(String, String)>::new()]
        );
    }

    #[test]
    fn empty_domain_yields_nothing() {
        let combinations = Combinations::new(&[var("i", &["1"]), var("j", &[])]).unwrap();
        assert_eq!(combinations.count(), 0);
    }

    #[test]
    fn combinations_restart_when_cloned() {
        let combinations = Combinations::new(&[var("i", &["{1..3}"])]).unwrap();
        let first: Vec<_> = combinations.clone().collect();
        let second: Vec<_> = combinations.collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn substitution_is_single_pass() {
        let mut variables = Variables::new();
        variables.insert("a".into(), "<b>".into());
        variables.insert("b".into(), "bee".into());

        let out = substitute(
            "<a> and <b>",
            |name| variables.get(name).map(String::as_str),
            true,
        )
        .unwrap();
        assert_eq!(out, "<b> and bee");
    }

    #[test]
    fn substitution_ignores_non_variable_brackets() {
        let variables = Variables::new();
        let text = "ProxyCommand ssh gw nc %h %p 2> /dev/null < x <>";
        let out = substitute(text, |name| variables.get(name).map(String::as_str), true);
        assert_eq!(out.unwrap(), text);
    }

    #[test]
    fn strict_substitution_reports_missing_variable() {
        let variables = Variables::new();
        let out = substitute(
            "Host <missing>",
            |name| variables.get(name).map(String::as_str),
            true,
        );
        assert_eq!(out, Err(ParseIssue::UnresolvedVariable("missing".into())));
    }

    #[test]
    fn lenient_substitution_keeps_unknown_names() {
        let mut variables = Variables::new();
        variables.insert("known".into(), "yes".into());
        assert_eq!(substitute_known("<known>-<later>", &variables), "yes-<later>");
    }
}
