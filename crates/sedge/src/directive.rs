//! Keyword dispatch
//!
//! Every parsed [Line] is classified once into a [Directive] carrying its validated arguments.
use crate::error::ParseIssue;
use crate::line::Line;

/// Keywords starting with this character are handled by sedge, never passed through
pub const DIRECTIVE_PREFIX: char = '@';

/// A template variable and the tokens of its domain (`@with <name> <token>...`)
#[derive(derive_new::new, Debug, Clone, PartialEq)]
pub struct TemplateVar {
    pub name: String,
    pub domain: Vec<String>,
}

#[derive(Debug, PartialEq)]
pub enum Directive {
    /// `Host <name>`
    Host(String),
    /// `@HostAttrs <name>`
    HostAttrs(String),
    /// `@with <name> <token>...`
    With(TemplateVar),
    /// `@is <name>`
    Is(String),
    /// `@via <gateway>`
    Via(String),
    /// `@identity <name>`
    Identity(String),
    /// `@key <name> <fingerprint>...`
    Key {
        name: String,
        fingerprints: Vec<String>,
    },
    /// `@include <source> [arg...]`
    Include { source: String, args: Vec<String> },
    /// `@set <key> <value>`
    Set { key: String, value: String },
    /// `@args <name>...`
    Args(Vec<String>),
    /// anything else is passed through
    Literal(Line),
}

impl TryFrom<Line> for Directive {
    type Error = ParseIssue;

    fn try_from(line: Line) -> Result<Self, Self::Error> {
        let usage = |text: &'static str, args: Vec<String>| ParseIssue::Usage {
            usage: text,
            found: args,
        };

        let Line { keyword, mut args } = line;

        let directive = match keyword.as_str() {
            "Host" => match <[String; 1]>::try_from(args) {
                Ok([name]) => Directive::Host(name),
                Err(args) => return Err(usage("Host <hostname>", args)),
            },
            "@HostAttrs" => match <[String; 1]>::try_from(args) {
                Ok([name]) => Directive::HostAttrs(name),
                Err(args) => return Err(usage("@HostAttrs <hostname>", args)),
            },
            "@with" => {
                if args.is_empty() {
                    return Err(usage("@with <variable> <value>...", args));
                }
                let name = args.remove(0);
                Directive::With(TemplateVar::new(name, args))
            }
            "@is" => match <[String; 1]>::try_from(args) {
                Ok([name]) => Directive::Is(name),
                Err(args) => return Err(usage("@is <HostAttrName>", args)),
            },
            "@via" => match <[String; 1]>::try_from(args) {
                Ok([gateway]) => Directive::Via(gateway),
                Err(args) => return Err(usage("@via <Hostname>", args)),
            },
            "@identity" => match <[String; 1]>::try_from(args) {
                Ok([name]) => Directive::Identity(name),
                Err(args) => return Err(usage("@identity <name>", args)),
            },
            "@key" => {
                if args.len() < 2 {
                    return Err(usage("@key <name> [fingerprint]...", args));
                }
                let name = args.remove(0);
                Directive::Key {
                    name,
                    fingerprints: args,
                }
            }
            "@include" => {
                if args.is_empty() {
                    return Err(usage(
                        "@include <https://...|/path/to/file.sedge> [arg ...]",
                        args,
                    ));
                }
                let source = args.remove(0);
                Directive::Include { source, args }
            }
            "@set" => match <[String; 2]>::try_from(args) {
                Ok([key, value]) => Directive::Set { key, value },
                Err(args) => return Err(usage("@set <key> <value>", args)),
            },
            "@args" => {
                if args.is_empty() {
                    return Err(usage("@args arg-name ...", args));
                }
                Directive::Args(args)
            }
            other if other.starts_with(DIRECTIVE_PREFIX) => {
                return Err(ParseIssue::UnknownDirective(keyword));
            }
            _ => Directive::Literal(Line::new(keyword, args)),
        };

        Ok(directive)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn directive(line: &str) -> Result<Directive, ParseIssue> {
        Directive::try_from(Line::parse(line).expect("line must parse"))
    }

    #[test]
    fn sections() {
        assert_eq!(directive("Host blah"), Ok(Directive::Host("blah".into())));
        assert_eq!(
            directive("@HostAttrs base"),
            Ok(Directive::HostAttrs("base".into()))
        );
    }

    #[test]
    fn host_needs_exactly_one_name() {
        assert!(matches!(
            directive("Host a b"),
            Err(ParseIssue::Usage { found, .. }) if found == ["a", "b"]
        ));
        assert!(matches!(directive("Host"), Err(ParseIssue::Usage { .. })));
    }

    #[test]
    fn with_splits_name_and_domain() {
        assert_eq!(
            directive("@with i 1 2"),
            Ok(Directive::With(TemplateVar::new(
                "i".into(),
                vec!["1".into(), "2".into()]
            )))
        );
    }

    #[test]
    fn key_requires_a_fingerprint() {
        assert!(matches!(
            directive("@key work"),
            Err(ParseIssue::Usage { .. })
        ));
        assert_eq!(
            directive("@key work aa:bb cc:dd"),
            Ok(Directive::Key {
                name: "work".into(),
                fingerprints: vec!["aa:bb".into(), "cc:dd".into()],
            })
        );
    }

    #[test]
    fn include_with_arguments() {
        assert_eq!(
            directive("@include other.sedge <a> b"),
            Ok(Directive::Include {
                source: "other.sedge".into(),
                args: vec!["<a>".into(), "b".into()],
            })
        );
    }

    #[test]
    fn set_needs_key_and_value() {
        assert!(matches!(directive("@set a"), Err(ParseIssue::Usage { .. })));
        assert!(matches!(
            directive("@set a b c"),
            Err(ParseIssue::Usage { .. })
        ));
    }

    #[test]
    fn unknown_directive() {
        assert_eq!(
            directive("@frobnicate x"),
            Err(ParseIssue::UnknownDirective("@frobnicate".into()))
        );
    }

    #[test]
    fn literal_passthrough() {
        assert_eq!(
            directive("ForwardAgent yes"),
            Ok(Directive::Literal(Line::new(
                "ForwardAgent".into(),
                vec!["yes".into()]
            )))
        );
    }
}
