//! Fatal errors and non-fatal warnings
//!
//! Every fatal error names the document it happened in. Parse-time errors also carry the line number,
//! resolve/output-time errors carry the section that was being expanded.
use std::fmt::Formatter;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Malformed input found while reading a document
    #[error("{locator}, line {line}: {issue}")]
    Parse {
        locator: String,
        line: usize,
        issue: ParseIssue,
    },

    /// Malformed input found while expanding a section
    #[error("{locator}, section '{section}': {issue}")]
    Resolve {
        locator: String,
        section: String,
        issue: ParseIssue,
    },

    /// An include was refused
    #[error("{locator}: refusing to include '{include}': {issue}")]
    Security {
        locator: String,
        include: String,
        issue: SecurityIssue,
    },

    /// A directive cannot be written as ssh config
    #[error("{locator}, section '{section}': {issue}")]
    Output {
        locator: String,
        section: String,
        issue: OutputIssue,
    },

    /// An include could not be read
    #[error("{locator}: unable to read include '{include}'")]
    Fetch {
        locator: String,
        include: String,
        #[source]
        source: FetchError,
    },
}

/// Coarse classification of [Error]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Security,
    Output,
    Fetch,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Parse { .. } | Error::Resolve { .. } => ErrorKind::Parse,
            Error::Security { .. } => ErrorKind::Security,
            Error::Output { .. } => ErrorKind::Output,
            Error::Fetch { .. } => ErrorKind::Fetch,
        }
    }

    /// The structural problem behind a parse/resolve error
    pub fn parse_issue(&self) -> Option<&ParseIssue> {
        match self {
            Error::Parse { issue, .. } | Error::Resolve { issue, .. } => Some(issue),
            _ => None,
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ParseIssue {
    #[error("usage: {usage} (got: {found:?})")]
    Usage {
        usage: &'static str,
        found: Vec<String>,
    },
    #[error("unknown expansion keyword {0}")]
    UnknownDirective(String),
    #[error("quotation marks cannot be used within an argument value")]
    QuoteWithinArgument,
    #[error("unterminated quotation marks")]
    UnterminatedQuote,
    #[error("cannot set an @is type on root scope")]
    IsOnRoot,
    #[error("@with not supported with @HostAttrs")]
    WithOnHostAttrs,
    #[error("more than one section with name '{0}'")]
    DuplicateSection(String),
    #[error("no such section: {0}")]
    NoSuchSection(String),
    #[error("range should be format {{A..B}} or {{A..B/C}}: '{0}'")]
    RangeFormat(String),
    #[error("expected an integer in range definition: '{0}'")]
    RangeNotInteger(String),
    #[error("required arguments not passed to include {include} ({})", .expected.join(", "))]
    MissingArguments {
        include: String,
        expected: Vec<String>,
        supplied: usize,
    },
    #[error("variable <{0}> is not defined")]
    UnresolvedVariable(String),
    #[error("include cycle: {}", .0.join(" -> "))]
    IncludeCycle(Vec<String>),
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum SecurityIssue {
    #[error("@include may only use paths or https:// or file:// URLs (found scheme '{0}')")]
    DisallowedScheme(String),
    #[error("HTTP status {0}: refusing to use contents")]
    HttpStatus(u16),
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum OutputIssue {
    #[error("quotation marks may not be used in arguments ({keyword} {argument})")]
    QuoteInArgument { keyword: String, argument: String },
}

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("IO error")]
    Io(#[from] std::io::Error),
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),
    #[error("server answered with HTTP status {status}")]
    Refused { status: u16 },
}

/// Conditions that are reported but do not stop rendering
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// `@identity` names an identity without a matching `@key`
    UndefinedIdentity { locator: String, identity: String },
    /// none of the identity's fingerprints is in the key library
    IdentityNotFound {
        locator: String,
        identity: String,
        fingerprints: Vec<String>,
    },
    /// global directives of an included document were dropped
    ///
    /// Recorded once per included document, listing every dropped line.
    IgnoredGlobals { locator: String, lines: Vec<String> },
    /// host names already emitted by this or an earlier document
    DuplicateHosts { locator: String, hosts: Vec<String> },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::UndefinedIdentity { locator, identity } => write!(
                f,
                "{locator}: identity '{identity}' is not defined (missing @key definition)"
            ),
            Warning::IdentityNotFound {
                locator,
                identity,
                fingerprints,
            } => write!(
                f,
                "{locator}: identity '{identity}' (fingerprints {}) not found in SSH key library",
                fingerprints.join("; ")
            ),
            Warning::IgnoredGlobals { locator, lines } => {
                write!(f, "global config in @include '{locator}' ignored.")?;
                write!(f, "\nIgnored lines are:")?;
                for line in lines {
                    write!(f, "\n > {line}")?;
                }
                Ok(())
            }
            Warning::DuplicateHosts { locator, hosts } => {
                write!(f, "duplicated hosts parsing '{locator}': {}", hosts.join(", "))
            }
        }
    }
}
