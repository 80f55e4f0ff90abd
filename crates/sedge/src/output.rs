//! Writing ssh config
//!
//! [render] walks a document and its includes depth-first and collects [Stanza]s: first the global
//! stanza of the top level document, then every Host of the document in declaration order, then the
//! includes. Host names are tracked across the whole walk so duplicates can be reported.
use crate::document::Document;
use crate::error::{Error, OutputIssue, Warning};
use crate::keys::KeyLibrary;
use crate::resolve::Resolver;
use crate::template::Expansion;
use serde::ser::SerializeMap;
use serde::Serializer;
use std::collections::BTreeSet;
use std::fmt::Formatter;

/// Indentation of the lines inside a Host stanza
pub const INDENT: &str = "    ";

/// Characters that make a host name a pattern rather than a name
const PATTERN_CHARACTERS: &[char] = &[',', '!', '*', '?'];

/// Render one directive
///
/// A single argument is written as `Keyword = value`, no or multiple arguments as
/// `Keyword v1 v2`. Arguments are written as they are, so multiple arguments must not contain `"`.
pub fn render_line(keyword: &str, args: &[String], indent: &str) -> Result<String, OutputIssue> {
    if let [arg] = args {
        return Ok(format!("{indent}{keyword} = {arg}"));
    }

    if let Some(argument) = args.iter().find(|arg| arg.contains('"')) {
        return Err(OutputIssue::QuoteInArgument {
            keyword: keyword.to_string(),
            argument: argument.clone(),
        });
    }

    let mut line = format!("{indent}{keyword}");
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    Ok(line)
}

/// First line of a Host stanza
pub fn host_header(host: &str) -> String {
    format!("Host = {host}")
}

/// A block of rendered lines
///
/// `host` is `None` for the global stanza.
#[derive(derive_new::new, Debug, Clone, PartialEq)]
pub struct Stanza {
    pub host: Option<String>,
    pub lines: Vec<String>,
}

impl serde::ser::Serialize for Stanza {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut ser = serializer.serialize_map(Some(2))?;
        ser.serialize_entry("host", &self.host)?;
        ser.serialize_entry("lines", &self.lines)?;
        ser.end()
    }
}

/// Everything produced by [render]
///
/// The [Display](std::fmt::Display) impl writes the ssh config: stanzas separated by a blank line.
#[derive(Debug, Default)]
pub struct Output {
    stanzas: Vec<Stanza>,
    hosts: BTreeSet<String>,
    warnings: Vec<Warning>,
}

impl Output {
    pub fn stanzas(&self) -> &[Stanza] {
        &self.stanzas
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Every emitted host name, sorted
    pub fn host_names(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().map(String::as_str)
    }

    /// Host names usable for shell completion (no patterns), sorted
    pub fn completion_hosts(&self) -> impl Iterator<Item = &str> {
        self.host_names()
            .filter(|host| !host.contains(PATTERN_CHARACTERS))
    }
}

impl std::fmt::Display for Output {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut need_break = false;
        for stanza in self.stanzas.iter().filter(|stanza| !stanza.lines.is_empty()) {
            if need_break {
                writeln!(f)?;
            }
            for line in &stanza.lines {
                writeln!(f, "{line}")?;
            }
            need_break = true;
        }
        Ok(())
    }
}

/// Render a top level document and everything it includes
pub fn render(document: &Document, keys: &dyn KeyLibrary) -> Result<Output, Error> {
    let mut output = Output::default();
    let mut seen = BTreeSet::new();

    emit(document, keys, &mut output, &mut seen)?;

    tracing::debug!(
        stanzas = output.stanzas.len(),
        hosts = seen.len(),
        warnings = output.warnings.len(),
        "rendered"
    );
    output.hosts = seen;
    Ok(output)
}

/// `seen` holds the host names emitted so far, by this or any earlier document
fn emit(
    document: &Document,
    keys: &dyn KeyLibrary,
    output: &mut Output,
    seen: &mut BTreeSet<String>,
) -> Result<(), Error> {
    let mut resolver = Resolver::new(document, keys, &mut output.warnings);

    let mut root_lines = document.root().lines.clone();
    root_lines.sort();
    let globals = root_lines
        .iter()
        .map(|line| render_line(&line.keyword, &line.args, ""))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|issue| resolver.output_error(document.root(), issue))?;

    if !document.is_included() {
        output.stanzas.push(Stanza::new(None, globals));
    } else if !globals.is_empty() {
        resolver.warn(Warning::IgnoredGlobals {
            locator: document.locator().to_string(),
            lines: globals,
        });
    }

    let mut dupes = BTreeSet::new();
    for (index, section) in document.sections().iter().enumerate() {
        if !section.is_host() {
            continue;
        }

        let template = resolver.host_template(index)?;
        let expansion = Expansion::new(template, section.template_vars(), document.variables())
            .map_err(|issue| resolver.error(section, issue))?;

        for stanza in expansion {
            let stanza = stanza.map_err(|issue| resolver.error(section, issue))?;
            if let Some(host) = &stanza.host {
                if !seen.insert(host.clone()) {
                    dupes.insert(host.clone());
                }
            }
            output.stanzas.push(stanza);
        }
    }

    if !dupes.is_empty() {
        resolver.warn(Warning::DuplicateHosts {
            locator: document.locator().to_string(),
            hosts: dupes.into_iter().collect(),
        });
    }

    for include in document.includes() {
        tracing::trace!(locator = %include.locator, "emitting include");
        emit(&include.document, keys, output, seen)?;
    }

    Ok(())
}
