//! Sections and documents
//!
//! A [Document] is read line by line. The currently open section is the last one declared (or the
//! root section before any `Host`/`@HostAttrs`). `@include`d documents are read while the including
//! document is read and are owned by it.
use crate::directive::{Directive, TemplateVar};
use crate::error::{Error, FetchError, ParseIssue, SecurityIssue};
use crate::fetch::{Fetcher, Source};
use crate::line::{self, Line};
use crate::template::{substitute_known, Variables};
use crate::util::shell_quote;
use indexmap::IndexMap;

/// identity name -> fingerprint candidates
pub type KeyDefinitions = IndexMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq)]
pub enum SectionKind {
    /// Document globals
    Root,
    /// `@HostAttrs`, only ever inherited
    HostAttrs,
    /// `Host`, expanded once per combination of its template variables
    Host { template_vars: Vec<TemplateVar> },
}

/// A named scope of directives
///
/// `@is` and `@identity` are kept apart from the literal `lines`.
#[derive(Debug, Clone)]
pub struct Section {
    pub name: String,
    pub kind: SectionKind,
    pub lines: Vec<Line>,
    pub bundle_refs: Vec<String>,
    pub identity_refs: Vec<String>,
}

impl Section {
    fn new(name: impl Into<String>, kind: SectionKind) -> Self {
        Self {
            name: name.into(),
            kind,
            lines: vec![],
            bundle_refs: vec![],
            identity_refs: vec![],
        }
    }

    pub fn template_vars(&self) -> &[TemplateVar] {
        match &self.kind {
            SectionKind::Host { template_vars } => template_vars,
            _ => &[],
        }
    }

    pub fn is_host(&self) -> bool {
        matches!(self.kind, SectionKind::Host { .. })
    }
}

/// A document spliced in by `@include`
#[derive(derive_new::new, Debug)]
pub struct Include {
    /// the source as written in the including document
    pub locator: String,
    pub document: Document,
}

#[derive(Debug)]
pub struct Document {
    pub(crate) locator: String,
    pub(crate) via_include: bool,
    pub(crate) root: Section,
    /// `@with` declarations waiting for the next `Host`
    pub(crate) pending_with: Vec<TemplateVar>,
    pub(crate) variables: Variables,
    /// `@HostAttrs` and `Host` sections in declaration order
    pub(crate) sections: Vec<Section>,
    pub(crate) key_definitions: KeyDefinitions,
    pub(crate) includes: Vec<Include>,
}

impl Document {
    /// Read a top level document
    ///
    /// `locator` names the document in diagnostics (usually its path).
    pub fn parse(
        text: &str,
        locator: impl Into<String>,
        fetcher: &dyn Fetcher,
    ) -> Result<Self, Error> {
        let locator = locator.into();
        let mut chain = vec![Source::classify(&locator)
            .map(|source| source.to_string())
            .unwrap_or_else(|_| locator.clone())];

        DocumentParser {
            document: Document::empty(locator, false, KeyDefinitions::default()),
            include_args: None,
            fetcher,
            chain: &mut chain,
            line: 0,
        }
        .run(text)
    }

    fn empty(locator: String, via_include: bool, key_definitions: KeyDefinitions) -> Self {
        Self {
            locator,
            via_include,
            root: Section::new("Root", SectionKind::Root),
            pending_with: vec![],
            variables: Default::default(),
            sections: vec![],
            key_definitions,
            includes: vec![],
        }
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Whether this document was reached through `@include`
    pub fn is_included(&self) -> bool {
        self.via_include
    }

    pub fn root(&self) -> &Section {
        &self.root
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter().filter(|section| section.is_host())
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn key_definitions(&self) -> &KeyDefinitions {
        &self.key_definitions
    }

    pub fn includes(&self) -> &[Include] {
        &self.includes
    }

    fn current_section(&mut self) -> &mut Section {
        match self.sections.last_mut() {
            Some(section) => section,
            None => &mut self.root,
        }
    }

    /// Find a section by name, names must be unique
    pub(crate) fn section_index(&self, name: &str) -> Result<usize, ParseIssue> {
        let mut matches = self
            .sections
            .iter()
            .enumerate()
            .filter(|(_, section)| section.name == name)
            .map(|(index, _)| index);

        match (matches.next(), matches.next()) {
            (Some(index), None) => Ok(index),
            (Some(_), Some(_)) => Err(ParseIssue::DuplicateSection(name.to_string())),
            (None, _) => Err(ParseIssue::NoSuchSection(name.to_string())),
        }
    }
}

struct DocumentParser<'p> {
    document: Document,
    /// arguments passed by the including document
    include_args: Option<Vec<String>>,
    fetcher: &'p dyn Fetcher,
    /// sources currently being read, outermost first
    chain: &'p mut Vec<String>,
    line: usize,
}

impl<'p> DocumentParser<'p> {
    fn run(mut self, text: &str) -> Result<Document, Error> {
        for (index, raw) in text.lines().enumerate() {
            self.line = index + 1;
            if line::is_ignored(raw) {
                continue;
            }

            let directive = Line::parse(raw)
                .and_then(Directive::try_from)
                .map_err(|issue| self.issue(issue))?;

            tracing::trace!(line = self.line, ?directive, "directive");
            self.handle(directive)?;
        }

        tracing::debug!(
            locator = %self.document.locator,
            sections = self.document.sections.len(),
            includes = self.document.includes.len(),
            "document parsed"
        );
        Ok(self.document)
    }

    fn issue(&self, issue: ParseIssue) -> Error {
        Error::Parse {
            locator: self.document.locator.clone(),
            line: self.line,
            issue,
        }
    }

    fn resolve(&self, value: &str) -> String {
        substitute_known(value, &self.document.variables)
    }

    fn handle(&mut self, directive: Directive) -> Result<(), Error> {
        match directive {
            Directive::HostAttrs(name) => {
                if !self.document.pending_with.is_empty() {
                    return Err(self.issue(ParseIssue::WithOnHostAttrs));
                }
                self.document
                    .sections
                    .push(Section::new(name, SectionKind::HostAttrs));
            }
            Directive::Host(name) => {
                let template_vars = std::mem::take(&mut self.document.pending_with);
                self.document
                    .sections
                    .push(Section::new(name, SectionKind::Host { template_vars }));
            }
            Directive::With(var) => self.document.pending_with.push(var),
            Directive::Is(name) => {
                let section = self.document.current_section();
                if section.kind == SectionKind::Root {
                    return Err(self.issue(ParseIssue::IsOnRoot));
                }
                section.bundle_refs.push(name);
            }
            Directive::Via(gateway) => {
                let gateway = self.resolve(&gateway);
                let command = format!("ssh {} nc %h %p 2> /dev/null", shell_quote(&gateway));
                self.document
                    .current_section()
                    .lines
                    .push(Line::new("ProxyCommand".to_string(), vec![command]));
            }
            Directive::Identity(name) => {
                let name = self.resolve(&name);
                self.document.current_section().identity_refs.push(name);
            }
            Directive::Key { name, fingerprints } => {
                self.document.key_definitions.insert(name, fingerprints);
            }
            Directive::Set { key, value } => {
                let key = self.resolve(&key);
                let value = self.resolve(&value);
                self.document.variables.insert(key, value);
            }
            Directive::Args(names) => self.bind_args(names)?,
            Directive::Include { source, args } => self.include(source, args)?,
            Directive::Literal(line) => self.document.current_section().lines.push(line),
        }

        Ok(())
    }

    fn bind_args(&mut self, names: Vec<String>) -> Result<(), Error> {
        let Some(values) = &self.include_args else {
            tracing::debug!(?names, "@args ignored in top level document");
            return Ok(());
        };

        if values.len() != names.len() {
            return Err(self.issue(ParseIssue::MissingArguments {
                include: self.document.locator.clone(),
                supplied: values.len(),
                expected: names,
            }));
        }

        let bindings: Vec<(String, String)> = names.into_iter().zip(values.clone()).collect();
        self.document.variables.extend(bindings);
        Ok(())
    }

    fn include(&mut self, locator: String, args: Vec<String>) -> Result<(), Error> {
        let locator = self.resolve(&locator);
        let args: Vec<String> = args.iter().map(|arg| self.resolve(arg)).collect();

        let source = Source::classify(&locator).map_err(|issue| Error::Security {
            locator: self.document.locator.clone(),
            include: locator.clone(),
            issue,
        })?;

        let identity = source.to_string();
        if self.chain.contains(&identity) {
            let mut cycle = self.chain.clone();
            cycle.push(identity);
            return Err(self.issue(ParseIssue::IncludeCycle(cycle)));
        }

        let text = self.fetcher.fetch(&source).map_err(|err| match err {
            FetchError::Refused { status } => Error::Security {
                locator: self.document.locator.clone(),
                include: locator.clone(),
                issue: SecurityIssue::HttpStatus(status),
            },
            source => Error::Fetch {
                locator: self.document.locator.clone(),
                include: locator.clone(),
                source,
            },
        })?;

        tracing::debug!(%locator, ?args, "parsing include");

        self.chain.push(identity);
        let document = DocumentParser {
            document: Document::empty(
                locator.clone(),
                true,
                self.document.key_definitions.clone(),
            ),
            include_args: Some(args),
            fetcher: self.fetcher,
            chain: &mut *self.chain,
            line: 0,
        }
        .run(&text);
        self.chain.pop();

        self.document.includes.push(Include::new(locator, document?));
        Ok(())
    }
}
