//! Flattening `@is` inheritance
//!
//! A section's lines are its own lines, then `IdentitiesOnly`/`IdentityFile` for each `@identity`,
//! then the lines of every inherited section in `@is` order. A section reached a second time (a
//! diamond, or a reference back to an ancestor) contributes nothing.
use crate::document::{Document, Section};
use crate::error::{Error, OutputIssue, ParseIssue, Warning};
use crate::keys::KeyLibrary;
use crate::line::Line;
use crate::output::{render_line, INDENT};
use crate::util::shell_quote;
use std::collections::HashSet;
use std::path::PathBuf;

pub struct Resolver<'r> {
    document: &'r Document,
    keys: &'r dyn KeyLibrary,
    warnings: &'r mut Vec<Warning>,
}

impl<'r> Resolver<'r> {
    pub fn new(
        document: &'r Document,
        keys: &'r dyn KeyLibrary,
        warnings: &'r mut Vec<Warning>,
    ) -> Self {
        Self {
            document,
            keys,
            warnings,
        }
    }

    /// Lines of the section at `index` (see [Document::sections]) including everything it inherits
    ///
    /// `visited` holds the indices of sections already expanded during this resolution.
    pub fn lines(&mut self, index: usize, visited: &mut HashSet<usize>) -> Result<Vec<Line>, Error> {
        if !visited.insert(index) {
            return Ok(vec![]);
        }

        let section = &self.document.sections[index];
        let mut lines = section.lines.clone();

        for identity in &section.identity_refs {
            if let Some(path) = self.keyfile(identity) {
                lines.push(Line::new("IdentitiesOnly".to_string(), vec!["yes".to_string()]));
                lines.push(Line::new(
                    "IdentityFile".to_string(),
                    vec![shell_quote(&path.to_string_lossy())],
                ));
            }
        }

        for bundle in &section.bundle_refs {
            let bundle_index = self
                .document
                .section_index(bundle)
                .map_err(|issue| self.error(section, issue))?;
            lines.extend(self.lines(bundle_index, visited)?);
        }

        Ok(lines)
    }

    /// The host's name followed by its indented, rendered lines, ready for substitution
    pub fn host_template(&mut self, index: usize) -> Result<Vec<String>, Error> {
        let section = &self.document.sections[index];
        let lines = self.lines(index, &mut HashSet::new())?;

        let mut template = Vec::with_capacity(lines.len() + 1);
        template.push(section.name.clone());
        for line in &lines {
            let rendered = render_line(&line.keyword, &line.args, INDENT)
                .map_err(|issue| self.output_error(section, issue))?;
            template.push(rendered);
        }

        tracing::trace!(host = %section.name, lines = template.len() - 1, "host resolved");
        Ok(template)
    }

    /// Key file for an identity, warns if there is none
    fn keyfile(&mut self, identity: &str) -> Option<PathBuf> {
        let locator = self.document.locator().to_string();

        let Some(fingerprints) = self.document.key_definitions().get(identity) else {
            self.warn(Warning::UndefinedIdentity {
                locator,
                identity: identity.to_string(),
            });
            return None;
        };

        if let Some(path) = fingerprints
            .iter()
            .find_map(|fingerprint| self.keys.lookup(fingerprint))
        {
            return Some(path);
        }

        self.warn(Warning::IdentityNotFound {
            locator,
            identity: identity.to_string(),
            fingerprints: fingerprints.clone(),
        });
        None
    }

    pub(crate) fn warn(&mut self, warning: Warning) {
        tracing::warn!("{warning}");
        self.warnings.push(warning);
    }

    pub(crate) fn error(&self, section: &Section, issue: ParseIssue) -> Error {
        Error::Resolve {
            locator: self.document.locator().to_string(),
            section: section.name.clone(),
            issue,
        }
    }

    pub(crate) fn output_error(&self, section: &Section, issue: OutputIssue) -> Error {
        Error::Output {
            locator: self.document.locator().to_string(),
            section: section.name.clone(),
            issue,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::document::test::parse;
    use crate::keys::ScannedKeyLibrary;
    use pretty_assertions::assert_eq;

    fn host_index(document: &Document, name: &str) -> usize {
        document
            .sections()
            .iter()
            .position(|section| section.name == name)
            .expect("host must exist")
    }

    fn resolved(text: &str, host: &str, keys: &ScannedKeyLibrary) -> (Vec<String>, Vec<Warning>) {
        let document = parse(text).expect("must parse");
        let mut warnings = vec![];
        let lines = Resolver::new(&document, keys, &mut warnings)
            .lines(host_index(&document, host), &mut HashSet::new())
            .expect("must resolve");
        let keywords = lines.into_iter().map(|line| line.keyword).collect();
        (keywords, warnings)
    }

    #[test]
    fn inherited_lines_follow_own_lines() {
        let (lines, _) = resolved(
            "
            @HostAttrs a
            SomeOption Yes
            @HostAttrs b
            AnotherOption No
            Host blah
            @is a
            @is b
            Own yes
            ",
            "blah",
            &Default::default(),
        );
        assert_eq!(lines, ["Own", "SomeOption", "AnotherOption"]);
    }

    #[test]
    fn diamonds_are_expanded_once() {
        let (lines, _) = resolved(
            "
            @HostAttrs base
            Base yes
            @HostAttrs left
            @is base
            Left yes
            @HostAttrs right
            @is base
            Right yes
            Host h
            @is left
            @is right
            @is base
            ",
            "h",
            &Default::default(),
        );
        assert_eq!(lines, ["Left", "Base", "Right"]);
    }

    #[test]
    fn self_reference_terminates() {
        let (lines, _) = resolved(
            "
            @HostAttrs loop
            @is loop
            Looped yes
            Host h
            @is loop
            ",
            "h",
            &Default::default(),
        );
        assert_eq!(lines, ["Looped"]);
    }

    #[test]
    fn missing_and_duplicate_sections() {
        let document = parse("Host h\n@is nope\n").unwrap();
        let err = Resolver::new(&document, &ScannedKeyLibrary::default(), &mut vec![])
            .lines(0, &mut HashSet::new())
            .expect_err("must error");
        assert_eq!(err.parse_issue(), Some(&ParseIssue::NoSuchSection("nope".into())));

        let document = parse("@HostAttrs a\n@HostAttrs a\nHost h\n@is a\n").unwrap();
        let err = Resolver::new(&document, &ScannedKeyLibrary::default(), &mut vec![])
            .lines(2, &mut HashSet::new())
            .expect_err("must error");
        assert_eq!(err.parse_issue(), Some(&ParseIssue::DuplicateSection("a".into())));
    }

    #[test]
    fn identity_resolves_to_key_file() {
        let keys: ScannedKeyLibrary = [("SHA256:second", "/keys/my key")].into_iter().collect();
        let document = parse("@key work SHA256:first SHA256:second\nHost h\n@identity work\n").unwrap();
        let mut warnings = vec![];
        let lines = Resolver::new(&document, &keys, &mut warnings)
            .lines(0, &mut HashSet::new())
            .unwrap();

        assert_eq!(
            lines,
            [
                Line::new("IdentitiesOnly".into(), vec!["yes".into()]),
                Line::new("IdentityFile".into(), vec!["'/keys/my key'".into()]),
            ]
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn unresolvable_identities_warn() {
        let (lines, warnings) = resolved(
            "@key work SHA256:unknown\nHost h\n@identity work\n@identity home\n",
            "h",
            &Default::default(),
        );
        assert!(lines.is_empty());
        assert!(matches!(&warnings[0], Warning::IdentityNotFound { identity, .. } if identity == "work"));
        assert!(matches!(&warnings[1], Warning::UndefinedIdentity { identity, .. } if identity == "home"));
    }

    #[test]
    fn host_template_renders_lines() {
        let document = parse("@HostAttrs a\nForwardAgent yes\nHost web<i>\n@is a\nPort 22 23\n").unwrap();
        let template = Resolver::new(&document, &ScannedKeyLibrary::default(), &mut vec![])
            .host_template(1)
            .unwrap();
        assert_eq!(template, ["web<i>", "    Port 22 23", "    ForwardAgent = yes"]);
    }
}
