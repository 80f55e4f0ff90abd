//! # sedge - templated ssh config
//!
//! `sedge` reads a small configuration language and writes an `ssh_config(5)` file from it.
//!
//! ## Introduction for developers
//!
//! Read this to understand how `sedge` works internally.
//!
//! ### The language
//!
//! A sedge document is ssh config with a few extra directives. Every keyword starting with `@` is
//! handled by sedge, everything else is passed through to the output.
//!
//! ```text
//! # a comment
//! @set domain example.com
//! @key work SHA256:9xnxQ6...
//!
//! @HostAttrs common
//!     User admin
//!     @identity work
//!
//! @with dc syd mel
//! @with i {01..03}
//! Host web<i>-<dc>
//!     @is common
//!     HostName web<i>.<dc>.<domain>
//!
//! @include https://example.com/shared.sedge <domain>
//! ```
//!
//! | **directive**                  | **effect**                                                            |
//! |--------------------------------|-----------------------------------------------------------------------|
//! | `Host <name>`                  | opens a host, consumes the pending `@with` declarations               |
//! | `@HostAttrs <name>`            | opens an attribute bundle, only ever inherited                        |
//! | `@is <name>`                   | inherit the lines of a bundle (or host)                               |
//! | `@with <var> <token>...`       | template variable for the next `Host`, `{A..B}` and `{A..B/C}` ranges |
//! | `@set <name> <value>`          | document variable, usable as `<name>`                                 |
//! | `@key <name> <fingerprint>...` | names an ssh key by its fingerprints                                  |
//! | `@identity <name>`             | adds `IdentitiesOnly` and `IdentityFile` for a named key              |
//! | `@via <gateway>`               | adds a `ProxyCommand` through the gateway                             |
//! | `@include <source> [arg...]`   | splices in another document (path, `file://` or `https://`)           |
//! | `@args <name>...`              | binds the arguments an included document was given                   |
//!
//! ### Reading
//!
//! see [document::Document::parse]
//!
//! Each line is split into keyword and arguments ([line::Line]) and classified once into a
//! [directive::Directive]. The document keeps a list of sections. Lines are added to the section
//! that was opened last, or to the root section before the first `Host`/`@HostAttrs`.
//!
//! `@set`, `@via`, `@identity` and the `@include` source and arguments are resolved against the
//! variables known at that point. Unknown `<name>` tokens are left for later.
//!
//! `@include` is handled while reading: the source is checked ([fetch::Source::classify]), fetched
//! ([fetch::Fetcher]) and read as a child document. The child gets a copy of the current key
//! definitions and the resolved arguments for its `@args`. Including a document that is currently
//! being read is an error.
//!
//! ### Resolving
//!
//! see [resolve::Resolver]
//!
//! The lines of a Host are its own lines, the identity lines of its `@identity` references, then the
//! lines of every `@is` reference in order. References are followed depth-first and each section
//! contributes at most once, so diamonds and loops terminate.
//!
//! Identities are looked up in a [keys::KeyLibrary]. A missing key is a warning, not an error.
//!
//! ### Expanding
//!
//! see [template::Expansion]
//!
//! The resolved Host is rendered once and then substituted for every combination of its template
//! variables. Template variables shadow document variables. Every `<name>` left at this point must be
//! known.
//!
//! ### Output
//!
//! see [output::render]
//!
//! Only the top level document contributes global lines. Globals of included documents are dropped
//! with a warning ([error::Warning]). Hosts come next, followed by the output of each include.
//! Duplicate host names are kept and reported once per document.
//!
pub mod directive;
pub mod document;
pub mod error;
pub mod fetch;
pub mod keys;
pub mod line;
pub mod output;
pub mod resolve;
pub mod template;
mod util;
