//! Cobertura report loading.
//!
//! Only the overall `line-rate` is read. Coverlet and most Cobertura writers put
//! it on the `<coverage>` root; some put it only on the packages:
//!
//! ```xml
//! <coverage line-rate="0.85" branch-rate="0.7" version="1.9">
//!   <packages>
//!     <package name="src" line-rate="0.85" branch-rate="0.7" complexity="0">
//!       ...
//!     </package>
//!   </packages>
//! </coverage>
//! ```
//!
//! Lookup is the root attribute, then the first `packages/package` element.
//! Later packages are never consulted and nothing is averaged. The path only
//! matches un-namespaced elements, so a report under a default `xmlns` has no
//! fallback.
//!
//! Reports must be UTF-8. Any other encoding fails as a read error, whatever
//! the XML declaration says.

use std::{fmt, fs, path::Path};

use roxmltree::{Document, Node, ParsingOptions};
use tracing::debug;

use crate::error::{CoverageError, CoverageResult};

const LINE_RATE: &str = "line-rate";

/// Where the `line-rate` value was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRateSource {
    Root,
    Package,
}

impl fmt::Display for LineRateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => write!(f, "root element"),
            Self::Package => write!(f, "packages/package"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoverageReport {
    line_rate: f64,
    source: LineRateSource,
}

impl CoverageReport {
    /// Read and parse the report at `path`.
    pub fn load(path: &Path) -> CoverageResult<Self> {
        let xml = fs::read_to_string(path).map_err(|err| CoverageError::io(path, err))?;
        debug!(path = %path.display(), bytes = xml.len(), "Read coverage report");
        Self::parse(&xml, path)
    }

    /// Parse a report already in memory. `origin` only names the document in errors.
    pub fn parse(xml: &str, origin: &Path) -> CoverageResult<Self> {
        let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
        // Cobertura files usually carry a DOCTYPE pointing at the external DTD.
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let document = Document::parse_with_options(xml, options)
            .map_err(|err| CoverageError::malformed(origin, err))?;

        let (raw, source) =
            find_line_rate(&document).ok_or_else(|| CoverageError::missing_line_rate(origin))?;

        let line_rate = raw
            .trim()
            .parse::<f64>()
            .map_err(|err| CoverageError::invalid_line_rate(origin, raw, err))?;

        debug!(line_rate, %source, "Resolved line-rate");
        Ok(Self { line_rate, source })
    }

    pub fn line_rate(&self) -> f64 {
        self.line_rate
    }

    pub fn source(&self) -> LineRateSource {
        self.source
    }

    /// Line coverage as a percentage (`line_rate * 100`).
    pub fn percentage(&self) -> f64 {
        self.line_rate * 100.0
    }
}

fn find_line_rate<'a>(document: &'a Document<'_>) -> Option<(&'a str, LineRateSource)> {
    let root = document.root_element();
    if let Some(value) = root.attribute(LINE_RATE) {
        return Some((value, LineRateSource::Root));
    }

    first_package(root)?
        .attribute(LINE_RATE)
        .map(|value| (value, LineRateSource::Package))
}

fn first_package<'a, 'input>(root: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    root.children()
        .filter(|node| is_plain_element(node, "packages"))
        .flat_map(|packages| packages.children())
        .find(|node| is_plain_element(node, "package"))
}

fn is_plain_element(node: &Node<'_, '_>, name: &str) -> bool {
    let tag = node.tag_name();
    node.is_element() && tag.namespace().is_none() && tag.name() == name
}
