//! Vendor media-type parsing.
//!
//! Recognizes Accept header ranges of the form
//! `application/vnd.<vendor>.<version>+<format>`, e.g.
//! `application/vnd.acme.v2.0.1+json`.
//!
//! # Design Decisions
//! - Pure function of (vendor, header): no state, no allocation on mismatch
//! - No regex; the grammar is a fixed prefix plus two separators
//! - "No match" is a normal outcome meaning "use defaults", never an error
//! - Versions may contain dots, so a longer vendor sharing our prefix is
//!   indistinguishable from a dotted version: with vendor `acme`, the range
//!   `application/vnd.acme.billing.v3+json` reads as version `billing.v3`.
//!   Such a version is never registered and resolves to the default.

use crate::routing::version::VersionId;

const VENDOR_TREE: &str = "application/vnd.";

/// The (vendor, version, format) triple extracted from an Accept header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accept {
    pub vendor: String,
    pub version: VersionId,
    pub format: String,
}

/// Parses Accept headers for a single configured vendor.
#[derive(Debug, Clone)]
pub struct MediaTypeParser {
    vendor: String,
}

impl MediaTypeParser {
    pub fn new(vendor: impl Into<String>) -> Self {
        Self {
            vendor: vendor.into(),
        }
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// Parse a raw Accept header value.
    ///
    /// The header may list several comma separated media ranges; the first
    /// range that matches the vendor grammar wins and parameters such as
    /// `;q=0.8` are ignored.
    pub fn parse(&self, header: Option<&str>) -> Option<Accept> {
        header?.split(',').find_map(|range| self.parse_range(range))
    }

    fn parse_range(&self, range: &str) -> Option<Accept> {
        let media_type = range.split(';').next()?.trim();

        let tree = media_type.get(..VENDOR_TREE.len())?;
        if !tree.eq_ignore_ascii_case(VENDOR_TREE) {
            return None;
        }

        let rest = media_type[VENDOR_TREE.len()..]
            .strip_prefix(self.vendor.as_str())?
            .strip_prefix('.')?;

        let (version, format) = rest.rsplit_once('+')?;
        if format.is_empty() || !format.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }

        let version = VersionId::parse(version).ok()?;

        Some(Accept {
            vendor: self.vendor.clone(),
            version,
            format: format.to_ascii_lowercase(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> MediaTypeParser {
        MediaTypeParser::new("testing")
    }

    #[test]
    fn test_parses_vendor_media_type() {
        let accept = parser().parse(Some("application/vnd.testing.v1+json")).unwrap();
        assert_eq!(accept.vendor, "testing");
        assert_eq!(accept.version.as_str(), "v1");
        assert_eq!(accept.format, "json");
    }

    #[test]
    fn test_point_release_version() {
        let accept = parser().parse(Some("application/vnd.testing.v2.0.1+xml")).unwrap();
        assert_eq!(accept.version.as_str(), "v2.0.1");
        assert_eq!(accept.format, "xml");
    }

    #[test]
    fn test_dotted_vendor() {
        let parser = MediaTypeParser::new("acme.billing");
        let accept = parser.parse(Some("application/vnd.acme.billing.v3+json")).unwrap();
        assert_eq!(accept.version.as_str(), "v3");
    }

    #[test]
    fn test_longer_vendor_reads_as_dotted_version() {
        let parser = MediaTypeParser::new("acme");
        let accept = parser.parse(Some("application/vnd.acme.billing.v3+json")).unwrap();
        assert_eq!(accept.vendor, "acme");
        assert_eq!(accept.version.as_str(), "billing.v3");
    }

    #[test]
    fn test_picks_first_matching_range() {
        let header = "text/html, application/vnd.testing.v2+JSON;q=0.9, application/vnd.testing.v1+json";
        let accept = parser().parse(Some(header)).unwrap();
        assert_eq!(accept.version.as_str(), "v2");
        assert_eq!(accept.format, "json");
    }

    #[test]
    fn test_no_match_cases() {
        let parser = parser();
        assert!(parser.parse(None).is_none());
        assert!(parser.parse(Some("")).is_none());
        assert!(parser.parse(Some("application/json")).is_none());
        assert!(parser.parse(Some("application/vnd.other.v1+json")).is_none());
        assert!(parser.parse(Some("application/vnd.testing2.v1+json")).is_none());
        assert!(parser.parse(Some("application/vnd.testing.v1")).is_none());
        assert!(parser.parse(Some("application/vnd.testing.+json")).is_none());
        assert!(parser.parse(Some("application/vnd.testing.v1+")).is_none());
    }
}
