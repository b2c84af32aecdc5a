//! Parsing of unstructured model output into structured records

use regex_lite::Regex;
use url::Url;

/// Maximum connections surfaced from one model reply
pub const MAX_CONNECTIONS: usize = 5;

/// Fallback when no usable connection lines survive filtering
pub const CONNECTIONS_PLACEHOLDER: &str = "All sources discuss related topics";

/// Parse connection sentences out of a raw model reply
///
/// Lines are trimmed and kept when they exceed 20 characters or carry a
/// leading enumeration marker; the marker prefix is stripped from kept
/// lines. At most `MAX_CONNECTIONS` survive; if none do, a fixed
/// placeholder sentence is substituted.
pub fn parse_connections(raw: &str) -> Vec<String> {
    let marker = Regex::new(r"^\d+[.)]").expect("static regex");
    let prefix = Regex::new(r"^\d+[.):]\s*").expect("static regex");

    let connections: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|line| line.chars().count() > 20 || marker.is_match(line))
        .map(|line| prefix.replace(line, "").trim().to_string())
        .take(MAX_CONNECTIONS)
        .collect();

    if connections.is_empty() {
        vec![CONNECTIONS_PLACEHOLDER.to_string()]
    } else {
        connections
    }
}

/// Human-readable label for a citation locator
///
/// Returns the locator's host with a leading `www.` stripped; locators
/// that do not parse or carry no host come back unchanged. Never fails.
pub fn citation_label(locator: &str) -> String {
    match Url::parse(locator) {
        Ok(url) => match url.host_str() {
            Some(host) => host.strip_prefix("www.").unwrap_or(host).to_string(),
            None => locator.to_string(),
        },
        Err(_) => locator.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_long_lines_survive() {
        let raw = "\
1. Both sources cover renewable energy policy in depth.
2) The second and third sources cite the same field study.
Both articles question the methodology of earlier work.
All four sources track the same funding controversy.";

        let connections = parse_connections(raw);
        assert_eq!(connections.len(), 4);
        assert_eq!(
            connections[0],
            "Both sources cover renewable energy policy in depth."
        );
        assert_eq!(
            connections[1],
            "The second and third sources cite the same field study."
        );
        // Unnumbered lines pass untouched
        assert_eq!(
            connections[2],
            "Both articles question the methodology of earlier work."
        );
    }

    #[test]
    fn test_zero_qualifying_lines_yield_placeholder() {
        let connections = parse_connections("ok\nshort\n\n- tiny");
        assert_eq!(connections, vec![CONNECTIONS_PLACEHOLDER.to_string()]);
    }

    #[test]
    fn test_empty_input_yields_placeholder() {
        assert_eq!(parse_connections(""), vec![CONNECTIONS_PLACEHOLDER.to_string()]);
    }

    #[test]
    fn test_short_enumerated_line_is_kept() {
        // The enumeration marker rescues lines under the length floor
        let connections = parse_connections("1. Shared author");
        assert_eq!(connections, vec!["Shared author".to_string()]);
    }

    #[test]
    fn test_colon_prefix_variant_is_stripped() {
        let connections =
            parse_connections("2: Both sources reference the same survey data set.");
        assert_eq!(
            connections,
            vec!["Both sources reference the same survey data set.".to_string()]
        );
    }

    #[test]
    fn test_truncated_to_five() {
        let raw = (1..=8)
            .map(|i| format!("{}. Connection number {} spanning several sources.", i, i))
            .collect::<Vec<_>>()
            .join("\n");

        let connections = parse_connections(&raw);
        assert_eq!(connections.len(), MAX_CONNECTIONS);
        assert!(connections[4].starts_with("Connection number 5"));
    }

    #[test]
    fn test_keeps_long_line_containing_colon() {
        // Pins the filter decision: a colon does not disqualify a line
        let raw = "Common thread: every source examines battery storage economics.";
        let connections = parse_connections(raw);
        assert_eq!(connections, vec![raw.to_string()]);
    }

    #[test]
    fn test_citation_label_strips_www() {
        assert_eq!(citation_label("https://www.example.com/a"), "example.com");
        assert_eq!(citation_label("https://example.com/a"), "example.com");
        assert_eq!(citation_label("https://docs.example.org/page?q=1"), "docs.example.org");
    }

    #[test]
    fn test_citation_label_passes_through_invalid_locators() {
        assert_eq!(citation_label("not a uri"), "not a uri");
        assert_eq!(citation_label(""), "");
        // Parses but has no host
        assert_eq!(citation_label("mailto:team@example.com"), "mailto:team@example.com");
    }
}
