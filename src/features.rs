//! Pattern-based extraction of the property number and building name from a
//! raw address. Both extractors are best-effort: no match is a normal result.

use once_cell::sync::Lazy;
use regex::Regex;

/// Number patterns, tried in order. The first one that matches wins.
static NUMBER_PATTERNS: Lazy<[Regex; 4]> = Lazy::new(|| {
    [
        // "Flat 9", "Apt. 12"
        Regex::new(r"(?i)\b(?:flat|apartment|apt|unit)\.?\s*(\d+)").expect("Invalid unit-number regex"),
        // "9 Flat"
        Regex::new(r"(?i)(\d+)\s*(?:flat|apartment|apt|unit)\b").expect("Invalid number-unit regex"),
        // "9 Mallard House"
        Regex::new(r"^\s*(\d+)\s+\w").expect("Invalid leading-number regex"),
        // "..., 9, ..." or "... 9 ..."
        Regex::new(r"(\d+)[,\s]").expect("Invalid embedded-number regex"),
    ]
});

static LEADING_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\d+\s+").expect("Invalid leading number regex")
});

static UNIT_FRAGMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:flat|apartment|apt|unit)\.?\s*\d+\s*,?").expect("Invalid unit fragment regex")
});

/// Structured sub-fields pulled out of an address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressFeatures {
    /// Unit or property number, digits only
    pub number: Option<String>,
    /// Lowercased building name, empty when none was found
    pub building: String,
}

impl AddressFeatures {
    pub fn extract(raw: &str) -> Self {
        Self {
            number: extract_number(raw),
            building: extract_building(raw),
        }
    }
}

/// Extract the unit/property number from a raw address
pub fn extract_number(raw: &str) -> Option<String> {
    NUMBER_PATTERNS
        .iter()
        .find_map(|re| re.captures(raw))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract the building name from a raw address
///
/// Drops a leading house number and any "Flat 9," style fragment, then takes
/// the first non-empty comma-separated segment. Returns an empty string when
/// nothing is left.
pub fn extract_building(raw: &str) -> String {
    let without_number = LEADING_NUMBER_RE.replace(raw, "");
    let without_unit = UNIT_FRAGMENT_RE.replace_all(&without_number, "");

    without_unit
        .split(',')
        .map(str::trim)
        .find(|segment| !segment.is_empty())
        .map(|segment| segment.replace([',', '.'], "").trim().to_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_number_unit_keyword() {
        assert_eq!(extract_number("Flat 9, Old Mill"), Some("9".to_string()));
        assert_eq!(extract_number("Apartment 12 Riverside"), Some("12".to_string()));
        assert_eq!(extract_number("apt.3 The Wharf"), Some("3".to_string()));
    }

    #[test]
    fn test_extract_number_keyword_after_digits() {
        assert_eq!(extract_number("Old Mill, 4 Flat"), Some("4".to_string()));
    }

    #[test]
    fn test_extract_number_leading() {
        assert_eq!(extract_number("9 Mallard House, Iris Avenue"), Some("9".to_string()));
        assert_eq!(extract_number("1 Nonexistent Close"), Some("1".to_string()));
    }

    #[test]
    fn test_extract_number_embedded() {
        assert_eq!(extract_number("Mallard House, 22, Iris Avenue"), Some("22".to_string()));
        assert_eq!(extract_number("Rose Cottage 7 Church Lane"), Some("7".to_string()));
    }

    #[test]
    fn test_extract_number_first_match_wins() {
        // The unit keyword pattern beats the leading number
        assert_eq!(extract_number("12 Mill Court, Flat 3"), Some("3".to_string()));
    }

    #[test]
    fn test_extract_number_none() {
        assert_eq!(extract_number("Old Mill House"), None);
        assert_eq!(extract_number("Totally Different Road, Town"), None);
        assert_eq!(extract_number(""), None);
        // Trailing digits with nothing after them don't count
        assert_eq!(extract_number("Plot12"), None);
    }

    #[test]
    fn test_extract_building_leading_number() {
        assert_eq!(extract_building("9 Old Mill, High Street"), "old mill");
        assert_eq!(extract_building("9 Mallard House, Iris Avenue, Canterbury"), "mallard house");
    }

    #[test]
    fn test_extract_building_unit_fragment() {
        assert_eq!(extract_building("Flat 9, The Old Mill"), "the old mill");
        assert_eq!(extract_building("The Old Mill, FLAT 9, High Street"), "the old mill");
    }

    #[test]
    fn test_extract_building_strips_periods() {
        assert_eq!(extract_building("St. Mary's Court, Canterbury"), "st mary's court");
    }

    #[test]
    fn test_extract_building_empty() {
        assert_eq!(extract_building(""), "");
        assert_eq!(extract_building("12 , , "), "");
        assert_eq!(extract_building("Flat 9,"), "");
    }

    #[test]
    fn test_features_extract() {
        let features = AddressFeatures::extract("Flat 9, The Old Mill");
        assert_eq!(features.number.as_deref(), Some("9"));
        assert_eq!(features.building, "the old mill");
    }
}
