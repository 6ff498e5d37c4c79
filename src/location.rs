use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

// Countries, regions and cities we never apply to. Matched as whole words anywhere
// in the free-text location, so "Bangalore, India" and "Remote - EMEA" both hit.
// A few names that mostly mean a US place ("Mexico", "Dublin", "Vienna", ...) are left
// out; rarer collisions such as Paris, TX or London, KY are still blocked.
const BLOCKED_COUNTRIES: &[&str] = &[
    "India", "Pakistan", "Bangladesh", "Sri Lanka", "Philippines", "Vietnam", "Indonesia",
    "China", "Japan", "Singapore", "Malaysia", "Australia", "New Zealand",
    "United Kingdom", "UK", "England", "Scotland", "Wales", "Ireland",
    "Germany", "France", "Spain", "Portugal", "Italy", "Netherlands", "Belgium",
    "Switzerland", "Austria", "Poland", "Czech Republic", "Czechia", "Romania", "Hungary",
    "Ukraine", "Serbia", "Croatia", "Bulgaria", "Greece", "Turkey", "Israel",
    "Sweden", "Norway", "Denmark", "Finland", "Estonia", "Lithuania", "Latvia",
    "Canada", "Brazil", "Argentina", "Colombia", "Chile", "Peru", "Uruguay", "Costa Rica",
    "Egypt", "Nigeria", "Kenya", "South Africa",
    "UAE", "United Arab Emirates", "Saudi Arabia", "Qatar",
];

const BLOCKED_REGIONS: &[&str] = &[
    "EMEA", "APAC", "APJ", "LATAM", "MENA", "DACH", "ANZ", "EU", "Europe", "Asia", "Nordics",
];

const BLOCKED_CITIES: &[&str] = &[
    "Bangalore", "Bengaluru", "Hyderabad", "Pune", "Chennai", "Mumbai", "Delhi", "Gurgaon",
    "Gurugram", "Noida", "Kolkata", "London", "Edinburgh", "Berlin", "Munich", "Hamburg",
    "Frankfurt", "Amsterdam", "Paris", "Madrid", "Barcelona", "Lisbon", "Milan", "Zurich",
    "Prague", "Budapest", "Bucharest", "Stockholm", "Copenhagen", "Oslo", "Helsinki",
    "Tallinn", "Tel Aviv", "Dubai", "Tokyo", "Sydney", "Toronto", "Montreal", "Ottawa",
    "Calgary", "São Paulo", "Sao Paulo", "Buenos Aires", "Bogotá", "Bogota", "Mexico City",
    "Manila", "Cairo", "Lagos", "Nairobi",
];

static BLOCKED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives = BLOCKED_COUNTRIES
        .iter()
        .chain(BLOCKED_REGIONS)
        .chain(BLOCKED_CITIES)
        .map(|term| regex::escape(term))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives)).expect("blocked location pattern")
});

/// Whether a posting at `location` is worth keeping.
///
/// Empty locations pass. Anything naming a built-in blocked country, region or city as a
/// whole word is rejected, as is anything containing one of `extra_blocked` as a
/// case-insensitive substring.
pub fn is_allowed(location: &str, extra_blocked: &HashSet<String>) -> bool {
    let location = location.trim();
    if location.is_empty() {
        return true;
    }

    if BLOCKED_PATTERN.is_match(location) {
        return false;
    }

    let lower = location.to_lowercase();
    !extra_blocked
        .iter()
        .map(|pattern| pattern.trim())
        .filter(|pattern| !pattern.is_empty())
        .any(|pattern| lower.contains(&pattern.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed(location: &str) -> bool {
        is_allowed(location, &HashSet::new())
    }

    fn extra(terms: &[&str]) -> HashSet<String> {
        terms.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_allows_domestic_and_remote() {
        assert!(allowed("Remote"));
        assert!(allowed("Remote (US Only)"));
        assert!(allowed("New York, NY"));
        assert!(allowed("New York"));
        assert!(allowed("San Francisco/New York"));
        assert!(allowed("New Mexico"));
        assert!(allowed("Austin, TX"));
    }

    #[test]
    fn test_allows_empty_and_blank() {
        assert!(allowed(""));
        assert!(allowed("   "));
    }

    #[test]
    fn test_blocks_countries() {
        assert!(!allowed("India"));
        assert!(!allowed("Bangalore, India"));
        assert!(!allowed("Berlin, Germany"));
        assert!(!allowed("London, UK"));
    }

    #[test]
    fn test_blocks_cities_and_regions() {
        assert!(!allowed("London"));
        assert!(!allowed("Toronto"));
        assert!(!allowed("Remote - EMEA"));
        assert!(!allowed("APAC (Remote)"));
    }

    #[test]
    fn test_builtin_match_is_case_insensitive() {
        assert!(!allowed("INDIA"));
        assert!(!allowed("remote - emea"));
        assert!(!allowed("london"));
    }

    #[test]
    fn test_builtin_match_respects_word_boundaries() {
        // "Indiana" contains "India", "Eugene" starts with "Eu"
        assert!(allowed("Indianapolis, Indiana"));
        assert!(allowed("Eugene, OR"));
        assert!(allowed("Parisville"));
    }

    #[test]
    fn test_us_namesakes() {
        assert!(allowed("Dublin, OH"));
        assert!(allowed("Vienna, VA"));
        assert!(!allowed("Paris, TX"));
        assert!(!allowed("London, KY"));
    }

    #[test]
    fn test_multi_location_blocked_if_any_part_is() {
        assert!(!allowed("New York/London"));
    }

    #[test]
    fn test_extra_blocked_matches() {
        assert!(!is_allowed("Warsaw", &extra(&["Warsaw"])));
    }

    #[test]
    fn test_extra_blocked_no_match() {
        assert!(is_allowed("New York", &extra(&["Warsaw"])));
    }

    #[test]
    fn test_extra_blocked_case_insensitive_substring() {
        assert!(!is_allowed("warsaw", &extra(&["Warsaw"])));
        assert!(!is_allowed("Greater Warsaw Area", &extra(&["warsaw"])));
        assert!(!is_allowed("Remote - Krakow", &extra(&["KRAK"])));
    }

    #[test]
    fn test_extra_blocked_overrides_allowed_builtin_verdict() {
        assert!(allowed("Austin, TX"));
        assert!(!is_allowed("Austin, TX", &extra(&["austin"])));
    }

    #[test]
    fn test_extra_blocked_ignores_blank_patterns() {
        assert!(is_allowed("New York", &extra(&["", "  "])));
    }
}
