//! Country identifier and region group resolution.
//!
//! Single source of truth for country codes across all providers. Adapters
//! keep only small fallback maps for provider-proprietary quirks; everything
//! else goes through here.

/// Output code scheme for region expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeFormat {
    /// ISO-3166-1 alpha-2 ("US").
    Iso2,
    /// ISO-3166-1 alpha-3 ("USA").
    Iso3,
    /// UN numeric ("840").
    UnNumeric,
}

/// A built-in region group label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionGroup {
    /// Group of Seven.
    G7,
    /// Group of Twenty (country members).
    G20,
    /// Brazil, Russia, India, China, South Africa.
    Brics,
    /// BRICS plus the 2024 admissions.
    BricsPlus,
    /// European Union, 27 members (2020 vintage).
    Eu,
    /// Euro area, 20 members.
    Eurozone,
    /// OECD, 38 members.
    Oecd,
    /// Denmark, Finland, Iceland, Norway, Sweden.
    Nordic,
    /// Denmark, Norway, Sweden.
    Scandinavia,
    /// Association of Southeast Asian Nations.
    Asean,
    /// Major Asia-Pacific economies.
    AsiaPacific,
}

impl RegionGroup {
    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::G7 => "G7",
            Self::G20 => "G20",
            Self::Brics => "BRICS",
            Self::BricsPlus => "BRICS+",
            Self::Eu => "EU",
            Self::Eurozone => "Eurozone",
            Self::Oecd => "OECD",
            Self::Nordic => "Nordic",
            Self::Scandinavia => "Scandinavia",
            Self::Asean => "ASEAN",
            Self::AsiaPacific => "Asia-Pacific",
        }
    }
}

/// One row of the country table: ISO2, ISO3, UN numeric, canonical name,
/// lowercase aliases.
struct CountryRow {
    iso2: &'static str,
    iso3: &'static str,
    numeric: u16,
    name: &'static str,
    aliases: &'static [&'static str],
}

macro_rules! row {
    ($iso2:literal, $iso3:literal, $num:literal, $name:literal, [$($alias:literal),*]) => {
        CountryRow {
            iso2: $iso2,
            iso3: $iso3,
            numeric: $num,
            name: $name,
            aliases: &[$($alias),*],
        }
    };
}

static COUNTRIES: &[CountryRow] = &[
    // Americas
    row!("US", "USA", 840, "United States", ["usa", "united states", "america", "u.s.", "u.s.a."]),
    row!("CA", "CAN", 124, "Canada", []),
    row!("MX", "MEX", 484, "Mexico", []),
    row!("BR", "BRA", 76, "Brazil", []),
    row!("AR", "ARG", 32, "Argentina", []),
    row!("CL", "CHL", 152, "Chile", []),
    row!("CO", "COL", 170, "Colombia", []),
    row!("CR", "CRI", 188, "Costa Rica", []),
    row!("PE", "PER", 604, "Peru", []),
    // Europe (EU)
    row!("AT", "AUT", 40, "Austria", []),
    row!("BE", "BEL", 56, "Belgium", []),
    row!("BG", "BGR", 100, "Bulgaria", []),
    row!("HR", "HRV", 191, "Croatia", []),
    row!("CY", "CYP", 196, "Cyprus", []),
    row!("CZ", "CZE", 203, "Czechia", ["czech republic"]),
    row!("DK", "DNK", 208, "Denmark", []),
    row!("EE", "EST", 233, "Estonia", []),
    row!("FI", "FIN", 246, "Finland", []),
    row!("FR", "FRA", 250, "France", []),
    row!("DE", "DEU", 276, "Germany", []),
    row!("GR", "GRC", 300, "Greece", []),
    row!("HU", "HUN", 348, "Hungary", []),
    row!("IE", "IRL", 372, "Ireland", []),
    row!("IT", "ITA", 380, "Italy", []),
    row!("LV", "LVA", 428, "Latvia", []),
    row!("LT", "LTU", 440, "Lithuania", []),
    row!("LU", "LUX", 442, "Luxembourg", []),
    row!("MT", "MLT", 470, "Malta", []),
    row!("NL", "NLD", 528, "Netherlands", ["holland", "the netherlands"]),
    row!("PL", "POL", 616, "Poland", []),
    row!("PT", "PRT", 620, "Portugal", []),
    row!("RO", "ROU", 642, "Romania", []),
    row!("SK", "SVK", 703, "Slovakia", ["slovak republic"]),
    row!("SI", "SVN", 705, "Slovenia", []),
    row!("ES", "ESP", 724, "Spain", []),
    row!("SE", "SWE", 752, "Sweden", []),
    // Europe (non-EU)
    row!("GB", "GBR", 826, "United Kingdom", ["uk", "britain", "great britain", "england", "u.k."]),
    row!("CH", "CHE", 756, "Switzerland", []),
    row!("NO", "NOR", 578, "Norway", []),
    row!("IS", "ISL", 352, "Iceland", []),
    row!("TR", "TUR", 792, "Turkey", ["turkiye", "türkiye"]),
    row!("RU", "RUS", 643, "Russia", ["russian federation"]),
    row!("UA", "UKR", 804, "Ukraine", []),
    row!("RS", "SRB", 688, "Serbia", []),
    // Asia
    row!("CN", "CHN", 156, "China", ["mainland china", "people's republic of china", "prc"]),
    row!("JP", "JPN", 392, "Japan", []),
    row!("KR", "KOR", 410, "South Korea", ["korea", "republic of korea"]),
    row!("IN", "IND", 356, "India", []),
    row!("ID", "IDN", 360, "Indonesia", []),
    row!("TH", "THA", 764, "Thailand", []),
    row!("MY", "MYS", 458, "Malaysia", []),
    row!("SG", "SGP", 702, "Singapore", []),
    row!("PH", "PHL", 608, "Philippines", ["the philippines"]),
    row!("VN", "VNM", 704, "Vietnam", ["viet nam"]),
    row!("KH", "KHM", 116, "Cambodia", []),
    row!("LA", "LAO", 418, "Laos", ["lao pdr"]),
    row!("MM", "MMR", 104, "Myanmar", ["burma"]),
    row!("BN", "BRN", 96, "Brunei", ["brunei darussalam"]),
    row!("HK", "HKG", 344, "Hong Kong", ["hong kong sar"]),
    row!("TW", "TWN", 158, "Taiwan", ["chinese taipei", "taiwan province of china"]),
    row!("MO", "MAC", 446, "Macao", ["macau"]),
    row!("PK", "PAK", 586, "Pakistan", []),
    row!("BD", "BGD", 50, "Bangladesh", []),
    row!("LK", "LKA", 144, "Sri Lanka", []),
    row!("KZ", "KAZ", 398, "Kazakhstan", []),
    // Middle East
    row!("SA", "SAU", 682, "Saudi Arabia", []),
    row!("AE", "ARE", 784, "United Arab Emirates", ["uae", "emirates"]),
    row!("IL", "ISR", 376, "Israel", []),
    row!("IR", "IRN", 364, "Iran", ["islamic republic of iran"]),
    row!("IQ", "IRQ", 368, "Iraq", []),
    row!("QA", "QAT", 634, "Qatar", []),
    row!("KW", "KWT", 414, "Kuwait", []),
    // Africa
    row!("ZA", "ZAF", 710, "South Africa", []),
    row!("EG", "EGY", 818, "Egypt", []),
    row!("NG", "NGA", 566, "Nigeria", []),
    row!("KE", "KEN", 404, "Kenya", []),
    row!("ET", "ETH", 231, "Ethiopia", []),
    row!("GH", "GHA", 288, "Ghana", []),
    row!("MA", "MAR", 504, "Morocco", []),
    row!("ZW", "ZWE", 716, "Zimbabwe", []),
    row!("TZ", "TZA", 834, "Tanzania", []),
    // Oceania
    row!("AU", "AUS", 36, "Australia", []),
    row!("NZ", "NZL", 554, "New Zealand", []),
];

const G7: &[&str] = &["CA", "FR", "DE", "IT", "JP", "GB", "US"];
const G20: &[&str] = &[
    "AR", "AU", "BR", "CA", "CN", "FR", "DE", "IN", "ID", "IT", "JP", "KR", "MX", "RU", "SA",
    "ZA", "TR", "GB", "US",
];
const BRICS: &[&str] = &["BR", "RU", "IN", "CN", "ZA"];
const BRICS_PLUS: &[&str] = &["BR", "RU", "IN", "CN", "ZA", "EG", "ET", "IR", "AE"];
const EU27: &[&str] = &[
    "AT", "BE", "BG", "HR", "CY", "CZ", "DK", "EE", "FI", "FR", "DE", "GR", "HU", "IE", "IT",
    "LV", "LT", "LU", "MT", "NL", "PL", "PT", "RO", "SK", "SI", "ES", "SE",
];
const EA20: &[&str] = &[
    "AT", "BE", "HR", "CY", "EE", "FI", "FR", "DE", "GR", "IE", "IT", "LV", "LT", "LU", "MT",
    "NL", "PT", "SK", "SI", "ES",
];
const OECD38: &[&str] = &[
    "AU", "AT", "BE", "CA", "CL", "CO", "CR", "CZ", "DK", "EE", "FI", "FR", "DE", "GR", "HU",
    "IS", "IE", "IL", "IT", "JP", "KR", "LV", "LT", "LU", "MX", "NL", "NZ", "NO", "PL", "PT",
    "SK", "SI", "ES", "SE", "CH", "TR", "GB", "US",
];
const NORDIC: &[&str] = &["DK", "FI", "IS", "NO", "SE"];
const SCANDINAVIA: &[&str] = &["DK", "NO", "SE"];
const ASEAN: &[&str] = &["BN", "KH", "ID", "LA", "MY", "MM", "PH", "SG", "TH", "VN"];
const ASIA_PACIFIC: &[&str] = &[
    "AU", "CN", "HK", "ID", "IN", "JP", "KR", "MY", "NZ", "PH", "SG", "TH", "TW", "VN",
];

/// Lowercase phrases that denote each group in query text. Ordered so that
/// longer phrases are tried first.
static GROUP_PHRASES: &[(RegionGroup, &[&str])] = &[
    (RegionGroup::G7, &["g7", "g-7", "group of seven"]),
    (RegionGroup::G20, &["g20", "g-20", "group of twenty"]),
    (RegionGroup::BricsPlus, &["brics+", "brics plus"]),
    (RegionGroup::Brics, &["brics"]),
    (
        RegionGroup::Eurozone,
        &["eurozone", "euro area", "euro zone", "ea20", "ea-20"],
    ),
    (RegionGroup::Eu, &["european union", "eu members", "eu countries", "eu"]),
    (
        RegionGroup::Oecd,
        &["oecd countries", "oecd members", "oecd economies"],
    ),
    (RegionGroup::Nordic, &["nordic countries", "nordics", "nordic"]),
    (RegionGroup::Scandinavia, &["scandinavia", "scandinavian countries"]),
    (RegionGroup::Asean, &["asean"]),
    (
        RegionGroup::AsiaPacific,
        &["asia-pacific", "asia pacific", "apac"],
    ),
];

/// Resolver over the static country and region tables.
///
/// All operations are pure lookups; there is no state and no I/O.
pub struct CountryResolver;

impl CountryResolver {
    fn find(input: &str) -> Option<&'static CountryRow> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        let upper = trimmed.to_ascii_uppercase();
        let lower = trimmed.to_ascii_lowercase().replace('_', " ");

        COUNTRIES.iter().find(|row| {
            row.iso2 == upper
                || row.iso3 == upper
                || row.name.to_ascii_lowercase() == lower
                || row.aliases.contains(&lower.as_str())
        })
    }

    /// Normalize any accepted country spelling to ISO2, or `None`.
    ///
    /// Accepts full names, common aliases, ISO2 and ISO3 codes,
    /// case-insensitively. Idempotent: `normalize(normalize(x)) ==
    /// normalize(x)` for any accepted input.
    #[must_use]
    pub fn normalize(input: &str) -> Option<&'static str> {
        Self::find(input).map(|row| row.iso2)
    }

    /// Convert to ISO-3166-1 alpha-3.
    #[must_use]
    pub fn to_iso3(input: &str) -> Option<&'static str> {
        Self::find(input).map(|row| row.iso3)
    }

    /// Convert to the UN numeric code (as a string, no leading zeroes).
    #[must_use]
    pub fn to_un_numeric(input: &str) -> Option<String> {
        Self::find(input).map(|row| row.numeric.to_string())
    }

    /// Canonical display name.
    #[must_use]
    pub fn display_name(input: &str) -> Option<&'static str> {
        Self::find(input).map(|row| row.name)
    }

    /// Member list of a group in the requested code scheme, or `None` for
    /// an unknown label. Labels are matched case-insensitively against the
    /// group phrase table.
    #[must_use]
    pub fn expand_region(label: &str, format: CodeFormat) -> Option<Vec<String>> {
        let group = Self::parse_group(label)?;
        Some(Self::group_members(group, format))
    }

    /// Members of a known group, converted to the requested scheme.
    #[must_use]
    pub fn group_members(group: RegionGroup, format: CodeFormat) -> Vec<String> {
        let iso2_list: &[&str] = match group {
            RegionGroup::G7 => G7,
            RegionGroup::G20 => G20,
            RegionGroup::Brics => BRICS,
            RegionGroup::BricsPlus => BRICS_PLUS,
            RegionGroup::Eu => EU27,
            RegionGroup::Eurozone => EA20,
            RegionGroup::Oecd => OECD38,
            RegionGroup::Nordic => NORDIC,
            RegionGroup::Scandinavia => SCANDINAVIA,
            RegionGroup::Asean => ASEAN,
            RegionGroup::AsiaPacific => ASIA_PACIFIC,
        };
        iso2_list
            .iter()
            .filter_map(|iso2| match format {
                CodeFormat::Iso2 => Some((*iso2).to_string()),
                CodeFormat::Iso3 => Self::to_iso3(iso2).map(str::to_string),
                CodeFormat::UnNumeric => Self::to_un_numeric(iso2),
            })
            .collect()
    }

    /// Parse a group label ("G7", "Eurozone", "european union").
    #[must_use]
    pub fn parse_group(label: &str) -> Option<RegionGroup> {
        let lower = label.trim().to_ascii_lowercase();
        // A token that is also a country alias is a country, not a group.
        if Self::find(&lower).is_some() {
            return None;
        }
        GROUP_PHRASES
            .iter()
            .find(|(_, phrases)| phrases.contains(&lower.as_str()))
            .map(|(group, _)| *group)
    }

    /// Region group labels mentioned in free query text, in detection-table
    /// order. All matching labels are preserved for auditing even when the
    /// member sets overlap.
    #[must_use]
    pub fn detect_regions_in_query(query: &str) -> Vec<RegionGroup> {
        let lower = query.to_ascii_lowercase();
        let mut found = Vec::new();
        for (group, phrases) in GROUP_PHRASES {
            if phrases
                .iter()
                .any(|phrase| contains_word(&lower, phrase))
                && !found.contains(group)
            {
                found.push(*group);
            }
        }
        found
    }

    /// Union of the member sets of every group detected in the query, ISO2.
    #[must_use]
    pub fn expand_regions_in_query(query: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for group in Self::detect_regions_in_query(query) {
            for iso2 in Self::group_members(group, CodeFormat::Iso2) {
                if !out.contains(&iso2) {
                    out.push(iso2);
                }
            }
        }
        out
    }

    /// Every country mentioned in free query text, as ISO2 codes in
    /// first-occurrence order.
    ///
    /// Names and multi-word aliases match case-insensitively on word
    /// boundaries; two/three-letter codes only match when they appear
    /// uppercase in the original text ("US GDP", not "show us gdp").
    #[must_use]
    pub fn detect_all_countries_in_query(query: &str) -> Vec<String> {
        let lower = query.to_ascii_lowercase();
        let mut hits: Vec<(usize, &'static str)> = Vec::new();

        for row in COUNTRIES {
            let mut best: Option<usize> = None;
            let name_lower = row.name.to_ascii_lowercase();
            if let Some(pos) = find_word(&lower, &name_lower) {
                best = Some(pos);
            }
            for alias in row.aliases {
                if alias.len() <= 3 {
                    continue;
                }
                if let Some(pos) = find_word(&lower, alias) {
                    best = Some(best.map_or(pos, |b| b.min(pos)));
                }
            }
            // Short codes must be uppercase in the source text.
            for code in [row.iso2, row.iso3] {
                if let Some(pos) = find_word(query, code) {
                    best = Some(best.map_or(pos, |b| b.min(pos)));
                }
            }
            // "UK" style short aliases, uppercase only.
            for alias in row.aliases {
                if alias.len() <= 3 && alias.chars().all(|c| c.is_ascii_alphabetic()) {
                    let upper = alias.to_ascii_uppercase();
                    if let Some(pos) = find_word(query, &upper) {
                        best = Some(best.map_or(pos, |b| b.min(pos)));
                    }
                }
            }
            if let Some(pos) = best {
                hits.push((pos, row.iso2));
            }
        }

        hits.sort_by_key(|(pos, _)| *pos);
        let mut out = Vec::with_capacity(hits.len());
        for (_, iso2) in hits {
            if !out.iter().any(|c: &String| c == iso2) {
                out.push(iso2.to_string());
            }
        }
        out
    }

    /// Whether an ISO2 code belongs to the OECD membership.
    #[must_use]
    pub fn is_oecd_member(iso2: &str) -> bool {
        let upper = iso2.to_ascii_uppercase();
        OECD38.contains(&upper.as_str())
    }

    /// Whether an ISO2 code belongs to the EU27 membership.
    #[must_use]
    pub fn is_eu_member(iso2: &str) -> bool {
        let upper = iso2.to_ascii_uppercase();
        EU27.contains(&upper.as_str())
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
}

/// Position of `needle` in `haystack` respecting word boundaries, if any.
fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    let mut from = 0;
    while let Some(rel) = haystack[from..].find(needle) {
        let pos = from + rel;
        let before_ok = pos == 0
            || !haystack[..pos]
                .chars()
                .next_back()
                .is_some_and(is_word_char);
        let end = pos + needle.len();
        let after_ok = end >= haystack.len()
            || !haystack[end..].chars().next().is_some_and(is_word_char);
        if before_ok && after_ok {
            return Some(pos);
        }
        from = pos + needle.len();
    }
    None
}

fn contains_word(haystack: &str, needle: &str) -> bool {
    find_word(haystack, needle).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_accepts_all_code_schemes() {
        assert_eq!(CountryResolver::normalize("United States"), Some("US"));
        assert_eq!(CountryResolver::normalize("usa"), Some("US"));
        assert_eq!(CountryResolver::normalize("US"), Some("US"));
        assert_eq!(CountryResolver::normalize("DEU"), Some("DE"));
        assert_eq!(CountryResolver::normalize("uk"), Some("GB"));
        assert_eq!(CountryResolver::normalize("Narnia"), None);
    }

    #[test]
    fn normalize_is_idempotent() {
        for input in ["Germany", "JPN", "uk", "south korea", "TW"] {
            let once = CountryResolver::normalize(input).unwrap();
            assert_eq!(CountryResolver::normalize(once), Some(once));
        }
    }

    #[test]
    fn codeset_conversions() {
        assert_eq!(CountryResolver::to_iso3("US"), Some("USA"));
        assert_eq!(CountryResolver::to_un_numeric("US"), Some("840".into()));
        assert_eq!(CountryResolver::to_un_numeric("Taiwan"), Some("158".into()));
    }

    #[test]
    fn g7_expansion_is_complete() {
        let mut got = CountryResolver::expand_region("G7", CodeFormat::Iso2).unwrap();
        got.sort();
        let mut want = vec!["CA", "DE", "FR", "GB", "IT", "JP", "US"];
        want.sort_unstable();
        assert_eq!(got, want);
    }

    #[test]
    fn eurozone_has_twenty_members() {
        let got = CountryResolver::expand_region("euro area", CodeFormat::Iso2).unwrap();
        assert_eq!(got.len(), 20);
        assert!(got.contains(&"HR".to_string()));
        assert!(!got.contains(&"DK".to_string()));
    }

    #[test]
    fn region_expansion_in_other_schemes() {
        let iso3 = CountryResolver::expand_region("BRICS", CodeFormat::Iso3).unwrap();
        assert!(iso3.contains(&"BRA".to_string()));
        let numeric = CountryResolver::expand_region("G7", CodeFormat::UnNumeric).unwrap();
        assert!(numeric.contains(&"840".to_string()));
    }

    #[test]
    fn country_alias_beats_group_acronym() {
        // "UK" is a country alias, never a group.
        assert_eq!(CountryResolver::parse_group("UK"), None);
        assert_eq!(CountryResolver::parse_group("G7"), Some(RegionGroup::G7));
    }

    #[test]
    fn detect_countries_preserves_first_occurrence_order() {
        let got =
            CountryResolver::detect_all_countries_in_query("compare Japan and Germany with France");
        assert_eq!(got, vec!["JP", "DE", "FR"]);
    }

    #[test]
    fn detect_countries_requires_uppercase_for_short_codes() {
        assert_eq!(
            CountryResolver::detect_all_countries_in_query("show us the data"),
            Vec::<String>::new()
        );
        assert_eq!(
            CountryResolver::detect_all_countries_in_query("US unemployment"),
            vec!["US"]
        );
    }

    #[test]
    fn detect_regions_and_expand() {
        let groups = CountryResolver::detect_regions_in_query("GDP for G7 and the eurozone");
        assert_eq!(groups, vec![RegionGroup::G7, RegionGroup::Eurozone]);
        let union = CountryResolver::expand_regions_in_query("GDP for G7 and the eurozone");
        assert!(union.contains(&"US".to_string()));
        assert!(union.contains(&"ES".to_string()));
        // Union: FR appears once despite being in both groups.
        assert_eq!(union.iter().filter(|c| c.as_str() == "FR").count(), 1);
    }

    #[test]
    fn membership_predicates() {
        assert!(CountryResolver::is_oecd_member("JP"));
        assert!(!CountryResolver::is_oecd_member("CN"));
        assert!(CountryResolver::is_eu_member("FR"));
        assert!(!CountryResolver::is_eu_member("GB"));
    }
}
