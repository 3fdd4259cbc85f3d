//! YAML-sourced concept catalog.
//!
//! The catalog is the single source of truth for what canonical economic
//! concepts exist, which terms denote (or explicitly do not denote) them,
//! and which provider codes serve them. Derived lookup tables (the synonym
//! snapshot map) are built once at construction; the catalog itself is
//! immutable afterwards. Hot reload is "build a new catalog, swap the Arc".

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use econfed_types::Provider;

use crate::country::CountryResolver;

/// Synonym sets for a concept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Synonyms {
    /// High-confidence synonyms.
    #[serde(default)]
    pub primary: Vec<String>,
    /// Looser synonyms.
    #[serde(default)]
    pub secondary: Vec<String>,
}

/// Geographic coverage of a provider mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coverage {
    /// A coverage token: `global`, `oecd_members`, or `eu_members`.
    Token(String),
    /// Explicit ISO2 country list.
    List(Vec<String>),
}

impl Default for Coverage {
    fn default() -> Self {
        Self::Token("global".to_string())
    }
}

impl Coverage {
    /// Whether every requested country is covered. Tokens are evaluated
    /// against the country resolver's membership tables.
    #[must_use]
    pub fn covers(&self, countries: &[String]) -> bool {
        if countries.is_empty() {
            return true;
        }
        match self {
            Self::Token(token) => match token.as_str() {
                "global" => true,
                "oecd_members" => countries.iter().all(|c| CountryResolver::is_oecd_member(c)),
                "eu_members" => countries.iter().all(|c| CountryResolver::is_eu_member(c)),
                _ => false,
            },
            Self::List(list) => {
                let upper: Vec<String> = list.iter().map(|c| c.to_ascii_uppercase()).collect();
                countries
                    .iter()
                    .all(|c| upper.contains(&c.to_ascii_uppercase()))
            }
        }
    }
}

/// One variant mapping (primary, growth, core, ...) of a concept for a
/// provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantEntry {
    /// Provider-native indicator code. `null`/`dynamic` placeholders are
    /// filtered out at the accessor level.
    pub code: Option<String>,
    /// Human-readable name.
    #[serde(default)]
    pub name: Option<String>,
    /// Mapping confidence, defaulting to 0.8.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Geographic coverage.
    #[serde(default)]
    pub coverage: Coverage,
    /// Native cadence.
    #[serde(default)]
    pub frequency: Option<String>,
}

impl VariantEntry {
    /// Code, unless it is a placeholder.
    #[must_use]
    pub fn real_code(&self) -> Option<&str> {
        let code = self.code.as_deref()?.trim();
        if code.is_empty() {
            return None;
        }
        let lower = code.to_ascii_lowercase();
        if matches!(lower.as_str(), "null" | "none" | "dynamic" | "n/a") {
            return None;
        }
        Some(code)
    }

    /// Confidence with the 0.8 default applied.
    #[must_use]
    pub fn confidence_or_default(&self) -> f64 {
        self.confidence.unwrap_or(0.8)
    }
}

/// A canonical concept definition, one YAML document each.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    /// Canonical snake_case name.
    pub concept: String,
    /// Synonym sets.
    #[serde(default)]
    pub synonyms: Synonyms,
    /// Phrases that must never match this concept (known false positives).
    #[serde(default)]
    pub explicit_exclusions: Vec<String>,
    /// Variant maps per provider name; the `primary` key is the default
    /// variant.
    #[serde(default)]
    pub providers: BTreeMap<String, BTreeMap<String, VariantEntry>>,
    /// Providers known to lack this concept entirely.
    #[serde(default)]
    pub not_available: Vec<String>,
}

impl Concept {
    /// All synonyms including the concept name itself (spaces for
    /// underscores).
    #[must_use]
    pub fn all_synonyms(&self) -> Vec<String> {
        let mut out = vec![self.concept.replace('_', " ")];
        out.extend(self.synonyms.primary.iter().cloned());
        out.extend(self.synonyms.secondary.iter().cloned());
        out
    }

    fn provider_entry(&self, provider: Provider) -> Option<&BTreeMap<String, VariantEntry>> {
        self.providers
            .iter()
            .find(|(name, _)| Provider::parse(name) == Some(provider))
            .map(|(_, entry)| entry)
    }

    fn is_not_available(&self, provider: Provider) -> bool {
        self.not_available
            .iter()
            .any(|name| Provider::parse(name) == Some(provider))
    }
}

/// The loaded, immutable catalog.
pub struct Catalog {
    concepts: BTreeMap<String, Concept>,
    /// Snapshot of lowercase synonym -> concept name, built during init.
    synonym_map: BTreeMap<String, String>,
}

/// Embedded default concept set, compiled into the crate.
static BUILTIN_CONCEPTS: &[&str] = &[
    include_str!("../concepts/gdp.yaml"),
    include_str!("../concepts/gdp_growth.yaml"),
    include_str!("../concepts/gdp_per_capita.yaml"),
    include_str!("../concepts/unemployment_rate.yaml"),
    include_str!("../concepts/inflation.yaml"),
    include_str!("../concepts/cpi.yaml"),
    include_str!("../concepts/interest_rate.yaml"),
    include_str!("../concepts/government_debt.yaml"),
    include_str!("../concepts/household_debt.yaml"),
    include_str!("../concepts/corporate_debt.yaml"),
    include_str!("../concepts/total_credit.yaml"),
    include_str!("../concepts/trade_balance.yaml"),
    include_str!("../concepts/exports.yaml"),
    include_str!("../concepts/imports.yaml"),
    include_str!("../concepts/house_prices.yaml"),
    include_str!("../concepts/population.yaml"),
    include_str!("../concepts/exchange_rate.yaml"),
    include_str!("../concepts/productivity.yaml"),
];

impl Catalog {
    /// Build a catalog from parsed concepts.
    #[must_use]
    pub fn from_concepts(concepts: Vec<Concept>) -> Self {
        let mut map = BTreeMap::new();
        for concept in concepts {
            map.insert(concept.concept.clone(), concept);
        }
        let mut synonym_map = BTreeMap::new();
        for (name, concept) in &map {
            for synonym in concept.all_synonyms() {
                synonym_map.insert(synonym.to_ascii_lowercase(), name.clone());
            }
        }
        Self {
            concepts: map,
            synonym_map,
        }
    }

    /// The compiled-in default concept set.
    #[must_use]
    pub fn builtin() -> Self {
        let concepts = BUILTIN_CONCEPTS
            .iter()
            .filter_map(|doc| match serde_yaml::from_str::<Concept>(doc) {
                Ok(c) => Some(c),
                Err(err) => {
                    tracing::error!(target: "econfed::catalog", %err, "invalid builtin concept");
                    None
                }
            })
            .collect();
        let catalog = Self::from_concepts(concepts);
        tracing::info!(
            target: "econfed::catalog",
            concepts = catalog.concepts.len(),
            "loaded builtin concept catalog"
        );
        catalog
    }

    /// Load every `*.yaml` concept file from a directory. Files that fail
    /// to parse are logged and skipped, matching startup-tolerant loading.
    pub fn load_dir(dir: &Path) -> std::io::Result<Self> {
        let mut concepts = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let text = std::fs::read_to_string(&path)?;
            match serde_yaml::from_str::<Concept>(&text) {
                Ok(c) => concepts.push(c),
                Err(err) => {
                    tracing::error!(
                        target: "econfed::catalog",
                        file = %path.display(),
                        %err,
                        "skipping malformed concept file"
                    );
                }
            }
        }
        tracing::info!(
            target: "econfed::catalog",
            concepts = concepts.len(),
            dir = %dir.display(),
            "loaded concept catalog"
        );
        Ok(Self::from_concepts(concepts))
    }

    /// Concept by canonical name (spaces fold to underscores).
    #[must_use]
    pub fn get_concept(&self, name: &str) -> Option<&Concept> {
        self.concepts
            .get(&name.trim().to_ascii_lowercase().replace(' ', "_"))
    }

    /// All concept names.
    #[must_use]
    pub fn concept_names(&self) -> Vec<&str> {
        self.concepts.keys().map(String::as_str).collect()
    }

    /// The synonym snapshot map (lowercase synonym -> concept name).
    #[must_use]
    pub fn synonym_map(&self) -> &BTreeMap<String, String> {
        &self.synonym_map
    }

    /// Find the canonical concept a term denotes, if any. Case-insensitive
    /// match against concept names and all synonyms.
    #[must_use]
    pub fn find_concept_by_term(&self, term: &str) -> Option<&str> {
        let lower = term.trim().to_ascii_lowercase();
        if let Some(name) = self.synonym_map.get(&lower) {
            return Some(name);
        }
        // Concept names with underscores folded.
        self.concepts
            .keys()
            .find(|name| name.replace('_', " ") == lower)
            .map(String::as_str)
    }

    /// Whether a term contains an explicit exclusion phrase of a concept
    /// (substring, case-insensitive). Exclusions encode known false
    /// positives ("production index" must not match `productivity`).
    #[must_use]
    pub fn is_excluded_term(&self, term: &str, concept_name: &str) -> bool {
        let Some(concept) = self.get_concept(concept_name) else {
            return false;
        };
        let term_lower = term.to_ascii_lowercase();
        concept
            .explicit_exclusions
            .iter()
            .any(|excl| term_lower.contains(&excl.to_ascii_lowercase()))
    }

    /// Indicator code for a (concept, provider, variant) triple. Returns
    /// `None` when the provider is listed as not available for the concept.
    #[must_use]
    pub fn get_indicator_code(
        &self,
        concept_name: &str,
        provider: Provider,
        variant: &str,
    ) -> Option<String> {
        let concept = self.get_concept(concept_name)?;
        if concept.is_not_available(provider) {
            return None;
        }
        let entry = concept.provider_entry(provider)?;
        entry
            .get(variant)
            .and_then(VariantEntry::real_code)
            .map(str::to_string)
    }

    /// All known codes for a concept/provider pair across variants,
    /// deduplicated case-insensitively, placeholders skipped.
    #[must_use]
    pub fn get_indicator_codes(&self, concept_name: &str, provider: Provider) -> Vec<String> {
        let Some(concept) = self.get_concept(concept_name) else {
            return Vec::new();
        };
        let Some(entry) = concept.provider_entry(provider) else {
            return Vec::new();
        };
        let mut seen = Vec::new();
        let mut out = Vec::new();
        for variant in entry.values() {
            if let Some(code) = variant.real_code() {
                let upper = code.to_ascii_uppercase();
                if !seen.contains(&upper) {
                    seen.push(upper);
                    out.push(code.to_string());
                }
            }
        }
        out
    }

    /// Whether a provider has the concept at all.
    #[must_use]
    pub fn is_provider_available(&self, concept_name: &str, provider: Provider) -> bool {
        let Some(concept) = self.get_concept(concept_name) else {
            // Unknown concept: let the provider try.
            return true;
        };
        if concept.is_not_available(provider) {
            return false;
        }
        concept.provider_entry(provider).is_some()
    }

    /// Best provider for a concept: highest primary-variant confidence whose
    /// coverage includes every requested country. A preferred provider wins
    /// when it qualifies.
    #[must_use]
    pub fn get_best_provider(
        &self,
        concept_name: &str,
        countries: &[String],
        preferred: Option<Provider>,
    ) -> Option<(Provider, String, f64)> {
        let concept = self.get_concept(concept_name)?;

        let qualify = |provider: Provider| -> Option<(Provider, String, f64)> {
            if concept.is_not_available(provider) {
                return None;
            }
            let entry = concept.provider_entry(provider)?;
            let primary = entry.get("primary")?;
            let code = primary.real_code()?;
            if !primary.coverage.covers(countries) {
                return None;
            }
            Some((provider, code.to_string(), primary.confidence_or_default()))
        };

        if let Some(pref) = preferred
            && let Some(hit) = qualify(pref)
        {
            return Some(hit);
        }

        let mut best: Option<(Provider, String, f64)> = None;
        for name in concept.providers.keys() {
            let Some(provider) = Provider::parse(name) else {
                continue;
            };
            if let Some(hit) = qualify(provider)
                && best.as_ref().is_none_or(|(_, _, conf)| hit.2 > *conf)
            {
                best = Some(hit);
            }
        }
        best
    }

    /// Fallback providers for a concept, sorted by descending confidence,
    /// excluding the provider that failed.
    #[must_use]
    pub fn get_fallback_providers(
        &self,
        concept_name: &str,
        exclude: Option<Provider>,
    ) -> Vec<(Provider, String, f64)> {
        let Some(concept) = self.get_concept(concept_name) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for name in concept.providers.keys() {
            let Some(provider) = Provider::parse(name) else {
                continue;
            };
            if Some(provider) == exclude || concept.is_not_available(provider) {
                continue;
            }
            let Some(entry) = concept.provider_entry(provider) else {
                continue;
            };
            let Some(primary) = entry.get("primary") else {
                continue;
            };
            let Some(code) = primary.real_code() else {
                continue;
            };
            out.push((provider, code.to_string(), primary.confidence_or_default()));
        }
        out.sort_by(|a, b| b.2.total_cmp(&a.2));
        out
    }

    /// Validate an indicator name against a concept: exclusions reject
    /// first; a synonym substring accepts; otherwise accept permissively:
    /// the indicator name space is open and the search layer disambiguates.
    #[must_use]
    pub fn validate_indicator_match(
        &self,
        indicator_name: &str,
        concept_name: &str,
    ) -> (bool, String) {
        if self.is_excluded_term(indicator_name, concept_name) {
            return (
                false,
                format!("'{indicator_name}' is an explicit exclusion for '{concept_name}'"),
            );
        }
        if let Some(concept) = self.get_concept(concept_name) {
            let indicator_lower = indicator_name.to_ascii_lowercase();
            for synonym in concept.all_synonyms() {
                if indicator_lower.contains(&synonym.to_ascii_lowercase()) {
                    return (true, format!("matches synonym '{synonym}'"));
                }
            }
        }
        (true, "accepted (not an explicit exclusion)".to_string())
    }

    /// Exclusion phrases for a concept.
    #[must_use]
    pub fn get_exclusions(&self, concept_name: &str) -> Vec<String> {
        self.get_concept(concept_name)
            .map(|c| c.explicit_exclusions.clone())
            .unwrap_or_default()
    }

    /// All synonyms for a concept (including the name itself).
    #[must_use]
    pub fn get_all_synonyms(&self, concept_name: &str) -> Vec<String> {
        self.get_concept(concept_name)
            .map(Concept::all_synonyms)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_loads_all_concepts() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.concept_names().len(), 18);
    }

    #[test]
    fn find_concept_by_synonym() {
        let catalog = Catalog::builtin();
        assert_eq!(
            catalog.find_concept_by_term("jobless rate"),
            Some("unemployment_rate")
        );
        assert_eq!(catalog.find_concept_by_term("GDP growth"), Some("gdp_growth"));
        assert_eq!(catalog.find_concept_by_term("nonsense term"), None);
    }

    #[test]
    fn exclusion_precedence_over_synonyms() {
        let catalog = Catalog::builtin();
        // Contains both the synonym "productivity" and the exclusion
        // "production index"; the exclusion must win.
        let (valid, reason) =
            catalog.validate_indicator_match("productivity production index", "productivity");
        assert!(!valid, "{reason}");
    }

    #[test]
    fn codes_skip_unavailable_providers() {
        let catalog = Catalog::builtin();
        assert!(
            catalog
                .get_indicator_code("productivity", Provider::Bis, "primary")
                .is_none()
        );
        assert_eq!(
            catalog
                .get_indicator_code("unemployment_rate", Provider::Fred, "primary")
                .as_deref(),
            Some("UNRATE")
        );
    }

    #[test]
    fn synonym_snapshot_agrees_with_codes() {
        // Catalog single-source-of-truth: the snapshot-derived concept gives
        // the same code as the direct accessor for every (concept, provider).
        let catalog = Catalog::builtin();
        for (synonym, concept) in catalog.synonym_map() {
            let via_snapshot = catalog.find_concept_by_term(synonym).unwrap();
            assert_eq!(via_snapshot, concept);
            for provider in Provider::ALL {
                assert_eq!(
                    catalog.get_indicator_code(via_snapshot, provider, "primary"),
                    catalog.get_indicator_code(concept, provider, "primary"),
                );
            }
        }
    }

    #[test]
    fn best_provider_respects_country_coverage() {
        let catalog = Catalog::builtin();
        // FRED's unemployment mapping covers the US only; a Germany query
        // must land elsewhere.
        let (provider, _, _) = catalog
            .get_best_provider("unemployment_rate", &["DE".to_string()], None)
            .unwrap();
        assert_ne!(provider, Provider::Fred);
    }

    #[test]
    fn fallback_providers_exclude_the_failed_one() {
        let catalog = Catalog::builtin();
        let fallbacks = catalog.get_fallback_providers("gdp_growth", Some(Provider::WorldBank));
        assert!(!fallbacks.iter().any(|(p, _, _)| *p == Provider::WorldBank));
        assert!(!fallbacks.is_empty());
        // Sorted by descending confidence.
        for pair in fallbacks.windows(2) {
            assert!(pair[0].2 >= pair[1].2);
        }
    }
}
