//! The unified indicator resolver.
//!
//! Single entry point for turning a free-text indicator term (or a raw
//! provider code) into the best provider-specific code, layering the local
//! index, the universal-concept translator, and the concept catalog.

use std::collections::BTreeMap;
use std::sync::Arc;

use econfed_types::{Provider, ResolutionSource, ResolvedIndicator};

use crate::catalog::Catalog;
use crate::index::{IndicatorIndex, IndicatorRecord, tokenize};
use crate::translator::IndicatorTranslator;

/// Minimum bounded score for accepting a ranked search hit.
const SEARCH_ACCEPT: f64 = 0.35;
/// Off-catalog hits below this score lose to the catalog mapping when the
/// query resolves to a known concept.
const OFF_CATALOG_GUARD: f64 = 0.70;
/// Minimum score for resolution through catalog preferred codes.
const CATALOG_CODE_ACCEPT: f64 = 0.45;
/// Result confidence below this triggers the catalog fallback stage.
const LOW_CONFIDENCE: f64 = 0.60;
/// Bounded cache size for resolution results.
const CACHE_CAPACITY: u64 = 1024;

/// Unified indicator resolution over index, translator, and catalog.
pub struct IndicatorResolver {
    catalog: Arc<Catalog>,
    index: Arc<IndicatorIndex>,
    cache: moka::sync::Cache<String, Option<ResolvedIndicator>>,
}

impl IndicatorResolver {
    /// Build a resolver over the given catalog and index.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, index: Arc<IndicatorIndex>) -> Self {
        Self {
            catalog,
            index,
            cache: moka::sync::Cache::new(CACHE_CAPACITY),
        }
    }

    /// The catalog this resolver consults.
    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// The indicator index this resolver consults.
    #[must_use]
    pub fn index(&self) -> &Arc<IndicatorIndex> {
        &self.index
    }

    /// Resolve a query to the best provider-specific indicator.
    ///
    /// Resolution order (stop at the first confident hit): exact code in
    /// the index; translator; catalog preferred codes; ranked lexical
    /// search; catalog best-provider fallback. Confidence is always bounded
    /// to [0, 1]; results (including misses) are cached in a bounded LRU
    /// keyed by `(provider|any, lowercase query, country|any)`.
    #[must_use]
    pub fn resolve(
        &self,
        query: &str,
        provider: Option<Provider>,
        country: Option<&str>,
    ) -> Option<ResolvedIndicator> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return None;
        }
        let cache_key = format!(
            "{}:{}:{}",
            provider.map_or("any", Provider::as_str),
            trimmed.to_ascii_lowercase(),
            country.unwrap_or("any"),
        );
        if let Some(hit) = self.cache.get(&cache_key) {
            return hit;
        }
        let result = self.resolve_uncached(trimmed, provider, country);
        self.cache.insert(cache_key, result.clone());
        result
    }

    fn resolve_uncached(
        &self,
        query: &str,
        provider: Option<Provider>,
        country: Option<&str>,
    ) -> Option<ResolvedIndicator> {
        let concept = self
            .catalog
            .find_concept_by_term(query)
            .map(str::to_string);
        let preferred_codes: Vec<String> = match (provider, concept.as_deref()) {
            (Some(p), Some(c)) => self
                .catalog
                .get_indicator_codes(c, p)
                .into_iter()
                .map(|code| code.to_ascii_uppercase())
                .collect(),
            _ => Vec::new(),
        };

        // 1. Exact code lookup.
        if let Some(p) = provider {
            if let Some(record) = self.index.get(p, &query.to_ascii_uppercase()) {
                return Some(resolved_from_record(&record, 1.0, ResolutionSource::Database));
            }
            if let Some(record) = self.index.get_learned(p, query) {
                return Some(resolved_from_record(&record, 0.9, ResolutionSource::Database));
            }
        }

        // 2. Curated universal concepts take priority over raw index
        // matches, which may include discontinued series.
        let translator_target = provider.unwrap_or(Provider::Fred);
        if let Some((code, concept_name)) =
            IndicatorTranslator::translate_indicator(query, translator_target)
        {
            return Some(ResolvedIndicator {
                code,
                provider: translator_target,
                name: concept_name.replace('_', " "),
                confidence: 0.75,
                source: ResolutionSource::Translator,
                metadata: BTreeMap::new(),
            });
        }

        // 3. Known catalog concept: try the provider's catalog codes before
        // trusting ranked search. Guards against high-ranked but
        // semantically wrong candidates.
        if let (Some(p), Some(c)) = (provider, concept.as_deref())
            && !preferred_codes.is_empty()
            && let Some(hit) = self.resolve_via_catalog_codes(query, p, c, &preferred_codes)
        {
            return Some(hit);
        }

        // 4. Ranked lexical search.
        let mut result = self.resolve_via_search(query, provider, concept.as_deref(), &preferred_codes);

        // 5. Catalog fallback for unresolved or low-confidence results.
        let should_try_catalog = match &result {
            None => true,
            Some(r) => {
                r.confidence < LOW_CONFIDENCE
                    || (!preferred_codes.is_empty()
                        && r.source == ResolutionSource::Database
                        && !preferred_codes.contains(&r.code.to_ascii_uppercase())
                        && r.confidence < OFF_CATALOG_GUARD)
            }
        };
        if should_try_catalog && let Some(c) = concept.as_deref() {
            if let Some(p) = provider {
                if self.catalog.is_provider_available(c, p)
                    && let Some(code) = self.catalog.get_indicator_code(c, p, "primary")
                {
                    result = Some(ResolvedIndicator {
                        code,
                        provider: p,
                        name: title_case(c),
                        confidence: 0.85,
                        source: ResolutionSource::Catalog,
                        metadata: BTreeMap::new(),
                    });
                }
            } else {
                let countries: Vec<String> = country
                    .map(|c| vec![c.to_ascii_uppercase()])
                    .unwrap_or_default();
                if let Some((p, code, confidence)) =
                    self.catalog.get_best_provider(c, &countries, None)
                {
                    result = Some(ResolvedIndicator {
                        code,
                        provider: p,
                        name: title_case(c),
                        confidence: confidence.clamp(0.0, 1.0),
                        source: ResolutionSource::Catalog,
                        metadata: BTreeMap::new(),
                    });
                }
            }
        }

        result
    }

    /// Find the best (provider, code) pair when the provider is open.
    ///
    /// Preferred providers are tried first; after that the catalog's
    /// `get_best_provider` is authoritative (it is the one site that knows
    /// country coverage), with open resolution as the last resort.
    #[must_use]
    pub fn find_best_match(
        &self,
        query: &str,
        country: Option<&str>,
        preferred: &[Provider],
    ) -> Option<(Provider, String, f64)> {
        for p in preferred {
            if let Some(r) = self.resolve(query, Some(*p), country)
                && r.confidence >= 0.7
            {
                return Some((r.provider, r.code, r.confidence));
            }
        }
        if let Some(concept) = self.catalog.find_concept_by_term(query) {
            let countries: Vec<String> = country
                .map(|c| vec![c.to_ascii_uppercase()])
                .unwrap_or_default();
            if let Some(hit) = self.catalog.get_best_provider(concept, &countries, None) {
                return Some(hit);
            }
        }
        self.resolve(query, None, country)
            .map(|r| (r.provider, r.code, r.confidence))
    }

    /// Sibling codes from the index for fallback retry when the primary
    /// code yields no data.
    #[must_use]
    pub fn get_alternatives(
        &self,
        indicator: &str,
        provider: Provider,
        limit: usize,
    ) -> Vec<ResolvedIndicator> {
        let mut out = Vec::new();
        for record in self.index.search(indicator, Some(provider), limit + 1) {
            if record.code.eq_ignore_ascii_case(indicator) {
                continue;
            }
            out.push(resolved_from_record(&record, 0.7, ResolutionSource::Database));
            if out.len() >= limit {
                break;
            }
        }
        out
    }

    fn resolve_via_catalog_codes(
        &self,
        query: &str,
        provider: Provider,
        concept: &str,
        preferred_codes: &[String],
    ) -> Option<ResolvedIndicator> {
        let mut best: Option<(f64, IndicatorRecord)> = None;
        for code in preferred_codes {
            let Some(record) = self.index.get(provider, code) else {
                continue;
            };
            let mut score = self.score_search_match(query, &record, 0);
            score += self.score_concept_alignment(Some(concept), &record);
            score += 0.15; // known catalog mapping boost
            let score = score.clamp(0.0, 1.0);
            if best.as_ref().is_none_or(|(b, _)| score > *b) {
                best = Some((score, record));
            }
        }
        let (score, record) = best?;
        if score < CATALOG_CODE_ACCEPT {
            return None;
        }
        Some(resolved_from_record(&record, score, ResolutionSource::Catalog))
    }

    fn resolve_via_search(
        &self,
        query: &str,
        provider: Option<Provider>,
        concept: Option<&str>,
        preferred_codes: &[String],
    ) -> Option<ResolvedIndicator> {
        let candidates = self.index.search(query, provider, 5);
        let mut best: Option<(f64, IndicatorRecord)> = None;
        for (rank, record) in candidates.into_iter().enumerate() {
            let mut score = self.score_search_match(query, &record, rank);
            score += self.score_concept_alignment(concept, &record);
            if !preferred_codes.is_empty() {
                if preferred_codes.contains(&record.code.to_ascii_uppercase()) {
                    score += 0.25;
                } else {
                    score -= 0.05;
                }
            }
            let score = score.clamp(0.0, 1.0);
            if best.as_ref().is_none_or(|(b, _)| score > *b) {
                best = Some((score, record));
            }
        }
        let (score, record) = best?;
        if score < SEARCH_ACCEPT {
            tracing::debug!(
                target: "econfed::resolver",
                query,
                code = %record.code,
                score,
                "rejecting low-confidence search match"
            );
            return None;
        }
        let is_catalog_code = preferred_codes.contains(&record.code.to_ascii_uppercase());
        if !preferred_codes.is_empty() && !is_catalog_code && score < OFF_CATALOG_GUARD {
            tracing::debug!(
                target: "econfed::resolver",
                query,
                code = %record.code,
                score,
                "rejecting off-catalog match below the guard threshold"
            );
            return None;
        }
        Some(resolved_from_record(&record, score, ResolutionSource::Database))
    }

    /// Lexical score in [0, 1] for a candidate: term overlap plus phrase
    /// containment and a small rank bonus. Raw search ranks are unbounded
    /// and not probabilities; this keeps lexical fit primary.
    fn score_search_match(&self, query: &str, record: &IndicatorRecord, rank: usize) -> f64 {
        let query_lower = query.trim().to_ascii_lowercase();
        if record.code.eq_ignore_ascii_case(&query_lower) {
            return 1.0;
        }

        let query_terms = tokenize(&query_lower);
        if query_terms.is_empty() {
            return 0.0;
        }
        let candidate_terms = tokenize(&format!(
            "{} {} {}",
            record.name, record.code, record.description
        ));
        let overlap = query_terms
            .iter()
            .filter(|t| candidate_terms.contains(t))
            .count();
        let overlap_ratio = overlap as f64 / query_terms.len() as f64;

        let name_lower = record.name.to_ascii_lowercase();
        let code_lower = record.code.to_ascii_lowercase();
        let mut phrase_bonus = 0.0;
        if name_lower.contains(&query_lower) {
            phrase_bonus += 0.2;
        }
        if code_lower.contains(&query_lower) {
            phrase_bonus += 0.15;
        }

        let rank_bonus = (0.1 - rank as f64 * 0.02).max(0.0);

        let mut confidence = 0.1 + 0.75 * overlap_ratio + phrase_bonus + rank_bonus;
        if overlap == 0 && !name_lower.contains(&query_lower) && !code_lower.contains(&query_lower)
        {
            confidence *= 0.2;
        }
        confidence.clamp(0.0, 1.0)
    }

    /// Concept alignment adjustment in [-0.45, 0.40]: catalog exclusions
    /// hard-penalize, synonym phrase hits and term overlap reward.
    fn score_concept_alignment(&self, concept: Option<&str>, record: &IndicatorRecord) -> f64 {
        let Some(concept) = concept else {
            return 0.0;
        };
        let candidate_text = format!(
            "{} {} {}",
            record.name, record.description, record.code
        )
        .to_ascii_lowercase();

        for exclusion in self.catalog.get_exclusions(concept) {
            let excl = exclusion.trim().to_ascii_lowercase();
            if !excl.is_empty() && candidate_text.contains(&excl) {
                return -0.45;
            }
        }

        let synonyms = self.catalog.get_all_synonyms(concept);
        let mut phrase_hits = 0usize;
        let mut concept_terms: Vec<String> = Vec::new();
        for synonym in &synonyms {
            let syn = synonym.trim().to_ascii_lowercase();
            if syn.is_empty() {
                continue;
            }
            for t in tokenize(&syn) {
                if !concept_terms.contains(&t) {
                    concept_terms.push(t);
                }
            }
            if syn.len() >= 3 && candidate_text.contains(&syn) {
                phrase_hits += 1;
            }
        }
        if concept_terms.is_empty() {
            return 0.0;
        }

        let candidate_terms = tokenize(&candidate_text);
        let overlap = concept_terms
            .iter()
            .filter(|t| candidate_terms.contains(*t))
            .count() as f64
            / concept_terms.len() as f64;

        let mut score = 0.0;
        if phrase_hits > 0 {
            score += (0.08 * phrase_hits as f64).min(0.25);
        }
        score += (overlap * 0.30).min(0.20);
        if phrase_hits == 0 && overlap == 0.0 {
            score -= 0.10;
        }
        score.clamp(-0.45, 0.40)
    }

    /// Drop all cached resolutions (admin operation, e.g. after hot reload).
    pub fn clear_cache(&self) {
        self.cache.invalidate_all();
    }
}

fn resolved_from_record(
    record: &IndicatorRecord,
    confidence: f64,
    source: ResolutionSource,
) -> ResolvedIndicator {
    let mut metadata = BTreeMap::new();
    if !record.description.is_empty() {
        metadata.insert("description".to_string(), record.description.clone());
    }
    ResolvedIndicator {
        code: record.code.clone(),
        provider: record.provider,
        name: record.name.clone(),
        confidence: confidence.clamp(0.0, 1.0),
        source,
        metadata,
    }
}

fn title_case(snake: &str) -> String {
    snake
        .split('_')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> IndicatorResolver {
        IndicatorResolver::new(
            Arc::new(Catalog::builtin()),
            Arc::new(IndicatorIndex::seeded()),
        )
    }

    #[test]
    fn exact_code_resolves_with_full_confidence() {
        let r = resolver();
        let hit = r.resolve("UNRATE", Some(Provider::Fred), None).unwrap();
        assert_eq!(hit.code, "UNRATE");
        assert!((hit.confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(hit.source, ResolutionSource::Database);
    }

    #[test]
    fn free_text_resolves_through_catalog_or_search() {
        let r = resolver();
        let hit = r
            .resolve("unemployment rate", Some(Provider::Fred), None)
            .unwrap();
        assert_eq!(hit.code, "UNRATE");
        assert!(hit.confidence >= SEARCH_ACCEPT);
    }

    #[test]
    fn imf_code_translates_for_other_provider() {
        let r = resolver();
        let hit = r
            .resolve("NGDP_RPCH", Some(Provider::WorldBank), None)
            .unwrap();
        assert_eq!(hit.code, "NY.GDP.MKTP.KD.ZG");
        assert_eq!(hit.source, ResolutionSource::Translator);
    }

    #[test]
    fn unresolvable_terms_return_none() {
        let r = resolver();
        assert!(r.resolve("quantum flux capacitance", Some(Provider::Fred), None).is_none());
        assert!(r.resolve("", Some(Provider::Fred), None).is_none());
    }

    #[test]
    fn provider_open_resolution_picks_a_provider() {
        let r = resolver();
        let (provider, code, confidence) =
            r.find_best_match("gdp growth", Some("DE"), &[]).unwrap();
        assert_eq!(provider, Provider::WorldBank);
        assert_eq!(code, "NY.GDP.MKTP.KD.ZG");
        assert!(confidence > 0.5);
    }

    #[test]
    fn confidence_is_always_bounded() {
        let r = resolver();
        for query in ["gdp", "inflation", "UNRATE", "house prices", "credit"] {
            for provider in [None, Some(Provider::Fred), Some(Provider::Bis)] {
                if let Some(hit) = r.resolve(query, provider, None) {
                    assert!((0.0..=1.0).contains(&hit.confidence), "{query}");
                }
            }
        }
    }

    #[test]
    fn alternatives_exclude_the_primary_code() {
        let r = resolver();
        let alts = r.get_alternatives("consumer credit", Provider::Fred, 3);
        assert!(!alts.is_empty());
        assert!(alts.iter().all(|a| !a.code.eq_ignore_ascii_case("consumer credit")));
        assert!(alts.len() <= 3);
    }

    #[test]
    fn repeated_resolution_is_cached() {
        let r = resolver();
        let first = r.resolve("gdp growth", Some(Provider::WorldBank), None);
        let second = r.resolve("gdp growth", Some(Provider::WorldBank), None);
        assert_eq!(first, second);
    }
}
