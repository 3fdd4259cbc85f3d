//! End-to-end fetch orchestration.
//!
//! The pipeline: normalize and default parameters, resolve the
//! indicator code, check the cache, honour the catalog's availability
//! verdict, call the adapter through the pacing gate with retries, walk
//! the fallback chain on no-data, validate relevance of fallback results,
//! log value validation, and cache what came back.

use futures::StreamExt;

use econfed_middleware::CacheKey;
use econfed_types::{
    FedError, FetchRequest, ParsedIntent, Provider, RoutingDecision, Series,
};

use crate::core::{EconFed, tag_err};
use crate::relevance::is_fallback_relevant;
use crate::router::ProviderRouter;
use crate::validator::DataValidator;
use crate::{params, suggest};

/// Resolver confidence a provider needs to join the fallback chain.
const FALLBACK_RESOLVER_CONFIDENCE: f64 = 0.6;

/// High-signal cues used to detect parser/indicator disagreement.
const CUE_GROUPS: &[(&str, &[&str])] = &[
    ("import", &["import", "imports"]),
    ("export", &["export", "exports"]),
    ("trade_balance", &["trade balance", "trade surplus", "trade deficit"]),
    ("debt", &["debt", "liability", "liabilities"]),
    ("unemployment", &["unemployment", "jobless"]),
    ("inflation", &["inflation", "consumer price", "cpi"]),
    ("savings", &["saving", "savings"]),
];

impl EconFed {
    /// Execute a parsed intent end-to-end.
    ///
    /// Decomposed intents fan out over their entities with bounded
    /// concurrency and return in input entity order. Multi-indicator
    /// intents split into one subquery per indicator. Repeated calls with
    /// the same normalized parameters return identical series, subject to
    /// upstream changes and cache TTL.
    ///
    /// # Errors
    /// - [`FedError::InvalidInput`] for clarification-needed intents.
    /// - [`FedError::DataNotAvailable`] when the primary and every
    ///   fallback provider come up empty; carries suggestions.
    /// - [`FedError::RequestTimeout`] when the configured overall deadline
    ///   elapses; no partial series are returned.
    pub async fn execute(&self, intent: &ParsedIntent) -> Result<Vec<Series>, FedError> {
        if intent.needs_clarification {
            return Err(FedError::InvalidInput {
                message: "the query needs clarification before fetching".to_string(),
                clarifications: intent.clarification_questions.clone(),
            });
        }

        match self.cfg.request_timeout {
            Some(deadline) => tokio::time::timeout(deadline, self.execute_inner(intent))
                .await
                .map_err(|_| FedError::RequestTimeout)?,
            None => self.execute_inner(intent).await,
        }
    }

    /// Boxed for recursion: decomposition and multi-indicator splitting
    /// both re-enter this function.
    fn execute_inner<'a>(
        &'a self,
        intent: &'a ParsedIntent,
    ) -> futures::future::BoxFuture<'a, Result<Vec<Series>, FedError>> {
        Box::pin(self.execute_inner_impl(intent))
    }

    async fn execute_inner_impl(&self, intent: &ParsedIntent) -> Result<Vec<Series>, FedError> {
        if let Some(decomposition) = &intent.decomposition
            && !decomposition.entities.is_empty()
        {
            return self.execute_decomposed(intent, &decomposition.entities).await;
        }

        if intent.indicators.len() > 1 {
            let mut all = Vec::new();
            for indicator in &intent.indicators {
                let mut sub = intent.clone();
                sub.indicators = vec![indicator.clone()];
                sub.decomposition = None;
                all.extend(self.execute_inner(&sub).await?);
            }
            return Ok(all);
        }

        let mut decision = ProviderRouter::route(intent, &self.catalog);
        if self.cfg.use_hybrid_router
            && !decision.is_explicit_user_choice
            && let Some(ranker) = &self.ranker
            && let Some(better) = ranker.rank(
                &intent.original_query,
                &intent.indicators,
                decision.provider,
            )
            && better != decision.provider
        {
            tracing::info!(
                target: "econfed::router",
                from = %decision.provider,
                to = %better,
                "hybrid ranking override"
            );
            decision = RoutingDecision::routed(better, "hybrid ranking override");
        }
        if let Some(warning) = &decision.validation_warning {
            tracing::info!(target: "econfed::router", "{warning}");
        }

        self.fetch_with_fallback(&decision, intent).await
    }

    /// One user query over N entities: fan out with bounded concurrency,
    /// return in input entity order (not arrival order).
    async fn execute_decomposed(
        &self,
        intent: &ParsedIntent,
        entities: &[String],
    ) -> Result<Vec<Series>, FedError> {
        let indicator = intent.indicators.first().cloned().unwrap_or_default();
        let subs: Vec<ParsedIntent> = entities
            .iter()
            .map(|entity| {
                let mut sub = intent.clone();
                sub.decomposition = None;
                sub.original_query = format!("{indicator} for {entity}");
                sub.parameters.remove("countries");
                sub.set_param("country", entity.clone());
                sub
            })
            .collect();
        let subqueries: Vec<futures::future::BoxFuture<'_, Result<Vec<Series>, FedError>>> =
            subs.iter().map(|sub| self.execute_inner(sub)).collect();

        // `buffered` preserves input order regardless of completion order.
        let results: Vec<Result<Vec<Series>, FedError>> = futures::stream::iter(subqueries)
            .buffered(self.cfg.decomposition_concurrency.max(1))
            .collect()
            .await;

        let mut out = Vec::new();
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(series) => out.extend(series),
                Err(err) => errors.push(err),
            }
        }
        if out.is_empty() && !errors.is_empty() {
            return Err(FedError::AllProvidersFailed(errors));
        }
        Ok(out)
    }

    async fn fetch_with_fallback(
        &self,
        decision: &RoutingDecision,
        intent: &ParsedIntent,
    ) -> Result<Vec<Series>, FedError> {
        let mut provider = decision.provider;
        let resolution_query = select_indicator_query(intent);
        let mut request = self.build_request_for(intent, provider, &resolution_query);

        // Catalog availability: re-route before any HTTP when the catalog
        // says this provider lacks the concept, unless the user explicitly
        // chose it.
        if !decision.is_explicit_user_choice
            && let Some(concept) = self.catalog.find_concept_by_term(&resolution_query)
            && !self.catalog.is_provider_available(concept, provider)
            && let Some((better, _, _)) =
                self.catalog
                    .get_best_provider(concept, &request.countries, None)
            && self.has_adapter(better)
        {
            tracing::info!(
                target: "econfed::fetch",
                from = %provider,
                to = %better,
                concept,
                "catalog availability re-route"
            );
            provider = better;
            request = self.build_request_for(intent, provider, &resolution_query);
        }

        let primary_error = match self.attempt(provider, &request).await {
            Ok(series) => {
                return Ok(series);
            }
            Err(e @ FedError::InvalidInput { .. }) => return Err(e),
            Err(e) => e,
        };
        tracing::warn!(
            target: "econfed::fetch",
            %provider,
            error = %primary_error,
            "primary provider failed, walking the fallback chain"
        );

        let target_country = request.first_country().map(str::to_string);
        let fallbacks = self.compute_fallbacks(provider, &resolution_query, &request);
        let mut errors = vec![tag_err(provider, primary_error)];

        for fallback in fallbacks {
            let fb_request = self.build_request_for(intent, fallback, &resolution_query);
            match self.attempt(fallback, &fb_request).await {
                Ok(series) => {
                    if is_fallback_relevant(
                        &intent.indicators,
                        &series,
                        target_country.as_deref(),
                    ) {
                        tracing::info!(
                            target: "econfed::fetch",
                            %fallback,
                            "fallback succeeded"
                        );
                        return Ok(series);
                    }
                    tracing::warn!(
                        target: "econfed::fetch",
                        %fallback,
                        "fallback returned unrelated data, skipping"
                    );
                }
                Err(err) => {
                    tracing::warn!(target: "econfed::fetch", %fallback, error = %err, "fallback failed");
                    errors.push(tag_err(fallback, err));
                }
            }
        }

        let message = match errors.first() {
            Some(FedError::DataNotAvailable { message, .. }) => message.clone(),
            Some(other) => other.to_string(),
            None => "no data".to_string(),
        };
        Err(FedError::not_available_with(
            provider,
            message,
            suggest::no_data_suggestions(provider),
        ))
    }

    /// Build and code-resolve the request for one provider.
    fn build_request_for(
        &self,
        intent: &ParsedIntent,
        provider: Provider,
        resolution_query: &str,
    ) -> FetchRequest {
        let default_years = self
            .adapter(provider)
            .map_or(10, |a| a.default_range_years());
        let mut request = params::build_request(intent, provider, default_years);

        if request.series_id.is_none() {
            let country = request.first_country().map(str::to_string);
            if let Some(resolved) =
                self.resolver
                    .resolve(resolution_query, Some(provider), country.as_deref())
            {
                tracing::debug!(
                    target: "econfed::fetch",
                    %provider,
                    code = %resolved.code,
                    confidence = resolved.confidence,
                    source = ?resolved.source,
                    "indicator resolved"
                );
                request.series_id = Some(resolved.code);
            }
            // Unresolved terms fall through to the adapter's own mapping.
        }

        // Single-cadence dataflows ignore the requested frequency.
        if let (Some(adapter), Some(series_id)) = (self.adapter(provider), &request.series_id)
            && let Some(forced) = adapter.forced_frequency(series_id)
        {
            request.frequency = Some(forced);
        }
        request
    }

    /// One provider attempt: cache, gate, retries, validation, cache fill.
    async fn attempt(
        &self,
        provider: Provider,
        request: &FetchRequest,
    ) -> Result<Vec<Series>, FedError> {
        let Some(adapter) = self.adapter(provider) else {
            return Err(FedError::not_available(
                provider,
                format!("no adapter registered for {provider}"),
            ));
        };

        let key = CacheKey::new(provider, request);
        if let Some(hit) = self.cache.get(&key).await {
            tracing::debug!(target: "econfed::fetch", %provider, "cache hit");
            return Ok(hit);
        }

        let attempts = self.cfg.attempts_for(provider) + 1;
        let gate = &self.gate;
        let timeout = self.cfg.provider_timeout;
        let result = econfed_core::retry::retry_with_backoff(
            provider,
            &self.cfg.retry,
            attempts,
            || async move {
                gate.check(provider)?;
                match tokio::time::timeout(timeout, adapter.fetch(request)).await {
                    Ok(Ok(series)) => {
                        gate.record_success(provider);
                        Ok(series)
                    }
                    Ok(Err(err)) => {
                        let throttle = matches!(
                            err,
                            FedError::RateLimited { .. } | FedError::Transport(_)
                        );
                        gate.record_failure(provider, throttle);
                        Err(err)
                    }
                    Err(_) => {
                        gate.record_failure(provider, false);
                        Err(FedError::ProviderTimeout { provider })
                    }
                }
            },
        )
        .await;

        let series = match result {
            Ok(series) => series,
            // An open breaker is a terminal no-data condition for this
            // request; the fallback chain takes over.
            Err(FedError::CircuitOpen { provider, reset_in_ms }) => {
                return Err(FedError::not_available(
                    provider,
                    format!("{provider} is rate limited (circuit open, resets in {reset_in_ms}ms)"),
                ));
            }
            Err(other) => return Err(other),
        };

        if series.is_empty() || series.iter().all(Series::is_empty) {
            return Err(FedError::not_available(
                provider,
                "provider returned an empty result".to_string(),
            ));
        }

        // Observability only; upstream data passes through unchanged.
        DataValidator.validate_and_log(&series);

        self.cache.put(&key, &series).await;
        Ok(series)
    }

    /// Fallback chain: resolver-confirmed providers by confidence, then
    /// the static per-primary chain, then catalog fallbacks; deduplicated,
    /// registered-only, capped.
    fn compute_fallbacks(
        &self,
        primary: Provider,
        indicator: &str,
        request: &FetchRequest,
    ) -> Vec<Provider> {
        let mut ranked: Vec<(Provider, f64)> = Vec::new();
        let country = request.first_country();
        for candidate in Provider::ALL {
            if candidate == primary || !self.has_adapter(candidate) {
                continue;
            }
            if let Some(resolved) = self.resolver.resolve(indicator, Some(candidate), country)
                && resolved.confidence >= FALLBACK_RESOLVER_CONFIDENCE
            {
                ranked.push((candidate, resolved.confidence));
            }
        }
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut out: Vec<Provider> = ranked.into_iter().map(|(p, _)| p).collect();
        for p in suggest::static_fallback_chain(primary) {
            if *p != primary && self.has_adapter(*p) && !out.contains(p) {
                out.push(*p);
            }
        }
        if let Some(concept) = self.catalog.find_concept_by_term(indicator) {
            for (p, _, _) in self.catalog.get_fallback_providers(concept, Some(primary)) {
                if self.has_adapter(p) && !out.contains(&p) {
                    out.push(p);
                }
            }
        }
        out.truncate(self.cfg.max_fallbacks);
        tracing::debug!(
            target: "econfed::fetch",
            %primary,
            fallbacks = ?out,
            "fallback chain computed"
        );
        out
    }

}

/// Pick the text to resolve the indicator from: the parsed indicator term
/// by default, the original query when the two disagree on high-signal
/// cues or share almost no terms.
fn select_indicator_query(intent: &ParsedIntent) -> String {
    let Some(indicator) = intent.indicators.first() else {
        return String::new();
    };
    let indicator = indicator.trim();
    if indicator.is_empty() || intent.original_query.trim().is_empty() {
        return indicator.to_string();
    }

    let original_cues = extract_cues(&intent.original_query);
    let indicator_cues = extract_cues(indicator);
    if !original_cues.is_empty() && original_cues.iter().all(|c| !indicator_cues.contains(c)) {
        tracing::info!(
            target: "econfed::fetch",
            original = ?original_cues,
            parsed = ?indicator_cues,
            "indicator cue mismatch; resolving from the original query"
        );
        return intent.original_query.clone();
    }

    // Almost-disjoint term sets also indicate the parser drifted.
    let original_terms = simple_terms(&intent.original_query);
    let indicator_terms = simple_terms(indicator);
    if !original_terms.is_empty() && !indicator_terms.is_empty() {
        let overlap = original_terms
            .iter()
            .filter(|t| indicator_terms.contains(t))
            .count() as f64
            / original_terms.len() as f64;
        if overlap < 0.15 {
            tracing::info!(
                target: "econfed::fetch",
                overlap,
                "low indicator-term overlap; resolving from the original query"
            );
            return intent.original_query.clone();
        }
    }
    indicator.to_string()
}

fn simple_terms(text: &str) -> Vec<String> {
    text.to_ascii_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(str::to_string)
        .collect()
}

fn extract_cues(text: &str) -> Vec<&'static str> {
    let lower = text.to_ascii_lowercase();
    CUE_GROUPS
        .iter()
        .filter(|(_, phrases)| phrases.iter().any(|p| lower.contains(p)))
        .map(|(cue, _)| *cue)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cue_mismatch_falls_back_to_the_original_query() {
        let mut intent =
            ParsedIntent::for_indicator("export value index", "German imports from China");
        intent.indicators = vec!["export value index".to_string()];
        let query = select_indicator_query(&intent);
        assert_eq!(query, "German imports from China");
    }

    #[test]
    fn agreeing_cues_keep_the_parsed_indicator() {
        let intent =
            ParsedIntent::for_indicator("unemployment rate", "jobless rate in Spain");
        assert_eq!(select_indicator_query(&intent), "unemployment rate");
    }
}
