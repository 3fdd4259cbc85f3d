//! Process-wide pooled HTTP client and secret masking.

use std::sync::OnceLock;
use std::time::Duration;

/// Shared HTTP connection pool.
///
/// All adapters go through one pooled `reqwest::Client`: keep-alive
/// connections are reused across providers, and the limits below bound the
/// process's total outbound concurrency. The client is cheap to clone; the
/// pool lives behind it.
pub struct HttpPool;

static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

impl HttpPool {
    /// Total request timeout applied to every call.
    pub const TOTAL_TIMEOUT: Duration = Duration::from_secs(30);
    /// Connection establishment timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    /// Keep-alive idle connections retained per host.
    pub const MAX_IDLE_PER_HOST: usize = 50;

    /// The shared client. Built on first use with pooling, keep-alive, and
    /// the standard timeouts; safe for concurrent use.
    pub fn client() -> reqwest::Client {
        CLIENT
            .get_or_init(|| {
                reqwest::Client::builder()
                    .timeout(Self::TOTAL_TIMEOUT)
                    .connect_timeout(Self::CONNECT_TIMEOUT)
                    .pool_max_idle_per_host(Self::MAX_IDLE_PER_HOST)
                    .pool_idle_timeout(Duration::from_secs(30))
                    .user_agent(concat!("econfed/", env!("CARGO_PKG_VERSION")))
                    .build()
                    .expect("default reqwest client construction cannot fail")
            })
            .clone()
    }
}

/// Query parameter names whose values must never appear in metadata or logs.
const SECRET_PARAMS: [&str; 7] = [
    "api_key",
    "apikey",
    "key",
    "token",
    "subscription-key",
    "x_cg_pro_api_key",
    "x_cg_demo_api_key",
];

/// Mask secret query parameters in a URL, for reproducible `api_url`
/// metadata. Path segments that *are* the key (ExchangeRate-API style
/// `/v6/{key}/latest/...`) are the adapter's responsibility to mask.
#[must_use]
pub fn mask_secrets(url: &str) -> String {
    let Ok(mut parsed) = url::Url::parse(url) else {
        return url.to_string();
    };
    let masked: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| {
            let lower = k.to_ascii_lowercase();
            if SECRET_PARAMS.contains(&lower.as_str()) && !v.is_empty() {
                (k.into_owned(), "***".to_string())
            } else {
                (k.into_owned(), v.into_owned())
            }
        })
        .collect();
    if masked.is_empty() {
        return parsed.to_string();
    }
    parsed
        .query_pairs_mut()
        .clear()
        .extend_pairs(masked.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    parsed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_api_key_params() {
        let url = "https://api.stlouisfed.org/fred/series?series_id=UNRATE&api_key=abc123&file_type=json";
        let masked = mask_secrets(url);
        assert!(masked.contains("api_key=***"));
        assert!(masked.contains("series_id=UNRATE"));
        assert!(!masked.contains("abc123"));
    }

    #[test]
    fn leaves_public_urls_untouched() {
        let url = "https://api.worldbank.org/v2/country/US/indicator/NY.GDP.MKTP.CD?format=json";
        assert_eq!(mask_secrets(url), url);
    }
}
