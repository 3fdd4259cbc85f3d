//! Cross-provider indicator translation via universal concepts.
//!
//! Handles IMF-style codes (NGDP_RPCH, LUR, PCPIPCH) that parsers commonly
//! emit, plus fuzzy matching of common phrases, and maps both onto
//! provider-specific code lists. Stateless: all tables are static.

use econfed_types::Provider;

/// One universal concept with its aliases, known IMF codes, and
/// per-provider code lists. The first code per provider is the primary.
struct UniversalConcept {
    name: &'static str,
    aliases: &'static [&'static str],
    imf_codes: &'static [&'static str],
    providers: &'static [(Provider, &'static [&'static str])],
}

static UNIVERSAL_CONCEPTS: &[UniversalConcept] = &[
    UniversalConcept {
        name: "gdp",
        aliases: &["gdp", "gross domestic product", "national output"],
        imf_codes: &["NGDP", "NGDP_R", "NGDPD"],
        providers: &[
            (Provider::Fred, &["GDP", "GDPC1"]),
            (Provider::WorldBank, &["NY.GDP.MKTP.CD", "NY.GDP.MKTP.KD"]),
            (Provider::Imf, &["NGDPD"]),
            (Provider::Eurostat, &["nama_10_gdp"]),
            (Provider::Oecd, &["GDP"]),
            (Provider::StatsCan, &["65201210"]),
        ],
    },
    UniversalConcept {
        name: "gdp_growth",
        aliases: &[
            "gdp growth",
            "gdp growth rate",
            "real gdp growth",
            "economic growth",
            "growth rate",
        ],
        imf_codes: &["NGDP_RPCH", "NGDP_R_PCH"],
        providers: &[
            (Provider::Fred, &["A191RL1Q225SBEA"]),
            (Provider::WorldBank, &["NY.GDP.MKTP.KD.ZG"]),
            (Provider::Imf, &["NGDP_RPCH"]),
            (Provider::Eurostat, &["nama_10_gdp"]),
            (Provider::Oecd, &["GDP"]),
        ],
    },
    UniversalConcept {
        name: "gdp_per_capita",
        aliases: &["gdp per capita", "per capita gdp", "income per capita"],
        imf_codes: &["NGDPDPC", "NGDPPC"],
        providers: &[
            (Provider::Fred, &["A939RX0Q048SBEA"]),
            (Provider::WorldBank, &["NY.GDP.PCAP.CD"]),
            (Provider::Imf, &["NGDPDPC"]),
            (Provider::Eurostat, &["nama_10_pc"]),
        ],
    },
    UniversalConcept {
        name: "unemployment",
        aliases: &["unemployment", "unemployment rate", "jobless rate"],
        imf_codes: &["LUR"],
        providers: &[
            (Provider::Fred, &["UNRATE"]),
            (Provider::WorldBank, &["SL.UEM.TOTL.ZS"]),
            (Provider::Imf, &["LUR"]),
            (Provider::Eurostat, &["une_rt_a"]),
            (Provider::Oecd, &["UNE_RT"]),
            (Provider::StatsCan, &["2062815"]),
        ],
    },
    UniversalConcept {
        name: "inflation",
        aliases: &["inflation", "inflation rate", "consumer prices"],
        imf_codes: &["PCPIPCH", "PCPIEPCH"],
        providers: &[
            (Provider::Fred, &["CPIAUCSL"]),
            (Provider::WorldBank, &["FP.CPI.TOTL.ZG"]),
            (Provider::Imf, &["PCPIPCH"]),
            (Provider::Eurostat, &["prc_hicp_aind"]),
            (Provider::Oecd, &["CPI"]),
            (Provider::Bis, &["WS_LONG_CPI"]),
        ],
    },
    UniversalConcept {
        name: "cpi",
        aliases: &["cpi", "consumer price index", "cost of living"],
        imf_codes: &["PCPI"],
        providers: &[
            (Provider::Fred, &["CPIAUCSL"]),
            (Provider::WorldBank, &["FP.CPI.TOTL"]),
            (Provider::Imf, &["PCPIPCH"]),
            (Provider::Eurostat, &["prc_hicp_aind"]),
            (Provider::Oecd, &["CPI"]),
            (Provider::Bis, &["WS_LONG_CPI"]),
            (Provider::StatsCan, &["41690914"]),
        ],
    },
    UniversalConcept {
        name: "government_debt",
        aliases: &[
            "government debt",
            "public debt",
            "sovereign debt",
            "national debt",
            "debt to gdp",
        ],
        imf_codes: &["GGXWDG_NGDP", "GGXWDG"],
        providers: &[
            (Provider::Fred, &["GFDEGDQ188S"]),
            (Provider::WorldBank, &["GC.DOD.TOTL.GD.ZS"]),
            (Provider::Imf, &["GGXWDG_NGDP"]),
            (Provider::Eurostat, &["gov_10q_ggdebt"]),
        ],
    },
    UniversalConcept {
        name: "household_debt",
        aliases: &[
            "household debt",
            "household credit",
            "household debt to gdp",
            "household debt to income",
            "debt to income ratio",
        ],
        imf_codes: &[],
        providers: &[
            (Provider::Fred, &["HDTGPDUSQ163N"]),
            (Provider::Bis, &["WS_TC"]),
        ],
    },
    UniversalConcept {
        name: "consumer_credit",
        aliases: &[
            "consumer credit",
            "total consumer credit",
            "consumer loans",
            "credit card debt",
            "revolving credit",
            "consumer debt",
        ],
        imf_codes: &[],
        providers: &[(Provider::Fred, &["TOTALSL", "REVOLSL"])],
    },
    UniversalConcept {
        name: "corporate_debt",
        aliases: &[
            "corporate debt",
            "business debt",
            "corporate credit",
            "nonfinancial corporate debt",
        ],
        imf_codes: &[],
        providers: &[
            (Provider::Fred, &["BCNSDODNS"]),
            (Provider::Bis, &["WS_TC"]),
        ],
    },
    UniversalConcept {
        name: "total_credit",
        aliases: &[
            "total credit",
            "private credit",
            "credit to gdp",
            "credit to private sector",
            "private sector credit",
        ],
        imf_codes: &[],
        providers: &[
            (Provider::WorldBank, &["FS.AST.PRVT.GD.ZS"]),
            (Provider::Bis, &["WS_TC"]),
        ],
    },
    UniversalConcept {
        name: "interest_rate",
        aliases: &[
            "interest rate",
            "policy rate",
            "central bank rate",
            "fed funds rate",
            "base rate",
            "repo rate",
            "official rate",
            "key rate",
            "monetary policy rate",
            "bank rate",
            "overnight rate",
        ],
        imf_codes: &[],
        providers: &[
            (Provider::Fred, &["FEDFUNDS", "DFEDTARU"]),
            (Provider::WorldBank, &["FR.INR.RINR"]),
            (Provider::Eurostat, &["EI_MFIR_M"]),
            (Provider::Oecd, &["IR"]),
            (Provider::Bis, &["WS_CBPOL"]),
        ],
    },
    UniversalConcept {
        name: "trade_balance",
        aliases: &["trade balance", "trade deficit", "net exports", "external balance"],
        imf_codes: &["BCA", "BCA_NGDPD"],
        providers: &[
            (Provider::Fred, &["BOPGSTB"]),
            (Provider::WorldBank, &["NE.RSB.GNFS.ZS"]),
            (Provider::Imf, &["BCA_NGDPD"]),
            (Provider::Eurostat, &["tet00034"]),
        ],
    },
    UniversalConcept {
        name: "exports",
        aliases: &["exports", "export", "goods exports", "merchandise exports"],
        imf_codes: &["BX_GDP"],
        providers: &[
            (Provider::Fred, &["EXPGS"]),
            (Provider::WorldBank, &["NE.EXP.GNFS.ZS"]),
            (Provider::Eurostat, &["ext_lt_maineu"]),
            (Provider::Comtrade, &["EXPORT"]),
        ],
    },
    UniversalConcept {
        name: "imports",
        aliases: &["imports", "import", "goods imports", "merchandise imports"],
        imf_codes: &["BM_GDP"],
        providers: &[
            (Provider::Fred, &["IMPGS"]),
            (Provider::WorldBank, &["NE.IMP.GNFS.ZS"]),
            (Provider::Eurostat, &["ext_lt_maineu"]),
            (Provider::Comtrade, &["IMPORT"]),
        ],
    },
    UniversalConcept {
        name: "house_prices",
        aliases: &[
            "house prices",
            "housing prices",
            "property prices",
            "real estate prices",
            "home prices",
        ],
        imf_codes: &[],
        providers: &[
            (Provider::Fred, &["CSUSHPINSA"]),
            (Provider::Eurostat, &["prc_hpi_a"]),
            (Provider::Bis, &["WS_SPP"]),
        ],
    },
    UniversalConcept {
        name: "population",
        aliases: &["population", "total population"],
        imf_codes: &["LP"],
        providers: &[
            (Provider::Fred, &["POPTHM"]),
            (Provider::WorldBank, &["SP.POP.TOTL"]),
            (Provider::Imf, &["LP"]),
            (Provider::Eurostat, &["demo_pjan"]),
            (Provider::StatsCan, &["17100009"]),
        ],
    },
    UniversalConcept {
        name: "exchange_rate",
        aliases: &["exchange rate", "forex", "currency", "fx rate", "effective exchange rate"],
        imf_codes: &["EREER"],
        providers: &[
            (Provider::Fred, &["DEXUSEU"]),
            (Provider::WorldBank, &["PA.NUS.FCRF"]),
            (Provider::Imf, &["EREER"]),
            (Provider::Bis, &["WS_XRU"]),
            (Provider::ExchangeRate, &["rates"]),
        ],
    },
];

/// Threshold used for long free-text terms.
const FUZZY_THRESHOLD: f64 = 0.70;
/// Stricter threshold for short terms, where small character differences
/// have outsized similarity impact ("m2 growth" vs "gdp growth").
const FUZZY_THRESHOLD_SHORT: f64 = 0.85;
/// Length boundary between the two thresholds.
const SHORT_TERM_LEN: usize = 15;
/// Threshold for fuzzy-matching against known IMF codes.
const IMF_FUZZY_THRESHOLD: f64 = 0.80;

/// Stateless translator between universal concepts and provider codes.
pub struct IndicatorTranslator;

impl IndicatorTranslator {
    /// Whether the term is a known IMF code (exact, case-folded).
    #[must_use]
    pub fn is_imf_code(term: &str) -> bool {
        Self::imf_code_concept(term).is_some()
    }

    /// Concept a known IMF code belongs to.
    #[must_use]
    pub fn imf_code_concept(code: &str) -> Option<&'static str> {
        let upper = code.trim().to_ascii_uppercase().replace(' ', "_");
        UNIVERSAL_CONCEPTS
            .iter()
            .find(|c| c.imf_codes.contains(&upper.as_str()))
            .map(|c| c.name)
    }

    /// Primary code for a concept on a target provider.
    #[must_use]
    pub fn provider_code(concept: &str, target: Provider) -> Option<&'static str> {
        let lower = concept.trim().to_ascii_lowercase();
        let concept = UNIVERSAL_CONCEPTS.iter().find(|c| c.name == lower)?;
        concept
            .providers
            .iter()
            .find(|(p, codes)| *p == target && !codes.is_empty())
            .map(|(_, codes)| codes[0])
    }

    /// Translate a free-text term or foreign code to a target provider's
    /// code. Tries, in order: the IMF code table, exact alias match, fuzzy
    /// alias match, fuzzy IMF-code match. Returns `(code, concept)`.
    #[must_use]
    pub fn translate_indicator(term: &str, target: Provider) -> Option<(String, String)> {
        let cleaned = term.trim();
        if cleaned.is_empty() {
            return None;
        }

        if let Some(concept) = Self::imf_code_concept(cleaned)
            && let Some(code) = Self::provider_code(concept, target)
        {
            tracing::debug!(
                target: "econfed::translator",
                term = cleaned,
                concept,
                code,
                "translated via IMF code table"
            );
            return Some((code.to_string(), concept.to_string()));
        }

        if let Some(concept) = Self::match_alias(cleaned)
            && let Some(code) = Self::provider_code(concept, target)
        {
            return Some((code.to_string(), concept.to_string()));
        }

        if let Some(concept) = Self::fuzzy_match_concept(cleaned)
            && let Some(code) = Self::provider_code(concept, target)
        {
            tracing::debug!(
                target: "econfed::translator",
                term = cleaned,
                concept,
                code,
                "translated via fuzzy alias match"
            );
            return Some((code.to_string(), concept.to_string()));
        }

        if let Some(imf_code) = Self::fuzzy_match_imf_code(cleaned)
            && let Some(concept) = Self::imf_code_concept(imf_code)
            && let Some(code) = Self::provider_code(concept, target)
        {
            return Some((code.to_string(), concept.to_string()));
        }

        None
    }

    fn match_alias(term: &str) -> Option<&'static str> {
        let lower = term.to_ascii_lowercase().replace('_', " ");
        UNIVERSAL_CONCEPTS
            .iter()
            .find(|c| c.aliases.iter().any(|a| *a == lower))
            .map(|c| c.name)
    }

    /// Best fuzzy alias hit above the length-dependent threshold.
    #[must_use]
    pub fn fuzzy_match_concept(term: &str) -> Option<&'static str> {
        let lower = term.to_ascii_lowercase().replace('_', " ");
        let threshold = if lower.len() < SHORT_TERM_LEN {
            FUZZY_THRESHOLD_SHORT
        } else {
            FUZZY_THRESHOLD
        };

        let mut best: Option<(&'static str, f64)> = None;
        for concept in UNIVERSAL_CONCEPTS {
            for alias in concept.aliases {
                let score = similarity(&lower, alias);
                if score >= threshold && best.is_none_or(|(_, b)| score > b) {
                    best = Some((concept.name, score));
                }
            }
        }
        best.map(|(name, _)| name)
    }

    fn fuzzy_match_imf_code(term: &str) -> Option<&'static str> {
        let upper = term.to_ascii_uppercase().replace(' ', "_");
        let mut best: Option<(&'static str, f64)> = None;
        for concept in UNIVERSAL_CONCEPTS {
            for code in concept.imf_codes {
                let score = similarity(&upper, code);
                if score >= IMF_FUZZY_THRESHOLD && best.is_none_or(|(_, b)| score > b) {
                    best = Some((code, score));
                }
            }
        }
        best.map(|(code, _)| code)
    }
}

/// Sequence similarity in [0, 1]: `2 * lcs / (len_a + len_b)`, the
/// difflib-style ratio over characters.
fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in &a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    let lcs = prev[b.len()];
    (2.0 * lcs as f64) / ((a.len() + b.len()) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imf_codes_translate_to_target_providers() {
        let (code, concept) =
            IndicatorTranslator::translate_indicator("NGDP_RPCH", Provider::WorldBank).unwrap();
        assert_eq!(code, "NY.GDP.MKTP.KD.ZG");
        assert_eq!(concept, "gdp_growth");
        assert!(IndicatorTranslator::is_imf_code("LUR"));
        assert!(!IndicatorTranslator::is_imf_code("UNRATE"));
    }

    #[test]
    fn exact_alias_translation() {
        let (code, concept) =
            IndicatorTranslator::translate_indicator("consumer credit", Provider::Fred).unwrap();
        assert_eq!(code, "TOTALSL");
        assert_eq!(concept, "consumer_credit");
    }

    #[test]
    fn short_terms_use_the_strict_threshold() {
        // "m2 growth" is lexically close to "gdp growth" but must not match
        // under the short-term threshold.
        assert_eq!(IndicatorTranslator::fuzzy_match_concept("m2 growth"), None);
        // A near-exact phrase still matches.
        assert_eq!(
            IndicatorTranslator::fuzzy_match_concept("gdp growth rates"),
            Some("gdp_growth")
        );
    }

    #[test]
    fn missing_provider_mapping_returns_none() {
        // BIS has no GDP dataset in the universal table.
        assert_eq!(
            IndicatorTranslator::translate_indicator("gdp", Provider::Bis),
            None
        );
    }

    #[test]
    fn similarity_is_symmetric_and_bounded() {
        assert!((similarity("abc", "abc") - 1.0).abs() < f64::EPSILON);
        assert_eq!(similarity("abc", ""), 0.0);
        let s1 = similarity("gdp growth", "m2 growth");
        let s2 = similarity("m2 growth", "gdp growth");
        assert!((s1 - s2).abs() < f64::EPSILON);
        assert!(s1 < 0.85);
    }
}
