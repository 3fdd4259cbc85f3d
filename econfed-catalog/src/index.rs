//! The local indicator index: a seeded, in-memory table of known provider
//! series with lexical search, plus the learned-mapping store that
//! metadata-discovery flows write through explicitly.

use std::collections::HashMap;
use std::sync::RwLock;

use econfed_types::Provider;

/// One indexed indicator record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorRecord {
    /// Owning provider.
    pub provider: Provider,
    /// Provider-native code.
    pub code: String,
    /// Human-readable name.
    pub name: String,
    /// Longer description, when available.
    pub description: String,
}

impl IndicatorRecord {
    fn new(provider: Provider, code: &str, name: &str, description: &str) -> Self {
        Self {
            provider,
            code: code.to_string(),
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

/// Seeded indicator index with ranked lexical search.
///
/// The static seed is immutable after construction. Discovered mappings go
/// through [`IndicatorIndex::learn`], an idempotent put-if-absent keyed by
/// `(provider, term)`, and are consulted alongside the static table, never
/// by mutating it.
pub struct IndicatorIndex {
    records: Vec<IndicatorRecord>,
    by_code: HashMap<(Provider, String), usize>,
    learned: RwLock<HashMap<(Provider, String), IndicatorRecord>>,
}

impl Default for IndicatorIndex {
    fn default() -> Self {
        Self::seeded()
    }
}

impl IndicatorIndex {
    /// Build an index from explicit records.
    #[must_use]
    pub fn new(records: Vec<IndicatorRecord>) -> Self {
        let mut by_code = HashMap::with_capacity(records.len());
        for (i, r) in records.iter().enumerate() {
            by_code.insert((r.provider, r.code.to_ascii_uppercase()), i);
        }
        Self {
            records,
            by_code,
            learned: RwLock::new(HashMap::new()),
        }
    }

    /// The built-in seed of well-known series per provider.
    #[must_use]
    pub fn seeded() -> Self {
        use Provider::*;
        let records = vec![
            // FRED
            IndicatorRecord::new(Fred, "UNRATE", "Unemployment Rate", "Civilian unemployment rate, percent, monthly, seasonally adjusted"),
            IndicatorRecord::new(Fred, "GDP", "Gross Domestic Product", "Gross domestic product, billions of dollars, quarterly"),
            IndicatorRecord::new(Fred, "GDPC1", "Real Gross Domestic Product", "Real gross domestic product, chained 2017 dollars"),
            IndicatorRecord::new(Fred, "A191RL1Q225SBEA", "Real GDP Growth Rate", "Real gross domestic product, percent change from preceding period"),
            IndicatorRecord::new(Fred, "CPIAUCSL", "Consumer Price Index for All Urban Consumers", "CPI for all urban consumers, all items, index 1982-1984=100"),
            IndicatorRecord::new(Fred, "FEDFUNDS", "Federal Funds Effective Rate", "Federal funds effective rate, percent, monthly"),
            IndicatorRecord::new(Fred, "DFEDTARU", "Federal Funds Target Range Upper Limit", "Federal funds target range upper limit, percent, daily"),
            IndicatorRecord::new(Fred, "PAYEMS", "All Employees, Total Nonfarm", "Total nonfarm payroll employment, thousands of persons"),
            IndicatorRecord::new(Fred, "ICSA", "Initial Claims", "Initial unemployment insurance claims, weekly"),
            IndicatorRecord::new(Fred, "HOUST", "Housing Starts", "New privately-owned housing units started, thousands"),
            IndicatorRecord::new(Fred, "TOTALSL", "Total Consumer Credit", "Total consumer credit owned and securitized, outstanding"),
            IndicatorRecord::new(Fred, "REVOLSL", "Revolving Consumer Credit", "Revolving consumer credit owned and securitized"),
            IndicatorRecord::new(Fred, "BCNSDODNS", "Nonfinancial Corporate Debt", "Nonfinancial corporate business debt securities and loans"),
            IndicatorRecord::new(Fred, "HDTGPDUSQ163N", "Household Debt to GDP", "Household debt to GDP for United States, percent"),
            IndicatorRecord::new(Fred, "GFDEGDQ188S", "Federal Debt to GDP", "Federal debt: total public debt as percent of gross domestic product"),
            IndicatorRecord::new(Fred, "CSUSHPINSA", "Case-Shiller Home Price Index", "S&P CoreLogic Case-Shiller U.S. national home price index"),
            IndicatorRecord::new(Fred, "DEXUSEU", "USD to EUR Exchange Rate", "U.S. dollars to euro spot exchange rate, daily"),
            IndicatorRecord::new(Fred, "DEXJPUS", "JPY to USD Exchange Rate", "Japanese yen to U.S. dollar spot exchange rate, daily"),
            IndicatorRecord::new(Fred, "BOPGSTB", "Trade Balance: Goods and Services", "Trade balance: goods and services, balance of payments basis"),
            IndicatorRecord::new(Fred, "EXPGS", "Exports of Goods and Services", "Exports of goods and services, billions of dollars"),
            IndicatorRecord::new(Fred, "IMPGS", "Imports of Goods and Services", "Imports of goods and services, billions of dollars"),
            IndicatorRecord::new(Fred, "POPTHM", "Population", "Population including armed forces overseas, thousands"),
            IndicatorRecord::new(Fred, "M2SL", "M2 Money Stock", "M2 money stock, billions of dollars, monthly"),
            // World Bank
            IndicatorRecord::new(WorldBank, "NY.GDP.MKTP.CD", "GDP (current US$)", "Gross domestic product at purchaser's prices, current US dollars"),
            IndicatorRecord::new(WorldBank, "NY.GDP.MKTP.KD.ZG", "GDP growth (annual %)", "Annual percentage growth rate of GDP at constant prices"),
            IndicatorRecord::new(WorldBank, "NY.GDP.PCAP.CD", "GDP per capita (current US$)", "Gross domestic product divided by midyear population"),
            IndicatorRecord::new(WorldBank, "SL.UEM.TOTL.ZS", "Unemployment, total (% of labor force)", "Share of the labor force without work but available"),
            IndicatorRecord::new(WorldBank, "FP.CPI.TOTL.ZG", "Inflation, consumer prices (annual %)", "Annual percentage change in consumer price index"),
            IndicatorRecord::new(WorldBank, "FP.CPI.TOTL", "Consumer price index (2010 = 100)", "Consumer price index, base year 2010"),
            IndicatorRecord::new(WorldBank, "SP.POP.TOTL", "Population, total", "Total population based on the de facto definition"),
            IndicatorRecord::new(WorldBank, "FR.INR.RINR", "Real interest rate (%)", "Lending interest rate adjusted for inflation"),
            IndicatorRecord::new(WorldBank, "GC.DOD.TOTL.GD.ZS", "Central government debt (% of GDP)", "Entire stock of direct government fixed-term contractual obligations"),
            IndicatorRecord::new(WorldBank, "FS.AST.PRVT.GD.ZS", "Domestic credit to private sector (% of GDP)", "Financial resources provided to the private sector"),
            IndicatorRecord::new(WorldBank, "NE.EXP.GNFS.ZS", "Exports of goods and services (% of GDP)", "Value of all goods and market services provided to the world"),
            IndicatorRecord::new(WorldBank, "NE.IMP.GNFS.ZS", "Imports of goods and services (% of GDP)", "Value of all goods and market services received from the world"),
            IndicatorRecord::new(WorldBank, "NE.RSB.GNFS.ZS", "External balance on goods and services (% of GDP)", "Exports minus imports of goods and services"),
            IndicatorRecord::new(WorldBank, "SL.GDP.PCAP.EM.KD", "GDP per person employed", "Labor productivity: GDP per person employed, constant PPP"),
            IndicatorRecord::new(WorldBank, "PA.NUS.FCRF", "Official exchange rate (LCU per US$)", "Exchange rate determined by national authorities, period average"),
            // IMF
            IndicatorRecord::new(Imf, "NGDP_RPCH", "Real GDP growth", "Gross domestic product, constant prices, percent change"),
            IndicatorRecord::new(Imf, "NGDPD", "GDP, current prices (USD)", "Gross domestic product, current prices, U.S. dollars"),
            IndicatorRecord::new(Imf, "NGDPDPC", "GDP per capita, current prices", "Gross domestic product per capita, current prices, U.S. dollars"),
            IndicatorRecord::new(Imf, "LUR", "Unemployment rate", "Unemployment rate, percent of total labor force"),
            IndicatorRecord::new(Imf, "PCPIPCH", "Inflation, average consumer prices", "Average consumer prices, percent change"),
            IndicatorRecord::new(Imf, "GGXWDG_NGDP", "General government gross debt", "General government gross debt, percent of GDP"),
            IndicatorRecord::new(Imf, "BCA_NGDPD", "Current account balance", "Current account balance, percent of GDP"),
            IndicatorRecord::new(Imf, "LP", "Population", "Population, millions of persons"),
            // BIS
            IndicatorRecord::new(Bis, "WS_CBPOL", "Central bank policy rates", "Policy rates set by central banks, monthly"),
            IndicatorRecord::new(Bis, "WS_TC", "Credit to the non-financial sector", "Total credit to the private non-financial sector"),
            IndicatorRecord::new(Bis, "WS_SPP", "Residential property prices", "Selected residential property price series, quarterly"),
            IndicatorRecord::new(Bis, "WS_LONG_CPI", "Consumer prices", "Long series on consumer prices, monthly"),
            IndicatorRecord::new(Bis, "WS_XRU", "Effective exchange rates", "Nominal and real effective exchange rate indices"),
            IndicatorRecord::new(Bis, "WS_DSR", "Debt service ratios", "Debt service ratios of the private non-financial sector"),
            IndicatorRecord::new(Bis, "WS_GLI", "Global liquidity indicators", "Global liquidity: credit to non-bank borrowers"),
            IndicatorRecord::new(Bis, "WS_DEBT_SEC2_PUB", "International debt securities", "Debt securities issues and amounts outstanding"),
            // Eurostat
            IndicatorRecord::new(Eurostat, "nama_10_gdp", "GDP and main components", "GDP and main aggregates, annual national accounts"),
            IndicatorRecord::new(Eurostat, "nama_10_pc", "GDP per capita", "Main GDP aggregates per capita"),
            IndicatorRecord::new(Eurostat, "une_rt_a", "Unemployment by sex and age", "Unemployment rates by sex, age and citizenship, annual"),
            IndicatorRecord::new(Eurostat, "prc_hicp_aind", "HICP annual data", "Harmonised index of consumer prices, annual average indices"),
            IndicatorRecord::new(Eurostat, "gov_10q_ggdebt", "Government debt", "Quarterly general government gross debt"),
            IndicatorRecord::new(Eurostat, "prc_hpi_a", "House price index", "House price index, annual data"),
            IndicatorRecord::new(Eurostat, "demo_pjan", "Population on 1 January", "Population by age and sex on 1 January"),
            IndicatorRecord::new(Eurostat, "ext_lt_maineu", "Trade by main partners", "Long-term external trade indicators by main partners"),
            IndicatorRecord::new(Eurostat, "tet00034", "Trade balance", "International trade balance of goods"),
            IndicatorRecord::new(Eurostat, "EI_MFIR_M", "Interest rates, monthly", "Money market and MFI interest rates, monthly"),
            // OECD
            IndicatorRecord::new(Oecd, "GDP", "Gross domestic product", "Quarterly national accounts GDP"),
            IndicatorRecord::new(Oecd, "UNE_RT", "Unemployment rate", "Harmonised unemployment rate, monthly"),
            IndicatorRecord::new(Oecd, "CPI", "Consumer price index", "Consumer price indices, all items"),
            IndicatorRecord::new(Oecd, "IR", "Interest rates", "Short and long-term interest rates, monthly"),
            IndicatorRecord::new(Oecd, "PDB_LV", "Productivity levels", "GDP per hour worked and per person employed"),
            // StatsCan
            IndicatorRecord::new(StatsCan, "2062815", "Unemployment rate, Canada", "Labour force characteristics, unemployment rate vector"),
            IndicatorRecord::new(StatsCan, "41690914", "Consumer Price Index, Canada", "CPI all-items vector, monthly"),
            IndicatorRecord::new(StatsCan, "65201210", "Gross domestic product, Canada", "GDP at basic prices vector, monthly"),
            IndicatorRecord::new(StatsCan, "17100009", "Population estimate, Canada", "Quarterly population estimates vector"),
            // CoinGecko
            IndicatorRecord::new(CoinGecko, "bitcoin", "Bitcoin price", "Bitcoin spot price and market data"),
            IndicatorRecord::new(CoinGecko, "ethereum", "Ethereum price", "Ethereum spot price and market data"),
        ];
        Self::new(records)
    }

    /// Exact code lookup (case-insensitive on the code).
    #[must_use]
    pub fn get(&self, provider: Provider, code: &str) -> Option<IndicatorRecord> {
        let key = (provider, code.trim().to_ascii_uppercase());
        self.by_code.get(&key).map(|&i| self.records[i].clone())
    }

    /// Learned mapping for a term, if one was stored.
    #[must_use]
    pub fn get_learned(&self, provider: Provider, term: &str) -> Option<IndicatorRecord> {
        let guard = self.learned.read().expect("learned map lock poisoned");
        guard
            .get(&(provider, term.trim().to_ascii_lowercase()))
            .cloned()
    }

    /// Store a discovered mapping, keyed by `(provider, term)`. Idempotent:
    /// the first write wins and repeat writes are no-ops, so discovery flows
    /// can call this unconditionally. The static seed is never mutated.
    pub fn learn(&self, provider: Provider, term: &str, record: IndicatorRecord) {
        let key = (provider, term.trim().to_ascii_lowercase());
        let mut guard = self.learned.write().expect("learned map lock poisoned");
        guard.entry(key).or_insert(record);
    }

    /// Ranked lexical search over name, code, and description. Plays the
    /// full-text-search role: candidates are ordered by token overlap with
    /// the query, best first, and capped at `limit`.
    #[must_use]
    pub fn search(
        &self,
        query: &str,
        provider: Option<Provider>,
        limit: usize,
    ) -> Vec<IndicatorRecord> {
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            return Vec::new();
        }
        let mut scored: Vec<(f64, &IndicatorRecord)> = self
            .records
            .iter()
            .filter(|r| provider.is_none_or(|p| r.provider == p))
            .filter_map(|r| {
                let text = format!("{} {} {}", r.name, r.code, r.description);
                let tokens = tokenize(&text);
                let overlap = query_tokens.iter().filter(|t| tokens.contains(*t)).count();
                if overlap == 0 {
                    // Allow exact-code candidates through even without
                    // token overlap.
                    if r.code.eq_ignore_ascii_case(query.trim()) {
                        return Some((1.0, r));
                    }
                    return None;
                }
                Some((overlap as f64 / query_tokens.len() as f64, r))
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored
            .into_iter()
            .take(limit)
            .map(|(_, r)| r.clone())
            .collect()
    }
}

/// Stop words shared by index search and resolver scoring.
pub(crate) const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "of", "for", "in", "to", "and", "or", "show", "get", "find", "data",
    "series", "indicator", "rate", "index", "value", "values", "percent", "percentage",
    "country", "countries", "from", "with", "by", "on", "at",
];

/// Tokenize text into normalized terms: lowercase alphanumeric runs, stop
/// words removed, with light plural stemming (prices/price, bodies/body).
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let lower = text.to_ascii_lowercase();
    for run in lower.split(|c: char| !c.is_ascii_alphanumeric()) {
        if run.len() <= 1 || STOP_WORDS.contains(&run) {
            continue;
        }
        push_unique(&mut out, run.to_string());
        if let Some(stem) = run.strip_suffix("ies").filter(|s| s.len() > 1) {
            push_unique(&mut out, format!("{stem}y"));
        } else if let Some(stem) = run.strip_suffix('s').filter(|s| s.len() > 2) {
            push_unique(&mut out, stem.to_string());
        }
    }
    out
}

fn push_unique(v: &mut Vec<String>, s: String) {
    if !v.contains(&s) {
        v.push(s);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_code_lookup_is_case_insensitive() {
        let index = IndicatorIndex::seeded();
        assert!(index.get(Provider::Fred, "unrate").is_some());
        assert!(index.get(Provider::WorldBank, "UNRATE").is_none());
    }

    #[test]
    fn search_ranks_by_overlap() {
        let index = IndicatorIndex::seeded();
        let hits = index.search("unemployment rate", Some(Provider::Fred), 5);
        assert_eq!(hits[0].code, "UNRATE");
    }

    #[test]
    fn learn_is_put_if_absent() {
        let index = IndicatorIndex::seeded();
        let first = IndicatorRecord::new(Provider::Oecd, "HUR", "Harmonised unemployment", "");
        let second = IndicatorRecord::new(Provider::Oecd, "OTHER", "Other", "");
        index.learn(Provider::Oecd, "harmonised unemployment", first.clone());
        index.learn(Provider::Oecd, "harmonised unemployment", second);
        assert_eq!(
            index.get_learned(Provider::Oecd, "Harmonised Unemployment"),
            Some(first)
        );
    }

    #[test]
    fn tokenize_stems_plurals_and_drops_stop_words() {
        let tokens = tokenize("the house prices index");
        assert!(tokens.contains(&"price".to_string()));
        assert!(tokens.contains(&"prices".to_string()));
        assert!(!tokens.contains(&"the".to_string()));
        assert!(!tokens.contains(&"index".to_string()));
    }
}
