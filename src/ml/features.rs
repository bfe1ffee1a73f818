//! Feature extraction from URLs
//!
//! Produces the fixed-order lexical feature vector shared by training and
//! inference. The index order is part of the model contract: any change to it
//! invalidates every previously saved artifact.

use std::ops::Index;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use super::FeatureConfig;
use crate::error::{PipelineError, Result};

/// Feature names, in vector order
pub const FEATURE_NAMES: &[&str] = &[
    "url_length",
    "dot_count",
    "has_at",
    "has_hyphen",
    "has_ip",
    "is_https",
    "keyword_count",
    "digit_count",
    "special_char_count",
    "subdomain_depth",
    "has_keyword",
];

/// Number of features extracted
pub const NUM_FEATURES: usize = 11;

/// Keywords commonly used as bait in phishing URLs
pub const DEFAULT_KEYWORDS: &[&str] = &["login", "verify", "secure", "account", "bank", "update"];

static IPV4_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[0-9]{1,3}\.){3}[0-9]{1,3}").expect("IPv4 pattern compiles")
});

/// Extracted feature vector for one URL
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: [f64; NUM_FEATURES],
}

impl FeatureVector {
    pub fn new(values: [f64; NUM_FEATURES]) -> Self {
        Self { values }
    }

    /// Get feature by name
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|&n| n == name)
            .map(|idx| self.values[idx])
    }

    /// Get all features as a slice
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn into_array(self) -> [f64; NUM_FEATURES] {
        self.values
    }

    /// Number of features
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// (name, value) pairs in vector order
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.values.iter().copied())
    }
}

impl Index<usize> for FeatureVector {
    type Output = f64;

    fn index(&self, idx: usize) -> &f64 {
        &self.values[idx]
    }
}

/// Structural pieces of a URL. If full parsing fails only the scheme is
/// recovered and the host stays empty.
#[derive(Debug, Default)]
struct UrlParts {
    scheme: String,
    /// Normalized host (punycode for international names)
    host: String,
    /// Authority as written in the input, lower-cased
    authority: String,
}

impl UrlParts {
    fn parse(url: &str) -> Self {
        let raw = split_scheme(url);
        let authority = raw
            .map(|(_, rest)| {
                let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
                rest[..end].to_lowercase()
            })
            .unwrap_or_default();

        match Url::parse(url) {
            Ok(parsed) => Self {
                scheme: parsed.scheme().to_string(),
                host: parsed.host_str().unwrap_or_default().to_lowercase(),
                authority,
            },
            Err(_) => Self {
                scheme: raw
                    .map(|(scheme, _)| scheme.to_ascii_lowercase())
                    .unwrap_or_default(),
                host: String::new(),
                authority,
            },
        }
    }

    fn subdomain_depth(&self) -> usize {
        if self.host.is_empty() {
            return 0;
        }
        self.host.split('.').count().saturating_sub(2)
    }
}

/// Split `scheme://rest` when the prefix is a syntactically valid scheme
fn split_scheme(url: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = url.split_once("://")?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some((scheme, rest))
}

/// URL feature extractor
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    /// Lower-cased, de-duplicated, in configured order
    keywords: Vec<String>,
    long_url_threshold: usize,
    dot_threshold: usize,
    max_url_length: usize,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(&FeatureConfig::default())
    }
}

impl FeatureExtractor {
    /// Create an extractor from configuration
    pub fn new(config: &FeatureConfig) -> Self {
        let mut keywords: Vec<String> = Vec::with_capacity(config.keywords.len());
        for keyword in &config.keywords {
            let keyword = keyword.trim().to_lowercase();
            if !keyword.is_empty() && !keywords.contains(&keyword) {
                keywords.push(keyword);
            }
        }

        Self {
            keywords,
            long_url_threshold: config.long_url_threshold,
            dot_threshold: config.dot_threshold,
            max_url_length: config.max_url_length,
        }
    }

    /// Create an extractor with a custom keyword set and default thresholds
    pub fn with_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let config = FeatureConfig {
            keywords: keywords.into_iter().map(Into::into).collect(),
            ..FeatureConfig::default()
        };
        Self::new(&config)
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Keywords present in the URL (case-insensitive), in keyword-set order
    pub fn matched_keywords(&self, url: &str) -> Vec<&str> {
        let lower = url.to_lowercase();
        self.keywords
            .iter()
            .filter(|k| lower.contains(k.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Extract the feature vector. Never fails; malformed URLs degrade to an
    /// empty scheme and host.
    pub fn extract(&self, url: &str) -> FeatureVector {
        let parts = UrlParts::parse(url);
        let matched = self.matched_keywords(url).len();

        let mut digits = 0usize;
        let mut special = 0usize;
        for c in url.chars() {
            if c.is_ascii_digit() {
                digits += 1;
            }
            if !c.is_ascii_alphanumeric() {
                special += 1;
            }
        }

        FeatureVector::new([
            url.chars().count() as f64,
            url.matches('.').count() as f64,
            flag(url.contains('@')),
            flag(url.contains('-')),
            flag(IPV4_RE.is_match(url)),
            flag(parts.scheme == "https"),
            matched as f64,
            digits as f64,
            special as f64,
            parts.subdomain_depth() as f64,
            flag(matched > 0),
        ])
    }

    /// Strict extraction used when building training data.
    ///
    /// Rejects input that cannot be a real request URL so it never reaches
    /// the model as a training row.
    pub fn try_extract(&self, url: &str) -> Result<FeatureVector> {
        let len = url.chars().count();
        if len > self.max_url_length {
            return Err(PipelineError::FeatureExtraction(format!(
                "url length {} exceeds limit {}",
                len, self.max_url_length
            )));
        }
        if url.chars().any(|c| c.is_ascii_control()) {
            return Err(PipelineError::FeatureExtraction(
                "url contains control characters".to_string(),
            ));
        }
        Ok(self.extract(url))
    }

    /// Human-readable risk factors, in fixed check order
    pub fn explain(&self, url: &str) -> Vec<String> {
        let parts = UrlParts::parse(url);
        let mut factors = Vec::new();

        if url.chars().count() > self.long_url_threshold {
            factors.push("URL is unusually long".to_string());
        }
        if url.matches('.').count() > self.dot_threshold {
            factors.push("Multiple subdomains detected".to_string());
        }
        if url.contains('@') {
            factors.push("URL contains '@' symbol".to_string());
        }
        if parts.authority.contains('-') {
            factors.push("Hyphenated domain name".to_string());
        }
        if IPV4_RE.is_match(url) {
            factors.push("IP address used instead of domain name".to_string());
        }
        if parts.scheme != "https" {
            factors.push("Website does not use HTTPS".to_string());
        }
        for keyword in self.matched_keywords(url) {
            factors.push(format!("Suspicious keyword detected: '{}'", keyword));
        }

        factors
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_names_match_count() {
        assert_eq!(FEATURE_NAMES.len(), NUM_FEATURES);
    }

    #[test]
    fn test_vector_length_always_fixed() {
        let extractor = FeatureExtractor::default();
        for url in ["", "not a url", "https://example.com", "://", "\u{1F600}"] {
            assert_eq!(extractor.extract(url).len(), NUM_FEATURES);
        }
    }

    #[test]
    fn test_extraction_deterministic() {
        let extractor = FeatureExtractor::default();
        let url = "http://paypal-secure.account-verify.example.net/login?id=42";
        assert_eq!(extractor.extract(url), extractor.extract(url));
    }

    #[test]
    fn test_https_example() {
        let fv = FeatureExtractor::default().extract("https://example.com");
        assert_eq!(fv[5], 1.0);
        assert_eq!(fv[2], 0.0);
        assert_eq!(fv[9], 0.0);
        assert_eq!(fv[0], 19.0);
        assert_eq!(fv[1], 1.0);
        assert_eq!(fv[10], 0.0);
    }

    #[test]
    fn test_ip_with_keyword() {
        let fv = FeatureExtractor::default().extract("http://192.168.0.1/login");
        assert_eq!(fv[4], 1.0);
        assert_eq!(fv[10], 1.0);
        assert!(fv[6] >= 1.0);
        assert_eq!(fv[5], 0.0);
        assert_eq!(fv[7], 8.0);
    }

    #[test]
    fn test_keyword_count_is_cardinality() {
        let fv = FeatureExtractor::default().extract("http://secure-login.bank-update.com/verify");
        assert_eq!(fv[3], 1.0);
        // login, verify, secure, bank, update
        assert_eq!(fv[6], 5.0);
        assert_eq!(fv[9], 1.0);

        let repeated = FeatureExtractor::default().extract("http://login.example.com/login/login");
        assert_eq!(repeated[6], 1.0);
    }

    #[test]
    fn test_keywords_case_insensitive() {
        let fv = FeatureExtractor::default().extract("HTTP://EXAMPLE.COM/LOGIN");
        assert_eq!(fv[6], 1.0);
        assert_eq!(fv.get("has_keyword"), Some(1.0));
    }

    #[test]
    fn test_malformed_url_degrades() {
        let fv = FeatureExtractor::default().extract("www.secure.example.com/a-b");
        assert_eq!(fv.get("subdomain_depth"), Some(0.0));
        assert_eq!(fv.get("is_https"), Some(0.0));
        assert_eq!(fv.get("has_hyphen"), Some(1.0));
    }

    #[test]
    fn test_scheme_kept_when_host_unparseable() {
        let extractor = FeatureExtractor::default();
        for url in ["https://example.com:99999/", "HTTPS://exa mple.com/"] {
            let fv = extractor.extract(url);
            assert_eq!(fv.get("is_https"), Some(1.0), "{}", url);
            assert_eq!(fv.get("subdomain_depth"), Some(0.0), "{}", url);
            assert!(!extractor
                .explain(url)
                .contains(&"Website does not use HTTPS".to_string()));
        }
        assert_eq!(split_scheme("1http://example.com"), None);
        assert_eq!(split_scheme("not a url"), None);
    }

    #[test]
    fn test_hyphen_factor_uses_written_host() {
        let extractor = FeatureExtractor::default();
        // Host is punycode-encoded as xn--bcher-kva.de once parsed
        assert!(extractor.explain("https://bücher.de/").is_empty());
        assert!(extractor.explain("https://example.com/a-b").is_empty());
        assert_eq!(
            extractor.explain("https://my-shop.example.com:8443/"),
            vec!["Hyphenated domain name".to_string()]
        );
    }

    #[test]
    fn test_special_and_digit_counts() {
        let fv = FeatureExtractor::default().extract("a1-b2_c3");
        assert_eq!(fv.get("digit_count"), Some(3.0));
        assert_eq!(fv.get("special_char_count"), Some(2.0));
    }

    #[test]
    fn test_custom_keywords() {
        let extractor = FeatureExtractor::with_keywords(["Wallet", "wallet", "", "seed"]);
        assert_eq!(extractor.keywords(), &["wallet".to_string(), "seed".to_string()]);

        let fv = extractor.extract("https://example.com/wallet/login");
        assert_eq!(fv.get("keyword_count"), Some(1.0));
    }

    #[test]
    fn test_explain_order() {
        let extractor = FeatureExtractor::default();
        let factors = extractor.explain("http://user@secure-login.a.b.c.example.com/verify");
        assert_eq!(
            factors,
            vec![
                "Multiple subdomains detected".to_string(),
                "URL contains '@' symbol".to_string(),
                "Hyphenated domain name".to_string(),
                "Website does not use HTTPS".to_string(),
                "Suspicious keyword detected: 'login'".to_string(),
                "Suspicious keyword detected: 'verify'".to_string(),
                "Suspicious keyword detected: 'secure'".to_string(),
            ]
        );
    }

    #[test]
    fn test_explain_clean_url() {
        let extractor = FeatureExtractor::default();
        assert!(extractor.explain("https://example.com").is_empty());
    }

    #[test]
    fn test_try_extract_rejects_bad_rows() {
        let extractor = FeatureExtractor::default();
        assert!(extractor.try_extract("https://example.com").is_ok());
        assert!(matches!(
            extractor.try_extract("https://exa\nmple.com"),
            Err(PipelineError::FeatureExtraction(_))
        ));

        let long = format!("https://example.com/{}", "a".repeat(3000));
        assert!(extractor.try_extract(&long).is_err());
    }
}
