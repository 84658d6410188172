use crate::{
    config::Config,
    dataset::Dataset,
    error::AppError,
    model::LogisticRegression,
    types::Analysis,
    vectorizer::{TfidfVectorizer, MAX_FEATURES},
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

static URL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://\S+|www\.\S+").expect("Invalid URL regex"));

/// Trained scoring engine. Built once at startup, then shared read-only
/// behind an `Arc` for the process lifetime.
pub struct MessageAnalyzer {
    vectorizer: TfidfVectorizer,
    model: LogisticRegression,
    http_client: reqwest::Client,
}

/// Result of probing one extracted URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Status(u16),
    Failed(FetchFailure),
}

/// Classified fetch failure. All kinds collapse to the same single heuristic
/// point as a final policy step; the distinction is kept for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailure {
    InvalidUrl,
    Timeout,
    Connect,
    Other,
}

impl MessageAnalyzer {
    /// Loads the dataset, fits vectorizer and classifier together, and
    /// persists both artifacts. Any failure here is fatal: the process must
    /// not serve with a missing or partial model.
    pub fn train(config: &Config) -> Result<Self, AppError> {
        let dataset = Dataset::load(&config.dataset_path)?;

        let mut vectorizer = TfidfVectorizer::new(MAX_FEATURES);
        vectorizer.fit(&dataset.texts)?;

        let rows: Vec<_> = dataset.texts.iter().map(|t| vectorizer.transform(t)).collect();
        let model = LogisticRegression::fit(&rows, &dataset.labels, vectorizer.vocabulary_size())?;

        // Saved for reuse by other tooling; this process never reloads them.
        vectorizer.save_to_file(&config.vectorizer_path)?;
        model.save_to_file(&config.model_path)?;
        info!(
            "Training complete: {} messages, {} features; artifacts saved to {} and {}",
            dataset.len(),
            vectorizer.vocabulary_size(),
            config.vectorizer_path,
            config.model_path
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()?;

        Ok(Self::from_parts(vectorizer, model, http_client))
    }

    fn from_parts(
        vectorizer: TfidfVectorizer,
        model: LogisticRegression,
        http_client: reqwest::Client,
    ) -> Self {
        MessageAnalyzer {
            vectorizer,
            model,
            http_client,
        }
    }

    /// Scores one message: model signal first, then each extracted URL
    /// independently. Reasons accumulate in evaluation order.
    pub async fn analyze(&self, message: &str) -> Analysis {
        let mut score = 0;
        let mut reasons = Vec::new();

        let row = self.vectorizer.transform(message);
        let probability = self.model.predict_proba(&row);

        let (points, reason) = model_signal(probability);
        score += points;
        if let Some(reason) = reason {
            reasons.push(reason);
        }

        for url_match in URL_REGEX.find_iter(message) {
            let token = url_match.as_str();
            let parsed = Url::parse(token).ok();

            let (points, mut url_reasons) = host_heuristics(parsed.as_ref());
            score += points;
            reasons.append(&mut url_reasons);

            // Outbound probe of an attacker-supplied URL: an SSRF surface by
            // construction. Bounded by the client timeout, checked sequentially.
            let outcome = self.fetch(token, parsed).await;
            if let Some(reason) = fetch_penalty(&outcome) {
                score += 1;
                reasons.push(reason);
            }
        }

        Analysis {
            score,
            reasons,
            probability,
        }
    }

    async fn fetch(&self, token: &str, parsed: Option<Url>) -> FetchOutcome {
        let url = match parsed {
            Some(url) if url.scheme() == "http" || url.scheme() == "https" => url,
            _ => return FetchOutcome::Failed(FetchFailure::InvalidUrl),
        };

        match self.http_client.get(url).send().await {
            Ok(response) => FetchOutcome::Status(response.status().as_u16()),
            Err(e) => {
                let kind = if e.is_timeout() {
                    FetchFailure::Timeout
                } else if e.is_connect() {
                    FetchFailure::Connect
                } else {
                    FetchFailure::Other
                };
                debug!("Fetch failed for {}: {:?} ({})", token, kind, e);
                FetchOutcome::Failed(kind)
            }
        }
    }
}

/// Converts the classifier probability into score points. Thresholds are
/// non-overlapping and evaluated high to low; at most one fires.
fn model_signal(probability: f64) -> (i32, Option<String>) {
    let pct = probability * 100.0;
    if probability > 0.80 {
        (3, Some(format!("Model high risk: {:.2}% phishing likelihood", pct)))
    } else if probability > 0.60 {
        (2, Some(format!("Model moderate risk: {:.2}% phishing likelihood", pct)))
    } else if probability > 0.40 {
        (1, Some(format!("Model slight suspicion: {:.2}% phishing likelihood", pct)))
    } else {
        (0, None)
    }
}

/// Static per-URL checks. A token that does not parse as an absolute URL
/// (e.g. a bare `www.` form) skips these; its fetch still counts as
/// unreachable downstream.
fn host_heuristics(parsed: Option<&Url>) -> (i32, Vec<String>) {
    let mut score = 0;
    let mut reasons = Vec::new();

    let url = match parsed {
        Some(url) => url,
        None => return (score, reasons),
    };

    if url.scheme() == "http" {
        score += 1;
        reasons.push("Insecure HTTP link".to_string());
    }

    if let Some(host) = url.host_str() {
        let host = host.to_lowercase();

        if host.split('.').count() > 3 {
            score += 1;
            reasons.push("Too many subdomains".to_string());
        }

        let without_dots: String = host.chars().filter(|c| *c != '.').collect();
        if !without_dots.is_empty() && without_dots.chars().all(|c| c.is_ascii_digit()) {
            score += 1;
            reasons.push("IP address used instead of domain".to_string());
        }
    }

    (score, reasons)
}

/// Policy step: a 200 is clean, any other status or any failure costs exactly
/// one point. Never both for the same URL.
fn fetch_penalty(outcome: &FetchOutcome) -> Option<String> {
    match outcome {
        FetchOutcome::Status(200) => None,
        FetchOutcome::Status(_) => Some("Website returned abnormal status".to_string()),
        FetchOutcome::Failed(_) => Some("Website not reachable".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Verdict;

    fn fitted_vectorizer() -> TfidfVectorizer {
        let corpus = vec![
            "urgent verify your account".to_string(),
            "your account has been suspended click".to_string(),
            "lunch at noon tomorrow".to_string(),
            "see you at the meeting".to_string(),
        ];
        let mut vectorizer = TfidfVectorizer::new(MAX_FEATURES);
        vectorizer.fit(&corpus).unwrap();
        vectorizer
    }

    /// Analyzer with hand-set weights so the model signal is controllable:
    /// "urgent" pushes the probability high, everything else stays low.
    fn test_analyzer() -> MessageAnalyzer {
        let vectorizer = fitted_vectorizer();
        let mut weights = vec![0.0; vectorizer.vocabulary_size()];
        let urgent_idx = vectorizer.vocabulary["urgent"];
        weights[urgent_idx] = 12.0;

        let model = LogisticRegression {
            weights,
            bias: -3.0,
            iterations_run: 0,
            training_samples: 4,
        };

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .build()
            .unwrap();

        MessageAnalyzer::from_parts(vectorizer, model, http_client)
    }

    #[test]
    fn test_model_signal_thresholds() {
        assert_eq!(model_signal(0.85).0, 3);
        assert_eq!(model_signal(0.80).0, 2);
        assert_eq!(model_signal(0.70).0, 2);
        assert_eq!(model_signal(0.60).0, 1);
        assert_eq!(model_signal(0.50).0, 1);
        assert_eq!(model_signal(0.40).0, 0);
        assert_eq!(model_signal(0.10).0, 0);

        let (_, reason) = model_signal(0.85);
        assert!(reason.unwrap().contains("85.00%"));
        assert!(model_signal(0.10).1.is_none());
    }

    #[test]
    fn test_url_extraction_matches_http_and_www_forms() {
        let message = "go to https://a.example.com or www.b.example.com now";
        let found: Vec<&str> = URL_REGEX.find_iter(message).map(|m| m.as_str()).collect();
        assert_eq!(found, vec!["https://a.example.com", "www.b.example.com"]);
    }

    #[test]
    fn test_host_heuristics_numeric_insecure_host() {
        let url = Url::parse("http://192.168.1.1/login").unwrap();
        let (score, reasons) = host_heuristics(Some(&url));
        // insecure scheme, four dotted labels, numeric host
        assert_eq!(score, 3);
        assert!(reasons.iter().any(|r| r.contains("Insecure")));
        assert!(reasons.iter().any(|r| r.contains("IP address")));
    }

    #[test]
    fn test_host_heuristics_deep_subdomains() {
        let url = Url::parse("https://login.secure.bank.example.com/x").unwrap();
        let (score, reasons) = host_heuristics(Some(&url));
        assert_eq!(score, 1);
        assert_eq!(reasons, vec!["Too many subdomains".to_string()]);
    }

    #[test]
    fn test_host_heuristics_clean_url() {
        let url = Url::parse("https://example.com/page").unwrap();
        let (score, reasons) = host_heuristics(Some(&url));
        assert_eq!(score, 0);
        assert!(reasons.is_empty());
    }

    #[test]
    fn test_host_heuristics_skip_unparseable_token() {
        // bare www. tokens have no scheme and do not parse as absolute URLs
        assert!(Url::parse("www.example.com").is_err());
        let (score, reasons) = host_heuristics(None);
        assert_eq!(score, 0);
        assert!(reasons.is_empty());
    }

    #[test]
    fn test_fetch_penalty_policy() {
        assert!(fetch_penalty(&FetchOutcome::Status(200)).is_none());
        assert_eq!(
            fetch_penalty(&FetchOutcome::Status(404)).unwrap(),
            "Website returned abnormal status"
        );
        for failure in [
            FetchFailure::InvalidUrl,
            FetchFailure::Timeout,
            FetchFailure::Connect,
            FetchFailure::Other,
        ] {
            assert_eq!(
                fetch_penalty(&FetchOutcome::Failed(failure)).unwrap(),
                "Website not reachable"
            );
        }
    }

    #[tokio::test]
    async fn test_analyze_plain_message_is_clean() {
        let analyzer = test_analyzer();
        let analysis = analyzer.analyze("see you at the meeting tomorrow").await;
        assert_eq!(analysis.score, 0);
        assert!(analysis.reasons.is_empty());
        assert!(analysis.probability <= 0.40);
        assert_eq!(Verdict::from_score(analysis.score), Verdict::Safe);
    }

    #[tokio::test]
    async fn test_analyze_empty_message() {
        let analyzer = test_analyzer();
        let analysis = analyzer.analyze("").await;
        assert_eq!(analysis.score, 0);
        assert!(analysis.reasons.is_empty());
    }

    #[tokio::test]
    async fn test_analyze_high_probability_without_urls() {
        let analyzer = test_analyzer();
        let analysis = analyzer.analyze("urgent").await;
        assert!(analysis.probability > 0.80);
        assert_eq!(analysis.score, 3);
        assert_eq!(analysis.reasons.len(), 1);
        assert_eq!(Verdict::from_score(analysis.score), Verdict::MediumRisk);
    }

    #[tokio::test]
    async fn test_analyze_reachable_url_adds_no_fetch_penalty() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", "/").with_status(200).create_async().await;

        let analyzer = test_analyzer();
        let message = format!("please review {}/", server.url());
        let analysis = analyzer.analyze(&message).await;
        mock.assert_async().await;

        // mock server host is 127.0.0.1: insecure http, four labels, numeric
        assert_eq!(analysis.score, 3);
        assert!(!analysis
            .reasons
            .iter()
            .any(|r| r.contains("abnormal") || r.contains("reachable")));
    }

    #[tokio::test]
    async fn test_analyze_abnormal_status_adds_one_point() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", "/").with_status(404).create_async().await;

        let analyzer = test_analyzer();
        let message = format!("please review {}/", server.url());
        let analysis = analyzer.analyze(&message).await;
        mock.assert_async().await;

        assert_eq!(analysis.score, 4);
        assert!(analysis
            .reasons
            .iter()
            .any(|r| r.contains("abnormal status")));
    }

    #[tokio::test]
    async fn test_analyze_unreachable_www_token_scores_one() {
        let analyzer = test_analyzer();
        // no scheme: host checks are skipped and the fetch fails as invalid
        let analysis = analyzer.analyze("visit www.example.test today").await;
        assert_eq!(analysis.score, 1);
        assert_eq!(analysis.reasons, vec!["Website not reachable".to_string()]);
    }

    #[tokio::test]
    async fn test_analyze_urls_accumulate_independently() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .with_status(200)
            .expect(2)
            .create_async()
            .await;

        let analyzer = test_analyzer();
        let url = format!("{}/", server.url());
        let message = format!("first {} second {}", url, url);
        let analysis = analyzer.analyze(&message).await;
        mock.assert_async().await;

        // each URL contributes its three host points on its own
        assert_eq!(analysis.score, 6);
        assert_eq!(Verdict::from_score(analysis.score), Verdict::HighRisk);
    }
}
