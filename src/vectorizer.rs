use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Vocabulary cap for the fitted vectorizer.
pub const MAX_FEATURES: usize = 5000;

/// Sparse feature row: (feature index, tf-idf weight), sorted by index.
pub type SparseRow = Vec<(usize, f64)>;

/// TF-IDF vectorizer over unigrams and bigrams.
///
/// Vocabulary is selected by document frequency (ties broken lexically so a
/// refit on the same corpus yields the same feature indices). IDF is smoothed
/// and output rows are L2-normalized. Immutable after fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    pub vocabulary: HashMap<String, usize>,
    pub idf: Vec<f64>,
    max_features: usize,
}

impl TfidfVectorizer {
    pub fn new(max_features: usize) -> Self {
        TfidfVectorizer {
            vocabulary: HashMap::new(),
            idf: Vec::new(),
            max_features,
        }
    }

    /// Builds the vocabulary and IDF table from the full training corpus.
    pub fn fit(&mut self, documents: &[String]) -> Result<(), AppError> {
        if documents.is_empty() {
            return Err(AppError::Training("cannot fit on an empty corpus".to_string()));
        }

        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        for doc in documents {
            let unique_terms: HashSet<String> = ngrams(doc).into_iter().collect();
            for term in unique_terms {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let mut terms: Vec<(String, usize)> = doc_freq.into_iter().collect();
        terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        terms.truncate(self.max_features);

        let n_docs = documents.len() as f64;
        self.vocabulary = HashMap::with_capacity(terms.len());
        self.idf = vec![0.0; terms.len()];
        for (idx, (term, df)) in terms.into_iter().enumerate() {
            self.idf[idx] = ((1.0 + n_docs) / (1.0 + df as f64)).ln() + 1.0;
            self.vocabulary.insert(term, idx);
        }

        debug!(
            "Fitted vectorizer: {} terms over {} documents",
            self.vocabulary.len(),
            documents.len()
        );
        Ok(())
    }

    /// Maps one message to a sparse, L2-normalized tf-idf row. Terms outside
    /// the fitted vocabulary are ignored.
    pub fn transform(&self, text: &str) -> SparseRow {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for term in ngrams(text) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut row: SparseRow = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx]))
            .collect();

        let norm: f64 = row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in row.iter_mut() {
                *v /= norm;
            }
        }

        row.sort_by_key(|&(idx, _)| idx);
        row
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn load_from_file(path: &str) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)?;
        let vectorizer: TfidfVectorizer = serde_json::from_str(&content)?;
        debug!(
            "Loaded vectorizer from {}: {} terms",
            path,
            vectorizer.vocabulary.len()
        );
        Ok(vectorizer)
    }

    pub fn save_to_file(&self, path: &str) -> Result<(), AppError> {
        let content = serde_json::to_string(self)?;
        std::fs::write(path, content)?;
        debug!("Saved vectorizer to {}: {} terms", path, self.vocabulary.len());
        Ok(())
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 2)
        .map(str::to_string)
        .collect()
}

/// Unigrams plus adjacent bigrams, in token order.
fn ngrams(text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    let mut terms = tokens.clone();
    for pair in tokens.windows(2) {
        terms.push(format!("{} {}", pair[0], pair[1]));
    }
    terms
}
