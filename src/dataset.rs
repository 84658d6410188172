use crate::error::AppError;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
struct Row {
    text: String,
    label: i64,
}

/// Labeled training corpus, loaded once at startup in file order.
#[derive(Debug, Default)]
pub struct Dataset {
    pub texts: Vec<String>,
    pub labels: Vec<u8>,
}

impl Dataset {
    /// Reads a CSV file with `text` and `label` columns. Any malformed row is
    /// fatal: the process must not train on a partial corpus.
    pub fn load(path: &str) -> Result<Self, AppError> {
        let mut reader = csv::Reader::from_path(path)?;

        let mut texts = Vec::new();
        let mut labels = Vec::new();

        for record in reader.deserialize() {
            let row: Row = record?;
            let label = match row.label {
                0 => 0u8,
                1 => 1u8,
                other => {
                    return Err(AppError::Dataset(format!(
                        "label must be 0 or 1, got {} at row {}",
                        other,
                        texts.len() + 1
                    )))
                }
            };
            texts.push(row.text);
            labels.push(label);
        }

        if texts.is_empty() {
            return Err(AppError::Dataset(format!("no rows found in {}", path)));
        }

        let positives = labels.iter().filter(|&&l| l == 1).count();
        info!(
            "Loaded {} labeled messages from {} ({} phishing, {} safe)",
            texts.len(),
            path,
            positives,
            texts.len() - positives
        );

        Ok(Dataset { texts, labels })
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }
}
