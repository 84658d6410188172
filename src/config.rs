use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub dataset_path: String,
    pub vectorizer_path: String,
    pub model_path: String,
    pub fetch_timeout_secs: u64,
}

impl Config {
    pub fn load() -> Self {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .unwrap_or(5000);

        let dataset_path = env::var("DATASET_PATH").unwrap_or_else(|_| "dataset.csv".to_string());
        let vectorizer_path =
            env::var("VECTORIZER_PATH").unwrap_or_else(|_| "vectorizer.json".to_string());
        let model_path = env::var("MODEL_PATH").unwrap_or_else(|_| "model.json".to_string());

        let fetch_timeout_secs = env::var("FETCH_TIMEOUT_SECS")
            .unwrap_or_else(|_| "3".to_string())
            .parse()
            .unwrap_or(3);

        Config {
            port,
            dataset_path,
            vectorizer_path,
            model_path,
            fetch_timeout_secs,
        }
    }
}
