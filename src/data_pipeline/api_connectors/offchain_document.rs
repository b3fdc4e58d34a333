// src/data_pipeline/api_connectors/offchain_document.rs

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Les champs du document JSON de métadonnées qui nous intéressent.
/// Tout le reste (attributs, créateurs, liens...) est ignoré.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OffchainDocument {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("délai dépassé pour {0}")]
    Timeout(String),
    #[error("statut HTTP {status} pour {uri}")]
    Status { uri: String, status: u16 },
    #[error("requête échouée pour {uri}: {reason}")]
    Request { uri: String, reason: String },
    #[error("document illisible pour {uri}: {reason}")]
    Decode { uri: String, reason: String },
}

#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, uri: &str) -> Result<OffchainDocument, DocumentError>;
}

/// GET HTTP simple, avec un délai maximal par requête.
pub struct HttpDocumentFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpDocumentFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { client: reqwest::Client::new(), timeout }
    }
}

/// Les passerelles IPFS/Arweave renvoient parfois `ipfs://` : on réécrit en HTTPS.
pub fn normalize_uri(uri: &str) -> String {
    match uri.strip_prefix("ipfs://") {
        Some(path) => format!("https://ipfs.io/ipfs/{}", path.trim_start_matches("ipfs/")),
        None => uri.to_string(),
    }
}

#[async_trait]
impl DocumentFetcher for HttpDocumentFetcher {
    async fn fetch(&self, uri: &str) -> Result<OffchainDocument, DocumentError> {
        let url = normalize_uri(uri);
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DocumentError::Timeout(url.clone())
                } else {
                    DocumentError::Request { uri: url.clone(), reason: e.to_string() }
                }
            })?;

        if !response.status().is_success() {
            return Err(DocumentError::Status { uri: url, status: response.status().as_u16() });
        }

        let response_text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                DocumentError::Timeout(url.clone())
            } else {
                DocumentError::Request { uri: url.clone(), reason: e.to_string() }
            }
        })?;
        serde_json::from_str(&response_text).map_err(|e| DocumentError::Decode { uri: url, reason: e.to_string() })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_documents() {
        let doc: OffchainDocument =
            serde_json::from_str(r#"{"name":"Cat","image":"https://img/cat.png","attributes":[]}"#).unwrap();
        assert_eq!(doc.image.as_deref(), Some("https://img/cat.png"));
        assert_eq!(doc.description, None);
    }

    #[test]
    fn rewrites_ipfs_scheme() {
        assert_eq!(normalize_uri("ipfs://Qm123"), "https://ipfs.io/ipfs/Qm123");
        assert_eq!(normalize_uri("ipfs://ipfs/Qm123"), "https://ipfs.io/ipfs/Qm123");
        assert_eq!(normalize_uri("https://arweave.net/x"), "https://arweave.net/x");
    }
}
