//! Product lookup against the Open Food Facts catalog.
//!
//! `GET {base}/api/v0/product/{code}.json` answers with a JSON body whose
//! top-level `product` object carries an optional `product_name`.

use crate::defaults;
use crate::error::{Result, ShopAssistError};
use async_trait::async_trait;

/// Resolves a decoded code to a display name.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn product_name(&self, code: &str) -> Result<String>;
}

/// Build the lookup URL for a code.
pub fn product_url(base_url: &str, code: &str) -> String {
    format!(
        "{}/api/v0/product/{}.json",
        base_url.trim_end_matches('/'),
        code
    )
}

/// JSON values that count as absent: `null`, `false`, `0` and `""`.
fn is_blank(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Bool(b) => !b,
        serde_json::Value::Number(n) => n.as_f64() == Some(0.0),
        serde_json::Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Turn a catalog HTTP response into a display name.
///
/// Non-2xx status and unparseable bodies are transport errors; a body whose
/// `product` is missing or blank means the code is unknown. The name is
/// shown exactly as sent; a missing or empty `product_name` is named
/// [`defaults::UNKNOWN_PRODUCT`].
pub fn interpret_response(code: &str, status: u16, body: &str) -> Result<String> {
    if !(200..300).contains(&status) {
        return Err(ShopAssistError::LookupTransport {
            message: format!("catalog returned HTTP status {status}"),
        });
    }

    let data: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ShopAssistError::LookupTransport {
            message: format!("failed to parse catalog response: {e}"),
        })?;

    let product = match data.get("product") {
        Some(p) if !is_blank(p) => p,
        _ => {
            return Err(ShopAssistError::LookupNotFound {
                code: code.to_string(),
            });
        }
    };

    let name = match product.get("product_name") {
        Some(serde_json::Value::String(name)) if !name.is_empty() => name.clone(),
        Some(n @ serde_json::Value::Number(_)) if !is_blank(n) => n.to_string(),
        _ => defaults::UNKNOWN_PRODUCT.to_string(),
    };

    Ok(name)
}

/// HTTP client for the Open Food Facts API.
#[cfg(feature = "catalog")]
pub struct OpenFoodFacts {
    base_url: String,
    client: reqwest::Client,
}

#[cfg(feature = "catalog")]
impl OpenFoodFacts {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("shopassist/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ShopAssistError::Other(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(feature = "catalog")]
#[async_trait]
impl ProductCatalog for OpenFoodFacts {
    async fn product_name(&self, code: &str) -> Result<String> {
        let url = product_url(&self.base_url, code);
        tracing::info!(%url, "looking up product");

        let response =
            self.client
                .get(&url)
                .send()
                .await
                .map_err(|e| ShopAssistError::LookupTransport {
                    message: format!("request to catalog failed: {e}"),
                })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ShopAssistError::LookupTransport {
                message: format!("failed to read catalog response: {e}"),
            })?;

        interpret_response(code, status, &body)
    }
}

/// Catalog that replays scripted answers and counts lookups.
#[derive(Debug, Default)]
pub struct MockCatalog {
    answers: std::sync::Mutex<std::collections::VecDeque<Result<String>>>,
    lookups: std::sync::Mutex<Vec<String>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(self, name: &str) -> Self {
        if let Ok(mut answers) = self.answers.lock() {
            answers.push_back(Ok(name.to_string()));
        }
        self
    }

    pub fn with_error(self, error: ShopAssistError) -> Self {
        if let Ok(mut answers) = self.answers.lock() {
            answers.push_back(Err(error));
        }
        self
    }

    /// Codes looked up so far, in order.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ProductCatalog for MockCatalog {
    async fn product_name(&self, code: &str) -> Result<String> {
        if let Ok(mut lookups) = self.lookups.lock() {
            lookups.push(code.to_string());
        }
        self.answers
            .lock()
            .ok()
            .and_then(|mut a| a.pop_front())
            .unwrap_or_else(|| {
                Err(ShopAssistError::LookupNotFound {
                    code: code.to_string(),
                })
            })
    }
}
