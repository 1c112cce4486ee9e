use anyhow::Context;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

/// `types` and `methods` sections of a `JSONRPC.Introspect` result.
#[derive(Deserialize, Debug, Default)]
pub struct Introspect {
    #[serde(default)]
    pub types: Map<String, Value>,
    #[serde(default)]
    pub methods: Map<String, Value>,
}

#[derive(Deserialize, Debug)]
struct Envelope {
    result: Introspect,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum Document {
    Envelope(Envelope),
    Bare(Introspect),
}

impl Introspect {
    /// Parses an introspection payload. Anything before the first `{` is
    /// skipped; both the JSON-RPC response and its bare `result` are accepted.
    pub fn from_slice(payload: &[u8]) -> anyhow::Result<Introspect> {
        let start = payload
            .iter()
            .position(|b| *b == b'{')
            .context("Introspection payload contains no JSON object")?;
        if start > 0 {
            debug!(skipped = start, "skipping header bytes before the document");
        }

        let document: Value =
            serde_json::from_slice(&payload[start..]).context("Failed to parse introspection JSON")?;
        if document.get("result").is_none() && document.get("types").is_none() {
            anyhow::bail!("Introspection document has neither a result nor a types section");
        }

        let introspect = match serde_json::from_value::<Document>(document)
            .context("Failed to deserialise introspection document")?
        {
            Document::Envelope(envelope) => envelope.result,
            Document::Bare(bare) => bare,
        };
        info!(
            types = introspect.types.len(),
            methods = introspect.methods.len(),
            "loaded introspection document"
        );
        Ok(introspect)
    }

    pub async fn from_file(path: &str) -> anyhow::Result<Introspect> {
        let payload = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read introspection file {}", path))?;
        Introspect::from_slice(&payload)
    }
}

pub struct IntrospectApi {
    client: reqwest::Client,
}

impl IntrospectApi {
    pub fn new() -> Self {
        IntrospectApi {
            client: reqwest::Client::new(),
        }
    }

    /// Calls `JSONRPC.Introspect` on a live endpoint.
    pub async fn get_introspect(&self, endpoint: &str) -> anyhow::Result<Introspect> {
        let request = json!({
            "jsonrpc": "2.0",
            "method": "JSONRPC.Introspect",
            "params": { "getdescriptions": true, "getmetadata": true },
            "id": 1
        });

        let response = self
            .client
            .post(endpoint)
            .json(&request)
            .send()
            .await
            .context("Api call to JSONRPC.Introspect failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Introspection endpoint returned status {}", status);
        }

        let payload = response
            .bytes()
            .await
            .context("Failed to read introspection response")?;

        Introspect::from_slice(&payload)
    }
}

impl Default for IntrospectApi {
    fn default() -> Self {
        IntrospectApi::new()
    }
}

/// Reads from a file path or, for `http(s)://` sources, from a live endpoint.
pub async fn load(source: &str) -> anyhow::Result<Introspect> {
    if source.starts_with("http://") || source.starts_with("https://") {
        IntrospectApi::new().get_introspect(source).await
    } else {
        Introspect::from_file(source).await
    }
}
