//! Shared HTTP fetch helper for connectors that pull from JSON endpoints.

use serde_json::Value as JsonValue;
use url::Url;

use crate::connectors::trait_::ConnectorError;

/// Fetch a JSON document, mapping transport and decode failures onto the
/// connector error taxonomy.
pub(crate) async fn fetch_json(
    client: &reqwest::Client,
    url: &Url,
) -> Result<JsonValue, ConnectorError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|err| ConnectorError::NetworkError {
            details: err.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.ok();
        return Err(ConnectorError::HttpError {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<JsonValue>()
        .await
        .map_err(|err| ConnectorError::MalformedResponse {
            details: err.to_string(),
        })
}
