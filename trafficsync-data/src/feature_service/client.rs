//! HTTP implementation of [`RemoteLayerClient`] for hosted feature services.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use trafficsync_core::{
    DeleteResult, EditOutcome, EditResults, FeatureSet, IdFilter, InsertResult, LayerEndpoint,
    RemoteError, RemoteLayerClient, RemoteObjectId,
};

use super::encode::{encode_adds, encode_deletes};
use super::token::TokenCache;
use super::wire::{ApplyEditsResponse, EditList, Envelope, QueryIdsResponse, TokenResponse};
use crate::http::{ClientBuildError, TransportFailure, build_client, parse_absolute};

/// Default user agent for feature-service requests.
pub const DEFAULT_USER_AGENT: &str = "trafficsync-feature-service/0.1";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Path of the OAuth2 token endpoint below the portal URL.
const TOKEN_PATH: &str = "sharing/rest/oauth2/token";

/// Service codes meaning the token was rejected.
const INVALID_TOKEN_CODES: [i64; 2] = [498, 499];

/// Connection settings for [`FeatureServiceClient`].
#[derive(Clone, PartialEq, Eq)]
pub struct FeatureServiceConfig {
    /// Portal that issues access tokens, e.g. `https://www.arcgis.com`.
    pub portal_url: String,
    /// Registered application id, sent as the OAuth2 `client_id`.
    pub app_id: String,
    /// Application credential, sent as the OAuth2 `client_secret`.
    pub client_id: String,
    /// Request timeout.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl FeatureServiceConfig {
    /// Create a configuration with default timeout and user agent.
    pub fn new(
        portal_url: impl Into<String>,
        app_id: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            portal_url: portal_url.into(),
            app_id: app_id.into(),
            client_id: client_id.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl fmt::Debug for FeatureServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureServiceConfig")
            .field("portal_url", &self.portal_url)
            .field("app_id", &self.app_id)
            .field("client_id", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Talks to a feature-service layer over its REST API.
///
/// Tokens are obtained through app login and reused until a minute before
/// they expire. A token the service rejects is dropped so the next call logs
/// in again.
///
/// # Example
///
/// ```no_run
/// use trafficsync_core::{IdFilter, LayerEndpoint, RemoteLayerClient};
/// use trafficsync_data::feature_service::{FeatureServiceClient, FeatureServiceConfig};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = FeatureServiceClient::new(FeatureServiceConfig::new(
///     "https://www.arcgis.com",
///     "app-id",
///     "app-secret",
/// ))?;
/// let layer = LayerEndpoint::new("https://services.example/arcgis/rest/services/Traffic/FeatureServer/0");
/// let ids = client.list_all_ids(&layer, &IdFilter::match_all()).await?;
/// println!("{} features stored", ids.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FeatureServiceClient {
    client: Client,
    config: FeatureServiceConfig,
    token_url: String,
    tokens: TokenCache,
}

impl FeatureServiceClient {
    /// Create a client for the given portal and credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the portal URL is not absolute or the HTTP client
    /// fails to build.
    pub fn new(config: FeatureServiceConfig) -> Result<Self, ClientBuildError> {
        let portal = parse_absolute("portal", &config.portal_url)?;
        let token_url = format!("{}/{TOKEN_PATH}", portal.as_str().trim_end_matches('/'));
        let client = build_client(&config.user_agent, config.timeout)?;
        Ok(Self {
            client,
            config,
            token_url,
            tokens: TokenCache::default(),
        })
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &FeatureServiceConfig {
        &self.config
    }

    /// URL tokens are requested from.
    #[must_use]
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    async fn token(&self) -> Result<String, RemoteError> {
        if let Some(token) = self.tokens.current(Instant::now()) {
            return Ok(token);
        }
        let authentication = |message: String| RemoteError::Authentication {
            portal: self.config.portal_url.clone(),
            message,
        };
        let requested_at = Instant::now();
        let form = [
            ("client_id", self.config.app_id.as_str()),
            ("client_secret", self.config.client_id.as_str()),
            ("grant_type", "client_credentials"),
            ("f", "json"),
        ];
        let body = self
            .client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| authentication(err.to_string()))?
            .text()
            .await
            .map_err(|err| authentication(err.to_string()))?;
        let issued = serde_json::from_str::<Envelope<TokenResponse>>(&body)
            .map_err(|err| authentication(format!("unreadable token response: {err}")))?
            .into_result()
            .map_err(|err| authentication(err.to_string()))?;
        debug!("obtained access token valid for {}s", issued.expires_in);
        self.tokens.store(
            issued.access_token.clone(),
            Duration::from_secs(issued.expires_in),
            requested_at,
        );
        Ok(issued.access_token)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        url: &str,
        request: RequestBuilder,
    ) -> Result<T, RemoteError> {
        let convert = |err: &reqwest::Error| {
            TransportFailure::classify(err).into_remote_error(url, self.config.timeout)
        };
        let body = request
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| convert(&err))?
            .text()
            .await
            .map_err(|err| convert(&err))?;
        let decoded = decode_body::<T>(url, &body);
        if let Err(RemoteError::Service { code, .. }) = &decoded
            && INVALID_TOKEN_CODES.contains(code)
        {
            self.tokens.clear();
        }
        decoded
    }

    async fn apply_edits(
        &self,
        layer: &LayerEndpoint,
        list: EditList,
        value: &str,
    ) -> Result<EditResults, RemoteError> {
        let token = self.token().await?;
        let url = layer.operation("applyEdits");
        let form = [
            ("f", "json"),
            ("token", token.as_str()),
            ("rollbackOnFailure", "false"),
            (list.form_field(), value),
        ];
        let request = self.client.post(&url).form(&form);
        let response = self.send::<ApplyEditsResponse>(&url, request).await?;
        edit_results(&url, response, list)
    }
}

/// Decode a response body, surfacing `{"error": ...}` envelopes as
/// [`RemoteError::Service`].
fn decode_body<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, RemoteError> {
    serde_json::from_str::<Envelope<T>>(body)
        .map_err(|err| RemoteError::Decode {
            url: url.to_owned(),
            message: err.to_string(),
        })?
        .into_result()
}

fn edit_results(
    url: &str,
    response: ApplyEditsResponse,
    list: EditList,
) -> Result<EditResults, RemoteError> {
    let results = response
        .results_for(list)
        .ok_or_else(|| RemoteError::Decode {
            url: url.to_owned(),
            message: format!("response has no {} member", list.result_field()),
        })?;
    Ok(EditResults::new(
        results.into_iter().map(EditOutcome::from).collect(),
    ))
}

#[async_trait(?Send)]
impl RemoteLayerClient for FeatureServiceClient {
    async fn list_all_ids(
        &self,
        layer: &LayerEndpoint,
        filter: &IdFilter,
    ) -> Result<Vec<RemoteObjectId>, RemoteError> {
        let token = self.token().await?;
        let url = layer.operation("query");
        let query = [
            ("where", filter.as_str()),
            ("returnIdsOnly", "true"),
            ("f", "json"),
            ("token", token.as_str()),
        ];
        let request = self.client.get(&url).query(&query);
        let response = self.send::<QueryIdsResponse>(&url, request).await?;
        debug!("layer {layer} keys features by {}", response.object_id_field_name);
        let ids = response.into_ids();
        info!("layer {layer} lists {} features", ids.len());
        Ok(ids)
    }

    async fn delete_objects(
        &self,
        layer: &LayerEndpoint,
        ids: &[RemoteObjectId],
    ) -> Result<DeleteResult, RemoteError> {
        if ids.is_empty() {
            return Ok(EditResults::default());
        }
        self.apply_edits(layer, EditList::Deletes, &encode_deletes(ids))
            .await
    }

    async fn insert_features(
        &self,
        layer: &LayerEndpoint,
        features: &FeatureSet,
    ) -> Result<InsertResult, RemoteError> {
        if features.is_empty() {
            return Ok(EditResults::default());
        }
        let adds = encode_adds(features)?;
        self.apply_edits(layer, EditList::Adds, &adds).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use trafficsync_core::test_support::block_on_for_tests;

    fn client() -> FeatureServiceClient {
        FeatureServiceClient::new(FeatureServiceConfig::new(
            "https://www.arcgis.com/",
            "app",
            "secret",
        ))
        .expect("client should build")
    }

    #[rstest]
    fn token_url_hangs_off_portal() {
        assert_eq!(
            client().token_url(),
            "https://www.arcgis.com/sharing/rest/oauth2/token"
        );
    }

    #[rstest]
    fn rejects_relative_portal() {
        let err = FeatureServiceClient::new(FeatureServiceConfig::new("www.arcgis.com", "a", "b"))
            .expect_err("relative portal");
        assert!(matches!(err, ClientBuildError::InvalidUrl { field: "portal", .. }));
    }

    #[rstest]
    fn debug_output_hides_credential() {
        let config = FeatureServiceConfig::new("https://www.arcgis.com", "app", "hunter2");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("app"));
    }

    #[rstest]
    fn empty_batches_skip_the_network() {
        let client = client();
        let layer = LayerEndpoint::new("https://services.invalid/FeatureServer/0");

        let deleted = block_on_for_tests(client.delete_objects(&layer, &[])).expect("no call");
        let inserted =
            block_on_for_tests(client.insert_features(&layer, &FeatureSet::default()))
                .expect("no call");

        assert!(deleted.outcomes.is_empty());
        assert!(inserted.outcomes.is_empty());
    }

    const QUERY_URL: &str = "https://services.invalid/FeatureServer/0/query";
    const EDITS_URL: &str = "https://services.invalid/FeatureServer/0/applyEdits";

    #[rstest]
    #[case(r#"{"success": false}"#)]
    #[case("{}")]
    #[case("<html>Bad Gateway</html>")]
    fn unrecognised_query_bodies_are_decode_errors(#[case] body: &str) {
        let err = decode_body::<QueryIdsResponse>(QUERY_URL, body).expect_err("not a query answer");

        assert!(
            matches!(&err, RemoteError::Decode { url, .. } if url == QUERY_URL),
            "unexpected {err:?}"
        );
    }

    #[rstest]
    fn query_answer_without_ids_is_empty() {
        let body = r#"{"objectIdFieldName": "OBJECTID", "objectIds": null}"#;

        let response = decode_body::<QueryIdsResponse>(QUERY_URL, body).expect("query answer");

        assert!(response.into_ids().is_empty());
    }

    #[rstest]
    #[case("{}", EditList::Deletes, "deleteResults")]
    #[case("{}", EditList::Adds, "addResults")]
    #[case(r#"{"deleteResults": []}"#, EditList::Adds, "addResults")]
    fn edit_answers_missing_the_submitted_list_are_decode_errors(
        #[case] body: &str,
        #[case] list: EditList,
        #[case] member: &str,
    ) {
        let response =
            decode_body::<ApplyEditsResponse>(EDITS_URL, body).expect("object decodes");

        let err = edit_results(EDITS_URL, response, list).expect_err("missing results");

        match err {
            RemoteError::Decode { url, message } => {
                assert_eq!(url, EDITS_URL);
                assert!(message.contains(member), "{message} should name {member}");
            }
            other => panic!("expected Decode, found {other:?}"),
        }
    }

    #[rstest]
    fn edit_answers_report_outcomes_for_the_submitted_list() {
        let body = r#"{"addResults": [{"objectId": 41, "success": true}], "deleteResults": []}"#;
        let response = decode_body::<ApplyEditsResponse>(EDITS_URL, body).expect("decodes");

        let results = edit_results(EDITS_URL, response, EditList::Adds).expect("results present");

        assert_eq!(
            results.outcomes,
            vec![EditOutcome::accepted(RemoteObjectId::from_raw(41))]
        );
    }

    #[rstest]
    fn config_builder_pattern() {
        let config = FeatureServiceConfig::new("https://portal", "app", "secret")
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("trafficsync-test");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "trafficsync-test");
    }
}
