use async_trait::async_trait;
use tracing::{debug, instrument};

use super::credential::Credential;
use super::types::{PullRequestMetadata, PullRequestReference};
use super::AzureError;

/// Pull request API version sent with every metadata request.
pub const API_VERSION: &str = "7.1-preview.1";

/// A single authenticated GET returning parsed JSON.
///
/// Implementations must not retry: one failed attempt is reported as is.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get_json(&self, url: &str, credential: &Credential) -> Result<serde_json::Value, AzureError>;
}

/// `HttpClient` backed by reqwest.
#[derive(Debug, Clone, Default)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    #[instrument(skip(self, credential), fields(env_var = %credential.origin_variable_name))]
    async fn get_json(&self, url: &str, credential: &Credential) -> Result<serde_json::Value, AzureError> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", "pr-review-diff")
            .header("Accept", "application/json")
            .basic_auth("", Some(&credential.token))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), body_bytes = body.len(), "received API response");

        if !status.is_success() {
            return Err(AzureError::Api {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| AzureError::MalformedResponse(format!("non-JSON response ({e})")))
    }
}

/// Build the metadata endpoint for a resolved PR.
pub fn pull_request_endpoint(reference: &PullRequestReference) -> String {
    format!(
        "{}/{}/_apis/git/repositories/{}/pullrequests/{}?api-version={}",
        reference.api_base_url,
        reference.project,
        reference.repository,
        reference.pull_request_id,
        API_VERSION
    )
}

/// Fetch PR metadata (title, description, source/target refs).
///
/// Fails with MalformedResponse when either ref name is missing or blank, or
/// when the returned id is not the one that was asked for.
#[instrument(skip(client, credential), fields(pr = reference.pull_request_id, repo = %reference.repository))]
pub async fn fetch_pull_request(
    client: &dyn HttpClient,
    reference: &PullRequestReference,
    credential: &Credential,
) -> Result<PullRequestMetadata, AzureError> {
    let url = pull_request_endpoint(reference);
    debug!(%url, "fetching PR metadata from Azure DevOps");

    let json = client.get_json(&url, credential).await?;
    let metadata: PullRequestMetadata = serde_json::from_value(json)
        .map_err(|e| AzureError::MalformedResponse(e.to_string()))?;

    if metadata.pull_request_id != reference.pull_request_id {
        return Err(AzureError::MalformedResponse(format!(
            "response is for pull request {}, expected {}",
            metadata.pull_request_id, reference.pull_request_id
        )));
    }

    if metadata.source_ref_name.trim().is_empty() || metadata.target_ref_name.trim().is_empty() {
        return Err(AzureError::MalformedResponse(
            "response missing source/target ref names".to_string(),
        ));
    }

    debug!(
        source = %metadata.source_ref_name,
        target = %metadata.target_ref_name,
        "received PR metadata"
    );
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::parse_pr_url;
    use serde_json::json;
    use std::sync::Mutex;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Returns a canned response and records the requested URLs.
    struct FakeHttp {
        response: Mutex<Option<Result<serde_json::Value, AzureError>>>,
        urls: Mutex<Vec<String>>,
    }

    impl FakeHttp {
        fn returning(response: Result<serde_json::Value, AzureError>) -> Self {
            Self {
                response: Mutex::new(Some(response)),
                urls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpClient for FakeHttp {
        async fn get_json(&self, url: &str, _credential: &Credential) -> Result<serde_json::Value, AzureError> {
            self.urls.lock().unwrap().push(url.to_string());
            self.response.lock().unwrap().take().expect("single call expected")
        }
    }

    fn credential() -> Credential {
        Credential {
            token: "pat123".to_string(),
            origin_variable_name: "ADO_PAT".to_string(),
        }
    }

    #[test]
    fn test_endpoint_url() {
        let pr = parse_pr_url("https://dev.azure.com/org1/proj1/_git/repo1/pullrequest/42").unwrap();
        assert_eq!(
            pull_request_endpoint(&pr),
            "https://dev.azure.com/org1/proj1/_apis/git/repositories/repo1/pullrequests/42?api-version=7.1-preview.1"
        );
    }

    #[tokio::test]
    async fn test_fetch_pull_request_success() {
        let pr = parse_pr_url("https://dev.azure.com/org1/proj1/_git/repo1/pullrequest/42").unwrap();
        let http = FakeHttp::returning(Ok(json!({
            "pullRequestId": 42,
            "title": "Fix parser",
            "description": "Handles empty input",
            "sourceRefName": "refs/heads/fix-parser",
            "targetRefName": "refs/heads/master"
        })));

        let metadata = fetch_pull_request(&http, &pr, &credential()).await.unwrap();
        assert_eq!(metadata.pull_request_id, 42);
        assert_eq!(metadata.title.as_deref(), Some("Fix parser"));
        assert_eq!(metadata.source_ref_name, "refs/heads/fix-parser");
        assert_eq!(metadata.target_ref_name, "refs/heads/master");
        assert_eq!(http.urls.lock().unwrap().as_slice(), [pull_request_endpoint(&pr)]);
    }

    #[tokio::test]
    async fn test_fetch_pull_request_missing_refs() {
        let pr = parse_pr_url("https://dev.azure.com/o/p/_git/r/pullrequest/1").unwrap();
        let http = FakeHttp::returning(Ok(json!({
            "pullRequestId": 1,
            "sourceRefName": "refs/heads/a",
            "targetRefName": "  "
        })));
        let err = fetch_pull_request(&http, &pr, &credential()).await.unwrap_err();
        assert!(matches!(err, AzureError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_fetch_pull_request_id_mismatch() {
        let pr = parse_pr_url("https://dev.azure.com/o/p/_git/r/pullrequest/42").unwrap();
        let http = FakeHttp::returning(Ok(json!({
            "pullRequestId": 7,
            "sourceRefName": "refs/heads/a",
            "targetRefName": "refs/heads/b"
        })));
        let err = fetch_pull_request(&http, &pr, &credential()).await.unwrap_err();
        match err {
            AzureError::MalformedResponse(message) => assert!(message.contains("pull request 7, expected 42")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_pull_request_wrong_shape() {
        let pr = parse_pr_url("https://dev.azure.com/o/p/_git/r/pullrequest/1").unwrap();
        let http = FakeHttp::returning(Ok(json!(["not", "an", "object"])));
        let err = fetch_pull_request(&http, &pr, &credential()).await.unwrap_err();
        assert!(matches!(err, AzureError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_fetch_pull_request_propagates_api_error() {
        let pr = parse_pr_url("https://dev.azure.com/o/p/_git/r/pullrequest/1").unwrap();
        let http = FakeHttp::returning(Err(AzureError::Api {
            status: 404,
            body: "not found".to_string(),
        }));
        let err = fetch_pull_request(&http, &pr, &credential()).await.unwrap_err();
        assert!(matches!(err, AzureError::Api { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_reqwest_client_sends_basic_auth() {
        // Empty user name, PAT as password: base64(":pat123")
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/org/proj/_apis/git/repositories/repo/pullrequests/7"))
            .and(query_param("api-version", API_VERSION))
            .and(header("Authorization", "Basic OnBhdDEyMw=="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "pullRequestId": 7,
                "sourceRefName": "refs/heads/a",
                "targetRefName": "refs/heads/b"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!(
            "{}/org/proj/_apis/git/repositories/repo/pullrequests/7?api-version={API_VERSION}",
            server.uri()
        );
        let value = ReqwestClient::new().get_json(&url, &credential()).await.unwrap();
        assert_eq!(value["pullRequestId"], 7);
    }

    #[tokio::test]
    async fn test_reqwest_client_reports_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("TF400813: unauthorized"))
            .expect(1)
            .mount(&server)
            .await;

        let err = ReqwestClient::new()
            .get_json(&format!("{}/anything", server.uri()), &credential())
            .await
            .unwrap_err();
        match err {
            AzureError::Api { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "TF400813: unauthorized");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_reqwest_client_rejects_non_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>sign in</html>"))
            .mount(&server)
            .await;

        let err = ReqwestClient::new()
            .get_json(&server.uri(), &credential())
            .await
            .unwrap_err();
        assert!(matches!(err, AzureError::MalformedResponse(_)));
    }
}
