use reqwest::Client;
use tracing::debug;

use crate::config::HttpSettings;
use crate::searcher::SearchError;

pub(crate) const MAX_RESPONSE_BYTES: usize = 10_000_000;

/// Client used by the CLI. Hosts may pass their own, but it must follow
/// redirects: the public UI redirects before serving results.
pub fn build_client(settings: &HttpSettings) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(settings.connect_timeout())
        .timeout(settings.timeout())
        .redirect(reqwest::redirect::Policy::limited(settings.max_redirects))
        .user_agent(crate::USER_AGENT)
        .build()
}

/// GET `url` and return the final URL (after redirects) and the body.
pub(crate) async fn download(client: &Client, url: &str) -> Result<(String, String), SearchError> {
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(SearchError::Status(status.as_u16()));
    }

    let final_url = response.url().to_string();

    if let Some(len) = response.content_length()
        && len as usize > MAX_RESPONSE_BYTES
    {
        return Err(SearchError::TooLarge);
    }

    let mut body = Vec::new();
    let mut stream = response;
    while let Some(chunk) = stream.chunk().await? {
        body.extend_from_slice(&chunk);
        if body.len() > MAX_RESPONSE_BYTES {
            return Err(SearchError::TooLarge);
        }
    }
    debug!(url = %final_url, bytes = body.len(), "response downloaded");
    Ok((final_url, String::from_utf8_lossy(&body).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> Client {
        build_client(&HttpSettings::default()).unwrap()
    }

    #[tokio::test]
    async fn download_success_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/select"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"response\":{}}"))
            .mount(&server)
            .await;

        let (final_url, body) = download(&client(), &format!("{}/select", server.uri()))
            .await
            .unwrap();

        assert!(final_url.ends_with("/select"));
        assert_eq!(body, "{\"response\":{}}");
    }

    #[tokio::test]
    async fn download_follows_redirects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("Location", format!("{}/new", server.uri())),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
            .mount(&server)
            .await;

        let (final_url, body) = download(&client(), &format!("{}/old", server.uri()))
            .await
            .unwrap();

        assert!(final_url.ends_with("/new"));
        assert_eq!(body, "moved");
    }

    #[tokio::test]
    async fn download_non_success_returns_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = download(&client(), &format!("{}/missing", server.uri())).await;
        assert!(matches!(result, Err(SearchError::Status(404))));
    }

    #[tokio::test]
    async fn download_too_large_body_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/huge"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(MAX_RESPONSE_BYTES + 1)))
            .mount(&server)
            .await;

        let result = download(&client(), &format!("{}/huge", server.uri())).await;
        assert!(matches!(result, Err(SearchError::TooLarge)));
    }
}
