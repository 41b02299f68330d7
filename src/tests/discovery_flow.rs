#[cfg(test)]
mod tests {

    use httpmock::Method::GET;
    use httpmock::MockServer;
    use serde_json::json;

    use crate::introspection::discovery::{endpoint_from_discovery, must, DiscoveryError};

    async fn discovery_server(body: serde_json::Value) -> MockServer {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/realms/demo/.well-known/openid-configuration");
                then.status(200).json_body(body);
            })
            .await;
        server
    }

    #[tokio::test]
    async fn issuer_with_or_without_slash_resolves_the_same_endpoint() {
        let server = discovery_server(json!({
            "issuer": "http://idp/realms/demo",
            "introspection_endpoint": "http://idp/realms/demo/protocol/openid-connect/token/introspect"
        }))
        .await;

        let without = endpoint_from_discovery(&server.url("/realms/demo")).await.unwrap();
        let with = endpoint_from_discovery(&server.url("/realms/demo/")).await.unwrap();

        assert_eq!(without, with);
        assert_eq!(
            without,
            "http://idp/realms/demo/protocol/openid-connect/token/introspect"
        );
    }

    #[tokio::test]
    async fn document_without_endpoint_is_an_error() {
        let server = discovery_server(json!({ "issuer": "http://idp/realms/demo" })).await;

        let err = endpoint_from_discovery(&server.url("/realms/demo"))
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::MissingEndpoint));
    }

    #[tokio::test]
    async fn non_json_document_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/.well-known/openid-configuration");
                then.status(200).body("Not Json");
            })
            .await;

        let err = endpoint_from_discovery(&server.base_url()).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Decode(_)));
    }

    #[tokio::test]
    async fn error_status_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/.well-known/openid-configuration");
                then.status(404);
            })
            .await;

        let err = endpoint_from_discovery(&server.base_url()).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Status(status) if status.as_u16() == 404));
    }

    #[tokio::test]
    async fn unreachable_issuer_is_an_error() {
        let err = endpoint_from_discovery("http://127.0.0.1:1").await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Transport(_)));
    }

    #[tokio::test]
    #[should_panic(expected = "discovery request failed")]
    async fn must_panics_on_failed_discovery() {
        must(endpoint_from_discovery("http://127.0.0.1:1").await);
    }
}
