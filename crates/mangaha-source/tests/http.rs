use std::time::Duration;

use mangaha_source::prelude::*;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> Client {
    Client::new(RetryPolicy::new(3, Duration::from_millis(1))).expect("client")
}

#[tokio::test]
async fn fetch_returns_body_and_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a.png"))
        .and(query_param("x", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"png".to_vec(), "image/png"))
        .expect(1)
        .mount(&server)
        .await;

    let (bytes, content_type) = client()
        .fetch_with_content_type(
            &format!("{}/a.png", server.uri()),
            &[("x", "1")],
            Duration::from_secs(5),
        )
        .await
        .expect("fetch ok");

    assert_eq!(&bytes[..], b"png");
    assert_eq!(content_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn fetch_retries_server_errors_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let bytes = client()
        .fetch(&format!("{}/flaky", server.uri()), &[], Duration::from_secs(5))
        .await
        .expect("retried to success");

    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn fetch_gives_up_after_retry_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&server)
        .await;

    let err = client()
        .fetch(&format!("{}/down", server.uri()), &[], Duration::from_secs(5))
        .await
        .expect_err("should fail");

    match err {
        FetchError::Network {
            status, attempts, ..
        } => {
            assert_eq!(status, 500);
            assert_eq!(attempts, 4);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn fetch_does_not_retry_client_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = client()
        .fetch(&format!("{}/missing", server.uri()), &[], Duration::from_secs(5))
        .await
        .expect_err("should fail");

    assert!(matches!(err, FetchError::Status { status: 404, .. }));
}

#[tokio::test]
async fn fetch_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let err = client()
        .fetch(&format!("{}/slow", server.uri()), &[], Duration::from_millis(100))
        .await
        .expect_err("should time out");

    assert!(err.is_timeout());
}

#[tokio::test]
async fn fetch_rejects_invalid_url() {
    let err = client()
        .fetch("not a url", &[], Duration::from_secs(1))
        .await
        .expect_err("should fail");

    assert!(matches!(err, FetchError::InvalidUrl { .. }));
}
