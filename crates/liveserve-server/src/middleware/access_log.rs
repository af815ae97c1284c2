//! Access logging.
//!
//! A tower-http [`TraceLayer`] that opens one span per request (client,
//! method, path) and emits one INFO event when the response is ready
//! (status, elapsed time).

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, Response};
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::TraceLayer;
use tracing::Span;

/// Log target for access lines, so they can be filtered separately.
const ACCESS_LOG_TARGET: &str = "liveserve::access";

type MakeSpan = fn(&Request<Body>) -> Span;
type OnResponse = fn(&Response<Body>, Duration, &Span);

/// Layer logging every request on the `liveserve::access` target.
pub(crate) fn layer()
-> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, MakeSpan, (), OnResponse, (), (), ()> {
    TraceLayer::new_for_http()
        .make_span_with(make_span as MakeSpan)
        .on_request(())
        .on_response(on_response as OnResponse)
        .on_body_chunk(())
        .on_eos(())
        // 500s are already logged where the I/O error happens
        .on_failure(())
}

fn make_span(req: &Request<Body>) -> Span {
    tracing::info_span!(
        target: ACCESS_LOG_TARGET,
        "request",
        client = %client_addr(req),
        method = %req.method(),
        path = req.uri().path(),
    )
}

fn on_response(response: &Response<Body>, latency: Duration, span: &Span) {
    tracing::info!(
        target: ACCESS_LOG_TARGET,
        parent: span,
        status = response.status().as_u16(),
        elapsed_ms = latency.as_secs_f64() * 1000.0,
        "Request served"
    );
}

/// Peer address of the request, or `-` when the router runs without a socket.
fn client_addr<B>(req: &Request<B>) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "-".to_owned(), |ConnectInfo(addr)| addr.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_client_addr_without_connect_info() {
        let req = Request::builder().uri("/").body(()).unwrap();

        assert_eq!(client_addr(&req), "-");
    }

    #[test]
    fn test_client_addr_from_connect_info() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 51234);
        let mut req = Request::builder().uri("/").body(()).unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));

        assert_eq!(client_addr(&req), "127.0.0.1:51234");
    }
}
