//! In-process mock JSON-RPC server for tests.
//!
//! Every request, whatever its path or method, is answered by one handler, so
//! the same server also works as a plain-HTTP forward proxy: reqwest sends the
//! absolute-form request line to it and the fallback route answers.

use axum::Router;
use std::future::Future;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const SUCCESS_BODY: &str = r#"{"jsonrpc":"2.0","id":1,"result":"0x64"}"#;

pub struct MockRpc {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl MockRpc {
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// `host:port` form, as it appears in a proxy list.
    pub fn proxy(&self) -> String {
        self.addr.to_string()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Serves `respond(n)` for the n-th request (0-based).
pub async fn serve_with<F, Fut>(respond: F) -> MockRpc
where
    F: Fn(usize) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = String> + Send + 'static,
{
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new().fallback(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        let respond = respond.clone();
        async move { respond(n).await }
    });

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = axum::Server::from_tcp(listener)
        .unwrap()
        .serve(app.into_make_service());
    tokio::spawn(server);

    MockRpc { addr, hits }
}

pub async fn serve_body(body: &'static str) -> MockRpc {
    serve_with(move |_| async move { body.to_string() }).await
}

/// An address that accepts connections and drops them without answering.
///
/// The listener lives in a spawned task for the rest of the test, so no other
/// test can grab the port in the meantime.
pub async fn hangup_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            drop(stream);
        }
    });
    addr
}
