//! Sample external system: the CRUD façade the connector targets, backed by
//! an in-memory store. Useful for demos and end-to-end experiments without a
//! real downstream system.

pub mod routes;
pub mod store;

use std::net::SocketAddr;
use std::sync::Arc;
use store::Store;

pub async fn serve(addr: SocketAddr, store: Arc<Store>) -> std::io::Result<()> {
    let app = routes::router(store);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "external system listening");
    axum::serve(listener, app).await
}
