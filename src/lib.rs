pub mod adapters;
pub mod app;
pub mod auth;
pub mod board;
pub mod config;
pub mod ports;
pub mod state;
pub mod sync;
pub mod types;
pub mod uploads;

use std::net::SocketAddr;

pub use app::app;

pub async fn serve(addr: SocketAddr, config: config::AppConfig) {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app(config)).await.expect("server error");
}
