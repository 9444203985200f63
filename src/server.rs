//! HTTP 服务运行
//! 收到关闭信号后在超时时间内排空进行中的请求

use axum::Router;
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;

/// 运行服务直到 `shutdown` 完成；之后最多再等待 `drain_timeout`
pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    shutdown: F,
    drain_timeout: Duration,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let shutdown_started = Arc::new(Notify::new());
    let server = axum::serve(listener, app)
        .with_graceful_shutdown({
            let shutdown_started = shutdown_started.clone();
            async move {
                shutdown.await;
                shutdown_started.notify_one();
            }
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => result,
        _ = shutdown_started.notified() => {
            match tokio::time::timeout(drain_timeout, &mut server).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        timeout_secs = drain_timeout.as_secs_f64(),
                        "Graceful shutdown timeout reached, forcing exit"
                    );
                    Ok(())
                }
            }
        }
    }
}
