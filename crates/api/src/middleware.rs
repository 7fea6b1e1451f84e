use std::time::Instant;

use axum::{
    body::Body,
    extract::{MatchedPath, Request},
    http::{header, Method},
    middleware::Next,
    response::Response,
};
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, info, info_span, warn, Span};

/// 请求所属的接口类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Health,
    /// 读取派遣视图或警情资源
    View,
    /// 切换派遣状态
    Command,
    /// 远程服务的推送回调
    PushEvent,
    Unmatched,
}

impl RouteKind {
    pub fn classify(method: &Method, route: Option<&str>) -> Self {
        match route {
            None => RouteKind::Unmatched,
            Some("/health") => RouteKind::Health,
            Some("/api/events") => RouteKind::PushEvent,
            Some(_) if method == Method::POST => RouteKind::Command,
            Some(_) => RouteKind::View,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteKind::Health => "health",
            RouteKind::View => "view",
            RouteKind::Command => "command",
            RouteKind::PushEvent => "push_event",
            RouteKind::Unmatched => "unmatched",
        }
    }
}

fn matched_route(request: &Request) -> Option<String> {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
}

/// 按接口类别记录请求
///
/// 派遣命令和推送回调改变状态，记为info；客户端频繁轮询的视图读取记为debug。
pub async fn request_logging(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let route = matched_route(&request);
    let kind = RouteKind::classify(&method, route.as_deref());
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let elapsed_ms = start.elapsed().as_millis() as u64;
    let route = route.as_deref().unwrap_or("-");

    if response.status().is_server_error() {
        warn!(kind = kind.as_str(), route, status, elapsed_ms, "请求处理失败: {} {}", method, path);
        return response;
    }

    match kind {
        RouteKind::Command | RouteKind::PushEvent => {
            info!(kind = kind.as_str(), route, status, elapsed_ms, "完成请求处理: {} {}", method, path);
        }
        RouteKind::Health | RouteKind::View | RouteKind::Unmatched => {
            debug!(kind = kind.as_str(), route, status, elapsed_ms, "完成请求处理: {} {}", method, path);
        }
    }

    response
}

/// 操作台前端跨域访问，只开放接口实际使用的方法和请求头
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

fn make_request_span(request: &Request<Body>) -> Span {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(MatchedPath::as_str)
        .unwrap_or("-");
    info_span!("dispatch_http", method = %request.method(), route)
}

pub type DispatchTraceLayer =
    TraceLayer<SharedClassifier<ServerErrorsAsFailures>, fn(&Request<Body>) -> Span>;

/// 每个请求的追踪span以路由模板命名，不带资源ID
pub fn trace_layer() -> DispatchTraceLayer {
    TraceLayer::new_for_http().make_span_with(make_request_span as fn(&Request<Body>) -> Span)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_routes() {
        assert_eq!(
            RouteKind::classify(&Method::GET, Some("/health")),
            RouteKind::Health
        );
        assert_eq!(
            RouteKind::classify(&Method::GET, Some("/api/dispatch")),
            RouteKind::View
        );
        assert_eq!(
            RouteKind::classify(
                &Method::POST,
                Some("/api/dispatch/resources/{resource_id}/toggle")
            ),
            RouteKind::Command
        );
        assert_eq!(
            RouteKind::classify(
                &Method::POST,
                Some("/api/operations/{id}/resources/{resource_id}/toggle")
            ),
            RouteKind::Command
        );
        assert_eq!(
            RouteKind::classify(&Method::POST, Some("/api/events")),
            RouteKind::PushEvent
        );
        assert_eq!(
            RouteKind::classify(&Method::GET, None),
            RouteKind::Unmatched
        );
    }
}
