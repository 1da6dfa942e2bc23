//! Request handling for every path of every branch.
//!
//! One handler serves the whole URL space and dispatches on the method, since
//! `QUERY` is not a verb the router knows about.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Json, Response};
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use relay_index::{QueryError, QueryRequest};
use relay_repo::{Engine, EngineError, ReadOutcome, Selectors};
use relay_types::{ObjectId, RepoPath};

use crate::error::ApiError;
use crate::render;

pub const REPO_HEADER: &str = "x-relay-repo";
pub const BRANCH_HEADER: &str = "x-relay-branch";
pub const COMMIT_HEADER: &str = "x-relay-commit";
pub const VERSION_HEADER: &str = "x-relay-version";

pub const ALLOWED_METHODS: &str = "GET, HEAD, PUT, DELETE, QUERY, OPTIONS";

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

impl AppState {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

type Params = HashMap<String, String>;

/// Escaped in a query value; `/` stays readable in branch names.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

pub async fn root(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    Query(params): Query<Params>,
    body: Bytes,
) -> Response {
    handle(state, method, String::new(), headers, params, body).await
}

pub async fn nested(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    Path(mut path): Path<String>,
    headers: HeaderMap,
    Query(params): Query<Params>,
    body: Bytes,
) -> Response {
    if uri.path().ends_with('/') && !path.ends_with('/') {
        path.push('/');
    }
    handle(state, method, path, headers, params, body).await
}

async fn handle(
    state: AppState,
    method: Method,
    raw_path: String,
    headers: HeaderMap,
    params: Params,
    body: Bytes,
) -> Response {
    let selectors = selectors(&headers, &params);
    let engine = &state.engine;
    tracing::debug!(%method, path = %raw_path, ?selectors, "request");

    if method == Method::OPTIONS {
        return match engine.discover(&selectors) {
            Ok(discovery) => with_allow(Json(discovery).into_response()),
            Err(e) => ApiError(e).into_response(),
        };
    }
    if method.as_str() == "QUERY" {
        return query(engine, &selectors, &body).await;
    }

    let path = match RepoPath::parse(&raw_path) {
        Ok(path) => path,
        Err(e) => return ApiError(e.into()).into_response(),
    };
    match method {
        Method::GET | Method::HEAD => read(engine, &selectors, &path, &headers, &params, method == Method::HEAD),
        Method::PUT => write_response(engine.put(&selectors, &path, body.to_vec()).await),
        Method::DELETE => write_response(engine.delete(&selectors, &path).await),
        _ => with_allow(StatusCode::METHOD_NOT_ALLOWED.into_response()),
    }
}

fn selectors(headers: &HeaderMap, params: &Params) -> Selectors {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    Selectors::from_sources(
        header(REPO_HEADER),
        params.get("repo").map(String::as_str),
        header(BRANCH_HEADER),
        params.get("branch").map(String::as_str),
    )
}

fn read(
    engine: &Engine,
    selectors: &Selectors,
    path: &RepoPath,
    headers: &HeaderMap,
    params: &Params,
    head_only: bool,
) -> Response {
    let json = render::wants_json(headers);
    let suffix = link_suffix(params);
    let outcome = match engine.read(selectors, path) {
        Ok(outcome) => outcome,
        Err(e) if e.is_not_found() && !json => {
            let page = render::missing_target_page(&e.to_string());
            return (StatusCode::NOT_FOUND, Html(page)).into_response();
        }
        Err(e) => return ApiError(e).into_response(),
    };
    let commit = outcome.commit();

    let mut response = match outcome {
        ReadOutcome::File(file) => {
            let body = if head_only { Body::empty() } else { Body::from(file.bytes) };
            let mut response = Response::new(body);
            let headers = response.headers_mut();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(file.content_type));
            headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
            response
        }
        ReadOutcome::Directory(listing) if json => Json(listing).into_response(),
        ReadOutcome::Directory(listing) => Html(render::listing_page(&listing, &suffix)).into_response(),
        ReadOutcome::NotFound(page) if json => (StatusCode::NOT_FOUND, Json(page)).into_response(),
        ReadOutcome::NotFound(page) => {
            (StatusCode::NOT_FOUND, Html(render::not_found_page(&page, &suffix))).into_response()
        }
    };
    if let Some(commit) = commit {
        set_commit(&mut response, &commit);
    }
    if head_only {
        *response.body_mut() = Body::empty();
    }
    response
}

fn write_response(result: Result<relay_repo::WriteReceipt, EngineError>) -> Response {
    match result {
        Ok(receipt) => {
            let status = if receipt.created { StatusCode::CREATED } else { StatusCode::OK };
            let commit = receipt.commit;
            let mut response = (status, Json(receipt)).into_response();
            set_commit(&mut response, &commit);
            response
        }
        Err(e) => ApiError(e).into_response(),
    }
}

async fn query(engine: &Engine, selectors: &Selectors, body: &[u8]) -> Response {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        QueryRequest::default()
    } else {
        match serde_json::from_slice::<QueryRequest>(body) {
            Ok(request) => request,
            Err(e) => {
                let e = EngineError::Query(QueryError::Malformed(format!("query body: {e}")));
                return ApiError(e).into_response();
            }
        }
    };
    match engine.query(selectors, &request).await {
        Ok(envelope) => Json(envelope).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

fn set_commit(response: &mut Response, commit: &ObjectId) {
    if let Ok(value) = HeaderValue::from_str(&commit.to_hex()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(COMMIT_HEADER), value);
    }
}

fn with_allow(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
    response
}

/// Query string carried on generated links so that `repo=`/`branch=`
/// selection survives navigation.
fn link_suffix(params: &Params) -> String {
    let pairs: Vec<String> = ["repo", "branch"]
        .into_iter()
        .filter_map(|key| {
            params
                .get(key)
                .map(|v| format!("{key}={}", utf8_percent_encode(v, QUERY_VALUE)))
        })
        .collect();
    if pairs.is_empty() {
        String::new()
    } else {
        format!("?{}", pairs.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_keeps_selectors_in_order() {
        let mut params = Params::new();
        assert_eq!(link_suffix(&params), "");
        params.insert("branch".into(), "feature/x y".into());
        params.insert("repo".into(), "films".into());
        params.insert("other".into(), "ignored".into());
        assert_eq!(link_suffix(&params), "?repo=films&branch=feature/x%20y");
    }

    #[test]
    fn suffix_escapes_query_delimiters() {
        let mut params = Params::new();
        params.insert("branch".into(), "a&b=c#d".into());
        params.insert("repo".into(), "fïlms".into());
        assert_eq!(link_suffix(&params), "?repo=f%C3%AFlms&branch=a%26b%3Dc%23d");
    }

    #[test]
    fn header_selector_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(BRANCH_HEADER, HeaderValue::from_static("draft"));
        let mut params = Params::new();
        params.insert("branch".into(), "main".into());
        params.insert("repo".into(), "films".into());
        let s = selectors(&headers, &params);
        assert_eq!(s.branch.as_deref(), Some("draft"));
        assert_eq!(s.repo.as_deref(), Some("films"));
    }
}
