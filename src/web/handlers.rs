//! Request handlers: parse, build session, resolve, relay or redirect.
//!
//! Per connection the pipeline is strictly sequential: decode the query
//! string into commands, run the configuration interpreter over a fresh
//! session, resolve the URL into a chosen stream, then either answer
//! with a redirect or open the stream and relay its bytes. Every failure
//! surfaces to this one client as a `404` and never crosses workers.

use std::io;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::errors::{RelayError, RelayResult};
use crate::options::{self, Command};
use crate::resolver::{self, ChosenStream, PlayRequest, ServeMode};
use crate::session::{OptionValue, Session};
use crate::streams::ByteSource;

use super::AppState;

const SERVER_NAME: &str = concat!("streamrelay/", env!("CARGO_PKG_VERSION"));

/// Relay route: resolve, open and proxy the stream bytes.
pub async fn play(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    handle(state, query, headers, ServeMode::Relay).await
}

/// Redirect route: resolve and answer with the stream's source URL.
pub async fn redirect(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    handle(state, query, headers, ServeMode::Redirect).await
}

/// Everything that is not `/play/` or `/301/`.
pub async fn not_found() -> Response {
    not_found_response()
}

async fn handle(
    state: AppState,
    query: Option<String>,
    headers: HeaderMap,
    mode: ServeMode,
) -> Response {
    let request_id = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
    let span = info_span!("request", id = %request_id);

    async move {
        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("???");
        info!("User-Agent: {user_agent}");

        match serve(&state, query.as_deref().unwrap_or(""), mode).await {
            Ok(response) => response,
            Err(e) => {
                match &e {
                    RelayError::MissingUrl => error!("no URL provided"),
                    RelayError::StreamOpen(err) => error!("could not open stream: {err}"),
                    other => error!("{other}"),
                }
                not_found_response()
            }
        }
    }
    .instrument(span)
    .await
}

async fn serve(state: &AppState, query: &str, mode: ServeMode) -> RelayResult<Response> {
    let commands = parse_commands(query);

    // Each connection gets its own session; nothing here is shared.
    let mut session = Session::new();
    let passthrough = options::apply(&mut session, &commands)?;

    let mut request = PlayRequest::from_passthrough(&passthrough, mode)?;
    if passthrough.size("cache").is_none() {
        request.prebuffer = state.config.relay.default_prebuffer;
    }
    // The pre-buffer sizes an allocation; a client value must never be
    // allowed to exceed the configured ceiling.
    request.prebuffer = request.prebuffer.clamp(1, state.config.relay.max_prebuffer.max(1));
    session.set_log_level(&request.log_level);
    debug!("playing {} at quality {:?}", request.url, request.quality);

    let chosen = resolver::resolve(&session, &state.registry, &request).await?;
    info!("negotiated stream {}", chosen.name);

    match mode {
        ServeMode::Redirect => redirect_response(&chosen),
        ServeMode::Relay => {
            if let Some(interval) = request.session_reload {
                remember_session(state, &mut session, &request, &chosen, interval);
            }
            let source = chosen.handle.open(&session).await.map_err(RelayError::StreamOpen)?;
            Ok(relay_response(source, request.prebuffer))
        }
    }
}

/// Decode a query string into the ordered command sequence, keeping
/// duplicates and percent-decoding names and values.
pub fn parse_commands(query: &str) -> Vec<Command> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect()
}

/// Persist the negotiated quality and target URL so the transport can
/// re-fetch on the given interval. A cooperative hint, not enforced
/// here; cache failures are logged and otherwise ignored.
fn remember_session(
    state: &AppState,
    session: &mut Session,
    request: &PlayRequest,
    chosen: &ChosenStream,
    interval: u64,
) {
    if let Some(source_url) = chosen.handle.source_url() {
        let ttl = Duration::from_secs(interval.saturating_add(60));
        let name_key = format!("cache:{source_url}:stream-name");
        let url_key = format!("cache:{source_url}:url");
        if let Err(e) = state.cache.set(&name_key, &chosen.name, ttl) {
            warn!("could not persist stream name: {e}");
        }
        if let Err(e) = state.cache.set(&url_key, request.url.as_str(), ttl) {
            warn!("could not persist stream url: {e}");
        }
    }
    let interval = i64::try_from(interval).unwrap_or(i64::MAX);
    session.set_option("hls-session-reload", OptionValue::Int(interval));
}

fn redirect_response(chosen: &ChosenStream) -> RelayResult<Response> {
    // The resolver guardrail guarantees a source URL in redirect mode.
    let location = chosen
        .handle
        .source_url()
        .ok_or(RelayError::UnsupportedStreamKind {
            kind: chosen.handle.kind(),
            action: "redirected",
        })?;
    info!("redirecting to {location}");

    Ok(Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header(header::SERVER, SERVER_NAME)
        .header(header::LOCATION, location.to_string())
        .body(Body::empty())
        .unwrap_or_else(|_| not_found_response()))
}

/// Answer `200` with a generic binary content type, then pump bytes from
/// the opened source into the response body. The source is read in
/// pre-buffer sized chunks; a failed send means the client went away
/// (informational, not an error), a failed read is a transport error.
/// The handle is dropped exactly once when the pump task exits.
fn relay_response(mut source: ByteSource, prebuffer: u64) -> Response {
    let chunk_size = prebuffer.max(1) as usize;
    let (tx, rx) = mpsc::channel::<Result<Bytes, io::Error>>(1);

    tokio::spawn(async move {
        debug!("pre-buffering {chunk_size} bytes");
        let mut buffer = vec![0u8; chunk_size];
        loop {
            match source.read(&mut buffer).await {
                Ok(0) => {
                    debug!("end of stream");
                    break;
                }
                Ok(n) => {
                    if tx.send(Ok(Bytes::copy_from_slice(&buffer[..n]))).await.is_err() {
                        info!("detected remote disconnect");
                        break;
                    }
                }
                Err(e) => {
                    error!("relay read failed: {e}");
                    break;
                }
            }
        }
        info!("stream ended");
        // `source` is dropped here, releasing the handle.
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::SERVER, SERVER_NAME)
        .header(header::CONTENT_TYPE, "video/unknown")
        .body(Body::from_stream(ReceiverStream::new(rx)))
        .unwrap_or_else(|_| not_found_response())
}

fn not_found_response() -> Response {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(header::SERVER, SERVER_NAME)
        .header(header::CONTENT_TYPE, "text/html")
        .body(Body::empty())
        .unwrap_or_else(|_| Response::new(Body::empty()))
}
