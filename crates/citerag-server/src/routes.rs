//! Route handlers

use crate::error::ApiError;
use crate::state::AppState;
use axum::body::Body;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use citerag_core::ingest::{HistoryEntry, HistoryLog, IngestRequest};
use citerag_core::protocol::{encode_stream, STREAM_CONTENT_TYPE};
use citerag_core::query::{AnswerBody, Citation, ConversationTurn, Delivery};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Instant;

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Deserialize)]
pub struct QueryBody {
    /// Single question, used when `messages` is absent
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub messages: Option<Vec<ConversationTurn>>,
    #[serde(default)]
    pub stream: Option<bool>,
}

impl QueryBody {
    fn into_turns(self) -> ApiResult<Vec<ConversationTurn>> {
        match (self.messages, self.query) {
            (Some(messages), _) => Ok(messages),
            (None, Some(query)) => Ok(vec![ConversationTurn::user(query)]),
            (None, None) => Err(ApiError::bad_request("No messages provided")),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BlockingAnswer {
    pub answer: String,
    pub citations: Vec<Citation>,
    /// Wall-clock milliseconds spent answering
    pub timing: u64,
}

pub async fn query(
    State(state): State<AppState>,
    body: Result<Json<QueryBody>, JsonRejection>,
) -> ApiResult<Response> {
    let start = Instant::now();
    let Json(body) = body.map_err(json_error)?;
    let delivery = if body.stream.unwrap_or(state.stream_by_default) {
        Delivery::Streaming
    } else {
        Delivery::Blocking
    };
    let turns = body.into_turns()?;

    let answer = state.pipeline.answer_query(&turns, delivery).await?;

    match answer.body {
        AnswerBody::Stream(deltas) => {
            let frames = encode_stream(&answer.citations, deltas)?;
            let mut response =
                Body::from_stream(frames.map(Ok::<_, Infallible>)).into_response();
            let headers = response.headers_mut();
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(STREAM_CONTENT_TYPE),
            );
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            headers.insert(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            );
            Ok(response)
        }
        AnswerBody::Text(answer_text) => Ok(Json(BlockingAnswer {
            answer: answer_text,
            citations: answer.citations,
            timing: start.elapsed().as_millis() as u64,
        })
        .into_response()),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestText {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub source_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub success: bool,
    pub count: usize,
    pub message: String,
}

/// Accepts either a JSON body or a multipart upload
pub async fn ingest(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<IngestResponse>> {
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let request = if is_multipart {
        let multipart = Multipart::from_request(req, &state)
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
        read_multipart(multipart).await?
    } else {
        let Json(body) = Json::<IngestText>::from_request(req, &state)
            .await
            .map_err(json_error)?;
        IngestRequest::text(body.text, body.source_name)
    };

    let report = state.ingestor.ingest(request).await?;
    Ok(Json(IngestResponse {
        success: true,
        count: report.count,
        message: report.message,
    }))
}

async fn read_multipart(mut multipart: Multipart) -> ApiResult<IngestRequest> {
    let mut file = None;
    let mut text = None;
    let mut source_name = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((filename, bytes.to_vec(), content_type));
            }
            Some("text") => {
                text = Some(field.text().await.map_err(multipart_error)?);
            }
            Some("sourceName") => {
                source_name = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    Ok(match file {
        Some((filename, bytes, content_type)) => {
            IngestRequest::file(filename, bytes, content_type).with_source_name(source_name)
        }
        None => IngestRequest::text(text.unwrap_or_default(), source_name),
    })
}

/// Well-formed JSON of the wrong shape is a validation failure; other
/// rejections (bad content type, oversized body) keep their status
fn json_error(e: JsonRejection) -> ApiError {
    let status = match &e {
        JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
            StatusCode::BAD_REQUEST
        }
        other => other.status(),
    };
    ApiError::new(status, e.body_text())
}

fn multipart_error(e: MultipartError) -> ApiError {
    ApiError::new(e.status(), e.body_text())
}

pub async fn documents(State(state): State<AppState>) -> ApiResult<Json<Vec<HistoryEntry>>> {
    Ok(Json(state.history().list().await?))
}

pub async fn health() -> &'static str {
    "OK"
}
