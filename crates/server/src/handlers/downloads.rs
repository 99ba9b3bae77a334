//! Download endpoint with HTTP range support.

use crate::error::{ApiError, ApiResult};
use crate::metrics::record_download;
use crate::state::AppState;
use crate::transfer::{Download, ServeResult, TransferError};
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{
    ACCEPT_RANGES, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG, RANGE,
};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use depot_core::ByteRange;
use futures::StreamExt;
use uuid::Uuid;

/// GET /api/download/{project_id}/{version_id} - Download a version's artifact.
///
/// External versions redirect (307). Stored versions stream the file, or the
/// single range named by a valid `Range` header (206). A malformed `Range`
/// header is ignored and the full file is served.
pub async fn download(
    State(state): State<AppState>,
    Path((project_id, version_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let (Ok(project_id), Ok(version_id)) =
        (Uuid::parse_str(&project_id), Uuid::parse_str(&version_id))
    else {
        record_download("not_found");
        return Err(ApiError::NotFound("version not found".to_string()));
    };

    let range = headers
        .get(RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(ByteRange::parse);

    let result = match state.egress.serve(project_id, version_id, range).await {
        Ok(result) => result,
        Err(e @ TransferError::NotFound(_)) => {
            record_download("not_found");
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    match result {
        ServeResult::Redirect { url } => {
            record_download("redirect");
            Ok(Redirect::temporary(&url).into_response())
        }
        ServeResult::Full(download) => {
            record_download("full");
            stream_response(StatusCode::OK, download)
        }
        ServeResult::Partial(download) => {
            record_download("partial");
            stream_response(StatusCode::PARTIAL_CONTENT, download)
        }
        ServeResult::Unsatisfiable { total_size } => {
            record_download("unsatisfiable");
            Err(ApiError::RangeNotSatisfiable { size: total_size })
        }
    }
}

fn stream_response(status: StatusCode, download: Download) -> ApiResult<Response> {
    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(
        CONTENT_LENGTH,
        HeaderValue::from(download.read.content_length()),
    );
    headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(
        CONTENT_DISPOSITION,
        header_value(&content_disposition(&download.file_name))?,
    );
    if let Some(etag) = download.etag() {
        headers.insert(ETAG, header_value(&etag)?);
    }
    if let Some(range) = download.read.range {
        headers.insert(
            CONTENT_RANGE,
            header_value(&range.content_range(download.read.total_size))?,
        );
    }

    let body_stream = download
        .read
        .stream
        .map(|result| result.map_err(|e| std::io::Error::other(e.to_string())));

    Ok((status, headers, Body::from_stream(body_stream)).into_response())
}

fn content_disposition(file_name: &str) -> String {
    let escaped: String = file_name
        .chars()
        .filter(|c| !c.is_control())
        .flat_map(|c| match c {
            '"' | '\\' => vec!['\\', c],
            _ => vec![c],
        })
        .collect();
    format!("attachment; filename=\"{escaped}\"")
}

fn header_value(value: &str) -> ApiResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| ApiError::Internal(format!("invalid header value {value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_disposition_escapes_quotes() {
        assert_eq!(
            content_disposition("1.0-app.apk"),
            "attachment; filename=\"1.0-app.apk\""
        );
        assert_eq!(
            content_disposition("a\"b\\c.apk"),
            "attachment; filename=\"a\\\"b\\\\c.apk\""
        );
    }
}
