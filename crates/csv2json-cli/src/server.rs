//! HTTP front end for the document store.
//!
//! Routes:
//! - `GET /files` lists stored documents.
//! - `POST /files` accepts a multipart form with a `file` part and an optional
//!   `separator` part, converts the CSV and stores it under the file stem.
//! - `GET /files/{name}` returns a stored document. The first query pair, if
//!   any, filters the document to elements whose field equals the value.
//!
//! Conversion and SQLite work run on the blocking pool.

use std::convert::Infallible;
use std::error::Error as StdError;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::header::CONTENT_TYPE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use percent_encoding::percent_decode_str;
use serde::Serialize;
use tokio::net::TcpListener;
use url::form_urlencoded;

use csv2json::{DocumentStore, Error};

pub struct AppState {
    pub store: Arc<DocumentStore>,
    pub max_upload_bytes: usize,
}

#[derive(Serialize)]
struct Message<'a> {
    message: &'a str,
    #[serde(rename = "statusCode")]
    status_code: u16,
}

#[derive(Default)]
struct UploadForm {
    file: Option<(String, Bytes)>,
    separator: Option<String>,
}

/// Bind `addr` and serve until the process is stopped.
pub fn run(addr: &str, state: AppState) -> Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| anyhow!("failed to start runtime: {e}"))?;
    rt.block_on(async move {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow!("failed to bind {addr}: {e}"))?;
        serve(listener, Arc::new(state)).await
    })
}

pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    let bound = listener
        .local_addr()
        .map_err(|e| anyhow!("failed to read bound addr: {e}"))?;
    tracing::info!(addr = %bound, "server started");

    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .map_err(|e| anyhow!("accept failed: {e}"))?;
        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let state = state.clone();
                async move { Ok::<_, Infallible>(handle(req, &state).await) }
            });
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                tracing::warn!(%peer, error = %e, "connection error");
            }
        });
    }
}

pub async fn handle<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);

    let resp = match path.as_str() {
        "/files" | "/files/" => match method {
            Method::GET => list_files(state).await,
            Method::POST => upload(req, state).await,
            _ => message(StatusCode::METHOD_NOT_ALLOWED, "method not allowed"),
        },
        other => match other.strip_prefix("/files/") {
            Some(name) if !name.contains('/') => {
                if method == Method::GET {
                    get_file(name, query.as_deref(), state).await
                } else {
                    message(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
                }
            }
            _ => message(StatusCode::NOT_FOUND, "not found"),
        },
    };

    tracing::info!(%method, %path, status = resp.status().as_u16(), "request");
    resp
}

async fn list_files(state: &AppState) -> Response<Full<Bytes>> {
    let store = state.store.clone();
    match blocking(move || store.get_all()).await {
        Ok(files) => json_response(StatusCode::OK, &files),
        Err(e) => {
            tracing::error!(error = %e, "failed to list files");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Error retrieving files")
        }
    }
}

async fn get_file(raw_name: &str, query: Option<&str>, state: &AppState) -> Response<Full<Bytes>> {
    let name = match percent_decode_str(raw_name).decode_utf8() {
        Ok(name) => name.into_owned(),
        Err(_) => return message(StatusCode::BAD_REQUEST, "file name is not valid UTF-8"),
    };
    let (key, value) = query
        .and_then(|q| form_urlencoded::parse(q.as_bytes()).next())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .unwrap_or_default();

    let store = state.store.clone();
    let lookup = name.clone();
    let result = blocking(move || {
        let doc = store.get_file(&lookup)?;
        csv2json::filter_json(&doc, &key, &value)
    })
    .await;
    match result {
        Ok(doc) => raw_json_response(StatusCode::OK, doc),
        Err(e) => error_response(&e),
    }
}

async fn upload<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let boundary = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok());
    let Some(boundary) = boundary else {
        return message(StatusCode::BAD_REQUEST, "expected a multipart/form-data upload");
    };
    let query_separator = req.uri().query().and_then(|q| {
        form_urlencoded::parse(q.as_bytes())
            .find(|(k, _)| k == "separator")
            .map(|(_, v)| v.into_owned())
    });

    let body = match Limited::new(req.into_body(), state.max_upload_bytes).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            return message(StatusCode::PAYLOAD_TOO_LARGE, "file exceeds the upload size limit");
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to read upload body");
            return message(StatusCode::BAD_REQUEST, "Error retrieving the file");
        }
    };

    let form = match read_form(body, boundary).await {
        Ok(form) => form,
        Err(e) => {
            tracing::warn!(error = %e, "invalid multipart form");
            return message(StatusCode::BAD_REQUEST, "Error retrieving the file");
        }
    };
    let Some((filename, data)) = form.file else {
        return message(StatusCode::BAD_REQUEST, "Error retrieving the file");
    };
    tracing::info!(%filename, bytes = data.len(), "uploaded file");

    let separator = form.separator.or(query_separator).unwrap_or_default();
    let store = state.store.clone();
    match blocking(move || csv2json::ingest(&store, &filename, data.as_ref(), &separator)).await {
        Ok(id) => message(StatusCode::CREATED, &format!("file {} saved", id)),
        Err(e) => error_response(&e),
    }
}

async fn read_form(body: Bytes, boundary: String) -> core::result::Result<UploadForm, multer::Error> {
    let stream = futures_util::stream::once(async move { Ok::<Bytes, Infallible>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") if form.file.is_none() => {
                let filename = field.file_name().unwrap_or_default().to_string();
                form.file = Some((filename, field.bytes().await?));
            }
            Some("separator") => form.separator = Some(field.text().await?),
            _ => {}
        }
    }
    Ok(form)
}

async fn blocking<T, F>(f: F) -> csv2json::Result<T>
where
    F: FnOnce() -> csv2json::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))?
}

fn error_response(err: &Error) -> Response<Full<Bytes>> {
    match err {
        Error::UnsupportedMediaType(_) => {
            message(StatusCode::UNSUPPORTED_MEDIA_TYPE, "file must be a csv file to upload")
        }
        Error::Parse { .. } => message(
            StatusCode::BAD_REQUEST,
            &format!("error while handling csv file: {}", err),
        ),
        Error::Mapping(_) => message(
            StatusCode::BAD_REQUEST,
            &format!("error while converting csv to json file: {}", err),
        ),
        Error::NotFound(name) => message(StatusCode::NOT_FOUND, &format!("{} not found", name)),
        Error::Store(_) => {
            tracing::error!(error = %err, "document store failure");
            message(StatusCode::INTERNAL_SERVER_ERROR, "error accessing the document store")
        }
        _ => {
            tracing::error!(error = %err, "request failed");
            message(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

fn message(status: StatusCode, msg: &str) -> Response<Full<Bytes>> {
    json_response(
        status,
        &Message {
            message: msg,
            status_code: status.as_u16(),
        },
    )
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec_pretty(value)
        .unwrap_or_else(|_| b"{\"message\":\"serialize\"}".to_vec());
    raw_json_response(status, body)
}

fn raw_json_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(body.into()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from_static(b"{\"message\":\"internal\"}"))))
}
