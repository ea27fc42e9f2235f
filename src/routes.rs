//! # Axum adapter
//!
//! [`crud_router`] mounts every action of a [`CrudController`] under one router, and
//! [`RequestContext`] doubles as an extractor that gathers method, format, referer and
//! merged params from the incoming request.
//!
//! ```rust,ignore
//! let posts = Arc::new(CrudController::new(PostScope::new(db), PostPolicy, views));
//! let app = Router::new().nest("/posts", crud_router(posts));
//! ```
//!
//! The adapter reads an [`Actor`] and the carried-over [`Flash`] from request
//! extensions, so an authentication or session layer can supply them. After each
//! response the resolved [`Flash`] is left in the response extensions; persist its
//! [`Flash::persisted`] entries for the next request.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{FromRequest, Path, Request, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{ACCEPT, CONTENT_TYPE, REFERER},
    },
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::context::{ActionResponse, Actor, RenderDecision, RequestContext, RequestFormat};
use crate::controller::CrudController;
use crate::errors::ApiError;
use crate::flash::Flash;
use crate::models::CollectionActionPayload;
use crate::pagination::calculate_content_range;
use crate::traits::{Authorizer, CrudHooks, CrudResource, Params, ResourceScope, Templates};

type Shared<R, S, A, T, H> = Arc<CrudController<R, S, A, T, H>>;

/// Programmatic when the client asks for javascript, is an XHR, or hits a `.js` path
#[must_use]
pub fn request_format(headers: &HeaderMap, path: &str) -> RequestFormat {
    let accepts_js = headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("javascript"));
    let xhr = headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"));

    if accepts_js || xhr || path.ends_with(".js") {
        RequestFormat::Js
    } else {
        RequestFormat::Html
    }
}

/// `post[tags][]` → `["post", "tags", ""]`
fn key_segments(key: &str) -> Vec<&str> {
    let Some((root, rest)) = key.split_once('[') else {
        return vec![key];
    };
    let mut segments = vec![root];
    segments.extend(
        rest.trim_end_matches(']')
            .split("][")
            .map(|segment| segment.trim_end_matches(']')),
    );
    segments
}

fn insert_nested(target: &mut Value, path: &[&str], value: String) {
    let Some((first, rest)) = path.split_first() else {
        *target = Value::String(value);
        return;
    };

    if first.is_empty() {
        if !target.is_array() {
            *target = Value::Array(Vec::new());
        }
        if let Value::Array(items) = target {
            if rest.is_empty() {
                items.push(Value::String(value));
            } else {
                let mut item = Value::Object(Params::new());
                insert_nested(&mut item, rest, value);
                items.push(item);
            }
        }
        return;
    }

    if !target.is_object() {
        *target = Value::Object(Params::new());
    }
    if let Value::Object(map) = target {
        let slot = map.entry((*first).to_string()).or_insert(Value::Null);
        insert_nested(slot, rest, value);
    }
}

/// Decodes `a=1&post[title]=x&ids[]=1` into nested params
#[must_use]
pub fn parse_form_params(input: &[u8]) -> Params {
    let mut root = Value::Object(Params::new());
    for (key, value) in url::form_urlencoded::parse(input) {
        if key.is_empty() {
            continue;
        }
        insert_nested(&mut root, &key_segments(&key), value.into_owned());
    }
    match root {
        Value::Object(params) => params,
        _ => Params::new(),
    }
}

impl<St> FromRequest<St> for RequestContext
where
    St: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &St) -> Result<Self, Self::Rejection> {
        let method = req.method().clone();
        let headers = req.headers().clone();
        let format = request_format(&headers, req.uri().path());
        let query = req.uri().query().map(str::to_owned);
        let actor = req.extensions().get::<Actor>().cloned().unwrap_or_default();
        let flash = req.extensions().get::<Flash>().cloned().unwrap_or_default();

        let mut params = query
            .as_deref()
            .map(|q| parse_form_params(q.as_bytes()))
            .unwrap_or_default();

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

        if !body.is_empty() {
            let content_type = headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();

            if content_type.starts_with("application/json") {
                let value: Value = serde_json::from_slice(&body)
                    .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))?;
                if let Value::Object(map) = value {
                    params.extend(map);
                }
            } else if content_type.starts_with("application/x-www-form-urlencoded") {
                params.extend(parse_form_params(&body));
            }
        }

        let mut context = Self::new(method)
            .with_format(format)
            .with_actor(actor)
            .with_flash(flash);
        context.params = params;
        context.referer = headers
            .get(REFERER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        Ok(context)
    }
}

fn to_json<V: Serialize + ?Sized>(value: &V) -> Result<Value, ApiError> {
    serde_json::to_value(value)
        .map_err(|e| ApiError::internal("Failed to prepare view", Some(e.to_string())))
}

fn strip_js(segment: &str) -> &str {
    segment.strip_suffix(".js").unwrap_or(segment)
}

impl<R, S, A, T, H> CrudController<R, S, A, T, H>
where
    R: CrudResource + Serialize,
    S: ResourceScope<R>,
    A: Authorizer<R>,
    T: Templates,
    H: CrudHooks<R>,
{
    /// Template locals: the action's own locals plus page title, flash, resource(s)
    /// and the datatable.
    fn template_locals(response: &ActionResponse<R>, locals: Params) -> Result<Params, ApiError> {
        let mut all = response.locals.clone();
        all.extend(locals);
        all.insert("action".to_string(), json!(response.action));
        all.insert("page_title".to_string(), json!(response.page_title));
        all.insert(
            "flash".to_string(),
            Value::Object(
                response
                    .flash
                    .iter()
                    .map(|(kind, message)| (kind.as_str().to_string(), json!(message)))
                    .collect(),
            ),
        );
        if let Some(resource) = &response.resource {
            all.insert("resource".to_string(), to_json(resource)?);
        }
        if let Some(resources) = &response.resources {
            all.insert("resources".to_string(), to_json(resources)?);
        }
        if let Some(datatable) = &response.datatable {
            all.insert("datatable".to_string(), to_json(datatable)?);
        }
        Ok(all)
    }

    /// Turns an action result into an HTTP response.
    pub fn http_response(&self, result: Result<ActionResponse<R>, ApiError>) -> Response {
        let response = match result {
            Ok(response) => response,
            Err(err) => return err.into_response(),
        };

        let mut http = match &response.decision {
            RenderDecision::Render { view, locals } => {
                let rendered = Self::template_locals(&response, locals.clone()).and_then(|locals| {
                    self.templates().render(self.template_prefix(), view, &locals)
                });
                let body = match rendered {
                    Ok(body) => body,
                    Err(err) => return err.into_response(),
                };
                let content_type = match response.format {
                    RequestFormat::Html => "text/html; charset=utf-8",
                    RequestFormat::Js => "text/javascript; charset=utf-8",
                };
                let mut http = (StatusCode::OK, body).into_response();
                http.headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
                if let Some(table) = &response.datatable {
                    http.headers_mut().extend(calculate_content_range(
                        table.offset,
                        table.per_page,
                        table.total,
                        self.naming().plural_name(),
                    ));
                }
                http
            }
            RenderDecision::Redirect { path } => Redirect::to(path).into_response(),
            RenderDecision::Json { status, message } => {
                let code = StatusCode::from_u16(*status).unwrap_or(StatusCode::OK);
                let payload = CollectionActionPayload {
                    status: *status,
                    message: message.clone(),
                };
                (code, Json(payload)).into_response()
            }
        };

        http.extensions_mut().insert(response.flash);
        http
    }
}

/// Router exposing every action of `controller`, meant to be nested under the
/// resource's index path.
///
/// | Method            | Path              | Action              |
/// |-------------------|-------------------|---------------------|
/// | GET               | `/`               | index               |
/// | POST              | `/`               | create              |
/// | DELETE            | `/`               | bulk destroy (`ids`)|
/// | GET               | `/new`            | new                 |
/// | GET, POST         | `/bulk/{action}`  | collection action   |
/// | GET               | `/{id}`           | show                |
/// | PUT, PATCH        | `/{id}`           | update              |
/// | DELETE            | `/{id}`           | destroy             |
/// | GET               | `/{id}/edit`      | edit                |
/// | GET, POST, PATCH, PUT | `/{id}/{action}` | member action    |
pub fn crud_router<R, S, A, T, H>(controller: Shared<R, S, A, T, H>) -> Router
where
    R: CrudResource + Serialize,
    S: ResourceScope<R> + 'static,
    A: Authorizer<R> + 'static,
    T: Templates + 'static,
    H: CrudHooks<R> + 'static,
{
    let new = |State(c): State<Shared<R, S, A, T, H>>, request: RequestContext| async move {
        let result = c.new_action(&request).await;
        c.http_response(result)
    };

    let collection = |State(c): State<Shared<R, S, A, T, H>>,
                      Path(action): Path<String>,
                      request: RequestContext| async move {
        let result = c.collection_action(&request, strip_js(&action)).await;
        c.http_response(result)
    };

    let member = |State(c): State<Shared<R, S, A, T, H>>,
                  Path((id, action)): Path<(String, String)>,
                  request: RequestContext| async move {
        let request = request.with_param("id", id);
        let result = match strip_js(&action) {
            "edit" => c.edit(&request).await,
            action => c.member_action(&request, action).await,
        };
        c.http_response(result)
    };

    let with_id = |request: RequestContext, id: &str| request.with_param("id", strip_js(id));

    Router::new()
        .route(
            "/",
            get(|State(c): State<Shared<R, S, A, T, H>>, request: RequestContext| async move {
                let result = c.index(&request).await;
                c.http_response(result)
            })
            .post(|State(c): State<Shared<R, S, A, T, H>>, request: RequestContext| async move {
                let result = c.create(&request).await;
                c.http_response(result)
            })
            .delete(|State(c): State<Shared<R, S, A, T, H>>, request: RequestContext| async move {
                let result = c.destroy(&request).await;
                c.http_response(result)
            }),
        )
        .route("/new", get(new))
        .route("/new.js", get(new))
        .route("/bulk/{action}", get(collection).post(collection))
        .route(
            "/{id}",
            get(
                move |State(c): State<Shared<R, S, A, T, H>>,
                      Path(id): Path<String>,
                      request: RequestContext| async move {
                    let request = with_id(request, &id);
                    let result = c.show(&request).await;
                    c.http_response(result)
                },
            )
            .put(
                move |State(c): State<Shared<R, S, A, T, H>>,
                      Path(id): Path<String>,
                      request: RequestContext| async move {
                    let request = with_id(request, &id);
                    let result = c.update(&request).await;
                    c.http_response(result)
                },
            )
            .patch(
                move |State(c): State<Shared<R, S, A, T, H>>,
                      Path(id): Path<String>,
                      request: RequestContext| async move {
                    let request = with_id(request, &id);
                    let result = c.update(&request).await;
                    c.http_response(result)
                },
            )
            .delete(
                move |State(c): State<Shared<R, S, A, T, H>>,
                      Path(id): Path<String>,
                      request: RequestContext| async move {
                    let request = with_id(request, &id);
                    let result = c.destroy(&request).await;
                    c.http_response(result)
                },
            ),
        )
        .route(
            "/{id}/{action}",
            get(member).post(member).patch(member).put(member),
        )
        .with_state(controller)
}
