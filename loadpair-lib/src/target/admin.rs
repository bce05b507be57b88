use std::convert::Infallible;

use rama::{
    Service,
    http::{
        HeaderValue, Method, Request, Response, StatusCode,
        body::util::{BodyExt as _, Limited},
        header,
        mime::{self, Mime},
        service::web::response::{IntoResponse, Json},
    },
    telemetry::tracing,
};

use super::{ResponderConfig, ResponderConfigStore};

/// The only route served by the [`AdminService`].
pub const CONFIG_PATH: &str = "/config";

/// Largest request body accepted when updating the config.
pub const MAX_ADMIN_BODY_SIZE: usize = 64 * 1024;

/// Admin API to inspect and replace the [`ResponderConfig`] at runtime.
///
/// - `GET /config`: current config as JSON
/// - `POST /config`: replace the config with a JSON body and redirect to `GET /config`
///
/// A rejected update leaves the current config untouched.
#[derive(Debug, Clone)]
pub struct AdminService {
    store: ResponderConfigStore,
}

impl AdminService {
    pub fn new(store: ResponderConfigStore) -> Self {
        Self { store }
    }

    fn get_config(&self) -> Response {
        let cfg = self.store.snapshot();
        Json(ResponderConfig::clone(&cfg)).into_response()
    }

    async fn post_config(&self, req: Request) -> Response {
        if !has_json_content_type(&req) {
            tracing::debug!(
                content_type = ?req.headers().get(header::CONTENT_TYPE),
                "reject config update: invalid content type",
            );
            return method_not_allowed("Invalid content type");
        }

        let body = match Limited::new(req.into_body(), MAX_ADMIN_BODY_SIZE)
            .collect()
            .await
        {
            Ok(collected) => collected.to_bytes(),
            Err(err) => {
                tracing::debug!("reject config update: failed to read body: {err}");
                return method_not_allowed("Invalid content");
            }
        };

        // decode fully before touching the store
        let cfg: ResponderConfig = match serde_json::from_slice(&body) {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::debug!("reject config update: invalid json: {err}");
                return method_not_allowed("Invalid content");
            }
        };

        let (duration, response_len) = (cfg.duration, cfg.response.len());
        let previous = self.store.replace(cfg);
        tracing::info!(
            previous.duration = previous.duration,
            previous.response_len = previous.response.len(),
            duration,
            response_len,
            "responder config updated",
        );

        let mut resp = StatusCode::SEE_OTHER.into_response();
        resp.headers_mut()
            .insert(header::LOCATION, HeaderValue::from_static(CONFIG_PATH));
        resp
    }
}

impl Service<Request> for AdminService {
    type Output = Response;
    type Error = Infallible;

    async fn serve(&self, req: Request) -> Result<Self::Output, Self::Error> {
        if req.uri().path() != CONFIG_PATH {
            return Ok(StatusCode::NOT_FOUND.into_response());
        }

        let resp = match req.method().clone() {
            Method::GET => self.get_config(),
            Method::POST => self.post_config(req).await,
            method => {
                tracing::debug!(http.request.method = %method, "reject admin request");
                method_not_allowed("Invalid request method")
            }
        };
        Ok(resp)
    }
}

/// Parameters such as `charset` are allowed, only the essence is compared.
fn has_json_content_type(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<Mime>().ok())
        .map(|media_type| media_type.essence_str() == mime::APPLICATION_JSON.essence_str())
        .unwrap_or_default()
}

fn method_not_allowed(reason: &'static str) -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, reason).into_response()
}
