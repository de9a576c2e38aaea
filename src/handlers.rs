use crate::auth::AuthUser;
use crate::cache;
use crate::config::Config;
use crate::errors::AppError;
use crate::models::*;
use crate::services::{AuthService, BoletoService, ClienteService};
use crate::validation::{clean_cpf, mask_cpf, validate_cpf};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Form, Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use moka::future::Cache;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Application configuration.
    pub config: Config,
    /// Customer and debt lookups (30 min TTL).
    pub cliente_cache: Cache<String, String>,
    /// Boleto lookups (60 min TTL).
    pub boleto_cache: Cache<String, String>,
    /// Prometheus exposition handle for /metrics.
    pub metrics: PrometheusHandle,
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "cobranca-api",
            "version": "0.1.0"
        })),
    )
}

/// GET /metrics — Prometheus exposition, consumed by the monitoring stack.
pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics.render()
}

/// POST /auth/token
///
/// OAuth2 password-flow-shaped login: form-encoded username/password in,
/// bearer token out.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, AppError> {
    tracing::info!("POST /auth/token - username: {}", form.username);

    let auth = AuthService::new(state.db.clone(), &state.config);
    let token = auth.autenticar(&form.username, &form.password).await?;

    Ok(Json(token))
}

/// POST /auth/login
///
/// JSON-body variant of the login endpoint for clients that do not speak the
/// form-encoded flow.
pub async fn login_json(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginForm>,
) -> Result<Json<TokenResponse>, AppError> {
    tracing::info!("POST /auth/login - username: {}", body.username);

    let auth = AuthService::new(state.db.clone(), &state.config);
    let token = auth.autenticar(&body.username, &body.password).await?;

    Ok(Json(token))
}

fn cpf_validado(cpf: &str) -> Result<String, AppError> {
    if !validate_cpf(cpf) {
        return Err(AppError::BadRequest("CPF inválido".to_string()));
    }
    Ok(clean_cpf(cpf))
}

/// GET /api/v1/cliente/{cpf}
///
/// Customer lookup by CPF, cache-aside with a checksummed entry.
pub async fn get_cliente(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(cpf): Path<String>,
) -> Result<Json<ClienteResponse>, AppError> {
    tracing::info!("GET /cliente/{}", mask_cpf(&cpf));
    let cpf = cpf_validado(&cpf)?;

    let key = cache::cliente_key(&cpf);
    if let Some(cached) = cache::get_validated::<ClienteResponse>(&state.cliente_cache, &key).await {
        tracing::debug!("Cliente cache HIT for {}", mask_cpf(&cpf));
        return Ok(Json(cached));
    }
    metrics::counter!("cache_misses_total").increment(1);

    let service = ClienteService::new(state.db.clone(), &state.config);
    let cliente = service.buscar_por_cpf(&cpf).await?;

    cache::put_validated(&state.cliente_cache, key, &cliente).await;
    Ok(Json(cliente))
}

/// GET /api/v1/cliente/{cpf}/dividas
///
/// Debts for a customer with status and current amount derived on read.
pub async fn get_dividas(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(cpf): Path<String>,
) -> Result<Json<DividasClienteResponse>, AppError> {
    tracing::info!("GET /cliente/{}/dividas", mask_cpf(&cpf));
    let cpf = cpf_validado(&cpf)?;

    let key = cache::dividas_key(&cpf);
    if let Some(cached) =
        cache::get_validated::<DividasClienteResponse>(&state.cliente_cache, &key).await
    {
        tracing::debug!("Dividas cache HIT for {}", mask_cpf(&cpf));
        return Ok(Json(cached));
    }
    metrics::counter!("cache_misses_total").increment(1);

    let service = ClienteService::new(state.db.clone(), &state.config);
    let dividas = service.listar_dividas(&cpf).await?;

    cache::put_validated(&state.cliente_cache, key, &dividas).await;
    Ok(Json(dividas))
}

/// GET /api/v1/cliente/{cpf}/boletos
pub async fn get_boletos(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(cpf): Path<String>,
) -> Result<Json<Vec<BoletoResponse>>, AppError> {
    tracing::info!("GET /cliente/{}/boletos", mask_cpf(&cpf));
    let cpf = cpf_validado(&cpf)?;

    let key = cache::boletos_key(&cpf);
    if let Some(cached) = cache::get_validated::<Vec<BoletoResponse>>(&state.boleto_cache, &key).await
    {
        tracing::debug!("Boletos cache HIT for {}", mask_cpf(&cpf));
        return Ok(Json(cached));
    }
    metrics::counter!("cache_misses_total").increment(1);

    let service = ClienteService::new(state.db.clone(), &state.config);
    let boletos = service.listar_boletos(&cpf).await?;

    cache::put_validated(&state.boleto_cache, key, &boletos).await;
    Ok(Json(boletos))
}

/// POST /api/v1/boleto/gerar
///
/// Negotiates a set of debts into a single boleto with 1-5 installments.
pub async fn gerar_boleto(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<GerarBoletoRequest>,
) -> Result<(StatusCode, Json<BoletoGeradoResponse>), AppError> {
    tracing::info!(
        "POST /boleto/gerar - cpf: {}, dividas: {}, parcelas: {}",
        mask_cpf(&payload.cliente_cpf),
        payload.dividas_ids.len(),
        payload.parcelas
    );

    let cpf = clean_cpf(&payload.cliente_cpf);

    // Invalidate on both sides of the write so no reader can hold a
    // pre-mutation snapshot after the transaction commits.
    cache::invalidate_cliente(&state.cliente_cache, &state.boleto_cache, &cpf).await;

    let service = BoletoService::new(state.db.clone(), &state.config);
    let boleto = service.gerar(&payload, &user.username).await?;

    cache::invalidate_cliente(&state.cliente_cache, &state.boleto_cache, &cpf).await;

    Ok((StatusCode::CREATED, Json(boleto)))
}

/// Cancellation reason from an optional JSON body.
///
/// An absent body is fine, but a body that is present and malformed is a 400;
/// silently dropping it would lose the caller's `motivo`.
fn motivo_cancelamento(
    payload: Result<Json<CancelarBoletoRequest>, JsonRejection>,
) -> Result<Option<String>, AppError> {
    match payload {
        Ok(Json(body)) => Ok(body.motivo),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(None),
        Err(rejection) => Err(AppError::BadRequest(format!(
            "Corpo da requisição inválido: {}",
            rejection
        ))),
    }
}

/// POST /api/v1/boleto/{boleto_id}/cancelar
///
/// Cancels an active boleto and restores its debts to a due-date-derived
/// status. The body with the cancellation reason is optional.
pub async fn cancelar_boleto(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(boleto_id): Path<Uuid>,
    payload: Result<Json<CancelarBoletoRequest>, JsonRejection>,
) -> Result<Json<BoletoCanceladoResponse>, AppError> {
    tracing::info!("POST /boleto/{}/cancelar", boleto_id);

    let motivo = motivo_cancelamento(payload)?;

    let service = BoletoService::new(state.db.clone(), &state.config);

    // Invalidate on both sides of the write, mirroring gerar_boleto.
    if let Some(cpf) = service.cpf_do_dono(boleto_id).await? {
        cache::invalidate_cliente(&state.cliente_cache, &state.boleto_cache, &cpf).await;
    }

    let (resposta, cpf) = service
        .cancelar(boleto_id, &user.username, motivo.as_deref())
        .await?;

    cache::invalidate_cliente(&state.cliente_cache, &state.boleto_cache, &cpf).await;

    Ok(Json(resposta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::Request;

    async fn extrair(body: Option<&'static str>) -> Result<Json<CancelarBoletoRequest>, JsonRejection> {
        let req = match body {
            Some(b) => Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(Body::from(b))
                .unwrap(),
            None => Request::builder()
                .method("POST")
                .uri("/")
                .body(Body::empty())
                .unwrap(),
        };
        Json::from_request(req, &()).await
    }

    #[tokio::test]
    async fn absent_cancel_body_means_no_motivo() {
        let motivo = motivo_cancelamento(extrair(None).await).unwrap();
        assert!(motivo.is_none());
    }

    #[tokio::test]
    async fn malformed_cancel_body_is_rejected() {
        let result = motivo_cancelamento(extrair(Some(r#"{"motivo": "#)).await);
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn valid_cancel_body_carries_motivo() {
        let motivo = motivo_cancelamento(extrair(Some(r#"{"motivo":"acordo"}"#)).await).unwrap();
        assert_eq!(motivo.as_deref(), Some("acordo"));
    }

    #[test]
    fn login_body_deserializes_from_json() {
        let body: LoginForm =
            serde_json::from_str(r#"{"username":"admin","password":"admin123"}"#).unwrap();
        assert_eq!(body.username, "admin");
        assert_eq!(body.password, "admin123");
    }
}
