use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============ Database Models ============

/// A customer (cliente) record. Read-mostly and cached.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Cliente {
    /// Unique identifier.
    pub id: Uuid,
    /// CPF, stored as 11 bare digits; natural key.
    pub cpf: String,
    /// Full name.
    pub nome: String,
    /// Contact email.
    pub email: String,
    /// Contact phone.
    pub telefone: Option<String>,
    /// Address document (logradouro, cidade, uf, cep...).
    pub endereco: Option<serde_json::Value>,
    /// Credit score.
    pub score_credito: Option<i32>,
    /// Account status ("ativo" / "inativo").
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// An outstanding debt (divida) owed by one customer.
///
/// `status` holds only the explicit overrides ("negociado", "pago") or the
/// last derived value; the read path always re-derives outstanding status and
/// current amount from `data_vencimento` / `valor_original`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Divida {
    pub id: Uuid,
    pub cliente_id: Uuid,
    /// Debt type: emprestimo, cartao_credito, financiamento, cheque_especial, outros.
    pub tipo: String,
    pub descricao: String,
    pub valor_original: BigDecimal,
    /// Simple monthly interest rate applied once overdue (e.g. 0.02).
    pub juros_mes: BigDecimal,
    /// Flat penalty rate applied once overdue (e.g. 0.02).
    pub multa: BigDecimal,
    pub data_vencimento: NaiveDate,
    pub status: String,
    /// The active boleto holding this debt, when negotiated.
    pub boleto_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A payment slip (boleto) aggregating one or more debts of a customer.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Boleto {
    pub id: Uuid,
    /// Natural key; generated pseudo-bank number.
    pub numero_boleto: String,
    pub cliente_id: Uuid,
    /// Debts aggregated by this boleto.
    pub dividas_ids: Vec<Uuid>,
    pub valor_total: BigDecimal,
    pub valor_parcela: BigDecimal,
    pub parcelas: i32,
    pub banco: String,
    pub agencia: String,
    pub conta: String,
    pub linha_digitavel: String,
    /// 44 digits.
    pub codigo_barras: String,
    pub data_vencimento: DateTime<Utc>,
    pub status: String,
    pub descricao: Option<String>,
    pub data_cancelamento: Option<DateTime<Utc>>,
    pub cancelado_por: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// An operator account for the login endpoint.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Usuario {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// SHA-256 hex digest of the password.
    #[serde(skip_serializing)]
    pub senha_hash: String,
    pub ativo: bool,
    pub created_at: DateTime<Utc>,
}

// ============ API Request/Response Models ============

/// Form-encoded credentials for `POST /auth/token` (OAuth2 password flow shape).
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Bearer token issued on login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Seconds until expiration.
    pub expires_in: i64,
}

/// Customer payload for `GET /api/v1/cliente/{cpf}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClienteResponse {
    pub id: Uuid,
    /// Formatted as 000.000.000-00.
    pub cpf: String,
    pub nome: String,
    pub email: String,
    pub telefone: Option<String>,
    pub endereco: Option<serde_json::Value>,
    pub score_credito: Option<i32>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One debt with derived status and amount.
#[derive(Debug, Serialize, Deserialize)]
pub struct DividaResponse {
    pub id: Uuid,
    pub tipo: String,
    pub descricao: String,
    pub valor_original: f64,
    /// Original amount plus penalty and accrued interest, derived on read.
    pub valor_atual: f64,
    pub data_vencimento: NaiveDate,
    pub dias_atraso: i64,
    pub status: String,
    pub juros_mes: f64,
    pub multa: f64,
}

/// Aggregate debt listing for `GET /api/v1/cliente/{cpf}/dividas`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DividasClienteResponse {
    pub cliente_cpf: String,
    pub cliente_nome: String,
    pub total_dividas: usize,
    /// Totals cover only outstanding debts (ativo/vencido/inadimplente).
    pub valor_total_original: f64,
    pub valor_total_atual: f64,
    pub dividas_ativas: usize,
    pub dividas_vencidas: usize,
    pub dividas: Vec<DividaResponse>,
}

/// One boleto for `GET /api/v1/cliente/{cpf}/boletos`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BoletoResponse {
    pub id: Uuid,
    pub numero_boleto: String,
    pub dividas_ids: Vec<Uuid>,
    pub valor_total: f64,
    pub valor_parcela: f64,
    pub parcelas: i32,
    pub data_vencimento: DateTime<Utc>,
    pub linha_digitavel: String,
    pub codigo_barras: String,
    pub banco: String,
    pub status: String,
    pub url_pagamento: String,
}

/// Body for `POST /api/v1/boleto/gerar`.
#[derive(Debug, Deserialize)]
pub struct GerarBoletoRequest {
    pub cliente_cpf: String,
    pub dividas_ids: Vec<Uuid>,
    /// 1 to 5.
    pub parcelas: i32,
    pub descricao: Option<String>,
}

/// Result of a successful boleto issuance.
#[derive(Debug, Serialize, Deserialize)]
pub struct BoletoGeradoResponse {
    pub id: Uuid,
    pub numero_boleto: String,
    pub valor_total: f64,
    pub valor_parcela: f64,
    pub parcelas: i32,
    pub data_vencimento: DateTime<Utc>,
    pub linha_digitavel: String,
    pub codigo_barras: String,
    pub banco: String,
    pub url_pagamento: String,
    pub dividas_incluidas: Vec<Uuid>,
    pub message: String,
}

/// Optional body for `POST /api/v1/boleto/{boleto_id}/cancelar`.
#[derive(Debug, Default, Deserialize)]
pub struct CancelarBoletoRequest {
    pub motivo: Option<String>,
}

/// Result of a successful cancellation.
#[derive(Debug, Serialize, Deserialize)]
pub struct BoletoCanceladoResponse {
    pub boleto_id: Uuid,
    pub status: String,
    pub data_cancelamento: DateTime<Utc>,
    /// Debts released back to a due-date-derived status.
    pub dividas_restauradas: Vec<Uuid>,
    pub historico_preservado: bool,
    pub message: String,
}
