/// Use-case layer: authentication, customer lookups and the boleto
/// negotiation/cancellation state machine.
///
/// The two mutating operations (issue, cancel) run their multi-row writes
/// inside a single Postgres transaction. Debt rows are locked with
/// `FOR UPDATE` and the issuance path additionally rechecks status in the
/// `UPDATE ... WHERE` clause, so concurrent negotiations of the same debt
/// resolve to one success and one `Conflict`. Audit records are written after
/// commit and are best-effort: a failed audit insert is logged but never
/// rolls back a committed business transaction.
use crate::config::Config;
use crate::domain::{
    derivar_status, dias_atraso, validar_parcelamento, valor_atualizado, DadosBancarios,
    StatusBoleto, StatusDivida, BOLETO_VENCIMENTO_DIAS,
};
use crate::errors::{AppError, ResultExt};
use crate::models::*;
use crate::validation::{clean_cpf, format_cpf, mask_cpf, validate_cpf};
use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{Duration, NaiveDate, Utc};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

fn url_pagamento(numero_boleto: &str) -> String {
    format!(
        "https://api.banco.com/boleto/{}",
        numero_boleto.replace([' ', '.'], "")
    )
}

/// Projects a debt row into its API view, re-deriving status and amount.
///
/// Outstanding debts get status from the due date and amount from the accrual
/// rule. A negotiated debt keeps its override and freezes accrual at the
/// negotiation timestamp (`updated_at`); a paid debt reports its original
/// amount and accrues nothing further.
fn divida_response(d: &Divida, hoje: NaiveDate, carencia_dias: i64) -> DividaResponse {
    let stored = StatusDivida::parse(&d.status);

    let (status, corte) = match stored {
        Some(StatusDivida::Negociado) => (
            StatusDivida::Negociado,
            d.updated_at.map(|t| t.date_naive()).unwrap_or(hoje),
        ),
        Some(StatusDivida::Pago) => (StatusDivida::Pago, d.data_vencimento),
        _ => (derivar_status(d.data_vencimento, hoje, carencia_dias), hoje),
    };

    let atraso = dias_atraso(d.data_vencimento, corte);
    let valor_atual = valor_atualizado(&d.valor_original, &d.juros_mes, &d.multa, atraso);

    DividaResponse {
        id: d.id,
        tipo: d.tipo.clone(),
        descricao: d.descricao.clone(),
        valor_original: d.valor_original.to_f64().unwrap_or(0.0),
        valor_atual: valor_atual.to_f64().unwrap_or(0.0),
        data_vencimento: d.data_vencimento,
        dias_atraso: dias_atraso(d.data_vencimento, hoje),
        status: status.as_str().to_string(),
        juros_mes: d.juros_mes.to_f64().unwrap_or(0.0),
        multa: d.multa.to_f64().unwrap_or(0.0),
    }
}

fn boleto_response(b: &Boleto) -> BoletoResponse {
    BoletoResponse {
        id: b.id,
        numero_boleto: b.numero_boleto.clone(),
        dividas_ids: b.dividas_ids.clone(),
        valor_total: b.valor_total.to_f64().unwrap_or(0.0),
        valor_parcela: b.valor_parcela.to_f64().unwrap_or(0.0),
        parcelas: b.parcelas,
        data_vencimento: b.data_vencimento,
        linha_digitavel: b.linha_digitavel.clone(),
        codigo_barras: b.codigo_barras.clone(),
        banco: b.banco.clone(),
        status: b.status.clone(),
        url_pagamento: url_pagamento(&b.numero_boleto),
    }
}

// ============ Customer lookups ============

pub struct ClienteService {
    pool: PgPool,
    carencia_dias: i64,
}

impl ClienteService {
    pub fn new(pool: PgPool, config: &Config) -> Self {
        Self {
            pool,
            carencia_dias: config.carencia_dias,
        }
    }

    async fn buscar_cliente(&self, cpf: &str) -> Result<Cliente, AppError> {
        let cpf_limpo = clean_cpf(cpf);

        sqlx::query_as::<_, Cliente>("SELECT * FROM clientes WHERE cpf = $1")
            .bind(&cpf_limpo)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load cliente")?
            .ok_or_else(|| {
                AppError::NotFound(format!("Cliente com CPF {} não encontrado", format_cpf(cpf)))
            })
    }

    pub async fn buscar_por_cpf(&self, cpf: &str) -> Result<ClienteResponse, AppError> {
        let cliente = self.buscar_cliente(cpf).await?;

        Ok(ClienteResponse {
            id: cliente.id,
            cpf: format_cpf(&cliente.cpf),
            nome: cliente.nome,
            email: cliente.email,
            telefone: cliente.telefone,
            endereco: cliente.endereco,
            score_credito: cliente.score_credito,
            status: cliente.status,
            created_at: cliente.created_at,
            updated_at: cliente.updated_at,
        })
    }

    pub async fn listar_dividas(&self, cpf: &str) -> Result<DividasClienteResponse, AppError> {
        let cliente = self.buscar_cliente(cpf).await?;

        let dividas = sqlx::query_as::<_, Divida>(
            "SELECT * FROM dividas WHERE cliente_id = $1 ORDER BY data_vencimento ASC",
        )
        .bind(cliente.id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load dividas")?;

        let hoje = Utc::now().date_naive();
        let mut respostas = Vec::with_capacity(dividas.len());
        let mut valor_total_original = 0.0;
        let mut valor_total_atual = 0.0;
        let mut dividas_ativas = 0;
        let mut dividas_vencidas = 0;

        for d in &dividas {
            let resp = divida_response(d, hoje, self.carencia_dias);

            match resp.status.as_str() {
                "ativo" => {
                    dividas_ativas += 1;
                    valor_total_original += resp.valor_original;
                    valor_total_atual += resp.valor_atual;
                }
                "vencido" | "inadimplente" => {
                    dividas_vencidas += 1;
                    valor_total_original += resp.valor_original;
                    valor_total_atual += resp.valor_atual;
                }
                _ => {}
            }

            respostas.push(resp);
        }

        Ok(DividasClienteResponse {
            cliente_cpf: format_cpf(&cliente.cpf),
            cliente_nome: cliente.nome,
            total_dividas: respostas.len(),
            valor_total_original,
            valor_total_atual,
            dividas_ativas,
            dividas_vencidas,
            dividas: respostas,
        })
    }

    pub async fn listar_boletos(&self, cpf: &str) -> Result<Vec<BoletoResponse>, AppError> {
        let cliente = self.buscar_cliente(cpf).await?;

        let boletos = sqlx::query_as::<_, Boleto>(
            "SELECT * FROM boletos WHERE cliente_id = $1 ORDER BY created_at DESC",
        )
        .bind(cliente.id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load boletos")?;

        Ok(boletos.iter().map(boleto_response).collect())
    }
}

// ============ Authentication ============

pub struct AuthService {
    pool: PgPool,
    config: Config,
}

impl AuthService {
    pub fn new(pool: PgPool, config: &Config) -> Self {
        Self {
            pool,
            config: config.clone(),
        }
    }

    /// Validates credentials against the usuarios table and issues a bearer
    /// token. Every failure path collapses into the same 401.
    pub async fn autenticar(&self, username: &str, password: &str) -> Result<TokenResponse, AppError> {
        let username = username.trim();

        if username.len() < 3 || password.len() < 6 {
            tracing::warn!("Login rejected: malformed credentials for '{}'", username);
            return Err(AppError::Unauthorized("Credenciais inválidas".to_string()));
        }

        let usuario = sqlx::query_as::<_, Usuario>(
            "SELECT * FROM usuarios WHERE (username = $1 OR email = $1) AND ativo = TRUE",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load usuario")?;

        let usuario = match usuario {
            Some(u) if crate::auth::verify_password(password, &u.senha_hash) => u,
            _ => {
                tracing::warn!("Login rejected: invalid credentials for '{}'", username);
                return Err(AppError::Unauthorized("Credenciais inválidas".to_string()));
            }
        };

        let (access_token, expires_in) = crate::auth::create_access_token(
            &usuario.id.to_string(),
            &usuario.username,
            &self.config.jwt_secret,
            self.config.jwt_expiracao_minutos,
        )?;

        tracing::info!("Login succeeded for '{}'", usuario.username);

        Ok(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
            expires_in,
        })
    }

    /// Seeds the operator account from config on startup. No-op when the
    /// username already exists.
    pub async fn seed_admin(&self) -> Result<(), AppError> {
        let result = sqlx::query(
            "INSERT INTO usuarios (id, username, email, senha_hash, ativo)
             VALUES ($1, $2, $3, $4, TRUE)
             ON CONFLICT (username) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(&self.config.admin_username)
        .bind(format!("{}@cobranca.local", self.config.admin_username))
        .bind(crate::auth::hash_password(&self.config.admin_password))
        .execute(&self.pool)
        .await
        .context("Failed to seed admin user")?;

        if result.rows_affected() > 0 {
            tracing::info!("Seeded operator account '{}'", self.config.admin_username);
        }

        Ok(())
    }
}

// ============ Boleto negotiation / cancellation ============

pub struct BoletoService {
    pool: PgPool,
    carencia_dias: i64,
}

impl BoletoService {
    pub fn new(pool: PgPool, config: &Config) -> Self {
        Self {
            pool,
            carencia_dias: config.carencia_dias,
        }
    }

    /// Issues a boleto over a set of the customer's debts.
    ///
    /// All referenced debts must be outstanding (ativo/vencido/inadimplente)
    /// and free of an active boleto. The boleto insert and the debt locks
    /// happen in one transaction; the conditional `UPDATE` recount detects a
    /// concurrent negotiation and rolls the whole operation back.
    pub async fn gerar(
        &self,
        req: &GerarBoletoRequest,
        usuario: &str,
    ) -> Result<BoletoGeradoResponse, AppError> {
        tracing::info!(
            cpf = %mask_cpf(&req.cliente_cpf),
            dividas = req.dividas_ids.len(),
            parcelas = req.parcelas,
            "Iniciando geração de boleto"
        );

        if !validate_cpf(&req.cliente_cpf) {
            return Err(AppError::BadRequest("CPF inválido".to_string()));
        }
        if req.dividas_ids.is_empty() {
            return Err(AppError::BadRequest(
                "Deve incluir pelo menos uma dívida".to_string(),
            ));
        }

        // A debt listed twice still enters the negotiation once.
        let mut dividas_ids = req.dividas_ids.clone();
        dividas_ids.sort_unstable();
        dividas_ids.dedup();

        let cpf_limpo = clean_cpf(&req.cliente_cpf);
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let cliente = sqlx::query_as::<_, Cliente>("SELECT * FROM clientes WHERE cpf = $1")
            .bind(&cpf_limpo)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to load cliente")?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Cliente com CPF {} não encontrado",
                    format_cpf(&req.cliente_cpf)
                ))
            })?;

        // Row locks serialize concurrent negotiations of the same debts.
        let dividas = sqlx::query_as::<_, Divida>(
            "SELECT * FROM dividas WHERE id = ANY($1) AND cliente_id = $2 FOR UPDATE",
        )
        .bind(&dividas_ids)
        .bind(cliente.id)
        .fetch_all(&mut *tx)
        .await
        .context("Failed to load dividas")?;

        if dividas.len() != dividas_ids.len() {
            return Err(AppError::NotFound(
                "Uma ou mais dívidas não encontradas para este cliente".to_string(),
            ));
        }

        let bloqueadas: Vec<String> = dividas
            .iter()
            .filter(|d| {
                d.boleto_id.is_some()
                    || !StatusDivida::parse(&d.status).is_some_and(|s| s.negociavel())
            })
            .map(|d| d.id.to_string())
            .collect();

        if !bloqueadas.is_empty() {
            return Err(AppError::Conflict(format!(
                "Dívidas não podem ser negociadas (já pagas ou com boleto ativo): {}",
                bloqueadas.join(", ")
            )));
        }

        let hoje = Utc::now().date_naive();
        let valor_total = dividas.iter().fold(BigDecimal::from(0), |acc, d| {
            acc + valor_atualizado(
                &d.valor_original,
                &d.juros_mes,
                &d.multa,
                dias_atraso(d.data_vencimento, hoje),
            )
        });

        let valor_parcela = validar_parcelamento(&valor_total, req.parcelas)?;

        let dados = DadosBancarios::gerar();
        let boleto_id = Uuid::new_v4();
        let agora = Utc::now();
        let data_vencimento = agora + Duration::days(BOLETO_VENCIMENTO_DIAS);

        sqlx::query(
            "INSERT INTO boletos (
                id, numero_boleto, cliente_id, dividas_ids, valor_total, valor_parcela,
                parcelas, banco, agencia, conta, linha_digitavel, codigo_barras,
                data_vencimento, status, descricao, created_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16)",
        )
        .bind(boleto_id)
        .bind(&dados.numero_boleto)
        .bind(cliente.id)
        .bind(&dividas_ids)
        .bind(&valor_total)
        .bind(&valor_parcela)
        .bind(req.parcelas)
        .bind(&dados.banco)
        .bind(&dados.agencia)
        .bind(&dados.conta)
        .bind(&dados.linha_digitavel)
        .bind(&dados.codigo_barras)
        .bind(data_vencimento)
        .bind(StatusBoleto::Ativo.as_str())
        .bind(&req.descricao)
        .bind(agora)
        .execute(&mut *tx)
        .await
        .context("Failed to insert boleto")?;

        // Optimistic recheck: the WHERE clause repeats the negotiability
        // predicate, so anything negotiated since the SELECT drops out of the
        // affected count and fails the whole transaction.
        let locked = sqlx::query(
            "UPDATE dividas
             SET status = 'negociado', boleto_id = $1, updated_at = $2
             WHERE id = ANY($3)
               AND status IN ('ativo', 'vencido', 'inadimplente')
               AND boleto_id IS NULL",
        )
        .bind(boleto_id)
        .bind(agora)
        .bind(&dividas_ids)
        .execute(&mut *tx)
        .await
        .context("Failed to lock dividas")?;

        if locked.rows_affected() != dividas_ids.len() as u64 {
            return Err(AppError::Conflict(
                "Uma ou mais dívidas foram negociadas por outra operação".to_string(),
            ));
        }

        tx.commit().await.context("Failed to commit negotiation")?;

        self.registrar_auditoria(
            "geracao_boleto",
            Some(boleto_id),
            &dividas_ids,
            usuario,
            json!({
                "boleto_numero": dados.numero_boleto,
                "valor_total": valor_total.to_f64(),
                "parcelas": req.parcelas,
            }),
        )
        .await;

        metrics::counter!("boletos_gerados_total").increment(1);
        tracing::info!(
            boleto_id = %boleto_id,
            dividas = dividas_ids.len(),
            "Boleto gerado com sucesso"
        );

        Ok(BoletoGeradoResponse {
            id: boleto_id,
            numero_boleto: dados.numero_boleto.clone(),
            valor_total: valor_total.to_f64().unwrap_or(0.0),
            valor_parcela: valor_parcela.to_f64().unwrap_or(0.0),
            parcelas: req.parcelas,
            data_vencimento,
            linha_digitavel: dados.linha_digitavel,
            codigo_barras: dados.codigo_barras,
            banco: dados.banco,
            url_pagamento: url_pagamento(&dados.numero_boleto),
            dividas_incluidas: dividas_ids,
            message: format!(
                "Boleto gerado com sucesso! {} parcela(s) de R$ {:.2}",
                req.parcelas,
                valor_parcela.to_f64().unwrap_or(0.0)
            ),
        })
    }

    /// CPF of the customer owning a boleto, when it exists. Lets the HTTP
    /// layer drop the cached views before the cancellation runs.
    pub async fn cpf_do_dono(&self, boleto_id: Uuid) -> Result<Option<String>, AppError> {
        sqlx::query_scalar::<_, String>(
            "SELECT c.cpf FROM boletos b JOIN clientes c ON c.id = b.cliente_id WHERE b.id = $1",
        )
        .bind(boleto_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load dono do boleto")
    }

    /// Cancels an active boleto and restores its debts.
    ///
    /// Each debt's status is re-derived from its due date relative to now
    /// rather than restored from a stored snapshot, and the boleto lock is
    /// cleared in the same transaction so the debts are immediately
    /// negotiable again. Returns the response plus the owning customer's CPF
    /// for cache invalidation.
    pub async fn cancelar(
        &self,
        boleto_id: Uuid,
        usuario: &str,
        motivo: Option<&str>,
    ) -> Result<(BoletoCanceladoResponse, String), AppError> {
        tracing::info!(boleto_id = %boleto_id, "Iniciando cancelamento de boleto");

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let boleto = sqlx::query_as::<_, Boleto>("SELECT * FROM boletos WHERE id = $1 FOR UPDATE")
            .bind(boleto_id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to load boleto")?
            .ok_or_else(|| AppError::NotFound("Boleto não encontrado".to_string()))?;

        match StatusBoleto::parse(&boleto.status) {
            Some(StatusBoleto::Ativo) => {}
            Some(StatusBoleto::Cancelado) => {
                return Err(AppError::Conflict("Boleto já está cancelado".to_string()));
            }
            Some(StatusBoleto::Pago) => {
                return Err(AppError::Conflict(
                    "Não é possível cancelar boleto já pago".to_string(),
                ));
            }
            None => {
                return Err(AppError::InternalError(format!(
                    "Boleto {} com status desconhecido '{}'",
                    boleto_id, boleto.status
                )));
            }
        }

        let dividas =
            sqlx::query_as::<_, Divida>("SELECT * FROM dividas WHERE boleto_id = $1 FOR UPDATE")
                .bind(boleto_id)
                .fetch_all(&mut *tx)
                .await
                .context("Failed to load dividas do boleto")?;

        let agora = Utc::now();
        let hoje = agora.date_naive();
        let mut restauradas = Vec::with_capacity(dividas.len());

        for d in &dividas {
            let status = derivar_status(d.data_vencimento, hoje, self.carencia_dias);

            sqlx::query(
                "UPDATE dividas SET status = $1, boleto_id = NULL, updated_at = $2 WHERE id = $3",
            )
            .bind(status.as_str())
            .bind(agora)
            .bind(d.id)
            .execute(&mut *tx)
            .await
            .context("Failed to restore divida")?;

            restauradas.push(d.id);
        }

        sqlx::query(
            "UPDATE boletos
             SET status = 'cancelado', data_cancelamento = $1, cancelado_por = $2, updated_at = $1
             WHERE id = $3",
        )
        .bind(agora)
        .bind(usuario)
        .bind(boleto_id)
        .execute(&mut *tx)
        .await
        .context("Failed to cancel boleto")?;

        // Resolved before commit: once the cancellation is committed nothing
        // on this path can fail and skip the invalidation or audit steps.
        let cpf_cliente = sqlx::query_scalar::<_, String>("SELECT cpf FROM clientes WHERE id = $1")
            .bind(boleto.cliente_id)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to load cliente do boleto")?;

        tx.commit().await.context("Failed to commit cancellation")?;

        self.registrar_auditoria(
            "cancelamento_boleto",
            Some(boleto_id),
            &restauradas,
            usuario,
            json!({
                "boleto_numero": boleto.numero_boleto,
                "valor_total": boleto.valor_total.to_f64(),
                "motivo": motivo.unwrap_or("cancelamento_solicitado"),
            }),
        )
        .await;

        metrics::counter!("boletos_cancelados_total").increment(1);
        tracing::info!(
            boleto_id = %boleto_id,
            dividas_restauradas = restauradas.len(),
            usuario = usuario,
            "Boleto cancelado com sucesso"
        );

        let total = restauradas.len();
        Ok((
            BoletoCanceladoResponse {
                boleto_id,
                status: StatusBoleto::Cancelado.as_str().to_string(),
                data_cancelamento: agora,
                dividas_restauradas: restauradas,
                historico_preservado: true,
                message: format!(
                    "Boleto cancelado com sucesso! {} dívida(s) restaurada(s) ao estado original.",
                    total
                ),
            },
            cpf_cliente,
        ))
    }

    /// Append-only audit write, after the business transaction commits.
    /// Business consistency wins over audit completeness: failures are
    /// logged at error level and swallowed.
    async fn registrar_auditoria(
        &self,
        acao: &str,
        boleto_id: Option<Uuid>,
        dividas: &[Uuid],
        usuario: &str,
        detalhes: serde_json::Value,
    ) {
        let result = sqlx::query(
            "INSERT INTO auditoria (id, acao, boleto_id, dividas, usuario, detalhes)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4())
        .bind(acao)
        .bind(boleto_id)
        .bind(dividas)
        .bind(usuario)
        .bind(&detalhes)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::error!(
                acao = acao,
                boleto_id = ?boleto_id,
                "Audit write failed (business transaction already committed): {}",
                e
            );
        }
    }
}
