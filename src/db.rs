use sqlx::{postgres::PgPoolOptions, PgPool};

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Creates the schema when missing. Statements are idempotent so startup
    /// is safe against an already-provisioned database.
    pub async fn init_schema(&self) -> anyhow::Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS clientes (
                id UUID PRIMARY KEY,
                cpf TEXT NOT NULL UNIQUE,
                nome TEXT NOT NULL,
                email TEXT NOT NULL,
                telefone TEXT,
                endereco JSONB,
                score_credito INT,
                status TEXT NOT NULL DEFAULT 'ativo',
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS dividas (
                id UUID PRIMARY KEY,
                cliente_id UUID NOT NULL REFERENCES clientes(id),
                tipo TEXT NOT NULL DEFAULT 'outros',
                descricao TEXT NOT NULL DEFAULT '',
                valor_original NUMERIC(14,2) NOT NULL,
                juros_mes NUMERIC(8,4) NOT NULL DEFAULT 0.02,
                multa NUMERIC(8,4) NOT NULL DEFAULT 0.02,
                data_vencimento DATE NOT NULL,
                status TEXT NOT NULL DEFAULT 'ativo',
                boleto_id UUID,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS boletos (
                id UUID PRIMARY KEY,
                numero_boleto TEXT NOT NULL UNIQUE,
                cliente_id UUID NOT NULL REFERENCES clientes(id),
                dividas_ids UUID[] NOT NULL,
                valor_total NUMERIC(14,2) NOT NULL,
                valor_parcela NUMERIC(14,2) NOT NULL,
                parcelas INT NOT NULL,
                banco TEXT NOT NULL,
                agencia TEXT NOT NULL,
                conta TEXT NOT NULL,
                linha_digitavel TEXT NOT NULL,
                codigo_barras TEXT NOT NULL,
                data_vencimento TIMESTAMPTZ NOT NULL,
                status TEXT NOT NULL DEFAULT 'ativo',
                descricao TEXT,
                data_cancelamento TIMESTAMPTZ,
                cancelado_por TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ
            )
            "#,
            // Append-only: no UPDATE or DELETE ever touches this table.
            r#"
            CREATE TABLE IF NOT EXISTS auditoria (
                id UUID PRIMARY KEY,
                acao TEXT NOT NULL,
                boleto_id UUID,
                dividas UUID[],
                usuario TEXT NOT NULL,
                detalhes JSONB,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS usuarios (
                id UUID PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                senha_hash TEXT NOT NULL,
                ativo BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_dividas_cliente ON dividas(cliente_id)",
            "CREATE INDEX IF NOT EXISTS idx_dividas_boleto ON dividas(boleto_id)",
            "CREATE INDEX IF NOT EXISTS idx_boletos_cliente ON boletos(cliente_id)",
            "CREATE INDEX IF NOT EXISTS idx_auditoria_boleto ON auditoria(boleto_id)",
        ];

        for stmt in statements {
            sqlx::query(stmt).execute(&self.pool).await?;
        }

        tracing::info!("Database schema verified");
        Ok(())
    }
}
