/// Core billing domain rules: debt status derivation, interest accrual,
/// installment validation and pseudo-bank field generation.
///
/// Status and amount are always *derived* from the stored due date and the
/// original amount instead of persisted, so reads cannot drift from the
/// source values over time. Only the explicit overrides (`negociado`,
/// `pago`) live in the database, applied while a boleto holds the debt.
use crate::errors::AppError;
use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use chrono::NaiveDate;
use rand::Rng;

/// Minimum installment value: R$ 50,00.
pub const PARCELA_MINIMA: i64 = 50;

/// Maximum number of installments per boleto.
pub const PARCELAS_MAX: i32 = 5;

/// Days between boleto emission and its due date.
pub const BOLETO_VENCIMENTO_DIAS: i64 = 7;

/// Lifecycle status of a debt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusDivida {
    /// Not yet due.
    Ativo,
    /// Past due, within the grace window.
    Vencido,
    /// Past due beyond the grace window.
    Inadimplente,
    /// Locked under an active boleto.
    Negociado,
    /// Settled.
    Pago,
}

impl StatusDivida {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusDivida::Ativo => "ativo",
            StatusDivida::Vencido => "vencido",
            StatusDivida::Inadimplente => "inadimplente",
            StatusDivida::Negociado => "negociado",
            StatusDivida::Pago => "pago",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ativo" => Some(StatusDivida::Ativo),
            "vencido" => Some(StatusDivida::Vencido),
            "inadimplente" => Some(StatusDivida::Inadimplente),
            "negociado" => Some(StatusDivida::Negociado),
            "pago" => Some(StatusDivida::Pago),
            _ => None,
        }
    }

    /// A debt can enter a new negotiation only while it is outstanding and
    /// not already locked under an active boleto.
    pub fn negociavel(&self) -> bool {
        matches!(
            self,
            StatusDivida::Ativo | StatusDivida::Vencido | StatusDivida::Inadimplente
        )
    }
}

/// Lifecycle status of a boleto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBoleto {
    Ativo,
    Pago,
    Cancelado,
}

impl StatusBoleto {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusBoleto::Ativo => "ativo",
            StatusBoleto::Pago => "pago",
            StatusBoleto::Cancelado => "cancelado",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ativo" => Some(StatusBoleto::Ativo),
            "pago" => Some(StatusBoleto::Pago),
            "cancelado" => Some(StatusBoleto::Cancelado),
            _ => None,
        }
    }
}

/// Derives the outstanding status of a debt from its due date.
///
/// `carencia_dias` is the grace window separating `vencido` from
/// `inadimplente` (30 days in production). This is the single source of
/// truth for restoration after a cancellation: the pre-negotiation status is
/// recomputed here, never read back from a stored snapshot.
pub fn derivar_status(data_vencimento: NaiveDate, hoje: NaiveDate, carencia_dias: i64) -> StatusDivida {
    let dias_atraso = (hoje - data_vencimento).num_days();

    if dias_atraso <= 0 {
        StatusDivida::Ativo
    } else if dias_atraso <= carencia_dias {
        StatusDivida::Vencido
    } else {
        StatusDivida::Inadimplente
    }
}

/// Days a debt is overdue as of `hoje`; zero when not yet due.
pub fn dias_atraso(data_vencimento: NaiveDate, hoje: NaiveDate) -> i64 {
    (hoje - data_vencimento).num_days().max(0)
}

/// Current amount of a debt, recomputed on every read.
///
/// While not overdue the amount equals `valor_original`. Once overdue a flat
/// penalty (`multa`) plus a simple monthly rate (`juros_mes`) pro-rated by
/// `dias_atraso / 30` are applied over the original amount. Rounded half-up
/// to centavos.
pub fn valor_atualizado(
    valor_original: &BigDecimal,
    juros_mes: &BigDecimal,
    multa: &BigDecimal,
    dias_atraso: i64,
) -> BigDecimal {
    if dias_atraso <= 0 {
        return valor_original.with_scale_round(2, RoundingMode::HalfUp);
    }

    let meses = BigDecimal::from(dias_atraso) / BigDecimal::from(30);
    let fator = BigDecimal::from(1) + multa.clone() + juros_mes.clone() * meses;

    (valor_original * fator).with_scale_round(2, RoundingMode::HalfUp)
}

/// Validates the installment plan for a negotiation and returns the value of
/// each installment.
///
/// Rules: 1 to 5 installments, each worth at least R$ 50,00. The error for a
/// sub-minimum installment names the maximum viable count so the caller can
/// retry without guessing.
pub fn validar_parcelamento(valor_total: &BigDecimal, parcelas: i32) -> Result<BigDecimal, AppError> {
    if !(1..=PARCELAS_MAX).contains(&parcelas) {
        return Err(AppError::BadRequest(
            "Número de parcelas deve ser entre 1 e 5".to_string(),
        ));
    }

    // The minimum check runs on the exact quotient; rounding half-up first
    // would let 49.998 slip through as 50.00.
    let bruto = valor_total / BigDecimal::from(parcelas);
    let valor_parcela = bruto.with_scale_round(2, RoundingMode::HalfUp);

    if bruto < BigDecimal::from(PARCELA_MINIMA) {
        let max_parcelas = (valor_total.to_f64().unwrap_or(0.0) / PARCELA_MINIMA as f64) as i64;
        return Err(AppError::BadRequest(format!(
            "Valor da parcela (R$ {:.2}) é menor que R$ 50,00. Máximo de {} parcela(s) para este valor",
            bruto.to_f64().unwrap_or(0.0),
            max_parcelas
        )));
    }

    Ok(valor_parcela)
}

fn digitos(rng: &mut impl Rng, n: usize) -> String {
    (0..n).map(|_| char::from(b'0' + rng.random_range(0..10u8))).collect()
}

/// Generated pseudo-bank fields for a boleto.
///
/// The numbers are well-formed but carry no cryptographic or bank meaning;
/// real issuance would come from a bank integration.
#[derive(Debug, Clone)]
pub struct DadosBancarios {
    pub numero_boleto: String,
    pub linha_digitavel: String,
    /// 44 digits, as in the FEBRABAN layout.
    pub codigo_barras: String,
    pub banco: String,
    pub agencia: String,
    pub conta: String,
}

impl DadosBancarios {
    pub fn gerar() -> Self {
        const BANCOS: [&str; 6] = ["001", "033", "104", "237", "341", "399"];
        let mut rng = rand::rng();

        let bloco = |rng: &mut rand::rngs::ThreadRng| -> String {
            format!(
                "{}.{} {}.{} {}.{} {} {}",
                digitos(rng, 5),
                digitos(rng, 5),
                digitos(rng, 5),
                digitos(rng, 6),
                digitos(rng, 5),
                digitos(rng, 6),
                rng.random_range(1..=9u8),
                digitos(rng, 14),
            )
        };

        Self {
            numero_boleto: bloco(&mut rng),
            linha_digitavel: bloco(&mut rng),
            codigo_barras: digitos(&mut rng, 44),
            banco: BANCOS[rng.random_range(0..BANCOS.len())].to_string(),
            agencia: digitos(&mut rng, 4),
            conta: format!("{}-{}", digitos(&mut rng, 5), rng.random_range(0..=9u8)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn codigo_barras_has_44_digits() {
        let dados = DadosBancarios::gerar();
        assert_eq!(dados.codigo_barras.len(), 44);
        assert!(dados.codigo_barras.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn numero_boleto_shape() {
        let dados = DadosBancarios::gerar();
        // five dotted blocks, a check digit and a trailing code
        assert_eq!(dados.numero_boleto.split(' ').count(), 5);
        assert_eq!(dados.agencia.len(), 4);
        assert_eq!(dados.conta.len(), 7);
    }

    #[test]
    fn parcela_rounding_matches_worked_example() {
        let total = BigDecimal::from_str("9898.61").unwrap();
        let parcela = validar_parcelamento(&total, 3).unwrap();
        assert_eq!(parcela, BigDecimal::from_str("3299.54").unwrap());
    }
}
