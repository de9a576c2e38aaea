/// Unit tests for the billing domain rules: status derivation, interest
/// accrual and installment validation.
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use cobranca_api::domain::{
    derivar_status, dias_atraso, validar_parcelamento, valor_atualizado, StatusBoleto,
    StatusDivida,
};
use cobranca_api::errors::AppError;
use std::str::FromStr;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

#[cfg(test)]
mod status_derivation_tests {
    use super::*;

    const CARENCIA: i64 = 30;

    #[test]
    fn future_due_date_is_ativo() {
        let hoje = date(2025, 8, 27);
        assert_eq!(
            derivar_status(date(2025, 12, 31), hoje, CARENCIA),
            StatusDivida::Ativo
        );
    }

    #[test]
    fn due_today_is_ativo() {
        let hoje = date(2025, 8, 27);
        assert_eq!(derivar_status(hoje, hoje, CARENCIA), StatusDivida::Ativo);
    }

    #[test]
    fn overdue_within_grace_is_vencido() {
        let hoje = date(2025, 8, 27);
        // 1 day overdue
        assert_eq!(
            derivar_status(date(2025, 8, 26), hoje, CARENCIA),
            StatusDivida::Vencido
        );
        // exactly at the grace boundary (30 days)
        assert_eq!(
            derivar_status(date(2025, 7, 28), hoje, CARENCIA),
            StatusDivida::Vencido
        );
    }

    #[test]
    fn overdue_past_grace_is_inadimplente() {
        let hoje = date(2025, 8, 27);
        // 31 days overdue
        assert_eq!(
            derivar_status(date(2025, 7, 27), hoje, CARENCIA),
            StatusDivida::Inadimplente
        );
        // far past due
        assert_eq!(
            derivar_status(date(2025, 6, 1), hoje, CARENCIA),
            StatusDivida::Inadimplente
        );
    }

    #[test]
    fn dias_atraso_clamps_at_zero() {
        let hoje = date(2025, 8, 27);
        assert_eq!(dias_atraso(date(2025, 12, 31), hoje), 0);
        assert_eq!(dias_atraso(hoje, hoje), 0);
        assert_eq!(dias_atraso(date(2025, 8, 17), hoje), 10);
    }

    #[test]
    fn only_outstanding_statuses_are_negotiable() {
        assert!(StatusDivida::Ativo.negociavel());
        assert!(StatusDivida::Vencido.negociavel());
        assert!(StatusDivida::Inadimplente.negociavel());
        assert!(!StatusDivida::Negociado.negociavel());
        assert!(!StatusDivida::Pago.negociavel());
    }

    #[test]
    fn status_string_round_trip() {
        for s in [
            StatusDivida::Ativo,
            StatusDivida::Vencido,
            StatusDivida::Inadimplente,
            StatusDivida::Negociado,
            StatusDivida::Pago,
        ] {
            assert_eq!(StatusDivida::parse(s.as_str()), Some(s));
        }
        assert_eq!(StatusDivida::parse("desconhecido"), None);

        for s in [StatusBoleto::Ativo, StatusBoleto::Pago, StatusBoleto::Cancelado] {
            assert_eq!(StatusBoleto::parse(s.as_str()), Some(s));
        }
    }
}

#[cfg(test)]
mod accrual_tests {
    use super::*;

    #[test]
    fn not_overdue_keeps_original_amount() {
        let valor = valor_atualizado(&dec("100.00"), &dec("0.02"), &dec("0.02"), 0);
        assert_eq!(valor, dec("100.00"));
    }

    #[test]
    fn one_month_overdue_applies_penalty_and_one_month_interest() {
        // 100 * (1 + 0.02 + 0.02 * 30/30) = 104.00
        let valor = valor_atualizado(&dec("100.00"), &dec("0.02"), &dec("0.02"), 30);
        assert_eq!(valor, dec("104.00"));
    }

    #[test]
    fn interest_is_prorated_by_days() {
        // 100 * (1 + 0.02 + 0.02 * 15/30) = 103.00
        let valor = valor_atualizado(&dec("100.00"), &dec("0.02"), &dec("0.02"), 15);
        assert_eq!(valor, dec("103.00"));
    }

    #[test]
    fn two_months_overdue_doubles_interest_not_penalty() {
        // 100 * (1 + 0.02 + 0.02 * 60/30) = 106.00
        let valor = valor_atualizado(&dec("100.00"), &dec("0.02"), &dec("0.02"), 60);
        assert_eq!(valor, dec("106.00"));
    }

    #[test]
    fn accrual_rounds_to_centavos() {
        // 333.33 * (1 + 0.02 + 0.02) = 346.6632 -> 346.66
        let valor = valor_atualizado(&dec("333.33"), &dec("0.02"), &dec("0.02"), 30);
        assert_eq!(valor, dec("346.66"));
    }
}

#[cfg(test)]
mod installment_tests {
    use super::*;

    #[test]
    fn worked_example_three_installments() {
        // 3 overdue debts totaling R$ 9,898.61 current
        let parcela = validar_parcelamento(&dec("9898.61"), 3).unwrap();
        assert_eq!(parcela, dec("3299.54"));
    }

    #[test]
    fn single_installment_equals_total() {
        assert_eq!(validar_parcelamento(&dec("150.00"), 1).unwrap(), dec("150.00"));
    }

    #[test]
    fn installment_count_out_of_range_rejected() {
        for parcelas in [0, -1, 6, 100] {
            match validar_parcelamento(&dec("1000.00"), parcelas) {
                Err(AppError::BadRequest(msg)) => {
                    assert!(msg.contains("entre 1 e 5"), "unexpected message: {}", msg)
                }
                other => panic!("expected BadRequest, got {:?}", other.map(|v| v.to_string())),
            }
        }
    }

    #[test]
    fn sub_minimum_installment_rejected_with_max_hint() {
        // 100 / 3 = 33.33 < 50; at most 2 installments fit
        match validar_parcelamento(&dec("100.00"), 3) {
            Err(AppError::BadRequest(msg)) => {
                assert!(msg.contains("R$ 50,00"), "unexpected message: {}", msg);
                assert!(msg.contains("2 parcela(s)"), "unexpected message: {}", msg);
            }
            other => panic!("expected BadRequest, got {:?}", other.map(|v| v.to_string())),
        }
    }

    #[test]
    fn exactly_minimum_installment_accepted() {
        assert_eq!(validar_parcelamento(&dec("250.00"), 5).unwrap(), dec("50.00"));
    }

    #[test]
    fn just_below_minimum_rejected() {
        assert!(validar_parcelamento(&dec("249.99"), 5).is_err());
    }
}
