/// Property-based tests using proptest
/// Tests invariants that should hold for all inputs
use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::NaiveDate;
use cobranca_api::domain::{derivar_status, validar_parcelamento, valor_atualizado, StatusDivida};
use cobranca_api::validation::{clean_cpf, format_cpf, validate_cpf};
use proptest::prelude::*;
use std::str::FromStr;

/// Computes one CPF check digit over the preceding digits.
fn cpf_check_digit(digits: &[u32]) -> u32 {
    let len = digits.len() as u32;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, &d)| d * (len + 1 - i as u32))
        .sum();
    let rest = sum % 11;
    if rest < 2 {
        0
    } else {
        11 - rest
    }
}

proptest! {
    #[test]
    fn cpf_validation_never_panics(cpf in "\\PC*") {
        let _ = validate_cpf(&cpf);
    }

    // Any 9-digit base completed with the official check digits must
    // validate, except the all-equal sequences which are explicitly banned.
    #[test]
    fn constructed_cpfs_validate(base in proptest::collection::vec(0u32..10, 9)) {
        let mut digits = base.clone();
        digits.push(cpf_check_digit(&digits));
        digits.push(cpf_check_digit(&digits));

        let cpf: String = digits.iter().map(|d| char::from(b'0' + *d as u8)).collect();
        let all_equal = base.iter().all(|&d| d == base[0]);

        prop_assert_eq!(validate_cpf(&cpf), !all_equal);
    }

    #[test]
    fn formatting_preserves_digits(base in proptest::collection::vec(0u32..10, 9)) {
        let mut digits = base;
        digits.push(cpf_check_digit(&digits));
        digits.push(cpf_check_digit(&digits));
        let cpf: String = digits.iter().map(|d| char::from(b'0' + *d as u8)).collect();

        let formatted = format_cpf(&cpf);
        prop_assert_eq!(clean_cpf(&formatted), cpf);
    }
}

proptest! {
    // derive is total over a wide range of date offsets and its result is
    // consistent with the overdue-days definition.
    #[test]
    fn status_derivation_is_consistent(offset in -3650i64..3650, carencia in 1i64..365) {
        let hoje = NaiveDate::from_ymd_opt(2025, 8, 27).unwrap();
        let vencimento = hoje - chrono::Duration::days(offset);

        let status = derivar_status(vencimento, hoje, carencia);

        if offset <= 0 {
            prop_assert_eq!(status, StatusDivida::Ativo);
        } else if offset <= carencia {
            prop_assert_eq!(status, StatusDivida::Vencido);
        } else {
            prop_assert_eq!(status, StatusDivida::Inadimplente);
        }
    }

    // Accrual never decreases the amount and is monotone in overdue days.
    #[test]
    fn accrual_is_monotone(cents in 1_00i64..1_000_000_00, dias in 0i64..1000) {
        let original = BigDecimal::from(cents) / BigDecimal::from(100);
        let juros = BigDecimal::from_str("0.02").unwrap();
        let multa = BigDecimal::from_str("0.02").unwrap();

        let hoje_val = valor_atualizado(&original, &juros, &multa, dias);
        let amanha_val = valor_atualizado(&original, &juros, &multa, dias + 1);

        prop_assert!(hoje_val >= original.with_scale(2));
        prop_assert!(amanha_val >= hoje_val);
    }
}

proptest! {
    // For any plan that passes validation, the installments reassemble the
    // total within rounding slack (half a centavo per installment).
    #[test]
    fn installments_reassemble_total(cents in 250_00i64..100_000_00, parcelas in 1i32..=5) {
        let total = BigDecimal::from(cents) / BigDecimal::from(100);

        match validar_parcelamento(&total, parcelas) {
            Ok(parcela) => {
                let reassembled = parcela.to_f64().unwrap() * parcelas as f64;
                let total_f = total.to_f64().unwrap();
                prop_assert!((reassembled - total_f).abs() <= 0.005 * parcelas as f64 + 1e-9);
                prop_assert!(parcela >= BigDecimal::from(50));
            }
            Err(_) => {
                // Only the minimum-value rule can fail in this range.
                let total_f = total.to_f64().unwrap();
                prop_assert!((total_f / parcelas as f64) < 50.0);
            }
        }
    }
}
