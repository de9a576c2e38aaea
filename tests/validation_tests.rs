/// Unit tests for CPF and email validation as exposed to the HTTP layer.
use cobranca_api::validation::{format_cpf, is_valid_email, mask_cpf, validate_cpf};

#[cfg(test)]
mod cpf_tests {
    use super::*;

    #[test]
    fn accepts_formatted_and_bare_input() {
        assert!(validate_cpf("654.235.116-74"));
        assert!(validate_cpf("65423511674"));
        assert!(validate_cpf("654 235 116 74"));
    }

    #[test]
    fn rejects_bad_check_digits() {
        assert!(!validate_cpf("654.235.116-47"));
        assert!(!validate_cpf("654.235.116-00"));
        assert!(!validate_cpf("123.456.789-10"));
    }

    #[test]
    fn rejects_degenerate_sequences() {
        assert!(!validate_cpf("111.111.111-11"));
        assert!(!validate_cpf("00000000000"));
        assert!(!validate_cpf(""));
        assert!(!validate_cpf("not-a-cpf"));
    }

    #[test]
    fn formats_for_display() {
        assert_eq!(format_cpf("65423511674"), "654.235.116-74");
    }

    #[test]
    fn masks_for_logs() {
        // Middle digits never reach the logs
        assert_eq!(mask_cpf("65423511674"), "654.***.***-74");
        assert_eq!(mask_cpf("garbage"), "***");
    }
}

#[cfg(test)]
mod email_tests {
    use super::*;

    #[test]
    fn valid_emails() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("cliente.cobranca@empresa.com.br"));
        assert!(is_valid_email("user+tag@example.co.uk"));
    }

    #[test]
    fn invalid_emails() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("userexample.com"));
        assert!(!is_valid_email("user@examplecom"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user @example.com"));
    }
}
