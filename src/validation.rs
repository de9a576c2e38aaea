/// Input validation for Brazilian documents and contact data
///
/// CPF validation follows the official check-digit algorithm: two verifier
/// digits computed over the first nine/ten digits with descending weights,
/// mod 11. Formatting helpers accept CPFs with or without punctuation.
use regex::Regex;

/// Strips everything except ASCII digits from a CPF.
pub fn clean_cpf(cpf: &str) -> String {
    cpf.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Validates a CPF using the official check-digit algorithm.
///
/// Accepts formatted (`654.235.116-74`) or bare (`65423511674`) input.
/// Rejects CPFs with all digits equal (e.g. `111.111.111-11`), which pass
/// the arithmetic but are not issued.
pub fn validate_cpf(cpf: &str) -> bool {
    let digits: Vec<u32> = clean_cpf(cpf).chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.len() != 11 {
        return false;
    }

    if digits.iter().all(|&d| d == digits[0]) {
        return false;
    }

    let check_digit = |len: usize| -> u32 {
        let sum: u32 = digits[..len]
            .iter()
            .enumerate()
            .map(|(i, &d)| d * (len as u32 + 1 - i as u32))
            .sum();
        let rest = sum % 11;
        if rest < 2 {
            0
        } else {
            11 - rest
        }
    };

    digits[9] == check_digit(9) && digits[10] == check_digit(10)
}

/// Formats a valid CPF as `000.000.000-00`.
///
/// Returns the input unchanged when it does not hold 11 digits.
pub fn format_cpf(cpf: &str) -> String {
    let cpf = clean_cpf(cpf);
    if cpf.len() != 11 {
        return cpf;
    }
    format!("{}.{}.{}-{}", &cpf[..3], &cpf[3..6], &cpf[6..9], &cpf[9..])
}

/// Masks a CPF for log output: `654.***.***-74`.
///
/// CPFs are personal identifiers; full values never reach the logs.
pub fn mask_cpf(cpf: &str) -> String {
    let cpf = clean_cpf(cpf);
    if cpf.len() != 11 {
        return "***".to_string();
    }
    format!("{}.***.***-{}", &cpf[..3], &cpf[9..])
}

/// Basic email format validation.
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 5 {
        return false;
    }

    let email_regex = Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("invalid email regex");

    email_regex.is_match(email)
}
