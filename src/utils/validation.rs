use crate::error::{Error, Result};
use crate::models::question::{NewOption, NewQuestion, MAX_OPTIONS, MIN_OPTIONS};

/// Exactly four ASCII digits.
pub fn is_valid_pin(pin: &str) -> bool {
    pin.len() == 4 && pin.bytes().all(|b| b.is_ascii_digit())
}

/// Trims the value and turns blank strings into `None`.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Checks the shape every stored question must have and normalizes blanks.
///
/// Options arrive in authored order, each flagged correct or not; exactly
/// one flag must be set.
pub fn validate_question(
    statement: Option<String>,
    audio_url: Option<String>,
    options: Vec<NewOption>,
) -> Result<NewQuestion> {
    let statement = non_blank(statement);
    let audio_url = non_blank(audio_url);
    if statement.is_none() && audio_url.is_none() {
        return Err(Error::Invalid(
            "A question needs a statement or an audio clip".to_string(),
        ));
    }
    if options.len() < MIN_OPTIONS || options.len() > MAX_OPTIONS {
        return Err(Error::Invalid(format!(
            "A question needs between {} and {} options",
            MIN_OPTIONS, MAX_OPTIONS
        )));
    }
    if options.iter().filter(|o| o.is_correct).count() != 1 {
        return Err(Error::Invalid(
            "Exactly one option must be marked correct".to_string(),
        ));
    }
    let mut normalized = Vec::with_capacity(options.len());
    for (idx, option) in options.into_iter().enumerate() {
        let image_url = option.image_url.trim().to_string();
        if image_url.is_empty() {
            return Err(Error::Invalid(format!("Option {} has no image", idx + 1)));
        }
        normalized.push(NewOption {
            image_url,
            is_correct: option.is_correct,
        });
    }
    Ok(NewQuestion {
        audio_url,
        statement,
        options: normalized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(n: usize, correct: &[usize]) -> Vec<NewOption> {
        (0..n)
            .map(|i| NewOption {
                image_url: format!("https://cdn.test/{}.png", i),
                is_correct: correct.contains(&i),
            })
            .collect()
    }

    #[test]
    fn pin_shape() {
        assert!(is_valid_pin("0042"));
        assert!(!is_valid_pin("123"));
        assert!(!is_valid_pin("12a4"));
        assert!(!is_valid_pin("١٢٣٤"));
    }

    #[test]
    fn question_keeps_authored_flags() {
        let q =
            validate_question(Some(" Cat? ".into()), Some("".into()), options(3, &[1])).unwrap();
        let flags: Vec<bool> = q.options.iter().map(|o| o.is_correct).collect();
        assert_eq!(flags, vec![false, true, false]);
        assert_eq!(q.statement.as_deref(), Some("Cat?"));
        assert_eq!(q.audio_url, None);
    }

    #[test]
    fn question_needs_exactly_one_correct() {
        assert!(validate_question(Some("x".into()), None, options(3, &[])).is_err());
        assert!(validate_question(Some("x".into()), None, options(3, &[0, 2])).is_err());
    }

    #[test]
    fn question_rejects_bad_shapes() {
        assert!(validate_question(Some("x".into()), None, options(1, &[0])).is_err());
        assert!(validate_question(Some("x".into()), None, options(5, &[0])).is_err());
        assert!(validate_question(Some("  ".into()), None, options(2, &[0])).is_err());
        let mut blank = options(2, &[0]);
        blank[1].image_url = " ".into();
        assert!(validate_question(None, Some("a.mp3".into()), blank).is_err());
    }
}
