//! Spoken-arithmetic evaluation.
//!
//! Translates word operators into symbols, restricts the input to a strict
//! arithmetic character set, and evaluates it with a minimal
//! recursive-descent parser. Nothing here ever delegates to a
//! general-purpose interpreter; the grammar is numbers, the four basic
//! operators, unary sign, and parentheses.

use anyhow::{bail, Result};

/// Characters allowed to reach the evaluator.
const SAFE_CHARS: &str = "0123456789+-*/. ()";

/// Word operators translated to symbols, longest phrase first.
const WORD_OPERATORS: [(&str, &str); 6] = [
    ("multiplied by", "*"),
    ("divided by", "/"),
    ("plus", "+"),
    ("minus", "-"),
    ("times", "*"),
    ("over", "/"),
];

/// Replaces spoken operator words with their symbols.
///
/// # Parameters
/// * `text` - Utterance fragment with the command trigger already removed.
///
/// # Returns
/// The text with every occurrence of a word operator replaced.
pub fn translate_operators(text: &str) -> String {
    let mut expression = text.to_string();
    for (word, symbol) in WORD_OPERATORS {
        expression = expression.replace(word, symbol);
    }
    expression
}

/// Discards every character outside the arithmetic allow-list.
///
/// # Parameters
/// * `expression` - Candidate expression text.
///
/// # Returns
/// The expression reduced to digits, operators, dots, parens, and spaces.
pub fn sanitize(expression: &str) -> String {
    expression
        .chars()
        .filter(|c| SAFE_CHARS.contains(*c))
        .collect()
}

/// Reports whether a sanitized expression carries any numeric content.
///
/// Operator residue without digits (e.g. the "/" left over from
/// "one divided by zero") counts as no problem at all; the caller asks
/// for clarification instead of attempting evaluation.
pub fn has_operand(expression: &str) -> bool {
    expression.chars().any(|c| c.is_ascii_digit())
}

/// Evaluates a sanitized arithmetic expression.
///
/// # Details
/// Recursive descent over the grammar:
///
/// ```text
/// expr   := term (('+' | '-') term)*
/// term   := factor (('*' | '/') factor)*
/// factor := ('+' | '-') factor | '(' expr ')' | number
/// ```
///
/// Standard operator precedence falls out of the level split.
///
/// # Arguments
/// * `expression` - Sanitized expression text.
///
/// # Returns
/// * `Ok(f64)` - The computed value.
///
/// # Errors
/// Returns an error on malformed input, trailing garbage, unbalanced
/// parentheses, or division by zero.
pub fn evaluate(expression: &str) -> Result<f64> {
    let mut parser = Parser::new(expression);
    let value = parser.parse_expr()?;
    parser.skip_spaces();
    if !parser.at_end() {
        bail!("unexpected trailing input at offset {}", parser.pos);
    }
    Ok(value)
}

/// Presents a computed value the way it should be spoken.
///
/// Whole-number-valued floats are rendered without a fractional part;
/// everything else is rendered as-is.
pub fn format_result(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Minimal recursive-descent parser over ASCII arithmetic.
struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    fn parse_expr(&mut self) -> Result<f64> {
        let mut value = self.parse_term()?;
        loop {
            self.skip_spaces();
            match self.peek() {
                Some(b'+') => {
                    self.bump();
                    value += self.parse_term()?;
                }
                Some(b'-') => {
                    self.bump();
                    value -= self.parse_term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn parse_term(&mut self) -> Result<f64> {
        let mut value = self.parse_factor()?;
        loop {
            self.skip_spaces();
            match self.peek() {
                Some(b'*') => {
                    self.bump();
                    value *= self.parse_factor()?;
                }
                Some(b'/') => {
                    self.bump();
                    let divisor = self.parse_factor()?;
                    if divisor == 0.0 {
                        bail!("division by zero");
                    }
                    value /= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    fn parse_factor(&mut self) -> Result<f64> {
        self.skip_spaces();
        match self.peek() {
            Some(b'+') => {
                self.bump();
                self.parse_factor()
            }
            Some(b'-') => {
                self.bump();
                Ok(-self.parse_factor()?)
            }
            Some(b'(') => {
                self.bump();
                let value = self.parse_expr()?;
                self.skip_spaces();
                if self.peek() == Some(b')') {
                    self.bump();
                    Ok(value)
                } else {
                    bail!("expected closing parenthesis at offset {}", self.pos);
                }
            }
            Some(c) if c.is_ascii_digit() || c == b'.' => self.parse_number(),
            Some(c) => bail!("unexpected character '{}' at offset {}", c as char, self.pos),
            None => bail!("unexpected end of expression"),
        }
    }

    fn parse_number(&mut self) -> Result<f64> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == b'.' {
                self.bump();
            } else {
                break;
            }
        }
        let literal = std::str::from_utf8(&self.input[start..self.pos]).unwrap_or_default();
        literal
            .parse::<f64>()
            .map_err(|_| anyhow::anyhow!("malformed number '{}' at offset {}", literal, start))
    }

    fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.bump();
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_covers_all_word_operators() {
        assert_eq!(translate_operators("10 plus 5"), "10 + 5");
        assert_eq!(translate_operators("8 divided by 2"), "8 / 2");
        assert_eq!(translate_operators("3 multiplied by 4"), "3 * 4");
        assert_eq!(translate_operators("9 over 3"), "9 / 3");
    }

    #[test]
    fn sanitize_strips_disallowed_characters() {
        assert_eq!(sanitize("what's 2 + 2?"), " 2 + 2");
        assert_eq!(sanitize("(1 + 2) * 3"), "(1 + 2) * 3");
    }

    #[test]
    fn operand_detection_requires_digits() {
        assert!(!has_operand(" / "));
        assert!(!has_operand(""));
        assert!(has_operand("10 + 5"));
    }

    #[test]
    fn precedence_is_standard() {
        assert_eq!(evaluate("10 + 5 * 2").unwrap(), 20.0);
        assert_eq!(evaluate("(10 + 5) * 2").unwrap(), 30.0);
        assert_eq!(evaluate("10 - 4 / 2").unwrap(), 8.0);
    }

    #[test]
    fn unary_sign_is_accepted() {
        assert_eq!(evaluate("-3 + 5").unwrap(), 2.0);
        assert_eq!(evaluate("2 * -4").unwrap(), -8.0);
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert!(evaluate("1 / 0").is_err());
        assert!(evaluate("1 / (2 - 2)").is_err());
    }

    #[test]
    fn malformed_input_is_an_error() {
        assert!(evaluate("1 +").is_err());
        assert!(evaluate("(1 + 2").is_err());
        assert!(evaluate("1 2 3").is_err());
        assert!(evaluate("").is_err());
    }

    #[test]
    fn whole_floats_present_as_integers() {
        assert_eq!(format_result(20.0), "20");
        assert_eq!(format_result(2.5), "2.5");
        assert_eq!(format_result(-4.0), "-4");
    }
}
