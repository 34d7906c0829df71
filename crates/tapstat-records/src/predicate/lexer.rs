use std::{iter::Peekable, str::CharIndices};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    Text(String),
    Ident(String),
    LParen,
    RParen,
    Amp,
    Pipe,
    Tilde,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
}

/// Splits a condition into tokens.
///
/// An identifier is a maximal run of alphanumeric characters and
/// `word_chars`, so `loss` never matches inside `loss_abs`.
pub(crate) fn tokenize(input: &str, word_chars: &[char]) -> Result<Vec<Token>, String> {
    let is_word = |c: char| c.is_alphanumeric() || word_chars.contains(&c);
    let mut chars = input.char_indices().peekable();
    let mut tokens = vec![];

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c.is_ascii_digit() || (c == '.' && next_is_digit(input, start)) {
            tokens.push(number(input, &mut chars)?);
            continue;
        }
        if is_word(c) {
            let mut end = start;
            while let Some(&(i, c)) = chars.peek() {
                if !is_word(c) {
                    break;
                }
                end = i + c.len_utf8();
                chars.next();
            }
            tokens.push(Token::Ident(input[start..end].to_owned()));
            continue;
        }

        chars.next();
        let token = match c {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '&' => Token::Amp,
            '|' => Token::Pipe,
            '~' => Token::Tilde,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '\'' | '"' => text(input, start, c, &mut chars)?,
            '=' | '!' | '<' | '>' => {
                let followed_by_eq = chars.next_if(|&(_, c)| c == '=').is_some();
                match (c, followed_by_eq) {
                    ('=', true) => Token::Eq,
                    ('!', true) => Token::Ne,
                    ('<', false) => Token::Lt,
                    ('<', true) => Token::Le,
                    ('>', false) => Token::Gt,
                    ('>', true) => Token::Ge,
                    _ => return Err(format!("unexpected character `{c}` at offset {start}")),
                }
            }
            _ => return Err(format!("unexpected character `{c}` at offset {start}")),
        };
        tokens.push(token);
    }

    Ok(tokens)
}

fn next_is_digit(input: &str, dot: usize) -> bool {
    input[dot + 1..].starts_with(|c: char| c.is_ascii_digit())
}

fn number(input: &str, chars: &mut Peekable<CharIndices<'_>>) -> Result<Token, String> {
    let Some(&(start, _)) = chars.peek() else {
        return Err("expected a number".to_owned());
    };
    let mut end = start;
    let mut prev = ' ';
    while let Some(&(i, c)) = chars.peek() {
        let exponent_sign = (c == '+' || c == '-') && matches!(prev, 'e' | 'E');
        if !(c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || exponent_sign) {
            break;
        }
        prev = c;
        end = i + 1;
        chars.next();
    }
    let raw = &input[start..end];
    raw.parse()
        .map(Token::Number)
        .map_err(|_| format!("invalid number `{raw}`"))
}

fn text(
    input: &str,
    start: usize,
    quote: char,
    chars: &mut Peekable<CharIndices<'_>>,
) -> Result<Token, String> {
    for (i, c) in chars.by_ref() {
        if c == quote {
            return Ok(Token::Text(input[start + 1..i].to_owned()));
        }
    }
    Err(format!("unterminated string starting at offset {start}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idents(tokens: &[Token]) -> Vec<&str> {
        tokens
            .iter()
            .filter_map(|t| match t {
                Token::Ident(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_identifiers_are_whole_tokens() {
        let tokens = tokenize("(loss_abs > 1) & (loss < 2)", &['_']).unwrap();
        assert_eq!(idents(&tokens), ["loss_abs", "loss"]);
    }

    #[test]
    fn test_word_chars_are_configurable() {
        assert!(tokenize("loss_abs", &[]).is_err());
        let tokens = tokenize("tap.len", &['.']).unwrap();
        assert_eq!(idents(&tokens), ["tap.len"]);
    }

    #[test]
    fn test_numbers_and_operators() {
        let tokens = tokenize("x>=1.5e3!=.5", &['_']).unwrap();
        assert_eq!(
            tokens,
            [
                Token::Ident("x".into()),
                Token::Ge,
                Token::Number(1500.0),
                Token::Ne,
                Token::Number(0.5),
            ]
        );
    }

    #[test]
    fn test_strings_and_errors() {
        assert_eq!(
            tokenize("name == 'rat 7'", &[]).unwrap()[2],
            Token::Text("rat 7".into())
        );
        assert!(tokenize("x = 1", &[]).is_err());
        assert!(tokenize("x == 'open", &[]).is_err());
        assert!(tokenize("x # 1", &[]).is_err());
    }
}
