//! A small scanner for guard and action expressions.  Causality analysis
//! needs to know which ports an expression reads, and which ports an action
//! list writes, without evaluating anything.

use std::collections::BTreeSet;

use crate::utils::errors::ModalError;

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Identifier(String),
    Literal,
    Open(char),
    Close(char),
    Operator(String),
    Dot,
    Comma,
}

impl Token {
    fn is_operand(&self) -> bool {
        matches!(self, Token::Identifier(_) | Token::Literal | Token::Close(_))
    }
}

fn malformed(expression: &str, reason: &str) -> ModalError {
    ModalError::MalformedGuard {
        expression: expression.to_string(),
        reason: reason.to_string(),
    }
}

fn tokenize(expression: &str) -> Result<Vec<Token>, ModalError> {
    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Identifier(chars[start..i].iter().collect()));
        } else if c.is_ascii_digit() {
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.') {
                i += 1;
            }
            tokens.push(Token::Literal);
        } else if c == '"' {
            i += 1;
            while i < chars.len() && chars[i] != '"' {
                if chars[i] == '\\' {
                    i += 1;
                }
                i += 1;
            }
            if i >= chars.len() {
                return Err(malformed(expression, "unterminated string"));
            }
            i += 1;
            tokens.push(Token::Literal);
        } else if "([{".contains(c) {
            tokens.push(Token::Open(c));
            i += 1;
        } else if ")]}".contains(c) {
            tokens.push(Token::Close(c));
            i += 1;
        } else if c == '.' {
            tokens.push(Token::Dot);
            i += 1;
        } else if c == ',' {
            tokens.push(Token::Comma);
            i += 1;
        } else if "+-*/%^<>=!&|?:~#".contains(c) {
            let start = i;
            while i < chars.len() && "<>=!&|".contains(chars[i]) && i - start < 2 {
                i += 1;
            }
            if i == start {
                i += 1;
            }
            tokens.push(Token::Operator(chars[start..i].iter().collect()));
        } else {
            return Err(malformed(expression, &format!("unexpected character '{}'", c)));
        }
    }
    Ok(tokens)
}

fn check(expression: &str, tokens: &[Token]) -> Result<(), ModalError> {
    let mut open: Vec<char> = Vec::new();
    let mut previous: Option<&Token> = None;
    for token in tokens {
        match token {
            Token::Open(c) => open.push(*c),
            Token::Close(c) => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if open.pop() != Some(expected) {
                    return Err(malformed(expression, &format!("unbalanced '{}'", c)));
                }
            }
            Token::Identifier(_) | Token::Literal => {
                if previous.map_or(false, |previous| previous.is_operand()) {
                    return Err(malformed(expression, "missing operator between operands"));
                }
            }
            Token::Operator(operator) => {
                let unary = operator == "!" || operator == "-" || operator == "~";
                if !unary && !previous.map_or(false, |previous| previous.is_operand()) {
                    return Err(malformed(expression, &format!("operator '{}' has no left operand", operator)));
                }
            }
            Token::Dot | Token::Comma => {}
        }
        previous = Some(token);
    }
    if let Some(c) = open.pop() {
        return Err(malformed(expression, &format!("unclosed '{}'", c)));
    }
    if let Some(Token::Operator(operator)) = previous {
        return Err(malformed(expression, &format!("operator '{}' has no right operand", operator)));
    }
    Ok(())
}

/// The identifiers an expression reads.  Function and method names, and the
/// boolean literals, are not reported.  An empty expression reads nothing.
pub fn referenced_identifiers(expression: &str) -> Result<BTreeSet<String>, ModalError> {
    let tokens = tokenize(expression)?;
    check(expression, &tokens)?;
    let mut identifiers = BTreeSet::new();
    for (i, token) in tokens.iter().enumerate() {
        if let Token::Identifier(name) = token {
            let called = matches!(tokens.get(i + 1), Some(Token::Open('(')));
            let member = i > 0 && tokens[i - 1] == Token::Dot;
            if !called && !member && name != "true" && name != "false" {
                identifiers.insert(name.clone());
            }
        }
    }
    Ok(identifiers)
}

/// The port an identifier refers to.  Guards test presence with the
/// `<port>_isPresent` form.
pub fn port_of(identifier: &str) -> &str {
    identifier.strip_suffix("_isPresent").unwrap_or(identifier)
}

/// Split an action list of the form `a = expr; b = expr` into its
/// assignments.  Empty statements are skipped.
pub fn parse_assignments(actions: &str) -> Result<Vec<(String, String)>, ModalError> {
    let mut assignments = Vec::new();
    for statement in split_statements(actions) {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        let split = assignment_split(statement).ok_or_else(|| malformed(statement, "expected an assignment"))?;
        let target = statement[..split].trim();
        let value = statement[split + 1..].trim();
        let valid_target = target
            .chars()
            .next()
            .map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
            && target.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_target {
            return Err(malformed(statement, "the target of an assignment must be a name"));
        }
        if value.is_empty() {
            return Err(malformed(statement, "the assignment has no value"));
        }
        referenced_identifiers(value)?;
        assignments.push((target.to_string(), value.to_string()));
    }
    Ok(assignments)
}

fn split_statements(actions: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut depth = 0i32;
    let mut quoted = false;
    let mut start = 0;
    for (i, c) in actions.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '(' | '[' | '{' if !quoted => depth += 1,
            ')' | ']' | '}' if !quoted => depth -= 1,
            ';' if !quoted && depth == 0 => {
                statements.push(&actions[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    statements.push(&actions[start..]);
    statements
}

/// The byte offset of the `=` of an assignment, skipping comparisons.
fn assignment_split(statement: &str) -> Option<usize> {
    let bytes = statement.as_bytes();
    (0..bytes.len()).find(|&i| {
        bytes[i] == b'='
            && (i == 0 || !b"=<>!".contains(&bytes[i - 1]))
            && bytes.get(i + 1) != Some(&b'=')
    })
}
