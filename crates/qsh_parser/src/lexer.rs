//! Tokenizer for qsh command lines.
//!
//! Turns one logical line into a typed token stream, honoring quoting,
//! escaping, variable references, arithmetic and command substitution,
//! here-document markers, history designators, and comments. Variable and
//! arithmetic expansion happen here (the emitted token carries the expanded
//! value); command substitution is deferred to the parser, which owns the
//! subshell capture.

use crate::arith;
use crate::env::ShellEnv;
use crate::token::{Token, TokenKind};
use std::fmt;

/// Lexical failure with the character offset of the defect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    UnclosedQuote(char),
    UnterminatedSubstitution,
    UnterminatedArithmetic,
    BadArithmetic(String),
}

impl LexError {
    fn new(kind: LexErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LexErrorKind::UnclosedQuote(q) => {
                write!(f, "unclosed {q} quote at offset {}", self.offset)
            }
            LexErrorKind::UnterminatedSubstitution => {
                write!(f, "unterminated substitution at offset {}", self.offset)
            }
            LexErrorKind::UnterminatedArithmetic => {
                write!(f, "unterminated arithmetic expansion at offset {}", self.offset)
            }
            LexErrorKind::BadArithmetic(msg) => {
                write!(f, "bad arithmetic expression at offset {}: {msg}", self.offset)
            }
        }
    }
}

impl std::error::Error for LexError {}

fn is_operator_char(c: char) -> bool {
    matches!(c, '|' | '&' | ';' | '<' | '>')
}

/// Bytes that terminate a bare literal word.
fn ends_literal(c: char) -> bool {
    c.is_ascii_whitespace()
        || is_operator_char(c)
        || matches!(c, '#' | '"' | '\'' | '$' | '`')
}

/// Operator and redirection forms, longest first. `2>&1`-family forms are
/// redirections with no target of their own.
const OPERATOR_FORMS: &[(&str, TokenKind)] = &[
    ("2>>&1", TokenKind::Redirection),
    ("2>&1", TokenKind::Redirection),
    ("2>>", TokenKind::Redirection),
    ("2>", TokenKind::Redirection),
    ("&&", TokenKind::Operator),
    ("||", TokenKind::Operator),
    (">>", TokenKind::Redirection),
    ("<<", TokenKind::Redirection),
    ("&>", TokenKind::Redirection),
    ("|", TokenKind::Operator),
    ("&", TokenKind::Operator),
    (";", TokenKind::Operator),
    ("<", TokenKind::Redirection),
    (">", TokenKind::Redirection),
];

/// Tokenize one complete logical line (newline already stripped).
pub fn tokenize(input: &str, env: &dyn ShellEnv) -> Result<Vec<Token>, LexError> {
    let chars: Vec<char> = input.chars().collect();
    let n = chars.len();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < n {
        let c = chars[i];

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        // Comment: rest of the line is discarded.
        if c == '#' {
            break;
        }

        if let Some((form, kind)) = match_operator(&chars, i) {
            log::trace!(target: "qsh_parser::lexer", "operator {form:?} at {i}");
            tokens.push(Token::new(kind, form));
            i += form.chars().count();
            continue;
        }

        match c {
            '$' => i = lex_dollar(&chars, i, env, &mut tokens)?,
            '`' => i = lex_backtick(&chars, i, &mut tokens)?,
            '!' => i = lex_history(&chars, i, env, &mut tokens),
            '\'' => i = lex_single_quote(&chars, i, &mut tokens)?,
            '"' => i = lex_double_quote(&chars, i, &mut tokens)?,
            _ => i = lex_literal(&chars, i, &mut tokens),
        }
    }

    log::debug!(target: "qsh_parser::lexer", "{input:?} -> {} tokens", tokens.len());
    Ok(tokens)
}

fn match_operator(chars: &[char], i: usize) -> Option<(&'static str, TokenKind)> {
    for (form, kind) in OPERATOR_FORMS {
        let len = form.len(); // operator forms are pure ASCII
        if i + len <= chars.len() && chars[i..i + len].iter().collect::<String>() == *form {
            return Some((*form, *kind));
        }
    }
    None
}

/// `$`-introduced forms: command substitution, arithmetic, special
/// parameters, `${NAME}` / `${NAME:-default}`, `$NAME`, or a bare `$`.
fn lex_dollar(
    chars: &[char],
    start: usize,
    env: &dyn ShellEnv,
    tokens: &mut Vec<Token>,
) -> Result<usize, LexError> {
    let n = chars.len();
    let mut i = start + 1;

    if i >= n {
        tokens.push(Token::new(TokenKind::Literal, "$"));
        return Ok(i);
    }

    match chars[i] {
        '(' if i + 1 < n && chars[i + 1] == '(' => {
            // $((expr)): evaluated immediately, result becomes a literal.
            let (expr, end) = scan_arithmetic(chars, start)?;
            let value = arith::eval(&expr, env)
                .map_err(|e| LexError::new(LexErrorKind::BadArithmetic(e), start))?;
            tokens.push(Token::new(TokenKind::Literal, value.to_string()));
            Ok(end)
        }
        '(' => {
            let (inner, end) = scan_paren_substitution(chars, start)?;
            tokens.push(Token::new(TokenKind::CmdSub, inner));
            Ok(end)
        }
        '{' => {
            let close = chars[i + 1..]
                .iter()
                .position(|&c| c == '}')
                .map(|p| i + 1 + p)
                .ok_or_else(|| LexError::new(LexErrorKind::UnterminatedSubstitution, start))?;
            let body: String = chars[i + 1..close].iter().collect();
            let value = expand_braced(&body, env);
            tokens.push(Token::new(TokenKind::Variable, value));
            Ok(close + 1)
        }
        '?' => {
            tokens.push(Token::new(TokenKind::Variable, env.last_status().to_string()));
            Ok(i + 1)
        }
        '$' => {
            tokens.push(Token::new(TokenKind::Variable, env.shell_pid().to_string()));
            Ok(i + 1)
        }
        '!' => {
            tokens.push(Token::new(TokenKind::Variable, env.parent_pid().to_string()));
            Ok(i + 1)
        }
        c if c.is_ascii_alphabetic() || c == '_' => {
            let name_start = i;
            while i < n && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let name: String = chars[name_start..i].iter().collect();
            let value = env.get_var(&name).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Variable, value));
            Ok(i)
        }
        _ => {
            tokens.push(Token::new(TokenKind::Literal, "$"));
            Ok(i)
        }
    }
}

/// `${NAME}` / `${NAME:-default}` body expansion.
fn expand_braced(body: &str, env: &dyn ShellEnv) -> String {
    if let Some((name, default)) = body.split_once(":-") {
        match env.get_var(name) {
            Some(v) if !v.is_empty() => v,
            _ => default.to_string(),
        }
    } else {
        env.get_var(body).unwrap_or_default()
    }
}

/// Scan `$(...)`, honoring nested parentheses and backslash escapes.
/// Returns the inner text and the index one past the closing `)`.
fn scan_paren_substitution(chars: &[char], start: usize) -> Result<(String, usize), LexError> {
    let n = chars.len();
    let mut i = start + 2; // past "$("
    let mut depth = 1usize;
    let mut inner = String::new();

    while i < n {
        let c = chars[i];
        if c == '\\' && i + 1 < n {
            inner.push(c);
            inner.push(chars[i + 1]);
            i += 2;
            continue;
        }
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((inner, i + 1));
                }
            }
            _ => {}
        }
        inner.push(c);
        i += 1;
    }
    Err(LexError::new(LexErrorKind::UnterminatedSubstitution, start))
}

/// Scan `$((expr))` to its matching `))`. Returns the inner expression and
/// the index one past the final `)`.
fn scan_arithmetic(chars: &[char], start: usize) -> Result<(String, usize), LexError> {
    let n = chars.len();
    let mut i = start + 3; // past "$(("
    let mut depth = 2usize;
    let mut inner = String::new();

    while i < n {
        match chars[i] {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    // The last pushed char was the inner `)` of `))`.
                    inner.pop();
                    return Ok((inner, i + 1));
                }
            }
            _ => {}
        }
        inner.push(chars[i]);
        i += 1;
    }
    Err(LexError::new(LexErrorKind::UnterminatedArithmetic, start))
}

/// Backtick command substitution, terminated by the next unescaped backtick.
fn lex_backtick(
    chars: &[char],
    start: usize,
    tokens: &mut Vec<Token>,
) -> Result<usize, LexError> {
    let n = chars.len();
    let mut i = start + 1;
    let mut inner = String::new();

    while i < n {
        let c = chars[i];
        if c == '\\' && i + 1 < n {
            inner.push(chars[i + 1]);
            i += 2;
            continue;
        }
        if c == '`' {
            tokens.push(Token::new(TokenKind::CmdSub, inner));
            return Ok(i + 1);
        }
        inner.push(c);
        i += 1;
    }
    Err(LexError::new(LexErrorKind::UnterminatedSubstitution, start))
}

/// History designators `!!` and `!N`; anything else yields a bare `!`.
fn lex_history(
    chars: &[char],
    start: usize,
    env: &dyn ShellEnv,
    tokens: &mut Vec<Token>,
) -> usize {
    let n = chars.len();

    if start + 1 < n && chars[start + 1] == '!' {
        match env.history_last() {
            Some(cmd) => tokens.push(Token::new(TokenKind::Literal, cmd)),
            None => tokens.push(Token::new(TokenKind::Literal, "!!")),
        }
        return start + 2;
    }

    let mut i = start + 1;
    while i < n && chars[i].is_ascii_digit() {
        i += 1;
    }
    if i > start + 1 {
        let text: String = chars[start..i].iter().collect();
        let index: usize = text[1..].parse().unwrap_or(usize::MAX);
        match env.history_at(index) {
            Some(cmd) => tokens.push(Token::new(TokenKind::Literal, cmd)),
            None => tokens.push(Token::new(TokenKind::Literal, text)),
        }
        return i;
    }

    tokens.push(Token::new(TokenKind::Literal, "!"));
    start + 1
}

/// Single-quoted string: literal bytes until the closing quote.
fn lex_single_quote(
    chars: &[char],
    start: usize,
    tokens: &mut Vec<Token>,
) -> Result<usize, LexError> {
    let n = chars.len();
    let mut i = start + 1;
    let mut text = String::new();

    while i < n {
        if chars[i] == '\'' {
            tokens.push(Token::new(TokenKind::Quoted, text));
            return Ok(i + 1);
        }
        text.push(chars[i]);
        i += 1;
    }
    Err(LexError::new(LexErrorKind::UnclosedQuote('\''), start))
}

/// Double-quoted string with backslash escapes for `n t r \ " '`; any other
/// escape sequence is preserved verbatim.
fn lex_double_quote(
    chars: &[char],
    start: usize,
    tokens: &mut Vec<Token>,
) -> Result<usize, LexError> {
    let n = chars.len();
    let mut i = start + 1;
    let mut text = String::new();

    while i < n {
        let c = chars[i];
        if c == '\\' && i + 1 < n {
            let next = chars[i + 1];
            match next {
                'n' => text.push('\n'),
                't' => text.push('\t'),
                'r' => text.push('\r'),
                '\\' | '"' | '\'' => text.push(next),
                _ => {
                    text.push('\\');
                    text.push(next);
                }
            }
            i += 2;
            continue;
        }
        if c == '"' {
            tokens.push(Token::new(TokenKind::Quoted, text));
            return Ok(i + 1);
        }
        text.push(c);
        i += 1;
    }
    Err(LexError::new(LexErrorKind::UnclosedQuote('"'), start))
}

/// A bare word: bytes until the next shell-special byte. A backslash
/// escapes exactly one following byte, including quote characters.
fn lex_literal(chars: &[char], start: usize, tokens: &mut Vec<Token>) -> usize {
    let n = chars.len();
    let mut i = start;
    let mut text = String::new();

    while i < n {
        let c = chars[i];
        if c == '\\' && i + 1 < n {
            text.push(chars[i + 1]);
            i += 2;
            continue;
        }
        if ends_literal(c) {
            break;
        }
        text.push(c);
        i += 1;
    }

    if !text.is_empty() {
        tokens.push(Token::new(TokenKind::Literal, text));
    } else {
        // Lone backslash at end of line.
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::TestEnv;

    fn lex(input: &str) -> Vec<Token> {
        tokenize(input, &TestEnv::default()).expect("tokenize")
    }

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn words_and_whitespace() {
        let toks = lex("  ls   -la /tmp ");
        assert_eq!(texts(&toks), ["ls", "-la", "/tmp"]);
        assert!(toks.iter().all(|t| t.kind == TokenKind::Literal));
    }

    #[test]
    fn comment_ends_line() {
        assert_eq!(texts(&lex("echo hi # trailing")), ["echo", "hi"]);
        assert!(lex("# whole line").is_empty());
    }

    #[test]
    fn operators_longest_match() {
        let toks = lex("a && b || c | d & e ; f");
        let ops: Vec<&str> = toks
            .iter()
            .filter(|t| t.kind == TokenKind::Operator)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(ops, ["&&", "||", "|", "&", ";"]);
    }

    #[test]
    fn redirection_forms() {
        let toks = lex("cmd < in > out >> app 2> err 2>> errapp &> both << EOF");
        let redirs: Vec<&str> = toks
            .iter()
            .filter(|t| t.kind == TokenKind::Redirection)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(redirs, ["<", ">", ">>", "2>", "2>>", "&>", "<<"]);
    }

    #[test]
    fn err_to_out_has_no_target() {
        let toks = lex("cmd > f 2>&1");
        assert_eq!(toks.last().unwrap().kind, TokenKind::Redirection);
        assert_eq!(toks.last().unwrap().text, "2>&1");
    }

    #[test]
    fn digit_inside_word_is_not_redirection() {
        let toks = lex("a2>b");
        assert_eq!(texts(&toks), ["a2", ">", "b"]);
        assert_eq!(toks[1].kind, TokenKind::Redirection);
    }

    #[test]
    fn single_quotes_are_verbatim() {
        let toks = lex(r#"echo 'a $X `b` \n'"#);
        assert_eq!(toks[1].kind, TokenKind::Quoted);
        assert_eq!(toks[1].text, r"a $X `b` \n");
    }

    #[test]
    fn double_quote_escapes() {
        let toks = lex(r#"echo "tab\there\nnl \q""#);
        assert_eq!(toks[1].text, "tab\there\nnl \\q");
    }

    #[test]
    fn unclosed_quote_is_error() {
        let err = tokenize("echo 'oops", &TestEnv::default()).unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnclosedQuote('\''));
        assert_eq!(err.offset, 5);
    }

    #[test]
    fn variables_expand_to_values() {
        let mut env = TestEnv::default();
        env.vars.insert("USER".into(), "alice".into());
        let toks = tokenize("echo $USER $MISSING", &env).unwrap();
        assert_eq!(toks[1].kind, TokenKind::Variable);
        assert_eq!(toks[1].text, "alice");
        assert_eq!(toks[2].text, "");
    }

    #[test]
    fn braced_variable_with_default() {
        let mut env = TestEnv::default();
        env.vars.insert("SET".into(), "v".into());
        let toks = tokenize("echo ${SET:-d} ${UNSET:-d} ${UNSET}", &env).unwrap();
        assert_eq!(toks[1].text, "v");
        assert_eq!(toks[2].text, "d");
        assert_eq!(toks[3].text, "");
    }

    #[test]
    fn special_parameters() {
        let mut env = TestEnv::default();
        env.last_status = 42;
        let toks = tokenize("echo $? $$ $!", &env).unwrap();
        assert_eq!(toks[1].text, "42");
        assert_eq!(toks[2].text, env.shell_pid().to_string());
        assert_eq!(toks[3].text, env.parent_pid().to_string());
    }

    #[test]
    fn bare_dollar_is_literal() {
        let toks = lex("echo $ end");
        assert_eq!(toks[1].kind, TokenKind::Literal);
        assert_eq!(toks[1].text, "$");
    }

    #[test]
    fn command_substitution_nests() {
        let toks = lex("echo $(inner $(deep) tail)");
        assert_eq!(toks[1].kind, TokenKind::CmdSub);
        assert_eq!(toks[1].text, "inner $(deep) tail");
    }

    #[test]
    fn backtick_substitution() {
        let toks = lex("echo `date +%s`");
        assert_eq!(toks[1].kind, TokenKind::CmdSub);
        assert_eq!(toks[1].text, "date +%s");
    }

    #[test]
    fn unterminated_substitution_is_error() {
        let err = tokenize("echo $(oops", &TestEnv::default()).unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedSubstitution);
    }

    #[test]
    fn arithmetic_is_evaluated_inline() {
        let toks = lex("echo $((1+2))");
        assert_eq!(toks[1].kind, TokenKind::Literal);
        assert_eq!(toks[1].text, "3");
    }

    #[test]
    fn arithmetic_with_parens_and_vars() {
        let mut env = TestEnv::default();
        env.vars.insert("N".into(), "10".into());
        let toks = tokenize("echo $(( ($N + 2) * 3 ))", &env).unwrap();
        assert_eq!(toks[1].text, "36");
    }

    #[test]
    fn history_bang_bang() {
        let mut env = TestEnv::default();
        env.history = vec!["ls -l".into(), "pwd".into()];
        let toks = tokenize("!!", &env).unwrap();
        assert_eq!(texts(&toks), ["pwd"]);
    }

    #[test]
    fn history_index() {
        let mut env = TestEnv::default();
        env.history = vec!["ls -l".into(), "pwd".into()];
        let toks = tokenize("!0", &env).unwrap();
        assert_eq!(texts(&toks), ["ls -l"]);
    }

    #[test]
    fn bare_bang_is_literal() {
        let toks = lex("echo !x");
        assert_eq!(texts(&toks), ["echo", "!", "x"]);
    }

    #[test]
    fn backslash_escapes_in_words() {
        let toks = lex(r"echo a\ b qu\'ote");
        assert_eq!(texts(&toks), ["echo", "a b", "qu'ote"]);
    }
}
