//! Command-chain parser.
//!
//! Consumes the token stream and produces a singly-linked chain of command
//! nodes joined by chain operators, each carrying an argument vector and a
//! list of redirections. Leading `NAME=VALUE` assignments are lifted into
//! the variable store; a line that is nothing but assignments yields no
//! chain at all. Literal arguments get tilde and pathname expansion here;
//! command substitutions are captured through the `ShellEnv` seam and
//! appended as single arguments.

use crate::env::ShellEnv;
use crate::lexer::{tokenize, LexError};
use crate::token::{Token, TokenKind};
use crate::{MAX_ARGS, MAX_REDIRECTIONS};
use std::fmt;

/// Chain operator joining a command node to the next one. `None` covers
/// both `;` and end-of-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainOp {
    #[default]
    None,
    Pipe,
    And,
    Or,
    Background,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirKind {
    InFile,
    OutFile,
    AppendFile,
    ErrFile,
    ErrAppendFile,
    ErrToOut,
    BothOut,
    HereDoc,
}

impl RedirKind {
    /// True when a following word token names the redirection target.
    pub fn takes_target(self) -> bool {
        !matches!(self, RedirKind::ErrToOut)
    }

    pub fn is_input(self) -> bool {
        matches!(self, RedirKind::InFile | RedirKind::HereDoc)
    }
}

/// One redirection directive. For `HereDoc` the target is the delimiter,
/// read at execute time; for `ErrToOut` the target is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub kind: RedirKind,
    pub target: String,
}

/// A node of the command chain.
#[derive(Debug, Default)]
pub struct Command {
    /// Canonical command name; always equals `argv[0]`.
    pub cmd: String,
    pub argv: Vec<String>,
    pub redirs: Vec<Redirection>,
    pub op: ChainOp,
    pub next: Option<Box<Command>>,
}

impl Command {
    /// Stages of the pipeline starting at this node (itself included).
    pub fn pipeline_stages(&self) -> Vec<&Command> {
        let mut stages = vec![self];
        let mut cur = self;
        while cur.op == ChainOp::Pipe {
            let next = cur.next.as_deref().expect("pipe node always has a next");
            stages.push(next);
            cur = next;
        }
        stages
    }

    /// Render the chain as `a | b | c` for job listings.
    pub fn pipeline_summary(&self) -> String {
        self.pipeline_stages()
            .iter()
            .map(|c| c.cmd.as_str())
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Lex(LexError),
    MissingRedirTarget(String),
    DanglingOperator(String),
    EmptyCommand,
    TooManyArgs,
    TooManyRedirections,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Lex(e) => write!(f, "{e}"),
            ParseError::MissingRedirTarget(op) => {
                write!(f, "syntax error: `{op}` without a target")
            }
            ParseError::DanglingOperator(op) => {
                write!(f, "syntax error: `{op}` without a following command")
            }
            ParseError::EmptyCommand => write!(f, "syntax error: empty command"),
            ParseError::TooManyArgs => {
                write!(f, "too many arguments (limit {MAX_ARGS})")
            }
            ParseError::TooManyRedirections => {
                write!(f, "too many redirections (limit {MAX_REDIRECTIONS})")
            }
        }
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError::Lex(e)
    }
}

/// Parse one logical line. `Ok(None)` means there is nothing to execute:
/// the line was empty, comment-only, or pure variable assignments.
pub fn parse_line(
    line: &str,
    env: &mut dyn ShellEnv,
) -> Result<Option<Box<Command>>, ParseError> {
    let tokens = tokenize(line, env)?;
    parse_tokens(&tokens, env)
}

pub fn parse_tokens(
    tokens: &[Token],
    env: &mut dyn ShellEnv,
) -> Result<Option<Box<Command>>, ParseError> {
    let mut idx = 0;

    // Assignment prefix: NAME=VALUE literals before the command word.
    while idx < tokens.len() {
        let tok = &tokens[idx];
        if tok.kind != TokenKind::Literal {
            break;
        }
        match split_assignment(&tok.text) {
            Some((name, value)) => {
                log::debug!(target: "qsh_parser::parser", "assignment {name}={value}");
                env.set_var(name, value);
                idx += 1;
            }
            None => break,
        }
    }
    if idx == tokens.len() {
        return Ok(None);
    }

    let mut nodes: Vec<Command> = vec![Command::default()];

    while idx < tokens.len() {
        let tok = &tokens[idx];
        let node = nodes.last_mut().expect("at least one node");
        match tok.kind {
            TokenKind::Literal => {
                let word = expand_tilde(&tok.text, env);
                for arg in expand_glob(&word) {
                    push_arg(node, arg)?;
                }
            }
            TokenKind::Quoted => push_arg(node, tok.text.clone())?,
            TokenKind::Variable => {
                // An unset variable expands to nothing at all.
                if !tok.text.is_empty() {
                    push_arg(node, tok.text.clone())?;
                }
            }
            TokenKind::CmdSub => {
                let (output, status) = env.capture_output(&tok.text);
                log::debug!(
                    target: "qsh_parser::parser",
                    "command substitution exited {status}"
                );
                let trimmed = output.trim_end_matches('\n');
                if !trimmed.is_empty() {
                    push_arg(node, trimmed.to_string())?;
                }
            }
            TokenKind::Redirection => {
                let kind = redir_kind(&tok.text);
                if node.redirs.len() >= MAX_REDIRECTIONS {
                    return Err(ParseError::TooManyRedirections);
                }
                let target = if kind.takes_target() {
                    idx += 1;
                    match tokens.get(idx) {
                        Some(t) if t.is_word() => {
                            if kind == RedirKind::HereDoc || t.kind != TokenKind::Literal {
                                t.text.clone()
                            } else {
                                expand_tilde(&t.text, env)
                            }
                        }
                        _ => return Err(ParseError::MissingRedirTarget(tok.text.clone())),
                    }
                } else {
                    String::new()
                };
                node.redirs.push(Redirection { kind, target });
            }
            TokenKind::Operator => {
                node.op = chain_op(&tok.text);
                nodes.push(Command::default());
            }
        }
        idx += 1;
    }

    finish_chain(nodes)
}

/// Validate node boundaries, drop a harmless trailing empty node left by
/// `;` or `&`, and link the chain back-to-front.
fn finish_chain(mut nodes: Vec<Command>) -> Result<Option<Box<Command>>, ParseError> {
    if nodes.last().is_some_and(|n| n.argv.is_empty() && n.redirs.is_empty()) {
        nodes.pop();
        match nodes.last() {
            None => return Ok(None),
            Some(prev) => match prev.op {
                ChainOp::None | ChainOp::Background => {}
                ChainOp::Pipe => return Err(ParseError::DanglingOperator("|".into())),
                ChainOp::And => return Err(ParseError::DanglingOperator("&&".into())),
                ChainOp::Or => return Err(ParseError::DanglingOperator("||".into())),
            },
        }
    }

    for node in &nodes {
        if node.argv.is_empty() {
            return Err(ParseError::EmptyCommand);
        }
    }

    let mut chain: Option<Box<Command>> = None;
    for mut node in nodes.into_iter().rev() {
        node.next = chain;
        chain = Some(Box::new(node));
    }
    Ok(chain)
}

fn push_arg(node: &mut Command, arg: String) -> Result<(), ParseError> {
    if node.argv.len() >= MAX_ARGS {
        return Err(ParseError::TooManyArgs);
    }
    if node.argv.is_empty() {
        node.cmd = arg.clone();
    }
    node.argv.push(arg);
    Ok(())
}

/// `NAME=VALUE` with a well-formed variable name.
fn split_assignment(text: &str) -> Option<(&str, &str)> {
    let (name, value) = text.split_once('=')?;
    let mut chars = name.chars();
    let first = chars.next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some((name, value))
}

fn chain_op(text: &str) -> ChainOp {
    match text {
        "|" => ChainOp::Pipe,
        "&&" => ChainOp::And,
        "||" => ChainOp::Or,
        "&" => ChainOp::Background,
        _ => ChainOp::None, // `;`
    }
}

fn redir_kind(text: &str) -> RedirKind {
    match text {
        "<" => RedirKind::InFile,
        ">" => RedirKind::OutFile,
        ">>" => RedirKind::AppendFile,
        "2>" => RedirKind::ErrFile,
        "2>>" => RedirKind::ErrAppendFile,
        "2>&1" | "2>>&1" => RedirKind::ErrToOut,
        "&>" => RedirKind::BothOut,
        "<<" => RedirKind::HereDoc,
        _ => unreachable!("lexer emits only known redirection forms"),
    }
}

/// Expand a leading `~` or `~user` against the environment; an unknown
/// user leaves the word untouched.
fn expand_tilde(word: &str, env: &dyn ShellEnv) -> String {
    let Some(rest) = word.strip_prefix('~') else {
        return word.to_string();
    };
    let (user, tail) = match rest.find('/') {
        Some(pos) => (&rest[..pos], &rest[pos..]),
        None => (rest, ""),
    };
    let user = if user.is_empty() { None } else { Some(user) };
    match env.home_dir(user) {
        Some(home) => format!("{home}{tail}"),
        None => word.to_string(),
    }
}

/// Pathname expansion. A pattern that matches nothing (or fails to
/// compile) is kept verbatim.
fn expand_glob(word: &str) -> Vec<String> {
    if !word.contains(['*', '?', '[']) {
        return vec![word.to_string()];
    }
    match glob::glob(word) {
        Ok(paths) => {
            let matches: Vec<String> = paths
                .filter_map(Result::ok)
                .map(|p| p.to_string_lossy().into_owned())
                .collect();
            if matches.is_empty() {
                vec![word.to_string()]
            } else {
                matches
            }
        }
        Err(_) => vec![word.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::TestEnv;

    fn parse(line: &str) -> Option<Box<Command>> {
        parse_line(line, &mut TestEnv::default()).expect("parse")
    }

    fn parse_err(line: &str) -> ParseError {
        parse_line(line, &mut TestEnv::default()).expect_err("expected parse error")
    }

    #[test]
    fn simple_command() {
        let chain = parse("ls -la /tmp").unwrap();
        assert_eq!(chain.cmd, "ls");
        assert_eq!(chain.argv, ["ls", "-la", "/tmp"]);
        assert_eq!(chain.op, ChainOp::None);
        assert!(chain.next.is_none());
    }

    #[test]
    fn argv0_always_equals_cmd() {
        let mut cur = parse("a 1 | b 2 && c 3");
        while let Some(node) = cur {
            assert_eq!(node.argv[0], node.cmd);
            cur = node.next;
        }
    }

    #[test]
    fn chain_operators() {
        let chain = parse("a | b && c || d ; e & f").unwrap();
        let ops: Vec<ChainOp> = {
            let mut ops = Vec::new();
            let mut cur = Some(&*chain);
            while let Some(n) = cur {
                ops.push(n.op);
                cur = n.next.as_deref();
            }
            ops
        };
        assert_eq!(
            ops,
            [
                ChainOp::Pipe,
                ChainOp::And,
                ChainOp::Or,
                ChainOp::None,
                ChainOp::Background,
                ChainOp::None,
            ]
        );
    }

    #[test]
    fn pipeline_stage_collection() {
        let chain = parse("a | b | c > out").unwrap();
        let stages = chain.pipeline_stages();
        assert_eq!(stages.len(), 3);
        assert_eq!(chain.pipeline_summary(), "a | b | c");
        assert_eq!(stages[2].redirs[0].kind, RedirKind::OutFile);
    }

    #[test]
    fn redirections_in_order() {
        let chain = parse("cmd < in > out 2> err").unwrap();
        let kinds: Vec<RedirKind> = chain.redirs.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            [RedirKind::InFile, RedirKind::OutFile, RedirKind::ErrFile]
        );
        assert_eq!(chain.redirs[1].target, "out");
    }

    #[test]
    fn err_to_out_and_both() {
        let chain = parse("cmd > f 2>&1").unwrap();
        assert_eq!(chain.redirs[1].kind, RedirKind::ErrToOut);
        assert_eq!(chain.redirs[1].target, "");

        let chain = parse("cmd &> all").unwrap();
        assert_eq!(chain.redirs[0].kind, RedirKind::BothOut);
        assert_eq!(chain.redirs[0].target, "all");
    }

    #[test]
    fn heredoc_target_is_delimiter() {
        let chain = parse("cat << EOF").unwrap();
        assert_eq!(chain.redirs[0].kind, RedirKind::HereDoc);
        assert_eq!(chain.redirs[0].target, "EOF");
    }

    #[test]
    fn missing_redirection_target() {
        assert!(matches!(
            parse_err("echo >"),
            ParseError::MissingRedirTarget(op) if op == ">"
        ));
        assert!(matches!(
            parse_err("echo > | cat"),
            ParseError::MissingRedirTarget(_)
        ));
    }

    #[test]
    fn trailing_pipe_and_logicals_are_errors() {
        assert_eq!(parse_err("a |"), ParseError::DanglingOperator("|".into()));
        assert_eq!(parse_err("a &&"), ParseError::DanglingOperator("&&".into()));
        assert_eq!(parse_err("a ||"), ParseError::DanglingOperator("||".into()));
    }

    #[test]
    fn trailing_semicolon_and_ampersand_are_fine() {
        let chain = parse("sleep 1 &").unwrap();
        assert_eq!(chain.op, ChainOp::Background);
        assert!(chain.next.is_none());

        let chain = parse("echo hi ;").unwrap();
        assert!(chain.next.is_none());
    }

    #[test]
    fn empty_command_between_operators() {
        assert_eq!(parse_err("| cat"), ParseError::EmptyCommand);
        assert_eq!(parse_err("a ; ; b"), ParseError::EmptyCommand);
    }

    #[test]
    fn empty_and_comment_lines_yield_no_chain() {
        assert!(parse("").is_none());
        assert!(parse("   ").is_none());
        assert!(parse("# just a comment").is_none());
    }

    #[test]
    fn assignment_only_line_sets_vars_and_yields_no_chain() {
        let mut env = TestEnv::default();
        let chain = parse_line("X=42 Y=hello", &mut env).unwrap();
        assert!(chain.is_none());
        assert_eq!(env.vars.get("X").map(String::as_str), Some("42"));
        assert_eq!(env.vars.get("Y").map(String::as_str), Some("hello"));
    }

    #[test]
    fn assignment_prefix_before_command() {
        let mut env = TestEnv::default();
        let chain = parse_line("X=1 echo hi", &mut env).unwrap().unwrap();
        assert_eq!(chain.argv, ["echo", "hi"]);
        assert_eq!(env.vars.get("X").map(String::as_str), Some("1"));
    }

    #[test]
    fn non_leading_assignment_stays_an_argument() {
        let mut env = TestEnv::default();
        let chain = parse_line("echo X=1", &mut env).unwrap().unwrap();
        assert_eq!(chain.argv, ["echo", "X=1"]);
        assert!(!env.vars.contains_key("X"));
    }

    #[test]
    fn tilde_expansion() {
        let mut env = TestEnv::default();
        let chain = parse_line("ls ~ ~/sub ~ghost/x", &mut env).unwrap().unwrap();
        assert_eq!(chain.argv[1], "/home/tester");
        assert_eq!(chain.argv[2], "/home/tester/sub");
        // Unknown users stay unexpanded.
        assert_eq!(chain.argv[3], "~ghost/x");
    }

    #[test]
    fn quoted_tokens_are_not_expanded() {
        let mut env = TestEnv::default();
        let chain = parse_line("echo '~' '*'", &mut env).unwrap().unwrap();
        assert_eq!(chain.argv[1], "~");
        assert_eq!(chain.argv[2], "*");
    }

    #[test]
    fn unmatched_glob_stays_literal() {
        let chain = parse("ls /no/such/dir-*-xyz").unwrap();
        assert_eq!(chain.argv[1], "/no/such/dir-*-xyz");
    }

    #[test]
    fn command_substitution_is_one_argument() {
        let mut env = TestEnv::default();
        env.captures
            .insert("printf 'a b'".into(), "a b\n\n".into());
        let chain = parse_line("echo $(printf 'a b') tail", &mut env)
            .unwrap()
            .unwrap();
        assert_eq!(chain.argv, ["echo", "a b", "tail"]);
    }

    #[test]
    fn empty_expansions_are_dropped() {
        let mut env = TestEnv::default();
        env.captures.insert("true".into(), "".into());
        let chain = parse_line("echo $NOPE $(true) end", &mut env)
            .unwrap()
            .unwrap();
        assert_eq!(chain.argv, ["echo", "end"]);
    }

    #[test]
    fn too_many_redirections() {
        assert_eq!(
            parse_err("c > a > b > c > d > e"),
            ParseError::TooManyRedirections
        );
    }

    #[test]
    fn too_many_arguments() {
        let wide = (0..=crate::MAX_ARGS)
            .map(|i| format!("a{i}"))
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(parse_err(&wide), ParseError::TooManyArgs);
    }

    #[test]
    fn redir_count_within_bound_is_accepted() {
        let chain = parse("c < a > b 2> c >> d").unwrap();
        assert_eq!(chain.redirs.len(), 4);
    }
}
