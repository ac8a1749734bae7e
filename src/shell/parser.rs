//! Line tokenizer and redirect resolver
//!
//! Supports:
//! - Words split on unquoted whitespace: `ls -l`
//! - Single and double quotes: `echo "a b"`, `echo 'a "b"'`
//! - Backslash escapes in any quoting state: `echo a\ b`
//! - Redirection operators outside quotes: `echo hi > out.txt`
//!
//! Only `>` and `>>` are carried through to execution. Every other operator in
//! the vocabulary is recognized so it can be rejected with a precise message
//! rather than leaking into the argument list.

use std::fmt;

use super::error::ShellError;

/// Redirection operator vocabulary shared by the tokenizer and the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectOp {
    /// `>` - truncate output file
    Overwrite,
    /// `>>` - append to output file
    Append,
    /// `<` - read from file
    Input,
    /// `2>` - stderr to file
    Stderr,
    /// `&>` - stdout and stderr to file
    Both,
    /// `>&` - fd duplication
    DupOut,
    /// `<&` - fd duplication
    DupIn,
    /// `<>` - read/write open
    ReadWrite,
    /// `<<` - here-document
    HereDoc,
}

impl RedirectOp {
    /// Checked before the single-character forms.
    const TWO_CHAR: &'static [(&'static str, RedirectOp)] = &[
        (">>", RedirectOp::Append),
        ("2>", RedirectOp::Stderr),
        ("&>", RedirectOp::Both),
        (">&", RedirectOp::DupOut),
        ("<&", RedirectOp::DupIn),
        ("<>", RedirectOp::ReadWrite),
        ("<<", RedirectOp::HereDoc),
    ];

    fn from_char(c: char) -> Option<Self> {
        match c {
            '>' => Some(RedirectOp::Overwrite),
            '<' => Some(RedirectOp::Input),
            _ => None,
        }
    }

    fn from_pair(a: char, b: char) -> Option<Self> {
        Self::TWO_CHAR
            .iter()
            .find(|(s, _)| {
                let mut it = s.chars();
                it.next() == Some(a) && it.next() == Some(b)
            })
            .map(|(_, op)| *op)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RedirectOp::Overwrite => ">",
            RedirectOp::Append => ">>",
            RedirectOp::Input => "<",
            RedirectOp::Stderr => "2>",
            RedirectOp::Both => "&>",
            RedirectOp::DupOut => ">&",
            RedirectOp::DupIn => "<&",
            RedirectOp::ReadWrite => "<>",
            RedirectOp::HereDoc => "<<",
        }
    }
}

impl fmt::Display for RedirectOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(String),
    Operator(RedirectOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteMode {
    None,
    Single,
    Double,
}

/// Split a line into words and operators. Never fails: an unterminated quote
/// keeps the rest of the line in the final word.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut buf = String::new();
    let mut mode = QuoteMode::None;

    let chars: Vec<char> = input.chars().collect();
    let mut i = 0usize;

    fn finish_word(tokens: &mut Vec<Token>, buf: &mut String) {
        if !buf.is_empty() {
            tokens.push(Token::Word(std::mem::take(buf)));
        }
    }

    while i < chars.len() {
        let ch = chars[i];

        if ch == '\\' {
            // Trailing lone backslash is dropped.
            if let Some(&next) = chars.get(i + 1) {
                buf.push(next);
            }
            i += 2;
            continue;
        }

        if mode == QuoteMode::None {
            if let Some(op) = chars.get(i + 1).and_then(|&next| RedirectOp::from_pair(ch, next)) {
                finish_word(&mut tokens, &mut buf);
                tokens.push(Token::Operator(op));
                i += 2;
                continue;
            }
            if let Some(op) = RedirectOp::from_char(ch) {
                finish_word(&mut tokens, &mut buf);
                tokens.push(Token::Operator(op));
                i += 1;
                continue;
            }
        }

        match ch {
            '\'' if mode != QuoteMode::Double => {
                mode = if mode == QuoteMode::Single { QuoteMode::None } else { QuoteMode::Single };
            }
            '"' if mode != QuoteMode::Single => {
                mode = if mode == QuoteMode::Double { QuoteMode::None } else { QuoteMode::Double };
            }
            c if mode == QuoteMode::None && c.is_whitespace() => {
                finish_word(&mut tokens, &mut buf);
            }
            other => buf.push(other),
        }

        i += 1;
    }

    finish_word(&mut tokens, &mut buf);
    log::debug!("tokenized {:?} into {} token(s)", input, tokens.len());

    tokens
}

/// Where a command's output goes. Input redirection is never honored, so
/// `input_target` stays `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectSpec {
    pub output_target: Option<String>,
    pub append: bool,
    pub input_target: Option<String>,
}

/// Pull redirection operators and their filenames out of the token stream.
/// Returns the remaining words in order plus the redirection to apply.
pub fn resolve_redirects(tokens: Vec<Token>) -> Result<(Vec<String>, RedirectSpec), ShellError> {
    let mut args = Vec::new();
    let mut spec = RedirectSpec::default();
    let mut seen: Option<RedirectOp> = None;
    let mut iter = tokens.into_iter();

    while let Some(token) = iter.next() {
        let op = match token {
            Token::Word(w) => {
                args.push(w);
                continue;
            }
            Token::Operator(op) => op,
        };

        match op {
            RedirectOp::Overwrite | RedirectOp::Append => {
                let target = match iter.next() {
                    Some(Token::Word(w)) => w,
                    _ => return Err(ShellError::MissingRedirectTarget(op.to_string())),
                };
                if let Some(first) = seen {
                    return Err(ShellError::DuplicateRedirect {
                        first: first.to_string(),
                        second: op.to_string(),
                    });
                }
                seen = Some(op);
                spec.output_target = Some(target);
                spec.append = op == RedirectOp::Append;
            }
            RedirectOp::Input | RedirectOp::Stderr | RedirectOp::Both => {
                return Err(ShellError::RedirectNotImplemented(op.to_string()));
            }
            RedirectOp::DupOut | RedirectOp::DupIn | RedirectOp::ReadWrite | RedirectOp::HereDoc => {
                return Err(ShellError::UnsupportedRedirect(op.to_string()));
            }
        }
    }

    Ok((args, spec))
}

/// A command name and its arguments, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Name as typed; used when spawning external programs.
    pub name: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn from_words(mut words: Vec<String>) -> Result<Self, ShellError> {
        if words.is_empty() {
            return Err(ShellError::EmptyCommand);
        }
        let name = words.remove(0);
        Ok(Self { name, args: words })
    }

    /// Case-folded name used for registry lookup.
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Tokenize, resolve redirects and build the invocation in one step.
pub fn parse(line: &str) -> Result<(Invocation, RedirectSpec), ShellError> {
    let (words, spec) = resolve_redirects(tokenize(line))?;
    let invocation = Invocation::from_words(words)?;
    Ok((invocation, spec))
}
