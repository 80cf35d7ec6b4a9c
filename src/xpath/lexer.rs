//! XPath 1.0 tokenizer.
//!
//! Implements the lexical disambiguation rules of XPath 1.0 §3.7: whether
//! `*` is a name test or a multiplication, whether an NCName is an operator
//! name, a function name, a node type or an axis name depends on the
//! surrounding tokens.

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Slash,
    DoubleSlash,
    LBracket,
    RBracket,
    LParen,
    RParen,
    At,
    Comma,
    Dot,
    DotDot,
    ColonColon,
    Pipe,
    Plus,
    Minus,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Multiply,
    And,
    Or,
    Div,
    Mod,
    /// `*` or `prefix:*` in name-test position.
    Wildcard,
    /// Name test, possibly prefixed (`svg:rect`).
    Name(String),
    FunctionName(String),
    /// `comment`, `text`, `processing-instruction` or `node` before `(`.
    NodeType(String),
    AxisName(String),
    Literal(String),
    Number(f64),
    Variable(String),
}

impl Token {
    /// Whether a `*` or NCName following this token is an operator.
    fn precedes_operator(&self) -> bool {
        !matches!(
            self,
            Token::At
                | Token::ColonColon
                | Token::LParen
                | Token::LBracket
                | Token::Comma
                | Token::Slash
                | Token::DoubleSlash
                | Token::Pipe
                | Token::Plus
                | Token::Minus
                | Token::Eq
                | Token::NotEq
                | Token::Lt
                | Token::LtEq
                | Token::Gt
                | Token::GtEq
                | Token::Multiply
                | Token::And
                | Token::Or
                | Token::Div
                | Token::Mod
        )
    }
}

const NODE_TYPES: &[&str] = &["comment", "text", "processing-instruction", "node"];

fn is_name_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit() || c == '-' || c == '.' || c.is_alphanumeric()
}

struct Lexer<'s> {
    chars: Vec<char>,
    pos: usize,
    tokens: Vec<Token>,
    source: &'s str,
}

/// Splits an expression into tokens.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let mut lexer = Lexer {
        chars: source.chars().collect(),
        pos: 0,
        tokens: Vec::new(),
        source,
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

impl Lexer<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn operator_position(&self) -> bool {
        self.tokens.last().is_some_and(Token::precedes_operator)
    }

    /// Next non-whitespace character at or after `from`.
    fn next_significant(&self, from: usize) -> (Option<char>, usize) {
        let mut i = from;
        while let Some(c) = self.chars.get(i) {
            if !c.is_whitespace() {
                return (Some(*c), i);
            }
            i += 1;
        }
        (None, i)
    }

    fn run(&mut self) -> Result<(), String> {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
                continue;
            }
            let token = match c {
                '/' => {
                    if self.peek_at(1) == Some('/') {
                        self.pos += 2;
                        Token::DoubleSlash
                    } else {
                        self.pos += 1;
                        Token::Slash
                    }
                }
                '[' => self.single(Token::LBracket),
                ']' => self.single(Token::RBracket),
                '(' => self.single(Token::LParen),
                ')' => self.single(Token::RParen),
                '@' => self.single(Token::At),
                ',' => self.single(Token::Comma),
                '|' => self.single(Token::Pipe),
                '+' => self.single(Token::Plus),
                '-' => self.single(Token::Minus),
                '=' => self.single(Token::Eq),
                '!' => {
                    if self.peek_at(1) == Some('=') {
                        self.pos += 2;
                        Token::NotEq
                    } else {
                        return Err(format!("unexpected `!` at offset {}", self.pos));
                    }
                }
                '<' => self.maybe_eq(Token::Lt, Token::LtEq),
                '>' => self.maybe_eq(Token::Gt, Token::GtEq),
                ':' => {
                    if self.peek_at(1) == Some(':') {
                        self.pos += 2;
                        Token::ColonColon
                    } else {
                        return Err(format!("unexpected `:` at offset {}", self.pos));
                    }
                }
                '.' => match self.peek_at(1) {
                    Some('.') => {
                        self.pos += 2;
                        Token::DotDot
                    }
                    Some(d) if d.is_ascii_digit() => self.number(),
                    _ => self.single(Token::Dot),
                },
                '"' | '\'' => self.literal(c)?,
                '$' => {
                    self.pos += 1;
                    let name = self.qname()?;
                    Token::Variable(name)
                }
                '*' => {
                    self.pos += 1;
                    if self.operator_position() {
                        Token::Multiply
                    } else {
                        Token::Wildcard
                    }
                }
                d if d.is_ascii_digit() => self.number(),
                n if is_name_start(n) => self.name_like()?,
                other => {
                    return Err(format!("unexpected character `{other}` at offset {}", self.pos));
                }
            };
            self.tokens.push(token);
        }
        Ok(())
    }

    fn single(&mut self, token: Token) -> Token {
        self.pos += 1;
        token
    }

    fn maybe_eq(&mut self, plain: Token, with_eq: Token) -> Token {
        if self.peek_at(1) == Some('=') {
            self.pos += 2;
            with_eq
        } else {
            self.pos += 1;
            plain
        }
    }

    fn literal(&mut self, quote: char) -> Result<Token, String> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == quote {
                return Ok(Token::Literal(value));
            }
            value.push(c);
        }
        Err(format!("unterminated string literal at offset {start} in `{}`", self.source))
    }

    fn number(&mut self) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.') {
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        Token::Number(text.parse().unwrap_or(f64::NAN))
    }

    fn ncname(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_name_char) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    /// Reads `prefix:local` or `local`. Does not accept `prefix:*`.
    fn qname(&mut self) -> Result<String, String> {
        if !self.peek().is_some_and(is_name_start) {
            return Err(format!("expected a name at offset {}", self.pos));
        }
        let mut name = self.ncname();
        if self.peek() == Some(':') && self.peek_at(1).is_some_and(is_name_start) {
            self.pos += 1;
            name.push(':');
            name.push_str(&self.ncname());
        }
        Ok(name)
    }

    fn name_like(&mut self) -> Result<Token, String> {
        if self.operator_position() {
            let name = self.ncname();
            return match name.as_str() {
                "and" => Ok(Token::And),
                "or" => Ok(Token::Or),
                "div" => Ok(Token::Div),
                "mod" => Ok(Token::Mod),
                _ => Err(format!("expected an operator, found `{name}`")),
            };
        }

        let name = self.ncname();

        // prefix:* or prefix:local
        if self.peek() == Some(':') && self.peek_at(1) != Some(':') {
            match self.peek_at(1) {
                Some('*') => {
                    self.pos += 2;
                    return Ok(Token::Wildcard);
                }
                Some(c) if is_name_start(c) => {
                    self.pos += 1;
                    let local = self.ncname();
                    let qualified = format!("{name}:{local}");
                    return Ok(self.classify_name(qualified, false));
                }
                _ => return Err(format!("malformed qualified name `{name}:`")),
            }
        }

        Ok(self.classify_name(name, true))
    }

    fn classify_name(&self, name: String, may_be_axis: bool) -> Token {
        let (next, at) = self.next_significant(self.pos);
        match next {
            Some('(') => {
                if NODE_TYPES.contains(&name.as_str()) {
                    Token::NodeType(name)
                } else {
                    Token::FunctionName(name)
                }
            }
            Some(':') if may_be_axis && self.chars.get(at + 1) == Some(&':') => Token::AxisName(name),
            _ => Token::Name(name),
        }
    }
}
