//! Tokenizer shared by the mock statement interpreters.
//!
//! Understands both literal styles the backends use: double-quoted strings
//! with backslash escapes and single-quoted strings with doubled quotes.
//! Backticked names are returned as identifiers.

/// One lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Bare word: keyword, name or number.
    Word(String),
    /// Decoded string literal.
    Str(String),
    /// Backticked identifier.
    Ident(String),
    /// Any other single character.
    Symbol(char),
}

impl Token {
    /// Returns `true` if this is the bare word `word`, ignoring ASCII case.
    #[must_use]
    pub fn is_word(&self, word: &str) -> bool {
        matches!(self, Self::Word(w) if w.eq_ignore_ascii_case(word))
    }

    /// Returns the decoded literal, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Splits `input` into tokens.
///
/// # Errors
///
/// Returns a message describing an unterminated literal or an unknown escape.
pub fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '"' {
            chars.next();
            let mut literal = String::new();
            loop {
                match chars.next() {
                    None => return Err("unterminated double-quoted string".to_owned()),
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some('\\') => literal.push('\\'),
                        Some('"') => literal.push('"'),
                        Some('n') => literal.push('\n'),
                        Some('r') => literal.push('\r'),
                        Some('t') => literal.push('\t'),
                        Some(other) => return Err(format!("unknown escape '\\{other}'")),
                        None => return Err("dangling escape".to_owned()),
                    },
                    Some(other) => literal.push(other),
                }
            }
            tokens.push(Token::Str(literal));
        } else if c == '\'' {
            chars.next();
            let mut literal = String::new();
            loop {
                match chars.next() {
                    None => return Err("unterminated single-quoted string".to_owned()),
                    Some('\'') if chars.peek() == Some(&'\'') => {
                        chars.next();
                        literal.push('\'');
                    },
                    Some('\'') => break,
                    Some(other) => literal.push(other),
                }
            }
            tokens.push(Token::Str(literal));
        } else if c == '`' {
            chars.next();
            let mut name = String::new();
            loop {
                match chars.next() {
                    None => return Err("unterminated identifier".to_owned()),
                    Some('`') => break,
                    Some(other) => name.push(other),
                }
            }
            tokens.push(Token::Ident(name));
        } else if c.is_ascii_alphanumeric() || c == '_' {
            let mut word = String::new();
            while let Some(&w) = chars.peek() {
                if w.is_ascii_alphanumeric() || w == '_' {
                    word.push(w);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Word(word));
        } else {
            chars.next();
            tokens.push(Token::Symbol(c));
        }
    }

    Ok(tokens)
}

/// Sequential reader over a token stream, for hand-written statement parsers.
#[derive(Debug, Clone)]
pub struct Cursor {
    tokens: Vec<Token>,
    pos: usize,
}

impl Cursor {
    /// Tokenizes `input` and positions the cursor at the first token.
    ///
    /// # Errors
    ///
    /// Returns the tokenizer's message for malformed input.
    pub fn new(input: &str) -> Result<Self, String> {
        Ok(Self { tokens: tokenize(input)?, pos: 0 })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn describe(&self) -> String {
        match self.peek() {
            None => "end of statement".to_owned(),
            Some(token) => format!("{token:?}"),
        }
    }

    /// Returns `true` if the next token is the bare word `word`.
    #[must_use]
    pub fn at_word(&self, word: &str) -> bool {
        self.peek().is_some_and(|t| t.is_word(word))
    }

    /// Consumes the bare word `word` if it is next.
    pub fn eat_word(&mut self, word: &str) -> bool {
        let hit = self.at_word(word);
        if hit {
            self.pos += 1;
        }
        hit
    }

    /// Consumes the bare word `word`.
    ///
    /// # Errors
    ///
    /// Returns a message naming what was found instead.
    pub fn expect_word(&mut self, word: &str) -> Result<(), String> {
        if self.eat_word(word) {
            return Ok(());
        }
        Err(format!("expected '{word}', found {}", self.describe()))
    }

    /// Consumes each word of `words` in order.
    ///
    /// # Errors
    ///
    /// Fails at the first word that does not match.
    pub fn expect_words(&mut self, words: &[&str]) -> Result<(), String> {
        words.iter().try_for_each(|word| self.expect_word(word))
    }

    /// Consumes the symbol `symbol` if it is next.
    pub fn eat_symbol(&mut self, symbol: char) -> bool {
        let hit = self.peek() == Some(&Token::Symbol(symbol));
        if hit {
            self.pos += 1;
        }
        hit
    }

    /// Consumes the symbol `symbol`.
    ///
    /// # Errors
    ///
    /// Returns a message naming what was found instead.
    pub fn expect_symbol(&mut self, symbol: char) -> Result<(), String> {
        if self.eat_symbol(symbol) {
            return Ok(());
        }
        Err(format!("expected '{symbol}', found {}", self.describe()))
    }

    /// Consumes a string literal.
    ///
    /// # Errors
    ///
    /// Returns a message if the next token is not a string.
    pub fn string(&mut self) -> Result<String, String> {
        match self.peek() {
            Some(Token::Str(s)) => {
                let s = s.clone();
                self.pos += 1;
                Ok(s)
            },
            _ => Err(format!("expected string literal, found {}", self.describe())),
        }
    }

    /// Consumes one or more string literals separated by commas.
    ///
    /// # Errors
    ///
    /// Fails if the list is empty or malformed.
    pub fn string_list(&mut self) -> Result<Vec<String>, String> {
        let mut items = vec![self.string()?];
        while self.eat_symbol(',') {
            items.push(self.string()?);
        }
        Ok(items)
    }

    /// Consumes a name, bare or backticked.
    ///
    /// # Errors
    ///
    /// Returns a message if the next token is not a name.
    pub fn name(&mut self) -> Result<String, String> {
        match self.peek() {
            Some(Token::Word(w) | Token::Ident(w)) => {
                let w = w.clone();
                self.pos += 1;
                Ok(w)
            },
            _ => Err(format!("expected name, found {}", self.describe())),
        }
    }

    /// Consumes an unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns a message if the next token is not a number.
    pub fn number(&mut self) -> Result<usize, String> {
        let word = self.name()?;
        word.parse().map_err(|_| format!("expected number, found '{word}'"))
    }

    /// Skips tokens up to and including the bare word `word`.
    ///
    /// # Errors
    ///
    /// Fails if `word` never appears.
    pub fn skip_past(&mut self, word: &str) -> Result<(), String> {
        while self.peek().is_some() {
            if self.eat_word(word) {
                return Ok(());
            }
            self.pos += 1;
        }
        Err(format!("expected '{word}' before end of statement"))
    }

    /// Succeeds only if every token has been consumed.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first trailing token.
    pub fn finish(&self) -> Result<(), String> {
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(format!("unexpected trailing {}", self.describe())),
        }
    }
}
