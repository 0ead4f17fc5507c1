//! Table-driven lexer.
//!
//! Runs the descriptor's byte-class DFA with longest-match semantics. Which
//! rule wins a tie is already baked into the accepting states, so the lexer
//! itself only has to remember the last accepting position.

mod cursor;

use arbor_grammar::tables::LexAccept;
use arbor_grammar::{Language, Symbol};
use arbor_inputs::{Point, TextLen, TextSource};
use cursor::Cursor;
use text_size::{TextRange, TextSize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub symbol: Symbol,
    /// Token bytes, excluding padding.
    pub range: TextRange,
    pub start_point: Point,
    /// Skipped bytes between the previous token and this one.
    pub padding: TextLen,
    pub size: TextLen,
    /// Bytes past `range.end()` the automaton looked at before deciding.
    pub lookahead: u32,
    /// Lex mode the token was produced in.
    pub mode: u16,
    pub extra: bool,
}

impl Token {
    pub fn is_end(&self) -> bool {
        self.symbol == Symbol::END
    }

    pub fn is_error(&self) -> bool {
        self.symbol == Symbol::ERROR
    }

    pub fn padding_start(&self) -> TextSize {
        self.range.start() - self.padding.bytes
    }
}

/// Everything needed to restart lexing mid-buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexState {
    pub position: TextLen,
    pub mode: u16,
}

impl LexState {
    pub const START: Self = Self { position: TextLen::ZERO, mode: 0 };
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LexerStats {
    pub tokens: usize,
    pub skipped_bytes: usize,
    pub error_tokens: usize,
}

pub struct Lexer<'s, S: TextSource + ?Sized> {
    language: &'s Language,
    cursor: Cursor<'s, S>,
    mode: u16,
    stats: LexerStats,
}

impl<'s, S: TextSource + ?Sized> Lexer<'s, S> {
    pub fn new(language: &'s Language, source: &'s S) -> Self {
        Self::resume(language, source, LexState::START)
    }

    /// Starts lexing at a previously saved state.
    pub fn resume(language: &'s Language, source: &'s S, state: LexState) -> Self {
        Self {
            language,
            cursor: Cursor::new(source, state.position),
            mode: state.mode,
            stats: LexerStats::default(),
        }
    }

    pub fn state(&self) -> LexState {
        LexState { position: self.cursor.position(), mode: self.mode }
    }

    /// Moves to `state` without rescanning anything before it.
    pub fn seek(&mut self, state: LexState) {
        if state.position != self.cursor.position() {
            self.cursor = Cursor::new(self.source(), state.position);
        }
        self.mode = state.mode;
    }

    pub fn set_mode(&mut self, mode: u16) {
        self.mode = mode;
    }

    pub fn stats(&self) -> LexerStats {
        self.stats
    }

    pub fn is_eof(&self) -> bool {
        self.cursor.is_eof()
    }

    fn source(&self) -> &'s S {
        self.cursor.source()
    }

    /// Returns the next token. At the end of input this is an empty `end`
    /// token carrying the trailing padding; later calls keep returning empty
    /// `end` tokens.
    pub fn next_token(&mut self) -> Token {
        let language = self.language;
        let table = language.lex_table();
        let start_state = table.modes.get(self.mode as usize).copied().unwrap_or(table.modes[0]);

        let padding_start = self.cursor.position();
        let mut reach = self.cursor.offset();

        loop {
            let token_start = self.cursor.position();
            let start = self.cursor.offset();
            if start >= self.cursor.len() {
                return self.finish(Symbol::END, padding_start, token_start, reach);
            }

            let mut state = start_state;
            let mut pos = start;
            let mut last_accept = None;
            while let Some(byte) = self.cursor.byte_at(pos) {
                reach = reach.max(pos + 1);
                let Some(next) = table.next_state(state, byte) else { break };
                state = next;
                pos += 1;
                match table.accept[state as usize] {
                    LexAccept::None => {}
                    accept => last_accept = Some((accept, pos)),
                }
            }

            match last_accept {
                Some((LexAccept::Skip, end)) => {
                    self.stats.skipped_bytes += end - start;
                    self.cursor.advance_to(end);
                }
                Some((LexAccept::Token(symbol), end)) => {
                    self.cursor.advance_to(end);
                    return self.finish(symbol, padding_start, token_start, reach);
                }
                _ => {
                    self.stats.error_tokens += 1;
                    self.cursor.advance_to(start + 1);
                    return self.finish(Symbol::ERROR, padding_start, token_start, reach);
                }
            }
        }
    }

    fn finish(
        &mut self,
        symbol: Symbol,
        padding_start: TextLen,
        token_start: TextLen,
        reach: usize,
    ) -> Token {
        let end = self.cursor.position();
        let token = Token {
            symbol,
            range: TextRange::new(token_start.bytes, end.bytes),
            start_point: token_start.extent,
            padding: token_start - padding_start,
            size: end - token_start,
            lookahead: reach.saturating_sub(usize::from(end.bytes)) as u32,
            mode: self.mode,
            extra: self.language.is_extra(symbol),
        };
        self.stats.tokens += 1;
        tracing::trace!(symbol = ?token.symbol, range = ?token.range, "token");
        token
    }
}

#[cfg(test)]
mod tests {
    use arbor_generate::{Grammar, choice, lit, repeat, sym};
    use arbor_inputs::ChunkedText;

    use super::*;

    fn language() -> Language {
        Grammar::new("lexing")
            .skip(r"[ \t\n]+")
            .literal("if")
            .token("identifier", "[a-z_][a-z0-9_]*")
            .token("number", "[0-9]+")
            .token("comment", "#[^\n]*")
            .extra("comment")
            .rule(
                "source_file",
                repeat(choice([
                    sym("identifier"),
                    sym("number"),
                    lit("if"),
                    lit("="),
                    lit("=="),
                ])),
            )
            .build()
            .unwrap()
    }

    fn kind(language: &Language, name: &str) -> Symbol {
        language
            .symbol_for_name(name, true)
            .or_else(|| language.symbol_for_name(name, false))
            .unwrap()
    }

    fn tokens<S: TextSource + ?Sized>(language: &Language, source: &S) -> Vec<Token> {
        let mut lexer = Lexer::new(language, source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            tokens.push(token);
            if token.is_end() {
                return tokens;
            }
        }
    }

    fn token_text<'a>(token: &Token, text: &'a str) -> &'a str {
        &text[token.range]
    }

    #[test]
    fn test_keywords_beat_identifiers() {
        let language = language();
        let text = "if iffy";
        let tokens = tokens(&language, text);

        assert_eq!(tokens[0].symbol, kind(&language, "if"));
        assert_eq!(tokens[1].symbol, kind(&language, "identifier"));
        assert_eq!(token_text(&tokens[1], text), "iffy");
        assert!(tokens[2].is_end());
    }

    #[test]
    fn test_longest_match() {
        let language = language();
        let text = "a==b=c";
        let kinds: Vec<_> = tokens(&language, text)
            .iter()
            .map(|token| language.symbol_name(token.symbol).to_owned())
            .collect();
        assert_eq!(kinds, ["identifier", "==", "identifier", "=", "identifier", "end"]);
    }

    #[test]
    fn test_invalid_byte_is_error_token() {
        let language = language();
        let text = "a $ b";
        let mut lexer = Lexer::new(&language, text);

        assert_eq!(lexer.next_token().symbol, kind(&language, "identifier"));
        let error = lexer.next_token();
        assert!(error.is_error());
        assert_eq!(token_text(&error, text), "$");
        assert_eq!(error.padding.bytes, 1.into());
        assert_eq!(lexer.next_token().symbol, kind(&language, "identifier"));
        assert_eq!(lexer.stats().error_tokens, 1);
    }

    #[test]
    fn test_padding_points_and_lookahead() {
        let language = language();
        let text = "ab\n  12x";
        let tokens = tokens(&language, text);

        assert_eq!(tokens[0].lookahead, 1);
        assert_eq!(tokens[1].start_point, Point::new(1, 2));
        assert_eq!(tokens[1].padding.bytes, 3.into());
        assert_eq!(tokens[1].padding.extent, Point::new(1, 2));
        assert_eq!(token_text(&tokens[1], text), "12");
        assert_eq!(tokens[2].lookahead, 0);
    }

    #[test]
    fn test_end_token_carries_trailing_padding() {
        let language = language();
        let text = "x  \n";
        let mut lexer = Lexer::new(&language, text);
        lexer.next_token();

        let end = lexer.next_token();
        assert!(end.is_end());
        assert_eq!(end.range, TextRange::empty(4.into()));
        assert_eq!(end.padding.bytes, 3.into());
        let again = lexer.next_token();
        assert!(again.is_end());
        assert_eq!(again.range, end.range);
    }

    #[test]
    fn test_extras_are_flagged() {
        let language = language();
        let text = "x # note\ny";
        let tokens = tokens(&language, text);

        assert_eq!(tokens[1].symbol, kind(&language, "comment"));
        assert!(tokens[1].extra);
        assert_eq!(token_text(&tokens[1], text), "# note");
        assert!(!tokens[2].extra);
    }

    #[test]
    fn test_resume_reproduces_tokens() {
        let language = language();
        let text = "foo = 12 if bar";
        let all = tokens(&language, text);

        let mut lexer = Lexer::new(&language, text);
        lexer.next_token();
        lexer.next_token();
        let saved = lexer.state();

        let mut resumed = Lexer::resume(&language, text, saved);
        let rest: Vec<_> = (2..all.len()).map(|_| resumed.next_token()).collect();
        assert_eq!(rest, all[2..]);
    }

    #[test]
    fn test_chunked_source_matches_contiguous() {
        let language = language();
        let text = "if foo == 123 # trailing\nbar";
        for chunk_size in [1, 2, 5] {
            let chunked = ChunkedText::split(text.as_bytes(), chunk_size);
            assert_eq!(tokens(&language, &chunked), tokens(&language, text), "chunk size {chunk_size}");
        }
    }
}
