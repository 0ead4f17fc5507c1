use arbor_grammar::LoadError;

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("grammar `{0}` has no rules")]
    NoRules(String),
    #[error("unknown symbol `{name}` in `{rule}`")]
    UnknownSymbol { name: String, rule: String },
    #[error("`{0}` is declared more than once")]
    DuplicateName(String),
    #[error("invalid pattern for `{name}`: {message}")]
    InvalidPattern { name: String, message: String },
    #[error("pattern for `{name}` uses {feature}, which the lexer does not support")]
    UnsupportedPattern { name: String, feature: &'static str },
    #[error("token `{0}` matches the empty string")]
    EmptyMatch(String),
    #[error("extra `{0}` is not a token")]
    ExtraNotToken(String),
    #[error("extra `{0}` is also used inside a rule")]
    ExtraInRule(String),
    #[error("grammar has {0} symbols, more than a descriptor can hold")]
    TooManySymbols(usize),
    #[error("grammar needs {count} {automaton} states, more than a descriptor can hold")]
    TooManyStates { automaton: &'static str, count: usize },
    #[error(transparent)]
    Load(#[from] LoadError),
}
