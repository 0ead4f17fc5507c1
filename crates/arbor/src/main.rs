mod tree;

use anyhow::Context;
use arbor_errors::{Renderer, syntax_errors};
use arbor_grammar::Language;
use arbor_parse::Parser as SyntaxParser;
use camino::Utf8PathBuf;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
enum Options {
    /// Prints the syntax tree of a file.
    Parse {
        path: Utf8PathBuf,
        /// Compiled grammar descriptor; defaults to the bundled fekal grammar.
        #[arg(long)]
        grammar: Option<Utf8PathBuf>,
        /// Also prints parser counters.
        #[arg(long)]
        stats: bool,
    },
    /// Reports syntax errors in a file.
    Check {
        path: Utf8PathBuf,
        #[arg(long)]
        grammar: Option<Utf8PathBuf>,
    },
}

fn load_language(grammar: Option<&Utf8PathBuf>) -> anyhow::Result<Language> {
    let Some(path) = grammar else {
        return Ok(arbor_fekal::language().clone());
    };
    let bytes = read(path)?;
    Language::load(&bytes).with_context(|| format!("failed to load grammar `{path}`"))
}

fn read(path: &Utf8PathBuf) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read `{path}`"))
}

/// Diagnostics are rendered over `&str`, so `check` needs UTF-8 input.
fn read_utf8(path: &Utf8PathBuf) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read `{path}` as UTF-8"))
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env("ARBOR_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match Options::parse() {
        Options::Parse { path, grammar, stats } => {
            let language = load_language(grammar.as_ref())?;
            let bytes = read(&path)?;

            let mut parser = SyntaxParser::new(language);
            let tree = parser.parse(bytes.as_slice());
            print!("{}", tree::dump(&tree, &bytes));

            if stats {
                eprintln!("{:#?}", parser.last_stats());
            }
            Ok(())
        }
        Options::Check { path, grammar } => {
            let language = load_language(grammar.as_ref())?;
            let text = read_utf8(&path)?;
            let tree = arbor_parse::parse(text.as_str(), &language);

            let renderer = Renderer::styled();
            let diagnostics = syntax_errors(&tree, &text);
            for diagnostic in &diagnostics {
                eprintln!("{}", diagnostic.render(&renderer, path.as_str(), &text));
            }
            tracing::debug!(errors = diagnostics.len(), "checked `{path}`");

            if !diagnostics.is_empty() {
                anyhow::bail!("`{path}` has {} syntax error(s)", diagnostics.len());
            }
            Ok(())
        }
    }
}
