//! Command-line runner for the list grammar.
//!
//! Reads a fixture (or stdin), runs the `lists` strategy over it and prints
//! the resulting tree.
//!
//! ## Usage
//!
//! ```bash
//! # Parse a file in one piece
//! trellis-runner demos/runner/fixtures/nested.lists
//!
//! # Stream the input through a channel, three chars at a time
//! RUST_LOG=trellis_core=debug trellis-runner --chunked 3 demos/runner/fixtures/nested.lists
//! ```

mod grammar;

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use trellis::{Chunk, Context, CstBuilder, Document, Error, Interpreter, ParseConfig, Source};

use crate::grammar::{Lists, document};

#[derive(Parser, Debug)]
#[command(name = "trellis-runner", about = "Run the list grammar over a file")]
struct Args {
    /// Input file. Reads stdin when omitted.
    path: Option<PathBuf>,

    /// Feed the input through a channel in chunks of this many chars.
    #[arg(long, value_name = "N")]
    chunked: Option<usize>,

    /// Maximum number of nested branches.
    #[arg(long, default_value_t = ParseConfig::DEFAULT.max_branch_depth)]
    max_branch_depth: usize,

    /// Stop after this many instructions.
    #[arg(long)]
    max_instructions: Option<usize>,
}

impl Args {
    fn config(&self) -> ParseConfig {
        let config = ParseConfig::new().with_max_branch_depth(self.max_branch_depth);
        match self.max_instructions {
            Some(limit) => config.with_max_instructions(limit),
            None => config,
        }
    }

    fn read_input(&self) -> std::io::Result<String> {
        match &self.path {
            Some(path) => std::fs::read_to_string(path),
            None => {
                let mut text = String::new();
                std::io::stdin().read_to_string(&mut text)?;
                Ok(text)
            }
        }
    }
}

fn chunks(text: &str, size: usize) -> Vec<Chunk> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|piece| Chunk::from(piece.iter().collect::<String>().as_str()))
        .collect()
}

fn source(text: &str, chunked: Option<usize>) -> Source {
    let Some(size) = chunked else {
        return Source::from_text(text);
    };
    let pieces = chunks(text, size);
    let (tx, rx) = mpsc::channel(pieces.len().max(1));
    tokio::spawn(async move {
        for piece in pieces {
            if tx.send(piece).await.is_err() {
                tracing::warn!("interpreter dropped the source early");
                return;
            }
        }
    });
    Source::from_receiver(rx)
}

async fn parse(ctx: &Context<Lists>, source: Source) -> Result<Document, Error> {
    Interpreter::new(ctx, source, CstBuilder::new(), document)
        .run()
        .await?
        .finish()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let text = match args.read_input() {
        Ok(text) => text,
        Err(e) => {
            eprintln!("error: failed to read input: {e}");
            return ExitCode::FAILURE;
        }
    };
    let grammar = match Lists::new() {
        Ok(grammar) => grammar,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let ctx = Context::with_config(grammar, args.config());
    tracing::info!(chars = text.chars().count(), chunked = ?args.chunked, "parsing");

    match parse(&ctx, source(&text, args.chunked)).await {
        Ok(doc) => {
            print!("{doc}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
