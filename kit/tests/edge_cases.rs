//! Edge cases for the interpreter's failure modes.

use trellis::{
    script, BuildError, Context, CstBuilder, Error, Grammar, Instruction, Interpreter, OpenTag, ParseConfig, Pattern,
    Source, SourceError, Terminal, Unit,
};

struct Edge;

impl Grammar for Edge {
    fn name(&self) -> &str {
        "edge"
    }
}

fn run_with(config: ParseConfig, source: Source, instructions: Vec<Instruction>) -> Result<CstBuilder, Error> {
    let ctx = Context::with_config(Edge, config);
    Interpreter::new(&ctx, source, CstBuilder::new(), script(instructions)).run_blocking()
}

fn run(text: &str, instructions: Vec<Instruction>) -> Result<CstBuilder, Error> {
    run_with(ParseConfig::DEFAULT, Source::from_text(text), instructions)
}

fn open(node_type: &str) -> Instruction {
    Instruction::Advance(Terminal::open(node_type))
}

fn literal(text: &str) -> Instruction {
    Instruction::Advance(Terminal::literal(text))
}

fn close() -> Instruction {
    Instruction::Advance(Terminal::Close)
}

#[test_case::test_case("", vec![open("Root"), close()]; "empty input")]
#[test_case::test_case("ab", vec![open("Root"), literal("ab"), close()]; "single literal")]
#[test_case::test_case("ab", vec![open("Root"), literal("a"), literal("b"), close()]; "two literals")]
#[test_case::test_case("", vec![Instruction::Branch, Instruction::Accept, open("Root"), close()]; "branch before root")]
fn test_complete_runs(text: &str, instructions: Vec<Instruction>) {
    let builder = run(text, instructions).unwrap();
    assert_eq!(builder.finish().unwrap().root.text(), text);
}

#[test_case::test_case("ab", vec![open("Root"), literal("a"), close()], Error::InputNotConsumed; "input left over")]
#[test_case::test_case("a", vec![open("Root"), literal("b")], Error::LiteralFailed { literal: "b".into() }; "literal mismatch")]
#[test_case::test_case("a", vec![open("Root"), literal("ab")], Error::LiteralFailed { literal: "ab".into() }; "literal past end")]
#[test_case::test_case("a", vec![open("Root"), Instruction::Advance(Terminal::Gap)], Error::GapFailed; "gap over text")]
#[test_case::test_case("", vec![open("Root"), Instruction::Advance(Terminal::Gap)], Error::GapFailed; "gap at end")]
#[test_case::test_case("", vec![Instruction::Accept], Error::AcceptedRoot; "accept root")]
#[test_case::test_case("", vec![Instruction::Reject], Error::RejectedRoot; "reject root")]
#[test_case::test_case("", vec![Instruction::Unknown("yield".into())], Error::UnknownInstruction { verb: "yield".into() }; "unknown verb")]
fn test_fatal_errors(text: &str, instructions: Vec<Instruction>, expected: Error) {
    assert_eq!(run(text, instructions).unwrap_err(), expected);
}

#[test]
fn test_balancer_without_opener() {
    let closer = OpenTag::new("Punctuator").with_attribute("balancer", true);
    let err = run(
        ")",
        vec![
            open("Root"),
            Instruction::Advance(Terminal::reference("close")),
            Instruction::Advance(closer.into()),
        ],
    )
    .unwrap_err();
    assert_eq!(
        err,
        Error::UnexpectedCloser {
            node_type: "Punctuator".into()
        }
    );
}

#[test]
fn test_shift_twice_is_rejected_by_cursor() {
    let err = run(
        "a",
        vec![
            open("Root"),
            Instruction::Advance(Terminal::reference("x")),
            Instruction::Advance(Terminal::Null),
            Instruction::Advance(Terminal::Shift),
            Instruction::Advance(Terminal::Shift),
        ],
    )
    .unwrap_err();
    assert_eq!(err, Error::Source(SourceError::AlreadyHolding));
}

#[test]
fn test_builder_errors_surface() {
    let err = run("", vec![open("Root"), open("Child")]).unwrap_err();
    assert_eq!(
        err,
        Error::Build(BuildError::MissingReference {
            node_type: "Child".into()
        })
    );
}

#[test]
fn test_branch_limit() {
    let config = ParseConfig::new().with_max_branch_depth(2);
    let err = run_with(
        config,
        Source::from_text(""),
        vec![Instruction::Branch, Instruction::Branch, Instruction::Branch],
    )
    .unwrap_err();
    assert_eq!(err, Error::BranchLimitExceeded { depth: 3, limit: 2 });
}

#[test]
fn test_branch_limit_counts_live_frames_only() {
    let config = ParseConfig::new().with_max_branch_depth(1);
    let instructions = (0..10).flat_map(|_| [Instruction::Branch, Instruction::Reject]).collect();
    assert!(run_with(config, Source::from_text(""), instructions).is_ok());
}

#[test]
fn test_instruction_limit() {
    let config = ParseConfig::new().with_max_instructions(3);
    let err = run_with(
        config,
        Source::from_text("ab"),
        vec![open("Root"), literal("a"), literal("b"), close()],
    )
    .unwrap_err();
    assert_eq!(err, Error::InstructionLimitExceeded { executed: 4, limit: 3 });
}

#[test]
fn test_match_does_not_consume() {
    let builder = run(
        "abc",
        vec![
            open("Root"),
            Instruction::Match(Pattern::literal("abc")),
            Instruction::Match(Pattern::regex("[a-z]+").unwrap()),
            literal("abc"),
            close(),
        ],
    )
    .unwrap();
    assert_eq!(builder.finish().unwrap().root.text(), "abc");
}

#[test]
fn test_gap_unit_cannot_be_matched_as_text() {
    let source = Source::from_units(vec![Unit::Gap]);
    let err = run_with(ParseConfig::DEFAULT, source, vec![open("Root"), literal("x")]).unwrap_err();
    assert_eq!(err, Error::LiteralFailed { literal: "x".into() });
}

#[test]
fn test_strategy_may_stop_early() {
    let builder = run("abc", vec![open("Root")]).unwrap();
    assert_eq!(
        builder.finish().unwrap_err(),
        Error::Build(BuildError::Incomplete { open: 1 })
    );
}

#[test]
fn test_error_messages() {
    assert_eq!(Error::AcceptedRoot.to_string(), "accepted the root state");
    assert_eq!(
        Error::NotOnTop { op: "branch" }.to_string(),
        "cannot branch a state that is not on top"
    );
    assert_eq!(
        Error::UnbalancedAtEnd { remaining: 2 }.to_string(),
        "parser did not match all balanced nodes: 2 still open"
    );
}
