#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use trellis::{
    script, Context, CstBuilder, Grammar, Instruction, Interpreter, ParseConfig, Pattern, Source, Terminal, Unit,
    Value,
};

struct Fuzz;

impl Grammar for Fuzz {
    fn name(&self) -> &str {
        "fuzz"
    }
}

#[derive(Debug, Arbitrary)]
enum Op {
    Advance(Terminal),
    Match(String),
    Branch,
    Accept,
    Reject,
    Write(String),
    BindAttribute(String, Value),
    GetState,
}

impl From<Op> for Instruction {
    fn from(op: Op) -> Self {
        match op {
            Op::Advance(terminal) => Instruction::Advance(terminal),
            Op::Match(text) => Instruction::Match(Pattern::literal(text)),
            Op::Branch => Instruction::Branch,
            Op::Accept => Instruction::Accept,
            Op::Reject => Instruction::Reject,
            Op::Write(text) => Instruction::Write(text),
            Op::BindAttribute(key, value) => Instruction::BindAttribute { key, value },
            Op::GetState => Instruction::GetState,
        }
    }
}

#[derive(Debug, Arbitrary)]
struct Input {
    units: Vec<Unit>,
    ops: Vec<Op>,
}

fuzz_target!(|input: Input| {
    let config = ParseConfig::new().with_max_branch_depth(16).with_max_instructions(4096);
    let ctx = Context::with_config(Fuzz, config);
    let instructions = input.ops.into_iter().map(Instruction::from).collect();
    let interpreter = Interpreter::new(
        &ctx,
        Source::from_units(input.units),
        CstBuilder::new(),
        script(instructions),
    );
    if let Ok(builder) = interpreter.run_blocking() {
        let _ = builder.finish().map(|doc| doc.to_string());
    }
});
