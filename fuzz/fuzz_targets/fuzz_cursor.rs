#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use trellis::{Source, Unit};

#[derive(Debug, Arbitrary)]
enum Op {
    Advance(u8),
    Branch,
    Accept,
    Reject,
    Shift,
    Unshift,
}

#[derive(Debug, Arbitrary)]
struct Input {
    units: Vec<Unit>,
    ops: Vec<Op>,
}

fuzz_target!(|input: Input| {
    let len = input.units.len();
    let mut forks = vec![Source::from_units(input.units).into_cursor()];
    let mut offsets = vec![0usize];

    for op in input.ops {
        let Some(cursor) = forks.last_mut() else {
            break;
        };
        match op {
            Op::Advance(n) => {
                let n = usize::from(n);
                let before = cursor.offset();
                match cursor.try_advance(n) {
                    Ok(()) => assert_eq!(cursor.offset(), before + n),
                    Err(_) => assert_eq!(cursor.offset(), before),
                }
                assert!(cursor.offset() <= len);
            }
            Op::Branch => {
                let fork = cursor.branch();
                offsets.push(fork.offset());
                forks.push(fork);
            }
            Op::Accept if forks.len() > 1 => {
                let Some(child) = forks.pop() else { break };
                offsets.pop();
                let offset = child.offset();
                if let Some(parent) = forks.last_mut() {
                    parent.accept(child);
                    assert_eq!(parent.offset(), offset);
                }
            }
            Op::Reject if forks.len() > 1 => {
                let Some(child) = forks.pop() else { break };
                child.reject();
                offsets.pop();
                if let (Some(parent), Some(offset)) = (forks.last(), offsets.last()) {
                    assert!(parent.offset() >= *offset);
                }
            }
            Op::Shift => {
                let held = cursor.holding();
                assert_eq!(cursor.shift().is_ok(), !held);
            }
            Op::Unshift => {
                let held = cursor.holding();
                assert_eq!(cursor.unshift().is_ok(), held);
            }
            Op::Accept | Op::Reject => {}
        }
    }
});
