#![no_main]
use libfuzzer_sys::fuzz_target;
use retrack::{Config, NodeId, PatternBuilder, Regex};

/// Builds a pattern over the alphabet `abc` by interpreting each byte as an
/// operation on a stack of nodes.
fn build(ops: &[u8]) -> Option<(PatternBuilder, NodeId)> {
    let mut b = PatternBuilder::new();
    let mut stack: Vec<NodeId> = Vec::new();
    let mut captures = 0;

    for op in ops {
        match op % 12 {
            0 => stack.push(b.char('a')),
            1 => stack.push(b.char('b')),
            2 => stack.push(b.enumeration("bc")),
            3 => stack.push(b.empty()),
            4 => {
                let body = stack.pop()?;
                stack.push(b.star(body));
            }
            5 => {
                let body = stack.pop()?;
                stack.push(b.lazy_repeat(body, 1, 0));
            }
            6 => {
                let body = stack.pop()?;
                stack.push(b.repeat(body, 0, 2));
            }
            7 => {
                let second = stack.pop()?;
                let first = stack.pop()?;
                stack.push(b.sequence([first, second]));
            }
            8 => {
                let second = stack.pop()?;
                let first = stack.pop()?;
                stack.push(b.select([first, second]));
            }
            9 => {
                let body = stack.pop()?;
                captures += 1;
                stack.push(b.capture(captures, body));
            }
            10 => {
                let body = stack.pop()?;
                stack.push(b.lookahead_negative(body));
            }
            _ => stack.push(b.line_end()),
        }
    }

    let root = stack.pop()?;
    Some((b, root))
}

fuzz_target!(|data: &[u8]| {
    let Some((&split, data)) = data.split_first() else {
        return;
    };
    let split = (split as usize).min(data.len()).min(24);
    let (ops, input) = data.split_at(split);

    let input: String = input[..input.len().min(16)]
        .iter().map(|b| (b'a' + b % 3) as char).collect();

    let mut plain = Config::default();
    plain.eval.optimize_pattern = false;
    plain.eval.possessive_optimization = false;
    plain.eval.static_analysis = false;

    let Some((b, root)) = build(ops) else {
        return;
    };
    let Ok(pattern) = b.build(root) else {
        return;
    };

    let optimized = Regex::new(pattern.clone()).unwrap();
    let plain = Regex::with_config(pattern, &plain).unwrap();

    assert_eq!(optimized.search_str(&input), plain.search_str(&input));
    assert_eq!(optimized.match_str(&input), plain.match_str(&input));
});
