/*! End-to-end tests. */
use std::ops::Range;

use pretty_assertions::assert_eq;

use crate::atoms::{DIGIT, WORD};
use crate::{
    Config, Count, Error, Limits, NodeId, PatternBuilder, Regex, Strategy,
};

fn regex(build: impl FnOnce(&mut PatternBuilder) -> NodeId) -> Regex {
    regex_with_config(build, &Config::default())
}

fn regex_with_config(
    build: impl FnOnce(&mut PatternBuilder) -> NodeId,
    config: &Config,
) -> Regex {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut b = PatternBuilder::new();
    let root = build(&mut b);
    Regex::with_config(b.build(root).unwrap(), config).unwrap()
}

/// Configuration with every optimization disabled.
fn unoptimized() -> Config {
    let mut config = Config::default();
    config.eval.optimize_pattern = false;
    config.eval.possessive_optimization = false;
    config
}

/// Configuration where every evaluation runs, without optimizations and
/// without skipping start positions or inputs based on static analysis.
fn exhaustive() -> Config {
    let mut config = unoptimized();
    config.eval.static_analysis = false;
    config
}

macro_rules! search {
    ($regex:expr, $input:expr, $expected:expr) => {{
        let expected: Option<Range<usize>> = $expected;
        assert_eq!(
            $regex.search_str($input).get(0),
            expected,
            "\n\nsearching {:?} in {:?}",
            $regex,
            $input
        );
        assert_eq!(
            $regex.search_bytes($input.as_bytes()).get(0),
            expected,
            "\n\nsearching {:?} in bytes {:?}",
            $regex,
            $input
        );
    }};
}

macro_rules! match_true {
    ($regex:expr, $input:expr) => {{
        assert!(
            $regex.match_str($input).is_match(),
            "\n\n{:?} should match {:?}",
            $regex,
            $input
        );
        assert!($regex.is_match($input.as_bytes()));
    }};
}

macro_rules! match_false {
    ($regex:expr, $input:expr) => {{
        assert!(
            !$regex.match_str($input).is_match(),
            "\n\n{:?} should not match {:?}",
            $regex,
            $input
        );
        assert!(!$regex.is_match($input.as_bytes()));
    }};
}

/// All the strings of length `0..=max_len` over `alphabet`.
fn strings(alphabet: &str, max_len: usize) -> Vec<String> {
    let mut result = vec![String::new()];
    let mut last = vec![String::new()];
    for _ in 0..max_len {
        let mut next = Vec::new();
        for s in &last {
            for c in alphabet.chars() {
                next.push(format!("{}{}", s, c));
            }
        }
        result.extend(next.iter().cloned());
        last = next;
    }
    result
}

#[test]
fn literal_search() {
    let re = regex(|b| b.string("needle"));

    search!(re, "...needle...", Some(3..9));
    search!(re, "needle", Some(0..6));
    search!(re, "nneedle", Some(1..7));
    search!(re, "...noodle...", None);
    search!(re, "", None);

    match_true!(re, "needle");
    match_false!(re, "needles");
    assert_eq!(re.starts_with_str("needles").get(0), Some(0..6));
    assert!(!re.starts_with_str("a needle").is_match());
}

#[test]
fn alternation() {
    // cat|car
    let re = regex(|b| {
        let cat = b.string("cat");
        let car = b.string("car");
        b.select([cat, car])
    });

    match_true!(re, "cat");
    match_true!(re, "car");
    match_false!(re, "cab");
    match_false!(re, "ca");
    search!(re, "a scar", Some(3..6));

    // Ordered choice: the first branch that leads to a match wins.
    let re = regex(|b| {
        let a = b.char('a');
        let ab = b.string("ab");
        b.select([a, ab])
    });

    assert_eq!(re.starts_with_str("ab").get(0), Some(0..1));
    assert_eq!(re.match_str("ab").get(0), Some(0..2));
}

#[test]
fn captures() {
    // (a)b
    let re = regex(|b| {
        let a = b.char('a');
        let cap = b.capture(1, a);
        let bb = b.char('b');
        b.sequence([cap, bb])
    });

    let captures = re.match_str("ab");
    assert!(captures.is_match());
    assert_eq!(captures.len(), 2);
    assert_eq!(captures.get(0), Some(0..2));
    assert_eq!(captures.get(1), Some(0..1));

    let captures = re.match_str("ac");
    assert!(!captures.is_match());
    assert_eq!(captures.get(0), None);
    assert_eq!(captures.get(1), None);
}

#[test]
fn named_captures() {
    // (?<year>\d+)-(?<month>\d+)
    let re = regex(|b| {
        let digit = b.class(DIGIT);
        let year = b.plus(digit);
        let year = b.capture_with_name(1, "year", year);
        let dash = b.char('-');
        let month = b.plus(digit);
        let month = b.capture_with_name(2, "month", month);
        b.sequence([year, dash, month])
    });

    assert_eq!(re.capture_count(), 2);
    assert_eq!(re.capture_id("year"), Some(1));
    assert_eq!(re.capture_id("month"), Some(2));
    assert_eq!(re.capture_id("day"), None);

    let captures = re.search_str("on 2024-06!");
    assert_eq!(captures.get(1), Some(3..7));
    assert_eq!(captures.get(2), Some(8..10));
}

#[test]
fn back_references() {
    // (a|b)\1
    let re = regex(|b| {
        let a = b.char('a');
        let bb = b.char('b');
        let sel = b.select([a, bb]);
        let cap = b.capture(1, sel);
        let backref = b.back_reference(1);
        b.sequence([cap, backref])
    });

    match_true!(re, "aa");
    match_true!(re, "bb");
    match_false!(re, "ab");
    search!(re, "abba", Some(1..3));
}

#[test]
fn empty_input() {
    let star = regex(|b| {
        let a = b.char('a');
        b.star(a)
    });

    let plus = regex(|b| {
        let a = b.char('a');
        b.plus(a)
    });

    match_true!(star, "");
    match_false!(plus, "");
    search!(star, "", Some(0..0));
    search!(star, "bbb", Some(0..0));
    search!(plus, "", None);
    search!(plus, "bbaa", Some(2..4));
}

#[test]
fn empty_loops_terminate() {
    // (a*)*b
    let re = regex(|b| {
        let a = b.char('a');
        let inner = b.star(a);
        let cap = b.capture(1, inner);
        let outer = b.star(cap);
        let bb = b.char('b');
        b.sequence([outer, bb])
    });

    match_true!(re, "aaab");
    match_true!(re, "b");
    match_false!(re, "aaa");
    search!(re, "xaab", Some(1..4));
    search!(re, "aaaaaaaaaaaaaaaaaaaa", None);
}

#[test]
fn empty_and_unset_captures() {
    // (a*)b
    let re = regex(|b| {
        let a = b.char('a');
        let star = b.star(a);
        let cap = b.capture(1, star);
        let bb = b.char('b');
        b.sequence([cap, bb])
    });

    assert_eq!(re.match_str("b").get(1), Some(0..0));

    // (a)*b
    let re = regex(|b| {
        let a = b.char('a');
        let cap = b.capture(1, a);
        let star = b.star(cap);
        let bb = b.char('b');
        b.sequence([star, bb])
    });

    assert_eq!(re.match_str("b").get(1), None);
    assert_eq!(re.match_str("aab").get(1), Some(1..2));
}

#[test]
fn evaluation_is_idempotent() {
    let re = regex(|b| {
        let word = b.class(WORD);
        let plus = b.plus(word);
        let cap = b.capture(1, plus);
        let space = b.char(' ');
        b.sequence([cap, space])
    });

    let first = re.search_str("foo bar ");
    let second = re.search_str("foo bar ");

    assert_eq!(first, second);
    assert_eq!(first.get(1), Some(0..3));
}

#[test]
fn anchors() {
    // \Aab
    let re = regex(|b| {
        let begin = b.subject_begin();
        let ab = b.string("ab");
        b.sequence([begin, ab])
    });

    search!(re, "abc", Some(0..2));
    search!(re, "cab", None);

    // a+\z
    let re = regex(|b| {
        let a = b.char('a');
        let plus = b.plus(a);
        let end = b.subject_end();
        b.sequence([plus, end])
    });

    search!(re, "baaa", Some(1..4));
    search!(re, "aab", None);

    // a{2}\z only needs to look at the last two characters.
    let re = regex(|b| {
        let a = b.char('a');
        let two = b.repeat(a, 2, 2);
        let end = b.subject_end();
        b.sequence([two, end])
    });

    search!(re, "aaaa", Some(2..4));
    assert_eq!(re.search_str("ñaa").get(0), Some(2..4));
}

#[test]
fn multiline() {
    let build = |b: &mut PatternBuilder| {
        let begin = b.line_begin();
        let bb = b.char('b');
        let any = b.any();
        let rest = b.star(any);
        let end = b.line_end();
        b.sequence([begin, bb, rest, end])
    };

    let mut config = Config::default();
    config.eval.multiline = true;

    let single = regex(build);
    let multi = regex_with_config(build, &config);

    search!(single, "a\nbc\nd", None);
    search!(multi, "a\nbc\nd", Some(2..4));
    search!(single, "bc\nd", Some(0..4));
    search!(multi, "bc\nd", Some(0..2));
}

#[test]
fn static_rejection() {
    let re = regex(|b| {
        let a = b.char('a');
        b.repeat(a, 5, 5)
    });

    assert_eq!(
        re.limits(),
        Limits { min: Count::Exact(5), max: Count::Exact(5) }
    );

    search!(re, "aaaa", None);
    search!(re, "aaaaa", Some(0..5));
    match_false!(re, "aaaa");
}

#[test]
fn limits() {
    // a+(bc|d)?
    let re = regex(|b| {
        let a = b.char('a');
        let plus = b.plus(a);
        let bc = b.string("bc");
        let d = b.char('d');
        let sel = b.select([bc, d]);
        let opt = b.optional(sel);
        b.sequence([plus, opt])
    });

    assert_eq!(
        re.limits(),
        Limits { min: Count::Exact(1), max: Count::Infinite }
    );
}

#[test]
fn non_latin1_literals() {
    // ñu+
    let re = regex(|b| {
        let n = b.string("ñu");
        let u = b.char('u');
        let star = b.star(u);
        b.sequence([n, star])
    });

    assert_eq!(re.search_str("el ñuu").get(0), Some(3..7));
    assert!(!re.search_bytes("el ñuu".as_bytes()).is_match());

    // Latin-1 view of bytes: ñ is the byte 0xf1.
    assert_eq!(re.search_bytes(b"el \xf1uu").get(0), Some(3..6));

    let re = regex(|b| b.string("€€"));
    assert!(!re.search_bytes(b"\xac\xac").is_match());
    assert_eq!(re.search_str("1€€").get(0), Some(1..7));
}

#[test]
fn forward_only() {
    // (a|b)*c
    let build = |b: &mut PatternBuilder| {
        let a = b.char('a');
        let bb = b.char('b');
        let sel = b.select([a, bb]);
        let cap = b.capture(1, sel);
        let star = b.star(cap);
        let c = b.char('c');
        b.sequence([star, c])
    };

    let bidirectional = regex(build);
    let forward = regex(build).forward_only().unwrap();

    for input in strings("abc", 5) {
        assert_eq!(
            forward.search_iter(input.chars()),
            bidirectional.search_str(&input),
            "\n\nsearching in {:?}",
            input
        );
        assert_eq!(
            forward.match_iter(input.chars()),
            bidirectional.match_str(&input),
        );
        assert_eq!(
            forward.starts_with_iter(input.chars()),
            bidirectional.starts_with_str(&input),
        );
    }

    let boundary = regex(|b| {
        let start = b.boundary();
        let foo = b.string("foo");
        b.sequence([start, foo])
    });

    assert!(matches!(
        boundary.forward_only(),
        Err(Error::RequiresBidirectional)
    ));

    // Line-begin only looks behind in multiline mode.
    let line_begin = |b: &mut PatternBuilder| {
        let begin = b.line_begin();
        let a = b.char('a');
        b.sequence([begin, a])
    };

    let mut config = Config::default();
    config.eval.multiline = true;

    assert!(regex(line_begin).forward_only().is_ok());
    assert!(matches!(
        regex_with_config(line_begin, &config).forward_only(),
        Err(Error::RequiresBidirectional)
    ));
}

/// Patterns whose results must not depend on the optimizations.
fn optimization_cases() -> Vec<fn(&mut PatternBuilder) -> NodeId> {
    vec![
        // a*ab
        |b: &mut PatternBuilder| {
            let a = b.char('a');
            let star = b.star(a);
            let ab = b.string("ab");
            b.sequence([star, ab])
        },
        // (a|ab)(c|bc)
        |b: &mut PatternBuilder| {
            let a = b.char('a');
            let ab = b.string("ab");
            let sel1 = b.select([a, ab]);
            let cap1 = b.capture(1, sel1);
            let c = b.char('c');
            let bc = b.string("bc");
            let sel2 = b.select([c, bc]);
            let cap2 = b.capture(2, sel2);
            b.sequence([cap1, cap2])
        },
        // (a+)(b*)c?
        |b: &mut PatternBuilder| {
            let a = b.char('a');
            let plus = b.plus(a);
            let cap1 = b.capture(1, plus);
            let bb = b.char('b');
            let star = b.star(bb);
            let cap2 = b.capture(2, star);
            let c = b.char('c');
            let opt = b.optional(c);
            b.sequence([cap1, cap2, opt])
        },
        // (a*?)b
        |b: &mut PatternBuilder| {
            let a = b.char('a');
            let lazy = b.lazy_repeat(a, 0, 0);
            let cap = b.capture(1, lazy);
            let bb = b.char('b');
            b.sequence([cap, bb])
        },
        // (ab|a)*c
        |b: &mut PatternBuilder| {
            let ab = b.string("ab");
            let a = b.char('a');
            let sel = b.select([ab, a]);
            let star = b.star(sel);
            let c = b.char('c');
            b.sequence([star, c])
        },
        // ([ab])*b
        |b: &mut PatternBuilder| {
            let set = b.enumeration("ab");
            let cap = b.capture(1, set);
            let star = b.star(cap);
            let bb = b.char('b');
            b.sequence([star, bb])
        },
        // a{1,3}b{0,2}a+a*
        |b: &mut PatternBuilder| {
            let a = b.char('a');
            let bb = b.char('b');
            let ra = b.repeat(a, 1, 3);
            let rb = b.repeat(bb, 0, 2);
            let plus = b.plus(a);
            let star = b.star(a);
            b.sequence([ra, rb, plus, star])
        },
        // (?=a)([ab])+
        |b: &mut PatternBuilder| {
            let a = b.char('a');
            let look = b.lookahead_positive(a);
            let set = b.enumeration("ab");
            let cap = b.capture(1, set);
            let plus = b.plus(cap);
            b.sequence([look, plus])
        },
        // (a?)\1b
        |b: &mut PatternBuilder| {
            let a = b.char('a');
            let opt = b.optional(a);
            let cap = b.capture(1, opt);
            let backref = b.back_reference(1);
            let bb = b.char('b');
            b.sequence([cap, backref, bb])
        },
        // a*b*c*
        |b: &mut PatternBuilder| {
            let a = b.char('a');
            let bb = b.char('b');
            let c = b.char('c');
            let sa = b.star(a);
            let sb = b.star(bb);
            let sc = b.star(c);
            b.sequence([sa, sb, sc])
        },
        // (?!ab)[abc]+
        |b: &mut PatternBuilder| {
            let ab = b.string("ab");
            let look = b.lookahead_negative(ab);
            let set = b.enumeration("abc");
            let plus = b.plus(set);
            b.sequence([look, plus])
        },
        // ([ab]*)c\1
        |b: &mut PatternBuilder| {
            let set = b.enumeration("ab");
            let star = b.star(set);
            let cap = b.capture(1, star);
            let c = b.char('c');
            let backref = b.back_reference(1);
            b.sequence([cap, c, backref])
        },
        // (x|)(c|a|b)
        |b: &mut PatternBuilder| {
            let x = b.char('x');
            let e = b.empty();
            let sel1 = b.select([x, e]);
            let cap1 = b.capture(1, sel1);
            let c = b.char('c');
            let a = b.char('a');
            let bb = b.char('b');
            let sel2 = b.select([c, a, bb]);
            let cap2 = b.capture(2, sel2);
            b.sequence([cap1, cap2])
        },
        // a+$
        |b: &mut PatternBuilder| {
            let a = b.char('a');
            let plus = b.plus(a);
            let end = b.line_end();
            b.sequence([plus, end])
        },
    ]
}

#[test]
fn optimizations_do_not_change_results() {
    let inputs = strings("abc", 6);

    for build in optimization_cases() {
        let optimized = regex(build);
        let plain = regex_with_config(build, &unoptimized());

        for input in &inputs {
            assert_eq!(
                optimized.search_str(input),
                plain.search_str(input),
                "\n\nsearching {:?} in {:?}",
                plain,
                input
            );
            assert_eq!(
                optimized.match_str(input),
                plain.match_str(input),
                "\n\nmatching {:?} against {:?}",
                plain,
                input
            );
        }
    }
}

#[test]
fn possessive_conversion() {
    // a*b becomes possessive, a*a doesn't.
    let re = regex(|b| {
        let a = b.char('a');
        let star = b.star(a);
        let bb = b.char('b');
        b.sequence([star, bb])
    });

    assert!(format!("{:?}", re).contains("Possessive"));

    let re = regex(|b| {
        let a = b.char('a');
        let star = b.star(a);
        b.sequence([star, a])
    });

    assert!(!format!("{:?}", re).contains("Possessive"));
    match_true!(re, "aaa");
}

#[test]
fn literal_searcher_strategies() {
    use crate::{LiteralSearcher, SearchConfig};

    let mut config = SearchConfig::default();
    config.simd = false;

    assert_eq!(
        LiteralSearcher::with_config(b"needle", &config).strategy(),
        Strategy::Dfa
    );

    const POS: Option<usize> = crate::find_literal(b"...needle...", b"needle");
    assert_eq!(POS, Some(3));
}

#[test]
fn back_reference_to_repeated_capture_id() {
    // (?:(aaaa)|(b))\1 with both groups numbered 1
    let re = regex(|b| {
        let aaaa = b.string("aaaa");
        let cap_a = b.capture(1, aaaa);
        let bb = b.char('b');
        let cap_b = b.capture(1, bb);
        let sel = b.select([cap_a, cap_b]);
        let backref = b.back_reference(1);
        b.sequence([sel, backref])
    });

    assert_eq!(
        re.limits(),
        Limits { min: Count::Exact(2), max: Count::Exact(8) }
    );

    match_true!(re, "bb");
    match_true!(re, "aaaaaaaa");
    match_false!(re, "aaaab");
    search!(re, "abb", Some(1..3));
    assert_eq!(re.match_str("bb").get(1), Some(0..1));
}

/// Patterns that exercise the length limits, the anchors and the leading
/// literal.
fn analysis_cases() -> Vec<fn(&mut PatternBuilder) -> NodeId> {
    vec![
        // (?:(aaaa)|(b))\1 with both groups numbered 1
        |b: &mut PatternBuilder| {
            let aaaa = b.string("aaaa");
            let cap_a = b.capture(1, aaaa);
            let bb = b.char('b');
            let cap_b = b.capture(1, bb);
            let sel = b.select([cap_a, cap_b]);
            let backref = b.back_reference(1);
            b.sequence([sel, backref])
        },
        // (a{2,3})\1\z
        |b: &mut PatternBuilder| {
            let a = b.char('a');
            let rep = b.repeat(a, 2, 3);
            let cap = b.capture(1, rep);
            let backref = b.back_reference(1);
            let end = b.subject_end();
            b.sequence([cap, backref, end])
        },
        // ([ab]){2}\z
        |b: &mut PatternBuilder| {
            let set = b.enumeration("ab");
            let cap = b.capture(1, set);
            let two = b.repeat(cap, 2, 2);
            let end = b.subject_end();
            b.sequence([two, end])
        },
        // \Aab*
        |b: &mut PatternBuilder| {
            let begin = b.subject_begin();
            let a = b.char('a');
            let bb = b.char('b');
            let star = b.star(bb);
            b.sequence([begin, a, star])
        },
        // abc
        |b: &mut PatternBuilder| b.string("abc"),
        // ca(b|c)\1
        |b: &mut PatternBuilder| {
            let ca = b.string("ca");
            let bb = b.char('b');
            let c = b.char('c');
            let sel = b.select([bb, c]);
            let cap = b.capture(1, sel);
            let backref = b.back_reference(1);
            b.sequence([ca, cap, backref])
        },
        // ^b|a$
        |b: &mut PatternBuilder| {
            let begin = b.line_begin();
            let bb = b.char('b');
            let left = b.sequence([begin, bb]);
            let a = b.char('a');
            let end = b.line_end();
            let right = b.sequence([a, end]);
            b.select([left, right])
        },
        // (?=ab)(a)\1?b{3}
        |b: &mut PatternBuilder| {
            let ab = b.string("ab");
            let look = b.lookahead_positive(ab);
            let a = b.char('a');
            let cap = b.capture(1, a);
            let backref = b.back_reference(1);
            let opt = b.optional(backref);
            let bb = b.char('b');
            let three = b.repeat(bb, 3, 3);
            b.sequence([look, cap, opt, three])
        },
        // (b)\1(b)\2a{2}\z
        |b: &mut PatternBuilder| {
            let b1 = b.char('b');
            let cap1 = b.capture(1, b1);
            let r1 = b.back_reference(1);
            let b2 = b.char('b');
            let cap2 = b.capture(2, b2);
            let r2 = b.back_reference(2);
            let a = b.char('a');
            let aa = b.repeat(a, 2, 2);
            let end = b.subject_end();
            b.sequence([cap1, r1, cap2, r2, aa, end])
        },
    ]
}

#[test]
fn static_analysis_does_not_change_results() {
    let inputs = strings("abc", 6);

    for build in analysis_cases() {
        let analyzed = regex(build);
        let plain = regex_with_config(build, &exhaustive());

        for input in &inputs {
            assert_eq!(
                analyzed.search_str(input),
                plain.search_str(input),
                "\n\nsearching {:?} in {:?}",
                plain,
                input
            );
            assert_eq!(
                analyzed.search_bytes(input.as_bytes()),
                plain.search_bytes(input.as_bytes()),
                "\n\nsearching {:?} in bytes {:?}",
                plain,
                input
            );
            assert_eq!(
                analyzed.match_str(input),
                plain.match_str(input),
                "\n\nmatching {:?} against {:?}",
                plain,
                input
            );
            assert_eq!(
                analyzed.starts_with_str(input),
                plain.starts_with_str(input),
                "\n\nmatching {:?} at the start of {:?}",
                plain,
                input
            );
        }
    }
}
