//! End-to-end tests: SIMPLE source in, query results out.

use spaql::QueryEngine;

fn engine_for(source: &str) -> QueryEngine {
    let mut engine = QueryEngine::new();
    engine.parse_source(source).expect("source should parse");
    engine
}

fn ask(engine: &QueryEngine, query: &str) -> Vec<String> {
    let mut results = Vec::new();
    engine.evaluate(query, &mut results);
    results
}

const MAIN: &str = r#"
    procedure main {
        while (y == 3) {
            gucci = 1;
        }
        if (!(armani == gucci)) then {
            armani = 7;
        } else {
            apple = 1;
        }
        some_var = 23 + another_var;
    }
"#;

#[test]
fn test_follows_direct() {
    let engine = engine_for(MAIN);
    assert_eq!(ask(&engine, "stmt s; Select s such that Follows(1, s)"), vec!["3"]);
}

#[test]
fn test_follows_transitive() {
    let engine = engine_for(MAIN);
    assert_eq!(
        ask(&engine, "stmt s; Select s such that Follows*(1, s)"),
        vec!["3", "6"]
    );
}

#[test]
fn test_parent_transitive() {
    let engine = engine_for(MAIN);
    assert_eq!(
        ask(&engine, "stmt s; Select s such that Parent*(3, s)"),
        vec!["4", "5"]
    );
}

#[test]
fn test_modifies_of_container() {
    let engine = engine_for(MAIN);
    assert_eq!(
        ask(&engine, "variable v; Select v such that Modifies(3, v)"),
        vec!["apple", "armani"]
    );
}

#[test]
fn test_pattern_partial_match() {
    let engine = engine_for(MAIN);
    assert_eq!(
        ask(&engine, "assign a; Select a pattern a(_, _\"another_var\"_)"),
        vec!["6"]
    );
}

#[test]
fn test_boolean_results() {
    let engine = engine_for(MAIN);
    assert_eq!(ask(&engine, "Select BOOLEAN such that Follows(1, 3)"), vec!["TRUE"]);
    assert_eq!(ask(&engine, "Select BOOLEAN such that Follows(1, 4)"), vec!["FALSE"]);
}

const PROC: &str = r#"
    procedure Proc {
        while (i<10) {
            x = y;
            y = x;
            if (u==1) then {
                y = y;
            } else {
                unrelated = 0;
            }
            i = i + 1;
        }
        unrelated = x+y+i;
    }
"#;

#[test]
fn test_affects_direct() {
    let engine = engine_for(PROC);
    assert_eq!(
        ask(&engine, "assign a; Select a such that Affects(2, a)"),
        vec!["3", "8"]
    );
}

#[test]
fn test_affects_transitive_cycle() {
    let engine = engine_for(PROC);
    assert_eq!(
        ask(&engine, "assign a; Select a such that Affects*(2, a)"),
        vec!["2", "3", "5", "8"]
    );
}

#[test]
fn test_next_within_loop() {
    let engine = engine_for(PROC);
    assert_eq!(ask(&engine, "stmt s; Select s such that Next(1, s)"), vec!["2", "8"]);
    // The loop makes every body statement reach itself transitively.
    assert_eq!(
        ask(&engine, "Select BOOLEAN such that Next*(2, 2)"),
        vec!["TRUE"]
    );
}

const CALLS: &str = r#"
    procedure driver {
        total = 0;
        call accumulate;
        print total;
    }
    procedure accumulate {
        while (count > 0) {
            call step;
            count = count - 1;
        }
    }
    procedure step {
        total = total + count;
    }
"#;

#[test]
fn test_calls_and_closure() {
    let engine = engine_for(CALLS);
    assert_eq!(
        ask(&engine, "procedure p; Select p such that Calls(\"driver\", p)"),
        vec!["accumulate"]
    );
    assert_eq!(
        ask(&engine, "procedure p; Select p such that Calls*(\"driver\", p)"),
        vec!["accumulate", "step"]
    );
    assert_eq!(
        ask(&engine, "procedure p; Select p such that Calls*(p, \"step\")"),
        vec!["accumulate", "driver"]
    );
}

#[test]
fn test_uses_through_calls() {
    let engine = engine_for(CALLS);
    // The call statement inherits the callee's uses.
    assert_eq!(
        ask(&engine, "variable v; Select v such that Uses(2, v)"),
        vec!["count", "total"]
    );
    assert_eq!(
        ask(&engine, "procedure p; Select p such that Modifies(p, \"total\")"),
        vec!["accumulate", "driver", "step"]
    );
}

#[test]
fn test_next_bip_crosses_procedures() {
    let engine = engine_for(CALLS);
    // Numbers: driver 1,2,3; accumulate 4,5,6; step 7.
    // The call at 2 flows into accumulate's entry, not to 3 directly.
    assert_eq!(ask(&engine, "stmt s; Select s such that NextBip(2, s)"), vec!["4"]);
    // The while header is accumulate's exit, returning to 3.
    assert_eq!(
        ask(&engine, "stmt s; Select s such that NextBip(4, s)"),
        vec!["3", "5"]
    );
    // Nested call and return: step's only statement goes back to 6.
    assert_eq!(ask(&engine, "stmt s; Select s such that NextBip(7, s)"), vec!["6"]);
    assert_eq!(
        ask(&engine, "stmt s; Select s such that NextBip*(1, s)"),
        vec!["2", "3", "4", "5", "6", "7"]
    );
}

#[test]
fn test_affects_bip_crosses_procedures() {
    let engine = engine_for(CALLS);
    // total = 0 feeds step's total = total + count through the call chain.
    assert_eq!(
        ask(&engine, "assign a; Select a such that AffectsBip(1, a)"),
        vec!["7"]
    );
    // And step's write feeds itself on the next loop iteration.
    assert_eq!(
        ask(&engine, "assign a; Select a such that AffectsBip(7, a)"),
        vec!["7"]
    );
}

#[test]
fn test_tuple_and_attributes() {
    let engine = engine_for(CALLS);
    assert_eq!(
        ask(&engine, "call c; Select <c, c.procName>"),
        vec!["2 accumulate", "5 step"]
    );
    assert_eq!(
        ask(
            &engine,
            "call c; Select c with c.procName = \"step\""
        ),
        vec!["5"]
    );
    assert_eq!(ask(&engine, "print pr; Select pr.varName"), vec!["total"]);
}

#[test]
fn test_while_pattern() {
    let engine = engine_for(CALLS);
    assert_eq!(
        ask(&engine, "while w; variable v; Select <w, v> pattern w(v, _)"),
        vec!["4 count"]
    );
}

#[test]
fn test_if_pattern() {
    let engine = engine_for(MAIN);
    assert_eq!(
        ask(&engine, "if ifs; variable v; Select v pattern ifs(v, _, _)"),
        vec!["armani", "gucci"]
    );
}

#[test]
fn test_multi_clause_join() {
    let engine = engine_for(PROC);
    assert_eq!(
        ask(
            &engine,
            "assign a; while w; Select a such that Parent*(w, a) pattern a(\"y\", _)"
        ),
        vec!["3", "5"]
    );
}

#[test]
fn test_exact_pattern_requires_full_side() {
    let engine = engine_for(PROC);
    assert_eq!(
        ask(&engine, "assign a; Select a pattern a(_, \"i + 1\")"),
        vec!["7"]
    );
    assert_eq!(
        ask(&engine, "assign a; Select a pattern a(_, \"i\")"),
        Vec::<String>::new()
    );
    assert_eq!(
        ask(&engine, "assign a; Select a pattern a(_, _\"i\"_)"),
        vec!["7", "8"]
    );
}

#[test]
fn test_pattern_is_whitespace_insensitive() {
    let engine = engine_for(MAIN);
    let spaced = ask(&engine, "assign a; Select a pattern a(_, \"23   +   another_var\")");
    let tight = ask(&engine, "assign a; Select a pattern a(_, \"23+another_var\")");
    assert_eq!(spaced, tight);
    assert_eq!(spaced, vec!["6"]);
}

#[test]
fn test_synonym_renaming_is_irrelevant() {
    let engine = engine_for(MAIN);
    let a = ask(&engine, "stmt s; Select s such that Follows*(1, s)");
    let b = ask(&engine, "stmt anything_else; Select anything_else such that Follows*(1, anything_else)");
    assert_eq!(a, b);
}

#[test]
fn test_same_query_twice_is_identical() {
    let engine = engine_for(CALLS);
    let query = "assign a; stmt s; Select <s, a> such that Affects*(s, a)";
    assert_eq!(ask(&engine, query), ask(&engine, query));
}

#[test]
fn test_cyclic_program_is_rejected_and_silenced() {
    let mut engine = QueryEngine::new();
    let result = engine.parse_source("procedure a { call b; } procedure b { call a; }");
    assert!(result.is_err());
    assert!(engine.has_parse_failed());
    assert_eq!(ask(&engine, "stmt s; Select s"), Vec::<String>::new());
}

#[test]
fn test_parse_file_entry_point() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, "procedure main {{ x = 1; print x; }}").expect("write");

    let mut engine = QueryEngine::new();
    engine.parse_file(file.path()).expect("parse_file");
    assert_eq!(ask(&engine, "print p; Select p"), vec!["2"]);
}
