mod common;
use common::compile_to_ir;

#[test]
#[should_panic]
fn fail_parsing() {
    compile_to_ir("let = 5;");
}

#[test]
#[should_panic]
fn fail_illegal_character() {
    compile_to_ir("let x = $;");
}

#[test]
#[should_panic]
fn fail_unknown_variable() {
    compile_to_ir("return x;");
}

#[test]
#[should_panic]
fn fail_unknown_function() {
    compile_to_ir("return foo(1);");
}

#[test]
#[should_panic]
fn fail_wrong_argument_count() {
    compile_to_ir("let add = fn(x, y) { x + y; }; return add(1);");
}

#[test]
#[should_panic]
fn fail_for_initializer_escapes() {
    compile_to_ir("for (var i = 0; i < 3; i = i + 1) { } return i;");
}

#[test]
#[should_panic]
fn fail_bang_is_not_lowered() {
    compile_to_ir("return !true;");
}

#[test]
#[should_panic]
fn fail_bare_return_in_main() {
    // `return;` emits `ret void` inside the i32 entry; the verifier objects.
    compile_to_ir("return;");
}

#[test]
#[should_panic]
fn fail_indexing_a_scalar() {
    compile_to_ir("let x = 3; return x[0];");
}
