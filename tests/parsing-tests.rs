#[test]
fn tour_parses_cleanly_and_reprints_stably() {
    let src = include_str!("testfiles/tour.manit");

    let (program, errors) = manit::parse(src);
    assert!(errors.is_empty(), "parse errors: {errors:?}");

    let printed = program.to_string();
    let (reparsed, errors) = manit::parse(&printed);
    assert!(errors.is_empty(), "reparse errors: {errors:?}");
    assert_eq!(reparsed.to_string(), printed);
}

#[test]
fn every_statement_form_is_recognized() {
    let (program, errors) = manit::parse("let a = 1; var b = 2; struct S { x: i32 }; return a; a + b;");
    assert!(errors.is_empty(), "parse errors: {errors:?}");
    assert_eq!(program.statements.len(), 5);
}

#[test]
fn partial_parse_keeps_the_good_statements() {
    let (program, errors) = manit::parse("let ! = 3; var ok = 1;");
    assert!(!errors.is_empty());
    assert!(program
        .statements
        .iter()
        .any(|stmt| stmt.to_string() == "var ok = 1;"));
}
