use inkwell::context::Context;

/// Run source through every stage and return the textual IR module.
/// Panics if any stage reports an error.
pub fn compile_to_ir(source: &str) -> String {
    let (program, errors) = manit::parse(source);
    assert!(errors.is_empty(), "parse errors: {errors:?}");

    let context = Context::create();
    let (module, errors) = manit::compile(&context, &program);
    assert!(errors.is_empty(), "codegen errors: {errors:?}");

    module.print_to_string().to_string()
}
