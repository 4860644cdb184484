//! IR generation
//!
//! This module lowers an AST to an LLVM module through [inkwell]. The main
//! interface is [compile].
//!
//! Top-level statements are lowered into a synthesized, externally linked
//! `main` function returning `i32`. Mutable locals live in entry-block stack
//! slots and are read and written through loads and stores; `if` expressions
//! join their branch values with a phi node; function literals become
//! internally linked module functions. A top-level `let main = fn ...`
//! binding replaces the synthesized `main`.
//!
//! Lowering is best-effort: a statement that fails records a [CodegenError]
//! and lowering continues with the next one. The module verifier runs last
//! and has the final word.

use std::collections::HashMap;

use miette::Diagnostic;
use thiserror::Error;

use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::{Linkage, Module};
use inkwell::types::{ArrayType, BasicMetadataTypeEnum, BasicTypeEnum, StructType};
use inkwell::values::{
    BasicMetadataValueEnum, BasicValueEnum, FunctionValue, IntValue, PointerValue,
};
use inkwell::IntPredicate;

use crate::ast::{
    BlockStatement, Expression, Identifier, InfixOperator, PrefixOperator, Program, Statement,
    StructField,
};

#[derive(Debug, Error, Diagnostic)]
pub enum CodegenError {
    #[error("The LLVM builder failed")]
    Builder(#[from] inkwell::builder::BuilderError),

    #[error("The name `{0}` is not bound")]
    UnknownVariable(String),

    #[error("The function `{0}` is unknown")]
    UnknownFunction(String),

    #[error("The function `{name}` takes {expected} arguments but {actual} were supplied")]
    WrongNumberOfArguments {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Only a function known by name can be called")]
    CalleeNotNamed,

    #[error("`{0}` is not an array and cannot be indexed")]
    NotIndexable(String),

    #[error("The prefix operator `{0}` is not supported")]
    UnsupportedPrefixOperator(PrefixOperator),

    #[error("Expected an integer operand")]
    ExpectedInteger,

    #[error("The type `{0}` is unknown")]
    UnknownType(String),

    #[error("The builder has no insertion point")]
    NoInsertionPoint,

    #[error("The module failed verification: {0}")]
    Verification(String),
}

type Result<T> = std::result::Result<T, CodegenError>;

/// Lower a program to an LLVM module.
///
/// The module is returned together with every error recorded along the way,
/// including a verifier failure; the caller decides what a non-empty error
/// list means for it. The module can be printed either way.
pub fn compile<'ctx>(
    context: &'ctx Context,
    program: &Program,
) -> (Module<'ctx>, Vec<CodegenError>) {
    let mut codegen = Codegen::new(context);
    codegen.lower_program(program);

    let Codegen {
        module, mut errors, ..
    } = codegen;

    if let Err(message) = module.verify() {
        errors.push(CodegenError::Verification(message.to_string()));
    }
    (module, errors)
}

/// A stack slot backing a named local: the alloca pointer plus the allocated
/// type. LLVM pointers are opaque, so the type has to be tracked here.
#[derive(Debug, Clone, Copy)]
struct Slot<'ctx> {
    ptr: PointerValue<'ctx>,
    ty: BasicTypeEnum<'ctx>,
}

/// Lexical scopes of the function currently being lowered, innermost frame
/// last. Function literals start from a fresh stack, so a nested body never
/// sees the enclosing function's names.
#[derive(Debug)]
struct Scopes<'ctx> {
    frames: Vec<HashMap<String, Slot<'ctx>>>,
}

impl<'ctx> Scopes<'ctx> {
    fn new() -> Self {
        Self {
            frames: vec![HashMap::new()],
        }
    }

    fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    fn bind(&mut self, name: &str, slot: Slot<'ctx>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), slot);
        }
    }

    fn lookup(&self, name: &str) -> Option<Slot<'ctx>> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).copied())
    }
}

/// What lowering an expression produces.
#[derive(Debug, Clone, Copy)]
enum Lowered<'ctx> {
    /// A first-class scalar value.
    Value(BasicValueEnum<'ctx>),

    /// An array's stack slot. Identifiers bound to arrays decay to this
    /// instead of loading the whole aggregate.
    ArraySlot(PointerValue<'ctx>, ArrayType<'ctx>),

    /// A module-level function, produced by function literals.
    Function(FunctionValue<'ctx>),
}

impl<'ctx> Lowered<'ctx> {
    fn as_basic(&self) -> BasicValueEnum<'ctx> {
        match self {
            Lowered::Value(value) => *value,
            Lowered::ArraySlot(ptr, _) => (*ptr).into(),
            Lowered::Function(function) => function.as_global_value().as_pointer_value().into(),
        }
    }

    fn as_int(&self) -> Option<IntValue<'ctx>> {
        match self {
            Lowered::Value(BasicValueEnum::IntValue(value)) => Some(*value),
            _ => None,
        }
    }
}

struct Codegen<'ctx> {
    context: &'ctx Context,
    builder: Builder<'ctx>,
    module: Module<'ctx>,
    scopes: Scopes<'ctx>,
    struct_types: HashMap<String, StructType<'ctx>>,
    user_main: Option<FunctionValue<'ctx>>,
    errors: Vec<CodegenError>,
}

impl<'ctx> Codegen<'ctx> {
    fn new(context: &'ctx Context) -> Self {
        Self {
            context,
            builder: context.create_builder(),
            module: context.create_module("manit"),
            scopes: Scopes::new(),
            struct_types: HashMap::new(),
            user_main: None,
            errors: Vec::new(),
        }
    }

    fn lower_program(&mut self, program: &Program) {
        let i32_type = self.context.i32_type();
        let main_type = i32_type.fn_type(&[], false);
        let main = self.module.add_function("main", main_type, None);
        let entry = self.context.append_basic_block(main, "entry");
        self.builder.position_at_end(entry);

        for stmt in &program.statements {
            self.lower_statement_boundary(stmt);
        }

        if self.current_block_open() {
            let zero = i32_type.const_int(0, false);
            if let Err(error) = self.builder.build_return(Some(&zero)) {
                self.errors.push(error.into());
            }
        }

        // A top-level `let main = fn ...` replaces the synthesized entry.
        if let Some(user_main) = self.user_main {
            unsafe { main.delete() };
            user_main.as_global_value().set_name("main");
            user_main.set_linkage(Linkage::External);
        }
    }

    /// Statement-level error boundary: a failed statement is recorded and
    /// skipped so lowering continues with the next one.
    fn lower_statement_boundary(&mut self, stmt: &Statement) {
        if let Err(error) = self.lower_statement(stmt) {
            self.errors.push(error);
        }
    }

    fn lower_statement(&mut self, stmt: &Statement) -> Result<()> {
        match stmt {
            Statement::Let { name, value, .. } => self.lower_let(name, value),
            Statement::Var { name, value, .. } => self.lower_var(name, value),
            Statement::StructDefinition { name, fields, .. } => {
                self.lower_struct_definition(name, fields)
            }
            Statement::Return { value, .. } => self.lower_return(value.as_ref()),
            Statement::Expression { expression, .. } => {
                self.lower_expression(expression).map(|_| ())
            }
            Statement::Block(block) => {
                for stmt in &block.statements {
                    self.lower_statement_boundary(stmt);
                }
                Ok(())
            }
        }
    }

    fn lower_let(&mut self, name: &Identifier, value: &Expression) -> Result<()> {
        // Binding a function literal names the function up front so that its
        // own body can already call it.
        if let Expression::FunctionLiteral {
            parameters, body, ..
        } = value
        {
            let function = self.lower_function_literal(parameters, body, Some(&name.name))?;
            if name.name == "main" {
                self.user_main = Some(function);
            }
            return Ok(());
        }

        match self.lower_expression(value)? {
            Lowered::Function(function) => {
                function.as_global_value().set_name(&name.name);
                if name.name == "main" {
                    self.user_main = Some(function);
                }
            }
            Lowered::ArraySlot(ptr, ty) => {
                // The array literal already produced its slot; adopt it.
                ptr.set_name(&name.name);
                self.scopes.bind(&name.name, Slot { ptr, ty: ty.into() });
            }
            Lowered::Value(value) => {
                let slot = self.create_entry_block_alloca(&name.name, value.get_type())?;
                self.builder.build_store(slot.ptr, value)?;
                self.scopes.bind(&name.name, slot);
            }
        }
        Ok(())
    }

    fn lower_var(&mut self, name: &Identifier, value: &Expression) -> Result<()> {
        match self.lower_expression(value)? {
            // Like `let`, adopt an array literal's own slot; `var` has no
            // function-rename shortcut.
            Lowered::ArraySlot(ptr, ty) => {
                ptr.set_name(&name.name);
                self.scopes.bind(&name.name, Slot { ptr, ty: ty.into() });
            }
            value => {
                let value = value.as_basic();
                let slot = self.create_entry_block_alloca(&name.name, value.get_type())?;
                self.builder.build_store(slot.ptr, value)?;
                self.scopes.bind(&name.name, slot);
            }
        }
        Ok(())
    }

    fn lower_struct_definition(&mut self, name: &Identifier, fields: &[StructField]) -> Result<()> {
        if self.struct_types.contains_key(&name.name) {
            return Ok(());
        }

        let mut field_types = Vec::with_capacity(fields.len());
        for field in fields {
            field_types.push(self.lower_type(&field.ty)?);
        }

        let struct_type = self.context.opaque_struct_type(&name.name);
        struct_type.set_body(&field_types, false);
        self.struct_types.insert(name.name.clone(), struct_type);
        Ok(())
    }

    fn lower_type(&self, ty: &Identifier) -> Result<BasicTypeEnum<'ctx>> {
        match ty.name.as_str() {
            "i32" => Ok(self.context.i32_type().into()),
            other => Err(CodegenError::UnknownType(other.to_string())),
        }
    }

    fn lower_return(&mut self, value: Option<&Expression>) -> Result<()> {
        match value {
            Some(value) => {
                let value = self.lower_expression(value)?.as_basic();
                self.builder.build_return(Some(&value))?;
            }
            None => {
                self.builder.build_return(None)?;
            }
        }
        Ok(())
    }

    fn lower_expression(&mut self, expr: &Expression) -> Result<Lowered<'ctx>> {
        match expr {
            Expression::IntegerLiteral { value, .. } => Ok(Lowered::Value(
                self.context.i32_type().const_int(*value as u64, true).into(),
            )),
            Expression::BooleanLiteral { value, .. } => Ok(Lowered::Value(
                self.context
                    .bool_type()
                    .const_int(*value as u64, false)
                    .into(),
            )),
            Expression::Identifier(ident) => self.lower_identifier(ident),
            Expression::Assignment { target, value, .. } => self.lower_assignment(target, value),
            Expression::Prefix {
                operator, right, ..
            } => self.lower_prefix(*operator, right),
            Expression::Infix {
                operator,
                left,
                right,
                ..
            } => self.lower_infix(*operator, left, right),
            Expression::ArrayLiteral { elements, .. } => self.lower_array_literal(elements),
            Expression::Index { array, index, .. } => self.lower_index(array, index),
            Expression::If {
                condition,
                consequence,
                alternative,
                ..
            } => self.lower_if(condition, consequence, alternative.as_ref()),
            Expression::While {
                condition, body, ..
            } => self.lower_while(condition, body),
            Expression::ForLoop {
                initializer,
                condition,
                increment,
                body,
                ..
            } => self.lower_for_loop(
                initializer.as_deref(),
                condition.as_deref(),
                increment.as_deref(),
                body,
            ),
            Expression::FunctionLiteral {
                parameters, body, ..
            } => Ok(Lowered::Function(
                self.lower_function_literal(parameters, body, None)?,
            )),
            Expression::Call {
                callee, arguments, ..
            } => self.lower_call(callee, arguments),
        }
    }

    fn lower_identifier(&mut self, ident: &Identifier) -> Result<Lowered<'ctx>> {
        let slot = self
            .scopes
            .lookup(&ident.name)
            .ok_or_else(|| CodegenError::UnknownVariable(ident.name.clone()))?;

        match slot.ty {
            // Arrays decay to their slot pointer.
            BasicTypeEnum::ArrayType(array_type) => Ok(Lowered::ArraySlot(slot.ptr, array_type)),
            _ => {
                let value = self.builder.build_load(slot.ptr, &ident.name)?;
                Ok(Lowered::Value(value))
            }
        }
    }

    fn lower_assignment(&mut self, target: &Identifier, value: &Expression) -> Result<Lowered<'ctx>> {
        let new_value = self.lower_expression(value)?.as_basic();
        let slot = self
            .scopes
            .lookup(&target.name)
            .ok_or_else(|| CodegenError::UnknownVariable(target.name.clone()))?;
        self.builder.build_store(slot.ptr, new_value)?;
        Ok(Lowered::Value(new_value))
    }

    fn lower_prefix(&mut self, operator: PrefixOperator, right: &Expression) -> Result<Lowered<'ctx>> {
        let right = self
            .lower_expression(right)?
            .as_int()
            .ok_or(CodegenError::ExpectedInteger)?;

        match operator {
            PrefixOperator::Neg => Ok(Lowered::Value(
                self.builder.build_int_neg(right, "negtmp")?.into(),
            )),
            PrefixOperator::Not => Err(CodegenError::UnsupportedPrefixOperator(operator)),
        }
    }

    fn lower_infix(
        &mut self,
        operator: InfixOperator,
        left: &Expression,
        right: &Expression,
    ) -> Result<Lowered<'ctx>> {
        let lhs = self
            .lower_expression(left)?
            .as_int()
            .ok_or(CodegenError::ExpectedInteger)?;
        let rhs = self
            .lower_expression(right)?
            .as_int()
            .ok_or(CodegenError::ExpectedInteger)?;

        let value = match operator {
            InfixOperator::Add => self.builder.build_int_add(lhs, rhs, "addtmp")?,
            InfixOperator::Sub => self.builder.build_int_sub(lhs, rhs, "subtmp")?,
            InfixOperator::Mul => self.builder.build_int_mul(lhs, rhs, "multmp")?,
            InfixOperator::Div => self.builder.build_int_signed_div(lhs, rhs, "divtmp")?,
            InfixOperator::Eq => {
                self.builder
                    .build_int_compare(IntPredicate::EQ, lhs, rhs, "eqtmp")?
            }
            InfixOperator::NotEq => {
                self.builder
                    .build_int_compare(IntPredicate::NE, lhs, rhs, "netmp")?
            }
            InfixOperator::Lt => {
                self.builder
                    .build_int_compare(IntPredicate::SLT, lhs, rhs, "lttmp")?
            }
            InfixOperator::LtEq => {
                self.builder
                    .build_int_compare(IntPredicate::SLE, lhs, rhs, "letmp")?
            }
            InfixOperator::Gt => {
                self.builder
                    .build_int_compare(IntPredicate::SGT, lhs, rhs, "gttmp")?
            }
            InfixOperator::GtEq => {
                self.builder
                    .build_int_compare(IntPredicate::SGE, lhs, rhs, "getmp")?
            }
        };
        Ok(Lowered::Value(value.into()))
    }

    fn lower_array_literal(&mut self, elements: &[Expression]) -> Result<Lowered<'ctx>> {
        let i32_type = self.context.i32_type();
        let array_type = i32_type.array_type(elements.len() as u32);
        let slot = self.create_entry_block_alloca("array", array_type.into())?;

        let zero = i32_type.const_int(0, false);
        for (i, element) in elements.iter().enumerate() {
            let value = self
                .lower_expression(element)?
                .as_int()
                .ok_or(CodegenError::ExpectedInteger)?;
            let index = i32_type.const_int(i as u64, false);
            let element_ptr = unsafe {
                self.builder
                    .build_in_bounds_gep(slot.ptr, &[zero, index], "elem")?
            };
            self.builder.build_store(element_ptr, value)?;
        }

        Ok(Lowered::ArraySlot(slot.ptr, array_type))
    }

    fn lower_index(&mut self, array: &Expression, index: &Expression) -> Result<Lowered<'ctx>> {
        let Lowered::ArraySlot(ptr, _array_type) = self.lower_expression(array)? else {
            return Err(CodegenError::NotIndexable(array.to_string()));
        };

        let index = self
            .lower_expression(index)?
            .as_int()
            .ok_or(CodegenError::ExpectedInteger)?;

        let i32_type = self.context.i32_type();
        let zero = i32_type.const_int(0, false);
        let element_ptr = unsafe {
            self.builder
                .build_in_bounds_gep(ptr, &[zero, index], "elemptr")?
        };
        let value = self.builder.build_load(element_ptr, "elemtmp")?;
        Ok(Lowered::Value(value))
    }

    fn lower_call(&mut self, callee: &Expression, arguments: &[Expression]) -> Result<Lowered<'ctx>> {
        let Expression::Identifier(name) = callee else {
            return Err(CodegenError::CalleeNotNamed);
        };

        let function = self
            .module
            .get_function(&name.name)
            .ok_or_else(|| CodegenError::UnknownFunction(name.name.clone()))?;

        if function.count_params() as usize != arguments.len() {
            return Err(CodegenError::WrongNumberOfArguments {
                name: name.name.clone(),
                expected: function.count_params() as usize,
                actual: arguments.len(),
            });
        }

        let mut args: Vec<BasicMetadataValueEnum> = Vec::with_capacity(arguments.len());
        for argument in arguments {
            args.push(self.lower_expression(argument)?.as_basic().into());
        }

        let call = self.builder.build_call(function, &args, "calltmp")?;
        let value = match call.try_as_basic_value().left() {
            Some(value) => value,
            None => self.context.i32_type().const_int(0, false).into(),
        };
        Ok(Lowered::Value(value))
    }

    fn lower_if(
        &mut self,
        condition: &Expression,
        consequence: &BlockStatement,
        alternative: Option<&BlockStatement>,
    ) -> Result<Lowered<'ctx>> {
        let cond = self
            .lower_expression(condition)?
            .as_int()
            .ok_or(CodegenError::ExpectedInteger)?;

        let cond_block = self
            .builder
            .get_insert_block()
            .ok_or(CodegenError::NoInsertionPoint)?;
        let function = cond_block
            .get_parent()
            .ok_or(CodegenError::NoInsertionPoint)?;

        let then_block = self.context.append_basic_block(function, "then");
        let else_block = alternative.map(|_| self.context.append_basic_block(function, "else"));
        let merge_block = self.context.append_basic_block(function, "ifcont");

        match else_block {
            Some(else_block) => {
                self.builder
                    .build_conditional_branch(cond, then_block, else_block)?
            }
            None => {
                self.builder
                    .build_conditional_branch(cond, then_block, merge_block)?
            }
        };

        self.builder.position_at_end(then_block);
        let then_value = self.lower_block_value(consequence);
        // A branch may grow new blocks; the one we end up in is the phi's
        // predecessor, not the one we started in.
        let then_pred = self.branch_to(merge_block)?;

        let mut else_value = None;
        let mut else_pred = None;
        if let (Some(else_block), Some(alternative)) = (else_block, alternative) {
            self.builder.position_at_end(else_block);
            else_value = self.lower_block_value(alternative);
            else_pred = self.branch_to(merge_block)?;
        }

        self.builder.position_at_end(merge_block);

        let i32_type = self.context.i32_type();
        let zero: BasicValueEnum = i32_type.const_int(0, false).into();

        if then_value.is_some() || else_value.is_some() {
            let phi = self.builder.build_phi(i32_type, "iftmp")?;
            if let Some(block) = then_pred {
                let value = then_value.unwrap_or(zero);
                phi.add_incoming(&[(&value, block)]);
            }
            match alternative {
                // Without an alternative the false edge comes straight from
                // the conditional branch.
                None => phi.add_incoming(&[(&zero, cond_block)]),
                Some(_) => {
                    if let Some(block) = else_pred {
                        let value = else_value.unwrap_or(zero);
                        phi.add_incoming(&[(&value, block)]);
                    }
                }
            }
            Ok(Lowered::Value(phi.as_basic_value()))
        } else {
            Ok(Lowered::Value(zero))
        }
    }

    /// Close the current block with a branch to `target` unless it already
    /// has a terminator. Returns the closed block when the branch was made,
    /// i.e. when the current block becomes a predecessor of `target`.
    fn branch_to(&mut self, target: BasicBlock<'ctx>) -> Result<Option<BasicBlock<'ctx>>> {
        if self.current_block_open() {
            self.builder.build_unconditional_branch(target)?;
            Ok(self.builder.get_insert_block())
        } else {
            Ok(None)
        }
    }

    /// Lower a block in expression position: if its last statement is an
    /// expression statement, that expression's value is the block's value.
    /// Statement failures are recorded, a failed tail expression just means
    /// the block has no value.
    fn lower_block_value(&mut self, block: &BlockStatement) -> Option<BasicValueEnum<'ctx>> {
        match block.statements.split_last() {
            Some((Statement::Expression { expression, .. }, rest)) => {
                for stmt in rest {
                    self.lower_statement_boundary(stmt);
                }
                match self.lower_expression(expression) {
                    Ok(value) => Some(value.as_basic()),
                    Err(error) => {
                        self.errors.push(error);
                        None
                    }
                }
            }
            _ => {
                for stmt in &block.statements {
                    self.lower_statement_boundary(stmt);
                }
                None
            }
        }
    }

    fn lower_while(&mut self, condition: &Expression, body: &BlockStatement) -> Result<Lowered<'ctx>> {
        let function = self.current_function()?;

        let header = self.context.append_basic_block(function, "loop_header");
        let body_block = self.context.append_basic_block(function, "loop_body");
        let exit = self.context.append_basic_block(function, "loop_exit");

        self.builder.build_unconditional_branch(header)?;

        self.builder.position_at_end(header);
        let cond = self
            .lower_expression(condition)?
            .as_int()
            .ok_or(CodegenError::ExpectedInteger)?;
        self.builder
            .build_conditional_branch(cond, body_block, exit)?;

        self.builder.position_at_end(body_block);
        for stmt in &body.statements {
            self.lower_statement_boundary(stmt);
        }
        self.branch_to(header)?;

        self.builder.position_at_end(exit);
        Ok(Lowered::Value(
            self.context.i32_type().const_int(0, false).into(),
        ))
    }

    fn lower_for_loop(
        &mut self,
        initializer: Option<&Statement>,
        condition: Option<&Expression>,
        increment: Option<&Expression>,
        body: &BlockStatement,
    ) -> Result<Lowered<'ctx>> {
        let function = self.current_function()?;

        // The initializer's bindings are scoped to the loop.
        self.scopes.push();
        let result = self.lower_for_loop_inner(function, initializer, condition, increment, body);
        self.scopes.pop();
        result
    }

    fn lower_for_loop_inner(
        &mut self,
        function: FunctionValue<'ctx>,
        initializer: Option<&Statement>,
        condition: Option<&Expression>,
        increment: Option<&Expression>,
        body: &BlockStatement,
    ) -> Result<Lowered<'ctx>> {
        if let Some(initializer) = initializer {
            self.lower_statement(initializer)?;
        }

        let header = self.context.append_basic_block(function, "for_header");
        let body_block = self.context.append_basic_block(function, "for_body");
        let inc_block = self.context.append_basic_block(function, "for_inc");
        let exit = self.context.append_basic_block(function, "for_exit");

        self.builder.build_unconditional_branch(header)?;

        self.builder.position_at_end(header);
        let cond = match condition {
            Some(condition) => self
                .lower_expression(condition)?
                .as_int()
                .ok_or(CodegenError::ExpectedInteger)?,
            None => self.context.bool_type().const_int(1, false),
        };
        self.builder
            .build_conditional_branch(cond, body_block, exit)?;

        self.builder.position_at_end(body_block);
        for stmt in &body.statements {
            self.lower_statement_boundary(stmt);
        }
        self.branch_to(inc_block)?;

        self.builder.position_at_end(inc_block);
        if let Some(increment) = increment {
            self.lower_expression(increment)?;
        }
        self.branch_to(header)?;

        self.builder.position_at_end(exit);
        Ok(Lowered::Value(
            self.context.i32_type().const_int(0, false).into(),
        ))
    }

    fn lower_function_literal(
        &mut self,
        parameters: &[Identifier],
        body: &BlockStatement,
        name: Option<&str>,
    ) -> Result<FunctionValue<'ctx>> {
        let saved_block = self.builder.get_insert_block();
        let saved_scopes = std::mem::replace(&mut self.scopes, Scopes::new());

        let result = self.lower_function_body(parameters, body, name);

        // Back to the enclosing function, whatever happened in here.
        self.scopes = saved_scopes;
        if let Some(block) = saved_block {
            self.builder.position_at_end(block);
        }
        result
    }

    fn lower_function_body(
        &mut self,
        parameters: &[Identifier],
        body: &BlockStatement,
        name: Option<&str>,
    ) -> Result<FunctionValue<'ctx>> {
        let i32_type = self.context.i32_type();
        let param_types: Vec<BasicMetadataTypeEnum> = vec![i32_type.into(); parameters.len()];
        let fn_type = i32_type.fn_type(&param_types, false);
        let function =
            self.module
                .add_function(name.unwrap_or("lambda"), fn_type, Some(Linkage::Internal));

        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);

        for (param, value) in parameters.iter().zip(function.get_param_iter()) {
            let value = value.into_int_value();
            value.set_name(&param.name);
            let slot = self.create_entry_block_alloca(&param.name, i32_type.into())?;
            self.builder.build_store(slot.ptr, value)?;
            self.scopes.bind(&param.name, slot);
        }

        let tail = self.lower_block_value(body);
        if self.current_block_open() {
            let ret = tail.unwrap_or_else(|| i32_type.const_int(0, false).into());
            self.builder.build_return(Some(&ret))?;
        }

        function.verify(true);

        Ok(function)
    }

    /// Create an alloca in the entry block of the function currently being
    /// built, ahead of its other instructions.
    fn create_entry_block_alloca(
        &mut self,
        name: &str,
        ty: BasicTypeEnum<'ctx>,
    ) -> Result<Slot<'ctx>> {
        let block = self
            .builder
            .get_insert_block()
            .ok_or(CodegenError::NoInsertionPoint)?;
        let function = block.get_parent().ok_or(CodegenError::NoInsertionPoint)?;
        let entry = function.get_first_basic_block().unwrap_or(block);

        let tmp = self.context.create_builder();
        match entry.get_first_instruction() {
            Some(first) => tmp.position_before(&first),
            None => tmp.position_at_end(entry),
        }
        let ptr = tmp.build_alloca(ty, name)?;
        Ok(Slot { ptr, ty })
    }

    fn current_function(&self) -> Result<FunctionValue<'ctx>> {
        self.builder
            .get_insert_block()
            .and_then(|block| block.get_parent())
            .ok_or(CodegenError::NoInsertionPoint)
    }

    fn current_block_open(&self) -> bool {
        self.builder
            .get_insert_block()
            .is_some_and(|block| block.get_terminator().is_none())
    }
}
