use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    rc::Rc,
};

use crate::{
    ast::{
        ast::{HeapView, Import, Program},
        expressions::{BinaryOperator, Expr, UnaryOperator},
        statements::{Declarator, FunctionDeclaration, Parameter, Stmt},
        types::{BufferKind, ScalarKind, Type},
    },
    errors::errors::{Error, ErrorImpl},
    CompileOptions, Position,
};

use super::{
    builtins::Builtin,
    stack::{view_name, CompositeStack, STACK_POINTER},
    symbol_table::{ScopeEvent, ScopeKind, Symbol, SymbolTable},
};

/// The function whose signature or body is being built.
#[derive(Debug, Clone)]
struct FunctionContext {
    source_name: String,
    mangled: String,
    return_type: Type,
    parameters: Vec<Parameter>,
    has_body: bool,
}

#[derive(Debug, Clone)]
struct FunctionInfo {
    name: String,
    has_body: bool,
}

/// A call site, kept until the end so that calls to prototypes which never
/// receive a body can be reported.
#[derive(Debug, Clone)]
struct CallSite {
    callee: String,
    arguments: String,
    position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Active,
    Done,
}

/// State for one compilation.
///
/// The parser calls into this in source order: scope events and symbol
/// declarations while reducing declarations, expression and statement
/// builders while reducing everything else, and [`TypeChecker::finish`] once
/// the whole translation unit has been read.
#[derive(Debug)]
pub struct TypeChecker {
    pub(super) symbols: SymbolTable,
    pub(super) stack: CompositeStack,
    pub(super) imports: BTreeSet<Builtin>,
    options: CompileOptions,
    function: Option<FunctionContext>,
    functions: BTreeMap<String, FunctionInfo>,
    loop_depth: usize,
    calls: BTreeMap<String, BTreeSet<String>>,
    call_sites: Vec<CallSite>,
}

impl TypeChecker {
    pub fn new(options: &CompileOptions) -> Self {
        TypeChecker {
            symbols: SymbolTable::new(),
            stack: CompositeStack::new(options.heap_size),
            imports: BTreeSet::new(),
            options: options.clone(),
            function: None,
            functions: BTreeMap::new(),
            loop_depth: 0,
            calls: BTreeMap::new(),
            call_sites: Vec::new(),
        }
    }

    // SCOPES AND SYMBOLS

    pub fn declare_scope(&mut self, event: ScopeEvent) {
        match event {
            ScopeEvent::Enter(kind) => self.symbols.enter(kind),
            ScopeEvent::Exit => self.symbols.exit(),
        }
        tracing::trace!(?event, depth = self.symbols.depth(), "scope");
    }

    /// Registers a symbol and returns it with its target name filled in.
    pub fn declare_symbol(&mut self, symbol: Symbol, position: &Position) -> Result<Symbol, Error> {
        self.symbols.declare(symbol, position)
    }

    pub fn is_global_scope(&self) -> bool {
        self.symbols.is_global()
    }

    // EXPRESSIONS

    pub fn literal_int(&self, value: i64) -> Expr {
        Expr::literal_int(value)
    }

    pub fn literal_float(&self, value: f64) -> Expr {
        Expr::literal_float(value)
    }

    pub fn literal_bool(&self, value: bool) -> Expr {
        Expr::literal_bool(value)
    }

    /// Resolves a variable reference. Integer constants are inlined.
    pub fn identifier(&self, name: &str, position: &Position) -> Result<Expr, Error> {
        match self.symbols.lookup(name) {
            None => Err(Error::new(
                ErrorImpl::VariableNotDeclared {
                    variable: name.to_string(),
                },
                position.clone(),
            )),
            Some(Symbol::Function { .. }) => Err(Error::new(
                ErrorImpl::NotAVariable {
                    name: name.to_string(),
                },
                position.clone(),
            )),
            Some(Symbol::Variable {
                constant: Some(value),
                ..
            }) => Ok(Expr::literal_int(*value)),
            Some(Symbol::Variable { mangled, ty, .. }) => Ok(Expr::identifier(mangled, ty.clone())),
        }
    }

    /// A call by name: a type constructor, a user function or a builtin, in
    /// that order of preference.
    pub fn call(&mut self, name: &str, arguments: Vec<Expr>, position: &Position) -> Result<Expr, Error> {
        if let Some(ty) = Type::from_name(name) {
            if ty.is_void() {
                return Err(Error::new(
                    ErrorImpl::UnsupportedConversion {
                        type_: ty.to_string(),
                    },
                    position.clone(),
                ));
            }
            return self.construct(ty, arguments, position);
        }

        let not_declared = |arguments: &[Expr]| {
            Error::new(
                ErrorImpl::FunctionNotDeclared {
                    function: name.to_string(),
                    arguments: arguments
                        .iter()
                        .map(|argument| argument.ty().to_string())
                        .collect::<Vec<_>>()
                        .join(", "),
                },
                position.clone(),
            )
        };

        if let Some(Symbol::Variable { .. }) = self.symbols.lookup(name) {
            return Err(not_declared(&arguments));
        }
        let overloads = self.symbols.functions_named(name);
        if overloads.is_empty() {
            return match Builtin::lookup(name) {
                Some(builtin) => self.builtin_call(builtin, arguments, position),
                None => Err(not_declared(&arguments)),
            };
        }

        let types: Vec<Type> = arguments.iter().map(|argument| argument.ty().clone()).collect();
        let symbol = match self.symbols.find_function(name, &types) {
            Some(symbol) => symbol.clone(),
            None => {
                // Exactly one overload reachable through scalar conversions.
                let candidates: Vec<&Symbol> = overloads
                    .into_iter()
                    .filter(|symbol| match symbol {
                        Symbol::Function { parameters, .. } => {
                            parameters.len() == types.len()
                                && parameters.iter().zip(&types).all(|(parameter, argument)| {
                                    parameter == argument
                                        || (is_plain_scalar(parameter) && is_plain_scalar(argument))
                                })
                        }
                        Symbol::Variable { .. } => false,
                    })
                    .collect();
                match candidates[..] {
                    [symbol] => symbol.clone(),
                    _ => return Err(not_declared(&arguments)),
                }
            }
        };

        let Symbol::Function {
            mangled,
            parameters,
            return_type,
            ..
        } = symbol
        else {
            return Err(not_declared(&arguments));
        };
        let arguments = arguments
            .into_iter()
            .zip(&parameters)
            .map(|(argument, parameter)| {
                if argument.ty() == parameter {
                    Ok(argument)
                } else {
                    Expr::convert(argument, parameter, position)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(caller) = &self.function {
            self.calls
                .entry(caller.mangled.clone())
                .or_default()
                .insert(mangled.clone());
        }
        self.call_sites.push(CallSite {
            callee: mangled.clone(),
            arguments: parameters
                .iter()
                .map(Type::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            position: position.clone(),
        });
        tracing::trace!(function = %name, callee = %mangled, "resolved call");

        self.lower_call(&mangled, return_type, arguments, position)
    }

    // STATEMENTS

    /// An expression evaluated for its effects only. Pure expressions vanish.
    pub fn expression_stmt(&mut self, expression: Expr) -> Stmt {
        let mut effects = TypeChecker::effects(&Rc::new(expression));
        match effects.len() {
            0 => Stmt::Block(Vec::new()),
            1 => Stmt::Expression((*effects.remove(0)).clone()),
            _ => Stmt::Expression(Expr::sequence(effects)),
        }
    }

    pub fn if_stmt(
        &mut self,
        test: Expr,
        consequent: Stmt,
        alternate: Option<Stmt>,
        position: &Position,
    ) -> Result<Stmt, Error> {
        Stmt::if_stmt(test, consequent, alternate, position)
    }

    pub fn begin_loop(&mut self) {
        self.loop_depth += 1;
    }

    pub fn end_loop(&mut self) {
        self.loop_depth = self.loop_depth.saturating_sub(1);
    }

    pub fn while_stmt(&mut self, test: Expr, body: Stmt, position: &Position) -> Result<Stmt, Error> {
        Stmt::while_stmt(test, body, position)
    }

    pub fn do_while_stmt(&mut self, body: Stmt, test: Expr, position: &Position) -> Result<Stmt, Error> {
        Stmt::do_while_stmt(body, test, position)
    }

    pub fn for_stmt(
        &mut self,
        init: Option<Stmt>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Stmt,
        position: &Position,
    ) -> Result<Stmt, Error> {
        let update = update.and_then(|update| match self.expression_stmt(update) {
            Stmt::Expression(expression) => Some(expression),
            _ => None,
        });
        Stmt::for_stmt(init, test, update, body, position)
    }

    pub fn break_stmt(&self, position: &Position) -> Result<Stmt, Error> {
        self.require_loop("break", position)?;
        Ok(Stmt::Break)
    }

    pub fn continue_stmt(&self, position: &Position) -> Result<Stmt, Error> {
        self.require_loop("continue", position)?;
        Ok(Stmt::Continue)
    }

    fn require_loop(&self, statement: &str, position: &Position) -> Result<(), Error> {
        if self.loop_depth == 0 {
            return Err(Error::new(
                ErrorImpl::OutsideLoop {
                    statement: statement.to_string(),
                },
                position.clone(),
            ));
        }
        Ok(())
    }

    /// Composite results are pushed onto the transient stack and returned
    /// by address.
    pub fn return_stmt(&mut self, value: Option<Expr>, position: &Position) -> Result<Stmt, Error> {
        let Some(function) = self.function.as_ref().filter(|function| function.has_body) else {
            return Err(Error::new(ErrorImpl::ReturnOutsideFunction, position.clone()));
        };
        let expected = function.return_type.clone();
        let received = value.as_ref().map_or(Type::Void, |value| value.ty().clone());
        if received != expected {
            return Err(Error::new(
                ErrorImpl::ReturnTypeMismatch {
                    expected: expected.to_string(),
                    received: received.to_string(),
                },
                position.clone(),
            ));
        }

        match value {
            Some(value) if value.ty().is_composite() => {
                Ok(Stmt::Return(Some(self.materialize_value(value, position)?)))
            }
            value => Ok(Stmt::Return(value)),
        }
    }

    pub fn block_stmt(&mut self, body: Vec<Stmt>) -> Stmt {
        Stmt::Block(body)
    }

    // DECLARATIONS

    /// Declares one variable of a declaration and builds its initializer.
    ///
    /// The initializer must already be built, so it still sees any outer
    /// variable of the same name.
    pub fn declarator(
        &mut self,
        ty: &Type,
        name: &str,
        size: Option<Expr>,
        init: Option<Expr>,
        constant: bool,
        position: &Position,
    ) -> Result<Declarator, Error> {
        if ty.is_void() {
            return Err(Error::new(
                ErrorImpl::UnknownType {
                    type_: ty.to_string(),
                },
                position.clone(),
            ));
        }

        if let Some(size) = size {
            let size = size
                .as_int_constant()
                .filter(|size| *size > 0)
                .ok_or_else(|| Error::new(ErrorImpl::InvalidArraySize, position.clone()))?
                as usize;
            if init.is_some() {
                return Err(Error::new(
                    ErrorImpl::NotImplemented {
                        feature: String::from("array initializers"),
                    },
                    position.clone(),
                ));
            }
            let buffer = match ty {
                Type::Float => BufferKind::Float,
                Type::Int | Type::Bool => BufferKind::Int,
                other => {
                    return Err(Error::new(
                        ErrorImpl::UnimplementedArrayDeclaration {
                            type_: other.to_string(),
                        },
                        position.clone(),
                    ))
                }
            };
            let symbol = self.declare_symbol(
                Symbol::variable(name, Type::array(ty.clone(), size)),
                position,
            )?;
            return Ok(Declarator {
                name: symbol.mangled().to_string(),
                init: Expr::new_composite(buffer, size, ty.clone()),
            });
        }

        if let Some(init) = &init {
            if init.ty() != ty {
                return Err(Error::new(
                    ErrorImpl::DifferingTypes {
                        left: ty.to_string(),
                        right: init.ty().to_string(),
                    },
                    position.clone(),
                ));
            }
        }

        let init = if ty.is_composite() {
            self.composite_storage(ty, init, position)?
        } else {
            init.unwrap_or_else(|| Expr::zero(ty))
        };

        let symbol = match init.as_int_constant() {
            Some(value) if constant && *ty == Type::Int => Symbol::constant(name, value),
            _ => Symbol::variable(name, ty.clone()),
        };
        let symbol = self.declare_symbol(symbol, position)?;
        Ok(Declarator {
            name: symbol.mangled().to_string(),
            init,
        })
    }

    /// Reserves a static block for a named composite and fills it with the
    /// initializer, or with zeros. Evaluates to the block's base slot.
    fn composite_storage(&mut self, ty: &Type, init: Option<Expr>, position: &Position) -> Result<Expr, Error> {
        let (prefix, components) = match init {
            Some(init) => {
                let parts = self.split(&Rc::new(init), position)?;
                (parts.prefix, parts.components)
            }
            None => {
                let zero = Rc::new(Expr::zero(&ty.component_type()));
                (Vec::new(), vec![zero; ty.element_count()])
            }
        };
        let (stores, base) = self.store_static(&components, position)?;

        let mut items = prefix;
        items.extend(stores);
        items.push(base);
        Ok(Expr::sequence_as(items, ty.clone()))
    }

    pub fn variable_declaration(&mut self, ty: Type, declarators: Vec<Declarator>) -> Stmt {
        Stmt::VariableDeclaration { ty, declarators }
    }

    /// Registers a function signature. For a definition this also opens the
    /// function scope and declares the parameters in it.
    pub fn begin_function(
        &mut self,
        name: &str,
        return_type: Type,
        parameters: Vec<Parameter>,
        has_body: bool,
        position: &Position,
    ) -> Result<(), Error> {
        if name == "main" && !return_type.is_void() {
            return Err(Error::new(ErrorImpl::MainReturnType, position.clone()));
        }
        for parameter in &parameters {
            if parameter.ty.is_void() || parameter.ty.is_array() {
                return Err(Error::new(
                    ErrorImpl::NotImplemented {
                        feature: format!("parameters of type {}", parameter.ty),
                    },
                    position.clone(),
                ));
            }
        }

        let parameter_types = parameters.iter().map(|parameter| parameter.ty.clone()).collect();
        let symbol = self.declare_symbol(
            Symbol::function(name, parameter_types, return_type.clone(), has_body),
            position,
        )?;
        let mangled = symbol.mangled().to_string();
        self.functions
            .entry(mangled.clone())
            .and_modify(|info| info.has_body |= has_body)
            .or_insert(FunctionInfo {
                name: name.to_string(),
                has_body,
            });

        let parameters = if has_body {
            self.declare_scope(ScopeEvent::Enter(ScopeKind::Function));
            parameters
                .into_iter()
                .map(|parameter| {
                    let symbol = self.declare_symbol(
                        Symbol::variable(&parameter.name, parameter.ty.clone()),
                        position,
                    )?;
                    Ok(Parameter {
                        name: symbol.mangled().to_string(),
                        ty: parameter.ty,
                    })
                })
                .collect::<Result<Vec<_>, Error>>()?
        } else {
            parameters
        };

        self.loop_depth = 0;
        self.function = Some(FunctionContext {
            source_name: name.to_string(),
            mangled,
            return_type,
            parameters,
            has_body,
        });
        Ok(())
    }

    /// Completes the function opened by [`TypeChecker::begin_function`].
    pub fn function_declaration(&mut self, body: Option<Vec<Stmt>>, position: &Position) -> Result<Stmt, Error> {
        let Some(function) = self.function.take() else {
            return Err(Error::new(
                ErrorImpl::GlobalScopeOnly {
                    construct: String::from("function declaration"),
                },
                position.clone(),
            ));
        };
        if function.has_body {
            self.declare_scope(ScopeEvent::Exit);
        }

        let body = match body {
            Some(statements) => {
                let mut prologue = self.parameter_prologue(&function.parameters, position)?;
                prologue.extend(statements);
                Some(prologue)
            }
            None => None,
        };
        tracing::debug!(function = %function.source_name, mangled = %function.mangled, "built function");

        let declaration = FunctionDeclaration::new(
            &function.source_name,
            &function.mangled,
            function.parameters,
            function.return_type,
            body,
            position,
        )?;
        Ok(Stmt::FunctionDeclaration(declaration))
    }

    /// Type annotations for every parameter, then a private copy of every
    /// composite parameter so the caller's stack block can be reused.
    fn parameter_prologue(&mut self, parameters: &[Parameter], position: &Position) -> Result<Vec<Stmt>, Error> {
        let mut annotations = Vec::with_capacity(parameters.len());
        let mut copies = Vec::new();

        for parameter in parameters {
            let identifier = Rc::new(Expr::identifier(&parameter.name, parameter.ty.clone()));
            let annotation = match parameter.ty {
                Type::Float => Expr::unary(UnaryOperator::Plus, identifier.clone(), position)?,
                _ => Expr::raw_binary(
                    BinaryOperator::BitOr,
                    identifier.clone(),
                    Rc::new(Expr::literal_int(0)),
                    parameter.ty.clone(),
                ),
            };
            annotations.push(Stmt::Expression(Expr::rebind(
                identifier.clone(),
                Rc::new(annotation),
            )));

            if parameter.ty.is_composite() {
                let kind = parameter.ty.scalar_kind().unwrap_or(ScalarKind::Float);
                let reads: Vec<Rc<Expr>> = (0..parameter.ty.element_count())
                    .map(|index| {
                        Rc::new(CompositeStack::slot(
                            kind,
                            CompositeStack::offset(&identifier, index),
                        ))
                    })
                    .collect();
                let (stores, base) = self.store_static(&reads, position)?;
                let mut items = stores;
                items.push(Rc::new(Expr::rebind(identifier, base)));
                copies.push(Stmt::Expression(Expr::sequence(items)));
            }
        }

        annotations.extend(copies);
        Ok(annotations)
    }

    // PROGRAM

    /// Checks the entry point and call graph and wraps `body` in the module
    /// boilerplate.
    pub fn finish(mut self, body: Vec<Stmt>, position: &Position) -> Result<Program, Error> {
        let mains: Vec<Symbol> = self
            .symbols
            .functions_named("main")
            .into_iter()
            .cloned()
            .collect();
        let entry = mains.iter().find_map(|symbol| match symbol {
            Symbol::Function {
                mangled,
                parameters,
                ..
            } if parameters.is_empty() => Some(mangled.clone()),
            _ => None,
        });
        let Some(entry) = entry.filter(|mangled| {
            self.functions
                .get(mangled)
                .is_some_and(|function| function.has_body)
        }) else {
            return Err(Error::new(ErrorImpl::NoMainFunction, position.clone()));
        };
        if mains.len() > 1 {
            return Err(Error::new(ErrorImpl::MainHasParameters, position.clone()));
        }

        self.check_recursion(position)?;
        for site in &self.call_sites {
            let defined = self
                .functions
                .get(&site.callee)
                .is_some_and(|function| function.has_body);
            if !defined {
                let name = self
                    .functions
                    .get(&site.callee)
                    .map_or(site.callee.clone(), |function| function.name.clone());
                return Err(Error::new(
                    ErrorImpl::FunctionNotDeclared {
                        function: name,
                        arguments: site.arguments.clone(),
                    },
                    site.position.clone(),
                ));
            }
        }
        self.stack.check_capacity(position)?;

        let imports = std::mem::take(&mut self.imports)
            .into_iter()
            .map(|builtin| Import {
                name: builtin.local_name(),
                path: builtin.host_path(),
            })
            .collect();
        tracing::debug!(
            entry = %entry,
            stack_slots = self.stack.stack_slots(),
            static_slots = self.stack.static_slots(),
            "finished program"
        );

        Ok(Program {
            module_name: self.options.module_name.clone(),
            directive: Expr::literal_str("use asm"),
            stdlib: String::from("stdlib"),
            foreign: String::from("foreign"),
            heap: String::from("heap"),
            views: [BufferKind::Int, BufferKind::Float]
                .into_iter()
                .map(|buffer| HeapView {
                    name: view_name(buffer).to_string(),
                    buffer,
                })
                .collect(),
            stack_pointer: STACK_POINTER.to_string(),
            imports,
            body,
            exports: vec![(String::from("main"), entry)],
            heap_size: self.options.heap_size,
            stack_slots: self.stack.stack_slots(),
            static_slots: self.stack.static_slots(),
        })
    }

    /// Fails on any cycle in the call graph. Static composite storage is
    /// shared by every activation of a function.
    fn check_recursion(&self, position: &Position) -> Result<(), Error> {
        let mut marks: HashMap<&str, Visit> = HashMap::new();
        for caller in self.calls.keys() {
            if let Some(function) = self.find_cycle(caller, &mut marks) {
                let name = self
                    .functions
                    .get(function)
                    .map_or(function.to_string(), |info| info.name.clone());
                return Err(Error::new(
                    ErrorImpl::RecursiveCall { function: name },
                    position.clone(),
                ));
            }
        }
        Ok(())
    }

    fn find_cycle<'a>(&'a self, function: &'a str, marks: &mut HashMap<&'a str, Visit>) -> Option<&'a str> {
        match marks.get(function) {
            Some(Visit::Active) => return Some(function),
            Some(Visit::Done) => return None,
            None => {}
        }
        marks.insert(function, Visit::Active);
        if let Some(callees) = self.calls.get(function) {
            for callee in callees {
                if let Some(cycle) = self.find_cycle(callee, marks) {
                    return Some(cycle);
                }
            }
        }
        marks.insert(function, Visit::Done);
        None
    }
}

fn is_plain_scalar(ty: &Type) -> bool {
    ty.is_scalar() && !ty.is_array()
}
