use serde::Serialize;

use crate::{
    errors::errors::{Error, ErrorImpl},
    Position,
};

use super::{
    ast::Typed,
    expressions::{require_condition, Expr},
    types::Type,
};

/// One `name = init` entry of a variable declaration. Declarations without a
/// source initializer receive a synthesized default before they get here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Declarator {
    pub name: String,
    pub init: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub ty: Type,
}

impl Typed for Parameter {
    fn get_type(&self) -> &Type {
        &self.ty
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: Type,
    /// `None` for a prototype.
    pub body: Option<Vec<Stmt>>,
}

impl FunctionDeclaration {
    /// Builds a declaration, enforcing that `main` returns `void`.
    ///
    /// `source_name` is the name as written, `name` the resolved one.
    pub fn new(
        source_name: &str,
        name: &str,
        parameters: Vec<Parameter>,
        return_type: Type,
        body: Option<Vec<Stmt>>,
        position: &Position,
    ) -> Result<Self, Error> {
        if source_name == "main" && !return_type.is_void() {
            return Err(Error::new(ErrorImpl::MainReturnType, position.clone()));
        }

        Ok(FunctionDeclaration {
            name: name.to_string(),
            parameters,
            return_type,
            body,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stmt {
    Expression(Expr),
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        test: Expr,
    },
    For {
        init: Option<Box<Stmt>>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    Break,
    Continue,
    Return(Option<Expr>),
    Block(Vec<Stmt>),
    VariableDeclaration {
        ty: Type,
        declarators: Vec<Declarator>,
    },
    FunctionDeclaration(FunctionDeclaration),
}

impl Stmt {
    pub fn if_stmt(
        test: Expr,
        consequent: Stmt,
        alternate: Option<Stmt>,
        position: &Position,
    ) -> Result<Stmt, Error> {
        require_condition(&test, position)?;
        Ok(Stmt::If {
            test,
            consequent: Box::new(consequent),
            alternate: alternate.map(Box::new),
        })
    }

    pub fn while_stmt(test: Expr, body: Stmt, position: &Position) -> Result<Stmt, Error> {
        require_condition(&test, position)?;
        Ok(Stmt::While {
            test,
            body: Box::new(body),
        })
    }

    pub fn do_while_stmt(body: Stmt, test: Expr, position: &Position) -> Result<Stmt, Error> {
        require_condition(&test, position)?;
        Ok(Stmt::DoWhile {
            body: Box::new(body),
            test,
        })
    }

    /// A missing test loops forever, like `for (;;)`.
    pub fn for_stmt(
        init: Option<Stmt>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Stmt,
        position: &Position,
    ) -> Result<Stmt, Error> {
        if let Some(test) = &test {
            require_condition(test, position)?;
        }
        Ok(Stmt::For {
            init: init.map(Box::new),
            test,
            update,
            body: Box::new(body),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stmt::Expression(_) => "ExpressionStatement",
            Stmt::If { .. } => "IfStatement",
            Stmt::While { .. } => "WhileStatement",
            Stmt::DoWhile { .. } => "DoWhileStatement",
            Stmt::For { .. } => "ForStatement",
            Stmt::Break => "BreakStatement",
            Stmt::Continue => "ContinueStatement",
            Stmt::Return(_) => "ReturnStatement",
            Stmt::Block(_) => "BlockStatement",
            Stmt::VariableDeclaration { .. } => "VariableDeclaration",
            Stmt::FunctionDeclaration(_) => "FunctionDeclaration",
        }
    }
}
