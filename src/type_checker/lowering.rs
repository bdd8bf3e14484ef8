//! Composite-to-scalar lowering.
//!
//! Every operation whose operands include a vector or matrix is rewritten
//! here into one scalar operation per component. The central tool is
//! [`TypeChecker::split`], which takes a composite expression apart into a
//! *prefix* of side effects and a list of *components*. After the prefix has
//! run, the components are plain reads and may be evaluated in any order, any
//! number of times. Operators are then built component by component using the
//! scalar constructors on [`Expr`].
//!
//! Side effects inside composite operands are hoisted into the prefix. When a
//! later operand carries a prefix, the components of earlier operands are
//! first copied to static storage so that source evaluation order holds.

use std::rc::Rc;

use crate::{
    ast::{
        expressions::{
            require_condition, BinaryOperator, Expr, ExprKind, LogicalOperator, UnaryOperator,
            UpdateOperator,
        },
        types::{ScalarKind, Type},
    },
    errors::errors::{Error, ErrorImpl},
    Position,
};

use super::{builtins::Builtin, stack::CompositeStack, type_checker::TypeChecker};

const SWIZZLE_SETS: [&str; 3] = ["xyzw", "rgba", "stpq"];

/// A composite value taken apart.
#[derive(Debug, Clone, Default)]
pub(crate) struct Parts {
    pub prefix: Vec<Rc<Expr>>,
    pub components: Vec<Rc<Expr>>,
}

impl Parts {
    fn pure(components: Vec<Rc<Expr>>) -> Self {
        Parts {
            prefix: Vec::new(),
            components,
        }
    }
}

/// Runs `prefix` before `value`.
pub(crate) fn with_prefix(prefix: Vec<Rc<Expr>>, value: Expr) -> Expr {
    if prefix.is_empty() {
        return value;
    }
    let mut items = prefix;
    items.push(Rc::new(value));
    Expr::sequence(items)
}

fn is_plain_scalar(ty: &Type) -> bool {
    ty.is_scalar() && !ty.is_array()
}

fn kind_of(expr: &Expr) -> ScalarKind {
    expr.ty().scalar_kind().unwrap_or(ScalarKind::Int)
}

/// Reads of every slot of an addressable composite.
fn component_slots(composite: &Rc<Expr>) -> Vec<Rc<Expr>> {
    let kind = kind_of(composite);
    (0..composite.ty().element_count())
        .map(|index| {
            Rc::new(CompositeStack::slot(
                kind,
                CompositeStack::offset(composite, index),
            ))
        })
        .collect()
}

/// Operand `index` of a broadcast: a scalar's only component is reused.
fn pick(components: &[Rc<Expr>], scalar: bool, index: usize) -> Rc<Expr> {
    if scalar {
        components[0].clone()
    } else {
        components[index].clone()
    }
}

fn root_identifier(target: &Expr) -> Option<&str> {
    match target.kind() {
        ExprKind::Identifier(name) => Some(name),
        ExprKind::Swizzle { vector, .. } => root_identifier(vector),
        _ => None,
    }
}

/// Whether `expr` touches `root` other than through one of `allowed`.
fn references_outside(expr: &Expr, root: &str, allowed: &[Rc<Expr>]) -> bool {
    if allowed.iter().any(|slot| **slot == *expr) {
        return false;
    }
    match expr.kind() {
        ExprKind::Identifier(name) => name == root,
        _ => expr
            .children()
            .iter()
            .any(|child| references_outside(child, root, allowed)),
    }
}

/// Parses a selector such as `xy` or `bgr` into component offsets.
pub fn parse_swizzle(selector: &str, width: usize) -> Option<Vec<usize>> {
    if selector.is_empty() || selector.len() > 4 {
        return None;
    }
    let first = selector.chars().next()?;
    let set = SWIZZLE_SETS.iter().find(|set| set.contains(first))?;
    selector
        .chars()
        .map(|c| set.find(c).filter(|offset| *offset < width))
        .collect()
}

impl TypeChecker {
    /// Takes a value apart into a prefix of effects and pure components.
    /// Scalars yield a single component.
    pub(crate) fn split(&mut self, expr: &Rc<Expr>, position: &Position) -> Result<Parts, Error> {
        let ty = expr.ty().clone();
        if is_plain_scalar(&ty) {
            if expr.has_effects() {
                return self.spill(std::slice::from_ref(expr), position);
            }
            return Ok(Parts::pure(vec![expr.clone()]));
        }
        if !ty.is_composite() {
            return Err(Error::new(
                ErrorImpl::ArrayOperand {
                    operator: String::from("component access"),
                },
                position.clone(),
            ));
        }

        match expr.kind() {
            ExprKind::Identifier(_) => Ok(Parts::pure(component_slots(expr))),
            ExprKind::ArrayLiteral(elements) => {
                if expr.has_effects() {
                    self.spill(elements, position)
                } else {
                    Ok(Parts::pure(elements.clone()))
                }
            }
            ExprKind::Swizzle { vector, offsets } => {
                let parts = self.split(vector, position)?;
                Ok(Parts {
                    prefix: parts.prefix,
                    components: offsets
                        .iter()
                        .map(|offset| parts.components[*offset].clone())
                        .collect(),
                })
            }
            ExprKind::Sequence(items) if items.last().is_some_and(|last| *last.ty() == ty) => {
                let Some((last, init)) = items.split_last() else {
                    return Ok(Parts::default());
                };
                let parts = self.split(last, position)?;
                let mut prefix = init.to_vec();
                prefix.extend(parts.prefix);
                Ok(Parts {
                    prefix,
                    components: parts.components,
                })
            }
            // Anything else evaluates to the address of its components.
            _ => self.spill_address(expr, position),
        }
    }

    /// Copies `components` to fresh static storage.
    pub(crate) fn spill(
        &mut self,
        components: &[Rc<Expr>],
        position: &Position,
    ) -> Result<Parts, Error> {
        let (prefix, base) = self.store_static(components, position)?;
        let reads = components
            .iter()
            .enumerate()
            .map(|(index, component)| {
                Rc::new(CompositeStack::slot(
                    kind_of(component),
                    CompositeStack::offset(&base, index),
                ))
            })
            .collect();
        Ok(Parts {
            prefix,
            components: reads,
        })
    }

    /// Stores `components` into fresh static storage, returning the stores and
    /// the base slot.
    pub(crate) fn store_static(
        &mut self,
        components: &[Rc<Expr>],
        position: &Position,
    ) -> Result<(Vec<Rc<Expr>>, Rc<Expr>), Error> {
        let base = Rc::new(Expr::literal_int(
            self.stack.reserve(components.len()) as i64,
        ));
        let stores = CompositeStack::store_all(&base, components, position)?;
        Ok((stores, base))
    }

    /// Captures an address-valued composite and copies its components out
    /// before anything else can reuse the slots they live in.
    fn spill_address(&mut self, expr: &Rc<Expr>, position: &Position) -> Result<Parts, Error> {
        let kind = kind_of(expr);
        let holder = self.stack.reserve(1);
        let address = Rc::new(CompositeStack::slot(
            ScalarKind::Int,
            Rc::new(Expr::literal_int(holder as i64)),
        ));
        let capture = Expr::rebind(address.clone(), expr.clone());

        let reads: Vec<Rc<Expr>> = (0..expr.ty().element_count())
            .map(|index| {
                Rc::new(CompositeStack::slot(
                    kind,
                    CompositeStack::offset(&address, index),
                ))
            })
            .collect();
        let mut parts = self.spill(&reads, position)?;
        parts.prefix.insert(0, Rc::new(capture));
        Ok(parts)
    }

    /// Side effects of evaluating `expr` for nothing but those effects.
    pub(crate) fn effects(expr: &Rc<Expr>) -> Vec<Rc<Expr>> {
        if !expr.has_effects() {
            return Vec::new();
        }
        match expr.kind() {
            ExprKind::Sequence(items) if items.last().is_some_and(|last| last.ty() == expr.ty()) => {
                items.iter().flat_map(TypeChecker::effects).collect()
            }
            ExprKind::ArrayLiteral(elements) => {
                elements.iter().flat_map(TypeChecker::effects).collect()
            }
            ExprKind::Swizzle { vector, .. } => TypeChecker::effects(vector),
            _ => vec![expr.clone()],
        }
    }

    /// Splits several operands while keeping their left-to-right order.
    fn combine(
        &mut self,
        operands: &[Rc<Expr>],
        position: &Position,
    ) -> Result<(Vec<Rc<Expr>>, Vec<Vec<Rc<Expr>>>), Error> {
        let parts = operands
            .iter()
            .map(|operand| self.split(operand, position))
            .collect::<Result<Vec<_>, _>>()?;
        let has_prefix: Vec<bool> = parts.iter().map(|part| !part.prefix.is_empty()).collect();

        let mut prefix = Vec::new();
        let mut components = Vec::with_capacity(parts.len());
        for (index, part) in parts.into_iter().enumerate() {
            prefix.extend(part.prefix);
            let later_effects = has_prefix[index + 1..].iter().any(|has| *has);
            if later_effects && part.components.iter().any(|c| !c.is_literal()) {
                let spilled = self.spill(&part.components, position)?;
                prefix.extend(spilled.prefix);
                components.push(spilled.components);
            } else {
                components.push(part.components);
            }
        }
        Ok((prefix, components))
    }

    // OPERATORS

    pub fn unary(
        &mut self,
        operator: UnaryOperator,
        argument: Expr,
        position: &Position,
    ) -> Result<Expr, Error> {
        let argument = Rc::new(argument);
        let ty = argument.ty().clone();

        if ty.is_composite() && matches!(operator, UnaryOperator::Minus | UnaryOperator::Plus) {
            if !ty.is_numeric() {
                return Err(Error::new(
                    ErrorImpl::InvalidOperandType {
                        operator: operator.as_str().to_string(),
                        type_: ty.to_string(),
                    },
                    position.clone(),
                ));
            }
            if operator == UnaryOperator::Plus {
                return Ok((*argument).clone());
            }
            let parts = self.split(&argument, position)?;
            let negated = parts
                .components
                .into_iter()
                .map(|component| Expr::unary(operator, component, position).map(Rc::new))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(with_prefix(parts.prefix, Expr::array_literal(negated, ty)));
        }

        let expr = Expr::unary(operator, argument.clone(), position)?;
        // Unary plus on a scalar is the identity.
        if operator == UnaryOperator::Plus {
            return Ok((*argument).clone());
        }
        Ok(expr)
    }

    pub fn binary(
        &mut self,
        operator: BinaryOperator,
        left: Expr,
        right: Expr,
        position: &Position,
    ) -> Result<Expr, Error> {
        let (left, right) = (Rc::new(left), Rc::new(right));
        let left_scalar = is_plain_scalar(left.ty());
        let right_scalar = is_plain_scalar(right.ty());

        if left.ty().is_array() || right.ty().is_array() || (left_scalar && right_scalar) {
            return Expr::binary(operator, left, right, position);
        }
        if operator.is_relational() {
            return Err(Error::new(
                ErrorImpl::NonScalarOperand {
                    operator: operator.as_str().to_string(),
                },
                position.clone(),
            ));
        }
        if !left_scalar && !right_scalar && left.ty() != right.ty() {
            return Err(Error::new(
                ErrorImpl::CompositeTypeMismatch {
                    left: left.ty().to_string(),
                    right: right.ty().to_string(),
                },
                position.clone(),
            ));
        }

        let ty = if left_scalar { right.ty() } else { left.ty() }.clone();
        let (prefix, components) = self.combine(&[left, right], position)?;
        let results = (0..ty.element_count())
            .map(|index| {
                Expr::binary(
                    operator,
                    pick(&components[0], left_scalar, index),
                    pick(&components[1], right_scalar, index),
                    position,
                )
                .map(Rc::new)
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Both equality operators fold their component results with `&&`.
        if operator.is_equality() {
            let mut results = results.into_iter();
            let Some(mut folded) = results.next() else {
                return Ok(with_prefix(prefix, Expr::literal_bool(true)));
            };
            for result in results {
                folded = Rc::new(Expr::logical(LogicalOperator::And, folded, result, position)?);
            }
            return Ok(with_prefix(prefix, (*folded).clone()));
        }

        Ok(with_prefix(prefix, Expr::array_literal(results, ty)))
    }

    pub fn logical(
        &mut self,
        operator: LogicalOperator,
        left: Expr,
        right: Expr,
        position: &Position,
    ) -> Result<Expr, Error> {
        Expr::logical(operator, left, right, position)
    }

    /// Assignment, optionally compound. `a op= b` becomes `a = a op b` before
    /// anything else happens, so both forms share one path.
    pub fn assign(
        &mut self,
        target: Expr,
        value: Expr,
        compound: Option<BinaryOperator>,
        position: &Position,
    ) -> Result<Expr, Error> {
        let value = match compound {
            Some(operator) => self.binary(operator, target.clone(), value, position)?,
            None => value,
        };
        let (target, value) = (Rc::new(target), Rc::new(value));
        if !target.ty().is_composite() {
            return Expr::assignment(target, value, position);
        }

        let slots = self.target_slots(&target, position)?;
        if target.ty() != value.ty() {
            return Err(Error::new(
                ErrorImpl::DifferingTypes {
                    left: target.ty().to_string(),
                    right: value.ty().to_string(),
                },
                position.clone(),
            ));
        }

        let mut parts = self.split(&value, position)?;
        if let Some(root) = root_identifier(&target) {
            // Component j may only read target slots that are not yet written.
            let clobbered = parts
                .components
                .iter()
                .enumerate()
                .any(|(index, component)| references_outside(component, root, &slots[index..]));
            if clobbered {
                let spilled = self.spill(&parts.components, position)?;
                parts.prefix.extend(spilled.prefix);
                parts.components = spilled.components;
            }
        }

        let mut items = parts.prefix;
        for (slot, component) in slots.into_iter().zip(parts.components) {
            items.push(Rc::new(Expr::assignment(slot, component, position)?));
        }
        items.push(target);
        Ok(Expr::sequence(items))
    }

    /// Addressable slots of a composite assignment or update target.
    fn target_slots(&mut self, target: &Rc<Expr>, position: &Position) -> Result<Vec<Rc<Expr>>, Error> {
        match target.kind() {
            ExprKind::Identifier(_) => Ok(component_slots(target)),
            ExprKind::Swizzle { .. } => {
                let parts = self.split(target, position)?;
                for (index, slot) in parts.components.iter().enumerate() {
                    if parts.components[..index].contains(slot) {
                        return Err(Error::new(
                            ErrorImpl::DuplicateSwizzleComponent,
                            position.clone(),
                        ));
                    }
                }
                if !parts.prefix.is_empty()
                    || parts.components.iter().any(|slot| !slot.is_addressable())
                {
                    return Err(Error::new(ErrorImpl::NotAssignable, position.clone()));
                }
                Ok(parts.components)
            }
            _ => Err(Error::new(ErrorImpl::NotAssignable, position.clone())),
        }
    }

    pub fn update(
        &mut self,
        operator: UpdateOperator,
        prefix: bool,
        argument: Expr,
        position: &Position,
    ) -> Result<Expr, Error> {
        let argument = Rc::new(argument);
        if !argument.ty().is_composite() {
            return Expr::update(operator, prefix, argument, position);
        }
        if argument.ty().scalar_kind() == Some(ScalarKind::Bool) {
            return Err(Error::new(
                ErrorImpl::BooleanUpdate {
                    type_: argument.ty().to_string(),
                },
                position.clone(),
            ));
        }

        let slots = self.target_slots(&argument, position).map_err(|error| {
            match error.get_internal() {
                ErrorImpl::NotAssignable => Error::new(ErrorImpl::NotUpdatable, position.clone()),
                _ => error,
            }
        })?;
        let updates = slots
            .into_iter()
            .map(|slot| Expr::update(operator, prefix, slot, position).map(Rc::new))
            .collect::<Result<Vec<_>, _>>()?;

        if prefix {
            let mut items = updates;
            items.push(argument);
            Ok(Expr::sequence(items))
        } else {
            // The components of a postfix update are the old values.
            Ok(Expr::array_literal(updates, argument.ty().clone()))
        }
    }

    pub fn conditional(
        &mut self,
        test: Expr,
        consequent: Expr,
        alternate: Expr,
        position: &Position,
    ) -> Result<Expr, Error> {
        let ty = consequent.ty().clone();
        if !ty.is_composite() {
            return Expr::conditional(test, consequent, alternate, position);
        }
        require_condition(&test, position)?;
        if *alternate.ty() != ty {
            return Err(Error::new(
                ErrorImpl::BranchTypeMismatch {
                    consequent: ty.to_string(),
                    alternate: alternate.ty().to_string(),
                },
                position.clone(),
            ));
        }

        // Both branches write the same static block.
        let base = Rc::new(Expr::literal_int(
            self.stack.reserve(ty.element_count()) as i64,
        ));
        let consequent = self.store_branch(Rc::new(consequent), &base, position)?;
        let alternate = self.store_branch(Rc::new(alternate), &base, position)?;
        let select = Expr::conditional(test, consequent, alternate, position)?;

        let kind = ty.scalar_kind().unwrap_or(ScalarKind::Float);
        let reads = (0..ty.element_count())
            .map(|index| Rc::new(CompositeStack::slot(kind, CompositeStack::offset(&base, index))))
            .collect();
        Ok(with_prefix(
            vec![Rc::new(select)],
            Expr::array_literal(reads, ty),
        ))
    }

    fn store_branch(&mut self, branch: Rc<Expr>, base: &Rc<Expr>, position: &Position) -> Result<Expr, Error> {
        let parts = self.split(&branch, position)?;
        let mut items = parts.prefix;
        items.extend(CompositeStack::store_all(base, &parts.components, position)?);
        items.push(Rc::new(Expr::literal_int(0)));
        Ok(Expr::sequence(items))
    }

    /// The comma operator.
    pub fn sequence(&mut self, items: Vec<Expr>) -> Expr {
        let mut items: Vec<Rc<Expr>> = items.into_iter().map(Rc::new).collect();
        let Some(last) = items.pop() else {
            return Expr::sequence(Vec::new());
        };
        let mut effects: Vec<Rc<Expr>> = items.iter().flat_map(TypeChecker::effects).collect();
        if effects.is_empty() {
            return (*last).clone();
        }
        effects.push(last);
        Expr::sequence(effects)
    }

    // COMPONENT ACCESS

    /// Field selection, `v.x` or `v.zyx`.
    pub fn member(&mut self, object: Expr, selector: &str, position: &Position) -> Result<Expr, Error> {
        let object = Rc::new(object);
        let invalid = || {
            Error::new(
                ErrorImpl::InvalidSwizzle {
                    selector: selector.to_string(),
                    type_: object.ty().to_string(),
                },
                position.clone(),
            )
        };
        let Type::Vector(kind, width) = object.ty().clone() else {
            return Err(invalid());
        };
        let offsets = parse_swizzle(selector, width as usize).ok_or_else(invalid)?;

        if let [offset] = offsets[..] {
            let parts = self.split(&object, position)?;
            return Ok(with_prefix(
                parts.prefix,
                (*parts.components[offset]).clone(),
            ));
        }
        let ty = Type::Vector(kind, offsets.len() as u8);
        Ok(Expr::swizzle(object, offsets, ty))
    }

    /// Subscript, `a[i]`. Arrays and vectors accept any `int` index; a
    /// constant index into a vector is range checked.
    pub fn index(&mut self, object: Expr, index: Expr, position: &Position) -> Result<Expr, Error> {
        let (object, index) = (Rc::new(object), Rc::new(index));
        if object.ty().is_array() {
            return Expr::member(object, index, position);
        }
        if *index.ty() != Type::Int {
            return Err(Error::new(
                ErrorImpl::IndexNotInteger {
                    received: index.ty().to_string(),
                },
                position.clone(),
            ));
        }

        let constant = index.as_int_constant();
        let out_of_range = |limit: usize| match constant {
            Some(value) if value < 0 || value as usize >= limit => Some(Error::new(
                ErrorImpl::InvalidSwizzle {
                    selector: format!("[{}]", value),
                    type_: object.ty().to_string(),
                },
                position.clone(),
            )),
            _ => None,
        };

        match object.ty().clone() {
            Type::Vector(kind, width) => {
                if let Some(error) = out_of_range(width as usize) {
                    return Err(error);
                }
                let parts = self.split(&object, position)?;
                if let Some(value) = constant {
                    let component = (*parts.components[value as usize]).clone();
                    return Ok(with_prefix(parts.prefix, component));
                }

                let mut prefix = parts.prefix;
                let base = match object.kind() {
                    ExprKind::Identifier(_) => object.clone(),
                    _ => {
                        let (stores, base) = self.store_static(&parts.components, position)?;
                        prefix.extend(stores);
                        base
                    }
                };
                let address = Expr::raw_binary(BinaryOperator::Add, base, index, Type::Int);
                Ok(with_prefix(
                    prefix,
                    CompositeStack::slot(kind, Rc::new(address)),
                ))
            }
            // Matrices are flat slot runs with no column layout.
            Type::Matrix(_) => Err(Error::new(
                ErrorImpl::NotImplemented {
                    feature: String::from("matrix column indexing"),
                },
                position.clone(),
            )),
            other => Err(Error::new(
                ErrorImpl::NotIndexable {
                    type_: other.to_string(),
                },
                position.clone(),
            )),
        }
    }

    // CONSTRUCTION

    /// Type constructor call such as `vec3(a, 1.0)` or `float(i)`.
    pub fn construct(&mut self, ty: Type, arguments: Vec<Expr>, position: &Position) -> Result<Expr, Error> {
        let arguments: Vec<Rc<Expr>> = arguments.into_iter().map(Rc::new).collect();
        for argument in &arguments {
            if argument.ty().is_array() {
                return Err(Error::new(
                    ErrorImpl::ArrayOperand {
                        operator: format!("{} constructor", ty),
                    },
                    position.clone(),
                ));
            }
            if argument.ty().is_void() {
                return Err(Error::new(
                    ErrorImpl::InvalidOperandType {
                        operator: format!("{} constructor", ty),
                        type_: argument.ty().to_string(),
                    },
                    position.clone(),
                ));
            }
        }

        let arity_error = |received: usize| {
            Error::new(
                ErrorImpl::ConstructorArity {
                    type_: ty.to_string(),
                    expected: ty.element_count(),
                    received,
                },
                position.clone(),
            )
        };

        if is_plain_scalar(&ty) {
            let [argument] = &arguments[..] else {
                return Err(arity_error(arguments.len()));
            };
            if is_plain_scalar(argument.ty()) {
                return Expr::convert(argument.clone(), &ty, position);
            }
            let parts = self.split(argument, position)?;
            let first = Expr::convert(parts.components[0].clone(), &ty, position)?;
            return Ok(with_prefix(parts.prefix, first));
        }
        if !ty.is_composite() {
            return Err(Error::new(
                ErrorImpl::UnsupportedConversion {
                    type_: ty.to_string(),
                },
                position.clone(),
            ));
        }

        let count = ty.element_count();
        let component_type = ty.component_type();
        let (prefix, components) = match &arguments[..] {
            [argument] if is_plain_scalar(argument.ty()) => {
                let value = Rc::new(Expr::convert(argument.clone(), &component_type, position)?);
                let parts = self.split(&value, position)?;
                let value = parts.components[0].clone();
                let components = match ty {
                    Type::Matrix(dimension) => (0..count)
                        .map(|index| {
                            if index % (dimension as usize + 1) == 0 {
                                value.clone()
                            } else {
                                Rc::new(Expr::zero(&component_type))
                            }
                        })
                        .collect(),
                    _ => vec![value; count],
                };
                (parts.prefix, components)
            }
            _ => {
                let (prefix, components) = self.combine(&arguments, position)?;
                let mut flat: Vec<Rc<Expr>> = components.concat();
                if arguments.len() == 1 && flat.len() > count && ty.is_vector() {
                    flat.truncate(count);
                }
                if flat.len() != count {
                    return Err(arity_error(flat.len()));
                }
                let converted = flat
                    .into_iter()
                    .map(|component| Expr::convert(component, &component_type, position).map(Rc::new))
                    .collect::<Result<Vec<_>, _>>()?;
                (prefix, converted)
            }
        };

        Ok(with_prefix(prefix, Expr::array_literal(components, ty)))
    }

    /// Pushes a composite value onto the transient stack, yielding its address.
    /// Calls already return an address there and pass through unchanged.
    pub(crate) fn materialize_value(&mut self, value: Expr, position: &Position) -> Result<Expr, Error> {
        if matches!(value.kind(), ExprKind::Call { .. }) {
            return Ok(value);
        }
        let value = Rc::new(value);
        let parts = self.split(&value, position)?;
        let block = self
            .stack
            .materialize(&parts.components, value.ty().clone(), position)?;
        Ok(with_prefix(parts.prefix, block))
    }

    /// Builds a call to a user function. Composite arguments are pushed as one
    /// contiguous block; the first one is passed as the block's materialization
    /// and the rest as offsets from `$sp`.
    pub(crate) fn lower_call(
        &mut self,
        callee: &str,
        return_type: Type,
        arguments: Vec<Expr>,
        position: &Position,
    ) -> Result<Expr, Error> {
        let arguments: Vec<Rc<Expr>> = arguments.into_iter().map(Rc::new).collect();
        if !arguments.iter().any(|argument| argument.ty().is_composite()) {
            return Ok(Expr::call(callee, arguments, return_type));
        }

        let (prefix, components) = self.combine(&arguments, position)?;
        let mut block = Vec::new();
        let mut offsets = Vec::with_capacity(arguments.len());
        let mut block_type = None;
        for (argument, parts) in arguments.iter().zip(&components) {
            if argument.ty().is_composite() {
                offsets.push(Some(block.len()));
                block.extend(parts.iter().cloned());
                block_type.get_or_insert_with(|| argument.ty().clone());
            } else {
                offsets.push(None);
            }
        }

        let block_type = block_type.unwrap_or(Type::Int);
        let materialized = Rc::new(self.stack.materialize(&block, block_type, position)?);
        let call_arguments = offsets
            .iter()
            .zip(&components)
            .map(|(offset, parts)| match offset {
                None => parts[0].clone(),
                Some(0) => materialized.clone(),
                Some(offset) => CompositeStack::offset(&CompositeStack::stack_pointer(), *offset),
            })
            .collect();

        Ok(with_prefix(
            prefix,
            Expr::call(callee, call_arguments, return_type),
        ))
    }

    /// Builds a call to a host math function, broadcasting over float vectors.
    pub(crate) fn builtin_call(
        &mut self,
        builtin: Builtin,
        arguments: Vec<Expr>,
        position: &Position,
    ) -> Result<Expr, Error> {
        let arguments: Vec<Rc<Expr>> = arguments.into_iter().map(Rc::new).collect();
        if arguments.len() != builtin.arity {
            return Err(Error::new(
                ErrorImpl::FunctionNotDeclared {
                    function: builtin.name.to_string(),
                    arguments: type_list(&arguments),
                },
                position.clone(),
            ));
        }
        for argument in &arguments {
            let ty = argument.ty();
            if ty.is_array() || ty.is_matrix() || ty.scalar_kind() != Some(ScalarKind::Float) {
                return Err(Error::new(
                    ErrorImpl::InvalidOperandType {
                        operator: builtin.name.to_string(),
                        type_: ty.to_string(),
                    },
                    position.clone(),
                ));
            }
        }
        self.imports.insert(builtin);
        let callee = builtin.local_name();

        if arguments.iter().all(|argument| is_plain_scalar(argument.ty())) {
            return Ok(Expr::intrinsic_call(&callee, arguments, Type::Float));
        }

        let ty = arguments[0].ty().clone();
        let scalars: Vec<bool> = arguments.iter().map(|a| is_plain_scalar(a.ty())).collect();
        if let [_, second] = &arguments[..] {
            let mismatched = if scalars[1] {
                scalars[0] || !builtin.broadcasts_scalar()
            } else {
                *second.ty() != ty
            };
            if mismatched {
                return Err(Error::new(
                    ErrorImpl::DifferingTypes {
                        left: ty.to_string(),
                        right: second.ty().to_string(),
                    },
                    position.clone(),
                ));
            }
        }

        let (prefix, components) = self.combine(&arguments, position)?;
        let results = (0..ty.element_count())
            .map(|index| {
                let call_arguments = components
                    .iter()
                    .zip(&scalars)
                    .map(|(parts, scalar)| pick(parts, *scalar, index))
                    .collect();
                Rc::new(Expr::intrinsic_call(&callee, call_arguments, Type::Float))
            })
            .collect();
        Ok(with_prefix(prefix, Expr::array_literal(results, ty)))
    }
}

pub(crate) fn type_list(arguments: &[Rc<Expr>]) -> String {
    arguments
        .iter()
        .map(|argument| argument.ty().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
