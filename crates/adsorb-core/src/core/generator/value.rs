use super::ast::{BinaryOp, Expr};
use nalgebra::{Point3, Vector3};
use std::collections::HashMap;
use std::fmt;

/// A value produced by evaluating a generator expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Vector(Vec<f64>),
    Text(String),
    Bool(bool),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Vector(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Text(text) => write!(f, "\"{}\"", text),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Vector(_) => "vector",
            Value::Text(_) => "string",
            Value::Bool(_) => "boolean",
        }
    }

    pub fn as_number(&self) -> Result<f64, String> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(format!("Expected a number, found {} {}", other.type_name(), other)),
        }
    }

    pub fn as_vector3(&self) -> Result<Vector3<f64>, String> {
        match self {
            Value::Vector(items) if items.len() == 3 => {
                Ok(Vector3::new(items[0], items[1], items[2]))
            }
            other => Err(format!(
                "Expected a vector of 3 numbers, found {} {}",
                other.type_name(),
                other
            )),
        }
    }

    pub fn as_point3(&self) -> Result<Point3<f64>, String> {
        self.as_vector3().map(Point3::from)
    }

    pub fn as_count(&self) -> Result<usize, String> {
        let n = self.as_number()?;
        if n.is_finite() && n >= 1.0 && n.fract() == 0.0 && n <= u32::MAX as f64 {
            Ok(n as usize)
        } else {
            Err(format!("Expected a positive whole number, found {}", n))
        }
    }

    pub fn as_bool(&self) -> Result<bool, String> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Number(n) if *n == 0.0 || *n == 1.0 => Ok(*n == 1.0),
            other => Err(format!("Expected true or false, found {} {}", other.type_name(), other)),
        }
    }
}

/// Name resolution for expression evaluation: generator locals shadow module
/// constants, which shadow the built-in names.
pub struct Scope<'a> {
    pub constants: &'a HashMap<String, Value>,
    pub locals: Option<&'a HashMap<String, Value>>,
}

impl Scope<'_> {
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.locals.and_then(|locals| locals.get(name)) {
            return Some(value.clone());
        }
        if let Some(value) = self.constants.get(name) {
            return Some(value.clone());
        }
        match name {
            "pi" => Some(Value::Number(std::f64::consts::PI)),
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        }
    }

    pub fn evaluate(&self, expr: &Expr) -> Result<Value, String> {
        let value = match expr {
            Expr::Number(n) => Value::Number(*n),
            Expr::Str(text) => Value::Text(text.clone()),
            Expr::Ident(name) => self
                .lookup(name)
                .ok_or_else(|| format!("Unknown name '{}'", name))?,
            Expr::Vector(items) => Value::Vector(
                items
                    .iter()
                    .map(|item| self.evaluate(item)?.as_number())
                    .collect::<Result<_, _>>()?,
            ),
            Expr::Neg(inner) => match self.evaluate(inner)? {
                Value::Number(n) => Value::Number(-n),
                Value::Vector(items) => Value::Vector(items.into_iter().map(|x| -x).collect()),
                other => return Err(format!("Cannot negate {} {}", other.type_name(), other)),
            },
            Expr::Binary(op, left, right) => {
                binary(*op, self.evaluate(left)?, self.evaluate(right)?)?
            }
            Expr::Call(name, arguments) => {
                let arguments = arguments
                    .iter()
                    .map(|arg| self.evaluate(arg)?.as_number())
                    .collect::<Result<Vec<_>, _>>()?;
                call(name, &arguments)?
            }
        };
        check_finite(value)
    }
}

fn check_finite(value: Value) -> Result<Value, String> {
    let finite = match &value {
        Value::Number(n) => n.is_finite(),
        Value::Vector(items) => items.iter().all(|x| x.is_finite()),
        _ => true,
    };
    if finite {
        Ok(value)
    } else {
        Err(format!("Expression produced a non-finite value {}", value))
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, String> {
    use Value::{Number, Vector};
    let apply = |a: f64, b: f64| -> Result<f64, String> {
        match op {
            BinaryOp::Add => Ok(a + b),
            BinaryOp::Sub => Ok(a - b),
            BinaryOp::Mul => Ok(a * b),
            BinaryOp::Div if b == 0.0 => Err("Division by zero".to_string()),
            BinaryOp::Div => Ok(a / b),
        }
    };

    match (left, right) {
        (Number(a), Number(b)) => Ok(Number(apply(a, b)?)),
        (Vector(a), Vector(b)) if matches!(op, BinaryOp::Add | BinaryOp::Sub) => {
            if a.len() != b.len() {
                return Err(format!(
                    "Cannot combine vectors of length {} and {}",
                    a.len(),
                    b.len()
                ));
            }
            Ok(Vector(
                a.into_iter()
                    .zip(b)
                    .map(|(x, y)| apply(x, y))
                    .collect::<Result<_, _>>()?,
            ))
        }
        (Vector(a), Number(b)) if matches!(op, BinaryOp::Mul | BinaryOp::Div) => Ok(Vector(
            a.into_iter().map(|x| apply(x, b)).collect::<Result<_, _>>()?,
        )),
        (Number(a), Vector(b)) if op == BinaryOp::Mul => Ok(Vector(
            b.into_iter().map(|y| apply(a, y)).collect::<Result<_, _>>()?,
        )),
        (left, right) => Err(format!(
            "Unsupported operation between {} and {}",
            left.type_name(),
            right.type_name()
        )),
    }
}

fn call(name: &str, arguments: &[f64]) -> Result<Value, String> {
    let single = || -> Result<f64, String> {
        match arguments {
            [x] => Ok(*x),
            _ => Err(format!(
                "Function '{}' takes 1 argument, got {}",
                name,
                arguments.len()
            )),
        }
    };
    match name {
        "sqrt" => {
            let x = single()?;
            if x < 0.0 {
                return Err(format!("Cannot take the square root of {}", x));
            }
            Ok(Value::Number(x.sqrt()))
        }
        "sin" => Ok(Value::Number(single()?.to_radians().sin())),
        "cos" => Ok(Value::Number(single()?.to_radians().cos())),
        other => Err(format!("Unknown function '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::generator::lexer::tokenize;
    use crate::core::generator::parser::parse;
    use crate::core::generator::ast::Item;

    fn eval(source: &str) -> Result<Value, String> {
        let program = parse(tokenize(&format!("let x = {}", source)).unwrap()).unwrap();
        let Item::Constant { value, .. } = &program.items[0] else {
            panic!("expected constant");
        };
        let constants = HashMap::new();
        Scope {
            constants: &constants,
            locals: None,
        }
        .evaluate(value)
    }

    #[test]
    fn arithmetic_follows_precedence() {
        assert_eq!(eval("1 + 2 * 3 - 4 / 2"), Ok(Value::Number(5.0)));
        assert_eq!(eval("-(2 + 3)"), Ok(Value::Number(-5.0)));
    }

    #[test]
    fn trigonometry_uses_degrees() {
        let Value::Number(v) = eval("sin(30) + cos(60)").unwrap() else {
            panic!("expected number");
        };
        assert!((v - 1.0).abs() < 1e-12);
        assert_eq!(eval("sqrt(16)"), Ok(Value::Number(4.0)));
    }

    #[test]
    fn vectors_support_scaling_and_addition() {
        assert_eq!(
            eval("[1, 2, 3] * 2 + [0, 0, 1]"),
            Ok(Value::Vector(vec![2.0, 4.0, 7.0]))
        );
        assert_eq!(eval("2 * [1, 0, 0]"), Ok(Value::Vector(vec![2.0, 0.0, 0.0])));
    }

    #[test]
    fn reports_arithmetic_errors() {
        assert_eq!(eval("1 / 0"), Err("Division by zero".to_string()));
        assert!(eval("sqrt(-1)").is_err());
        assert!(eval("[1, 2] + [1, 2, 3]").is_err());
        assert!(eval("\"a\" + 1").is_err());
        assert!(eval("nope").unwrap_err().contains("Unknown name"));
        assert!(eval("tan(1)").unwrap_err().contains("Unknown function"));
    }

    #[test]
    fn builtin_names_resolve() {
        assert_eq!(eval("pi"), Ok(Value::Number(std::f64::consts::PI)));
        assert_eq!(eval("true"), Ok(Value::Bool(true)));
    }

    #[test]
    fn count_conversion_rejects_fractions_and_zero() {
        assert_eq!(Value::Number(3.0).as_count(), Ok(3));
        assert!(Value::Number(0.0).as_count().is_err());
        assert!(Value::Number(2.5).as_count().is_err());
    }
}
