//! Math builtins backed by the host's `Math` object.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Builtin {
    /// Name in the source language.
    pub name: &'static str,
    pub arity: usize,
}

const BUILTINS: &[Builtin] = &[
    Builtin { name: "sin", arity: 1 },
    Builtin { name: "cos", arity: 1 },
    Builtin { name: "tan", arity: 1 },
    Builtin { name: "asin", arity: 1 },
    Builtin { name: "acos", arity: 1 },
    Builtin { name: "atan", arity: 1 },
    Builtin { name: "exp", arity: 1 },
    Builtin { name: "log", arity: 1 },
    Builtin { name: "sqrt", arity: 1 },
    Builtin { name: "abs", arity: 1 },
    Builtin { name: "floor", arity: 1 },
    Builtin { name: "ceil", arity: 1 },
    Builtin { name: "pow", arity: 2 },
    Builtin { name: "min", arity: 2 },
    Builtin { name: "max", arity: 2 },
];

impl Builtin {
    pub fn lookup(name: &str) -> Option<Builtin> {
        BUILTINS.iter().find(|builtin| builtin.name == name).copied()
    }

    /// The local the imported function is bound to, e.g. `$sin`.
    pub fn local_name(&self) -> String {
        format!("${}", self.name)
    }

    /// Where the import comes from, relative to the host environment.
    pub fn host_path(&self) -> String {
        format!("Math.{}", self.name)
    }

    /// Whether a scalar second argument may be applied to every component of
    /// a vector first argument.
    pub fn broadcasts_scalar(&self) -> bool {
        matches!(self.name, "min" | "max")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let sqrt = Builtin::lookup("sqrt").unwrap();
        assert_eq!(sqrt.arity, 1);
        assert_eq!(sqrt.local_name(), "$sqrt");
        assert_eq!(sqrt.host_path(), "Math.sqrt");

        assert_eq!(Builtin::lookup("pow").unwrap().arity, 2);
        assert!(Builtin::lookup("texture2D").is_none());
    }
}
