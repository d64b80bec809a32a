use std::collections::BTreeMap;
use std::path::PathBuf;

/// A parsed Go package: the set of files in one directory that declare the
/// same package name.
#[derive(Debug, Clone)]
pub struct GoPackage {
    pub name: String,
    pub files: Vec<GoFile>,
}

impl GoPackage {
    /// Collects every top-level function across all files of the package,
    /// keyed by name. Declaration names are unique within a package, so a
    /// later file never shadows an earlier one in well-formed input.
    pub fn top_level_functions(&self) -> BTreeMap<&str, &FuncBody> {
        let mut funcs = BTreeMap::new();
        for file in &self.files {
            for (name, body) in &file.functions {
                funcs.insert(name.as_str(), body);
            }
        }
        funcs
    }
}

/// A single source file: its path and the top-level functions it declares.
#[derive(Debug, Clone)]
pub struct GoFile {
    pub path: PathBuf,
    pub functions: BTreeMap<String, FuncBody>,
}

/// The body of a function, reduced to its call statements in source order.
#[derive(Debug, Clone, Default)]
pub struct FuncBody {
    pub calls: Vec<BodyCall>,
}

/// One call statement within a body. Deferred calls run when the enclosing
/// function returns, in reverse declaration order.
#[derive(Debug, Clone)]
pub struct BodyCall {
    pub deferred: bool,
    pub call: CallExpr,
}

/// A call expression: the function reference plus its arguments.
#[derive(Debug, Clone)]
pub struct CallExpr {
    pub callee: Callee,
    pub args: Vec<Arg>,
}

/// The shape of a call's function reference.
#[derive(Debug, Clone)]
pub enum Callee {
    /// Bare identifier, e.g. `deploy(t)`.
    Ident(String),
    /// Selector on an identifier receiver, e.g. `test_structure.RunTestStage`.
    Selector { receiver: String, method: String },
    /// Immediately-invoked function literal.
    FuncLit(FuncBody),
    /// Anything else (chained selectors, index expressions, ...).
    Other,
}

/// An argument expression, classified only as far as stage extraction needs.
#[derive(Debug, Clone)]
pub enum Arg {
    StringLit(String),
    Ident(String),
    FuncLit(FuncBody),
    Other,
}
