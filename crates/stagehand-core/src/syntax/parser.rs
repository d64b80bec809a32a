//! Parser frontend: loads a directory of Go sources and lowers the files
//! declaring the requested package into the syntax model.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tree_sitter::{Node, Parser as TsParser};

use super::error::ParseError;
use super::model::{Arg, BodyCall, CallExpr, Callee, FuncBody, GoFile, GoPackage};

/// Parses every `.go` file directly under `dir` and returns the syntax model
/// for the file set declaring `package_name`.
///
/// Any file that fails to parse is a fatal error, even if it belongs to a
/// different package. No semantic checks are performed.
pub fn parse_package(dir: &Path, package_name: &str) -> Result<GoPackage, ParseError> {
    let mut parser = TsParser::new();
    parser
        .set_language(&tree_sitter_go::LANGUAGE.into())
        .map_err(|e| ParseError::Grammar(e.to_string()))?;

    let mut paths: Vec<PathBuf> = Vec::new();
    let entries = fs::read_dir(dir).map_err(|e| ParseError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ParseError::io(dir, e))?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "go") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut files = Vec::new();
    for path in paths {
        let content = fs::read_to_string(&path).map_err(|e| ParseError::io(&path, e))?;
        let tree = parser
            .parse(&content, None)
            .ok_or_else(|| ParseError::Syntax { path: path.clone() })?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(ParseError::Syntax { path });
        }
        if file_package_name(&root, &content) != Some(package_name) {
            continue;
        }
        let functions = lower_file(&root, &content);
        files.push(GoFile { path, functions });
    }

    if files.is_empty() {
        return Err(ParseError::PackageNotFound {
            path: dir.to_path_buf(),
            name: package_name.to_string(),
        });
    }

    Ok(GoPackage {
        name: package_name.to_string(),
        files,
    })
}

fn node_text<'a>(node: &Node, content: &'a str) -> &'a str {
    &content[node.byte_range()]
}

fn file_package_name<'a>(root: &Node, content: &'a str) -> Option<&'a str> {
    let mut cursor = root.walk();
    let clause = root
        .named_children(&mut cursor)
        .find(|n| n.kind() == "package_clause")?;
    let mut clause_cursor = clause.walk();
    let ident = clause
        .named_children(&mut clause_cursor)
        .find(|n| n.kind() == "package_identifier")?;
    Some(node_text(&ident, content))
}

/// Collects top-level function declarations. Methods and inline declarations
/// are not test entry points, so only plain functions are kept.
fn lower_file(root: &Node, content: &str) -> BTreeMap<String, FuncBody> {
    let mut functions = BTreeMap::new();
    let mut cursor = root.walk();
    for decl in root.named_children(&mut cursor) {
        if decl.kind() != "function_declaration" {
            continue;
        }
        let Some(name_node) = decl.child_by_field_name("name") else {
            continue;
        };
        let Some(body_node) = decl.child_by_field_name("body") else {
            continue;
        };
        let name = node_text(&name_node, content).to_string();
        functions.insert(name, lower_block(&body_node, content));
    }
    functions
}

/// Lowers a block to the call statements it contains, in source order.
/// Control-flow constructs are not entered.
fn lower_block(block: &Node, content: &str) -> FuncBody {
    let mut calls = Vec::new();
    let mut cursor = block.walk();
    for stmt in block.named_children(&mut cursor) {
        match stmt.kind() {
            "expression_statement" => {
                if let Some(expr) = stmt.named_child(0) {
                    if expr.kind() == "call_expression" {
                        calls.push(BodyCall {
                            deferred: false,
                            call: lower_call(&expr, content),
                        });
                    }
                }
            }
            "defer_statement" => {
                let mut stmt_cursor = stmt.walk();
                let deferred_call = stmt
                    .named_children(&mut stmt_cursor)
                    .find(|n| n.kind() == "call_expression");
                if let Some(expr) = deferred_call {
                    calls.push(BodyCall {
                        deferred: true,
                        call: lower_call(&expr, content),
                    });
                }
            }
            _ => {}
        }
    }
    FuncBody { calls }
}

fn lower_call(call: &Node, content: &str) -> CallExpr {
    let callee = match call.child_by_field_name("function") {
        Some(f) => match f.kind() {
            "identifier" => Callee::Ident(node_text(&f, content).to_string()),
            "selector_expression" => lower_selector(&f, content),
            "func_literal" => match f.child_by_field_name("body") {
                Some(body) => Callee::FuncLit(lower_block(&body, content)),
                None => Callee::Other,
            },
            _ => Callee::Other,
        },
        None => Callee::Other,
    };

    let mut args = Vec::new();
    if let Some(list) = call.child_by_field_name("arguments") {
        let mut cursor = list.walk();
        for arg in list.named_children(&mut cursor) {
            args.push(lower_arg(&arg, content));
        }
    }

    CallExpr { callee, args }
}

fn lower_selector(selector: &Node, content: &str) -> Callee {
    let operand = selector.child_by_field_name("operand");
    let field = selector.child_by_field_name("field");
    match (operand, field) {
        (Some(operand), Some(field)) if operand.kind() == "identifier" => Callee::Selector {
            receiver: node_text(&operand, content).to_string(),
            method: node_text(&field, content).to_string(),
        },
        _ => Callee::Other,
    }
}

fn lower_arg(arg: &Node, content: &str) -> Arg {
    match arg.kind() {
        "interpreted_string_literal" => {
            Arg::StringLit(unquote_interpreted(node_text(arg, content)))
        }
        "raw_string_literal" => {
            Arg::StringLit(strip_delimiters(node_text(arg, content), '`').to_string())
        }
        "identifier" => Arg::Ident(node_text(arg, content).to_string()),
        "func_literal" => match arg.child_by_field_name("body") {
            Some(body) => Arg::FuncLit(lower_block(&body, content)),
            None => Arg::Other,
        },
        _ => Arg::Other,
    }
}

/// Strips exactly one `delim` from each end, so a quote character inside the
/// literal is never eaten.
fn strip_delimiters(text: &str, delim: char) -> &str {
    text.strip_prefix(delim)
        .and_then(|t| t.strip_suffix(delim))
        .unwrap_or(text)
}

/// Unquotes an interpreted string literal, decoding the single-character
/// escape sequences. Unicode and numeric escapes are left verbatim; stage and
/// sub-test names do not use them.
fn unquote_interpreted(text: &str) -> String {
    let inner = strip_delimiters(text, '"');
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
