// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Constant folding (spec §4.5, "Constant folding & inline requires").
//!
//! The concrete AST transformer is a pluggable external collaborator (spec §1); this
//! module owns only the folding *algorithm*, expressed over a small internal [`Expr`]
//! IR rather than a full JavaScript AST. A transformer that wants folded dead-code
//! elimination reports the expression fragments it recognizes as statically foldable
//! (ternaries, logical chains, `if` statements, unary operators, `void`) as `Expr`
//! values; [`fold_expr`] reduces them, and [`prune_unreferenced_functions`] removes
//! function declarations left unreferenced by that reduction.

use std::collections::HashSet;

/// A JavaScript literal value, as produced by the transformer's own parser.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Bool(bool),
    /// Stored as `f64` so IEEE-754 negative zero survives folding unchanged.
    Number(f64),
    String(String),
    Null,
    Undefined,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UnaryOp {
    Not,
    Plus,
    Minus,
    Void,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

/// Strict (in)equality, the only binary comparison the fold rules cover (spec §4.5:
/// "literal equality"; spec §8 scenario 1's `'android' === 'android'`).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BinaryOp {
    StrictEq,
    StrictNotEq,
}

/// A foldable expression fragment.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Identifier(String),
    Unary {
        op: UnaryOp,
        argument: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `left === right` / `left !== right`.
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `test ? consequent : alternate`.
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    /// `if (test) consequent else alternate`, represented as an expression-shaped node
    /// so the same recursive fold handles both forms (spec §4.5: "`if` with literal
    /// test").
    If {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Option<Box<Expr>>,
    },
    /// `callee?.(...arguments)`. Never folded away, even when `callee` is statically
    /// known to be nullish -- spec §4.5 explicitly forbids collapsing optional-chained
    /// calls to `undefined`.
    OptionalCall {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },
    /// `export default <expr>`. Passed through unchanged at every level (spec §4.5:
    /// "must never alter export default forms").
    ExportDefault(Box<Expr>),
    /// A fragment the transformer didn't characterize further; folded structurally
    /// inert.
    Other(String),
}

/// Recursively folds `expr`, reducing statically-known branches and eliminating dead
/// alternatives (spec §4.5).
pub fn fold_expr(expr: Expr) -> Expr {
    match expr {
        Expr::Unary { op, argument } => fold_unary(op, fold_expr(*argument)),
        Expr::Logical { op, left, right } => fold_logical(op, fold_expr(*left), fold_expr(*right)),
        Expr::Binary { op, left, right } => fold_binary(op, fold_expr(*left), fold_expr(*right)),
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            let test = fold_expr(*test);
            let consequent = fold_expr(*consequent);
            let alternate = fold_expr(*alternate);
            match as_literal(&test) {
                Some(lit) => {
                    if truthy(&lit) {
                        consequent
                    } else {
                        alternate
                    }
                }
                None => Expr::Conditional {
                    test: Box::new(test),
                    consequent: Box::new(consequent),
                    alternate: Box::new(alternate),
                },
            }
        }
        Expr::If {
            test,
            consequent,
            alternate,
        } => {
            let test = fold_expr(*test);
            let consequent = fold_expr(*consequent);
            let alternate = alternate.map(|a| fold_expr(*a));
            match as_literal(&test) {
                Some(lit) if truthy(&lit) => consequent,
                Some(_) => alternate.unwrap_or(Expr::Literal(Literal::Undefined)),
                None => Expr::If {
                    test: Box::new(test),
                    consequent: Box::new(consequent),
                    alternate: alternate.map(Box::new),
                },
            }
        }
        Expr::OptionalCall { callee, arguments } => Expr::OptionalCall {
            callee: Box::new(fold_expr(*callee)),
            arguments: arguments.into_iter().map(fold_expr).collect(),
        },
        Expr::Call { callee, arguments } => Expr::Call {
            callee: Box::new(fold_expr(*callee)),
            arguments: arguments.into_iter().map(fold_expr).collect(),
        },
        Expr::ExportDefault(inner) => Expr::ExportDefault(inner),
        other @ (Expr::Literal(_) | Expr::Identifier(_) | Expr::Other(_)) => other,
    }
}

fn fold_unary(op: UnaryOp, argument: Expr) -> Expr {
    if op == UnaryOp::Void {
        // "must not touch non-literal void expressions": only a literal operand folds
        // to `undefined`; `void someCall()` keeps its side effect and is left alone.
        return match &argument {
            Expr::Literal(_) => Expr::Literal(Literal::Undefined),
            _ => Expr::Unary {
                op,
                argument: Box::new(argument),
            },
        };
    }

    let Some(lit) = as_literal(&argument) else {
        return Expr::Unary {
            op,
            argument: Box::new(argument),
        };
    };
    match op {
        UnaryOp::Not => Expr::Literal(Literal::Bool(!truthy(&lit))),
        UnaryOp::Plus => match to_number(&lit) {
            Some(n) => Expr::Literal(Literal::Number(n)),
            None => Expr::Unary {
                op,
                argument: Box::new(Expr::Literal(lit)),
            },
        },
        // IEEE-754 negation naturally preserves the sign of zero: `-0.0` stays -0.0,
        // not 0.0, satisfying the "must not rewrite negative-zero" requirement without
        // any special case.
        UnaryOp::Minus => match to_number(&lit) {
            Some(n) => Expr::Literal(Literal::Number(-n)),
            None => Expr::Unary {
                op,
                argument: Box::new(Expr::Literal(lit)),
            },
        },
        UnaryOp::Void => unreachable!("handled above"),
    }
}

fn fold_logical(op: LogicalOp, left: Expr, right: Expr) -> Expr {
    let Some(left_lit) = as_literal(&left) else {
        return Expr::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
    };
    match op {
        LogicalOp::And => {
            if truthy(&left_lit) {
                right
            } else {
                Expr::Literal(left_lit)
            }
        }
        LogicalOp::Or => {
            if truthy(&left_lit) {
                Expr::Literal(left_lit)
            } else {
                right
            }
        }
        LogicalOp::Nullish => {
            if matches!(left_lit, Literal::Null | Literal::Undefined) {
                right
            } else {
                Expr::Literal(left_lit)
            }
        }
    }
}

fn fold_binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let (Some(left_lit), Some(right_lit)) = (as_literal(&left), as_literal(&right)) else {
        return Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
    };
    let equal = strict_eq(&left_lit, &right_lit);
    Expr::Literal(Literal::Bool(match op {
        BinaryOp::StrictEq => equal,
        BinaryOp::StrictNotEq => !equal,
    }))
}

/// JavaScript's `===`: no coercion across types, `NaN !== NaN`, `-0 === 0`.
fn strict_eq(a: &Literal, b: &Literal) -> bool {
    match (a, b) {
        (Literal::Bool(x), Literal::Bool(y)) => x == y,
        (Literal::Number(x), Literal::Number(y)) => x == y,
        (Literal::String(x), Literal::String(y)) => x == y,
        (Literal::Null, Literal::Null) => true,
        (Literal::Undefined, Literal::Undefined) => true,
        _ => false,
    }
}

fn as_literal(expr: &Expr) -> Option<Literal> {
    match expr {
        Expr::Literal(lit) => Some(lit.clone()),
        _ => None,
    }
}

fn truthy(lit: &Literal) -> bool {
    match lit {
        Literal::Bool(b) => *b,
        Literal::Number(n) => *n != 0.0 && !n.is_nan(),
        Literal::String(s) => !s.is_empty(),
        Literal::Null | Literal::Undefined => false,
    }
}

fn to_number(lit: &Literal) -> Option<f64> {
    match lit {
        Literal::Number(n) => Some(*n),
        Literal::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Literal::Null => Some(0.0),
        Literal::Undefined => Some(f64::NAN),
        Literal::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
    }
}

/// Removes function declarations from `declared` that are not mentioned in `used`
/// (spec §4.5: "eliminates dead branches and unreferenced function declarations").
/// Called after folding has removed references inside dead branches, so a function
/// only called from an eliminated branch is correctly pruned.
pub fn prune_unreferenced_functions(declared: &[String], used: &HashSet<String>) -> Vec<String> {
    declared.iter().filter(|name| used.contains(name.as_str())).cloned().collect()
}

/// A foldable fragment together with the byte range in the transformer's own `code`
/// output it was parsed from, so a fold result can be spliced back into the text the
/// worker pool actually returns (spec §4.5, "Constant folding & inline requires").
#[derive(Clone, Debug, PartialEq)]
pub struct FoldableFragment {
    pub expr: Expr,
    pub start: usize,
    pub end: usize,
}

/// Renders a folded expression back to source text, but only when folding reduced it
/// to something unambiguous to print -- a literal, a bare identifier, or an opaque
/// fragment the transformer handed through verbatim. Anything still structured
/// (`Conditional`, `Logical`, `Binary`, ...) means the fold couldn't fully resolve the
/// fragment (e.g. a non-literal test), and re-serializing partially-folded JavaScript
/// from this IR risks corrupting operator precedence or whitespace the real AST
/// preserved; callers should leave the original text untouched in that case instead.
pub fn render_folded(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Literal(lit) => Some(render_literal(lit)),
        Expr::Identifier(name) => Some(name.clone()),
        Expr::Other(text) => Some(text.clone()),
        _ => None,
    }
}

fn render_literal(lit: &Literal) -> String {
    match lit {
        Literal::Bool(b) => b.to_string(),
        Literal::Number(n) => {
            if n.is_sign_negative() && *n == 0.0 {
                "-0".to_string()
            } else {
                n.to_string()
            }
        }
        Literal::String(s) => format!("{:?}", s),
        Literal::Null => "null".to_string(),
        Literal::Undefined => "undefined".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit_num(n: f64) -> Expr {
        Expr::Literal(Literal::Number(n))
    }
    fn lit_bool(b: bool) -> Expr {
        Expr::Literal(Literal::Bool(b))
    }
    fn ident(name: &str) -> Expr {
        Expr::Identifier(name.to_string())
    }

    #[test]
    fn ternary_with_literal_test_collapses_to_live_branch() {
        let expr = Expr::Conditional {
            test: Box::new(lit_bool(true)),
            consequent: Box::new(lit_num(1.0)),
            alternate: Box::new(lit_num(2.0)),
        };
        assert_eq!(fold_expr(expr), lit_num(1.0));
    }

    #[test]
    fn if_with_literal_false_test_takes_alternate() {
        let expr = Expr::If {
            test: Box::new(lit_bool(false)),
            consequent: Box::new(ident("devOnly")),
            alternate: Some(Box::new(ident("prodOnly"))),
        };
        assert_eq!(fold_expr(expr), ident("prodOnly"));
    }

    #[test]
    fn if_with_no_alternate_and_false_test_folds_to_undefined() {
        let expr = Expr::If {
            test: Box::new(lit_bool(false)),
            consequent: Box::new(ident("devOnly")),
            alternate: None,
        };
        assert_eq!(fold_expr(expr), Expr::Literal(Literal::Undefined));
    }

    #[test]
    fn logical_and_short_circuits_on_falsy_left() {
        let expr = Expr::Logical {
            op: LogicalOp::And,
            left: Box::new(lit_bool(false)),
            right: Box::new(ident("neverEvaluated")),
        };
        assert_eq!(fold_expr(expr), lit_bool(false));
    }

    #[test]
    fn logical_or_keeps_right_when_left_falsy() {
        let expr = Expr::Logical {
            op: LogicalOp::Or,
            left: Box::new(Expr::Literal(Literal::Undefined)),
            right: Box::new(ident("fallback")),
        };
        assert_eq!(fold_expr(expr), ident("fallback"));
    }

    #[test]
    fn nullish_coalescing_passes_through_non_nullish_literal() {
        let expr = Expr::Logical {
            op: LogicalOp::Nullish,
            left: Box::new(lit_num(0.0)),
            right: Box::new(ident("fallback")),
        };
        // 0 is falsy but not nullish: `??` must keep the left side.
        assert_eq!(fold_expr(expr), lit_num(0.0));
    }

    #[test]
    fn unary_not_folds_literal() {
        let expr = Expr::Unary {
            op: UnaryOp::Not,
            argument: Box::new(lit_bool(false)),
        };
        assert_eq!(fold_expr(expr), lit_bool(true));
    }

    #[test]
    fn unary_minus_preserves_negative_zero_sign() {
        let expr = Expr::Unary {
            op: UnaryOp::Minus,
            argument: Box::new(lit_num(0.0)),
        };
        match fold_expr(expr) {
            Expr::Literal(Literal::Number(n)) => {
                assert_eq!(n, 0.0);
                assert!(n.is_sign_negative(), "folding -0 must not rewrite it to +0");
            }
            other => panic!("expected a folded literal, got {:?}", other),
        }
    }

    #[test]
    fn void_literal_folds_to_undefined() {
        let expr = Expr::Unary {
            op: UnaryOp::Void,
            argument: Box::new(lit_num(0.0)),
        };
        assert_eq!(fold_expr(expr), Expr::Literal(Literal::Undefined));
    }

    #[test]
    fn void_non_literal_is_left_untouched() {
        let expr = Expr::Unary {
            op: UnaryOp::Void,
            argument: Box::new(Expr::Call {
                callee: Box::new(ident("sideEffect")),
                arguments: vec![],
            }),
        };
        let folded = fold_expr(expr.clone());
        assert_eq!(folded, expr);
    }

    #[test]
    fn optional_chained_call_is_never_collapsed() {
        let expr = Expr::OptionalCall {
            callee: Box::new(Expr::Literal(Literal::Undefined)),
            arguments: vec![],
        };
        let folded = fold_expr(expr.clone());
        assert_eq!(folded, expr);
    }

    #[test]
    fn export_default_is_never_altered() {
        let inner = Expr::Conditional {
            test: Box::new(lit_bool(true)),
            consequent: Box::new(lit_num(1.0)),
            alternate: Box::new(lit_num(2.0)),
        };
        let expr = Expr::ExportDefault(Box::new(inner.clone()));
        assert_eq!(fold_expr(expr), Expr::ExportDefault(Box::new(inner)));
    }

    #[test]
    fn strict_eq_of_matching_string_literals_folds_to_true() {
        let expr = Expr::Binary {
            op: BinaryOp::StrictEq,
            left: Box::new(Expr::Literal(Literal::String("android".to_string()))),
            right: Box::new(Expr::Literal(Literal::String("android".to_string()))),
        };
        assert_eq!(fold_expr(expr), lit_bool(true));
    }

    #[test]
    fn strict_eq_across_literal_types_folds_to_false_without_coercion() {
        let expr = Expr::Binary {
            op: BinaryOp::StrictEq,
            left: Box::new(lit_num(0.0)),
            right: Box::new(Expr::Literal(Literal::String(String::new()))),
        };
        assert_eq!(fold_expr(expr), lit_bool(false));
    }

    #[test]
    fn strict_not_eq_with_non_literal_operand_is_left_unfolded() {
        let expr = Expr::Binary {
            op: BinaryOp::StrictNotEq,
            left: Box::new(ident("platform")),
            right: Box::new(Expr::Literal(Literal::String("ios".to_string()))),
        };
        assert_eq!(fold_expr(expr.clone()), expr);
    }

    #[test]
    fn ternary_with_literal_equality_test_collapses_to_live_branch() {
        // spec §8 scenario 1: `'android' === 'android' ? {a:1} : {a:0}` -> `{a:1}`.
        let expr = Expr::Conditional {
            test: Box::new(Expr::Binary {
                op: BinaryOp::StrictEq,
                left: Box::new(Expr::Literal(Literal::String("android".to_string()))),
                right: Box::new(Expr::Literal(Literal::String("android".to_string()))),
            }),
            consequent: Box::new(Expr::Other("{a:1}".to_string())),
            alternate: Box::new(Expr::Other("{a:0}".to_string())),
        };
        assert_eq!(fold_expr(expr), Expr::Other("{a:1}".to_string()));
    }

    #[test]
    fn render_folded_accepts_literals_identifiers_and_opaque_fragments_only() {
        assert_eq!(render_folded(&lit_bool(true)), Some("true".to_string()));
        assert_eq!(render_folded(&ident("fallback")), Some("fallback".to_string()));
        assert_eq!(render_folded(&Expr::Other("{a:1}".to_string())), Some("{a:1}".to_string()));
        assert_eq!(
            render_folded(&Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(ident("a")),
                right: Box::new(ident("b")),
            }),
            None,
            "a still-structured result can't be safely re-serialized"
        );
    }

    #[test]
    fn prunes_functions_left_unreferenced_after_folding() {
        let declared = vec!["devHelper".to_string(), "prodHelper".to_string()];
        let mut used = HashSet::new();
        used.insert("prodHelper".to_string());
        assert_eq!(prune_unreferenced_functions(&declared, &used), vec!["prodHelper".to_string()]);
    }
}
