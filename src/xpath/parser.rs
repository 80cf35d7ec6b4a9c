//! Recursive-descent parser for XPath 1.0 expressions.

use super::ast::{ArithOp, Axis, CompareOp, Expr, Function, NodeTest, Step};
use super::lexer::{tokenize, Token};

/// Deepest expression tree accepted. Every nested expression and every
/// operator link counts one level, which keeps both parsing and evaluation
/// well inside the stack.
const MAX_DEPTH: usize = 256;

/// Parses `source` into an expression tree.
pub(crate) fn parse(source: &str) -> Result<Expr, String> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err("empty expression".to_string());
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(format!("unexpected {token:?} after complete expression")),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

/// Strips a namespace prefix; HTML trees carry no namespaces worth testing.
fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), String> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(match self.peek() {
                Some(found) => format!("expected {expected:?}, found {found:?}"),
                None => format!("expected {expected:?}, found end of expression"),
            })
        }
    }

    fn expr(&mut self) -> Result<Expr, String> {
        let outer = self.depth;
        self.descend()?;
        let expr = self.or_expr();
        self.depth = outer;
        expr
    }

    /// Counts one more level of nesting under the current expression.
    fn descend(&mut self) -> Result<(), String> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err("expression nested too deeply".to_string());
        }
        Ok(())
    }

    fn or_expr(&mut self) -> Result<Expr, String> {
        let mut lhs = self.and_expr()?;
        while self.eat(&Token::Or) {
            self.descend()?;
            let rhs = self.and_expr()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, String> {
        let mut lhs = self.equality_expr()?;
        while self.eat(&Token::And) {
            self.descend()?;
            let rhs = self.equality_expr()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn equality_expr(&mut self) -> Result<Expr, String> {
        let mut lhs = self.relational_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => CompareOp::Eq,
                Some(Token::NotEq) => CompareOp::NotEq,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            self.descend()?;
            let rhs = self.relational_expr()?;
            lhs = Expr::Compare(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn relational_expr(&mut self) -> Result<Expr, String> {
        let mut lhs = self.additive_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => CompareOp::Lt,
                Some(Token::LtEq) => CompareOp::LtEq,
                Some(Token::Gt) => CompareOp::Gt,
                Some(Token::GtEq) => CompareOp::GtEq,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            self.descend()?;
            let rhs = self.additive_expr()?;
            lhs = Expr::Compare(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn additive_expr(&mut self) -> Result<Expr, String> {
        let mut lhs = self.multiplicative_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithOp::Add,
                Some(Token::Minus) => ArithOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            self.descend()?;
            let rhs = self.multiplicative_expr()?;
            lhs = Expr::Arith(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn multiplicative_expr(&mut self) -> Result<Expr, String> {
        let mut lhs = self.unary_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Multiply) => ArithOp::Mul,
                Some(Token::Div) => ArithOp::Div,
                Some(Token::Mod) => ArithOp::Mod,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            self.descend()?;
            let rhs = self.unary_expr()?;
            lhs = Expr::Arith(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary_expr(&mut self) -> Result<Expr, String> {
        if self.eat(&Token::Minus) {
            self.descend()?;
            let operand = self.unary_expr()?;
            return Ok(Expr::Negate(Box::new(operand)));
        }
        self.union_expr()
    }

    fn union_expr(&mut self) -> Result<Expr, String> {
        let mut lhs = self.path_expr()?;
        while self.eat(&Token::Pipe) {
            self.descend()?;
            let rhs = self.path_expr()?;
            if !lhs.yields_nodes() || !rhs.yields_nodes() {
                return Err("operands of `|` must be node-sets".to_string());
            }
            lhs = Expr::Union(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn path_expr(&mut self) -> Result<Expr, String> {
        match self.peek() {
            Some(
                Token::Literal(_)
                | Token::Number(_)
                | Token::Variable(_)
                | Token::LParen
                | Token::FunctionName(_),
            ) => self.filter_path(),
            _ => self.location_path(),
        }
    }

    fn filter_path(&mut self) -> Result<Expr, String> {
        let primary = self.primary_expr()?;
        let predicates = self.predicates()?;
        let mut steps = Vec::new();
        if matches!(self.peek(), Some(Token::Slash | Token::DoubleSlash)) {
            if !primary.yields_nodes() {
                return Err("only node-sets can be followed by a path".to_string());
            }
            self.continue_path(&mut steps)?;
        }
        if predicates.is_empty() && steps.is_empty() {
            return Ok(primary);
        }
        if !primary.yields_nodes() {
            return Err("predicates can only filter node-sets".to_string());
        }
        Ok(Expr::Filter {
            primary: Box::new(primary),
            predicates,
            steps,
        })
    }

    fn primary_expr(&mut self) -> Result<Expr, String> {
        match self.advance() {
            Some(Token::Literal(value)) => Ok(Expr::Literal(value)),
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::Variable(name)) => Err(format!("variable ${name} is not bound")),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::FunctionName(name)) => self.function_call(&name),
            Some(token) => Err(format!("unexpected {token:?}")),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn function_call(&mut self, name: &str) -> Result<Expr, String> {
        let (function, min, max) =
            Function::lookup(name).ok_or_else(|| format!("unknown function {name}()"))?;
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                args.push(self.expr()?);
                if self.eat(&Token::RParen) {
                    break;
                }
                self.expect(&Token::Comma)?;
            }
        }
        if args.len() < min || max.is_some_and(|max| args.len() > max) {
            return Err(format!("{name}() does not take {} argument(s)", args.len()));
        }
        if matches!(function, Function::Count | Function::Sum) && !args[0].yields_nodes() {
            return Err(format!("{name}() expects a node-set"));
        }
        Ok(Expr::Call(function, args))
    }

    fn location_path(&mut self) -> Result<Expr, String> {
        let mut steps = Vec::new();
        let absolute = match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                if !self.at_step_start() {
                    return Ok(Expr::Path {
                        absolute: true,
                        steps,
                    });
                }
                true
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                steps.push(Step::descendant_or_self());
                true
            }
            _ => false,
        };
        steps.push(self.step()?);
        self.continue_path(&mut steps)?;
        Ok(Expr::Path { absolute, steps })
    }

    /// Parses `('/' | '//') Step` repetitions.
    fn continue_path(&mut self, steps: &mut Vec<Step>) -> Result<(), String> {
        loop {
            match self.peek() {
                Some(Token::Slash) => self.pos += 1,
                Some(Token::DoubleSlash) => {
                    self.pos += 1;
                    steps.push(Step::descendant_or_self());
                }
                _ => return Ok(()),
            }
            steps.push(self.step()?);
        }
    }

    fn at_step_start(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::Dot
                    | Token::DotDot
                    | Token::At
                    | Token::AxisName(_)
                    | Token::Name(_)
                    | Token::Wildcard
                    | Token::NodeType(_)
            )
        )
    }

    fn step(&mut self) -> Result<Step, String> {
        if self.eat(&Token::Dot) {
            return Ok(Step {
                axis: Axis::SelfNode,
                test: NodeTest::AnyNode,
                predicates: Vec::new(),
            });
        }
        if self.eat(&Token::DotDot) {
            return Ok(Step {
                axis: Axis::Parent,
                test: NodeTest::AnyNode,
                predicates: Vec::new(),
            });
        }

        let axis = if self.eat(&Token::At) {
            Axis::Attribute
        } else if let Some(Token::AxisName(name)) = self.peek() {
            let axis = match name.as_str() {
                "namespace" => return Err("the namespace axis is not supported".to_string()),
                other => Axis::from_name(other).ok_or_else(|| format!("unknown axis {other}"))?,
            };
            self.pos += 1;
            self.expect(&Token::ColonColon)?;
            axis
        } else {
            Axis::Child
        };

        let test = self.node_test()?;
        let predicates = self.predicates()?;
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn node_test(&mut self) -> Result<NodeTest, String> {
        match self.advance() {
            Some(Token::Wildcard) => Ok(NodeTest::Wildcard),
            Some(Token::Name(name)) => Ok(NodeTest::Name(local_part(&name).to_string())),
            Some(Token::NodeType(kind)) => {
                self.expect(&Token::LParen)?;
                let test = match kind.as_str() {
                    "node" => NodeTest::AnyNode,
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    _ => {
                        if matches!(self.peek(), Some(Token::Literal(_))) {
                            self.pos += 1;
                        }
                        NodeTest::ProcessingInstruction
                    }
                };
                self.expect(&Token::RParen)?;
                Ok(test)
            }
            Some(token) => Err(format!("expected a node test, found {token:?}")),
            None => Err("expected a node test, found end of expression".to_string()),
        }
    }

    fn predicates(&mut self) -> Result<Vec<Expr>, String> {
        let mut predicates = Vec::new();
        while self.eat(&Token::LBracket) {
            predicates.push(self.expr()?);
            self.expect(&Token::RBracket)?;
        }
        Ok(predicates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_slash_expands_to_descendant_or_self() {
        let expr = parse("//div").expect("parses");
        let Expr::Path { absolute, steps } = expr else {
            panic!("expected a path");
        };
        assert!(absolute);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0], Step::descendant_or_self());
        assert_eq!(steps[1].test, NodeTest::Name("div".into()));
    }

    #[test]
    fn bare_slash_is_the_root() {
        assert_eq!(
            parse("/").expect("parses"),
            Expr::Path {
                absolute: true,
                steps: Vec::new()
            }
        );
    }

    #[test]
    fn prefixes_are_dropped_from_name_tests() {
        let Expr::Path { steps, .. } = parse("//xhtml:div").expect("parses") else {
            panic!("expected a path");
        };
        assert_eq!(steps[1].test, NodeTest::Name("div".into()));
    }

    #[test]
    fn filter_expression_with_path() {
        let expr = parse("id('main')//p[1]").expect("parses");
        assert!(matches!(expr, Expr::Filter { .. }));
        assert!(expr.yields_nodes());
    }

    #[test]
    fn operator_precedence() {
        let expr = parse("1 + 2 * 3 = 7 or false()").expect("parses");
        let Expr::Or(lhs, _) = expr else {
            panic!("expected or at the top");
        };
        assert!(matches!(*lhs, Expr::Compare(CompareOp::Eq, _, _)));
    }

    #[test]
    fn rejects_bad_expressions() {
        for source in [
            "",
            "//div[",
            "//div]",
            "foo()",
            "count('a')",
            "'a' | //p",
            "$var",
            "namespace::x",
            "substring('a')",
            "//div/",
        ] {
            assert!(parse(source).is_err(), "{source} should not parse");
        }
    }

    #[test]
    fn deeply_nested_parentheses_are_rejected() {
        let source = format!("{}//p{}", "(".repeat(2000), ")".repeat(2000));
        let err = parse(&source).expect_err("too deep");
        assert_eq!(err, "expression nested too deeply");
    }

    #[test]
    fn deeply_nested_predicates_are_rejected() {
        let source = format!("//p{}{}", "[p".repeat(2000), "]".repeat(2000));
        assert_eq!(parse(&source).expect_err("too deep"), "expression nested too deeply");
    }

    #[test]
    fn long_operator_chains_are_rejected() {
        let source = vec!["1"; 2000].join(" + ");
        assert!(parse(&source).is_err());
        let negations = format!("{}1", "-".repeat(2000));
        assert!(parse(&negations).is_err());
    }

    #[test]
    fn moderate_nesting_still_parses() {
        let source = format!("{}//p{}", "(".repeat(50), ")".repeat(50));
        assert!(parse(&source).is_ok());
        assert!(parse("//div[p[span[a[@href and contains(@class, 'x')]]]]").is_ok());
    }
}
