//! XPath 1.0 evaluation over a `dom_query` tree.

use std::collections::{HashMap, HashSet};
use std::fmt;

use dom_query::{NodeId, NodeRef};

use super::ast::{ArithOp, Axis, CompareOp, Expr, Function, NodeTest, Step};
use crate::dom;

/// A node selected by a query.
///
/// Attributes are not tree nodes in `dom_query`, so they are carried as
/// their owner element plus a copy of the name and value.
#[derive(Clone)]
pub enum Node<'a> {
    /// Element, text, comment or document node.
    Tree(NodeRef<'a>),
    /// Attribute of `owner`; `index` is its position in source order.
    Attribute {
        /// Element carrying the attribute.
        owner: NodeRef<'a>,
        /// Source-order position among the owner's attributes.
        index: usize,
        /// Attribute name.
        name: String,
        /// Attribute value.
        value: String,
    },
}

impl<'a> Node<'a> {
    /// XPath string value of the node.
    #[must_use]
    pub fn string_value(&self) -> String {
        match self {
            Node::Tree(node) => dom::text_content(node).to_string(),
            Node::Attribute { value, .. } => value.clone(),
        }
    }

    /// Element or attribute name; `None` for other node kinds.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        match self {
            Node::Tree(node) => dom::tag_name(node).map(|tag| tag.to_string()),
            Node::Attribute { name, .. } => Some(name.clone()),
        }
    }

    /// Underlying tree node; the owner element for attributes.
    #[must_use]
    pub fn tree_node(&self) -> NodeRef<'a> {
        match self {
            Node::Tree(node) => *node,
            Node::Attribute { owner, .. } => *owner,
        }
    }

    /// Whether this is an attribute node.
    #[must_use]
    pub fn is_attribute(&self) -> bool {
        matches!(self, Node::Attribute { .. })
    }
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Tree(node) => f
                .debug_tuple("Tree")
                .field(&node.id)
                .field(&dom::tag_name(node).map(|tag| tag.to_string()))
                .finish(),
            Node::Attribute { owner, name, value, .. } => f
                .debug_struct("Attribute")
                .field("owner", &owner.id)
                .field("name", name)
                .field("value", value)
                .finish(),
        }
    }
}

/// Result of evaluating an expression.
#[derive(Debug, Clone)]
pub(crate) enum Value<'a> {
    /// Always in document order without duplicates.
    Nodes(Vec<Node<'a>>),
    Boolean(bool),
    Number(f64),
    String(String),
}

impl Value<'_> {
    pub(crate) fn to_bool(&self) -> bool {
        match self {
            Value::Nodes(nodes) => !nodes.is_empty(),
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
        }
    }

    pub(crate) fn to_number(&self) -> f64 {
        match self {
            Value::Nodes(_) => parse_number(&self.to_text()),
            Value::Boolean(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => parse_number(s),
        }
    }

    pub(crate) fn to_text(&self) -> String {
        match self {
            Value::Nodes(nodes) => nodes.first().map(Node::string_value).unwrap_or_default(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
        }
    }
}

fn is_xml_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// XPath `number()` conversion of a string: optional minus, digits with an
/// optional fraction, surrounded by whitespace. Anything else is NaN.
pub(crate) fn parse_number(s: &str) -> f64 {
    let s = s.trim_matches(is_xml_space);
    let digits = s.strip_prefix('-').unwrap_or(s);
    let mut seen_digit = false;
    let mut seen_dot = false;
    for c in digits.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return f64::NAN,
        }
    }
    if !seen_digit {
        return f64::NAN;
    }
    s.parse().unwrap_or(f64::NAN)
}

/// XPath `string()` conversion of a number.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

fn xpath_round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        n
    } else if (-0.5..0.0).contains(&n) {
        -0.0
    } else {
        (n + 0.5).floor()
    }
}

fn compare_atoms(op: CompareOp, lhs: &Value, rhs: &Value) -> bool {
    match op {
        CompareOp::Eq | CompareOp::NotEq => {
            let equal = if matches!(lhs, Value::Boolean(_)) || matches!(rhs, Value::Boolean(_)) {
                lhs.to_bool() == rhs.to_bool()
            } else if matches!(lhs, Value::Number(_)) || matches!(rhs, Value::Number(_)) {
                lhs.to_number() == rhs.to_number()
            } else {
                lhs.to_text() == rhs.to_text()
            };
            if op == CompareOp::Eq {
                equal
            } else {
                !equal
            }
        }
        CompareOp::Lt => lhs.to_number() < rhs.to_number(),
        CompareOp::LtEq => lhs.to_number() <= rhs.to_number(),
        CompareOp::Gt => lhs.to_number() > rhs.to_number(),
        CompareOp::GtEq => lhs.to_number() >= rhs.to_number(),
    }
}

/// Atomic value a node takes when compared with `other`.
fn atomize<'a>(node: &Node<'a>, other: &Value) -> Value<'a> {
    let text = node.string_value();
    match other {
        Value::Number(_) => Value::Number(parse_number(&text)),
        _ => Value::String(text),
    }
}

/// Comparison with the XPath 1.0 existential semantics for node-sets.
fn compare(op: CompareOp, lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Nodes(left), Value::Nodes(right)) => {
            let right: Vec<Value> = right
                .iter()
                .map(|node| Value::String(node.string_value()))
                .collect();
            left.iter().any(|node| {
                let left = Value::String(node.string_value());
                right.iter().any(|r| compare_atoms(op, &left, r))
            })
        }
        (Value::Nodes(left), Value::Boolean(_)) => {
            compare_atoms(op, &Value::Boolean(!left.is_empty()), rhs)
        }
        (Value::Boolean(_), Value::Nodes(right)) => {
            compare_atoms(op, lhs, &Value::Boolean(!right.is_empty()))
        }
        (Value::Nodes(left), other) => left
            .iter()
            .any(|node| compare_atoms(op, &atomize(node, other), other)),
        (other, Value::Nodes(right)) => right
            .iter()
            .any(|node| compare_atoms(op, other, &atomize(node, other))),
        _ => compare_atoms(op, lhs, rhs),
    }
}

fn matches_test(node: &Node, test: &NodeTest, axis: Axis) -> bool {
    match node {
        Node::Attribute { name, .. } => match test {
            NodeTest::AnyNode => true,
            NodeTest::Wildcard => axis == Axis::Attribute,
            NodeTest::Name(wanted) => axis == Axis::Attribute && name.eq_ignore_ascii_case(wanted),
            _ => false,
        },
        Node::Tree(node) => match test {
            NodeTest::AnyNode => true,
            NodeTest::Wildcard => axis != Axis::Attribute && node.is_element(),
            NodeTest::Name(wanted) => axis != Axis::Attribute && dom::has_tag(node, wanted),
            NodeTest::Text => node.is_text(),
            NodeTest::Comment => node.is_comment(),
            NodeTest::ProcessingInstruction => false,
        },
    }
}

struct Context<'a> {
    node: Node<'a>,
    position: usize,
    size: usize,
}

/// Evaluates expressions against one document.
pub(crate) struct Evaluator<'a> {
    root: NodeRef<'a>,
    all: Vec<NodeRef<'a>>,
    order: HashMap<NodeId, usize>,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(root: NodeRef<'a>) -> Self {
        let all = dom::subtree(&root);
        let order = all.iter().enumerate().map(|(i, node)| (node.id, i)).collect();
        Self { root, all, order }
    }

    /// Evaluates `expr` with the document node as context.
    pub(crate) fn evaluate(&self, expr: &Expr) -> Result<Value<'a>, String> {
        let context = Context {
            node: Node::Tree(self.root),
            position: 1,
            size: 1,
        };
        self.eval(expr, &context)
    }

    fn position_of(&self, node: &NodeRef) -> usize {
        self.order.get(&node.id).copied().unwrap_or(usize::MAX)
    }

    fn order_key(&self, node: &Node) -> (usize, usize) {
        match node {
            Node::Tree(node) => (self.position_of(node), 0),
            Node::Attribute { owner, index, .. } => (self.position_of(owner), index + 1),
        }
    }

    fn in_document_order(&self, mut nodes: Vec<Node<'a>>) -> Vec<Node<'a>> {
        nodes.sort_by_key(|node| self.order_key(node));
        nodes.dedup_by_key(|node| self.order_key(node));
        nodes
    }

    fn eval(&self, expr: &Expr, ctx: &Context<'a>) -> Result<Value<'a>, String> {
        let value = match expr {
            Expr::Or(lhs, rhs) => {
                Value::Boolean(self.eval(lhs, ctx)?.to_bool() || self.eval(rhs, ctx)?.to_bool())
            }
            Expr::And(lhs, rhs) => {
                Value::Boolean(self.eval(lhs, ctx)?.to_bool() && self.eval(rhs, ctx)?.to_bool())
            }
            Expr::Compare(op, lhs, rhs) => {
                let lhs = self.eval(lhs, ctx)?;
                let rhs = self.eval(rhs, ctx)?;
                Value::Boolean(compare(*op, &lhs, &rhs))
            }
            Expr::Arith(op, lhs, rhs) => {
                let lhs = self.eval(lhs, ctx)?.to_number();
                let rhs = self.eval(rhs, ctx)?.to_number();
                Value::Number(match op {
                    ArithOp::Add => lhs + rhs,
                    ArithOp::Sub => lhs - rhs,
                    ArithOp::Mul => lhs * rhs,
                    ArithOp::Div => lhs / rhs,
                    ArithOp::Mod => lhs % rhs,
                })
            }
            Expr::Negate(operand) => Value::Number(-self.eval(operand, ctx)?.to_number()),
            Expr::Union(lhs, rhs) => {
                let mut nodes = self.eval_nodes(lhs, ctx)?;
                nodes.extend(self.eval_nodes(rhs, ctx)?);
                Value::Nodes(self.in_document_order(nodes))
            }
            Expr::Path { absolute, steps } => {
                let start = if *absolute {
                    Node::Tree(self.root)
                } else {
                    ctx.node.clone()
                };
                Value::Nodes(self.walk(vec![start], steps)?)
            }
            Expr::Filter {
                primary,
                predicates,
                steps,
            } => {
                let mut nodes = self.eval_nodes(primary, ctx)?;
                for predicate in predicates {
                    nodes = self.filter(nodes, predicate)?;
                }
                Value::Nodes(self.walk(nodes, steps)?)
            }
            Expr::Literal(s) => Value::String(s.clone()),
            Expr::Number(n) => Value::Number(*n),
            Expr::Call(function, args) => self.call(*function, args, ctx)?,
        };
        Ok(value)
    }

    fn eval_nodes(&self, expr: &Expr, ctx: &Context<'a>) -> Result<Vec<Node<'a>>, String> {
        match self.eval(expr, ctx)? {
            Value::Nodes(nodes) => Ok(nodes),
            other => Err(format!("expected a node-set, got {other:?}")),
        }
    }

    /// Applies location steps to a node-set in document order.
    fn walk(&self, mut nodes: Vec<Node<'a>>, steps: &[Step]) -> Result<Vec<Node<'a>>, String> {
        for step in steps {
            let mut next = Vec::new();
            for node in &nodes {
                let mut candidates: Vec<Node<'a>> = self
                    .axis(node, step.axis)
                    .into_iter()
                    .filter(|candidate| matches_test(candidate, &step.test, step.axis))
                    .collect();
                for predicate in &step.predicates {
                    candidates = self.filter(candidates, predicate)?;
                }
                next.extend(candidates);
            }
            nodes = self.in_document_order(next);
        }
        Ok(nodes)
    }

    /// Keeps the nodes for which `predicate` holds; positions follow the
    /// order of `nodes`.
    fn filter(&self, nodes: Vec<Node<'a>>, predicate: &Expr) -> Result<Vec<Node<'a>>, String> {
        let size = nodes.len();
        let mut kept = Vec::new();
        for (i, node) in nodes.into_iter().enumerate() {
            let ctx = Context {
                node,
                position: i + 1,
                size,
            };
            let keep = match self.eval(predicate, &ctx)? {
                Value::Number(n) => n == (i + 1) as f64,
                other => other.to_bool(),
            };
            if keep {
                kept.push(ctx.node);
            }
        }
        Ok(kept)
    }

    /// Nodes on `axis` from `node`, in axis order (reverse axes nearest first).
    fn axis(&self, node: &Node<'a>, axis: Axis) -> Vec<Node<'a>> {
        let tree = |nodes: Vec<NodeRef<'a>>| nodes.into_iter().map(Node::Tree).collect::<Vec<_>>();
        match (axis, node) {
            (Axis::SelfNode, _) => vec![node.clone()],
            (Axis::Child, Node::Tree(n)) => tree(n.children()),
            (Axis::Descendant, Node::Tree(n)) => tree(dom::descendants(n)),
            (Axis::DescendantOrSelf, Node::Tree(n)) => tree(dom::subtree(n)),
            (Axis::DescendantOrSelf, Node::Attribute { .. }) => vec![node.clone()],
            (Axis::Parent, Node::Tree(n)) => n.parent().map(Node::Tree).into_iter().collect(),
            (Axis::Parent, Node::Attribute { owner, .. }) => vec![Node::Tree(*owner)],
            (Axis::Ancestor, Node::Tree(n)) => tree(dom::ancestors(n)),
            (Axis::Ancestor, Node::Attribute { owner, .. }) => {
                let mut out = vec![*owner];
                out.extend(dom::ancestors(owner));
                tree(out)
            }
            (Axis::AncestorOrSelf, _) => {
                let mut out = vec![node.clone()];
                out.extend(self.axis(node, Axis::Ancestor));
                out
            }
            (Axis::FollowingSibling, Node::Tree(n)) => tree(dom::following_siblings(n)),
            (Axis::PrecedingSibling, Node::Tree(n)) => tree(dom::preceding_siblings(n)),
            (Axis::Following, Node::Tree(n)) => {
                let end = self.position_of(&dom::last_descendant(n));
                tree(self.all.get(end.saturating_add(1)..).unwrap_or_default().to_vec())
            }
            (Axis::Following, Node::Attribute { owner, .. }) => {
                let start = self.position_of(owner);
                tree(self.all.get(start.saturating_add(1)..).unwrap_or_default().to_vec())
            }
            (Axis::Preceding, _) => {
                let target = node.tree_node();
                let ancestors: HashSet<NodeId> =
                    dom::ancestors(&target).iter().map(|a| a.id).collect();
                let end = self.position_of(&target).min(self.all.len());
                tree(
                    self.all[..end]
                        .iter()
                        .rev()
                        .filter(|candidate| !ancestors.contains(&candidate.id))
                        .copied()
                        .collect(),
                )
            }
            (Axis::Attribute, Node::Tree(n)) => dom::attributes(n)
                .into_iter()
                .enumerate()
                .map(|(index, (name, value))| Node::Attribute {
                    owner: *n,
                    index,
                    name,
                    value,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    fn context_or_arg(&self, args: &[Expr], ctx: &Context<'a>) -> Result<String, String> {
        match args.first() {
            Some(arg) => Ok(self.eval(arg, ctx)?.to_text()),
            None => Ok(ctx.node.string_value()),
        }
    }

    fn strings(&self, args: &[Expr], ctx: &Context<'a>) -> Result<Vec<String>, String> {
        args.iter()
            .map(|arg| self.eval(arg, ctx).map(|value| value.to_text()))
            .collect()
    }

    fn elements_with_id(&self, ids: &HashSet<String>) -> Vec<Node<'a>> {
        self.all
            .iter()
            .filter(|node| dom::attribute(node, "id").is_some_and(|id| ids.contains(&id)))
            .map(|node| Node::Tree(*node))
            .collect()
    }

    fn lang_matches(&self, ctx: &Context<'a>, wanted: &str) -> bool {
        let start = ctx.node.tree_node();
        let mut chain = vec![start];
        chain.extend(dom::ancestors(&start));
        let declared = chain.iter().find_map(|node| {
            dom::attribute(node, "xml:lang").or_else(|| dom::attribute(node, "lang"))
        });
        let Some(declared) = declared else {
            return false;
        };
        let declared = declared.to_ascii_lowercase();
        let wanted = wanted.to_ascii_lowercase();
        declared == wanted || declared.starts_with(&format!("{wanted}-"))
    }

    fn call(&self, function: Function, args: &[Expr], ctx: &Context<'a>) -> Result<Value<'a>, String> {
        let value = match function {
            Function::Last => Value::Number(ctx.size as f64),
            Function::Position => Value::Number(ctx.position as f64),
            Function::Count => Value::Number(self.eval_nodes(&args[0], ctx)?.len() as f64),
            Function::Id => {
                let ids: HashSet<String> = match self.eval(&args[0], ctx)? {
                    Value::Nodes(nodes) => nodes
                        .iter()
                        .flat_map(|node| {
                            node.string_value()
                                .split_whitespace()
                                .map(str::to_string)
                                .collect::<Vec<_>>()
                        })
                        .collect(),
                    other => other.to_text().split_whitespace().map(str::to_string).collect(),
                };
                Value::Nodes(self.elements_with_id(&ids))
            }
            Function::LocalName | Function::Name => {
                let node = match args.first() {
                    Some(arg) => self.eval_nodes(arg, ctx)?.into_iter().next(),
                    None => Some(ctx.node.clone()),
                };
                Value::String(node.and_then(|node| node.name()).unwrap_or_default())
            }
            Function::String => Value::String(self.context_or_arg(args, ctx)?),
            Function::Concat => Value::String(self.strings(args, ctx)?.concat()),
            Function::StartsWith => {
                let s = self.strings(args, ctx)?;
                Value::Boolean(s[0].starts_with(s[1].as_str()))
            }
            Function::Contains => {
                let s = self.strings(args, ctx)?;
                Value::Boolean(s[0].contains(s[1].as_str()))
            }
            Function::SubstringBefore => {
                let s = self.strings(args, ctx)?;
                Value::String(
                    s[0].find(s[1].as_str())
                        .map(|at| s[0][..at].to_string())
                        .unwrap_or_default(),
                )
            }
            Function::SubstringAfter => {
                let s = self.strings(args, ctx)?;
                Value::String(
                    s[0].find(s[1].as_str())
                        .map(|at| s[0][at + s[1].len()..].to_string())
                        .unwrap_or_default(),
                )
            }
            Function::Substring => {
                let text = self.eval(&args[0], ctx)?.to_text();
                let start = xpath_round(self.eval(&args[1], ctx)?.to_number());
                let end = match args.get(2) {
                    Some(len) => start + xpath_round(self.eval(len, ctx)?.to_number()),
                    None => f64::INFINITY,
                };
                Value::String(
                    text.chars()
                        .enumerate()
                        .filter(|(i, _)| {
                            let position = (i + 1) as f64;
                            position >= start && position < end
                        })
                        .map(|(_, c)| c)
                        .collect(),
                )
            }
            Function::StringLength => {
                Value::Number(self.context_or_arg(args, ctx)?.chars().count() as f64)
            }
            Function::NormalizeSpace => {
                let text = self.context_or_arg(args, ctx)?;
                Value::String(
                    text.split(is_xml_space)
                        .filter(|part| !part.is_empty())
                        .collect::<Vec<_>>()
                        .join(" "),
                )
            }
            Function::Translate => {
                let s = self.strings(args, ctx)?;
                let from: Vec<char> = s[1].chars().collect();
                let to: Vec<char> = s[2].chars().collect();
                Value::String(
                    s[0].chars()
                        .filter_map(|c| match from.iter().position(|f| *f == c) {
                            Some(i) => to.get(i).copied(),
                            None => Some(c),
                        })
                        .collect(),
                )
            }
            Function::Not => Value::Boolean(!self.eval(&args[0], ctx)?.to_bool()),
            Function::True => Value::Boolean(true),
            Function::False => Value::Boolean(false),
            Function::Boolean => Value::Boolean(self.eval(&args[0], ctx)?.to_bool()),
            Function::Lang => {
                let wanted = self.eval(&args[0], ctx)?.to_text();
                Value::Boolean(self.lang_matches(ctx, &wanted))
            }
            Function::Number => match args.first() {
                Some(arg) => Value::Number(self.eval(arg, ctx)?.to_number()),
                None => Value::Number(parse_number(&ctx.node.string_value())),
            },
            Function::Sum => Value::Number(
                self.eval_nodes(&args[0], ctx)?
                    .iter()
                    .map(|node| parse_number(&node.string_value()))
                    .sum(),
            ),
            Function::Floor => Value::Number(self.eval(&args[0], ctx)?.to_number().floor()),
            Function::Ceiling => Value::Number(self.eval(&args[0], ctx)?.to_number().ceil()),
            Function::Round => Value::Number(xpath_round(self.eval(&args[0], ctx)?.to_number())),
        };
        Ok(value)
    }
}
