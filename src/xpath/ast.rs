//! Compiled form of an XPath expression.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    Ancestor,
    AncestorOrSelf,
    Attribute,
    Child,
    Descendant,
    DescendantOrSelf,
    Following,
    FollowingSibling,
    Parent,
    Preceding,
    PrecedingSibling,
    SelfNode,
}

impl Axis {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "ancestor" => Axis::Ancestor,
            "ancestor-or-self" => Axis::AncestorOrSelf,
            "attribute" => Axis::Attribute,
            "child" => Axis::Child,
            "descendant" => Axis::Descendant,
            "descendant-or-self" => Axis::DescendantOrSelf,
            "following" => Axis::Following,
            "following-sibling" => Axis::FollowingSibling,
            "parent" => Axis::Parent,
            "preceding" => Axis::Preceding,
            "preceding-sibling" => Axis::PrecedingSibling,
            "self" => Axis::SelfNode,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeTest {
    /// Local name, prefix already stripped.
    Name(String),
    /// `*` or `prefix:*`.
    Wildcard,
    /// `node()`
    AnyNode,
    /// `text()`
    Text,
    /// `comment()`
    Comment,
    /// `processing-instruction()`, optionally with a target literal.
    ProcessingInstruction,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Step {
    pub(crate) axis: Axis,
    pub(crate) test: NodeTest,
    pub(crate) predicates: Vec<Expr>,
}

impl Step {
    /// The step `//` abbreviates.
    pub(crate) fn descendant_or_self() -> Self {
        Self {
            axis: Axis::DescendantOrSelf,
            test: NodeTest::AnyNode,
            predicates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Function {
    Last,
    Position,
    Count,
    Id,
    LocalName,
    Name,
    String,
    Concat,
    StartsWith,
    Contains,
    SubstringBefore,
    SubstringAfter,
    Substring,
    StringLength,
    NormalizeSpace,
    Translate,
    Not,
    True,
    False,
    Boolean,
    Lang,
    Number,
    Sum,
    Floor,
    Ceiling,
    Round,
}

impl Function {
    /// Looks up a core library function and its accepted argument counts.
    pub(crate) fn lookup(name: &str) -> Option<(Self, usize, Option<usize>)> {
        Some(match name {
            "last" => (Function::Last, 0, Some(0)),
            "position" => (Function::Position, 0, Some(0)),
            "count" => (Function::Count, 1, Some(1)),
            "id" => (Function::Id, 1, Some(1)),
            "local-name" => (Function::LocalName, 0, Some(1)),
            "name" => (Function::Name, 0, Some(1)),
            "string" => (Function::String, 0, Some(1)),
            "concat" => (Function::Concat, 2, None),
            "starts-with" => (Function::StartsWith, 2, Some(2)),
            "contains" => (Function::Contains, 2, Some(2)),
            "substring-before" => (Function::SubstringBefore, 2, Some(2)),
            "substring-after" => (Function::SubstringAfter, 2, Some(2)),
            "substring" => (Function::Substring, 2, Some(3)),
            "string-length" => (Function::StringLength, 0, Some(1)),
            "normalize-space" => (Function::NormalizeSpace, 0, Some(1)),
            "translate" => (Function::Translate, 3, Some(3)),
            "not" => (Function::Not, 1, Some(1)),
            "true" => (Function::True, 0, Some(0)),
            "false" => (Function::False, 0, Some(0)),
            "boolean" => (Function::Boolean, 1, Some(1)),
            "lang" => (Function::Lang, 1, Some(1)),
            "number" => (Function::Number, 0, Some(1)),
            "sum" => (Function::Sum, 1, Some(1)),
            "floor" => (Function::Floor, 1, Some(1)),
            "ceiling" => (Function::Ceiling, 1, Some(1)),
            "round" => (Function::Round, 1, Some(1)),
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    Negate(Box<Expr>),
    Union(Box<Expr>, Box<Expr>),
    /// Location path; `absolute` paths start at the document root.
    Path { absolute: bool, steps: Vec<Step> },
    /// Primary expression narrowed by predicates and continued by steps.
    Filter {
        primary: Box<Expr>,
        predicates: Vec<Expr>,
        steps: Vec<Step>,
    },
    Literal(String),
    Number(f64),
    Call(Function, Vec<Expr>),
}

impl Expr {
    /// Whether evaluating this expression always yields a node-set.
    pub(crate) fn yields_nodes(&self) -> bool {
        match self {
            Expr::Path { .. } => true,
            Expr::Union(lhs, rhs) => lhs.yields_nodes() && rhs.yields_nodes(),
            Expr::Filter { primary, .. } => primary.yields_nodes(),
            Expr::Call(Function::Id, _) => true,
            _ => false,
        }
    }
}
