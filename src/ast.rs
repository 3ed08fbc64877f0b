// Abstract Syntax Tree definitions
// Node types for the expression language used inside `$( ... )` spans

use serde::{Deserialize, Serialize};

/// AST Node types
///
/// Every expression parses into a single tree of these nodes; evaluation is
/// a recursive walk over it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AstNode {
    /// String literal (e.g., 'hello', "world")
    String(String),

    /// Integer literal
    Integer(i64),

    /// Floating point literal
    Float(f64),

    /// Boolean literal (True, False)
    Boolean(bool),

    /// The None literal
    None,

    /// Name lookup in local scopes or the environment
    Name(String),

    /// List display [a, b]
    List(Vec<AstNode>),

    /// Tuple display (a, b); evaluates to a list
    Tuple(Vec<AstNode>),

    /// Dictionary display {k: v}
    Dict(Vec<(AstNode, AstNode)>),

    /// List comprehension [element for target in iter if cond]
    /// Generator arguments `f(x for x in y)` parse into this as well
    ListComprehension {
        element: Box<AstNode>,
        generators: Vec<Comprehension>,
    },

    /// Dictionary comprehension {key: value for target in iter}
    DictComprehension {
        key: Box<AstNode>,
        value: Box<AstNode>,
        generators: Vec<Comprehension>,
    },

    /// Binary operation
    Binary {
        op: BinaryOp,
        lhs: Box<AstNode>,
        rhs: Box<AstNode>,
    },

    /// Unary operation
    Unary {
        op: UnaryOp,
        operand: Box<AstNode>,
    },

    /// Comparison chain: `a < b <= c` holds when every link holds
    Compare {
        lhs: Box<AstNode>,
        comparisons: Vec<(CompareOp, AstNode)>,
    },

    /// Conditional expression: `then_branch if condition else else_branch`
    Conditional {
        condition: Box<AstNode>,
        then_branch: Box<AstNode>,
        else_branch: Box<AstNode>,
    },

    /// Anonymous function: `lambda a, b: body`
    Lambda {
        params: Vec<String>,
        body: Box<AstNode>,
    },

    /// Call an arbitrary expression as a function
    Call {
        function: Box<AstNode>,
        args: Vec<Argument>,
    },

    /// Index or key lookup: value[index]
    Subscript {
        value: Box<AstNode>,
        index: Box<AstNode>,
    },

    /// Slice: value[start:stop]
    Slice {
        value: Box<AstNode>,
        start: Option<Box<AstNode>>,
        stop: Option<Box<AstNode>>,
    },

    /// Attribute access: value.name
    Attribute {
        value: Box<AstNode>,
        name: String,
    },
}

/// A call-site argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Argument {
    Positional(AstNode),
    Keyword(String, AstNode),
}

/// One `for target in iter if cond...` clause of a comprehension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comprehension {
    pub target: Target,
    pub iter: AstNode,
    pub conditions: Vec<AstNode>,
}

/// Binding target of a comprehension clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Target {
    /// Single name: `for x in ...`
    Name(String),
    /// Unpacking: `for index, item in ...`
    Tuple(Vec<Target>),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    FloorDivide,
    Modulo,
    Power,

    // Logical
    And,
    Or,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Negation (-)
    Negate,

    /// Identity (+)
    Plus,

    /// Logical NOT
    Not,
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    In,
    NotIn,
    Is,
    IsNot,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::FloorDivide => "//",
            BinaryOp::Modulo => "%",
            BinaryOp::Power => "**",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Equal => "==",
            CompareOp::NotEqual => "!=",
            CompareOp::LessThan => "<",
            CompareOp::LessThanOrEqual => "<=",
            CompareOp::GreaterThan => ">",
            CompareOp::GreaterThanOrEqual => ">=",
            CompareOp::In => "in",
            CompareOp::NotIn => "not in",
            CompareOp::Is => "is",
            CompareOp::IsNot => "is not",
        }
    }
}

impl AstNode {
    /// Create a string literal node
    pub fn string(s: impl Into<String>) -> Self {
        AstNode::String(s.into())
    }

    /// Create a name lookup node
    pub fn name(s: impl Into<String>) -> Self {
        AstNode::Name(s.into())
    }

    /// Create a call node with positional arguments only
    pub fn call(function: AstNode, args: Vec<AstNode>) -> Self {
        AstNode::Call {
            function: Box::new(function),
            args: args.into_iter().map(Argument::Positional).collect(),
        }
    }

    pub fn binary(op: BinaryOp, lhs: AstNode, rhs: AstNode) -> Self {
        AstNode::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
}

impl Target {
    /// Names bound by this target, in order
    pub fn names(&self) -> Vec<&str> {
        match self {
            Target::Name(name) => vec![name.as_str()],
            Target::Tuple(items) => items.iter().flat_map(|t| t.names()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ast_node_creation() {
        assert!(matches!(AstNode::string("hello"), AstNode::String(_)));
        assert!(matches!(AstNode::name("x"), AstNode::Name(_)));

        let call = AstNode::call(AstNode::name("f"), vec![AstNode::Integer(1)]);
        match call {
            AstNode::Call { args, .. } => {
                assert_eq!(args, vec![Argument::Positional(AstNode::Integer(1))])
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_binary_op() {
        let node = AstNode::binary(BinaryOp::FloorDivide, AstNode::Integer(7), AstNode::Integer(2));
        assert!(matches!(node, AstNode::Binary { op: BinaryOp::FloorDivide, .. }));
        assert_eq!(BinaryOp::FloorDivide.symbol(), "//");
        assert_eq!(CompareOp::NotIn.symbol(), "not in");
    }

    #[test]
    fn test_target_names() {
        let target = Target::Tuple(vec![
            Target::Name("index".to_string()),
            Target::Name("item".to_string()),
        ]);
        assert_eq!(target.names(), vec!["index", "item"]);
    }
}
