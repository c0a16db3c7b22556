//! The abstract syntax tree consumed by the checker.
//!
//! Trees are produced by an external parser front-end (or decoded from JSON
//! with serde). Every node carries a byte-offset `Span` into the original
//! program text; spans default to `0..0` when the producer has none.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// A byte range in the original program text.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Span { start, end }
    }

    /// True when the producer did not supply a position.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }
}

/// Declaration visibility. Carried through the tree; has no typing effect.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// A single node of the tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    #[serde(default)]
    pub span: Span,
}

/// A named entry of a record literal or argument list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: Node,
}

impl Field {
    pub fn new(name: impl Into<String>, value: Node) -> Self {
        Field {
            name: name.into(),
            value,
        }
    }
}

/// A sequence of forms. The type of a block is the type of its last form.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub forms: Vec<Node>,
}

/// `name: Type = value`, either half optional.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlotDecl {
    pub name: String,
    #[serde(default)]
    pub ty: Option<TypeNode>,
    #[serde(default)]
    pub value: Option<Box<Node>>,
    #[serde(default)]
    pub visibility: Visibility,
}

impl SlotDecl {
    pub fn new(name: impl Into<String>, ty: Option<TypeNode>, value: Option<Node>) -> Self {
        SlotDecl {
            name: name.into(),
            ty,
            value: value.map(Box::new),
            visibility: Visibility::Public,
        }
    }

    pub fn typed(name: impl Into<String>, ty: TypeNode) -> Self {
        SlotDecl::new(name, Some(ty), None)
    }

    pub fn valued(name: impl Into<String>, value: Node) -> Self {
        SlotDecl::new(name, None, Some(value))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    pub body: Block,
    #[serde(default)]
    pub visibility: Visibility,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunDecl {
    pub name: String,
    #[serde(default)]
    pub args: Vec<SlotDecl>,
    #[serde(default)]
    pub ret: Option<TypeNode>,
    pub body: Box<Node>,
    #[serde(default)]
    pub visibility: Visibility,
}

/// Every node kind the checker understands.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node")]
pub enum NodeKind {
    Block(Block),
    SlotDecl(SlotDecl),
    ClassDecl(ClassDecl),
    FunDecl(FunDecl),
    FunCall {
        fun: Box<Node>,
        #[serde(default)]
        args: Vec<Field>,
    },
    Symbol {
        name: String,
    },
    /// Field selection on a non-null object; `args` present means an
    /// explicit call with named arguments.
    Select {
        receiver: Box<Node>,
        field: String,
        #[serde(default)]
        args: Option<Vec<Field>>,
    },
    Record {
        fields: Vec<Field>,
    },
    List {
        elements: Vec<Node>,
    },
    /// `self(overrides...)`: a copy of the enclosing object with some slots replaced.
    SelfObject {
        #[serde(default)]
        overrides: Vec<Field>,
    },
    /// `left ? right`
    Default {
        left: Box<Node>,
        right: Box<Node>,
    },
    String {
        value: String,
    },
    Boolean {
        value: bool,
    },
    Int {
        value: i64,
    },
    Null,
    Lambda {
        param: String,
        body: Box<Node>,
    },
    Apply {
        fun: Box<Node>,
        param: String,
        arg: Box<Node>,
    },
    Let {
        name: String,
        def: Box<Node>,
        body: Box<Node>,
    },
    LetRec {
        name: String,
        def: Box<Node>,
        body: Box<Node>,
    },
}

/// A type annotation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TypeNode {
    Named { name: String },
    List { elem: Box<TypeNode> },
    NonNull { inner: Box<TypeNode> },
    Fun { args: Vec<SlotDecl>, ret: Box<TypeNode> },
    Variable { name: String },
}

impl TypeNode {
    pub fn named(name: impl Into<String>) -> Self {
        TypeNode::Named { name: name.into() }
    }

    pub fn list(elem: TypeNode) -> Self {
        TypeNode::List {
            elem: Box::new(elem),
        }
    }

    pub fn non_null(inner: TypeNode) -> Self {
        TypeNode::NonNull {
            inner: Box::new(inner),
        }
    }

    /// Shorthand for `Name!`.
    pub fn required(name: impl Into<String>) -> Self {
        TypeNode::non_null(TypeNode::named(name))
    }

    pub fn fun(args: Vec<SlotDecl>, ret: TypeNode) -> Self {
        TypeNode::Fun {
            args,
            ret: Box::new(ret),
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        TypeNode::Variable { name: name.into() }
    }
}

// ── Builders ───────────────────────────────────────────────────────────

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Node {
            kind,
            span: Span::default(),
        }
    }

    /// Attach a source position.
    pub fn at(mut self, start: u32, end: u32) -> Self {
        self.span = Span::new(start, end);
        self
    }

    pub fn block(forms: Vec<Node>) -> Self {
        Node::new(NodeKind::Block(Block { forms }))
    }

    pub fn slot(slot: SlotDecl) -> Self {
        Node::new(NodeKind::SlotDecl(slot))
    }

    pub fn class(name: impl Into<String>, forms: Vec<Node>) -> Self {
        Node::new(NodeKind::ClassDecl(ClassDecl {
            name: name.into(),
            body: Block { forms },
            visibility: Visibility::Public,
        }))
    }

    pub fn fun_decl(
        name: impl Into<String>,
        args: Vec<SlotDecl>,
        ret: Option<TypeNode>,
        body: Node,
    ) -> Self {
        Node::new(NodeKind::FunDecl(FunDecl {
            name: name.into(),
            args,
            ret,
            body: Box::new(body),
            visibility: Visibility::Public,
        }))
    }

    pub fn call(fun: Node, args: Vec<Field>) -> Self {
        Node::new(NodeKind::FunCall {
            fun: Box::new(fun),
            args,
        })
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Node::new(NodeKind::Symbol { name: name.into() })
    }

    pub fn select(receiver: Node, field: impl Into<String>) -> Self {
        Node::new(NodeKind::Select {
            receiver: Box::new(receiver),
            field: field.into(),
            args: None,
        })
    }

    pub fn resolve(receiver: Node, field: impl Into<String>, args: Vec<Field>) -> Self {
        Node::new(NodeKind::Select {
            receiver: Box::new(receiver),
            field: field.into(),
            args: Some(args),
        })
    }

    pub fn record(fields: Vec<Field>) -> Self {
        Node::new(NodeKind::Record { fields })
    }

    pub fn list(elements: Vec<Node>) -> Self {
        Node::new(NodeKind::List { elements })
    }

    pub fn self_object(overrides: Vec<Field>) -> Self {
        Node::new(NodeKind::SelfObject { overrides })
    }

    pub fn default_op(left: Node, right: Node) -> Self {
        Node::new(NodeKind::Default {
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn string(value: impl Into<String>) -> Self {
        Node::new(NodeKind::String {
            value: value.into(),
        })
    }

    pub fn boolean(value: bool) -> Self {
        Node::new(NodeKind::Boolean { value })
    }

    pub fn int(value: i64) -> Self {
        Node::new(NodeKind::Int { value })
    }

    pub fn null() -> Self {
        Node::new(NodeKind::Null)
    }

    pub fn lambda(param: impl Into<String>, body: Node) -> Self {
        Node::new(NodeKind::Lambda {
            param: param.into(),
            body: Box::new(body),
        })
    }

    pub fn apply(fun: Node, param: impl Into<String>, arg: Node) -> Self {
        Node::new(NodeKind::Apply {
            fun: Box::new(fun),
            param: param.into(),
            arg: Box::new(arg),
        })
    }

    pub fn let_in(name: impl Into<String>, def: Node, body: Node) -> Self {
        Node::new(NodeKind::Let {
            name: name.into(),
            def: Box::new(def),
            body: Box::new(body),
        })
    }

    pub fn let_rec(name: impl Into<String>, def: Node, body: Node) -> Self {
        Node::new(NodeKind::LetRec {
            name: name.into(),
            def: Box::new(def),
            body: Box::new(body),
        })
    }
}
