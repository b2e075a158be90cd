use crate::{
    error::CompileErrorKind,
    expression::{Expression, Interpolated, VarDict, VarList},
    tag::Tag,
};

/// Which clause of an if-chain a [`Node::Condition`] came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Clause {
    If,
    Elif,
    Else,
}

impl Clause {
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::If => "if",
            Self::Elif => "elif",
            Self::Else => "else",
        }
    }
}

/// A node of a compiled template.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// The top of a template.
    Root { children: Vec<Node> },
    /// A line of text, with `{expr}` interpolation.
    Text { text: Interpolated },
    /// A template comment. Its text and children are never rendered.
    Comment { children: Vec<Node> },
    /// `<!-- ... -->`, either inline or wrapping its children.
    HtmlComment {
        text: Interpolated,
        children: Vec<Node>,
    },
    HtmlTag { tag: Tag, children: Vec<Node> },
    /// `= expr`
    Expression { expr: Expression },
    /// A chain of [`Node::Condition`]s; the first truthy one renders.
    If { children: Vec<Node> },
    Condition {
        clause: Clause,
        guard: Expression,
        children: Vec<Node>,
    },
    /// A loop. The first child is always the [`Node::Loop`] body, optionally
    /// followed by one [`Node::Empty`] and one `else` [`Node::Condition`].
    For {
        targets: VarList,
        container: Expression,
        children: Vec<Node>,
    },
    Loop { children: Vec<Node> },
    Empty { children: Vec<Node> },
    With {
        bindings: VarDict,
        only: bool,
        children: Vec<Node>,
    },
    /// Render another template. Child blocks override the included
    /// template's blocks of the same name.
    Include {
        path: Expression,
        bindings: VarDict,
        only: bool,
        children: Vec<Node>,
    },
    Block { name: String, children: Vec<Node> },
    Require { names: VarList },
    /// A doctype declaration followed by an `<html>` element.
    Html {
        doctype: Option<String>,
        tag: Tag,
        children: Vec<Node>,
    },
    Css {
        src: Option<Expression>,
        children: Vec<Node>,
    },
    Js {
        src: Option<Expression>,
        children: Vec<Node>,
    },
    Markdown {
        src: Option<Expression>,
        children: Vec<Node>,
    },
}

impl Node {
    pub const fn root() -> Self {
        Self::Root {
            children: Vec::new(),
        }
    }

    /// A blank line.
    pub fn blank() -> Self {
        Self::Text {
            text: Interpolated::default(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Root { .. } => "root",
            Self::Text { .. } => "text",
            Self::Comment { .. } => "comment",
            Self::HtmlComment { .. } => "html comment",
            Self::HtmlTag { .. } => "tag",
            Self::Expression { .. } => "expression",
            Self::If { .. } => "if",
            Self::Condition { clause, .. } => clause.keyword(),
            Self::For { .. } => "for",
            Self::Loop { .. } => "loop",
            Self::Empty { .. } => "empty",
            Self::With { .. } => "with",
            Self::Include { .. } => "include",
            Self::Block { .. } => "block",
            Self::Require { .. } => "require",
            Self::Html { .. } => "html",
            Self::Css { .. } => "css",
            Self::Js { .. } => "js",
            Self::Markdown { .. } => "md",
        }
    }

    pub fn children(&self) -> &[Self] {
        match self {
            Self::Root { children }
            | Self::Comment { children }
            | Self::HtmlComment { children, .. }
            | Self::HtmlTag { children, .. }
            | Self::If { children }
            | Self::Condition { children, .. }
            | Self::For { children, .. }
            | Self::Loop { children }
            | Self::Empty { children }
            | Self::With { children, .. }
            | Self::Include { children, .. }
            | Self::Block { children, .. }
            | Self::Html { children, .. }
            | Self::Css { children, .. }
            | Self::Js { children, .. }
            | Self::Markdown { children, .. } => children,
            Self::Text { .. } | Self::Expression { .. } | Self::Require { .. } => &[],
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<Self>> {
        match self {
            Self::Root { children }
            | Self::Comment { children }
            | Self::HtmlComment { children, .. }
            | Self::HtmlTag { children, .. }
            | Self::If { children }
            | Self::Condition { children, .. }
            | Self::For { children, .. }
            | Self::Loop { children }
            | Self::Empty { children }
            | Self::With { children, .. }
            | Self::Include { children, .. }
            | Self::Block { children, .. }
            | Self::Html { children, .. }
            | Self::Css { children, .. }
            | Self::Js { children, .. }
            | Self::Markdown { children, .. } => Some(children),
            Self::Text { .. } | Self::Expression { .. } | Self::Require { .. } => None,
        }
    }

    /// Whether any child could ever be appended to this node.
    pub fn accepts_children(&self) -> bool {
        match self {
            Self::Text { .. } | Self::Expression { .. } | Self::Require { .. } => false,
            Self::HtmlTag { tag, .. } => !tag.is_void(),
            Self::HtmlComment { text, .. } => text.is_empty(),
            Self::Css { src, .. } | Self::Js { src, .. } | Self::Markdown { src, .. } => {
                src.is_none()
            }
            Self::Root { .. }
            | Self::Comment { .. }
            | Self::If { .. }
            | Self::Condition { .. }
            | Self::For { .. }
            | Self::Loop { .. }
            | Self::Empty { .. }
            | Self::With { .. }
            | Self::Include { .. }
            | Self::Block { .. }
            | Self::Html { .. } => true,
        }
    }

    /// The keyword of a clause continuing an earlier `if` or `for`.
    pub(crate) const fn continuation(&self) -> Option<&'static str> {
        match self {
            Self::Condition {
                clause: Clause::Elif,
                ..
            } => Some("elif"),
            Self::Condition {
                clause: Clause::Else,
                ..
            } => Some("else"),
            Self::Empty { .. } => Some("empty"),
            _ => None,
        }
    }

    pub(crate) fn is_blank_text(&self) -> bool {
        matches!(self, Self::Text { text } if text.is_empty())
    }

    /// Attach `child`, enforcing the shape of if-chains, loops and includes.
    pub fn append(&mut self, child: Self) -> Result<(), CompileErrorKind> {
        if !self.accepts_children() {
            return Err(CompileErrorKind::CannotTakeChildren {
                node: self.kind_name(),
            });
        }
        let misplaced = |child: &Self| CompileErrorKind::MisplacedClause {
            clause: child.kind_name().to_string(),
        };

        match self {
            Self::If { children } => {
                let after_else = children.last().is_some_and(|last| {
                    matches!(
                        last,
                        Self::Condition {
                            clause: Clause::Else,
                            ..
                        }
                    )
                });
                let allowed = match &child {
                    Self::Condition {
                        clause: Clause::If, ..
                    } => children.is_empty(),
                    Self::Condition { .. } => !children.is_empty() && !after_else,
                    _ => false,
                };
                if !allowed {
                    return Err(misplaced(&child));
                }
                children.push(child);
            }
            Self::For { children, .. } => {
                let has_else = children.iter().any(|c| matches!(c, Self::Condition { .. }));
                let has_empty = children.iter().any(|c| matches!(c, Self::Empty { .. }));
                let allowed = match &child {
                    Self::Loop { .. } => children.is_empty(),
                    Self::Empty { .. } => !children.is_empty() && !has_empty && !has_else,
                    Self::Condition {
                        clause: Clause::Else,
                        ..
                    } => !children.is_empty() && !has_else,
                    _ => false,
                };
                if !allowed {
                    return Err(misplaced(&child));
                }
                children.push(child);
            }
            Self::Include { children, .. } => {
                if !matches!(child, Self::Block { .. }) && !child.is_blank_text() {
                    return Err(misplaced(&child));
                }
                children.push(child);
            }
            other => {
                if let Some(children) = other.children_mut() {
                    children.push(child);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn condition(clause: Clause) -> Node {
        Node::Condition {
            clause,
            guard: Expression::Boolean(true),
            children: Vec::new(),
        }
    }

    fn for_node() -> Node {
        Node::For {
            targets: VarList(vec!["x".to_string()]),
            container: Expression::Identifier("xs".to_string()),
            children: Vec::new(),
        }
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_leaves_reject_children() {
        let mut text = Node::Text {
            text: Interpolated::literal("hi"),
        };
        assert_eq!(
            text.append(Node::blank()),
            Err(CompileErrorKind::CannotTakeChildren { node: "text" })
        );

        let mut br = Node::HtmlTag {
            tag: Tag::named("br"),
            children: Vec::new(),
        };
        assert!(!br.accepts_children());
        assert!(br.append(Node::blank()).is_err());
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_if_chain_shape() {
        let mut chain = Node::If {
            children: Vec::new(),
        };
        assert!(chain.append(condition(Clause::Elif)).is_err());
        chain.append(condition(Clause::If)).unwrap();
        chain.append(condition(Clause::Elif)).unwrap();
        chain.append(condition(Clause::Else)).unwrap();
        assert_eq!(
            chain.append(condition(Clause::Elif)),
            Err(CompileErrorKind::MisplacedClause {
                clause: "elif".to_string()
            })
        );
        assert!(chain.append(Node::blank()).is_err());
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_for_shape() {
        let mut node = for_node();
        assert!(node.append(Node::Empty { children: vec![] }).is_err());
        node.append(Node::Loop { children: vec![] }).unwrap();
        node.append(Node::Empty { children: vec![] }).unwrap();
        assert!(node.append(Node::Empty { children: vec![] }).is_err());
        node.append(condition(Clause::Else)).unwrap();
        assert!(node.append(condition(Clause::Else)).is_err());
        assert!(node.append(condition(Clause::Elif)).is_err());
        assert_eq!(node.children().len(), 3);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_sourced_resources_reject_children() {
        let mut css = Node::Css {
            src: Some(Expression::Identifier("theme".to_string())),
            children: Vec::new(),
        };
        assert!(css.append(Node::blank()).is_err());
        let mut inline = Node::Css {
            src: None,
            children: Vec::new(),
        };
        assert!(inline.append(Node::blank()).is_ok());
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_include_takes_only_blocks() {
        let mut include = Node::Include {
            path: Expression::Identifier("base".to_string()),
            bindings: VarDict::default(),
            only: false,
            children: Vec::new(),
        };
        include
            .append(Node::Block {
                name: "content".to_string(),
                children: Vec::new(),
            })
            .unwrap();
        include.append(Node::blank()).unwrap();
        assert!(include
            .append(Node::Text {
                text: Interpolated::literal("stray")
            })
            .is_err());
    }
}
