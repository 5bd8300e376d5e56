// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Script building blocks. A solver script is a sequence of labeled blocks
//! of declarations and assertions; labels become comments, so a failing
//! obligation can be diagnosed from the script text alone.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofElement {
    /// A raw solver option line, e.g. `set-option :produce-models true`.
    Option(String),
    DefineSort {
        name: String,
        definition: String,
    },
    DeclareSort(String),
    DeclareConst {
        name: String,
        sort: String,
    },
    DeclareFun {
        name: String,
        args: Vec<String>,
        result: String,
    },
    /// A rendered formula asserted as-is.
    Assertion(String),
    /// Pre-rendered text, for datatype and function-definition groups whose
    /// shape does not decompose into single declarations.
    Raw(String),
    Block(Block),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
    pub label: String,
    pub end_label: Option<String>,
    pub elements: Vec<ProofElement>,
}

impl Block {
    pub fn new(label: impl Into<String>) -> Block {
        Block {
            label: label.into(),
            end_label: None,
            elements: Vec::new(),
        }
    }

    pub fn delimited(label: impl Into<String>, end_label: impl Into<String>) -> Block {
        Block {
            label: label.into(),
            end_label: Some(end_label.into()),
            elements: Vec::new(),
        }
    }

    pub fn push(&mut self, element: ProofElement) {
        self.elements.push(element);
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn render(&self, out: &mut String) {
        out.push_str("; ");
        out.push_str(&self.label);
        out.push('\n');
        for element in &self.elements {
            element.render(out);
        }
        if let Some(end) = &self.end_label {
            out.push_str("; ");
            out.push_str(end);
            out.push('\n');
        }
    }
}

impl ProofElement {
    pub fn render(&self, out: &mut String) {
        match self {
            ProofElement::Option(line) => {
                out.push('(');
                out.push_str(line);
                out.push_str(")\n");
            }
            ProofElement::DefineSort { name, definition } => {
                out.push_str(&format!("(define-sort {name} () {definition})\n"));
            }
            ProofElement::DeclareSort(name) => {
                out.push_str(&format!("(declare-sort {name} 0)\n"));
            }
            ProofElement::DeclareConst { name, sort } => {
                out.push_str(&format!("(declare-const {name} {sort})\n"));
            }
            ProofElement::DeclareFun { name, args, result } => {
                out.push_str(&format!(
                    "(declare-fun {name} ({}) {result})\n",
                    args.join(" ")
                ));
            }
            ProofElement::Assertion(formula) => {
                out.push_str(&format!("(assert {formula})\n"));
            }
            ProofElement::Raw(text) => {
                out.push_str(text);
                if !text.ends_with('\n') {
                    out.push('\n');
                }
            }
            ProofElement::Block(block) => block.render(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_render_labels_as_comments() {
        let mut block = Block::delimited("HEADER", "END HEADER");
        block.push(ProofElement::Option("set-logic ALL".into()));
        block.push(ProofElement::DeclareConst {
            name: "Unit".into(),
            sort: "Int".into(),
        });
        let mut out = String::new();
        block.render(&mut out);
        assert_eq!(
            out,
            "; HEADER\n(set-logic ALL)\n(declare-const Unit Int)\n; END HEADER\n"
        );
    }

    #[test]
    fn declare_fun_renders_argument_sorts() {
        let mut out = String::new();
        ProofElement::DeclareFun {
            name: "implements".into(),
            args: vec!["ABS.StdLib.Int".into(), "Interface".into()],
            result: "Bool".into(),
        }
        .render(&mut out);
        assert_eq!(
            out,
            "(declare-fun implements (ABS.StdLib.Int Interface) Bool)\n"
        );
    }
}
