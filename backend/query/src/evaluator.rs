use ocrgrep_core::Document;

use crate::ast::{BinaryOp, QueryNode, UnaryOp};

/// Does `document` satisfy `node`?
///
/// Both operands of a binary node are always evaluated; there is no
/// short-circuiting.
pub fn evaluate(document: &Document, node: &QueryNode) -> bool {
    match node {
        QueryNode::Literal { value } => has_word(document, value),
        QueryNode::Identifier { name } => has_word(document, name),
        QueryNode::Unary {
            operator: UnaryOp::Not,
            argument,
        } => !evaluate(document, argument),
        QueryNode::Binary {
            operator,
            left,
            right,
        } => {
            let left = evaluate(document, left);
            let right = evaluate(document, right);
            match operator {
                BinaryOp::And => left && right,
                BinaryOp::Or => left || right,
            }
        }
    }
}

fn has_word(document: &Document, word: &str) -> bool {
    if word.chars().any(char::is_uppercase) {
        document.contains(&word.to_lowercase())
    } else {
        document.contains(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(words: &[&str]) -> Document {
        Document::new("doc.png", "/images/doc.png", words.iter().copied())
    }

    #[test]
    fn leaf_variants_match_identically() {
        let d = doc(&["salt"]);
        assert!(evaluate(&d, &QueryNode::identifier("salt")));
        assert!(evaluate(&d, &QueryNode::literal("salt")));
        assert!(!evaluate(&d, &QueryNode::identifier("pepper")));
        assert!(!evaluate(&d, &QueryNode::literal("pepper")));
    }

    #[test]
    fn hand_built_nodes_are_case_folded() {
        let d = doc(&["water"]);
        let node = QueryNode::Identifier {
            name: "WATER".to_string(),
        };
        assert!(evaluate(&d, &node));
    }

    #[test]
    fn operators() {
        let d = doc(&["salt", "dough", "bake"]);
        let salt = QueryNode::identifier("salt");
        let water = QueryNode::identifier("water");

        assert!(evaluate(&d, &QueryNode::and(salt.clone(), QueryNode::identifier("dough"))));
        assert!(!evaluate(&d, &QueryNode::and(salt.clone(), water.clone())));
        assert!(evaluate(&d, &QueryNode::or(water.clone(), salt.clone())));
        assert!(!evaluate(&d, &QueryNode::not(salt)));
        assert!(evaluate(&d, &QueryNode::not(water)));
    }
}
