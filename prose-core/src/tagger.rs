//! # Esquema IOB e Agrupamento de Entidades
//!
//! O extrator rotula cada token no esquema **IOB**; este módulo reconstrói as
//! entidades (spans de vários tokens) a partir desses rótulos.
//!
//! ## Esquema IOB
//!
//! - `B-TIPO`: Begin, primeiro token de uma entidade
//! - `I-TIPO`: Inside, tokens seguintes da mesma entidade
//! - `O`: Outside, fora de qualquer entidade
//!
//! Os tipos vêm do modelo carregado (`GPE`, `PERSON`, `ORG`, `PRODUCT`, ...),
//! por isso são strings e não um enum fechado.
//!
//! ## Exemplo
//!
//! ```rust
//! use prose_core::tagger::{chunk, IobLabel};
//! use prose_core::tokenizer::Token;
//!
//! let text = "is Windows 10 great";
//! let mut tokens = vec![
//!     Token::new("is", 0, 2, 0),
//!     Token::new("Windows", 3, 10, 1),
//!     Token::new("10", 11, 13, 2),
//!     Token::new("great", 14, 19, 3),
//! ];
//! for (tok, label) in tokens.iter_mut().zip(["O", "B-PRODUCT", "I-PRODUCT", "O"]) {
//!     tok.label = Some(label.to_string());
//! }
//! let entities = chunk(&tokens, text);
//! assert_eq!(entities.len(), 1);
//! assert_eq!(entities[0].text, "Windows 10");
//! assert_eq!(entities[0].label, "PRODUCT");
//! assert_eq!(IobLabel::from_label("B-GPE"), Some(IobLabel::Begin("GPE".into())));
//! ```

use serde::{Deserialize, Serialize};

use crate::tokenizer::Token;

/// Rótulo IOB de um token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IobLabel {
    /// Início de entidade. Ex: **New** (B-GPE) York.
    Begin(String),
    /// Continuação da entidade. Ex: New **York** (I-GPE).
    Inside(String),
    /// Fora de entidade.
    Outside,
}

impl IobLabel {
    /// Parseia `"B-GPE"`, `"I-GPE"` ou `"O"`. Qualquer outra forma → `None`.
    pub fn from_label(s: &str) -> Option<Self> {
        if s == "O" {
            return Some(IobLabel::Outside);
        }
        let (prefix, kind) = s.split_once('-')?;
        if kind.is_empty() {
            return None;
        }
        match prefix {
            "B" => Some(IobLabel::Begin(kind.to_string())),
            "I" => Some(IobLabel::Inside(kind.to_string())),
            _ => None,
        }
    }

    /// Tipo da entidade (`None` para `O`).
    pub fn entity_type(&self) -> Option<&str> {
        match self {
            IobLabel::Begin(kind) | IobLabel::Inside(kind) => Some(kind),
            IobLabel::Outside => None,
        }
    }

    /// `I-X` só pode seguir `B-X` ou `I-X`; `B-X` e `O` seguem qualquer rótulo.
    pub fn is_valid_transition(prev: &IobLabel, next: &IobLabel) -> bool {
        match next {
            IobLabel::Inside(kind) => match prev {
                IobLabel::Begin(prev_kind) | IobLabel::Inside(prev_kind) => prev_kind == kind,
                IobLabel::Outside => false,
            },
            _ => true,
        }
    }
}

/// Uma entidade nomeada encontrada no documento.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Texto da entidade, fatiado do documento (ex: "New York").
    pub text: String,
    /// Tipo da entidade (ex: "GPE").
    pub label: String,
    /// Byte inicial no documento.
    pub start: usize,
    /// Byte final no documento (exclusivo).
    pub end: usize,
    /// Índice do primeiro token.
    pub start_token: usize,
    /// Índice do último token (inclusivo).
    pub end_token: usize,
}

/// Converte rótulos IOB em entidades.
///
/// - `B-X` abre uma entidade (fechando a anterior, se houver).
/// - `I-X` com o mesmo `X` estende a entidade aberta.
/// - Qualquer outro rótulo (ou ausência de rótulo) fecha a entidade aberta.
///
/// Um `I-X` sem `B-X` antes não abre entidade.
pub fn chunk(tokens: &[Token], document: &str) -> Vec<Entity> {
    let mut entities = Vec::new();
    // rótulo do último token da entidade aberta, primeiro e último token
    let mut open: Option<(IobLabel, &Token, &Token)> = None;

    for token in tokens {
        let label = token
            .label
            .as_deref()
            .and_then(IobLabel::from_label)
            .unwrap_or(IobLabel::Outside);
        match label {
            IobLabel::Inside(_)
                if open
                    .as_ref()
                    .is_some_and(|(prev, _, _)| IobLabel::is_valid_transition(prev, &label)) =>
            {
                if let Some((prev, _, last)) = open.as_mut() {
                    *prev = label;
                    *last = token;
                }
            }
            IobLabel::Begin(_) => {
                close(&mut open, &mut entities, document);
                open = Some((label, token, token));
            }
            _ => close(&mut open, &mut entities, document),
        }
    }
    close(&mut open, &mut entities, document);
    entities
}

fn close<'t>(
    open: &mut Option<(IobLabel, &'t Token, &'t Token)>,
    entities: &mut Vec<Entity>,
    document: &str,
) {
    let Some((label, first, last)) = open.take() else {
        return;
    };
    if let Some(kind) = label.entity_type() {
        entities.push(Entity {
            text: document.get(first.start..last.end).unwrap_or_default().to_string(),
            label: kind.to_string(),
            start: first.start,
            end: last.end,
            start_token: first.index,
            end_token: last.index,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labelled(text: &str, labels: &[&str]) -> Vec<Token> {
        let mut tokens: Vec<Token> = Vec::new();
        let mut offset = 0;
        for (i, word) in text.split(' ').enumerate() {
            let mut tok = Token::new(word, offset, offset + word.len(), i);
            tok.label = Some(labels[i].to_string());
            tokens.push(tok);
            offset += word.len() + 1;
        }
        tokens
    }

    #[test]
    fn test_label_roundtrip_and_parse() {
        assert_eq!(IobLabel::from_label("O"), Some(IobLabel::Outside));
        assert_eq!(IobLabel::from_label("I-ORG"), Some(IobLabel::Inside("ORG".into())));
        assert_eq!(IobLabel::from_label("B-"), None);
        assert_eq!(IobLabel::from_label("X-ORG"), None);
        assert_eq!(IobLabel::from_label(""), None);
        assert_eq!(IobLabel::from_label("B-NORP").unwrap().entity_type(), Some("NORP"));
    }

    #[test]
    fn test_valid_transitions() {
        let b = IobLabel::Begin("PERSON".into());
        let i = IobLabel::Inside("PERSON".into());
        let other = IobLabel::Inside("GPE".into());
        assert!(IobLabel::is_valid_transition(&b, &i));
        assert!(IobLabel::is_valid_transition(&i, &i));
        assert!(!IobLabel::is_valid_transition(&IobLabel::Outside, &i));
        assert!(!IobLabel::is_valid_transition(&b, &other));
        assert!(IobLabel::is_valid_transition(&other, &b));
    }

    #[test]
    fn test_product_entity() {
        let text = "is Windows 10 great";
        let tokens = labelled(text, &["O", "B-PRODUCT", "I-PRODUCT", "O"]);
        let entities = chunk(&tokens, text);
        assert_eq!(
            entities,
            vec![Entity {
                text: "Windows 10".into(),
                label: "PRODUCT".into(),
                start: 3,
                end: 13,
                start_token: 1,
                end_token: 2,
            }]
        );
    }

    #[test]
    fn test_adjacent_and_trailing_entities() {
        let text = "Paris London New York";
        let tokens = labelled(text, &["B-GPE", "B-GPE", "B-GPE", "I-GPE"]);
        let entities = chunk(&tokens, text);
        let texts: Vec<_> = entities.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, ["Paris", "London", "New York"]);
    }

    #[test]
    fn test_mismatched_inside_closes() {
        let text = "Bank of America sued";
        let tokens = labelled(text, &["B-ORG", "I-GPE", "I-ORG", "O"]);
        let entities = chunk(&tokens, text);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].text, "Bank");
    }

    #[test]
    fn test_chunks_are_well_formed() {
        let text = "a b c d e f";
        let tokens = labelled(text, &["I-X", "B-X", "I-X", "O", "B-Y", "I-Y"]);
        let entities = chunk(&tokens, text);
        assert_eq!(entities.len(), 2);
        for entity in &entities {
            assert!(entity.start_token <= entity.end_token);
            assert_eq!(&text[entity.start..entity.end], entity.text);
        }
    }
}
