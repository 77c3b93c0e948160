//! # Averaged Perceptron para POS Tagging
//!
//! Classificador linear greedy: para cada token, soma os pesos das features
//! ativas por classe e escolhe a maior pontuação. A tag prevista alimenta as
//! features do próximo token (`i-1 tag`, `i-2 tag`).
//!
//! Os pesos já vêm **médios** do treino (Averaged Perceptron); aqui só há
//! inferência.
//!
//! ## Ordem de Decisão
//!
//! 1. Token nulo (`0`, `*T*-1`, `*`) → `-NONE-`.
//! 2. Token de forma fixa (`-LRB-`) → o próprio texto.
//! 3. Tag forçada pela tabela do modelo (palavras não ambíguas).
//! 4. Predição pelas features.
//!
//! ## Formato dos Arquivos
//!
//! - `classes.json`: `["CC", "CD", ...]` (ordem canônica, usada no desempate)
//! - `tags.json`: `{"the": "DT", ...}`
//! - `weights.json`: `{"i word dog": {"NN": 1.5, "VB": -0.2}, ...}`

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::features::{self, FeatureVector};
use crate::segmenter::compile;
use crate::tokenizer::Token;

/// Modelo de POS tagging carregado.
///
/// Os pesos ficam esparsos por feature (`feature → [(classe, peso)]`); uma
/// feature ausente contribui com zero.
#[derive(Debug, Clone)]
pub struct PerceptronModel {
    classes: Vec<String>,
    tag_map: HashMap<String, String>,
    weights: HashMap<String, Vec<(usize, f64)>>,
}

impl PerceptronModel {
    /// Monta o modelo a partir de tabelas em memória.
    ///
    /// Falha se `classes` for vazio, tiver duplicatas, ou se algum peso citar
    /// uma classe desconhecida.
    pub fn new(
        classes: Vec<String>,
        tag_map: HashMap<String, String>,
        weights: HashMap<String, HashMap<String, f64>>,
    ) -> Result<Self> {
        if classes.is_empty() {
            return Err(Error::InvalidModel("perceptron has no classes".into()));
        }
        let mut index = HashMap::with_capacity(classes.len());
        for (i, class) in classes.iter().enumerate() {
            if index.insert(class.as_str(), i).is_some() {
                return Err(Error::InvalidModel(format!("duplicate class `{class}`")));
            }
        }

        let mut dense = HashMap::with_capacity(weights.len());
        for (feature, per_label) in weights {
            let mut row = Vec::with_capacity(per_label.len());
            for (label, weight) in per_label {
                let id = *index.get(label.as_str()).ok_or_else(|| {
                    Error::InvalidModel(format!(
                        "weight for feature `{feature}` references unknown class `{label}`"
                    ))
                })?;
                row.push((id, weight));
            }
            row.sort_unstable_by_key(|(id, _)| *id);
            dense.insert(feature, row);
        }

        debug!(
            classes = classes.len(),
            features = dense.len(),
            forced = tag_map.len(),
            "perceptron model loaded"
        );
        Ok(Self {
            classes,
            tag_map,
            weights: dense,
        })
    }

    /// Lê as três tabelas JSON (`classes`, `tags`, `weights`).
    pub fn from_json_readers<C: Read, T: Read, W: Read>(
        classes: C,
        tags: T,
        weights: W,
    ) -> Result<Self> {
        Self::new(
            decode("classes", classes)?,
            decode("tags", tags)?,
            decode("weights", weights)?,
        )
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Tag forçada para a palavra exata, se houver.
    pub fn forced_tag(&self, word: &str) -> Option<&str> {
        self.tag_map.get(word).map(String::as_str)
    }

    /// Classe vencedora para o vetor de features.
    ///
    /// Vence a primeira classe (na ordem canônica) cuja pontuação é
    /// estritamente maior que 0.0 e que todas as anteriores. `None` quando
    /// nenhuma pontuação é positiva.
    pub fn predict(&self, fv: &FeatureVector) -> Option<&str> {
        let mut scores = vec![0.0f64; self.classes.len()];
        for (feature, value) in fv.iter() {
            if let Some(row) = self.weights.get(feature) {
                for &(id, weight) in row {
                    scores[id] += value * weight;
                }
            }
        }

        let mut best: Option<usize> = None;
        let mut max = 0.0;
        for (id, &score) in scores.iter().enumerate() {
            if score > max {
                max = score;
                best = Some(id);
            }
        }
        best.map(|id| self.classes[id].as_str())
    }
}

pub(crate) fn decode<T: DeserializeOwned, R: Read>(table: &'static str, reader: R) -> Result<T> {
    serde_json::from_reader(reader).map_err(|source| Error::ModelDecode { table, source })
}

/// Tagger de POS sobre um [`PerceptronModel`] compartilhado.
#[derive(Debug, Clone)]
pub struct PerceptronTagger {
    model: Arc<PerceptronModel>,
    none: Regex,
    keep: Regex,
}

impl PerceptronTagger {
    pub fn new(model: Arc<PerceptronModel>) -> Result<Self> {
        Ok(Self {
            model,
            none: compile(r"^(?:0|\*[\w?]\*|\*-\d{1,3}|\*[A-Z]+\*-\d{1,3}|\*)$")?,
            keep: compile(r"^-[A-Z]{3}-$")?,
        })
    }

    pub fn model(&self) -> &PerceptronModel {
        &self.model
    }

    /// Preenche `tag` de cada token da sequência.
    ///
    /// Tokens vazios são ignorados: não ocupam posição no contexto e ficam
    /// sem tag. Uma predição sem classe positiva vira a tag vazia.
    pub fn tag(&self, tokens: &mut [Token]) {
        let words: Vec<usize> = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.text.is_empty())
            .map(|(i, _)| i)
            .collect();
        if words.is_empty() {
            return;
        }
        let context = features::tagger_context(words.iter().map(|&i| tokens[i].text.as_str()));

        let mut p1 = features::START[0].to_string();
        let mut p2 = features::START[1].to_string();
        for (i, &pos) in words.iter().enumerate() {
            let word = tokens[pos].text.as_str();
            let tag = if self.none.is_match(word) {
                "-NONE-".to_string()
            } else if self.keep.is_match(word) {
                word.to_string()
            } else if let Some(forced) = self.model.forced_tag(word) {
                forced.to_string()
            } else {
                let fv = features::tagger_features(i, word, &context, &p1, &p2);
                self.model.predict(&fv).unwrap_or_default().to_string()
            };
            trace!(word, tag = tag.as_str(), "tagged");
            p2 = std::mem::replace(&mut p1, tag.clone());
            tokens[pos].tag = Some(tag);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights(rows: &[(&str, &[(&str, f64)])]) -> HashMap<String, HashMap<String, f64>> {
        rows.iter()
            .map(|(f, labels)| {
                (
                    f.to_string(),
                    labels.iter().map(|(l, w)| (l.to_string(), *w)).collect(),
                )
            })
            .collect()
    }

    fn tiny_model() -> PerceptronModel {
        let classes = ["DT", "NN", "VBZ"].iter().map(|s| s.to_string()).collect();
        let tag_map = [("the".to_string(), "DT".to_string())].into_iter().collect();
        let w = weights(&[
            ("i word dog", &[("NN", 2.0), ("VBZ", 0.5)]),
            ("i suffix uns", &[("VBZ", 1.5)]),
            ("i-1 tag NN", &[("VBZ", 1.0), ("NN", 0.2)]),
        ]);
        PerceptronModel::new(classes, tag_map, w).unwrap()
    }

    fn toks(words: &[&str]) -> Vec<Token> {
        words
            .iter()
            .enumerate()
            .map(|(i, w)| Token::new(*w, 0, 0, i))
            .collect()
    }

    #[test]
    fn test_tag_with_tiny_model() {
        let tagger = PerceptronTagger::new(Arc::new(tiny_model())).unwrap();
        let mut tokens = toks(&["the", "dog", "runs"]);
        tagger.tag(&mut tokens);
        let tags: Vec<_> = tokens.iter().map(|t| t.tag.as_deref().unwrap()).collect();
        assert_eq!(tags, ["DT", "NN", "VBZ"]);
    }

    #[test]
    fn test_none_and_keep_patterns() {
        let tagger = PerceptronTagger::new(Arc::new(tiny_model())).unwrap();
        let mut tokens = toks(&["*T*-1", "-LRB-", "0"]);
        tagger.tag(&mut tokens);
        assert_eq!(tokens[0].tag.as_deref(), Some("-NONE-"));
        assert_eq!(tokens[1].tag.as_deref(), Some("-LRB-"));
        assert_eq!(tokens[2].tag.as_deref(), Some("-NONE-"));
    }

    #[test]
    fn test_unknown_word_gets_empty_tag() {
        let tagger = PerceptronTagger::new(Arc::new(tiny_model())).unwrap();
        let mut tokens = toks(&["zzz", ""]);
        tagger.tag(&mut tokens);
        assert_eq!(tokens[0].tag.as_deref(), Some(""));
        assert_eq!(tokens[1].tag, None);
    }

    #[test]
    fn test_tie_break_prefers_first_class() {
        let classes = vec!["A".to_string(), "B".to_string()];
        let w = weights(&[("bias", &[("B", 1.0), ("A", 1.0)])]);
        let model = PerceptronModel::new(classes, HashMap::new(), w).unwrap();
        let mut fv = FeatureVector::new();
        fv.add(&["bias"]);
        for _ in 0..10 {
            assert_eq!(model.predict(&fv), Some("A"));
        }
    }

    #[test]
    fn test_invalid_models() {
        assert!(matches!(
            PerceptronModel::new(vec![], HashMap::new(), HashMap::new()),
            Err(Error::InvalidModel(_))
        ));
        let dup = vec!["A".to_string(), "A".to_string()];
        assert!(PerceptronModel::new(dup, HashMap::new(), HashMap::new()).is_err());
        let w = weights(&[("bias", &[("Z", 1.0)])]);
        assert!(PerceptronModel::new(vec!["A".into()], HashMap::new(), w).is_err());
    }

    #[test]
    fn test_from_json_readers() {
        let classes = br#"["NN","VB"]"#;
        let tags = br#"{"the":"DT"}"#;
        let weights = br#"{"bias":{"NN":0.5}}"#;
        let model =
            PerceptronModel::from_json_readers(&classes[..], &tags[..], &weights[..]).unwrap();
        assert_eq!(model.classes(), ["NN", "VB"]);
        assert_eq!(model.forced_tag("the"), Some("DT"));

        let err = PerceptronModel::from_json_readers(&b"{"[..], &tags[..], &weights[..]);
        assert!(matches!(err, Err(Error::ModelDecode { table: "classes", .. })));
    }
}
