//! # Maximum Entropy para Rótulos de Entidade
//!
//! Classificador log-linear (MaxEnt) que atribui a cada token um rótulo IOB
//! (`B-GPE`, `I-PERSON`, `O`). A decisão é greedy, da esquerda para a direita:
//! o rótulo previsto para o token anterior entra como feature (`prevtag`).
//!
//! ## Codificação
//!
//! Cada par `(nome, valor)` de
//! [`entity_features`](crate::features::entity_features) vira, para cada
//! rótulo, a chave `"{nome}-{valor}-{rótulo}"`. As chaves presentes no
//! `mapping` apontam para um peso no vetor `weights`; as demais são ignoradas.
//!
//! $$ \log_2 P(y|x) = \sum_i w_i f_i(x,y) - \log_2 Z(x) $$
//!
//! ## Formato dos Arquivos
//!
//! - `mapping.json`: `{"word-Paris-B-GPE": 17, ...}`
//! - `weights.json`: `[0.12, -1.3, ...]`
//! - `labels.json`: `["O", "B-GPE", ...]`

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::features;
use crate::perceptron::decode;
use crate::tokenizer::Token;
use crate::wordlist;

/// Diferença máxima em log2 abaixo da qual o termo menor é descartado.
fn max_log_diff() -> f64 {
    1e-30f64.log2()
}

/// Soma de duas probabilidades em espaço log2.
pub fn add_logs(x: f64, y: f64) -> f64 {
    if x == f64::NEG_INFINITY {
        return y;
    }
    if y == f64::NEG_INFINITY {
        return x;
    }
    let diff = max_log_diff();
    if x < y + diff {
        y
    } else if y < x + diff {
        x
    } else {
        let base = x.min(y);
        base + ((x - base).exp2() + (y - base).exp2()).log2()
    }
}

/// Soma de várias probabilidades em espaço log2. Vazio → `-inf`.
pub fn sum_logs(logs: &[f64]) -> f64 {
    match logs.split_first() {
        Some((first, rest)) => rest.iter().fold(*first, |acc, &l| add_logs(acc, l)),
        None => f64::NEG_INFINITY,
    }
}

/// Distribuição de probabilidade sobre os rótulos, em log2.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbDist {
    logs: Vec<(String, f64)>,
}

impl ProbDist {
    /// Normaliza pontuações em log2. Se a soma for `-inf`, a distribuição é uniforme.
    pub fn from_scores(scores: Vec<(String, f64)>) -> Self {
        let values: Vec<f64> = scores.iter().map(|(_, s)| *s).collect();
        let total = sum_logs(&values);
        let logs = if total == f64::NEG_INFINITY {
            let uniform = (1.0 / scores.len().max(1) as f64).log2();
            scores.into_iter().map(|(l, _)| (l, uniform)).collect()
        } else {
            scores.into_iter().map(|(l, s)| (l, s - total)).collect()
        };
        Self { logs }
    }

    /// Probabilidade (não log) do rótulo; 0.0 se desconhecido.
    pub fn prob(&self, label: &str) -> f64 {
        self.logs
            .iter()
            .find(|(l, _)| l == label)
            .map_or(0.0, |(_, p)| p.exp2())
    }

    /// Rótulo mais provável; em empate vence o primeiro.
    pub fn max(&self) -> Option<&str> {
        let mut best: Option<(&str, f64)> = None;
        for (label, p) in &self.logs {
            match best {
                Some((_, bp)) if *p <= bp => {}
                _ => best = Some((label.as_str(), *p)),
            }
        }
        best.map(|(l, _)| l)
    }
}

/// Modelo MaxEnt carregado.
#[derive(Debug, Clone)]
pub struct MaxEntModel {
    mapping: HashMap<String, usize>,
    weights: Vec<f64>,
    labels: Vec<String>,
}

impl MaxEntModel {
    /// Falha se `labels` for vazio ou se algum índice do `mapping` não
    /// existir em `weights`.
    pub fn new(mapping: HashMap<String, usize>, weights: Vec<f64>, labels: Vec<String>) -> Result<Self> {
        if labels.is_empty() {
            return Err(Error::InvalidModel("maxent model has no labels".into()));
        }
        if let Some((key, idx)) = mapping.iter().find(|(_, idx)| **idx >= weights.len()) {
            return Err(Error::InvalidModel(format!(
                "mapping `{key}` points to weight {idx}, but only {} weights exist",
                weights.len()
            )));
        }
        debug!(
            labels = labels.len(),
            features = mapping.len(),
            "maxent model loaded"
        );
        Ok(Self {
            mapping,
            weights,
            labels,
        })
    }

    /// Lê as três tabelas JSON (`mapping`, `weights`, `labels`).
    pub fn from_json_readers<M: Read, W: Read, L: Read>(mapping: M, weights: W, labels: L) -> Result<Self> {
        Self::new(
            decode("mapping", mapping)?,
            decode("weights", weights)?,
            decode("labels", labels)?,
        )
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Distribuição sobre os rótulos para um conjunto de features.
    pub fn classify(&self, feats: &[(&str, String)]) -> ProbDist {
        let scores = self
            .labels
            .iter()
            .map(|label| {
                let total: f64 = feats
                    .iter()
                    .filter_map(|(name, value)| {
                        self.mapping.get(&format!("{name}-{value}-{label}"))
                    })
                    .map(|&idx| self.weights[idx])
                    .sum();
                (label.clone(), total)
            })
            .collect();
        ProbDist::from_scores(scores)
    }
}

/// Rotulador IOB sobre um [`MaxEntModel`] compartilhado.
#[derive(Debug, Clone)]
pub struct EntityExtractor {
    model: Arc<MaxEntModel>,
    basic: HashSet<&'static str>,
}

impl EntityExtractor {
    pub fn new(model: Arc<MaxEntModel>) -> Self {
        Self {
            model,
            basic: wordlist::basic_words(),
        }
    }

    pub fn model(&self) -> &MaxEntModel {
        &self.model
    }

    /// Preenche `label` de cada token. Espera tokens já tagueados.
    pub fn label(&self, tokens: &mut [Token]) {
        let mut history: Vec<String> = Vec::with_capacity(tokens.len());
        for i in 0..tokens.len() {
            let feats = features::entity_features(tokens, i, &history, &self.basic);
            let label = self.model.classify(&feats).max().unwrap_or("O").to_string();
            history.push(label);
        }
        for (token, label) in tokens.iter_mut().zip(history) {
            token.label = Some(label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_model() -> MaxEntModel {
        let mapping = [
            ("spelling-upcase-B-GPE", 0),
            ("prevtag-None-B-GPE", 1),
            ("lower-to-O", 2),
            ("pos+prevtag-NNP+B-GPE-I-GPE", 3),
            ("bias-True-O", 4),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        let weights = vec![2.0, -0.5, 3.0, 4.0, 0.5];
        let labels = ["O", "B-GPE", "I-GPE"].iter().map(|s| s.to_string()).collect();
        MaxEntModel::new(mapping, weights, labels).unwrap()
    }

    fn tagged(words: &[(&str, &str)]) -> Vec<Token> {
        words
            .iter()
            .enumerate()
            .map(|(i, (w, t))| {
                let mut tok = Token::new(*w, 0, 0, i);
                tok.tag = Some(t.to_string());
                tok
            })
            .collect()
    }

    #[test]
    fn test_log_arithmetic() {
        assert!((add_logs(3f64.log2(), 5f64.log2()) - 3.0).abs() < 1e-12);
        assert_eq!(add_logs(0.0, -200.0), 0.0);
        assert_eq!(sum_logs(&[]), f64::NEG_INFINITY);
        assert!((sum_logs(&[1.0, 1.0, 2.0]) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_prob_dist() {
        let dist = ProbDist::from_scores(vec![("A".into(), 1.0), ("B".into(), 1.0)]);
        assert!((dist.prob("A") - 0.5).abs() < 1e-12);
        assert_eq!(dist.max(), Some("A"));
        assert_eq!(dist.prob("Z"), 0.0);

        let uniform = ProbDist::from_scores(vec![
            ("A".into(), f64::NEG_INFINITY),
            ("B".into(), f64::NEG_INFINITY),
        ]);
        assert!((uniform.prob("B") - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_label_sequence() {
        let extractor = EntityExtractor::new(Arc::new(tiny_model()));
        let mut tokens = tagged(&[("Paris", "NNP"), ("Texas", "NNP"), ("to", "TO")]);
        extractor.label(&mut tokens);
        let labels: Vec<_> = tokens.iter().map(|t| t.label.as_deref().unwrap()).collect();
        assert_eq!(labels, ["B-GPE", "I-GPE", "O"]);
    }

    #[test]
    fn test_invalid_models() {
        let mapping: HashMap<String, usize> = [("bias-True-O".to_string(), 3)].into_iter().collect();
        assert!(matches!(
            MaxEntModel::new(mapping, vec![0.0], vec!["O".into()]),
            Err(Error::InvalidModel(_))
        ));
        assert!(MaxEntModel::new(HashMap::new(), vec![], vec![]).is_err());
    }

    #[test]
    fn test_from_json_readers() {
        let model = MaxEntModel::from_json_readers(
            &br#"{"bias-True-O":0}"#[..],
            &b"[1.5]"[..],
            &br#"["O","B-GPE"]"#[..],
        )
        .unwrap();
        assert_eq!(model.labels(), ["O", "B-GPE"]);
        let err = MaxEntModel::from_json_readers(&b"{}"[..], &b"oops"[..], &b"[]"[..]);
        assert!(matches!(err, Err(Error::ModelDecode { table: "weights", .. })));
    }
}
