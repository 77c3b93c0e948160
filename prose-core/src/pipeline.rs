//! # Pipeline de Anotação
//!
//! Orquestra as etapas na ordem fixa:
//!
//! ```text
//! texto → sentenças → tokens → tags POS → rótulos IOB → entidades
//! ```
//!
//! Cada etapa é ligada por uma flag de configuração. Com segmentação, a
//! tokenização, o tagging e a extração rodam **por sentença**: o contexto do
//! tagger é reiniciado a cada sentença e nenhuma entidade cruza uma fronteira.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use prose_core::pipeline::Pipeline;
//!
//! let pipeline = Pipeline::builder()
//!     .tag(false)
//!     .extract(false)
//!     .build()
//!     .unwrap();
//!
//! let doc = pipeline.analyze("Mr. James plays basketball. He is tall.");
//! assert_eq!(doc.sentences().len(), 2);
//! assert_eq!(doc.sentence_text(&doc.sentences()[1]), "He is tall.");
//! assert_eq!(doc.tokens()[0].text, "Mr.");
//! ```

use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::abbreviations::Language;
use crate::error::{Error, Result};
use crate::maxent::EntityExtractor;
use crate::model::Model;
use crate::perceptron::PerceptronTagger;
use crate::segmenter::{Segmenter, Sentence};
use crate::tagger::{self, Entity};
use crate::tokenizer::{Token, TokenizerMode, WordTokenizer};

/// Opções de análise, desserializáveis de JSON (todos os campos têm padrão).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzeOptions {
    /// Segmentar em sentenças. Padrão: `true`.
    pub segment: bool,
    /// Taguear POS. Padrão: `true`. Exige modelo.
    pub tag: bool,
    /// Extrair entidades. Padrão: `true`. Exige modelo e implica `tag`.
    pub extract: bool,
    /// Idioma do segmentador. Padrão: `en`.
    pub language: Language,
    /// Tokenizador embutido. Padrão: `iter`.
    pub tokenizer: TokenizerMode,
    /// Modelo usado pelo tagger e pelo extrator.
    #[serde(skip)]
    pub model: Option<Arc<Model>>,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            segment: true,
            tag: true,
            extract: true,
            language: Language::default(),
            tokenizer: TokenizerMode::default(),
            model: None,
        }
    }
}

/// Builder do [`Pipeline`]. Cada opção tem o padrão de [`AnalyzeOptions`].
#[derive(Default)]
pub struct PipelineBuilder {
    options: AnalyzeOptions,
    tokenizer: Option<Arc<dyn WordTokenizer>>,
    segmenter: Option<Arc<Segmenter>>,
}

impl PipelineBuilder {
    /// Substitui todas as opções de uma vez.
    pub fn options(mut self, options: AnalyzeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn segment(mut self, enabled: bool) -> Self {
        self.options.segment = enabled;
        self
    }

    pub fn tag(mut self, enabled: bool) -> Self {
        self.options.tag = enabled;
        self
    }

    pub fn extract(mut self, enabled: bool) -> Self {
        self.options.extract = enabled;
        self
    }

    pub fn language(mut self, language: Language) -> Self {
        self.options.language = language;
        self
    }

    pub fn tokenizer_mode(mut self, mode: TokenizerMode) -> Self {
        self.options.tokenizer = mode;
        self
    }

    /// Tokenizador próprio; tem precedência sobre `tokenizer_mode`.
    pub fn tokenizer(mut self, tokenizer: Arc<dyn WordTokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    /// Segmentador já construído (reaproveita as regex compiladas); tem
    /// precedência sobre `language`.
    pub fn segmenter(mut self, segmenter: Arc<Segmenter>) -> Self {
        self.segmenter = Some(segmenter);
        self
    }

    pub fn model(mut self, model: Arc<Model>) -> Self {
        self.options.model = Some(model);
        self
    }

    /// Valida a configuração e monta o pipeline.
    ///
    /// # Erros
    /// - [`Error::MissingModel`] se `tag` ou `extract` estiverem ligados sem o
    ///   modelo correspondente.
    /// - Erros de compilação das regras do segmentador.
    pub fn build(self) -> Result<Pipeline> {
        let AnalyzeOptions {
            segment,
            tag,
            extract,
            language,
            tokenizer,
            model,
        } = self.options;
        let tag = tag || extract;

        let tagger = if tag {
            let weights = model
                .as_ref()
                .and_then(|m| m.tagger.clone())
                .ok_or(Error::MissingModel { stage: "tagging" })?;
            Some(PerceptronTagger::new(weights)?)
        } else {
            None
        };
        let extractor = if extract {
            let weights = model
                .as_ref()
                .and_then(|m| m.extractor.clone())
                .ok_or(Error::MissingModel { stage: "extraction" })?;
            Some(EntityExtractor::new(weights))
        } else {
            None
        };
        let segmenter = match (segment, self.segmenter) {
            (false, _) => None,
            (true, Some(segmenter)) => Some(segmenter),
            (true, None) => Some(Arc::new(Segmenter::new(language)?)),
        };

        Ok(Pipeline {
            tokenizer: self.tokenizer.unwrap_or_else(|| tokenizer.build()),
            segmenter,
            tagger,
            extractor,
        })
    }
}

/// Pipeline configurado. Imutável, `Send + Sync`, reutilizável entre documentos.
pub struct Pipeline {
    tokenizer: Arc<dyn WordTokenizer>,
    segmenter: Option<Arc<Segmenter>>,
    tagger: Option<PerceptronTagger>,
    extractor: Option<EntityExtractor>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("segment", &self.segmenter.is_some())
            .field("tag", &self.tagger.is_some())
            .field("extract", &self.extractor.is_some())
            .finish()
    }
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Analisa um documento. Nunca falha: texto vazio gera coleções vazias.
    pub fn analyze(&self, text: &str) -> Document {
        let sentences = match &self.segmenter {
            Some(segmenter) => segmenter.segment(text),
            None => Vec::new(),
        };
        let spans: Vec<(usize, usize)> = if self.segmenter.is_some() {
            sentences.iter().map(|s| (s.start, s.end)).collect()
        } else {
            vec![(0, text.len())]
        };

        let mut tokens: Vec<Token> = Vec::new();
        let mut entities: Vec<Entity> = Vec::new();
        for (start, end) in spans {
            let mut chunk = self.tokenizer.tokenize_at(&text[start..end], start);
            for (i, token) in chunk.iter_mut().enumerate() {
                token.index = tokens.len() + i;
            }
            if let Some(tagger) = &self.tagger {
                tagger.tag(&mut chunk);
            }
            if let Some(extractor) = &self.extractor {
                extractor.label(&mut chunk);
                entities.extend(tagger::chunk(&chunk, text));
            }
            tokens.extend(chunk);
        }

        debug!(
            bytes = text.len(),
            sentences = sentences.len(),
            tokens = tokens.len(),
            entities = entities.len(),
            "document analyzed"
        );
        Document {
            text: text.to_string(),
            tokens,
            sentences,
            entities,
        }
    }

    /// Analisa vários documentos em paralelo (um documento por tarefa rayon).
    ///
    /// A ordem do resultado é a mesma da entrada.
    pub fn analyze_batch<S>(&self, texts: &[S]) -> Vec<Document>
    where
        S: AsRef<str> + Sync,
    {
        texts.par_iter().map(|t| self.analyze(t.as_ref())).collect()
    }
}

/// Resultado da análise de um texto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    text: String,
    tokens: Vec<Token>,
    sentences: Vec<Sentence>,
    entities: Vec<Entity>,
}

impl Document {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Vazio quando a segmentação estava desligada.
    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    /// Vazio quando a extração estava desligada.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn sentence_text(&self, sentence: &Sentence) -> &str {
        sentence.text(&self.text)
    }

    /// Fatia original do token (antes da sanitização).
    pub fn token_source(&self, token: &Token) -> &str {
        &self.text[token.start..token.end]
    }

    pub fn entity_texts(&self) -> Vec<&str> {
        self.entities.iter().map(|e| e.text.as_str()).collect()
    }
}

/// Atalho: monta um pipeline com `options` e analisa `text`.
pub fn analyze(text: &str, options: &AnalyzeOptions) -> Result<Document> {
    Ok(Pipeline::builder()
        .options(options.clone())
        .build()?
        .analyze(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maxent::MaxEntModel;
    use crate::perceptron::PerceptronModel;
    use std::collections::HashMap;

    fn plain() -> Pipeline {
        Pipeline::builder().tag(false).extract(false).build().unwrap()
    }

    fn tiny_model() -> Arc<Model> {
        let classes = ["NNP", "VBZ", "."].iter().map(|s| s.to_string()).collect();
        let tag_map: HashMap<String, String> = [("is", "VBZ"), (".", ".")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let weights: HashMap<String, HashMap<String, f64>> = [("bias".to_string(), [("NNP".to_string(), 1.0)].into_iter().collect())]
            .into_iter()
            .collect();
        let tagger = PerceptronModel::new(classes, tag_map, weights).unwrap();

        let mapping = [("spelling-upcase-B-GPE", 0), ("bias-True-O", 1), ("pos+prevtag-NNP+B-GPE-I-GPE", 2)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let labels = ["O", "B-GPE", "I-GPE"].iter().map(|s| s.to_string()).collect();
        let extractor = MaxEntModel::new(mapping, vec![2.0, 0.5, 4.0], labels).unwrap();

        Arc::new(Model::new("tiny").with_tagger(tagger).with_extractor(extractor))
    }

    #[test]
    fn test_defaults_require_model() {
        let err = Pipeline::builder().build().unwrap_err();
        assert!(matches!(err, Error::MissingModel { stage: "tagging" }));

        let err = analyze("Hi.", &AnalyzeOptions::default()).unwrap_err();
        assert!(matches!(err, Error::MissingModel { .. }));
    }

    #[test]
    fn test_extract_requires_extractor() {
        let tagger_only = Model::new("pos").with_tagger(
            PerceptronModel::new(vec!["NN".into()], HashMap::new(), HashMap::new()).unwrap(),
        );
        let err = Pipeline::builder().model(Arc::new(tagger_only)).build().unwrap_err();
        assert!(matches!(err, Error::MissingModel { stage: "extraction" }));
    }

    #[test]
    fn test_tokens_and_sentences() {
        let doc = plain().analyze("They'll save and invest more. Mr. Smith agrees.");
        let words: Vec<_> = doc.tokens().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(
            words,
            ["They", "'ll", "save", "and", "invest", "more", ".", "Mr.", "Smith", "agrees", "."]
        );
        assert_eq!(doc.sentences().len(), 2);
        for (i, token) in doc.tokens().iter().enumerate() {
            assert_eq!(token.index, i);
            assert_eq!(doc.token_source(token), token.text);
            assert!(token.tag.is_none());
        }
        assert!(doc.entities().is_empty());
    }

    #[test]
    fn test_without_segmentation() {
        let pipeline = Pipeline::builder()
            .segment(false)
            .tag(false)
            .extract(false)
            .build()
            .unwrap();
        let doc = pipeline.analyze("One. Two.");
        assert!(doc.sentences().is_empty());
        assert_eq!(doc.tokens().len(), 4);
    }

    #[test]
    fn test_empty_text() {
        let doc = plain().analyze("");
        assert!(doc.tokens().is_empty());
        assert!(doc.sentences().is_empty());
        assert!(doc.entities().is_empty());
    }

    #[test]
    fn test_entities_with_tiny_model() {
        let pipeline = Pipeline::builder().model(tiny_model()).build().unwrap();
        let doc = pipeline.analyze("New York is big. Paris is old.");
        assert_eq!(doc.entity_texts(), ["New York", "Paris"]);
        assert_eq!(doc.entities()[0].label, "GPE");
        assert_eq!(doc.tokens()[2].tag.as_deref(), Some("VBZ"));
        for entity in doc.entities() {
            assert_eq!(&doc.text()[entity.start..entity.end], entity.text);
        }
    }

    #[test]
    fn test_options_from_json() {
        let options: AnalyzeOptions =
            serde_json::from_str(r#"{"tag": false, "extract": false, "language": "es", "tokenizer": "word_boundary"}"#)
                .unwrap();
        assert!(options.segment);
        assert_eq!(options.language, Language::Es);
        let doc = analyze("¡Hola, mundo!", &options).unwrap();
        let words: Vec<_> = doc.tokens().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(words, ["Hola", "mundo"]);
    }

    #[test]
    fn test_batch_preserves_order() {
        let texts = ["First one.", "Second text here.", ""];
        let pipeline = plain();
        let docs = pipeline.analyze_batch(&texts);
        assert_eq!(docs.len(), 3);
        for (doc, text) in docs.iter().zip(texts) {
            assert_eq!(doc.text(), text);
            assert_eq!(*doc, pipeline.analyze(text));
        }
    }
}
