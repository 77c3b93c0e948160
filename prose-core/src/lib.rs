//! # prose-core: Anotação de Texto em Inglês (e Segmentação em fr/es)
//!
//! Este crate implementa um pipeline de NLP clássico, baseado em regras e em
//! modelos lineares pré-treinados, sem dependências de runtime externo.
//!
//! ## Arquitetura do Sistema
//!
//! O dado flui em uma única direção, cada etapa apontando offsets do texto
//! original:
//!
//! 1.  **Entrada**: Texto bruto (`&str`).
//! 2.  **Segmentação** ([`segmenter`]): fronteiras de sentença por uma cascata
//!     de regras com abreviações por idioma ([`abbreviations`]).
//! 3.  **Tokenização** ([`tokenizer`]): prefixos, sufixos e contrações, com as
//!     tabelas em [`rules`].
//! 4.  **POS Tagging** ([`perceptron`]): Averaged Perceptron greedy sobre as
//!     features de [`features`].
//! 5.  **Entidades** ([`maxent`], [`tagger`]): rótulos IOB por MaxEnt e
//!     agrupamento em [`Entity`].
//! 6.  **Saída**: um [`Document`] com tokens, sentenças e entidades.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use prose_core::{analyze, AnalyzeOptions};
//!
//! // Sem modelo: só tokenização e segmentação
//! let options = AnalyzeOptions {
//!     tag: false,
//!     extract: false,
//!     ..AnalyzeOptions::default()
//! };
//! let doc = analyze("He's happy. She isn't.", &options).unwrap();
//!
//! let words: Vec<&str> = doc.tokens().iter().map(|t| t.text.as_str()).collect();
//! assert_eq!(&words[..3], ["He", "'s", "happy"]);
//! assert_eq!(doc.sentences().len(), 2);
//! ```
//!
//! Com um modelo em disco ([`Model::from_dir`]), o mesmo pipeline preenche
//! `Token::tag`, `Token::label` e [`Document::entities`].

pub mod abbreviations;
pub mod error;
pub mod features;
pub mod maxent;
pub mod model;
pub mod perceptron;
pub mod pipeline;
pub mod rules;
pub mod segmenter;
pub mod tagger;
pub mod tokenizer;
pub mod wordlist;

pub use abbreviations::{Language, LanguageRules};
pub use error::{Error, Result};
pub use maxent::{EntityExtractor, MaxEntModel};
pub use model::Model;
pub use perceptron::{PerceptronModel, PerceptronTagger};
pub use pipeline::{analyze, AnalyzeOptions, Document, Pipeline, PipelineBuilder};
pub use rules::TokenizerRules;
pub use segmenter::{Segmenter, Sentence};
pub use tagger::{Entity, IobLabel};
pub use tokenizer::{IterTokenizer, Token, TokenizerBuilder, TokenizerMode, WordTokenizer};
