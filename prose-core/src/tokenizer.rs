//! # Tokenizador de Palavras
//!
//! Divide o texto bruto em tokens (palavras, pontuações, contrações). Cada token
//! preserva sua posição original no documento (offsets em bytes) para que as
//! etapas seguintes (sentenças, entidades) possam fatiar o texto sem copiá-lo.
//!
//! ## Estratégias
//!
//! - **Iter** ([`IterTokenizer`]): regras de prefixo/sufixo/contração aplicadas
//!   iterativamente a cada span separado por espaços. É o padrão.
//! - **WordBoundary** ([`WordBoundaryTokenizer`]): fronteiras de palavra Unicode
//!   (UAX #29), descartando pontuação.
//!
//! Qualquer tipo que implemente [`WordTokenizer`] pode substituir os dois.
//!
//! ## Algoritmo do `IterTokenizer`
//!
//! 1. Sanitiza o texto (aspas curvas → retas, `\r\n` → `\n`) mantendo o mapa de offsets.
//! 2. Percorre os spans maximais sem espaço.
//! 3. Cada span distinto é dividido uma única vez por chamada (memoização); as
//!    ocorrências repetidas reaproveitam a divisão com offsets rebaseados.
//! 4. Divisão: span especial (emoticon, `U.S.`, `Mr.`, predicado do usuário) sai
//!    inteiro; senão, a cada iteração, a primeira regra aplicável entre
//!    prefixo → contração → sufixo. Sufixos removidos saem depois do núcleo,
//!    na ordem do texto (`good).` → `good`, `)`, `.`).
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use prose_core::tokenizer::{tokenize_with_mode, TokenizerMode};
//!
//! let tokens = tokenize_with_mode("They'll save and invest more.", TokenizerMode::Iter);
//! let words: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
//! assert_eq!(words, ["They", "'ll", "save", "and", "invest", "more", "."]);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::Result;
use crate::rules::{
    TokenizerRules, Unsplittable, DEFAULT_CONTRACTIONS, DEFAULT_EMOTICONS, DEFAULT_PREFIXES,
    DEFAULT_SANITIZER, DEFAULT_SPECIAL, DEFAULT_SUFFIXES,
};

/// Um token extraído do texto original.
///
/// `start`/`end` sempre apontam para o documento original. `text` é a forma
/// sanitizada vista pelo tagger e pelo extrator; quando o sanitizador não tocou
/// o token, `text == documento[start..end]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    /// O texto do token (ex: "They", "'ll", ".").
    pub text: String,
    /// Índice de byte inicial no texto original (inclusive).
    pub start: usize,
    /// Índice de byte final no texto original (exclusivo).
    pub end: usize,
    /// Índice sequencial do token no documento.
    pub index: usize,
    /// Classe gramatical (POS), preenchida pelo tagger.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tag: Option<String>,
    /// Rótulo IOB (`B-GPE`, `I-GPE`, `O`), preenchido pelo extrator.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub label: Option<String>,
}

impl Token {
    pub fn new(text: impl Into<String>, start: usize, end: usize, index: usize) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            index,
            tag: None,
            label: None,
        }
    }
}

/// Capacidade de tokenização plugável no pipeline.
pub trait WordTokenizer: Send + Sync {
    /// Tokeniza `text`, somando `base` a todos os offsets.
    ///
    /// Os índices dos tokens começam em 0; o pipeline os renumera.
    fn tokenize_at(&self, text: &str, base: usize) -> Vec<Token>;

    fn tokenize(&self, text: &str) -> Vec<Token> {
        self.tokenize_at(text, 0)
    }
}

/// Tokenizadores embutidos, selecionáveis por configuração (ex: JSON da API).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerMode {
    /// **Iterativo**: prefixos, contrações e sufixos. Padrão.
    Iter,
    /// **Fronteira de palavra**: segmentação Unicode, somente palavras.
    WordBoundary,
}

impl Default for TokenizerMode {
    fn default() -> Self {
        TokenizerMode::Iter
    }
}

impl TokenizerMode {
    /// Instancia o tokenizador correspondente com as tabelas padrão.
    pub fn build(self) -> Arc<dyn WordTokenizer> {
        match self {
            TokenizerMode::Iter => Arc::new(IterTokenizer::default()),
            TokenizerMode::WordBoundary => Arc::new(WordBoundaryTokenizer),
        }
    }
}

/// Tokeniza o texto usando a estratégia escolhida.
pub fn tokenize_with_mode(text: &str, mode: TokenizerMode) -> Vec<Token> {
    match mode {
        TokenizerMode::Iter => IterTokenizer::default().tokenize(text),
        TokenizerMode::WordBoundary => WordBoundaryTokenizer.tokenize(text),
    }
}

/// Pedaço de um span, em bytes relativos ao início do span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Piece {
    start: usize,
    end: usize,
}

/// Próxima ação sobre o que resta do span.
enum Step {
    /// Emite `n` bytes do início (prefixo ou trecho antes/da contração).
    Head(usize),
    /// Remove `n` bytes do fim, emitidos depois do núcleo.
    Tail(usize),
    /// Emite o restante inteiro.
    Rest,
}

/// Tokenizador iterativo baseado em regras.
#[derive(Debug, Clone)]
pub struct IterTokenizer {
    rules: Arc<TokenizerRules>,
    cache: bool,
}

impl Default for IterTokenizer {
    fn default() -> Self {
        Self {
            rules: Arc::new(TokenizerRules::english()),
            cache: true,
        }
    }
}

impl IterTokenizer {
    pub fn builder() -> TokenizerBuilder {
        TokenizerBuilder::default()
    }

    pub fn with_rules(rules: Arc<TokenizerRules>) -> Self {
        Self { rules, cache: true }
    }

    pub fn rules(&self) -> &TokenizerRules {
        &self.rules
    }

    /// `contraction` é a primeira contração inteira dentro de `rest`, com
    /// offset relativo a `rest`.
    fn next_step(&self, rest: &str, contraction: Option<(usize, usize)>) -> Step {
        if let Some(prefix) = self.rules.prefix_of(rest) {
            return Step::Head(prefix.len());
        }
        if let Some((idx, len)) = contraction {
            if idx > 0 {
                return Step::Head(idx);
            }
            if len < rest.len() {
                return Step::Head(len);
            }
        }
        if let Some(suffix) = self.rules.suffix_of(rest) {
            return Step::Tail(suffix.len());
        }
        Step::Rest
    }

    /// Divide um span (sem espaços) em pedaços.
    fn split(&self, span: &str) -> Vec<Piece> {
        let mut head = Vec::new();
        let mut tail = Vec::new();
        let (mut lo, mut hi) = (0, span.len());
        let sites = self.rules.contraction_sites(span);
        let mut site = 0;

        while lo < hi {
            let rest = &span[lo..hi];
            if self.rules.is_special(rest) {
                head.push(Piece { start: lo, end: hi });
                break;
            }
            // `lo` só cresce e `hi` só diminui: uma ocorrência que saiu da
            // janela não volta mais.
            while sites
                .get(site)
                .is_some_and(|&(idx, len)| idx < lo || idx + len > hi)
            {
                site += 1;
            }
            let contraction = sites.get(site).map(|&(idx, len)| (idx - lo, len));

            let before = hi - lo;
            match self.next_step(rest, contraction) {
                Step::Head(n) => {
                    head.push(Piece { start: lo, end: lo + n });
                    lo += n;
                }
                Step::Tail(n) => {
                    tail.push(Piece { start: hi - n, end: hi });
                    hi -= n;
                }
                Step::Rest => {
                    head.push(Piece { start: lo, end: hi });
                    lo = hi;
                }
            }
            if lo < hi && hi - lo == before {
                head.push(Piece { start: lo, end: hi });
                break;
            }
        }

        head.extend(tail.into_iter().rev());
        head
    }
}

impl WordTokenizer for IterTokenizer {
    fn tokenize_at(&self, text: &str, base: usize) -> Vec<Token> {
        let sanitized = self.rules.sanitizer().apply(text);
        let clean = sanitized.text.as_str();
        let mut memo: HashMap<&str, Vec<Piece>> = HashMap::new();
        let mut tokens = Vec::new();
        let mut spans = 0usize;

        for (offset, span) in whitespace_spans(clean) {
            spans += 1;
            let fresh;
            let pieces: &[Piece] = if self.cache {
                memo.entry(span).or_insert_with(|| self.split(span))
            } else {
                fresh = self.split(span);
                &fresh
            };
            for piece in pieces {
                let (start, end) =
                    sanitized.original_range(offset + piece.start, offset + piece.end);
                tokens.push(Token::new(
                    &span[piece.start..piece.end],
                    base + start,
                    base + end,
                    tokens.len(),
                ));
            }
        }

        trace!(spans, distinct = memo.len(), tokens = tokens.len(), "tokenized");
        tokens
    }
}

/// Spans maximais sem espaço em branco, com o offset de cada um.
fn whitespace_spans(text: &str) -> Vec<(usize, &str)> {
    let mut start = None;
    let mut spans = Vec::new();
    for (i, c) in text.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                spans.push((s, &text[s..i]));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, &text[s..]));
    }
    spans
}

/// Tokenizador por fronteiras de palavra Unicode; mantém só segmentos com
/// algum caractere alfanumérico.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordBoundaryTokenizer;

impl WordTokenizer for WordBoundaryTokenizer {
    fn tokenize_at(&self, text: &str, base: usize) -> Vec<Token> {
        text.split_word_bound_indices()
            .filter(|(_, w)| w.chars().any(char::is_alphanumeric))
            .enumerate()
            .map(|(i, (start, w))| Token::new(w, base + start, base + start + w.len(), i))
            .collect()
    }
}

/// Construtor validado do [`IterTokenizer`].
///
/// Todas as opções começam com as tabelas inglesas padrão.
pub struct TokenizerBuilder {
    sanitizer: Vec<(String, String)>,
    prefixes: Vec<String>,
    suffixes: Vec<String>,
    contractions: Vec<String>,
    emoticons: Vec<String>,
    special: String,
    unsplittable: Option<Unsplittable>,
    cache: bool,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for TokenizerBuilder {
    fn default() -> Self {
        Self {
            sanitizer: DEFAULT_SANITIZER
                .iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect(),
            prefixes: owned(DEFAULT_PREFIXES),
            suffixes: owned(DEFAULT_SUFFIXES),
            contractions: owned(DEFAULT_CONTRACTIONS),
            emoticons: owned(DEFAULT_EMOTICONS),
            special: DEFAULT_SPECIAL.to_string(),
            unsplittable: None,
            cache: true,
        }
    }
}

impl TokenizerBuilder {
    pub fn sanitizer<I, A, B>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        self.sanitizer = pairs.into_iter().map(|(a, b)| (a.into(), b.into())).collect();
        self
    }

    pub fn prefixes<I: IntoIterator<Item = S>, S: Into<String>>(mut self, items: I) -> Self {
        self.prefixes = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn suffixes<I: IntoIterator<Item = S>, S: Into<String>>(mut self, items: I) -> Self {
        self.suffixes = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn contractions<I: IntoIterator<Item = S>, S: Into<String>>(mut self, items: I) -> Self {
        self.contractions = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn emoticons<I: IntoIterator<Item = S>, S: Into<String>>(mut self, items: I) -> Self {
        self.emoticons = items.into_iter().map(Into::into).collect();
        self
    }

    /// Regex de spans especiais (substitui a padrão).
    pub fn special(mut self, pattern: impl Into<String>) -> Self {
        self.special = pattern.into();
        self
    }

    pub fn unsplittable<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.unsplittable = Some(Arc::new(predicate));
        self
    }

    /// Liga/desliga a memoização por span (ligada por padrão).
    pub fn cache(mut self, enabled: bool) -> Self {
        self.cache = enabled;
        self
    }

    pub fn build(self) -> Result<IterTokenizer> {
        let rules = TokenizerRules::from_parts(
            &self.sanitizer,
            &self.prefixes,
            &self.suffixes,
            &self.contractions,
            &self.emoticons,
            &self.special,
            self.unsplittable,
        )?;
        Ok(IterTokenizer {
            rules: Arc::new(rules),
            cache: self.cache,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_contractions_and_final_period() {
        let tokens = IterTokenizer::default().tokenize("They'll save and invest more.");
        assert_eq!(
            texts(&tokens),
            ["They", "'ll", "save", "and", "invest", "more", "."]
        );
    }

    #[test]
    fn test_abbreviations_stay_whole() {
        let tokens = IterTokenizer::default()
            .tokenize("Mr. James plays basketball in the N.B.A., do you?");
        assert_eq!(
            texts(&tokens),
            [
                "Mr.", "James", "plays", "basketball", "in", "the", "N.B.A.", ",", "do", "you",
                "?"
            ]
        );
    }

    #[test]
    fn test_custom_contractions() {
        let tokens = IterTokenizer::default().tokenize("He's happy");
        assert_eq!(texts(&tokens), ["He", "'s", "happy"]);

        let custom = IterTokenizer::builder()
            .contractions(["'ve"])
            .build()
            .unwrap();
        assert_eq!(texts(&custom.tokenize("He's happy")), ["He's", "happy"]);
    }

    #[test]
    fn test_stacked_suffixes_and_whitespace() {
        let tokens = IterTokenizer::default().tokenize("(Well,\nthat\twasn't good).");
        assert_eq!(
            texts(&tokens),
            ["(", "Well", ",", "that", "was", "n't", "good", ")", "."]
        );
    }

    #[test]
    fn test_emoticons_and_handles() {
        let tokens = IterTokenizer::default().tokenize("@twitter, what time does it start :-)");
        assert_eq!(
            texts(&tokens),
            ["@twitter", ",", "what", "time", "does", "it", "start", ":-)"]
        );
    }

    #[test]
    fn test_months_and_ellipsis() {
        let tokens = IterTokenizer::default().tokenize("March. July... wait");
        assert_eq!(texts(&tokens), ["March", ".", "July", ".", ".", ".", "wait"]);
    }

    #[test]
    fn test_chained_contractions() {
        let tokens = IterTokenizer::default().tokenize("He's're");
        assert_eq!(texts(&tokens), ["He", "'s", "'re"]);
    }

    #[test]
    fn test_offsets_match_source() {
        let text = "  Don't stop (now), \"please\".  ";
        let tokens = IterTokenizer::default().tokenize(text);
        assert!(!tokens.is_empty());
        let mut last = 0;
        for (i, t) in tokens.iter().enumerate() {
            assert_eq!(t.index, i);
            assert!(t.start >= last && t.start <= t.end && t.end <= text.len());
            assert_eq!(&text[t.start..t.end], t.text);
            last = t.start;
        }
    }

    #[test]
    fn test_sanitized_offsets_point_to_original() {
        let text = "\u{201c}Hi\u{201d} you";
        let tokens = IterTokenizer::default().tokenize(text);
        assert_eq!(texts(&tokens), ["\"", "Hi", "\"", "you"]);
        assert_eq!(&text[tokens[0].start..tokens[0].end], "\u{201c}");
        assert_eq!(&text[tokens[1].start..tokens[1].end], "Hi");
        assert_eq!(&text[tokens[2].start..tokens[2].end], "\u{201d}");
    }

    #[test]
    fn test_cache_is_transparent() {
        let text = "go, go, go! He's here and he's there. go, go.";
        let cached = IterTokenizer::default().tokenize(text);
        let uncached = IterTokenizer::builder().cache(false).build().unwrap().tokenize(text);
        assert_eq!(cached, uncached);
    }

    #[test]
    fn test_base_offset() {
        let tokens = IterTokenizer::default().tokenize_at("hi there", 10);
        assert_eq!((tokens[1].start, tokens[1].end), (13, 18));
    }

    #[test]
    fn test_unsplittable_predicate() {
        let tok = IterTokenizer::builder()
            .unsplittable(|s| s.starts_with("http"))
            .build()
            .unwrap();
        let tokens = tok.tokenize("see http://x.io/a(b).");
        assert_eq!(texts(&tokens), ["see", "http://x.io/a(b)."]);
    }

    #[test]
    fn test_empty_and_blank_text() {
        assert!(IterTokenizer::default().tokenize("").is_empty());
        assert!(IterTokenizer::default().tokenize(" \n\t ").is_empty());
    }

    #[test]
    fn test_non_ascii_spans() {
        let text = "ˌˌ kill...";
        let tokens = IterTokenizer::default().tokenize(text);
        assert_eq!(texts(&tokens), ["ˌˌ", "kill", ".", ".", "."]);
        for t in &tokens {
            assert_eq!(&text[t.start..t.end], t.text);
        }
    }

    #[test]
    fn test_sentence_final_period_splits_from_short_words() {
        let tok = IterTokenizer::default();
        assert_eq!(texts(&tok.tokenize("Ask Bob.")), ["Ask", "Bob", "."]);
        assert_eq!(texts(&tok.tokenize("I said Yes.")), ["I", "said", "Yes", "."]);
        assert_eq!(
            texts(&tok.tokenize("We saw him. Now.")),
            ["We", "saw", "him", ".", "Now", "."]
        );
        assert_eq!(texts(&tok.tokenize("Mr. James")), ["Mr.", "James"]);
        assert_eq!(texts(&tok.tokenize("director Nov. 29.")), ["director", "Nov.", "29", "."]);
    }

    #[test]
    fn test_long_spans() {
        let tok = IterTokenizer::default();
        let opens = "(".repeat(40_000);
        let tokens = tok.tokenize(&opens);
        assert_eq!(tokens.len(), 40_000);
        assert!(tokens.iter().all(|t| t.text == "(" && t.end == t.start + 1));

        let text = format!("{}{}", "a'sb".repeat(5_000), ")".repeat(20_000));
        let tokens = tok.tokenize(&text);
        assert_eq!(tokens.len(), 5_000 * 2 + 1 + 20_000);
        assert_eq!(tokens[0].text, "a");
        assert_eq!(tokens[1].text, "'s");
        assert_eq!(tokens[2].text, "ba");
        assert_eq!(tokens[10_000].text, "b");
        assert!(tokens[10_001..].iter().all(|t| t.text == ")"));
    }

    #[test]
    fn test_word_boundary_mode() {
        let tokens = tokenize_with_mode("They'll save and invest more.", TokenizerMode::WordBoundary);
        assert_eq!(texts(&tokens), ["They'll", "save", "and", "invest", "more"]);
    }
}
