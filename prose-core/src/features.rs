//! # Engenharia de Features
//!
//! Converte cada token, no seu contexto, em um vetor de features esparso que os
//! classificadores lineares pontuam.
//!
//! ## Features do Tagger (POS)
//!
//! As chaves são partes unidas por espaço (`"i-1 tag+i word DT dog"`) e cada
//! ocorrência incrementa a contagem da chave.
//!
//! ### Token atual
//! - `bias`
//! - Sufixo de até 3 caracteres (lowercase) e primeiro grafema
//! - Palavra normalizada (ver [`normalize`])
//!
//! ### Contexto (janela de 2 tokens)
//! - Palavras e sufixos vizinhos, já normalizados
//! - Tags previstas para os dois tokens anteriores e suas combinações
//!
//! O contexto é acolchoado com `-START-`, `-START2-` no início e `-END-`,
//! `-END2-` no fim.
//!
//! ## Features do Extrator de Entidades
//!
//! Pares `(nome, valor)` que o [`MaxEntModel`](crate::maxent::MaxEntModel)
//! codifica por rótulo: forma da palavra, POS, vizinhos e o rótulo previsto para
//! o token anterior.

use std::collections::HashSet;

use unicode_segmentation::UnicodeSegmentation;

use crate::tokenizer::Token;

/// Início do contexto acolchoado.
pub const START: [&str; 2] = ["-START-", "-START2-"];
/// Fim do contexto acolchoado.
pub const END: [&str; 2] = ["-END-", "-END2-"];

/// Vetor de features de um token.
///
/// A ordem de inserção é preservada para que a soma dos pesos seja sempre feita
/// na mesma sequência (a pontuação em ponto flutuante não depende da ordem de
/// iteração de um `HashMap`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVector {
    /// Pares `(chave, contagem)`, sem chaves repetidas.
    pub features: Vec<(String, f64)>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self {
            features: Vec::with_capacity(14),
        }
    }

    /// Junta `parts` com espaço e incrementa a contagem da chave resultante.
    pub fn add(&mut self, parts: &[&str]) {
        let key = parts.join(" ");
        match self.features.iter_mut().find(|(k, _)| *k == key) {
            Some((_, count)) => *count += 1.0,
            None => self.features.push((key, 1.0)),
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.features
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.features.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Normaliza uma palavra de contexto.
///
/// - Hífen interno → `!HYPHEN`
/// - Inteiro de 4 dígitos → `!YEAR`
/// - Começa com dígito → `!DIGITS`
/// - Caso contrário, lowercase.
pub fn normalize(word: &str) -> String {
    let Some(first) = word.chars().next() else {
        return String::new();
    };
    if word.contains('-') && first != '-' {
        "!HYPHEN".to_string()
    } else if word.len() == 4 && word.parse::<i64>().is_ok() {
        "!YEAR".to_string()
    } else if first.is_ascii_digit() {
        "!DIGITS".to_string()
    } else {
        word.to_lowercase()
    }
}

/// Últimos `n` caracteres de `word`.
fn last_chars(word: &str, n: usize) -> &str {
    match word.char_indices().rev().nth(n.saturating_sub(1)) {
        Some((idx, _)) if n > 0 => &word[idx..],
        _ if n == 0 => "",
        _ => word,
    }
}

/// Primeiros `n` caracteres de `word`.
fn first_chars(word: &str, n: usize) -> &str {
    match word.char_indices().nth(n) {
        Some((idx, _)) => &word[..idx],
        None => word,
    }
}

/// Contexto normalizado e acolchoado de uma sequência de palavras.
///
/// A palavra `i` da sequência fica na posição `i + 2`.
pub fn tagger_context<'a, I>(words: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut context: Vec<String> = START.iter().map(|s| s.to_string()).collect();
    context.extend(words.into_iter().map(normalize));
    context.extend(END.iter().map(|s| s.to_string()));
    context
}

/// Features do tagger para a palavra `i`, dado o contexto de
/// [`tagger_context`] e as duas tags anteriores (`p1` é a mais recente).
pub fn tagger_features(i: usize, word: &str, context: &[String], p1: &str, p2: &str) -> FeatureVector {
    let mut fv = FeatureVector::new();
    let i = (i + 2).min(context.len().saturating_sub(3));
    let suffix = last_chars(word, 3).to_lowercase();
    let pref1 = word.graphemes(true).next().unwrap_or("");
    let (prev2, prev, current, next, next2) = (
        context[i - 2].as_str(),
        context[i - 1].as_str(),
        context[i].as_str(),
        context[i + 1].as_str(),
        context[i + 2].as_str(),
    );

    fv.add(&["bias"]);
    fv.add(&["i suffix", &suffix]);
    fv.add(&["i pref1", pref1]);
    fv.add(&["i-1 tag", p1]);
    fv.add(&["i-2 tag", p2]);
    fv.add(&["i tag+i-2 tag", p1, p2]);
    fv.add(&["i word", current]);
    fv.add(&["i-1 tag+i word", p1, current]);
    fv.add(&["i-1 word", prev]);
    fv.add(&["i-1 suffix", last_chars(prev, 3)]);
    fv.add(&["i-2 word", prev2]);
    fv.add(&["i+1 word", next]);
    fv.add(&["i+1 suffix", last_chars(next, 3)]);
    fv.add(&["i+2 word", next2]);
    fv
}

/// Forma ortográfica de uma palavra.
///
/// | forma | exemplo |
/// |-------|---------|
/// | `number` | `3.14`, `-2` |
/// | `punct` | `.`, `--` |
/// | `upcase` | `London` |
/// | `downcase` | `dog` |
/// | `mixedcase` | `iPhone`, `NASA`, `B2B` |
/// | `other` | `e-mail` |
pub fn shape(word: &str) -> &'static str {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let mut chars = word.chars();
    if word.parse::<f64>().is_ok() {
        "number"
    } else if !word.is_empty() && word.chars().all(|c| !is_word(c)) {
        "punct"
    } else if chars.next().is_some_and(|c| c.is_ascii_uppercase())
        && word.len() > 1
        && chars.all(|c| c.is_ascii_lowercase())
    {
        "upcase"
    } else if !word.is_empty() && word.chars().all(|c| c.is_ascii_lowercase()) {
        "downcase"
    } else if !word.is_empty() && word.chars().all(is_word) {
        "mixedcase"
    } else {
        "other"
    }
}

/// Features do extrator para o token `i`.
///
/// `history` contém os rótulos já previstos para `tokens[..i]`; `basic` é a
/// lista de palavras básicas do inglês.
pub fn entity_features(
    tokens: &[Token],
    i: usize,
    history: &[String],
    basic: &HashSet<&'static str>,
) -> Vec<(&'static str, String)> {
    const NONE: &str = "None";
    let token = &tokens[i];
    let word = token.text.as_str();
    let pos = token.tag.as_deref().unwrap_or("");
    let lower = word.to_lowercase();
    let spelling = shape(word);

    let (prevtag, prevword, prevpos) = match i.checked_sub(1) {
        Some(p) => (
            history.get(p).map_or(NONE, String::as_str).to_string(),
            tokens[p].text.to_lowercase(),
            tokens[p].tag.clone().unwrap_or_default(),
        ),
        None => (NONE.to_string(), NONE.to_string(), NONE.to_string()),
    };
    let (nextword, nextpos) = match tokens.get(i + 1) {
        Some(next) => (
            next.text.to_lowercase(),
            next.tag.as_deref().unwrap_or("").to_lowercase(),
        ),
        None => (NONE.to_string(), NONE.to_string()),
    };
    let in_wordlist = if basic.contains(word) { "True" } else { "False" };

    vec![
        ("bias", "True".to_string()),
        ("word", word.to_string()),
        ("pos", pos.to_string()),
        ("spelling", spelling.to_string()),
        ("lower", lower.clone()),
        ("prefix", first_chars(&lower, 3).to_string()),
        ("suffix", last_chars(&lower, 3).to_string()),
        ("en-wordlist", in_wordlist.to_string()),
        ("word+nextpos", format!("{lower}+{nextpos}")),
        ("pos+prevtag", format!("{pos}+{prevtag}")),
        ("shape+prevtag", format!("{spelling}+{prevtag}")),
        ("prevtag", prevtag),
        ("prevword", prevword),
        ("prevpos", prevpos),
        ("nextword", nextword),
        ("nextpos", nextpos),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn test_normalize() {
        assert_eq!(normalize("well-known"), "!HYPHEN");
        assert_eq!(normalize("-LRB-"), "-lrb-");
        assert_eq!(normalize("1999"), "!YEAR");
        assert_eq!(normalize("12.5"), "!DIGITS");
        assert_eq!(normalize("Dog"), "dog");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_feature_counts() {
        let mut fv = FeatureVector::new();
        fv.add(&["i word", "dog"]);
        fv.add(&["i word", "dog"]);
        fv.add(&["bias"]);
        assert_eq!(fv.get("i word dog"), Some(2.0));
        assert_eq!(fv.len(), 2);
        assert_eq!(fv.features[0].0, "i word dog");
    }

    #[test]
    fn test_tagger_features_window() {
        let words = ["The", "Dog", "runs"];
        let context = tagger_context(words.iter().copied());
        assert_eq!(context.len(), 7);

        let fv = tagger_features(1, "Dog", &context, "DT", "-START-");
        assert_eq!(fv.get("bias"), Some(1.0));
        assert_eq!(fv.get("i suffix dog"), Some(1.0));
        assert_eq!(fv.get("i pref1 D"), Some(1.0));
        assert_eq!(fv.get("i tag+i-2 tag DT -START-"), Some(1.0));
        assert_eq!(fv.get("i-1 tag+i word DT dog"), Some(1.0));
        assert_eq!(fv.get("i-1 word the"), Some(1.0));
        assert_eq!(fv.get("i-2 word -START2-"), Some(1.0));
        assert_eq!(fv.get("i+1 suffix uns"), Some(1.0));
        assert_eq!(fv.get("i+2 word -END-"), Some(1.0));
        assert_eq!(fv.len(), 14);
    }

    #[test]
    fn test_short_and_multibyte_words() {
        let context = tagger_context(["é"]);
        let fv = tagger_features(0, "É", &context, "-START-", "-START2-");
        assert_eq!(fv.get("i suffix é"), Some(1.0));
        assert_eq!(fv.get("i pref1 É"), Some(1.0));
        assert_eq!(last_chars("ab", 3), "ab");
        assert_eq!(first_chars("naïve", 3), "naï");
    }

    #[test]
    fn test_shape() {
        assert_eq!(shape("3.14"), "number");
        assert_eq!(shape("."), "punct");
        assert_eq!(shape("London"), "upcase");
        assert_eq!(shape("dog"), "downcase");
        assert_eq!(shape("NASA"), "mixedcase");
        assert_eq!(shape("e-mail"), "other");
    }

    #[test]
    fn test_entity_features_edges() {
        let tokens = tagged(&[("Visit", "VB"), ("Paris", "NNP")]);
        let basic: HashSet<&'static str> = ["visit"].into_iter().collect();

        let first = entity_features(&tokens, 0, &[], &basic);
        let get = |f: &[(&str, String)], k: &str| {
            f.iter().find(|(n, _)| *n == k).map(|(_, v)| v.clone())
        };
        assert_eq!(get(&first, "prevtag").as_deref(), Some("None"));
        assert_eq!(get(&first, "nextword").as_deref(), Some("paris"));
        assert_eq!(get(&first, "word+nextpos").as_deref(), Some("visit+nnp"));
        // a lista é consultada com a forma exata
        assert_eq!(get(&first, "en-wordlist").as_deref(), Some("False"));

        let history = vec!["O".to_string()];
        let second = entity_features(&tokens, 1, &history, &basic);
        assert_eq!(get(&second, "prevtag").as_deref(), Some("O"));
        assert_eq!(get(&second, "prevpos").as_deref(), Some("VB"));
        assert_eq!(get(&second, "nextpos").as_deref(), Some("None"));
        assert_eq!(get(&second, "pos+prevtag").as_deref(), Some("NNP+O"));
        assert_eq!(get(&second, "shape+prevtag").as_deref(), Some("upcase+O"));
        assert_eq!(get(&second, "prefix").as_deref(), Some("par"));
    }
}
