//! # Tabelas de Regras do Tokenizador
//!
//! Conjuntos imutáveis de padrões consultados pelo [`IterTokenizer`](crate::tokenizer::IterTokenizer):
//!
//! | Tabela        | Padrão (inglês)                          | Papel                                   |
//! |---------------|------------------------------------------|-----------------------------------------|
//! | Sanitizador   | aspas curvas, `&rsquo;`, `\r\n`, `\r`    | normaliza o texto antes de dividir      |
//! | Prefixos      | `$ ( " [`                                | removidos do início do span             |
//! | Sufixos       | `, ) " ] ! ; . ? : '`                    | removidos do fim do span                |
//! | Contrações    | `'ll 's 're 'm n't`                      | ponto de corte interno                  |
//! | Emoticons     | `:-)`, `<3`, `¯\_(ツ)_/¯` ...            | spans nunca divididos                   |
//! | Especial      | `^(?:[A-Za-z]\.){2,}$` + lista de títulos | abreviações (`U.S.`), títulos (`Mr.`) e meses (`Nov.`) |
//!
//! As tabelas são montadas uma única vez (por [`TokenizerRules::english`] ou
//! pelo [`TokenizerBuilder`](crate::tokenizer::TokenizerBuilder)) e compartilhadas
//! via `Arc` entre documentos e threads.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use aho_corasick::{AhoCorasick, MatchKind};
use regex::Regex;

use crate::error::{Error, Result};

/// Regex de tokens "especiais": abreviações com vários pontos e as abreviações
/// de título, sufixo de nome e mês que precedem outra palavra.
pub const DEFAULT_SPECIAL: &str = concat!(
    r"^(?:[A-Za-z]\.){2,}$",
    r"|^(?:Mr|Mrs|Ms|Messrs|Dr|Drs|Prof|Rev|Hon|Gen|Gov|Sen|Rep|Capt|Col|Lt|Maj|Sgt|Cpl|Adm|Cmdr|Det|Supt|Jr|Sr|Esq|St|Mt|Ft)\.$",
    r"|^(?:Jan|Feb|Mar|Apr|Jun|Jul|Aug|Sep|Sept|Oct|Nov|Dec)\.$",
);

pub const DEFAULT_PREFIXES: &[&str] = &["$", "(", "\"", "["];

pub const DEFAULT_SUFFIXES: &[&str] = &[",", ")", "\"", "]", "!", ";", ".", "?", ":", "'"];

pub const DEFAULT_CONTRACTIONS: &[&str] = &["'ll", "'s", "'re", "'m", "n't"];

pub const DEFAULT_SANITIZER: &[(&str, &str)] = &[
    ("\u{201c}", "\""),
    ("\u{201d}", "\""),
    ("\u{2018}", "'"),
    ("\u{2019}", "'"),
    ("&rsquo;", "'"),
    ("\r\n", "\n"),
    ("\r", "\n"),
];

/// Emoticons reconhecidos como unidades indivisíveis.
pub const DEFAULT_EMOTICONS: &[&str] = &[
    "(-8", "(-;", "(-_-)", "(._.)", "(:", "(=", "(o:", "(¬_¬)", "(ಠ_ಠ)", "(╯°□°）╯︵┻━┻",
    "-__-", "8-)", "8-D", "8D", ":'(", ":')", ":'-(", ":'-)", ":(", ":((", ":(((", ":()",
    ":)", ":))", ":)))", ":*", ":-(", ":-((", ":-(((", ":-)", ":-))", ":-)))", ":-*", ":-/",
    ":-0", ":-3", ":->", ":-D", ":-O", ":-P", ":-X", ":-]", ":-o", ":-p", ":-x", ":-|",
    ":-}", ":/", ":0", ":1", ":3", ":>", ":D", ":O", ":P", ":X", ":]", ":o", ":o)", ":p",
    ":x", ":|", ":}", ":’(", ":’)", ":’-(", ":’-)", ";)", ";-)", ";-D", ";D", ";_;", "<.<",
    "</3", "<3", "<33", "<333", "=(", "=)", "=/", "=3", "=D", "=[", "=]", "=|",
    ">.<", ">.>", ">:(", ">:o", "><(((*>", "@_@", "C:", "D:", "O.O", "O.o", "O_O", "O_o",
    "V.V", "V_V", "XD", "XDD", "Xp", "^_^", "^___^", "o.O", "o.o", "o_O", "o_o", "v.v",
    "v_v", "xD", "xDD", "xp", "¯\\(ツ)/¯", "¯\\_(ツ)_/¯", "ಠ_ಠ", "ಠ︵ಠ", "♥", "♥‿♥",
    "(ง'̀-'́)ง",
];

/// Predicado do chamador para spans que nunca devem ser divididos.
pub type Unsplittable = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Tabelas de regras já compiladas.
#[derive(Clone)]
pub struct TokenizerRules {
    pub(crate) sanitizer: Sanitizer,
    pub(crate) prefixes: Vec<String>,
    pub(crate) suffixes: Vec<String>,
    pub(crate) contractions: Vec<String>,
    pub(crate) emoticons: HashSet<String>,
    /// Maior emoticon em bytes; spans maiores nem consultam o conjunto.
    pub(crate) longest_emoticon: usize,
    pub(crate) special: Regex,
    pub(crate) unsplittable: Option<Unsplittable>,
}

impl TokenizerRules {
    /// Tabelas padrão para inglês.
    pub fn english() -> Self {
        Self::from_parts(
            DEFAULT_SANITIZER,
            DEFAULT_PREFIXES,
            DEFAULT_SUFFIXES,
            DEFAULT_CONTRACTIONS,
            DEFAULT_EMOTICONS,
            DEFAULT_SPECIAL,
            None,
        )
        .expect("built-in tokenizer tables are valid")
    }

    pub(crate) fn from_parts<S: AsRef<str>>(
        sanitizer: &[(S, S)],
        prefixes: &[S],
        suffixes: &[S],
        contractions: &[S],
        emoticons: &[S],
        special: &str,
        unsplittable: Option<Unsplittable>,
    ) -> Result<Self> {
        let owned = |items: &[S]| -> Vec<String> {
            items
                .iter()
                .map(|s| s.as_ref().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        };
        let special = Regex::new(special).map_err(|source| Error::InvalidPattern {
            pattern: special.to_string(),
            source,
        })?;
        let emoticons: HashSet<String> = owned(emoticons).into_iter().collect();
        Ok(Self {
            sanitizer: Sanitizer::new(sanitizer)?,
            prefixes: owned(prefixes),
            suffixes: owned(suffixes),
            contractions: owned(contractions)
                .into_iter()
                .map(|c| c.to_lowercase())
                .collect(),
            longest_emoticon: emoticons.iter().map(String::len).max().unwrap_or(0),
            emoticons,
            special,
            unsplittable,
        })
    }

    /// O span inteiro deve ser emitido sem divisão?
    pub fn is_special(&self, span: &str) -> bool {
        (span.len() <= self.longest_emoticon && self.emoticons.contains(span))
            || self.special.is_match(span)
            || self.unsplittable.as_ref().is_some_and(|f| f(span))
    }

    /// Prefixo configurado no início de `span`, se houver.
    pub fn prefix_of(&self, span: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|p| span.starts_with(p.as_str()))
            .map(String::as_str)
    }

    /// Sufixo configurado no fim de `span`, se houver.
    pub fn suffix_of(&self, span: &str) -> Option<&str> {
        self.suffixes
            .iter()
            .find(|s| span.ends_with(s.as_str()))
            .map(String::as_str)
    }

    /// Todas as ocorrências de contrações em `span` (comparação sem distinção
    /// de caixa), como `(offset_em_bytes, tamanho_em_bytes)`.
    ///
    /// Ordenadas por posição; em empate vence a contração declarada primeiro.
    /// O span é convertido para caixa baixa uma única vez.
    pub fn contraction_sites(&self, span: &str) -> Vec<(usize, usize)> {
        let lower = span.to_lowercase();
        // Só é seguro mapear offsets de volta quando a caixa baixa preserva o layout.
        if lower.len() != span.len() {
            return Vec::new();
        }
        let mut sites = Vec::new();
        for (order, contraction) in self.contractions.iter().enumerate() {
            let mut from = 0;
            while let Some(found) = lower[from..].find(contraction.as_str()) {
                let idx = from + found;
                let end = idx + contraction.len();
                if span.is_char_boundary(idx) && span.is_char_boundary(end) {
                    sites.push((idx, order, contraction.len()));
                }
                from = idx + lower[idx..].chars().next().map_or(1, char::len_utf8);
            }
        }
        sites.sort_unstable();
        sites.into_iter().map(|(idx, _, len)| (idx, len)).collect()
    }

    pub fn sanitizer(&self) -> &Sanitizer {
        &self.sanitizer
    }
}

impl Default for TokenizerRules {
    fn default() -> Self {
        Self::english()
    }
}

impl fmt::Debug for TokenizerRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenizerRules")
            .field("prefixes", &self.prefixes)
            .field("suffixes", &self.suffixes)
            .field("contractions", &self.contractions)
            .field("emoticons", &self.emoticons.len())
            .field("special", &self.special.as_str())
            .field("unsplittable", &self.unsplittable.is_some())
            .finish()
    }
}

/// Substituição literal em uma única passada (mais à esquerda, primeiro padrão
/// declarado vence), preservando o mapa de origem de cada byte.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    matcher: Option<AhoCorasick>,
    replacements: Vec<String>,
}

/// Texto sanitizado e o offset original de cada um dos seus bytes.
///
/// `origin` tem `text.len() + 1` entradas; a última aponta para o fim do original.
#[derive(Debug, Clone, PartialEq)]
pub struct Sanitized {
    pub text: String,
    pub origin: Vec<usize>,
}

impl Sanitized {
    /// Converte um intervalo do texto sanitizado em um intervalo do original.
    ///
    /// O fim é o início original do próximo byte, de modo que substituições
    /// multi-byte (`&rsquo;` → `'`) são cobertas por inteiro.
    pub fn original_range(&self, start: usize, end: usize) -> (usize, usize) {
        let s = self.origin[start];
        let e = if end > start {
            // Último byte do intervalo pertence a uma substituição: avança até o fim dela.
            let last = self.origin[end - 1];
            let next = self.origin[end];
            if next > last { next } else { last + 1 }
        } else {
            s
        };
        (s, e)
    }
}

impl Sanitizer {
    pub fn new<S: AsRef<str>>(pairs: &[(S, S)]) -> Result<Self> {
        let pairs: Vec<(&str, &str)> = pairs
            .iter()
            .map(|(a, b)| (a.as_ref(), b.as_ref()))
            .filter(|(a, _)| !a.is_empty())
            .collect();
        if pairs.is_empty() {
            return Ok(Self {
                matcher: None,
                replacements: Vec::new(),
            });
        }
        let matcher = AhoCorasick::builder()
            .match_kind(MatchKind::LeftmostFirst)
            .build(pairs.iter().map(|(a, _)| *a))
            .map_err(|e| Error::InvalidSanitizer(e.to_string()))?;
        Ok(Self {
            matcher: Some(matcher),
            replacements: pairs.iter().map(|(_, b)| b.to_string()).collect(),
        })
    }

    /// Aplica as substituições. Bytes inseridos por uma substituição apontam
    /// para o início do trecho original que ela cobre.
    pub fn apply(&self, text: &str) -> Sanitized {
        let mut out = String::with_capacity(text.len());
        let mut origin = Vec::with_capacity(text.len() + 1);
        let mut last = 0;

        if let Some(matcher) = &self.matcher {
            for m in matcher.find_iter(text) {
                out.push_str(&text[last..m.start()]);
                origin.extend(last..m.start());
                let replacement = &self.replacements[m.pattern().as_usize()];
                out.push_str(replacement);
                origin.extend(std::iter::repeat(m.start()).take(replacement.len()));
                last = m.end();
            }
        }
        out.push_str(&text[last..]);
        origin.extend(last..text.len());
        origin.push(text.len());

        Sanitized { text: out, origin }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_special_patterns() {
        let rules = TokenizerRules::english();
        assert!(rules.is_special("U.S."));
        assert!(rules.is_special("Mr."));
        assert!(rules.is_special("Mrs."));
        assert!(rules.is_special(":-)"));
        assert!(rules.is_special("Nov."));
        assert!(!rules.is_special("basketball."));
        assert!(!rules.is_special("Mister."));
    }

    #[test]
    fn test_short_capitalised_words_are_not_special() {
        let rules = TokenizerRules::english();
        for word in ["Bob.", "Yes.", "Now.", "Ann.", "It."] {
            assert!(!rules.is_special(word), "{word} should split off its period");
        }
    }

    #[test]
    fn test_unsplittable_predicate() {
        let pred: Unsplittable = Arc::new(|s: &str| s.starts_with('#'));
        let rules = TokenizerRules::from_parts(
            DEFAULT_SANITIZER,
            DEFAULT_PREFIXES,
            DEFAULT_SUFFIXES,
            DEFAULT_CONTRACTIONS,
            DEFAULT_EMOTICONS,
            DEFAULT_SPECIAL,
            Some(pred),
        )
        .unwrap();
        assert!(rules.is_special("#rustlang!"));
    }

    #[test]
    fn test_contraction_sites() {
        let rules = TokenizerRules::english();
        assert_eq!(rules.contraction_sites("They'll"), [(4, 3)]);
        assert_eq!(rules.contraction_sites("wasn't"), [(3, 3)]);
        assert_eq!(rules.contraction_sites("HE'S"), [(2, 2)]);
        assert_eq!(rules.contraction_sites("He's're"), [(2, 2), (4, 3)]);
        assert!(rules.contraction_sites("happy").is_empty());
    }

    #[test]
    fn test_overlapping_contraction_sites() {
        let rules = TokenizerRules::from_parts(
            DEFAULT_SANITIZER,
            DEFAULT_PREFIXES,
            DEFAULT_SUFFIXES,
            &["aa", "a"][..],
            DEFAULT_EMOTICONS,
            DEFAULT_SPECIAL,
            None,
        )
        .unwrap();
        // mesma posição: a contração declarada primeiro vem antes
        assert_eq!(rules.contraction_sites("aaa"), [(0, 2), (0, 1), (1, 2), (1, 1), (2, 1)]);
    }

    #[test]
    fn test_invalid_special_regex() {
        let err = TokenizerRules::from_parts(
            DEFAULT_SANITIZER,
            DEFAULT_PREFIXES,
            DEFAULT_SUFFIXES,
            DEFAULT_CONTRACTIONS,
            DEFAULT_EMOTICONS,
            "(",
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }

    #[test]
    fn test_sanitizer_origin_map() {
        let s = Sanitizer::new(DEFAULT_SANITIZER).unwrap();
        let out = s.apply("a\r\nb&rsquo;s");
        assert_eq!(out.text, "a\nb's");
        assert_eq!(out.origin, vec![0, 1, 3, 4, 11, 12]);
        // "'s" no texto sanitizado cobre "&rsquo;s" no original
        assert_eq!(out.original_range(3, 5), (4, 12));
        assert_eq!(out.original_range(2, 3), (3, 4));
    }

    #[test]
    fn test_sanitizer_curly_quotes() {
        let s = Sanitizer::new(DEFAULT_SANITIZER).unwrap();
        let out = s.apply("\u{201c}hi\u{201d}");
        assert_eq!(out.text, "\"hi\"");
        assert_eq!(out.original_range(0, 1), (0, 3));
        assert_eq!(out.original_range(1, 3), (3, 5));
        assert_eq!(out.original_range(3, 4), (5, 8));
    }
}
