//! # Segmentador de Sentenças
//!
//! Detector de fronteiras de sentença baseado em regras, multilíngue (`en`, `fr`, `es`).
//!
//! ## Cascata de Substituições
//!
//! Cada ponto que **não** encerra a sentença é trocado por um caractere sentinela
//! (área de uso privado Unicode, ver [`sentinel`]). No fim, o que sobrou de
//! pontuação terminal marca as fronteiras e os sentinelas voltam ao texto literal.
//! A ordem importa:
//!
//! 1. Normaliza quebras de linha e junta linhas quebradas no meio da frase.
//! 2. Números (`3.14`, `1.` no início da linha).
//! 3. Abreviações (`Mr.`, `etc.`, `J. Smith`, `Co. KG`), ver [`abbreviations`](crate::abbreviations).
//! 4. Abreviações com vários pontos (`N.B.A.`), `a.m./p.m.`, `!!!`, e-mails e URLs.
//! 5. Reticências.
//! 6. Pontuação dentro de aspas, parênteses e colchetes.
//! 7. `?!`, `!?`, `??`, `!!` viram uma fronteira única; `!`/`?` antes de aspas
//!    ou de minúscula não são fronteira.
//! 8. Casamento das fronteiras.
//! 9. Restauração dos sentinelas.
//! 10. Pós-processamento: `"Stop." Then` separa a aspa junto da sentença anterior.
//!
//! ## Offsets
//!
//! Os estágios reescrevem o texto, então cada sentença restaurada é alinhada de
//! volta ao documento original ignorando diferenças de espaço em branco.
//! Todo caractere não-branco do documento pertence a exatamente uma sentença.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use prose_core::segmenter::Segmenter;
//! use prose_core::abbreviations::Language;
//!
//! let seg = Segmenter::new(Language::En).unwrap();
//! let text = "Mr. James plays basketball in the N.B.A., do you? I do.";
//! let sentences = seg.segment(text);
//! assert_eq!(sentences.len(), 2);
//! assert_eq!(sentences[1].text(text), "I do.");
//! ```

use std::borrow::Cow;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::abbreviations::{AbbreviationReplacer, Language, LanguageRules};
use crate::error::{Error, Result};

/// Caracteres reservados pela cascata.
///
/// Invariante: o texto de entrada não contém o intervalo U+E000–U+E01F.
pub mod sentinel {
    /// `.` que não encerra sentença.
    pub const PERIOD: char = '\u{E000}';
    /// `.` entre caracteres de palavra (e-mail, URL, `x.y`).
    pub const INNER_PERIOD: char = '\u{E001}';
    pub const IDEOGRAPHIC_STOP: char = '\u{E002}';
    pub const FULLWIDTH_STOP: char = '\u{E003}';
    pub const FULLWIDTH_EXCLAMATION: char = '\u{E004}';
    pub const EXCLAMATION: char = '\u{E005}';
    pub const QUESTION: char = '\u{E006}';
    pub const FULLWIDTH_QUESTION: char = '\u{E007}';
    pub const APOSTROPHE: char = '\u{E008}';
    /// `...`
    pub const ELLIPSIS: char = '\u{E009}';
    /// ` . . . `
    pub const SPACED_ELLIPSIS: char = '\u{E00A}';
    /// `. . . .`
    pub const SPACED_FOUR_DOTS: char = '\u{E00B}';
    /// `..` (seguido de um `.` real que continua sendo fronteira)
    pub const DOUBLE_PERIOD: char = '\u{E00C}';
    /// Fronteiras compostas: `?!`, `??`, `!?`, `!!`.
    pub const QUESTION_EXCLAMATION: char = '\u{E00D}';
    pub const DOUBLE_QUESTION: char = '\u{E00E}';
    pub const EXCLAMATION_QUESTION: char = '\u{E00F}';
    pub const DOUBLE_EXCLAMATION: char = '\u{E010}';
    /// Fim de linha sem pontuação terminal; some na restauração.
    pub const TEXT_END: char = '\u{E011}';

    /// Texto literal de cada sentinela.
    pub(crate) const RESTORE: &[(char, &str)] = &[
        (PERIOD, "."),
        (INNER_PERIOD, "."),
        (IDEOGRAPHIC_STOP, "。"),
        (FULLWIDTH_STOP, "．"),
        (FULLWIDTH_EXCLAMATION, "！"),
        (EXCLAMATION, "!"),
        (QUESTION, "?"),
        (FULLWIDTH_QUESTION, "？"),
        (APOSTROPHE, "'"),
        (ELLIPSIS, "..."),
        (SPACED_ELLIPSIS, " . . . "),
        (SPACED_FOUR_DOTS, ". . . ."),
        (DOUBLE_PERIOD, ".."),
        (QUESTION_EXCLAMATION, "?!"),
        (DOUBLE_QUESTION, "??"),
        (EXCLAMATION_QUESTION, "!?"),
        (DOUBLE_EXCLAMATION, "!!"),
        (TEXT_END, ""),
    ];

    pub(crate) fn literal(c: char) -> Option<&'static str> {
        RESTORE.iter().find(|(s, _)| *s == c).map(|(_, lit)| *lit)
    }
}

/// Pontuação terminal.
const TERMINALS: &[char] = &['。', '．', '.', '！', '!', '?', '？'];

/// Limite de passadas de uma regra até atingir o ponto fixo.
const MAX_PASSES: usize = 32;

pub(crate) fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| Error::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Regra de substituição: cada grupo de captura que participa de um casamento
/// é trocado por `replacement`; o restante do casamento fica intacto.
///
/// A regra é reaplicada até não haver mais mudança, para cobrir casamentos
/// sobrepostos (`1.2.3`).
#[derive(Debug, Clone)]
pub(crate) struct SubRule {
    pattern: Regex,
    replacement: String,
}

impl SubRule {
    pub(crate) fn new(pattern: &str, replacement: &str) -> Result<Self> {
        Ok(Self {
            pattern: compile(pattern)?,
            replacement: replacement.to_string(),
        })
    }

    fn pass(&self, text: &str) -> Option<String> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        let mut changed = false;
        for caps in self.pattern.captures_iter(text) {
            for group in caps.iter().skip(1).flatten() {
                if group.start() < last {
                    continue;
                }
                out.push_str(&text[last..group.start()]);
                out.push_str(&self.replacement);
                last = group.end();
                changed = true;
            }
        }
        if !changed {
            return None;
        }
        out.push_str(&text[last..]);
        Some(out)
    }

    pub(crate) fn apply(&self, text: &str) -> String {
        let mut current = Cow::Borrowed(text);
        for _ in 0..MAX_PASSES {
            match self.pass(&current) {
                Some(next) if next != *current => current = Cow::Owned(next),
                _ => break,
            }
        }
        current.into_owned()
    }

    pub(crate) fn apply_all(rules: &[SubRule], text: &str) -> String {
        rules
            .iter()
            .fold(text.to_string(), |acc, rule| rule.apply(&acc))
    }
}

/// Uma sentença: intervalo de bytes no documento original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub start: usize,
    pub end: usize,
}

impl Sentence {
    /// Texto da sentença dentro do documento que a originou.
    pub fn text<'a>(&self, document: &'a str) -> &'a str {
        &document[self.start..self.end]
    }
}

/// Segmentador configurado para um idioma. Imutável e compartilhável entre threads.
#[derive(Debug, Clone)]
pub struct Segmenter {
    abbreviations: AbbreviationReplacer,
    clean: Vec<SubRule>,
    numbers: Vec<SubRule>,
    continuous: Regex,
    inner_period: SubRule,
    geo_location: SubRule,
    collapse_space: SubRule,
    ellipses: Vec<SubRule>,
    exclamation_words: Regex,
    quoted: Vec<(Regex, bool)>,
    double_punct: Vec<SubRule>,
    exclamations: Vec<SubRule>,
    question_in_quote: SubRule,
    boundary: Regex,
    quote_end: Regex,
}

impl Segmenter {
    pub fn new(language: Language) -> Result<Self> {
        Self::with_rules(language.rules())
    }

    /// Segmentador com listas de abreviação fornecidas pelo chamador.
    pub fn with_rules(rules: LanguageRules) -> Result<Self> {
        use sentinel::*;
        let s = |c: char| c.to_string();

        Ok(Self {
            abbreviations: AbbreviationReplacer::new(rules)?,
            clean: vec![
                SubRule::new(r"[^\n]\s(\n)\S", "")?,
                SubRule::new(r"(\n)[a-z]", " ")?,
            ],
            numbers: vec![
                SubRule::new(r"(\.)\d", &s(PERIOD))?,
                SubRule::new(r"\d(\.)\S", &s(PERIOD))?,
                SubRule::new(r"\n\d(\.)[\s\S]", &s(PERIOD))?,
                SubRule::new(r"^\d(\.)[\s\S]", &s(PERIOD))?,
                SubRule::new(r"^\d\d(\.)[\s\S]", &s(PERIOD))?,
            ],
            continuous: compile(r"\S[!?]{3,}(?:\s|$)")?,
            inner_period: SubRule::new(r"\w(\.)\w", &s(INNER_PERIOD))?,
            geo_location: SubRule::new(r"[a-zA-Z]°(\.)\s*\d+", &s(PERIOD))?,
            collapse_space: SubRule::new(r"(\s{3,})", " ")?,
            ellipses: vec![
                SubRule::new(r"[^.](\.\.\.)\s+[A-Z]", &format!("{DOUBLE_PERIOD}."))?,
                SubRule::new(r"\S(\.{3})\.\s[A-Z]", &s(ELLIPSIS))?,
                SubRule::new(r"((?:\s\.){3}\s)", &s(SPACED_ELLIPSIS))?,
                SubRule::new(r"[a-z]((?:\.\s){3}\.)$", &s(SPACED_FOUR_DOTS))?,
                SubRule::new(r"(\.\.\.)", &s(ELLIPSIS))?,
            ],
            exclamation_words: compile(
                r"\s(?:!Xũ|!Kung|ǃʼOǃKung|!Xuun|!Kung-Ekoka|ǃHu|ǃKhung|ǃKu|ǃung|ǃXo|ǃXû|ǃXung|ǃXũ|!Xun|Yahoo!|Y!J|Yum!)\s",
            )?,
            quoted: vec![
                (compile(r"\s'(?:[^']|'[a-zA-Z])*'")?, false),
                (compile(r#""(?:[^"\\]+|\\{2}|\\.)*""#)?, true),
                (compile(r"\[(?:[^\]\\]+|\\{2}|\\.)*\]")?, true),
                (compile(r"\((?:[^\(\)\\]+|\\{2}|\\.)*\)")?, true),
                (compile(r"«(?:[^»\\]+|\\{2}|\\.)*»")?, true),
                (compile(r"“(?:[^”\\]+|\\{2}|\\.)*”")?, true),
            ],
            double_punct: vec![
                SubRule::new(r"(\?!)", &s(QUESTION_EXCLAMATION))?,
                SubRule::new(r"(!\?)", &s(EXCLAMATION_QUESTION))?,
                SubRule::new(r"(\?\?)", &s(DOUBLE_QUESTION))?,
                SubRule::new(r"(!!)", &s(DOUBLE_EXCLAMATION))?,
            ],
            exclamations: vec![
                SubRule::new(r#"(!)(?:'|")"#, &s(EXCLAMATION))?,
                SubRule::new(r"(!)(?:,\s[a-z])", &s(EXCLAMATION))?,
                SubRule::new(r"(!)(?:\s[a-z])", &s(EXCLAMATION))?,
            ],
            question_in_quote: SubRule::new(r#"(\?)(?:'|")"#, &s(QUESTION))?,
            boundary: compile(&format!(
                r#"\S.*?[。．.！!?？{TEXT_END}{QUESTION_EXCLAMATION}{DOUBLE_QUESTION}{EXCLAMATION_QUESTION}{DOUBLE_EXCLAMATION}][)\]"'”’»]*"#
            ))?,
            quote_end: compile(r#"[!?.\-]["'”“] [A-Z]"#)?,
        })
    }

    /// Divide o texto em sentenças com offsets no original.
    pub fn segment(&self, text: &str) -> Vec<Sentence> {
        let pieces = self.split(text);
        let sentences = align_all(text, &pieces);
        debug!(pieces = pieces.len(), sentences = sentences.len(), "segmented");
        sentences
    }

    /// Divide o texto em sentenças (texto restaurado, sem offsets).
    pub fn split(&self, text: &str) -> Vec<String> {
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        let mut text = SubRule::apply_all(&self.clean, &text);
        text = SubRule::apply_all(&self.numbers, &text);
        text = self.abbreviations.replace(&text);
        text = self
            .continuous
            .replace_all(&text, |caps: &Captures| {
                caps[0]
                    .replace('!', &sentinel::EXCLAMATION.to_string())
                    .replace('?', &sentinel::QUESTION.to_string())
            })
            .into_owned();
        text = self.inner_period.apply(&text);
        text = self.geo_location.apply(&text);

        let mut sentences = Vec::new();
        for line in text.split('\n') {
            let line = self.collapse_space.apply(line);
            let line = SubRule::apply_all(&self.ellipses, &line);
            let segments = if line.contains(TERMINALS) {
                self.split_line(line)
            } else {
                vec![line]
            };
            for segment in segments {
                sentences.extend(self.post_process(&restore(&segment)));
            }
        }
        sentences
    }

    /// Estágios 6 a 8 sobre uma linha com pontuação terminal.
    fn split_line(&self, mut line: String) -> Vec<String> {
        if !line.ends_with(TERMINALS) {
            line.push(sentinel::TEXT_END);
        }
        line = mask_matches(&self.exclamation_words, &line, true);
        for (pattern, apostrophes) in &self.quoted {
            line = mask_matches(pattern, &line, *apostrophes);
        }
        line = SubRule::apply_all(&self.double_punct, &line);
        line = SubRule::apply_all(&self.exclamations, &line);
        line = self.question_in_quote.apply(&line);

        self.boundary
            .find_iter(&line)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Separa `"Stop." Then` mantendo a aspa na sentença anterior.
    fn post_process(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut rest = text;
        while let Some(m) = self.quote_end.find(rest) {
            // `m` termina em espaço + maiúscula ASCII
            let cut = m.end() - 2;
            out.push(rest[..cut].trim().to_string());
            rest = &rest[cut + 1..];
        }
        out.push(rest.trim().to_string());
        out.retain(|s| !s.is_empty());
        out
    }
}

/// Troca a pontuação dentro de cada casamento de `pattern` por sentinelas.
fn mask_matches(pattern: &Regex, text: &str, apostrophes: bool) -> String {
    let found: Vec<String> = pattern
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();
    let mut text = text.to_string();
    for m in found {
        let masked: String = m
            .chars()
            .map(|c| match c {
                '.' => sentinel::PERIOD,
                '。' => sentinel::IDEOGRAPHIC_STOP,
                '．' => sentinel::FULLWIDTH_STOP,
                '！' => sentinel::FULLWIDTH_EXCLAMATION,
                '!' => sentinel::EXCLAMATION,
                '?' => sentinel::QUESTION,
                '？' => sentinel::FULLWIDTH_QUESTION,
                '\'' if apostrophes => sentinel::APOSTROPHE,
                other => other,
            })
            .collect();
        if masked != m {
            text = text.replace(&m, &masked);
        }
    }
    text
}

/// Estágio 9: cada sentinela volta a ser o texto literal.
fn restore(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match sentinel::literal(c) {
            Some(lit) => out.push_str(lit),
            None => out.push(c),
        }
    }
    out
}

/// Alinha `sentence` ao documento a partir de `from`, ignorando espaço em branco.
fn align(document: &str, from: usize, sentence: &str) -> Option<(usize, usize)> {
    let mut doc = document[from..]
        .char_indices()
        .map(|(i, c)| (from + i, c))
        .filter(|(_, c)| !c.is_whitespace());
    let mut expected = sentence.chars().filter(|c| !c.is_whitespace());

    let first = expected.next()?;
    let (start, c) = doc.next()?;
    if c != first {
        return None;
    }
    let mut end = start + c.len_utf8();
    for want in expected {
        let (i, c) = doc.next()?;
        if c != want {
            return None;
        }
        end = i + c.len_utf8();
    }
    Some((start, end))
}

/// Primeiro caractere não-branco a partir de `from`.
fn skip_whitespace(document: &str, from: usize) -> usize {
    document[from..]
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map_or(document.len(), |(i, _)| from + i)
}

/// Converte as sentenças restauradas em intervalos do original, garantindo que
/// nenhum trecho não-branco fique de fora.
fn align_all(document: &str, pieces: &[String]) -> Vec<Sentence> {
    let mut sentences: Vec<Sentence> = Vec::with_capacity(pieces.len());
    let mut cursor = 0;

    for piece in pieces {
        let here = skip_whitespace(document, cursor);
        let found = align(document, here, piece).or_else(|| {
            let first = piece.chars().find(|c| !c.is_whitespace())?;
            document[here..]
                .match_indices(first)
                .find_map(|(i, _)| align(document, here + i, piece))
        });
        match found {
            Some((start, end)) => {
                // Texto pulado pelo alinhamento passa a fazer parte desta sentença.
                let start = start.min(here);
                sentences.push(Sentence { start, end });
                cursor = end;
            }
            None => warn!(sentence = %piece, "could not align sentence to source text"),
        }
    }

    let tail = skip_whitespace(document, cursor);
    if tail < document.len() {
        let end = document.trim_end().len();
        match sentences.last_mut() {
            Some(last) => last.end = end,
            None => sentences.push(Sentence { start: tail, end }),
        }
    }
    sentences
}
