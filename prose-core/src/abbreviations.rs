//! # Abreviações por Idioma
//!
//! Listas usadas pelo [`Segmenter`](crate::segmenter::Segmenter) para decidir se
//! o ponto depois de uma palavra encerra a sentença ou faz parte de uma abreviação.
//!
//! | Lista          | Efeito                                                        |
//! |----------------|---------------------------------------------------------------|
//! | `abbreviations`| candidatas a mascaramento (`etc.`, `Inc.`, `e.g.`)             |
//! | `prepositive`  | sempre precedem outra palavra (`Dr.`, `Mr.`, `Prof.`)          |
//! | `number`       | precedem números (`No. 5`, `p. 12`, `Art. (3)`)                |
//! | `starters`     | palavras que começam sentença após `U.S.`, `U.K.`, `I.`        |
//!
//! Entradas com espaço interno (`bs. as`) não participam da varredura palavra a
//! palavra e são ignoradas.

use std::collections::HashSet;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::segmenter::{compile, sentinel, SubRule};

/// Idiomas com listas embutidas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Fr,
    Es,
}

impl Default for Language {
    fn default() -> Self {
        Language::En
    }
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Fr => "fr",
            Language::Es => "es",
        }
    }

    /// Tenta parsear a partir do código ISO (ex: "fr" → Some(Fr)).
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "en" => Some(Language::En),
            "fr" => Some(Language::Fr),
            "es" => Some(Language::Es),
            _ => None,
        }
    }

    pub fn rules(&self) -> LanguageRules {
        match self {
            Language::En => LanguageRules::new(EN_ABBREVIATIONS, EN_PREPOSITIVE, EN_NUMBER, EN_STARTERS),
            Language::Fr => LanguageRules::new(FR_ABBREVIATIONS, &[], &[], &[]),
            Language::Es => LanguageRules::new(ES_ABBREVIATIONS, ES_PREPOSITIVE, ES_NUMBER, &[]),
        }
    }
}

/// Listas de um idioma, normalizadas em caixa baixa.
#[derive(Debug, Clone, Default)]
pub struct LanguageRules {
    pub abbreviations: HashSet<String>,
    pub prepositive: HashSet<String>,
    pub number: HashSet<String>,
    pub starters: Vec<String>,
}

impl LanguageRules {
    pub fn new<S: AsRef<str>>(
        abbreviations: &[S],
        prepositive: &[S],
        number: &[S],
        starters: &[S],
    ) -> Self {
        let set = |items: &[S]| -> HashSet<String> {
            items
                .iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty() && !s.contains(char::is_whitespace))
                .collect()
        };
        Self {
            abbreviations: set(abbreviations),
            prepositive: set(prepositive),
            number: set(number),
            starters: starters.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }
}

/// Mascara os pontos de abreviações (estágio 3 e 4 da cascata).
#[derive(Debug, Clone)]
pub(crate) struct AbbreviationReplacer {
    rules: LanguageRules,
    /// Palavras com mais bytes que isso não podem estar na lista.
    longest: usize,
    possessive: SubRule,
    kommanditgesellschaft: SubRule,
    single_upper: Vec<SubRule>,
    multi_period: Regex,
    am_pm: Vec<SubRule>,
    boundary: Option<SubRule>,
    prepositive_follow: Regex,
    number_follow: Regex,
    period_follow: Regex,
}

impl AbbreviationReplacer {
    pub(crate) fn new(rules: LanguageRules) -> Result<Self> {
        let p = sentinel::PERIOD;
        let am_pm = ["P{p}M", "A{p}M", "p{p}m", "a{p}m"]
            .iter()
            .map(|form| SubRule::new(&format!(r"{}({p})\s[A-Z]", form.replace("{p}", &p.to_string())), "."))
            .collect::<Result<Vec<_>>>()?;

        let boundary = if rules.starters.is_empty() {
            None
        } else {
            let starters: Vec<String> = rules.starters.iter().map(|s| regex::escape(s)).collect();
            let pattern = format!(
                r"(?:U{p}S{p}A|U\.S\.A|U{p}S|U\.S|U{p}K|U\.K|E{p}U|E\.U|I|(?i:i\.v))({p})\s(?:{})\s",
                starters.join("|")
            );
            Some(SubRule::new(&pattern, ".")?)
        };

        // um caractere em caixa baixa vem de um caractere de até 4 bytes
        let longest = rules
            .abbreviations
            .iter()
            .map(|a| a.chars().count() * 4)
            .max()
            .unwrap_or(0);

        Ok(Self {
            longest,
            possessive: SubRule::new(r"(\.)'s\s|(\.)'s$", &p.to_string())?,
            kommanditgesellschaft: SubRule::new(r"Co(\.)\sKG", &p.to_string())?,
            single_upper: vec![
                SubRule::new(r"^[A-Z](\.)\s", &p.to_string())?,
                SubRule::new(r"\s[A-Z](\.)\s", &p.to_string())?,
            ],
            multi_period: compile(r"(?i)\b[a-z](?:\.[a-z])+[.]")?,
            am_pm,
            boundary,
            prepositive_follow: compile(r"^(?:\s|:\d)")?,
            number_follow: compile(r"^(?:\s\d|\s+\()")?,
            period_follow: compile(r"^(?:[.:\-?,]|\s(?:[a-z]|I\s|I'm|I'll|\d))")?,
            rules,
        })
    }

    pub(crate) fn replace(&self, text: &str) -> String {
        let mut text = self.possessive.apply(text);
        text = self.kommanditgesellschaft.apply(&text);
        text = SubRule::apply_all(&self.single_upper, &text);
        text = self.mask_listed(&text);
        text = self
            .multi_period
            .replace_all(&text, |caps: &Captures| {
                caps[0].replace('.', &sentinel::PERIOD.to_string())
            })
            .into_owned();
        text = SubRule::apply_all(&self.am_pm, &text);
        match &self.boundary {
            Some(rule) => rule.apply(&text),
            None => text,
        }
    }

    /// Percorre o texto uma vez; a cada ponto, se a palavra que o antecede
    /// (delimitada por espaço ou início) está na lista, decide pelo contexto
    /// seguinte.
    fn mask_listed(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        let mut word_start = 0;
        for (i, c) in text.char_indices() {
            if c.is_whitespace() {
                word_start = i + c.len_utf8();
                continue;
            }
            if c != '.' {
                continue;
            }
            let word = &text[word_start..i];
            if word.is_empty() || word.len() > self.longest {
                continue;
            }
            let key = word.to_lowercase();
            if !self.rules.abbreviations.contains(&key) {
                continue;
            }
            if self.should_mask(&key, &text[i + 1..]) {
                out.push_str(&text[last..i]);
                out.push(sentinel::PERIOD);
                last = i + 1;
            }
        }
        out.push_str(&text[last..]);
        out
    }

    fn should_mask(&self, abbr: &str, after: &str) -> bool {
        let prepositive = self.rules.prepositive.contains(abbr);
        let next_upper = after
            .strip_prefix(' ')
            .and_then(|rest| rest.chars().next())
            .is_some_and(char::is_uppercase);
        if next_upper && !prepositive {
            return false;
        }
        if prepositive {
            self.prepositive_follow.is_match(after)
        } else if self.rules.number.contains(abbr) {
            self.number_follow.is_match(after)
        } else {
            self.period_follow.is_match(after)
        }
    }
}

const EN_ABBREVIATIONS: &[&str] = &[
    "adj", "adm", "adv", "al", "ala", "alta", "apr", "arc", "ariz", "ark", "art", "assn", "asst",
    "attys", "aug", "ave", "bart", "bld", "bldg", "blvd", "brig", "bros", "btw", "cal", "calif",
    "capt", "cl", "cmdr", "co", "col", "colo", "comdr", "con", "conn", "corp", "cpl", "cres", "ct",
    "d.phil", "dak", "dec", "del", "dept", "det", "dist", "dr", "dr.phil", "dr.philos", "drs",
    "e.g", "ens", "esp", "esq", "etc", "exp", "expy", "ext", "feb", "fed", "fla", "ft", "fwy",
    "fy", "ga", "gen", "gov", "hon", "hosp", "hr", "hway", "hwy", "i.e", "ia", "id", "ida", "ill",
    "inc", "ind", "ing", "insp", "is", "jan", "jr", "jul", "jun", "kan", "kans", "ken", "ky", "la",
    "lt", "ltd", "maj", "man", "mar", "mass", "may", "md", "me", "med", "messrs", "mex", "mfg",
    "mich", "min", "minn", "miss", "mlle", "mm", "mme", "mo", "mont", "mr", "mrs", "ms", "msgr",
    "mssrs", "mt", "mtn", "neb", "nebr", "nev", "no", "nos", "nov", "nr", "oct", "ok", "okla",
    "ont", "op", "ord", "ore", "p", "pa", "pd", "pde", "penn", "penna", "pfc", "ph", "ph.d", "pl",
    "plz", "pp", "prof", "pvt", "que", "rd", "ref", "rep", "reps", "res", "rev", "rt", "sask",
    "sec", "sen", "sens", "sep", "sept", "sfc", "sgt", "sr", "st", "supt", "surg", "tce", "tenn",
    "tex", "univ", "usafa", "u.s", "ut", "va", "v", "ver", "vs", "vt", "wash", "wis", "wisc", "wy",
    "wyo", "yuk",
];

const EN_PREPOSITIVE: &[&str] = &[
    "adm", "attys", "brig", "capt", "cmdr", "col", "cpl", "det", "dr", "gen", "gov", "ing", "lt",
    "maj", "mr", "mrs", "ms", "mt", "messrs", "mssrs", "prof", "ph", "rep", "reps", "rev", "sen",
    "sens", "sgt", "st", "supt", "v", "vs",
];

const EN_NUMBER: &[&str] = &["art", "ext", "no", "nos", "p", "pp"];

const EN_STARTERS: &[&str] = &[
    "A", "Being", "Did", "For", "He", "How", "However", "I", "In", "It", "Millions", "More",
    "She", "That", "The", "There", "They", "We", "What", "When", "Where", "Who", "Why",
];

const FR_ABBREVIATIONS: &[&str] = &[
    "a.c.n", "a.m", "al", "ann", "apr", "art", "auj", "av", "b.p", "boul", "c.-à-d", "c.n",
    "c.n.s", "c.p.i", "c.q.f.d", "c.s", "ca", "cf", "ch.-l", "chap", "co", "contr", "dir", "e.g",
    "e.v", "env", "etc", "ex", "fasc", "fig", "fr", "fém", "hab", "i.e", "ibid", "id", "inf",
    "l.d", "lib", "ll.aa", "ll.aa.ii", "ll.aa.rr", "ll.aa.ss", "ll.ee", "ll.mm", "ll.mm.ii.rr",
    "loc.cit", "ltd", "masc", "mm", "ms", "n.b", "n.d", "n.d.a", "n.d.l.r", "n.d.t", "n.p.a.i",
    "n.s", "n/réf", "nn.ss", "p.c.c", "p.ex", "p.j", "p.s", "pl", "pp", "r.-v", "r.a.s", "r.i.p",
    "r.p", "s.a", "s.a.i", "s.a.r", "s.a.s", "s.e", "s.m", "s.m.i.r", "s.s", "sec", "sect",
    "sing", "sq", "sqq", "ss", "suiv", "sup", "suppl", "t.s.v.p", "tél", "vb", "vol", "vs", "x.o",
    "z.i", "éd",
];

const ES_ABBREVIATIONS: &[&str] = &[
    "a.c", "a/c", "abr", "adj", "admón", "afmo", "ago", "almte", "ap", "apdo", "arq", "art",
    "atte", "av", "avda", "bco", "bibl", "c", "c.f", "c.g", "c/c", "c/u", "cap", "cc.aa", "cdad",
    "cm", "co", "cra", "cta", "cv", "d.e.p", "da", "dcha", "dcho", "dep", "dic", "dicc", "dir",
    "dn", "doc", "dom", "dpto", "dr", "dra", "dto", "ee", "ej", "en", "entlo", "esq", "etc",
    "excmo", "ext", "f.c", "fca", "fdo", "febr", "ff.cc", "fig", "fil", "fra", "g.p", "g/p", "gob",
    "gr", "gral", "grs", "hnos", "hs", "igl", "iltre", "imp", "impr", "impto", "incl", "ing",
    "inst", "izdo", "izq", "izqdo", "j.c", "jue", "jul", "jun", "kg", "km", "lcdo", "ldo", "let",
    "lic", "ltd", "lun", "mar", "may", "mg", "min", "mié", "mm", "máx", "mín", "mt", "n.b", "no",
    "nov", "núm", "oct", "p", "p.a", "p.d", "p.ej", "p.v.p", "párrf", "ppal", "prev", "prof",
    "prov", "ptas", "pts", "pza", "pág", "págs", "párr", "q.e.g.e", "q.e.p.d", "q.e.s.m", "reg",
    "rep", "rte", "s", "s.a.r", "s.e", "s.l", "s.r.c", "s.r.l", "s.s.s", "s/n", "sdad", "seg",
    "sept", "sig", "sr", "sra", "sres", "srta", "sta", "sto", "sáb", "t.v.e", "tamb", "tel",
    "tfno", "ud", "uu", "uds", "univ", "v.b", "v.e", "vd", "vds", "vid", "vie", "vol", "vs", "vto",
    "a", "aero", "ambi", "an", "anfi", "ante", "anti", "archi", "arci", "auto", "bi", "bien",
    "bis", "com", "con", "contra", "crio", "cuadri", "cuasi", "cuatri", "de", "deci", "des", "di",
    "dis", "ecto", "endo", "entre", "epi", "equi", "ex", "extra", "geo", "hemi", "hetero", "hiper",
    "hipo", "homo", "i", "im", "in", "infra", "inter", "intra", "iso", "macro", "mega", "micro",
    "mini", "mono", "multi", "neo", "omni", "para", "pen", "ph", "ph.d", "pluri", "poli", "pos",
    "post", "pre", "pro", "pseudo", "re", "retro", "semi", "seudo", "sobre", "sub", "super",
    "supra", "trans", "tras", "tri", "ulter", "ultra", "un", "uni", "vice", "yuxta",
];

const ES_PREPOSITIVE: &[&str] = &[
    "a", "aero", "ambi", "an", "anfi", "ante", "anti", "archi", "arci", "auto", "bi", "bien",
    "bis", "co", "com", "con", "contra", "crio", "cuadri", "cuasi", "cuatri", "de", "deci", "des",
    "di", "dis", "dr", "ecto", "ee", "en", "endo", "entre", "epi", "equi", "ex", "extra", "geo",
    "hemi", "hetero", "hiper", "hipo", "homo", "i", "im", "in", "infra", "inter", "intra", "iso",
    "lic", "macro", "mega", "micro", "mini", "mono", "mt", "multi", "neo", "omni", "para", "pen",
    "ph", "ph.d", "pluri", "poli", "pos", "post", "pre", "pro", "prof", "pseudo", "re", "retro",
    "semi", "seudo", "sobre", "sub", "super", "supra", "sra", "srta", "trans", "tras", "tri",
    "ulter", "ultra", "un", "uni", "vice", "yuxta",
];

const ES_NUMBER: &[&str] = &["cra", "ext", "no", "nos", "p", "pp", "tel"];
