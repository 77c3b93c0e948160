//! # Erros do prose-core
//!
//! Apenas falhas de **construção** são reportadas como erro: modelos malformados,
//! tabelas inconsistentes, regex inválida ou um pipeline configurado para uma etapa
//! sem o modelo correspondente. A inferência (tokenizar, segmentar, taguear,
//! extrair) é total e nunca falha.

use std::path::PathBuf;

use thiserror::Error;

/// Erros de carregamento e configuração.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Falha ao ler ou desserializar uma tabela de modelo.
    #[error("failed to decode model table `{table}`: {source}")]
    ModelDecode {
        table: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Falha ao abrir um arquivo de modelo.
    #[error("failed to read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Tabelas do modelo presentes, mas inconsistentes entre si.
    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// Padrão de regex fornecido pelo usuário não compila.
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Falha ao montar o sanitizador (pares de substituição).
    #[error("invalid sanitizer: {0}")]
    InvalidSanitizer(String),

    /// Etapa habilitada sem o modelo que ela exige.
    #[error("{stage} requires a model but none was supplied")]
    MissingModel { stage: &'static str },
}

/// Alias de resultado do crate.
pub type Result<T> = std::result::Result<T, Error>;
