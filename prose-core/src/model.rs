//! # Modelo Carregado
//!
//! Um [`Model`] agrupa, com um nome, o modelo de POS tagging e (opcionalmente)
//! o modelo de entidades. É imutável e compartilhado via `Arc` entre threads e
//! pipelines.
//!
//! ## Layout em Disco
//!
//! ```text
//! <dir>/
//! ├── AveragedPerceptron/
//! │   ├── classes.json
//! │   ├── tags.json
//! │   └── weights.json
//! └── Maxent/            (opcional)
//!     ├── mapping.json
//!     ├── weights.json
//!     └── labels.json
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::error::{Error, Result};
use crate::maxent::MaxEntModel;
use crate::perceptron::PerceptronModel;

/// Conjunto nomeado de modelos.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub name: String,
    pub tagger: Option<Arc<PerceptronModel>>,
    pub extractor: Option<Arc<MaxEntModel>>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_tagger(mut self, tagger: PerceptronModel) -> Self {
        self.tagger = Some(Arc::new(tagger));
        self
    }

    pub fn with_extractor(mut self, extractor: MaxEntModel) -> Self {
        self.extractor = Some(Arc::new(extractor));
        self
    }

    /// Carrega um modelo do diretório `dir` (ver layout no topo do módulo).
    ///
    /// `AveragedPerceptron/` é obrigatório; `Maxent/` é carregado se existir.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());

        let ap = dir.join("AveragedPerceptron");
        let tagger = PerceptronModel::from_json_readers(
            open(&ap.join("classes.json"))?,
            open(&ap.join("tags.json"))?,
            open(&ap.join("weights.json"))?,
        )?;
        let mut model = Model::new(name).with_tagger(tagger);

        let me = dir.join("Maxent");
        if me.is_dir() {
            let extractor = MaxEntModel::from_json_readers(
                open(&me.join("mapping.json"))?,
                open(&me.join("weights.json"))?,
                open(&me.join("labels.json"))?,
            )?;
            model = model.with_extractor(extractor);
        }

        info!(
            name = model.name.as_str(),
            dir = %dir.display(),
            extractor = model.extractor.is_some(),
            "model loaded"
        );
        Ok(model)
    }
}

fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
}
