use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use super::{EngineError, Result};

/// Pieces of the imaging runtime, in load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuntimeModule {
    Engine,
    Math,
    Tools,
    WebImageLoader,
    DicomImageLoader,
}

impl RuntimeModule {
    pub const ALL: [RuntimeModule; 5] = [
        RuntimeModule::Engine,
        RuntimeModule::Math,
        RuntimeModule::Tools,
        RuntimeModule::WebImageLoader,
        RuntimeModule::DicomImageLoader,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Engine => "engine",
            Self::Math => "math",
            Self::Tools => "tools",
            Self::WebImageLoader => "web-image-loader",
            Self::DicomImageLoader => "dicom-image-loader",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|module| module.name().eq_ignore_ascii_case(name.trim()))
    }

    pub const fn requires(self) -> Option<Self> {
        match self {
            Self::Engine => None,
            Self::Math | Self::WebImageLoader | Self::DicomImageLoader => Some(Self::Engine),
            Self::Tools => Some(Self::Math),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub name: String,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl ModuleSpec {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
            enabled: true,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name)
        }
    }

    /// Engine, math, tools and the web loader are required; DICOM support is best-effort.
    pub fn default_manifest() -> Vec<Self> {
        RuntimeModule::ALL
            .into_iter()
            .map(|module| match module {
                RuntimeModule::DicomImageLoader => Self::optional(module.name()),
                _ => Self::required(module.name()),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleFailure {
    pub name: String,
    pub required: bool,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    pub loaded: Vec<RuntimeModule>,
    pub already_loaded: Vec<RuntimeModule>,
    pub failed: Vec<ModuleFailure>,
    /// Every module present once this bootstrap finished, including ones loaded earlier.
    pub available: BTreeSet<RuntimeModule>,
}

impl BootstrapReport {
    pub fn has(&self, module: RuntimeModule) -> bool {
        self.available.contains(&module)
    }
}

/// Tracks which runtime modules are installed. Shared by every viewer created from the same
/// context; loading is serialized so concurrent first mounts install each module once.
#[derive(Debug, Default)]
pub struct ModuleLoader {
    loaded: Mutex<BTreeSet<RuntimeModule>>,
}

impl ModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self, module: RuntimeModule) -> bool {
        self.loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&module)
    }

    pub fn loaded(&self) -> BTreeSet<RuntimeModule> {
        self.loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Loads `specs` in order, skipping modules already present. An optional module that
    /// cannot load is reported and skipped; a required one aborts with an error.
    pub fn ensure_loaded(&self, specs: &[ModuleSpec]) -> Result<BootstrapReport> {
        let mut loaded = self.loaded.lock().unwrap_or_else(PoisonError::into_inner);
        let mut report = BootstrapReport::default();

        for spec in specs {
            let outcome = match RuntimeModule::from_name(&spec.name) {
                None => Err(format!("unknown runtime module `{}`", spec.name)),
                Some(module) if loaded.contains(&module) => {
                    report.already_loaded.push(module);
                    continue;
                }
                Some(_) if !spec.enabled => Err("module is disabled".to_string()),
                Some(module) => match module.requires() {
                    Some(dependency) if !loaded.contains(&dependency) => Err(format!(
                        "requires `{}` to be loaded first",
                        dependency.name()
                    )),
                    _ => Ok(module),
                },
            };

            match outcome {
                Ok(module) => {
                    loaded.insert(module);
                    report.loaded.push(module);
                    log::info!("runtime module `{}` loaded", module.name());
                }
                Err(reason) if spec.required => {
                    log::error!("required runtime module `{}` failed: {reason}", spec.name);
                    return Err(EngineError::ModuleUnavailable {
                        module: spec.name.clone(),
                        reason,
                    });
                }
                Err(reason) => {
                    log::warn!("optional runtime module `{}` skipped: {reason}", spec.name);
                    report.failed.push(ModuleFailure {
                        name: spec.name.clone(),
                        required: false,
                        reason,
                    });
                }
            }
        }

        report.available = loaded.clone();
        Ok(report)
    }
}
