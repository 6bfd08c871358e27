use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use crate::loader::{FileLoader, HttpFetcher, LoaderRegistry, WadoUriLoader, WebImageLoader};

use super::{
    BootstrapReport, Container, EngineError, ModuleLoader, ModuleSpec, Result, RuntimeModule,
    ScaleBounds, SoftwareViewport, ToolBindings, ToolRegistry, ViewportController,
};

/// Capabilities the runtime can hand out once bootstrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub engine: bool,
    pub tools: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeOptions {
    pub http_timeout: Duration,
    pub max_download_bytes: u64,
    pub scale_bounds: ScaleBounds,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(15),
            max_download_bytes: 64 * 1024 * 1024,
            scale_bounds: ScaleBounds::default(),
        }
    }
}

/// Bootstrapped imaging runtime. Cheap to clone; the loader registry is shared.
#[derive(Debug, Clone)]
pub struct ImagingRuntime {
    capabilities: Capabilities,
    loaders: Arc<LoaderRegistry>,
    scale_bounds: ScaleBounds,
}

impl ImagingRuntime {
    pub fn new(capabilities: Capabilities, loaders: LoaderRegistry, scale_bounds: ScaleBounds) -> Self {
        Self {
            capabilities,
            loaders: Arc::new(loaders),
            scale_bounds,
        }
    }

    /// Installs one capability per available module.
    pub fn from_modules(available: &BTreeSet<RuntimeModule>, options: &RuntimeOptions) -> Result<Self> {
        let fetcher = HttpFetcher::new(options.http_timeout, options.max_download_bytes);
        let mut loaders = LoaderRegistry::new();
        if available.contains(&RuntimeModule::WebImageLoader) {
            loaders.register(Arc::new(WebImageLoader::new(fetcher.clone())))?;
        }
        if available.contains(&RuntimeModule::DicomImageLoader) {
            loaders.register(Arc::new(WadoUriLoader::new(fetcher)))?;
            loaders.register(Arc::new(FileLoader))?;
        }

        let capabilities = Capabilities {
            engine: available.contains(&RuntimeModule::Engine),
            tools: available.contains(&RuntimeModule::Tools),
        };
        log::debug!(
            "imaging runtime: {capabilities:?}, schemes {:?}",
            loaders.schemes()
        );
        Ok(Self::new(capabilities, loaders, options.scale_bounds))
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn loaders(&self) -> Arc<LoaderRegistry> {
        Arc::clone(&self.loaders)
    }

    pub fn enable(&self, container: &Container) -> Result<Box<dyn ViewportController>> {
        if !self.capabilities.engine {
            return Err(EngineError::NotInitialized("engine"));
        }
        if !container.is_drawable() {
            return Err(EngineError::InvalidContainer {
                id: container.id.clone(),
                width: container.width,
                height: container.height,
            });
        }
        Ok(Box::new(SoftwareViewport::new(container, self.scale_bounds)))
    }

    pub fn tool_registry(&self) -> Result<Box<dyn ToolRegistry>> {
        if !self.capabilities.tools {
            return Err(EngineError::NotInitialized("tools"));
        }
        Ok(Box::new(ToolBindings::default()))
    }
}

/// Module loading followed by runtime assembly, completing with one explicit result.
#[derive(Debug, Clone)]
pub struct RuntimeBootstrap {
    loader: Arc<ModuleLoader>,
    modules: Vec<ModuleSpec>,
    options: RuntimeOptions,
}

impl RuntimeBootstrap {
    pub fn new(loader: Arc<ModuleLoader>, modules: Vec<ModuleSpec>, options: RuntimeOptions) -> Self {
        Self {
            loader,
            modules,
            options,
        }
    }

    pub fn start(&self) -> Result<(ImagingRuntime, BootstrapReport)> {
        let report = self.loader.ensure_loaded(&self.modules)?;
        let runtime = ImagingRuntime::from_modules(&report.available, &self.options)?;
        Ok((runtime, report))
    }
}
