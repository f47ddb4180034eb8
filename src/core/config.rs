//! Build configuration.

use std::path::{Path, PathBuf};

/// Default location of the kernel source, relative to the project root.
pub const DEFAULT_SOURCE: &str = "kernel/polynomial.wat";

/// Default location of the compiled kernel.
pub const DEFAULT_OUTPUT: &str = "static/wasm/polynomial.wasm";

/// Options that affect the bytes the encoder produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeOptions {
    /// Emit the `name` custom section. Off by default so output is minimal.
    pub write_debug_names: bool,
}

/// Inputs of one build cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    pub source: PathBuf,
    pub output: PathBuf,
    pub write_debug_names: bool,
}

impl BuildConfig {
    pub fn new(source: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output: output.into(),
            write_debug_names: false,
        }
    }

    /// Resolve both paths against `root`. Absolute paths are kept as-is.
    pub fn relative_to(&self, root: &Path) -> Self {
        Self {
            source: root.join(&self.source),
            output: root.join(&self.output),
            write_debug_names: self.write_debug_names,
        }
    }

    pub fn with_debug_names(mut self, enabled: bool) -> Self {
        self.write_debug_names = enabled;
        self
    }

    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            write_debug_names: self.write_debug_names,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE, DEFAULT_OUTPUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BuildConfig::default();
        assert_eq!(config.source, PathBuf::from("kernel/polynomial.wat"));
        assert_eq!(config.output, PathBuf::from("static/wasm/polynomial.wasm"));
        assert!(!config.encode_options().write_debug_names);
    }

    #[test]
    fn test_relative_to() {
        let config = BuildConfig::default()
            .with_debug_names(true)
            .relative_to(Path::new("/srv/site"));
        assert_eq!(config.source, PathBuf::from("/srv/site/kernel/polynomial.wat"));
        assert_eq!(config.output, PathBuf::from("/srv/site/static/wasm/polynomial.wasm"));
        assert!(config.encode_options().write_debug_names);

        let absolute = BuildConfig::new("/a.wat", "/b.wasm").relative_to(Path::new("/srv"));
        assert_eq!(absolute.source, PathBuf::from("/a.wat"));
    }
}
