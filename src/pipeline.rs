// The build pipeline runs one build cycle: read the kernel text, compile it inside a
// CompilationSession, make sure the destination directory exists, and replace the output file
// atomically. The arena, the session and the parsed-module handle are all scoped to the
// compile step, so they are released before anything touches the filesystem and on every
// error path. The output is written to a temporary file in the destination directory, synced,
// and renamed over the target; a failure at any point leaves the previous file (or no file)
// in place and the temporary is removed when it drops. A successful build logs exactly one
// completion notice at info level.

//! Build pipeline: read → parse → validate → encode → write.

use crate::core::config::{BuildConfig, EncodeOptions};
use crate::core::error::{BuildError, CompileError};
use crate::core::session::{self, CompilationSession, SessionStats};
use bumpalo::Bump;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Outcome of a successful build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub output: PathBuf,
    /// Size of the written binary in bytes.
    pub size: usize,
    pub stats: SessionStats,
}

/// Compile module text to a binary in memory.
pub fn compile(source: &str, options: &EncodeOptions) -> Result<Vec<u8>, CompileError> {
    compile_with_stats(source, options).map(|(bytes, _)| bytes)
}

fn compile_with_stats(
    source: &str,
    options: &EncodeOptions,
) -> Result<(Vec<u8>, SessionStats), CompileError> {
    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    let bytes = session::compile_in(&session, source, options)?;
    debug_assert_eq!(session.live_handles(), 0);
    Ok((bytes, session.stats()))
}

/// Run one build cycle.
pub fn build(config: &BuildConfig) -> Result<BuildReport, BuildError> {
    log::debug!(
        "building {} -> {}",
        config.source.display(),
        config.output.display()
    );

    let source = fs::read_to_string(&config.source).map_err(|source| BuildError::SourceRead {
        path: config.source.clone(),
        source,
    })?;

    let (bytes, stats) = compile_with_stats(&source, &config.encode_options())
        .map_err(|err| BuildError::from_compile(config.source.clone(), err))?;
    log::debug!("{stats}");

    write_atomic(&config.output, &bytes).map_err(|source| BuildError::Write {
        path: config.output.clone(),
        source,
    })?;

    log::info!("WASM built: {}", config.output.display());
    Ok(BuildReport {
        output: config.output.clone(),
        size: bytes.len(),
        stats,
    })
}

/// Replace `target` with `content`, all or nothing.
fn write_atomic(target: &Path, content: &[u8]) -> io::Result<()> {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    // Same directory as the target so the rename stays on one filesystem.
    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(target).map_err(|err| err.error)?;

    if let Ok(dir) = fs::File::open(parent) {
        let _ = dir.sync_all();
    }
    Ok(())
}
