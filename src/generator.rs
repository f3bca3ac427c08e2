// src/generator.rs
//
// Load -> normalize -> synthesize -> emit, for one project.

use anyhow::{Context, Result};
use log::info;
use std::path::{Path, PathBuf};

use crate::binding::{ProjectBindings, Synthesizer};
use crate::emitter::{write_project, RustEmitter};
use crate::interface::ProjectSource;
use crate::metrics;
use crate::normalizer::Normalizer;
use crate::settings::GeneratorSettings;

/// Synthesizes bindings for `project` under the settings' access-control policy.
pub fn synthesize(project: &ProjectSource, settings: &GeneratorSettings) -> Result<ProjectBindings> {
    let synthesizer = Synthesizer::new(Normalizer::new(settings.access_control_policy()))
        .with_custom_contracts(settings.custom_contracts.iter().cloned());
    let bindings = synthesizer
        .synthesize_project(project)
        .with_context(|| format!("Failed to synthesize bindings for {}", project.name))?;
    let functions: usize = bindings.contracts.iter().map(|c| c.functions.len()).sum();
    metrics::increment_bindings_generated(&project.name, functions);
    Ok(bindings)
}

/// Reads `<abi_dir>/<project>.json` and writes its bindings under `output_dir`.
pub fn generate_project(project_name: &str, settings: &GeneratorSettings) -> Result<Vec<PathBuf>> {
    let source_path = settings.abi_dir.join(format!("{}.json", project_name));
    let project = ProjectSource::from_json_file(project_name, &source_path)?;
    generate_from_source(&project, settings, &settings.output_dir)
}

pub fn generate_from_source(
    project: &ProjectSource,
    settings: &GeneratorSettings,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let bindings = synthesize(project, settings)?;
    let emitter = RustEmitter::new(settings.runtime_crate.clone());
    let written = write_project(&emitter, &bindings, output_dir)
        .with_context(|| format!("Failed to write bindings to {:?}", output_dir))?;
    info!(
        "[CODEGEN] {}: {} contracts -> {:?}",
        project.name,
        bindings.contracts.len(),
        output_dir
    );
    Ok(written)
}
