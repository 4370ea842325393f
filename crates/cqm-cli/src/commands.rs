use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table};
use cqm_core::{
    ConverterOptions, EventMaterializer, EventToRecordConverter, MappingMaterializer,
    MeasureContext, RecordToEventConverter, StaticMaterializer,
};
use cqm_map::{AttributeMappingTable, AttributeTarget};
use cqm_model::{ClinicalRecord, Patient};
use cqm_standards::{CodeSystemOidTable, StandardsRegistry, standards_root};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

pub fn load_registry() -> Result<StandardsRegistry> {
    let root = standards_root();
    let (registry, summary) = StandardsRegistry::verify_and_load(&root)
        .with_context(|| format!("load standards from {}", root.display()))?;
    debug!(files = summary.file_count, "standards verified");
    Ok(registry)
}

/// Convert a patient file into a record. Returns the number of entries.
pub fn run_to_record(
    registry: &StandardsRegistry,
    patient_path: &Path,
    output: Option<&Path>,
    options: ConverterOptions,
) -> Result<usize> {
    let patient: Patient = read_json(patient_path)?;
    let converter =
        EventToRecordConverter::new(registry, options).context("build record converter")?;
    let record = converter
        .to_record(&patient)
        .with_context(|| format!("convert {}", patient_path.display()))?;
    write_json(&record, output)?;
    Ok(record.entry_count())
}

/// Convert a record file into a patient. Returns the number of events.
pub fn run_to_patient(
    registry: &StandardsRegistry,
    record_path: &Path,
    materialized: Option<&Path>,
    measure: Option<&Path>,
    output: Option<&Path>,
    options: ConverterOptions,
) -> Result<usize> {
    let record: ClinicalRecord = read_json(record_path)?;
    let converter =
        RecordToEventConverter::new(registry, options).context("build patient converter")?;
    let materializer: Box<dyn EventMaterializer> = match materialized {
        Some(path) => {
            let events = read_json(path)?;
            Box::new(
                StaticMaterializer::from_json(events)
                    .with_context(|| format!("read materialized events {}", path.display()))?,
            )
        }
        None => Box::new(MappingMaterializer::new(registry).context("build materializer")?),
    };
    let patient = match measure {
        Some(path) => {
            let measure: MeasureContext = read_json(path)?;
            info!(
                criteria = measure.source_data_criteria.len(),
                value_sets = measure.value_sets.len(),
                "measure loaded"
            );
            converter.to_patient_with_measure(&record, materializer.as_ref(), &measure)
        }
        None => converter.to_patient(&record, materializer.as_ref()),
    }
    .with_context(|| format!("convert {}", record_path.display()))?;
    write_json(&patient, output)?;
    Ok(patient.data_elements.len())
}

pub fn run_code_systems(registry: &StandardsRegistry) {
    println!("{}", code_systems_table(&registry.code_systems));
}

pub fn run_datatypes(registry: &StandardsRegistry) -> Result<()> {
    let table =
        AttributeMappingTable::build(&registry.datatypes).context("build mapping table")?;
    println!("{}", datatypes_table(&table));
    Ok(())
}

pub fn code_systems_table(code_systems: &CodeSystemOidTable) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Code system", "OID", "Aliases"]);
    apply_table_style(&mut table);
    for (name, oid) in code_systems.iter() {
        let aliases: Vec<&str> = code_systems.aliases_of(oid).collect();
        table.add_row(vec![name.to_string(), oid.to_string(), aliases.join(", ")]);
    }
    table
}

pub fn datatypes_table(mappings: &AttributeMappingTable) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Datatype", "Category", "Status", "Declared", "Mapped"]);
    apply_table_style(&mut table);
    for (name, info) in mappings.iter() {
        let mapped: Vec<String> = info
            .mappings
            .iter()
            .map(|(attribute, target)| match target {
                AttributeTarget::Single(record) => format!("{attribute}→{record}"),
                AttributeTarget::Split { low, high } => format!("{attribute}→{low}/{high}"),
            })
            .collect();
        table.add_row(vec![
            name.to_string(),
            info.category.to_string(),
            info.status.clone().unwrap_or_default(),
            info.declared.len().to_string(),
            mapped.join(", "),
        ]);
    }
    table
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let mut json = serde_json::to_string_pretty(value).context("serialize output")?;
    json.push('\n');
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
            info!(path = %path.display(), "output written");
        }
        None => io::stdout()
            .lock()
            .write_all(json.as_bytes())
            .context("write stdout")?,
    }
    Ok(())
}
