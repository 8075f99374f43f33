use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{error, info};

mod app;
mod config;
mod constants;
mod error;
mod logging;
mod observability;
mod pipeline;

use crate::app::analyze_use_case::AnalyzeUseCase;
use crate::app::clean_use_case::CleanUseCase;
use crate::config::PipelineConfig;
use crate::pipeline::processing::analysis::AnalysisReport;
use crate::pipeline::processing::validators::FieldType;

#[derive(Parser)]
#[command(name = "data_hygiene")]
#[command(about = "Data hygiene pipeline for payroll and HR file imports")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a file and report issues without changing anything
    Analyze {
        /// Path to the CSV file to analyze
        file: PathBuf,
        /// Explicit column types (comma-separated name=TYPE pairs, e.g.
        /// "employee_id=EMPLOYEE_ID,salary=NUMBER")
        #[arg(long)]
        types: Option<String>,
        /// Write the full analysis report to this JSON file
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Analyze and clean a file, writing the export artifacts
    Clean {
        /// Path to the CSV file to clean
        file: PathBuf,
        /// Explicit column types (comma-separated name=TYPE pairs)
        #[arg(long)]
        types: Option<String>,
        /// Key fields whose errors reject a row (comma-separated), overriding
        /// the configuration file
        #[arg(long)]
        key_fields: Option<String>,
        /// Output directory for cleaned.csv / rejects.csv / issues.json
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Run analysis and cleaning sequentially with full console output
    Run {
        /// Path to the CSV file to process
        file: PathBuf,
        /// Explicit column types (comma-separated name=TYPE pairs)
        #[arg(long)]
        types: Option<String>,
        /// Output directory for export artifacts
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn parse_type_mapping(spec: &str) -> Result<HashMap<String, FieldType>, String> {
    let mut mapping = HashMap::new();
    for pair in spec.split(',') {
        let (name, type_name) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected name=TYPE, got '{}'", pair))?;
        let field_type: FieldType = type_name.trim().parse()?;
        mapping.insert(name.trim().to_string(), field_type);
    }
    Ok(mapping)
}

fn build_analyze_use_case(types: Option<&str>) -> Result<AnalyzeUseCase, String> {
    let use_case = AnalyzeUseCase::new();
    match types {
        Some(spec) => Ok(use_case.with_column_types(parse_type_mapping(spec)?)),
        None => Ok(use_case),
    }
}

fn print_analysis_summary(report: &AnalysisReport) {
    println!("\n📊 Analysis Results:");
    println!("   Rows: {}", report.file_info.row_count);
    println!("   Columns: {}", report.file_info.column_count);
    println!(
        "   Encoding: {} (confidence {:.2}, BOM: {})",
        report.encoding.encoding, report.encoding.confidence, report.encoding.bom_type
    );
    println!("   Issues: {}", report.summary.total_issues);
    println!("     Errors: {}", report.summary.error_count);
    println!("     Warnings: {}", report.summary.warning_count);
    println!("     Info: {}", report.summary.info_count);

    for field in &report.field_reports {
        let type_label = field
            .field_type
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "   Column {} '{}': type={} total={} empty={} invalid={}",
            field.column,
            field.name,
            type_label,
            field.total_values,
            field.empty_values,
            field.invalid_values
        );
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let pipeline_config = PipelineConfig::load_or_default()?;

    match cli.command {
        Commands::Analyze { file, types, report } => {
            println!("🔍 Analyzing {}...", file.display());
            let use_case = build_analyze_use_case(types.as_deref())?;
            let analysis = use_case.analyze_file(&file)?;

            print_analysis_summary(&analysis);

            if let Some(report_path) = report {
                std::fs::write(&report_path, serde_json::to_string_pretty(&analysis)?)?;
                println!("\n📄 Report written to {}", report_path.display());
            }
        }
        Commands::Clean {
            file,
            types,
            key_fields,
            output_dir,
        } => {
            println!("🧹 Cleaning {}...", file.display());
            let use_case = build_analyze_use_case(types.as_deref())?;
            let analysis = use_case.analyze_file(&file)?;

            let mut cleaning_config = pipeline_config.cleaning;
            if let Some(fields) = key_fields {
                cleaning_config.key_fields =
                    fields.split(',').map(|f| f.trim().to_string()).collect();
            }
            let output_dir =
                output_dir.unwrap_or_else(|| PathBuf::from(&pipeline_config.export.output_dir));

            // Re-parse the file the same way the analyzer saw it
            let bytes = std::fs::read(&file)?;
            let encoding = pipeline::ingestion::encoding::sniff_encoding(&bytes);
            let text = pipeline::ingestion::encoding::decode_bytes(&bytes, &encoding);
            let table = pipeline::ingestion::reader::TableReader::parse_auto(&text)?;

            let clean_use_case = CleanUseCase::new(cleaning_config);
            match clean_use_case.run_and_export(&table.rows, &table.headers, &analysis, &output_dir)
            {
                Ok((result, artifacts)) => {
                    println!("\n📊 Cleaning Results:");
                    println!("   Total rows: {}", result.summary.total_rows);
                    println!("   Cleaned: {}", result.summary.cleaned_count);
                    println!("   Unchanged: {}", result.summary.unchanged_count);
                    println!("   Rejected: {}", result.summary.rejected_count);
                    println!("   Cells modified: {}", result.summary.cells_modified);
                    println!("   Job id: {}", artifacts.job_id);
                    println!("   Output: {}", output_dir.display());
                }
                Err(e) => {
                    error!("Cleaning failed: {}", e);
                    println!("❌ Cleaning failed: {}", e);
                }
            }
        }
        Commands::Run {
            file,
            types,
            output_dir,
        } => {
            println!("🚀 Running full hygiene pipeline on {}...", file.display());

            println!("\n🔍 Step 1: Analyzing...");
            let use_case = build_analyze_use_case(types.as_deref())?;
            let analysis = use_case.analyze_file(&file)?;
            print_analysis_summary(&analysis);

            println!("\n🧹 Step 2: Cleaning...");
            let output_dir =
                output_dir.unwrap_or_else(|| PathBuf::from(&pipeline_config.export.output_dir));

            let bytes = std::fs::read(&file)?;
            let encoding = pipeline::ingestion::encoding::sniff_encoding(&bytes);
            let text = pipeline::ingestion::encoding::decode_bytes(&bytes, &encoding);
            let table = pipeline::ingestion::reader::TableReader::parse_auto(&text)?;

            let clean_use_case = CleanUseCase::new(pipeline_config.cleaning);
            match clean_use_case.run_and_export(&table.rows, &table.headers, &analysis, &output_dir)
            {
                Ok((result, artifacts)) => {
                    info!("Pipeline finished");
                    println!("\n✅ Pipeline completed:");
                    println!(
                        "   {} cleaned, {} unchanged, {} rejected",
                        result.summary.cleaned_count,
                        result.summary.unchanged_count,
                        result.summary.rejected_count
                    );
                    println!("   Artifacts under {} (job {})", output_dir.display(), artifacts.job_id);

                    if !result.rejected_rows.is_empty() {
                        println!("\n⚠️  Rejected rows:");
                        for rejected in &result.rejected_rows {
                            println!(
                                "   - row {}: {}",
                                rejected.row_index,
                                rejected.reject_reasons.join("; ")
                            );
                        }
                    }
                }
                Err(e) => {
                    error!("Pipeline failed: {}", e);
                    println!("❌ Pipeline failed: {}", e);
                }
            }
        }
    }
    Ok(())
}
