// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Classnet CLI
//!
//! Command-line interface for classroom relationship-survey analysis.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use classnet_core::{AnalysisConfig, Annotation};
use classnet_graph::{
    detect_roles, AnalysisPipeline, AnalysisResult, ColumnRoles, KeywordInference, RoleHints,
    RoleInference, SurveySource,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "classnet")]
#[command(about = "Classnet - classroom relationship network analysis", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,

    /// Output as JSON (machine-readable)
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse a survey CSV file or URL
    Analyze {
        /// File path, CSV URL or Google Sheets link
        source: String,

        /// Respondent column (detected when omitted)
        #[arg(long)]
        respondent: Option<String>,

        /// Relationship question column, repeatable (detected when omitted)
        #[arg(long = "relationship")]
        relationships: Vec<String>,

        /// Seed for community detection
        #[arg(long)]
        seed: Option<u64>,

        /// Fail instead of falling back to synthetic data
        #[arg(long)]
        no_fallback: bool,
    },

    /// Show detected column roles and question types
    Roles {
        /// File path, CSV URL or Google Sheets link
        source: String,

        /// Respondent column (detected when omitted)
        #[arg(long)]
        respondent: Option<String>,
    },

    /// Analyse a generated network
    Synthetic {
        /// Number of students
        #[arg(long, default_value = "10")]
        nodes: usize,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Serialize)]
struct RolesOutput {
    encoding: &'static str,
    rows: usize,
    roles: ColumnRoles,
    annotation: Annotation,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; stdout is reserved for results
    let default_filter = if cli.verbose {
        "classnet=debug,classnet_core=debug,classnet_graph=debug"
    } else {
        "classnet=info,classnet_core=info,classnet_graph=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = AnalysisConfig::load(cli.config.clone()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Analyze {
            source,
            respondent,
            relationships,
            seed,
            no_fallback,
        } => {
            if seed.is_some() {
                config.community.seed = seed;
            }
            if no_fallback {
                config.extraction.synthetic_fallback = false;
            }
            let hints = RoleHints {
                respondent,
                relationships: (!relationships.is_empty()).then_some(relationships),
            };
            let source = SurveySource::parse(&source);
            info!(source = %source, "Analysing survey");

            let result = AnalysisPipeline::new(config)
                .with_hints(hints)
                .run(&source)
                .with_context(|| format!("Failed to analyse {}", source))?;
            print_result(&result, cli.json)?;
        }

        Commands::Roles { source, respondent } => {
            let source = SurveySource::parse(&source);
            let table = source
                .load(&config.fetch)
                .with_context(|| format!("Failed to load {}", source))?;
            let hints = RoleHints {
                respondent,
                relationships: None,
            };
            let roles = detect_roles(&table, &hints).context("Failed to detect column roles")?;
            let annotation = KeywordInference.infer_roles("", &roles).annotation;

            let output = RolesOutput {
                encoding: table.encoding(),
                rows: table.len(),
                roles,
                annotation,
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("Rows: {} ({})", output.rows, output.encoding);
                println!("Respondent: {}", output.roles.respondent);
                println!("Detection: {:?}", output.roles.detection);
                println!("Relationship questions:");
                for column in &output.roles.relationships {
                    let relation_type = output
                        .annotation
                        .type_for(column)
                        .map(|t| t.to_string())
                        .unwrap_or_else(|| "general".to_string());
                    println!("  {} -> {}", column, relation_type);
                }
            }
        }

        Commands::Synthetic { nodes, seed } => {
            config.synthetic.nodes = nodes;
            config.synthetic.seed = seed;
            if config.community.seed.is_none() {
                config.community.seed = seed;
            }
            let result = AnalysisPipeline::new(config)
                .run_synthetic()
                .context("Failed to analyse synthetic network")?;
            print_result(&result, cli.json)?;
        }
    }

    Ok(())
}

fn print_result(result: &AnalysisResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    if result.is_synthetic() {
        println!("⚠ SYNTHETIC DATA - not real survey answers");
        println!();
    }

    println!("Summary");
    println!("=======");
    for line in &result.text_summary {
        println!("{}", line);
    }
    println!();

    println!("Students");
    println!("{:-<88}", "");
    println!(
        "{:<20} {:>5} {:>7} {:>7} {:>9} {:>11} {:>11}  {}",
        "name", "group", "in", "out", "closeness", "betweenness", "eigenvector", "role"
    );
    for row in &result.node_attributes {
        println!(
            "{:<20} {:>5} {:>7.3} {:>7.3} {:>9.3} {:>11.3} {:>11.3}  {}",
            truncate(&row.label, 20),
            row.group.map(|g| g.to_string()).unwrap_or_else(|| "-".into()),
            row.in_degree,
            row.out_degree,
            row.closeness,
            row.betweenness,
            row.eigenvector,
            row.role
        );
    }

    if !result.provenance.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &result.provenance.warnings {
            println!("  - {}", warning);
        }
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
