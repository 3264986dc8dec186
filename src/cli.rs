use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::aggregation::{Backend, PolicyRules};
use crate::config::KpiAggConfig;
use crate::importers::read_target_metrics;
use crate::merge::RunCondition;
use crate::pipeline::{
    AggregatedRun, AggregationJob, BackendManifests, ExperimentPaths, RunPaths, aggregate_runs,
    align_paths, merge_baseline_runs, merge_experiment_run, read_load, unify_runs, write_frame,
};

#[derive(Debug, Parser)]
#[command(
    name = "kpiagg",
    version,
    about = "Aggregate, unify and merge experiment monitoring KPIs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Aggregate the raw KPIs of one or more runs.
    Aggregate {
        /// `cloud` or `mesh`.
        #[arg(long)]
        backend: Backend,

        /// Target-metrics manifest CSV.
        #[arg(long)]
        manifest: PathBuf,

        /// Folder of reference catalogs whose indices are reused.
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Output root; each run is written to `<output>/<run name>`.
        #[arg(short, long)]
        output: PathBuf,

        /// Runs aggregated at the same time (defaults to the configuration).
        #[arg(long)]
        concurrency: Option<usize>,

        /// Raw run folders holding `metric-type-{i}/`.
        #[arg(required = true)]
        runs: Vec<PathBuf>,
    },
    /// Reduce a load-generator statistics history to one row per minute.
    SummarizeLoad {
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },
    /// Give the aggregated KPIs of several runs canonical indices.
    Unify {
        #[arg(long)]
        manifest: PathBuf,

        /// Unified output folder.
        #[arg(short, long)]
        output: PathBuf,

        /// Grow the existing canonical catalogs instead of rebuilding them.
        #[arg(long, default_value_t = false)]
        incremental: bool,

        /// Aggregated run folders, in order.
        #[arg(required = true)]
        runs: Vec<PathBuf>,
    },
    /// Merge both backends and the load series of one run.
    Merge {
        #[arg(long)]
        cloud_manifest: PathBuf,
        #[arg(long)]
        mesh_manifest: PathBuf,
        #[arg(long)]
        cloud: PathBuf,
        #[arg(long)]
        mesh: PathBuf,
        /// Load statistics history or load summary CSV.
        #[arg(long)]
        load: PathBuf,

        /// `normal` or `fault`.
        #[arg(long, default_value = "normal")]
        condition: RunCondition,

        #[arg(short, long)]
        output: PathBuf,

        /// Also write an Arrow IPC file.
        #[arg(long)]
        arrow: Option<PathBuf>,
    },
    /// Merge many normal runs into one baseline table.
    MergeBaseline {
        #[arg(long)]
        cloud_manifest: PathBuf,
        #[arg(long)]
        mesh_manifest: PathBuf,
        #[arg(long, required = true)]
        cloud: Vec<PathBuf>,
        #[arg(long, required = true)]
        mesh: Vec<PathBuf>,
        #[arg(long, required = true)]
        load: Vec<PathBuf>,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(long)]
        arrow: Option<PathBuf>,
    },
}

async fn read_manifests(cloud: &Path, mesh: &Path) -> Result<BackendManifests> {
    Ok(BackendManifests {
        cloud: read_target_metrics(cloud)
            .await
            .with_context(|| format!("Failed to read manifest {}", cloud.display()))?,
        mesh: read_target_metrics(mesh)
            .await
            .with_context(|| format!("Failed to read manifest {}", mesh.display()))?,
    })
}

pub async fn run(cli: Cli, config: &KpiAggConfig) -> Result<()> {
    match cli.command {
        Commands::Aggregate {
            backend,
            manifest,
            reference,
            output,
            concurrency,
            runs,
        } => {
            let rules = PolicyRules::for_backend(backend, &config.aggregation_config())
                .context("Invalid aggregation configuration")?;
            let manifest = read_target_metrics(&manifest)
                .await
                .with_context(|| format!("Failed to read manifest {}", manifest.display()))?;
            let runs: Vec<RunPaths> = runs
                .into_iter()
                .map(|raw_dir| {
                    let mut run = RunPaths::new(raw_dir, PathBuf::new());
                    run.output_dir = output.join(&run.name);
                    run
                })
                .collect();
            let expected = runs.len();
            let job = Arc::new(AggregationJob {
                rules,
                manifest,
                reference_dir: reference,
            });
            let reports =
                aggregate_runs(runs, job, concurrency.unwrap_or(config.concurrency)).await;
            info!("{} of {} {} runs aggregated", reports.len(), expected, backend);
            if reports.len() < expected {
                warn!("{} runs failed", expected - reports.len());
            }
        }
        Commands::SummarizeLoad { input, output } => {
            let merge_config = config.merge_config()?;
            let frame = read_load(&input, &merge_config).await?;
            write_frame(&frame, &output, None).await?;
        }
        Commands::Unify {
            manifest,
            output,
            incremental,
            runs,
        } => {
            let manifest = read_target_metrics(&manifest)
                .await
                .with_context(|| format!("Failed to read manifest {}", manifest.display()))?;
            let runs: Vec<AggregatedRun> = runs.into_iter().map(AggregatedRun::new).collect();
            let unified = unify_runs(&manifest, &runs, &output, incremental).await?;
            info!("{} metrics unified into {}", unified.len(), output.display());
        }
        Commands::Merge {
            cloud_manifest,
            mesh_manifest,
            cloud,
            mesh,
            load,
            condition,
            output,
            arrow,
        } => {
            let merge_config = config.merge_config()?;
            let manifests = read_manifests(&cloud_manifest, &mesh_manifest).await?;
            let paths = ExperimentPaths {
                cloud_dir: cloud,
                mesh_dir: mesh,
                load_file: load,
            };
            let frame = merge_experiment_run(&paths, &manifests, condition, &merge_config).await?;
            write_frame(&frame, &output, arrow.as_deref()).await?;
        }
        Commands::MergeBaseline {
            cloud_manifest,
            mesh_manifest,
            cloud,
            mesh,
            load,
            output,
            arrow,
        } => {
            let merge_config = config.merge_config()?;
            let manifests = read_manifests(&cloud_manifest, &mesh_manifest).await?;
            let days = align_paths(cloud, mesh, load);
            let frame = merge_baseline_runs(&days, &manifests, &merge_config).await?;
            write_frame(&frame, &output, arrow.as_deref()).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aggregate() {
        let cli = Cli::try_parse_from([
            "kpiagg",
            "aggregate",
            "--backend",
            "mesh",
            "--manifest",
            "metrics.csv",
            "-o",
            "out",
            "runs/day-1",
            "runs/day-2",
        ])
        .unwrap();
        match cli.command {
            Commands::Aggregate { backend, runs, reference, .. } => {
                assert_eq!(backend, Backend::Mesh);
                assert_eq!(runs.len(), 2);
                assert!(reference.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_merge_condition() {
        let cli = Cli::try_parse_from([
            "kpiagg",
            "merge",
            "--cloud-manifest",
            "cloud.csv",
            "--mesh-manifest",
            "mesh.csv",
            "--cloud",
            "gm",
            "--mesh",
            "pm",
            "--load",
            "load.csv",
            "--condition",
            "fault",
            "-o",
            "merged.csv",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Merge {
                condition: RunCondition::Fault,
                ..
            }
        ));

        assert!(Cli::try_parse_from(["kpiagg", "unify", "--manifest", "m.csv", "-o", "u"]).is_err());
    }
}
