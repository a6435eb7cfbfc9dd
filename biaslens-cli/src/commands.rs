//! CLI subcommand handlers.

use crate::Commands;
use biaslens_core::data::load_file;
use biaslens_core::pipeline::STAGE_COUNT;
use biaslens_core::store::parse_job_id;
use biaslens_core::{
    ArtifactStore, BiasConfig, BiasEngine, BiasReport, Budget, FsArtifactStore, StageCounters,
};
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    config: BiasConfig,
    workspace: &Path,
) -> anyhow::Result<()> {
    match command {
        Commands::Analyze {
            file,
            json,
            timeout_secs,
        } => handle_analyze(&file, json, timeout_secs, config).await,
        Commands::Clean {
            file,
            json,
            timeout_secs,
        } => handle_clean(&file, json, timeout_secs, config, workspace).await,
        Commands::Download { job_id, output } => {
            handle_download(&job_id, output.as_deref(), &config, workspace).await
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn handle_analyze(
    file: &Path,
    json: bool,
    timeout_secs: Option<u64>,
    config: BiasConfig,
) -> anyhow::Result<()> {
    let dataset = load_file(file, &config.input).await?;
    let engine = BiasEngine::from_config(config).await;
    let analysis = engine.analyze(&dataset, &budget(timeout_secs)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        print!("{}", render_report(&analysis.report, &analysis.recommendations));
    }
    Ok(())
}

async fn handle_clean(
    file: &Path,
    json: bool,
    timeout_secs: Option<u64>,
    config: BiasConfig,
    workspace: &Path,
) -> anyhow::Result<()> {
    let dataset = load_file(file, &config.input).await?;
    let store = FsArtifactStore::new(jobs_dir(&config, workspace));
    let engine = BiasEngine::from_config(config).await;
    let result = engine
        .analyze_and_clean(&dataset, &store, &budget(timeout_secs))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Job: {}", result.job_id);
        println!("Cleaned file: {}", store.path_for(result.job_id).display());
        print!("{}", render_counters(&result.counters));
        println!();
        print!("{}", render_report(&result.report, &result.recommendations));
    }
    Ok(())
}

async fn handle_download(
    job_id: &str,
    output: Option<&Path>,
    config: &BiasConfig,
    workspace: &Path,
) -> anyhow::Result<()> {
    let id = parse_job_id(job_id)?;
    let store = FsArtifactStore::new(jobs_dir(config, workspace));
    let bytes = store.get(id).await?;

    match output {
        Some(path) => {
            tokio::fs::write(path, &bytes).await?;
            eprintln!("Wrote {} bytes to {}", bytes.len(), path.display());
        }
        None => std::io::stdout().write_all(&bytes)?,
    }
    Ok(())
}

fn budget(timeout_secs: Option<u64>) -> Budget {
    match timeout_secs {
        Some(secs) => Budget::with_timeout(Duration::from_secs(secs)),
        None => Budget::unlimited(),
    }
}

/// Relative job directories live under the workspace.
fn jobs_dir(config: &BiasConfig, workspace: &Path) -> PathBuf {
    if config.storage.jobs_dir.is_absolute() {
        config.storage.jobs_dir.clone()
    } else {
        workspace.join(&config.storage.jobs_dir)
    }
}

fn render_report(report: &BiasReport, recommendations: &[String]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Overall bias score: {:.2}/100", report.overall_score);
    let _ = writeln!(
        out,
        "  demographic {:.1} | text {:.1} | statistical {:.1}",
        report.demographic.score, report.text.score, report.statistical.score
    );
    for note in [
        &report.demographic.details,
        &report.text.details,
        &report.statistical.details,
    ] {
        if !note.is_empty() {
            let _ = writeln!(out, "  {note}");
        }
    }
    if report.text.partial {
        let _ = writeln!(out, "  text analysis stopped early (time budget)");
    }
    let _ = writeln!(out, "\nRecommendations:");
    for line in recommendations {
        let _ = writeln!(out, "{line}");
    }
    out
}

fn render_counters(counters: &StageCounters) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Rows: {} -> {} ({:.1}% removed)",
        counters.original_rows,
        counters.final_rows,
        counters.removal_percentage()
    );
    let _ = writeln!(
        out,
        "  imputed {} cells, balanced {} columns, removed {} toxic / {} outlier / {} duplicate rows",
        counters.cells_imputed,
        counters.columns_balanced,
        counters.toxic_rows_removed,
        counters.outliers_removed,
        counters.duplicates_removed
    );
    if counters.partial {
        let _ = writeln!(
            out,
            "  stopped after {}/{STAGE_COUNT} stages (time budget)",
            counters.stages_completed
        );
    }
    if counters.floor_breached {
        let _ = writeln!(out, "  warning: fewer than 60% of rows remain");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use biaslens_core::analysis::{
        DemographicReport, StatisticalReport, TextBiasReport, generate_recommendations,
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn test_jobs_dir_resolution() {
        let ws = Path::new("/tmp/ws");
        let mut config = BiasConfig::default();
        assert_eq!(jobs_dir(&config, ws), ws.join(".biaslens/jobs"));

        config.storage.jobs_dir = PathBuf::from("/var/lib/biaslens");
        assert_eq!(jobs_dir(&config, ws), PathBuf::from("/var/lib/biaslens"));
    }

    #[test]
    fn test_render_report_lists_recommendations() {
        let demographic = DemographicReport {
            score: 60.0,
            ..Default::default()
        };
        let report = BiasReport::new(
            demographic,
            TextBiasReport::default(),
            StatisticalReport::default(),
        );
        let recs = generate_recommendations(
            report.overall_score,
            &report.demographic,
            &report.text,
            &report.statistical,
        );
        let out = render_report(&report, &recs);
        assert!(out.starts_with("Overall bias score: 20.00/100\n"));
        assert!(out.contains("demographic 60.0 | text 0.0 | statistical 0.0"));
        assert!(out.contains(&recs[0]));
    }

    #[test]
    fn test_render_counters_flags() {
        let counters = StageCounters {
            original_rows: 100,
            final_rows: 50,
            floor_breached: true,
            partial: true,
            stages_completed: 2,
            ..Default::default()
        };
        let out = render_counters(&counters);
        assert!(out.starts_with("Rows: 100 -> 50 (50.0% removed)\n"));
        assert!(out.contains("stopped after 2/5 stages"));
        assert!(out.contains("fewer than 60% of rows remain"));
    }

    #[tokio::test]
    async fn test_download_unknown_job() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = BiasConfig::default();
        let missing = uuid::Uuid::new_v4().to_string();
        let err = handle_download(&missing, None, &config, dir.path())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Not found"));
        assert!(handle_download("not-a-uuid", None, &config, dir.path())
            .await
            .is_err());
    }
}
