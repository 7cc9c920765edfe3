use anyhow::Context;
use colored::Colorize;
use sakuraform_cloud::{ReconcileReport, ReconcilerConfig};
use sakuraform_cloud_sakura::Usacloud;
use sakuraform_config::ProviderConfig;
use serde::de::DeserializeOwned;
use std::path::Path;

/// 設定を読み込み、--zone を反映して検証する
pub fn load_config(zone: Option<&str>) -> anyhow::Result<ProviderConfig> {
    let mut config = ProviderConfig::load()?;
    if let Some(zone) = zone {
        config.zone = zone.to_string();
        config.validate()?;
    }
    tracing::debug!("Loaded config: {:?}", config);
    Ok(config)
}

pub fn usacloud(config: &ProviderConfig) -> Usacloud {
    Usacloud::new(&config.zone).with_program(&config.usacloud_path)
}

pub fn reconciler_config(config: &ProviderConfig) -> ReconcilerConfig {
    ReconcilerConfig {
        poll_interval: config.poll_interval(),
        power_timeout: config.power_timeout(),
    }
}

/// YAML の定義ファイルを読み込む
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("ファイルを読み込めません: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("YAMLの解析に失敗しました: {}", path.display()))
}

/// 実行したステップを表示
pub fn print_report(report: &ReconcileReport) {
    if report.steps.is_empty() {
        println!("  {}", "変更なし".dimmed());
        return;
    }
    for step in &report.steps {
        let mark = if step.is_disruptive() {
            "●".yellow()
        } else {
            "✓".green()
        };
        println!("  {} {}", mark, step);
    }
    println!(
        "  {}",
        format!("{} ステップ / {}ms", report.steps.len(), report.duration_ms).dimmed()
    );
}
