use crate::utils;
use colored::Colorize;
use sakuraform_cloud::{Disruption, ServerLifecycleReconciler, ServerSpec};
use sakuraform_cloud_sakura::SakuraCloudClient;
use sakuraform_config::ProviderConfig;
use std::sync::Arc;

use super::super::ServerCommands;

pub async fn handle(cmd: ServerCommands, config: &ProviderConfig) -> anyhow::Result<()> {
    let client = Arc::new(SakuraCloudClient::new(utils::usacloud(config)));
    let reconciler = ServerLifecycleReconciler::new(client, utils::reconciler_config(config));

    match cmd {
        ServerCommands::Plan { id, file } => {
            let spec: ServerSpec = utils::read_yaml(&file)?;
            println!(
                "{}",
                format!("サーバー {} の差分を確認中 (zone: {})...", id, config.zone).blue()
            );

            let preview = reconciler.plan(&id, &spec).await?;
            print_preview(&preview);
        }
        ServerCommands::Apply { id, file, yes } => {
            let spec: ServerSpec = utils::read_yaml(&file)?;
            let preview = reconciler.plan(&id, &spec).await?;
            print_preview(&preview);

            // 確認（再起動を伴う場合のみ）
            if preview.disruption == Disruption::PowerCycle && !yes {
                println!();
                println!(
                    "{}",
                    "⚠ 警告: この変更にはサーバーの停止・再起動が必要です"
                        .yellow()
                        .bold()
                );
                println!("実行するには --yes オプションを指定してください");
                return Ok(());
            }

            println!();
            println!(
                "{}",
                format!("サーバー {} を収束中...", id).green()
            );
            let outcome = reconciler.reconcile(&id, &spec).await?;
            utils::print_report(&outcome.report);

            println!();
            if outcome.instance.id != id {
                println!(
                    "{}",
                    format!("ℹ プラン変更によりIDが {} に変わりました", outcome.instance.id).cyan()
                );
            }
            println!(
                "{}",
                format!(
                    "✓ '{}' ({}) は {} です",
                    outcome.instance.name, outcome.instance.id, outcome.instance.status
                )
                .green()
                .bold()
            );
        }
        ServerCommands::Create { file } => {
            let spec: ServerSpec = utils::read_yaml(&file)?;
            println!(
                "{}",
                format!(
                    "サーバー '{}' を作成中 ({}core/{}MB, zone: {})...",
                    spec.name, spec.core, spec.memory_mb, config.zone
                )
                .green()
            );

            let outcome = reconciler.create(&spec).await?;
            utils::print_report(&outcome.report);

            println!();
            println!(
                "{}",
                format!(
                    "✓ '{}' を作成しました (ID: {})",
                    outcome.instance.name, outcome.instance.id
                )
                .green()
                .bold()
            );
        }
        ServerCommands::Destroy { id, force, yes } => {
            if !yes {
                println!(
                    "{}",
                    format!("⚠ 警告: サーバー {} を削除します", id).red().bold()
                );
                println!("  ディスクは残ります。実行するには --yes を指定してください。");
                return Ok(());
            }

            println!("{}", format!("サーバー {} を削除中...", id).red());
            let report = reconciler.destroy(&id, force).await?;
            utils::print_report(&report);

            println!();
            println!("{}", format!("✓ サーバー {} を削除しました", id).green().bold());
        }
        ServerCommands::Reset { id, yes } => {
            if !yes {
                println!(
                    "{}",
                    format!("⚠ 警告: サーバー {} を強制的に再起動します", id)
                        .yellow()
                        .bold()
                );
                println!("実行するには --yes オプションを指定してください");
                return Ok(());
            }

            reconciler.reset(&id).await?;
            println!("{}", format!("✓ サーバー {} をリセットしました", id).green().bold());
        }
    }

    Ok(())
}

fn print_preview(preview: &sakuraform_cloud::ReconcilePreview) {
    if !preview.has_changes() {
        println!("{}", "✓ 変更はありません".green());
        return;
    }

    println!("{}", "変更内容:".bold());
    println!("  {}", preview);
    for op in &preview.nic_operations {
        println!("    • {}", op);
    }

    let note = match preview.disruption {
        Disruption::None => "停止なしで適用できます".green(),
        Disruption::WhileStopped => "停止中のまま適用します".cyan(),
        Disruption::PowerCycle => "停止 → 変更 → 起動 を行います".yellow(),
    };
    println!("  {}", note);
}
