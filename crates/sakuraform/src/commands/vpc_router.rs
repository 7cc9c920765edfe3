use crate::utils;
use colored::Colorize;
use sakuraform_cloud::Upsert;
use sakuraform_cloud_sakura::{
    Direction, FirewallRule, FirewallRuleSet, RuleSetKey, firewall_editor,
};
use sakuraform_config::ProviderConfig;

use super::super::VpcRouterCommands;

pub async fn handle(cmd: VpcRouterCommands, config: &ProviderConfig) -> anyhow::Result<()> {
    let editor = firewall_editor(utils::usacloud(config));

    match cmd {
        VpcRouterCommands::SetFirewall {
            id,
            interface,
            direction,
            file,
        } => {
            let direction = parse_direction(&direction)?;
            let rules: Vec<FirewallRule> = utils::read_yaml(&file)?;
            let count = rules.len();

            println!(
                "{}",
                format!("VPCルーター {} の eth{} ({}) を設定中...", id, interface, direction).blue()
            );
            let outcome = editor
                .add_element(
                    &id,
                    FirewallRuleSet {
                        interface_index: interface,
                        direction,
                        rules,
                    },
                )
                .await?;

            let verb = match outcome {
                Upsert::Inserted => "設定",
                Upsert::Updated => "置き換え",
            };
            println!(
                "{}",
                format!("✓ {} 件のルールを{}して反映しました", count, verb)
                    .green()
                    .bold()
            );
        }
        VpcRouterCommands::RemoveFirewall {
            id,
            interface,
            direction,
        } => {
            let key = RuleSetKey {
                interface_index: interface,
                direction: parse_direction(&direction)?,
            };

            if editor.remove_element(&id, &key).await? == 0 {
                println!(
                    "{}",
                    format!("ℹ eth{} ({}) にルールはありません", interface, direction).dimmed()
                );
            } else {
                println!(
                    "{}",
                    format!("✓ eth{} ({}) のルールを削除して反映しました", interface, direction)
                        .green()
                        .bold()
                );
            }
        }
    }

    Ok(())
}

fn parse_direction(direction: &str) -> anyhow::Result<Direction> {
    direction.parse::<Direction>().map_err(|e| anyhow::anyhow!(e))
}
