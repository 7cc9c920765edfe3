use crate::utils;
use colored::Colorize;
use sakuraform_cloud::Upsert;
use sakuraform_cloud_sakura::{GslbServer, gslb_server_editor};
use sakuraform_config::ProviderConfig;

use super::super::GslbCommands;

pub async fn handle(cmd: GslbCommands, config: &ProviderConfig) -> anyhow::Result<()> {
    let editor = gslb_server_editor(utils::usacloud(config));

    match cmd {
        GslbCommands::AddServer {
            id,
            ip,
            weight,
            disabled,
        } => {
            let mut server = GslbServer::new(&ip).with_weight(weight);
            if disabled {
                server = server.disabled();
            }

            match editor.add_element(&id, server).await? {
                Upsert::Inserted => println!(
                    "{}",
                    format!("✓ GSLB {} に {} を追加しました", id, ip).green().bold()
                ),
                Upsert::Updated => println!(
                    "{}",
                    format!("✓ GSLB {} の {} を更新しました", id, ip).green().bold()
                ),
            }
        }
        GslbCommands::RemoveServer { id, ip } => {
            if editor.remove_element(&id, &ip).await? == 0 {
                println!("{}", format!("ℹ {} は登録されていません", ip).dimmed());
            } else {
                println!(
                    "{}",
                    format!("✓ GSLB {} から {} を削除しました", id, ip).green().bold()
                );
            }
        }
    }

    Ok(())
}
