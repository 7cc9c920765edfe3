use colored::Colorize;
use sakuraform_config::ProviderConfig;

pub fn handle(config: &ProviderConfig) -> anyhow::Result<()> {
    match &config.source {
        Some(path) => println!(
            "📄 読み込んだ設定ファイル: {}",
            path.display().to_string().cyan()
        ),
        None => println!("{}", "設定ファイルなし (デフォルト値)".dimmed()),
    }
    println!();
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}
