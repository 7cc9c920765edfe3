mod commands;
mod utils;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sakuraform")]
#[command(about = "さくらのクラウドを宣言的に収束させる", long_about = None)]
struct Cli {
    /// 操作対象のゾーン (設定ファイル・SAKURACLOUD_ZONE より優先)
    #[arg(short, long, global = true)]
    zone: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// サーバーを管理
    #[command(subcommand)]
    Server(ServerCommands),
    /// GSLBの宛先サーバーを管理
    #[command(subcommand)]
    Gslb(GslbCommands),
    /// VPCルーターのファイアウォールを管理
    #[command(subcommand)]
    VpcRouter(VpcRouterCommands),
    /// 解決済みの設定を表示
    Config,
    /// バージョン情報を表示
    Version,
}

/// サーバー管理のサブコマンド
#[derive(Subcommand)]
enum ServerCommands {
    /// 定義との差分と必要な操作を表示（変更しない）
    Plan {
        /// サーバーID
        id: String,
        /// サーバー定義ファイル (YAML)
        #[arg(short, long)]
        file: PathBuf,
    },
    /// サーバーを定義に収束させる
    Apply {
        /// サーバーID
        id: String,
        /// サーバー定義ファイル (YAML)
        #[arg(short, long)]
        file: PathBuf,
        /// 再起動を伴う変更でも確認なしで実行
        #[arg(short, long)]
        yes: bool,
    },
    /// 定義からサーバーを作成して起動
    Create {
        /// サーバー定義ファイル (YAML)
        #[arg(short, long)]
        file: PathBuf,
    },
    /// サーバーを停止して削除
    Destroy {
        /// サーバーID
        id: String,
        /// 強制停止してから削除
        #[arg(long)]
        force: bool,
        /// 確認なしで実行
        #[arg(short, long)]
        yes: bool,
    },
    /// 稼働中のサーバーをリセット（ハードリブート）
    Reset {
        /// サーバーID
        id: String,
        /// 確認なしで実行
        #[arg(short, long)]
        yes: bool,
    },
}

/// GSLBのサブコマンド
#[derive(Subcommand)]
enum GslbCommands {
    /// 宛先サーバーを追加（同じIPがあれば更新）
    AddServer {
        /// GSLB ID
        id: String,
        /// 宛先サーバーのIPアドレス
        #[arg(long)]
        ip: String,
        /// 重み (重み付け応答時)
        #[arg(long, default_value = "1")]
        weight: u32,
        /// 無効状態で登録
        #[arg(long)]
        disabled: bool,
    },
    /// 宛先サーバーを削除
    RemoveServer {
        /// GSLB ID
        id: String,
        /// 宛先サーバーのIPアドレス
        #[arg(long)]
        ip: String,
    },
}

/// VPCルーターのサブコマンド
#[derive(Subcommand)]
enum VpcRouterCommands {
    /// インターフェースの送信/受信ルールを設定して反映
    SetFirewall {
        /// VPCルーターID
        id: String,
        /// インターフェース番号 (0-7)
        #[arg(long)]
        interface: usize,
        /// 方向 (send / receive)
        #[arg(long)]
        direction: String,
        /// ルール定義ファイル (YAML)
        #[arg(short, long)]
        file: PathBuf,
    },
    /// インターフェースの送信/受信ルールを削除して反映
    RemoveFirewall {
        /// VPCルーターID
        id: String,
        /// インターフェース番号 (0-7)
        #[arg(long)]
        interface: usize,
        /// 方向 (send / receive)
        #[arg(long)]
        direction: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログはstderrへ (RUST_LOG 未指定時は info)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("sakuraform {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = utils::load_config(cli.zone.as_deref())?;

    // コマンドディスパッチ
    match cli.command {
        Commands::Server(cmd) => commands::server::handle(cmd, &config).await?,
        Commands::Gslb(cmd) => commands::gslb::handle(cmd, &config).await?,
        Commands::VpcRouter(cmd) => commands::vpc_router::handle(cmd, &config).await?,
        Commands::Config => commands::config::handle(&config)?,
        Commands::Version => {
            unreachable!("Version is handled before config loading");
        }
    }

    Ok(())
}
