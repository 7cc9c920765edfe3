use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// 空の作業ディレクトリ (グローバル設定・環境変数から隔離)
pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write_config(&self, content: &str) {
        fs::write(self.root.path().join("sakuraform.yaml"), content).unwrap();
    }

    #[allow(dead_code)]
    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// このディレクトリで sakuraform を実行するコマンド
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("sakuraform").unwrap();
        cmd.current_dir(self.path())
            .env("XDG_CONFIG_HOME", self.path().join("xdg"))
            .env_remove("SAKURAFORM_CONFIG_PATH")
            .env_remove("SAKURACLOUD_ZONE")
            .env_remove("SAKURAFORM_USACLOUD");
        cmd
    }
}
