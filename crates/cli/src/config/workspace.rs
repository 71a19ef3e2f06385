use std::path::Path;

/// Solidity toolchain a project is built with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toolchain {
    Foundry,
    Hardhat,
    Unknown,
}

impl Toolchain {
    pub fn detect(project_root: &Path) -> Self {
        if project_root.join("foundry.toml").exists() {
            return Toolchain::Foundry;
        }

        let hardhat = ["hardhat.config.ts", "hardhat.config.js", "hardhat.config.cjs"];
        if hardhat.iter().any(|name| project_root.join(name).exists()) {
            return Toolchain::Hardhat;
        }

        Toolchain::Unknown
    }

    pub fn label(self) -> &'static str {
        match self {
            Toolchain::Foundry => "Foundry",
            Toolchain::Hardhat => "Hardhat",
            Toolchain::Unknown => "plain ABI files",
        }
    }

    /// Where compiled artifacts end up
    pub fn artifacts_dir(self) -> &'static str {
        match self {
            Toolchain::Foundry => "out",
            Toolchain::Hardhat => "artifacts/contracts",
            Toolchain::Unknown => "abis",
        }
    }

    /// Files in the artifacts directory that are not contract artifacts
    pub fn excludes(self) -> &'static [&'static str] {
        match self {
            Toolchain::Foundry => &["build-info/**"],
            Toolchain::Hardhat => &["**/*.dbg.json"],
            Toolchain::Unknown => &[],
        }
    }

    /// Compiler invocation that rebuilds artifacts on source changes
    pub fn watch_command(self) -> Option<(&'static str, &'static [&'static str])> {
        match self {
            Toolchain::Foundry => Some(("forge", &["build", "--watch"])),
            Toolchain::Hardhat | Toolchain::Unknown => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detect() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(Toolchain::detect(temp_dir.path()), Toolchain::Unknown);

        std::fs::write(temp_dir.path().join("hardhat.config.ts"), "").unwrap();
        assert_eq!(Toolchain::detect(temp_dir.path()), Toolchain::Hardhat);

        std::fs::write(temp_dir.path().join("foundry.toml"), "[profile.default]").unwrap();
        assert_eq!(Toolchain::detect(temp_dir.path()), Toolchain::Foundry);
    }
}
