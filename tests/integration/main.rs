//! Integration tests for the Solana buildpack

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;

    fn buildpack() -> Command {
        cargo_bin_cmd!("solana-buildpack")
    }

    #[test]
    fn help_displays() {
        buildpack()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Solana Buildpack"))
            .stdout(predicate::str::contains("detect"))
            .stdout(predicate::str::contains("build"));
    }

    #[test]
    fn version_displays() {
        buildpack()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("solana-buildpack"));
    }

    #[test]
    fn build_requires_layers_dir() {
        buildpack()
            .env_remove("CNB_LAYERS_DIR")
            .env_remove("CNB_BUILDPACK_DIR")
            .arg("build")
            .assert()
            .failure()
            .stderr(predicate::str::contains("--layers-dir"));
    }
}

mod detect_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn detect(app: &TempDir, plan: &std::path::Path) -> Command {
        let mut cmd = cargo_bin_cmd!("solana-buildpack");
        cmd.arg("detect")
            .arg("--app-dir")
            .arg(app.path())
            .env("CNB_BUILD_PLAN_PATH", plan);
        cmd
    }

    #[test]
    fn solana_program_passes_and_writes_plan() {
        let app = TempDir::new().unwrap();
        fs::write(app.path().join("Cargo.toml"), "[package]\nname = \"hello\"\n").unwrap();
        fs::create_dir(app.path().join("src")).unwrap();
        fs::write(app.path().join("src/lib.rs"), "").unwrap();
        let plan = app.path().join("plan.toml");

        detect(&app, &plan).assert().code(0);

        let content = fs::read_to_string(&plan).unwrap();
        assert!(content.contains("[[provides]]"));
        assert!(content.contains("[[requires]]"));
        assert!(content.contains("name = \"solana\""));
    }

    #[test]
    fn non_solana_tree_fails_with_100() {
        let app = TempDir::new().unwrap();
        fs::write(app.path().join("package.json"), "{}").unwrap();
        let plan = app.path().join("plan.toml");

        detect(&app, &plan)
            .assert()
            .code(100)
            .stderr(predicate::str::contains("Error").not());

        assert!(!plan.exists());
    }

    #[test]
    fn manifest_without_sources_fails_with_100() {
        let app = TempDir::new().unwrap();
        fs::write(app.path().join("Cargo.toml"), "[package]\nname = \"hello\"\n").unwrap();
        let plan = app.path().join("plan.toml");

        detect(&app, &plan).assert().code(100);
    }
}

#[cfg(unix)]
mod build_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use flate2::write::GzEncoder;
    use predicates::prelude::*;
    use sha2::{Digest, Sha256};
    use std::fs;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const SOLANA_STUB: &str = r#"#!/bin/sh
echo "solana $*" >> "$SOLANA_STUB_LOG"
if [ "$1" = "--version" ]; then
  echo "solana-cli 1.17.17 (stub)"
fi
"#;

    const CARGO_STUB: &str = r#"#!/bin/sh
echo "cargo $*" >> "$SOLANA_STUB_LOG"
mkdir -p target/deploy
touch target/deploy/hello_world.so
"#;

    struct Workspace {
        dir: TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path();

            let app = root.join("app");
            fs::create_dir_all(app.join("src")).unwrap();
            fs::write(
                app.join("Cargo.toml"),
                "[package]\nname = \"hello-world\"\nversion = \"0.1.0\"\n",
            )
            .unwrap();
            fs::write(app.join("src/lib.rs"), "").unwrap();

            fs::create_dir_all(root.join("layers")).unwrap();
            fs::create_dir_all(root.join("cache")).unwrap();
            fs::write(root.join("plan.toml"), "[[entries]]\nname = \"solana\"\n").unwrap();

            let archive = root.join("solana-release.tar.gz");
            let sha256 = write_release(&archive);
            let buildpack = root.join("buildpack");
            fs::create_dir_all(&buildpack).unwrap();
            fs::write(
                buildpack.join("buildpack.toml"),
                descriptor(&archive, &sha256),
            )
            .unwrap();

            Self { dir }
        }

        fn path(&self, relative: &str) -> PathBuf {
            self.dir.path().join(relative)
        }

        fn build(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("solana-buildpack");
            cmd.arg("build")
                .arg("--app-dir")
                .arg(self.path("app"))
                .env("CNB_LAYERS_DIR", self.path("layers"))
                .env("CNB_BUILDPACK_DIR", self.path("buildpack"))
                .env("CNB_BP_PLAN_PATH", self.path("plan.toml"))
                .env("CNB_STACK_ID", "io.buildpacks.stacks.jammy")
                .env_remove("CNB_PLATFORM_DIR")
                .env("XDG_CACHE_HOME", self.path("cache"))
                .env("SOLANA_STUB_LOG", self.path("commands.log"))
                .env("BP_SOLANA_DEPLOY_NETWORK", "devnet")
                .env("BP_DEVNET_ENDPOINT", "https://api.devnet.example")
                .env("BP_SOLANA_DEPLOY_KEYPAIR", r#"{"key":"abc"}"#)
                .env("BP_DEPLOY_SOLANA_CONTRACT", "true");
            cmd
        }

        fn commands(&self) -> Vec<String> {
            fs::read_to_string(self.path("commands.log"))
                .unwrap_or_default()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    fn write_release(path: &Path) -> String {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, script) in [
            ("solana-release/bin/solana", SOLANA_STUB),
            ("solana-release/bin/cargo", CARGO_STUB),
        ] {
            let mut header = tar::Header::new_gnu();
            header.set_size(script.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, name, script.as_bytes()).unwrap();
        }

        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&builder.into_inner().unwrap()).unwrap();
        let bytes = encoder.finish().unwrap();
        fs::write(path, &bytes).unwrap();
        hex::encode(Sha256::digest(&bytes))
    }

    fn descriptor(archive: &Path, sha256: &str) -> String {
        format!(
            r#"api = "0.8"

[buildpack]
id = "amp-buildpacks/solana"
name = "Solana Buildpack"
version = "0.3.0"

[[stacks]]
id = "io.buildpacks.stacks.jammy"

[[metadata.configurations]]
name = "BP_SOLANA_CLI_VERSION"
default = "1.17.*"
description = "the Solana CLI version"
build = true

[[metadata.configurations]]
name = "BP_SOLANA_DEPLOY_KEYPAIR"
description = "the wallet keypair"
build = true
secret = true

[[metadata.dependencies]]
id = "solana-cli"
name = "Solana CLI"
version = "1.17.17"
uri = "file://{}"
sha256 = "{}"
stacks = ["io.buildpacks.stacks.jammy"]
strip-components = 1
"#,
            archive.display(),
            sha256
        )
    }

    #[test]
    fn build_contributes_layer_and_launch_processes() {
        let workspace = Workspace::new();

        workspace
            .build()
            .assert()
            .success()
            .stdout(predicate::str::contains("Solana CLI 1.17.17: Contributing to layer"))
            .stdout(predicate::str::contains("solana-cli 1.17.17 (stub)"))
            .stdout(predicate::str::contains("<redacted>"))
            .stdout(predicate::str::contains(r#"{"key":"abc"}"#).not());

        assert_eq!(
            workspace.commands(),
            vec![
                "solana --version".to_string(),
                "cargo build-sbf".to_string(),
                "solana config set --url https://api.devnet.example".to_string(),
                "solana config set --keypair /tmp/solana-keypair.json".to_string(),
            ]
        );
        assert!(workspace.path("app/target/deploy/hello_world.so").is_file());

        let layer = fs::read_to_string(workspace.path("layers/solana-cli.toml")).unwrap();
        assert!(layer.contains("launch = true"));
        assert!(layer.contains("sha256"));

        let launch = fs::read_to_string(workspace.path("layers/launch.toml")).unwrap();
        assert!(launch.contains("type = \"deploy\""));
        assert!(launch.contains("target/deploy/hello_world.so"));
    }

    #[test]
    fn rebuild_reuses_cached_layer() {
        let workspace = Workspace::new();
        workspace.build().assert().success();

        workspace
            .build()
            .assert()
            .success()
            .stdout(predicate::str::contains("Reusing cached layer"));

        assert_eq!(workspace.commands().len(), 4);
    }

    #[test]
    fn missing_endpoint_fails_build() {
        let workspace = Workspace::new();

        workspace
            .build()
            .env_remove("BP_DEVNET_ENDPOINT")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("unable to configure deploy network"))
            .stderr(predicate::str::contains("BP_DEVNET_ENDPOINT"));

        assert!(workspace
            .commands()
            .iter()
            .all(|line| !line.starts_with("solana config set")));
        assert!(!workspace.path("layers/solana-cli.toml").exists());
    }

    #[test]
    fn unknown_stack_fails_resolution() {
        let workspace = Workspace::new();

        workspace
            .build()
            .env("CNB_STACK_ID", "io.buildpacks.stacks.bionic")
            .assert()
            .failure()
            .stderr(predicate::str::contains("no valid dependencies for solana-cli"));

        assert!(workspace.commands().is_empty());
    }
}
