use std::fs;
use std::path::PathBuf;

use provision_core::BuildEnv;
use provision_toolchain::{ArtifactBuilder, BuildError, CommandLine, ScryptoToolchain, ToolchainConfig, DEFAULT_TARGET_DIR};
use uuid::Uuid;

fn workspace(component: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!("provision-toolchain-{}", Uuid::new_v4()));
    fs::create_dir_all(root.join(component)).unwrap();
    root
}

/// Simula el compilador: escribe el entorno recibido dentro de los artefactos.
fn fake_compiler(component: &str) -> CommandLine {
    let script = format!("mkdir -p {DEFAULT_TARGET_DIR} && printf \"$NETWORK_ID:$OWNER_RESOURCE\" > {DEFAULT_TARGET_DIR}/{component}.wasm && printf rpd > {DEFAULT_TARGET_DIR}/{component}.rpd");
    CommandLine { program: "sh".into(),
                  args: vec!["-c".into(), script] }
}

#[tokio::test]
async fn build_passes_env_and_archives_both_artifacts() {
    let root = workspace("oracle");
    let stale = root.join("oracle/stale.marker");
    fs::write(&stale, "x").unwrap();
    let config = ToolchainConfig::new(&root).with_build(fake_compiler("oracle"))
                                            .with_clean(Some(CommandLine::new("rm", &["-f", "stale.marker"])));
    let toolchain = ScryptoToolchain::new(config);

    let mut env = BuildEnv::new(2);
    env.insert("OWNER_RESOURCE", "resource_tdx_2_1a");
    let archive_dir = root.join("releases/2025010112_stokenet");
    let artifacts = toolchain.build("oracle", &env, &archive_dir).await.unwrap();

    assert!(!stale.exists());
    assert_eq!(artifacts.code, b"2:resource_tdx_2_1a".to_vec());
    assert_eq!(artifacts.definition, b"rpd".to_vec());
    assert_eq!(fs::read(archive_dir.join("oracle.wasm")).unwrap(), artifacts.code);
    assert_eq!(fs::read(archive_dir.join("oracle.rpd")).unwrap(), artifacts.definition);
    let digests = fs::read_to_string(archive_dir.join("oracle.sha256")).unwrap();
    assert!(digests.contains(&artifacts.code_sha256()));
}

#[tokio::test]
async fn successful_exit_without_artifacts_is_a_build_failure() {
    let root = workspace("keeper");
    let config = ToolchainConfig::new(&root).with_build(CommandLine::new("true", &[]))
                                            .with_clean(None);
    let err = ScryptoToolchain::new(config).build("keeper", &BuildEnv::new(2), &root.join("archive"))
                                           .await
                                           .unwrap_err();
    assert!(matches!(err, BuildError::MissingArtifact { ref component, .. } if component == "keeper"));
    assert!(!root.join("archive/keeper.wasm").exists());
}

#[tokio::test]
async fn non_zero_exit_is_reported_with_stderr() {
    let root = workspace("faucet");
    let failing = CommandLine { program: "sh".into(),
                                args: vec!["-c".into(), "echo boom >&2; exit 3".into()] };
    let config = ToolchainConfig::new(&root).with_build(failing).with_clean(None);
    let err = ScryptoToolchain::new(config).build("faucet", &BuildEnv::new(2), &root.join("archive"))
                                           .await
                                           .unwrap_err();
    match err {
        BuildError::CommandFailed { stderr, .. } => assert_eq!(stderr, "boom"),
        other => panic!("unexpected {other:?}"),
    }
}
