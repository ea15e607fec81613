use kestrel_pbr::cli::CliOverrides;
use kestrel_pbr::config::AppConfig;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

#[test]
fn command_line_wins_over_config_file() {
    let mut file = NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"{{ "environment": "studio.hdr", "renderer": {{ "width": 800, "height": 600 }}, "ibl": {{ "prefilter_mip_levels": 6 }} }}"#
    )
    .expect("write config");
    let path = file.path().to_string_lossy().into_owned();

    let cli = CliOverrides::parse(["kestrel_pbr", "--config", path.as_str(), "--hdr", "sunset.hdr", "--width", "1024"])
        .expect("parse cli");
    let mut config = AppConfig::load_or_default(cli.config_path().expect("config path"));
    assert_eq!(config.environment, Some(PathBuf::from("studio.hdr")));

    let overrides = cli.into_config_overrides();
    assert_eq!(overrides.applied_fields(), vec!["environment", "width"]);
    config.apply_overrides(&overrides);
    assert_eq!(config.environment, Some(PathBuf::from("sunset.hdr")));
    assert_eq!((config.renderer.width, config.renderer.height), (1024, 600));
    assert_eq!(config.ibl.prefilter_mip_levels, 6);
    assert_eq!(config.ibl.irradiance_size, 32);
}

#[test]
fn missing_config_file_uses_defaults() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = AppConfig::load_or_default(dir.path().join("absent.json"));
    assert_eq!(config, AppConfig::default());
    assert!(config.renderer.skybox);
    assert_eq!(config.renderer.flat_ambient, [0.03, 0.03, 0.03]);
    assert_eq!(config.ibl.environment_size, 1024);
}
