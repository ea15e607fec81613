use crate::config::AppConfigOverrides;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliOverrides {
    hdr: Option<PathBuf>,
    config: Option<PathBuf>,
    width: Option<u32>,
    height: Option<u32>,
}

impl CliOverrides {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = CliOverrides::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            let Some(key) = flag.strip_prefix("--") else {
                bail!("Unexpected argument '{flag}'. Use --hdr/--config/--width/--height with values.");
            };
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "hdr" => overrides.hdr = Some(PathBuf::from(value)),
                "config" => overrides.config = Some(PathBuf::from(value)),
                "width" => {
                    overrides.width = Some(parse_dimension("width", &value)?);
                }
                "height" => {
                    overrides.height = Some(parse_dimension("height", &value)?);
                }
                _ => bail!("Unknown flag '{flag}'. Supported flags: --hdr, --config, --width, --height."),
            }
        }
        Ok(overrides)
    }

    /// Config file named by `--config`, if any.
    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config.as_ref()
    }

    pub fn into_config_overrides(self) -> AppConfigOverrides {
        AppConfigOverrides { environment: self.hdr, width: self.width, height: self.height }
    }
}

fn parse_dimension(flag: &str, value: &str) -> Result<u32> {
    let parsed = value.parse::<u32>().with_context(|| format!("Invalid {flag} '{value}'"))?;
    if parsed == 0 {
        bail!("Invalid {flag} '{value}'. Must be at least 1.");
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_flags() {
        let args = ["kestrel_pbr", "--hdr", "sky.hdr", "--config", "pbr.json", "--width", "1600", "--height", "900"];
        let overrides = CliOverrides::parse(args).expect("parse overrides");
        assert_eq!(overrides.config_path(), Some(&PathBuf::from("pbr.json")));
        let config = overrides.into_config_overrides();
        assert_eq!(config.environment, Some(PathBuf::from("sky.hdr")));
        assert_eq!((config.width, config.height), (Some(1600), Some(900)));
    }

    #[test]
    fn latest_flag_wins() {
        let args = ["kestrel_pbr", "--width", "800", "--width", "1920", "--hdr", "a.hdr", "--hdr", "b.hdr"];
        let config = CliOverrides::parse(args).expect("parse overrides").into_config_overrides();
        assert_eq!(config.width, Some(1920));
        assert_eq!(config.height, None);
        assert_eq!(config.environment, Some(PathBuf::from("b.hdr")));
    }

    #[test]
    fn missing_value_errors() {
        let err = CliOverrides::parse(["kestrel_pbr", "--hdr"]).unwrap_err();
        assert!(err.to_string().contains("Expected a value"), "error should mention missing value");
    }

    #[test]
    fn rejects_unknown_flags_and_zero_sizes() {
        let err = CliOverrides::parse(["kestrel_pbr", "--vsync", "on"]).unwrap_err();
        assert!(err.to_string().contains("Unknown flag"), "unknown flags should error");
        assert!(CliOverrides::parse(["kestrel_pbr", "--height", "0"]).is_err());
        assert!(CliOverrides::parse(["kestrel_pbr", "--width", "wide"]).is_err());
    }

    #[test]
    fn no_arguments_means_no_overrides() {
        let overrides = CliOverrides::parse(["kestrel_pbr"]).expect("parse");
        assert!(overrides.config_path().is_none());
        assert!(overrides.into_config_overrides().is_empty());
    }
}
