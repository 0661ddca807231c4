//! Filepath: src/infra/config.rs
//! Layered configuration for a split run.
//!
//! Sources, lowest priority first:
//!   1. `batchsplit.toml` / `.yaml` / `.json` / `.batchsplit.toml` (first found)
//!   2. `.env` in the working directory
//!   3. process environment (`BATCH_SIZE`, `INPUT_DIR`, ...)
//!   4. command-line flags
//!
//! Values stay strings until `Settings::resolve`, which validates them once.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs, SplitArgs};
use crate::core::packer::CopyPolicy;
use crate::error::ConfigError;
use crate::infra::filters::{ExtensionFilter, IgnoreRules};

/// Config file names checked in order; the first one present wins.
pub const CONFIG_FILES: &[&str] = &[
    "batchsplit.toml",
    "batchsplit.yaml",
    "batchsplit.json",
    ".batchsplit.toml",
];

/// Environment keys read from `.env` and the process environment.
pub const KNOWN_KEYS: &[&str] = &[
    "BATCH_SIZE",
    "RENAME_INPUT_FILES",
    "ALLOWED_EXTENSIONS",
    "INPUT_DIR",
    "BATCH_DIR",
    "WRITE_MANIFEST",
    "ON_COPY_ERROR",
    "IGNORE_NAMES",
];

const DEFAULT_INPUT_DIR: &str = "./input_files";
const DEFAULT_BATCH_DIR: &str = "./batches";

/// Raw configuration as read from files and environment.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Batch limit in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<String>,

    /// `"true"` enables in-place renaming
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rename_input_files: Option<String>,

    /// Comma-separated extensions or `*`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_extensions: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_dir: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_dir: Option<String>,

    /// `"false"` disables batch_manifest.json
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_manifest: Option<String>,

    /// `continue` or `abort`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_copy_error: Option<String>,

    /// Extra names to skip, comma-separated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_names: Option<String>,
}

impl Config
{
    /// Defaults written by `batchsplit init`.
    pub fn template() -> Self
    {
        Self {
            batch_size: Some("1073741824".to_string()),
            rename_input_files: Some("false".to_string()),
            allowed_extensions: Some("*".to_string()),
            input_dir: Some(DEFAULT_INPUT_DIR.to_string()),
            batch_dir: Some(DEFAULT_BATCH_DIR.to_string()),
            write_manifest: Some("true".to_string()),
            on_copy_error: Some("continue".to_string()),
            ignore_names: Some(String::new()),
        }
    }

    /// Let command-line flags win over every other source.
    pub fn apply_overrides(
        &mut self,
        args: &SplitArgs,
    )
    {
        if let Some(input) = &args.input
        {
            self.input_dir = Some(
                input
                    .to_string_lossy()
                    .into_owned(),
            );
        }
        if let Some(output) = &args.output
        {
            self.batch_dir = Some(
                output
                    .to_string_lossy()
                    .into_owned(),
            );
        }
        if let Some(size) = args.batch_size
        {
            self.batch_size = Some(size.to_string());
        }
        if args.rename
        {
            self.rename_input_files = Some("true".to_string());
        }
        if let Some(ext) = &args.extensions
        {
            self.allowed_extensions = Some(ext.clone());
        }
        if args.no_manifest
        {
            self.write_manifest = Some("false".to_string());
        }
        if args.fail_fast
        {
            self.on_copy_error = Some("abort".to_string());
        }
    }
}

/// Load configuration for the current working directory.
pub fn load_config() -> Result<Config, ConfigError>
{
    let cwd = Path::new(".");
    let mut env = read_dotenv(&cwd.join(".env"))?;

    // Process environment beats .env
    for (key, value) in std::env::vars()
    {
        if KNOWN_KEYS.contains(&key.as_str())
        {
            env.insert(key, value);
        }
    }

    load_config_from(cwd, env)
}

/// Build a `Config` from the first config file in `dir` overlaid with `env`.
/// Keys in `env` that are not `KNOWN_KEYS` are ignored.
pub fn load_config_from(
    dir: &Path,
    env: HashMap<String, String>,
) -> Result<Config, ConfigError>
{
    let mut builder = config::Config::builder();

    for name in CONFIG_FILES
    {
        let path = dir.join(name);
        if path.is_file()
        {
            builder = builder.add_source(config::File::from(path));
            break;
        }
    }

    let env: HashMap<String, String> = env
        .into_iter()
        .filter(|(k, _)| KNOWN_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.to_lowercase(), v))
        .collect();
    builder = builder.add_source(config::Environment::default().source(Some(env)));

    let parsed = builder
        .build()?
        .try_deserialize()?;
    Ok(parsed)
}

/// Read `KEY=VALUE` pairs from a dotenv file. A missing file yields nothing.
fn read_dotenv(path: &Path) -> Result<HashMap<String, String>, ConfigError>
{
    let to_err = |source: dotenvy::Error| ConfigError::DotEnv {
        path: path.to_path_buf(),
        source,
    };

    let iter = match dotenvy::from_path_iter(path)
    {
        Ok(iter) => iter,
        Err(e) if e.not_found() => return Ok(HashMap::new()),
        Err(e) => return Err(to_err(e)),
    };

    let mut vars = HashMap::new();
    for item in iter
    {
        let (key, value) = item.map_err(to_err)?;
        vars.insert(key, value);
    }
    Ok(vars)
}

/// Validated run settings.
#[derive(Debug, Clone)]
pub struct Settings
{
    pub batch_size: u64,
    pub rename: bool,
    pub extensions: ExtensionFilter,
    pub ignore: IgnoreRules,
    pub input_dir: PathBuf,
    pub batch_dir: PathBuf,
    pub write_manifest: bool,
    pub copy_policy: CopyPolicy,
}

impl Settings
{
    pub fn resolve(cfg: &Config) -> Result<Self, ConfigError>
    {
        let raw_size = cfg
            .batch_size
            .as_deref()
            .ok_or(ConfigError::MissingBatchSize)?;
        let batch_size = match raw_size
            .trim()
            .parse::<u64>()
        {
            Ok(n) if n > 0 => n,
            _ =>
            {
                return Err(ConfigError::InvalidBatchSize {
                    value: raw_size.to_string(),
                });
            }
        };

        let extensions = match cfg
            .allowed_extensions
            .as_deref()
        {
            Some(raw) => ExtensionFilter::parse(raw)?,
            None => ExtensionFilter::Any,
        };

        let ignore = IgnoreRules::new(
            cfg.ignore_names
                .as_deref()
                .unwrap_or_default()
                .split(','),
        );

        let copy_policy = match cfg
            .on_copy_error
            .as_deref()
        {
            Some(raw) => raw.parse()?,
            None => CopyPolicy::default(),
        };

        Ok(Self {
            batch_size,
            rename: cfg.rename_input_files.as_deref() == Some("true"),
            extensions,
            ignore,
            input_dir: expand_path(cfg.input_dir.as_deref(), DEFAULT_INPUT_DIR)?,
            batch_dir: expand_path(cfg.batch_dir.as_deref(), DEFAULT_BATCH_DIR)?,
            write_manifest: cfg.write_manifest.as_deref() != Some("false"),
            copy_policy,
        })
    }
}

/// Expand `~` and `$VAR` in a configured path.
fn expand_path(
    raw: Option<&str>,
    default: &str,
) -> Result<PathBuf, ConfigError>
{
    let raw = raw.unwrap_or(default);
    let expanded = shellexpand::full(raw).map_err(|source| ConfigError::InvalidPath {
        value: raw.to_string(),
        source,
    })?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// `batchsplit init`: write the default config file.
pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join(CONFIG_FILES[0]);

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let toml_string = toml::to_string_pretty(&Config::template())
        .context("Failed to serialize default config")?;

    if ctx.dry_run
    {
        println!("Would write {}:\n{toml_string}", config_path.display());
        return Ok(());
    }

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String>
    {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_env_overrides_file()
    {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path()
                .join("batchsplit.toml"),
            "batch_size = 100\nallowed_extensions = \"jpg\"\ninput_dir = \"media\"\n",
        )
        .unwrap();

        let cfg = load_config_from(
            tmp.path(),
            env(&[("ALLOWED_EXTENSIONS", "png,mp4"), ("UNRELATED", "x")]),
        )
        .unwrap();

        assert_eq!(cfg.batch_size.as_deref(), Some("100"));
        assert_eq!(cfg.allowed_extensions.as_deref(), Some("png,mp4"));
        assert_eq!(cfg.input_dir.as_deref(), Some("media"));
        assert_eq!(cfg.batch_dir, None);
    }

    #[test]
    fn test_dotenv_reads_pairs_and_tolerates_missing_file()
    {
        let tmp = TempDir::new().unwrap();
        assert!(
            read_dotenv(
                &tmp.path()
                    .join(".env")
            )
            .unwrap()
            .is_empty()
        );

        let path = tmp
            .path()
            .join(".env");
        fs::write(&path, "BATCH_SIZE=500\nRENAME_INPUT_FILES=true\n").unwrap();
        let vars = read_dotenv(&path).unwrap();
        assert_eq!(vars.get("BATCH_SIZE").map(String::as_str), Some("500"));
        assert_eq!(vars.get("RENAME_INPUT_FILES").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_resolve_defaults()
    {
        let cfg = Config {
            batch_size: Some(" 2048 ".to_string()),
            ..Config::default()
        };
        let s = Settings::resolve(&cfg).unwrap();

        assert_eq!(s.batch_size, 2048);
        assert!(!s.rename);
        assert_eq!(s.extensions, ExtensionFilter::Any);
        assert_eq!(s.input_dir, PathBuf::from("./input_files"));
        assert_eq!(s.batch_dir, PathBuf::from("./batches"));
        assert!(s.write_manifest);
        assert_eq!(s.copy_policy, CopyPolicy::Continue);
    }

    #[test]
    fn test_resolve_rejects_bad_values()
    {
        assert!(matches!(
            Settings::resolve(&Config::default()),
            Err(ConfigError::MissingBatchSize)
        ));

        for bad in ["0", "-5", "1GB", ""]
        {
            let cfg = Config {
                batch_size: Some(bad.to_string()),
                ..Config::default()
            };
            assert!(
                matches!(Settings::resolve(&cfg), Err(ConfigError::InvalidBatchSize { .. })),
                "{bad:?} should be rejected"
            );
        }

        let cfg = Config {
            batch_size: Some("10".to_string()),
            on_copy_error: Some("retry".to_string()),
            ..Config::default()
        };
        assert!(matches!(
            Settings::resolve(&cfg),
            Err(ConfigError::InvalidCopyPolicy { .. })
        ));
    }

    #[test]
    fn test_flags_override_config()
    {
        let mut cfg = Config::template();
        cfg.apply_overrides(&SplitArgs {
            batch_size: Some(42),
            rename: true,
            no_manifest: true,
            fail_fast: true,
            extensions: Some("JPG".to_string()),
            ..SplitArgs::default()
        });

        let s = Settings::resolve(&cfg).unwrap();
        assert_eq!(s.batch_size, 42);
        assert!(s.rename);
        assert!(!s.write_manifest);
        assert_eq!(s.copy_policy, CopyPolicy::Abort);
        assert!(
            s.extensions
                .allows("a.jpg")
        );
    }

    #[test]
    fn test_rename_requires_exact_true()
    {
        let cfg = Config {
            batch_size: Some("1".to_string()),
            rename_input_files: Some("TRUE".to_string()),
            ..Config::default()
        };
        assert!(
            !Settings::resolve(&cfg)
                .unwrap()
                .rename
        );
    }

    #[test]
    fn test_template_round_trips_through_toml()
    {
        let tmp = TempDir::new().unwrap();
        let text = toml::to_string_pretty(&Config::template()).unwrap();
        fs::write(
            tmp.path()
                .join("batchsplit.toml"),
            text,
        )
        .unwrap();

        let cfg = load_config_from(tmp.path(), HashMap::new()).unwrap();
        let s = Settings::resolve(&cfg).unwrap();
        assert_eq!(s.batch_size, 1_073_741_824);
    }
}
