//! buildplan CLI
//!
//! Resolves a Flutter Android application module into a build plan.

use anyhow::Result;
use buildplan_android::dependency::VersionSource;
use buildplan_android::{load_module, BuildPlan, ConfigError, Resolver, ToolchainRegistry};
use buildplan_cli::output::{field, format_count, format_duration, Status};
use buildplan_core::config::Config;
use buildplan_core::error::{exit_codes, Error};
use buildplan_telemetry::{timed, TelemetryConfig};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};

const FIELD_WIDTH: usize = 20;

#[derive(Parser)]
#[command(name = "buildplan")]
#[command(about = "Resolve Flutter Android module configuration into a build plan")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase output verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Default)]
struct RegistryArgs {
    /// Registry file (TOML or JSON) with framework defaults and BoM catalogs
    #[arg(long)]
    registry: Option<PathBuf>,

    /// local.properties file supplying flutter.versionCode and flutter.versionName
    #[arg(long)]
    local_properties: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a module and print the build plan
    Resolve {
        /// Module file (.gradle.kts, .toml or .json)
        module: Option<PathBuf>,
        #[command(flatten)]
        registry: RegistryArgs,
        /// Output format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Resolve a module and report only whether it is valid
    Check {
        /// Module file (.gradle.kts, .toml or .json)
        module: Option<PathBuf>,
        #[command(flatten)]
        registry: RegistryArgs,
    },

    /// Print the dependency graph in DOT format
    Graph {
        /// Module file (.gradle.kts, .toml or .json)
        module: Option<PathBuf>,
        #[command(flatten)]
        registry: RegistryArgs,
    },

    /// Print the framework defaults and BoM catalog in effect
    Defaults {
        #[command(flatten)]
        registry: RegistryArgs,
        /// Output format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        owo_colors::set_override(false);
    }
    Status::set_quiet(cli.quiet);

    let config_path = cli.config.as_ref().map(|p| p.to_string_lossy().into_owned());
    let config = match Config::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            Status::error(&e.to_string());
            std::process::exit(e.exit_code());
        }
    };

    buildplan_telemetry::init_with_config(TelemetryConfig {
        log_level: log_level(cli.quiet, cli.verbose, &config.schema.logging.level),
        json: config.schema.logging.json,
        ansi: !cli.no_color,
        ..Default::default()
    })?;

    let default_format =
        OutputFormat::from_str(&config.schema.general.format, true).unwrap_or(OutputFormat::Text);
    let module_or_default =
        |module: Option<PathBuf>| module.unwrap_or_else(|| PathBuf::from(&config.schema.general.module_file));

    let exit_code = match cli.command {
        Commands::Resolve { module, registry, format } => {
            let module = module_or_default(module);
            let format = format.unwrap_or(default_format);
            match load_registry(&registry, &config, Some(&module)) {
                Ok(registry) => run_resolve(&module, &registry, format),
                Err(e) => report_error(&e, format),
            }
        }
        Commands::Check { module, registry } => {
            let module = module_or_default(module);
            match load_registry(&registry, &config, Some(&module)) {
                Ok(registry) => run_check(&module, &registry),
                Err(e) => report_error(&e, OutputFormat::Text),
            }
        }
        Commands::Graph { module, registry } => {
            let module = module_or_default(module);
            match load_registry(&registry, &config, Some(&module)) {
                Ok(registry) => run_graph(&module, &registry),
                Err(e) => report_error(&e, OutputFormat::Text),
            }
        }
        Commands::Defaults { registry, format } => {
            let format = format.unwrap_or(default_format);
            let module = PathBuf::from(&config.schema.general.module_file);
            match load_registry(&registry, &config, Some(&module)) {
                Ok(registry) => run_defaults(&registry, format),
                Err(e) => report_error(&e, format),
            }
        }
    };

    if cli.verbose > 0 {
        for (phase, duration) in buildplan_telemetry::timings() {
            eprintln!("{}", field(&phase, format_duration(duration), FIELD_WIDTH));
        }
    }

    std::process::exit(exit_code);
}

/// Log filter from the command line flags, falling back to the config file
fn log_level(quiet: bool, verbose: u8, configured: &str) -> String {
    match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => configured,
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    }
    .to_string()
}

/// `local.properties` of the Android project a module file belongs to
///
/// For `android/app/build.gradle.kts` that is `android/local.properties`.
fn local_properties_near(module: &Path) -> Option<PathBuf> {
    let candidate = module.parent()?.parent()?.join("local.properties");
    candidate.is_file().then_some(candidate)
}

fn load_registry(
    args: &RegistryArgs,
    config: &Config,
    module: Option<&Path>,
) -> buildplan_core::Result<ToolchainRegistry> {
    let mut registry = ToolchainRegistry::builtin();

    let registry_file = args
        .registry
        .clone()
        .or_else(|| config.schema.registry.path.as_ref().map(PathBuf::from));
    if let Some(path) = registry_file {
        tracing::debug!(path = %path.display(), "Loading registry file");
        registry = registry.load_file(&path)?;
    }

    let properties = args
        .local_properties
        .clone()
        .or_else(|| config.schema.registry.local_properties.as_ref().map(PathBuf::from))
        .or_else(|| module.and_then(local_properties_near));
    if let Some(path) = properties {
        tracing::debug!(path = %path.display(), "Loading local.properties");
        registry = registry.load_local_properties(&path)?;
    }

    Ok(registry)
}

fn print_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            exit_codes::SUCCESS
        }
        Err(e) => {
            Status::error(&format!("Failed to serialize output: {}", e));
            exit_codes::FAILURE
        }
    }
}

fn report_error(err: &Error, format: OutputFormat) -> i32 {
    match format {
        OutputFormat::Json => {
            print_json(&err.to_report());
        }
        OutputFormat::Text => Status::error(&err.to_string()),
    }
    err.exit_code()
}

fn report_violations(err: &ConfigError, format: OutputFormat) -> i32 {
    match format {
        OutputFormat::Json => {
            print_json(err);
        }
        OutputFormat::Text => {
            for violation in &err.violations {
                Status::error(&violation.to_string());
            }
            eprintln!();
            eprintln!(
                "{} found, nothing was resolved",
                format_count(err.violations.len(), "violation", "violations")
            );
        }
    }
    Error::from(err.clone()).exit_code()
}

fn resolve_module(module: &Path, registry: &ToolchainRegistry, format: OutputFormat) -> Result<BuildPlan, i32> {
    let spec = timed("load", || load_module(module)).map_err(|e| report_error(&e, format))?;
    timed("resolve", || Resolver::new(registry).resolve(&spec))
        .map_err(|e| report_violations(&e, format))
}

fn run_resolve(module: &Path, registry: &ToolchainRegistry, format: OutputFormat) -> i32 {
    let plan = match resolve_module(module, registry, format) {
        Ok(plan) => plan,
        Err(code) => return code,
    };

    match format {
        OutputFormat::Json => print_json(&plan),
        OutputFormat::Text => {
            print_plan(&plan);
            exit_codes::SUCCESS
        }
    }
}

fn print_plan(plan: &BuildPlan) {
    let bc = &plan.build_config;
    Status::header(&format!("Build plan for {}", plan.namespace));
    println!("{}", field("applicationId", &bc.application_id, FIELD_WIDTH));
    println!("{}", field("minSdk", bc.min_sdk, FIELD_WIDTH));
    println!("{}", field("targetSdk", bc.target_sdk, FIELD_WIDTH));
    println!("{}", field("compileSdk", bc.compile_sdk, FIELD_WIDTH));
    println!("{}", field("versionCode", bc.version_code, FIELD_WIDTH));
    println!("{}", field("versionName", &bc.version_name, FIELD_WIDTH));
    println!("{}", field("multiDexEnabled", bc.multi_dex_enabled, FIELD_WIDTH));
    if let Some(ndk) = &plan.ndk_version {
        println!("{}", field("ndkVersion", ndk, FIELD_WIDTH));
    }
    println!(
        "{}",
        field(
            "jvm",
            format!(
                "source {} / target {} / kotlin {}",
                plan.jvm.source_compatibility, plan.jvm.target_compatibility, plan.jvm.jvm_target
            ),
            FIELD_WIDTH
        )
    );
    if let Some(source) = &plan.flutter_source {
        println!("{}", field("flutter.source", source, FIELD_WIDTH));
    }

    Status::header("Plugins");
    for (i, id) in plan.plugins.iter().enumerate() {
        println!("  {}. {}", i + 1, id);
    }

    Status::header("Variants");
    for variant in plan.variants.values() {
        let mut flags = Vec::new();
        if variant.debuggable {
            flags.push("debuggable");
        }
        if variant.minify_enabled {
            flags.push("minify");
        }
        if variant.shrink_resources {
            flags.push("shrink");
        }
        let store = plan
            .signing_configs
            .get(&variant.signing_config)
            .map(|c| c.store_file.as_str())
            .unwrap_or("?");
        println!(
            "{}",
            field(
                &variant.name,
                format!("signed with {} ({}) {}", variant.signing_config, store, flags.join(" ")).trim_end(),
                FIELD_WIDTH
            )
        );
    }

    Status::header("Dependencies");
    for dep in &plan.dependencies {
        let via = match &dep.source {
            VersionSource::Bom { bom } if dep.version.is_some() => format!("  (pinned by {})", bom),
            VersionSource::Bom { bom } => format!("  (managed by {})", bom),
            VersionSource::Explicit if dep.platform => "  (platform)".to_string(),
            VersionSource::Explicit => String::new(),
        };
        println!("  {} {}{}", dep.configuration, dep.notation(), via);
    }

    for warning in &plan.warnings {
        Status::warning(&warning.to_string());
    }
}

fn run_check(module: &Path, registry: &ToolchainRegistry) -> i32 {
    let plan = match resolve_module(module, registry, OutputFormat::Text) {
        Ok(plan) => plan,
        Err(code) => return code,
    };

    for warning in &plan.warnings {
        Status::warning(&warning.to_string());
    }
    Status::success(&format!(
        "{} is valid ({}, {})",
        module.display(),
        format_count(plan.variants.len(), "variant", "variants"),
        format_count(plan.warnings.len(), "warning", "warnings")
    ));
    exit_codes::SUCCESS
}

fn run_graph(module: &Path, registry: &ToolchainRegistry) -> i32 {
    match resolve_module(module, registry, OutputFormat::Text) {
        Ok(plan) => {
            println!("{}", plan.to_dot());
            exit_codes::SUCCESS
        }
        Err(code) => code,
    }
}

fn run_defaults(registry: &ToolchainRegistry, format: OutputFormat) -> i32 {
    if format == OutputFormat::Json {
        return print_json(registry);
    }

    let fw = &registry.framework;
    let show = |v: Option<String>| v.unwrap_or_else(|| "(unset)".to_string());

    Status::header("Framework defaults");
    println!("{}", field("flutter.minSdkVersion", show(fw.min_sdk_version.map(|v| v.to_string())), FIELD_WIDTH));
    println!("{}", field("flutter.targetSdkVersion", show(fw.target_sdk_version.map(|v| v.to_string())), FIELD_WIDTH));
    println!("{}", field("flutter.compileSdkVersion", show(fw.compile_sdk_version.map(|v| v.to_string())), FIELD_WIDTH));
    println!("{}", field("flutter.ndkVersion", show(fw.ndk_version.clone()), FIELD_WIDTH));
    println!("{}", field("flutter.versionCode", show(fw.version_code.map(|v| v.to_string())), FIELD_WIDTH));
    println!("{}", field("flutter.versionName", show(fw.version_name.clone()), FIELD_WIDTH));
    if let Some(sdk) = &registry.sdk_path {
        println!("{}", field("flutter.sdk", sdk, FIELD_WIDTH));
    }

    if !registry.boms.is_empty() {
        Status::header("BoM catalog");
        for (bom, releases) in &registry.boms {
            for (version, artifacts) in releases {
                println!("  {}:{}", bom, version);
                for (artifact, pinned) in artifacts {
                    println!("    {} -> {}", artifact, pinned);
                }
            }
        }
    }

    exit_codes::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_log_level_flags() {
        assert_eq!(log_level(true, 3, "warn"), "error");
        assert_eq!(log_level(false, 0, "warn"), "warn");
        assert_eq!(log_level(false, 2, "warn"), "debug");
        assert_eq!(log_level(false, 5, "warn"), "trace");
    }

    #[test]
    fn test_local_properties_near_module() {
        let dir = TempDir::new().unwrap();
        let app = dir.path().join("android/app");
        fs::create_dir_all(&app).unwrap();
        let module = app.join("build.gradle.kts");
        assert!(local_properties_near(&module).is_none());

        fs::write(dir.path().join("android/local.properties"), "flutter.versionCode=7\n").unwrap();
        assert_eq!(
            local_properties_near(&module),
            Some(dir.path().join("android/local.properties"))
        );
    }

    #[test]
    fn test_registry_picks_up_local_properties() {
        let dir = TempDir::new().unwrap();
        let app = dir.path().join("android/app");
        fs::create_dir_all(&app).unwrap();
        fs::write(
            dir.path().join("android/local.properties"),
            "flutter.versionCode=7\nflutter.versionName=2.1.0\n",
        )
        .unwrap();

        let registry = load_registry(
            &RegistryArgs::default(),
            &Config::default(),
            Some(&app.join("build.gradle.kts")),
        )
        .unwrap();
        assert_eq!(registry.framework.version_code, Some(7));
        assert_eq!(registry.framework.version_name.as_deref(), Some("2.1.0"));
    }

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();

        let cli = Cli::try_parse_from(["buildplan", "resolve", "m.toml", "--format", "json", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Resolve { module, format, .. } => {
                assert_eq!(module, Some(PathBuf::from("m.toml")));
                assert_eq!(format, Some(OutputFormat::Json));
            }
            _ => panic!("expected resolve"),
        }
    }
}
