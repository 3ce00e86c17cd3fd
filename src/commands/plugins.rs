//! Plugin command handlers
//!
//! Handles `cbp plugins scan` and `cbp plugins manifest`.

use anyhow::{Context, Result};
use colored::*;
use std::path::Path;

use crate::config::ConfigStore;
use crate::plugins::{DylibLoader, PLUGIN_SDK_VERSION, PluginManager, read_manifest_from_archive};
use crate::ui;

pub struct ScanArgs<'a> {
    pub dir: &'a Path,
    pub resource_dir: Option<&'a Path>,
    pub settings: &'a Path,
    pub safe_mode: bool,
    pub attach: bool,
}

/// `cbp plugins scan`
pub fn scan(args: &ScanArgs<'_>) -> Result<()> {
    let config = ConfigStore::load(args.settings)
        .with_context(|| format!("Failed to read {}", args.settings.display()))?;
    let mut manager =
        PluginManager::new(Box::new(DylibLoader), config).with_settings_path(args.settings);
    if let Some(dir) = args.resource_dir {
        manager = manager.with_resource_dir(dir);
    }
    manager.set_safe_mode(args.safe_mode);

    if let Some(name) = manager.crashed_plugin() {
        ui::warning(format!(
            "plugin '{}' crashed the last time it was attached; consider disabling it",
            name.yellow()
        ));
    }

    let loaded = manager.scan_for_plugins(args.dir);
    if args.safe_mode {
        ui::note("safe mode: no plugins loaded");
        return Ok(());
    }
    if args.attach {
        let attached = manager.attach_enabled_plugins();
        ui::note(format!("{} of {} plugin(s) attached", attached, loaded));
    }

    let mut table = ui::Table::new(&["Plugin", "Version", "Library", "Enabled", "Attached"]);
    for element in manager.elements() {
        let enabled = manager.is_plugin_enabled(&element.info.name);
        table.add_row(vec![
            element.info.name.green().to_string(),
            element.info.version.clone(),
            element.file_name.clone(),
            if enabled { "yes".to_string() } else { "no".dimmed().to_string() },
            if element.is_attached() { "yes" } else { "no" }.to_string(),
        ]);
    }
    if table.is_empty() {
        ui::note(format!("no plugins found in {}", args.dir.display()));
    } else {
        table.print();
    }

    let config = manager.config().clone();
    manager.unload_all_plugins(false);
    config
        .save(args.settings)
        .with_context(|| format!("Failed to write {}", args.settings.display()))?;
    Ok(())
}

/// `cbp plugins manifest`
pub fn show_manifest(archive: &Path) -> Result<()> {
    let manifest = read_manifest_from_archive(archive)
        .with_context(|| format!("Failed to read manifest from {}", archive.display()))?;

    let sdk = if manifest.sdk_version == PLUGIN_SDK_VERSION {
        manifest.sdk_version.to_string().green()
    } else {
        format!("{} (host: {})", manifest.sdk_version, PLUGIN_SDK_VERSION).red()
    };
    println!("{}: {}", "SDK".bold(), sdk);

    for info in &manifest.plugins {
        println!();
        println!("{} {}", info.name.bold().cyan(), info.version);
        for (label, value) in [
            ("Title", &info.title),
            ("Description", &info.description),
            ("Author", &info.author),
            ("Email", &info.author_email),
            ("Website", &info.author_website),
            ("Thanks to", &info.thanks_to),
            ("License", &info.license),
        ] {
            if !value.is_empty() {
                println!("  {}: {}", label.bold(), value);
            }
        }
    }

    if !manifest.extra_files.is_empty() {
        println!("\n{}", "Extra files:".bold());
        for file in &manifest.extra_files {
            println!("  {}", file);
        }
    }
    Ok(())
}
