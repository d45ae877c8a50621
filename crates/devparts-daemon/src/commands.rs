//! One-shot commands

use crate::TvOutCommand;
use anyhow::{Context, Result, bail};
use devparts_config::{DevPartsConfig, SettingsStore};
use devparts_hal::{
    ControlEntry, DriverFactory, FsChannel, NativeTvOutFactory, SettingsPanel, TvOutController,
};
use tracing::info;

/// Sysfs access as configured
pub fn channel(config: &DevPartsConfig) -> FsChannel {
    match &config.controls.sysfs_root {
        Some(root) => FsChannel::with_root(root),
        None => FsChannel::new(),
    }
}

pub fn panel(config: &DevPartsConfig) -> SettingsPanel<FsChannel> {
    SettingsPanel::new(channel(config), config.controls.control_points())
}

fn open_store(config: &DevPartsConfig) -> Result<SettingsStore> {
    let path = &config.daemon.settings_path;
    SettingsStore::open(path).with_context(|| format!("Failed to open {}", path.display()))
}

pub fn list(config: &DevPartsConfig, json: bool) -> Result<()> {
    let store = open_store(config)?;
    let entries = panel(config).entries(&store);

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        print!("{}", render_entries(&entries));
    }
    Ok(())
}

fn render_entries(entries: &[ControlEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let state = match (entry.supported, entry.enabled) {
            (false, _) => "unsupported",
            (true, false) => "disabled",
            (true, true) => "",
        };
        let mut line = format!("{:<26} {:<6} {}", entry.key, entry.value.to_string(), state);
        if !entry.choices.is_empty() {
            line.push_str(&format!(" [{}]", entry.choices.join(", ")));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

pub fn set(config: &DevPartsConfig, key: &str, value: &str) -> Result<()> {
    let mut store = open_store(config)?;
    let outcome = panel(config).change(&mut store, key, value)?;
    store.save().context("Failed to save settings")?;

    println!("{} = {}", key, outcome.value);
    for (id, enabled) in outcome.dependents {
        println!("{} {}", id, if enabled { "enabled" } else { "disabled" });
    }
    Ok(())
}

pub fn calibrate_gyro(config: &DevPartsConfig) -> Result<()> {
    if !panel(config).calibrate_gyro() {
        bail!("Gyroscope calibration is not supported on this device");
    }
    println!("The gyroscope has been successfully calibrated!");
    Ok(())
}

pub fn restore(config: &DevPartsConfig) -> Result<usize> {
    let store = open_store(config)?;
    Ok(panel(config).restore(&store))
}

pub fn tvout(config: &DevPartsConfig, action: TvOutCommand) -> Result<()> {
    let factory = NativeTvOutFactory::new(&config.tvout.library_path);
    tvout_with(TvOutController::new(factory), action)
}

fn tvout_with<F: DriverFactory>(
    mut controller: TvOutController<F>,
    action: TvOutCommand,
) -> Result<()> {
    match action {
        TvOutCommand::Status { json } => {
            let Some(status) = controller.driver_status() else {
                bail!("TV-out driver unavailable");
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("streaming:       {}", status.streaming);
                println!("cable connected: {}", status.cable_connected);
                println!("suspended:       {}", status.suspended);
                println!("subtitles:       {}", status.subtitles);
            }
        }
        TvOutCommand::Resolution { value } => {
            if !controller.set_resolution(value) {
                bail!("Failed to set resolution {}", value);
            }
            info!("Resolution set to {}", value);
        }
        TvOutCommand::OutputMode { value } => {
            if !controller.set_output_mode(value) {
                bail!("Failed to set output mode {}", value);
            }
            info!("Output mode set to {}", value);
        }
        TvOutCommand::Subtitles { enabled } => {
            if !controller.set_subtitle_status(enabled) {
                bail!("Failed to switch subtitles");
            }
            info!("Subtitles {}", if enabled { "enabled" } else { "disabled" });
        }
    }

    controller.release();
    Ok(())
}
