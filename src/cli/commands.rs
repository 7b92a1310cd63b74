//! Non-interactive commands: status, clear and config

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::{KycPaths, Settings};
use crate::error::KycResult;
use crate::models::{StepPlan, UserId};
use crate::storage::{FileStorage, ProgressStore};
use crate::wizard::saved_label;

use super::ledger::StatusLedger;

fn progress_store(paths: &KycPaths, settings: &Settings) -> ProgressStore<FileStorage> {
    ProgressStore::new(FileStorage::new(paths.progress_dir()), Arc::new(SystemClock))
        .with_staleness_ms(settings.staleness_ms())
}

/// Print the verification status and any saved progress for `user`
pub fn handle_status_command(
    paths: &KycPaths,
    settings: &Settings,
    user: &UserId,
) -> KycResult<()> {
    let ledger = StatusLedger::new(paths.status_file());
    let status = ledger.get(user)?;
    let store = progress_store(paths, settings);

    println!("User:          {}", user);
    println!("Verification:  {}", status);

    match store.read(&user.storage_key()) {
        Some(record) if record.has_values() => {
            let plan = StepPlan::kyc_default();
            let step = plan.step(record.step);
            println!(
                "Saved progress: step {} of {} ({}), {}",
                record.step + 1,
                plan.len(),
                step.name,
                saved_label(SystemClock.now_ms() - record.updated).to_lowercase()
            );
        }
        _ => println!("Saved progress: none"),
    }

    Ok(())
}

/// Remove saved progress for `user`, and optionally the recorded status
pub fn handle_clear_command(paths: &KycPaths, user: &UserId, status: bool) -> KycResult<()> {
    let store = ProgressStore::new(FileStorage::new(paths.progress_dir()), Arc::new(SystemClock));
    store.clear(&user.storage_key());
    println!("Cleared saved progress for {}.", user);

    if status {
        let ledger = StatusLedger::new(paths.status_file());
        if ledger.remove(user)? {
            println!("Cleared verification status for {}.", user);
        }
    }
    Ok(())
}

/// Print paths and effective settings
pub fn handle_config_command(paths: &KycPaths, settings: &Settings) -> KycResult<()> {
    println!("envelope-kyc Configuration");
    println!("==========================");
    println!("Base directory:     {}", paths.base_dir().display());
    println!("Progress directory: {}", paths.progress_dir().display());
    println!("Settings file:      {}", paths.settings_file().display());
    println!("Status file:        {}", paths.status_file().display());
    println!();
    println!("Settings:");
    println!("  Staleness (days):     {}", settings.staleness_days);
    println!("  Autosave delay (ms):  {}", settings.autosave_delay_ms);
    println!("  Advance cooldown (ms): {}", settings.advance_cooldown_ms);
    println!("  Cipher mode:          {:?}", settings.cipher_mode());
    println!("  Sensitive fields:     {}", settings.sensitive_fields.join(", "));
    Ok(())
}
