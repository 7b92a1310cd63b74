//! CLI command handlers
//!
//! This module contains the terminal front end: the interactive wizard and
//! the status, clear and config commands.

pub mod commands;
pub mod ledger;
pub mod prompt;
pub mod wizard;

pub use commands::{handle_clear_command, handle_config_command, handle_status_command};
pub use ledger::StatusLedger;
pub use prompt::{Console, FieldInput};
pub use wizard::{run_session, run_wizard, WizardExit};
