//! Interactive verification wizard
//!
//! Walks the step plan field by field, saving progress as the user types and
//! offering to pick up where they left off on the next run.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::config::{KycPaths, Settings};
use crate::error::{KycError, KycResult};
use crate::form::{FormBinding, MemoryForm};
use crate::models::{FieldValues, UserId, VerificationStatus};
use crate::storage::{FileStorage, KeyValueStore};
use crate::wizard::{saved_label, Advance, PersistenceCoordinator, Phase, RequiredFields};

use super::ledger::StatusLedger;
use super::prompt::{field_label, Console, FieldInput};

/// How a wizard session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardExit {
    /// The form was submitted for verification
    Submitted,
    /// The user saved and left
    Saved,
    /// The user left; whatever was already written stays
    Left,
    /// Verification is already pending or approved
    AlreadyVerified(VerificationStatus),
}

type Session<S> = PersistenceCoordinator<S, MemoryForm>;

enum Flow {
    Continue,
    Exit(WizardExit),
}

/// Run the wizard for `user` against the on-disk progress store
pub fn run_wizard(
    paths: &KycPaths,
    settings: &Settings,
    user: UserId,
    console: &mut Console,
) -> KycResult<WizardExit> {
    paths.ensure_directories()?;
    let backend = FileStorage::new(paths.progress_dir());
    let ledger = StatusLedger::new(paths.status_file());
    run_session(backend, &ledger, settings, user, Arc::new(SystemClock), console)
}

/// Run the wizard over any backend
pub fn run_session<S: KeyValueStore>(
    backend: S,
    ledger: &StatusLedger,
    settings: &Settings,
    user: UserId,
    clock: Arc<dyn Clock>,
    console: &mut Console,
) -> KycResult<WizardExit> {
    let config = settings.wizard_config();
    let cooldown = Duration::from_millis(settings.advance_cooldown_ms);
    let form = MemoryForm::new(config.plan.all_fields());
    let status = ledger.get(&user)?;
    let mut session = PersistenceCoordinator::new(
        user.clone(),
        backend,
        form,
        Arc::clone(&clock),
        config,
    );

    if status.ends_progress() {
        session.observe_status(status);
        println!("Your verification is {}. There is nothing left to fill in.", status);
        return Ok(WizardExit::AlreadyVerified(status));
    }

    println!();
    println!("===========================================");
    println!("  Identity Verification");
    println!("===========================================");
    println!();
    if status == VerificationStatus::Rejected {
        println!("Your last submission was rejected. Please review your details.");
        println!();
    }
    println!("Type :back to return to the previous step, :save to save and exit,");
    println!("or :quit to leave. Press Enter to keep a value in [brackets].");
    println!();

    if session.mount() == Phase::Prompting {
        if let Flow::Exit(exit) = offer_resume(&mut session, clock.as_ref(), console)? {
            return Ok(exit);
        }
    }

    'steps: loop {
        session.tick();
        if session.steps().on_review() {
            match review(&mut session, ledger, &user, console)? {
                Flow::Continue => continue 'steps,
                Flow::Exit(exit) => return Ok(exit),
            }
        }

        let plan_len = session.steps().plan().len();
        let index = session.step();
        let step = session.steps().current().clone();
        println!("Step {} of {}: {}", index + 1, plan_len, field_label(&step.name));

        for field in step.all_fields() {
            let current = session.form().get(field).unwrap_or("").to_string();
            let is_sensitive = is_masked(&session, field);
            let mut label = field_label(field);
            if step.optional.iter().any(|f| f == field) {
                label.push_str(" (optional)");
            }

            match console.field(&label, &current, is_sensitive)? {
                FieldInput::Value(value) => session.edit(field, &value),
                FieldInput::Keep => {}
                FieldInput::Back => {
                    session.previous();
                    println!();
                    continue 'steps;
                }
                FieldInput::Save => return Ok(save_and_exit(&mut session)),
                FieldInput::Quit => return Ok(leave(&mut session)),
            }
            session.tick();
        }

        loop {
            match session.next(&RequiredFields) {
                Advance::Advanced(_) | Advance::AtEnd => break,
                Advance::Invalid(errors) => {
                    println!();
                    for (field, message) in &errors {
                        println!("  {}: {}", field_label(field), message);
                    }
                    break;
                }
                Advance::Ignored => thread::sleep(cooldown),
            }
        }
        if let Some(label) = session.saved_label() {
            println!("  ({})", label);
        }
        println!();
    }
}

fn offer_resume<S: KeyValueStore>(
    session: &mut Session<S>,
    clock: &dyn Clock,
    console: &mut Console,
) -> KycResult<Flow> {
    let Some(prompt) = session.prompt() else {
        return Ok(Flow::Continue);
    };
    let step_name = session.steps().plan().step(prompt.step).name.clone();
    println!(
        "You have saved progress on step {} ({}). {}.",
        prompt.step + 1,
        field_label(&step_name),
        saved_label(clock.now_ms() - prompt.saved_at)
    );

    let choice = console.choice("[r]esume, [s]tart over or [d]ismiss? [r]: ", 'r')?;
    match choice {
        None => return Ok(Flow::Exit(WizardExit::Left)),
        Some('s') => {
            session.start_over();
            println!("Starting over.");
        }
        Some('d') => {
            session.dismiss_resume();
            println!("Saved progress kept; starting from the first step.");
        }
        Some(_) => {
            let step = session.apply_resume();
            while session.is_restoring() {
                thread::sleep(Duration::from_millis(5));
                session.tick();
            }
            debug!(step, "resumed from saved progress");
            println!("Resuming.");
        }
    }
    println!();
    Ok(Flow::Continue)
}

fn review<S: KeyValueStore>(
    session: &mut Session<S>,
    ledger: &StatusLedger,
    user: &UserId,
    console: &mut Console,
) -> KycResult<Flow> {
    let values = session.form().values();
    print_summary(session, &values);

    let Some(answer) = console.line("Submit for verification? (yes/no/back) [yes]: ")? else {
        return Ok(Flow::Exit(leave(session)));
    };
    match answer.to_lowercase().as_str() {
        "" | "y" | "yes" => {}
        "b" | "back" | ":back" => {
            session.previous();
            println!();
            return Ok(Flow::Continue);
        }
        _ => return Ok(Flow::Exit(leave(session))),
    }

    let mut submitter = |_: &FieldValues| -> KycResult<VerificationStatus> {
        ledger
            .record(user, VerificationStatus::Pending)
            .map_err(|e| KycError::Submission(format!("Could not record submission: {}", e)))?;
        Ok(VerificationStatus::Pending)
    };
    match session.submit(&RequiredFields, &mut submitter) {
        Ok(status) => {
            println!();
            println!("Submitted. Verification status: {}", status);
            Ok(Flow::Exit(WizardExit::Submitted))
        }
        Err(KycError::Validation(message)) => {
            println!("{}", message);
            session.previous();
            println!();
            Ok(Flow::Continue)
        }
        Err(e) => Err(e),
    }
}

fn print_summary<S: KeyValueStore>(session: &Session<S>, values: &FieldValues) {
    println!("Review your details");
    println!("-------------------");
    for step in session.steps().plan().iter() {
        for field in step.all_fields() {
            let value = values.get(field).map(String::as_str).unwrap_or("");
            let shown = if value.is_empty() {
                "-".to_string()
            } else if is_masked(session, field) {
                "****".to_string()
            } else {
                value.to_string()
            };
            println!("  {:<20} {}", field_label(field), shown);
        }
    }
    println!();
}

fn is_masked<S: KeyValueStore>(session: &Session<S>, field: &str) -> bool {
    session.sensitive_fields().iter().any(|s| s == field)
}

fn save_and_exit<S: KeyValueStore>(session: &mut Session<S>) -> WizardExit {
    if session.save_now(true) {
        println!("Progress saved. Run the wizard again to continue.");
    } else {
        println!("Nothing to save.");
    }
    WizardExit::Saved
}

fn leave<S: KeyValueStore>(session: &mut Session<S>) -> WizardExit {
    session.save_now(false);
    println!("Leaving the wizard.");
    WizardExit::Left
}
