//! Persistence coordinator
//!
//! Glues the live form to the progress store. On mount it looks for saved
//! progress and, if there is any worth offering, holds all writes until the
//! user decides to resume, start over or dismiss. Once active, every edit
//! schedules a throttled write and every step change writes immediately.
//!
//! ```text
//! Idle --mount--> Prompting --resume/start over/dismiss--> Active
//!   \--mount (nothing saved)---------------------------->/
//! Active --status pending/approved--> Completed
//! ```
//!
//! Nothing in here returns an error to the screen except `submit`; storage
//! and codec failures degrade to "not saved" or "field not restored".

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::clock::Clock;
use crate::crypto::{encode_fields, CipherMode, FieldCodec, SensitiveFieldCodec};
use crate::error::{KycError, KycResult};
use crate::form::FormBinding;
use crate::models::{
    has_any_value, FieldValues, ProgressRecord, StepPlan, StorageKey, UserId, VerificationStatus,
};
use crate::storage::{KeyValueStore, ProgressStore, DEFAULT_STALENESS_MS};
use crate::throttle::WriteThrottle;

use super::controller::{Advance, StepController, DEFAULT_ADVANCE_COOLDOWN_MS};
use super::resume::{DecodeTask, ResumePrompt};
use super::submit::VerificationSubmitter;
use super::validation::{validate_fields, FieldValidator};

/// Default autosave throttle delay in milliseconds
pub const DEFAULT_AUTOSAVE_DELAY_MS: i64 = 200;

/// Where the coordinator is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Saved progress has not been looked at yet
    Idle,
    /// Saved progress was found; waiting on the user's decision
    Prompting,
    /// Edits are being persisted
    Active,
    /// Verification was submitted; nothing is persisted anymore
    Completed,
}

/// Tunables for one wizard session
#[derive(Debug, Clone)]
pub struct WizardConfig {
    pub plan: StepPlan,
    pub sensitive_fields: Vec<String>,
    pub staleness_ms: i64,
    pub autosave_delay_ms: i64,
    pub advance_cooldown_ms: i64,
    pub cipher_mode: CipherMode,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            plan: StepPlan::kyc_default(),
            sensitive_fields: vec!["dateOfBirth".to_string(), "ssnLast4".to_string()],
            staleness_ms: DEFAULT_STALENESS_MS,
            autosave_delay_ms: DEFAULT_AUTOSAVE_DELAY_MS,
            advance_cooldown_ms: DEFAULT_ADVANCE_COOLDOWN_MS,
            cipher_mode: CipherMode::Authenticated,
        }
    }
}

struct PendingResume {
    step: usize,
    saved_at: i64,
    stored: FieldValues,
    decode: DecodeTask,
}

/// Keeps one user's wizard progress on disk while they fill it in
pub struct PersistenceCoordinator<S: KeyValueStore, F: FormBinding> {
    user: UserId,
    key: StorageKey,
    store: ProgressStore<S>,
    codec: Arc<dyn FieldCodec>,
    clock: Arc<dyn Clock>,
    form: F,
    steps: StepController,
    sensitive: Vec<String>,
    phase: Phase,
    throttle: WriteThrottle,
    prompt: Option<PendingResume>,
    late_values: Option<DecodeTask>,
    // Stored (still encoded) values backing the form until `late_values` lands
    restore_base: Option<FieldValues>,
    edited_since_resume: BTreeSet<String>,
    last_saved: Option<i64>,
}

impl<S: KeyValueStore, F: FormBinding> PersistenceCoordinator<S, F> {
    /// Create a coordinator in the `Idle` phase
    pub fn new(
        user: UserId,
        backend: S,
        form: F,
        clock: Arc<dyn Clock>,
        config: WizardConfig,
    ) -> Self {
        let store = ProgressStore::new(backend, Arc::clone(&clock))
            .with_staleness_ms(config.staleness_ms);
        let steps = StepController::new(config.plan).with_cooldown_ms(config.advance_cooldown_ms);

        Self {
            key: user.storage_key(),
            user,
            store,
            codec: Arc::new(SensitiveFieldCodec::with_mode(config.cipher_mode)),
            clock,
            form,
            steps,
            sensitive: config.sensitive_fields,
            phase: Phase::Idle,
            throttle: WriteThrottle::new(config.autosave_delay_ms),
            prompt: None,
            late_values: None,
            restore_base: None,
            edited_since_resume: BTreeSet::new(),
            last_saved: None,
        }
    }

    /// Replace the field codec
    pub fn with_codec(mut self, codec: Arc<dyn FieldCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether writes are being withheld
    pub fn is_suspended(&self) -> bool {
        self.phase != Phase::Active
    }

    /// The live form
    pub fn form(&self) -> &F {
        &self.form
    }

    /// The step controller
    pub fn steps(&self) -> &StepController {
        &self.steps
    }

    /// Current step index
    pub fn step(&self) -> usize {
        self.steps.index()
    }

    /// The user this session belongs to
    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// The key progress is stored under
    pub fn storage_key(&self) -> &StorageKey {
        &self.key
    }

    /// Fields encoded before they are written
    pub fn sensitive_fields(&self) -> &[String] {
        &self.sensitive
    }

    /// The underlying progress store
    pub fn store(&self) -> &ProgressStore<S> {
        &self.store
    }

    /// When progress was last written, in epoch ms
    pub fn last_saved(&self) -> Option<i64> {
        self.last_saved
    }

    /// Whether decoded values from an accepted resume are still on their way
    pub fn is_restoring(&self) -> bool {
        self.late_values.is_some()
    }

    /// Look for saved progress and decide whether to prompt
    pub fn mount(&mut self) -> Phase {
        if self.phase != Phase::Idle {
            return self.phase;
        }

        let record = match self.store.read(&self.key) {
            Some(record) if record.has_values() => record,
            Some(_) => {
                debug!(key = %self.key, "saved progress has no values, starting fresh");
                self.phase = Phase::Active;
                return self.phase;
            }
            None => {
                self.phase = Phase::Active;
                return self.phase;
            }
        };

        info!(key = %self.key, step = record.step, "found saved progress");
        let step = record.step.min(self.steps.plan().last_editable_index());
        let decode = DecodeTask::spawn(
            Arc::clone(&self.codec),
            record.data.clone(),
            self.sensitive.clone(),
            self.user.clone(),
        );
        self.prompt = Some(PendingResume {
            step,
            saved_at: record.updated,
            stored: record.data,
            decode,
        });
        self.phase = Phase::Prompting;
        self.phase
    }

    /// The pending resume offer, if any; never blocks
    pub fn prompt(&mut self) -> Option<ResumePrompt> {
        let pending = self.prompt.as_mut()?;
        let values = pending.decode.poll().cloned();
        Some(ResumePrompt {
            step: pending.step,
            saved_at: pending.saved_at,
            values,
        })
    }

    /// The pending resume offer once decoding has finished
    pub fn wait_prompt(&mut self) -> Option<ResumePrompt> {
        let pending = self.prompt.as_mut()?;
        let values = pending.decode.wait().clone();
        Some(ResumePrompt {
            step: pending.step,
            saved_at: pending.saved_at,
            values: Some(values),
        })
    }

    /// Accept the resume offer
    ///
    /// The step jump happens now. Values are applied now if decoding is done,
    /// otherwise on the first `tick` after it finishes, skipping any field
    /// the user has edited in between. Writes made in the meantime keep the
    /// stored values for every field the user has not touched.
    pub fn apply_resume(&mut self) -> usize {
        let Some(mut pending) = self.prompt.take() else {
            return self.steps.index();
        };

        let step = self.steps.jump_to(pending.step);
        self.edited_since_resume.clear();
        if let Some(values) = pending.decode.poll().cloned() {
            self.apply_values(&values);
        } else {
            debug!("resume accepted before decode finished, values will follow");
            self.late_values = Some(pending.decode);
            self.restore_base = Some(pending.stored);
        }

        if self.phase == Phase::Prompting {
            self.phase = Phase::Active;
        }
        info!(key = %self.key, step, "resumed saved progress");
        step
    }

    /// Throw away saved progress and begin again from a blank form
    pub fn start_over(&mut self) {
        self.store.clear(&self.key);
        self.throttle.cancel();
        self.form.reset();
        self.steps.reset();
        self.prompt = None;
        self.late_values = None;
        self.restore_base = None;
        self.edited_since_resume.clear();
        self.last_saved = None;
        if self.phase != Phase::Completed {
            self.phase = Phase::Active;
        }
        info!(key = %self.key, "started over");
    }

    /// Close the resume offer without applying or deleting saved progress
    pub fn dismiss_resume(&mut self) {
        self.prompt = None;
        if self.phase == Phase::Prompting {
            self.phase = Phase::Active;
        }
    }

    /// Set a field and notify the write path
    pub fn edit(&mut self, field: &str, value: &str) {
        self.form.set_value(field, value);
        self.field_changed(field);
    }

    /// Watch callback: `field` changed in the live form
    pub fn field_changed(&mut self, field: &str) {
        if self.late_values.is_some() {
            self.edited_since_resume.insert(field.to_string());
        }
        if self.phase == Phase::Active {
            self.throttle
                .schedule(self.form.values(), self.clock.now_ms());
        }
    }

    /// Idle tick: deliver late resume values and flush a due write
    pub fn tick(&mut self) {
        if let Some(task) = self.late_values.as_mut() {
            if let Some(values) = task.poll().cloned() {
                self.late_values = None;
                self.restore_base = None;
                self.apply_values(&values);
                if self.phase == Phase::Active {
                    self.throttle
                        .schedule(self.form.values(), self.clock.now_ms());
                }
            }
        }

        if self.phase == Phase::Active {
            if let Some(snapshot) = self.throttle.take_due(self.clock.now_ms()) {
                self.persist(&snapshot);
            }
        }
    }

    /// Advance one step, saving the values under the step being entered
    pub fn next(&mut self, validator: &dyn FieldValidator) -> Advance {
        let snapshot = self.form.values();
        let outcome = self.steps.next(&snapshot, validator, self.clock.now_ms());
        if matches!(outcome, Advance::Advanced(_)) {
            self.persist_transition(&snapshot);
        }
        outcome
    }

    /// Go back one step, saving the values under the step being entered
    pub fn previous(&mut self) -> usize {
        let snapshot = self.form.values();
        let before = self.steps.index();
        let index = self.steps.previous();
        if index != before {
            self.persist_transition(&snapshot);
        }
        index
    }

    /// Write immediately, skipping the throttle
    ///
    /// `forced` also writes while a resume decision is pending.
    pub fn save_now(&mut self, forced: bool) -> bool {
        match self.phase {
            Phase::Completed => return false,
            Phase::Active => {}
            Phase::Idle | Phase::Prompting if forced => {}
            Phase::Idle | Phase::Prompting => return false,
        }
        self.throttle.cancel();
        let snapshot = self.form.values();
        self.persist(&snapshot)
    }

    /// React to the verification status reported by the provider
    pub fn observe_status(&mut self, status: VerificationStatus) {
        if status.ends_progress() {
            self.store.clear(&self.key);
            self.throttle.cancel();
            self.prompt = None;
            self.late_values = None;
            self.restore_base = None;
            self.phase = Phase::Completed;
            info!(key = %self.key, %status, "verification in progress, saved progress cleared");
        } else if self.phase == Phase::Completed {
            self.phase = Phase::Active;
        }
    }

    /// Validate the whole form and hand it to the provider
    pub fn submit(
        &mut self,
        validator: &dyn FieldValidator,
        submitter: &mut dyn VerificationSubmitter,
    ) -> KycResult<VerificationStatus> {
        let values = self.form.values();
        let required = self.steps.plan().required_fields();
        if let Err(errors) = validate_fields(validator, &values, &required) {
            let fields: Vec<&str> = errors.keys().map(String::as_str).collect();
            return Err(KycError::Validation(format!(
                "Please complete: {}",
                fields.join(", ")
            )));
        }

        let status = submitter.submit(&values)?;
        self.observe_status(status);
        Ok(status)
    }

    /// "Saved just now" style feedback for the UI
    pub fn saved_label(&self) -> Option<String> {
        let saved = self.last_saved?;
        Some(saved_label(self.clock.now_ms() - saved))
    }

    fn persist_transition(&mut self, snapshot: &FieldValues) {
        if self.phase == Phase::Active {
            // The transition write carries the same snapshot any pending write would
            self.throttle.cancel();
            self.persist(snapshot);
        }
    }

    fn persist(&mut self, snapshot: &FieldValues) -> bool {
        let mut data = encode_fields(self.codec.as_ref(), snapshot, &self.sensitive, &self.user);
        if let Some(base) = &self.restore_base {
            // Untouched fields have not been restored into the form yet
            let mut merged = base.clone();
            for field in &self.edited_since_resume {
                if let Some(value) = data.remove(field) {
                    merged.insert(field.clone(), value);
                }
            }
            data = merged;
        }
        if !has_any_value(&data) {
            return false;
        }

        let step = self
            .steps
            .index()
            .min(self.steps.plan().last_editable_index());
        let now = self.clock.now_ms();
        let record = ProgressRecord::new(step, data, now);

        let saved = self.store.write(&self.key, &record);
        if saved {
            self.last_saved = Some(now);
            debug!(key = %self.key, step, "progress saved");
        }
        saved
    }

    fn apply_values(&mut self, values: &FieldValues) {
        for (field, value) in values {
            if !self.edited_since_resume.contains(field) {
                self.form.set_value(field, value);
            }
        }
        self.edited_since_resume.clear();
    }
}

/// Format the age of the last save
pub fn saved_label(age_ms: i64) -> String {
    let minutes = age_ms.max(0) / 60_000;
    match minutes {
        0 => "Saved just now".to_string(),
        1 => "Saved 1 minute ago".to_string(),
        n => format!("Saved {} minutes ago", n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::crypto::{ENCRYPTED_PREFIX, OBFUSCATED_PREFIX};
    use crate::form::MemoryForm;
    use crate::storage::MemoryStorage;
    use crate::wizard::validation::RequiredFields;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Condvar, Mutex};
    use std::time::Duration;

    const NOW: i64 = 1_760_000_000_000;
    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    type TestCoordinator<S> = PersistenceCoordinator<S, MemoryForm>;

    fn coordinator_for<S: KeyValueStore>(
        backend: S,
        clock: &ManualClock,
        user: &str,
    ) -> TestCoordinator<S> {
        let config = WizardConfig::default();
        let form = MemoryForm::new(config.plan.all_fields());
        PersistenceCoordinator::new(
            UserId::new(user),
            backend,
            form,
            Arc::new(clock.clone()),
            config,
        )
    }

    fn coordinator(backend: &MemoryStorage, clock: &ManualClock) -> TestCoordinator<MemoryStorage> {
        coordinator_for(backend.clone(), clock, "42")
    }

    fn put_record(backend: &MemoryStorage, user: &str, record: &ProgressRecord) {
        let key = UserId::new(user).storage_key();
        backend
            .set_item(key.as_str(), &serde_json::to_string(record).unwrap())
            .unwrap();
    }

    fn stored(backend: &MemoryStorage, user: &str) -> Option<ProgressRecord> {
        let key = UserId::new(user).storage_key();
        backend
            .get_item(key.as_str())
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }

    fn data(pairs: &[(&str, &str)]) -> FieldValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn fill_personal<S: KeyValueStore>(c: &mut TestCoordinator<S>) {
        c.edit("legalFirstName", "Jane");
        c.edit("legalLastName", "Doe");
        c.edit("dateOfBirth", "1990-04-01");
    }

    fn fill_address<S: KeyValueStore>(c: &mut TestCoordinator<S>) {
        c.edit("addressLine1", "1 Main St");
        c.edit("city", "Springfield");
        c.edit("region", "IL");
        c.edit("postalCode", "62701");
        c.edit("country", "US");
    }

    fn fill_identity<S: KeyValueStore>(c: &mut TestCoordinator<S>) {
        c.edit("ssnLast4", "1234");
        c.edit("occupation", "Engineer");
    }

    /// Counts writes that reach the backend
    #[derive(Clone, Default)]
    struct CountingStorage {
        inner: MemoryStorage,
        writes: Arc<AtomicUsize>,
    }

    impl KeyValueStore for CountingStorage {
        fn get_item(&self, key: &str) -> KycResult<Option<String>> {
            self.inner.get_item(key)
        }

        fn set_item(&self, key: &str, value: &str) -> KycResult<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set_item(key, value)
        }

        fn remove_item(&self, key: &str) -> KycResult<()> {
            self.inner.remove_item(key)
        }
    }

    /// Holds every decode until the gate is opened
    struct GatedCodec {
        inner: SensitiveFieldCodec,
        gate: Arc<(Mutex<bool>, Condvar)>,
    }

    impl FieldCodec for GatedCodec {
        fn encode(&self, value: &str, user: &UserId) -> String {
            self.inner.encode(value, user)
        }

        fn decode(&self, value: &str, user: &UserId) -> Option<String> {
            let (lock, cvar) = &*self.gate;
            let mut open = lock.lock().unwrap();
            while !*open {
                open = cvar.wait(open).unwrap();
            }
            drop(open);
            self.inner.decode(value, user)
        }
    }

    #[test]
    fn test_resume_saved_progress() {
        let backend = MemoryStorage::new();
        let clock = ManualClock::new(NOW);
        put_record(
            &backend,
            "42",
            &ProgressRecord::new(2, data(&[("legalFirstName", "Jane")]), NOW),
        );

        let mut c = coordinator(&backend, &clock);
        assert_eq!(c.mount(), Phase::Prompting);
        assert!(c.is_suspended());

        let prompt = c.wait_prompt().unwrap();
        assert_eq!(prompt.step, 2);
        assert_eq!(prompt.saved_at, NOW);
        assert_eq!(prompt.values.unwrap()["legalFirstName"], "Jane");
        // Nothing is applied until the user accepts
        assert_eq!(c.form().get("legalFirstName"), Some(""));

        assert_eq!(c.apply_resume(), 2);
        assert_eq!(c.phase(), Phase::Active);
        assert_eq!(c.step(), 2);
        assert_eq!(c.form().get("legalFirstName"), Some("Jane"));
    }

    #[test]
    fn test_stale_progress_is_not_offered() {
        let backend = MemoryStorage::new();
        let clock = ManualClock::new(NOW);
        put_record(
            &backend,
            "42",
            &ProgressRecord::new(1, data(&[("legalFirstName", "Jane")]), NOW - 8 * DAY_MS),
        );

        let mut c = coordinator(&backend, &clock);
        assert_eq!(c.mount(), Phase::Active);
        assert!(c.prompt().is_none());
        assert!(backend.is_empty());
    }

    #[test]
    fn test_empty_record_is_not_offered() {
        let backend = MemoryStorage::new();
        let clock = ManualClock::new(NOW);
        put_record(
            &backend,
            "42",
            &ProgressRecord::new(1, data(&[("legalFirstName", "")]), NOW),
        );

        let mut c = coordinator(&backend, &clock);
        assert_eq!(c.mount(), Phase::Active);
    }

    #[test]
    fn test_start_over() {
        let backend = MemoryStorage::new();
        let clock = ManualClock::new(NOW);
        put_record(
            &backend,
            "42",
            &ProgressRecord::new(3, data(&[("legalFirstName", "Jane"), ("city", "Springfield")]), NOW),
        );

        let mut c = coordinator(&backend, &clock);
        c.mount();
        c.wait_prompt();
        c.apply_resume();
        assert_eq!(c.form().get("city"), Some("Springfield"));

        c.start_over();
        assert!(backend.is_empty());
        assert_eq!(c.step(), 0);
        assert!(c.form().values().values().all(String::is_empty));
        assert_eq!(c.phase(), Phase::Active);
        assert!(c.prompt().is_none());
    }

    #[test]
    fn test_start_over_from_prompt() {
        let backend = MemoryStorage::new();
        let clock = ManualClock::new(NOW);
        put_record(
            &backend,
            "42",
            &ProgressRecord::new(3, data(&[("legalFirstName", "Jane")]), NOW),
        );

        let mut c = coordinator(&backend, &clock);
        c.mount();
        c.start_over();
        assert!(backend.is_empty());
        assert_eq!(c.step(), 0);
        assert_eq!(c.form().get("legalFirstName"), Some(""));
    }

    #[test]
    fn test_dismiss_keeps_saved_progress() {
        let backend = MemoryStorage::new();
        let clock = ManualClock::new(NOW);
        let record = ProgressRecord::new(1, data(&[("legalFirstName", "Jane")]), NOW);
        put_record(&backend, "42", &record);

        let mut c = coordinator(&backend, &clock);
        c.mount();
        c.dismiss_resume();
        assert_eq!(c.phase(), Phase::Active);
        assert_eq!(c.step(), 0);
        assert_eq!(c.form().get("legalFirstName"), Some(""));
        assert_eq!(stored(&backend, "42"), Some(record));
    }

    #[test]
    fn test_no_writes_while_prompting() {
        let backend = MemoryStorage::new();
        let clock = ManualClock::new(NOW);
        let record = ProgressRecord::new(1, data(&[("legalFirstName", "Jane")]), NOW);
        put_record(&backend, "42", &record);

        let mut c = coordinator(&backend, &clock);
        c.mount();
        c.edit("legalFirstName", "Someone else");
        clock.advance(1_000);
        c.tick();
        assert!(!c.save_now(false));
        assert_eq!(stored(&backend, "42"), Some(record));
    }

    #[test]
    fn test_forced_save_ignores_prompt() {
        let backend = MemoryStorage::new();
        let clock = ManualClock::new(NOW);
        put_record(
            &backend,
            "42",
            &ProgressRecord::new(1, data(&[("legalFirstName", "Jane")]), NOW),
        );

        let mut c = coordinator(&backend, &clock);
        c.mount();
        c.edit("legalFirstName", "Janet");
        clock.advance(10);
        assert!(c.save_now(true));
        let saved = stored(&backend, "42").unwrap();
        assert_eq!(saved.data["legalFirstName"], "Janet");
        assert_eq!(saved.updated, NOW + 10);
    }

    #[test]
    fn test_burst_of_edits_is_one_write() {
        let backend = CountingStorage::default();
        let clock = ManualClock::new(NOW);
        let mut c = coordinator_for(backend.clone(), &clock, "42");
        c.mount();

        c.edit("legalFirstName", "Jane");
        clock.advance(50);
        c.edit("legalLastName", "Doe");
        c.tick();
        assert_eq!(backend.writes.load(Ordering::SeqCst), 0);

        clock.advance(DEFAULT_AUTOSAVE_DELAY_MS);
        c.tick();
        c.tick();
        assert_eq!(backend.writes.load(Ordering::SeqCst), 1);

        let saved = stored(&backend.inner, "42").unwrap();
        assert_eq!(saved.data["legalFirstName"], "Jane");
        assert_eq!(saved.data["legalLastName"], "Doe");
        assert_eq!(saved.step, 0);
    }

    #[test]
    fn test_sensitive_fields_stored_encrypted() {
        let backend = MemoryStorage::new();
        let clock = ManualClock::new(NOW);
        let mut c = coordinator(&backend, &clock);
        c.mount();

        c.edit("legalFirstName", "Jane");
        c.edit("ssnLast4", "1234");
        assert!(c.save_now(false));

        let saved = stored(&backend, "42").unwrap();
        assert_eq!(saved.data["legalFirstName"], "Jane");
        assert!(saved.data["ssnLast4"].starts_with(ENCRYPTED_PREFIX));
        // Empty sensitive values are stored as they are
        assert_eq!(saved.data["dateOfBirth"], "");
    }

    #[test]
    fn test_fallback_codec_obfuscates() {
        let backend = MemoryStorage::new();
        let clock = ManualClock::new(NOW);
        let mut c = coordinator(&backend, &clock)
            .with_codec(Arc::new(SensitiveFieldCodec::fallback_only()));
        c.mount();
        c.edit("ssnLast4", "1234");
        c.save_now(false);

        let saved = stored(&backend, "42").unwrap();
        assert!(saved.data["ssnLast4"].starts_with(OBFUSCATED_PREFIX));
    }

    #[test]
    fn test_blank_form_is_never_written() {
        let backend = MemoryStorage::new();
        let clock = ManualClock::new(NOW);
        let mut c = coordinator(&backend, &clock);
        c.mount();
        c.edit("legalFirstName", "");
        clock.advance(1_000);
        c.tick();
        assert!(!c.save_now(true));
        assert!(backend.is_empty());
    }

    #[test]
    fn test_step_transition_saves_new_step() {
        let backend = MemoryStorage::new();
        let clock = ManualClock::new(NOW);
        let mut c = coordinator(&backend, &clock);
        c.mount();

        fill_personal(&mut c);
        assert_eq!(c.next(&RequiredFields), Advance::Advanced(1));

        // Written without waiting for the throttle
        let saved = stored(&backend, "42").unwrap();
        assert_eq!(saved.step, 1);
        assert_eq!(saved.data["legalLastName"], "Doe");
    }

    #[test]
    fn test_previous_saves_new_step() {
        let backend = MemoryStorage::new();
        let clock = ManualClock::new(NOW);
        let mut c = coordinator(&backend, &clock);
        c.mount();

        fill_personal(&mut c);
        c.next(&RequiredFields);
        c.edit("city", "Springfield");
        assert_eq!(c.previous(), 0);

        let saved = stored(&backend, "42").unwrap();
        assert_eq!(saved.step, 0);
        assert_eq!(saved.data["city"], "Springfield");
    }

    #[test]
    fn test_review_step_is_never_persisted() {
        let backend = MemoryStorage::new();
        let clock = ManualClock::new(NOW);
        let mut c = coordinator(&backend, &clock);
        c.mount();

        fill_personal(&mut c);
        assert_eq!(c.next(&RequiredFields), Advance::Advanced(1));
        clock.advance(DEFAULT_ADVANCE_COOLDOWN_MS);
        fill_address(&mut c);
        assert_eq!(c.next(&RequiredFields), Advance::Advanced(2));
        clock.advance(DEFAULT_ADVANCE_COOLDOWN_MS);
        fill_identity(&mut c);
        assert_eq!(c.next(&RequiredFields), Advance::Advanced(3));

        assert!(c.steps().on_review());
        assert_eq!(stored(&backend, "42").unwrap().step, 2);
    }

    #[test]
    fn test_resume_clamps_to_last_editable_step() {
        let backend = MemoryStorage::new();
        let clock = ManualClock::new(NOW);
        put_record(
            &backend,
            "42",
            &ProgressRecord::new(9, data(&[("legalFirstName", "Jane")]), NOW),
        );

        let mut c = coordinator(&backend, &clock);
        c.mount();
        assert_eq!(c.prompt().unwrap().step, 2);
        assert_eq!(c.apply_resume(), 2);
    }

    #[test]
    fn test_double_next_advances_once() {
        let backend = MemoryStorage::new();
        let clock = ManualClock::new(NOW);
        let mut c = coordinator(&backend, &clock);
        c.mount();

        fill_personal(&mut c);
        fill_address(&mut c);
        assert_eq!(c.next(&RequiredFields), Advance::Advanced(1));
        assert_eq!(c.next(&RequiredFields), Advance::Ignored);
        assert_eq!(c.step(), 1);
    }

    #[test]
    fn test_resume_does_not_overwrite_live_edits() {
        let backend = MemoryStorage::new();
        let clock = ManualClock::new(NOW);
        let user = UserId::new("42");
        let codec = SensitiveFieldCodec::new();
        let ssn = codec.encode("1234", &user);
        put_record(
            &backend,
            "42",
            &ProgressRecord::new(
                2,
                data(&[("legalFirstName", "Jane"), ("ssnLast4", ssn.as_str())]),
                NOW,
            ),
        );

        let gate = Arc::new((Mutex::new(false), Condvar::new()));
        let mut c = coordinator(&backend, &clock).with_codec(Arc::new(GatedCodec {
            inner: codec,
            gate: Arc::clone(&gate),
        }));

        c.mount();
        assert!(c.prompt().unwrap().values.is_none());

        // The step jump does not wait for decoding
        assert_eq!(c.apply_resume(), 2);
        assert!(c.is_restoring());
        assert_eq!(c.form().get("legalFirstName"), Some(""));

        c.edit("legalFirstName", "Janet");

        {
            let (lock, cvar) = &*gate;
            *lock.lock().unwrap() = true;
            cvar.notify_all();
        }
        for _ in 0..400 {
            c.tick();
            if !c.is_restoring() {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }

        assert!(!c.is_restoring());
        assert_eq!(c.form().get("legalFirstName"), Some("Janet"));
        assert_eq!(c.form().get("ssnLast4"), Some("1234"));
    }

    #[test]
    fn test_autosave_during_slow_resume_keeps_stored_values() {
        let backend = MemoryStorage::new();
        let clock = ManualClock::new(NOW);
        let user = UserId::new("42");
        let codec = SensitiveFieldCodec::new();
        let ssn = codec.encode("1234", &user);
        put_record(
            &backend,
            "42",
            &ProgressRecord::new(
                2,
                data(&[
                    ("legalFirstName", "Jane"),
                    ("city", "Springfield"),
                    ("ssnLast4", ssn.as_str()),
                ]),
                NOW,
            ),
        );

        let gate = Arc::new((Mutex::new(false), Condvar::new()));
        let mut c = coordinator(&backend, &clock).with_codec(Arc::new(GatedCodec {
            inner: codec,
            gate: Arc::clone(&gate),
        }));

        c.mount();
        c.apply_resume();
        assert!(c.is_restoring());

        // Autosave fires while the decode is still held
        c.edit("occupation", "Engineer");
        clock.advance(1_000);
        c.tick();

        let saved = stored(&backend, "42").unwrap();
        assert_eq!(saved.data["legalFirstName"], "Jane");
        assert_eq!(saved.data["city"], "Springfield");
        assert_eq!(saved.data["ssnLast4"], ssn);
        assert_eq!(saved.data["occupation"], "Engineer");

        {
            let (lock, cvar) = &*gate;
            *lock.lock().unwrap() = true;
            cvar.notify_all();
        }
        for _ in 0..400 {
            c.tick();
            if !c.is_restoring() {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!c.is_restoring());
        assert_eq!(c.form().get("city"), Some("Springfield"));

        // The restored form is written back once values land
        clock.advance(1_000);
        c.tick();
        let saved = stored(&backend, "42").unwrap();
        assert_eq!(saved.data["city"], "Springfield");
        assert_eq!(saved.data["occupation"], "Engineer");
        assert!(saved.data["ssnLast4"].starts_with(ENCRYPTED_PREFIX));
        assert_eq!(saved.updated, NOW + 2_000);
    }

    #[test]
    fn test_foreign_user_fields_are_dropped() {
        let backend = MemoryStorage::new();
        let clock = ManualClock::new(NOW);

        let mut writer = coordinator_for(backend.clone(), &clock, "1");
        writer.mount();
        writer.edit("legalFirstName", "Jane");
        writer.edit("ssnLast4", "1234");
        writer.save_now(false);

        let copied = stored(&backend, "1").unwrap();
        put_record(&backend, "2", &copied);

        let mut reader = coordinator_for(backend.clone(), &clock, "2");
        assert_eq!(reader.mount(), Phase::Prompting);
        let values = reader.wait_prompt().unwrap().values.unwrap();
        assert!(!values.contains_key("ssnLast4"));

        reader.apply_resume();
        assert_eq!(reader.form().get("legalFirstName"), Some("Jane"));
        assert_eq!(reader.form().get("ssnLast4"), Some(""));
    }

    #[test]
    fn test_reload_round_trip() {
        let backend = MemoryStorage::new();
        let clock = ManualClock::new(NOW);

        let mut first = coordinator(&backend, &clock);
        first.mount();
        fill_personal(&mut first);
        first.next(&RequiredFields);
        first.edit("city", "Springfield");
        clock.advance(DEFAULT_AUTOSAVE_DELAY_MS);
        first.tick();
        drop(first);

        clock.advance(60 * 60 * 1000);
        let mut second = coordinator(&backend, &clock);
        assert_eq!(second.mount(), Phase::Prompting);
        second.wait_prompt();
        assert_eq!(second.apply_resume(), 1);
        assert_eq!(second.form().get("dateOfBirth"), Some("1990-04-01"));
        assert_eq!(second.form().get("city"), Some("Springfield"));
    }

    #[test]
    fn test_quota_failure_is_silent() {
        let backend = MemoryStorage::with_quota(16);
        let clock = ManualClock::new(NOW);
        let mut c = coordinator(&backend, &clock);
        c.mount();
        c.edit("legalFirstName", "Jane");
        assert!(!c.save_now(false));
        assert_eq!(c.last_saved(), None);
        assert_eq!(c.saved_label(), None);
    }

    #[test]
    fn test_pending_status_clears_progress() {
        let backend = MemoryStorage::new();
        let clock = ManualClock::new(NOW);
        let mut c = coordinator(&backend, &clock);
        c.mount();
        c.edit("legalFirstName", "Jane");
        c.save_now(false);
        assert!(!backend.is_empty());

        c.observe_status(VerificationStatus::Pending);
        assert!(backend.is_empty());
        assert_eq!(c.phase(), Phase::Completed);

        c.edit("legalFirstName", "Janet");
        clock.advance(1_000);
        c.tick();
        assert!(!c.save_now(true));
        assert!(backend.is_empty());

        c.observe_status(VerificationStatus::Rejected);
        assert_eq!(c.phase(), Phase::Active);
    }

    #[test]
    fn test_submit() {
        let backend = MemoryStorage::new();
        let clock = ManualClock::new(NOW);
        let mut c = coordinator(&backend, &clock);
        c.mount();
        fill_personal(&mut c);
        c.save_now(false);

        let mut calls = 0;
        let mut submitter = |_: &FieldValues| -> KycResult<VerificationStatus> {
            calls += 1;
            Ok(VerificationStatus::Pending)
        };
        let err = c.submit(&RequiredFields, &mut submitter).unwrap_err();
        assert!(err.is_validation());

        fill_address(&mut c);
        fill_identity(&mut c);
        assert_eq!(
            c.submit(&RequiredFields, &mut submitter).unwrap(),
            VerificationStatus::Pending
        );
        assert_eq!(calls, 1);
        assert!(backend.is_empty());
        assert_eq!(c.phase(), Phase::Completed);
    }

    #[test]
    fn test_saved_label() {
        let backend = MemoryStorage::new();
        let clock = ManualClock::new(NOW);
        let mut c = coordinator(&backend, &clock);
        c.mount();
        c.edit("legalFirstName", "Jane");
        c.save_now(false);

        clock.advance(30_000);
        assert_eq!(c.saved_label().as_deref(), Some("Saved just now"));
        clock.advance(60_000);
        assert_eq!(c.saved_label().as_deref(), Some("Saved 1 minute ago"));
        clock.advance(4 * 60_000);
        assert_eq!(c.saved_label().as_deref(), Some("Saved 5 minutes ago"));
    }
}
