//! Background decoding of saved progress
//!
//! Decoding sensitive fields can be slow, so it runs on a worker thread and
//! the UI thread polls for the result. Nothing here ever blocks unless the
//! caller explicitly asks to wait.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

use tracing::{debug, warn};

use crate::crypto::{decode_fields, FieldCodec};
use crate::models::{FieldValues, UserId};

/// What the user is offered when saved progress is found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumePrompt {
    /// Step the wizard will jump to on resume
    pub step: usize,
    /// When the progress was last saved (epoch ms)
    pub saved_at: i64,
    /// Decoded values, once decoding has finished
    pub values: Option<FieldValues>,
}

/// A decode running on a worker thread
#[derive(Debug)]
pub struct DecodeTask {
    rx: Option<Receiver<FieldValues>>,
    result: Option<FieldValues>,
    // Plain fields, used if the worker dies before reporting
    plain: FieldValues,
}

impl DecodeTask {
    /// Start decoding `stored` for `user`
    pub fn spawn(
        codec: Arc<dyn FieldCodec>,
        stored: FieldValues,
        sensitive: Vec<String>,
        user: UserId,
    ) -> Self {
        let plain: FieldValues = stored
            .iter()
            .filter(|(field, _)| !sensitive.contains(field))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let (tx, rx) = mpsc::channel();
        let worker_codec = Arc::clone(&codec);
        let worker_stored = stored.clone();
        let worker_sensitive = sensitive.clone();
        let worker_user = user.clone();
        let spawned = thread::Builder::new()
            .name("kyc-decode".to_string())
            .spawn(move || {
                let decoded = decode_fields(
                    worker_codec.as_ref(),
                    &worker_stored,
                    &worker_sensitive,
                    &worker_user,
                );
                // The receiver is gone if the prompt was dismissed meanwhile
                let _ = tx.send(decoded);
            });

        match spawned {
            Ok(_) => Self {
                rx: Some(rx),
                result: None,
                plain,
            },
            Err(e) => {
                warn!(error = %e, "could not start decode worker, decoding inline");
                Self {
                    rx: None,
                    result: Some(decode_fields(codec.as_ref(), &stored, &sensitive, &user)),
                    plain,
                }
            }
        }
    }

    /// The decoded values if the worker has finished
    pub fn poll(&mut self) -> Option<&FieldValues> {
        if self.result.is_none() {
            if let Some(rx) = &self.rx {
                match rx.try_recv() {
                    Ok(values) => self.finish(values),
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => {
                        debug!("decode worker exited without a result");
                        let plain = self.plain.clone();
                        self.finish(plain);
                    }
                }
            }
        }
        self.result.as_ref()
    }

    /// Block until the worker has finished
    pub fn wait(&mut self) -> &FieldValues {
        if self.result.is_none() {
            let values = match self.rx.as_ref().map(Receiver::recv) {
                Some(Ok(values)) => values,
                _ => self.plain.clone(),
            };
            self.finish(values);
        }
        self.result.get_or_insert_with(FieldValues::new)
    }

    /// Whether the decode has completed
    pub fn is_done(&mut self) -> bool {
        self.poll().is_some()
    }

    fn finish(&mut self, values: FieldValues) {
        self.result = Some(values);
        self.rx = None;
    }
}
