//! Runs a [`ShortcutRepository`] on its own worker thread.
//!
//! Every request becomes a job on one command channel, so bulk operations never
//! overlap. Callers get a [`Task`] back and learn about completion through the
//! event stream; they then pull fresh state with [`ShortcutService::snapshot`].

use std::path::PathBuf;
use std::thread;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{error, info};

use crate::error::{OperationError, ServiceError, ValidationError};
use crate::repository::ShortcutRepository;
use crate::task::{self, Task, TaskContext};
use crate::types::{FailedFile, ImportSummary, RepositoryEvent, RepositorySnapshot};

type Job = Box<dyn FnOnce(&mut ShortcutRepository) + Send>;

pub struct ShortcutService {
    jobs: mpsc::UnboundedSender<Job>,
    events: broadcast::Sender<RepositoryEvent>,
    worker: thread::JoinHandle<()>,
}

impl ShortcutService {
    pub fn start(repository: ShortcutRepository) -> Result<Self, ServiceError> {
        let events = repository.event_sender();
        let (jobs, mut queue) = mpsc::unbounded_channel::<Job>();

        let worker = thread::Builder::new()
            .name("lnkview-repository".to_string())
            .spawn(move || {
                let mut repository = repository;
                info!("repository worker started");

                while let Some(job) = queue.blocking_recv() {
                    job(&mut repository);
                }

                info!("repository worker stopped");
            })
            .map_err(ServiceError::Spawn)?;

        Ok(Self {
            jobs,
            events,
            worker,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RepositoryEvent> {
        self.events.subscribe()
    }

    fn submit<T, F>(&self, operation: F) -> Result<Task<T>, ServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&mut ShortcutRepository, &mut TaskContext) -> T + Send + 'static,
    {
        let (mut context, reply, task) = task::channel();

        let job: Job = Box::new(move |repository| {
            let value = operation(repository, &mut context);
            let _ = reply.send(value);
        });

        self.jobs.send(job).map_err(|_| {
            error!("repository worker is gone; request dropped");
            ServiceError::WorkerStopped
        })?;

        Ok(task)
    }

    /// Submits an operation that is validated on the worker first.
    ///
    /// Resolves once validation has run: a rejected request never reaches
    /// per-item work and is returned here instead of through the event stream.
    async fn submit_validated<T, V, F>(
        &self,
        validate: V,
        operation: F,
    ) -> Result<Task<T>, OperationError>
    where
        T: Default + Send + 'static,
        V: FnOnce(&ShortcutRepository) -> Result<(), ValidationError> + Send + 'static,
        F: FnOnce(&mut ShortcutRepository, &mut TaskContext) -> T + Send + 'static,
    {
        let (verdict_tx, verdict_rx) = oneshot::channel();

        let task = self.submit(move |repository, context| {
            let verdict = validate(repository);
            let accepted = verdict.is_ok();
            let _ = verdict_tx.send(verdict);

            if accepted {
                operation(repository, context)
            } else {
                T::default()
            }
        })?;

        verdict_rx.await.map_err(|_| ServiceError::TaskDropped)??;
        Ok(task)
    }

    pub fn import(&self, inputs: Vec<PathBuf>) -> Result<Task<ImportSummary>, ServiceError> {
        self.submit(move |repository, context| repository.import(&inputs, context))
    }

    pub fn remove(&self, shortcut_paths: Vec<PathBuf>) -> Result<Task<usize>, ServiceError> {
        self.submit(move |repository, _| repository.remove(&shortcut_paths))
    }

    pub fn check_availability(&self) -> Result<Task<usize>, ServiceError> {
        self.submit(|repository, context| repository.check_availability(context))
    }

    pub fn check_duplicates(&self) -> Result<Task<usize>, ServiceError> {
        self.submit(|repository, context| repository.check_duplicates(context))
    }

    pub fn remove_duplicates(
        &self,
        selected: Vec<PathBuf>,
    ) -> Result<Task<Vec<FailedFile>>, ServiceError> {
        self.submit(move |repository, context| repository.remove_duplicates(&selected, context))
    }

    pub async fn change_parents(
        &self,
        old_prefix: PathBuf,
        new_prefix: PathBuf,
    ) -> Result<Task<Vec<FailedFile>>, OperationError> {
        let (old_check, new_check) = (old_prefix.clone(), new_prefix.clone());

        self.submit_validated(
            move |repository| repository.validate_change_parents(&old_check, &new_check),
            move |repository, context| {
                repository.apply_change_parents(&old_prefix, &new_prefix, context)
            },
        )
        .await
    }

    pub async fn copy_targets(
        &self,
        destination_root: PathBuf,
        preserve_hierarchy: bool,
    ) -> Result<Task<Vec<FailedFile>>, OperationError> {
        let destination_check = destination_root.clone();

        self.submit_validated(
            move |repository| repository.validate_copy(&destination_check),
            move |repository, context| {
                repository.apply_copy_targets(&destination_root, preserve_hierarchy, context)
            },
        )
        .await
    }

    pub async fn snapshot(&self) -> Result<RepositorySnapshot, ServiceError> {
        self.submit(|repository, _| repository.snapshot())?
            .join()
            .await
    }

    /// Finishes queued jobs, then stops the worker thread.
    pub fn shutdown(self) {
        let Self { jobs, worker, .. } = self;
        drop(jobs);

        if worker.join().is_err() {
            error!("repository worker panicked");
        }
    }
}
