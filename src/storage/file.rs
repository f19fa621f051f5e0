//! JSON-file-based storage backend.
//!
//! Stores payment requests and employees in separate JSON files under a
//! configurable directory (default: `$XDG_DATA_HOME/paylink-rs/`).

use core::future::{self, Future};
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{EmployeeDirectory, PersistenceCollaborator};
use crate::error::{PaylinkError, Result};
use crate::models::{Employee, EmployeeId, PaymentRequest, PaymentRequestId, PaymentStatus};

/// Application name used for the XDG data directory.
const APP_NAME: &str = "paylink-rs";

/// File name for payment requests.
const PAYMENT_REQUESTS_FILE: &str = "payment_requests.json";
/// File name for employees.
const EMPLOYEES_FILE: &str = "employees.json";
/// Sentinel file used for cross-process file locking.
const LOCK_FILE: &str = "storage.lock";

/// File-backed storage that persists payment requests as JSON.
///
/// The employee file is only ever read; it is maintained by whatever
/// manages the employee directory.
///
/// # Concurrency
///
/// Thread safety within a single process is provided by an in-process
/// [`Mutex`]. Cross-process safety is achieved via an advisory file lock
/// on `storage.lock` (using [`std::fs::File::lock`] /
/// [`std::fs::File::lock_shared`]), so several operator consoles can share
/// one data directory.
///
/// # File layout
///
/// ```text
/// <dir>/
///   storage.lock          (cross-process lock sentinel)
///   payment_requests.json
///   employees.json
/// ```
#[derive(Debug)]
pub struct FileStorage {
    /// Root directory containing all JSON files.
    dir: PathBuf,
    /// Mutex serializing concurrent in-process access.
    lock: Mutex<()>,
    /// Sentinel file for cross-process advisory locking.
    lock_file: fs::File,
}

impl FileStorage {
    /// Creates a new file storage rooted at the given directory.
    ///
    /// Creates the directory (and parents) if it does not exist, and opens
    /// (or creates) the `storage.lock` sentinel file.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the lock
    /// file cannot be opened.
    #[inline]
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).map_err(storage_io_error)?;
        let lock_file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))
            .map_err(storage_io_error)?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
            lock_file,
        })
    }

    /// Returns the default XDG-compliant data directory for this application.
    ///
    /// On Linux: `$XDG_DATA_HOME/paylink-rs/` (typically
    /// `~/.local/share/paylink-rs/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the platform data directory cannot be determined.
    #[inline]
    pub fn default_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|data_path| data_path.join(APP_NAME))
            .ok_or_else(|| PaylinkError::persistence("could not determine platform data directory"))
    }

    // ── Private helpers ─────────────────────────────────────────────

    /// Returns the full path for a given file name.
    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Acquires an in-process mutex guard and a shared (read) file lock,
    /// executes `op`, then releases the file lock.
    fn with_shared_lock<R, F: FnOnce() -> Result<R>>(&self, op: F) -> Result<R> {
        let _guard: MutexGuard<'_, ()> = self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        self.lock_file.lock_shared().map_err(storage_io_error)?;
        let result = op();
        // Only surface the unlock error when the operation succeeded;
        // otherwise the original error is more useful.
        if let Err(err) = self.lock_file.unlock()
            && result.is_ok()
        {
            return Err(storage_io_error(err));
        }
        result
    }

    /// Acquires an in-process mutex guard and an exclusive (write) file
    /// lock, executes `op`, then releases the file lock.
    fn with_exclusive_lock<R, F: FnOnce() -> Result<R>>(&self, op: F) -> Result<R> {
        let _guard: MutexGuard<'_, ()> = self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        self.lock_file.lock().map_err(storage_io_error)?;
        let result = op();
        if let Err(err) = self.lock_file.unlock()
            && result.is_ok()
        {
            return Err(storage_io_error(err));
        }
        result
    }

    /// Reads and deserializes a JSON file. Returns an empty `Vec` if the
    /// file does not exist.
    fn read_entities<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let path = self.path(name);
        match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(PaylinkError::from),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(storage_io_error(err)),
        }
    }

    /// Atomically writes a serialized JSON file (write-to-tmp then rename).
    fn write_entities<T: Serialize>(&self, name: &str, items: &[T]) -> Result<()> {
        let path = self.path(name);
        let tmp_path = self.path(&format!("{name}.tmp"));
        let json = serde_json::to_string_pretty(items).map_err(PaylinkError::from)?;
        fs::write(&tmp_path, json).map_err(storage_io_error)?;
        fs::rename(&tmp_path, &path).map_err(storage_io_error)?;
        Ok(())
    }

    /// Reads every stored payment request (with lock).
    fn read_requests(&self) -> Result<Vec<PaymentRequest>> {
        self.with_shared_lock(|| self.read_entities(PAYMENT_REQUESTS_FILE))
    }

    /// Appends a new payment request, rejecting duplicate ids (with lock).
    fn append_request(&self, request: &PaymentRequest) -> Result<()> {
        self.with_exclusive_lock(|| {
            let mut existing: Vec<PaymentRequest> = self.read_entities(PAYMENT_REQUESTS_FILE)?;
            if existing.iter().any(|stored| stored.id == request.id) {
                return Err(PaylinkError::AlreadyExists(request.id.clone()));
            }
            existing.push(request.clone());
            self.write_entities(PAYMENT_REQUESTS_FILE, &existing)
        })
    }

    /// Rewrites the status of one stored request (with lock).
    fn rewrite_status(
        &self,
        id: &PaymentRequestId,
        status: PaymentStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_exclusive_lock(|| {
            let mut existing: Vec<PaymentRequest> = self.read_entities(PAYMENT_REQUESTS_FILE)?;
            let stored = existing
                .iter_mut()
                .find(|request| request.id == *id)
                .ok_or_else(|| PaylinkError::NotFound(id.clone()))?;
            stored.status = status;
            stored.updated_at = updated_at;
            self.write_entities(PAYMENT_REQUESTS_FILE, &existing)
        })
    }

    /// Reads every stored employee (with lock).
    fn read_employees(&self) -> Result<Vec<Employee>> {
        self.with_shared_lock(|| self.read_entities(EMPLOYEES_FILE))
    }
}

// ── Free-standing helpers ───────────────────────────────────────────────

/// Wraps an I/O error into a [`PaylinkError::Persistence`].
fn storage_io_error(err: std::io::Error) -> PaylinkError {
    PaylinkError::persistence(err)
}

/// Wraps a mutex poison error into a [`PaylinkError::Persistence`].
fn lock_poison_error<T>(err: &std::sync::PoisonError<T>) -> PaylinkError {
    PaylinkError::persistence(err.to_string())
}

impl PersistenceCollaborator for FileStorage {
    #[inline]
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<PaymentRequest>>> + Send {
        future::ready(self.read_requests())
    }

    #[inline]
    fn insert(&self, request: &PaymentRequest) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.append_request(request))
    }

    #[inline]
    fn update_status(
        &self,
        id: &PaymentRequestId,
        status: PaymentStatus,
        updated_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.rewrite_status(id, status, updated_at))
    }
}

impl EmployeeDirectory for FileStorage {
    #[inline]
    fn employee(&self, id: &EmployeeId) -> impl Future<Output = Result<Option<Employee>>> + Send {
        future::ready(
            self.read_employees()
                .map(|all| all.into_iter().find(|e| e.id == *id)),
        )
    }

    #[inline]
    fn active_employees(&self) -> impl Future<Output = Result<Vec<Employee>>> + Send {
        future::ready(
            self.read_employees()
                .map(|all| all.into_iter().filter(Employee::is_active).collect()),
        )
    }
}
