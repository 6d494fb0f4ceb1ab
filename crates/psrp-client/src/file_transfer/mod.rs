//! File transfer engine (§4.G): chunked upload/download over a remote
//! pipeline, built on top of whatever can run a script and hand back its
//! output — this module never talks to a [`crate::pool::RunspacePool`]
//! directly, it depends only on [`ScriptExecutor`], which `Session`
//! implements by invoking a one-shot pipeline and collecting its output
//! (§4.E "execute").

pub mod checksum;
pub mod token_bucket;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use base64::Engine as _;

use crate::clock::SharedClock;
use crate::config::{FileTransferConfig, Transport};
use crate::error::{ClientError, FileTransferPhase};
use crate::security_log::{Outcome, SecurityEvent, SecurityEventType, SecurityLogger};
use checksum::{checksums_match, IncrementalSha256};
use token_bucket::TokenBucket;

/// Runs a script on the remote runspace and returns its collected output as
/// a single string, bounded by `timeout`. `Session` is the production
/// implementation (§4.E); tests supply a scripted fake.
pub trait ScriptExecutor: Send + Sync {
    fn execute(&self, script: &str, timeout: Duration) -> Result<String, ClientError>;
}

/// A pipeline created with its input stream left open, addressed by the
/// [`StreamingExecutor`] calls that feed and finally close it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHandle(pub uuid::Uuid);

/// Drives one long-lived pipeline fed chunk-by-chunk over its input stream,
/// rather than one fresh pipeline per chunk (§4.G "streaming-input mode").
/// `Session` is the production implementation, wrapping
/// [`crate::pool::RunspacePool::write_pipeline_input`]/`close_input`.
pub trait StreamingExecutor: Send + Sync {
    /// Starts `script` as a pipeline whose input stream is not closed after
    /// invocation, reserving a runspace slot held until `finish_stream`.
    fn start_stream(&self, script: &str, timeout: Duration) -> Result<StreamHandle, ClientError>;

    /// Sends one chunk into the pipeline's input stream.
    fn write_chunk(&self, handle: StreamHandle, data: &[u8]) -> Result<(), ClientError>;

    /// Closes the input stream, waits for the pipeline to finish, and
    /// releases the runspace slot `start_stream` reserved.
    fn finish_stream(&self, handle: StreamHandle, timeout: Duration) -> Result<(), ClientError>;
}

#[derive(Debug, Clone, Copy)]
pub struct TransferProgress {
    pub transferred_bytes: u64,
    pub total_bytes: u64,
    pub elapsed: Duration,
}

pub type ProgressCallback = Box<dyn FnMut(TransferProgress) + Send>;

/// Non-empty, remote-absolute (drive-letter or UNC), and free of `..`
/// traversal segments (§4.G "Path validation").
pub fn validate_remote_path(path: &str) -> Result<(), ClientError> {
    if path.is_empty() {
        return Err(ClientError::FileTransferError {
            phase: FileTransferPhase::Validate,
            message: "remote path must not be empty".to_string(),
        });
    }

    let is_drive_letter = path.as_bytes().get(1) == Some(&b':')
        && path.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    let is_unc = path.starts_with("\\\\");
    if !is_drive_letter && !is_unc {
        return Err(ClientError::FileTransferError {
            phase: FileTransferPhase::Validate,
            message: format!("remote path must be absolute (drive letter or UNC): {path}"),
        });
    }

    if path.split(['\\', '/']).any(|segment| segment == "..") {
        return Err(ClientError::FileTransferError {
            phase: FileTransferPhase::Validate,
            message: format!("remote path must not contain '..' segments: {path}"),
        });
    }

    Ok(())
}

fn escape_single_quotes(s: &str) -> String {
    s.replace('\'', "''")
}

fn write_chunk_script(remote_path: &str, offset: u64, base64_data: &str) -> String {
    format!(
        "$fs = [System.IO.File]::Open('{path}', [System.IO.FileMode]::OpenOrCreate, [System.IO.FileAccess]::Write, [System.IO.FileShare]::ReadWrite); \
         try {{ $fs.Seek({offset}, [System.IO.SeekOrigin]::Begin) | Out-Null; $bytes = [Convert]::FromBase64String('{data}'); $fs.Write($bytes, 0, $bytes.Length) }} finally {{ $fs.Close() }}",
        path = escape_single_quotes(remote_path),
        offset = offset,
        data = base64_data,
    )
}

fn write_stream_script(remote_path: &str) -> String {
    format!(
        "$fs = [System.IO.File]::Open('{path}', [System.IO.FileMode]::Create, [System.IO.FileAccess]::Write, [System.IO.FileShare]::ReadWrite); \
         try {{ foreach ($chunk in $input) {{ $fs.Write($chunk, 0, $chunk.Length) }} }} finally {{ $fs.Close() }}",
        path = escape_single_quotes(remote_path),
    )
}

fn read_chunk_script(remote_path: &str, offset: u64, length: usize) -> String {
    format!(
        "$fs = [System.IO.File]::Open('{path}', [System.IO.FileMode]::Open, [System.IO.FileAccess]::Read, [System.IO.FileShare]::ReadWrite); \
         try {{ $fs.Seek({offset}, [System.IO.SeekOrigin]::Begin) | Out-Null; $buffer = New-Object byte[] {length}; $read = $fs.Read($buffer, 0, {length}); [Convert]::ToBase64String($buffer, 0, $read) }} finally {{ $fs.Close() }}",
        path = escape_single_quotes(remote_path),
        offset = offset,
        length = length,
    )
}

fn remote_size_script(remote_path: &str) -> String {
    format!(
        "(Get-Item -LiteralPath '{path}').Length",
        path = escape_single_quotes(remote_path)
    )
}

fn remote_checksum_script(remote_path: &str) -> String {
    format!(
        "$sha = [System.Security.Cryptography.SHA256]::Create(); $stream = [System.IO.File]::OpenRead('{path}'); \
         try {{ $hash = $sha.ComputeHash($stream); [BitConverter]::ToString($hash).Replace('-', '') }} finally {{ $stream.Close() }}",
        path = escape_single_quotes(remote_path)
    )
}

fn report(progress: &mut Option<ProgressCallback>, transferred: u64, total: u64, started: Instant) {
    if let Some(callback) = progress.as_mut() {
        callback(TransferProgress {
            transferred_bytes: transferred,
            total_bytes: total,
            elapsed: started.elapsed(),
        });
    }
}

/// Drives chunked upload/download against a remote shell, honoring the
/// configured chunk size, max file size, and checksum-verification policy.
pub struct FileTransferEngine {
    executor: Arc<dyn ScriptExecutor>,
    streaming_executor: Option<Arc<dyn StreamingExecutor>>,
    config: FileTransferConfig,
    transport: Transport,
    clock: SharedClock,
    security_logger: Option<SecurityLogger>,
    target: String,
}

impl FileTransferEngine {
    pub fn new(executor: Arc<dyn ScriptExecutor>, config: FileTransferConfig, transport: Transport, clock: SharedClock) -> Self {
        Self {
            executor,
            streaming_executor: None,
            config,
            transport,
            clock,
            security_logger: None,
            target: String::new(),
        }
    }

    /// Enables [`FileTransferEngine::upload_streamed`] by supplying the
    /// long-lived-pipeline collaborator (§4.G "streaming-input mode").
    pub fn with_streaming(mut self, streaming_executor: Arc<dyn StreamingExecutor>) -> Self {
        self.streaming_executor = Some(streaming_executor);
        self
    }

    /// Emits start/complete/failure security events (§4.H) for every
    /// transfer this engine drives, tagged with `target`.
    pub fn with_security_logger(mut self, security_logger: SecurityLogger, target: impl Into<String>) -> Self {
        self.security_logger = Some(security_logger);
        self.target = target.into();
        self
    }

    fn log_transfer(&self, subtype: &str, outcome: Outcome, remote_path: &str, detail: Option<(&str, String)>) {
        let Some(logger) = &self.security_logger else {
            return;
        };
        let mut event = SecurityEvent::new(SecurityEventType::Command, subtype, outcome)
            .target(&self.target)
            .detail("remote_path", remote_path);
        if let Some((key, value)) = detail {
            event = event.detail(key, value);
        }
        logger.emit(event);
    }

    fn log_transfer_outcome(&self, verb: &str, remote_path: &str, result: &Result<(), ClientError>) {
        match result {
            Ok(()) => self.log_transfer(&format!("{verb}-complete"), Outcome::Success, remote_path, None),
            Err(err) => self.log_transfer(
                &format!("{verb}-complete"),
                Outcome::Failure,
                remote_path,
                Some(("error", err.to_string())),
            ),
        }
    }

    fn chunk_size(&self) -> usize {
        self.config.resolved_chunk_size(self.transport)
    }

    fn check_max_size(&self, size: u64) -> Result<(), ClientError> {
        if self.config.max_file_size < 0 {
            return Ok(());
        }
        if size > self.config.max_file_size as u64 {
            return Err(ClientError::FileTransferError {
                phase: FileTransferPhase::Validate,
                message: format!(
                    "file size {size} exceeds configured max_file_size {}",
                    self.config.max_file_size
                ),
            });
        }
        Ok(())
    }

    /// Serial streaming upload: one chunk at a time, in order (§4.G).
    pub fn upload(
        &self,
        local_path: &Path,
        remote_path: &str,
        mut progress: Option<ProgressCallback>,
    ) -> Result<(), ClientError> {
        self.log_transfer("upload-start", Outcome::Attempt, remote_path, None);

        let result = (|| -> Result<(), ClientError> {
            validate_remote_path(remote_path)?;

            let mut file = File::open(local_path).map_err(ClientError::Io)?;
            let total = file.metadata().map_err(ClientError::Io)?.len();
            self.check_max_size(total)?;

            let chunk_size = self.chunk_size();
            let mut buffer = vec![0u8; chunk_size];
            let mut offset: u64 = 0;
            let mut hasher = IncrementalSha256::new();
            let started = Instant::now();

            loop {
                let read = file.read(&mut buffer).map_err(ClientError::Io)?;
                if read == 0 {
                    break;
                }
                let chunk = &buffer[..read];
                hasher.update(chunk);

                let encoded = base64::engine::general_purpose::STANDARD.encode(chunk);
                let script = write_chunk_script(remote_path, offset, &encoded);
                self.executor
                    .execute(&script, self.config.chunk_timeout)
                    .map_err(|_| ClientError::FileTransferError {
                        phase: FileTransferPhase::UploadChunk,
                        message: format!("failed writing chunk at offset {offset}"),
                    })?;

                offset += read as u64;
                report(&mut progress, offset, total, started);
            }

            if self.config.verify_checksum {
                self.verify_remote_checksum(remote_path, hasher)?;
            }

            Ok(())
        })();

        self.log_transfer_outcome("upload", remote_path, &result);
        result
    }

    /// Parallel offset-write upload (§4.G): each worker opens its own
    /// executor handle and writes disjoint byte ranges concurrently, relying
    /// on `FileShare::ReadWrite` on the remote side so writers don't lock
    /// each other out.
    pub fn upload_parallel(
        &self,
        local_path: &Path,
        remote_path: &str,
        concurrency: usize,
        mut progress: Option<ProgressCallback>,
    ) -> Result<(), ClientError> {
        self.log_transfer("upload-start", Outcome::Attempt, remote_path, None);

        let result = (|| -> Result<(), ClientError> {
            validate_remote_path(remote_path)?;

            let bytes = std::fs::read(local_path).map_err(ClientError::Io)?;
            let total = bytes.len() as u64;
            self.check_max_size(total)?;

            let chunk_size = self.chunk_size();
            let chunks: Vec<(u64, &[u8])> = bytes
                .chunks(chunk_size)
                .scan(0u64, |offset, chunk| {
                    let start = *offset;
                    *offset += chunk.len() as u64;
                    Some((start, chunk))
                })
                .collect();

            let transferred = Arc::new(Mutex::new(0u64));
            let started = Instant::now();
            let errors: Arc<Mutex<Vec<ClientError>>> = Arc::new(Mutex::new(Vec::new()));

            std::thread::scope(|scope| {
                let pool_size = concurrency.max(1);
                for batch in chunks.chunks(chunks.len().div_ceil(pool_size).max(1)) {
                    let executor = self.executor.clone();
                    let remote_path = remote_path.to_string();
                    let transferred = transferred.clone();
                    let errors = errors.clone();
                    let timeout = self.config.chunk_timeout;
                    let batch = batch.to_vec();

                    scope.spawn(move || {
                        for (offset, chunk) in batch {
                            let encoded = base64::engine::general_purpose::STANDARD.encode(chunk);
                            let script = write_chunk_script(&remote_path, offset, &encoded);
                            if executor.execute(&script, timeout).is_err() {
                                errors.lock().unwrap().push(ClientError::FileTransferError {
                                    phase: FileTransferPhase::UploadChunk,
                                    message: format!("failed writing chunk at offset {offset}"),
                                });
                                return;
                            }
                            let mut guard = transferred.lock().unwrap();
                            *guard += chunk.len() as u64;
                        }
                    });
                }
            });

            report(&mut progress, *transferred.lock().unwrap(), total, started);

            if let Some(err) = errors.lock().unwrap().drain(..).next() {
                return Err(err);
            }

            if self.config.verify_checksum {
                let mut hasher = IncrementalSha256::new();
                hasher.update(&bytes);
                self.verify_remote_checksum(remote_path, hasher)?;
            }

            Ok(())
        })();

        self.log_transfer_outcome("upload", remote_path, &result);
        result
    }

    /// Rate-limited streaming upload for HvSocket, pacing writes through a
    /// [`TokenBucket`] rather than relying on WSMan's own flow control.
    pub fn upload_paced(
        &self,
        local_path: &Path,
        remote_path: &str,
        rate_bytes_per_sec: f64,
        mut progress: Option<ProgressCallback>,
    ) -> Result<(), ClientError> {
        self.log_transfer("upload-start", Outcome::Attempt, remote_path, None);

        let result = (|| -> Result<(), ClientError> {
            validate_remote_path(remote_path)?;

            let mut file = File::open(local_path).map_err(ClientError::Io)?;
            let total = file.metadata().map_err(ClientError::Io)?.len();
            self.check_max_size(total)?;

            let chunk_size = self.chunk_size();
            let bucket = TokenBucket::new(rate_bytes_per_sec, chunk_size, self.clock.clone());
            let mut buffer = vec![0u8; chunk_size];
            let mut offset: u64 = 0;
            let mut hasher = IncrementalSha256::new();
            let started = Instant::now();

            loop {
                let read = file.read(&mut buffer).map_err(ClientError::Io)?;
                if read == 0 {
                    break;
                }
                bucket.acquire(read);
                let chunk = &buffer[..read];
                hasher.update(chunk);

                let encoded = base64::engine::general_purpose::STANDARD.encode(chunk);
                let script = write_chunk_script(remote_path, offset, &encoded);
                self.executor
                    .execute(&script, self.config.chunk_timeout)
                    .map_err(|_| ClientError::FileTransferError {
                        phase: FileTransferPhase::UploadChunk,
                        message: format!("failed writing chunk at offset {offset}"),
                    })?;

                offset += read as u64;
                report(&mut progress, offset, total, started);
            }

            if self.config.verify_checksum {
                self.verify_remote_checksum(remote_path, hasher)?;
            }

            Ok(())
        })();

        self.log_transfer_outcome("upload", remote_path, &result);
        result
    }

    /// Streaming-input upload (§4.G): a single long-lived pipeline receives
    /// chunks over its input stream instead of one fresh pipeline per chunk.
    /// Requires [`FileTransferEngine::with_streaming`] to have supplied a
    /// [`StreamingExecutor`].
    pub fn upload_streamed(
        &self,
        local_path: &Path,
        remote_path: &str,
        mut progress: Option<ProgressCallback>,
    ) -> Result<(), ClientError> {
        self.log_transfer("upload-start", Outcome::Attempt, remote_path, None);

        let result = (|| -> Result<(), ClientError> {
            let streaming = self.streaming_executor.as_ref().ok_or_else(|| ClientError::FileTransferError {
                phase: FileTransferPhase::Validate,
                message: "upload_streamed requires a StreamingExecutor".to_string(),
            })?;
            validate_remote_path(remote_path)?;

            let mut file = File::open(local_path).map_err(ClientError::Io)?;
            let total = file.metadata().map_err(ClientError::Io)?.len();
            self.check_max_size(total)?;

            let script = write_stream_script(remote_path);
            let handle = streaming.start_stream(&script, self.config.chunk_timeout)?;

            let chunk_size = self.chunk_size();
            let mut buffer = vec![0u8; chunk_size];
            let mut offset: u64 = 0;
            let mut hasher = IncrementalSha256::new();
            let started = Instant::now();

            let stream_result = (|| -> Result<(), ClientError> {
                loop {
                    let read = file.read(&mut buffer).map_err(ClientError::Io)?;
                    if read == 0 {
                        break;
                    }
                    let chunk = &buffer[..read];
                    hasher.update(chunk);
                    streaming
                        .write_chunk(handle, chunk)
                        .map_err(|_| ClientError::FileTransferError {
                            phase: FileTransferPhase::UploadChunk,
                            message: format!("failed streaming chunk at offset {offset}"),
                        })?;
                    offset += read as u64;
                    report(&mut progress, offset, total, started);
                }
                Ok(())
            })();

            streaming.finish_stream(handle, self.config.chunk_timeout)?;
            stream_result?;

            if self.config.verify_checksum {
                self.verify_remote_checksum(remote_path, hasher)?;
            }

            Ok(())
        })();

        self.log_transfer_outcome("upload", remote_path, &result);
        result
    }

    /// Sequential offset-read download (§4.G): queries the remote file size,
    /// then reads and decodes chunks in order.
    pub fn download(
        &self,
        remote_path: &str,
        local_path: &Path,
        mut progress: Option<ProgressCallback>,
    ) -> Result<(), ClientError> {
        self.log_transfer("download-start", Outcome::Attempt, remote_path, None);

        let result = (|| -> Result<(), ClientError> {
            validate_remote_path(remote_path)?;

            let size_output = self
                .executor
                .execute(&remote_size_script(remote_path), self.config.chunk_timeout)?;
            let total: u64 = size_output.trim().parse().map_err(|_| ClientError::FileTransferError {
                phase: FileTransferPhase::Validate,
                message: format!("could not parse remote file size from: {size_output}"),
            })?;
            self.check_max_size(total)?;

            if self.config.no_overwrite && local_path.exists() {
                return Err(ClientError::FileTransferError {
                    phase: FileTransferPhase::Validate,
                    message: format!("local path already exists: {}", local_path.display()),
                });
            }

            let mut file = File::create(local_path).map_err(ClientError::Io)?;
            let chunk_size = self.chunk_size();
            let mut offset: u64 = 0;
            let mut hasher = IncrementalSha256::new();
            let started = Instant::now();

            while offset < total {
                let length = std::cmp::min(chunk_size as u64, total - offset) as usize;
                let script = read_chunk_script(remote_path, offset, length);
                let encoded = self
                    .executor
                    .execute(&script, self.config.chunk_timeout)
                    .map_err(|_| ClientError::FileTransferError {
                        phase: FileTransferPhase::DownloadChunk,
                        message: format!("failed reading chunk at offset {offset}"),
                    })?;

                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| ClientError::FileTransferError {
                        phase: FileTransferPhase::DownloadChunk,
                        message: format!("invalid base64 at offset {offset}: {e}"),
                    })?;

                file.seek(SeekFrom::Start(offset)).map_err(ClientError::Io)?;
                file.write_all(&bytes).map_err(ClientError::Io)?;
                hasher.update(&bytes);

                offset += bytes.len() as u64;
                report(&mut progress, offset, total, started);

                if bytes.is_empty() {
                    break;
                }
            }

            if self.config.verify_checksum {
                self.verify_remote_checksum(remote_path, hasher)?;
            }

            Ok(())
        })();

        self.log_transfer_outcome("download", remote_path, &result);
        result
    }

    fn verify_remote_checksum(&self, remote_path: &str, hasher: IncrementalSha256) -> Result<(), ClientError> {
        let local_hex = hasher.finalize_hex();
        let remote_hex = self
            .executor
            .execute(&remote_checksum_script(remote_path), self.config.chunk_timeout)?;
        if !checksums_match(&local_hex, remote_hex.trim()) {
            return Err(ClientError::FileTransferError {
                phase: FileTransferPhase::ChecksumMismatch,
                message: format!("local {local_hex} != remote {}", remote_hex.trim()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedExecutor {
        responses: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    impl ScriptExecutor for ScriptedExecutor {
        fn execute(&self, _script: &str, _timeout: Duration) -> Result<String, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Ok(String::new());
            }
            Ok(responses.remove(0))
        }
    }

    fn engine(responses: Vec<&str>) -> (FileTransferEngine, Arc<ScriptedExecutor>) {
        let executor = Arc::new(ScriptedExecutor {
            responses: Mutex::new(responses.into_iter().map(str::to_string).collect()),
            calls: AtomicUsize::new(0),
        });
        let config = FileTransferConfig::builder().verify_checksum(false).build();
        let clock: SharedClock = Arc::new(MockClock::new());
        (
            FileTransferEngine::new(executor.clone(), config, Transport::WSMan, clock),
            executor,
        )
    }

    #[test]
    fn test_upload_with_security_logger_still_succeeds() {
        let (base_engine, _executor) = engine(vec![]);
        let engine = base_engine.with_security_logger(SecurityLogger::new(), "host01");

        let dir = std::env::temp_dir().join(format!("psrp-logged-upload-test-{}", uuid::Uuid::new_v4()));
        std::fs::write(&dir, b"hello world").unwrap();

        let result = engine.upload(&dir, "C:\\Temp\\file.bin", None);
        std::fs::remove_file(&dir).ok();

        assert!(result.is_ok());
    }

    #[test]
    fn test_download_failure_with_security_logger_still_propagates_error() {
        let (base_engine, _executor) = engine(vec!["not-a-number"]);
        let engine = base_engine.with_security_logger(SecurityLogger::new(), "host01");

        let dest = std::env::temp_dir().join(format!("psrp-logged-download-fail-{}", uuid::Uuid::new_v4()));
        let result = engine.download("C:\\Temp\\file.bin", &dest, None);
        std::fs::remove_file(&dest).ok();

        assert!(matches!(
            result,
            Err(ClientError::FileTransferError {
                phase: FileTransferPhase::Validate,
                ..
            })
        ));
    }

    #[test]
    fn test_validate_remote_path_rejects_relative() {
        assert!(validate_remote_path("relative\\path").is_err());
    }

    #[test]
    fn test_validate_remote_path_accepts_drive_letter() {
        assert!(validate_remote_path("C:\\Temp\\file.bin").is_ok());
    }

    #[test]
    fn test_validate_remote_path_accepts_unc() {
        assert!(validate_remote_path("\\\\server\\share\\file.bin").is_ok());
    }

    #[test]
    fn test_validate_remote_path_rejects_traversal() {
        assert!(validate_remote_path("C:\\Temp\\..\\file.bin").is_err());
    }

    #[test]
    fn test_validate_remote_path_rejects_empty() {
        assert!(validate_remote_path("").is_err());
    }

    #[test]
    fn test_upload_serial_streams_chunks_in_order() {
        let (engine, executor) = engine(vec![]);
        let dir = std::env::temp_dir().join(format!("psrp-upload-test-{}", uuid::Uuid::new_v4()));
        std::fs::write(&dir, b"hello world").unwrap();

        engine.upload(&dir, "C:\\Temp\\file.bin", None).unwrap();
        std::fs::remove_file(&dir).ok();

        assert!(executor.calls.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_download_reconstructs_file_from_chunks() {
        let payload = b"remote file contents";
        let encoded = base64::engine::general_purpose::STANDARD.encode(payload);
        let (engine, _executor) = engine(vec![&payload.len().to_string(), &encoded]);

        let dest = std::env::temp_dir().join(format!("psrp-download-test-{}", uuid::Uuid::new_v4()));
        engine.download("C:\\Temp\\file.bin", &dest, None).unwrap();

        let written = std::fs::read(&dest).unwrap();
        std::fs::remove_file(&dest).ok();
        assert_eq!(written, payload);
    }

    struct ScriptedStreamingExecutor {
        chunks: Mutex<Vec<Vec<u8>>>,
        started: AtomicUsize,
        finished: AtomicUsize,
    }

    impl StreamingExecutor for ScriptedStreamingExecutor {
        fn start_stream(&self, _script: &str, _timeout: Duration) -> Result<StreamHandle, ClientError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            Ok(StreamHandle(uuid::Uuid::new_v4()))
        }

        fn write_chunk(&self, _handle: StreamHandle, data: &[u8]) -> Result<(), ClientError> {
            self.chunks.lock().unwrap().push(data.to_vec());
            Ok(())
        }

        fn finish_stream(&self, _handle: StreamHandle, _timeout: Duration) -> Result<(), ClientError> {
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_upload_streamed_sends_one_long_lived_pipelines_chunks() {
        let (base_engine, _executor) = engine(vec![]);
        let streaming = Arc::new(ScriptedStreamingExecutor {
            chunks: Mutex::new(Vec::new()),
            started: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
        });
        let engine = base_engine.with_streaming(streaming.clone());

        let dir = std::env::temp_dir().join(format!("psrp-stream-upload-test-{}", uuid::Uuid::new_v4()));
        std::fs::write(&dir, b"streamed payload").unwrap();

        engine.upload_streamed(&dir, "C:\\Temp\\file.bin", None).unwrap();
        std::fs::remove_file(&dir).ok();

        assert_eq!(streaming.started.load(Ordering::SeqCst), 1);
        assert_eq!(streaming.finished.load(Ordering::SeqCst), 1);
        let chunks = streaming.chunks.lock().unwrap();
        let reassembled: Vec<u8> = chunks.iter().flatten().copied().collect();
        assert_eq!(reassembled, b"streamed payload");
    }

    #[test]
    fn test_upload_streamed_without_streaming_executor_errors() {
        let (engine, _executor) = engine(vec![]);
        let dir = std::env::temp_dir().join(format!("psrp-stream-missing-test-{}", uuid::Uuid::new_v4()));
        std::fs::write(&dir, b"x").unwrap();

        let result = engine.upload_streamed(&dir, "C:\\Temp\\file.bin", None);
        std::fs::remove_file(&dir).ok();

        assert!(matches!(
            result,
            Err(ClientError::FileTransferError {
                phase: FileTransferPhase::Validate,
                ..
            })
        ));
    }

    #[test]
    fn test_check_max_size_rejects_oversized_file() {
        let executor = Arc::new(ScriptedExecutor {
            responses: Mutex::new(vec![]),
            calls: AtomicUsize::new(0),
        });
        let config = FileTransferConfig::builder().max_file_size(4).build();
        let clock: SharedClock = Arc::new(MockClock::new());
        let engine = FileTransferEngine::new(executor, config, Transport::WSMan, clock);

        let path = std::env::temp_dir().join(format!("psrp-oversize-test-{}", uuid::Uuid::new_v4()));
        std::fs::write(&path, b"this is too long").unwrap();
        let result = engine.upload(&path, "C:\\Temp\\file.bin", None);
        std::fs::remove_file(&path).ok();

        assert!(matches!(
            result,
            Err(ClientError::FileTransferError {
                phase: FileTransferPhase::Validate,
                ..
            })
        ));
    }
}
