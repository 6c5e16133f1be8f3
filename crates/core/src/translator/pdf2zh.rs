//! pdf2zh-based translator implementation.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::config::TranslatorConfig;
use super::error::TranslateError;
use super::traits::Translator;
use super::types::{TranslateJob, TranslateOutput};
use crate::layout::is_nonempty_file;

/// Lines of the tool log attached to a failure.
const LOG_TAIL_LINES: usize = 40;

/// Translator that shells out to `pdf2zh`.
pub struct Pdf2zhTranslator {
    config: TranslatorConfig,
}

impl Pdf2zhTranslator {
    pub fn new(config: TranslatorConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(TranslatorConfig::default())
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Arguments passed to the binary for `job`.
    pub fn build_args(&self, job: &TranslateJob) -> Vec<String> {
        let mut args = vec![
            job.input_path.to_string_lossy().into_owned(),
            "-o".to_string(),
            job.output_dir.to_string_lossy().into_owned(),
            "-s".to_string(),
            job.service.clone(),
            "-t".to_string(),
            job.threads.to_string(),
        ];
        args.extend(self.config.extra_args.iter().cloned());
        args
    }

    /// Locate the tool's outputs for `input` inside `output_dir`.
    ///
    /// The mono file is `<stem>-mono.pdf`, or `<stem>-zh.pdf` on older
    /// versions of the tool.
    fn discover_outputs(input: &Path, output_dir: &Path) -> (Option<PathBuf>, Option<PathBuf>) {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mono = [format!("{}-mono.pdf", stem), format!("{}-zh.pdf", stem)]
            .into_iter()
            .map(|name| output_dir.join(name))
            .find(|p| is_nonempty_file(p));
        let dual = Some(output_dir.join(format!("{}-dual.pdf", stem))).filter(|p| p.exists());
        (mono, dual)
    }

    fn open_log(path: &Path) -> std::io::Result<std::fs::File> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(path)
    }
}

/// Last `lines` lines of the file at `path`, if it can be read.
pub(crate) fn log_tail(path: &Path, lines: usize) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    let text = String::from_utf8_lossy(&bytes);
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    let tail = all[start..].join("\n");
    (!tail.trim().is_empty()).then_some(tail)
}

#[async_trait]
impl Translator for Pdf2zhTranslator {
    fn name(&self) -> &str {
        "pdf2zh"
    }

    async fn translate(&self, job: TranslateJob) -> Result<TranslateOutput, TranslateError> {
        let start = Instant::now();

        if !is_nonempty_file(&job.input_path) {
            return Err(TranslateError::InputNotFound {
                path: job.input_path.clone(),
            });
        }
        tokio::fs::create_dir_all(&job.output_dir).await?;

        let args = self.build_args(&job);
        let mut log = Self::open_log(&job.log_path)?;
        writeln!(
            log,
            "[{}] {} {}",
            chrono::Utc::now().to_rfc3339(),
            self.config.pdf2zh_bin.display(),
            args.join(" ")
        )?;
        let stdout = log.try_clone()?;

        debug!(paper_id = %job.paper_id, args = ?args, "Starting pdf2zh");

        let status = Command::new(&self.config.pdf2zh_bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(log))
            .status()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranslateError::BinaryNotFound {
                        path: self.config.pdf2zh_bin.clone(),
                    }
                } else {
                    TranslateError::Io(e)
                }
            })?;

        if !status.success() {
            let tail = log_tail(&job.log_path, LOG_TAIL_LINES);
            warn!(
                paper_id = %job.paper_id,
                code = ?status.code(),
                log = %job.log_path.display(),
                "pdf2zh exited unsuccessfully"
            );
            return Err(TranslateError::process_failed(
                format!("pdf2zh exited with code: {:?}", status.code()),
                tail,
            ));
        }

        let (mono, dual) = Self::discover_outputs(&job.input_path, &job.output_dir);
        let mono_path = mono.ok_or_else(|| {
            let stem = job
                .input_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            TranslateError::OutputMissing {
                expected: job.output_dir.join(format!("{}-mono.pdf", stem)),
            }
        })?;

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            paper_id = %job.paper_id,
            output = %mono_path.display(),
            duration_ms,
            "pdf2zh finished"
        );

        Ok(TranslateOutput {
            mono_path,
            dual_path: dual,
            duration_ms,
        })
    }

    async fn validate(&self) -> Result<(), TranslateError> {
        let result = Command::new(&self.config.pdf2zh_bin)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(TranslateError::BinaryNotFound {
                    path: self.config.pdf2zh_bin.clone(),
                })
            }
            Err(e) => Err(TranslateError::Io(e)),
        }
    }
}
