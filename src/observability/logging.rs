//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global subscriber
//! - Route audit records to their own sink
//! - Mask text output for the `pretty` format
//!
//! # Design Decisions
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` wins over the configured level

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

use crate::config::schema::LogFormat;
use crate::config::PaylogConfig;
use crate::masking::MaskingEngine;
use crate::observability::layer::StructuredJsonLayer;
use crate::observability::serializer::StructuredLogSerializer;

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("failed to open audit log: {0}")]
    AuditFile(#[from] io::Error),

    #[error("global subscriber already installed: {0}")]
    Init(#[from] TryInitError),
}

/// Install the global subscriber described by `[observability]`.
pub fn init(config: &PaylogConfig, masker: Arc<MaskingEngine>) -> Result<(), LoggingError> {
    let observability = &config.observability;
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&observability.log_level)?,
    };

    let (json, pretty) = match observability.format {
        LogFormat::Json => {
            let serializer = StructuredLogSerializer::from_config(config, masker);
            let audit = audit_writer(observability.audit_path.as_deref())?;
            let layer = StructuredJsonLayer::new(serializer, io::stdout, audit);
            (Some(layer), None)
        }
        LogFormat::Pretty => {
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(MaskingMakeWriter::new(io::stdout, masker));
            (None, Some(layer))
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .try_init()?;
    Ok(())
}

fn audit_writer(path: Option<&str>) -> io::Result<BoxMakeWriter> {
    match path {
        Some(path) => {
            let file: File = OpenOptions::new().create(true).append(true).open(path)?;
            Ok(BoxMakeWriter::new(Mutex::new(file)))
        }
        None => Ok(BoxMakeWriter::new(io::stdout)),
    }
}

/// Writer that masks each formatted record before passing it on.
pub struct MaskingWriter<W> {
    inner: W,
    masker: Arc<MaskingEngine>,
}

impl<W: Write> Write for MaskingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        self.inner.write_all(self.masker.mask(&text).as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// [`MakeWriter`] producing [`MaskingWriter`]s around another `MakeWriter`.
pub struct MaskingMakeWriter<M> {
    inner: M,
    masker: Arc<MaskingEngine>,
}

impl<M> MaskingMakeWriter<M> {
    pub fn new(inner: M, masker: Arc<MaskingEngine>) -> Self {
        Self { inner, masker }
    }
}

impl<'a, M: MakeWriter<'a>> MakeWriter<'a> for MaskingMakeWriter<M> {
    type Writer = MaskingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        MaskingWriter {
            inner: self.inner.make_writer(),
            masker: self.masker.clone(),
        }
    }
}
