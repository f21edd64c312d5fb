//! Format registry: requested format tokens to encoders.
//!
//! A token is either a format id (`csv`, `.xlsx`) or a content type
//! (`application/json`, `text/csv; charset=utf-8`). Matching is
//! case-insensitive. The first token that matches a registration wins;
//! when none match, the default format is used, so every request gets a
//! document.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::DatacastError;
use crate::Result;

use super::{
    ChartEncoder, ChartOptions, CsvEncoder, Encoder, JsonEncoder, JsonOptions, TextEncoder,
    XlsEncoder, XlsxEncoder,
};

/// One registered format.
#[derive(Clone)]
pub struct Registration {
    format_id: String,
    content_types: Vec<String>,
    encoder: Arc<dyn Encoder>,
}

impl Registration {
    pub fn format_id(&self) -> &str {
        &self.format_id
    }

    /// Content types that select this format; the first is what it produces.
    pub fn content_types(&self) -> &[String] {
        &self.content_types
    }

    pub fn encoder(&self) -> &dyn Encoder {
        self.encoder.as_ref()
    }

    fn matches(&self, token: &str) -> bool {
        self.format_id.eq_ignore_ascii_case(token)
            || self
                .content_types
                .iter()
                .any(|ct| ct.eq_ignore_ascii_case(token))
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("format_id", &self.format_id)
            .field("content_types", &self.content_types)
            .finish()
    }
}

/// Ordered format registrations plus a default.
///
/// Built once at startup and then only read, so it can be shared across
/// threads freely.
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    registrations: Vec<Registration>,
    default: Option<String>,
}

impl FormatRegistry {
    /// An empty registry with no default.
    pub fn new() -> Self {
        Self::default()
    }

    /// All built-in formats in their standard order, defaulting to csv.
    pub fn with_defaults() -> Self {
        Self::builtin(JsonOptions::default(), ChartOptions::default())
    }

    /// All built-in formats with the given encoder options.
    pub fn builtin(json: JsonOptions, chart: ChartOptions) -> Self {
        Self::new()
            .register("csv", &[super::CSV], Arc::new(CsvEncoder::new()))
            .register("txt", &[super::TXT], Arc::new(TextEncoder::new()))
            .register("json", &[super::JSON], Arc::new(JsonEncoder::new(json)))
            .register("xlsx", &[super::XLSX], Arc::new(XlsxEncoder::new()))
            .register("xls", &[super::XLS], Arc::new(XlsEncoder::new()))
            .register("png", &[super::PNG], Arc::new(ChartEncoder::png(chart)))
            .register("svg", &[super::SVG], Arc::new(ChartEncoder::svg(chart)))
            .default_format("csv")
    }

    /// Register a format. Re-registering an id replaces the encoder in place.
    pub fn register(
        mut self,
        format_id: impl Into<String>,
        content_types: &[&str],
        encoder: Arc<dyn Encoder>,
    ) -> Self {
        let registration = Registration {
            format_id: format_id.into(),
            content_types: content_types.iter().map(|ct| ct.to_string()).collect(),
            encoder,
        };
        match self
            .registrations
            .iter_mut()
            .find(|r| r.format_id == registration.format_id)
        {
            Some(existing) => *existing = registration,
            None => self.registrations.push(registration),
        }
        self
    }

    /// Set the fallback format.
    pub fn default_format(mut self, format_id: impl Into<String>) -> Self {
        self.default = Some(format_id.into());
        self
    }

    /// Keep only `enabled` formats, in that order.
    ///
    /// Fails with `UnknownFormat` for ids that are not registered. The
    /// default is dropped if it is not enabled.
    pub fn enable<S: AsRef<str>>(mut self, enabled: &[S]) -> Result<Self> {
        let mut kept = Vec::with_capacity(enabled.len());
        for id in enabled {
            let id = id.as_ref();
            let position = self
                .registrations
                .iter()
                .position(|r| r.format_id.eq_ignore_ascii_case(id))
                .ok_or_else(|| DatacastError::UnknownFormat(id.to_string()))?;
            kept.push(self.registrations.remove(position));
        }
        self.registrations = kept;
        if let Some(default) = &self.default {
            if self.find(default).is_none() {
                warn!(default = %default, "default format is not enabled");
                self.default = None;
            }
        }
        Ok(self)
    }

    /// Registrations in resolution order.
    pub fn formats(&self) -> &[Registration] {
        &self.registrations
    }

    /// The default format id, if any.
    pub fn default_id(&self) -> Option<&str> {
        self.default.as_deref()
    }

    fn find(&self, format_id: &str) -> Option<&Registration> {
        self.registrations
            .iter()
            .find(|r| r.format_id.eq_ignore_ascii_case(format_id))
    }

    /// Resolve requested tokens to a registration.
    pub fn resolve_registration<S: AsRef<str>>(&self, requested: &[S]) -> Result<&Registration> {
        for token in requested {
            let Some(token) = normalize(token.as_ref()) else {
                continue;
            };
            let found = if token == "*/*" {
                self.registrations.first()
            } else {
                self.registrations.iter().find(|r| r.matches(&token))
            };
            if let Some(registration) = found {
                debug!(token = %token, format = %registration.format_id, "resolved format");
                return Ok(registration);
            }
        }

        let requested: Vec<&str> = requested.iter().map(|t| t.as_ref()).collect();
        match self.default.as_deref().and_then(|id| self.find(id)) {
            Some(registration) => {
                debug!(requested = ?requested, format = %registration.format_id, "using default format");
                Ok(registration)
            }
            None => Err(DatacastError::UnknownFormat(requested.join(", "))),
        }
    }

    /// Resolve requested tokens to an encoder.
    pub fn resolve<S: AsRef<str>>(&self, requested: &[S]) -> Result<&dyn Encoder> {
        self.resolve_registration(requested).map(Registration::encoder)
    }
}

/// Lowercase a token and strip a leading `.` and any `;` parameters.
fn normalize(token: &str) -> Option<String> {
    let token = token.split(';').next().unwrap_or_default().trim();
    let token = token.strip_prefix('.').unwrap_or(token);
    (!token.is_empty()).then(|| token.to_ascii_lowercase())
}

/// Split an Accept-style header (`a/b, c/d;q=0.5`) into tokens, in order.
pub fn accept_tokens(header: &str) -> Vec<String> {
    header
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
