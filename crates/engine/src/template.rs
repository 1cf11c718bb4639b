//! Template backend: canned generation with simulated latency.
//!
//! Stands in for a real model inference client. Each file kind renders a
//! fixed template around the prompt; the templates share a CSS class
//! contract (the component decides the class names, the stylesheet then
//! references them), which is why manifest order matters to callers.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use vizcode_core::{FileKind, FileSpec, ModelDescriptor};

use crate::backend::{BackendError, GenerationBackend};

/// Default simulated latency floor per file.
pub const DEFAULT_MIN_LATENCY_MS: u64 = 500;
/// Default simulated latency ceiling per file.
pub const DEFAULT_MAX_LATENCY_MS: u64 = 1500;

/// Class names shared between the generated component and stylesheet.
const SHELL_CLASS: &str = "app-shell";
const HEADER_CLASS: &str = "app-header";
const CONTENT_CLASS: &str = "app-content";
const BUTTON_CLASS: &str = "cta-button";

// ---------------------------------------------------------------------------
// LatencyRange
// ---------------------------------------------------------------------------

/// Inclusive range of simulated per-file generation latency.
#[derive(Debug, Clone, Copy)]
pub struct LatencyRange {
    min: Duration,
    max: Duration,
}

impl LatencyRange {
    /// Build a range, normalising a reversed pair.
    pub fn new(min: Duration, max: Duration) -> Self {
        if max < min {
            Self { min: max, max: min }
        } else {
            Self { min, max }
        }
    }

    /// No delay at all. Used by tests and benchmarks.
    pub fn zero() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    fn sample(&self) -> Duration {
        let (min, max) = (self.min.as_millis() as u64, self.max.as_millis() as u64);
        if min >= max {
            return self.min;
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

impl Default for LatencyRange {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(DEFAULT_MIN_LATENCY_MS),
            Duration::from_millis(DEFAULT_MAX_LATENCY_MS),
        )
    }
}

// ---------------------------------------------------------------------------
// TemplateBackend
// ---------------------------------------------------------------------------

/// Canned-template generation backend.
pub struct TemplateBackend {
    latency: LatencyRange,
}

impl TemplateBackend {
    pub fn new(latency: LatencyRange) -> Self {
        Self { latency }
    }

    /// A backend with zero latency, for tests.
    pub fn instant() -> Self {
        Self::new(LatencyRange::zero())
    }
}

impl Default for TemplateBackend {
    fn default() -> Self {
        Self::new(LatencyRange::default())
    }
}

#[async_trait]
impl GenerationBackend for TemplateBackend {
    async fn generate_file(
        &self,
        prompt: &str,
        model: &ModelDescriptor,
        file: &FileSpec,
    ) -> Result<String, BackendError> {
        let delay = self.latency.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        Ok(match file.kind {
            FileKind::Component => render_component(prompt, model),
            FileKind::Style => render_stylesheet(),
            FileKind::Util => render_utilities(),
        })
    }
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

fn render_component(prompt: &str, model: &ModelDescriptor) -> String {
    format!(
        r#"// Generated with {name}
import React from 'react';

export default function GeneratedApp() {{
  return (
    <div className="{SHELL_CLASS}">
      <header className="{HEADER_CLASS}">
        <h1>{prompt}</h1>
      </header>
      <main className="{CONTENT_CLASS}">
        <p>This interface was generated from your prompt: "{prompt}"</p>
        <button className="{BUTTON_CLASS}">Get started</button>
      </main>
    </div>
  );
}}
"#,
        name = model.name,
    )
}

fn render_stylesheet() -> String {
    format!(
        r#".{SHELL_CLASS} {{
  min-height: 100vh;
  display: flex;
  flex-direction: column;
  background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
  color: #ffffff;
}}

.{HEADER_CLASS} {{
  padding: 2rem;
  text-align: center;
}}

.{CONTENT_CLASS} {{
  flex: 1;
  max-width: 960px;
  margin: 0 auto;
  padding: 2rem;
}}

.{BUTTON_CLASS} {{
  padding: 0.75rem 2rem;
  border: none;
  border-radius: 0.5rem;
  background: #10b981;
  color: #ffffff;
  font-weight: 600;
  cursor: pointer;
}}

@media (max-width: 768px) {{
  .{CONTENT_CLASS} {{
    padding: 1rem;
  }}
}}
"#
    )
}

fn render_utilities() -> String {
    r#"export const copyToClipboard = async (text: string): Promise<boolean> => {
  try {
    await navigator.clipboard.writeText(text);
    return true;
  } catch (error) {
    console.error('Failed to copy to clipboard:', error);
    return false;
  }
};

export const downloadFile = (content: string, filename: string, type = 'text/plain') => {
  const blob = new Blob([content], { type });
  const url = URL.createObjectURL(blob);
  const link = document.createElement('a');
  link.href = url;
  link.download = filename;
  link.click();
  URL.revokeObjectURL(url);
};

export const debounce = <T extends (...args: any[]) => void>(func: T, wait: number) => {
  let timeout: ReturnType<typeof setTimeout>;
  return (...args: Parameters<T>) => {
    clearTimeout(timeout);
    timeout = setTimeout(() => func(...args), wait);
  };
};
"#
    .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
