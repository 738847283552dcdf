// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Interactive step of the OAuth authorization-code flows.

use crate::error::{AppError, Result};
use anyhow::anyhow;
use std::io::{self, BufRead, Write};

/// Shows an authorization URL and returns the URL the browser was
/// redirected to.
pub trait RedirectPrompt: Send + Sync {
    fn read_redirect(&self, authorize_url: &str) -> Result<String>;
}

/// Prompt on stdout, answer on stdin.
pub struct ConsolePrompt;

impl RedirectPrompt for ConsolePrompt {
    fn read_redirect(&self, authorize_url: &str) -> Result<String> {
        prompt_for_redirect(&mut io::stdin().lock(), &mut io::stdout().lock(), authorize_url)
    }
}

fn prompt_for_redirect(
    input: &mut impl BufRead,
    out: &mut impl Write,
    authorize_url: &str,
) -> Result<String> {
    writeln!(
        out,
        "Visit the URL below and authorize this app to access your account. \
         Your browser will be redirected to a URL."
    )?;
    writeln!(out, "************")?;
    writeln!(out, "{}", authorize_url)?;
    writeln!(out, "************")?;
    write!(out, "Copy that URL here: ")?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(AppError::Internal(anyhow!(
            "Input closed before a redirect URL was entered"
        )));
    }
    let redirect = line.trim().to_string();
    tracing::debug!(url = %redirect, "Callback URL received");
    Ok(redirect)
}

/// Prompt that replays a fixed answer (tests and scripted runs).
pub struct FixedPrompt(pub String);

impl RedirectPrompt for FixedPrompt {
    fn read_redirect(&self, _authorize_url: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}
