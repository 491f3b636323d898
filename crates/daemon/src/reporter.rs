// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure reporting: error log plus optional admin mail.
//!
//! Reporting never fails the caller. Anything that goes wrong while
//! dispatching the mail is logged and swallowed.

use anysyncd_core::SyncerConfig;
use lettre::{Message, SmtpTransport, Transport};

pub(crate) struct Reporter {
    syncer: String,
    admin_from: Option<String>,
    admin_to: Option<String>,
}

impl Reporter {
    pub(crate) fn new(config: &SyncerConfig) -> Self {
        Self {
            syncer: config.name.clone(),
            admin_from: config.admin_from.clone(),
            admin_to: config.admin_to.clone(),
        }
    }

    /// Record a pipeline failure. Mails the admins when both addresses are
    /// configured.
    pub(crate) fn report(&self, error: &str) {
        tracing::error!(syncer = %self.syncer, error, "sync failed");

        let (Some(from), Some(to)) = (&self.admin_from, &self.admin_to) else {
            return;
        };
        let mail = match build_mail(from, to, &self.syncer, error) {
            Ok(mail) => mail,
            Err(error) => {
                tracing::warn!(syncer = %self.syncer, %error, "cannot build failure mail");
                return;
            }
        };

        let syncer = self.syncer.clone();
        tokio::task::spawn_blocking(move || {
            let mailer = SmtpTransport::unencrypted_localhost();
            if let Err(error) = mailer.send(&mail) {
                tracing::warn!(%syncer, %error, "failed to send failure mail");
            }
        });
    }
}

fn build_mail(from: &str, to: &str, syncer: &str, error: &str) -> Result<Message, String> {
    Message::builder()
        .from(from.parse().map_err(|e| format!("invalid admin_from `{}`: {}", from, e))?)
        .to(to.parse().map_err(|e| format!("invalid admin_to `{}`: {}", to, e))?)
        .subject(format!("anysyncd failed to sync {}", syncer))
        .body(error.to_string())
        .map_err(|e| e.to_string())
}

#[cfg(test)]
#[path = "reporter_tests.rs"]
mod tests;
