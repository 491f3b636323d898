// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn mail_subject_names_the_syncer() {
    let mail = build_mail("daemon@src.example", "ops@example.org", "data", "boom").unwrap();
    let headers = String::from_utf8_lossy(&mail.formatted()).to_string();
    assert!(headers.contains("Subject: anysyncd failed to sync data"), "got:\n{headers}");
    assert!(headers.contains("boom"));
}

#[test]
fn invalid_addresses_are_rejected() {
    assert!(build_mail("not an address", "ops@example.org", "data", "x").is_err());
    assert!(build_mail("daemon@src.example", "", "data", "x").is_err());
}

#[tokio::test]
async fn report_without_admin_config_only_logs() {
    let config = minimal_config(None, None);
    Reporter::new(&config).report("mirror failed");
}

#[tokio::test]
async fn report_with_half_configured_mail_does_not_dispatch() {
    let config = minimal_config(Some("daemon@src.example"), None);
    Reporter::new(&config).report("mirror failed");
}

fn minimal_config(admin_from: Option<&str>, admin_to: Option<&str>) -> SyncerConfig {
    let mut config = crate::test_support::syncer_config("data");
    config.admin_from = admin_from.map(str::to_string);
    config.admin_to = admin_to.map(str::to_string);
    config
}
