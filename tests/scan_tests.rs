mod common;

use std::sync::Arc;
use common::{connection_reset, scanner, scenario_a, user, MemoryLogStore, MockCatalog, MockDirectory};
use supaudit::{
    file_report, AuditError, AuditLogWriter, PlanTier, RetentionDays, TableSecurityRecord,
    UpstreamError, UserMfaRecord,
};

#[tokio::test]
async fn test_scenario_a_pro_plan() {
    let (directory, catalog) = scenario_a();
    let report = scanner(directory, catalog, PlanTier::Pro)
        .run_scan(Some("customer-key"))
        .await
        .unwrap();

    assert_eq!(
        report.user_mfa_status,
        vec![UserMfaRecord { email: "alice@example.com".into(), mfa_enabled: true }]
    );
    assert_eq!(
        report.table_rls_status,
        vec![
            TableSecurityRecord { table: "orders".into(), rls_enabled: true, policies_exist: true },
            TableSecurityRecord { table: "users".into(), rls_enabled: false, policies_exist: false },
        ]
    );
    assert!(report.pitr_status.enabled);
    assert_eq!(report.pitr_status.max_retention_days, RetentionDays::Days(7));
}

#[tokio::test]
async fn test_scenario_a_wire_shape() {
    let (directory, catalog) = scenario_a();
    let report = scanner(directory, catalog, PlanTier::Pro)
        .run_scan(Some("customer-key"))
        .await
        .unwrap();

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["userMfaStatus"][0]["mfaEnabled"], true);
    assert_eq!(value["tableRlsStatus"][1]["table"], "users");
    assert_eq!(value["tableRlsStatus"][1]["rlsEnabled"], false);
    assert_eq!(value["pitrStatus"], serde_json::json!({"enabled": true, "maxRetentionDays": 7}));
}

#[tokio::test]
async fn test_scenario_b_directory_failure_skips_log() {
    let directory = Arc::new(MockDirectory::failing(UpstreamError::AuthenticationFailed {
        reason: "Invalid API key".into(),
    }));
    let catalog = Arc::new(MockCatalog::with_tables(&["orders"]));
    let store = Arc::new(MemoryLogStore::default());
    let writer = AuditLogWriter::new(store.clone());

    let result = scanner(directory, catalog, PlanTier::Pro).run_scan(Some("bad-key")).await;

    let err = match result {
        Ok(report) => {
            file_report(&writer, "ops@example.com", report).await;
            panic!("scan should have failed");
        }
        Err(e) => e,
    };

    assert!(matches!(err, AuditError::DirectoryUnavailable(_)));
    assert_eq!(err.public_message(), "Error fetching users");
    assert_eq!(store.inserts(), 0);
}

#[tokio::test]
async fn test_catalog_failure_fails_whole_scan() {
    let directory = Arc::new(MockDirectory::with_users(vec![user("a@example.com", &["totp"])]));
    let catalog = Arc::new(MockCatalog::failing(UpstreamError::NotFound {
        resource: "rpc/get_public_tables".into(),
    }));

    let err = scanner(directory, catalog, PlanTier::Free)
        .run_scan(Some("key"))
        .await
        .unwrap_err();

    assert!(matches!(err, AuditError::CatalogUnavailable(_)));
    assert_eq!(err.public_message(), "Error fetching tables");
}

#[tokio::test]
async fn test_missing_credential_makes_no_calls() {
    for key in [None, Some(""), Some("   ")] {
        let (directory, catalog) = scenario_a();
        let err = scanner(directory.clone(), catalog.clone(), PlanTier::Pro)
            .run_scan(key)
            .await
            .unwrap_err();

        assert!(matches!(err, AuditError::InvalidCredential));
        assert_eq!(err.to_string(), "API key is required");
        assert_eq!(directory.calls(), 0);
        assert_eq!(catalog.calls(), 0);
    }
}

#[tokio::test]
async fn test_directory_receives_scanned_key() {
    let (directory, catalog) = scenario_a();
    scanner(directory.clone(), catalog, PlanTier::Free)
        .run_scan(Some("  customer-key "))
        .await
        .unwrap();

    assert_eq!(directory.keys_seen(), vec!["customer-key".to_string()]);
}

#[tokio::test]
async fn test_two_scans_are_identical() {
    let (directory, catalog) = scenario_a();
    let scanner = scanner(directory, catalog, PlanTier::Enterprise);

    let first = scanner.run_scan(Some("key")).await.unwrap();
    let second = scanner.run_scan(Some("key")).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_only_totp_counts_as_mfa() {
    let directory = Arc::new(MockDirectory::with_users(vec![
        user("totp@example.com", &["totp"]),
        user("phone@example.com", &["phone"]),
        user("both@example.com", &["webauthn", "totp"]),
        user("none@example.com", &[]),
    ]));
    let catalog = Arc::new(MockCatalog::default());

    let report = scanner(directory, catalog, PlanTier::Free)
        .run_scan(Some("key"))
        .await
        .unwrap();

    let flags: Vec<bool> = report.user_mfa_status.iter().map(|u| u.mfa_enabled).collect();
    assert_eq!(flags, vec![true, false, true, false]);
    assert_eq!(report.users_without_mfa().len(), 2);
    assert!(!report.is_compliant());
}

#[tokio::test]
async fn test_free_plan_without_tables() {
    let directory = Arc::new(MockDirectory::with_users(vec![]));
    let catalog = Arc::new(MockCatalog::default());

    let report = scanner(directory, catalog, PlanTier::Free)
        .run_scan(Some("key"))
        .await
        .unwrap();

    assert!(report.user_mfa_status.is_empty());
    assert!(report.table_rls_status.is_empty());
    assert!(!report.pitr_status.enabled);
    assert_eq!(report.pitr_status.max_retention_days, RetentionDays::Days(0));
}

#[tokio::test]
async fn test_indeterminate_rls_is_fail_closed() {
    let directory = Arc::new(MockDirectory::with_users(vec![]));
    let catalog = Arc::new(
        MockCatalog::with_tables(&["profiles", "invoices"])
            .rls("profiles", Ok(None))
            .policies("profiles", 3)
            .rls("invoices", Ok(Some(false)))
            .policies("invoices", 1),
    );

    let report = scanner(directory, catalog, PlanTier::Free)
        .run_scan(Some("key"))
        .await
        .unwrap();

    assert_eq!(
        report.table_rls_status,
        vec![
            TableSecurityRecord { table: "profiles".into(), rls_enabled: false, policies_exist: false },
            TableSecurityRecord { table: "invoices".into(), rls_enabled: false, policies_exist: true },
        ]
    );
    assert_eq!(report.tables_without_rls().len(), 2);
}

#[tokio::test]
async fn test_per_table_errors_do_not_fail_scan() {
    let directory = Arc::new(MockDirectory::with_users(vec![user("a@example.com", &["totp"])]));
    let catalog = Arc::new(
        MockCatalog::with_tables(&["a", "b", "c"])
            .rls("a", Err(connection_reset()))
            .rls("b", Err(UpstreamError::Timeout { operation: "check_rls_enabled".into() }))
            .rls("c", Ok(Some(true)))
            .policies("c", 1),
    );

    let report = scanner(directory, catalog, PlanTier::Pro)
        .run_scan(Some("key"))
        .await
        .unwrap();

    assert_eq!(report.table_rls_status.len(), 3);
    assert!(report.table_rls_status[2].is_protected());
}
